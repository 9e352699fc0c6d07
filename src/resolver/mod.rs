//! # Resolver Module
//!
//! Turns a route match into the argument list a handler declared.
//!
//! Each [`ParameterSpec`](crate::spec::ParameterSpec) is bound in one of two
//! ways:
//!
//! - **Primitive** (`Str`, `Int`, `UInt`, `Float`, `Bool`): the raw string of
//!   the source variable (the parameter name unless mapped) is coerced. A
//!   failed coercion is a bad request.
//! - **Entity**: the [`Converter`] registered for the entity type loads the
//!   record. By convention the identifier comes from the path variable named
//!   after the converter's identifying attribute (`{id}` by default). When no
//!   such variable is bound the lookup is skipped and the parameter is passed
//!   through as [`BoundValue::Unresolved`], so handlers that query the store
//!   themselves keep working without configuration. A converter returning
//!   `None` fails the request as not found.
//!
//! ```rust
//! use routebind::resolver::{resolve_parameters, ConverterRegistry, EntityRecord};
//! use routebind::router::ParamVec;
//! use routebind::spec::ParameterSpec;
//! use std::sync::Arc;
//!
//! let mut converters = ConverterRegistry::new();
//! converters.register(
//!     "Post",
//!     Arc::new(|entity: &str, id: &str| -> anyhow::Result<Option<EntityRecord>> {
//!         Ok(Some(EntityRecord::new(entity, id, serde_json::json!({ "title": "Hello" }))))
//!     }),
//! );
//!
//! let mut bindings = ParamVec::new();
//! bindings.push((Arc::from("id"), "5".to_string()));
//! let args = resolve_parameters(
//!     &[ParameterSpec::entity("post", "Post")],
//!     &bindings,
//!     &ParamVec::new(),
//!     &converters,
//! )
//! .unwrap();
//! assert_eq!(args[0].1.as_entity().unwrap().id(), "5");
//! ```

mod core;

pub use core::{
    resolve_parameters, BoundValue, Converter, ConverterRegistry, EntityRecord, ResolveError,
    DEFAULT_IDENTIFIER,
};
