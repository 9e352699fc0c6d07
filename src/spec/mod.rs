//! # Spec Module
//!
//! Route metadata and its extraction into a [`RouteTable`].
//!
//! Handlers are described by plain data ([`HandlerDescriptor`]): an
//! identifier, zero or more attached [`RouteMetadata`] declarations and the
//! handler's [`ParameterSpec`] list. Declarations come from builder calls or
//! from a YAML/JSON route file ([`load_route_file`] + [`apply_route_file`]).
//!
//! [`extract_routes`] validates every declaration once at startup and
//! produces the ordered, immutable table the router and dispatcher share.

mod build;
mod load;
mod types;

pub use build::*;
pub use load::*;
pub use types::*;
