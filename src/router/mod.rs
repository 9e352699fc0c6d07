//! # Router Module
//!
//! Path matching and reverse lookup over the route table produced by
//! [`crate::spec::extract_routes`].
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Matching incoming `(method, path)` pairs to routes in declaration order
//! - Extracting and percent-decoding path variables
//! - Enforcing per-variable requirements (a violation is a non-match)
//! - Generating paths for named routes (`url_for`)
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Compilation**: At extraction time every pattern (e.g., `/posts/{id}`)
//!    is split into segments. Literal segments compare exactly; segments with
//!    placeholders compile to an anchored regex built from the variable
//!    requirements.
//!
//! 2. **Matching**: For each request the router walks the table in
//!    declaration order and returns the first route whose method set and
//!    segments accept the path. The first declaration wins even when a later
//!    route would be more specific.
//!
//! ## Example
//!
//! ```rust
//! use routebind::router::Router;
//! use routebind::spec::{extract_routes, HandlerDescriptor, RouteMetadata};
//! use std::sync::Arc;
//!
//! let handlers = vec![HandlerDescriptor::new("show_post")
//!     .route(RouteMetadata::new("/posts/{id}").name("post_show"))];
//! let table = extract_routes(&handlers).unwrap();
//! let router = Router::new(Arc::new(table));
//!
//! let m = router.route(http::Method::GET, "/posts/5").unwrap();
//! assert_eq!(m.get_path_param("id"), Some("5"));
//! assert_eq!(router.url_for_params("post_show", &[("id", "5")]).unwrap(), "/posts/5");
//! ```

mod core;
mod pattern;

pub use core::{ParamVec, ReverseError, RouteMatch, Router, DEFAULT_SLOW_MATCH, MAX_INLINE_PARAMS};
pub use pattern::{PathMatcher, PatternError};
