//! # Typed Module
//!
//! Type-safe handlers on top of the resolved argument list.
//!
//! Instead of reading [`HandlerArgs`](crate::dispatcher::HandlerArgs) by
//! parameter name, a handler declares a request view implementing
//! `TryFrom<&HandlerArgs>` and a serializable response. A view that refuses
//! the arguments produces a 400 outcome (`binding_error`); the handler's
//! return value is serialized as the 200 body.
//!
//! ## Usage
//!
//! ```rust
//! use routebind::dispatcher::{DispatchRequest, DispatcherBuilder, HandlerArgs};
//! use routebind::resolver::EntityRecord;
//! use routebind::spec::{HandlerDescriptor, ParameterSpec, RouteMetadata};
//! use routebind::typed::{Handler, TypedHandlerRequest};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct Post {
//!     title: String,
//! }
//!
//! struct ShowPost(Post);
//!
//! impl TryFrom<&HandlerArgs> for ShowPost {
//!     type Error = anyhow::Error;
//!
//!     fn try_from(args: &HandlerArgs) -> anyhow::Result<Self> {
//!         let record = args
//!             .entity("post")
//!             .ok_or_else(|| anyhow::anyhow!("post was not resolved"))?;
//!         Ok(ShowPost(record.deserialize()?))
//!     }
//! }
//!
//! #[derive(Serialize)]
//! struct PostView {
//!     headline: String,
//! }
//!
//! struct ShowPostHandler;
//!
//! impl Handler for ShowPostHandler {
//!     type Request = ShowPost;
//!     type Response = PostView;
//!
//!     fn handle(&self, req: TypedHandlerRequest<ShowPost>) -> anyhow::Result<PostView> {
//!         Ok(PostView { headline: req.data.0.title.to_uppercase() })
//!     }
//! }
//!
//! let dispatcher = DispatcherBuilder::new()
//!     .converter("Post", |entity: &str, id: &str| -> anyhow::Result<Option<EntityRecord>> {
//!         Ok(Some(EntityRecord::new(entity, id, serde_json::json!({ "title": "hello" }))))
//!     })
//!     .handler_typed(
//!         HandlerDescriptor::new("show_post")
//!             .route(RouteMetadata::new("/posts/{id}"))
//!             .param(ParameterSpec::entity("post", "Post")),
//!         ShowPostHandler,
//!     )
//!     .build()
//!     .unwrap();
//!
//! let outcome = dispatcher.dispatch(&DispatchRequest::new(http::Method::GET, "/posts/1"));
//! assert_eq!(outcome.response.body["headline"], "HELLO");
//! ```

mod core;

pub use core::*;
