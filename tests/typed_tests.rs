//! Tests for typed handlers
//!
//! Typed request views are built from the resolved arguments; a view that
//! refuses them produces a 400 outcome, and the handler's response is
//! serialized as the body.

mod common;

use common::{blog_builder, MemoryStore};
use http::Method;
use routebind::dispatcher::{DispatchRequest, DispatchState, HandlerArgs};
use routebind::spec::{HandlerDescriptor, ParamType, ParameterSpec, RouteMetadata};
use routebind::typed::{Handler, TypedHandlerFor, TypedHandlerRequest};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Post {
    id: u64,
    title: String,
}

#[derive(Debug)]
struct EditPost {
    post: Post,
    draft: bool,
}

impl TryFrom<&HandlerArgs> for EditPost {
    type Error = anyhow::Error;

    fn try_from(args: &HandlerArgs) -> anyhow::Result<Self> {
        let record = args
            .entity("post")
            .ok_or_else(|| anyhow::anyhow!("post was not resolved"))?;
        let draft = args.get("draft").and_then(|v| v.as_bool()).unwrap_or(false);
        if draft && args.get_query_param("reason").is_none() {
            anyhow::bail!("drafts need a reason");
        }
        Ok(EditPost {
            post: record.deserialize()?,
            draft,
        })
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct EditView {
    id: u64,
    headline: String,
    draft: bool,
}

struct EditPostHandler;

impl Handler for EditPostHandler {
    type Request = EditPost;
    type Response = EditView;

    fn handle(&self, req: TypedHandlerRequest<EditPost>) -> anyhow::Result<EditView> {
        if req.data.post.title.is_empty() {
            anyhow::bail!("untitled post");
        }
        Ok(EditView {
            id: req.data.post.id,
            headline: format!("{} ({})", req.data.post.title, req.method),
            draft: req.data.draft,
        })
    }
}

fn edit_dispatcher() -> routebind::Dispatcher {
    let mut store = MemoryStore::blog();
    store.insert("Post", "7", json!({"id": 7, "title": ""}));
    blog_builder(Arc::new(store))
        .handler_typed(
            HandlerDescriptor::new("post_edit")
                .route(
                    RouteMetadata::new("/posts/{id}/edit")
                        .name("post_edit")
                        .requirement("id", r"\d+"),
                )
                .param(ParameterSpec::entity("post", "Post"))
                .param(ParameterSpec::primitive("draft", ParamType::Bool)),
            EditPostHandler,
        )
        .build()
        .unwrap()
}

#[test]
fn test_typed_handler_serializes_response() {
    let dispatcher = edit_dispatcher();
    let outcome = dispatcher.dispatch(
        &DispatchRequest::new(Method::POST, "/posts/5/edit").with_query("draft", "0"),
    );
    assert_eq!(outcome.state, DispatchState::Responded);
    assert_eq!(
        outcome.response.body,
        json!({"id": 5, "headline": "Hello (POST)", "draft": false})
    );
}

#[test]
fn test_rejected_request_view_is_binding_failed() {
    let dispatcher = edit_dispatcher();
    let outcome = dispatcher.dispatch(&DispatchRequest::from_target(
        Method::POST,
        "/posts/5/edit?draft=true",
    ));
    assert_eq!(outcome.state, DispatchState::BindingFailed);
    assert_eq!(outcome.response.status, 400);
    assert_eq!(outcome.response.body["error"], "binding_error");
    let message = outcome.response.body["message"].as_str().unwrap();
    assert!(message.contains("drafts need a reason"), "message was {message}");
    assert_eq!(
        outcome.trail.last().copied(),
        Some(DispatchState::BindingFailed)
    );

    let outcome = dispatcher.dispatch(&DispatchRequest::from_target(
        Method::POST,
        "/posts/5/edit?draft=true&reason=typo",
    ));
    assert_eq!(outcome.response.body["draft"], true);
}

#[test]
fn test_typed_handler_error_is_500() {
    let dispatcher = edit_dispatcher();
    let outcome = dispatcher
        .dispatch(&DispatchRequest::new(Method::POST, "/posts/7/edit").with_query("draft", "0"));
    assert_eq!(outcome.state, DispatchState::HandlerError);
    assert_eq!(outcome.response.status, 500);
}

#[test]
fn test_entity_resolution_precedes_typed_conversion() {
    let dispatcher = edit_dispatcher();
    let outcome = dispatcher
        .dispatch(&DispatchRequest::new(Method::POST, "/posts/404/edit").with_query("draft", "0"));
    assert_eq!(outcome.state, DispatchState::EntityMissing);
}

#[test]
fn test_from_args_copies_request_metadata() {
    let dispatcher = edit_dispatcher();
    let outcome = dispatcher.dispatch(
        &DispatchRequest::new(Method::PUT, "/posts/6/edit")
            .with_query("draft", "1")
            .with_query("reason", "x"),
    );
    assert_eq!(outcome.state, DispatchState::Responded);
    assert_eq!(outcome.response.body["headline"], "World (PUT)");

    // Build the same typed request directly from hand-made arguments
    let mut path_params = routebind::router::ParamVec::new();
    path_params.push((Arc::from("id"), "6".to_string()));
    let args = HandlerArgs {
        request_id: outcome.request_id,
        method: Method::PUT,
        path: "/posts/6/edit".to_string(),
        handler_name: "post_edit".to_string(),
        route_name: Some("post_edit".to_string()),
        path_params,
        query_params: routebind::router::ParamVec::new(),
        values: vec![(
            "post".to_string(),
            routebind::BoundValue::Entity(routebind::EntityRecord::new(
                "Post",
                "6",
                json!({"id": 6, "title": "World"}),
            )),
        )],
    };
    let req = TypedHandlerRequest::<EditPost>::from_args(&args).unwrap();
    assert_eq!(req.path_params.get("id").map(String::as_str), Some("6"));
    assert_eq!(req.handler_name, "post_edit");
    assert!(!req.data.draft);
    assert_eq!(req.data.post.title, "World");
    assert_eq!(req.request_id, outcome.request_id);
}
