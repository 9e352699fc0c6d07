#![allow(dead_code)]
//! Shared fixtures: a small blog with posts, authors and a converter backed by
//! an in-memory store.

use routebind::resolver::EntityRecord;
use routebind::spec::{HandlerDescriptor, ParamType, ParameterSpec, RouteMetadata};
use routebind::{Dispatcher, DispatcherBuilder};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory record store keyed by (entity, id)
#[derive(Default)]
pub struct MemoryStore {
    records: HashMap<(String, String), Value>,
    lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn blog() -> Self {
        let mut store = MemoryStore::default();
        store.insert("Post", "5", json!({"id": 5, "title": "Hello"}));
        store.insert("Post", "6", json!({"id": 6, "title": "World"}));
        store.insert("Author", "ada", json!({"slug": "ada", "name": "Ada"}));
        store
    }

    pub fn insert(&mut self, entity: &str, id: &str, data: Value) {
        self.records
            .insert((entity.to_string(), id.to_string()), data);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn find(&self, entity: &str, id: &str) -> anyhow::Result<Option<EntityRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if id == "explode" {
            anyhow::bail!("store unavailable");
        }
        Ok(self
            .records
            .get(&(entity.to_string(), id.to_string()))
            .map(|data| EntityRecord::new(entity, id, data.clone())))
    }
}

/// Converter for authors, identified by slug
pub struct AuthorConverter(pub Arc<MemoryStore>);

impl routebind::Converter for AuthorConverter {
    fn identifier(&self) -> &str {
        "slug"
    }

    fn convert(&self, entity: &str, id: &str) -> anyhow::Result<Option<EntityRecord>> {
        self.0.find(entity, id)
    }
}

fn echo(args: &routebind::HandlerArgs) -> anyhow::Result<Value> {
    Ok(json!({
        "handler": args.handler_name,
        "route": args.route_name,
        "values": args.values,
        "bindings": args.path_params_map(),
    }))
}

/// Builder with the blog's handlers and converters registered
pub fn blog_builder(store: Arc<MemoryStore>) -> DispatcherBuilder {
    let posts = Arc::clone(&store);
    DispatcherBuilder::new()
        .converter("Post", move |entity: &str, id: &str| posts.find(entity, id))
        .converter("Author", AuthorConverter(Arc::clone(&store)))
        .handler(
            HandlerDescriptor::new("post_index")
                .route(RouteMetadata::new("/posts").name("post_index").method(http::Method::GET)),
            echo,
        )
        .handler(
            HandlerDescriptor::new("post_show")
                .route(
                    RouteMetadata::new("/posts/{id}")
                        .name("post_show")
                        .requirement("id", r"\d+")
                        .method(http::Method::GET),
                )
                .param(ParameterSpec::entity("post", "Post")),
            |args| {
                let post = args
                    .entity("post")
                    .ok_or_else(|| anyhow::anyhow!("post missing"))?;
                Ok(post.data().clone())
            },
        )
        .handler(
            HandlerDescriptor::new("post_by_slug")
                .route(RouteMetadata::new("/posts/{slug}").name("post_by_slug"))
                .param(ParameterSpec::primitive("slug", ParamType::Str)),
            echo,
        )
        .handler(
            HandlerDescriptor::new("author_posts")
                .route(
                    RouteMetadata::new("/authors/{slug}/posts/{page}")
                        .name("author_posts")
                        .requirement("page", r"\d+")
                        .default_value("page", "1"),
                )
                .param(ParameterSpec::entity("author", "Author"))
                .param(ParameterSpec::primitive("page", ParamType::UInt)),
            echo,
        )
        .handler(
            HandlerDescriptor::new("comment_show")
                .route(RouteMetadata::new("/posts/{post_id}/comments/{id}").name("comment_show"))
                .param(ParameterSpec::entity("post", "Post").mapped_from("post_id"))
                .param(ParameterSpec::primitive("id", ParamType::Int)),
            echo,
        )
        .handler(
            HandlerDescriptor::new("archive")
                .route(RouteMetadata::new("/archive/{year}").name("archive"))
                .param(ParameterSpec::entity("post", "Post")),
            echo,
        )
        .handler(
            HandlerDescriptor::new("explode")
                .route(RouteMetadata::new("/explode").name("explode")),
            |_args| panic!("handler blew up"),
        )
        .handler(
            HandlerDescriptor::new("fail").route(RouteMetadata::new("/fail").name("fail")),
            |_args| Err(anyhow::anyhow!("database timeout")),
        )
}

pub fn blog_dispatcher() -> (Dispatcher, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::blog());
    let dispatcher = blog_builder(Arc::clone(&store))
        .build()
        .expect("blog fixture builds");
    (dispatcher, store)
}

pub const BLOG_ROUTES_YAML: &str = r#"
routes:
  - name: post_show
    path: /posts/{id}
    handler: show_post
    methods: [GET]
    requirements:
      id: '\d+'
  - name: post_by_slug
    path: /posts/{slug}
    handler: show_post_by_slug
  - name: post_format
    path: /posts/{id}.{_format}
    handler: show_post_formatted
    requirements:
      _format: 'json|xml'
    defaults:
      _format: json
"#;

/// Write `content` to a temp file with the given extension
pub fn write_temp(content: &str, ext: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("routebind_test_")
        .suffix(&format!(".{ext}"))
        .tempfile()
        .expect("temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}
