//! Tests for route matching and reverse lookup over tables loaded from route
//! files.
//!
//! # Test Coverage
//!
//! - Exact variable bindings, including mixed segments and percent-decoding
//! - Declaration-order precedence between overlapping patterns
//! - Requirement violations falling through to later routes or to no match
//! - Method and trailing-slash mismatches
//! - `url_for` then `route` round trips, including rejected rebindings
//! - Concurrent matching against one shared table

mod common;

use common::BLOG_ROUTES_YAML;
use http::Method;
use routebind::router::{ReverseError, RouteMatch, Router};
use routebind::spec::{extract_routes, parse_route_file, HandlerDescriptor, RouteMetadata};
use std::collections::HashMap;
use std::sync::Arc;

fn blog_router() -> Router {
    let descriptors = parse_route_file(BLOG_ROUTES_YAML, true)
        .unwrap()
        .into_descriptors()
        .unwrap();
    Router::new(Arc::new(extract_routes(&descriptors).unwrap()))
}

fn router_for(handlers: &[HandlerDescriptor]) -> Router {
    Router::new(Arc::new(extract_routes(handlers).unwrap()))
}

fn params(m: &RouteMatch) -> Vec<(String, String)> {
    m.path_params
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn assert_route_match(router: &Router, method: Method, path: &str, expected_route: &str) {
    let result = router.route(method.clone(), path);
    match result {
        Some(m) => assert_eq!(
            m.route.name.as_deref(),
            Some(expected_route),
            "Route mismatch for {} {}",
            method,
            path
        ),
        None => assert_eq!(
            expected_route, "<none>",
            "Expected route to match for {} {}",
            method, path
        ),
    }
}

#[test]
fn test_exact_bindings() {
    let router = blog_router();
    let m = router.route(Method::GET, "/posts/42").unwrap();
    assert_eq!(m.handler_name, "show_post");
    assert_eq!(params(&m), vec![("id".to_string(), "42".to_string())]);
}

#[test]
fn test_unrelated_paths_do_not_match() {
    let router = blog_router();
    assert_route_match(&router, Method::GET, "/", "<none>");
    assert_route_match(&router, Method::GET, "/posts", "<none>");
    assert_route_match(&router, Method::GET, "/posts/5/comments", "<none>");
    assert_route_match(&router, Method::GET, "/users/5", "<none>");
}

#[test]
fn test_requirement_violation_falls_through_in_order() {
    let router = blog_router();
    assert_route_match(&router, Method::GET, "/posts/5", "post_show");
    assert_route_match(&router, Method::GET, "/posts/hello", "post_by_slug");
    // post_by_slug is declared before post_format and accepts any segment
    assert_route_match(&router, Method::GET, "/posts/5.json", "post_by_slug");
}

#[test]
fn test_method_restriction_falls_through() {
    let router = blog_router();
    // post_show is GET-only; the unrestricted slug route takes the request
    let m = router.route(Method::DELETE, "/posts/5").unwrap();
    assert_eq!(m.route.name.as_deref(), Some("post_by_slug"));
    assert_eq!(m.get_path_param("slug"), Some("5"));
}

#[test]
fn test_declaration_order_decides_overlap() {
    let first = router_for(&[
        HandlerDescriptor::new("by_id").route(RouteMetadata::new("/items/{id}")),
        HandlerDescriptor::new("by_name").route(RouteMetadata::new("/items/{name}")),
    ]);
    assert_eq!(first.route(Method::GET, "/items/x").unwrap().handler_name, "by_id");

    let swapped = router_for(&[
        HandlerDescriptor::new("by_name").route(RouteMetadata::new("/items/{name}")),
        HandlerDescriptor::new("by_id").route(RouteMetadata::new("/items/{id}")),
    ]);
    assert_eq!(swapped.route(Method::GET, "/items/x").unwrap().handler_name, "by_name");
}

#[test]
fn test_literal_route_declared_first_wins() {
    let router = router_for(&[
        HandlerDescriptor::new("new_form").route(RouteMetadata::new("/posts/new")),
        HandlerDescriptor::new("show").route(RouteMetadata::new("/posts/{id}")),
    ]);
    assert_eq!(router.route(Method::GET, "/posts/new").unwrap().handler_name, "new_form");
    assert_eq!(router.route(Method::GET, "/posts/7").unwrap().handler_name, "show");
}

#[test]
fn test_requirement_violation_is_no_match() {
    let router = router_for(&[HandlerDescriptor::new("show")
        .route(RouteMetadata::new("/posts/{id}").requirement("id", r"\d+"))]);
    assert!(router.route(Method::GET, "/posts/abc").is_none());
    assert!(router.route(Method::GET, "/posts/12a").is_none());
}

#[test]
fn test_trailing_slash_is_significant() {
    let router = blog_router();
    assert!(router.route(Method::GET, "/posts/5/").is_none());
}

#[test]
fn test_mixed_segment_bindings() {
    let router = router_for(&[HandlerDescriptor::new("show").route(
        RouteMetadata::new("/posts/{id}.{_format}")
            .requirement("_format", "json|xml"),
    )]);
    let m = router.route(Method::GET, "/posts/5.json").unwrap();
    assert_eq!(
        params(&m),
        vec![
            ("id".to_string(), "5".to_string()),
            ("_format".to_string(), "json".to_string())
        ]
    );
    assert!(router.route(Method::GET, "/posts/5.html").is_none());
}

#[test]
fn test_percent_decoded_bindings() {
    let router = blog_router();
    let m = router.route(Method::GET, "/posts/hello%20world").unwrap();
    assert_eq!(m.get_path_param("slug"), Some("hello world"));
}

#[test]
fn test_defaults_appear_in_bindings() {
    let router = router_for(&[HandlerDescriptor::new("list").route(
        RouteMetadata::new("/feed").default_value("_format", "rss"),
    )]);
    let m = router.route(Method::GET, "/feed").unwrap();
    assert_eq!(m.get_path_param("_format"), Some("rss"));
}

#[test]
fn test_url_for_then_route_round_trips() {
    let router = blog_router();
    let cases: Vec<(&str, Vec<(&str, &str)>)> = vec![
        ("post_show", vec![("id", "5")]),
        ("post_by_slug", vec![("slug", "hello world")]),
        ("post_by_slug", vec![("slug", "caf\u{e9}")]),
    ];
    for (name, vars) in cases {
        let url = router.url_for_params(name, &vars).unwrap();
        let m = router.route(Method::GET, &url).unwrap();
        assert_eq!(m.route.name.as_deref(), Some(name), "round trip of {url}");
        for (k, v) in vars {
            assert_eq!(m.get_path_param(k), Some(v));
        }
    }
}

#[test]
fn test_url_for_uses_defaults() {
    let router = blog_router();
    assert_eq!(
        router.url_for_params("post_format", &[("id", "5")]).unwrap(),
        "/posts/5.json"
    );
    assert_eq!(
        router
            .url_for_params("post_format", &[("id", "5"), ("_format", "xml")])
            .unwrap(),
        "/posts/5.xml"
    );
}

#[test]
fn test_url_for_errors() {
    let router = blog_router();
    assert_eq!(
        router.url_for("missing", &HashMap::new()),
        Err(ReverseError::NameNotFound {
            name: "missing".to_string()
        })
    );
    assert!(matches!(
        router.url_for("post_show", &HashMap::new()),
        Err(ReverseError::MissingVariable { ref variable, .. }) if variable == "id"
    ));
    assert!(matches!(
        router.url_for_params("post_show", &[("id", "abc")]),
        Err(ReverseError::InvalidVariable { .. })
    ));
    assert!(matches!(
        router.url_for_params("post_format", &[("id", "5"), ("_format", "html")]),
        Err(ReverseError::InvalidVariable { .. })
    ));
}

#[test]
fn test_url_for_appends_extra_variables_as_query() {
    let router = blog_router();
    assert_eq!(
        router
            .url_for_params("post_show", &[("id", "5"), ("page", "2"), ("sort", "new")])
            .unwrap(),
        "/posts/5?page=2&sort=new"
    );
}

#[test]
fn test_url_for_keeps_values_that_override_defaults() {
    let router = router_for(&[HandlerDescriptor::new("archive").route(
        RouteMetadata::new("/archive/{year}")
            .name("archive")
            .default_value("_locale", "en"),
    )]);
    assert_eq!(
        router
            .url_for_params("archive", &[("year", "2024"), ("_locale", "fr")])
            .unwrap(),
        "/archive/2024?_locale=fr"
    );
    assert_eq!(
        router
            .url_for_params("archive", &[("year", "2024"), ("_locale", "en")])
            .unwrap(),
        "/archive/2024"
    );

    let url = router
        .url_for_params("archive", &[("year", "2024"), ("_locale", "fr")])
        .unwrap();
    let m = router.route(Method::GET, &url).unwrap();
    assert_eq!(m.get_path_param("year"), Some("2024"));
}

#[test]
fn test_url_for_rejects_values_that_rebind_mixed_segments() {
    let router = router_for(&[HandlerDescriptor::new("range")
        .route(RouteMetadata::new("/f/{a}-{b}").name("f"))]);

    assert_eq!(router.url_for_params("f", &[("a", "x"), ("b", "y")]).unwrap(), "/f/x-y");
    assert!(matches!(
        router.url_for_params("f", &[("a", "x"), ("b", "y-z")]),
        Err(ReverseError::InvalidVariable { ref variable, ref value, .. })
            if variable == "a" && value == "x"
    ));

    // the first capture is greedy, so a separator there still binds back
    let url = router.url_for_params("f", &[("a", "x-w"), ("b", "y")]).unwrap();
    let m = router.route(Method::GET, &url).unwrap();
    assert_eq!(m.get_path_param("a"), Some("x-w"));
    assert_eq!(m.get_path_param("b"), Some("y"));
}

#[test]
fn test_matching_is_idempotent() {
    let router = blog_router();
    let first = router.route(Method::GET, "/posts/5");
    for _ in 0..10 {
        assert_eq!(router.route(Method::GET, "/posts/5"), first);
    }
}

#[test]
fn test_concurrent_matching() {
    let router = blog_router();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let router = router.clone();
            std::thread::spawn(move || {
                for j in 0..200 {
                    let id = (i * 1000 + j).to_string();
                    let m = router.route(Method::GET, &format!("/posts/{id}")).unwrap();
                    assert_eq!(m.get_path_param("id"), Some(id.as_str()));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_dump_routes_lists_in_order() {
    let dump = blog_router().dump_routes();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines[0], "[routes] count=3");
    assert_eq!(lines[1], "[route] GET /posts/{id} -> show_post (name=post_show)");
    assert_eq!(lines[2], "[route] ANY /posts/{slug} -> show_post_by_slug (name=post_by_slug)");
}
