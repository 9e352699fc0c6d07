//! Router core module - hot path for request routing.
//!
//! Matching walks the route table in declaration order and returns the first
//! route whose method set and compiled pattern accept the request. There is no
//! specificity ranking: an earlier declaration always shadows a later one.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::spec::{RouteDefinition, RouteTable};
use http::Method;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maximum number of path variables before heap allocation.
/// Most routes have ≤4 variables (e.g., /users/{user}/posts/{id}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated variable bindings for the hot path.
///
/// Variable names are `Arc<str>` shared with the route table; values are
/// per-request data decoded from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Default threshold above which a route match is logged as slow.
pub const DEFAULT_SLOW_MATCH: Duration = Duration::from_millis(1);

/// Result of successfully matching a request path to a route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    /// The matched route definition (shared with the route table)
    pub route: Arc<RouteDefinition>,
    /// Variable bindings: captured path variables in pattern order, followed
    /// by route defaults for variables the pattern does not carry
    pub path_params: ParamVec,
    /// Name of the handler that should process this request
    pub handler_name: String,
}

impl RouteMatch {
    /// Get a bound variable by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to a HashMap
    /// Note: This allocates - use get_path_param() in hot paths instead
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Failure of a reverse lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReverseError {
    /// No route carries this name
    NameNotFound { name: String },
    /// A placeholder has neither a supplied value nor a default
    MissingVariable { name: String, variable: String },
    /// A value violates the variable's requirement (or is empty)
    InvalidVariable {
        name: String,
        variable: String,
        value: String,
    },
}

impl fmt::Display for ReverseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReverseError::NameNotFound { name } => {
                write!(f, "no route named '{}'", name)
            }
            ReverseError::MissingVariable { name, variable } => {
                write!(
                    f,
                    "route '{}' requires variable '{}' which was not supplied",
                    name, variable
                )
            }
            ReverseError::InvalidVariable {
                name,
                variable,
                value,
            } => write!(
                f,
                "value '{}' for variable '{}' does not satisfy the requirements of route '{}'",
                value, variable, name
            ),
        }
    }
}

impl std::error::Error for ReverseError {}

/// Router that matches requests against a shared, read-only route table
///
/// Cloning is cheap: the table sits behind an `Arc` and is never mutated, so
/// any number of threads can route concurrently without locking.
#[derive(Debug, Clone)]
pub struct Router {
    table: Arc<RouteTable>,
    slow_match: Duration,
}

impl Router {
    /// Create a router over an extracted route table
    #[must_use]
    pub fn new(table: Arc<RouteTable>) -> Self {
        let summary: Vec<String> = table
            .definitions()
            .take(10)
            .map(|r| format!("{} {}", r.methods_label(), r.pattern))
            .collect();
        info!(
            routes_count = table.len(),
            routes_summary = ?summary,
            routing_algorithm = "ordered_scan",
            "Routing table loaded"
        );
        Self {
            table,
            slow_match: DEFAULT_SLOW_MATCH,
        }
    }

    /// Log matches slower than `threshold` at warn level
    #[must_use]
    pub fn with_slow_match_threshold(mut self, threshold: Duration) -> Self {
        self.slow_match = threshold;
        self
    }

    /// The route table this router reads from
    #[must_use]
    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    /// Render the route table, one route per line, in match order
    #[must_use]
    pub fn dump_routes(&self) -> String {
        let mut out = format!("[routes] count={}\n", self.table.len());
        for route in self.table.definitions() {
            out.push_str(&format!(
                "[route] {} {} -> {}{}\n",
                route.methods_label(),
                route.pattern,
                route.handler_name,
                route
                    .name
                    .as_deref()
                    .map(|n| format!(" (name={n})"))
                    .unwrap_or_default()
            ));
        }
        out
    }

    /// Match an HTTP request to a route
    ///
    /// Routes are tried in declaration order; the first one that accepts both
    /// the method and the full path wins. Method mismatches and trailing-slash
    /// differences are plain non-matches.
    ///
    /// # Returns
    ///
    /// * `Some(RouteMatch)` - If a matching route is found
    /// * `None` - If no route matches (results in 404)
    #[must_use]
    pub fn route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");

        let match_start = Instant::now();
        let found = self.table.iter().find_map(|compiled| {
            if !compiled.definition.allows(&method) {
                return None;
            }
            compiled
                .matcher
                .matches(path)
                .map(|params| (Arc::clone(&compiled.definition), params))
        });
        let match_duration = match_start.elapsed();

        let Some((route, mut params)) = found else {
            warn!(
                method = %method,
                path = %path,
                duration_us = match_duration.as_micros(),
                "No route matched"
            );
            return None;
        };

        for (variable, value) in &route.defaults {
            if !params.iter().any(|(k, _)| k.as_ref() == variable.as_str()) {
                params.push((Arc::from(variable.as_str()), value.clone()));
            }
        }

        let handler_name = route.handler_name.to_string();
        if match_duration > self.slow_match {
            warn!(
                method = %method,
                path = %path,
                handler_name = %handler_name,
                route_pattern = %route.pattern,
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            );
        } else {
            info!(
                method = %method,
                path = %path,
                handler_name = %handler_name,
                route_pattern = %route.pattern,
                path_params = ?params,
                duration_us = match_duration.as_micros(),
                "Route matched"
            );
        }

        Some(RouteMatch {
            route,
            path_params: params,
            handler_name,
        })
    }

    /// Generate the path of a named route
    ///
    /// Placeholders take their value from `variables`, falling back to the
    /// route's defaults. Values are checked against the route requirements and
    /// percent-encoded. Supplied variables that are not placeholders are
    /// appended as a query string in key order, unless they repeat a default
    /// value unchanged.
    ///
    /// The generated path must route back to the same placeholder values; a
    /// value that would bind differently (for instance one containing the
    /// separator of a mixed segment) is rejected.
    ///
    /// # Errors
    ///
    /// [`ReverseError::NameNotFound`] for an unknown name,
    /// [`ReverseError::MissingVariable`] when a placeholder cannot be filled and
    /// [`ReverseError::InvalidVariable`] when a value violates its requirement.
    pub fn url_for(
        &self,
        name: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String, ReverseError> {
        let compiled = self
            .table
            .get(name)
            .ok_or_else(|| ReverseError::NameNotFound {
                name: name.to_string(),
            })?;
        let route = &compiled.definition;
        let value_of = |var: &str| {
            variables
                .get(var)
                .or_else(|| route.defaults.get(var))
                .map(String::as_str)
        };

        for var in compiled.matcher.variables() {
            if let Some(value) = value_of(&**var) {
                if !compiled.matcher.accepts(&**var, value) {
                    return Err(ReverseError::InvalidVariable {
                        name: name.to_string(),
                        variable: var.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }

        let mut path =
            compiled
                .matcher
                .expand(value_of)
                .map_err(|variable| ReverseError::MissingVariable {
                    name: name.to_string(),
                    variable: variable.to_string(),
                })?;

        // a value containing a literal of its segment can bind differently
        let rebound = compiled.matcher.matches(&path);
        for var in compiled.matcher.variables() {
            let expected = value_of(&**var);
            let actual = rebound.as_ref().and_then(|params| {
                params
                    .iter()
                    .find(|(k, _)| k == var)
                    .map(|(_, v)| v.as_str())
            });
            if actual != expected {
                return Err(ReverseError::InvalidVariable {
                    name: name.to_string(),
                    variable: var.to_string(),
                    value: expected.unwrap_or_default().to_string(),
                });
            }
        }

        let extras: BTreeMap<&str, &str> = variables
            .iter()
            .filter(|(k, v)| {
                route.defaults.get(k.as_str()) != Some(*v)
                    && !compiled.matcher.variables().iter().any(|var| &**var == k.as_str())
            })
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if !extras.is_empty() {
            let query: Vec<String> = extras
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            path.push('?');
            path.push_str(&query.join("&"));
        }

        debug!(route_name = %name, path = %path, "Reverse lookup");
        Ok(path)
    }

    /// Convenience form of [`Router::url_for`] taking `(name, value)` pairs
    ///
    /// # Errors
    ///
    /// Same as [`Router::url_for`].
    pub fn url_for_params(&self, name: &str, params: &[(&str, &str)]) -> Result<String, ReverseError> {
        let map: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.url_for(name, &map)
    }
}
