//! # CLI Module
//!
//! Command-line access to a route file, for checking declarations without
//! writing a program around them.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! List the extracted table in match order:
//!
//! ```bash
//! routebind routes --file config/routes.yaml
//! ```
//!
//! ### `match`
//!
//! Match a request and print the handler and bindings as JSON:
//!
//! ```bash
//! routebind match --file config/routes.yaml --method GET /posts/5
//! ```
//!
//! ### `url`
//!
//! Generate a URL from a named route; unused variables become the query
//! string:
//!
//! ```bash
//! routebind url --file config/routes.yaml post_show --var id=5 --var page=2
//! ```
//!
//! `--file` may be omitted when `ROUTEBIND_ROUTES_FILE` is set.

mod commands;


pub use commands::{execute, run_cli, Cli, Commands};
