//! # ghostwire
//!
//! A WebDriver (JSON Wire Protocol) server for driving a headless browser
//! over HTTP. The server owns command routing, the single automation
//! session's state, structured error reporting and optional Selenium Grid
//! node registration; page rendering and script execution are delegated to
//! a browser engine behind the [`engine::BrowserEngine`] trait.
//!
//! ## Running the server
//!
//! ```bash
//! ghostwire --port=8910 --logLevel=DEBUG
//!
//! # As a Selenium Grid node:
//! ghostwire --ip=10.0.0.5 --port=8910 --hub=http://grid.local:4444
//! ```
//!
//! ## Library usage
//!
//! The wire router can be driven without a network listener, which is how
//! the integration tests exercise it:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ghostwire::config::Config;
//! use ghostwire::engine::{ChromeEngine, EngineOptions};
//! use ghostwire::handlers::AppContext;
//! use ghostwire::server;
//!
//! # fn main() -> ghostwire::engine::EngineResult<()> {
//! let engine = Arc::new(ChromeEngine::launch(EngineOptions::new())?);
//! let ctx = AppContext::new(Config::default(), engine);
//! let router = server::build_router();
//! # let _ = (ctx, router);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module overview
//!
//! - [`config`]: command-line flags and logger setup
//! - [`protocol`]: request/response envelope shapes
//! - [`router`]: compiled route patterns and ordered dispatch
//! - [`handlers`]: the command implementations, grouped by resource
//! - [`session`]: session state, timeouts and input tracking
//! - [`engine`]: the browser-engine seam and the Chrome adapter
//! - [`hub`]: Selenium Grid node registration
//! - [`server`]: HTTP transport glue
//!
//! One session per process: the design deliberately supports a single
//! concurrent automation session, and a second create is rejected while
//! one is live.

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod protocol;
pub mod router;
pub mod server;
pub mod session;

pub use config::Config;
pub use engine::{BrowserEngine, ChromeEngine, EngineError, EngineOptions, NullEngine};
pub use error::{WireError, WireResult};
pub use handlers::AppContext;
pub use protocol::{WireReply, WireRequest, WireResponse};
pub use router::Router;
pub use session::{Session, SessionRegistry, Timeouts};
