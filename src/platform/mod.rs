//! Platform interaction module
//!
//! This module provides the core functionality for talking to the automation
//! platform: the authenticated session, the HTTP wrapper, the job wire
//! model, and the execution engine that drives a script from submission to
//! a terminal outcome.
//!
//! # Module Structure
//!
//! - [`session`] - Immutable authenticated session (host, credential, tenant)
//! - [`http`] - HTTP utilities for the platform's REST endpoints
//! - [`process`] - Job ("process") wire model and status machine
//! - [`engine`] - Submit-and-poll execution engine
//!
//! # Example
//!
//! ```ignore
//! use flowbridge::platform::session::Session;
//!
//! async fn example(config: &flowbridge::config::ResolvedConfig) -> flowbridge::error::Result<()> {
//!     let session = Session::connect(config).await?;
//!     let identity = session.caller_identity().await?;
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod http;
pub mod process;
pub mod session;
