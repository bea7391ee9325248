//! flowbridge - typed resource CRUD over a script-driven automation platform
//!
//! The platform this crate talks to exposes no direct CRUD API, only an
//! authentication/session probe and an asynchronous job service: submit
//! script source written in the platform's workflow language, poll for
//! completion, read named outputs. flowbridge bridges the two worlds - it
//! synthesizes script source for each logical operation, runs it as a job
//! with bounded polling, decodes the double-JSON-encoded output channel
//! into typed resources, classifies free-text remote errors, and carries
//! the bespoke retry loops for eventual-consistency and teardown races.
//!
//! The per-resource-type schemas live with the caller: they hand this crate
//! `(namespace, type, fields, filters)` and get back typed resources or a
//! classified error.
//!
//! ```ignore
//! use flowbridge::{Adapter, Config, Locator, Session};
//!
//! async fn example() -> flowbridge::error::Result<()> {
//!     let config = Config::load().resolve()?;
//!     let adapter = Adapter::new(Session::connect(&config).await?);
//!     let machine = adapter
//!         .get(&Locator::new("cloud").with_href("/api/machines/42"))
//!         .await?;
//!     println!("{}", machine.fields["name"]);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod fields;
pub mod platform;
pub mod resource;
pub mod script;

pub use config::Config;
pub use error::{Classifier, Error, Result};
pub use fields::{sanitize, Fields};
pub use platform::process::{Process, ProcessStatus};
pub use platform::session::Session;
pub use resource::{Adapter, Locator, Resource};
pub use script::{CompositeSpec, NamedParameter, Parameter};
