//! # Saorsa Site Publish
//!
//! Turns a tree snapshot into a deployment and reports progress back to the
//! editor.
//!
//! ## Job lifecycle
//!
//! ```text
//!            request accepted            poll: completed
//!   idle ─────────────────────▶ publishing ───────────────▶ completed
//!     │                            │
//!     │ request rejected           │ poll: failed / persistent errors
//!     ▼                            ▼
//!   (no job)                     failed
//! ```
//!
//! Each accepted request gets its own poll loop and its own `watch` channel.
//! A newer publish for the same site cancels the older loop, and a loop
//! always stops at the configured ceiling.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod error;
pub mod job;
pub mod poller;
pub mod publisher;

pub use backend::{
    HttpPublishBackend, PublishAccepted, PublishBackend, PublishRequest, RetryConfig,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use error::{PublishError, PublishResult};
pub use job::{JobReport, JobStatus, PublishJob};
pub use poller::{spawn_poll, PollConfig, PollExit, PollHandle};
pub use publisher::Publisher;
