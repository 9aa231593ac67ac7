//! # Saorsa Site Core
//!
//! Data model and pure logic of the visual site builder.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  site-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Registry        │  Element Tree            │
//! │  - Descriptors   │  - Pure mutations        │
//! │  - Capabilities  │  - Validation            │
//! ├─────────────────────────────────────────────┤
//! │  Resolver        │  Editor Session          │
//! │  - Viewports     │  - Inline edit buffer    │
//! │  - Layout specs  │  - Undo / redo           │
//! ├─────────────────────────────────────────────┤
//! │  Site Document   │  Tree Store              │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod edit;
pub mod element;
pub mod error;
pub mod history;
pub mod registry;
pub mod resolve;
pub mod schema;
pub mod session;
pub mod store;
pub mod tree;

pub use edit::{EditOutcome, InlineEdit};
pub use element::{Element, ElementId, Props, Viewport};
pub use error::{CoreError, CoreResult};
pub use history::{History, DEFAULT_HISTORY_DEPTH};
pub use registry::{ComponentDescriptor, ComponentRegistry, DefaultSize, RenderKind};
pub use resolve::{resolve_props, LayoutSpec, Resolved};
pub use schema::SiteDocument;
pub use session::EditorSession;
pub use store::{StoreError, StoreResult, TreeRepository, TreeStore};
pub use tree::ElementTree;

/// Site core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
