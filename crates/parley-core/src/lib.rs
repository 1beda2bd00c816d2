//! parley-core library.
//!
//! Resolves a branching dialogue database (conversations, lines, links)
//! into a navigable transcript, optionally merged with a translation
//! overlay.
//!
//! ```rust,ignore
//! use parley_core::config::DisplayConfig;
//! use parley_core::graph::DialogueGraph;
//! use parley_core::model::RawDatabase;
//! use parley_core::overlay::NoOverlay;
//! use parley_core::session::NavigationSession;
//! use parley_core::text::TextResolver;
//!
//! let graph = DialogueGraph::from_raw(RawDatabase::from_path(path)?)?;
//! let resolver = TextResolver::new(&graph, &NoOverlay, DisplayConfig::default());
//! let mut session = NavigationSession::new(resolver);
//! session.start_by_ref("1a2b3c4d")?;
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod overlay;
pub mod session;
pub mod text;
pub mod timing;

/// # Conventions
///
/// - **Errors**: `thiserror` enums in this crate, each mapping to an
///   [`error::ErrorCode`]; `anyhow::Result` only for config file handling.
/// - **Logging**: `tracing` macros. `debug!` for traversal decisions,
///   `info!` for loads, `warn!` for recovered problems.
pub use error::ErrorCode;
pub use graph::{DialogueGraph, GraphBuilder, GraphError};
pub use model::{Node, NodeId, NodeKind, ShortId, StringId};
pub use session::{NavigationSession, Outcome, SessionError};
pub use text::TextResolver;
