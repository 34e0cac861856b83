//! # Flowchart Core
//!
//! Document model and editing primitives for a flowchart editor.
//! Rendering lives in `flowchart-renderer`; this crate has no drawing code
//! and compiles to WASM unchanged.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               flowchart-core                │
//! ├─────────────────────────────────────────────┤
//! │  Document        │  CommandHistory          │
//! │  - Nodes / edges │  - Linear undo / redo    │
//! │  - Viewport      │  - Bounded FIFO          │
//! │  - Integrity     │  - Re-entrancy guard     │
//! ├─────────────────────────────────────────────┤
//! │  EventBus        │  Viewport                │
//! │  - Typed events  │  - World <-> screen      │
//! │  - Subscriptions │  - Zoom / pan / fit      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every mutation goes through [`Document`], which refuses to leave an edge
//! pointing at a missing node. Undoable edits are [`Command`]s executed by
//! [`CommandHistory`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod document;
pub mod error;
pub mod event;
pub mod geometry;
pub mod guard;
pub mod history;
pub mod model;
pub mod viewport;

pub use commands::{
    AddEdgeCommand, AddNodeCommand, BatchCommand, MoveNodeCommand, RemoveEdgeCommand,
    RemoveNodeCommand, UpdateEdgeCommand, UpdateNodeCommand,
};
pub use document::{validate, Document, DocumentSnapshot, ValidationIssue, ValidationReport};
pub use error::{EntityKind, FlowError, FlowResult};
pub use event::{
    ChangeAction, ChangeTarget, DataChange, DocumentEvent, EventBus, EventKind, Snapshot,
    SubscriptionId,
};
pub use geometry::{Point, Rect, Size};
pub use guard::{BusyState, GuardToken, ReentrancyGuard};
pub use history::{Command, CommandHistory, HistoryConfig, HistoryItem, DEFAULT_MAX_HISTORY_SIZE};
pub use model::{
    current_timestamp, EdgeData, EdgeId, EdgePatch, EdgeStyle, FlowchartData, Metadata, NodeData,
    NodeId, NodePatch, NodeStyle, DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH, FORMAT_VERSION,
};
pub use viewport::{clamp_scale, Viewport, ViewportChange, ViewportPatch, MAX_SCALE, MIN_SCALE};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
