//! Persisted document types: nodes, edges, metadata and the aggregate
//! [`FlowchartData`].

use std::fmt;
#[cfg(not(all(feature = "wasm", target_arch = "wasm32")))]
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Point, Rect, Size, Viewport};

/// Format version written into new documents.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Default node width when none is given.
pub const DEFAULT_NODE_WIDTH: f64 = 100.0;

/// Default node height when none is given.
pub const DEFAULT_NODE_HEIGHT: f64 = 60.0;

/// Milliseconds since the Unix epoch.
#[cfg(not(all(feature = "wasm", target_arch = "wasm32")))]
#[must_use]
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Milliseconds since the Unix epoch.
///
/// `SystemTime` is unavailable in the browser, so this reads `Date.now()`.
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn current_timestamp() -> u64 {
    js_sys::Date::now() as u64
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random (UUID v4) id.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Borrow as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(
    /// Unique identifier of a node.
    NodeId
);

string_id!(
    /// Unique identifier of an edge.
    EdgeId
);

/// Visual overrides for a node. Unset fields fall back to the theme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    /// Fill color (CSS syntax).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    /// Stroke color (CSS syntax).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    /// Stroke width in world units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    /// Label font size in world units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

/// Visual overrides for an edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    /// Stroke color (CSS syntax).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    /// Stroke width in world units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    /// Dash pattern; empty means solid.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dash: Vec<f64>,
}

fn default_node_kind() -> String {
    "process".to_string()
}

fn default_edge_kind() -> String {
    "straight".to_string()
}

fn default_node_size() -> Size {
    Size::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT)
}

/// A flowchart node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Unique, immutable identity.
    pub id: NodeId,
    /// Shape kind (`start`, `process`, `decision`, ...).
    #[serde(rename = "type", default = "default_node_kind")]
    pub kind: String,
    /// Display text.
    #[serde(default)]
    pub label: String,
    /// Top-left corner in world coordinates.
    #[serde(default)]
    pub position: Point,
    /// Extent in world units.
    #[serde(default = "default_node_size")]
    pub size: Size,
    /// Visual overrides.
    #[serde(default)]
    pub style: NodeStyle,
    /// Shape-specific fields, opaque to the document.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl NodeData {
    /// A default-sized `process` node at the origin.
    #[must_use]
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            kind: default_node_kind(),
            label: String::new(),
            position: Point::default(),
            size: default_node_size(),
            style: NodeStyle::default(),
            properties: Map::new(),
        }
    }

    /// Set the shape kind.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Point::new(x, y);
        self
    }

    /// Set the size.
    #[must_use]
    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.size = Size::new(width, height);
        self
    }

    /// World-space bounding box.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    /// Unique, immutable identity.
    pub id: EdgeId,
    /// Node the edge leaves from.
    pub source: NodeId,
    /// Node the edge arrives at.
    pub target: NodeId,
    /// Routing kind (`straight`, `orthogonal`, `bezier`).
    #[serde(rename = "type", default = "default_edge_kind")]
    pub kind: String,
    /// Display text.
    #[serde(default)]
    pub label: String,
    /// Intermediate routing points in world coordinates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Point>,
    /// Visual overrides.
    #[serde(default)]
    pub style: EdgeStyle,
    /// Kind-specific fields, opaque to the document.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl EdgeData {
    /// A `straight` edge from `source` to `target`.
    #[must_use]
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: default_edge_kind(),
            label: String::new(),
            waypoints: Vec::new(),
            style: EdgeStyle::default(),
            properties: Map::new(),
        }
    }

    /// Set the routing kind.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Whether either endpoint is `node`.
    #[must_use]
    pub fn touches(&self, node: &NodeId) -> bool {
        self.source == *node || self.target == *node
    }
}

/// Partial node update. There is deliberately no `id` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    /// New shape kind.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// New label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// New position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    /// New size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// Replacement style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
    /// Replacement property map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl NodePatch {
    /// Patch that moves a node.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            position: Some(Point::new(x, y)),
            ..Self::default()
        }
    }

    /// Patch that relabels a node.
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Patch that turns any node back into exactly `node` (except its id).
    #[must_use]
    pub fn restore(node: &NodeData) -> Self {
        Self {
            kind: Some(node.kind.clone()),
            label: Some(node.label.clone()),
            position: Some(node.position),
            size: Some(node.size),
            style: Some(node.style.clone()),
            properties: Some(node.properties.clone()),
        }
    }

    /// Write the set fields into `node`.
    pub fn apply_to(&self, node: &mut NodeData) {
        if let Some(kind) = &self.kind {
            node.kind.clone_from(kind);
        }
        if let Some(label) = &self.label {
            node.label.clone_from(label);
        }
        if let Some(position) = self.position {
            node.position = position;
        }
        if let Some(size) = self.size {
            node.size = size;
        }
        if let Some(style) = &self.style {
            node.style = style.clone();
        }
        if let Some(properties) = &self.properties {
            node.properties = properties.clone();
        }
    }
}

/// Partial edge update. There is deliberately no `id` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgePatch {
    /// New source node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<NodeId>,
    /// New target node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
    /// New routing kind.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// New label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Replacement waypoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoints: Option<Vec<Point>>,
    /// Replacement style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<EdgeStyle>,
    /// Replacement property map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl EdgePatch {
    /// Patch that reconnects an edge.
    #[must_use]
    pub fn endpoints(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Patch that turns any edge back into exactly `edge` (except its id).
    #[must_use]
    pub fn restore(edge: &EdgeData) -> Self {
        Self {
            source: Some(edge.source.clone()),
            target: Some(edge.target.clone()),
            kind: Some(edge.kind.clone()),
            label: Some(edge.label.clone()),
            waypoints: Some(edge.waypoints.clone()),
            style: Some(edge.style.clone()),
            properties: Some(edge.properties.clone()),
        }
    }

    /// Write the set fields into `edge`.
    pub fn apply_to(&self, edge: &mut EdgeData) {
        if let Some(source) = &self.source {
            edge.source = source.clone();
        }
        if let Some(target) = &self.target {
            edge.target = target.clone();
        }
        if let Some(kind) = &self.kind {
            edge.kind.clone_from(kind);
        }
        if let Some(label) = &self.label {
            edge.label.clone_from(label);
        }
        if let Some(waypoints) = &self.waypoints {
            edge.waypoints.clone_from(waypoints);
        }
        if let Some(style) = &self.style {
            edge.style = style.clone();
        }
        if let Some(properties) = &self.properties {
            edge.properties = properties.clone();
        }
    }
}

/// Document bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    /// Format version.
    pub version: String,
    /// Creation time, ms since epoch.
    pub created_at: u64,
    /// Last mutation time, ms since epoch.
    pub updated_at: u64,
    /// Free-form fields (title, author, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Metadata {
    fn default() -> Self {
        let now = current_timestamp();
        Self {
            version: FORMAT_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }
}

/// The full persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowchartData {
    /// All nodes, in insertion order.
    pub nodes: Vec<NodeData>,
    /// All edges, in insertion order.
    pub edges: Vec<EdgeData>,
    /// Saved view transform.
    #[serde(default)]
    pub viewport: Viewport,
    /// Bookkeeping.
    #[serde(default)]
    pub metadata: Metadata,
}
