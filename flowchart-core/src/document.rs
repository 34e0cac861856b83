//! The document model: sole owner of nodes, edges, viewport and metadata.
//!
//! Referential integrity is enforced on every write path:
//!
//! - `add_edge`/`update_edge` refuse endpoints that do not resolve to a node;
//! - `remove_node` cascades to every incident edge before removing the node;
//! - `import_data`/`load_data` reject documents that fail validation and
//!   leave the current document untouched.
//!
//! Node and edge storage is shared copy-on-write with outstanding
//! [`DocumentSnapshot`]s, so taking a snapshot is O(1) and the first
//! mutation after a snapshot pays for a single clone.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::event::{ChangeAction, ChangeTarget, DataChange, DocumentEvent, Snapshot};
use crate::{
    current_timestamp, EdgeData, EdgeId, EdgePatch, EntityKind, EventBus, EventKind, FlowError,
    FlowResult, FlowchartData, Metadata, NodeData, NodeId, NodePatch, Rect, SubscriptionId,
    Viewport, ViewportChange, ViewportPatch,
};

/// Cheap, immutable view of a document at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    nodes: Arc<Vec<NodeData>>,
    edges: Arc<Vec<EdgeData>>,
    viewport: Viewport,
    metadata: Metadata,
}

impl DocumentSnapshot {
    /// Nodes at snapshot time.
    #[must_use]
    pub fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }

    /// Edges at snapshot time.
    #[must_use]
    pub fn edges(&self) -> &[EdgeData] {
        &self.edges
    }

    /// Viewport at snapshot time.
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Metadata at snapshot time.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Owned copy of the full document.
    #[must_use]
    pub fn to_data(&self) -> FlowchartData {
        FlowchartData {
            nodes: self.nodes.as_ref().clone(),
            edges: self.edges.as_ref().clone(),
            viewport: self.viewport,
            metadata: self.metadata.clone(),
        }
    }
}

/// One structural problem found by [`Document::validate_data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationIssue {
    /// Two nodes share an id.
    DuplicateNodeId {
        /// The repeated id.
        id: NodeId,
    },
    /// Two edges share an id.
    DuplicateEdgeId {
        /// The repeated id.
        id: EdgeId,
    },
    /// An edge's source does not resolve.
    MissingSource {
        /// The dangling edge.
        edge: EdgeId,
        /// The unresolved node id.
        node: NodeId,
    },
    /// An edge's target does not resolve.
    MissingTarget {
        /// The dangling edge.
        edge: EdgeId,
        /// The unresolved node id.
        node: NodeId,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNodeId { id } => write!(f, "duplicate node id {id}"),
            Self::DuplicateEdgeId { id } => write!(f, "duplicate edge id {id}"),
            Self::MissingSource { edge, node } => {
                write!(f, "edge {edge}: source node {node} does not exist")
            }
            Self::MissingTarget { edge, node } => {
                write!(f, "edge {edge}: target node {node} does not exist")
            }
        }
    }
}

/// Result of a consistency audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// True when `errors` is empty.
    pub valid: bool,
    /// Every issue found, in discovery order.
    pub errors: Vec<ValidationIssue>,
}

/// Audit a set of nodes and edges without touching any document.
#[must_use]
pub fn validate(nodes: &[NodeData], edges: &[EdgeData]) -> ValidationReport {
    let mut errors = Vec::new();

    let mut node_ids = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !node_ids.insert(node.id.as_str()) {
            errors.push(ValidationIssue::DuplicateNodeId {
                id: node.id.clone(),
            });
        }
    }

    let mut edge_ids = HashSet::with_capacity(edges.len());
    for edge in edges {
        if !edge_ids.insert(edge.id.as_str()) {
            errors.push(ValidationIssue::DuplicateEdgeId {
                id: edge.id.clone(),
            });
        }
        if !node_ids.contains(edge.source.as_str()) {
            errors.push(ValidationIssue::MissingSource {
                edge: edge.id.clone(),
                node: edge.source.clone(),
            });
        }
        if !node_ids.contains(edge.target.as_str()) {
            errors.push(ValidationIssue::MissingTarget {
                edge: edge.id.clone(),
                node: edge.target.clone(),
            });
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

/// The flowchart document.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Arc<Vec<NodeData>>,
    edges: Arc<Vec<EdgeData>>,
    viewport: Viewport,
    metadata: Metadata,
    events: EventBus,
}

impl Document {
    /// An empty document with fresh metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A document initialized from `data`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Format`] if `data` fails validation.
    pub fn from_data(data: FlowchartData) -> FlowResult<Self> {
        let mut doc = Self::new();
        doc.load_data(data)?;
        Ok(doc)
    }

    // ─── Events ─────────────────────────────────────────────────────────

    /// Subscribe to one kind of event.
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        self.events.on(kind, handler)
    }

    /// Subscribe to every event.
    pub fn on_any<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        self.events.on_any(handler)
    }

    /// Unsubscribe.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }

    /// Publish an event on the document's channel.
    ///
    /// Used by the command history so that history and data events share a
    /// single surface.
    pub fn emit(&mut self, event: &DocumentEvent) {
        self.events.emit(event);
    }

    /// Drop every listener. The command history is owned separately; use
    /// [`CommandHistory::destroy`](crate::CommandHistory::destroy) to clear
    /// both in one call.
    pub fn destroy(&mut self) {
        self.events.clear();
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }

    fn publish(&mut self, change: DataChange, specific: DocumentEvent) {
        self.metadata.updated_at = current_timestamp();
        self.events.emit(&DocumentEvent::DataChange(change));
        self.events.emit(&specific);
    }

    // ─── Nodes ──────────────────────────────────────────────────────────

    /// All nodes, in document order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }

    /// Look up a node.
    #[must_use]
    pub fn get_node(&self, id: impl AsRef<str>) -> Option<&NodeData> {
        let id = id.as_ref();
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }

    /// Position of a node in document order.
    #[must_use]
    pub fn node_index(&self, id: impl AsRef<str>) -> Option<usize> {
        let id = id.as_ref();
        self.nodes.iter().position(|n| n.id.as_str() == id)
    }

    /// Whether a node exists.
    #[must_use]
    pub fn has_node(&self, id: impl AsRef<str>) -> bool {
        self.node_index(id).is_some()
    }

    /// Append a node.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::DuplicateId`] if the id is taken.
    pub fn add_node(&mut self, node: NodeData) -> FlowResult<()> {
        let end = self.nodes.len();
        self.insert_node(end, node)
    }

    /// Insert a node at `index` (clamped to the end). Undo uses this to put a
    /// removed node back where it was.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::DuplicateId`] if the id is taken.
    pub fn insert_node(&mut self, index: usize, node: NodeData) -> FlowResult<()> {
        if self.has_node(&node.id) {
            return Err(FlowError::duplicate(EntityKind::Node, node.id.as_str()));
        }
        let nodes = Arc::make_mut(&mut self.nodes);
        let index = index.min(nodes.len());
        nodes.insert(index, node.clone());
        tracing::trace!(node = %node.id, index, "node added");
        self.publish(
            DataChange {
                target: ChangeTarget::Node,
                action: ChangeAction::Add,
                data: Snapshot::Node(node.clone()),
                old_data: None,
            },
            DocumentEvent::NodeAdd(node),
        );
        Ok(())
    }

    /// Apply a partial update. The id can never change.
    ///
    /// Returns the updated node.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::NotFound`] if the node does not exist.
    pub fn update_node(&mut self, id: impl AsRef<str>, patch: &NodePatch) -> FlowResult<NodeData> {
        let id = id.as_ref();
        let index = self
            .node_index(id)
            .ok_or_else(|| FlowError::not_found(EntityKind::Node, id))?;
        let nodes = Arc::make_mut(&mut self.nodes);
        let old = nodes[index].clone();
        patch.apply_to(&mut nodes[index]);
        let new = nodes[index].clone();
        tracing::trace!(node = %new.id, "node updated");
        self.publish(
            DataChange {
                target: ChangeTarget::Node,
                action: ChangeAction::Update,
                data: Snapshot::Node(new.clone()),
                old_data: Some(Snapshot::Node(old.clone())),
            },
            DocumentEvent::NodeUpdate {
                old,
                new: new.clone(),
            },
        );
        Ok(new)
    }

    /// Remove a node and every edge attached to it.
    ///
    /// Each cascaded edge emits its own `EdgeRemove` before the node's
    /// `NodeRemove`. Returns `false` if the node does not exist.
    pub fn remove_node(&mut self, id: impl AsRef<str>) -> bool {
        let id = id.as_ref();
        let Some(index) = self.node_index(id) else {
            return false;
        };
        let incident: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|e| e.source.as_str() == id || e.target.as_str() == id)
            .map(|e| e.id.clone())
            .collect();
        for edge_id in &incident {
            self.remove_edge(edge_id);
        }

        let node = Arc::make_mut(&mut self.nodes).remove(index);
        tracing::trace!(node = %node.id, cascaded = incident.len(), "node removed");
        self.publish(
            DataChange {
                target: ChangeTarget::Node,
                action: ChangeAction::Remove,
                data: Snapshot::Node(node.clone()),
                old_data: None,
            },
            DocumentEvent::NodeRemove(node),
        );
        true
    }

    /// World-space bounds of a node.
    #[must_use]
    pub fn node_bounds(&self, id: impl AsRef<str>) -> Option<Rect> {
        self.get_node(id).map(NodeData::bounds)
    }

    /// Union of every node's bounds, or `None` for an empty document.
    #[must_use]
    pub fn content_bounds(&self) -> Option<Rect> {
        self.nodes
            .iter()
            .map(NodeData::bounds)
            .reduce(|acc, r| acc.union(&r))
    }

    // ─── Edges ──────────────────────────────────────────────────────────

    /// All edges, in document order.
    #[must_use]
    pub fn edges(&self) -> &[EdgeData] {
        &self.edges
    }

    /// Look up an edge.
    #[must_use]
    pub fn get_edge(&self, id: impl AsRef<str>) -> Option<&EdgeData> {
        let id = id.as_ref();
        self.edges.iter().find(|e| e.id.as_str() == id)
    }

    /// Position of an edge in document order.
    #[must_use]
    pub fn edge_index(&self, id: impl AsRef<str>) -> Option<usize> {
        let id = id.as_ref();
        self.edges.iter().position(|e| e.id.as_str() == id)
    }

    /// Edges attached to a node, with their document positions.
    pub fn incident_edges<'a>(
        &'a self,
        node: &'a NodeId,
    ) -> impl Iterator<Item = (usize, &'a EdgeData)> + 'a {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.touches(node))
    }

    fn check_endpoints(&self, edge: &EdgeData) -> FlowResult<()> {
        if !self.has_node(&edge.source) {
            return Err(FlowError::not_found(
                EntityKind::SourceNode,
                edge.source.as_str(),
            ));
        }
        if !self.has_node(&edge.target) {
            return Err(FlowError::not_found(
                EntityKind::TargetNode,
                edge.target.as_str(),
            ));
        }
        Ok(())
    }

    /// Append an edge.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::DuplicateId`] if the id is taken, or
    /// [`FlowError::NotFound`] if either endpoint is not a node.
    pub fn add_edge(&mut self, edge: EdgeData) -> FlowResult<()> {
        let end = self.edges.len();
        self.insert_edge(end, edge)
    }

    /// Insert an edge at `index` (clamped to the end).
    ///
    /// # Errors
    ///
    /// Same as [`Document::add_edge`].
    pub fn insert_edge(&mut self, index: usize, edge: EdgeData) -> FlowResult<()> {
        if self.edge_index(&edge.id).is_some() {
            return Err(FlowError::duplicate(EntityKind::Edge, edge.id.as_str()));
        }
        self.check_endpoints(&edge)?;
        let edges = Arc::make_mut(&mut self.edges);
        let index = index.min(edges.len());
        edges.insert(index, edge.clone());
        tracing::trace!(edge = %edge.id, source = %edge.source, target = %edge.target, "edge added");
        self.publish(
            DataChange {
                target: ChangeTarget::Edge,
                action: ChangeAction::Add,
                data: Snapshot::Edge(edge.clone()),
                old_data: None,
            },
            DocumentEvent::EdgeAdd(edge),
        );
        Ok(())
    }

    /// Apply a partial update; the resulting endpoints must resolve.
    ///
    /// Returns the updated edge.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::NotFound`] if the edge or either resulting
    /// endpoint does not exist. The edge is unchanged on error.
    pub fn update_edge(&mut self, id: impl AsRef<str>, patch: &EdgePatch) -> FlowResult<EdgeData> {
        let id = id.as_ref();
        let index = self
            .edge_index(id)
            .ok_or_else(|| FlowError::not_found(EntityKind::Edge, id))?;
        let old = self.edges[index].clone();
        let mut new = old.clone();
        patch.apply_to(&mut new);
        self.check_endpoints(&new)?;

        Arc::make_mut(&mut self.edges)[index] = new.clone();
        tracing::trace!(edge = %new.id, "edge updated");
        self.publish(
            DataChange {
                target: ChangeTarget::Edge,
                action: ChangeAction::Update,
                data: Snapshot::Edge(new.clone()),
                old_data: Some(Snapshot::Edge(old.clone())),
            },
            DocumentEvent::EdgeUpdate {
                old,
                new: new.clone(),
            },
        );
        Ok(new)
    }

    /// Remove an edge. Returns `false` if it does not exist.
    pub fn remove_edge(&mut self, id: impl AsRef<str>) -> bool {
        let Some(index) = self.edge_index(id) else {
            return false;
        };
        let edge = Arc::make_mut(&mut self.edges).remove(index);
        tracing::trace!(edge = %edge.id, "edge removed");
        self.publish(
            DataChange {
                target: ChangeTarget::Edge,
                action: ChangeAction::Remove,
                data: Snapshot::Edge(edge.clone()),
                old_data: None,
            },
            DocumentEvent::EdgeRemove(edge),
        );
        true
    }

    // ─── Viewport & metadata ────────────────────────────────────────────

    /// Saved viewport.
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Merge a viewport patch; emits a viewport `DataChange` if anything
    /// changed.
    pub fn set_viewport(&mut self, patch: &ViewportPatch) -> ViewportChange {
        let old = self.viewport;
        let change = self.viewport.apply(patch);
        if !change.is_empty() {
            self.metadata.updated_at = current_timestamp();
            self.events
                .emit(&DocumentEvent::DataChange(DataChange {
                    target: ChangeTarget::Viewport,
                    action: ChangeAction::Update,
                    data: Snapshot::Viewport(self.viewport),
                    old_data: Some(Snapshot::Viewport(old)),
                }));
        }
        change
    }

    /// Document metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    // ─── Whole-document operations ──────────────────────────────────────

    /// Audit the current state: duplicate ids and dangling endpoints.
    #[must_use]
    pub fn validate_data(&self) -> ValidationReport {
        validate(&self.nodes, &self.edges)
    }

    /// O(1) snapshot sharing storage with the document.
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            nodes: Arc::clone(&self.nodes),
            edges: Arc::clone(&self.edges),
            viewport: self.viewport,
            metadata: self.metadata.clone(),
        }
    }

    /// Owned copy of the whole document.
    #[must_use]
    pub fn get_data(&self) -> FlowchartData {
        self.snapshot().to_data()
    }

    /// Serialize the whole document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Serialization`] if encoding fails.
    pub fn export_data(&self) -> FlowResult<String> {
        Ok(serde_json::to_string_pretty(&self.get_data())?)
    }

    /// Replace the document with a JSON payload.
    ///
    /// The payload's shape is checked before anything else; on any failure
    /// the current document is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Format`] if `nodes`/`edges` are missing or not
    /// arrays, or the data fails validation; [`FlowError::Serialization`] if
    /// the JSON is malformed.
    pub fn import_data(&mut self, json: &str) -> FlowResult<()> {
        let value: Value = serde_json::from_str(json)?;
        let object = value
            .as_object()
            .ok_or_else(|| FlowError::Format("document must be a JSON object".to_string()))?;
        for key in ["nodes", "edges"] {
            match object.get(key) {
                Some(Value::Array(_)) => {}
                Some(_) => {
                    return Err(FlowError::Format(format!("`{key}` must be an array")));
                }
                None => return Err(FlowError::Format(format!("missing `{key}` array"))),
            }
        }
        let data: FlowchartData = serde_json::from_value(value)?;
        self.load_data(data)
    }

    /// Replace the document with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Format`] listing every validation issue; the
    /// current document is untouched.
    pub fn load_data(&mut self, data: FlowchartData) -> FlowResult<()> {
        let report = validate(&data.nodes, &data.edges);
        if !report.valid {
            let issues: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
            return Err(FlowError::Format(issues.join("; ")));
        }

        self.nodes = Arc::new(data.nodes);
        self.edges = Arc::new(data.edges);
        self.viewport = data.viewport.normalized();
        self.metadata = data.metadata;
        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "document loaded"
        );

        let snapshot = self.snapshot();
        self.events.emit(&DocumentEvent::DataChange(DataChange {
            target: ChangeTarget::Document,
            action: ChangeAction::Load,
            data: Snapshot::Document(snapshot.clone()),
            old_data: None,
        }));
        self.events.emit(&DocumentEvent::DataLoad(snapshot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn abc() -> Document {
        let mut doc = Document::new();
        for id in ["A", "B", "C"] {
            doc.add_node(NodeData::new(id)).expect("add node");
        }
        doc.add_edge(EdgeData::new("e1", "A", "B")).expect("e1");
        doc.add_edge(EdgeData::new("e2", "B", "C")).expect("e2");
        doc.add_edge(EdgeData::new("e3", "C", "A")).expect("e3");
        doc
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut doc = Document::new();
        doc.add_node(NodeData::new("A")).expect("first");
        let err = doc.add_node(NodeData::new("A")).unwrap_err();
        assert!(matches!(
            err,
            FlowError::DuplicateId {
                entity: EntityKind::Node,
                ..
            }
        ));
        assert_eq!(doc.nodes().len(), 1);
    }

    #[test]
    fn test_edge_with_missing_source_rejected() {
        let mut doc = Document::new();
        doc.add_node(NodeData::new("B")).expect("add");
        let err = doc.add_edge(EdgeData::new("e2", "X", "B")).unwrap_err();
        assert_eq!(err.to_string(), "Source node X does not exist");
        assert!(doc.edges().is_empty());
    }

    #[test]
    fn test_update_edge_to_missing_target_keeps_edge() {
        let mut doc = abc();
        let err = doc
            .update_edge("e1", &EdgePatch::endpoints("A", "Z"))
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::NotFound {
                entity: EntityKind::TargetNode,
                ..
            }
        ));
        assert_eq!(doc.get_edge("e1").map(|e| e.target.as_str()), Some("B"));
    }

    #[test]
    fn test_remove_node_emits_edge_removes_first() {
        let mut doc = abc();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        doc.on_any(move |e| match e {
            DocumentEvent::EdgeRemove(edge) => l.borrow_mut().push(format!("edge:{}", edge.id)),
            DocumentEvent::NodeRemove(node) => l.borrow_mut().push(format!("node:{}", node.id)),
            _ => {}
        });

        assert!(doc.remove_node("A"));
        assert_eq!(*log.borrow(), vec!["edge:e1", "edge:e3", "node:A"]);
        assert!(doc.edges().iter().all(|e| !e.touches(&NodeId::from("A"))));
        assert!(!doc.remove_node("A"));
    }

    #[test]
    fn test_update_node_emits_generic_then_specific() {
        let mut doc = abc();
        let kinds = Rc::new(RefCell::new(Vec::new()));
        let k = Rc::clone(&kinds);
        doc.on_any(move |e| k.borrow_mut().push(e.kind()));

        let updated = doc.update_node("B", &NodePatch::label("Check")).expect("update");
        assert_eq!(updated.label, "Check");
        assert_eq!(
            *kinds.borrow(),
            vec![EventKind::DataChange, EventKind::NodeUpdate]
        );
        assert!(doc.update_node("Q", &NodePatch::label("x")).is_err());
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_writes() {
        let mut doc = abc();
        let snap = doc.snapshot();
        doc.remove_node("A");
        assert_eq!(snap.nodes().len(), 3);
        assert_eq!(snap.edges().len(), 3);
        assert_eq!(doc.nodes().len(), 2);
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let nodes = vec![NodeData::new("A"), NodeData::new("A")];
        let edges = vec![
            EdgeData::new("e", "A", "missing"),
            EdgeData::new("e", "ghost", "A"),
        ];
        let report = validate(&nodes, &edges);
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                ValidationIssue::DuplicateNodeId { id: "A".into() },
                ValidationIssue::MissingTarget {
                    edge: "e".into(),
                    node: "missing".into(),
                },
                ValidationIssue::DuplicateEdgeId { id: "e".into() },
                ValidationIssue::MissingSource {
                    edge: "e".into(),
                    node: "ghost".into(),
                },
            ]
        );
    }

    #[test]
    fn test_content_bounds() {
        let mut doc = Document::new();
        assert!(doc.content_bounds().is_none());
        doc.add_node(NodeData::new("A").at(0.0, 0.0).sized(10.0, 10.0))
            .expect("A");
        doc.add_node(NodeData::new("B").at(50.0, 20.0).sized(10.0, 10.0))
            .expect("B");
        assert_eq!(doc.content_bounds(), Some(Rect::new(0.0, 0.0, 60.0, 30.0)));
    }

    #[test]
    fn test_set_viewport_clamps_and_notifies() {
        let mut doc = Document::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        doc.on(EventKind::DataChange, move |_| *c.borrow_mut() += 1);

        let change = doc.set_viewport(&ViewportPatch::scale(25.0));
        assert!(change.transform);
        assert!((doc.viewport().scale - crate::MAX_SCALE).abs() < f64::EPSILON);

        doc.set_viewport(&ViewportPatch::scale(25.0));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_destroy_clears_listeners() {
        let mut doc = Document::new();
        doc.on_any(|_| {});
        doc.on(EventKind::NodeAdd, |_| {});
        assert_eq!(doc.listener_count(), 2);
        doc.destroy();
        assert_eq!(doc.listener_count(), 0);
    }
}
