//! Concrete document commands.
//!
//! Each command captures whatever it needs to revert itself at the moment it
//! runs, so undo restores the exact prior state, including document order.

use crate::{
    Command, Document, EdgeData, EdgeId, EdgePatch, EntityKind, FlowError, FlowResult, NodeData,
    NodeId, NodePatch, Point,
};

/// Append a node.
#[derive(Debug, Clone)]
pub struct AddNodeCommand {
    node: NodeData,
}

impl AddNodeCommand {
    /// Command that adds `node`.
    #[must_use]
    pub fn new(node: NodeData) -> Self {
        Self { node }
    }
}

impl Command for AddNodeCommand {
    fn execute(&mut self, doc: &mut Document) -> FlowResult<()> {
        doc.add_node(self.node.clone())
    }

    fn undo(&mut self, doc: &mut Document) -> FlowResult<()> {
        if doc.remove_node(&self.node.id) {
            Ok(())
        } else {
            Err(FlowError::not_found(EntityKind::Node, self.node.id.as_str()))
        }
    }

    fn description(&self) -> String {
        format!("Add node {}", self.node.id)
    }
}

#[derive(Debug, Clone)]
struct RemovedNode {
    index: usize,
    node: NodeData,
    edges: Vec<(usize, EdgeData)>,
}

/// Remove a node together with its incident edges.
#[derive(Debug, Clone)]
pub struct RemoveNodeCommand {
    id: NodeId,
    removed: Option<RemovedNode>,
}

impl RemoveNodeCommand {
    /// Command that removes node `id`.
    #[must_use]
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            removed: None,
        }
    }
}

impl Command for RemoveNodeCommand {
    fn execute(&mut self, doc: &mut Document) -> FlowResult<()> {
        let index = doc
            .node_index(&self.id)
            .ok_or_else(|| FlowError::not_found(EntityKind::Node, self.id.as_str()))?;
        let node = doc.nodes()[index].clone();
        let edges = doc
            .incident_edges(&self.id)
            .map(|(i, e)| (i, e.clone()))
            .collect();
        doc.remove_node(&self.id);
        self.removed = Some(RemovedNode { index, node, edges });
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> FlowResult<()> {
        let removed = self
            .removed
            .clone()
            .ok_or_else(|| FlowError::Command(format!("node {} was never removed", self.id)))?;
        doc.insert_node(removed.index, removed.node)?;
        // Ascending original positions rebuild the original edge order.
        for (index, edge) in removed.edges {
            doc.insert_edge(index, edge)?;
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Remove node {}", self.id)
    }
}

/// Apply a [`NodePatch`].
#[derive(Debug, Clone)]
pub struct UpdateNodeCommand {
    id: NodeId,
    patch: NodePatch,
    before: Option<NodeData>,
}

impl UpdateNodeCommand {
    /// Command that applies `patch` to node `id`.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, patch: NodePatch) -> Self {
        Self {
            id: id.into(),
            patch,
            before: None,
        }
    }
}

impl Command for UpdateNodeCommand {
    fn execute(&mut self, doc: &mut Document) -> FlowResult<()> {
        let before = doc
            .get_node(&self.id)
            .cloned()
            .ok_or_else(|| FlowError::not_found(EntityKind::Node, self.id.as_str()))?;
        doc.update_node(&self.id, &self.patch)?;
        self.before = Some(before);
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> FlowResult<()> {
        let before = self
            .before
            .as_ref()
            .ok_or_else(|| FlowError::Command(format!("node {} was never updated", self.id)))?;
        doc.update_node(&self.id, &NodePatch::restore(before))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Update node {}", self.id)
    }
}

/// Move a node between two known positions (typically a drag gesture).
#[derive(Debug, Clone)]
pub struct MoveNodeCommand {
    id: NodeId,
    from: Point,
    to: Point,
}

impl MoveNodeCommand {
    /// Command that moves node `id` from `from` to `to`.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, from: Point, to: Point) -> Self {
        Self {
            id: id.into(),
            from,
            to,
        }
    }
}

impl Command for MoveNodeCommand {
    fn execute(&mut self, doc: &mut Document) -> FlowResult<()> {
        doc.update_node(&self.id, &NodePatch::position(self.to.x, self.to.y))?;
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> FlowResult<()> {
        doc.update_node(&self.id, &NodePatch::position(self.from.x, self.from.y))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Move node {}", self.id)
    }
}

/// Append an edge.
#[derive(Debug, Clone)]
pub struct AddEdgeCommand {
    edge: EdgeData,
}

impl AddEdgeCommand {
    /// Command that adds `edge`.
    #[must_use]
    pub fn new(edge: EdgeData) -> Self {
        Self { edge }
    }
}

impl Command for AddEdgeCommand {
    fn execute(&mut self, doc: &mut Document) -> FlowResult<()> {
        doc.add_edge(self.edge.clone())
    }

    fn undo(&mut self, doc: &mut Document) -> FlowResult<()> {
        if doc.remove_edge(&self.edge.id) {
            Ok(())
        } else {
            Err(FlowError::not_found(EntityKind::Edge, self.edge.id.as_str()))
        }
    }

    fn description(&self) -> String {
        format!("Add edge {}", self.edge.id)
    }
}

/// Remove an edge.
#[derive(Debug, Clone)]
pub struct RemoveEdgeCommand {
    id: EdgeId,
    removed: Option<(usize, EdgeData)>,
}

impl RemoveEdgeCommand {
    /// Command that removes edge `id`.
    #[must_use]
    pub fn new(id: impl Into<EdgeId>) -> Self {
        Self {
            id: id.into(),
            removed: None,
        }
    }
}

impl Command for RemoveEdgeCommand {
    fn execute(&mut self, doc: &mut Document) -> FlowResult<()> {
        let index = doc
            .edge_index(&self.id)
            .ok_or_else(|| FlowError::not_found(EntityKind::Edge, self.id.as_str()))?;
        let edge = doc.edges()[index].clone();
        doc.remove_edge(&self.id);
        self.removed = Some((index, edge));
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> FlowResult<()> {
        let (index, edge) = self
            .removed
            .clone()
            .ok_or_else(|| FlowError::Command(format!("edge {} was never removed", self.id)))?;
        doc.insert_edge(index, edge)
    }

    fn description(&self) -> String {
        format!("Remove edge {}", self.id)
    }
}

/// Apply an [`EdgePatch`].
#[derive(Debug, Clone)]
pub struct UpdateEdgeCommand {
    id: EdgeId,
    patch: EdgePatch,
    before: Option<EdgeData>,
}

impl UpdateEdgeCommand {
    /// Command that applies `patch` to edge `id`.
    #[must_use]
    pub fn new(id: impl Into<EdgeId>, patch: EdgePatch) -> Self {
        Self {
            id: id.into(),
            patch,
            before: None,
        }
    }
}

impl Command for UpdateEdgeCommand {
    fn execute(&mut self, doc: &mut Document) -> FlowResult<()> {
        let before = doc
            .get_edge(&self.id)
            .cloned()
            .ok_or_else(|| FlowError::not_found(EntityKind::Edge, self.id.as_str()))?;
        doc.update_edge(&self.id, &self.patch)?;
        self.before = Some(before);
        Ok(())
    }

    fn undo(&mut self, doc: &mut Document) -> FlowResult<()> {
        let before = self
            .before
            .as_ref()
            .ok_or_else(|| FlowError::Command(format!("edge {} was never updated", self.id)))?;
        doc.update_edge(&self.id, &EdgePatch::restore(before))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Update edge {}", self.id)
    }
}

/// Several commands applied and reverted as one history entry.
///
/// Children run in order and undo in reverse. If a child fails, the children
/// already applied are reverted before the error is returned, so the batch
/// is all-or-nothing.
pub struct BatchCommand {
    description: String,
    commands: Vec<Box<dyn Command>>,
}

impl BatchCommand {
    /// An empty batch.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
        }
    }

    /// Append a child command.
    #[must_use]
    pub fn with<C: Command + 'static>(mut self, command: C) -> Self {
        self.commands.push(Box::new(command));
        self
    }

    /// Append a child command.
    pub fn push<C: Command + 'static>(&mut self, command: C) {
        self.commands.push(Box::new(command));
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if the batch has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn apply(&mut self, doc: &mut Document, redo: bool) -> FlowResult<()> {
        for i in 0..self.commands.len() {
            let result = if redo {
                self.commands[i].redo(doc)
            } else {
                self.commands[i].execute(doc)
            };
            if let Err(err) = result {
                for applied in self.commands[..i].iter_mut().rev() {
                    if let Err(rollback) = applied.undo(doc) {
                        tracing::warn!(
                            command = %applied.description(),
                            error = %rollback,
                            "batch rollback step failed"
                        );
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for BatchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCommand")
            .field("description", &self.description)
            .field("len", &self.commands.len())
            .finish()
    }
}

impl Command for BatchCommand {
    fn execute(&mut self, doc: &mut Document) -> FlowResult<()> {
        self.apply(doc, false)
    }

    fn undo(&mut self, doc: &mut Document) -> FlowResult<()> {
        for command in self.commands.iter_mut().rev() {
            command.undo(doc)?;
        }
        Ok(())
    }

    fn redo(&mut self, doc: &mut Document) -> FlowResult<()> {
        self.apply(doc, true)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommandHistory;

    fn abc() -> Document {
        let mut doc = Document::new();
        for id in ["A", "B", "C"] {
            doc.add_node(NodeData::new(id)).expect("node");
        }
        doc.add_edge(EdgeData::new("e1", "A", "B")).expect("e1");
        doc.add_edge(EdgeData::new("e2", "B", "C")).expect("e2");
        doc.add_edge(EdgeData::new("e3", "C", "A")).expect("e3");
        doc
    }

    #[test]
    fn test_remove_node_undo_restores_order() {
        let mut doc = abc();
        let before = doc.get_data();
        let history = CommandHistory::default();

        history
            .execute_command(&mut doc, RemoveNodeCommand::new("A"))
            .expect("remove");
        assert_eq!(doc.nodes().len(), 2);
        assert_eq!(doc.edges().len(), 1);

        history.undo(&mut doc).expect("undo");
        assert_eq!(doc.nodes(), before.nodes.as_slice());
        assert_eq!(doc.edges(), before.edges.as_slice());
    }

    #[test]
    fn test_update_edge_round_trip() {
        let mut doc = abc();
        let history = CommandHistory::default();
        let original = doc.get_edge("e1").cloned().expect("e1");

        let mut patch = EdgePatch::endpoints("C", "B");
        patch.waypoints = Some(vec![Point::new(1.0, 2.0)]);
        history
            .execute_command(&mut doc, UpdateEdgeCommand::new("e1", patch))
            .expect("update");
        let updated = doc.get_edge("e1").cloned().expect("e1");
        assert_eq!(updated.source, "C");

        history.undo(&mut doc).expect("undo");
        assert_eq!(doc.get_edge("e1"), Some(&original));
        history.redo(&mut doc).expect("redo");
        assert_eq!(doc.get_edge("e1"), Some(&updated));
    }

    #[test]
    fn test_move_node_round_trip() {
        let mut doc = abc();
        let history = CommandHistory::default();
        history
            .execute_command(
                &mut doc,
                MoveNodeCommand::new("B", Point::new(0.0, 0.0), Point::new(40.0, 10.0)),
            )
            .expect("move");
        assert_eq!(doc.get_node("B").map(|n| n.position), Some(Point::new(40.0, 10.0)));
        history.undo(&mut doc).expect("undo");
        assert_eq!(doc.get_node("B").map(|n| n.position), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_batch_rolls_back_on_failure() {
        let mut doc = abc();
        let before = doc.get_data();
        let history = CommandHistory::default();

        let batch = BatchCommand::new("Insert D")
            .with(AddNodeCommand::new(NodeData::new("D")))
            .with(AddEdgeCommand::new(EdgeData::new("e4", "A", "D")))
            .with(AddEdgeCommand::new(EdgeData::new("e5", "D", "nowhere")));
        assert!(history.execute_command(&mut doc, batch).is_err());

        assert_eq!(doc.nodes(), before.nodes.as_slice());
        assert_eq!(doc.edges(), before.edges.as_slice());
        assert!(history.is_empty());
    }

    #[test]
    fn test_batch_is_one_history_entry() {
        let mut doc = abc();
        let history = CommandHistory::default();
        let mut batch = BatchCommand::new("Insert D");
        batch.push(AddNodeCommand::new(NodeData::new("D")));
        batch.push(AddEdgeCommand::new(EdgeData::new("e4", "C", "D")));
        assert_eq!(batch.len(), 2);

        history.execute_command(&mut doc, batch).expect("batch");
        assert_eq!(history.len(), 1);
        assert_eq!(doc.edges().len(), 4);

        history.undo(&mut doc).expect("undo");
        assert!(doc.get_node("D").is_none());
        assert_eq!(doc.edges().len(), 3);
    }
}
