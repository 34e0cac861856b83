//! Typed change events and the publish/subscribe channel that carries them.
//!
//! Every document mutation is published twice: once as a coarse
//! [`DocumentEvent::DataChange`] and once as the specific event for the
//! mutation (`NodeAdd`, `EdgeUpdate`, ...). Subscribers pick whichever
//! granularity they need by filtering on [`EventKind`].

use std::fmt;

use crate::{DocumentSnapshot, EdgeData, NodeData, Viewport};

/// Closed set of event kinds, used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Any document mutation.
    DataChange,
    /// A node was added.
    NodeAdd,
    /// A node was updated.
    NodeUpdate,
    /// A node was removed.
    NodeRemove,
    /// An edge was added.
    EdgeAdd,
    /// An edge was updated.
    EdgeUpdate,
    /// An edge was removed.
    EdgeRemove,
    /// Undo/redo availability changed.
    HistoryChange,
    /// A command was undone.
    HistoryUndo,
    /// A command was redone.
    HistoryRedo,
    /// A whole document was loaded.
    DataLoad,
}

/// Which part of the document a [`DataChange`] touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTarget {
    /// A node.
    Node,
    /// An edge.
    Edge,
    /// The viewport.
    Viewport,
    /// The document as a whole.
    Document,
}

/// What happened to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Inserted.
    Add,
    /// Modified in place.
    Update,
    /// Deleted.
    Remove,
    /// Replaced by an import.
    Load,
}

/// Value carried by a [`DataChange`].
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// A node value.
    Node(NodeData),
    /// An edge value.
    Edge(EdgeData),
    /// A viewport value.
    Viewport(Viewport),
    /// A whole-document snapshot.
    Document(DocumentSnapshot),
}

/// The coarse change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChange {
    /// What changed.
    pub target: ChangeTarget,
    /// How it changed.
    pub action: ChangeAction,
    /// The value after the change (or the removed value).
    pub data: Snapshot,
    /// The value before an update.
    pub old_data: Option<Snapshot>,
}

/// Everything the document and its history publish.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    /// Generic notification, emitted for every mutation.
    DataChange(DataChange),
    /// A node was added.
    NodeAdd(NodeData),
    /// A node was updated.
    NodeUpdate {
        /// Value before.
        old: NodeData,
        /// Value after.
        new: NodeData,
    },
    /// A node was removed (after its incident edges).
    NodeRemove(NodeData),
    /// An edge was added.
    EdgeAdd(EdgeData),
    /// An edge was updated.
    EdgeUpdate {
        /// Value before.
        old: EdgeData,
        /// Value after.
        new: EdgeData,
    },
    /// An edge was removed.
    EdgeRemove(EdgeData),
    /// A document was loaded wholesale.
    DataLoad(DocumentSnapshot),
    /// Undo/redo availability after a history operation.
    HistoryChange {
        /// Whether `undo` would do something.
        can_undo: bool,
        /// Whether `redo` would do something.
        can_redo: bool,
    },
    /// A command was undone.
    HistoryUndo {
        /// The command's description.
        description: String,
    },
    /// A command was redone.
    HistoryRedo {
        /// The command's description.
        description: String,
    },
}

impl DocumentEvent {
    /// The subscription key for this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DataChange(_) => EventKind::DataChange,
            Self::NodeAdd(_) => EventKind::NodeAdd,
            Self::NodeUpdate { .. } => EventKind::NodeUpdate,
            Self::NodeRemove(_) => EventKind::NodeRemove,
            Self::EdgeAdd(_) => EventKind::EdgeAdd,
            Self::EdgeUpdate { .. } => EventKind::EdgeUpdate,
            Self::EdgeRemove(_) => EventKind::EdgeRemove,
            Self::DataLoad(_) => EventKind::DataLoad,
            Self::HistoryChange { .. } => EventKind::HistoryChange,
            Self::HistoryUndo { .. } => EventKind::HistoryUndo,
            Self::HistoryRedo { .. } => EventKind::HistoryRedo,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&DocumentEvent)>;

struct Subscription {
    id: SubscriptionId,
    filter: Option<EventKind>,
    handler: Handler,
}

/// Single-threaded publish/subscribe channel keyed by [`EventKind`].
///
/// Handlers run synchronously, in subscription order, before `emit` returns.
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event.
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        self.subscribe(Some(kind), Box::new(handler))
    }

    /// Subscribe to every event.
    pub fn on_any<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        self.subscribe(None, Box::new(handler))
    }

    fn subscribe(&mut self, filter: Option<EventKind>, handler: Handler) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription {
            id,
            filter,
            handler,
        });
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Deliver an event to every matching subscriber.
    pub fn emit(&mut self, event: &DocumentEvent) {
        let kind = event.kind();
        for sub in &mut self.subscriptions {
            if sub.filter.is_none_or(|f| f == kind) {
                (sub.handler)(event);
            }
        }
    }

    /// Drop every subscription.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_filtered_and_catch_all_subscribers() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = Rc::clone(&seen);
        bus.on(EventKind::NodeAdd, move |e| s.borrow_mut().push(("node", e.kind())));
        let s = Rc::clone(&seen);
        bus.on_any(move |e| s.borrow_mut().push(("any", e.kind())));

        bus.emit(&DocumentEvent::NodeAdd(NodeData::new("A")));
        bus.emit(&DocumentEvent::HistoryChange {
            can_undo: true,
            can_redo: false,
        });

        assert_eq!(
            *seen.borrow(),
            vec![
                ("node", EventKind::NodeAdd),
                ("any", EventKind::NodeAdd),
                ("any", EventKind::HistoryChange),
            ]
        );
    }

    #[test]
    fn test_off_removes_subscription() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = bus.on_any(move |_| *c.borrow_mut() += 1);

        bus.emit(&DocumentEvent::NodeRemove(NodeData::new("A")));
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(&DocumentEvent::NodeRemove(NodeData::new("A")));

        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count(), 0);
    }
}
