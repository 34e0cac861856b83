//! Linear, bounded undo/redo over document mutations.
//!
//! ```text
//!   entries:  [c0] [c1] [c2] [c3]
//!                        ▲
//!                      cursor        undo → c2.undo(), cursor → c1
//!                                    redo → cursor → c3, c3.redo()
//! ```
//!
//! Executing a new command while the cursor is not at the end discards the
//! redoable tail; there is no branching. Every entry point holds a
//! [`ReentrancyGuard`], so a command that tries to drive the history from
//! inside its own `execute`/`undo`/`redo` is rejected with
//! [`FlowError::HistoryBusy`] instead of corrupting the stack.
//!
//! [`CommandHistory::execute_command`] is the only place that calls
//! [`Command::execute`]. Callers hand over a command that has not been run.

use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::{current_timestamp, Document, DocumentEvent, FlowError, FlowResult, ReentrancyGuard};

/// Default bound on the number of history entries.
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 100;

/// An undoable unit of document mutation.
pub trait Command {
    /// Apply the mutation. Only [`CommandHistory::execute_command`] calls
    /// this.
    ///
    /// # Errors
    ///
    /// Returns the document error that prevented the mutation. A failed
    /// command must leave the document unchanged.
    fn execute(&mut self, doc: &mut Document) -> FlowResult<()>;

    /// Revert what `execute` (or `redo`) did.
    ///
    /// # Errors
    ///
    /// Returns the document error that prevented the revert.
    fn undo(&mut self, doc: &mut Document) -> FlowResult<()>;

    /// Re-apply after an undo. Defaults to `execute`.
    ///
    /// # Errors
    ///
    /// Returns the document error that prevented the mutation.
    fn redo(&mut self, doc: &mut Document) -> FlowResult<()> {
        self.execute(doc)
    }

    /// Human-readable label ("Add node A").
    fn description(&self) -> String;
}

impl Command for Box<dyn Command> {
    fn execute(&mut self, doc: &mut Document) -> FlowResult<()> {
        (**self).execute(doc)
    }

    fn undo(&mut self, doc: &mut Document) -> FlowResult<()> {
        (**self).undo(doc)
    }

    fn redo(&mut self, doc: &mut Document) -> FlowResult<()> {
        (**self).redo(doc)
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

/// Configuration for [`CommandHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum retained entries; the oldest is evicted first. At least 1.
    pub max_history_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
        }
    }
}

type SharedCommand = Rc<RefCell<dyn Command>>;

/// One executed command.
pub struct HistoryItem {
    command: SharedCommand,
    description: String,
    timestamp: u64,
}

impl HistoryItem {
    /// The command's description at execution time.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// When the command was executed, ms since epoch.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl fmt::Debug for HistoryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryItem")
            .field("description", &self.description)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

/// Bounded linear undo/redo stack.
///
/// Methods take `&self` so the history can be shared (`Rc<CommandHistory>`)
/// with UI callbacks; the re-entrancy guard serializes access.
pub struct CommandHistory {
    max_size: usize,
    entries: RefCell<VecDeque<HistoryItem>>,
    /// Index of the most recently applied entry; `None` means "before the
    /// first entry".
    cursor: Cell<Option<usize>>,
    guard: ReentrancyGuard,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl CommandHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            max_size: config.max_history_size.max(1),
            entries: RefCell::new(VecDeque::new()),
            cursor: Cell::new(None),
            guard: ReentrancyGuard::new(),
        }
    }

    /// Execute `command` against `doc` and record it.
    ///
    /// On success any redoable entries are discarded, the entry is appended,
    /// the oldest entry is evicted past the size bound, and `HistoryChange`
    /// is emitted.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::HistoryBusy`] when called from inside another
    /// history operation, or the command's own error (nothing is recorded).
    pub fn execute_command<C>(&self, doc: &mut Document, mut command: C) -> FlowResult<()>
    where
        C: Command + 'static,
    {
        let token = self.enter("execute")?;
        command.execute(doc)?;

        let description = command.description();
        {
            let mut entries = self.entries.borrow_mut();
            entries.truncate(self.cursor.get().map_or(0, |c| c + 1));
            entries.push_back(HistoryItem {
                command: Rc::new(RefCell::new(command)),
                description: description.clone(),
                timestamp: current_timestamp(),
            });
            while entries.len() > self.max_size {
                entries.pop_front();
            }
            self.cursor.set(Some(entries.len() - 1));
        }
        drop(token);

        tracing::debug!(%description, "command executed");
        self.emit_change(doc);
        Ok(())
    }

    /// Undo the command at the cursor.
    ///
    /// Returns `Ok(false)` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::HistoryBusy`] on nested use, or the command's
    /// error (the cursor does not move).
    pub fn undo(&self, doc: &mut Document) -> FlowResult<bool> {
        let token = self.enter("undo")?;
        let Some(index) = self.cursor.get() else {
            return Ok(false);
        };
        let (command, description) = self.entry(index);

        command.borrow_mut().undo(doc)?;
        self.cursor.set(index.checked_sub(1));
        drop(token);

        tracing::debug!(%description, "command undone");
        doc.emit(&DocumentEvent::HistoryUndo { description });
        self.emit_change(doc);
        Ok(true)
    }

    /// Redo the entry after the cursor.
    ///
    /// Returns `Ok(false)` when there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::HistoryBusy`] on nested use, or the command's
    /// error (the cursor is restored).
    pub fn redo(&self, doc: &mut Document) -> FlowResult<bool> {
        let token = self.enter("redo")?;
        let previous = self.cursor.get();
        let next = previous.map_or(0, |c| c + 1);
        if next >= self.len() {
            return Ok(false);
        }
        self.cursor.set(Some(next));
        let (command, description) = self.entry(next);

        if let Err(err) = command.borrow_mut().redo(doc) {
            self.cursor.set(previous);
            return Err(err);
        }
        drop(token);

        tracing::debug!(%description, "command redone");
        doc.emit(&DocumentEvent::HistoryRedo { description });
        self.emit_change(doc);
        Ok(true)
    }

    /// Forget every entry.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::HistoryBusy`] on nested use.
    pub fn clear(&self, doc: &mut Document) -> FlowResult<()> {
        let token = self.enter("clear")?;
        self.entries.borrow_mut().clear();
        self.cursor.set(None);
        drop(token);
        self.emit_change(doc);
        Ok(())
    }

    /// Tear down a document session: forget every entry, then drop every
    /// listener on `doc`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::HistoryBusy`] on nested use; `doc` keeps its
    /// listeners in that case.
    pub fn destroy(&self, doc: &mut Document) -> FlowResult<()> {
        self.clear(doc)?;
        doc.destroy();
        Ok(())
    }

    /// Whether `undo` would do something.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor.get().is_some()
    }

    /// Whether `redo` would do something.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor.get().map_or(0, |c| c + 1) < self.len()
    }

    /// Description of the entry `undo` would revert.
    #[must_use]
    pub fn undo_description(&self) -> Option<String> {
        let index = self.cursor.get()?;
        self.entries
            .borrow()
            .get(index)
            .map(|item| item.description.clone())
    }

    /// Description of the entry `redo` would re-apply.
    #[must_use]
    pub fn redo_description(&self) -> Option<String> {
        let index = self.cursor.get().map_or(0, |c| c + 1);
        self.entries
            .borrow()
            .get(index)
            .map(|item| item.description.clone())
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// True if no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Configured bound.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Retained entries, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a command while the history is mutating
    /// its entry list.
    #[must_use]
    pub fn items(&self) -> Ref<'_, VecDeque<HistoryItem>> {
        self.entries.borrow()
    }

    /// Whether an operation is in progress.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    fn enter(&self, operation: &'static str) -> FlowResult<crate::GuardToken> {
        self.guard.try_enter().ok_or_else(|| {
            tracing::warn!(operation, "re-entrant history call rejected");
            FlowError::HistoryBusy(operation)
        })
    }

    fn entry(&self, index: usize) -> (SharedCommand, String) {
        let entries = self.entries.borrow();
        let item = &entries[index];
        (Rc::clone(&item.command), item.description.clone())
    }

    fn emit_change(&self, doc: &mut Document) {
        doc.emit(&DocumentEvent::HistoryChange {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        });
    }
}

impl fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHistory")
            .field("max_size", &self.max_size)
            .field("len", &self.len())
            .field("cursor", &self.cursor.get())
            .field("busy", &self.is_busy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::{AddNodeCommand, EventKind, NodeData};

    fn add(id: &str) -> AddNodeCommand {
        AddNodeCommand::new(NodeData::new(id))
    }

    #[test]
    fn test_pointer_moves_with_undo_redo() {
        let mut doc = Document::new();
        let history = CommandHistory::default();
        assert!(!history.can_undo());
        assert!(!history.undo(&mut doc).expect("undo"));

        history.execute_command(&mut doc, add("A")).expect("exec");
        history.execute_command(&mut doc, add("B")).expect("exec");
        assert_eq!(history.undo_description().as_deref(), Some("Add node B"));

        assert!(history.undo(&mut doc).expect("undo"));
        assert!(history.can_redo());
        assert_eq!(history.redo_description().as_deref(), Some("Add node B"));
        assert!(history.redo(&mut doc).expect("redo"));
        assert!(!history.can_redo());
        assert!(!history.redo(&mut doc).expect("redo"));
        assert_eq!(doc.nodes().len(), 2);
    }

    #[test]
    fn test_new_command_discards_redo_tail() {
        let mut doc = Document::new();
        let history = CommandHistory::default();
        history.execute_command(&mut doc, add("A")).expect("exec");
        history.execute_command(&mut doc, add("B")).expect("exec");
        history.undo(&mut doc).expect("undo");
        history.undo(&mut doc).expect("undo");

        history.execute_command(&mut doc, add("C")).expect("exec");
        assert!(!history.can_redo());
        assert_eq!(history.len(), 1);
        assert_eq!(doc.nodes().len(), 1);
    }

    #[test]
    fn test_bounded_history_evicts_oldest() {
        let mut doc = Document::new();
        let history = CommandHistory::new(HistoryConfig {
            max_history_size: 3,
        });
        for i in 0..5 {
            history
                .execute_command(&mut doc, add(&format!("n{i}")))
                .expect("exec");
        }
        assert_eq!(history.len(), 3);
        let descriptions: Vec<String> = history
            .items()
            .iter()
            .map(|item| item.description().to_string())
            .collect();
        assert_eq!(descriptions, ["Add node n2", "Add node n3", "Add node n4"]);

        while history.undo(&mut doc).expect("undo") {}
        assert_eq!(doc.nodes().len(), 2);
    }

    #[test]
    fn test_failed_command_is_not_recorded() {
        let mut doc = Document::new();
        let history = CommandHistory::default();
        history.execute_command(&mut doc, add("A")).expect("exec");
        assert!(history.execute_command(&mut doc, add("A")).is_err());
        assert_eq!(history.len(), 1);
        assert!(!history.is_busy());
    }

    /// Command that tries to drive the history from inside each of its own
    /// callbacks and records which nested calls were turned away.
    struct Nested {
        history: Rc<CommandHistory>,
        rejected: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Nested {
        fn note(&self, call: &'static str, result: &FlowResult<impl Sized>) {
            if matches!(result, Err(FlowError::HistoryBusy(_))) {
                self.rejected.borrow_mut().push(call);
            }
        }
    }

    impl Command for Nested {
        fn execute(&mut self, doc: &mut Document) -> FlowResult<()> {
            let result = self.history.execute_command(doc, add("inner"));
            self.note("execute", &result);
            doc.add_node(NodeData::new("outer"))
        }

        fn undo(&mut self, doc: &mut Document) -> FlowResult<()> {
            let result = self.history.undo(doc);
            self.note("undo", &result);
            doc.remove_node("outer");
            Ok(())
        }

        fn redo(&mut self, doc: &mut Document) -> FlowResult<()> {
            let result = self.history.redo(doc);
            self.note("redo", &result);
            doc.add_node(NodeData::new("outer"))
        }

        fn description(&self) -> String {
            "nested".to_string()
        }
    }

    #[test]
    fn test_reentrant_calls_are_rejected() {
        let mut doc = Document::new();
        let history = Rc::new(CommandHistory::default());
        let rejected = Rc::new(RefCell::new(Vec::new()));
        history
            .execute_command(
                &mut doc,
                Nested {
                    history: Rc::clone(&history),
                    rejected: Rc::clone(&rejected),
                },
            )
            .expect("outer");

        assert_eq!(*rejected.borrow(), vec!["execute"]);
        assert_eq!(history.len(), 1);
        assert!(doc.get_node("inner").is_none());

        assert!(history.undo(&mut doc).expect("undo"));
        assert_eq!(*rejected.borrow(), vec!["execute", "undo"]);
        assert!(doc.nodes().is_empty());
        assert!(!history.is_busy());

        assert!(history.redo(&mut doc).expect("redo"));
        assert_eq!(*rejected.borrow(), vec!["execute", "undo", "redo"]);
        assert!(doc.get_node("outer").is_some());
        assert!(history.can_undo());
        assert!(!history.is_busy());
    }

    #[test]
    fn test_destroy_clears_entries_and_listeners() {
        let mut doc = Document::new();
        let history = CommandHistory::default();
        history.execute_command(&mut doc, add("a")).expect("add");
        doc.on_any(|_| {});
        assert_eq!(doc.listener_count(), 1);

        history.destroy(&mut doc).expect("destroy");

        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert_eq!(doc.listener_count(), 0);
        assert!(doc.get_node("a").is_some());
    }

    #[test]
    fn test_history_events_follow_undo() {
        let mut doc = Document::new();
        let history = CommandHistory::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        doc.on_any(move |e| {
            if matches!(
                e.kind(),
                EventKind::HistoryChange | EventKind::HistoryUndo | EventKind::HistoryRedo
            ) {
                l.borrow_mut().push(e.clone());
            }
        });

        history.execute_command(&mut doc, add("A")).expect("exec");
        history.undo(&mut doc).expect("undo");

        assert_eq!(
            *log.borrow(),
            vec![
                DocumentEvent::HistoryChange {
                    can_undo: true,
                    can_redo: false,
                },
                DocumentEvent::HistoryUndo {
                    description: "Add node A".to_string(),
                },
                DocumentEvent::HistoryChange {
                    can_undo: false,
                    can_redo: true,
                },
            ]
        );
    }
}
