//! Undo Document - Application-level history
//!
//! Wraps a [`Document`] and keeps one transaction open on it at all times
//! while sensitive. Each `done`/`maybe_done` closes the current transaction,
//! turns its log into an undo step (or merges it into the previous step when
//! the merge key repeats) and opens the next one.
//!
//! States:
//! - sensitive, transaction open: edits are recorded for the next step
//! - insensitive: edits happen but are not recorded; whatever had been
//!   recorded before is parked in `partial` until the next step is closed
//! - seeking: an undo or redo is replaying a stored log

use std::fmt;
use std::rc::Rc;

use tessera_xml::{Document, EventLog};
use tracing::{debug, warn};

use crate::{ActionType, CompositeUndoStackObserver, HistoryConfig, UndoEntry, UndoStackObserver};

type UpdateHook = Box<dyn FnMut(&Document)>;

/// Undo/redo history of one document
pub struct UndoDocument {
    document: Document,
    config: HistoryConfig,
    sensitive: bool,
    /// Changes recorded before the history went insensitive
    partial: EventLog,
    /// Oldest first
    undo: Vec<UndoEntry>,
    /// Oldest first; the last entry is redone next
    redo: Vec<UndoEntry>,
    action_key: Option<String>,
    /// Undo steps between the current state and the last save:
    /// positive means that many undos, negative that many redos,
    /// `None` means the saved state is unreachable
    save_distance: Option<i64>,
    observers: CompositeUndoStackObserver,
    update_hook: Option<UpdateHook>,
}

impl UndoDocument {
    pub fn new(document: Document) -> Self {
        Self::with_config(document, HistoryConfig::default())
    }

    /// Take over `document`, opening a transaction on it if none is open
    pub fn with_config(document: Document, config: HistoryConfig) -> Self {
        if !document.in_transaction() {
            document.begin_transaction();
        }
        Self {
            document,
            config,
            sensitive: true,
            partial: EventLog::new(),
            undo: Vec::new(),
            redo: Vec::new(),
            action_key: None,
            save_distance: Some(0),
            observers: CompositeUndoStackObserver::new(),
            update_hook: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Committing
    // ------------------------------------------------------------------

    /// Close the current user action as a new undo step
    pub fn done(&mut self, action_type: ActionType, description: &str) {
        self.maybe_done(None, action_type, description);
    }

    /// Close the current user action
    ///
    /// When `key` equals the key of the previous call, the changes are merged
    /// into the previous undo step instead of starting a new one. Nothing is
    /// pushed when nothing changed.
    ///
    /// # Panics
    /// If the history is insensitive.
    pub fn maybe_done(&mut self, key: Option<&str>, action_type: ActionType, description: &str) {
        assert!(self.sensitive, "maybe_done: undo history is insensitive");

        let key = match key {
            Some("") => {
                warn!(description, "blank undo key specified");
                None
            }
            key => key,
        };

        self.ensure_up_to_date();
        self.clear_redo();

        let partial = std::mem::take(&mut self.partial);
        let log = EventLog::coalesce(partial, self.take_transaction());
        if log.is_empty() {
            self.document.begin_transaction();
            return;
        }

        let merging = key.is_some() && key == self.action_key.as_deref();
        match self.undo.last_mut() {
            Some(top) if merging && !top.log().is_empty() => {
                debug!(key, events = log.len(), "merging into undo step {top}");
                top.append(log);
                if top.log().is_empty() {
                    self.drop_cancelled_step();
                    self.document.begin_transaction();
                    return;
                }
                if self.save_distance == Some(0) {
                    self.save_distance = None;
                }
            }
            _ => self.push_undo(UndoEntry::new(log, action_type, description)),
        }

        self.action_key = key.map(str::to_string);
        self.document.begin_transaction();
    }

    /// Pop a top step whose merged changes cancelled out
    ///
    /// The tree is back at the state below the step, so the save distance
    /// loses the step it gained on push.
    fn drop_cancelled_step(&mut self) {
        if let Some(entry) = self.undo.pop() {
            debug!(%entry, "merged undo step cancelled out");
        }
        self.save_distance = match self.save_distance {
            Some(distance) if distance > 0 => Some(distance - 1),
            _ => None,
        };
        self.action_key = None;
    }

    /// Forget the last merge key so the next step is never merged
    pub fn reset_key(&mut self) {
        self.action_key = None;
    }

    /// Revert everything recorded since the last step was closed
    ///
    /// # Panics
    /// If the history is insensitive.
    pub fn cancel(&mut self) {
        assert!(self.sensitive, "cancel: undo history is insensitive");

        if self.document.in_transaction() {
            self.document.rollback();
        }
        let partial = std::mem::take(&mut self.partial);
        if !partial.is_empty() {
            debug!(events = partial.len(), "cancelling parked changes");
            partial.undo();
        }
        self.document.begin_transaction();
    }

    fn push_undo(&mut self, entry: UndoEntry) {
        debug!(%entry, "undo step committed");
        self.observers.notify_undo_commit_event(&entry);
        self.undo.push(entry);
        if let Some(distance) = &mut self.save_distance {
            *distance += 1;
        }

        let Some(max_depth) = self.config.max_depth else {
            return;
        };
        while self.undo.len() > max_depth {
            let expired = self.undo.remove(0);
            debug!(%expired, "undo step expired");
            self.observers.notify_undo_expired(&expired);
        }
        if let Some(distance) = self.save_distance {
            if distance > self.undo.len() as i64 {
                self.save_distance = None;
            }
        }
    }

    // ------------------------------------------------------------------
    // Seeking
    // ------------------------------------------------------------------

    /// Revert the latest undo step; `false` if there is none
    ///
    /// # Panics
    /// If the history is insensitive.
    pub fn undo(&mut self) -> bool {
        assert!(self.sensitive, "undo: undo history is insensitive");
        self.sensitive = false;
        self.document.set_seeking(true);
        self.action_key = None;

        self.finish_incomplete_transaction();

        let undone = match self.undo.pop() {
            Some(mut entry) => {
                debug!(%entry, "undo");
                entry.log.undo();

                // Redo must start from the state the update left behind
                let update = self.perform_document_update();
                if !update.is_empty() {
                    entry.prepend(update.inverted());
                }

                if let Some(distance) = &mut self.save_distance {
                    *distance -= 1;
                }
                self.observers.notify_undo_event(&entry);
                self.redo.push(entry);
                true
            }
            None => false,
        };

        self.document.begin_transaction();
        self.sensitive = true;
        self.document.set_seeking(false);
        undone
    }

    /// Re-apply the latest undone step; `false` if there is none
    ///
    /// # Panics
    /// If the history is insensitive.
    pub fn redo(&mut self) -> bool {
        assert!(self.sensitive, "redo: undo history is insensitive");
        self.sensitive = false;
        self.document.set_seeking(true);
        self.action_key = None;

        self.finish_incomplete_transaction();

        let redone = match self.redo.pop() {
            Some(mut entry) => {
                debug!(%entry, "redo");
                entry.log.replay();

                let update = self.perform_document_update();
                if !update.is_empty() {
                    entry.append(update);
                }

                if let Some(distance) = &mut self.save_distance {
                    *distance += 1;
                }
                self.observers.notify_redo_event(&entry);
                self.undo.push(entry);
                true
            }
            None => false,
        };

        self.document.begin_transaction();
        self.sensitive = true;
        self.document.set_seeking(false);
        redone
    }

    /// Close a transaction that should have been closed with `done`
    ///
    /// Stray changes are folded into the latest undo step, so undoing it
    /// reverts them too; they are dropped when there is no step.
    fn finish_incomplete_transaction(&mut self) {
        let partial = std::mem::take(&mut self.partial);
        let stray = EventLog::coalesce(partial, self.take_transaction());
        if stray.is_empty() {
            return;
        }

        assert!(
            !self.config.strict_transactions,
            "incomplete undo transaction: {} uncommitted changes",
            stray.len()
        );
        warn!(events = stray.len(), "incomplete undo transaction");
        stray.debug_print();

        match self.undo.last_mut() {
            Some(top) => top.append(stray),
            None => debug!("no undo step to hold the stray changes"),
        }
    }

    /// Run the update hook in its own transaction and return what it changed
    fn perform_document_update(&mut self) -> EventLog {
        self.document.begin_transaction();
        self.ensure_up_to_date();
        let update = self.document.commit_undoable();

        if !update.is_empty() {
            warn!(events = update.len(), "document was modified while being updated after undo/redo");
            update.debug_print();
        }
        update
    }

    fn ensure_up_to_date(&mut self) {
        if let Some(hook) = self.update_hook.as_mut() {
            hook(&self.document);
        }
    }

    fn take_transaction(&self) -> EventLog {
        if self.document.in_transaction() {
            self.document.commit_undoable()
        } else {
            EventLog::new()
        }
    }

    // ------------------------------------------------------------------
    // Sensitivity
    // ------------------------------------------------------------------

    /// Suspend (`false`) or resume (`true`) recording
    ///
    /// Edits made while insensitive are not undoable. What was recorded
    /// before suspending is kept and joins the next undo step.
    pub fn set_undo_sensitive(&mut self, sensitive: bool) {
        if self.sensitive == sensitive {
            return;
        }

        if sensitive {
            if !self.document.in_transaction() {
                self.document.begin_transaction();
            }
        } else {
            let partial = std::mem::take(&mut self.partial);
            self.partial = EventLog::coalesce(partial, self.take_transaction());
        }
        self.sensitive = sensitive;
    }

    pub fn undo_sensitive(&self) -> bool {
        self.sensitive
    }

    /// Whether an undo or redo is in progress
    ///
    /// Code reached during the replay asks the document instead, see
    /// [`Document::is_seeking`].
    pub fn is_seeking(&self) -> bool {
        self.document.is_seeking()
    }

    // ------------------------------------------------------------------
    // Stacks
    // ------------------------------------------------------------------

    pub fn clear_undo(&mut self) {
        if self.undo.is_empty() {
            return;
        }
        self.observers.notify_clear_undo_event();
        debug!(entries = self.undo.len(), "clearing undo stack");
        self.undo.clear();
        if self.save_distance.is_some_and(|distance| distance > 0) {
            self.save_distance = None;
        }
    }

    pub fn clear_redo(&mut self) {
        if self.redo.is_empty() {
            return;
        }
        self.observers.notify_clear_redo_event();
        debug!(entries = self.redo.len(), "clearing redo stack");
        self.redo.clear();
        if self.save_distance.is_some_and(|distance| distance < 0) {
            self.save_distance = None;
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Undo steps, oldest first
    pub fn undo_entries(&self) -> &[UndoEntry] {
        &self.undo
    }

    /// Redo steps, oldest first (the last one is redone next)
    pub fn redo_entries(&self) -> &[UndoEntry] {
        &self.redo
    }

    /// Total number of steps on both stacks
    pub fn history_size(&self) -> usize {
        self.undo.len() + self.redo.len()
    }

    // ------------------------------------------------------------------
    // Saved state
    // ------------------------------------------------------------------

    pub fn is_modified_since_save(&self) -> bool {
        self.save_distance != Some(0)
    }

    /// Record the current state as the saved one
    pub fn mark_saved(&mut self) {
        self.save_distance = Some(0);
    }

    // ------------------------------------------------------------------
    // Hooks and observers
    // ------------------------------------------------------------------

    pub fn add_undo_observer(&mut self, observer: Rc<dyn UndoStackObserver>) {
        self.observers.add(observer);
    }

    pub fn remove_undo_observer(&mut self, observer: &Rc<dyn UndoStackObserver>) -> bool {
        self.observers.remove(observer)
    }

    /// Recompute derived document state
    ///
    /// Runs before each step is closed (its changes become part of the step)
    /// and after each undo/redo (its changes are folded into the replayed
    /// step with a warning).
    pub fn set_update_hook(&mut self, hook: impl FnMut(&Document) + 'static) {
        self.update_hook = Some(Box::new(hook));
    }

    pub fn clear_update_hook(&mut self) {
        self.update_hook = None;
    }
}

impl fmt::Debug for UndoDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoDocument")
            .field("sensitive", &self.sensitive)
            .field("seeking", &self.document.is_seeking())
            .field("undo", &self.undo.len())
            .field("redo", &self.redo.len())
            .field("action_key", &self.action_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> (UndoDocument, tessera_xml::Node) {
        let document = Document::new();
        let rect = document.create_element("svg:rect");
        document.root().append_child(&rect);
        (UndoDocument::new(document), rect)
    }

    #[test]
    fn test_new_opens_transaction() {
        let (history, _rect) = history();
        assert!(history.document().in_transaction());
        assert!(history.undo_sensitive());
        assert!(!history.is_seeking());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_done_without_changes_pushes_nothing() {
        let (mut history, _rect) = history();
        history.done(ActionType::NONE, "nothing");
        assert_eq!(history.history_size(), 0);
        assert!(history.document().in_transaction());
    }

    #[test]
    fn test_undo_on_empty_stack() {
        let (mut history, _rect) = history();
        assert!(!history.undo());
        assert!(!history.redo());
        assert!(history.document().in_transaction());
    }

    #[test]
    fn test_save_distance() {
        let (mut history, rect) = history();
        assert!(!history.is_modified_since_save());

        rect.set_attribute("x", Some("1"));
        history.done(ActionType::NONE, "move");
        assert!(history.is_modified_since_save());

        history.mark_saved();
        rect.set_attribute("x", Some("2"));
        history.done(ActionType::NONE, "move");
        history.undo();
        assert!(!history.is_modified_since_save());

        history.undo();
        assert!(history.is_modified_since_save());
        history.redo();
        assert!(!history.is_modified_since_save());
    }

    #[test]
    fn test_new_step_after_undo_loses_saved_state() {
        let (mut history, rect) = history();
        rect.set_attribute("x", Some("1"));
        history.done(ActionType::NONE, "move");
        history.mark_saved();
        history.undo();

        rect.set_attribute("y", Some("1"));
        history.done(ActionType::NONE, "other");
        assert!(history.is_modified_since_save());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_debug_output() {
        let (history, _rect) = history();
        let debug = format!("{history:?}");
        assert!(debug.contains("sensitive: true"));
    }
}
