//! Undo stack observers
//!
//! Notified whenever the history changes shape, so menus and history panels
//! can follow along.

use std::rc::Rc;

use tessera_xml::ObserverList;

use crate::UndoEntry;

/// Receives undo stack changes; every method defaults to doing nothing
pub trait UndoStackObserver {
    /// `entry` was undone and moved to the redo stack
    fn notify_undo_event(&self, _entry: &UndoEntry) {}

    /// `entry` was redone and moved back to the undo stack
    fn notify_redo_event(&self, _entry: &UndoEntry) {}

    /// `entry` was pushed as a new undo step
    fn notify_undo_commit_event(&self, _entry: &UndoEntry) {}

    fn notify_clear_undo_event(&self) {}

    fn notify_clear_redo_event(&self) {}

    /// `entry` fell off the bottom of a bounded undo stack
    fn notify_undo_expired(&self, _entry: &UndoEntry) {}
}

/// Fan-out to any number of [`UndoStackObserver`]s
#[derive(Default)]
pub struct CompositeUndoStackObserver {
    observers: ObserverList<dyn UndoStackObserver>,
}

impl CompositeUndoStackObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Rc<dyn UndoStackObserver>) {
        self.observers.add(observer);
    }

    pub fn remove(&self, observer: &Rc<dyn UndoStackObserver>) -> bool {
        self.observers.remove(observer)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl UndoStackObserver for CompositeUndoStackObserver {
    fn notify_undo_event(&self, entry: &UndoEntry) {
        self.observers.for_each(|o| o.notify_undo_event(entry));
    }

    fn notify_redo_event(&self, entry: &UndoEntry) {
        self.observers.for_each(|o| o.notify_redo_event(entry));
    }

    fn notify_undo_commit_event(&self, entry: &UndoEntry) {
        self.observers.for_each(|o| o.notify_undo_commit_event(entry));
    }

    fn notify_clear_undo_event(&self) {
        self.observers.for_each(|o| o.notify_clear_undo_event());
    }

    fn notify_clear_redo_event(&self) {
        self.observers.for_each(|o| o.notify_clear_redo_event());
    }

    fn notify_undo_expired(&self, entry: &UndoEntry) {
        self.observers.for_each(|o| o.notify_undo_expired(entry));
    }
}
