//! Scoped insensitivity

use std::ops::{Deref, DerefMut};

use crate::UndoDocument;

/// Suspends undo recording until dropped, then restores the previous
/// sensitivity
///
/// Derefs to the wrapped [`UndoDocument`].
pub struct ScopedInsensitive<'a> {
    history: &'a mut UndoDocument,
    saved: bool,
}

impl<'a> ScopedInsensitive<'a> {
    pub fn new(history: &'a mut UndoDocument) -> Self {
        let saved = history.undo_sensitive();
        history.set_undo_sensitive(false);
        Self { history, saved }
    }
}

impl Deref for ScopedInsensitive<'_> {
    type Target = UndoDocument;

    fn deref(&self) -> &UndoDocument {
        self.history
    }
}

impl DerefMut for ScopedInsensitive<'_> {
    fn deref_mut(&mut self) -> &mut UndoDocument {
        self.history
    }
}

impl Drop for ScopedInsensitive<'_> {
    fn drop(&mut self) {
        self.history.set_undo_sensitive(self.saved);
    }
}

impl UndoDocument {
    /// Suspend recording for the lifetime of the returned guard
    pub fn insensitive(&mut self) -> ScopedInsensitive<'_> {
        ScopedInsensitive::new(self)
    }
}
