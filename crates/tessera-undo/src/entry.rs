//! Undo stack entries

use std::fmt;

use tessera_xml::EventLog;

/// Application-defined tag for the kind of user action an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionType(pub u32);

impl ActionType {
    pub const NONE: ActionType = ActionType(0);
}

/// One undoable user action
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub(crate) log: EventLog,
    action_type: ActionType,
    description: String,
}

impl UndoEntry {
    pub(crate) fn new(log: EventLog, action_type: ActionType, description: &str) -> Self {
        Self {
            log,
            action_type,
            description: description.to_string(),
        }
    }

    /// Changes this action made, in log order
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Fold `newer` changes into this entry
    pub(crate) fn append(&mut self, newer: EventLog) {
        let log = std::mem::take(&mut self.log);
        self.log = EventLog::coalesce(log, newer);
    }

    /// Fold `older` changes in front of this entry
    pub(crate) fn prepend(&mut self, older: EventLog) {
        let log = std::mem::take(&mut self.log);
        self.log = EventLog::coalesce(older, log);
    }
}

impl fmt::Display for UndoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({} events)", self.description, self.log.len())
    }
}
