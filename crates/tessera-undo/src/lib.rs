//! Tessera Undo - Undo/redo history for tessera-xml documents
//!
//! Groups the transactions of a [`tessera_xml::Document`] into undoable user
//! actions:
//! - `done` / `maybe_done` close one action (optionally merging repeated
//!   actions that share a key, such as the steps of a drag)
//! - `undo` / `redo` replay stored logs against the live tree, so every
//!   node observer hears about the changes
//! - stack changes are broadcast to [`UndoStackObserver`]s
//!
//! # Example
//! ```rust
//! use tessera_undo::{ActionType, UndoDocument};
//! use tessera_xml::{Document, writer};
//!
//! let document = Document::new();
//! let a = document.create_element("a");
//! document.root().append_child(&a);
//!
//! let mut history = UndoDocument::new(document);
//! a.set_attribute("id", Some("x"));
//! history.done(ActionType::NONE, "Set id");
//!
//! assert!(history.undo());
//! assert_eq!(writer::to_xml_string(&a), "<a/>");
//! assert!(history.redo());
//! assert_eq!(writer::to_xml_string(&a), r#"<a id="x"/>"#);
//! ```

mod config;
mod entry;
mod guard;
mod observer;
mod undo;

pub use config::HistoryConfig;
pub use entry::{ActionType, UndoEntry};
pub use guard::ScopedInsensitive;
pub use observer::{CompositeUndoStackObserver, UndoStackObserver};
pub use undo::UndoDocument;
