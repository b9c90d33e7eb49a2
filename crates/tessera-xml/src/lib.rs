//! Tessera XML - Observable document tree with change logging
//!
//! Reference-counted XML-like tree (document, element, text, comment and
//! processing-instruction nodes) with:
//! - persistent attribute lists that history can share cheaply
//! - per-node and per-subtree observer fan-out, safe against add/remove
//!   from inside a notification
//! - transactional change logging into optimized [`EventLog`]s that can be
//!   undone or replayed against any [`NodeObserver`]
//!
//! Single-threaded by construction: handles are `Rc`, not `Send`.
//!
//! # Example
//! ```rust
//! use tessera_xml::{Document, writer};
//!
//! let doc = Document::new();
//! let a = doc.create_element("a");
//! doc.root().append_child(&a);
//!
//! doc.begin_transaction();
//! a.set_attribute("id", Some("x"));
//! let log = doc.commit_undoable();
//!
//! log.undo();
//! assert_eq!(writer::to_xml_string(&a), "<a/>");
//! ```

mod attributes;
mod document;
mod error;
mod event;
mod interner;
mod node;
mod observer;
mod performer;
pub mod traversal;
pub mod writer;

pub use attributes::{AttributeList, AttributeRecord, Iter as AttributeIter};
pub use document::Document;
pub use error::{TreeError, TreeResult};
pub use event::{Event, EventKind, EventLog};
pub use interner::{Quark, StringInterner};
pub use node::{Children, Node, NodeKind};
pub use observer::{CompositeNodeObserver, NodeObserver, ObserverList};
pub use performer::LogPerformer;
