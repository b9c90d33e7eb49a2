//! Document - Node factory and transaction primitives
//!
//! A document owns the root node, the symbol table and the log of the
//! currently open transaction. Mutations of any node created by the document
//! are recorded while a transaction is open and ignored otherwise.
//!
//! These are the low-level primitives; grouping transactions into undo steps
//! is the job of the undo engine built on top.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::event::{Event, EventKind};
use crate::node::NodeKind;
use crate::{EventLog, Node, Quark, StringInterner};

pub(crate) struct DocumentInner {
    root: Node,
    interner: Rc<RefCell<StringInterner>>,
    in_transaction: Cell<bool>,
    seeking: Cell<bool>,
    log: RefCell<EventLog>,
    next_serial: Cell<u64>,
}

impl DocumentInner {
    #[inline]
    pub(crate) fn is_logging(&self) -> bool {
        self.in_transaction.get()
    }

    pub(crate) fn record(&self, node: &Node, kind: EventKind) {
        let serial = self.next_serial.get();
        self.next_serial.set(serial + 1);

        let event = Event::new(serial, node.clone(), kind);
        trace!(%event, "logged");
        self.log.borrow_mut().push(event);
    }
}

/// Handle to an XML document
#[derive(Clone)]
pub struct Document(pub(crate) Rc<DocumentInner>);

impl Document {
    /// Create an empty document (a root node and nothing else)
    pub fn new() -> Self {
        let interner = Rc::new(RefCell::new(StringInterner::new()));
        let code = interner.borrow_mut().intern("xml");

        Document(Rc::new_cyclic(|weak| DocumentInner {
            root: Node::new(
                NodeKind::Document,
                code,
                weak.clone(),
                Rc::clone(&interner),
                None,
            ),
            interner,
            in_transaction: Cell::new(false),
            seeking: Cell::new(false),
            log: RefCell::new(EventLog::new()),
            next_serial: Cell::new(1),
        }))
    }

    /// The document node
    pub fn root(&self) -> Node {
        self.0.root.clone()
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ------------------------------------------------------------------
    // Factory
    // ------------------------------------------------------------------

    /// Create a detached element
    ///
    /// # Panics
    /// If `name` is empty.
    pub fn create_element(&self, name: &str) -> Node {
        assert!(!name.is_empty(), "element name must not be empty");
        let code = self.intern(name);
        self.make_node(NodeKind::Element, code, None)
    }

    pub fn create_text_node(&self, content: &str) -> Node {
        let code = self.intern("string");
        self.make_node(NodeKind::Text, code, Some(Rc::from(content)))
    }

    pub fn create_comment(&self, content: &str) -> Node {
        let code = self.intern("comment");
        self.make_node(NodeKind::Comment, code, Some(Rc::from(content)))
    }

    /// Create a processing instruction `<?target content?>`
    pub fn create_pi(&self, target: &str, content: &str) -> Node {
        assert!(!target.is_empty(), "processing instruction target must not be empty");
        let code = self.intern(target);
        self.make_node(NodeKind::ProcessingInstruction, code, Some(Rc::from(content)))
    }

    pub(crate) fn make_node(&self, kind: NodeKind, code: Quark, content: Option<Rc<str>>) -> Node {
        Node::new(
            kind,
            code,
            Rc::downgrade(&self.0),
            Rc::clone(&self.0.interner),
            content,
        )
    }

    // ------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------

    pub fn intern(&self, name: &str) -> Quark {
        self.0.interner.borrow_mut().intern(name)
    }

    /// Look up a name without interning it
    pub fn lookup(&self, name: &str) -> Option<Quark> {
        self.0.interner.borrow().lookup(name)
    }

    pub fn resolve(&self, quark: Quark) -> Rc<str> {
        self.0.interner.borrow().resolve(quark)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Start recording mutations
    ///
    /// # Panics
    /// If a transaction is already open.
    pub fn begin_transaction(&self) {
        assert!(
            !self.0.in_transaction.get(),
            "begin_transaction: a transaction is already open"
        );
        self.0.in_transaction.set(true);
        trace!("transaction opened");
    }

    pub fn in_transaction(&self) -> bool {
        self.0.in_transaction.get()
    }

    /// Undo everything recorded since `begin_transaction` and close it
    ///
    /// The undo itself is not recorded.
    pub fn rollback(&self) {
        assert!(
            self.0.in_transaction.get(),
            "rollback: no transaction is open"
        );
        self.0.in_transaction.set(false);

        let log = self.0.log.take();
        debug!(events = log.len(), "rolling back transaction");
        log.undo();
    }

    /// Keep the changes and close the transaction, discarding its log
    pub fn commit(&self) {
        assert!(self.0.in_transaction.get(), "commit: no transaction is open");
        self.0.in_transaction.set(false);

        let log = self.0.log.take();
        trace!(events = log.len(), "transaction committed");
    }

    /// Keep the changes, close the transaction and hand over its log
    pub fn commit_undoable(&self) -> EventLog {
        assert!(
            self.0.in_transaction.get(),
            "commit_undoable: no transaction is open"
        );
        self.0.in_transaction.set(false);

        let log = self.0.log.take();
        trace!(events = log.len(), "transaction committed with log");
        log
    }

    /// Number of events recorded so far in the open transaction
    pub fn pending_events(&self) -> usize {
        self.0.log.borrow().len()
    }

    /// Whether a stored log is being replayed onto the tree by an undo or redo
    ///
    /// Observers reached during the replay read `true`.
    pub fn is_seeking(&self) -> bool {
        self.0.seeking.get()
    }

    pub fn set_seeking(&self, seeking: bool) {
        self.0.seeking.set(seeking);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("in_transaction", &self.0.in_transaction.get())
            .field("pending_events", &self.pending_events())
            .finish()
    }
}
