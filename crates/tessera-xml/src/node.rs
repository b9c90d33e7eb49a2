//! Tree Node - Reference-counted handle
//!
//! A [`Node`] is a cheap, clonable handle; identity is pointer identity.
//! Parents own their children through forward-only sibling links, children
//! point back at their parent weakly. A detached node stays alive as long as
//! anything (an event log entry, an observer, a caller) still holds a handle,
//! which is what lets undo re-insert a deleted subtree.
//!
//! Every mutator reports to the owning document's logger first (recorded only
//! while a transaction is open) and then to the node's observer fan-out.
//! No `RefCell` borrow is held while observers run, so callbacks may mutate
//! the tree again.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use crate::document::DocumentInner;
use crate::event::EventKind;
use crate::traversal;
use crate::{
    AttributeList, CompositeNodeObserver, Document, NodeObserver, Quark, StringInterner,
    TreeError, TreeResult,
};

/// Node kind, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
    ProcessingInstruction,
}

struct Links {
    parent: Weak<NodeInner>,
    next: Option<Node>,
    first_child: Option<Node>,
    last_child: Weak<NodeInner>,
    child_count: usize,
}

pub(crate) struct NodeInner {
    kind: NodeKind,
    code: Quark,
    document: Weak<DocumentInner>,
    interner: Rc<RefCell<StringInterner>>,
    links: RefCell<Links>,
    attributes: RefCell<AttributeList>,
    content: RefCell<Option<Rc<str>>>,
    /// 0-based index among siblings, meaningful only while the parent's
    /// `cached_positions_valid` is set
    cached_position: Cell<usize>,
    cached_positions_valid: Cell<bool>,
    /// Per-node fan-out; always contains `subtree_observers`
    observers: CompositeNodeObserver,
    /// Chained into the parent's subtree observers while attached
    subtree_observers: Rc<CompositeNodeObserver>,
}

impl Drop for NodeInner {
    fn drop(&mut self) {
        // Unlink sibling chains iteratively so wide trees don't recurse
        let mut next = self.links.get_mut().first_child.take();
        while let Some(node) = next {
            next = node.0.links.borrow_mut().next.take();
        }
    }
}

/// Handle to a tree node
#[derive(Clone)]
pub struct Node(pub(crate) Rc<NodeInner>);

impl Node {
    pub(crate) fn new(
        kind: NodeKind,
        code: Quark,
        document: Weak<DocumentInner>,
        interner: Rc<RefCell<StringInterner>>,
        content: Option<Rc<str>>,
    ) -> Node {
        let subtree_observers = Rc::new(CompositeNodeObserver::new());
        let observers = CompositeNodeObserver::new();
        observers.add(subtree_observers.clone());

        Node(Rc::new(NodeInner {
            kind,
            code,
            document,
            interner,
            links: RefCell::new(Links {
                parent: Weak::new(),
                next: None,
                first_child: None,
                last_child: Weak::new(),
                child_count: 0,
            }),
            attributes: RefCell::new(AttributeList::new()),
            content: RefCell::new(content),
            cached_position: Cell::new(0),
            cached_positions_valid: Cell::new(true),
            observers,
            subtree_observers,
        }))
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.0.kind == NodeKind::Element
    }

    /// Interned qualified name
    #[inline]
    pub fn code(&self) -> Quark {
        self.0.code
    }

    /// Qualified name ("svg:rect"); the document node is named "xml"
    pub fn name(&self) -> Rc<str> {
        self.0.interner.borrow().resolve(self.0.code)
    }

    /// Resolve a quark from this node's document
    pub fn resolve(&self, quark: Quark) -> Rc<str> {
        self.0.interner.borrow().resolve(quark)
    }

    /// Owning document, if it is still alive
    pub fn document(&self) -> Option<Document> {
        self.0.document.upgrade().map(Document)
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn owner(&self) -> Document {
        match self.document() {
            Some(document) => document,
            None => panic!("{self} outlived its document"),
        }
    }

    fn belongs_to(&self, document: &Document) -> bool {
        std::ptr::eq(self.0.document.as_ptr(), Rc::as_ptr(&document.0))
    }

    // ------------------------------------------------------------------
    // Content and attributes
    // ------------------------------------------------------------------

    pub fn content(&self) -> Option<Rc<str>> {
        self.0.content.borrow().clone()
    }

    /// Replace the content string
    ///
    /// Nothing is logged or notified when the text does not change.
    pub fn set_content(&self, content: Option<&str>) {
        let (old, new) = {
            let mut slot = self.0.content.borrow_mut();
            if slot.as_deref() == content {
                return;
            }
            let new: Option<Rc<str>> = content.map(Rc::from);
            let old = std::mem::replace(&mut *slot, new.clone());
            (old, new)
        };

        self.log(|| EventKind::ContentChanged {
            old_value: old.clone(),
            new_value: new.clone(),
        });
        self.0
            .observers
            .notify_content_changed(self, old.as_deref(), new.as_deref());
    }

    /// Current value of an attribute
    pub fn attribute(&self, name: &str) -> Option<Rc<str>> {
        let key = self.0.interner.borrow().lookup(name)?;
        self.attribute_by_code(key)
    }

    pub fn attribute_by_code(&self, key: Quark) -> Option<Rc<str>> {
        self.0.attributes.borrow().get(key).cloned()
    }

    /// Snapshot of the attribute list (O(1), shares structure)
    pub fn attributes(&self) -> AttributeList {
        self.0.attributes.borrow().clone()
    }

    /// Set (`Some`) or remove (`None`) an attribute
    pub fn set_attribute(&self, name: &str, value: Option<&str>) {
        let key = match value {
            Some(_) => self.0.interner.borrow_mut().intern(name),
            // An unknown name cannot be set on any node
            None => match self.0.interner.borrow().lookup(name) {
                Some(key) => key,
                None => return,
            },
        };
        self.set_attribute_code(key, value);
    }

    /// Set or remove an attribute by interned key
    ///
    /// Nothing is logged or notified when the value does not change,
    /// including removal of an absent attribute.
    pub fn set_attribute_code(&self, key: Quark, value: Option<&str>) {
        let (old, new) = {
            let mut attributes = self.0.attributes.borrow_mut();
            let old = attributes.get(key).cloned();
            if old.as_deref() == value {
                return;
            }
            let new: Option<Rc<str>> = value.map(Rc::from);
            *attributes = match &new {
                Some(value) => attributes.with(key, Rc::clone(value)),
                None => attributes.without(key),
            };
            (old, new)
        };

        self.log(|| EventKind::AttributeChanged {
            key,
            old_value: old.clone(),
            new_value: new.clone(),
        });
        self.0
            .observers
            .notify_attribute_changed(self, key, old.as_deref(), new.as_deref());
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.links.borrow().parent.upgrade().map(Node)
    }

    pub fn next(&self) -> Option<Node> {
        self.0.links.borrow().next.clone()
    }

    /// Previous sibling (linear scan of the parent)
    pub fn prev(&self) -> Option<Node> {
        self.parent()?.previous_of(self)
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.links.borrow().first_child.clone()
    }

    pub fn last_child(&self) -> Option<Node> {
        self.0.links.borrow().last_child.upgrade().map(Node)
    }

    pub fn child_count(&self) -> usize {
        self.0.links.borrow().child_count
    }

    pub fn has_children(&self) -> bool {
        self.0.links.borrow().first_child.is_some()
    }

    pub fn nth_child(&self, index: usize) -> Option<Node> {
        self.children().nth(index)
    }

    pub fn children(&self) -> Children {
        Children {
            next: self.first_child(),
        }
    }

    /// Topmost ancestor (self if detached)
    pub fn root(&self) -> Node {
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// 0-based index among siblings, `None` if detached
    ///
    /// Repairs the parent's position cache in one O(children) pass when a
    /// reordering mutation invalidated it.
    pub fn position(&self) -> Option<usize> {
        let parent = self.parent()?;
        if !parent.0.cached_positions_valid.get() {
            for (index, child) in parent.children().enumerate() {
                child.0.cached_position.set(index);
            }
            parent.0.cached_positions_valid.set(true);
        }
        Some(self.0.cached_position.get())
    }

    fn is_child_of(&self, parent: &Node) -> bool {
        self.parent().is_some_and(|p| p == *parent)
    }

    fn previous_of(&self, child: &Node) -> Option<Node> {
        let mut prev: Option<Node> = None;
        let mut cursor = self.first_child();
        while let Some(node) = cursor {
            if node == *child {
                return prev;
            }
            cursor = node.next();
            prev = Some(node);
        }
        None
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Insert `child` after `after` (at the front if `None`)
    ///
    /// # Panics
    /// On any [`TreeError`] precondition failure.
    pub fn add_child(&self, child: &Node, after: Option<&Node>) {
        if let Err(err) = self.try_add_child(child, after) {
            panic!("add_child({child}) to {self}: {err}");
        }
    }

    pub fn try_add_child(&self, child: &Node, after: Option<&Node>) -> TreeResult<()> {
        self.check_insertable(child)?;
        if let Some(after) = after {
            if !after.is_child_of(self) {
                return Err(TreeError::NotAChild);
            }
        }

        self.link(child, after);
        self.attach_observers(child);

        self.log(|| EventKind::ChildAdded {
            child: child.clone(),
            prev: after.cloned(),
        });
        self.0.observers.notify_child_added(self, child, after);
        Ok(())
    }

    /// Insert `child` as the last child
    pub fn append_child(&self, child: &Node) {
        if let Err(err) = self.try_append_child(child) {
            panic!("append_child({child}) to {self}: {err}");
        }
    }

    pub fn try_append_child(&self, child: &Node) -> TreeResult<()> {
        let last = self.last_child();
        self.try_add_child(child, last.as_ref())
    }

    /// Detach `child` from this node
    ///
    /// # Panics
    /// If `child` is not a child of this node.
    pub fn remove_child(&self, child: &Node) {
        if let Err(err) = self.try_remove_child(child) {
            panic!("remove_child({child}) from {self}: {err}");
        }
    }

    pub fn try_remove_child(&self, child: &Node) -> TreeResult<()> {
        if !child.is_child_of(self) {
            return Err(TreeError::NotAChild);
        }

        let prev = self.previous_of(child);
        self.unlink(child, prev.as_ref());
        child.0.links.borrow_mut().parent = Weak::new();
        self.detach_observers(child);

        self.log(|| EventKind::ChildRemoved {
            child: child.clone(),
            prev: prev.clone(),
        });
        self.0
            .observers
            .notify_child_removed(self, child, prev.as_ref());
        Ok(())
    }

    /// Move `child` to just after `after` (to the front if `None`)
    ///
    /// # Panics
    /// If either node is not a child of this node, or they are the same node.
    pub fn change_order(&self, child: &Node, after: Option<&Node>) {
        if let Err(err) = self.try_change_order(child, after) {
            panic!("change_order({child}) in {self}: {err}");
        }
    }

    pub fn try_change_order(&self, child: &Node, after: Option<&Node>) -> TreeResult<()> {
        if !child.is_child_of(self) {
            return Err(TreeError::NotAChild);
        }
        if let Some(after) = after {
            if after == child {
                return Err(TreeError::SameNode);
            }
            if !after.is_child_of(self) {
                return Err(TreeError::NotAChild);
            }
        }

        let old_prev = self.previous_of(child);
        if old_prev.as_ref() == after {
            return Ok(());
        }

        self.unlink(child, old_prev.as_ref());
        self.link(child, after);
        self.0.cached_positions_valid.set(false);

        self.log(|| EventKind::ChildOrderChanged {
            child: child.clone(),
            old_prev: old_prev.clone(),
            new_prev: after.cloned(),
        });
        self.0
            .observers
            .notify_child_order_changed(self, child, old_prev.as_ref(), after);
        Ok(())
    }

    fn check_insertable(&self, child: &Node) -> TreeResult<()> {
        if child.0.kind == NodeKind::Document {
            return Err(TreeError::DocumentNode);
        }
        if child.parent().is_some() {
            return Err(TreeError::AlreadyParented);
        }
        if !Weak::ptr_eq(&self.0.document, &child.0.document) {
            return Err(TreeError::ForeignDocument);
        }
        if *child == *self || traversal::is_ancestor(child, self) {
            return Err(TreeError::Cycle);
        }
        Ok(())
    }

    /// Splice `child` in after `after` and set its parent
    fn link(&self, child: &Node, after: Option<&Node>) {
        let next = {
            let mut links = self.0.links.borrow_mut();
            let next = match after {
                Some(after) => after.0.links.borrow_mut().next.replace(child.clone()),
                None => links.first_child.replace(child.clone()),
            };

            if next.is_none() {
                links.last_child = Rc::downgrade(&child.0);
                match after {
                    // Pure append keeps a valid cache valid
                    Some(after) => {
                        if self.0.cached_positions_valid.get() {
                            child
                                .0
                                .cached_position
                                .set(after.0.cached_position.get() + 1);
                        }
                    }
                    None => {
                        child.0.cached_position.set(0);
                        self.0.cached_positions_valid.set(true);
                    }
                }
            } else {
                self.0.cached_positions_valid.set(false);
            }
            links.child_count += 1;
            next
        };

        let mut child_links = child.0.links.borrow_mut();
        child_links.next = next;
        child_links.parent = Rc::downgrade(&self.0);
    }

    /// Splice `child` out; `prev` must be its current previous sibling
    fn unlink(&self, child: &Node, prev: Option<&Node>) {
        let next = child.0.links.borrow_mut().next.take();
        let mut links = self.0.links.borrow_mut();

        if next.is_some() {
            self.0.cached_positions_valid.set(false);
        } else {
            links.last_child = prev.map(|p| Rc::downgrade(&p.0)).unwrap_or_default();
        }
        match prev {
            Some(prev) => prev.0.links.borrow_mut().next = next,
            None => links.first_child = next,
        }
        links.child_count -= 1;
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Observe changes made directly to this node
    pub fn add_observer(&self, observer: Rc<dyn NodeObserver>) {
        self.0.observers.add(observer);
    }

    pub fn remove_observer(&self, observer: &Rc<dyn NodeObserver>) -> bool {
        self.0.observers.remove(observer)
    }

    /// Observe changes made anywhere in this node's subtree
    pub fn add_subtree_observer(&self, observer: Rc<dyn NodeObserver>) {
        self.0.subtree_observers.add(observer);
    }

    pub fn remove_subtree_observer(&self, observer: &Rc<dyn NodeObserver>) -> bool {
        self.0.subtree_observers.remove(observer)
    }

    fn attach_observers(&self, child: &Node) {
        let parent_chain: Rc<dyn NodeObserver> = self.0.subtree_observers.clone();
        child.0.subtree_observers.add(parent_chain);
    }

    fn detach_observers(&self, child: &Node) {
        let parent_chain: Rc<dyn NodeObserver> = self.0.subtree_observers.clone();
        child.0.subtree_observers.remove(&parent_chain);
    }

    /// Report the node's current state to `observer` as if it had just been
    /// built: every attribute, every child in order, then the content
    pub fn synthesize_events(&self, observer: &dyn NodeObserver) {
        let attributes = self.attributes();
        for record in &attributes {
            observer.notify_attribute_changed(self, record.key, None, Some(&*record.value));
        }

        let mut prev: Option<Node> = None;
        for child in self.children() {
            observer.notify_child_added(self, &child, prev.as_ref());
            prev = Some(child);
        }

        let content = self.content();
        observer.notify_content_changed(self, None, content.as_deref());
    }

    fn log(&self, make: impl FnOnce() -> EventKind) {
        if let Some(document) = self.0.document.upgrade() {
            if document.is_logging() {
                document.record(self, make());
            }
        }
    }

    // ------------------------------------------------------------------
    // Copying
    // ------------------------------------------------------------------

    /// Deep copy into `document` (which may be another document)
    ///
    /// The copy is detached. Attribute lists are shared with the original
    /// when the document is the same, re-interned otherwise. Building the
    /// copy is not logged.
    ///
    /// # Panics
    /// If this is a document node.
    pub fn duplicate(&self, document: &Document) -> Node {
        assert!(
            self.0.kind != NodeKind::Document,
            "document nodes cannot be duplicated"
        );

        let same_document = self.belongs_to(document);
        let (code, attributes) = if same_document {
            (self.0.code, self.attributes())
        } else {
            let code = document.intern(&self.name());
            let attributes = self
                .attributes()
                .iter()
                .fold(AttributeList::new(), |list, record| {
                    list.with(document.intern(&self.resolve(record.key)), Rc::clone(&record.value))
                });
            (code, attributes)
        };

        let copy = document.make_node(self.0.kind, code, self.content());
        *copy.0.attributes.borrow_mut() = attributes;

        let mut last: Option<Node> = None;
        for child in self.children() {
            let child_copy = child.duplicate(document);
            copy.link(&child_copy, last.as_ref());
            copy.attach_observers(&child_copy);
            last = Some(child_copy);
        }

        copy
    }

    /// Merge `src` into this node
    ///
    /// Children of `src` whose `id_key` attribute matches a child of this
    /// node are merged recursively; all others are appended as copies.
    /// Content and attributes of `src` are then written over this node's.
    /// Every change goes through the logged mutators.
    pub fn merge_from(&self, src: &Node, id_key: &str) {
        assert!(self != src, "cannot merge {self} into itself");
        let document = self.owner();

        self.set_content(src.content().as_deref());

        for child in src.children() {
            let existing = child
                .attribute(id_key)
                .and_then(|id| traversal::lookup_child(self, id_key, &id));
            match existing {
                Some(target) => target.merge_from(&child, id_key),
                None => self.append_child(&child.duplicate(&document)),
            }
        }

        for record in &src.attributes() {
            self.set_attribute(&src.resolve(record.key), Some(&*record.value));
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.0.kind)
            .field("name", &&*self.name())
            .field("ptr", &Rc::as_ptr(&self.0))
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.kind {
            NodeKind::Document => f.write_str("#document"),
            NodeKind::Element => write!(f, "<{}>", self.name()),
            NodeKind::Text => f.write_str("#text"),
            NodeKind::Comment => f.write_str("#comment"),
            NodeKind::ProcessingInstruction => write!(f, "<?{}?>", self.name()),
        }
    }
}

/// Iterator over a node's children in order
pub struct Children {
    next: Option<Node>,
}

impl Iterator for Children {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let node = self.next.take()?;
        self.next = node.next();
        Some(node)
    }
}
