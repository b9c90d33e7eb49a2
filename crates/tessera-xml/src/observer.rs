//! Node Observers
//!
//! [`NodeObserver`] is the notification interface every view of the tree
//! implements. [`ObserverList`] is the reentrancy-safe registration table
//! behind each fan-out: observers may add or remove observers (themselves
//! included) from inside a callback.
//!
//! Protocol:
//! - while idle, `add` appends to the active list and `remove` erases at once
//! - while dispatching, `add` goes to a pending list (so the new observer sees
//!   nothing of the current dispatch) and `remove` only marks the record
//! - when the outermost dispatch finishes, marked records are dropped and the
//!   pending list is appended to the active one

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{Node, Quark};

/// Receives every structural, content and attribute change of a node
///
/// All methods default to doing nothing, so implementors only override what
/// they care about.
pub trait NodeObserver {
    /// `child` was inserted into `node` right after `prev` (at the front if `None`)
    fn notify_child_added(&self, _node: &Node, _child: &Node, _prev: Option<&Node>) {}

    /// `child` was removed from `node`; `prev` was its previous sibling
    fn notify_child_removed(&self, _node: &Node, _child: &Node, _prev: Option<&Node>) {}

    /// `child` moved from after `old_prev` to after `new_prev`
    fn notify_child_order_changed(
        &self,
        _node: &Node,
        _child: &Node,
        _old_prev: Option<&Node>,
        _new_prev: Option<&Node>,
    ) {
    }

    fn notify_content_changed(&self, _node: &Node, _old: Option<&str>, _new: Option<&str>) {}

    fn notify_attribute_changed(
        &self,
        _node: &Node,
        _key: Quark,
        _old: Option<&str>,
        _new: Option<&str>,
    ) {
    }
}

struct Record<O: ?Sized> {
    observer: Rc<O>,
    marked: Cell<bool>,
}

impl<O: ?Sized> Record<O> {
    fn new(observer: Rc<O>) -> Self {
        Self {
            observer,
            marked: Cell::new(false),
        }
    }

    fn is(&self, observer: &Rc<O>) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.observer), Rc::as_ptr(observer))
    }
}

/// Registration table with deferred add/remove during dispatch
pub struct ObserverList<O: ?Sized> {
    active: RefCell<Vec<Record<O>>>,
    pending: RefCell<Vec<Record<O>>>,
    iterating: Cell<u32>,
}

impl<O: ?Sized> ObserverList<O> {
    pub fn new() -> Self {
        Self {
            active: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
            iterating: Cell::new(0),
        }
    }

    /// Register an observer
    pub fn add(&self, observer: Rc<O>) {
        if self.iterating.get() == 0 {
            self.active.borrow_mut().push(Record::new(observer));
        } else {
            self.pending.borrow_mut().push(Record::new(observer));
        }
    }

    /// Unregister one registration of `observer`
    ///
    /// Returns `false` if it was not registered.
    pub fn remove(&self, observer: &Rc<O>) -> bool {
        if self.iterating.get() == 0 {
            remove_one(&self.active, observer) || remove_one(&self.pending, observer)
        } else {
            mark_one(&self.active, observer) || mark_one(&self.pending, observer)
        }
    }

    /// Number of live registrations (pending ones included)
    pub fn len(&self) -> usize {
        let live = |list: &RefCell<Vec<Record<O>>>| {
            list.borrow().iter().filter(|r| !r.marked.get()).count()
        };
        live(&self.active) + live(&self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a dispatch is in progress
    pub fn is_iterating(&self) -> bool {
        self.iterating.get() > 0
    }

    /// Call `f` on every active, unmarked observer
    ///
    /// No borrow of the table is held while `f` runs.
    pub fn for_each(&self, mut f: impl FnMut(&O)) {
        let _dispatch = Dispatch::enter(self);
        let count = self.active.borrow().len();

        for index in 0..count {
            let observer = {
                let active = self.active.borrow();
                active
                    .get(index)
                    .filter(|r| !r.marked.get())
                    .map(|r| Rc::clone(&r.observer))
            };
            if let Some(observer) = observer {
                f(&observer);
            }
        }
    }

    fn finish_iteration(&self) {
        let mut active = self.active.borrow_mut();
        let mut pending = self.pending.borrow_mut();
        active.retain(|r| !r.marked.get());
        pending.retain(|r| !r.marked.get());
        active.append(&mut pending);
    }
}

impl<O: ?Sized> Default for ObserverList<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks one level of dispatch nesting; the outermost level cleans up
struct Dispatch<'a, O: ?Sized> {
    list: &'a ObserverList<O>,
}

impl<'a, O: ?Sized> Dispatch<'a, O> {
    fn enter(list: &'a ObserverList<O>) -> Self {
        list.iterating.set(list.iterating.get() + 1);
        Self { list }
    }
}

impl<O: ?Sized> Drop for Dispatch<'_, O> {
    fn drop(&mut self) {
        let depth = self.list.iterating.get() - 1;
        self.list.iterating.set(depth);
        if depth == 0 {
            self.list.finish_iteration();
        }
    }
}

fn remove_one<O: ?Sized>(list: &RefCell<Vec<Record<O>>>, observer: &Rc<O>) -> bool {
    let mut list = list.borrow_mut();
    match list.iter().position(|r| r.is(observer)) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

fn mark_one<O: ?Sized>(list: &RefCell<Vec<Record<O>>>, observer: &Rc<O>) -> bool {
    let list = list.borrow();
    match list.iter().find(|r| !r.marked.get() && r.is(observer)) {
        Some(record) => {
            record.marked.set(true);
            true
        }
        None => false,
    }
}

/// Fan-out observer multiplexing every notification to its members
#[derive(Default)]
pub struct CompositeNodeObserver {
    observers: ObserverList<dyn NodeObserver>,
}

impl CompositeNodeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Rc<dyn NodeObserver>) {
        self.observers.add(observer);
    }

    pub fn remove(&self, observer: &Rc<dyn NodeObserver>) -> bool {
        self.observers.remove(observer)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl NodeObserver for CompositeNodeObserver {
    fn notify_child_added(&self, node: &Node, child: &Node, prev: Option<&Node>) {
        self.observers
            .for_each(|o| o.notify_child_added(node, child, prev));
    }

    fn notify_child_removed(&self, node: &Node, child: &Node, prev: Option<&Node>) {
        self.observers
            .for_each(|o| o.notify_child_removed(node, child, prev));
    }

    fn notify_child_order_changed(
        &self,
        node: &Node,
        child: &Node,
        old_prev: Option<&Node>,
        new_prev: Option<&Node>,
    ) {
        self.observers
            .for_each(|o| o.notify_child_order_changed(node, child, old_prev, new_prev));
    }

    fn notify_content_changed(&self, node: &Node, old: Option<&str>, new: Option<&str>) {
        self.observers
            .for_each(|o| o.notify_content_changed(node, old, new));
    }

    fn notify_attribute_changed(
        &self,
        node: &Node,
        key: Quark,
        old: Option<&str>,
        new: Option<&str>,
    ) {
        self.observers
            .for_each(|o| o.notify_attribute_changed(node, key, old, new));
    }
}
