//! Change Log
//!
//! Every elementary mutation made while a transaction is open becomes an
//! [`Event`] carrying enough to run it backwards (undo) or forwards again
//! (replay) against any [`NodeObserver`]. An [`EventLog`] is a chronological
//! chain of events that stays optimized as it grows: each new event is merged
//! with the one logged just before it when the two cancel out or collapse.
//!
//! Direction matters: undo walks newest to oldest, replay walks oldest to
//! newest. Undoing a whole log and then replaying it reconstructs the state
//! exactly, and vice versa.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::{LogPerformer, Node, NodeObserver, Quark};

/// What a single event changed
#[derive(Debug, Clone)]
pub enum EventKind {
    /// `child` was inserted after `prev`
    ChildAdded { child: Node, prev: Option<Node> },
    /// `child` was removed; `prev` was its previous sibling
    ChildRemoved { child: Node, prev: Option<Node> },
    AttributeChanged {
        key: Quark,
        old_value: Option<Rc<str>>,
        new_value: Option<Rc<str>>,
    },
    ContentChanged {
        old_value: Option<Rc<str>>,
        new_value: Option<Rc<str>>,
    },
    ChildOrderChanged {
        child: Node,
        old_prev: Option<Node>,
        new_prev: Option<Node>,
    },
}

/// One logged mutation of `node`
#[derive(Debug, Clone)]
pub struct Event {
    /// Per-document sequence number
    pub serial: u64,
    /// Subject of the change (the parent, for structural events)
    pub node: Node,
    pub kind: EventKind,
}

/// Outcome of merging an event with its predecessor
enum Merge {
    /// Both events cancel out
    Cancelled,
    /// Both collapsed into one
    Combined(Event),
    /// Nothing to merge; `(older, newer)`
    Kept(Event, Event),
}

impl Event {
    pub fn new(serial: u64, node: Node, kind: EventKind) -> Self {
        Self { serial, node, kind }
    }

    /// Notify `observer` of the opposite change
    pub fn undo(&self, observer: &dyn NodeObserver) {
        let node = &self.node;
        match &self.kind {
            EventKind::ChildAdded { child, prev } => {
                observer.notify_child_removed(node, child, prev.as_ref())
            }
            EventKind::ChildRemoved { child, prev } => {
                observer.notify_child_added(node, child, prev.as_ref())
            }
            EventKind::AttributeChanged {
                key,
                old_value,
                new_value,
            } => observer.notify_attribute_changed(
                node,
                *key,
                new_value.as_deref(),
                old_value.as_deref(),
            ),
            EventKind::ContentChanged {
                old_value,
                new_value,
            } => observer.notify_content_changed(node, new_value.as_deref(), old_value.as_deref()),
            EventKind::ChildOrderChanged {
                child,
                old_prev,
                new_prev,
            } => observer.notify_child_order_changed(
                node,
                child,
                new_prev.as_ref(),
                old_prev.as_ref(),
            ),
        }
    }

    /// Notify `observer` of the same change again
    pub fn replay(&self, observer: &dyn NodeObserver) {
        let node = &self.node;
        match &self.kind {
            EventKind::ChildAdded { child, prev } => {
                observer.notify_child_added(node, child, prev.as_ref())
            }
            EventKind::ChildRemoved { child, prev } => {
                observer.notify_child_removed(node, child, prev.as_ref())
            }
            EventKind::AttributeChanged {
                key,
                old_value,
                new_value,
            } => observer.notify_attribute_changed(
                node,
                *key,
                old_value.as_deref(),
                new_value.as_deref(),
            ),
            EventKind::ContentChanged {
                old_value,
                new_value,
            } => observer.notify_content_changed(node, old_value.as_deref(), new_value.as_deref()),
            EventKind::ChildOrderChanged {
                child,
                old_prev,
                new_prev,
            } => observer.notify_child_order_changed(
                node,
                child,
                old_prev.as_ref(),
                new_prev.as_ref(),
            ),
        }
    }

    /// The event that performs exactly the opposite change
    pub fn inverted(&self) -> Event {
        let kind = match &self.kind {
            EventKind::ChildAdded { child, prev } => EventKind::ChildRemoved {
                child: child.clone(),
                prev: prev.clone(),
            },
            EventKind::ChildRemoved { child, prev } => EventKind::ChildAdded {
                child: child.clone(),
                prev: prev.clone(),
            },
            EventKind::AttributeChanged {
                key,
                old_value,
                new_value,
            } => EventKind::AttributeChanged {
                key: *key,
                old_value: new_value.clone(),
                new_value: old_value.clone(),
            },
            EventKind::ContentChanged {
                old_value,
                new_value,
            } => EventKind::ContentChanged {
                old_value: new_value.clone(),
                new_value: old_value.clone(),
            },
            EventKind::ChildOrderChanged {
                child,
                old_prev,
                new_prev,
            } => EventKind::ChildOrderChanged {
                child: child.clone(),
                old_prev: new_prev.clone(),
                new_prev: old_prev.clone(),
            },
        };
        Event::new(self.serial, self.node.clone(), kind)
    }

    /// Merge `self` with `older`, the event logged immediately before it
    fn merge_with(self, older: Event) -> Merge {
        if self.node != older.node {
            return Merge::Kept(older, self);
        }

        match (older.kind, self.kind) {
            (
                EventKind::ChildRemoved { child: c1, prev: p1 },
                EventKind::ChildAdded { child: c2, prev: p2 },
            )
            | (
                EventKind::ChildAdded { child: c1, prev: p1 },
                EventKind::ChildRemoved { child: c2, prev: p2 },
            ) if c1 == c2 && p1 == p2 => Merge::Cancelled,

            (
                EventKind::AttributeChanged {
                    key: k1,
                    old_value,
                    ..
                },
                EventKind::AttributeChanged {
                    key: k2,
                    new_value,
                    ..
                },
            ) if k1 == k2 => {
                if old_value == new_value {
                    Merge::Cancelled
                } else {
                    Merge::Combined(Event::new(
                        self.serial,
                        self.node,
                        EventKind::AttributeChanged {
                            key: k2,
                            old_value,
                            new_value,
                        },
                    ))
                }
            }

            (
                EventKind::ContentChanged { old_value, .. },
                EventKind::ContentChanged { new_value, .. },
            ) => {
                if old_value == new_value {
                    Merge::Cancelled
                } else {
                    Merge::Combined(Event::new(
                        self.serial,
                        self.node,
                        EventKind::ContentChanged {
                            old_value,
                            new_value,
                        },
                    ))
                }
            }

            (
                EventKind::ChildOrderChanged {
                    child: c1,
                    old_prev,
                    new_prev: _,
                },
                EventKind::ChildOrderChanged {
                    child: c2,
                    old_prev: _,
                    new_prev,
                },
            ) if c1 == c2 => {
                if old_prev == new_prev {
                    Merge::Cancelled
                } else {
                    Merge::Combined(Event::new(
                        self.serial,
                        self.node,
                        EventKind::ChildOrderChanged {
                            child: c2,
                            old_prev,
                            new_prev,
                        },
                    ))
                }
            }

            (older_kind, newer_kind) => Merge::Kept(
                Event::new(older.serial, older.node, older_kind),
                Event::new(self.serial, self.node, newer_kind),
            ),
        }
    }

    fn label(&self) -> &'static str {
        match self.kind {
            EventKind::ChildAdded { .. } => "child-added",
            EventKind::ChildRemoved { .. } => "child-removed",
            EventKind::AttributeChanged { .. } => "attribute-changed",
            EventKind::ContentChanged { .. } => "content-changed",
            EventKind::ChildOrderChanged { .. } => "child-order-changed",
        }
    }
}

struct Sibling<'a>(Option<&'a Node>);

impl fmt::Display for Sibling<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(node) => write!(f, "after {node}"),
            None => f.write_str("at start"),
        }
    }
}

struct Value<'a>(Option<&'a str>);

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value:?}"),
            None => f.write_str("(none)"),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}: ", self.serial, self.label(), self.node)?;
        match &self.kind {
            EventKind::ChildAdded { child, prev } | EventKind::ChildRemoved { child, prev } => {
                write!(f, "{child} {}", Sibling(prev.as_ref()))
            }
            EventKind::AttributeChanged {
                key,
                old_value,
                new_value,
            } => write!(
                f,
                "{} {} -> {}",
                self.node.resolve(*key),
                Value(old_value.as_deref()),
                Value(new_value.as_deref())
            ),
            EventKind::ContentChanged {
                old_value,
                new_value,
            } => write!(
                f,
                "{} -> {}",
                Value(old_value.as_deref()),
                Value(new_value.as_deref())
            ),
            EventKind::ChildOrderChanged {
                child,
                old_prev,
                new_prev,
            } => write!(
                f,
                "{child} from {} to {}",
                Sibling(old_prev.as_ref()),
                Sibling(new_prev.as_ref())
            ),
        }
    }
}

/// Chronological chain of events for one transaction or undo step
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    /// Oldest first
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events newest first (the order undo visits them)
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Event> + '_ {
        self.events.iter().rev()
    }

    /// Most recently logged event
    pub fn newest(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Append `event` as the newest entry, merging it with its predecessor
    /// when possible
    pub fn push(&mut self, event: Event) {
        let Some(older) = self.events.pop() else {
            self.events.push(event);
            return;
        };

        match event.merge_with(older) {
            Merge::Cancelled => {}
            Merge::Combined(merged) => self.events.push(merged),
            Merge::Kept(older, newer) => {
                self.events.push(older);
                self.events.push(newer);
            }
        }
    }

    /// Join `newer` onto the end of `older`
    ///
    /// Both logs are assumed optimized already; only the junction between
    /// them is optimized.
    pub fn coalesce(older: EventLog, newer: EventLog) -> EventLog {
        if newer.is_empty() {
            return older;
        }
        if older.is_empty() {
            return newer;
        }

        let mut joined = older;
        let mut rest = newer.events.into_iter();
        if let Some(first) = rest.next() {
            joined.push(first);
        }
        joined.events.extend(rest);
        joined
    }

    /// Log that reverts this one when replayed
    pub fn inverted(&self) -> EventLog {
        EventLog {
            events: self.events.iter().rev().map(Event::inverted).collect(),
        }
    }

    /// Undo every event, newest first
    pub fn undo_to(&self, observer: &dyn NodeObserver) {
        for event in self.events.iter().rev() {
            event.undo(observer);
        }
    }

    /// Replay every event, oldest first
    pub fn replay_to(&self, observer: &dyn NodeObserver) {
        for event in &self.events {
            event.replay(observer);
        }
    }

    /// Apply the undo of this log to the tree
    pub fn undo(&self) {
        self.undo_to(&LogPerformer);
    }

    /// Apply this log to the tree again
    pub fn replay(&self) {
        self.replay_to(&LogPerformer);
    }

    /// Dump the log at debug level, newest first
    pub fn debug_print(&self) {
        debug!("event log ({} events):", self.events.len());
        for event in self.iter() {
            debug!("  {event}");
        }
    }
}

impl fmt::Display for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in self.iter() {
            writeln!(f, "{event}")?;
        }
        Ok(())
    }
}

impl FromIterator<Event> for EventLog {
    /// Collects events in chronological order, optimizing as they go
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        let mut log = EventLog::new();
        for event in iter {
            log.push(event);
        }
        log
    }
}
