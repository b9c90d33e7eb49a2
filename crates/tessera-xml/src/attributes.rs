//! Element Attributes
//!
//! Persistent attribute list. Records are immutable and every change builds
//! a new list that shares its unchanged tail with the old one, so historical
//! log entries and observers can hold on to an old attribute state for the
//! price of a reference count.

use std::fmt;
use std::rc::Rc;

use crate::Quark;

/// Single immutable key/value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
    pub key: Quark,
    pub value: Rc<str>,
}

impl AttributeRecord {
    pub fn new(key: Quark, value: impl Into<Rc<str>>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

#[derive(Debug)]
struct AttrCell {
    record: AttributeRecord,
    next: Option<Rc<AttrCell>>,
}

/// Ordered cons-list of attribute records
///
/// A key appears at most once. New keys are appended; replacing a key keeps
/// its position. Cloning is O(1).
#[derive(Clone, Default)]
pub struct AttributeList {
    head: Option<Rc<AttrCell>>,
    len: usize,
}

impl AttributeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Current value for a key
    pub fn get(&self, key: Quark) -> Option<&Rc<str>> {
        self.iter().find(|r| r.key == key).map(|r| &r.value)
    }

    pub fn contains(&self, key: Quark) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            cell: self.head.as_deref(),
        }
    }

    /// Returns a list with `key` set to `value`
    ///
    /// Cells before the affected position are copied, everything after it is
    /// shared with `self`.
    pub fn with(&self, key: Quark, value: Rc<str>) -> AttributeList {
        let record = AttributeRecord { key, value };
        let mut prefix = Vec::with_capacity(self.len);
        let mut cell = self.head.as_ref();

        while let Some(current) = cell {
            if current.record.key == key {
                let tail = Some(Rc::new(AttrCell {
                    record,
                    next: current.next.clone(),
                }));
                return AttributeList {
                    head: rebuild(&prefix, tail),
                    len: self.len,
                };
            }
            prefix.push(&current.record);
            cell = current.next.as_ref();
        }

        let tail = Some(Rc::new(AttrCell { record, next: None }));
        AttributeList {
            head: rebuild(&prefix, tail),
            len: self.len + 1,
        }
    }

    /// Returns a list without `key` (a cheap clone if it was absent)
    pub fn without(&self, key: Quark) -> AttributeList {
        let mut prefix = Vec::with_capacity(self.len);
        let mut cell = self.head.as_ref();

        while let Some(current) = cell {
            if current.record.key == key {
                return AttributeList {
                    head: rebuild(&prefix, current.next.clone()),
                    len: self.len - 1,
                };
            }
            prefix.push(&current.record);
            cell = current.next.as_ref();
        }

        self.clone()
    }

    /// Whether both lists are the very same structure
    pub fn ptr_eq(&self, other: &AttributeList) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Prepend copies of `prefix` (in order) onto `tail`
fn rebuild(prefix: &[&AttributeRecord], tail: Option<Rc<AttrCell>>) -> Option<Rc<AttrCell>> {
    prefix.iter().rev().fold(tail, |next, record| {
        Some(Rc::new(AttrCell {
            record: (*record).clone(),
            next,
        }))
    })
}

/// Equality is by current value per key; order is ignored.
impl PartialEq for AttributeList {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .iter()
                .all(|r| other.get(r.key).is_some_and(|v| *v == r.value))
    }
}

impl Eq for AttributeList {}

impl fmt::Debug for AttributeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a AttributeList {
    type Item = &'a AttributeRecord;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over attribute records in list order
pub struct Iter<'a> {
    cell: Option<&'a AttrCell>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a AttributeRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let cell = self.cell?;
        self.cell = cell.next.as_deref();
        Some(&cell.record)
    }
}
