//! Symbol Table - Interned element names and attribute keys
//!
//! Names like "svg:rect" or "id" are stored once per document and referenced
//! by a 4-byte [`Quark`]. Attribute lookups compare quarks, not strings.

use std::collections::HashMap;
use std::rc::Rc;

/// Interned name - just 4 bytes
///
/// A quark is only meaningful for the [`StringInterner`] (and thus the
/// document) that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Quark(pub(crate) u32);

impl Quark {
    /// Empty name
    pub const EMPTY: Quark = Quark(0);

    /// Raw index into the owning interner
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Names almost every vector document uses
const COMMON_NAMES: &[&str] = &[
    "xml", "svg:svg", "svg:g", "svg:path", "svg:rect", "svg:circle", "svg:ellipse",
    "svg:line", "svg:polyline", "svg:polygon", "svg:text", "svg:tspan", "svg:defs",
    "svg:use", "svg:image", "svg:style", "svg:title", "svg:desc", "svg:metadata",
    "id", "class", "style", "transform", "d", "x", "y", "width", "height",
    "fill", "stroke", "xlink:href", "xml:space",
];

/// String interner for element names and attribute keys
///
/// Strings are kept as shared `Rc<str>` so a resolved name can outlive the
/// borrow of the table it came from.
#[derive(Debug)]
pub struct StringInterner {
    /// Map from string content to index
    map: HashMap<Rc<str>, u32>,
    /// Interned strings by index
    strings: Vec<Rc<str>>,
}

impl StringInterner {
    /// Create a new interner with common XML/SVG names pre-interned
    pub fn new() -> Self {
        let mut interner = Self {
            map: HashMap::with_capacity(64),
            strings: Vec::with_capacity(64),
        };

        // Index 0 is always the empty string
        interner.intern("");
        for name in COMMON_NAMES {
            interner.intern(name);
        }

        interner
    }

    /// Intern a string, returning its quark
    /// If the string is already interned, returns the existing quark
    pub fn intern(&mut self, s: &str) -> Quark {
        if let Some(&index) = self.map.get(s) {
            return Quark(index);
        }

        let index = self.strings.len() as u32;
        let shared: Rc<str> = Rc::from(s);
        self.strings.push(Rc::clone(&shared));
        self.map.insert(shared, index);

        Quark(index)
    }

    /// Look up a string without interning it
    pub fn lookup(&self, s: &str) -> Option<Quark> {
        self.map.get(s).map(|&index| Quark(index))
    }

    /// Get the string for a quark (empty for quarks from another table)
    #[inline]
    pub fn get(&self, quark: Quark) -> &str {
        self.strings
            .get(quark.0 as usize)
            .map(|s| &**s)
            .unwrap_or("")
    }

    /// Get a shared handle to the string for a quark
    pub fn resolve(&self, quark: Quark) -> Rc<str> {
        self.strings
            .get(quark.0 as usize)
            .cloned()
            .unwrap_or_else(|| Rc::from(""))
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
