//! Markup writer
//!
//! Serializes a (sub)tree as XML text for diagnostics and state comparison.
//! This is not a file-format exporter: no namespace declarations, no
//! prolog, no entity handling beyond attribute/text quoting.

use std::fmt::{self, Write};

use crate::{Node, NodeKind};

/// Writer settings
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Spaces per nesting level; 0 writes everything on one line
    pub indent: usize,
}

impl WriteOptions {
    pub fn compact() -> Self {
        Self::default()
    }

    pub fn indented(indent: usize) -> Self {
        Self { indent }
    }
}

/// Compact markup for `node` and its subtree
pub fn to_xml_string(node: &Node) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_node(node, &mut out, &WriteOptions::compact());
    out
}

/// Write `node` and its subtree to `out`
pub fn write_node<W: Write>(node: &Node, out: &mut W, options: &WriteOptions) -> fmt::Result {
    write_at(node, out, options, 0)
}

fn write_at<W: Write>(node: &Node, out: &mut W, options: &WriteOptions, level: usize) -> fmt::Result {
    match node.kind() {
        NodeKind::Document => {
            for child in node.children() {
                write_at(&child, out, options, level)?;
            }
            Ok(())
        }
        NodeKind::Text => write_quoted(out, node.content().as_deref().unwrap_or("")),
        NodeKind::Comment => {
            pad(out, options, level)?;
            write!(out, "<!--{}-->", node.content().as_deref().unwrap_or(""))?;
            newline(out, options)
        }
        NodeKind::ProcessingInstruction => {
            pad(out, options, level)?;
            write!(out, "<?{} {}?>", node.name(), node.content().as_deref().unwrap_or(""))?;
            newline(out, options)
        }
        NodeKind::Element => write_element(node, out, options, level),
    }
}

fn write_element<W: Write>(node: &Node, out: &mut W, options: &WriteOptions, level: usize) -> fmt::Result {
    pad(out, options, level)?;
    let name = node.name();
    write!(out, "<{name}")?;

    for record in &node.attributes() {
        write!(out, " {}=\"", node.resolve(record.key))?;
        write_quoted(out, &record.value)?;
        out.write_char('"')?;
    }

    if !node.has_children() {
        out.write_str("/>")?;
        return newline(out, options);
    }

    // Mixed content is written inline so text is not padded
    let loose = node.children().all(|child| child.kind() != NodeKind::Text);
    let child_options = if loose {
        options.clone()
    } else {
        WriteOptions::compact()
    };

    out.write_char('>')?;
    if loose {
        newline(out, options)?;
    }
    for child in node.children() {
        write_at(&child, out, &child_options, level + 1)?;
    }
    if loose {
        pad(out, options, level)?;
    }
    write!(out, "</{name}>")?;
    newline(out, options)
}

fn write_quoted<W: Write>(out: &mut W, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            '"' => out.write_str("&quot;")?,
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

fn pad<W: Write>(out: &mut W, options: &WriteOptions, level: usize) -> fmt::Result {
    for _ in 0..options.indent * level {
        out.write_char(' ')?;
    }
    Ok(())
}

fn newline<W: Write>(out: &mut W, options: &WriteOptions) -> fmt::Result {
    if options.indent > 0 {
        out.write_char('\n')?;
    }
    Ok(())
}
