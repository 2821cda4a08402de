//! Submission tree
//!
//! An ODK submission is an XML instance document: one element per answered
//! field, grouped by nesting. The tree is stored as an arena in *document
//! order* (pre-order, depth-first), so "first match in document order" is
//! simply the lowest index.
//!
//! Element names are matched by local name: `<orx:instanceID>` and
//! `<instanceID>` are the same field.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    /// Direct character data (text + CDATA, unescaped). `None` when the
    /// element has none, or when it is a group whose only text is the
    /// whitespace between child elements.
    pub text: Option<String>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Error)]
pub enum SubmissionParseError {
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("document has no root element")]
    NoRoot,
    #[error("document has more than one root element (second is `{0}`)")]
    MultipleRoots(String),
    #[error("element `{0}` is never closed")]
    Unclosed(String),
    #[error("text outside the root element")]
    StrayText,
}

impl SubmissionTree {
    pub fn parse(xml: &str) -> Result<Self, SubmissionParseError> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);
        let mut nodes: Vec<Node> = Vec::new();
        let mut open: Vec<usize> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|err| syntax_error(reader.buffer_position(), err))?;
            match event {
                Event::Start(e) => {
                    let id = push_element(&mut nodes, &open, &e)?;
                    open.push(id);
                }
                Event::Empty(e) => {
                    push_element(&mut nodes, &open, &e)?;
                }
                Event::End(_) => {
                    if let Some(id) = open.pop() {
                        let node = &mut nodes[id];
                        let formatting_only = !node.children.is_empty()
                            && node.text.as_deref().is_some_and(|t| t.trim().is_empty());
                        if formatting_only {
                            node.text = None;
                        }
                    }
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|err| syntax_error(reader.buffer_position(), err))?;
                    append_text(&mut nodes, &open, &text)?;
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    append_text(&mut nodes, &open, &text)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctypes.
                _ => {}
            }
        }

        if let Some(&id) = open.last() {
            return Err(SubmissionParseError::Unclosed(nodes[id].name.clone()));
        }
        if nodes.is_empty() {
            return Err(SubmissionParseError::NoRoot);
        }
        Ok(Self { nodes })
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First descendant of the root named `name`, in document order. The
    /// root itself is never a match.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, node)| node.name == name)
            .map(|(index, _)| NodeId(index))
    }

    /// Text of the first descendant named `name`, when it has any.
    pub fn text_of(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(|id| self.node(id).text.as_deref())
    }

    /// Descendants of the root without children, in document order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, node)| node.is_leaf())
            .map(|(index, _)| NodeId(index))
            .collect()
    }

    pub fn set_text(&mut self, id: NodeId, text: String) {
        self.nodes[id.0].text = Some(text);
    }
}

fn syntax_error(position: usize, err: quick_xml::Error) -> SubmissionParseError {
    SubmissionParseError::Syntax {
        position,
        message: err.to_string(),
    }
}

fn push_element(
    nodes: &mut Vec<Node>,
    open: &[usize],
    e: &BytesStart<'_>,
) -> Result<usize, SubmissionParseError> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let id = nodes.len();
    match open.last() {
        Some(&parent) => nodes[parent].children.push(NodeId(id)),
        None if !nodes.is_empty() => return Err(SubmissionParseError::MultipleRoots(name)),
        None => {}
    }
    nodes.push(Node {
        name,
        text: None,
        children: Vec::new(),
    });
    Ok(id)
}

fn append_text(nodes: &mut [Node], open: &[usize], text: &str) -> Result<(), SubmissionParseError> {
    match open.last() {
        Some(&id) => {
            nodes[id]
                .text
                .get_or_insert_with(String::new)
                .push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(SubmissionParseError::StrayText),
    }
}
