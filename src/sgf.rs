//! SGF (Smart Game Format) reading and writing.
//!
//! The reader is a character-driven finite-state scanner. It emits tree,
//! node and property events to a builder that assembles a [`Collection`]
//! of [`GameTree`]s. Every node gets a move number (`MN`) when it closes.
//!
//! Only a handful of tags are interpreted ([`Property`]); everything else
//! is carried verbatim so that a record can be written back without loss.
//!
//! ## Example
//!
//! ```
//! use golib_rust::sgf::parse;
//!
//! let collection = parse("(;SZ[19];B[pd];W[dp])").unwrap();
//! let nodes = &collection.trees[0].nodes;
//! assert_eq!(nodes[2].number(), Some(2));
//! assert_eq!(parse(&collection.to_string()).unwrap(), collection);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use log::warn;

use crate::board::{Color, Point};
use crate::constants::{SETUP_TAGS, TAG_BLACK, TAG_COMMENT, TAG_NUMBER, TAG_SIZE, TAG_WHITE};
use crate::error::SgfError;
use crate::moves::{Move, sgf_point};

// =============================================================================
// Tree model
// =============================================================================

/// An interpreted property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Property {
    /// `B[..]` / `W[..]`, `None` for a pass.
    Play(Color, Option<Point>),
    /// `MN[..]`
    Number(usize),
    /// `SZ[..]`
    Size(usize),
    /// `C[..]`
    Comment(String),
}

impl Property {
    pub fn tag(&self) -> &'static str {
        match self {
            Property::Play(Color::Black, _) => TAG_BLACK,
            Property::Play(Color::White, _) => TAG_WHITE,
            Property::Number(_) => TAG_NUMBER,
            Property::Size(_) => TAG_SIZE,
            Property::Comment(_) => TAG_COMMENT,
        }
    }

    /// The unescaped property value.
    pub fn value(&self) -> String {
        match self {
            Property::Play(color, point) => Move {
                color: *color,
                point: *point,
                number: 0,
            }
            .sgf_value(),
            Property::Number(n) | Property::Size(n) => n.to_string(),
            Property::Comment(text) => text.clone(),
        }
    }

    /// A node holds at most one property of each kind, and a single move.
    fn same_kind(&self, other: &Property) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A node: interpreted properties plus pass-through tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    props: Vec<Property>,
    extra: BTreeMap<String, Vec<String>>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// A node playing `mv`, numbered after it.
    pub fn from_move(mv: &Move) -> Self {
        let mut node = Self::new();
        node.set(Property::Play(mv.color, mv.point));
        node.set(Property::Number(mv.number));
        node
    }

    /// Add or replace a property, keeping the position of the one replaced.
    pub fn set(&mut self, prop: Property) {
        match self.props.iter_mut().find(|p| p.same_kind(&prop)) {
            Some(slot) => *slot = prop,
            None => self.props.push(prop),
        }
    }

    pub fn properties(&self) -> &[Property] {
        &self.props
    }

    /// Tags the node carries but does not interpret.
    pub fn extra(&self) -> &BTreeMap<String, Vec<String>> {
        &self.extra
    }

    pub fn set_extra(&mut self, tag: impl Into<String>, values: Vec<String>) {
        self.extra.insert(tag.into(), values);
    }

    pub fn number(&self) -> Option<usize> {
        self.props.iter().find_map(|p| match p {
            Property::Number(n) => Some(*n),
            _ => None,
        })
    }

    pub fn set_number(&mut self, number: usize) {
        self.set(Property::Number(number));
    }

    pub fn play(&self) -> Option<(Color, Option<Point>)> {
        self.props.iter().find_map(|p| match p {
            Property::Play(color, point) => Some((*color, *point)),
            _ => None,
        })
    }

    pub fn size(&self) -> Option<usize> {
        self.props.iter().find_map(|p| match p {
            Property::Size(n) => Some(*n),
            _ => None,
        })
    }

    pub fn comment(&self) -> Option<&str> {
        self.props.iter().find_map(|p| match p {
            Property::Comment(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// The move played by this node, numbered with its `MN` (0 if missing).
    pub fn to_move(&self) -> Option<Move> {
        let (color, point) = self.play()?;
        Some(Move {
            color,
            point,
            number: self.number().unwrap_or(0),
        })
    }

    pub fn has_setup(&self) -> bool {
        SETUP_TAGS.iter().any(|t| self.extra.contains_key(*t))
    }

    /// Give this node a move number.
    ///
    /// A forced number always wins. Otherwise an existing number is kept, and a
    /// missing one is inherited from `previous` (0 when there is none), plus
    /// one if this node plays a move.
    pub fn assign_number(&mut self, previous: Option<usize>, force: Option<usize>) {
        if let Some(n) = force {
            self.set_number(n);
            return;
        }
        if self.number().is_some() {
            return;
        }
        let mut n = previous.unwrap_or(0);
        if self.play().is_some() {
            n += 1;
        }
        self.set_number(n);
    }

    /// Store a property read from text, interpreting the known tags.
    fn add(&mut self, tag: String, values: Vec<String>) -> Result<(), SgfError> {
        let invalid = |value: &str| SgfError::Value {
            tag: tag.clone(),
            value: value.to_string(),
        };
        let single = || match values.as_slice() {
            [v] => Ok(v.clone()),
            _ => Err(invalid(&values.concat())),
        };
        let prop = match tag.as_str() {
            TAG_BLACK | TAG_WHITE => {
                let color = if tag == TAG_BLACK {
                    Color::Black
                } else {
                    Color::White
                };
                let value = single()?;
                let point = sgf_point(&value).map_err(|_| invalid(&value))?;
                Property::Play(color, point)
            }
            TAG_NUMBER => {
                let value = single()?;
                Property::Number(value.trim().parse().map_err(|_| invalid(&value))?)
            }
            TAG_SIZE => {
                let value = single()?;
                Property::Size(value.trim().parse().map_err(|_| invalid(&value))?)
            }
            TAG_COMMENT => Property::Comment(single()?),
            _ => {
                if self.extra.contains_key(&tag) {
                    return Err(invalid(&values.concat()));
                }
                if SETUP_TAGS.contains(&tag.as_str()) {
                    warn!("setup property {tag} is not supported, the game may not render correctly");
                }
                self.set_extra(tag.clone(), values.clone());
                return Ok(());
            }
        };
        // One move per node, and one value list per tag.
        if self.props.iter().any(|p| p.same_kind(&prop)) {
            return Err(invalid(&values.concat()));
        }
        self.set(prop);
        Ok(())
    }
}

/// A sequence of nodes followed by variations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameTree {
    pub nodes: Vec<Node>,
    pub children: Vec<GameTree>,
}

impl GameTree {
    /// The nodes of the main line of play: this sequence followed by the main
    /// line of the first variation.
    ///
    /// Also returns the number of variations left out.
    pub fn principal_line(&self) -> (Vec<Node>, usize) {
        let mut nodes = self.nodes.clone();
        let mut dropped = 0;
        let mut tree = self;
        while let Some(first) = tree.children.first() {
            dropped += tree.children.len() - 1;
            nodes.extend(first.nodes.iter().cloned());
            tree = first;
        }
        (nodes, dropped)
    }
}

/// The content of an SGF file: one or more game trees.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collection {
    pub trees: Vec<GameTree>,
}

// =============================================================================
// Writer
// =============================================================================

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace(']', "\\]")
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(";")?;
        for prop in &self.props {
            writeln!(f, "{}[{}]", prop.tag(), escape(&prop.value()))?;
        }
        for (tag, values) in &self.extra {
            f.write_str(tag)?;
            for value in values {
                write!(f, "[{}]", escape(value))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for GameTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for node in &self.nodes {
            write!(f, "{node}")?;
        }
        for child in &self.children {
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tree in &self.trees {
            writeln!(f, "{tree}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Scanner states.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScanState {
    /// Waiting for the `(` opening a game tree.
    AwaitTree,
    /// Waiting for the `;` of a tree's first node.
    AwaitNode,
    /// Inside a node: a property, a new node, a variation or the tree end.
    InNode,
    /// Reading a property identifier.
    Identifier,
    /// Identifier read, waiting for `[`.
    AwaitValue,
    /// Copying a value until an unescaped `]`.
    Value,
    /// The character after a `\` in a value.
    Escape,
    /// After a value: another value, a property, a node, a variation or the end.
    PostValue,
    /// A game tree just closed.
    TreeClosed,
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n' | '\u{feff}')
}

/// Assembles the collection from scanner events.
#[derive(Default)]
struct Builder {
    collection: Collection,
    open: Vec<GameTree>,
    node: Option<Node>,
    ident: String,
    values: Vec<String>,
    value: String,
}

impl Builder {
    fn start_tree(&mut self) {
        self.open.push(GameTree::default());
    }

    /// Returns false when there is no tree to close.
    fn end_tree(&mut self) -> bool {
        let Some(tree) = self.open.pop() else {
            return false;
        };
        match self.open.last_mut() {
            Some(parent) => parent.children.push(tree),
            None => self.collection.trees.push(tree),
        }
        true
    }

    fn start_node(&mut self) {
        self.node = Some(Node::new());
    }

    fn end_node(&mut self) {
        let Some(mut node) = self.node.take() else {
            return;
        };
        // Previous node in this sequence, or the branch point of a variation.
        let previous = self
            .open
            .iter()
            .rev()
            .find_map(|tree| tree.nodes.last())
            .and_then(Node::number);
        node.assign_number(previous, None);
        if let Some(tree) = self.open.last_mut() {
            tree.nodes.push(node);
        }
    }

    fn start_property(&mut self, first: char) {
        self.ident.clear();
        self.ident.push(first);
        self.values.clear();
    }

    fn end_value(&mut self) {
        self.values.push(std::mem::take(&mut self.value));
    }

    fn end_property(&mut self) -> Result<(), SgfError> {
        let tag = std::mem::take(&mut self.ident);
        let values = std::mem::take(&mut self.values);
        match self.node.as_mut() {
            Some(node) => node.add(tag, values),
            None => Ok(()),
        }
    }
}

struct Scanner {
    state: ScanState,
    builder: Builder,
}

impl Scanner {
    fn new() -> Self {
        Self {
            state: ScanState::AwaitTree,
            builder: Builder::default(),
        }
    }

    fn feed(&mut self, ch: char, offset: usize) -> Result<(), SgfError> {
        use ScanState::*;

        let unexpected = SgfError::Unexpected {
            ch,
            state: self.state,
            offset,
        };
        let b = &mut self.builder;
        self.state = match self.state {
            AwaitTree => match ch {
                c if is_whitespace(c) => AwaitTree,
                '(' => {
                    b.start_tree();
                    AwaitNode
                }
                _ => return Err(unexpected),
            },
            AwaitNode => match ch {
                c if is_whitespace(c) => AwaitNode,
                ';' => {
                    b.start_node();
                    InNode
                }
                _ => return Err(unexpected),
            },
            InNode => match ch {
                c if is_whitespace(c) => InNode,
                c if c.is_ascii_uppercase() => {
                    b.start_property(c);
                    Identifier
                }
                ';' => {
                    b.end_node();
                    b.start_node();
                    InNode
                }
                '(' => {
                    b.end_node();
                    b.start_tree();
                    AwaitNode
                }
                ')' => {
                    b.end_node();
                    b.end_tree();
                    TreeClosed
                }
                _ => return Err(unexpected),
            },
            Identifier => match ch {
                c if c.is_ascii_uppercase() => {
                    b.ident.push(c);
                    Identifier
                }
                // Long-form identifiers like "AddBlack" keep their capitals only.
                c if c.is_ascii_lowercase() => Identifier,
                c if is_whitespace(c) => AwaitValue,
                '[' => Value,
                _ => return Err(unexpected),
            },
            AwaitValue => match ch {
                c if is_whitespace(c) => AwaitValue,
                '[' => Value,
                _ => return Err(unexpected),
            },
            Value => match ch {
                '\\' => Escape,
                ']' => {
                    b.end_value();
                    PostValue
                }
                c => {
                    b.value.push(c);
                    Value
                }
            },
            Escape => {
                b.value.push(ch);
                Value
            }
            PostValue => match ch {
                c if is_whitespace(c) => PostValue,
                '[' => Value,
                ';' => {
                    b.end_property()?;
                    b.end_node();
                    b.start_node();
                    InNode
                }
                c if c.is_ascii_uppercase() => {
                    b.end_property()?;
                    b.start_property(c);
                    Identifier
                }
                ')' => {
                    b.end_property()?;
                    b.end_node();
                    b.end_tree();
                    TreeClosed
                }
                '(' => {
                    b.end_property()?;
                    b.end_node();
                    b.start_tree();
                    AwaitNode
                }
                _ => return Err(unexpected),
            },
            TreeClosed => match ch {
                c if is_whitespace(c) => TreeClosed,
                ')' => {
                    if !b.end_tree() {
                        return Err(unexpected);
                    }
                    TreeClosed
                }
                '(' => {
                    b.start_tree();
                    AwaitNode
                }
                _ => return Err(unexpected),
            },
        };
        Ok(())
    }

    fn finish(self) -> Result<Collection, SgfError> {
        if self.state != ScanState::TreeClosed || !self.builder.open.is_empty() {
            return Err(SgfError::Truncated { state: self.state });
        }
        if self.builder.collection.trees.is_empty() {
            return Err(SgfError::Empty);
        }
        Ok(self.builder.collection)
    }
}

/// Parse SGF text into a collection of game trees.
pub fn parse(text: &str) -> Result<Collection, SgfError> {
    let mut scanner = Scanner::new();
    for (offset, ch) in text.char_indices() {
        scanner.feed(ch, offset)?;
    }
    scanner.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(tree: &GameTree) -> Vec<Move> {
        tree.nodes.iter().filter_map(Node::to_move).collect()
    }

    #[test]
    fn test_parse_simple_game() {
        let c = parse("(;SZ[19]C[hello];B[dd];W[pp];B[])").unwrap();
        assert_eq!(c.trees.len(), 1);
        let tree = &c.trees[0];
        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(tree.nodes[0].size(), Some(19));
        assert_eq!(tree.nodes[0].comment(), Some("hello"));
        assert_eq!(tree.nodes[0].number(), Some(0));

        let mvs = moves(tree);
        assert_eq!(mvs.len(), 3);
        assert_eq!(mvs[0], Move::new(Color::Black, (3, 3), 1));
        assert_eq!(mvs[1].point, Some((15, 15)));
        assert!(mvs[2].is_pass());
        let numbers: Vec<usize> = mvs.iter().map(|m| m.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_existing_number_is_kept() {
        let c = parse("(;B[aa]MN[7];W[bb])").unwrap();
        let nodes = &c.trees[0].nodes;
        assert_eq!(nodes[0].number(), Some(7));
        assert_eq!(nodes[1].number(), Some(8));
    }

    #[test]
    fn test_non_move_node_does_not_increment() {
        let c = parse("(;B[aa];C[just a comment];W[bb])").unwrap();
        let numbers: Vec<_> = c.trees[0].nodes.iter().map(|n| n.number()).collect();
        assert_eq!(numbers, vec![Some(1), Some(1), Some(2)]);
    }

    #[test]
    fn test_escapes() {
        let c = parse(r"(;C[a \] b \\ c \x])").unwrap();
        assert_eq!(c.trees[0].nodes[0].comment(), Some(r"a ] b \ c x"));
        let out = c.to_string();
        assert!(out.contains(r"C[a \] b \\ c x]"), "{out}");
    }

    #[test]
    fn test_whitespace_is_insignificant() {
        let c = parse(" ( ;\n SZ [9]\tC[ two  spaces ]\n ; B [cc] )\n").unwrap();
        let nodes = &c.trees[0].nodes;
        assert_eq!(nodes[0].size(), Some(9));
        assert_eq!(nodes[0].comment(), Some(" two  spaces "));
        assert_eq!(nodes[1].play(), Some((Color::Black, Some((2, 2)))));
    }

    #[test]
    fn test_long_form_identifiers() {
        let c = parse("(;GaMe[1]AddBlack[aa][bb])").unwrap();
        let extra = c.trees[0].nodes[0].extra();
        assert_eq!(extra.get("GM"), Some(&vec!["1".to_string()]));
        assert_eq!(extra.get("AB").map(Vec::len), Some(2));
        assert!(c.trees[0].nodes[0].has_setup());
    }

    #[test]
    fn test_unexpected_character() {
        let err = parse("(;B[aa]x)").unwrap_err();
        assert_eq!(
            err,
            SgfError::Unexpected {
                ch: 'x',
                state: ScanState::PostValue,
                offset: 7
            }
        );
        assert!(matches!(
            parse("junk(;)"),
            Err(SgfError::Unexpected {
                state: ScanState::AwaitTree,
                ..
            })
        ));
        assert!(matches!(
            parse("(B[aa])"),
            Err(SgfError::Unexpected {
                state: ScanState::AwaitNode,
                ..
            })
        ));
        assert!(matches!(
            parse("(;B[aa]))"),
            Err(SgfError::Unexpected {
                state: ScanState::TreeClosed,
                ..
            })
        ));
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(
            parse(""),
            Err(SgfError::Truncated {
                state: ScanState::AwaitTree
            })
        );
        assert_eq!(
            parse("(;C[open"),
            Err(SgfError::Truncated {
                state: ScanState::Value
            })
        );
        assert_eq!(
            parse("(;B[aa](;W[bb])"),
            Err(SgfError::Truncated {
                state: ScanState::TreeClosed
            })
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(parse("(;B[a])"), Err(SgfError::Value { .. })));
        assert!(matches!(parse("(;MN[x])"), Err(SgfError::Value { .. })));
        assert!(matches!(parse("(;SZ[19:13])"), Err(SgfError::Value { .. })));
        assert!(matches!(parse("(;B[aa][bb])"), Err(SgfError::Value { .. })));
    }

    #[test]
    fn test_variations_and_principal_line() {
        let c = parse("(;SZ[9];B[aa](;W[bb];B[cc])(;W[dd]))").unwrap();
        let tree = &c.trees[0];
        assert_eq!(tree.children.len(), 2);
        // First node of a variation numbers itself after the branch point.
        assert_eq!(tree.children[1].nodes[0].number(), Some(2));

        let (line, dropped) = tree.principal_line();
        assert_eq!(dropped, 1);
        let numbers: Vec<_> = line.iter().filter_map(Node::number).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_several_trees() {
        let c = parse("(;B[aa])\n(;W[bb])").unwrap();
        assert_eq!(c.trees.len(), 2);
        assert_eq!(c.trees[1].nodes[0].number(), Some(1));
    }

    #[test]
    fn test_roundtrip() {
        let text = r"(;SZ[19]C[Recorded with Golib. \]brackets\] and \\]FF[4]
;B[pd];W[dp]TR[aa][bb];B[];C[comment only](;W[qq])(;W[rr]))";
        let first = parse(text).unwrap();
        let second = parse(&first.to_string()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_two_moves_in_one_node() {
        let err = parse("(;B[aa]W[bb])").unwrap_err();
        assert_eq!(
            err,
            SgfError::Value {
                tag: "W".into(),
                value: "bb".into()
            }
        );
        assert!(parse("(;B[aa]B[bb])").is_err());
        assert!(parse("(;B[aa];W[bb])").is_ok());
    }

    #[test]
    fn test_repeated_tag_in_one_node() {
        assert!(parse("(;GM[1]GM[4])").is_err());
        assert!(parse("(;SZ[9]SZ[19])").is_err());
        assert!(parse("(;C[a]C[b])").is_err());
        // Multiple values belong in one list.
        let collection = parse("(;AB[aa][bb])").unwrap();
        let root = &collection.trees[0].nodes[0];
        assert_eq!(
            root.extra().get("AB"),
            Some(&vec!["aa".to_string(), "bb".to_string()])
        );
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut node = Node::new();
        node.set(Property::Size(19));
        node.set(Property::Comment("c".into()));
        node.set(Property::Size(9));
        assert_eq!(
            node.properties(),
            &[Property::Size(9), Property::Comment("c".into())]
        );
        assert_eq!(node.to_string(), ";SZ[9]\nC[c]\n");
    }

    #[test]
    fn test_forced_number() {
        let mut node = Node::from_move(&Move::new(Color::Black, (0, 0), 3));
        node.assign_number(Some(10), None);
        assert_eq!(node.number(), Some(3));
        node.assign_number(None, Some(5));
        assert_eq!(node.number(), Some(5));
    }
}
