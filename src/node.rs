//! The in-memory tree every load/dump pipeline passes through: [`Node`] and
//! its payload [`NodeValue`].
//!
//! A `Node` carries everything the Composer/Representer learn about a piece
//! of YAML: a resolved tag, the value itself, source marks, and the emitter
//! hints (anchor, scalar style, flow style) needed to reproduce the
//! author's formatting on a round trip.

use std::borrow::Cow;
use std::cmp::Ordering;

use base64::Engine as _;
use chrono::{DateTime, FixedOffset};

use crate::error::Mark;

/// The closed set of shapes a YAML node can take once tags have been
/// resolved. `Pairs` is kept distinct from `Mapping` because `!!pairs`
/// explicitly permits duplicate keys that `!!map`/`!!omap` must reject.
#[derive(Debug, Clone)]
pub enum NodeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Binary(Vec<u8>),
    Timestamp(DateTime<FixedOffset>),
    Str(String),
    Sequence(Vec<Node>),
    Mapping(Vec<(Node, Node)>),
    Pairs(Vec<(Node, Node)>),
    /// A value no registered constructor claimed; carries the raw scalar,
    /// sequence or mapping payload alongside the unresolved tag so callers
    /// can still inspect it.
    User(UserValue),
}

#[derive(Debug, Clone)]
pub enum UserValue {
    Scalar(String),
    Sequence(Vec<Node>),
    Mapping(Vec<(Node, Node)>),
}

/// Rank used to order nodes of different kinds before comparing values of
/// the same kind. Arbitrary but stable — it only needs to be total.
fn kind_rank(value: &NodeValue) -> u8 {
    match value {
        NodeValue::Null => 0,
        NodeValue::Bool(_) => 1,
        NodeValue::Int(_) => 2,
        NodeValue::Float(_) => 3,
        NodeValue::Binary(_) => 4,
        NodeValue::Timestamp(_) => 5,
        NodeValue::Str(_) => 6,
        NodeValue::Sequence(_) => 7,
        NodeValue::Mapping(_) => 8,
        NodeValue::Pairs(_) => 9,
        NodeValue::User(_) => 10,
    }
}

impl PartialEq for NodeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NodeValue {}

impl PartialOrd for NodeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        let (ra, rb) = (kind_rank(self), kind_rank(other));
        if ra != rb {
            return ra.cmp(&rb);
        }
        match (self, other) {
            (NodeValue::Null, NodeValue::Null) => Ordering::Equal,
            (NodeValue::Bool(a), NodeValue::Bool(b)) => a.cmp(b),
            (NodeValue::Int(a), NodeValue::Int(b)) => a.cmp(b),
            (NodeValue::Float(a), NodeValue::Float(b)) => {
                // NaN compares equal to NaN so float-keyed !!set/!!omap can
                // still detect duplicates; everything else uses normal
                // total_cmp ordering.
                if a.is_nan() && b.is_nan() {
                    Ordering::Equal
                } else {
                    a.total_cmp(b)
                }
            }
            (NodeValue::Binary(a), NodeValue::Binary(b)) => a.cmp(b),
            (NodeValue::Timestamp(a), NodeValue::Timestamp(b)) => a.cmp(b),
            (NodeValue::Str(a), NodeValue::Str(b)) => a.cmp(b),
            (NodeValue::Sequence(a), NodeValue::Sequence(b)) => {
                a.iter().map(|n| &n.value).cmp(b.iter().map(|n| &n.value))
            }
            (NodeValue::Mapping(a), NodeValue::Mapping(b))
            | (NodeValue::Pairs(a), NodeValue::Pairs(b)) => {
                let pair_cmp = |p: &(Node, Node)| (p.0.value.clone(), p.1.value.clone());
                a.iter().map(pair_cmp).cmp(b.iter().map(pair_cmp))
            }
            (NodeValue::User(a), NodeValue::User(b)) => match (a, b) {
                (UserValue::Scalar(a), UserValue::Scalar(b)) => a.cmp(b),
                (UserValue::Sequence(a), UserValue::Sequence(b)) => {
                    a.iter().map(|n| &n.value).cmp(b.iter().map(|n| &n.value))
                }
                (UserValue::Mapping(a), UserValue::Mapping(b)) => {
                    let pair_cmp = |p: &(Node, Node)| (p.0.value.clone(), p.1.value.clone());
                    a.iter().map(pair_cmp).cmp(b.iter().map(pair_cmp))
                }
                (a, b) => format!("{a:?}").cmp(&format!("{b:?}")),
            },
            _ => unreachable!("kind_rank already separated differing variants"),
        }
    }
}

/// A single node of the constructed YAML tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub value: NodeValue,
    pub start_mark: Mark,
    pub end_mark: Mark,
    /// Preferred scalar style (`'`, `"`, `|`, `>`) if the source specified one.
    pub style: Option<char>,
    /// `Some(true)` for flow collections, `Some(false)` for block, `None`
    /// when the node has no collection style (scalars).
    pub flow_style: Option<bool>,
    pub anchor: Option<String>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.value == other.value
    }
}
impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value).then_with(|| self.tag.cmp(&other.tag))
    }
}

impl Node {
    pub fn scalar(tag: impl Into<String>, value: NodeValue, start_mark: Mark, end_mark: Mark) -> Self {
        Self::raw(tag, value, start_mark, end_mark)
    }

    /// Generic constructor used by the Composer/Constructor for any
    /// `NodeValue`, scalar or not — useful when a tag's constructor can
    /// return a non-obvious shape (`!!set` collapses to a `Sequence`, an
    /// unregistered tag falls back to `User`).
    pub fn raw(tag: impl Into<String>, value: NodeValue, start_mark: Mark, end_mark: Mark) -> Self {
        Self {
            tag: tag.into(),
            value,
            start_mark,
            end_mark,
            style: None,
            flow_style: None,
            anchor: None,
        }
    }

    pub fn sequence(
        tag: impl Into<String>,
        items: Vec<Node>,
        start_mark: Mark,
        end_mark: Mark,
        flow_style: bool,
    ) -> Self {
        Self {
            tag: tag.into(),
            value: NodeValue::Sequence(items),
            start_mark,
            end_mark,
            style: None,
            flow_style: Some(flow_style),
            anchor: None,
        }
    }

    pub fn mapping(
        tag: impl Into<String>,
        pairs: Vec<(Node, Node)>,
        start_mark: Mark,
        end_mark: Mark,
        flow_style: bool,
    ) -> Self {
        Self {
            tag: tag.into(),
            value: NodeValue::Mapping(pairs),
            start_mark,
            end_mark,
            style: None,
            flow_style: Some(flow_style),
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn with_style(mut self, style: char) -> Self {
        self.style = Some(style);
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, NodeValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.value {
            NodeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match &self.value {
            NodeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match &self.value {
            NodeValue::Float(f) => Some(*f),
            NodeValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Asking for a string form of a non-string scalar performs the same
    /// canonical conversion the Serializer would re-emit on dump (`42` for
    /// an int, `true`/`false` for a bool, RFC 3339 for a timestamp, `""`
    /// for null) — collections and binary payloads still have no string
    /// form and return `None`.
    pub fn as_str(&self) -> Option<Cow<'_, str>> {
        match &self.value {
            NodeValue::Str(s) => Some(Cow::Borrowed(s.as_str())),
            NodeValue::User(UserValue::Scalar(s)) => Some(Cow::Borrowed(s.as_str())),
            NodeValue::Null | NodeValue::Bool(_) | NodeValue::Int(_) | NodeValue::Float(_) | NodeValue::Timestamp(_) => {
                canonical_scalar_text(&self.value).map(Cow::Owned)
            }
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match &self.value {
            NodeValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<FixedOffset>> {
        match &self.value {
            NodeValue::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.value {
            NodeValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(Node, Node)]> {
        match &self.value {
            NodeValue::Mapping(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn as_pairs(&self) -> Option<&[(Node, Node)]> {
        match &self.value {
            NodeValue::Pairs(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// `NodeValue` discriminant as a short, stable label — used by the
    /// Representer's default-tag registry and by `Display`.
    pub fn kind(&self) -> &'static str {
        match &self.value {
            NodeValue::Null => "null",
            NodeValue::Bool(_) => "bool",
            NodeValue::Int(_) => "int",
            NodeValue::Float(_) => "float",
            NodeValue::Binary(_) => "binary",
            NodeValue::Timestamp(_) => "timestamp",
            NodeValue::Str(_) => "str",
            NodeValue::Sequence(_) => "sequence",
            NodeValue::Mapping(_) => "mapping",
            NodeValue::Pairs(_) => "pairs",
            NodeValue::User(_) => "user",
        }
    }
}

/// Canonical textual form of a scalar payload — shared by `Node::as_str()`
/// and `serializer.rs`'s scalar re-emission, so both agree on e.g. how a
/// float or timestamp prints. Returns `None` for collections, where there
/// is no single string form.
pub(crate) fn canonical_scalar_text(value: &NodeValue) -> Option<String> {
    match value {
        NodeValue::Null => Some(String::new()),
        NodeValue::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        NodeValue::Int(i) => Some(i.to_string()),
        NodeValue::Float(f) => Some(format_canonical_float(*f)),
        NodeValue::Binary(b) => Some(base64::engine::general_purpose::STANDARD.encode(b)),
        NodeValue::Timestamp(t) => Some(t.to_rfc3339()),
        NodeValue::Str(s) => Some(s.clone()),
        NodeValue::User(UserValue::Scalar(s)) => Some(s.clone()),
        _ => None,
    }
}

fn format_canonical_float(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { ".inf".to_string() } else { "-.inf".to_string() }
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.tag, self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark() -> Mark {
        Mark::new(0, 0, 0)
    }

    #[test]
    fn nan_equals_nan_for_duplicate_detection() {
        let a = NodeValue::Float(f64::NAN);
        let b = NodeValue::Float(f64::NAN);
        assert_eq!(a, b);
    }

    #[test]
    fn kind_rank_orders_before_value() {
        let int_node = Node::scalar("tag:yaml.org,2002:int", NodeValue::Int(5), mark(), mark());
        let str_node = Node::scalar("tag:yaml.org,2002:str", NodeValue::Str("a".into()), mark(), mark());
        assert!(int_node < str_node);
    }

    #[test]
    fn pairs_and_mapping_are_distinct_kinds() {
        let pairs = Node::scalar(
            "tag:yaml.org,2002:pairs",
            NodeValue::Pairs(vec![]),
            mark(),
            mark(),
        );
        assert_eq!(pairs.kind(), "pairs");
    }

    #[test]
    fn as_str_canonicalizes_non_string_scalars() {
        let int_node = Node::scalar("tag:yaml.org,2002:int", NodeValue::Int(-17), mark(), mark());
        assert_eq!(int_node.as_str().as_deref(), Some("-17"));

        let bool_node = Node::scalar("tag:yaml.org,2002:bool", NodeValue::Bool(true), mark(), mark());
        assert_eq!(bool_node.as_str().as_deref(), Some("true"));

        let null_node = Node::scalar("tag:yaml.org,2002:null", NodeValue::Null, mark(), mark());
        assert_eq!(null_node.as_str().as_deref(), Some(""));

        let seq_node = Node::scalar("tag:yaml.org,2002:seq", NodeValue::Sequence(vec![]), mark(), mark());
        assert_eq!(seq_node.as_str(), None);
    }
}
