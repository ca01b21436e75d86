//! Canonicalizes a [`Node`] before the [`crate::serializer::Serializer`] walks it.
//!
//! The teacher's `SafeRepresenter` converts a host-language object graph
//! (Python lists/dicts/scalars) into a `Node` tree from scratch. This crate
//! has no such host layer — callers already hand the Serializer `Node`
//! values, the same type the Composer produces — so the Representer's job
//! narrows to exactly what `spec.md` §4.8 describes: decide, for a given
//! node, whether its tag is the *default* tag for its value's kind. That
//! single fact is what lets the Serializer compute each event's `implicit`
//! flag, which in turn is what lets the Emitter omit a redundant `!!str`/
//! `!!int`/... tag from the output.

use std::collections::HashMap;

use crate::node::{Node, NodeValue};

const TAG_NULL: &str = "tag:yaml.org,2002:null";
const TAG_BOOL: &str = "tag:yaml.org,2002:bool";
const TAG_INT: &str = "tag:yaml.org,2002:int";
const TAG_FLOAT: &str = "tag:yaml.org,2002:float";
const TAG_BINARY: &str = "tag:yaml.org,2002:binary";
const TAG_TIMESTAMP: &str = "tag:yaml.org,2002:timestamp";
const TAG_STR: &str = "tag:yaml.org,2002:str";
const TAG_SEQ: &str = "tag:yaml.org,2002:seq";
const TAG_MAP: &str = "tag:yaml.org,2002:map";
const TAG_PAIRS: &str = "tag:yaml.org,2002:pairs";

/// Registry of `NodeValue` discriminant → default YAML tag, keyed the way
/// `spec.md` §4.8 asks for ("a registry keyed by the dynamic type of the
/// payload").
pub struct Representer {
    default_tags: HashMap<&'static str, &'static str>,
}

impl Default for Representer {
    fn default() -> Self {
        let mut default_tags = HashMap::new();
        default_tags.insert("null", TAG_NULL);
        default_tags.insert("bool", TAG_BOOL);
        default_tags.insert("int", TAG_INT);
        default_tags.insert("float", TAG_FLOAT);
        default_tags.insert("binary", TAG_BINARY);
        default_tags.insert("timestamp", TAG_TIMESTAMP);
        default_tags.insert("str", TAG_STR);
        default_tags.insert("sequence", TAG_SEQ);
        default_tags.insert("mapping", TAG_MAP);
        default_tags.insert("pairs", TAG_PAIRS);
        Self { default_tags }
    }
}

impl Representer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tag a plain, untagged instance of this node's kind would resolve
    /// to. `NodeValue::User` has no default — an unregistered tag is by
    /// definition never implicit — so this falls back to the node's own tag,
    /// which makes [`Representer::is_implicit`] correctly report `false`.
    pub fn default_tag_for<'a>(&'a self, node: &'a Node) -> &'a str {
        self.default_tags.get(node.kind()).copied().unwrap_or(&node.tag)
    }

    /// Whether this node's tag matches the default for its kind — the
    /// condition under which the Emitter may omit the tag from the output
    /// and the Serializer may mark the event `implicit`.
    pub fn is_implicit(&self, node: &Node) -> bool {
        if matches!(node.value, NodeValue::User(_)) {
            return false;
        }
        node.tag == self.default_tag_for(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Mark;

    fn mark() -> Mark {
        Mark::new(0, 0, 0)
    }

    #[test]
    fn default_tag_is_implicit() {
        let r = Representer::new();
        let node = Node::scalar(TAG_INT, NodeValue::Int(5), mark(), mark());
        assert!(r.is_implicit(&node));
    }

    #[test]
    fn explicit_non_default_tag_is_not_implicit() {
        let r = Representer::new();
        let node = Node::scalar("!custom", NodeValue::Int(5), mark(), mark());
        assert!(!r.is_implicit(&node));
    }

    #[test]
    fn user_kind_is_never_implicit() {
        let r = Representer::new();
        let node = Node::scalar(
            "!thing",
            NodeValue::User(crate::node::UserValue::Scalar("x".into())),
            mark(),
            mark(),
        );
        assert!(!r.is_implicit(&node));
    }
}
