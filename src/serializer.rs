//! [`Node`] tree → [`Event`] stream, the mirror image of the Composer.
//!
//! Implements the two-pass algorithm from `spec.md` §4.8: an anchor pass
//! that counts how many times each anchored node is visited, then an emit
//! pass that walks the tree again, turning the second and later visits of
//! an anchorable node into an `Alias` event instead of re-emitting its
//! content.
//!
//! A node only carries identity in this crate when the Composer gave it one
//! — `Node` is a plain owned value, not an `Rc`-shared object graph, so two
//! structurally identical `Node`s built independently by a caller are never
//! treated as "the same node" here. The `.anchor` field the Composer stamps
//! onto both occurrences of an aliased node is the only signal the
//! Serializer has (and the only one `spec.md`'s round-trip properties
//! require); see `DESIGN.md` for the reasoning.

use std::collections::{HashMap, HashSet};

use crate::error::{Mark, SerializerError};
use crate::node::{Node, NodeValue, UserValue};
use crate::parser::{CollectionStyle, Event, EventData};
use crate::representer::Representer;
use crate::resolver::Resolver;
use crate::scanner::ScalarStyle;

const TAG_NULL: &str = "tag:yaml.org,2002:null";
const TAG_STR: &str = "tag:yaml.org,2002:str";
const TAG_SET: &str = "tag:yaml.org,2002:set";
const TAG_OMAP: &str = "tag:yaml.org,2002:omap";

/// Scalars/collections below this size never get an anchor even if shared,
/// matching `spec.md` §4.8's "prevents flooding output with anchors on
/// repeated small scalars".
const ANCHORABLE_STRING_LEN: usize = 64;
const ANCHORABLE_COLLECTION_LEN: usize = 2;

pub struct Serializer {
    representer: Representer,
    #[allow(dead_code)]
    resolver: Resolver,
    next_anchor_id: usize,
    /// Whether untagged collections default to flow style. A loaded
    /// document's own block/flow choice (`Node::flow_style`) is not
    /// consulted here: `spec.md` §4.9 picks block by default and flow only
    /// "when requested", and the only request surface the Dumper exposes
    /// (`spec.md` §6) is this single stream-wide flag, not a per-node one.
    flow_default: bool,
}

impl Default for Serializer {
    fn default() -> Self {
        Self {
            representer: Representer::new(),
            resolver: Resolver::new(),
            next_anchor_id: 0,
            flow_default: false,
        }
    }
}

fn dummy_mark() -> Mark {
    Mark::default()
}

fn event(data: EventData) -> Event {
    Event { data, start_mark: dummy_mark(), end_mark: dummy_mark() }
}

fn is_anchorable(node: &Node) -> bool {
    match &node.value {
        NodeValue::Str(s) => s.len() > ANCHORABLE_STRING_LEN,
        NodeValue::Binary(b) => b.len() > ANCHORABLE_STRING_LEN,
        NodeValue::Sequence(items) => items.len() > ANCHORABLE_COLLECTION_LEN,
        NodeValue::Mapping(p) | NodeValue::Pairs(p) => p.len() > ANCHORABLE_COLLECTION_LEN,
        NodeValue::User(UserValue::Sequence(items)) => items.len() > ANCHORABLE_COLLECTION_LEN,
        NodeValue::User(UserValue::Mapping(p)) => p.len() > ANCHORABLE_COLLECTION_LEN,
        _ => false,
    }
}

/// Canonical textual form of a scalar payload — the inverse of
/// `Constructor::construct_scalar`. Delegates to the same conversion
/// `Node::as_str()` uses, so both agree on how e.g. a float or timestamp
/// prints.
fn scalar_text(value: &NodeValue) -> String {
    crate::node::canonical_scalar_text(value).expect("scalar_text called on a non-scalar NodeValue")
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`Serializer::new`], but with the dumper-wide flow/block
    /// default for untagged collections (`DumperOptions::default_flow_collection`).
    pub fn with_flow_default(flow_default: bool) -> Self {
        Self { flow_default, ..Self::default() }
    }

    /// Serialize one document: `DocumentStart`, the node's events, then
    /// `DocumentEnd`.
    pub fn serialize_document(
        &mut self,
        node: &Node,
        explicit_start: bool,
        explicit_end: bool,
        version: Option<(u32, u32)>,
        tags: Vec<(String, String)>,
    ) -> Result<Vec<Event>, SerializerError> {
        let mut counts = HashMap::new();
        count_anchors(node, &mut counts);

        let mut assigned_ids: HashMap<String, String> = HashMap::new();
        let mut defined: HashSet<String> = HashSet::new();

        let mut events = vec![event(EventData::DocumentStart { version, tags, explicit: explicit_start })];
        self.serialize_node(node, &counts, &mut assigned_ids, &mut defined, &mut events)?;
        events.push(event(EventData::DocumentEnd { explicit: explicit_end }));
        Ok(events)
    }

    /// Assigns this node a fresh `id%03d` anchor the first time a shared,
    /// anchorable node is visited; on a later visit, pushes an `Alias`
    /// event into `out` and returns `None`, signalling the caller to stop.
    fn resolve_anchor(
        &mut self,
        node: &Node,
        counts: &HashMap<String, usize>,
        assigned_ids: &mut HashMap<String, String>,
        defined: &mut HashSet<String>,
        out: &mut Vec<Event>,
    ) -> (Option<String>, bool) {
        let Some(source_name) = node.anchor.as_ref() else {
            return (None, false);
        };
        if counts.get(source_name).copied().unwrap_or(1) <= 1 || !is_anchorable(node) {
            return (None, false);
        }
        let id = assigned_ids.entry(source_name.clone()).or_insert_with(|| {
            self.next_anchor_id += 1;
            format!("id{:03}", self.next_anchor_id)
        }).clone();
        if defined.contains(source_name) {
            out.push(event(EventData::Alias { anchor: id }));
            (None, true)
        } else {
            defined.insert(source_name.clone());
            (Some(id), false)
        }
    }

    fn serialize_node(
        &mut self,
        node: &Node,
        counts: &HashMap<String, usize>,
        assigned_ids: &mut HashMap<String, String>,
        defined: &mut HashSet<String>,
        out: &mut Vec<Event>,
    ) -> Result<(), SerializerError> {
        let (anchor, aliased) = self.resolve_anchor(node, counts, assigned_ids, defined, out);
        if aliased {
            return Ok(());
        }

        let tag = node.tag.clone();
        let implicit = self.representer.is_implicit(node);

        if tag == TAG_SET {
            return self.serialize_as_set(node, anchor, out, counts, assigned_ids, defined);
        }
        if tag == TAG_OMAP || matches!(node.value, NodeValue::Pairs(_)) {
            return self.serialize_as_pair_sequence(node, anchor, tag, out, counts, assigned_ids, defined);
        }

        match &node.value {
            NodeValue::Sequence(items) | NodeValue::User(UserValue::Sequence(items)) => {
                let style = if self.flow_default { CollectionStyle::Flow } else { CollectionStyle::Block };
                out.push(event(EventData::SequenceStart { anchor, tag: Some(tag), implicit, style }));
                for item in items {
                    self.serialize_node(item, counts, assigned_ids, defined, out)?;
                }
                out.push(event(EventData::SequenceEnd));
            }
            NodeValue::Mapping(pairs) | NodeValue::User(UserValue::Mapping(pairs)) => {
                let style = if self.flow_default { CollectionStyle::Flow } else { CollectionStyle::Block };
                out.push(event(EventData::MappingStart { anchor, tag: Some(tag), implicit, style }));
                for (k, v) in pairs {
                    self.serialize_node(k, counts, assigned_ids, defined, out)?;
                    self.serialize_node(v, counts, assigned_ids, defined, out)?;
                }
                out.push(event(EventData::MappingEnd));
            }
            scalar => {
                let value = scalar_text(scalar);
                let plain_implicit = implicit;
                let quoted_implicit = tag == TAG_STR;
                let style = node_style_to_scalar_style(node.style);
                out.push(event(EventData::Scalar { anchor, tag: Some(tag), value, plain_implicit, quoted_implicit, style }));
            }
        }
        Ok(())
    }

    /// `!!set` stores as `NodeValue::Sequence` of keys (the Constructor
    /// drops the null values since they carry no information), but its wire
    /// shape is a mapping of every key to an implicit null.
    fn serialize_as_set(
        &mut self,
        node: &Node,
        anchor: Option<String>,
        out: &mut Vec<Event>,
        counts: &HashMap<String, usize>,
        assigned_ids: &mut HashMap<String, String>,
        defined: &mut HashSet<String>,
    ) -> Result<(), SerializerError> {
        let keys = match &node.value {
            NodeValue::Sequence(items) => items,
            other => {
                return Err(SerializerError::Problem {
                    problem: format!("!!set node must hold a sequence of keys, found {other:?}"),
                    mark: None,
                })
            }
        };
        out.push(event(EventData::MappingStart {
            anchor,
            tag: Some(TAG_SET.to_string()),
            implicit: false,
            style: if self.flow_default { CollectionStyle::Flow } else { CollectionStyle::Block },
        }));
        for key in keys {
            self.serialize_node(key, counts, assigned_ids, defined, out)?;
            out.push(event(EventData::Scalar {
                anchor: None,
                tag: Some(TAG_NULL.to_string()),
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            }));
        }
        out.push(event(EventData::MappingEnd));
        Ok(())
    }

    /// `!!omap`/`!!pairs` both wire as a sequence of single-key mappings;
    /// `!!omap` happens to be stored as a (unique-key) `NodeValue::Mapping`
    /// while `!!pairs` keeps its own `NodeValue::Pairs` variant so
    /// duplicate keys survive round-trip.
    fn serialize_as_pair_sequence(
        &mut self,
        node: &Node,
        anchor: Option<String>,
        tag: String,
        out: &mut Vec<Event>,
        counts: &HashMap<String, usize>,
        assigned_ids: &mut HashMap<String, String>,
        defined: &mut HashSet<String>,
    ) -> Result<(), SerializerError> {
        let pairs = match &node.value {
            NodeValue::Mapping(p) | NodeValue::Pairs(p) => p,
            other => {
                return Err(SerializerError::Problem {
                    problem: format!("!!omap/!!pairs node must hold key/value pairs, found {other:?}"),
                    mark: None,
                })
            }
        };
        out.push(event(EventData::SequenceStart {
            anchor,
            tag: Some(tag),
            implicit: false,
            style: if self.flow_default { CollectionStyle::Flow } else { CollectionStyle::Block },
        }));
        for (k, v) in pairs {
            out.push(event(EventData::MappingStart {
                anchor: None,
                tag: Some("tag:yaml.org,2002:map".to_string()),
                implicit: true,
                style: CollectionStyle::Block,
            }));
            self.serialize_node(k, counts, assigned_ids, defined, out)?;
            self.serialize_node(v, counts, assigned_ids, defined, out)?;
            out.push(event(EventData::MappingEnd));
        }
        out.push(event(EventData::SequenceEnd));
        Ok(())
    }
}

fn node_style_to_scalar_style(style: Option<char>) -> ScalarStyle {
    match style {
        Some('\'') => ScalarStyle::SingleQuoted,
        Some('"') => ScalarStyle::DoubleQuoted,
        Some('|') => ScalarStyle::Literal,
        Some('>') => ScalarStyle::Folded,
        _ => ScalarStyle::Plain,
    }
}

fn count_anchors(node: &Node, counts: &mut HashMap<String, usize>) {
    if let Some(name) = &node.anchor {
        *counts.entry(name.clone()).or_insert(0) += 1;
    }
    match &node.value {
        NodeValue::Sequence(items) | NodeValue::User(UserValue::Sequence(items)) => {
            for item in items {
                count_anchors(item, counts);
            }
        }
        NodeValue::Mapping(pairs) | NodeValue::Pairs(pairs) | NodeValue::User(UserValue::Mapping(pairs)) => {
            for (k, v) in pairs {
                count_anchors(k, counts);
                count_anchors(v, counts);
            }
        }
        _ => {}
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
    fn serializes_scalar_int_as_implicit() {
        let mut s = Serializer::new();
        let node = Node::scalar("tag:yaml.org,2002:int", NodeValue::Int(42), mark(), mark());
        let events = s.serialize_document(&node, false, false, None, vec![]).unwrap();
        assert!(matches!(events[0].data, EventData::DocumentStart { .. }));
        match &events[1].data {
            EventData::Scalar { value, plain_implicit, .. } => {
                assert_eq!(value, "42");
                assert!(plain_implicit);
            }
            other => panic!("expected scalar event, got {other:?}"),
        }
    }

    #[test]
    fn small_repeated_scalar_is_not_anchored() {
        let mut s = Serializer::new();
        let shared = Node::scalar("tag:yaml.org,2002:str", NodeValue::Str("x".into()), mark(), mark()).with_anchor("a1");
        let root = Node::sequence("tag:yaml.org,2002:seq", vec![shared.clone(), shared], mark(), mark(), false);
        let events = s.serialize_document(&root, false, false, None, vec![]).unwrap();
        assert!(!events.iter().any(|e| matches!(e.data, EventData::Alias { .. })));
    }

    #[test]
    fn large_repeated_sequence_is_anchored_and_aliased() {
        let mut s = Serializer::new();
        let items: Vec<Node> = (0..5).map(|i| Node::scalar("tag:yaml.org,2002:int", NodeValue::Int(i), mark(), mark())).collect();
        let shared = Node::sequence("tag:yaml.org,2002:seq", items, mark(), mark(), false).with_anchor("a1");
        let root = Node::sequence("tag:yaml.org,2002:seq", vec![shared.clone(), shared], mark(), mark(), false);
        let events = s.serialize_document(&root, false, false, None, vec![]).unwrap();
        assert!(events.iter().any(|e| matches!(e.data, EventData::Alias { .. })));
        let anchored_starts = events.iter().filter(|e| matches!(&e.data, EventData::SequenceStart { anchor: Some(_), .. })).count();
        assert_eq!(anchored_starts, 1);
    }

    #[test]
    fn set_round_trips_as_mapping_with_null_values() {
        let mut s = Serializer::new();
        let keys = vec![Node::scalar("tag:yaml.org,2002:str", NodeValue::Str("a".into()), mark(), mark())];
        let node = Node::raw(TAG_SET, NodeValue::Sequence(keys), mark(), mark());
        let events = s.serialize_document(&node, false, false, None, vec![]).unwrap();
        assert!(matches!(events[1].data, EventData::MappingStart { .. }));
        let nulls = events.iter().filter(|e| matches!(&e.data, EventData::Scalar { tag: Some(t), .. } if t == TAG_NULL)).count();
        assert_eq!(nulls, 1);
    }
}
