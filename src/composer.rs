//! Drives the [`Parser`] and turns its event stream into a [`Node`] tree,
//! resolving anchors/aliases and handing every scalar/collection off to the
//! [`Resolver`] and [`Constructor`] as it goes.
//!
//! The anchor table stores `Option<Node>`: `None` is a placeholder inserted
//! the instant an anchored node starts composing, so a self-referencing
//! alias inside that same node's children (`a: &x [1, *x]`) is caught as
//! "anchor referenced before definition" rather than recursing forever.

use std::collections::HashMap;

use crate::constructor::Constructor;
use crate::error::{ComposerError, Mark};
use crate::node::{Node, NodeValue};
use crate::parser::{CollectionStyle, Event, EventData, Parser};
use crate::resolver::Resolver;
use crate::scanner::ScalarStyle;

const TAG_MERGE: &str = "tag:yaml.org,2002:merge";

pub struct Composer {
    parser: Parser,
    resolver: Resolver,
    constructor: Constructor,
    anchors: HashMap<String, Option<Node>>,
    stream_started: bool,
    stream_ended: bool,
}

impl Composer {
    pub fn new(parser: Parser) -> Self {
        Self::with_resolver_and_constructor(parser, Resolver::new(), Constructor::new())
    }

    pub fn with_resolver_and_constructor(parser: Parser, resolver: Resolver, constructor: Constructor) -> Self {
        Self {
            parser,
            resolver,
            constructor,
            anchors: HashMap::new(),
            stream_started: false,
            stream_ended: false,
        }
    }

    fn next_event(&mut self) -> Result<Event, ComposerError> {
        Ok(self.parser.next_event()?)
    }

    /// Compose the next document in the stream, or `None` once the stream is
    /// exhausted. Each call starts with a clean anchor table — anchors don't
    /// carry across documents.
    pub fn compose_next_document(&mut self) -> Result<Option<Node>, ComposerError> {
        if self.stream_ended {
            return Ok(None);
        }
        if !self.stream_started {
            let event = self.next_event()?;
            if !matches!(event.data, EventData::StreamStart) {
                return Err(ComposerError::Problem {
                    problem: "expected stream start".to_string(),
                    mark: event.start_mark,
                });
            }
            self.stream_started = true;
        }

        let event = self.next_event()?;
        match event.data {
            EventData::StreamEnd => {
                self.stream_ended = true;
                Ok(None)
            }
            EventData::DocumentStart { .. } => {
                self.anchors.clear();
                let node = self.compose_node()?;
                let end_event = self.next_event()?;
                if !matches!(end_event.data, EventData::DocumentEnd { .. }) {
                    return Err(ComposerError::Problem {
                        problem: "expected document end".to_string(),
                        mark: end_event.start_mark,
                    });
                }
                Ok(Some(node))
            }
            other => Err(ComposerError::Problem {
                problem: format!("expected document start, found {other:?}"),
                mark: event.start_mark,
            }),
        }
    }

    /// Compose every remaining document eagerly.
    pub fn compose_all(&mut self) -> Result<Vec<Node>, ComposerError> {
        let mut docs = Vec::new();
        while let Some(node) = self.compose_next_document()? {
            docs.push(node);
        }
        Ok(docs)
    }

    fn compose_node(&mut self) -> Result<Node, ComposerError> {
        let event = self.next_event()?;
        self.compose_node_from_event(event)
    }

    fn reserve_anchor(&mut self, anchor: &Option<String>) {
        if let Some(name) = anchor {
            self.anchors.insert(name.clone(), None);
        }
    }

    fn complete_anchor(&mut self, anchor: Option<String>, node: Node) -> Node {
        if let Some(name) = anchor {
            let node = node.with_anchor(name.clone());
            self.anchors.insert(name, Some(node.clone()));
            node
        } else {
            node
        }
    }

    fn compose_node_from_event(&mut self, event: Event) -> Result<Node, ComposerError> {
        match event.data {
            EventData::Alias { anchor } => match self.anchors.get(&anchor) {
                Some(Some(node)) => Ok(node.clone()),
                Some(None) => Err(ComposerError::Problem {
                    problem: format!("anchor {anchor:?} referenced before it is fully defined"),
                    mark: event.start_mark,
                }),
                None => Err(ComposerError::Problem {
                    problem: format!("found undefined alias {anchor:?}"),
                    mark: event.start_mark,
                }),
            },
            EventData::Scalar { anchor, tag, value, plain_implicit, style, .. } => {
                self.reserve_anchor(&anchor);
                let resolved_tag = tag.unwrap_or_else(|| self.resolver.resolve_scalar(&value, plain_implicit));
                let node_value = self.constructor.construct_scalar(&resolved_tag, &value, event.start_mark, event.end_mark)?;
                let mut node = Node::scalar(resolved_tag, node_value, event.start_mark, event.end_mark);
                node.style = scalar_style_char(style);
                Ok(self.complete_anchor(anchor, node))
            }
            EventData::SequenceStart { anchor, tag, style, .. } => {
                self.reserve_anchor(&anchor);
                let items = self.compose_sequence_items()?;
                let resolved_tag = tag.unwrap_or_else(|| self.resolver.resolve_sequence().to_string());
                let node_value = self.constructor.construct_sequence(&resolved_tag, items, event.start_mark, event.end_mark)?;
                let mut node = Node::raw(resolved_tag, node_value, event.start_mark, event.end_mark);
                node.flow_style = Some(style == CollectionStyle::Flow);
                Ok(self.complete_anchor(anchor, node))
            }
            EventData::MappingStart { anchor, tag, style, .. } => {
                self.reserve_anchor(&anchor);
                let pairs = self.compose_mapping_pairs(event.start_mark)?;
                let resolved_tag = tag.unwrap_or_else(|| self.resolver.resolve_mapping().to_string());
                let node_value = self.constructor.construct_mapping(&resolved_tag, pairs, event.start_mark, event.end_mark)?;
                let mut node = Node::raw(resolved_tag, node_value, event.start_mark, event.end_mark);
                node.flow_style = Some(style == CollectionStyle::Flow);
                Ok(self.complete_anchor(anchor, node))
            }
            other => Err(ComposerError::Problem {
                problem: format!("expected a node, found {other:?}"),
                mark: event.start_mark,
            }),
        }
    }

    fn compose_sequence_items(&mut self) -> Result<Vec<Node>, ComposerError> {
        let mut items = Vec::new();
        loop {
            let event = self.next_event()?;
            if matches!(event.data, EventData::SequenceEnd) {
                return Ok(items);
            }
            items.push(self.compose_node_from_event(event)?);
        }
    }

    /// Collects key/value pairs, expanding `!!merge` (`<<`) keys into the
    /// enclosing mapping as they're found. Keys already present — whether
    /// explicit or from an earlier merge — win over later merge sources.
    fn compose_mapping_pairs(&mut self, collection_mark: Mark) -> Result<Vec<(Node, Node)>, ComposerError> {
        let mut explicit = Vec::new();
        let mut merge_sources: Vec<Vec<(Node, Node)>> = Vec::new();
        loop {
            let key_event = self.next_event()?;
            if matches!(key_event.data, EventData::MappingEnd) {
                break;
            }
            let key_node = self.compose_node_from_event(key_event)?;
            let value_event = self.next_event()?;
            let value_node = self.compose_node_from_event(value_event)?;

            if key_node.tag == TAG_MERGE {
                match &value_node.value {
                    NodeValue::Mapping(pairs) => merge_sources.push(pairs.clone()),
                    NodeValue::Sequence(items) => {
                        for item in items {
                            match &item.value {
                                NodeValue::Mapping(pairs) => merge_sources.push(pairs.clone()),
                                _ => {
                                    return Err(ComposerError::Problem {
                                        problem: "merge value sequence must contain only mappings".to_string(),
                                        mark: collection_mark,
                                    })
                                }
                            }
                        }
                    }
                    _ => {
                        return Err(ComposerError::Problem {
                            problem: "merge value must be a mapping or a sequence of mappings".to_string(),
                            mark: collection_mark,
                        })
                    }
                }
            } else {
                explicit.push((key_node, value_node));
            }
        }

        // Merged keys come first, in the same order PyYAML's
        // `flatten_mapping` produces (`node.value = merge + node.value`):
        // an explicit key overwrites a same-named merged key's value in
        // place rather than moving it to the end, and only a key that
        // isn't already present from a merge gets appended.
        let mut result: Vec<(Node, Node)> = Vec::new();
        for source in merge_sources {
            for (k, v) in source {
                if !result.iter().any(|(ek, _)| ek.value == k.value) {
                    result.push((k, v));
                }
            }
        }
        for (k, v) in explicit {
            if let Some(slot) = result.iter_mut().find(|(ek, _)| ek.value == k.value) {
                slot.1 = v;
            } else {
                result.push((k, v));
            }
        }
        Ok(result)
    }
}

fn scalar_style_char(style: ScalarStyle) -> Option<char> {
    match style {
        ScalarStyle::Plain => None,
        ScalarStyle::SingleQuoted => Some('\''),
        ScalarStyle::DoubleQuoted => Some('"'),
        ScalarStyle::Literal => Some('|'),
        ScalarStyle::Folded => Some('>'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;
    use crate::scanner::Scanner;

    fn compose(src: &str) -> Node {
        let reader = Reader::new(src.as_bytes()).unwrap();
        let parser = Parser::new(Scanner::new(reader));
        let mut composer = Composer::new(parser);
        composer.compose_next_document().unwrap().unwrap()
    }

    #[test]
    fn composes_plain_int_scalar() {
        let node = compose("42\n");
        assert!(matches!(node.value, NodeValue::Int(42)));
    }

    #[test]
    fn composes_nested_mapping_and_sequence() {
        let node = compose("a: 1\nb:\n  - x\n  - y\n");
        let pairs = node.as_mapping().unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(matches!(pairs[0].1.value, NodeValue::Int(1)));
        assert_eq!(pairs[1].1.as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn recursive_anchor_is_a_composer_error() {
        let reader = Reader::new(b"a: &x [1, *x]\n").unwrap();
        let parser = Parser::new(Scanner::new(reader));
        let mut composer = Composer::new(parser);
        let err = composer.compose_next_document().unwrap_err();
        assert!(matches!(err, ComposerError::Problem { .. }));
    }

    #[test]
    fn merge_key_expands_and_is_overridden_by_explicit_keys() {
        let node = compose("base: &b\n  a: 1\n  b: 2\nresult:\n  <<: *b\n  b: 99\n");
        let pairs = node.as_mapping().unwrap();
        let result = &pairs.iter().find(|(k, _)| k.as_str().as_deref() == Some("result")).unwrap().1;
        let result_pairs = result.as_mapping().unwrap();
        let a = result_pairs.iter().find(|(k, _)| k.as_str().as_deref() == Some("a")).unwrap();
        let b = result_pairs.iter().find(|(k, _)| k.as_str().as_deref() == Some("b")).unwrap();
        assert!(matches!(a.1.value, NodeValue::Int(1)));
        assert!(matches!(b.1.value, NodeValue::Int(99)));
    }

    #[test]
    fn detects_duplicate_keys_in_plain_map() {
        let reader = Reader::new(b"a: 1\na: 2\n").unwrap();
        let parser = Parser::new(Scanner::new(reader));
        let mut composer = Composer::new(parser);
        let err = composer.compose_next_document().unwrap_err();
        assert!(matches!(err, ComposerError::Constructor(_)));
    }
}
