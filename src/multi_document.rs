//! Multi-document streams: the lazy [`Documents`] iterator plus the
//! `load_all`/`dump_all` convenience wrappers described in `spec.md` §6.
//!
//! A YAML stream is just a sequence of documents sharing one `Reader`/
//! `Scanner`/`Parser` chain — the Composer already resets its anchor table
//! per document (see `composer.rs`), so `Documents` only has to keep
//! calling `compose_next_document` until it returns `None`.

use std::io::Write;

use crate::composer::Composer;
use crate::constructor::Constructor;
use crate::emitter::{emit, DumperOptions};
use crate::error::YamlError;
use crate::node::Node;
use crate::parser::{Event, EventData, Parser};
use crate::reader::Reader;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::serializer::Serializer;

/// Iterates the documents of a YAML stream one at a time, composing each
/// only when asked for — a caller that only wants the first document of a
/// huge multi-document stream never pays to compose the rest.
pub struct Documents {
    composer: Composer,
    index: usize,
    done: bool,
}

impl Documents {
    pub fn new(bytes: &[u8]) -> Result<Self, YamlError> {
        let reader = Reader::new(bytes)?;
        let parser = Parser::new(Scanner::new(reader));
        Ok(Self { composer: Composer::new(parser), index: 0, done: false })
    }

    pub fn with_resolver_and_constructor(bytes: &[u8], resolver: Resolver, constructor: Constructor) -> Result<Self, YamlError> {
        let reader = Reader::new(bytes)?;
        let parser = Parser::new(Scanner::new(reader));
        Ok(Self { composer: Composer::with_resolver_and_constructor(parser, resolver, constructor), index: 0, done: false })
    }
}

impl Iterator for Documents {
    type Item = Result<Node, YamlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let index = self.index;
        self.index += 1;
        match self.composer.compose_next_document() {
            Ok(Some(node)) => Some(Ok(node)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(YamlError::InDocument { index, source: Box::new(YamlError::from(err)) }))
            }
        }
    }
}

/// Eagerly composes every document in `bytes`.
pub fn load_all(bytes: &[u8]) -> Result<Vec<Node>, YamlError> {
    Documents::new(bytes)?.collect()
}

fn stream_event(data: EventData) -> Event {
    Event { data, start_mark: Default::default(), end_mark: Default::default() }
}

/// Dumps every node in `nodes` into a single stream, one document per node.
/// Once there's more than one document, `---` separators are forced
/// regardless of `options.explicit_start` — otherwise a reader has no way
/// to tell where one document ends and the next begins.
pub fn dump_all(writer: &mut impl Write, nodes: &[Node], options: &DumperOptions) -> Result<(), YamlError> {
    let mut serializer = Serializer::with_flow_default(options.default_flow_collection);
    let mut events = vec![stream_event(EventData::StreamStart)];
    let force_markers = nodes.len() > 1;
    for node in nodes {
        let explicit_start = options.explicit_start || force_markers;
        let explicit_end = options.explicit_end || force_markers;
        let doc_events = serializer.serialize_document(node, explicit_start, explicit_end, options.version, options.tag_directives.clone())?;
        events.extend(doc_events);
    }
    events.push(stream_event(EventData::StreamEnd));
    emit(writer, &events, options)?;
    Ok(())
}

/// Convenience wrapper returning the dumped stream as a `String`.
pub fn dump_all_to_string(nodes: &[Node], options: &DumperOptions) -> Result<String, YamlError> {
    let mut buf = Vec::new();
    dump_all(&mut buf, nodes, options)?;
    String::from_utf8(buf)
        .map_err(|e| YamlError::from(crate::error::EmitterError::Problem { problem: format!("emitted non-UTF-8 output: {e}") }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeValue;

    #[test]
    fn iterates_every_document_in_a_stream() {
        let docs: Result<Vec<Node>, _> = Documents::new(b"1\n---\n2\n---\n3\n").unwrap().collect();
        let docs = docs.unwrap();
        assert_eq!(docs.len(), 3);
        assert!(matches!(docs[0].value, NodeValue::Int(1)));
        assert!(matches!(docs[2].value, NodeValue::Int(3)));
    }

    #[test]
    fn load_all_on_single_document_stream() {
        let docs = load_all(b"a: 1\n").unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn dump_all_separates_documents_with_explicit_markers() {
        use crate::error::Mark;
        let mark = Mark::new(0, 0, 0);
        let nodes = vec![
            Node::scalar("tag:yaml.org,2002:int", NodeValue::Int(1), mark, mark),
            Node::scalar("tag:yaml.org,2002:int", NodeValue::Int(2), mark, mark),
        ];
        let out = dump_all_to_string(&nodes, &DumperOptions::default()).unwrap();
        assert_eq!(out.matches("---").count(), 2);
    }

    #[test]
    fn a_composer_error_is_reported_with_its_document_index() {
        let err = load_all(b"a: 1\n---\na: &x [*x]\n").unwrap_err();
        match err {
            YamlError::InDocument { index, .. } => assert_eq!(index, 1),
            other => panic!("expected InDocument, got {other:?}"),
        }
    }
}
