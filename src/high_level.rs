//! The public facade `spec.md` §6 describes: a `Loader` that turns bytes
//! into `Node`s and a `Dumper` that turns `Node`s back into bytes. Every
//! other module in this crate exists to make these two types thin.

use std::fs;
use std::io::Write;
use std::path::Path;

use log::debug;

use crate::constructor::Constructor;
use crate::emitter::DumperOptions;
use crate::error::{ComposerError, Mark, YamlError};
use crate::multi_document::{dump_all, dump_all_to_string, Documents};
use crate::node::Node;
use crate::resolver::Resolver;

/// A single-document `load()` has only one document to blame, so the
/// `YamlError::InDocument { index: 0, .. }` wrapper `Documents::next` adds
/// for stream bookkeeping is just noise here — unwrap it back to the
/// underlying component error. `load_all`/iteration keep the wrapper, since
/// there the index is the only way to tell which document failed.
fn unwrap_single_document_error(err: YamlError) -> YamlError {
    match err {
        YamlError::InDocument { source, .. } => *source,
        other => other,
    }
}

/// Loads documents out of a byte buffer, per `spec.md` §6: construct, then
/// `load()`/`load_all()`/iterate. A `Loader` is single-use — composing a
/// document consumes it from the underlying stream, same as the `Documents`
/// iterator it wraps.
pub struct Loader {
    documents: Documents,
}

impl Loader {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, YamlError> {
        Ok(Self { documents: Documents::new(bytes)? })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, YamlError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        debug!("loader: read {} bytes from {}", bytes.len(), path.display());
        Self::from_bytes(&bytes)
    }

    /// Same as [`Loader::from_bytes`], but with a caller-supplied
    /// `Resolver`/`Constructor` pair instead of the defaults — the
    /// tag-handler extension point `spec.md` §6 describes.
    pub fn with_resolver_and_constructor(bytes: &[u8], resolver: Resolver, constructor: Constructor) -> Result<Self, YamlError> {
        Ok(Self { documents: Documents::with_resolver_and_constructor(bytes, resolver, constructor)? })
    }

    /// Returns exactly one document, failing if the stream holds zero or
    /// more than one. Has to attempt composing a second document to know
    /// there isn't one, so this consumes the loader either way.
    pub fn load(mut self) -> Result<Node, YamlError> {
        let first = match self.documents.next() {
            Some(Ok(node)) => node,
            Some(Err(err)) => return Err(unwrap_single_document_error(err)),
            None => {
                return Err(ComposerError::Problem {
                    problem: "expected exactly one document, found none".to_string(),
                    mark: Mark::default(),
                }
                .into())
            }
        };
        if self.documents.next().is_some() {
            return Err(ComposerError::Problem {
                problem: "expected exactly one document, found more than one".to_string(),
                mark: Mark::default(),
            }
            .into());
        }
        debug!("loader: loaded a single document");
        Ok(first)
    }

    /// Returns every document in order.
    pub fn load_all(self) -> Result<Vec<Node>, YamlError> {
        let docs = self.documents.collect::<Result<Vec<_>, _>>()?;
        debug!("loader: loaded {} document(s)", docs.len());
        Ok(docs)
    }
}

impl Iterator for Loader {
    type Item = Result<Node, YamlError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.documents.next()
    }
}

/// Serializes `Node`s to a write sink, per `spec.md` §6. Every document
/// passed to [`Dumper::dump`] in one call shares the same `DumperOptions`
/// and, once there's more than one, is separated by explicit `---`/`...`
/// markers regardless of the configured `explicit_start`/`explicit_end`.
pub struct Dumper<'w, W: Write> {
    writer: &'w mut W,
    options: DumperOptions,
}

impl<'w, W: Write> Dumper<'w, W> {
    pub fn new(writer: &'w mut W) -> Self {
        Self { writer, options: DumperOptions::default() }
    }

    pub fn with_options(writer: &'w mut W, options: DumperOptions) -> Self {
        Self { writer, options }
    }

    pub fn options(&self) -> &DumperOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut DumperOptions {
        &mut self.options
    }

    /// Serializes `nodes`, each as its own document, to the configured sink.
    pub fn dump(&mut self, nodes: &[Node]) -> Result<(), YamlError> {
        debug!("dumper: dumping {} document(s)", nodes.len());
        dump_all(self.writer, nodes, &self.options)
    }
}

/// Convenience wrapper returning the dump as a `String` without requiring a
/// caller-owned sink.
pub fn dump_to_string(nodes: &[Node], options: &DumperOptions) -> Result<String, YamlError> {
    dump_all_to_string(nodes, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeValue;

    #[test]
    fn loads_exactly_one_document() {
        let node = Loader::from_bytes(b"a: 1\n").unwrap().load().unwrap();
        assert!(node.as_mapping().is_some());
    }

    #[test]
    fn load_fails_on_empty_stream() {
        let err = Loader::from_bytes(b"").unwrap().load().unwrap_err();
        assert!(matches!(err, YamlError::Composer(ComposerError::Problem { .. })));
    }

    #[test]
    fn load_fails_on_multiple_documents() {
        let err = Loader::from_bytes(b"1\n---\n2\n").unwrap().load().unwrap_err();
        assert!(matches!(err, YamlError::Composer(ComposerError::Problem { .. })));
    }

    #[test]
    fn loader_iterates_lazily() {
        let loader = Loader::from_bytes(b"1\n---\n2\n---\n3\n").unwrap();
        let docs: Vec<Node> = loader.map(Result::unwrap).collect();
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn dumper_round_trips_through_a_vec_sink() {
        let node = Loader::from_bytes(b"a: 1\nb: [1, 2, 3]\n").unwrap().load().unwrap();
        let mut buf = Vec::new();
        Dumper::new(&mut buf).dump(&[node]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let reloaded = Loader::from_bytes(text.as_bytes()).unwrap().load().unwrap();
        let pairs = reloaded.as_mapping().unwrap();
        assert!(matches!(pairs[0].1.value, NodeValue::Int(1)));
    }
}
