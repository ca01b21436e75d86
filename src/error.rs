//! Error types for every stage of the load/dump pipeline.
//!
//! Each component gets its own `thiserror`-derived enum so a caller can match on
//! exactly where a document went wrong. Lower-layer errors are threaded into
//! higher-layer ones through `#[from]`, so a `ScannerError` that escapes the
//! scanner shows up as a `ParserError::Scan` without any manual wrapping at the
//! call site.

use std::fmt;

/// A position in the original input: zero-based byte index, line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    pub index: u64,
    pub line: u64,
    pub column: u64,
}

impl Mark {
    pub fn new(index: u64, line: u64, column: u64) -> Self {
        Self { index, line, column }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("unrecognized byte order mark")]
    InvalidBom,
    #[error("invalid UTF-8 at {mark}: byte {byte:#04x}")]
    InvalidUtf8 { byte: u8, mark: Mark },
    #[error("invalid UTF-16 at {mark}: unit {unit:#06x}")]
    InvalidUtf16 { unit: u16, mark: Mark },
    #[error("invalid UTF-32 at {mark}: unit {unit:#010x}")]
    InvalidUtf32 { unit: u32, mark: Mark },
    #[error("{problem} at {mark}")]
    Control { problem: &'static str, mark: Mark },
}

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("{problem} at {mark}")]
    Problem { problem: String, mark: Mark },
    #[error("{context} at {context_mark}: {problem} at {problem_mark}")]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: String,
        problem_mark: Mark,
    },
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("unexpected end of stream")]
    UnexpectedEof,
    #[error("{problem} at {mark}")]
    Problem { problem: String, mark: Mark },
    #[error("{context} at {context_mark}: {problem} at {problem_mark}")]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: String,
        problem_mark: Mark,
    },
    #[error(transparent)]
    Scan(#[from] ScannerError),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("no implicit tag matched value {value:?}")]
    NoMatch { value: String },
    #[error("malformed {kind} value {value:?} at {mark}")]
    Malformed {
        kind: &'static str,
        value: String,
        mark: Mark,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("{problem} at {mark}")]
    Problem { problem: String, mark: Mark },
    #[error("{context} at {context_mark}: {problem} at {problem_mark}")]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: String,
        problem_mark: Mark,
    },
    #[error(transparent)]
    Parse(#[from] ParserError),
    #[error(transparent)]
    Resolve(#[from] ResolverError),
    #[error(transparent)]
    Constructor(#[from] ConstructorError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConstructorError {
    #[error("{problem} at {mark}")]
    Problem { problem: String, mark: Mark },
    #[error("{context} at {context_mark}: {problem} at {problem_mark}")]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: String,
        problem_mark: Mark,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RepresenterError {
    #[error("cannot represent value: {problem}")]
    Problem { problem: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    #[error("{problem}")]
    Problem { problem: String, mark: Option<Mark> },
    #[error("serialized node has no tag and no implicit resolution applies")]
    NoTag,
    #[error(transparent)]
    Represent(#[from] RepresenterError),
}

#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    #[error("{problem}")]
    Problem { problem: String },
    #[error("expected nothing to emit but another event was queued")]
    ExpectedNothing,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialize(#[from] SerializerError),
}

/// Top-level error returned by the `Loader`/`Dumper` facade, unifying every
/// component error so callers only need to handle one type.
#[derive(Debug, thiserror::Error)]
pub enum YamlError {
    #[error(transparent)]
    Reader(#[from] ReaderError),
    #[error(transparent)]
    Scanner(#[from] ScannerError),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    Composer(#[from] ComposerError),
    #[error(transparent)]
    Constructor(#[from] ConstructorError),
    #[error(transparent)]
    Representer(#[from] RepresenterError),
    #[error(transparent)]
    Serializer(#[from] SerializerError),
    #[error(transparent)]
    Emitter(#[from] EmitterError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("error in document {index}: {source}")]
    InDocument {
        index: usize,
        #[source]
        source: Box<YamlError>,
    },
}
