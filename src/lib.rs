//! `yamele`: a YAML 1.1 loader/dumper.
//!
//! The pipeline mirrors libyaml/PyYAML's staged design:
//!
//! ```text
//! bytes -> Reader -> Scanner -> Parser -> Composer -> Node
//! Node -> Representer -> Serializer -> Emitter -> bytes
//! ```
//!
//! [`high_level::Loader`] and [`high_level::Dumper`] are the facade most
//! callers want; the staged modules are public for callers who need to
//! plug in a custom [`resolver::Resolver`] or [`constructor::Constructor`],
//! or who want the event stream directly.

pub mod composer;
pub mod constructor;
pub mod emitter;
pub mod error;
pub mod high_level;
pub mod multi_document;
pub mod node;
pub mod parser;
pub mod reader;
pub mod representer;
pub mod resolver;
pub mod scanner;
pub mod serializer;

pub use error::YamlError;
pub use high_level::{dump_to_string, Dumper, Loader};
pub use node::{Node, NodeValue, UserValue};
