//! [`Event`] stream → formatted bytes: style selection, indentation, line
//! wrapping, as described in `spec.md` §4.9.
//!
//! The Parser/Composer side of this crate buffers at most one token/event
//! of lookahead and drives a true state-machine because the input can be
//! arbitrarily large and arrives incrementally from the Scanner. The
//! Emitter has no such constraint — `spec.md`'s Non-goals keep the whole
//! crate buffer-in/buffer-out, so the Serializer has already materialized
//! every event for a document before the Emitter sees any of them. This
//! lets the Emitter walk that slice with a cursor and plain recursive
//! descent (mirroring the same block/flow, sequence/mapping, first-entry
//! grammar the Parser's state stack encodes) instead of reimplementing a
//! second push/pop state machine over a bounded queue.

use std::io::Write;

use crate::error::EmitterError;
use crate::parser::{CollectionStyle, Event, EventData};
use crate::resolver::Resolver;
use crate::scanner::ScalarStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreak {
    Lf,
    CrLf,
    Cr,
}

impl Default for LineBreak {
    fn default() -> Self {
        LineBreak::Lf
    }
}

impl LineBreak {
    fn as_str(self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::CrLf => "\r\n",
            LineBreak::Cr => "\r",
        }
    }
}

/// Dumper-facing emitter configuration, per `spec.md` §6.
#[derive(Debug, Clone)]
pub struct DumperOptions {
    pub canonical: bool,
    pub indent: usize,
    pub width: usize,
    pub line_break: LineBreak,
    pub explicit_start: bool,
    pub explicit_end: bool,
    /// `None` suppresses the `%YAML` directive entirely.
    pub version: Option<(u32, u32)>,
    pub tag_directives: Vec<(String, String)>,
    pub default_scalar_style: Option<char>,
    pub default_flow_collection: bool,
}

impl Default for DumperOptions {
    fn default() -> Self {
        Self {
            canonical: false,
            indent: 2,
            width: 80,
            line_break: LineBreak::Lf,
            explicit_start: false,
            explicit_end: false,
            // No `%YAML` directive by default, matching the teacher's own
            // dump output for a plain `{hello: [world]}`-style document —
            // `(1, 1)` is only the version *used* when a caller opts in via
            // `with_version(Some(..))` or an explicit document start forces
            // one to be written.
            version: None,
            tag_directives: Vec::new(),
            default_scalar_style: None,
            default_flow_collection: false,
        }
    }
}

impl DumperOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_canonical(mut self, canonical: bool) -> Self {
        self.canonical = canonical;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent.max(1);
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_line_break(mut self, line_break: LineBreak) -> Self {
        self.line_break = line_break;
        self
    }

    pub fn with_explicit_start(mut self, explicit: bool) -> Self {
        self.explicit_start = explicit;
        self
    }

    pub fn with_explicit_end(mut self, explicit: bool) -> Self {
        self.explicit_end = explicit;
        self
    }

    pub fn with_version(mut self, version: Option<(u32, u32)>) -> Self {
        self.version = version;
        self
    }

    pub fn with_tag_directive(mut self, handle: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.tag_directives.push((handle.into(), prefix.into()));
        self
    }

    pub fn with_default_scalar_style(mut self, style: Option<char>) -> Self {
        self.default_scalar_style = style;
        self
    }

    pub fn with_default_flow_collection(mut self, flow: bool) -> Self {
        self.default_flow_collection = flow;
        self
    }
}

/// Bitmask of scalar characteristics computed in one pass, per `spec.md`
/// §4.9 ("scan it once to compute... the bitmask drives the style
/// decision").
struct ScalarAnalysis {
    empty: bool,
    multiline: bool,
    has_control: bool,
    leading_space: bool,
    trailing_space: bool,
    starts_with_indicator: bool,
    special_combination: bool,
}

fn analyze_scalar(value: &str) -> ScalarAnalysis {
    let first = value.chars().next();
    let starts_with_indicator = matches!(
        first,
        Some('-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`')
    );
    let has_control = value.chars().any(|c| (c.is_control() && c != '\n' && c != '\t') || c == '\u{feff}');
    let special_combination = value.contains(": ") || value.contains(" #") || value.ends_with(':') || value == "-";
    ScalarAnalysis {
        empty: value.is_empty(),
        multiline: value.contains('\n'),
        has_control,
        leading_space: value.starts_with(' ') || value.starts_with('\t'),
        trailing_space: value.ends_with(' ') || value.ends_with('\t'),
        starts_with_indicator,
        special_combination,
    }
}

/// Chooses among plain → single-quoted → double-quoted → literal, in the
/// preference order `spec.md` §4.9 lists. Folded is treated as literal:
/// once the Scanner has already folded a `>` scalar's line breaks into
/// spaces at load time, the resulting string has lost the information
/// needed to fold it the same way again, so re-emitting it folded would
/// either double-fold or require guessing line boundaries back in. Literal
/// always reproduces the stored string exactly on a subsequent load.
fn choose_style(
    value: &str,
    tag: &str,
    implicit: bool,
    requested: ScalarStyle,
    in_flow: bool,
    resolver: &Resolver,
    canonical: bool,
) -> ScalarStyle {
    if canonical {
        return ScalarStyle::DoubleQuoted;
    }
    let analysis = analyze_scalar(value);
    match requested {
        ScalarStyle::Literal | ScalarStyle::Folded if !in_flow && !analysis.has_control => ScalarStyle::Literal,
        ScalarStyle::SingleQuoted if !analysis.has_control => ScalarStyle::SingleQuoted,
        ScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
        _ => {
            if analysis.empty {
                return if implicit { ScalarStyle::Plain } else { ScalarStyle::DoubleQuoted };
            }
            if analysis.multiline {
                return if analysis.has_control { ScalarStyle::DoubleQuoted } else { ScalarStyle::Literal };
            }
            let flow_unsafe = in_flow && value.chars().any(|c| matches!(c, ',' | '[' | ']' | '{' | '}'));
            let plain_ok = !analysis.has_control
                && !analysis.starts_with_indicator
                && !analysis.special_combination
                && !analysis.leading_space
                && !analysis.trailing_space
                && !flow_unsafe
                && resolver.resolve_scalar(value, true) == tag;
            if plain_ok {
                ScalarStyle::Plain
            } else if !analysis.has_control {
                ScalarStyle::SingleQuoted
            } else {
                ScalarStyle::DoubleQuoted
            }
        }
    }
}

fn default_style_override(style: Option<char>) -> Option<ScalarStyle> {
    match style {
        Some('\'') => Some(ScalarStyle::SingleQuoted),
        Some('"') => Some(ScalarStyle::DoubleQuoted),
        Some('|') => Some(ScalarStyle::Literal),
        Some('>') => Some(ScalarStyle::Folded),
        _ => None,
    }
}

fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '\u{1b}' => out.push_str("\\e"),
            '\u{85}' => out.push_str("\\N"),
            '\u{a0}' => out.push_str("\\_"),
            '\u{2028}' => out.push_str("\\L"),
            '\u{2029}' => out.push_str("\\P"),
            c if (c as u32) < 0x20 || (c as u32) == 0x7f => out.push_str(&format!("\\x{:02X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn format_tag(tag: &str) -> String {
    if let Some(suffix) = tag.strip_prefix("tag:yaml.org,2002:") {
        format!("!!{suffix}")
    } else if tag.starts_with('!') {
        tag.to_string()
    } else {
        format!("!<{tag}>")
    }
}

struct Cursor<'a> {
    events: &'a [Event],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next(&mut self) -> Result<Event, EmitterError> {
        let event = self.events.get(self.pos).cloned().ok_or(EmitterError::ExpectedNothing)?;
        self.pos += 1;
        Ok(event)
    }

    fn peek(&self) -> Result<&'a Event, EmitterError> {
        self.events.get(self.pos).ok_or(EmitterError::ExpectedNothing)
    }
}

pub struct Emitter<'w, W: Write> {
    writer: &'w mut W,
    options: &'w DumperOptions,
    resolver: Resolver,
    column: usize,
}

impl<'w, W: Write> Emitter<'w, W> {
    fn write_str(&mut self, s: &str) -> Result<(), EmitterError> {
        self.writer.write_all(s.as_bytes())?;
        match s.rfind('\n') {
            Some(pos) => self.column = s[pos + 1..].chars().count(),
            None => self.column += s.chars().count(),
        }
        Ok(())
    }

    fn write_line_break(&mut self) -> Result<(), EmitterError> {
        self.writer.write_all(self.options.line_break.as_str().as_bytes())?;
        self.column = 0;
        Ok(())
    }

    fn write_indent(&mut self, indent: usize) -> Result<(), EmitterError> {
        if self.column > 0 {
            self.write_line_break()?;
        }
        if indent > 0 {
            self.write_str(&" ".repeat(indent))?;
        }
        Ok(())
    }

    fn write_wrapped(&mut self, text: &str, indent: usize) -> Result<(), EmitterError> {
        if self.options.canonical || self.options.width == 0 {
            return self.write_str(text);
        }
        for (i, word) in text.split(' ').enumerate() {
            if i > 0 {
                if self.column + 1 + word.chars().count() > self.options.width && self.column > indent {
                    self.write_line_break()?;
                    self.write_str(&" ".repeat(indent))?;
                } else {
                    self.write_str(" ")?;
                }
            }
            self.write_str(word)?;
        }
        Ok(())
    }

    fn write_anchor_and_tag(&mut self, anchor: Option<&str>, tag: Option<&str>, implicit: bool) -> Result<(), EmitterError> {
        if let Some(a) = anchor {
            self.write_str(&format!("&{a} "))?;
        }
        if (!implicit || self.options.canonical) && tag.is_some_and(|t| !t.is_empty()) {
            self.write_str(&format!("{} ", format_tag(tag.unwrap())))?;
        }
        Ok(())
    }

    fn emit_scalar(&mut self, value: &str, tag: &str, implicit: bool, requested: ScalarStyle, indent: usize, in_flow: bool) -> Result<(), EmitterError> {
        // `ScalarStyle::Plain` here means the Node carried no recorded style
        // of its own (plain scalars never stamp `Node.style`, see
        // `composer.rs`'s `scalar_style_char`) — that's the only case where
        // the dumper-wide `default_scalar_style` gets a say.
        let requested = if requested == ScalarStyle::Plain {
            default_style_override(self.options.default_scalar_style).unwrap_or(requested)
        } else {
            requested
        };
        let style = choose_style(value, tag, implicit, requested, in_flow, &self.resolver, self.options.canonical);
        match style {
            ScalarStyle::Plain => self.write_wrapped(value, indent),
            ScalarStyle::SingleQuoted => {
                self.write_str("'")?;
                self.write_wrapped(&value.replace('\'', "''"), indent)?;
                self.write_str("'")
            }
            ScalarStyle::DoubleQuoted => {
                self.write_str("\"")?;
                self.write_wrapped(&escape_double_quoted(value), indent)?;
                self.write_str("\"")
            }
            ScalarStyle::Literal | ScalarStyle::Folded => self.write_literal(value, indent),
        }
    }

    fn write_literal(&mut self, value: &str, indent: usize) -> Result<(), EmitterError> {
        let child_indent = indent + self.options.indent;
        let stripped = value.trim_end_matches('\n');
        let trailing_breaks = value.len() - stripped.len();
        let chomp = match trailing_breaks {
            0 => "-",
            1 => "",
            _ => "+",
        };
        self.write_str(&format!("|{chomp}"))?;
        if stripped.is_empty() {
            return self.write_line_break();
        }
        for line in stripped.split('\n') {
            self.write_line_break()?;
            if !line.is_empty() {
                self.write_str(&" ".repeat(child_indent))?;
                self.write_str(line)?;
            }
        }
        if chomp != "-" {
            self.write_line_break()?;
        }
        Ok(())
    }

    fn emit_node(&mut self, cursor: &mut Cursor, indent: usize, in_flow: bool, already_positioned: bool) -> Result<(), EmitterError> {
        let event = cursor.next()?;
        match event.data {
            EventData::Alias { anchor } => self.write_str(&format!("*{anchor}")),
            EventData::Scalar { anchor, tag, value, plain_implicit, style, .. } => {
                self.write_anchor_and_tag(anchor.as_deref(), tag.as_deref(), plain_implicit)?;
                self.emit_scalar(&value, tag.as_deref().unwrap_or(""), plain_implicit, style, indent, in_flow)
            }
            EventData::SequenceStart { anchor, tag, implicit, style } => {
                self.write_anchor_and_tag(anchor.as_deref(), tag.as_deref(), implicit)?;
                if self.options.canonical || style == CollectionStyle::Flow {
                    self.emit_flow_sequence(cursor, indent)
                } else {
                    self.emit_block_sequence(cursor, indent, already_positioned)
                }
            }
            EventData::MappingStart { anchor, tag, implicit, style } => {
                self.write_anchor_and_tag(anchor.as_deref(), tag.as_deref(), implicit)?;
                if self.options.canonical || style == CollectionStyle::Flow {
                    self.emit_flow_mapping(cursor, indent)
                } else {
                    self.emit_block_mapping(cursor, indent, already_positioned)
                }
            }
            other => Err(EmitterError::Problem { problem: format!("unexpected event in node position: {other:?}") }),
        }
    }

    fn emit_block_sequence(&mut self, cursor: &mut Cursor, indent: usize, already_positioned: bool) -> Result<(), EmitterError> {
        let mut first = true;
        loop {
            if matches!(cursor.peek()?.data, EventData::SequenceEnd) {
                cursor.next()?;
                break;
            }
            if !(first && already_positioned) {
                self.write_indent(indent)?;
            }
            first = false;
            self.write_str("-")?;
            self.write_str(" ")?;
            self.emit_node(cursor, indent + 2, false, true)?;
        }
        Ok(())
    }

    fn emit_block_mapping(&mut self, cursor: &mut Cursor, indent: usize, already_positioned: bool) -> Result<(), EmitterError> {
        let mut first = true;
        loop {
            if matches!(cursor.peek()?.data, EventData::MappingEnd) {
                cursor.next()?;
                break;
            }
            if !(first && already_positioned) {
                self.write_indent(indent)?;
            }
            first = false;

            let key_is_complex = matches!(cursor.peek()?.data, EventData::SequenceStart { .. } | EventData::MappingStart { .. });
            if key_is_complex {
                self.write_str("? ")?;
                self.emit_node(cursor, indent + 2, false, true)?;
                self.write_indent(indent)?;
                self.write_str(":")?;
            } else {
                self.emit_node(cursor, indent, false, false)?;
                self.write_str(":")?;
            }

            let value_is_block_collection = !self.options.canonical
                && matches!(
                    cursor.peek()?.data,
                    EventData::SequenceStart { style: CollectionStyle::Block, .. } | EventData::MappingStart { style: CollectionStyle::Block, .. }
                );
            if value_is_block_collection {
                self.emit_node(cursor, indent + self.options.indent, false, false)?;
            } else {
                self.write_str(" ")?;
                self.emit_node(cursor, indent, false, true)?;
            }
        }
        Ok(())
    }

    fn emit_flow_sequence(&mut self, cursor: &mut Cursor, indent: usize) -> Result<(), EmitterError> {
        self.write_str("[")?;
        let mut first = true;
        loop {
            if matches!(cursor.peek()?.data, EventData::SequenceEnd) {
                cursor.next()?;
                break;
            }
            if !first {
                self.write_str(", ")?;
            }
            first = false;
            self.emit_node(cursor, indent + self.options.indent, true, false)?;
        }
        self.write_str("]")
    }

    fn emit_flow_mapping(&mut self, cursor: &mut Cursor, indent: usize) -> Result<(), EmitterError> {
        self.write_str("{")?;
        let mut first = true;
        loop {
            if matches!(cursor.peek()?.data, EventData::MappingEnd) {
                cursor.next()?;
                break;
            }
            if !first {
                self.write_str(", ")?;
            }
            first = false;
            self.emit_node(cursor, indent + self.options.indent, true, false)?;
            self.write_str(": ")?;
            self.emit_node(cursor, indent + self.options.indent, true, false)?;
        }
        self.write_str("}")
    }

    fn emit_document(&mut self, cursor: &mut Cursor) -> Result<(), EmitterError> {
        let start = cursor.next()?;
        let (version, tags, explicit) = match start.data {
            EventData::DocumentStart { version, tags, explicit } => (version, tags, explicit),
            other => return Err(EmitterError::Problem { problem: format!("expected document start, found {other:?}") }),
        };

        let resolved_version = version.or(self.options.version);
        if let Some((major, minor)) = resolved_version {
            self.write_str(&format!("%YAML {major}.{minor}"))?;
            self.write_line_break()?;
        }
        let tag_directives = if !tags.is_empty() { tags } else { self.options.tag_directives.clone() };
        for (handle, prefix) in &tag_directives {
            self.write_str(&format!("%TAG {handle} {prefix}"))?;
            self.write_line_break()?;
        }

        let need_explicit_start = explicit || self.options.explicit_start || !tag_directives.is_empty() || resolved_version.is_some();
        if need_explicit_start {
            self.write_str("---")?;
            let next_is_scalar = matches!(cursor.peek()?.data, EventData::Scalar { .. });
            if next_is_scalar && !self.options.canonical {
                self.write_str(" ")?;
            } else {
                self.write_line_break()?;
            }
            self.emit_node(cursor, 0, false, true)?;
        } else {
            self.emit_node(cursor, 0, false, false)?;
        }

        if self.column > 0 {
            self.write_line_break()?;
        }

        let end = cursor.next()?;
        let explicit_end = match end.data {
            EventData::DocumentEnd { explicit } => explicit,
            other => return Err(EmitterError::Problem { problem: format!("expected document end, found {other:?}") }),
        };
        if explicit_end || self.options.explicit_end {
            self.write_str("...")?;
            self.write_line_break()?;
        }
        Ok(())
    }
}

/// Emit a full event stream (`StreamStart` … `StreamEnd`) to `writer`.
pub fn emit(writer: &mut impl Write, events: &[Event], options: &DumperOptions) -> Result<(), EmitterError> {
    let mut cursor = Cursor { events, pos: 0 };
    match cursor.next()?.data {
        EventData::StreamStart => {}
        other => return Err(EmitterError::Problem { problem: format!("expected stream start, found {other:?}") }),
    }
    let mut emitter = Emitter { writer, options, resolver: Resolver::new(), column: 0 };
    loop {
        match cursor.peek()?.data {
            EventData::StreamEnd => {
                cursor.next()?;
                break;
            }
            EventData::DocumentStart { .. } => emitter.emit_document(&mut cursor)?,
            ref other => return Err(EmitterError::Problem { problem: format!("expected document start or stream end, found {other:?}") }),
        }
    }
    emitter.writer.flush()?;
    Ok(())
}

/// Convenience wrapper returning the emitted document(s) as a `String`.
pub fn emit_to_string(events: &[Event], options: &DumperOptions) -> Result<String, EmitterError> {
    let mut buf = Vec::new();
    emit(&mut buf, events, options)?;
    String::from_utf8(buf).map_err(|e| EmitterError::Problem { problem: format!("emitted non-UTF-8 output: {e}") })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::Composer;
    use crate::parser::Parser;
    use crate::reader::Reader;
    use crate::scanner::Scanner;
    use crate::serializer::Serializer;

    fn dump(src: &str, options: &DumperOptions) -> String {
        let reader = Reader::new(src.as_bytes()).unwrap();
        let parser = Parser::new(Scanner::new(reader));
        let mut composer = Composer::new(parser);
        let node = composer.compose_next_document().unwrap().unwrap();
        let mut serializer = Serializer::new();
        let doc_events = serializer.serialize_document(&node, false, false, None, vec![]).unwrap();
        let mut events = vec![Event { data: EventData::StreamStart, start_mark: Default::default(), end_mark: Default::default() }];
        events.extend(doc_events);
        events.push(Event { data: EventData::StreamEnd, start_mark: Default::default(), end_mark: Default::default() });
        emit_to_string(&events, options).unwrap()
    }

    #[test]
    fn dumps_plain_mapping_with_flow_sequence() {
        let out = dump("hello: [world]\n", &DumperOptions::default());
        assert!(out.contains("hello:"));
        assert!(out.contains("world"));
    }

    #[test]
    fn dumps_nested_block_structure() {
        let out = dump("a:\n  - 1\n  - 2\nb: x\n", &DumperOptions::default());
        assert!(out.contains("a:"));
        assert!(out.contains("- 1"));
        assert!(out.contains("b: x"));
    }

    #[test]
    fn quotes_ambiguous_scalars() {
        let out = dump("a: \"yes\"\n", &DumperOptions::default());
        assert!(out.contains("'yes'") || out.contains("\"yes\""));
    }

    #[test]
    fn canonical_mode_uses_double_quotes_and_tags() {
        let out = dump("a: 1\n", &DumperOptions::default().with_canonical(true));
        assert!(out.contains("!!int") || out.contains("!!map"));
    }
}
