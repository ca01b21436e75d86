//! Turns a token stream into an event stream: `Event`/`EventData` plus the
//! grammar state machine (`Parser`) that drives the `Scanner` one token of
//! lookahead at a time.
//!
//! The state stack mirrors the grammar states `libyaml`'s parser walks
//! through (`BlockMappingFirstKey`, `FlowSequenceEntry`, …); the mechanics
//! here — pushing a continuation state before recursing into a nested node,
//! popping it back off once that node closes — follow the same design,
//! renamed to this crate's idiom.

use crate::error::{Mark, ParserError};
use crate::scanner::{Scanner, ScalarStyle, Token, TokenData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStyle {
    Block,
    Flow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    StreamStart,
    StreamEnd,
    DocumentStart {
        version: Option<(u32, u32)>,
        tags: Vec<(String, String)>,
        explicit: bool,
    },
    DocumentEnd {
        explicit: bool,
    },
    Alias {
        anchor: String,
    },
    Scalar {
        anchor: Option<String>,
        tag: Option<String>,
        value: String,
        plain_implicit: bool,
        quoted_implicit: bool,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        style: CollectionStyle,
    },
    MappingEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub data: EventData,
    pub start_mark: Mark,
    pub end_mark: Mark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockNodeOrIndentlessSequence,
    FlowNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

pub struct Parser {
    scanner: Scanner,
    lookahead: Option<Token>,
    state: State,
    states: Vec<State>,
    tag_directives: Vec<(String, String)>,
    stream_ended: bool,
}

impl Parser {
    pub fn new(scanner: Scanner) -> Self {
        Self {
            scanner,
            lookahead: None,
            state: State::StreamStart,
            states: Vec::new(),
            tag_directives: Vec::new(),
            stream_ended: false,
        }
    }

    pub fn parse_all(&mut self) -> Result<Vec<Event>, ParserError> {
        let mut events = Vec::new();
        loop {
            let event = self.next_event()?;
            let done = matches!(event.data, EventData::StreamEnd);
            events.push(event);
            if done {
                break;
            }
        }
        Ok(events)
    }

    fn peek(&mut self) -> Result<&Token, ParserError> {
        if self.lookahead.is_none() {
            let tok = self
                .scanner
                .next_token()
                .map_err(ParserError::from)?
                .ok_or(ParserError::UnexpectedEof)?;
            self.lookahead = Some(tok);
        }
        Ok(self.lookahead.as_ref().unwrap())
    }

    fn bump(&mut self) -> Result<Token, ParserError> {
        self.peek()?;
        Ok(self.lookahead.take().unwrap())
    }

    fn push_state(&mut self, next: State) {
        self.states.push(next);
    }

    fn pop_state(&mut self) -> State {
        self.states.pop().unwrap_or(State::End)
    }

    pub fn next_event(&mut self) -> Result<Event, ParserError> {
        match self.state {
            State::StreamStart => self.parse_stream_start(),
            State::ImplicitDocumentStart => self.parse_document_start(true),
            State::DocumentStart => self.parse_document_start(false),
            State::DocumentContent => self.parse_document_content(),
            State::DocumentEnd => self.parse_document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockNodeOrIndentlessSequence => self.parse_node(true, true),
            State::FlowNode => self.parse_node(false, false),
            State::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            State::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            State::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            State::BlockMappingKey => self.parse_block_mapping_key(false),
            State::BlockMappingValue => self.parse_block_mapping_value(),
            State::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.parse_flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.parse_flow_sequence_entry_mapping_end(),
            State::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            State::FlowMappingKey => self.parse_flow_mapping_key(false),
            State::FlowMappingValue => self.parse_flow_mapping_value(false),
            State::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            State::End => Ok(Event {
                data: EventData::StreamEnd,
                start_mark: Mark::default(),
                end_mark: Mark::default(),
            }),
        }
    }

    fn parse_stream_start(&mut self) -> Result<Event, ParserError> {
        let tok = self.bump()?;
        if !matches!(tok.data, TokenData::StreamStart) {
            return Err(ParserError::Problem {
                problem: "expected stream start".to_string(),
                mark: tok.start_mark,
            });
        }
        self.state = State::ImplicitDocumentStart;
        Ok(Event { data: EventData::StreamStart, start_mark: tok.start_mark, end_mark: tok.end_mark })
    }

    fn parse_document_start(&mut self, implicit_allowed: bool) -> Result<Event, ParserError> {
        while matches!(self.peek()?.data, TokenData::DocumentEnd) {
            self.bump()?;
        }
        if matches!(self.peek()?.data, TokenData::StreamEnd) {
            let tok = self.bump()?;
            self.stream_ended = true;
            self.state = State::End;
            return Ok(Event { data: EventData::StreamEnd, start_mark: tok.start_mark, end_mark: tok.end_mark });
        }

        let start_mark = self.peek()?.start_mark;
        let mut version = None;
        self.tag_directives.clear();
        loop {
            match &self.peek()?.data {
                TokenData::VersionDirective { major, minor } => {
                    if version.is_some() {
                        return Err(ParserError::Problem {
                            problem: "found duplicate %YAML directive".to_string(),
                            mark: self.peek()?.start_mark,
                        });
                    }
                    let (major, minor) = (*major, *minor);
                    if major != 1 {
                        return Err(ParserError::Problem {
                            problem: format!("found incompatible YAML document (version {major}.{minor})"),
                            mark: self.peek()?.start_mark,
                        });
                    }
                    if minor != 1 {
                        log::warn!("YAML directive requests version 1.{minor}; parsing as 1.1");
                    }
                    version = Some((major, minor));
                    self.bump()?;
                }
                TokenData::TagDirective { handle, prefix } => {
                    self.tag_directives.push((handle.clone(), prefix.clone()));
                    self.bump()?;
                }
                _ => break,
            }
        }

        let explicit = matches!(self.peek()?.data, TokenData::DocumentStart) || version.is_some() || !self.tag_directives.is_empty();
        if matches!(self.peek()?.data, TokenData::DocumentStart) {
            let tok = self.bump()?;
            self.push_state(State::DocumentEnd);
            self.state = State::DocumentContent;
            return Ok(Event {
                data: EventData::DocumentStart { version, tags: self.tag_directives.clone(), explicit: true },
                start_mark: tok.start_mark,
                end_mark: tok.end_mark,
            });
        }

        if !implicit_allowed || explicit {
            // a directive without an explicit '---' is still a document start
            let end_mark = self.peek()?.start_mark;
            self.push_state(State::DocumentEnd);
            self.state = State::DocumentContent;
            return Ok(Event {
                data: EventData::DocumentStart { version, tags: self.tag_directives.clone(), explicit },
                start_mark,
                end_mark,
            });
        }

        let end_mark = self.peek()?.start_mark;
        self.push_state(State::DocumentEnd);
        self.state = State::DocumentContent;
        Ok(Event {
            data: EventData::DocumentStart { version: None, tags: Vec::new(), explicit: false },
            start_mark,
            end_mark,
        })
    }

    fn parse_document_content(&mut self) -> Result<Event, ParserError> {
        if matches!(
            self.peek()?.data,
            TokenData::VersionDirective { .. }
                | TokenData::TagDirective { .. }
                | TokenData::DocumentStart
                | TokenData::DocumentEnd
                | TokenData::StreamEnd
        ) {
            let mark = self.peek()?.start_mark;
            self.state = self.pop_state();
            return Ok(Event {
                data: EventData::Scalar {
                    anchor: None,
                    tag: None,
                    value: String::new(),
                    plain_implicit: true,
                    quoted_implicit: false,
                    style: ScalarStyle::Plain,
                },
                start_mark: mark,
                end_mark: mark,
            });
        }
        self.parse_node(true, false)
    }

    fn parse_document_end(&mut self) -> Result<Event, ParserError> {
        let mut explicit = false;
        let mut start_mark = self.peek()?.start_mark;
        let mut end_mark = start_mark;
        if matches!(self.peek()?.data, TokenData::DocumentEnd) {
            let tok = self.bump()?;
            explicit = true;
            start_mark = tok.start_mark;
            end_mark = tok.end_mark;
        }
        self.state = State::ImplicitDocumentStart;
        Ok(Event { data: EventData::DocumentEnd { explicit }, start_mark, end_mark })
    }

    fn resolve_tag(&self, handle: &str, suffix: &str, mark: Mark) -> Result<String, ParserError> {
        if handle.is_empty() {
            return Ok(suffix.to_string());
        }
        if handle == "!" {
            return Ok(format!("!{suffix}"));
        }
        if handle == "!!" {
            return Ok(format!("tag:yaml.org,2002:{suffix}"));
        }
        for (h, prefix) in self.tag_directives.iter().rev() {
            if h == handle {
                return Ok(format!("{prefix}{suffix}"));
            }
        }
        Err(ParserError::Problem {
            problem: format!("found undefined tag handle {handle:?}"),
            mark,
        })
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event, ParserError> {
        if let TokenData::Alias(name) = &self.peek()?.data {
            let name = name.clone();
            let tok = self.bump()?;
            self.state = self.pop_state();
            return Ok(Event { data: EventData::Alias { anchor: name }, start_mark: tok.start_mark, end_mark: tok.end_mark });
        }

        let start_mark = self.peek()?.start_mark;
        let mut anchor = None;
        let mut tag: Option<String> = None;
        let mut tag_mark = start_mark;

        loop {
            match &self.peek()?.data {
                TokenData::Anchor(name) => {
                    anchor = Some(name.clone());
                    self.bump()?;
                }
                TokenData::Tag { handle, suffix } => {
                    let (handle, suffix) = (handle.clone(), suffix.clone());
                    tag_mark = self.peek()?.start_mark;
                    tag = Some(self.resolve_tag(&handle, &suffix, tag_mark)?);
                    self.bump()?;
                }
                _ => break,
            }
        }
        let _ = tag_mark;

        match &self.peek()?.data {
            TokenData::Scalar { value, style } => {
                let (value, style) = (value.clone(), *style);
                let tok = self.bump()?;
                let implicit_tag = tag.is_none();
                self.state = self.pop_state();
                return Ok(Event {
                    data: EventData::Scalar {
                        anchor,
                        tag,
                        value,
                        plain_implicit: implicit_tag && style == ScalarStyle::Plain,
                        quoted_implicit: implicit_tag && style != ScalarStyle::Plain,
                        style,
                    },
                    start_mark,
                    end_mark: tok.end_mark,
                });
            }
            TokenData::FlowSequenceStart => {
                let tok = self.bump()?;
                self.state = State::FlowSequenceFirstEntry;
                return Ok(Event {
                    data: EventData::SequenceStart { anchor, tag: tag.clone(), implicit: tag.is_none(), style: CollectionStyle::Flow },
                    start_mark,
                    end_mark: tok.end_mark,
                });
            }
            TokenData::FlowMappingStart => {
                let tok = self.bump()?;
                self.state = State::FlowMappingFirstKey;
                return Ok(Event {
                    data: EventData::MappingStart { anchor, tag: tag.clone(), implicit: tag.is_none(), style: CollectionStyle::Flow },
                    start_mark,
                    end_mark: tok.end_mark,
                });
            }
            TokenData::BlockSequenceStart if block => {
                let tok = self.bump()?;
                self.state = State::BlockSequenceFirstEntry;
                return Ok(Event {
                    data: EventData::SequenceStart { anchor, tag: tag.clone(), implicit: tag.is_none(), style: CollectionStyle::Block },
                    start_mark,
                    end_mark: tok.end_mark,
                });
            }
            TokenData::BlockMappingStart if block => {
                let tok = self.bump()?;
                self.state = State::BlockMappingFirstKey;
                return Ok(Event {
                    data: EventData::MappingStart { anchor, tag: tag.clone(), implicit: tag.is_none(), style: CollectionStyle::Block },
                    start_mark,
                    end_mark: tok.end_mark,
                });
            }
            TokenData::BlockEntry if indentless_sequence => {
                let end_mark = self.peek()?.start_mark;
                self.state = State::IndentlessSequenceEntry;
                return Ok(Event {
                    data: EventData::SequenceStart { anchor, tag: tag.clone(), implicit: tag.is_none(), style: CollectionStyle::Block },
                    start_mark,
                    end_mark,
                });
            }
            _ => {
                let end_mark = start_mark;
                self.state = self.pop_state();
                return Ok(Event {
                    data: EventData::Scalar {
                        anchor,
                        tag,
                        value: String::new(),
                        plain_implicit: true,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    start_mark,
                    end_mark,
                });
            }
        }
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        let _ = first;
        if matches!(self.peek()?.data, TokenData::BlockEntry) {
            let tok = self.bump()?;
            if matches!(self.peek()?.data, TokenData::BlockEntry | TokenData::BlockEnd) {
                self.state = State::BlockSequenceEntry;
                return Ok(Event {
                    data: EventData::Scalar {
                        anchor: None,
                        tag: None,
                        value: String::new(),
                        plain_implicit: true,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    start_mark: tok.end_mark,
                    end_mark: tok.end_mark,
                });
            }
            self.push_state(State::BlockSequenceEntry);
            return self.parse_node(true, false);
        }
        let tok = self.bump_block_end()?;
        self.state = self.pop_state();
        Ok(Event { data: EventData::SequenceEnd, start_mark: tok.start_mark, end_mark: tok.end_mark })
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, ParserError> {
        if matches!(self.peek()?.data, TokenData::BlockEntry) {
            let tok = self.bump()?;
            if matches!(
                self.peek()?.data,
                TokenData::BlockEntry | TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = State::IndentlessSequenceEntry;
                return Ok(Event {
                    data: EventData::Scalar {
                        anchor: None,
                        tag: None,
                        value: String::new(),
                        plain_implicit: true,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    start_mark: tok.end_mark,
                    end_mark: tok.end_mark,
                });
            }
            self.push_state(State::IndentlessSequenceEntry);
            return self.parse_node(true, false);
        }
        let mark = self.peek()?.start_mark;
        self.state = self.pop_state();
        Ok(Event { data: EventData::SequenceEnd, start_mark: mark, end_mark: mark })
    }

    fn bump_block_end(&mut self) -> Result<Token, ParserError> {
        if matches!(self.peek()?.data, TokenData::BlockEnd) {
            self.bump()
        } else {
            let mark = self.peek()?.start_mark;
            Err(ParserError::Problem { problem: "expected BlockEnd".to_string(), mark })
        }
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        let _ = first;
        if matches!(self.peek()?.data, TokenData::Key) {
            let tok = self.bump()?;
            if matches!(self.peek()?.data, TokenData::Key | TokenData::Value | TokenData::BlockEnd) {
                self.state = State::BlockMappingValue;
                return Ok(Event {
                    data: EventData::Scalar {
                        anchor: None,
                        tag: None,
                        value: String::new(),
                        plain_implicit: true,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    start_mark: tok.end_mark,
                    end_mark: tok.end_mark,
                });
            }
            self.push_state(State::BlockMappingValue);
            return self.parse_node(true, true);
        }
        let tok = self.bump_block_end()?;
        self.state = self.pop_state();
        Ok(Event { data: EventData::MappingEnd, start_mark: tok.start_mark, end_mark: tok.end_mark })
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, ParserError> {
        if matches!(self.peek()?.data, TokenData::Value) {
            let tok = self.bump()?;
            if matches!(self.peek()?.data, TokenData::Key | TokenData::Value | TokenData::BlockEnd) {
                self.state = State::BlockMappingKey;
                return Ok(Event {
                    data: EventData::Scalar {
                        anchor: None,
                        tag: None,
                        value: String::new(),
                        plain_implicit: true,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    start_mark: tok.end_mark,
                    end_mark: tok.end_mark,
                });
            }
            self.push_state(State::BlockMappingKey);
            return self.parse_node(true, true);
        }
        let mark = self.peek()?.start_mark;
        self.state = State::BlockMappingKey;
        Ok(Event {
            data: EventData::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            },
            start_mark: mark,
            end_mark: mark,
        })
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if !first && matches!(self.peek()?.data, TokenData::FlowEntry) {
            self.bump()?;
        }
        if matches!(self.peek()?.data, TokenData::FlowSequenceEnd) {
            let tok = self.bump()?;
            self.state = self.pop_state();
            return Ok(Event { data: EventData::SequenceEnd, start_mark: tok.start_mark, end_mark: tok.end_mark });
        }
        if matches!(self.peek()?.data, TokenData::Key) {
            let tok = self.bump()?;
            self.push_state(State::FlowSequenceEntry);
            self.state = State::FlowSequenceEntryMappingKey;
            return Ok(Event {
                data: EventData::MappingStart { anchor: None, tag: None, implicit: true, style: CollectionStyle::Flow },
                start_mark: tok.start_mark,
                end_mark: tok.end_mark,
            });
        }
        self.push_state(State::FlowSequenceEntry);
        self.parse_node(false, false)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, ParserError> {
        if matches!(self.peek()?.data, TokenData::Value | TokenData::FlowEntry | TokenData::FlowSequenceEnd) {
            let mark = self.peek()?.start_mark;
            self.state = State::FlowSequenceEntryMappingValue;
            return Ok(Event {
                data: EventData::Scalar {
                    anchor: None,
                    tag: None,
                    value: String::new(),
                    plain_implicit: true,
                    quoted_implicit: false,
                    style: ScalarStyle::Plain,
                },
                start_mark: mark,
                end_mark: mark,
            });
        }
        self.push_state(State::FlowSequenceEntryMappingValue);
        self.parse_node(false, false)
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, ParserError> {
        if matches!(self.peek()?.data, TokenData::Value) {
            let tok = self.bump()?;
            if matches!(self.peek()?.data, TokenData::FlowEntry | TokenData::FlowSequenceEnd) {
                self.state = State::FlowSequenceEntryMappingEnd;
                return Ok(Event {
                    data: EventData::Scalar {
                        anchor: None,
                        tag: None,
                        value: String::new(),
                        plain_implicit: true,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    start_mark: tok.end_mark,
                    end_mark: tok.end_mark,
                });
            }
            self.push_state(State::FlowSequenceEntryMappingEnd);
            return self.parse_node(false, false);
        }
        let mark = self.peek()?.start_mark;
        self.state = State::FlowSequenceEntryMappingEnd;
        Ok(Event {
            data: EventData::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            },
            start_mark: mark,
            end_mark: mark,
        })
    }

    /// A `{a: b}` mapping shorthand written as one entry of a flow sequence
    /// (`[a: b, c]`) needs its synthetic `MappingStart` matched by a
    /// `MappingEnd` once the single key/value pair closes.
    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event, ParserError> {
        let mark = self.peek()?.start_mark;
        self.state = self.pop_state();
        Ok(Event { data: EventData::MappingEnd, start_mark: mark, end_mark: mark })
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if !first && matches!(self.peek()?.data, TokenData::FlowEntry) {
            self.bump()?;
        }
        if matches!(self.peek()?.data, TokenData::FlowMappingEnd) {
            let tok = self.bump()?;
            self.state = self.pop_state();
            return Ok(Event { data: EventData::MappingEnd, start_mark: tok.start_mark, end_mark: tok.end_mark });
        }
        if matches!(self.peek()?.data, TokenData::Key) {
            let tok = self.bump()?;
            if matches!(self.peek()?.data, TokenData::Value | TokenData::FlowEntry | TokenData::FlowMappingEnd) {
                self.state = State::FlowMappingValue;
                return Ok(Event {
                    data: EventData::Scalar {
                        anchor: None,
                        tag: None,
                        value: String::new(),
                        plain_implicit: true,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    start_mark: tok.end_mark,
                    end_mark: tok.end_mark,
                });
            }
            self.push_state(State::FlowMappingValue);
            return self.parse_node(false, false);
        }
        // implicit key with no leading '?'
        if matches!(self.peek()?.data, TokenData::Value | TokenData::FlowEntry | TokenData::FlowMappingEnd) {
            let mark = self.peek()?.start_mark;
            self.state = State::FlowMappingEmptyValue;
            return Ok(Event {
                data: EventData::Scalar {
                    anchor: None,
                    tag: None,
                    value: String::new(),
                    plain_implicit: true,
                    quoted_implicit: false,
                    style: ScalarStyle::Plain,
                },
                start_mark: mark,
                end_mark: mark,
            });
        }
        self.push_state(State::FlowMappingValue);
        self.parse_node(false, false)
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event, ParserError> {
        if empty {
            let mark = self.peek()?.start_mark;
            self.state = State::FlowMappingKey;
            return Ok(Event {
                data: EventData::Scalar {
                    anchor: None,
                    tag: None,
                    value: String::new(),
                    plain_implicit: true,
                    quoted_implicit: false,
                    style: ScalarStyle::Plain,
                },
                start_mark: mark,
                end_mark: mark,
            });
        }
        if matches!(self.peek()?.data, TokenData::Value) {
            let tok = self.bump()?;
            if matches!(self.peek()?.data, TokenData::FlowEntry | TokenData::FlowMappingEnd) {
                self.state = State::FlowMappingKey;
                return Ok(Event {
                    data: EventData::Scalar {
                        anchor: None,
                        tag: None,
                        value: String::new(),
                        plain_implicit: true,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    start_mark: tok.end_mark,
                    end_mark: tok.end_mark,
                });
            }
            self.push_state(State::FlowMappingKey);
            return self.parse_node(false, false);
        }
        let mark = self.peek()?.start_mark;
        self.state = State::FlowMappingKey;
        Ok(Event {
            data: EventData::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            },
            start_mark: mark,
            end_mark: mark,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    fn events(src: &str) -> Vec<EventData> {
        let reader = Reader::new(src.as_bytes()).unwrap();
        let scanner = Scanner::new(reader);
        let mut parser = Parser::new(scanner);
        parser.parse_all().unwrap().into_iter().map(|e| e.data).collect()
    }

    fn scalar(v: &str) -> EventData {
        EventData::Scalar {
            anchor: None,
            tag: None,
            value: v.to_string(),
            plain_implicit: true,
            quoted_implicit: false,
            style: ScalarStyle::Plain,
        }
    }

    #[test]
    fn parses_simple_flow_mapping() {
        let evs = events("{a: 1, b: 2}\n");
        assert!(matches!(evs[0], EventData::StreamStart));
        assert!(matches!(evs[1], EventData::DocumentStart { .. }));
        assert!(matches!(
            evs[2],
            EventData::MappingStart { style: CollectionStyle::Flow, .. }
        ));
        assert_eq!(evs[3], scalar("a"));
        assert_eq!(evs[4], scalar("1"));
        assert_eq!(evs[5], scalar("b"));
        assert_eq!(evs[6], scalar("2"));
        assert!(matches!(evs[7], EventData::MappingEnd));
    }

    #[test]
    fn parses_simple_flow_sequence() {
        let evs = events("[1, 2, 3]\n");
        assert!(matches!(
            evs[2],
            EventData::SequenceStart { style: CollectionStyle::Flow, .. }
        ));
        assert_eq!(evs[3], scalar("1"));
        assert_eq!(evs[4], scalar("2"));
        assert_eq!(evs[5], scalar("3"));
        assert!(matches!(evs[6], EventData::SequenceEnd));
    }

    #[test]
    fn parses_indentless_block_sequence_as_mapping_value() {
        let evs = events("key:\n- a\n- b\n");
        assert!(matches!(
            evs[2],
            EventData::MappingStart { style: CollectionStyle::Block, .. }
        ));
        assert_eq!(evs[3], scalar("key"));
        assert!(matches!(
            evs[4],
            EventData::SequenceStart { style: CollectionStyle::Block, .. }
        ));
        assert_eq!(evs[5], scalar("a"));
        assert_eq!(evs[6], scalar("b"));
        assert!(matches!(evs[7], EventData::SequenceEnd));
        assert!(matches!(evs[8], EventData::MappingEnd));
    }

    #[test]
    fn parses_explicit_document_markers_and_directive() {
        let evs = events("%YAML 1.1\n---\nhello\n...\n");
        match &evs[1] {
            EventData::DocumentStart { version, explicit, .. } => {
                assert_eq!(*version, Some((1, 1)));
                assert!(*explicit);
            }
            other => panic!("expected DocumentStart, got {other:?}"),
        }
        assert_eq!(evs[2], scalar("hello"));
        match &evs[3] {
            EventData::DocumentEnd { explicit } => assert!(*explicit),
            other => panic!("expected DocumentEnd, got {other:?}"),
        }
    }

    #[test]
    fn parses_flow_sequence_with_mapping_shorthand() {
        let evs = events("[a: 1, b]\n");
        assert!(matches!(
            evs[2],
            EventData::SequenceStart { style: CollectionStyle::Flow, .. }
        ));
        assert!(matches!(
            evs[3],
            EventData::MappingStart { style: CollectionStyle::Flow, .. }
        ));
        assert_eq!(evs[4], scalar("a"));
        assert_eq!(evs[5], scalar("1"));
        assert!(matches!(evs[6], EventData::MappingEnd));
        assert_eq!(evs[7], scalar("b"));
        assert!(matches!(evs[8], EventData::SequenceEnd));
    }
}
