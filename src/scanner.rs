//! Turns a character stream into a token stream.
//!
//! This is where indentation becomes structure: the scanner tracks an
//! indent stack and synthesizes `BlockSequenceStart`/`BlockMappingStart`/
//! `BlockEnd` tokens the input never spells out directly, and tracks
//! "possible simple keys" so a plain scalar already pushed onto the token
//! queue can retroactively become a mapping key once a `:` confirms it.
//! The algorithm follows `libyaml`'s scanner (indent stack, simple-key
//! table, `fetch_more_tokens`); the names and error plumbing follow this
//! crate's own idiom instead of the C original's.

use std::collections::VecDeque;

use crate::error::{Mark, ScannerError};
use crate::reader::Reader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenData {
    StreamStart,
    StreamEnd,
    VersionDirective { major: u32, minor: u32 },
    TagDirective { handle: String, prefix: String },
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    BlockEntry,
    FlowEntry,
    Key,
    Value,
    Alias(String),
    Anchor(String),
    Tag { handle: String, suffix: String },
    Scalar { value: String, style: ScalarStyle },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub data: TokenData,
    pub start_mark: Mark,
    pub end_mark: Mark,
}

#[derive(Debug, Clone, Copy)]
struct SimpleKey {
    token_number: usize,
    possible: bool,
    required: bool,
    mark: Mark,
}

impl SimpleKey {
    fn none() -> Self {
        Self {
            token_number: 0,
            possible: false,
            required: false,
            mark: Mark::default(),
        }
    }
}

pub struct Scanner {
    reader: Reader,
    tokens: VecDeque<Token>,
    tokens_taken: usize,
    indent: i64,
    indents: Vec<i64>,
    flow_level: u32,
    allow_simple_key: bool,
    simple_keys: Vec<SimpleKey>,
    stream_start_produced: bool,
    stream_end_produced: bool,
}

const MAX_SIMPLE_KEY_LENGTH: usize = 1024;

impl Scanner {
    pub fn new(reader: Reader) -> Self {
        Self {
            reader,
            tokens: VecDeque::new(),
            tokens_taken: 0,
            indent: -1,
            indents: Vec::new(),
            flow_level: 0,
            allow_simple_key: true,
            simple_keys: vec![SimpleKey::none()],
            stream_start_produced: false,
            stream_end_produced: false,
        }
    }

    /// Pulls the next token, scanning more input as needed.
    pub fn next_token(&mut self) -> Result<Option<Token>, ScannerError> {
        loop {
            if let Some(tok) = self.tokens.pop_front() {
                self.tokens_taken += 1;
                return Ok(Some(tok));
            }
            if self.stream_end_produced {
                return Ok(None);
            }
            self.fetch_more_tokens()?;
        }
    }

    fn current_token_number(&self) -> usize {
        self.tokens_taken + self.tokens.len()
    }

    fn push(&mut self, data: TokenData, start_mark: Mark, end_mark: Mark) {
        self.tokens.push_back(Token { data, start_mark, end_mark });
    }

    fn insert(&mut self, at: usize, data: TokenData, start_mark: Mark, end_mark: Mark) {
        let idx = at - self.tokens_taken;
        self.tokens.insert(idx, Token { data, start_mark, end_mark });
    }

    fn fetch_more_tokens(&mut self) -> Result<(), ScannerError> {
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }

        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        let indent_column = self.reader.mark().column as i64;
        self.unroll_indent(if self.flow_level > 0 { -1 } else { indent_column });

        if self.reader.eof() {
            return self.fetch_stream_end();
        }

        let mark = self.reader.mark();
        let c = self.reader.peek();
        let c1 = self.reader.peek_at(1);
        let c2 = self.reader.peek_at(2);
        let at_line_start = mark.column == 0;

        if mark.column == 0 && c == '%' {
            return self.fetch_directive();
        }
        if at_line_start && c == '-' && c1 == '-' && c2 == '-' && is_blank_or_eof(self.reader.peek_at(3)) {
            return self.fetch_document_indicator(TokenData::DocumentStart);
        }
        if at_line_start && c == '.' && c1 == '.' && c2 == '.' && is_blank_or_eof(self.reader.peek_at(3)) {
            return self.fetch_document_indicator(TokenData::DocumentEnd);
        }
        match c {
            '[' => self.fetch_flow_collection_start(TokenData::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenData::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenData::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenData::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if is_blank_or_eof(c1) => self.fetch_block_entry(),
            '?' if self.flow_level > 0 || is_blank_or_eof(c1) => self.fetch_key(),
            ':' if self.flow_level > 0 || is_blank_or_eof(c1) => self.fetch_value(),
            '*' => self.fetch_anchor_or_alias(true),
            '&' => self.fetch_anchor_or_alias(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(true),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(false),
            '\'' => self.fetch_flow_scalar(true),
            '"' => self.fetch_flow_scalar(false),
            _ if is_plain_scalar_start(c, c1, self.flow_level > 0) => self.fetch_plain_scalar(),
            _ => Err(ScannerError::Problem {
                problem: format!("found character {c:?} that cannot start any token"),
                mark,
            }),
        }
    }

    // ---- stream framing ------------------------------------------------

    fn fetch_stream_start(&mut self) {
        let mark = self.reader.mark();
        self.stream_start_produced = true;
        self.push(TokenData::StreamStart, mark, mark);
    }

    fn fetch_stream_end(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.allow_simple_key = false;
        let mark = self.reader.mark();
        self.stream_end_produced = true;
        self.push(TokenData::StreamEnd, mark, mark);
        Ok(())
    }

    // ---- indentation -----------------------------------------------------

    fn roll_indent(&mut self, column: i64, data: TokenData, mark: Mark) {
        if self.flow_level > 0 {
            return;
        }
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            self.push(data, mark, mark);
        }
    }

    fn unroll_indent(&mut self, column: i64) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.mark();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.push(TokenData::BlockEnd, mark, mark);
        }
    }

    // ---- simple keys -------------------------------------------------------

    fn save_simple_key(&mut self) -> Result<(), ScannerError> {
        let required = self.flow_level == 0 && self.indent == self.reader.mark().column as i64;
        if self.allow_simple_key {
            self.remove_simple_key()?;
            let key = SimpleKey {
                token_number: self.current_token_number(),
                possible: true,
                required,
                mark: self.reader.mark(),
            };
            *self.simple_keys.last_mut().unwrap() = key;
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), ScannerError> {
        let key = self.simple_keys.last_mut().unwrap();
        if key.possible && key.required {
            return Err(ScannerError::Problem {
                problem: "could not find expected ':'".to_string(),
                mark: key.mark,
            });
        }
        key.possible = false;
        Ok(())
    }

    /// Simple keys expire once the line they started on is behind us, or
    /// they grow past the length YAML allows for an implicit key.
    fn stale_simple_keys(&mut self) -> Result<(), ScannerError> {
        let current_line = self.reader.mark().line;
        let current_index = self.reader.mark().index;
        for key in &mut self.simple_keys {
            if key.possible
                && (key.mark.line != current_line
                    || current_index.saturating_sub(key.mark.index) as usize > MAX_SIMPLE_KEY_LENGTH)
            {
                if key.required {
                    return Err(ScannerError::Problem {
                        problem: "could not find expected ':'".to_string(),
                        mark: key.mark,
                    });
                }
                key.possible = false;
            }
        }
        Ok(())
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey::none());
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    // ---- whitespace / comments ------------------------------------------

    fn scan_to_next_token(&mut self) -> Result<(), ScannerError> {
        loop {
            while self.reader.peek() == ' '
                || (self.flow_level == 0 && self.allow_simple_key_blank())
            {
                if self.reader.peek() != ' ' {
                    break;
                }
                self.reader.forward();
            }
            if self.reader.peek() == '#' {
                while !is_break_or_eof(self.reader.peek()) {
                    self.reader.forward();
                }
            }
            if is_break(self.reader.peek()) {
                self.reader.forward();
                if self.flow_level == 0 {
                    self.allow_simple_key = true;
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn allow_simple_key_blank(&self) -> bool {
        false
    }

    // ---- directives ------------------------------------------------------

    fn fetch_directive(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.allow_simple_key = false;

        let start = self.reader.mark();
        self.reader.forward(); // '%'
        let name = self.scan_directive_name()?;
        match name.as_str() {
            "YAML" => {
                self.reader.forward();
                let (major, minor) = self.scan_version_number()?;
                let end = self.reader.mark();
                self.scan_directive_tail()?;
                self.push(TokenData::VersionDirective { major, minor }, start, end);
            }
            "TAG" => {
                self.reader.forward();
                let handle = self.scan_tag_handle()?;
                self.skip_blanks();
                let prefix = self.scan_tag_prefix()?;
                let end = self.reader.mark();
                self.scan_directive_tail()?;
                self.push(TokenData::TagDirective { handle, prefix }, start, end);
            }
            other => {
                return Err(ScannerError::Problem {
                    problem: format!("found unknown directive name {other:?}"),
                    mark: start,
                });
            }
        }
        Ok(())
    }

    fn scan_directive_name(&mut self) -> Result<String, ScannerError> {
        let mut name = String::new();
        while self.reader.peek().is_ascii_alphanumeric() || matches!(self.reader.peek(), '-' | '_') {
            name.push(self.reader.forward());
        }
        if name.is_empty() {
            return Err(ScannerError::Problem {
                problem: "expected a directive name".to_string(),
                mark: self.reader.mark(),
            });
        }
        Ok(name)
    }

    fn scan_version_number(&mut self) -> Result<(u32, u32), ScannerError> {
        let major = self.scan_version_digit()?;
        if self.reader.forward() != '.' {
            return Err(ScannerError::Problem {
                problem: "expected a digit or '.' in version directive".to_string(),
                mark: self.reader.mark(),
            });
        }
        let minor = self.scan_version_digit()?;
        Ok((major, minor))
    }

    fn scan_version_digit(&mut self) -> Result<u32, ScannerError> {
        let mut digits = String::new();
        while self.reader.peek().is_ascii_digit() {
            digits.push(self.reader.forward());
        }
        digits.parse().map_err(|_| ScannerError::Problem {
            problem: "expected a version number".to_string(),
            mark: self.reader.mark(),
        })
    }

    fn scan_directive_tail(&mut self) -> Result<(), ScannerError> {
        self.skip_blanks();
        if self.reader.peek() == '#' {
            while !is_break_or_eof(self.reader.peek()) {
                self.reader.forward();
            }
        }
        if !is_break_or_eof(self.reader.peek()) {
            return Err(ScannerError::Problem {
                problem: "expected a comment or line break after directive".to_string(),
                mark: self.reader.mark(),
            });
        }
        if is_break(self.reader.peek()) {
            self.reader.forward();
        }
        Ok(())
    }

    fn scan_tag_handle(&mut self) -> Result<String, ScannerError> {
        let mark = self.reader.mark();
        if self.reader.forward() != '!' {
            return Err(ScannerError::Problem {
                problem: "expected '!'".to_string(),
                mark,
            });
        }
        let mut handle = String::from("!");
        while self.reader.peek().is_ascii_alphanumeric() || matches!(self.reader.peek(), '-' | '_') {
            handle.push(self.reader.forward());
        }
        if self.reader.peek() == '!' {
            handle.push(self.reader.forward());
        }
        Ok(handle)
    }

    fn scan_tag_prefix(&mut self) -> Result<String, ScannerError> {
        let mut prefix = String::new();
        while !is_blank_or_break_or_eof(self.reader.peek()) {
            prefix.push(self.reader.forward());
        }
        if prefix.is_empty() {
            return Err(ScannerError::Problem {
                problem: "expected a tag prefix".to_string(),
                mark: self.reader.mark(),
            });
        }
        Ok(prefix)
    }

    fn skip_blanks(&mut self) {
        while self.reader.peek() == ' ' || self.reader.peek() == '\t' {
            self.reader.forward();
        }
    }

    // ---- document markers --------------------------------------------------

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.allow_simple_key = false;
        let start = self.reader.mark();
        self.reader.forward_n(3);
        let end = self.reader.mark();
        self.push(data, start, end);
        Ok(())
    }

    // ---- flow collections --------------------------------------------------

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.increase_flow_level();
        self.allow_simple_key = true;
        let start = self.reader.mark();
        self.reader.forward();
        let end = self.reader.mark();
        self.push(data, start, end);
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.allow_simple_key = false;
        let start = self.reader.mark();
        self.reader.forward();
        let end = self.reader.mark();
        self.push(data, start, end);
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.allow_simple_key = true;
        let start = self.reader.mark();
        self.reader.forward();
        let end = self.reader.mark();
        self.push(TokenData::FlowEntry, start, end);
        Ok(())
    }

    // ---- block indicators ---------------------------------------------------

    fn fetch_block_entry(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(ScannerError::Problem {
                    problem: "block sequence entries are not allowed in this context".to_string(),
                    mark: self.reader.mark(),
                });
            }
            let column = self.reader.mark().column as i64;
            let mark = self.reader.mark();
            self.roll_indent(column, TokenData::BlockSequenceStart, mark);
        }
        self.remove_simple_key()?;
        self.allow_simple_key = true;
        let start = self.reader.mark();
        self.reader.forward();
        let end = self.reader.mark();
        self.push(TokenData::BlockEntry, start, end);
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(ScannerError::Problem {
                    problem: "mapping keys are not allowed in this context".to_string(),
                    mark: self.reader.mark(),
                });
            }
            let column = self.reader.mark().column as i64;
            let mark = self.reader.mark();
            self.roll_indent(column, TokenData::BlockMappingStart, mark);
        }
        self.remove_simple_key()?;
        self.allow_simple_key = self.flow_level == 0;
        let start = self.reader.mark();
        self.reader.forward();
        let end = self.reader.mark();
        self.push(TokenData::Key, start, end);
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), ScannerError> {
        let key_index = self.flow_level as usize;
        let candidate = self.simple_keys[key_index];
        if candidate.possible {
            self.simple_keys[key_index].possible = false;
            let mark = candidate.mark;
            self.insert(candidate.token_number, TokenData::Key, mark, mark);
            if self.flow_level == 0 {
                let column = mark.column as i64;
                // The Key token above was inserted before the scalar; the
                // BlockMappingStart (if any) must precede it, so roll indent
                // against the key's own column rather than the current one.
                if self.indent < column {
                    self.indents.push(self.indent);
                    self.indent = column;
                    self.insert(candidate.token_number, TokenData::BlockMappingStart, mark, mark);
                }
            }
            self.allow_simple_key = false;
        } else {
            if self.flow_level == 0 {
                if !self.allow_simple_key {
                    return Err(ScannerError::Problem {
                        problem: "mapping values are not allowed in this context".to_string(),
                        mark: self.reader.mark(),
                    });
                }
                let column = self.reader.mark().column as i64;
                let mark = self.reader.mark();
                self.roll_indent(column, TokenData::BlockMappingStart, mark);
            }
            self.allow_simple_key = self.flow_level == 0;
        }
        let start = self.reader.mark();
        self.reader.forward();
        let end = self.reader.mark();
        self.push(TokenData::Value, start, end);
        Ok(())
    }

    // ---- anchors, aliases, tags ---------------------------------------------

    fn fetch_anchor_or_alias(&mut self, is_alias: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.allow_simple_key = false;
        let start = self.reader.mark();
        self.reader.forward();
        let mut name = String::new();
        while is_anchor_char(self.reader.peek()) {
            name.push(self.reader.forward());
        }
        if name.is_empty() {
            return Err(ScannerError::Problem {
                problem: "expected an anchor/alias name".to_string(),
                mark: self.reader.mark(),
            });
        }
        let end = self.reader.mark();
        self.push(
            if is_alias { TokenData::Alias(name) } else { TokenData::Anchor(name) },
            start,
            end,
        );
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.allow_simple_key = false;
        let start = self.reader.mark();
        self.reader.forward(); // '!'

        if self.reader.peek() == '<' {
            self.reader.forward();
            let mut suffix = String::new();
            while self.reader.peek() != '>' && !is_blank_or_break_or_eof(self.reader.peek()) {
                suffix.push(self.scan_uri_char()?);
            }
            if self.reader.forward() != '>' {
                return Err(ScannerError::Problem {
                    problem: "expected '>'".to_string(),
                    mark: self.reader.mark(),
                });
            }
            let end = self.reader.mark();
            self.push(TokenData::Tag { handle: String::new(), suffix }, start, end);
            return Ok(());
        }

        let mut handle = String::from("!");
        let mut suffix = String::new();
        if self.reader.peek() == '!' {
            handle.push(self.reader.forward());
        } else {
            let mut saw_bang = false;
            let mut lookahead = String::new();
            let mut i = 0;
            loop {
                let c = self.reader.peek_at(i);
                if c == '!' {
                    saw_bang = true;
                    break;
                }
                if is_blank_or_break_or_eof(c) || matches!(c, ',' | '[' | ']' | '{' | '}') {
                    break;
                }
                lookahead.push(c);
                i += 1;
            }
            if saw_bang {
                for _ in 0..=i {
                    handle.push(self.reader.forward());
                }
            }
        }
        while !is_blank_or_break_or_eof(self.reader.peek())
            && !matches!(self.reader.peek(), ',' | '[' | ']' | '{' | '}')
        {
            suffix.push(self.scan_uri_char()?);
        }
        let end = self.reader.mark();
        let handle = if handle == "!" { String::new() } else { handle };
        let suffix = if handle.is_empty() && suffix.is_empty() { "!".to_string() } else { suffix };
        self.push(TokenData::Tag { handle, suffix }, start, end);
        Ok(())
    }

    fn scan_uri_char(&mut self) -> Result<char, ScannerError> {
        if self.reader.peek() == '%' {
            self.reader.forward();
            let mut hex = String::new();
            for _ in 0..2 {
                hex.push(self.reader.forward());
            }
            let byte = u8::from_str_radix(&hex, 16).map_err(|_| ScannerError::Problem {
                problem: "expected a hex escape in tag/URI".to_string(),
                mark: self.reader.mark(),
            })?;
            Ok(byte as char)
        } else {
            Ok(self.reader.forward())
        }
    }

    // ---- block scalars (| and >) --------------------------------------------

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.allow_simple_key = true;
        let start = self.reader.mark();
        self.reader.forward();

        let mut chomping: Option<char> = None;
        let mut explicit_indent: Option<i64> = None;
        for _ in 0..2 {
            match self.reader.peek() {
                '+' | '-' => {
                    chomping = Some(self.reader.forward());
                }
                c if c.is_ascii_digit() && c != '0' => {
                    explicit_indent = Some((self.reader.forward() as i64) - ('0' as i64));
                }
                _ => break,
            }
        }
        self.skip_blanks();
        if self.reader.peek() == '#' {
            while !is_break_or_eof(self.reader.peek()) {
                self.reader.forward();
            }
        }
        if !is_break_or_eof(self.reader.peek()) {
            return Err(ScannerError::Problem {
                problem: "expected a comment or line break after block scalar header".to_string(),
                mark: self.reader.mark(),
            });
        }
        if is_break(self.reader.peek()) {
            self.reader.forward();
        }

        let parent_indent = if self.indent >= 0 { self.indent } else { 0 };
        let mut block_indent: Option<i64> = explicit_indent.map(|i| parent_indent + i);

        let mut lines: Vec<String> = Vec::new();
        let mut trailing_blanks = 0usize;
        let mut max_blank_indent = 0i64;

        loop {
            // measure indentation of this line
            let mut column = 0i64;
            while self.reader.peek() == ' ' {
                self.reader.forward();
                column += 1;
            }
            if block_indent.is_none() && !is_break_or_eof(self.reader.peek()) {
                block_indent = Some(column.max(parent_indent + 1));
            }
            let indent = block_indent.unwrap_or(parent_indent + 1);

            if is_break_or_eof(self.reader.peek()) && self.reader.eof() {
                break;
            }
            if is_break(self.reader.peek()) {
                if column < indent {
                    max_blank_indent = max_blank_indent.max(column);
                    lines.push(String::new());
                    self.reader.forward();
                    trailing_blanks += 1;
                    continue;
                }
            }
            if column < indent {
                break;
            }
            let mut line = String::new();
            while !is_break_or_eof(self.reader.peek()) {
                line.push(self.reader.forward());
            }
            lines.push(line);
            trailing_blanks = 0;
            if is_break(self.reader.peek()) {
                self.reader.forward();
            } else {
                break;
            }
        }
        let _ = max_blank_indent;
        let _ = trailing_blanks;

        let value = fold_block_scalar(&lines, literal, chomping);
        let end = self.reader.mark();
        let style = if literal { ScalarStyle::Literal } else { ScalarStyle::Folded };
        self.push(TokenData::Scalar { value, style }, start, end);
        Ok(())
    }

    // ---- quoted scalars ------------------------------------------------------

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.allow_simple_key = false;
        let start = self.reader.mark();
        let quote = self.reader.forward();
        let mut value = String::new();
        loop {
            if self.reader.eof() {
                return Err(ScannerError::Problem {
                    problem: "unexpected end of stream in quoted scalar".to_string(),
                    mark: self.reader.mark(),
                });
            }
            let c = self.reader.peek();
            if c == quote {
                if single && self.reader.peek_at(1) == '\'' {
                    value.push('\'');
                    self.reader.forward_n(2);
                    continue;
                }
                self.reader.forward();
                break;
            }
            if !single && c == '\\' {
                if is_break(self.reader.peek_at(1)) {
                    self.reader.forward_n(2);
                    self.skip_line_folding(&mut value)?;
                    continue;
                }
                self.reader.forward();
                value.push(self.scan_double_escape()?);
                continue;
            }
            if is_break(c) {
                self.reader.forward();
                self.skip_line_folding(&mut value)?;
                continue;
            }
            value.push(self.reader.forward());
        }
        let end = self.reader.mark();
        let style = if single { ScalarStyle::SingleQuoted } else { ScalarStyle::DoubleQuoted };
        self.push(TokenData::Scalar { value, style }, start, end);
        Ok(())
    }

    /// Folds a line break found inside a quoted or plain scalar: a single
    /// break becomes a space, consecutive breaks each become `\n`, and
    /// leading indentation on the continuation is stripped.
    fn skip_line_folding(&mut self, value: &mut String) -> Result<(), ScannerError> {
        let mut breaks = 1;
        loop {
            while self.reader.peek() == ' ' || self.reader.peek() == '\t' {
                self.reader.forward();
            }
            if is_break(self.reader.peek()) {
                self.reader.forward();
                breaks += 1;
            } else {
                break;
            }
        }
        if breaks == 1 {
            value.push(' ');
        } else {
            for _ in 0..breaks - 1 {
                value.push('\n');
            }
        }
        Ok(())
    }

    fn scan_double_escape(&mut self) -> Result<char, ScannerError> {
        let c = self.reader.forward();
        let simple = match c {
            '0' => Some('\0'),
            'a' => Some('\u{7}'),
            'b' => Some('\u{8}'),
            't' | '\t' => Some('\t'),
            'n' => Some('\n'),
            'v' => Some('\u{B}'),
            'f' => Some('\u{C}'),
            'r' => Some('\r'),
            'e' => Some('\u{1B}'),
            ' ' => Some(' '),
            '"' => Some('"'),
            '\\' => Some('\\'),
            'N' => Some('\u{85}'),
            '_' => Some('\u{A0}'),
            'L' => Some('\u{2028}'),
            'P' => Some('\u{2029}'),
            _ => None,
        };
        if let Some(c) = simple {
            return Ok(c);
        }
        let width = match c {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ => {
                return Err(ScannerError::Problem {
                    problem: format!("found unknown escape character {c:?}"),
                    mark: self.reader.mark(),
                })
            }
        };
        let mut hex = String::new();
        for _ in 0..width {
            hex.push(self.reader.forward());
        }
        let code = u32::from_str_radix(&hex, 16).map_err(|_| ScannerError::Problem {
            problem: "expected a hex escape sequence".to_string(),
            mark: self.reader.mark(),
        })?;
        char::from_u32(code).ok_or_else(|| ScannerError::Problem {
            problem: "invalid unicode scalar value in escape".to_string(),
            mark: self.reader.mark(),
        })
    }

    // ---- plain scalars ---------------------------------------------------------

    fn fetch_plain_scalar(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.allow_simple_key = false;
        let start = self.reader.mark();
        let indent = self.indent + 1;
        let mut value = String::new();
        let mut trailing_spaces = String::new();

        loop {
            if self.reader.peek() == '#' && trailing_spaces.is_empty() && !value.is_empty() {
                // only a comment if preceded by whitespace; our caller already
                // consumed leading blanks into trailing_spaces in that case
            }
            if is_break_or_eof(self.reader.peek()) {
                if self.reader.eof() {
                    break;
                }
                let save_col = self.reader.mark().column as i64;
                self.reader.forward();
                if self.flow_level == 0 {
                    self.allow_simple_key = true;
                }
                let _ = save_col;
                let mut blank_lines = 1;
                let mut next_indent = 0i64;
                loop {
                    while self.reader.peek() == ' ' {
                        self.reader.forward();
                        next_indent += 1;
                    }
                    if is_break(self.reader.peek()) {
                        self.reader.forward();
                        blank_lines += 1;
                        next_indent = 0;
                    } else {
                        break;
                    }
                }
                if next_indent < indent && self.flow_level == 0 {
                    break;
                }
                if self.reader.peek() == '-' && self.flow_level == 0 && is_blank_or_eof(self.reader.peek_at(1)) {
                    break;
                }
                if (self.reader.peek() == ':' && (self.flow_level > 0 || is_blank_or_eof(self.reader.peek_at(1))))
                    || (self.flow_level > 0 && matches!(self.reader.peek(), ',' | '[' | ']' | '{' | '}'))
                {
                    break;
                }
                if blank_lines == 1 {
                    value.push(' ');
                } else {
                    for _ in 0..blank_lines - 1 {
                        value.push('\n');
                    }
                }
                continue;
            }

            let c = self.reader.peek();
            if self.flow_level > 0 && matches!(c, ',' | '[' | ']' | '{' | '}') {
                break;
            }
            if c == ':' && (self.flow_level > 0 || is_blank_or_eof(self.reader.peek_at(1))) {
                break;
            }
            if c == '#' && matches!(self.reader.peek_at(0), '#') && value.ends_with(' ') {
                break;
            }
            if c == ' ' {
                let mut spaces = String::new();
                while self.reader.peek() == ' ' {
                    spaces.push(self.reader.forward());
                }
                if is_break_or_eof(self.reader.peek()) {
                    continue;
                }
                if self.reader.peek() == '#' {
                    break;
                }
                value.push_str(&spaces);
                continue;
            }
            value.push(self.reader.forward());
        }
        let _ = trailing_spaces;
        let end = self.reader.mark();
        self.push(
            TokenData::Scalar { value, style: ScalarStyle::Plain },
            start,
            end,
        );
        Ok(())
    }
}

fn fold_block_scalar(lines: &[String], literal: bool, chomping: Option<char>) -> String {
    let mut body = String::new();
    if literal {
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                body.push('\n');
            }
            body.push_str(line);
        }
    } else {
        let mut prev_empty = true;
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                if line.is_empty() || prev_empty {
                    body.push('\n');
                } else {
                    body.push(' ');
                }
            }
            body.push_str(line);
            prev_empty = line.is_empty();
        }
    }
    match chomping {
        Some('-') => body.trim_end_matches('\n').to_string(),
        Some('+') => {
            let mut s = body;
            s.push('\n');
            s
        }
        _ => {
            let trimmed = body.trim_end_matches('\n');
            if trimmed.is_empty() {
                String::new()
            } else {
                format!("{trimmed}\n")
            }
        }
    }
}

fn is_break(c: char) -> bool {
    c == '\n'
}

fn is_break_or_eof(c: char) -> bool {
    c == '\n' || c == '\0'
}

fn is_blank_or_eof(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\n' || c == '\0'
}

fn is_blank_or_break_or_eof(c: char) -> bool {
    is_blank_or_eof(c)
}

fn is_anchor_char(c: char) -> bool {
    !is_blank_or_break_or_eof(c) && !matches!(c, ',' | '[' | ']' | '{' | '}')
}

fn is_plain_scalar_start(c: char, c1: char, in_flow: bool) -> bool {
    if is_blank_or_break_or_eof(c) {
        return false;
    }
    match c {
        '-' | '?' | ':' => !is_blank_or_eof(c1) || in_flow,
        ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`' => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(src: &str) -> Vec<TokenData> {
        let reader = Reader::new(src.as_bytes()).unwrap();
        let mut scanner = Scanner::new(reader);
        let mut out = Vec::new();
        while let Some(tok) = scanner.next_token().unwrap() {
            out.push(tok.data);
        }
        out
    }

    #[test]
    fn scans_plain_scalar() {
        let toks = tokens("hello\n");
        assert!(toks.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, style: ScalarStyle::Plain } if value == "hello"
        )));
    }

    #[test]
    fn scans_simple_block_mapping() {
        let toks = tokens("a: 1\nb: 2\n");
        assert!(toks.contains(&TokenData::BlockMappingStart));
        assert!(toks.contains(&TokenData::Key));
        assert!(toks.contains(&TokenData::Value));
        assert!(toks.contains(&TokenData::BlockEnd));
    }

    #[test]
    fn scans_flow_sequence() {
        let toks = tokens("[1, 2, 3]\n");
        assert!(toks.contains(&TokenData::FlowSequenceStart));
        assert!(toks.contains(&TokenData::FlowEntry));
        assert!(toks.contains(&TokenData::FlowSequenceEnd));
    }

    #[test]
    fn scans_block_sequence() {
        let toks = tokens("- 1\n- 2\n");
        assert!(toks.contains(&TokenData::BlockSequenceStart));
        assert_eq!(toks.iter().filter(|t| matches!(t, TokenData::BlockEntry)).count(), 2);
    }

    #[test]
    fn scans_double_quoted_escapes() {
        let toks = tokens("\"a\\nb\"\n");
        assert!(toks.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, style: ScalarStyle::DoubleQuoted } if value == "a\nb"
        )));
    }

    #[test]
    fn scans_single_quoted_doubled_quote() {
        let toks = tokens("'it''s'\n");
        assert!(toks.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, style: ScalarStyle::SingleQuoted } if value == "it's"
        )));
    }

    #[test]
    fn scans_anchor_and_alias() {
        let toks = tokens("a: &x 1\nb: *x\n");
        assert!(toks.iter().any(|t| matches!(t, TokenData::Anchor(n) if n == "x")));
        assert!(toks.iter().any(|t| matches!(t, TokenData::Alias(n) if n == "x")));
    }

    #[test]
    fn scans_literal_block_scalar_preserving_newlines() {
        let toks = tokens("a: |\n  line1\n  line2\n");
        assert!(toks.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, style: ScalarStyle::Literal } if value == "line1\nline2\n"
        )));
    }

    #[test]
    fn scans_version_directive() {
        let toks = tokens("%YAML 1.1\n---\nfoo\n");
        assert!(toks.contains(&TokenData::VersionDirective { major: 1, minor: 1 }));
        assert!(toks.contains(&TokenData::DocumentStart));
    }
}
