//! Tag + raw value → typed [`NodeValue`].
//!
//! Three registries (scalar/sequence/mapping), keyed by tag string, mirror
//! the teacher's tag-dispatch `SimpleConstructor::construct_scalar` — but
//! where the teacher only ever produced a handful of Python primitives, the
//! default registrations here cover every scalar and collection tag
//! `spec.md` §4.6 lists, including the ordered-map/pairs/set family that the
//! teacher's constructor never attempted.

use std::collections::HashMap;

use base64::Engine as _;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::error::{ConstructorError, Mark};
use crate::node::{Node, NodeValue, UserValue};

type ScalarCtor = Box<dyn Fn(&str, Mark, Mark) -> Result<NodeValue, ConstructorError>>;
type SequenceCtor = Box<dyn Fn(Vec<Node>, Mark, Mark) -> Result<NodeValue, ConstructorError>>;
type MappingCtor = Box<dyn Fn(Vec<(Node, Node)>, Mark, Mark) -> Result<NodeValue, ConstructorError>>;

pub struct Constructor {
    scalar: HashMap<String, ScalarCtor>,
    sequence: HashMap<String, SequenceCtor>,
    mapping: HashMap<String, MappingCtor>,
}

impl Default for Constructor {
    fn default() -> Self {
        let mut c = Self {
            scalar: HashMap::new(),
            sequence: HashMap::new(),
            mapping: HashMap::new(),
        };
        c.install_defaults();
        c
    }
}

impl Constructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom scalar constructor for a tag, overriding any
    /// default registration. A tag names one function across all three
    /// kinds — registering it here while it's already claimed by the
    /// sequence or mapping registry is a caller bug, not a document error,
    /// so it panics rather than returning a `Result`.
    pub fn add_scalar_constructor(
        &mut self,
        tag: impl Into<String>,
        ctor: impl Fn(&str, Mark, Mark) -> Result<NodeValue, ConstructorError> + 'static,
    ) {
        let tag = tag.into();
        self.assert_tag_unclaimed(&tag, self.sequence.contains_key(&tag) || self.mapping.contains_key(&tag));
        self.scalar.insert(tag, Box::new(ctor));
    }

    pub fn add_sequence_constructor(
        &mut self,
        tag: impl Into<String>,
        ctor: impl Fn(Vec<Node>, Mark, Mark) -> Result<NodeValue, ConstructorError> + 'static,
    ) {
        let tag = tag.into();
        self.assert_tag_unclaimed(&tag, self.scalar.contains_key(&tag) || self.mapping.contains_key(&tag));
        self.sequence.insert(tag, Box::new(ctor));
    }

    pub fn add_mapping_constructor(
        &mut self,
        tag: impl Into<String>,
        ctor: impl Fn(Vec<(Node, Node)>, Mark, Mark) -> Result<NodeValue, ConstructorError> + 'static,
    ) {
        let tag = tag.into();
        self.assert_tag_unclaimed(&tag, self.scalar.contains_key(&tag) || self.sequence.contains_key(&tag));
        self.mapping.insert(tag, Box::new(ctor));
    }

    fn assert_tag_unclaimed(&self, tag: &str, claimed_by_other_kind: bool) {
        if claimed_by_other_kind {
            panic!("tag {tag:?} is already registered to a constructor of a different kind — only one function per tag is allowed across scalar/sequence/mapping");
        }
    }

    pub fn construct_scalar(&self, tag: &str, value: &str, start: Mark, end: Mark) -> Result<NodeValue, ConstructorError> {
        match self.scalar.get(tag) {
            Some(ctor) => ctor(value, start, end),
            None => Ok(NodeValue::User(UserValue::Scalar(value.to_string()))),
        }
    }

    pub fn construct_sequence(&self, tag: &str, items: Vec<Node>, start: Mark, end: Mark) -> Result<NodeValue, ConstructorError> {
        match self.sequence.get(tag) {
            Some(ctor) => ctor(items, start, end),
            None => Ok(NodeValue::User(UserValue::Sequence(items))),
        }
    }

    pub fn construct_mapping(&self, tag: &str, pairs: Vec<(Node, Node)>, start: Mark, end: Mark) -> Result<NodeValue, ConstructorError> {
        match self.mapping.get(tag) {
            Some(ctor) => ctor(pairs, start, end),
            None => Ok(NodeValue::User(UserValue::Mapping(pairs))),
        }
    }

    fn install_defaults(&mut self) {
        self.add_scalar_constructor("tag:yaml.org,2002:null", |value, start, _| {
            match value {
                "" | "~" | "null" | "Null" | "NULL" => Ok(NodeValue::Null),
                other => Err(ConstructorError::Problem {
                    problem: format!("invalid null value {other:?}"),
                    mark: start,
                }),
            }
        });

        self.add_scalar_constructor("tag:yaml.org,2002:bool", |value, start, _| {
            match value.to_ascii_lowercase().as_str() {
                "yes" | "true" | "on" => Ok(NodeValue::Bool(true)),
                "no" | "false" | "off" => Ok(NodeValue::Bool(false)),
                _ => Err(ConstructorError::Problem {
                    problem: format!("invalid bool value {value:?}"),
                    mark: start,
                }),
            }
        });

        self.add_scalar_constructor("tag:yaml.org,2002:int", |value, start, _| {
            construct_int(value).ok_or_else(|| ConstructorError::Problem {
                problem: format!("invalid int value {value:?}"),
                mark: start,
            })
        });

        self.add_scalar_constructor("tag:yaml.org,2002:float", |value, start, _| {
            construct_float(value).ok_or_else(|| ConstructorError::Problem {
                problem: format!("invalid float value {value:?}"),
                mark: start,
            })
        });

        self.add_scalar_constructor("tag:yaml.org,2002:str", |value, _, _| {
            Ok(NodeValue::Str(value.to_string()))
        });
        self.add_scalar_constructor("tag:yaml.org,2002:value", |value, _, _| {
            Ok(NodeValue::Str(value.to_string()))
        });
        self.add_scalar_constructor("tag:yaml.org,2002:merge", |value, _, _| {
            Ok(NodeValue::Str(value.to_string()))
        });

        self.add_scalar_constructor("tag:yaml.org,2002:binary", |value, start, _| {
            let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(&cleaned)
                .map(NodeValue::Binary)
                .map_err(|e| ConstructorError::Problem {
                    problem: format!("invalid base64 data: {e}"),
                    mark: start,
                })
        });

        self.add_scalar_constructor("tag:yaml.org,2002:timestamp", |value, start, _| {
            construct_timestamp(value).ok_or_else(|| ConstructorError::Problem {
                problem: format!("invalid timestamp {value:?}"),
                mark: start,
            })
        });

        self.add_sequence_constructor("tag:yaml.org,2002:seq", |items, _, _| Ok(NodeValue::Sequence(items)));

        self.add_mapping_constructor("tag:yaml.org,2002:map", |pairs, start, _| {
            check_unique_keys(&pairs, start)?;
            Ok(NodeValue::Mapping(pairs))
        });

        self.add_sequence_constructor("tag:yaml.org,2002:omap", |items, start, _| {
            let pairs = single_pair_sequence_to_pairs(items, start)?;
            check_unique_keys(&pairs, start)?;
            Ok(NodeValue::Mapping(pairs))
        });

        self.add_sequence_constructor("tag:yaml.org,2002:pairs", |items, start, _| {
            let pairs = single_pair_sequence_to_pairs(items, start)?;
            Ok(NodeValue::Pairs(pairs))
        });

        self.add_mapping_constructor("tag:yaml.org,2002:set", |pairs, start, _| {
            check_unique_keys(&pairs, start)?;
            let keys = pairs.into_iter().map(|(k, _)| k).collect();
            Ok(NodeValue::Sequence(keys))
        });
    }
}

fn construct_int(value: &str) -> Option<NodeValue> {
    let trimmed = value.replace('_', "");
    let (sign, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, trimmed.strip_prefix('+').unwrap_or(&trimmed)),
    };
    let parsed = if let Some(rest) = body.strip_prefix("0b") {
        i64::from_str_radix(rest, 2).ok()
    } else if let Some(rest) = body.strip_prefix("0x") {
        i64::from_str_radix(rest, 16).ok()
    } else if body.len() > 1 && body.starts_with('0') && !body.contains(':') {
        i64::from_str_radix(&body[1..], 8).ok()
    } else if body.contains(':') {
        let mut acc: i64 = 0;
        for part in body.split(':') {
            let digit: i64 = part.parse().ok()?;
            acc = acc.checked_mul(60)?.checked_add(digit)?;
        }
        Some(acc)
    } else {
        body.parse::<i64>().ok()
    }?;
    Some(NodeValue::Int(sign * parsed))
}

fn construct_float(value: &str) -> Option<NodeValue> {
    let trimmed = value.replace('_', "");
    let lower = trimmed.to_ascii_lowercase();
    let f = match lower.as_str() {
        ".inf" | "+.inf" => f64::INFINITY,
        "-.inf" => f64::NEG_INFINITY,
        ".nan" => f64::NAN,
        _ if lower.contains(':') => {
            let (sign, body) = match lower.strip_prefix('-') {
                Some(rest) => (-1.0, rest),
                None => (1.0, lower.strip_prefix('+').unwrap_or(&lower)),
            };
            let mut acc = 0.0;
            for part in body.split(':') {
                let digit: f64 = part.parse().ok()?;
                acc = acc * 60.0 + digit;
            }
            sign * acc
        }
        _ => trimmed.parse::<f64>().ok()?,
    };
    Some(NodeValue::Float(f))
}

fn construct_timestamp(value: &str) -> Option<NodeValue> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let dt = date.and_hms_opt(0, 0, 0)?;
        return Some(NodeValue::Timestamp(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).fixed_offset()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(NodeValue::Timestamp(dt));
    }
    // YAML 1.1 canonical form: "2001-12-14t21:59:43.10-05:00" and the
    // space-separated variant libyaml also accepts, with 1-2 digit offset
    // hours and an optional lone-hour (no minutes) offset.
    let normalized = normalize_timestamp(trimmed);
    DateTime::parse_from_rfc3339(&normalized)
        .ok()
        .map(NodeValue::Timestamp)
}

/// Rewrites the looser YAML 1.1 timestamp grammar into RFC 3339: swaps a
/// space date/time separator for `T`, pads a bare `-5` offset to `-05:00`,
/// and defaults to UTC when no timezone is present at all.
fn normalize_timestamp(value: &str) -> String {
    let mut s = value.to_string();
    if let Some(sep) = s.find(|c: char| c == ' ' || c == 't') {
        if s.as_bytes()[sep] != b'T' {
            s.replace_range(sep..sep + 1, "T");
        }
    }
    if !s.contains('Z') && !s.contains('z') {
        if let Some(pos) = s.rfind(['+', '-']) {
            // only treat as an offset if it's after the time portion
            if pos > 10 {
                let offset = &s[pos + 1..];
                let digits_only: String = offset.chars().filter(|c| *c != ':').collect();
                let sign = s.as_bytes()[pos] as char;
                let padded = match digits_only.len() {
                    1 | 2 => format!("{sign}{digits_only:0>2}:00"),
                    3 => format!("{sign}0{}:{}", &digits_only[..1], &digits_only[1..]),
                    4 => format!("{sign}{}:{}", &digits_only[..2], &digits_only[2..]),
                    _ => return format!("{s}"),
                };
                s.replace_range(pos.., &padded);
                return s;
            }
        }
        s.push('Z');
    }
    s
}

fn single_pair_sequence_to_pairs(items: Vec<Node>, start: Mark) -> Result<Vec<(Node, Node)>, ConstructorError> {
    let mut pairs = Vec::with_capacity(items.len());
    for item in items {
        match item.value {
            NodeValue::Mapping(mut p) if p.len() == 1 => pairs.push(p.remove(0)),
            _ => {
                return Err(ConstructorError::Problem {
                    problem: "expected a sequence of single-pair mappings".to_string(),
                    mark: start,
                })
            }
        }
    }
    Ok(pairs)
}

fn check_unique_keys(pairs: &[(Node, Node)], mark: Mark) -> Result<(), ConstructorError> {
    for i in 0..pairs.len() {
        for j in (i + 1)..pairs.len() {
            if pairs[i].0.value == pairs[j].0.value {
                return Err(ConstructorError::Problem {
                    problem: format!("found duplicate key {:?}", pairs[i].0),
                    mark,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark() -> Mark {
        Mark::new(0, 0, 0)
    }

    #[test]
    fn constructs_plain_int() {
        let c = Constructor::new();
        let v = c.construct_scalar("tag:yaml.org,2002:int", "42", mark(), mark()).unwrap();
        assert!(matches!(v, NodeValue::Int(42)));
    }

    #[test]
    fn constructs_sexagesimal_and_binary_and_hex_int() {
        let c = Constructor::new();
        assert!(matches!(
            c.construct_scalar("tag:yaml.org,2002:int", "685_230", mark(), mark()).unwrap(),
            NodeValue::Int(685230)
        ));
        assert!(matches!(
            c.construct_scalar("tag:yaml.org,2002:int", "1:12:30", mark(), mark()).unwrap(),
            NodeValue::Int(4350)
        ));
        assert!(matches!(
            c.construct_scalar("tag:yaml.org,2002:int", "0x1A", mark(), mark()).unwrap(),
            NodeValue::Int(26)
        ));
    }

    #[test]
    fn rejects_duplicate_keys_in_map() {
        let c = Constructor::new();
        let key = Node::scalar("tag:yaml.org,2002:str", NodeValue::Str("a".into()), mark(), mark());
        let pairs = vec![
            (key.clone(), Node::scalar("tag:yaml.org,2002:int", NodeValue::Int(1), mark(), mark())),
            (key, Node::scalar("tag:yaml.org,2002:int", NodeValue::Int(2), mark(), mark())),
        ];
        let err = c.construct_mapping("tag:yaml.org,2002:map", pairs, mark(), mark()).unwrap_err();
        assert!(matches!(err, ConstructorError::Problem { .. }));
    }

    #[test]
    fn constructs_timestamp_with_fractional_seconds_and_zulu() {
        let c = Constructor::new();
        let v = c
            .construct_scalar("tag:yaml.org,2002:timestamp", "2001-12-15T02:59:43.1Z", mark(), mark())
            .unwrap();
        assert!(matches!(v, NodeValue::Timestamp(_)));
    }

    #[test]
    fn constructs_omap_from_single_pair_sequence() {
        let c = Constructor::new();
        let k = Node::scalar("tag:yaml.org,2002:str", NodeValue::Str("a".into()), mark(), mark());
        let v = Node::scalar("tag:yaml.org,2002:int", NodeValue::Int(1), mark(), mark());
        let item = Node::mapping("tag:yaml.org,2002:map", vec![(k, v)], mark(), mark(), false);
        let result = c.construct_sequence("tag:yaml.org,2002:omap", vec![item], mark(), mark()).unwrap();
        assert!(matches!(result, NodeValue::Mapping(pairs) if pairs.len() == 1));
    }
}
