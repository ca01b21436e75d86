//! Maps an untagged scalar to an implicit tag.
//!
//! Rules are grouped by the scalar's first character — the same dispatch
//! trick the teacher's `AdvancedResolver` used for performance — so resolving
//! a value only tries the handful of regexes that could plausibly match it
//! instead of all of them in sequence.

use std::collections::HashMap;

use regex::Regex;

use crate::error::ResolverError;

const TAG_NULL: &str = "tag:yaml.org,2002:null";
const TAG_BOOL: &str = "tag:yaml.org,2002:bool";
const TAG_INT: &str = "tag:yaml.org,2002:int";
const TAG_FLOAT: &str = "tag:yaml.org,2002:float";
const TAG_TIMESTAMP: &str = "tag:yaml.org,2002:timestamp";
const TAG_MERGE: &str = "tag:yaml.org,2002:merge";
const TAG_VALUE: &str = "tag:yaml.org,2002:value";
const TAG_STR: &str = "tag:yaml.org,2002:str";
pub const TAG_SEQ: &str = "tag:yaml.org,2002:seq";
pub const TAG_MAP: &str = "tag:yaml.org,2002:map";

/// One rule: a compiled pattern and the tag it resolves to when matched.
#[derive(Clone)]
struct Rule {
    tag: String,
    pattern: Regex,
}

/// First-character-keyed implicit-tag resolver. Scalars whose first
/// character isn't explicitly listed only ever try the catchall rules.
pub struct Resolver {
    by_first_char: HashMap<char, Vec<Rule>>,
    catchall: Vec<Rule>,
}

impl Default for Resolver {
    fn default() -> Self {
        let mut resolver = Self {
            by_first_char: HashMap::new(),
            catchall: Vec::new(),
        };
        resolver.install_defaults();
        resolver
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional implicit-tag rule, keyed by the set of first
    /// characters it can start with (the "custom Resolver" extension point
    /// `spec.md` §6 asks for).
    pub fn add_implicit_resolver(&mut self, tag: impl Into<String>, pattern: &str, first_chars: &str) -> Result<(), ResolverError> {
        let rule = Rule {
            tag: tag.into(),
            pattern: Regex::new(pattern).map_err(|e| ResolverError::Malformed {
                kind: "regex",
                value: e.to_string(),
                mark: crate::error::Mark::default(),
            })?,
        };
        if first_chars.is_empty() {
            self.catchall.push(rule);
        } else {
            for c in first_chars.chars() {
                self.by_first_char.entry(c).or_default().push(rule.clone());
            }
        }
        Ok(())
    }

    fn install_defaults(&mut self) {
        let rules: &[(&str, &str, &str)] = &[
            (TAG_NULL, r"^(?:~|null|Null|NULL)$", "~nN"),
            (TAG_BOOL, r"(?i)^(?:yes|no|true|false|on|off)$", "yYnNtTfFoO"),
            (TAG_MERGE, r"^<<$", "<"),
            (TAG_VALUE, r"^=$", "="),
            (
                TAG_TIMESTAMP,
                r"^[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]$",
                "0123456789",
            ),
            (
                TAG_TIMESTAMP,
                r"^[0-9][0-9][0-9][0-9]-[0-9]{1,2}-[0-9]{1,2}(?:[Tt]|[ \t]+)[0-9]{1,2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9]{1,2}(?::[0-9]{2})?))?$",
                "0123456789",
            ),
            (TAG_INT, r"^[-+]?0b[0-1_]+$", "-+0123456789"),
            (TAG_INT, r"^[-+]?0x[0-9a-fA-F_]+$", "-+0123456789"),
            (TAG_INT, r"^[-+]?0[0-7_]+$", "-+0123456789"),
            (TAG_INT, r"^[-+]?(?:0|[1-9][0-9_]*)$", "-+0123456789"),
            (TAG_INT, r"^[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+$", "-+0123456789"),
            (
                TAG_FLOAT,
                r"^[-+]?(?:[0-9][0-9_]*)?\.[0-9_]*(?:[eE][-+]?[0-9]+)?$",
                "-+.0123456789",
            ),
            (TAG_FLOAT, r"^[-+]?[0-9][0-9_]*[eE][-+]?[0-9]+$", "-+0123456789"),
            (
                TAG_FLOAT,
                r"^[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*$",
                "-+0123456789",
            ),
            (TAG_FLOAT, r"(?i)^[-+]?\.inf$", "-+."),
            (TAG_FLOAT, r"(?i)^\.nan$", "."),
        ];
        for (tag, pattern, first_chars) in rules {
            self.add_implicit_resolver(*tag, pattern, first_chars)
                .expect("built-in resolver patterns are valid regexes");
        }
        // The empty plain scalar resolves to null but has no first
        // character to dispatch on, so it lives in the catchall bucket.
        self.catchall.push(Rule {
            tag: TAG_NULL.to_string(),
            pattern: Regex::new(r"^$").unwrap(),
        });
    }

    /// Resolve the implicit tag for a scalar. `plain` is true when the
    /// scalar carried no quotes; quoted scalars only ever resolve to `!!str`
    /// (a quoted `"42"` is a string, never an int).
    pub fn resolve_scalar(&self, value: &str, plain: bool) -> String {
        if !plain {
            return TAG_STR.to_string();
        }
        if let Some(c) = value.chars().next() {
            if let Some(rules) = self.by_first_char.get(&c) {
                for rule in rules {
                    if rule.pattern.is_match(value) {
                        return rule.tag.clone();
                    }
                }
            }
        }
        for rule in &self.catchall {
            if rule.pattern.is_match(value) {
                return rule.tag.clone();
            }
        }
        TAG_STR.to_string()
    }

    /// Default tag for an untagged collection — always `!!seq`/`!!map`,
    /// never subject to pattern matching.
    pub fn resolve_sequence(&self) -> &'static str {
        TAG_SEQ
    }

    pub fn resolve_mapping(&self) -> &'static str {
        TAG_MAP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(value: &str) -> String {
        Resolver::new().resolve_scalar(value, true)
    }

    #[test]
    fn resolves_null_variants() {
        for v in ["", "~", "null", "Null", "NULL"] {
            assert_eq!(resolve(v), TAG_NULL, "value: {v:?}");
        }
    }

    #[test]
    fn resolves_bool_variants() {
        for v in ["yes", "No", "TRUE", "off"] {
            assert_eq!(resolve(v), TAG_BOOL, "value: {v:?}");
        }
    }

    #[test]
    fn resolves_plain_decimal_int() {
        assert_eq!(resolve("42"), TAG_INT);
        assert_eq!(resolve("-17"), TAG_INT);
    }

    #[test]
    fn resolves_sexagesimal_int() {
        assert_eq!(resolve("685_230"), TAG_INT);
        assert_eq!(resolve("1:12:30"), TAG_INT);
    }

    #[test]
    fn resolves_hex_and_binary_and_octal_int() {
        assert_eq!(resolve("0x1A"), TAG_INT);
        assert_eq!(resolve("0b1010"), TAG_INT);
        assert_eq!(resolve("012"), TAG_INT);
    }

    #[test]
    fn resolves_float_variants() {
        assert_eq!(resolve("3.14"), TAG_FLOAT);
        assert_eq!(resolve("1e10"), TAG_FLOAT);
        assert_eq!(resolve(".inf"), TAG_FLOAT);
        assert_eq!(resolve(".nan"), TAG_FLOAT);
    }

    #[test]
    fn resolves_timestamp() {
        assert_eq!(resolve("2001-12-15T02:59:43.1Z"), TAG_TIMESTAMP);
        assert_eq!(resolve("2002-12-14"), TAG_TIMESTAMP);
    }

    #[test]
    fn resolves_merge_and_value_markers() {
        assert_eq!(resolve("<<"), TAG_MERGE);
        assert_eq!(resolve("="), TAG_VALUE);
    }

    #[test]
    fn falls_back_to_str() {
        assert_eq!(resolve("hello world"), TAG_STR);
    }

    #[test]
    fn quoted_scalars_always_resolve_to_str() {
        assert_eq!(Resolver::new().resolve_scalar("42", false), TAG_STR);
    }
}
