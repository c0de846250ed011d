//! Pattern post-processor
//!
//! Textual passes applied, in order, to a serialized shape:
//!
//! 1. regex leaves rewritten to `field:/pattern.../options` (only when the
//!    shape holds a regex leaf)
//! 2. runs of sentinels `[1,1,...]` collapsed to `[...]`
//! 3. runs of identical small objects collapsed to `[...]`
//! 4. a whole-pattern `$match` / `$sort` wrapper replaced by its value
//! 5. a whole-pattern `$facet` value replaced by `...`
//! 6. `{"$oid":1}` collapsed to `1`
//!
//! Later passes assume the earlier ones already ran. Passes 2 and 3 never
//! touch the inside of string literals or rewritten regex literals. Passes 4
//! and 5 act on the [`StageWrapper`] read from the shape before
//! serialization, not on the text.

use regex::{Captures, NoExpand, Regex};
use serde_json::Value;
use slowop_format::constants::{
    FACET_STAGE_OPERATOR, OBJECT_ID_WRAPPER_KEY, UNWRAPPED_STAGE_OPERATORS,
};
use slowop_format::{Result, SlowopError};

/// Body of a JSON string literal, escapes included.
const JSON_STRING_BODY: &str = r#"(?:[^"\\]|\\.)*"#;

/// A JSON string literal or a regex literal left by the first pass.
const LITERAL: &str = r#""(?:[^"\\]|\\.)*"|/(?:[^"\\]|\\.)*?\.\.\./[A-Za-z]*"#;

/// An object with at most one level of nested objects and no arrays other
/// than already collapsed `[...]` runs.
const SMALL_OBJECT: &str =
    r"\{(?:[^{}\[\]]|\[\.\.\.\]|\{(?:[^{}\[\]]|\[\.\.\.\])*\})*\}";

const COLLAPSED_ARRAY: &str = "[...]";
const COLLAPSED_FACET: &str = r#"{"$facet":...}"#;

/// Single top-level stage operator wrapping a whole shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageWrapper {
    /// `$match` or `$sort`: the pattern becomes the wrapped value.
    Operator,
    /// `$facet`: the wrapped value is elided.
    Facet,
}

impl StageWrapper {
    /// Wrapper of `shape`, if its only key is one of the wrapping operators.
    pub fn of(shape: &Value) -> Option<Self> {
        let map = shape.as_object()?;
        if map.len() != 1 {
            return None;
        }
        let key = map.keys().next()?.as_str();
        if UNWRAPPED_STAGE_OPERATORS.contains(&key) {
            Some(Self::Operator)
        } else if key == FACET_STAGE_OPERATOR {
            Some(Self::Facet)
        } else {
            None
        }
    }
}

/// Precompiled rewrite rules, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct PatternRules {
    keyed_regex: Regex,
    bare_regex: Regex,
    sentinel_run: Regex,
    object_run: Regex,
    small_object: Regex,
    object_id: Regex,
}

impl PatternRules {
    /// Compile every rewrite rule.
    pub fn new() -> Result<Self> {
        let wrapper = [
            r#"\{"\$regularExpression":\{(?:"options":"("#,
            JSON_STRING_BODY,
            r#")",)?"pattern":"\^?("#,
            JSON_STRING_BODY,
            r#")"\}\}"#,
        ]
        .concat();
        let keyed = [r#""("#, JSON_STRING_BODY, r#")":"#, &wrapper].concat();
        let sentinel_run = ["(", LITERAL, r")|\[1(?:,1)+\]"].concat();
        let object_run = [
            "(",
            LITERAL,
            r")|\[",
            SMALL_OBJECT,
            r"(?:,",
            SMALL_OBJECT,
            r")+\]",
        ]
        .concat();
        let object_id = [r#"\{""#, &regex::escape(OBJECT_ID_WRAPPER_KEY), r#"":1\}"#].concat();

        Ok(Self {
            keyed_regex: compile(&keyed)?,
            bare_regex: compile(&wrapper)?,
            sentinel_run: compile(&sentinel_run)?,
            object_run: compile(&object_run)?,
            small_object: compile(SMALL_OBJECT)?,
            object_id: compile(&object_id)?,
        })
    }

    /// Run every pass over a serialized shape.
    pub fn apply(&self, shape: &str, has_regex: bool, wrapper: Option<StageWrapper>) -> String {
        let mut pattern = if has_regex {
            self.rewrite_regex_leaves(shape)
        } else {
            shape.to_string()
        };
        pattern = self.collapse_sentinel_runs(&pattern);
        pattern = self.collapse_object_runs(&pattern);
        pattern = match wrapper {
            Some(StageWrapper::Operator) => unwrap_operator(&pattern),
            Some(StageWrapper::Facet) => COLLAPSED_FACET.to_string(),
            None => pattern,
        };
        self.collapse_object_ids(&pattern)
    }

    /// `"f":{"$regularExpression":{"options":"i","pattern":"^abc"}}` becomes
    /// `f:/abc.../i`; wrappers without a field key become `/abc.../i`.
    pub fn rewrite_regex_leaves(&self, pattern: &str) -> String {
        let keyed = self.keyed_regex.replace_all(pattern, "${1}:/${3}.../${2}");
        self.bare_regex
            .replace_all(&keyed, "/${2}.../${1}")
            .into_owned()
    }

    /// `[1,1,1]` becomes `[...]`.
    pub fn collapse_sentinel_runs(&self, pattern: &str) -> String {
        self.sentinel_run
            .replace_all(pattern, |caps: &Captures| match caps.get(1) {
                Some(literal) => literal.as_str().to_string(),
                None => COLLAPSED_ARRAY.to_string(),
            })
            .into_owned()
    }

    /// `[{"a":1},{"a":1}]` becomes `[...]`; arrays of differing objects are kept.
    ///
    /// Repeats until nothing changes so that runs exposed by an inner
    /// collapse are folded too.
    pub fn collapse_object_runs(&self, pattern: &str) -> String {
        let mut current = pattern.to_string();
        loop {
            let next = self
                .object_run
                .replace_all(&current, |caps: &Captures| {
                    let run = &caps[0];
                    if caps.get(1).is_none() && self.all_elements_equal(run) {
                        COLLAPSED_ARRAY.to_string()
                    } else {
                        run.to_string()
                    }
                })
                .into_owned();
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// `{"$oid":1}` becomes `1`.
    pub fn collapse_object_ids(&self, pattern: &str) -> String {
        self.object_id
            .replace_all(pattern, NoExpand("1"))
            .into_owned()
    }

    fn all_elements_equal(&self, run: &str) -> bool {
        let mut elements = self.small_object.find_iter(run).map(|m| m.as_str());
        match elements.next() {
            Some(first) => elements.all(|element| element == first),
            None => false,
        }
    }
}

fn compile(rule: &str) -> Result<Regex> {
    Regex::new(rule).map_err(|e| SlowopError::InvalidRule(e.to_string()))
}

/// `{"$match":X}` and `{"$sort":X}` become `X`. Anything else is kept.
fn unwrap_operator(pattern: &str) -> String {
    UNWRAPPED_STAGE_OPERATORS
        .iter()
        .find_map(|operator| {
            pattern
                .strip_prefix("{\"")?
                .strip_prefix(operator)?
                .strip_prefix("\":")?
                .strip_suffix('}')
        })
        .unwrap_or(pattern)
        .to_string()
}
