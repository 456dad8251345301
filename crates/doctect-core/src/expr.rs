//! Expression primitives shared by the text, grid and link resolvers.
//!
//! Two small languages live here:
//!
//! - **Arithmetic** (`evaluate_math`): integer literals, field names, and
//!   binary `+` / `-`. Used for grid offsets and child-referrer arguments.
//! - **Binding templates** (`parse_bindings`): literal text interleaved with
//!   `{{key}}` placeholders, tokenized with `winnow`.
//!
//! Both are total: malformed input degrades to `0` or to literal text.

use crate::model::DataMap;
use winnow::combinator::delimited;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{take_till, take_until};

// ─── Arithmetic ──────────────────────────────────────────────────────────

/// Evaluate an arithmetic expression against a node's data fields.
///
/// Splits on the first `+`, then on the last `-` that is not a sign, then
/// falls back to an integer literal or a field lookup. Anything that does
/// not resolve evaluates to `0`.
pub fn evaluate_math(expr: &str, data: &DataMap) -> i64 {
    let expr = expr.trim();
    if expr.is_empty() {
        return 0;
    }
    if let Ok(value) = expr.parse::<i64>() {
        return value;
    }
    if let Some(pos) = expr.find('+') {
        return evaluate_math(&expr[..pos], data)
            .saturating_add(evaluate_math(&expr[pos + 1..], data));
    }
    if let Some(pos) = binary_minus(expr) {
        return evaluate_math(&expr[..pos], data)
            .saturating_sub(evaluate_math(&expr[pos + 1..], data));
    }
    if let Some(rest) = expr.strip_prefix('-') {
        return evaluate_math(rest, data).saturating_neg();
    }
    data.get(expr).and_then(parse_int_prefix).unwrap_or(0)
}

/// Byte index of the last `-` acting as a binary operator: not at the start
/// and not directly after another operator.
fn binary_minus(expr: &str) -> Option<usize> {
    expr.char_indices()
        .filter(|&(i, c)| c == '-' && i > 0)
        .map(|(i, _)| i)
        .filter(|&i| {
            let before = expr[..i].trim_end();
            !before.is_empty() && !before.ends_with(['+', '-'])
        })
        .last()
}

/// Parse the leading integer of `s`, ignoring leading whitespace and any
/// trailing garbage (`"4th"` → 4, `"2.5"` → 2). `None` when no digits lead.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

// ─── Binding templates ───────────────────────────────────────────────────

/// A piece of a binding template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// Trimmed contents of a `{{...}}` placeholder.
    Binding(&'a str),
}

/// Whether `text` contains anything that could be a placeholder.
pub fn has_bindings(text: &str) -> bool {
    text.contains("{{")
}

fn placeholder<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    delimited("{{", take_till(1.., '}'), "}}").parse_next(input)
}

/// Split a template into literal text and `{{key}}` placeholders.
///
/// A `{{` without a matching `}}`, and the bare `{{}}`, stay literal. A
/// whitespace-only key is a binding on the empty key.
pub fn parse_bindings(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let checkpoint = rest;
        match take_until::<_, _, ContextError>(0.., "{{").parse_next(&mut rest) {
            Ok(literal) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(literal));
                }
            }
            Err(_) => {
                segments.push(Segment::Literal(checkpoint));
                break;
            }
        }

        let open = rest;
        match placeholder.parse_next(&mut rest) {
            Ok(key) => segments.push(Segment::Binding(key.trim())),
            Err(_) => {
                rest = &open[2..];
                segments.push(Segment::Literal(&open[..2]));
            }
        }
    }

    segments
}

/// Rewrite every placeholder of `template` with `resolve(key)`.
///
/// Keys for which `resolve` returns `None` are kept verbatim, so passes can
/// be chained.
pub fn substitute(template: &str, mut resolve: impl FnMut(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    for segment in parse_bindings(template) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Binding(key) => match resolve(key) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push_str("{{");
                    out.push_str(key);
                    out.push_str("}}");
                }
            },
        }
    }
    out
}

// ─── child_referrer ──────────────────────────────────────────────────────

const CHILD_REFERRER_PREFIX: &str = "child_referrer:";

/// Arguments of a `{{child_referrer:START:COUNT:TYPEFILTER:FIELD}}` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildReferrerExpr<'a> {
    pub start: &'a str,
    pub count: &'a str,
    /// `None` when the filter segment is empty or omitted.
    pub type_filter: Option<&'a str>,
    pub field: &'a str,
}

impl<'a> ChildReferrerExpr<'a> {
    /// Whether a placeholder key uses the child-referrer syntax.
    pub fn matches(key: &str) -> bool {
        key.starts_with(CHILD_REFERRER_PREFIX)
    }

    /// Parse a placeholder key. The four-part form `START:COUNT:FIELD`
    /// is accepted as "no filter"; anything shorter is `None`.
    pub fn parse(key: &'a str) -> Option<Self> {
        let args = key.strip_prefix(CHILD_REFERRER_PREFIX)?;
        let parts: Vec<&str> = args.splitn(4, ':').collect();
        let (start, count, type_filter, field) = match parts.as_slice() {
            [start, count, filter, field] => (*start, *count, Some(*filter), *field),
            [start, count, field] => (*start, *count, None, *field),
            _ => return None,
        };
        let type_filter = type_filter.map(str::trim).filter(|t| !t.is_empty());
        Some(Self {
            start,
            count,
            type_filter,
            field: field.trim(),
        })
    }
}
