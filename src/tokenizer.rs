//! Keyword-string codec for Gaussian route-section fragments.
//!
//! A *fragment* is one whitespace-delimited token of a `#p` directive line.
//! Fragments come in three textual shapes:
//!
//! ```text
//! opt                               bare keyword
//! empiricaldispersion=gd3           keyword with a single value
//! td=(nstates=50,root=1)            keyword with a parameter list
//! scrf=(smd,solvent=water)          parameter list with a bare flag ("smd")
//! ```
//!
//! This module decodes a fragment into a keyword name plus an ordered
//! parameter map, and serializes such a pair back into fragment text. The
//! splitting is done with an explicit character-scanning state machine
//! (parenthesis depth plus a toggled quote flag) rather than regexes, so the
//! exact edge-case behavior stays auditable.
//!
//! # Known imprecision
//!
//! A fragment with an unbalanced parenthesis pair (`(` without `)`, or the
//! reverse) is *not* recognized as the parameterized form. It falls through
//! to the plain `name=value` branch, splitting on the first `=`. This
//! mirrors the established behavior of the format and is pinned by tests;
//! do not "repair" such fragments here.

use indexmap::IndexMap;

/// Ordered parameter map of a decoded fragment.
///
/// Insertion order is preserved so that re-serialization is stable. A value
/// of `""` denotes a bare flag with no `=value` part (e.g. `smd` inside
/// `scrf=(smd,solvent=water)`).
pub type ParamMap = IndexMap<String, String>;

/// Splits a directive body into top-level tokens.
///
/// Tokens are separated by spaces, but only at parenthesis depth zero, so
/// `td=(nstates=50, root=1)` stays a single token even with spaces inside
/// the parameter list.
pub fn split_directive_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;

    for ch in line.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ' ' if depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Splits a parameter body on top-level commas.
///
/// A comma inside a nested parenthesis region or inside a quoted substring
/// (`'` or `"`, toggled, not nested) is not a split point. Each returned
/// part is trimmed; empty parts are dropped.
pub fn split_parameter_parts(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut in_quotes = false;

    for ch in body.chars() {
        match ch {
            '"' | '\'' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if !in_quotes && depth == 0 => {
                let part = current.trim().to_string();
                if !part.is_empty() {
                    parts.push(part);
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    let part = current.trim().to_string();
    if !part.is_empty() {
        parts.push(part);
    }

    parts
}

/// Decodes a single fragment into `(name, parameters)`.
///
/// - No `=` at all: the whole fragment is the name, parameters are empty.
/// - Both `(` and `)` present: the name is everything before the first `=`,
///   the body between the first `(` and the first `)` is split on top-level
///   commas; each part splits on its first `=` into a key/value pair, or
///   becomes a bare flag (empty value) when it has none.
/// - Otherwise: splits once on the first `=` and stores the remainder under
///   the single key `"value"`.
pub fn decode(fragment: &str) -> (String, ParamMap) {
    if !fragment.contains('=') {
        return (fragment.to_string(), ParamMap::new());
    }

    if fragment.contains('(') && fragment.contains(')') {
        let name_end = fragment.find('=').unwrap();
        let name = fragment[..name_end].to_string();

        let body_start = fragment.find('(').unwrap() + 1;
        let body_end = fragment.find(')').unwrap();
        let body = if body_start <= body_end {
            &fragment[body_start..body_end]
        } else {
            ""
        };

        let mut params = ParamMap::new();
        for part in split_parameter_parts(body) {
            match part.split_once('=') {
                Some((key, value)) => {
                    params.insert(key.trim().to_string(), value.trim().to_string());
                }
                None => {
                    params.insert(part, String::new());
                }
            }
        }

        (name, params)
    } else {
        // Unbalanced parentheses land here as well; see module docs.
        let (name, value) = fragment.split_once('=').unwrap();
        let mut params = ParamMap::new();
        params.insert("value".to_string(), value.to_string());
        (name.to_string(), params)
    }
}

/// Generic fragment encoder used when no parameter template applies.
///
/// A one-entry map keyed `"value"` renders `name=value`; any other non-empty
/// map renders `name=(k1=v1,k2=v2,...)` in insertion order, with bare flags
/// (empty values) rendered as their key alone; an empty map renders the bare
/// name.
pub fn encode(name: &str, params: &ParamMap) -> String {
    if params.is_empty() {
        return name.to_string();
    }

    if params.len() == 1 {
        if let Some(value) = params.get("value") {
            return format!("{}={}", name, value);
        }
    }

    let body = params
        .iter()
        .map(|(k, v)| {
            if v.is_empty() {
                k.clone()
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect::<Vec<_>>()
        .join(",");

    format!("{}=({})", name, body)
}
