//! Variable references and their resolution.
//!
//! Values may refer to other variables as `${NAME}` or `$NAME`, where `NAME`
//! is a run of ASCII letters, digits and underscores. A bare reference takes
//! the longest such run, so `$FOO_BAR` never resolves as `$FOO` followed by
//! `_BAR`. A `$` that starts neither form is plain text.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::debug;
use serde_yaml::{Mapping, Value};

use crate::error::{CidagError, Result};

/// Variable name -> value, in layering order.
pub type VariableSpace = IndexMap<String, String>;

/// A piece of a variable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    /// `raw` is the reference exactly as written, e.g. `${NAME}`.
    Reference { name: &'a str, raw: &'a str },
}

pub fn tokenize(value: &str) -> Vec<Token<'_>> {
    let bytes = value.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }

        let reference = if bytes.get(i + 1) == Some(&b'{') {
            let name_end = scan_name(bytes, i + 2);
            (name_end > i + 2 && bytes.get(name_end) == Some(&b'}'))
                .then(|| (&value[i + 2..name_end], name_end + 1))
        } else {
            let name_end = scan_name(bytes, i + 1);
            (name_end > i + 1).then(|| (&value[i + 1..name_end], name_end))
        };

        match reference {
            Some((name, end)) => {
                if text_start < i {
                    tokens.push(Token::Text(&value[text_start..i]));
                }
                tokens.push(Token::Reference {
                    name,
                    raw: &value[i..end],
                });
                i = end;
                text_start = end;
            }
            None => i += 1,
        }
    }

    if text_start < bytes.len() {
        tokens.push(Token::Text(&value[text_start..]));
    }

    tokens
}

fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    end
}

/// Names referenced by a value, in order of appearance.
pub fn references(value: &str) -> Vec<&str> {
    tokenize(value)
        .into_iter()
        .filter_map(|token| match token {
            Token::Reference { name, .. } => Some(name),
            Token::Text(_) => None,
        })
        .collect()
}

/// Replaces every reference to a variable of `space` with its current value.
/// References to unknown names are kept verbatim.
pub fn substitute(value: &str, space: &VariableSpace) -> String {
    tokenize(value)
        .into_iter()
        .map(|token| match token {
            Token::Text(text) => text,
            Token::Reference { name, raw } => space.get(name).map_or(raw, String::as_str),
        })
        .collect()
}

/// Substitutes references until no value changes.
///
/// A chain `A -> B -> C` needs one pass per link, so passes repeat for as
/// long as the previous one changed something.
///
/// # Errors
///
/// Returns `CyclicVariable` if the defined variables reference each other in
/// a cycle (including a variable referencing itself), either as written or
/// once substitution has spliced new references together.
pub fn resolve_variables(mut space: VariableSpace) -> Result<VariableSpace> {
    if let Some(chain) = find_cycle(&space) {
        return Err(CidagError::CyclicVariable { chain });
    }

    let mut passes = 0;
    while substitution_pass(&mut space) {
        passes += 1;
        // Substituted text can form new references, e.g. `$${B}` with `B: A`
        if let Some(chain) = find_cycle(&space) {
            return Err(CidagError::CyclicVariable { chain });
        }
    }
    debug!(
        "Resolved {} variables after {passes} substitution passes",
        space.len()
    );

    Ok(space)
}

fn substitution_pass(space: &mut VariableSpace) -> bool {
    let mut changed = false;

    for index in 0..space.len() {
        let Some((_, value)) = space.get_index(index) else {
            continue;
        };
        let resolved = substitute(value, space);
        if &resolved == value {
            continue;
        }

        if let Some((_, value)) = space.get_index_mut(index) {
            *value = resolved;
            changed = true;
        }
    }

    changed
}

fn find_cycle(space: &VariableSpace) -> Option<Vec<String>> {
    let mut finished = HashSet::new();
    let mut stack = Vec::new();

    space
        .keys()
        .find_map(|name| visit(name, space, &mut stack, &mut finished))
}

fn visit<'a>(
    name: &'a str,
    space: &'a VariableSpace,
    stack: &mut Vec<&'a str>,
    finished: &mut HashSet<&'a str>,
) -> Option<Vec<String>> {
    if finished.contains(name) {
        return None;
    }
    if let Some(start) = stack.iter().position(|&n| n == name) {
        let mut chain: Vec<String> = stack[start..].iter().map(ToString::to_string).collect();
        chain.push(name.to_string());
        return Some(chain);
    }

    let value = space.get(name)?;
    stack.push(name);
    for reference in references(value) {
        if space.contains_key(reference) {
            if let Some(chain) = visit(reference, space, stack, finished) {
                return Some(chain);
            }
        }
    }
    stack.pop();
    finished.insert(name);

    None
}

/// Converts a YAML `variables` mapping into name/value strings.
///
/// Expanded definitions (`{ value: ..., description: ... }`) contribute their
/// `value`.
pub fn variables_from_mapping(mapping: &Mapping) -> VariableSpace {
    mapping
        .iter()
        .map(|(key, value)| (yaml_to_string(key), yaml_to_string(value)))
        .collect()
}

pub fn yaml_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Mapping(m) => m.get("value").map(yaml_to_string).unwrap_or_default(),
        Value::Tagged(tagged) => yaml_to_string(&tagged.value),
        Value::Sequence(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
