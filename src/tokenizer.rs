//! Top-level splitting of bracketed wire literals.
//!
//! Argument lists and array values arrive as quasi-JSON text such as
//! `[1, {"a": [2,3]}, "x"]`. Rather than parsing them, the client splits the
//! interior on commas that sit at bracket depth zero and hands each piece to
//! a [`MultiTyped`](crate::value::MultiTyped) for on-demand coercion.
//!
//! # Limitations
//!
//! The splitter counts `{}`/`[]` depth only. Quoted strings are not
//! recognised, so a comma or bracket inside a string literal splits or
//! unbalances the element it belongs to:
//!
//! ```text
//! ["a,b", 1]  ->  ["\"a", "b\"", "1"]
//! ```
//!
//! The outermost pair is stripped without checking that it matches.

use crate::value::ParseError;

/// Bottom-of-stack marker. Never compared equal to a real closer.
const SENTINEL: char = '\0';

/// Split the interior of a bracketed literal into its top-level elements.
///
/// The first and last characters are dropped, the remainder is trimmed, and
/// an all-whitespace interior yields an empty vector. Each returned element
/// is a trimmed slice of `literal`.
///
/// # Errors
///
/// Returns [`ParseError::NotBracketed`] if `literal` has fewer than two
/// characters, so there is no outer pair to strip.
///
/// # Example
///
/// ```
/// use reach_rpc::tokenizer::split_top_level;
///
/// let parts = split_top_level(r#"[1, {"a": [2,3]}, 4]"#).unwrap();
/// assert_eq!(parts, vec!["1", r#"{"a": [2,3]}"#, "4"]);
/// ```
pub fn split_top_level(literal: &str) -> Result<Vec<&str>, ParseError> {
    let interior = strip_outer(literal)
        .ok_or_else(|| ParseError::NotBracketed(literal.to_string()))?
        .trim();

    if interior.is_empty() {
        return Ok(Vec::new());
    }

    let mut elements = Vec::new();
    let mut closers = vec![SENTINEL];
    let mut start = 0;

    for (idx, ch) in interior.char_indices() {
        match ch {
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            _ if closers.len() > 1 && closers.last() == Some(&ch) => {
                closers.pop();
            }
            ',' if closers.len() == 1 => {
                elements.push(interior[start..idx].trim());
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    elements.push(interior[start..].trim());

    Ok(elements)
}

/// Find the end of the bracketed literal that opens at the start of `text`.
///
/// Returns the byte length of the literal including its closer, or `None` if
/// `text` does not start with `[`/`{` or the brackets never balance. Depth is
/// tracked the same way as [`split_top_level`], so quoted brackets count.
pub fn balanced_prefix_len(text: &str) -> Option<usize> {
    let mut closers = vec![SENTINEL];

    for (idx, ch) in text.char_indices() {
        match ch {
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            _ if closers.len() > 1 && closers.last() == Some(&ch) => {
                closers.pop();
                if closers.len() == 1 {
                    return Some(idx + ch.len_utf8());
                }
            }
            _ if idx == 0 => return None,
            _ => {}
        }
    }

    None
}

/// Drop the first and last character of `literal`.
fn strip_outer(literal: &str) -> Option<&str> {
    let mut chars = literal.char_indices();
    let (_, first) = chars.next()?;
    let (last_idx, _) = chars.next_back()?;
    Some(&literal[first.len_utf8()..last_idx])
}
