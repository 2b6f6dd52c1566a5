//! `:name` placeholders to PostgreSQL `$n` positional parameters.

use emigrator_core::error::{EmigratorError, Result};
use emigrator_core::schema::DbValue;
use emigrator_core::store::QueryParams;

/// A statement rewritten for positional binding.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery<'p> {
    pub sql: String,
    /// Values for `$1..$n`, in position order.
    pub binds: Vec<&'p DbValue>,
}

/// Rewrite `:name` placeholders into `$n`.
///
/// `::type` casts, quoted identifiers, string literals (including `E'..'`
/// backslash escapes), dollar-quoted bodies and both comment styles are
/// copied untouched. A placeholder name starts with a letter or `_`, so
/// array slices like `[1:2]` are left alone. A name used twice shares one
/// position. Null parameters are inlined as `NULL` so the server infers
/// their type from context. Without parameters the statement is returned
/// as written.
pub fn translate_named_params<'p>(
    sql: &str,
    params: &'p QueryParams,
) -> Result<TranslatedQuery<'p>> {
    if params.is_empty() {
        return Ok(TranslatedQuery {
            sql: sql.to_string(),
            binds: Vec::new(),
        });
    }

    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<&str> = Vec::new();
    let mut binds = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' if is_escape_string(&chars, i) => {
                let end = find_closing_escaped(&chars, i + 1);
                out.extend(&chars[i..end]);
                i = end;
            }
            '\'' | '"' => {
                let end = find_closing(&chars, i + 1, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = block_comment_end(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            '$' => match dollar_tag(&chars, i) {
                Some(tag_len) => {
                    let tag = &chars[i..i + tag_len];
                    let body_start = i + tag_len;
                    let end = find_tag(&chars, body_start, tag)
                        .map_or(chars.len(), |p| p + tag_len);
                    out.extend(&chars[i..end]);
                    i = end;
                }
                None => {
                    out.push(c);
                    i += 1;
                }
            },
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).is_some_and(|ch| is_name_start(*ch)) => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|ch| !is_name_char(*ch))
                    .map_or(chars.len(), |p| start + p);
                let name: String = chars[start..end].iter().collect();
                let (key, value) = params
                    .iter()
                    .find(|(key, _)| *key == name)
                    .ok_or_else(|| {
                        EmigratorError::Database(format!(
                            "Missing value for query parameter ':{}'",
                            name
                        ))
                    })?;

                if value.is_null() {
                    out.push_str("NULL");
                } else if let Some(pos) = names.iter().position(|n| *n == key) {
                    out.push_str(&format!("${}", pos + 1));
                } else {
                    names.push(key);
                    binds.push(value);
                    out.push_str(&format!("${}", binds.len()));
                }
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(TranslatedQuery { sql: out, binds })
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Whether the quote at `i` opens an `E'..'` literal.
fn is_escape_string(chars: &[char], i: usize) -> bool {
    match i.checked_sub(1).map(|p| chars[p]) {
        Some('E') | Some('e') => i < 2 || !is_name_char(chars[i - 2]),
        _ => false,
    }
}

/// Like `find_closing` for `'`, but a backslash escapes the next character.
fn find_closing_escaped(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\'' if chars.get(i + 1) == Some(&'\'') => i += 2,
            '\'' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Index just past the `*/` closing the block comment opened at `start`.
///
/// Block comments nest.
fn block_comment_end(chars: &[char], start: usize) -> usize {
    let mut depth = 0;
    let mut i = start;
    while i < chars.len() {
        if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
            depth += 1;
            i += 2;
        } else if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    chars.len()
}

/// Index just past the closing `quote`, or the end of input.
///
/// A doubled quote is an escape and does not close the literal.
fn find_closing(chars: &[char], mut i: usize, quote: char) -> usize {
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// Length of a `$tag$` opener at `start`, if there is one.
fn dollar_tag(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    while i < chars.len() && is_name_char(chars[i]) {
        i += 1;
    }
    (chars.get(i) == Some(&'$')).then_some(i + 1 - start)
}

fn find_tag(chars: &[char], from: usize, tag: &[char]) -> Option<usize> {
    (from..chars.len().saturating_sub(tag.len() - 1)).find(|&p| chars[p..].starts_with(tag))
}
