//! JSON key normalization
//!
//! API payloads arrive in whatever casing the backend uses (`snake_case`,
//! `kebab-case`, `SCREAMING_CASE`). Callers always see camelCase keys.
//!
//! Word splitting rules:
//! - any non-alphanumeric character separates words and is dropped
//! - a lowercase letter followed by an uppercase letter starts a new word
//! - in a run of capitals, the last one starts a new word when a lowercase
//!   letter follows (`HTTPResponse` -> `HTTP`, `Response`)
//! - digits form their own word (`line2b` -> `line`, `2`, `b`)

use serde_json::{Map, Value};

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharKind {
    Upper,
    Lower,
    Digit,
    Separator,
}

fn kind(c: char) -> CharKind {
    if c.is_ascii_digit() {
        CharKind::Digit
    } else if c.is_uppercase() {
        CharKind::Upper
    } else if c.is_alphanumeric() {
        CharKind::Lower
    } else {
        CharKind::Separator
    }
}

fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let this = kind(c);
        if this == CharKind::Separator {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(&prev_char) = current.chars().last().as_ref() {
            let prev = kind(prev_char);
            let next = chars.get(i + 1).map(|&n| kind(n));

            let boundary = match (prev, this) {
                (CharKind::Lower, CharKind::Upper) => true,
                (CharKind::Digit, CharKind::Upper | CharKind::Lower) => true,
                (CharKind::Upper | CharKind::Lower, CharKind::Digit) => true,
                (CharKind::Upper, CharKind::Upper) => next == Some(CharKind::Lower),
                _ => false,
            };

            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// Convert a single key to camelCase.
///
/// ```
/// use core_connection::normalize::camel_case;
///
/// assert_eq!(camel_case("created_at"), "createdAt");
/// assert_eq!(camel_case("Content-Type"), "contentType");
/// assert_eq!(camel_case("userID"), "userId");
/// ```
pub fn camel_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for (index, word) in split_words(input).iter().enumerate() {
        let lower = word.to_lowercase();
        if index == 0 {
            out.push_str(&lower);
            continue;
        }

        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }

    out
}

/// Rewrite every object key at every depth to camelCase.
///
/// Arrays are traversed; scalar values are untouched. When two keys of the
/// same object collapse to the same camelCase form, the one appearing later
/// wins.
pub fn camelize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(camel_case(&key), camelize_keys(value));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(camelize_keys).collect()),
        other => other,
    }
}
