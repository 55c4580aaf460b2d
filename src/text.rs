//! TEXT value escaping.

use anyhow::{bail, Error};

/// Undo TEXT escaping (`\n`, `\N`, `\\`, `\;` and `\,`).
pub fn unescape(s: &str) -> Result<String, Error> {
    let mut chars = s.chars();
    let mut unescaped = String::with_capacity(s.len());

    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }

        match chars.next() {
            Some('n') | Some('N') => unescaped.push('\n'),
            Some(c @ '\\') | Some(c @ ';') | Some(c @ ',') => unescaped.push(c),
            Some(c) => bail!("Unexpected escape sequence \\{}", c),
            None => bail!("String ends up in \\"),
        };
    }

    Ok(unescaped)
}

pub fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\\' | ';' | ',' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }

    escaped
}
