//! SSML to plain text conversion, used to fill visual cards from speech.

use crate::{Error, Result};

/// Strip SSML markup from speech, keeping text nodes in document order.
///
/// Tags, comments and declarations are dropped and character references are
/// decoded. A stray `<` that does not open a tag is kept as text. Markup left
/// unterminated at the end of the input is reported as [`Error::Markup`].
pub fn convert_speech_to_text(ssml_speech: &str) -> Result<String> {
    let mut text = String::with_capacity(ssml_speech.len());
    let mut rest = ssml_speech;

    while let Some(pos) = rest.find(&['<', '&'][..]) {
        text.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if rest.starts_with('&') {
            let (decoded, consumed) = decode_reference(rest);
            match decoded {
                Some(c) => text.push(c),
                None => text.push_str(&rest[..consumed]),
            }
            rest = &rest[consumed..];
        } else {
            match markup_len(rest)? {
                Some(len) => rest = &rest[len..],
                None => {
                    text.push('<');
                    rest = &rest[1..];
                }
            }
        }
    }
    text.push_str(rest);

    Ok(text)
}

/// Length of the markup construct at the start of `s`, or `None` when the
/// leading `<` is plain text.
fn markup_len(s: &str) -> Result<Option<usize>> {
    if s.starts_with("<!--") {
        return s[4..]
            .find("-->")
            .map(|end| Some(4 + end + 3))
            .ok_or_else(|| Error::Markup("unterminated comment".to_string()));
    }

    let next = s[1..].chars().next();
    let opens_tag = match next {
        Some('!') | Some('?') => true,
        Some('/') => s[2..].starts_with(|c: char| c.is_ascii_alphabetic()),
        Some(c) => c.is_ascii_alphabetic(),
        None => false,
    };
    if !opens_tag {
        return Ok(None);
    }

    let mut quote: Option<char> = None;
    for (idx, c) in s.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Ok(Some(idx + 1)),
            _ => {}
        }
    }

    let preview: String = s.chars().take(24).collect();
    Err(Error::Markup(format!("unterminated tag: {}", preview)))
}

/// References that are also decoded without a closing `;`, as HTML allows.
const LEGACY_REFERENCES: &[(&str, char)] = &[("amp", '&'), ("lt", '<'), ("gt", '>'), ("quot", '"')];

/// Decode the character reference at the start of `s`.
///
/// Returns the decoded character (if recognized) and how many bytes to consume.
fn decode_reference(s: &str) -> (Option<char>, usize) {
    let Some(end) = s[1..]
        .char_indices()
        .take(32)
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '#'))
        .filter(|(_, c)| *c == ';')
        .map(|(idx, _)| idx + 1)
    else {
        return decode_legacy(s);
    };

    let name = &s[1..end];
    let decoded = if let Some(hex) = name
        .strip_prefix("#x")
        .or_else(|| name.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => None,
        }
    };

    (decoded, end + 1)
}

fn decode_legacy(s: &str) -> (Option<char>, usize) {
    LEGACY_REFERENCES
        .iter()
        .find(|(name, _)| s[1..].starts_with(name))
        .map(|(name, c)| (Some(*c), name.len() + 1))
        .unwrap_or((None, 1))
}
