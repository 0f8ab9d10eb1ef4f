use serde_json::Value;

use crate::util::{collapse_whitespace, truncate_chars};

/// Substrings that mark a user record as injected by the CLI rather than typed by a person.
pub const SYSTEM_MARKERS: [&str; 6] = [
    "<command-name>",
    "<local-command-stdout>",
    "<system-reminder>",
    "<task-notification>",
    "<task-id>",
    "<output-file>",
];

/// Turns one raw session log line into a display-ready prompt.
///
/// Returns `None` for anything that is not a plain, human-authored user
/// message: malformed JSON, non-user records, meta records, tool results,
/// blank text, CLI-injected markers and text whose tags do not balance.
pub fn parse_user_prompt(line: &str, max_chars: usize) -> Option<String> {
    let parsed = serde_json::from_str::<Value>(line.trim()).ok()?;

    if str_at(&parsed, &["type"]) != Some("user") {
        return None;
    }
    if parsed.get("isMeta").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }

    let message = parsed.get("message").filter(|value| value.is_object())?;
    if str_at(message, &["role"]) != Some("user") {
        return None;
    }

    // Tool results arrive as an array of content blocks.
    let content = message.get("content")?.as_str()?.trim();
    if content.is_empty() {
        return None;
    }
    if SYSTEM_MARKERS.iter().any(|marker| content.contains(marker)) {
        return None;
    }
    if !tags_balanced(content) {
        return None;
    }

    Some(truncate_chars(&collapse_whitespace(content), max_chars))
}

/// Rough guard against prompts that would break the rendered markdown.
///
/// Counts opening tags (`<name>` or `<name attrs>`, skipping self-closed ones
/// and ones directly followed by `</`) against closing `</name>` tags. This is
/// a counter, not a parser: nesting and name matching are not checked.
pub fn tags_balanced(content: &str) -> bool {
    count_open_tags(content) == count_close_tags(content)
}

fn count_open_tags(content: &str) -> usize {
    let mut count = 0;
    let mut pos = 0;

    while let Some(offset) = content[pos..].find('<') {
        let start = pos + offset;
        match match_open_tag(content, start) {
            Some(OpenTag { end, self_closed }) => {
                let followed_by_closer = content[end + 1..].starts_with("</");
                if followed_by_closer {
                    pos = start + 1;
                    continue;
                }
                if !self_closed {
                    count += 1;
                }
                pos = end + 1;
            }
            None => pos = start + 1,
        }
    }

    count
}

struct OpenTag {
    /// Byte index of the closing `>`.
    end: usize,
    self_closed: bool,
}

fn match_open_tag(content: &str, start: usize) -> Option<OpenTag> {
    let bytes = content.as_bytes();
    let mut cursor = start + 1;
    if !bytes.get(cursor)?.is_ascii_alphabetic() {
        return None;
    }
    cursor += 1;
    while bytes
        .get(cursor)
        .is_some_and(|byte| byte.is_ascii_alphanumeric() || *byte == b'-')
    {
        cursor += 1;
    }

    let rest = &content[cursor..];
    let next = rest.chars().next()?;
    if next == '>' {
        return Some(OpenTag {
            end: cursor,
            self_closed: false,
        });
    }
    if !next.is_whitespace() {
        return None;
    }

    let attrs_start = cursor + next.len_utf8();
    let close = content[attrs_start..].find('>')? + attrs_start;
    Some(OpenTag {
        end: close,
        self_closed: content[attrs_start..close].trim_end().ends_with('/'),
    })
}

fn count_close_tags(content: &str) -> usize {
    let bytes = content.as_bytes();
    let mut count = 0;
    let mut pos = 0;

    while let Some(offset) = content[pos..].find("</") {
        let start = pos + offset;
        let mut cursor = start + 2;
        if bytes.get(cursor).is_some_and(u8::is_ascii_alphabetic) {
            cursor += 1;
            while bytes
                .get(cursor)
                .is_some_and(|byte| byte.is_ascii_alphanumeric() || *byte == b'-')
            {
                cursor += 1;
            }
            if bytes.get(cursor) == Some(&b'>') {
                count += 1;
                pos = cursor + 1;
                continue;
            }
        }
        pos = start + 1;
    }

    count
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cursor = value;
    for key in path {
        cursor = cursor.get(*key)?;
    }
    cursor.as_str()
}
