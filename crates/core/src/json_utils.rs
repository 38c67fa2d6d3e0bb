//! JSON utility functions shared across crates.

/// Strip markdown code block wrappers from JSON content.
///
/// Handles `` ```json ... ``` ``, `` ``` ... ``` ``, and other language identifiers.
#[must_use]
pub fn strip_markdown_json(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() >= 6 {
        let without_prefix = trimmed.strip_prefix("```").unwrap_or(trimmed);
        let without_suffix = without_prefix.strip_suffix("```").unwrap_or(without_prefix);
        return without_suffix
            .split_once('\n')
            .map_or_else(|| without_suffix.trim(), |(_, rest)| rest.trim());
    }
    trimmed
}

/// Find the first balanced `{ ... }` object in free text.
///
/// Braces inside JSON string literals (including escaped quotes) are ignored,
/// so prose such as `Here you go: {"note": "a } b"} thanks` yields the object.
#[must_use]
pub fn first_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {},
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth = depth.saturating_add(1),
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return content.get(start..end);
                }
            },
            _ => {},
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_block() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_markdown_json(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_plain_block() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_markdown_json(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_no_block() {
        let input = "  {\"key\": \"value\"}  ";
        assert_eq!(strip_markdown_json(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_first_object_inside_prose() {
        let input = "Sure! Here is the result:\n{\"a\": {\"b\": 1}} Let me know.";
        assert_eq!(first_json_object(input), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_first_object_ignores_braces_in_strings() {
        let input = r#"note {"text": "closing } brace and \" quote", "n": 2} trailing"#;
        assert_eq!(first_json_object(input), Some(r#"{"text": "closing } brace and \" quote", "n": 2}"#));
    }

    #[test]
    fn test_first_object_unbalanced() {
        assert_eq!(first_json_object("{\"a\": 1"), None);
        assert_eq!(first_json_object("no json here"), None);
    }
}
