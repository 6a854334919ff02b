/// Prefix every line of `text` with `"> "`.
pub fn add_quote(text: &str) -> String {
    text.lines()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Length in UTF-16 code units. Telegram entity offsets and Signal text
/// style ranges are both expressed in this unit.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Uppercase the first character, leaving the rest untouched.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_quote_prefixes_every_line() {
        assert_eq!(add_quote("a\nb"), "> a\n> b");
        assert_eq!(add_quote("single"), "> single");
    }

    #[test]
    fn test_add_quote_keeps_blank_lines() {
        assert_eq!(add_quote("a\n\nb"), "> a\n> \n> b");
    }

    #[test]
    fn test_add_quote_empty() {
        assert_eq!(add_quote(""), "");
    }

    #[test]
    fn test_utf16_len_counts_surrogate_pairs() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("é"), 1);
        // Emoji outside the BMP take two code units
        assert_eq!(utf16_len("😀"), 2);
        assert_eq!(utf16_len("😀: "), 4);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("photo"), "Photo");
        assert_eq!(capitalize("video note"), "Video note");
        assert_eq!(capitalize(""), "");
    }
}
