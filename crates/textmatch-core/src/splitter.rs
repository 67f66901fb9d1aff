/// Split on line breaks without trimming. `\r\n` counts as one break, a lone
/// `\r` or `\n` as one each, so `n` breaks always yield `n + 1` lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    lines.push(&text[start..]);
    lines
}

/// Lower-case and whitespace-tokenize a paragraph. Order and duplicates are kept.
pub fn split_terms(paragraph: &str) -> Vec<String> {
    paragraph.to_lowercase().split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_without_breaks() {
        assert_eq!(split_lines("alpha beta"), vec!["alpha beta"]);
    }

    #[test]
    fn blank_lines_are_kept() {
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert_eq!(split_lines("a\n"), vec!["a", ""]);
        assert_eq!(split_lines("\n"), vec!["", ""]);
    }

    #[test]
    fn crlf_is_one_break() {
        assert_eq!(split_lines("a\r\nb\rc\nd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\r\n\r\nb"), vec!["a", "", "b"]);
    }

    #[test]
    fn interior_whitespace_is_preserved() {
        assert_eq!(split_lines("  indented \n\ttab"), vec!["  indented ", "\ttab"]);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        assert_eq!(split_lines("café\nnaïve"), vec!["café", "naïve"]);
    }

    #[test]
    fn terms_are_lowercased_in_order_with_duplicates() {
        assert_eq!(split_terms("The cat saw THE  dog\n"), vec!["the", "cat", "saw", "the", "dog"]);
        assert!(split_terms("   ").is_empty());
    }

    #[test]
    fn sentence_punctuation_stays_attached() {
        assert_eq!(split_terms("India, officially."), vec!["india,", "officially."]);
    }
}
