use thiserror::Error;
use unicode_width::UnicodeWidthChar;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextError {
    #[error("wrap width must be at least 1 column")]
    InvalidWidth,
}

/// On-screen column width of a single character. Wide and fullwidth East
/// Asian characters occupy two columns, combining marks occupy none.
pub fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

/// On-screen column width of a string. Additive: the width of a
/// concatenation is the sum of the widths of its parts.
pub fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Wrap `text` into lines no wider than `width` display columns.
///
/// Each input line (split on embedded newlines) wraps independently and an
/// empty input line yields one empty output line. Characters pack greedily;
/// when the budget runs out mid-word the line breaks at its last space
/// instead, and a word wider than the whole budget is broken mid-word. The
/// one case that can exceed `width` is a single character wider than the
/// entire budget, which is emitted on its own line.
pub fn wrap(text: &str, width: usize) -> Result<Vec<String>, TextError> {
    if width == 0 {
        return Err(TextError::InvalidWidth);
    }

    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        wrap_line(raw_line, width, &mut lines);
    }
    Ok(lines)
}

fn wrap_line(line: &str, width: usize, out: &mut Vec<String>) {
    if line.is_empty() {
        out.push(String::new());
        return;
    }

    let mut current = String::new();
    let mut current_width = 0usize;

    for ch in line.chars() {
        let w = char_width(ch);
        if current_width + w > width && !current.is_empty() {
            // Breaking mid-word: hand the tail of the current line to the
            // next one and break at the last space instead.
            let mut carried = String::new();
            if ch != ' ' && !current.ends_with(' ') {
                if let Some(pos) = current.rfind(' ') {
                    if pos > 0 {
                        carried = current.split_off(pos + 1);
                        current.truncate(pos);
                    }
                }
            }
            out.push(std::mem::take(&mut current));
            current = carried;
            current_width = display_width(&current);
            if ch == ' ' && current.is_empty() {
                // The space itself forced the break; drop it rather than
                // starting the next line with it.
                continue;
            }
            if current_width + w > width && !current.is_empty() {
                // The carried tail plus this character still busts the
                // budget; hard-break once more.
                out.push(std::mem::take(&mut current));
                current_width = 0;
            }
        }
        current.push(ch);
        current_width += w;
    }

    out.push(current);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn width_counts_wide_glyphs_double() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("山本"), 4);
        assert_eq!(display_width("a山b"), 4);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn width_ignores_combining_marks() {
        // 'e' followed by a combining acute accent renders in one column.
        assert_eq!(display_width("e\u{0301}"), 1);
    }

    #[test]
    fn zero_width_is_an_error() {
        assert_eq!(wrap("anything", 0), Err(TextError::InvalidWidth));
    }

    #[test]
    fn short_input_passes_through() {
        assert_eq!(wrap("hello", 10).unwrap(), vec!["hello"]);
    }

    #[test]
    fn breaks_at_last_space() {
        assert_eq!(
            wrap("hello world", 8).unwrap(),
            vec!["hello".to_string(), "world".to_string()]
        );
    }

    #[test]
    fn hard_breaks_overlong_words() {
        assert_eq!(
            wrap("abcdefgh", 3).unwrap(),
            vec!["abc".to_string(), "def".to_string(), "gh".to_string()]
        );
    }

    #[test]
    fn empty_input_lines_survive() {
        assert_eq!(
            wrap("one\n\ntwo", 10).unwrap(),
            vec!["one".to_string(), String::new(), "two".to_string()]
        );
    }

    #[test]
    fn wide_glyphs_wrap_by_columns_not_chars() {
        // Four columns of budget fit two double-width characters.
        assert_eq!(
            wrap("山本太郎", 4).unwrap(),
            vec!["山本".to_string(), "太郎".to_string()]
        );
        // Three columns fit only one.
        assert_eq!(
            wrap("山本", 3).unwrap(),
            vec!["山".to_string(), "本".to_string()]
        );
    }

    #[test]
    fn single_wide_glyph_overflows_width_one() {
        assert_eq!(wrap("山", 1).unwrap(), vec!["山".to_string()]);
    }

    #[test]
    fn mixed_prose_keeps_words_whole() {
        let lines = wrap("Taro Yamamoto (山本 太郎) is a politician.", 12).unwrap();
        for line in &lines {
            assert!(display_width(line) <= 12, "line too wide: {line:?}");
        }
        assert_eq!(lines[0], "Taro");
    }

    proptest! {
        #[test]
        fn width_is_additive(a in ".*", b in ".*") {
            let joined = format!("{a}{b}");
            prop_assert_eq!(display_width(&joined), display_width(&a) + display_width(&b));
        }

        #[test]
        fn wrapped_lines_respect_budget(s in "\\PC{0,200}", width in 2usize..60) {
            for line in wrap(&s, width).unwrap() {
                prop_assert!(display_width(&line) <= width, "{:?} wider than {}", line, width);
            }
        }

        #[test]
        fn wrapping_loses_no_non_space_characters(s in "[a-z 你好]{0,80}", width in 2usize..20) {
            let wrapped = wrap(&s, width).unwrap().concat();
            let kept = |t: &str| t.chars().filter(|c| *c != ' ').collect::<String>();
            prop_assert_eq!(kept(&wrapped), kept(&s));
        }
    }
}
