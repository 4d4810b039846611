use unicode_width::UnicodeWidthStr;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn spinner(frame: usize) -> &'static str {
    SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]
}

/// Word-wrap `text` to `max_width` display columns. Words wider than a line
/// get a line of their own.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let word_width = word.width();

        if current_width == 0 {
            current_line = word.to_string();
            current_width = word_width;
        } else if current_width + 1 + word_width <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
            current_width = word_width;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(wrap_text("pack a light rain jacket", 10), vec!["pack a", "light rain", "jacket"]);
    }

    #[test]
    fn wide_chars_count_double() {
        // each CJK char is two columns
        assert_eq!(wrap_text("東京 大阪", 4), vec!["東京", "大阪"]);
    }

    #[test]
    fn empty_and_zero_width() {
        assert_eq!(wrap_text("   ", 10), vec![String::new()]);
        assert_eq!(wrap_text("as is", 0), vec!["as is"]);
    }

    #[test]
    fn spinner_cycles() {
        assert_eq!(spinner(0), spinner(SPINNER_FRAMES.len()));
    }
}
