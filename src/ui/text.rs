/// Wrap text to fit within a given width.
///
/// Widths are counted in characters. Runs of whitespace collapse to a single
/// space, and a word longer than `width` is split across lines.
///
/// # Arguments
/// * `text` - The text to wrap
/// * `width` - Maximum width per line
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        if current_len + word.len() + 1 > width && current_len > 0 {
            lines.push(std::mem::take(&mut current_line));
            current_len = 0;
        }

        if current_len > 0 {
            current_line.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current_line.extend(word);
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Wrap text to `width` characters without collapsing whitespace.
///
/// Indentation and runs of spaces are kept, so code in a reply stays aligned.
/// Lines break after the last whitespace that fits; a line with no usable
/// break point is split mid-word.
pub fn wrap_preserving(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    let mut line: Vec<char> = Vec::with_capacity(width);

    for ch in text.chars() {
        if line.len() == width {
            if ch.is_whitespace() {
                lines.push(line.drain(..).collect());
                continue;
            }
            // Break after a space, unless everything before it is indentation.
            let cut = line
                .iter()
                .rposition(|c| c.is_whitespace())
                .filter(|&i| line[..i].iter().any(|c| !c.is_whitespace()));
            match cut {
                Some(i) => {
                    let rest = line.split_off(i + 1);
                    let head: String = line.iter().collect();
                    lines.push(head.trim_end().to_string());
                    line = rest;
                }
                None => lines.push(line.drain(..).collect()),
            }
        }
        line.push(ch);
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line.into_iter().collect());
    }

    lines
}
