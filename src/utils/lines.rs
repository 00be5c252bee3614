/// A single line of a multi-line buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number
    pub number: usize,
    /// Byte offset of the first character of the line
    pub start: usize,
    /// Line content without the terminator (`\n` or `\r\n`)
    pub text: &'a str,
}

impl Line<'_> {
    /// Blank lines and `//` comments carry no query
    pub fn is_query(&self) -> bool {
        is_query_line(self.text)
    }
}

/// Whether a single line of text carries a query
pub fn is_query_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with("//")
}

/// Iterate over lines with their absolute offsets
pub fn lines_with_offsets(text: &str) -> impl Iterator<Item = Line<'_>> {
    let mut start = 0;
    text.split('\n').enumerate().map(move |(i, raw)| {
        let line = Line {
            number: i + 1,
            start,
            text: raw.strip_suffix('\r').unwrap_or(raw),
        };
        start += raw.len() + 1;
        line
    })
}

/// Apply `f` to every line, keeping each line's original terminator
pub fn map_lines<F>(text: &str, mut f: F) -> String
where
    F: FnMut(usize, &str) -> String,
{
    let mut out = String::with_capacity(text.len());
    for (i, raw) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match raw.strip_suffix('\r') {
            Some(line) => {
                out.push_str(&f(i + 1, line));
                out.push('\r');
            }
            None => out.push_str(&f(i + 1, raw)),
        }
    }
    out
}

/// [`map_lines`] over query lines; blank and `//` comment lines pass through
pub fn map_query_lines<F>(text: &str, mut f: F) -> String
where
    F: FnMut(usize, &str) -> String,
{
    map_lines(text, |n, line| {
        if is_query_line(line) {
            f(n, line)
        } else {
            line.to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_with_offsets() {
        let lines: Vec<_> = lines_with_offsets("ab\r\ncd\n\n// x").collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], Line { number: 2, start: 4, text: "cd" });
        assert!(!lines[2].is_query());
        assert!(!lines[3].is_query());
    }

    #[test]
    fn test_map_lines_keeps_terminators() {
        let out = map_lines("a\r\nb\nc", |_, line| line.to_uppercase());
        assert_eq!(out, "A\r\nB\nC");
    }

    #[test]
    fn test_map_query_lines_skips_comments() {
        let out = map_query_lines("// and\nand\n  ", |_, line| line.to_uppercase());
        assert_eq!(out, "// and\nAND\n  ");
    }
}
