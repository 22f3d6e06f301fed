// output.rs -- Labelled, column-wrapped output

use colored::Colorize;

use crate::config::DEFAULT_MAXCOL;

/// Column where values start.
pub const LABEL_WIDTH: usize = 13;

#[derive(Debug, Clone)]
pub struct Formatter {
    pub maxcol: usize,
    pub colors: bool,
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter {
            maxcol: DEFAULT_MAXCOL,
            colors: true,
        }
    }
}

impl Formatter {
    pub fn new(maxcol: usize, colors: bool) -> Self {
        Formatter { maxcol, colors }
    }

    /// `label:` padded to the value column. Returns the text and its visible width.
    fn label(&self, label: &str) -> (String, usize) {
        if label.is_empty() {
            return (" ".repeat(LABEL_WIDTH), LABEL_WIDTH);
        }

        let width = label.len() + 1;
        let pad = LABEL_WIDTH.saturating_sub(width).max(1);
        let text = if self.colors {
            format!("{}:{}", label.green(), " ".repeat(pad))
        } else {
            format!("{}:{}", label, " ".repeat(pad))
        };
        (text, width + pad)
    }

    pub fn field(&self, label: &str, value: &str) -> String {
        let (label, _) = self.label(label);
        format!("{}{}", label, value).trim_end().to_string()
    }

    pub fn indented(&self, value: &str) -> String {
        format!("{}{}", " ".repeat(LABEL_WIDTH), value)
    }

    /// Space-separated `words` after `label`, continuing on indented lines
    /// once `maxcol` would be exceeded.
    pub fn wrapped<S: AsRef<str>>(&self, label: &str, words: &[S]) -> Vec<String> {
        let mut lines = Vec::new();
        let (mut line, mut width) = self.label(label);
        let mut empty = true;

        for word in words {
            let word = word.as_ref();
            let word_width = word.chars().count();
            if !empty && width + word_width >= self.maxcol {
                lines.push(line.trim_end().to_string());
                line = " ".repeat(LABEL_WIDTH);
                width = LABEL_WIDTH;
            }
            line.push_str(word);
            line.push(' ');
            width += word_width + 1;
            empty = false;
        }

        lines.push(line.trim_end().to_string());
        lines
    }

    pub fn highlight(&self, value: &str) -> String {
        if self.colors {
            value.blue().bold().to_string()
        } else {
            value.to_string()
        }
    }

    pub fn error(&self, message: &str) -> String {
        if self.colors {
            message.red().to_string()
        } else {
            message.to_string()
        }
    }
}
