//! Documentation text parsing: command summary and `:param:` help lines

/// Cleaned documentation attached to a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocText {
    text: String,
}

impl DocText {
    /// Clean raw documentation: drop surrounding blank lines and strip the
    /// common indentation of every line after the first.
    pub fn parse(raw: &str) -> Self {
        let mut lines: Vec<&str> = raw.lines().collect();
        let indent = lines
            .iter()
            .skip(1)
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);

        let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
        for (i, line) in lines.drain(..).enumerate() {
            if i == 0 {
                cleaned.push(line.trim().to_string());
            } else if line.trim().is_empty() {
                cleaned.push(String::new());
            } else {
                let body = line.get(indent..).unwrap_or_else(|| line.trim_start());
                cleaned.push(body.trim_end().to_string());
            }
        }

        while cleaned.first().map_or(false, |l| l.is_empty()) {
            cleaned.remove(0);
        }
        while cleaned.last().map_or(false, |l| l.is_empty()) {
            cleaned.pop();
        }

        Self {
            text: cleaned.join("\n"),
        }
    }

    /// Full cleaned text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text up to the first blank-line paragraph break.
    pub fn short(&self) -> &str {
        match self.text.find("\n\n") {
            Some(end) => &self.text[..end],
            None => &self.text,
        }
    }

    /// Help for `name`, taken from a `:name: text` line. Empty when absent.
    pub fn param_help(&self, name: &str) -> String {
        let marker = format!(":{}:", name);
        self.text
            .split_once(&marker)
            .map(|(_, rest)| rest.lines().next().unwrap_or("").trim().to_string())
            .unwrap_or_default()
    }
}
