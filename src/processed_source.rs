use crate::line_resolver::{LineNumberResolver, SourceLine};

/// Flattened shader source along with the origin of each of its lines
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct ProcessedSource {
    /// Source text, ready to be handed over to the shader compiler
    pub source: String,

    /// Origin of every line in `source`
    pub lines: LineNumberResolver,

    completed_lines: usize,
}

impl ProcessedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn into_parts(self) -> (String, LineNumberResolver) {
        (self.source, self.lines)
    }

    /// Origin of the output line at `output_line` (0-based).
    pub fn resolve_line(&self, output_line: usize) -> Option<&SourceLine> {
        self.lines.resolve_line(output_line)
    }

    pub(crate) fn push(&mut self, c: char) {
        debug_assert!(c != '\n');
        self.source.push(c);
    }

    pub(crate) fn push_str(&mut self, s: &str) {
        debug_assert!(!s.contains('\n'));
        self.source.push_str(s);
    }

    /// True when the last output line has not been terminated yet.
    pub(crate) fn is_mid_line(&self) -> bool {
        !self.source.is_empty() && !self.source.ends_with('\n')
    }

    /// Characters already on the last, unterminated output line.
    pub(crate) fn line_width(&self) -> usize {
        let start = self.source.rfind('\n').map_or(0, |i| i + 1);
        self.source[start..].chars().count()
    }

    // The first unit to complete or flush an output line owns it.
    fn attribute(&mut self, key: &str, line: usize) {
        if self.lines.len() == self.completed_lines {
            self.lines.add_line(key, line);
        }
    }

    /// Terminate the current output line, attributing it to `key:line` unless already attributed.
    pub(crate) fn end_line(&mut self, key: &str, line: usize) {
        self.attribute(key, line);
        self.source.push('\n');
        self.completed_lines += 1;
    }

    /// Attribute a trailing partial line at the end of a source unit.
    pub(crate) fn flush_line(&mut self, key: &str, line: usize) {
        if self.is_mid_line() {
            self.attribute(key, line);
        }
    }

    /// Listing of the output with the file name and line of origin in front of every line.
    pub fn annotated(&self) -> String {
        let file_name = |key: &str| key.rsplit('/').next().unwrap_or(key).to_owned();

        let width = self
            .lines
            .iter()
            .map(|l| file_name(&l.key).len())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for (i, text) in self.source.lines().enumerate() {
            let (file, line) = match self.lines.resolve_line(i) {
                Some(origin) => (file_name(&origin.key), origin.line),
                None => (String::new(), 0),
            };
            out.push_str(&format!(
                "{:<width$}{:>4}: {}\n",
                file,
                line,
                text,
                width = width + 1
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attribution_wins() {
        let mut out = ProcessedSource::new();
        out.push_str("  ");
        out.push('b');
        out.flush_line("inner", 1);
        out.end_line("outer", 7);
        out.push('c');
        out.flush_line("outer", 8);

        assert_eq!(out.as_str(), "  b\nc");
        assert_eq!(out.line_width(), 1);
        assert_eq!(out.lines.len(), 2);
        assert_eq!(out.resolve_line(0).unwrap().key, "inner");
        assert_eq!(out.resolve_line(1).unwrap().line, 8);

        let (source, lines) = out.into_parts();
        assert_eq!(source, "  b\nc");
        assert_eq!(lines.iter().map(|l| l.line).collect::<Vec<_>>(), vec![1, 8]);
    }

    #[test]
    fn flush_at_line_start_is_noop() {
        let mut out = ProcessedSource::new();
        out.flush_line("a", 1);
        assert!(out.lines.is_empty());

        out.push('x');
        out.end_line("a", 1);
        out.flush_line("a", 2);
        assert_eq!(out.lines.len(), 1);
    }

    #[test]
    fn annotated_listing() {
        let mut out = ProcessedSource::new();
        out.push('a');
        out.end_line("shaders/main.frag", 1);
        out.push('b');
        out.end_line("lib.glsl", 12);

        assert_eq!(
            out.annotated(),
            "main.frag    1: a\nlib.glsl    12: b\n"
        );
    }
}
