/// Origin of a single line of preprocessed output
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SourceLine {
    /// Source unit the line came from: a file, an include, or a segment snippet
    pub key: String,

    /// 1-based line within `key`
    pub line: usize,
}

/// Maps every line of preprocessed output back to where it came from.
///
/// Entries are indexed by 0-based output line, and only ever appended
/// while a source is being processed.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct LineNumberResolver {
    lines: Vec<SourceLine>,
}

impl LineNumberResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_line(&mut self, key: &str, line: usize) {
        self.lines.push(SourceLine {
            key: key.to_owned(),
            line,
        });
    }

    /// Origin of the output line at `output_line` (0-based).
    pub fn resolve_line(&self, output_line: usize) -> Option<&SourceLine> {
        self.lines.get(output_line)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceLine> {
        self.lines.iter()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl<'a> IntoIterator for &'a LineNumberResolver {
    type Item = &'a SourceLine;
    type IntoIter = std::slice::Iter<'a, SourceLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
