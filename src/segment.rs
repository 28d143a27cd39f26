use std::collections::BTreeMap;

/// Priority given to segments which don't ask for a specific one
pub const DEFAULT_PRIORITY: usize = 1000;

/// Injection point for shader segments.
///
/// A source line whose trimmed content equals `name` is replaced by all the
/// segments registered for the placeholder.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Placeholder {
    pub name: String,
    pub scope: String,
}

impl Placeholder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: String::new(),
        }
    }

    pub fn with_scope(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: scope.into(),
        }
    }
}

/// Named snippet of code injected at a `Placeholder`
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ShaderSegment {
    pub placeholder: Placeholder,
    pub name: String,

    /// Segments sharing a placeholder are emitted in ascending priority
    pub priority: usize,
    pub snippet: String,
}

impl ShaderSegment {
    pub fn new(
        placeholder: Placeholder,
        name: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            placeholder,
            name: name.into(),
            priority: DEFAULT_PRIORITY,
            snippet: snippet.into(),
        }
    }

    pub fn with_priority(mut self, priority: usize) -> Self {
        self.priority = priority;
        self
    }

    /// Key under which the snippet's lines are reported, e.g. `setup[#pragma SETUP,1000]`.
    pub fn source_key(&self) -> String {
        format!(
            "{}[{},{}]",
            self.name, self.placeholder.name, self.priority
        )
    }
}

/// Segments registered by the user ahead of preprocessing
#[derive(Clone, Default, Debug)]
pub struct SegmentRegistry {
    segments: Vec<ShaderSegment>,
}

impl SegmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, segment: ShaderSegment) {
        self.segments.push(segment);
    }

    /// Remove every segment called `name`, returning how many were dropped.
    pub fn remove_segments(&mut self, name: &str) -> usize {
        let before = self.segments.len();
        self.segments.retain(|s| s.name != name);
        before - self.segments.len()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn segments(&self) -> &[ShaderSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Snapshot of the registered segments, grouped by placeholder and ordered by priority.
    pub fn grouped(&self) -> SegmentMap {
        SegmentMap::new(self.segments.iter().cloned())
    }
}

/// Read-only view of the segments used during a single preprocessing pass
#[derive(Clone, Default, Debug)]
pub struct SegmentMap {
    by_placeholder: BTreeMap<Placeholder, Vec<ShaderSegment>>,

    // Distinct placeholder names, longest first.
    names: Vec<String>,
}

impl SegmentMap {
    pub fn new(segments: impl IntoIterator<Item = ShaderSegment>) -> Self {
        let mut segments: Vec<ShaderSegment> = segments.into_iter().collect();

        // Stable, so equal priorities keep registration order.
        segments.sort_by(|a, b| {
            (&a.placeholder, a.priority).cmp(&(&b.placeholder, b.priority))
        });

        let mut by_placeholder: BTreeMap<Placeholder, Vec<ShaderSegment>> = BTreeMap::new();
        for segment in segments {
            by_placeholder
                .entry(segment.placeholder.clone())
                .or_default()
                .push(segment);
        }

        let mut names: Vec<String> = by_placeholder.keys().map(|p| p.name.clone()).collect();
        names.dedup();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Self {
            by_placeholder,
            names,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_placeholder.is_empty()
    }

    /// Placeholder name matching the line which starts at `rest`, if any.
    pub fn match_placeholder(&self, rest: &str) -> Option<&str> {
        if self.names.is_empty() {
            return None;
        }

        let line = rest.split('\n').next().unwrap_or(rest).trim_end();
        self.names
            .iter()
            .find(|name| !name.is_empty() && line == name.as_str())
            .map(|name| name.as_str())
    }

    /// Segments to inject for the placeholder `name`, in emission order.
    pub fn segments_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ShaderSegment> + 'a {
        self.by_placeholder
            .iter()
            .filter(move |(placeholder, _)| placeholder.name == name)
            .flat_map(|(_, segments)| segments.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names<'a>(map: &'a SegmentMap, placeholder: &'a str) -> Vec<&'a str> {
        map.segments_for(placeholder)
            .map(|s| s.name.as_str())
            .collect()
    }

    #[test]
    fn ordered_by_priority_then_registration() {
        let ph = Placeholder::new("#pragma BODY");
        let mut registry = SegmentRegistry::new();
        registry.add_segment(ShaderSegment::new(ph.clone(), "late", "").with_priority(20));
        registry.add_segment(ShaderSegment::new(ph.clone(), "first", "").with_priority(10));
        registry.add_segment(ShaderSegment::new(ph.clone(), "second", "").with_priority(10));
        registry.add_segment(ShaderSegment::new(ph, "default", ""));

        let map = registry.grouped();
        assert_eq!(
            names(&map, "#pragma BODY"),
            vec!["first", "second", "late", "default"]
        );
    }

    #[test]
    fn scopes_expand_in_order() {
        let mut registry = SegmentRegistry::new();
        registry.add_segment(ShaderSegment::new(
            Placeholder::with_scope("#pragma X", "b"),
            "in_b",
            "",
        ));
        registry.add_segment(
            ShaderSegment::new(Placeholder::with_scope("#pragma X", "a"), "in_a", "")
                .with_priority(5000),
        );

        let map = registry.grouped();
        assert_eq!(names(&map, "#pragma X"), vec!["in_a", "in_b"]);
    }

    #[test]
    fn remove_and_clear() {
        let ph = Placeholder::new("#pragma P");
        let mut registry = SegmentRegistry::new();
        registry.add_segment(ShaderSegment::new(ph.clone(), "a", "x"));
        registry.add_segment(ShaderSegment::new(ph.clone(), "b", "y"));
        registry.add_segment(ShaderSegment::new(ph, "a", "z"));

        assert_eq!(registry.remove_segments("a"), 2);
        assert_eq!(registry.segments().len(), 1);
        assert_eq!(registry.remove_segments("missing"), 0);

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.grouped().is_empty());
    }

    #[test]
    fn placeholder_matches_whole_line() {
        let mut registry = SegmentRegistry::new();
        registry.add_segment(ShaderSegment::new(Placeholder::new("#pragma FOO"), "a", ""));
        registry.add_segment(ShaderSegment::new(
            Placeholder::new("#pragma FOO_BAR"),
            "b",
            "",
        ));
        let map = registry.grouped();

        assert_eq!(map.match_placeholder("#pragma FOO\nrest"), Some("#pragma FOO"));
        assert_eq!(map.match_placeholder("#pragma FOO  \r\n"), Some("#pragma FOO"));
        assert_eq!(map.match_placeholder("#pragma FOO_BAR"), Some("#pragma FOO_BAR"));
        assert_eq!(map.match_placeholder("#pragma FOOD"), None);
        assert_eq!(map.match_placeholder("#pragma FOO x"), None);
    }

    #[test]
    fn source_key_format() {
        let segment =
            ShaderSegment::new(Placeholder::new("#pragma SETUP"), "setup", "").with_priority(7);
        assert_eq!(segment.source_key(), "setup[#pragma SETUP,7]");
    }
}
