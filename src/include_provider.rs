use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::{BoxedIncludeProviderError, IncludeProviderError};

/// Source text returned for an include directive
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ResolvedInclude {
    /// Key under which lines of `source` are reported
    pub key: String,
    pub source: String,
}

/// User-supplied include reader.
///
/// `Ok(None)` means the path was already included during this pass, and the
/// directive is silently dropped. Errors abort the whole pass.
pub trait IncludeProvider {
    fn resolve_include(
        &mut self,
        path: &str,
    ) -> Result<Option<ResolvedInclude>, BoxedIncludeProviderError>;
}

impl<F> IncludeProvider for F
where
    F: FnMut(&str) -> Result<Option<ResolvedInclude>, BoxedIncludeProviderError>,
{
    fn resolve_include(
        &mut self,
        path: &str,
    ) -> Result<Option<ResolvedInclude>, BoxedIncludeProviderError> {
        self(path)
    }
}

/// Includes served from memory; each key is handed out once until `reset`.
#[derive(Default, Debug)]
pub struct MemoryIncludeProvider {
    sources: HashMap<String, String>,
    included: HashSet<String>,
}

impl MemoryIncludeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(key.into(), source.into());
    }

    /// Forget which keys were already included, e.g. before processing another shader stage.
    pub fn reset(&mut self) {
        self.included.clear();
    }
}

impl<K, S> FromIterator<(K, S)> for MemoryIncludeProvider
where
    K: Into<String>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, S)>>(iter: I) -> Self {
        let mut provider = Self::new();
        for (key, source) in iter {
            provider.insert(key, source);
        }
        provider
    }
}

impl IncludeProvider for MemoryIncludeProvider {
    fn resolve_include(
        &mut self,
        path: &str,
    ) -> Result<Option<ResolvedInclude>, BoxedIncludeProviderError> {
        let source = self
            .sources
            .get(path)
            .ok_or_else(|| IncludeProviderError::NotFound {
                path: path.to_owned(),
            })?;

        if !self.included.insert(path.to_owned()) {
            return Ok(None);
        }

        Ok(Some(ResolvedInclude {
            key: path.to_owned(),
            source: source.clone(),
        }))
    }
}

/// Includes read from disk, looked up in each search path in turn.
#[derive(Default, Debug)]
pub struct FileIncludeProvider {
    search_paths: Vec<PathBuf>,
    included: HashSet<PathBuf>,
}

impl FileIncludeProvider {
    pub fn new(search_paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
            included: HashSet::new(),
        }
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn reset(&mut self) {
        self.included.clear();
    }
}

impl IncludeProvider for FileIncludeProvider {
    fn resolve_include(
        &mut self,
        path: &str,
    ) -> Result<Option<ResolvedInclude>, BoxedIncludeProviderError> {
        let found = self
            .search_paths
            .iter()
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| IncludeProviderError::NotFound {
                path: path.to_owned(),
            })?;

        // Canonical, so the same file reached through different search paths is included once.
        let canonical = found
            .canonicalize()
            .map_err(|source| IncludeProviderError::Io {
                path: path.to_owned(),
                source,
            })?;

        if self.included.contains(&canonical) {
            return Ok(None);
        }

        let source =
            std::fs::read_to_string(&canonical).map_err(|source| IncludeProviderError::Io {
                path: path.to_owned(),
                source,
            })?;

        self.included.insert(canonical);

        Ok(Some(ResolvedInclude {
            key: found.to_string_lossy().into_owned(),
            source,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_provider_hands_out_once() {
        let mut provider: MemoryIncludeProvider = [("a.glsl", "int a;")].into_iter().collect();

        let first = provider.resolve_include("a.glsl").unwrap();
        assert_eq!(
            first,
            Some(ResolvedInclude {
                key: "a.glsl".to_string(),
                source: "int a;".to_string()
            })
        );
        assert_eq!(provider.resolve_include("a.glsl").unwrap(), None);

        provider.reset();
        assert!(provider.resolve_include("a.glsl").unwrap().is_some());
    }

    #[test]
    fn memory_provider_unknown_path() {
        let mut provider = MemoryIncludeProvider::new();
        let err = provider.resolve_include("nope.glsl").unwrap_err();
        assert!(err.to_string().contains("nope.glsl"));
    }

    #[test]
    fn file_provider_search_order() -> anyhow::Result<()> {
        let first = tempfile::tempdir()?;
        let second = tempfile::tempdir()?;
        std::fs::write(second.path().join("common.glsl"), "float second;\n")?;
        std::fs::write(second.path().join("only.glsl"), "float only;\n")?;
        std::fs::write(first.path().join("common.glsl"), "float first;\n")?;

        let mut provider = FileIncludeProvider::new([first.path(), second.path()]);
        assert_eq!(provider.search_paths().len(), 2);

        let common = provider.resolve_include("common.glsl").unwrap().unwrap();
        assert_eq!(common.source, "float first;\n");
        assert!(common.key.ends_with("common.glsl"));

        let only = provider.resolve_include("only.glsl").unwrap().unwrap();
        assert_eq!(only.source, "float only;\n");

        assert!(provider.resolve_include("common.glsl").unwrap().is_none());
        assert!(provider.resolve_include("missing.glsl").is_err());
        Ok(())
    }
}
