use crate::scanner::State;

pub type BoxedIncludeProviderError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    /// `#include` without a complete `"path"` on the same line
    #[error("malformed include directive: {key:?} ({line:?})")]
    MalformedInclude { key: String, line: usize },

    /// Any error reported by the user-supplied `IncludeProvider`
    #[error(
        "include provider error: \"{cause}\" when trying to include {path:?}; triggered in {key:?} ({line:?})"
    )]
    UnresolvedInclude {
        /// Path as written in the directive
        path: String,

        /// Source unit containing the directive
        key: String,

        /// Line of the directive in `key`
        line: usize,

        cause: BoxedIncludeProviderError,
    },

    /// The scanner ran out of input outside of an accepting state
    #[error("premature termination of {key:?} in scanner state {state:?}")]
    PrematureTermination { key: String, state: State },

    /// Includes or segments nested deeper than the configured limit, usually a cycle
    #[error("nesting deeper than {max_depth} levels; triggered in {key:?} ({line:?})")]
    DepthLimitExceeded {
        key: String,
        line: usize,
        max_depth: usize,
    },

    /// Failure inside an expanded include or segment, along with the directive which expanded it
    #[error("{inner}\n    at {key}:{line}")]
    Nested {
        key: String,
        line: usize,
        inner: Box<PreprocessError>,
    },
}

impl PreprocessError {
    /// The original failure, with all `Nested` wrappers peeled off.
    pub fn innermost(&self) -> &PreprocessError {
        let mut err = self;
        while let PreprocessError::Nested { inner, .. } = err {
            err = inner;
        }
        err
    }

    /// `(key, line)` of every directive the failure travelled through, outermost first.
    pub fn trail(&self) -> Vec<(&str, usize)> {
        let mut trail = Vec::new();
        let mut err = self;
        while let PreprocessError::Nested { key, line, inner } = err {
            trail.push((key.as_str(), *line));
            err = inner;
        }
        trail
    }
}

/// Errors produced by the include providers shipped with this crate
#[derive(Debug, thiserror::Error)]
pub enum IncludeProviderError {
    #[error("{path:?} not found in any of the search paths")]
    NotFound { path: String },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}
