//! **shader-splice** flattens a shader source into a single string ready for the
//! compiler, while remembering where every output line came from.
//!
//! Two kinds of directives are expanded:
//!
//! * `#include "path"` pulls in text from a user-driven [`IncludeProvider`],
//!   which enables custom virtual file systems and search paths. Providers
//!   signal files which were already included, so each one ends up in the
//!   output only once.
//! * Placeholder lines, e.g. `#pragma MATERIAL_SETUP`, are replaced by all the
//!   [`ShaderSegment`]s registered for them, ordered by priority.
//!
//! Included files and segment snippets may contain further directives.
//! Everything else, comments included, is copied verbatim, so other
//! preprocessor directives can be handled by the shader compiler.
//!
//! The resulting [`ProcessedSource`] carries a [`LineNumberResolver`] which maps
//! line numbers reported by the compiler back to the original files.
//!
//! # Example
//!
//! ```rust
//! use shader_splice::{MemoryIncludeProvider, Placeholder, SegmentRegistry, ShaderSegment};
//!
//! let mut includes: MemoryIncludeProvider =
//!     [("common.glsl", "float sq(float x) { return x * x; }\n")]
//!         .into_iter()
//!         .collect();
//!
//! let mut segments = SegmentRegistry::new();
//! segments.add_segment(ShaderSegment::new(
//!     Placeholder::new("#pragma SETUP"),
//!     "tint",
//!     "color *= 0.5;",
//! ));
//!
//! let main = "#include \"common.glsl\"\nvoid main() {\n    #pragma SETUP\n}\n";
//! let processed =
//!     shader_splice::process_source("main.frag", main, &segments, &mut includes).unwrap();
//!
//! assert_eq!(
//!     processed.as_str(),
//!     "float sq(float x) { return x * x; }\nvoid main() {\n    color *= 0.5;\n}\n"
//! );
//! assert_eq!(processed.resolve_line(0).unwrap().key, "common.glsl");
//! assert_eq!(processed.resolve_line(2).unwrap().key, "tint[#pragma SETUP,1000]");
//! ```

mod error;
#[cfg(feature = "gl_compiler")]
pub mod gl_compiler;
mod include_provider;
mod line_resolver;
mod processed_source;
mod scanner;
mod segment;


pub use error::*;
pub use include_provider::*;
pub use line_resolver::*;
pub use processed_source::*;
pub use scanner::{parse_source, State};
pub use segment::*;

use tracing::debug;

/// Nesting limit for includes and segments used by [`Preprocessor::default`]
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Configurable entry point for preprocessing
#[derive(Clone, Copy, Debug)]
pub struct Preprocessor {
    max_depth: usize,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum nesting of includes and segment snippets. Cyclic definitions fail once they reach it.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Process `text`, known as `key`, and then any code recursively referenced.
    pub fn process(
        &self,
        key: &str,
        text: &str,
        segments: &SegmentRegistry,
        include_provider: &mut dyn IncludeProvider,
    ) -> Result<ProcessedSource, PreprocessError> {
        let segments = segments.grouped();
        let mut output = ProcessedSource::new();

        parse_source(
            key,
            text,
            &mut output,
            &segments,
            include_provider,
            self.max_depth,
        )?;

        debug!(key, lines = output.lines.len(), "preprocessed shader source");
        Ok(output)
    }

    /// Process the file at `path`, reading it and everything it includes through `include_provider`.
    pub fn process_file(
        &self,
        path: &str,
        segments: &SegmentRegistry,
        include_provider: &mut dyn IncludeProvider,
    ) -> Result<ProcessedSource, PreprocessError> {
        let resolved = include_provider.resolve_include(path).map_err(|cause| {
            PreprocessError::UnresolvedInclude {
                path: path.to_owned(),
                key: String::new(),
                line: 0,
                cause,
            }
        })?;

        match resolved {
            Some(entry) => self.process(&entry.key, &entry.source, segments, include_provider),
            None => Ok(ProcessedSource::new()),
        }
    }
}

/// Process `text` with the default [`Preprocessor`] settings.
pub fn process_source(
    key: &str,
    text: &str,
    segments: &SegmentRegistry,
    include_provider: &mut dyn IncludeProvider,
) -> Result<ProcessedSource, PreprocessError> {
    Preprocessor::default().process(key, text, segments, include_provider)
}

/// Process a single file, and then any code recursively referenced.
///
/// `include_provider` is used to read all of the files, including the one at `path`.
pub fn process_file(
    path: &str,
    segments: &SegmentRegistry,
    include_provider: &mut dyn IncludeProvider,
) -> Result<ProcessedSource, PreprocessError> {
    Preprocessor::default().process_file(path, segments, include_provider)
}
