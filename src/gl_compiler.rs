//! Shader compilers report errors against the flattened source they were given,
//! so their logs reference line numbers which mean nothing to the author.
//! On top of that, the log output format is vendor-specific.
//!
//! This module rewrites compiler logs using the [`LineNumberResolver`] recorded during
//! preprocessing. Both the NVIDIA style (`0(12) : error ...`) and the Intel/AMD style
//! (`ERROR: 0:12: ...`) are recognized, and their locations replaced with `key(line)`.
//!
//! `compile_shader` wraps a user-provided compiler callback:
//!
//! ```rust
//! use shader_splice::gl_compiler::{compile_shader, ShaderCompilerOutput};
//! use shader_splice::{MemoryIncludeProvider, SegmentRegistry};
//!
//! let processed = shader_splice::process_source(
//!     "main.frag",
//!     "void main() {\n    oops;\n}\n",
//!     &SegmentRegistry::new(),
//!     &mut MemoryIncludeProvider::new(),
//! )
//! .unwrap();
//!
//! let compiled = compile_shader(&processed, |_source| ShaderCompilerOutput {
//!     artifact: None::<u32>,
//!     log: Some("ERROR: 0:2: 'oops' : undeclared identifier".to_string()),
//! });
//!
//! assert_eq!(
//!     compiled.log.as_deref(),
//!     Some("ERROR: main.frag(2): 'oops' : undeclared identifier")
//! );
//! ```

use crate::{LineNumberResolver, ProcessedSource};

/// User-defined output of the shader compiler, along with an info log.
pub struct ShaderCompilerOutput<Artifact> {
    pub artifact: Artifact,
    pub log: Option<String>,
}

/// Compile `processed` via a user-provided shader compiler callback.
///
/// `Artifact` is a user-defined output of the shader compiler, e.g. `Option<GLuint>`.
///
/// `compiler_fn` receives the flattened source and creates a `ShaderCompilerOutput`,
/// whose log is returned with locations mapped back to the original sources.
pub fn compile_shader<Artifact, CompilerFn>(
    processed: &ProcessedSource,
    compiler_fn: CompilerFn,
) -> ShaderCompilerOutput<Artifact>
where
    CompilerFn: FnOnce(&str) -> ShaderCompilerOutput<Artifact>,
{
    let compiler_output = compiler_fn(processed.as_str());

    ShaderCompilerOutput {
        artifact: compiler_output.artifact,
        log: compiler_output
            .log
            .map(|log| resolve_log(&processed.lines, &log)),
    }
}

/// Rewrite `(string, line)` locations in a compiler log into `key(line)`.
///
/// Compiler line `N` refers to output line `N - 1` of the resolver. Locations
/// outside of the recorded output are left untouched.
pub fn resolve_log(lines: &LineNumberResolver, log: &str) -> String {
    lazy_static::lazy_static! {
        static ref INTEL_AMD_ERROR_RE: regex::Regex = regex::Regex::new(r"(?m)^(ERROR|WARNING):\s*(\d+):(\d+)").unwrap();
    }

    lazy_static::lazy_static! {
        static ref NV_ERROR_RE: regex::Regex = regex::Regex::new(r"(?m)^(\d+)\((\d+)\)").unwrap();
    }

    let locate = |line: &str| -> Option<String> {
        let line = line.parse::<usize>().ok()?;
        let origin = lines.resolve_line(line.checked_sub(1)?)?;
        Some(format!("{}({})", origin.key, origin.line))
    };

    let log = INTEL_AMD_ERROR_RE.replace_all(log, |captures: &regex::Captures| {
        match locate(&captures[3]) {
            Some(location) => format!("{}: {}", &captures[1], location),
            None => captures[0].to_owned(),
        }
    });

    NV_ERROR_RE
        .replace_all(&log, |captures: &regex::Captures| {
            locate(&captures[2]).unwrap_or_else(|| captures[0].to_owned())
        })
        .into_owned()
}
