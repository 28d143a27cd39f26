use tracing::{debug, trace};

use crate::segment::SegmentMap;
use crate::{IncludeProvider, PreprocessError, ProcessedSource};

const INCLUDE_DIRECTIVE: &str = "#include";

/// Scanner states. `Done` is the only accepting state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    EmptyLine,
    Slash,
    LineComment,
    BlockComment1,
    BlockComment2,
    Include,
    Replace,
    Code,
    Done,
}

#[derive(Clone, Copy)]
enum Event<'s> {
    Char { c: char, rest: &'s str },
    Eof,
}

fn is_blank(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

/// State shared by every source unit of a single pass
struct Pass<'a> {
    output: &'a mut ProcessedSource,
    segments: &'a SegmentMap,
    include_provider: &'a mut dyn IncludeProvider,
    max_depth: usize,
}

// Directive line currently being replaced by its expansion.
#[derive(Clone, Copy, Default)]
struct Directive {
    line: usize,
    expanded: bool,
}

struct Scanner<'s, 'p, 'a> {
    key: &'s str,
    text: &'s str,
    pass: &'p mut Pass<'a>,
    depth: usize,
    line: usize,
    column: usize,
    directive: Directive,
}

impl<'s, 'p, 'a> Scanner<'s, 'p, 'a> {
    fn new(key: &'s str, text: &'s str, pass: &'p mut Pass<'a>, depth: usize) -> Self {
        // A nested unit starts wherever the enclosing one left the output line.
        let column = pass.output.line_width();
        Scanner {
            key,
            text,
            pass,
            depth,
            line: 0,
            column,
            directive: Directive::default(),
        }
    }

    fn print(&mut self, c: char) {
        self.pass.output.push(c);
        self.column += 1;
    }

    fn log_line(&mut self) {
        self.pass.output.end_line(self.key, self.line + 1);
        self.line += 1;
        self.column = 0;
    }

    fn flush_line(&mut self) {
        self.pass.output.flush_line(self.key, self.line + 1);
    }

    fn run(mut self) -> Result<(), PreprocessError> {
        let text = self.text;
        let mut state = State::EmptyLine;

        for (idx, c) in text.char_indices() {
            state = self.step(
                state,
                Event::Char {
                    c,
                    rest: &text[idx..],
                },
            )?;
        }
        state = self.step(state, Event::Eof)?;

        if state != State::Done {
            return Err(PreprocessError::PrematureTermination {
                key: self.key.to_owned(),
                state,
            });
        }

        Ok(())
    }

    fn step(&mut self, state: State, event: Event<'s>) -> Result<State, PreprocessError> {
        use State::*;

        let segments: &'a SegmentMap = self.pass.segments;
        let (c, rest) = match event {
            Event::Char { c, rest } => (c, rest),
            Event::Eof => return Ok(self.end_of_input(state)),
        };

        let next = match state {
            EmptyLine => {
                if is_blank(c) {
                    self.print(c);
                    EmptyLine
                } else if c == '\n' {
                    self.log_line();
                    EmptyLine
                } else if c == '/' {
                    self.print(c);
                    Slash
                } else if rest.starts_with(INCLUDE_DIRECTIVE) {
                    self.expand_include(rest)?;
                    Include
                } else if let Some(name) = segments.match_placeholder(rest) {
                    self.expand_placeholder(name)?;
                    Replace
                } else {
                    self.print(c);
                    Code
                }
            }
            Slash => match c {
                '/' => {
                    self.print(c);
                    LineComment
                }
                '*' => {
                    self.print(c);
                    BlockComment1
                }
                '\n' => {
                    self.log_line();
                    EmptyLine
                }
                _ => {
                    self.print(c);
                    Code
                }
            },
            LineComment => {
                if c == '\n' {
                    self.log_line();
                    EmptyLine
                } else {
                    self.print(c);
                    LineComment
                }
            }
            BlockComment1 => match c {
                '*' => {
                    self.print(c);
                    BlockComment2
                }
                '\n' => {
                    self.log_line();
                    BlockComment1
                }
                _ => {
                    self.print(c);
                    BlockComment1
                }
            },
            BlockComment2 => match c {
                '/' => {
                    self.print(c);
                    Code
                }
                '*' => {
                    self.print(c);
                    BlockComment2
                }
                '\n' => {
                    self.log_line();
                    BlockComment1
                }
                _ => {
                    self.print(c);
                    BlockComment1
                }
            },
            Include | Replace => {
                if c == '\n' {
                    self.finish_directive();
                    EmptyLine
                } else {
                    state
                }
            }
            Code => match c {
                '/' => {
                    self.print(c);
                    Slash
                }
                '\n' => {
                    self.log_line();
                    EmptyLine
                }
                _ => {
                    self.print(c);
                    Code
                }
            },
            Done => Done,
        };

        Ok(next)
    }

    fn end_of_input(&mut self, state: State) -> State {
        match state {
            State::EmptyLine | State::Slash | State::LineComment | State::Code => {
                self.flush_line();
                State::Done
            }
            State::Include | State::Replace => {
                // The line counter already moved past the directive.
                self.pass.output.flush_line(self.key, self.directive.line);
                State::Done
            }
            // No accepting transition out of an unterminated block comment.
            State::BlockComment1 | State::BlockComment2 => state,
            State::Done => State::Done,
        }
    }

    // The directive's own newline is only needed when the expansion left a
    // partial line, or when nothing was expanded in its place.
    fn finish_directive(&mut self) {
        if self.pass.output.is_mid_line() || !self.directive.expanded {
            self.pass.output.end_line(self.key, self.directive.line);
        }
        self.column = 0;
    }

    fn expand_include(&mut self, rest: &str) -> Result<(), PreprocessError> {
        let directive_line = self.line + 1;
        let directive = rest.split('\n').next().unwrap_or(rest);

        let path = directive[INCLUDE_DIRECTIVE.len()..]
            .split_once('"')
            .and_then(|(_, after_open)| after_open.split_once('"'))
            .map(|(path, _)| path)
            .ok_or_else(|| PreprocessError::MalformedInclude {
                key: self.key.to_owned(),
                line: directive_line,
            })?;

        let resolved = self
            .pass
            .include_provider
            .resolve_include(path)
            .map_err(|cause| PreprocessError::UnresolvedInclude {
                path: path.to_owned(),
                key: self.key.to_owned(),
                line: directive_line,
                cause,
            })?;

        let expanded = match resolved {
            Some(include) => {
                debug!(
                    key = self.key,
                    line = directive_line,
                    path,
                    resolved = %include.key,
                    "expanding include"
                );
                self.descend(&include.key, &include.source, directive_line)?;
                true
            }
            None => {
                trace!(
                    key = self.key,
                    line = directive_line,
                    path,
                    "skipping already included file"
                );
                false
            }
        };

        self.line += 1;
        self.directive = Directive {
            line: directive_line,
            expanded,
        };
        Ok(())
    }

    fn expand_placeholder(&mut self, name: &str) -> Result<(), PreprocessError> {
        let directive_line = self.line + 1;
        let segments: &'a SegmentMap = self.pass.segments;
        let indent = " ".repeat(self.column);

        let mut count = 0;
        for segment in segments.segments_for(name) {
            if count > 0 {
                if self.pass.output.is_mid_line() {
                    self.pass.output.end_line(self.key, directive_line);
                }
                self.pass.output.push_str(&indent);
            }

            let snippet = indent_snippet(&segment.snippet, &indent);
            self.descend(&segment.source_key(), &snippet, directive_line)?;
            count += 1;
        }

        debug!(
            key = self.key,
            line = directive_line,
            placeholder = name,
            segments = count,
            "injected segments"
        );

        self.line += 1;
        self.directive = Directive {
            line: directive_line,
            expanded: true,
        };
        Ok(())
    }

    /// Process a nested unit into the same output, blaming failures on `directive_line`.
    fn descend(
        &mut self,
        key: &str,
        text: &str,
        directive_line: usize,
    ) -> Result<(), PreprocessError> {
        let depth = self.depth + 1;
        if depth > self.pass.max_depth {
            return Err(PreprocessError::DepthLimitExceeded {
                key: self.key.to_owned(),
                line: directive_line,
                max_depth: self.pass.max_depth,
            });
        }

        Scanner::new(key, text, &mut *self.pass, depth)
            .run()
            .map_err(|inner| PreprocessError::Nested {
                key: self.key.to_owned(),
                line: directive_line,
                inner: Box::new(inner),
            })
    }
}

/// Pad every line after the first so the snippet lines up with its placeholder.
fn indent_snippet(snippet: &str, indent: &str) -> String {
    if indent.is_empty() {
        return snippet.to_owned();
    }

    let mut out = String::with_capacity(snippet.len());
    for (i, line) in snippet.split_inclusive('\n').enumerate() {
        if i > 0 && !line.trim_end_matches(|c| c == '\r' || c == '\n').is_empty() {
            out.push_str(indent);
        }
        out.push_str(line);
    }
    out
}

/// Preprocess `text`, appending the result and its line origins to `output`.
///
/// Includes are resolved through `include_provider`, and placeholder lines are
/// replaced by the matching entries of `segments`. Nested includes and segments
/// are processed recursively into the same `output`, up to `max_depth` levels.
///
/// On error, `output` holds a partial result and should be discarded.
pub fn parse_source(
    key: &str,
    text: &str,
    output: &mut ProcessedSource,
    segments: &SegmentMap,
    include_provider: &mut dyn IncludeProvider,
    max_depth: usize,
) -> Result<(), PreprocessError> {
    let mut pass = Pass {
        output,
        segments,
        include_provider,
        max_depth,
    };
    Scanner::new(key, text, &mut pass, 0).run()
}
