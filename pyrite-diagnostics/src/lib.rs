// Error system for the Pyrite compiler
// One error taxonomy is used across every stage of the pipeline; the driver
// renders errors with the source line and a caret marker.

use colored::Colorize;
use std::fmt;

pub mod source;
pub use source::SourceFile;

/// Which stage of the pipeline produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Lexing,
    Parse,
    Annotation,
    Analysis,
    Compile,
    Cycle,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Lexing => "LexingError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Annotation => "AnnotationError",
            ErrorKind::Analysis => "AnalysisError",
            ErrorKind::Compile => "CompileError",
            ErrorKind::Cycle => "CycleError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An error raised anywhere in the compiler core. `offset` is the byte
/// offset of the offending source location; `None` when indeterminate.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub offset: Option<usize>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, offset: Option<usize>) -> Self {
        Self {
            kind,
            message: message.into(),
            offset,
        }
    }

    pub fn lexing(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ErrorKind::Lexing, message, Some(offset))
    }

    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ErrorKind::Parse, message, Some(offset))
    }

    pub fn annotation(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ErrorKind::Annotation, message, Some(offset))
    }

    pub fn analysis(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ErrorKind::Analysis, message, Some(offset))
    }

    pub fn compile(message: impl Into<String>, offset: Option<usize>) -> Self {
        Self::new(ErrorKind::Compile, message, offset)
    }

    pub fn cycle(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cycle, message, None)
    }

    /// Attach an offset if the error doesn't carry one yet.
    pub fn at_offset(mut self, offset: usize) -> Self {
        if self.offset.is_none() {
            self.offset = Some(offset);
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Render an error the way the driver reports failures:
///
/// ```text
/// [module] failure at line 3 (offset 17): x changes type (from Int to Unicode)
/// >>> x = "s"
/// ---     ^
/// ```
pub fn render_error(module_name: &str, source: Option<&SourceFile>, err: &CompileError) -> String {
    let mut out = String::new();
    match (err.offset, source) {
        (Some(offset), Some(source)) => {
            let line_num = source.line_number_of_offset(offset).unwrap_or(1);
            out.push_str(&format!(
                "[{}] failure at line {} (offset {}): {}\n",
                module_name, line_num, offset, err.message
            ));
            if let Ok(line) = source.line(line_num) {
                out.push_str(&format!(">>> {}\n", String::from_utf8_lossy(line)));
                out.push_str("--- ");
                let spaces = offset.saturating_sub(source.line_offset(line_num).unwrap_or(offset));
                for _ in 0..spaces {
                    out.push(' ');
                }
                out.push_str("^\n");
            }
        }
        _ => {
            out.push_str(&format!(
                "[{}] failure at indeterminate location: {}\n",
                module_name, err.message
            ));
        }
    }
    out
}

/// Print an error to stderr with a colored severity prefix. The message is
/// expected to already carry the rendered failure block (the driver
/// attaches it); errors without one print as-is.
pub fn report(err: &CompileError) {
    eprintln!("{}: {}", "error".red().bold(), err.message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CompileError::analysis("x changes type", 4);
        assert_eq!(err.to_string(), "AnalysisError: x changes type");
        assert_eq!(err.offset, Some(4));
    }

    #[test]
    fn test_render_with_caret() {
        let source = SourceFile::from_code("x = 1\ny = oops\n");
        let err = CompileError::analysis("variable oops does not exist", 10);
        let rendered = render_error("__main__", Some(&source), &err);
        assert!(rendered.contains("[__main__] failure at line 2 (offset 10)"));
        assert!(rendered.contains(">>> y = oops"));
        assert!(rendered.contains("---     ^"));
    }

    #[test]
    fn test_render_indeterminate() {
        let err = CompileError::cycle("cyclic import dependency on module b");
        let rendered = render_error("a", None, &err);
        assert!(rendered.contains("indeterminate location"));
    }

    #[test]
    fn test_at_offset_does_not_overwrite() {
        let err = CompileError::analysis("nope", 3).at_offset(9);
        assert_eq!(err.offset, Some(3));
        let err = CompileError::cycle("nope").at_offset(9);
        assert_eq!(err.offset, Some(9));
    }
}
