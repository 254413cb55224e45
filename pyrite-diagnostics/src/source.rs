// Source files with an offset <-> line index.
//
// A SourceFile owns the raw bytes of one module and a sorted list of line
// start offsets, so error reporting and the lexer can translate between
// byte offsets and 1-based line numbers.

use std::fs;
use std::io;
use std::path::Path;

/// Filename used for modules constructed from literal source text.
pub const IMMEDIATE_FILENAME: &str = "__imm__";

#[derive(Debug, Clone)]
pub struct SourceFile {
    filename: String,
    contents: Vec<u8>,
    line_begin_offsets: Vec<usize>,
}

impl SourceFile {
    /// Load a module's source from disk.
    pub fn open(filename: impl AsRef<Path>) -> io::Result<Self> {
        let filename = filename.as_ref();
        let contents = fs::read(filename)?;
        Ok(Self::build(filename.display().to_string(), contents))
    }

    /// Wrap literal source text (for `-c` code and tests). The filename is
    /// the `__imm__` sentinel.
    pub fn from_code(code: impl Into<String>) -> Self {
        Self::build(IMMEDIATE_FILENAME.to_string(), code.into().into_bytes())
    }

    fn build(filename: String, contents: Vec<u8>) -> Self {
        let mut line_begin_offsets = Vec::new();
        let mut last_line_start = 0;
        for (x, byte) in contents.iter().enumerate() {
            if *byte == b'\n' {
                line_begin_offsets.push(last_line_start);
                last_line_start = x + 1;
            }
        }
        line_begin_offsets.push(last_line_start);
        Self {
            filename,
            contents,
            line_begin_offsets,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.contents
    }

    /// The source as UTF-8 text. The lexer requires valid UTF-8 input.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.contents)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size(&self) -> usize {
        self.contents.len()
    }

    pub fn line_count(&self) -> usize {
        self.line_begin_offsets.len()
    }

    fn check_line_num(&self, line_num: usize) -> Result<(), OutOfRange> {
        if line_num == 0 {
            return Err(OutOfRange::ZeroLineNumber);
        }
        if line_num > self.line_begin_offsets.len() {
            return Err(OutOfRange::PastEndOfFile);
        }
        Ok(())
    }

    /// Contents of the given 1-based line, without the trailing newline.
    pub fn line(&self, line_num: usize) -> Result<&[u8], OutOfRange> {
        self.check_line_num(line_num)?;
        let line_start = self.line_begin_offsets[line_num - 1];
        let mut line_end = if line_num == self.line_begin_offsets.len() {
            self.contents.len()
        } else {
            self.line_begin_offsets[line_num]
        };
        while line_end > line_start && self.contents[line_end - 1] == b'\n' {
            line_end -= 1;
        }
        Ok(&self.contents[line_start..line_end])
    }

    /// Byte offset at which the given 1-based line starts.
    pub fn line_offset(&self, line_num: usize) -> Result<usize, OutOfRange> {
        self.check_line_num(line_num)?;
        Ok(self.line_begin_offsets[line_num - 1])
    }

    /// Byte offset just past the end of the given 1-based line.
    pub fn line_end_offset(&self, line_num: usize) -> Result<usize, OutOfRange> {
        self.check_line_num(line_num)?;
        if line_num == self.line_begin_offsets.len() {
            return Ok(self.contents.len());
        }
        // the -1 trims off the newline
        Ok(self.line_begin_offsets[line_num] - 1)
    }

    /// 1-based line number containing the given byte offset, or None if the
    /// offset is past the end of the file.
    pub fn line_number_of_offset(&self, offset: usize) -> Option<usize> {
        if offset >= self.contents.len() && !self.contents.is_empty() {
            return None;
        }
        let idx = self
            .line_begin_offsets
            .partition_point(|&start| start <= offset);
        Some(idx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OutOfRange {
    #[error("line numbers are 1-based, not 0-based")]
    ZeroLineNumber,
    #[error("line is beyond end of file")]
    PastEndOfFile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index() {
        let f = SourceFile::from_code("abc\ndef\n\nxyz");
        assert_eq!(f.line_count(), 4);
        assert_eq!(f.line(1).unwrap(), b"abc");
        assert_eq!(f.line(2).unwrap(), b"def");
        assert_eq!(f.line(3).unwrap(), b"");
        assert_eq!(f.line(4).unwrap(), b"xyz");
        assert_eq!(f.line_offset(2).unwrap(), 4);
        assert_eq!(f.line_end_offset(2).unwrap(), 7);
        assert_eq!(f.line_end_offset(4).unwrap(), 12);
    }

    #[test]
    fn test_line_number_of_offset() {
        let f = SourceFile::from_code("abc\ndef\nxyz\n");
        assert_eq!(f.line_number_of_offset(0), Some(1));
        assert_eq!(f.line_number_of_offset(3), Some(1));
        assert_eq!(f.line_number_of_offset(4), Some(2));
        assert_eq!(f.line_number_of_offset(7), Some(2));
        assert_eq!(f.line_number_of_offset(8), Some(3));
        assert_eq!(f.line_number_of_offset(11), Some(3));
        assert_eq!(f.line_number_of_offset(12), None);
    }

    #[test]
    fn test_range_errors() {
        let f = SourceFile::from_code("abc");
        assert_eq!(f.line(0), Err(OutOfRange::ZeroLineNumber));
        assert_eq!(f.line(2), Err(OutOfRange::PastEndOfFile));
        assert_eq!(f.line_offset(5), Err(OutOfRange::PastEndOfFile));
    }

    #[test]
    fn test_immediate_filename() {
        let f = SourceFile::from_code("pass\n");
        assert_eq!(f.filename(), IMMEDIATE_FILENAME);
        assert_eq!(f.size(), 5);
    }
}
