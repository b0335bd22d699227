//! Line-numbered reading of trace input.

use rewind_core::{CoreError, CoreResult};
use std::io::BufRead;

/// Sequential reader yielding `(line_number, line)` pairs
///
/// Line numbers are one-based. Line terminators are stripped.
pub struct TraceLines<R> {
    reader: R,
    source: String,
    line_number: usize,
    buffer: String,
}

impl<R: BufRead> TraceLines<R> {
    /// Wrap a buffered reader; `source` names it in I/O errors
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            source: source.into(),
            line_number: 0,
            buffer: String::new(),
        }
    }

    /// Number of lines read so far
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next line
    ///
    /// # Errors
    ///
    /// Returns `Io` if the underlying reader fails or the input is not UTF-8
    pub fn next_line(&mut self) -> CoreResult<Option<(usize, &str)>> {
        self.buffer.clear();
        let read = self
            .reader
            .read_line(&mut self.buffer)
            .map_err(|err| CoreError::io(&self.source, &err))?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        let line = self.buffer.trim_end_matches(['\r', '\n']);
        Ok(Some((self.line_number, line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Seek, SeekFrom, Write};

    #[test]
    fn test_lines_are_numbered() {
        let mut lines = TraceLines::new(Cursor::new("a\nb\r\nc"), "mem");
        assert_eq!(lines.next_line().unwrap(), Some((1, "a")));
        assert_eq!(lines.next_line().unwrap(), Some((2, "b")));
        assert_eq!(lines.next_line().unwrap(), Some((3, "c")));
        assert_eq!(lines.next_line().unwrap(), None);
        assert_eq!(lines.line_number(), 3);
    }

    #[test]
    fn test_empty_input() {
        let mut lines = TraceLines::new(Cursor::new(""), "mem");
        assert_eq!(lines.next_line().unwrap(), None);
    }

    #[test]
    fn test_blank_line_is_yielded() {
        let mut lines = TraceLines::new(Cursor::new("\nx\n"), "mem");
        assert_eq!(lines.next_line().unwrap(), Some((1, "")));
        assert_eq!(lines.next_line().unwrap(), Some((2, "x")));
    }

    #[test]
    fn test_invalid_utf8_is_io_error() {
        let mut lines = TraceLines::new(Cursor::new(vec![0xff, 0xfe, b'\n']), "bad.trace");
        let err = lines.next_line().unwrap_err();
        assert!(matches!(err, CoreError::Io { ref path, .. } if path == "bad.trace"));
    }

    #[test]
    fn test_reads_file() {
        let mut file = tempfile::tempfile().unwrap();
        writeln!(file, "10 : T 3 0x1(3) -> 0x2(4)").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        let mut lines = TraceLines::new(std::io::BufReader::new(file), "trace");
        let (n, line) = lines.next_line().unwrap().unwrap();
        assert_eq!(n, 1);
        assert!(line.starts_with("10 : T 3"));
    }
}
