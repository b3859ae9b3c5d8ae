use crate::error::ShellError;
use std::{fs, path::Path};

/// The script being built, one probe/function/global per entry.
///
/// Line numbers are positions, so they shift down after a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptBuffer {
    lines: Vec<String>,
}

/// Splits text into lines, keeping blank lines and dropping the final newline.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_terminator('\n').map(str::to_string).collect()
}

/// Like [`split_lines`], with invalid UTF-8 replaced by U+FFFD.
pub fn split_lines_lossy(bytes: &[u8]) -> Vec<String> {
    split_lines(&String::from_utf8_lossy(bytes))
}

impl ScriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Removes 1-based line `number`.
    pub fn remove(&mut self, number: usize) -> Option<String> {
        if number == 0 || number > self.lines.len() {
            return None;
        }
        Some(self.lines.remove(number - 1))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn replace(&mut self, lines: Vec<String>) {
        self.lines = lines;
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// `N: line` rows, numbers right-aligned to the widest one.
    pub fn listing(&self) -> Vec<String> {
        let width = self.lines.len().to_string().len();
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>width$}: {line}", i + 1))
            .collect()
    }

    /// Appends a file's lines verbatim, returning how many were read.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, ShellError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            ShellError::io(
                format!("File '{}' couldn't be opened for reading", path.display()),
                e,
            )
        })?;
        let lines = split_lines_lossy(&bytes);
        let count = lines.len();
        self.lines.extend(lines);
        Ok(count)
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<(), ShellError> {
        let path = path.as_ref();
        let text = if self.lines.is_empty() {
            String::new()
        } else {
            format!("{}\n", self.text())
        };
        fs::write(path, text).map_err(|e| {
            ShellError::io(
                format!("File '{}' couldn't be opened for writing", path.display()),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(lines: &[&str]) -> ScriptBuffer {
        ScriptBuffer::from_lines(lines.iter().map(|l| l.to_string()).collect())
    }

    #[test]
    fn numbers_shift_after_remove() {
        let mut script = buffer(&["probe begin { exit() }", "probe end { printf(\"end\\n\") }"]);
        assert_eq!(script.remove(1).as_deref(), Some("probe begin { exit() }"));
        assert_eq!(script.listing(), vec!["1: probe end { printf(\"end\\n\") }"]);
        assert_eq!(script.remove(0), None);
        assert_eq!(script.remove(2), None);
        assert_eq!(script.len(), 1);
    }

    #[test]
    fn listing_pads_to_widest_number() {
        let lines: Vec<String> = (0..12).map(|i| format!("global g{i}")).collect();
        let listing = ScriptBuffer::from_lines(lines).listing();
        assert_eq!(listing[0], " 1: global g0");
        assert_eq!(listing[11], "12: global g11");
    }

    #[test]
    fn save_then_load_keeps_blank_lines_and_comments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("script.stp");
        let original = buffer(&["# trace reads", "", "probe syscall.read {", "  n++", "}", ""]);
        original.save_file(&path).expect("save");
        assert_eq!(
            fs::read_to_string(&path).expect("read back"),
            "# trace reads\n\nprobe syscall.read {\n  n++\n}\n\n"
        );

        let mut loaded = ScriptBuffer::new();
        assert_eq!(loaded.load_file(&path).expect("load"), 6);
        assert_eq!(loaded, original);
    }

    #[test]
    fn load_appends_to_existing_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("extra.stp");
        fs::write(&path, "probe end {}").expect("write");
        let mut script = buffer(&["global n"]);
        script.load_file(&path).expect("load");
        assert_eq!(script.lines(), ["global n", "probe end {}"]);
    }

    #[test]
    fn non_utf8_bytes_load_with_replacement() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("latin1.stp");
        fs::write(&path, b"# caf\xe9\nprobe begin { exit() }\n").expect("write");
        let mut script = ScriptBuffer::new();
        assert_eq!(script.load_file(&path).expect("load"), 2);
        assert_eq!(script.lines(), ["# caf\u{FFFD}", "probe begin { exit() }"]);
    }

    #[test]
    fn missing_file_reports_os_reason() {
        let mut script = ScriptBuffer::new();
        let err = script
            .load_file("/nonexistent/dir/script.stp")
            .expect_err("load must fail");
        let text = err.to_string();
        assert!(text.starts_with("File '/nonexistent/dir/script.stp' couldn't be opened for reading: "));
        assert!(script.is_empty());
    }

    #[test]
    fn empty_buffer_saves_empty_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.stp");
        ScriptBuffer::new().save_file(&path).expect("save");
        let mut loaded = ScriptBuffer::new();
        assert_eq!(loaded.load_file(&path).expect("load"), 0);
    }
}
