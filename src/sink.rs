//! Append-only destinations for emitted lines.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Default log file for [`FileSink`]
pub const DEFAULT_LOG_FILE: &str = "braille_phrases.txt";

/// Receives each emitted line once
pub trait TextSink {
    /// Append one line
    fn append(&mut self, line: &str) -> Result<()>;
}

/// Appends lines to a text file, one per call
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Open `path` for appending, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Path being written
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextSink for FileSink {
    fn append(&mut self, line: &str) -> Result<()> {
        writeln!(self.file, "{line}")?;
        self.file.flush()?;
        Ok(())
    }
}

/// Keeps lines in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Lines in emission order
    pub lines: Vec<String>,
}

impl TextSink for MemorySink {
    fn append(&mut self, line: &str) -> Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TextSink for NullSink {
    fn append(&mut self, _line: &str) -> Result<()> {
        Ok(())
    }
}

impl<S: TextSink + ?Sized> TextSink for &mut S {
    fn append(&mut self, line: &str) -> Result<()> {
        (**self).append(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("braille_sink_{name}_{nanos}.txt"))
    }

    #[test]
    fn test_file_sink_appends() {
        let path = temp_path("append");
        {
            let mut sink = FileSink::open(&path).unwrap();
            sink.append("HELLO").unwrap();
        }
        {
            let mut sink = FileSink::open(&path).unwrap();
            assert_eq!(sink.path(), path.as_path());
            sink.append("WORLD").unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "HELLO\nWORLD\n");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_memory_sink_through_reference() {
        fn feed<S: TextSink>(mut sink: S, line: &str) {
            sink.append(line).unwrap();
        }
        let mut memory = MemorySink::default();
        feed(&mut memory, "a");
        memory.append("b").unwrap();
        assert_eq!(memory.lines, ["a", "b"]);
        assert!(NullSink.append("ignored").is_ok());
    }
}
