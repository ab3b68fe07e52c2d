//! In-memory log sink for TUI mode
//!
//! `LogBuffer` implements `MakeWriter`, so the tracing subscriber writes
//! complete lines here instead of stderr while the alternate screen is up.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Lines kept between two drains. Older lines are dropped first.
const DEFAULT_CAPACITY: usize = 500;

#[derive(Clone)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, line: String) {
        // A poisoned lock still holds usable lines.
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Take every buffered line, oldest first.
    pub fn drain(&self) -> Vec<String> {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.drain(..).collect()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects bytes from one log event and forwards finished lines.
pub struct LineWriter {
    sink: LogBuffer,
    partial: Vec<u8>,
}

impl LineWriter {
    fn emit(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        self.sink.push(text.trim_end_matches(['\r', '\n']).to_string());
    }
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.partial.extend_from_slice(buf);
        while let Some(pos) = self.partial.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=pos).collect();
            self.emit(&line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.partial.is_empty() {
            let rest = std::mem::take(&mut self.partial);
            self.emit(&rest);
        }
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            sink: self.clone(),
            partial: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties() {
        let buf = LogBuffer::new();
        buf.push("POST https://api.test/api/query".to_string());
        assert_eq!(buf.drain(), vec!["POST https://api.test/api/query"]);
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn test_oldest_lines_dropped_at_capacity() {
        let buf = LogBuffer::with_capacity(3);
        for i in 0..5 {
            buf.push(format!("line {}", i));
        }
        assert_eq!(buf.drain(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_writer_splits_lines_and_flushes_tail_on_drop() {
        let buf = LogBuffer::new();
        {
            let mut writer = buf.make_writer();
            write!(writer, " INFO Credential stored\r\n WARN Failed to fetch").unwrap();
            assert_eq!(buf.drain(), vec![" INFO Credential stored"]);
        }
        assert_eq!(buf.drain(), vec![" WARN Failed to fetch"]);
    }
}
