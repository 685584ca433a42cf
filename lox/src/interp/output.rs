//! Output sink for `print`
//!
//! Evaluation is strictly synchronous, so a RefCell buffer is enough
//! for capture; no locking is needed.

use std::cell::RefCell;

/// Destination for interpreter output
#[derive(Debug)]
pub enum OutputSink {
    /// Write lines to stdout (default)
    Stdout,
    /// Capture lines in a buffer, for tests and tooling
    Buffer(RefCell<String>),
}

impl OutputSink {
    /// Create a capturing sink
    pub fn buffer() -> Self {
        OutputSink::Buffer(RefCell::new(String::new()))
    }

    /// Write one line
    pub fn writeln(&self, msg: &str) {
        match self {
            OutputSink::Stdout => println!("{msg}"),
            OutputSink::Buffer(buf) => {
                let mut buf = buf.borrow_mut();
                buf.push_str(msg);
                buf.push('\n');
            }
        }
    }

    /// Get captured output; empty for the stdout sink
    pub fn captured(&self) -> String {
        match self {
            OutputSink::Stdout => String::new(),
            OutputSink::Buffer(buf) => buf.borrow().clone(),
        }
    }

    /// Clear captured output
    pub fn clear(&self) {
        if let OutputSink::Buffer(buf) = self {
            buf.borrow_mut().clear();
        }
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        OutputSink::Stdout
    }
}
