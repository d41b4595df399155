//! In-memory output sink.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// A `Write` sink that keeps everything written to it.
///
/// Clones share the same buffer: hand one to an interpreter as its output
/// stream and read the other afterwards.
///
/// ```
/// use std::io::Write;
/// use rcmd_input::CaptureBuffer;
///
/// let capture = CaptureBuffer::new();
/// let mut sink = capture.clone();
/// write!(sink, "hello").unwrap();
/// assert_eq!(capture.contents(), "hello");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, decoded lossily as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }

    /// Discards everything written so far.
    pub fn clear(&self) {
        self.buf.borrow_mut().clear();
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_buffer() {
        let capture = CaptureBuffer::new();
        let mut a = capture.clone();
        let mut b = capture.clone();
        a.write_all(b"one ").unwrap();
        b.write_all(b"two").unwrap();
        assert_eq!(capture.contents(), "one two");

        capture.clear();
        assert_eq!(capture.contents(), "");
    }
}
