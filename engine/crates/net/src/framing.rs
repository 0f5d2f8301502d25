/// Default cap on a single inbound line, in bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Splits a byte stream into newline-terminated UTF-8 payloads.
///
/// `\r` is ignored so both `\n` and `\r\n` peers work. Blank lines are
/// skipped. Bytes past `max_len` on one line are dropped.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    max_len: usize,
}

impl LineBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_len,
        }
    }

    /// Feed raw data into the buffer. Returns any complete lines.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in data {
            match byte {
                b'\n' => {
                    let line = self.take_line();
                    if !line.trim().is_empty() {
                        lines.push(line);
                    }
                }
                b'\r' => {}
                _ => {
                    if self.buf.len() < self.max_len {
                        self.buf.push(byte);
                    }
                }
            }
        }

        lines
    }

    /// Bytes of an unterminated line held so far.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn take_line(&mut self) -> String {
        let bytes = std::mem::take(&mut self.buf);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}
