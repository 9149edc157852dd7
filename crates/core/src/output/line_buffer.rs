// crates/core/src/output/line_buffer.rs
//! Reassembles complete lines from arbitrarily split output chunks.

/// Accumulates raw output bytes and hands back only complete lines.
///
/// A chunk may end mid-line (or mid UTF-8 sequence) or carry several
/// lines; the incomplete tail is held until the next chunk or
/// [`LineBuffer::finish`] completes it. Both `\n` and `\r` terminate a
/// line, since progress bars redraw with `\r`. Decoding is lossy and
/// happens only at line boundaries, which are always ASCII.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return the text of every line it completed,
    /// terminators included. Empty when the chunk completed nothing.
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.partial.extend_from_slice(chunk);
        match self.partial.iter().rposition(|&b| b == b'\n' || b == b'\r') {
            Some(idx) => {
                let tail = self.partial.split_off(idx + 1);
                let complete = std::mem::replace(&mut self.partial, tail);
                String::from_utf8_lossy(&complete).into_owned()
            }
            None => String::new(),
        }
    }

    /// Whatever is left once the stream has ended.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.partial);
        String::from_utf8_lossy(&rest).into_owned()
    }
}
