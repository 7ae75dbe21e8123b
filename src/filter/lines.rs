/// Bytes held back at most while waiting for a line boundary
const MAX_PENDING: usize = 4096;

/// One assembled line of raw output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Bytes of the line without its terminator
    pub bytes: Vec<u8>,
    /// Ended by a carriage return, so the next line of the stream redraws it
    pub open: bool,
}

impl RawLine {
    fn closed(bytes: Vec<u8>) -> Self {
        Self { bytes, open: false }
    }

    fn open(bytes: Vec<u8>) -> Self {
        Self { bytes, open: true }
    }
}

/// Splits a byte stream into lines
///
/// A newline ends a line. A carriage return ends a redraw: when a chunk has
/// been consumed, everything up to the last carriage return is released as an
/// open line so progress bars show up while they are drawn, not when the
/// epoch ends. Only the bytes after that carriage return are held back, which
/// keeps a multi-byte character split across two reads in one piece.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawLine> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            lines.push(RawLine::closed(std::mem::take(&mut self.pending)));
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);

        if let Some(pos) = self.pending.iter().rposition(|&b| b == b'\r') {
            let tail = self.pending.split_off(pos + 1);
            let mut redraw = std::mem::replace(&mut self.pending, tail);
            redraw.pop();
            if !redraw.is_empty() {
                lines.push(RawLine::open(redraw));
            }
        }

        if self.pending.len() > MAX_PENDING {
            lines.push(RawLine::closed(std::mem::take(&mut self.pending)));
        }

        lines
    }

    /// Flush the unterminated remainder at end of stream
    pub fn finish(&mut self) -> Option<RawLine> {
        if self.pending.is_empty() {
            return None;
        }
        Some(RawLine::closed(std::mem::take(&mut self.pending)))
    }
}
