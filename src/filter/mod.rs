//! Turns raw process output into display-ready text.
//!
//! Bytes are assembled into lines per stream, decoded with a fallback
//! encoding chain, stripped of terminal control sequences and trimmed. A line
//! holding carriage returns shows what a terminal would leave visible.

mod control;
mod decode;
mod lines;

pub use control::strip_control_sequences;
pub use decode::FallbackDecoder;
pub use lines::{LineAssembler, RawLine};

/// Decode, strip and trim pipeline applied to every assembled line
#[derive(Debug, Clone, Default)]
pub struct OutputFilter {
    decoder: FallbackDecoder,
}

impl OutputFilter {
    /// Create a filter using the given decoder
    pub fn new(decoder: FallbackDecoder) -> Self {
        Self { decoder }
    }

    /// Clean one line of raw output
    ///
    /// Of the carriage-return segments, the last one with visible text wins.
    /// Returns `None` when nothing visible is left after stripping and trimming.
    pub fn clean(&self, bytes: &[u8]) -> Option<String> {
        let text = self.decoder.decode(bytes);
        text.split('\r').rev().find_map(|segment| {
            let stripped = strip_control_sequences(segment);
            let trimmed = stripped.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
    }
}
