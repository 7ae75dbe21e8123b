use encoding_rs::{Encoding, GBK, UTF_8, WINDOWS_1252};

use crate::error::ConfigError;

/// Labels of the default fallback chain, in order
pub const DEFAULT_ENCODINGS: [&str; 3] = ["utf-8", "gbk", "latin1"];

/// Decoder trying an ordered list of encodings until one succeeds
///
/// Training tools print in whatever locale the host is configured for, so the
/// chain is configurable. The default covers UTF-8, Simplified Chinese Windows
/// consoles (GBK) and a single-byte catch-all (`latin1`, which maps to
/// windows-1252 and accepts every byte).
#[derive(Debug, Clone)]
pub struct FallbackDecoder {
    encodings: Vec<&'static Encoding>,
}

impl Default for FallbackDecoder {
    fn default() -> Self {
        Self {
            encodings: vec![UTF_8, GBK, WINDOWS_1252],
        }
    }
}

impl FallbackDecoder {
    /// Create a decoder from an explicit encoding list
    ///
    /// An empty list decodes as lossy UTF-8.
    pub fn new(encodings: Vec<&'static Encoding>) -> Self {
        Self { encodings }
    }

    /// Build a decoder from WHATWG encoding labels such as `utf-8` or `gbk`
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self, ConfigError> {
        if labels.is_empty() {
            return Err(ConfigError::Invalid(vec![
                "at least one output encoding is required".to_string(),
            ]));
        }

        let encodings = labels
            .iter()
            .map(|label| {
                let label = label.as_ref().trim();
                Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| ConfigError::UnknownEncoding(label.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { encodings })
    }

    /// Get the encodings in the order they are tried
    pub fn encodings(&self) -> &[&'static Encoding] {
        &self.encodings
    }

    /// Decode bytes with the first encoding that accepts them
    ///
    /// When every encoding rejects the input, the first one decodes it again
    /// with malformed sequences replaced by U+FFFD. Never fails.
    pub fn decode(&self, bytes: &[u8]) -> String {
        for encoding in &self.encodings {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
                return text.into_owned();
            }
        }

        match self.encodings.first() {
            Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}
