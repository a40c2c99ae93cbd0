//! Options controlling how packages are loaded.

/// Load configuration.
///
/// ```ignore
/// let options = LoadOptions::new()
///     .with_max_buffer_len(Some(256 << 20))
///     .with_strict_glb_length(false);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    decode_uris: bool,
    max_buffer_len: Option<usize>,
    strict_glb_length: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            decode_uris: true,
            max_buffer_len: None,
            strict_glb_length: true,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percent-decode relative URIs before looking them up (default: true).
    pub fn with_decode_uris(mut self, decode: bool) -> Self {
        self.decode_uris = decode;
        self
    }

    /// Refuse buffers larger than `max` bytes (default: no limit).
    pub fn with_max_buffer_len(mut self, max: Option<usize>) -> Self {
        self.max_buffer_len = max;
        self
    }

    /// Reject GLB files whose header length exceeds the data (default: true).
    /// When false the data is parsed up to its actual end.
    pub fn with_strict_glb_length(mut self, strict: bool) -> Self {
        self.strict_glb_length = strict;
        self
    }

    pub fn decode_uris(&self) -> bool {
        self.decode_uris
    }

    pub fn max_buffer_len(&self) -> Option<usize> {
        self.max_buffer_len
    }

    pub fn strict_glb_length(&self) -> bool {
        self.strict_glb_length
    }
}
