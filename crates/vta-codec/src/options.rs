//! Parse options and sanity limits.

/// Default size of the template array search window, in bytes.
pub const DEFAULT_SCAN_WINDOW: usize = 100_000;

/// Bounds used to reject garbage offsets before they turn into huge reads.
///
/// | Field | Default | Applies to |
/// |-------|---------|------------|
/// | `max_array_len` | 100 | `classes` / `stylesheet_paths` counts |
/// | `max_string_len` | 1000 | every string byte-length |
/// | `max_order` | 10000 | `order_in_document` during identity search |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SanityLimits {
    /// Maximum entry count of a string array.
    pub max_array_len: u32,
    /// Maximum byte length of a single string.
    pub max_string_len: u32,
    /// Maximum `order_in_document` accepted when verifying a located record.
    pub max_order: i32,
}

impl Default for SanityLimits {
    fn default() -> Self {
        Self {
            max_array_len: 100,
            max_string_len: 1000,
            max_order: 10_000,
        }
    }
}

impl SanityLimits {
    /// Whether `order` looks like a real `order_in_document` value.
    #[must_use]
    pub const fn plausible_order(&self, order: i32) -> bool {
        order >= 0 && order <= self.max_order
    }
}

/// Options for parsing VTA buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseOptions {
    /// Reject non-zero padding and unexpected separators instead of logging them.
    pub strict: bool,
    /// How far past the visual array the template array signature is searched for.
    pub scan_window: usize,
    /// Sanity bounds for counts, lengths and order values.
    pub limits: SanityLimits,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: false,
            scan_window: DEFAULT_SCAN_WINDOW,
            limits: SanityLimits::default(),
        }
    }
}

impl ParseOptions {
    /// Create parse options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable strict validation.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Set the template array search window.
    #[must_use]
    pub fn with_scan_window(mut self, bytes: usize) -> Self {
        self.scan_window = bytes;
        self
    }

    /// Replace the sanity limits.
    #[must_use]
    pub fn with_limits(mut self, limits: SanityLimits) -> Self {
        self.limits = limits;
        self
    }
}
