//! Internal constants for diagram rendering.

/// Number of hex characters of the content hash used in artifact names.
pub const HASH_LEN: usize = 16;

/// Resolution used when rasterizing an intermediate PDF.
pub const CONVERT_DPI: u32 = 300;

/// Maximum length of a block brief, in characters.
pub const BRIEF_MAX_CHARS: usize = 50;
