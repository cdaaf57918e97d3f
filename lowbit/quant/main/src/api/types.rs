use std::fmt;
use std::str::FromStr;

use crate::api::error::QuantError;

/// Number of elements per sym_int4 block.
pub const SYM_INT4_BLOCK_SIZE: usize = 32;

/// Bytes per sym_int4 block: 2-byte f16 scale + 16 bytes (32 x 4-bit packed).
pub const SYM_INT4_BLOCK_BYTES: usize = 18;

/// Weight quantization scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QType {
    /// Symmetric 4-bit, per-block f16 scale, values in [-8, 7].
    #[default]
    SymInt4,
}

impl QType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QType::SymInt4 => "sym_int4",
        }
    }

    /// Elements covered by one block.
    pub fn block_size(&self) -> usize {
        match self {
            QType::SymInt4 => SYM_INT4_BLOCK_SIZE,
        }
    }

    /// Encoded bytes per block.
    pub fn block_bytes(&self) -> usize {
        match self {
            QType::SymInt4 => SYM_INT4_BLOCK_BYTES,
        }
    }
}

impl fmt::Display for QType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QType {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sym_int4" => Ok(QType::SymInt4),
            other => Err(QuantError::UnsupportedQType(other.to_string())),
        }
    }
}
