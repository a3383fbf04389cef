use thiserror::Error;

#[derive(Debug, Error)]
pub enum CadtexError {
    #[error("Decode error in {context}: needed {needed} bytes at offset {offset}, {available} available")]
    Decode {
        context: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Unsupported {kind} type code: {code}")]
    UnsupportedType { kind: &'static str, code: i32 },

    #[error("Packing error: {0}")]
    Packing(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CadtexError {
    /// Shorthand for a bounds failure while reading `needed` bytes at `offset`.
    pub fn decode(context: &'static str, offset: usize, needed: usize, available: usize) -> Self {
        Self::Decode {
            context,
            offset,
            needed,
            available,
        }
    }

    /// Whether this error only affects a single library record.
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::UnsupportedType { .. } | Self::Geometry(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CadtexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_message() {
        let err = CadtexError::decode("curve payload", 40, 4, 42);
        let msg = err.to_string();
        assert!(msg.contains("curve payload"));
        assert!(msg.contains("offset 40"));
        assert!(err.is_record_local());
    }

    #[test]
    fn test_packing_error_is_not_record_local() {
        let err = CadtexError::Packing("block 4x4 does not fit".into());
        assert!(!err.is_record_local());
    }
}
