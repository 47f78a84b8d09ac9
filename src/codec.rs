use bincode::Options;
use serde::de::DeserializeOwned;

use super::errors::ExtfsError;

/// A fixed-size little-endian on-disk record laid out field after field.
pub trait Record: DeserializeOwned {
    /// Encoded size in bytes.
    const SIZE: usize;

    #[inline]
    fn decode_bytes(bytes: &[u8]) -> Result<Self, ExtfsError> {
        let codec = bincode::options()
            .with_little_endian()
            .with_fixint_encoding()
            .allow_trailing_bytes();
        let obj: Self = codec.deserialize(bytes)?;
        Ok(obj)
    }
}
