//! Shard sizing and byte-count parsing

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Size of one shard used by the coordinator (128 MiB)
pub const SHARD_SIZE: u64 = 128 * 1024 * 1024;

/// Shard size and total capacity a client commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSpec {
    shard_size: u64,
    max_size: u64,
}

impl ShardSpec {
    /// Create a spec; `shard_size` must be positive
    pub fn new(shard_size: u64, max_size: u64) -> Result<Self> {
        if shard_size == 0 {
            return Err(Error::InvalidArgument(
                "shard size must be positive".to_string(),
            ));
        }
        Ok(Self {
            shard_size,
            max_size,
        })
    }

    pub fn shard_size(&self) -> u64 {
        self.shard_size
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Number of whole shards that fit in `max_size`
    pub fn height(&self) -> u64 {
        self.max_size / self.shard_size
    }
}

/// Parse a byte count such as `"1024"`, `"128M"`, `"1GiB"` or `"2 TB"`.
///
/// Suffixes `K`, `M`, `G`, `T` and `P` are powers of 1024 and may be
/// followed by `B` or `iB`. A bare `B` suffix means bytes.
pub fn parse_byte_count(input: &str) -> Result<u64> {
    let invalid = || Error::InvalidByteCount(input.to_string());

    let trimmed = input.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if digits_end == 0 {
        return Err(invalid());
    }

    let value: u64 = trimmed[..digits_end].parse().map_err(|_| invalid())?;
    let unit = trimmed[digits_end..].trim_start().to_ascii_uppercase();

    let exponent = match unit.as_str() {
        "" | "B" => 0,
        "K" | "KB" | "KIB" => 1,
        "M" | "MB" | "MIB" => 2,
        "G" | "GB" | "GIB" => 3,
        "T" | "TB" | "TIB" => 4,
        "P" | "PB" | "PIB" => 5,
        _ => return Err(invalid()),
    };

    1024u64
        .checked_pow(exponent)
        .and_then(|multiplier| value.checked_mul(multiplier))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height() {
        let spec = ShardSpec::new(SHARD_SIZE, 256 * 1024 * 1024).unwrap();
        assert_eq!(spec.height(), 2);

        let spec = ShardSpec::new(SHARD_SIZE, 300 * 1024 * 1024).unwrap();
        assert_eq!(spec.height(), 2);

        let spec = ShardSpec::new(SHARD_SIZE, 0).unwrap();
        assert_eq!(spec.height(), 0);
    }

    #[test]
    fn test_zero_shard_size_rejected() {
        assert!(matches!(
            ShardSpec::new(0, 1024),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_byte_count() {
        assert_eq!(parse_byte_count("0").unwrap(), 0);
        assert_eq!(parse_byte_count("1024").unwrap(), 1024);
        assert_eq!(parse_byte_count("512B").unwrap(), 512);
        assert_eq!(parse_byte_count("1K").unwrap(), 1024);
        assert_eq!(parse_byte_count("128M").unwrap(), SHARD_SIZE);
        assert_eq!(parse_byte_count("1GiB").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_byte_count("2 tb").unwrap(), 2 * 1024u64.pow(4));
    }

    #[test]
    fn test_parse_byte_count_rejects_garbage() {
        for input in ["", "xyz", "-1", "12Q", "1.5G", "M"] {
            assert!(
                matches!(parse_byte_count(input), Err(Error::InvalidByteCount(_))),
                "accepted {:?}",
                input
            );
        }
        assert!(parse_byte_count("99999999999P").is_err());
    }
}
