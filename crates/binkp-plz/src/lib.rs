//! PLZ: per-data-frame zlib compression (FRL-1036).
#![forbid(unsafe_code)]

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlzError {
    #[error("zlib compression failed")]
    Compress(#[source] std::io::Error),

    #[error("zlib inflate failed")]
    Decompress(#[source] std::io::Error),
}

/// Local/remote compression mode, set from configuration (local) or
/// inferred from the peer's `OPT` advertisement (remote).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlzMode {
    None,
    Supported,
    Required,
}

/// zlib compression level, mapped from a named profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlzLevel {
    Fast,
    Normal,
    Best,
}

impl PlzLevel {
    fn to_flate2(self) -> Compression {
        match self {
            PlzLevel::Fast => Compression::fast(),
            PlzLevel::Normal => Compression::default(),
            PlzLevel::Best => Compression::best(),
        }
    }
}

/// Result of negotiating PLZ between the local and remote advertised modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiated {
    On,
    Off,
}

/// Error returned when negotiation cannot be satisfied: local requires
/// PLZ but the remote doesn't support it, or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("PLZ required by {0} but not supported by the peer")]
pub struct PlzRequiredButUnmet(pub &'static str);

/// Negotiates PLZ on/off per the option-token compatibility table.
///
/// |local \\ remote|none|supported/required|
/// |---|---|---|
/// |none|off|off, but remote=required is a hard failure|
/// |supported|off|on|
/// |required|fail|on|
pub fn negotiate(local: PlzMode, remote: PlzMode) -> Result<Negotiated, PlzRequiredButUnmet> {
    use Negotiated::*;
    use PlzMode::*;
    match (local, remote) {
        (None, PlzMode::None) => Ok(Off),
        (None, Supported) => Ok(Off),
        (None, Required) => Err(PlzRequiredButUnmet("remote")),
        (Supported, PlzMode::None) => Ok(Off),
        (Supported, Supported) => Ok(On),
        (Supported, Required) => Ok(On),
        (Required, PlzMode::None) => Err(PlzRequiredButUnmet("local")),
        (Required, Supported) => Ok(On),
        (Required, Required) => Ok(On),
    }
}

/// Compresses `payload` at `level`. The caller decides whether to use the
/// result: if the compressed form isn't strictly smaller
/// than the source, the sender should transmit the original bytes instead.
pub fn compress(payload: &[u8], level: PlzLevel) -> Result<Vec<u8>, PlzError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level.to_flate2());
    encoder.write_all(payload).map_err(PlzError::Compress)?;
    encoder.finish().map_err(PlzError::Compress)
}

/// Chooses the smaller of the compressed and original payload: if the
/// compressed form is not strictly smaller than the source, the original
/// uncompressed bytes are sent instead.
pub fn compress_if_smaller(payload: &[u8], level: PlzLevel) -> Result<Vec<u8>, PlzError> {
    let compressed = compress(payload, level)?;
    if compressed.len() < payload.len() {
        Ok(compressed)
    } else {
        Ok(payload.to_vec())
    }
}

/// Inflates `payload`, which must have been produced by [`compress`].
pub fn decompress(payload: &[u8]) -> Result<Vec<u8>, PlzError> {
    let mut decoder = ZlibDecoder::new(payload);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(PlzError::Decompress)?;
    Ok(out)
}

/// Tries to inflate `payload`; on failure, returns `payload` unchanged.
///
/// This is the "try-inflate" convention: when PLZ is negotiated on, every
/// incoming data frame's payload is a candidate for inflate. A sender that
/// chose not to
/// compress a given frame (because compression didn't shrink it) still
/// sends valid bytes that are simply not valid zlib, so inflate failure
/// here is the ordinary "frame wasn't compressed" case, not an error to
/// surface to the caller.
pub fn try_decompress(payload: &[u8]) -> Vec<u8> {
    match decompress(payload) {
        Ok(inflated) => inflated,
        Err(_) => payload.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_all_levels() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        for level in [PlzLevel::Fast, PlzLevel::Normal, PlzLevel::Best] {
            let compressed = compress(&data, level).unwrap();
            assert_eq!(decompress(&compressed).unwrap(), data);
        }
    }

    #[test]
    fn prefers_uncompressed_for_tiny_payloads() {
        let data = b"hi";
        let chosen = compress_if_smaller(data, PlzLevel::Best).unwrap();
        assert_eq!(chosen, data);
    }

    #[test]
    fn try_decompress_falls_back_on_non_zlib_bytes() {
        let raw = b"not zlib data at all";
        assert_eq!(try_decompress(raw), raw);
    }

    #[test]
    fn negotiation_matches_the_table() {
        use Negotiated::*;
        use PlzMode::*;
        assert_eq!(negotiate(None, None).unwrap(), Off);
        assert_eq!(negotiate(None, Supported).unwrap(), Off);
        assert!(negotiate(None, Required).is_err());
        assert_eq!(negotiate(Supported, None).unwrap(), Off);
        assert_eq!(negotiate(Supported, Supported).unwrap(), On);
        assert_eq!(negotiate(Supported, Required).unwrap(), On);
        assert!(negotiate(Required, None).is_err());
        assert_eq!(negotiate(Required, Supported).unwrap(), On);
        assert_eq!(negotiate(Required, Required).unwrap(), On);
    }

    #[test]
    fn negotiation_is_symmetric_away_from_failure_cases() {
        use PlzMode::*;
        for (a, b) in [(Supported, Supported), (Required, Supported), (Supported, Required)] {
            assert_eq!(negotiate(a, b).unwrap(), negotiate(b, a).unwrap());
        }
    }
}
