//! Deterministic distinct-color generation for map legends.

use crate::error::{GeoFocusError, Result};

/// Per-channel multipliers. Distinct odd factors walk each channel through
/// the 0-255 range at a different rate, keeping neighboring indices apart.
const CHANNEL_MULTIPLIERS: [f64; 3] = [3.0, 7.0, 11.0];

/// Per-channel starting offsets, so index 0 is not black.
const CHANNEL_OFFSETS: [f64; 3] = [41.0, 101.0, 197.0];

/// Generate `n` RGB triples, deterministic for a given `n`.
///
/// Small-to-moderate `n` produce visually distinguishable colors; there is
/// no minimum perceptual-distance guarantee for arbitrarily large `n`.
///
/// `n == 0` is rejected: an empty palette is always a caller bug, since
/// the palette is about to be indexed per identity.
pub fn distinct_colors(n: usize) -> Result<Vec<[u8; 3]>> {
    if n == 0 {
        return Err(GeoFocusError::invalid_argument(
            "color count must be at least 1",
        ));
    }

    let step = 255.0 / n as f64;
    Ok((0..n)
        .map(|i| {
            let base = i as f64 * step;
            let channel = |c: usize| {
                ((base * CHANNEL_MULTIPLIERS[c] + CHANNEL_OFFSETS[c]) % 256.0) as u8
            };
            [channel(0), channel(1), channel(2)]
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rejected() {
        assert!(matches!(
            distinct_colors(0),
            Err(GeoFocusError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_count_and_determinism() {
        let first = distinct_colors(12).unwrap();
        let second = distinct_colors(12).unwrap();
        assert_eq!(first.len(), 12);
        assert_eq!(first, second);
    }

    #[test]
    fn test_small_palettes_are_distinct() {
        for n in 1..=24 {
            let palette = distinct_colors(n).unwrap();
            for i in 0..palette.len() {
                for j in (i + 1)..palette.len() {
                    assert_ne!(palette[i], palette[j], "palette({n}) repeats a color");
                }
            }
        }
    }
}
