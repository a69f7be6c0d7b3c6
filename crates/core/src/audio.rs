//! Audio format constants and PCM helpers
//!
//! The entire backend speaks one fixed format: PCM16, mono, 16 kHz,
//! little-endian, ~100 ms frames. Clients and the transcriber both use it,
//! so there is no resampling anywhere in the pipeline.

/// Sample rate expected from clients and sent to the transcriber
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Mono capture only
pub const CHANNELS: u16 = 1;

/// 16-bit signed samples
pub const BYTES_PER_SAMPLE: usize = 2;

/// Nominal frame duration
pub const FRAME_DURATION_MS: u64 = 100;

/// Nominal frame size: 16000 Hz * 0.1 s * 2 bytes
pub const FRAME_BYTES: usize =
    (SAMPLE_RATE_HZ as usize / 1000) * FRAME_DURATION_MS as usize * BYTES_PER_SAMPLE;

/// Iterate a raw byte frame as little-endian i16 samples.
///
/// A trailing odd byte is ignored rather than treated as an error; frames
/// from misbehaving clients should degrade, not crash.
pub fn pcm16_samples(frame: &[u8]) -> impl Iterator<Item = i16> + '_ {
    frame
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_bytes() {
        assert_eq!(FRAME_BYTES, 3200);
    }

    #[test]
    fn test_pcm16_samples_le() {
        let frame = [0x00, 0x00, 0xff, 0x7f, 0x00, 0x80];
        let samples: Vec<i16> = pcm16_samples(&frame).collect();
        assert_eq!(samples, vec![0, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_pcm16_samples_ignores_trailing_byte() {
        let frame = [0x01, 0x00, 0x7f];
        let samples: Vec<i16> = pcm16_samples(&frame).collect();
        assert_eq!(samples, vec![1]);
    }
}
