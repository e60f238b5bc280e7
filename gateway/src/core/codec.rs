//! G.711 µ-law transcoding for the telephony leg.
//!
//! Telephony media streams carry 8 kHz µ-law bytes. The realtime AI session may
//! emit 24 kHz little-endian PCM16 instead, which is brought down to telephony
//! rate by plain decimation before encoding. No filtering is applied.

use std::f64::consts::PI;

/// Sample rate of the telephony leg in Hz.
pub const TELEPHONY_SAMPLE_RATE: u32 = 8000;

/// Bias added to the magnitude before segment lookup.
const MULAW_BIAS: i32 = 0x84;

/// Magnitudes above this value are clipped before biasing.
const MULAW_CLIP: i32 = 32635;

/// Peak amplitude of synthesized tones.
const TONE_AMPLITUDE: f64 = 8000.0;

/// Encode one 16-bit linear sample as a µ-law byte.
///
/// Bit-exact with the classic Sun reference encoder: the magnitude is clipped,
/// biased, split into a 3-bit exponent and 4-bit mantissa, and the resulting
/// byte is inverted.
pub fn encode_mulaw(sample: i16) -> u8 {
    let mut pcm = sample as i32;
    let sign = if pcm < 0 {
        pcm = -pcm;
        0x80u8
    } else {
        0x00u8
    };

    if pcm > MULAW_CLIP {
        pcm = MULAW_CLIP;
    }
    pcm += MULAW_BIAS;

    let mut exponent: u8 = 7;
    let mut mask = 0x4000;
    while exponent > 0 && (pcm & mask) == 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = ((pcm >> (exponent + 3)) & 0x0F) as u8;
    !(sign | (exponent << 4) | mantissa)
}

/// Decode a µ-law byte to the centre of its linear quantization interval.
pub fn decode_mulaw(byte: u8) -> i16 {
    let mu = !byte;
    let exponent = (mu >> 4) & 0x07;
    let mantissa = (mu & 0x0F) as i32;

    let magnitude = (((mantissa << 3) + MULAW_BIAS) << exponent) - MULAW_BIAS;
    if mu & 0x80 != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Synthesize a sine tone at telephony rate and return it µ-law encoded.
///
/// Produces `duration_ms * 8` bytes. Used for the stream-start connectivity check.
pub fn generate_tone(frequency_hz: f64, duration_ms: u32) -> Vec<u8> {
    let rate = TELEPHONY_SAMPLE_RATE as f64;
    let total = (TELEPHONY_SAMPLE_RATE as usize * duration_ms as usize) / 1000;

    (0..total)
        .map(|i| {
            let t = i as f64 / rate;
            let value = (TONE_AMPLITUDE * (2.0 * PI * frequency_hz * t).sin()).round();
            encode_mulaw(value as i16)
        })
        .collect()
}

/// Decimate `samples` from `from_rate` to `to_rate` and µ-law encode the result.
///
/// Keeps the first sample of every complete group of `from_rate / to_rate`
/// samples, so an input of length `L` yields `L / N` bytes. A trailing partial
/// group is discarded. When `from_rate <= to_rate` every sample is kept.
pub fn downsample_and_encode(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<u8> {
    let step = decimation_step(from_rate, to_rate);

    samples
        .chunks_exact(step)
        .map(|group| encode_mulaw(group[0]))
        .collect()
}

/// Number of input samples folded into one output sample by [`downsample_and_encode`].
pub fn decimation_step(from_rate: u32, to_rate: u32) -> usize {
    (from_rate / to_rate.max(1)).max(1) as usize
}

/// Interpret raw little-endian PCM16 bytes as samples. A dangling odd byte is ignored.
pub fn pcm16le_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
