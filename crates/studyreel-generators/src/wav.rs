//! Minimal WAV header reading.
//!
//! Streaming TTS responses often leave the RIFF and data sizes at their
//! placeholder maximum, so the data length falls back to the bytes present.

/// Duration in seconds of a PCM WAV buffer, or `None` if the header is not
/// understood.
pub fn wav_duration(bytes: &[u8]) -> Option<f64> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }

    let mut pos = 12;
    let mut byte_rate: Option<u32> = None;

    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = read_u32(bytes, pos + 4)?;
        let body = pos + 8;

        match id {
            b"fmt " => {
                // audio_format(2) channels(2) sample_rate(4) byte_rate(4)
                byte_rate = Some(read_u32(bytes, body + 8)?);
            }
            b"data" => {
                let remaining = bytes.len() - body;
                let data_len = if size as usize > remaining {
                    remaining
                } else {
                    size as usize
                };
                let rate = byte_rate.filter(|r| *r > 0)?;
                return Some(data_len as f64 / rate as f64);
            }
            _ => {}
        }

        // Chunks are word aligned
        let padded = size as usize + (size as usize & 1);
        pos = body.checked_add(padded)?;
    }

    None
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}
