//! Aligning a motion clip to its scene's narration.

/// Durations closer than this are treated as equal.
pub const DURATION_EPSILON: f64 = 1e-3;

/// How a clip must be re-timed to match the narration length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipAlignment {
    /// Clip already matches the audio, or its length is unknown
    AsIs,
    /// Replay the clip `extra_loops` more times, then cut at `target_secs`
    Loop { extra_loops: u32, target_secs: f64 },
    /// Cut the clip at `target_secs`
    Trim { target_secs: f64 },
}

/// Decide how to re-time a `clip_secs` clip to cover `audio_secs` of narration.
pub fn plan_clip_alignment(clip_secs: f64, audio_secs: f64) -> ClipAlignment {
    if !(clip_secs > 0.0) || !(audio_secs > 0.0) {
        return ClipAlignment::AsIs;
    }
    if (audio_secs - clip_secs).abs() < DURATION_EPSILON {
        return ClipAlignment::AsIs;
    }
    if audio_secs > clip_secs {
        let plays = (audio_secs / clip_secs).ceil() as u32;
        ClipAlignment::Loop {
            extra_loops: plays.saturating_sub(1),
            target_secs: audio_secs,
        }
    } else {
        ClipAlignment::Trim {
            target_secs: audio_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_when_audio_longer() {
        assert_eq!(
            plan_clip_alignment(6.0, 14.2),
            ClipAlignment::Loop {
                extra_loops: 2,
                target_secs: 14.2
            }
        );
    }

    #[test]
    fn test_exact_multiple_needs_no_partial_play() {
        assert_eq!(
            plan_clip_alignment(4.0, 12.0),
            ClipAlignment::Loop {
                extra_loops: 2,
                target_secs: 12.0
            }
        );
    }

    #[test]
    fn test_trim_when_audio_shorter() {
        assert_eq!(plan_clip_alignment(6.0, 3.5), ClipAlignment::Trim { target_secs: 3.5 });
    }

    #[test]
    fn test_equal_is_as_is() {
        assert_eq!(plan_clip_alignment(6.0, 6.0), ClipAlignment::AsIs);
        assert_eq!(plan_clip_alignment(6.0, 6.0004), ClipAlignment::AsIs);
    }

    #[test]
    fn test_unknown_clip_length_is_as_is() {
        assert_eq!(plan_clip_alignment(0.0, 5.0), ClipAlignment::AsIs);
        assert_eq!(plan_clip_alignment(f64::NAN, 5.0), ClipAlignment::AsIs);
    }
}
