//! Filter graph and concat list builders.

use std::fmt::Write as _;
use std::path::Path;

use studyreel_models::EncodingConfig;

/// Escape text for use inside a quoted drawtext `text='...'` value.
///
/// The filter graph parser strips the quotes and the option parser then
/// unescapes once more, so `\\` and `:` carry a backslash for the second
/// pass and an apostrophe closes the quote, is emitted escaped for both
/// passes, and reopens it. `%` needs nothing as long as the filter sets
/// `expansion=none`.
pub fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            ':' => escaped.push_str(r"\:"),
            '\'' => escaped.push_str(r"'\\\''"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Video filter for a still-image scene: scale, plus a burned-in title when
/// drawtext is available.
pub fn still_image_filter(encoding: &EncodingConfig, title: Option<&str>) -> String {
    let base = format!("{},setsar=1", encoding.scale_filter());
    match title {
        Some(title) if !title.trim().is_empty() => format!(
            "{},drawtext=text='{}':expansion=none:fontsize=36:fontcolor=white:borderw=2:bordercolor=black:x=(w-text_w)/2:y=40",
            base,
            escape_drawtext(title)
        ),
        _ => base,
    }
}

/// Video filter normalising a motion clip to the output frame.
pub fn clip_filter(encoding: &EncodingConfig) -> String {
    format!("{},setsar=1", encoding.scale_filter())
}

/// Body of an FFmpeg concat demuxer list.
pub fn concat_list<P: AsRef<Path>>(segments: &[P]) -> String {
    let mut list = String::new();
    for segment in segments {
        let path = segment.as_ref().to_string_lossy().replace('\'', "'\\''");
        let _ = writeln!(list, "file '{}'", path);
    }
    list
}

/// Crossfade chain over `durations.len()` inputs, each carrying one video and
/// one audio stream. Outputs are labelled `[vout]` and `[aout]`.
///
/// Returns `None` when a chain cannot be built: fewer than two inputs, a
/// non-positive fade, or a segment too short to fade out of.
pub fn crossfade_filter(durations: &[f64], fade_secs: f64) -> Option<String> {
    if durations.len() < 2 || !(fade_secs > 0.0) {
        return None;
    }
    if durations.iter().any(|d| !(*d > fade_secs)) {
        return None;
    }

    let last = durations.len() - 1;
    let mut parts = Vec::with_capacity(durations.len() * 2);
    let mut video_label = "0:v".to_string();
    let mut audio_label = "0:a".to_string();
    let mut elapsed = durations[0];

    for (i, duration) in durations.iter().enumerate().skip(1) {
        let offset = elapsed - fade_secs;
        let (v_out, a_out) = if i == last {
            ("vout".to_string(), "aout".to_string())
        } else {
            (format!("v{}", i), format!("a{}", i))
        };

        parts.push(format!(
            "[{}][{}:v]xfade=transition=fade:duration={:.3}:offset={:.3}[{}]",
            video_label, i, fade_secs, offset, v_out
        ));
        parts.push(format!(
            "[{}][{}:a]acrossfade=d={:.3}[{}]",
            audio_label, i, fade_secs, a_out
        ));

        video_label = v_out;
        audio_label = a_out;
        elapsed = offset + duration;
    }

    Some(parts.join(";"))
}
