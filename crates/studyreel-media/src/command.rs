//! FFmpeg command builder and the external tool runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

/// Bytes of stderr kept in error messages.
const STDERR_TAIL_BYTES: usize = 500;

/// One `-i` input with the arguments that precede it.
#[derive(Debug, Clone)]
struct FfmpegInput {
    args: Vec<String>,
    source: String,
}

/// Builder for FFmpeg commands.
///
/// Input arguments accumulate until the next [`FfmpegCommand::input`] call and
/// apply to that input only.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<FfmpegInput>,
    pending_input_args: Vec<String>,
    output: PathBuf,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            pending_input_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an input argument for the next input.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.pending_input_args.push(arg.into());
        self
    }

    /// Add an input file.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        let source = path.as_ref().to_string_lossy().to_string();
        self.input_source(source)
    }

    /// Add a lavfi source (e.g. `sine=frequency=440:duration=3`).
    pub fn lavfi(self, graph: impl Into<String>) -> Self {
        self.input_arg("-f").input_arg("lavfi").input_source(graph.into())
    }

    fn input_source(mut self, source: String) -> Self {
        let args = std::mem::take(&mut self.pending_input_args);
        self.inputs.push(FfmpegInput { args, source });
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Loop the next input `count` extra times.
    pub fn stream_loop(self, count: u32) -> Self {
        self.input_arg("-stream_loop").input_arg(count.to_string())
    }

    /// Loop a still image input indefinitely.
    pub fn loop_image(self) -> Self {
        self.input_arg("-loop").input_arg("1")
    }

    /// Limit output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Select a stream for the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set output pixel format.
    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    /// Copy all streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Drop audio from the output.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Stop at the end of the shortest stream.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    /// Move the moov atom to the front for progressive playback.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Output path.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Structured result of an external tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last few hundred bytes of stderr.
    pub fn stderr_tail(&self) -> &str {
        tail(&self.stderr, STDERR_TAIL_BYTES)
    }

    /// Turn a non-zero exit into a `ToolFailed` error.
    pub fn into_result(self, tool: &str) -> MediaResult<ToolOutput> {
        if self.success() {
            return Ok(self);
        }
        let message = match self.exit_code {
            Some(code) => format!("exit code {}: {}", code, self.stderr_tail().trim()),
            None => format!("terminated by signal: {}", self.stderr_tail().trim()),
        };
        Err(MediaError::tool_failed(
            tool,
            message,
            Some(self.stderr.clone()),
            self.exit_code,
        ))
    }
}

fn tail(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut start = s.len() - max_bytes;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// Runs external media tools.
///
/// Implementations return a [`ToolOutput`] for any process that ran, whatever
/// its exit code; `Err` is reserved for failing to run it at all.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> MediaResult<ToolOutput>;

    /// Run an FFmpeg command, failing on non-zero exit.
    async fn ffmpeg(&self, cmd: &FfmpegCommand) -> MediaResult<ToolOutput> {
        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));
        self.run(FFMPEG, &args).await?.into_result(FFMPEG)
    }
}

/// Runner backed by real subprocesses.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl ProcessRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> MediaResult<ToolOutput> {
        which::which(program).map_err(|_| MediaError::not_found(program))?;

        let started = Instant::now();
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output()).await {
                    Ok(result) => result?,
                    Err(_) => {
                        // Dropping the wait future kills the child
                        warn!("{} timed out after {} seconds, killing process", program, secs);
                        counter!("studyreel_tool_runs_total", "tool" => program.to_string(), "outcome" => "timeout")
                            .increment(1);
                        return Err(MediaError::Timeout(secs));
                    }
                }
            }
            None => child.wait_with_output().await?,
        };

        let result = ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        let outcome = if result.success() { "success" } else { "failure" };
        counter!("studyreel_tool_runs_total", "tool" => program.to_string(), "outcome" => outcome)
            .increment(1);
        histogram!("studyreel_tool_duration_seconds", "tool" => program.to_string())
            .record(started.elapsed().as_secs_f64());

        Ok(result)
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which(FFMPEG).map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which(FFPROBE).map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("output.mp4")
            .stream_loop(2)
            .input("clip.mp4")
            .input("voice.wav")
            .duration(7.5)
            .video_codec("libx264")
            .map("0:v")
            .map("1:a")
            .shortest();

        let args = cmd.build_args();
        assert_eq!(&args[..4], &["-y", "-hide_banner", "-v", "error"]);

        let loop_pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        assert_eq!(args[loop_pos + 1], "2");
        assert_eq!(args[loop_pos + 2], "-i");
        assert_eq!(args[loop_pos + 3], "clip.mp4");
        // Input args do not leak to the second input
        assert_eq!(args[loop_pos + 4], "-i");
        assert_eq!(args[loop_pos + 5], "voice.wav");

        assert!(args.contains(&"7.500".to_string()));
        assert!(args.contains(&"-shortest".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_lavfi_input() {
        let args = FfmpegCommand::new("tone.wav")
            .lavfi("sine=frequency=440:duration=3.000")
            .build_args();
        let pos = args.iter().position(|a| a == "lavfi").unwrap();
        assert_eq!(args[pos - 1], "-f");
        assert_eq!(args[pos + 1], "-i");
        assert_eq!(args[pos + 2], "sine=frequency=440:duration=3.000");
    }

    #[test]
    fn test_tool_output_into_result() {
        let ok = ToolOutput {
            exit_code: Some(0),
            ..Default::default()
        };
        assert!(ok.into_result("ffmpeg").is_ok());

        let failed = ToolOutput {
            exit_code: Some(1),
            stderr: "Invalid data found when processing input".into(),
            ..Default::default()
        };
        match failed.into_result("ffmpeg") {
            Err(MediaError::ToolFailed { exit_code, message, .. }) => {
                assert_eq!(exit_code, Some(1));
                assert!(message.contains("Invalid data"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_stderr_tail_respects_char_boundaries() {
        let long = "é".repeat(400);
        let output = ToolOutput {
            exit_code: Some(1),
            stderr: long,
            ..Default::default()
        };
        assert!(output.stderr_tail().len() <= STDERR_TAIL_BYTES);
        assert!(output.stderr_tail().chars().all(|c| c == 'é'));
    }
}
