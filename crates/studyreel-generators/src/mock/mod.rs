//! Offline generators for development and tests.

mod clip;
mod outline;
mod script;
mod slide;
mod voice;

pub use self::clip::MockClipGenerator;
pub use self::outline::MockOutlineGenerator;
pub use self::script::MockScriptGenerator;
pub use self::slide::MockImageGenerator;
pub use self::voice::MockVoiceGenerator;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use studyreel_media::{MediaResult, ToolOutput, ToolRunner};

    /// Records ffmpeg invocations and writes a stub file at the output path.
    #[derive(Default)]
    pub(crate) struct StubRunner {
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl ToolRunner for StubRunner {
        async fn run(&self, _program: &str, args: &[String]) -> MediaResult<ToolOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            if let Some(output) = args.last() {
                std::fs::write(output, b"stub")?;
            }
            Ok(ToolOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        }
    }
}
