use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::{Audio, SpeechError, SpeechSynthesizer};

const NAME: &str = "espeak-ng";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// espeak-ng's own default rate
const BASE_WPM: f32 = 175.0;
const MIN_WPM: f32 = 80.0;
const MAX_WPM: f32 = 450.0;

/// Local `espeak-ng` process writing WAV to stdout
#[derive(Debug, Clone)]
pub struct EspeakTts {
    binary: PathBuf,
    voice: String,
    timeout: Duration,
}

impl Default for EspeakTts {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("espeak-ng"),
            voice: "en".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl EspeakTts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Words per minute for a speed factor
    pub fn words_per_minute(speed: f32) -> u32 {
        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            1.0
        };
        (BASE_WPM * speed).round().clamp(MIN_WPM, MAX_WPM) as u32
    }

    async fn run(&self, text: &str, wpm: u32) -> Result<Vec<u8>, SpeechError> {
        let start = Instant::now();
        debug!(
            binary = %self.binary.display(),
            voice = %self.voice,
            wpm,
            "Spawning espeak-ng"
        );

        let mut child = Command::new(&self.binary)
            .args(["-v", self.voice.as_str(), "-s", &wpm.to_string(), "--stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SpeechError::Unavailable {
                    backend: NAME,
                    message: format!("{} not found on PATH", self.binary.display()),
                },
                _ => SpeechError::backend(NAME, e.to_string()),
            })?;

        // Text goes in over stdin so it is never parsed as flags
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SpeechError::backend(NAME, "stdin not captured"))?;
        let input = text.to_string();
        let writer = tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SpeechError::backend(NAME, format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| SpeechError::backend(NAME, e.to_string()))?;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(SpeechError::backend(NAME, format!("writing text: {}", e))),
            Err(e) => return Err(SpeechError::backend(NAME, e.to_string())),
        }

        debug!(
            exit_code = output.status.code().unwrap_or(-1),
            duration_ms = start.elapsed().as_millis(),
            bytes = output.stdout.len(),
            "espeak-ng completed"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::backend(
                NAME,
                format!("exit {}: {}", output.status.code().unwrap_or(-1), stderr.trim()),
            ));
        }
        if output.stdout.is_empty() {
            return Err(SpeechError::backend(NAME, "no audio produced"));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakTts {
    fn name(&self) -> &str {
        NAME
    }

    async fn synthesize(&self, text: &str, speed: f32) -> Result<Audio, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        let bytes = self.run(text, Self::words_per_minute(speed)).await?;
        Ok(Audio {
            bytes,
            mime_type: "audio/wav",
            backend: NAME.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_per_minute() {
        assert_eq!(EspeakTts::words_per_minute(1.0), 175);
        assert_eq!(EspeakTts::words_per_minute(1.15), 201);
        assert_eq!(EspeakTts::words_per_minute(0.1), 80);
        assert_eq!(EspeakTts::words_per_minute(10.0), 450);
        assert_eq!(EspeakTts::words_per_minute(f32::NAN), 175);
        assert_eq!(EspeakTts::words_per_minute(-2.0), 175);
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let tts = EspeakTts::new().with_binary("/nonexistent/espeak-ng-for-tests");
        let err = tts.synthesize("Hello.", 1.0).await.unwrap_err();
        assert!(matches!(err, SpeechError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_before_spawning() {
        let tts = EspeakTts::new().with_binary("/nonexistent/espeak-ng-for-tests");
        assert!(matches!(
            tts.synthesize("  ", 1.0).await,
            Err(SpeechError::EmptyText)
        ));
    }
}
