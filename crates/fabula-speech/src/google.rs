use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{Audio, SpeechError, SpeechSynthesizer};

const NAME: &str = "google-translate";
const TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) fabula";

/// The endpoint rejects longer queries
pub const MAX_CHUNK_CHARS: usize = 200;

/// Google Translate's public TTS endpoint. Produces MP3.
///
/// Long text is sent in sentence-sized chunks and the MP3 streams are
/// concatenated, which players handle frame by frame.
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    client: Client,
    endpoint: String,
    lang: String,
}

impl GoogleTranslateTts {
    pub fn new(lang: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            endpoint: TTS_ENDPOINT.to_string(),
            lang: lang.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        index: usize,
        total: usize,
        speed: f32,
    ) -> Result<Vec<u8>, SpeechError> {
        let idx = index.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();
        // The endpoint only slows speech down
        let ttsspeed = format!("{:.2}", speed.clamp(0.3, 1.0));

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.lang.as_str()),
                ("q", chunk),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
                ("ttsspeed", ttsspeed.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SpeechError::backend(NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::backend(NAME, format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::backend(NAME, e.to_string()))?;
        if bytes.is_empty() {
            return Err(SpeechError::backend(NAME, "empty audio response"));
        }
        Ok(bytes.to_vec())
    }
}

impl Default for GoogleTranslateTts {
    fn default() -> Self {
        Self::new("en")
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    fn name(&self) -> &str {
        NAME
    }

    async fn synthesize(&self, text: &str, speed: f32) -> Result<Audio, SpeechError> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let mut bytes = Vec::new();
        for (index, chunk) in chunks.iter().enumerate() {
            debug!(chunk = index + 1, of = chunks.len(), "Fetching speech chunk");
            bytes.extend(self.fetch_chunk(chunk, index, chunks.len(), speed).await?);
        }

        Ok(Audio {
            bytes,
            mime_type: "audio/mpeg",
            backend: NAME.to_string(),
        })
    }
}

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Sentence boundaries are preferred, then word boundaries; a single word
/// longer than `max_chars` is cut mid-word.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if current_len > 0 && current_len + 1 + word_len > max_chars {
            chunks.push(std::mem::take(&mut current));
        }

        if word_len > max_chars {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);

        // Close the chunk at a sentence end once it has some length
        let ends_sentence = word.ends_with(['.', '!', '?']);
        if ends_sentence && current.chars().count() >= max_chars / 2 {
            chunks.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
