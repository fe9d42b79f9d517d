//! Text-to-speech for fabula.
//!
//! Backends implement [`SpeechSynthesizer`]; [`FallbackSynthesizer`] chains
//! them in priority order.

mod espeak;
mod fallback;
mod google;
mod traits;

use std::sync::Arc;

pub use espeak::EspeakTts;
pub use fallback::FallbackSynthesizer;
pub use google::{chunk_text, GoogleTranslateTts, MAX_CHUNK_CHARS};
pub use traits::{Audio, SpeechError, SpeechSynthesizer};

/// Google Translate first, local espeak-ng second
pub fn default_chain() -> FallbackSynthesizer {
    FallbackSynthesizer::new(vec![
        Arc::new(GoogleTranslateTts::default()) as Arc<dyn SpeechSynthesizer>,
        Arc::new(EspeakTts::default()),
    ])
}
