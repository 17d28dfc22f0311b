use thiserror::Error;

/// Failures from the caption compiler. None of these are retried: the
/// compiler is deterministic over its inputs, so the caller either falls
/// back to a static text render or skips the overlay entirely.
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("no word-level or utterance-level timing data available")]
    NoTimingData,

    #[error("no words remain after normalization (input text was empty)")]
    EmptyInput,

    #[error("failed to write caption document: {0}")]
    Serialization(#[from] std::io::Error),
}

/// Failures from a single LLM provider attempt. The router logs these and
/// moves on to the next provider in the configured order.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("no API key configured for {0}")]
    MissingApiKey(&'static str),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API responded with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not extract text from response: {0}")]
    Parse(String),
}
