// prompt_engine/types.rs — Core types for Prompt Engine

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A closed set of user-facing option labels.
///
/// Parsing never fails loudly: an unknown label is `None`, and the compiler
/// maps `None` to the documented default phrase.
pub trait OptionLabel: Sized + Copy {
    fn from_label(label: &str) -> Option<Self>;
    fn label(&self) -> &'static str;
}

/// Verbosity of the enhanced prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthPreset {
    Short,
    Medium,
    Detailed,
    Comprehensive,
}

impl OptionLabel for LengthPreset {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "short" => Some(Self::Short),
            "medium" => Some(Self::Medium),
            "detailed" => Some(Self::Detailed),
            "comprehensive" => Some(Self::Comprehensive),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Detailed => "detailed",
            Self::Comprehensive => "comprehensive",
        }
    }
}

/// Formatting the enhanced prompt should ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Plain,
    Structured,
    Json,
}

impl OptionLabel for OutputFormat {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "markdown" => Some(Self::Markdown),
            "plain" => Some(Self::Plain),
            "structured" => Some(Self::Structured),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Plain => "plain",
            Self::Structured => "structured",
            Self::Json => "json",
        }
    }
}

/// Tone the enhanced prompt should take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusArea {
    Clarity,
    Creativity,
    Technical,
    Persuasive,
    Balanced,
}

impl OptionLabel for FocusArea {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "clarity" => Some(Self::Clarity),
            "creativity" => Some(Self::Creativity),
            "technical" => Some(Self::Technical),
            "persuasive" => Some(Self::Persuasive),
            "balanced" => Some(Self::Balanced),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Clarity => "clarity",
            Self::Creativity => "creativity",
            Self::Technical => "technical",
            Self::Persuasive => "persuasive",
            Self::Balanced => "balanced",
        }
    }
}

/// Deserialize an optional option label, mapping unknown labels to `None`
/// instead of failing the whole document.
pub(crate) fn lenient_label<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: OptionLabel,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(T::from_label))
}

/// One enhancement call's input. Request-scoped and never mutated by the engine.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementRequest {
    pub raw_text: String,
    #[serde(default, rename = "lengthPreset", deserialize_with = "lenient_label")]
    pub length: Option<LengthPreset>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub output_format: Option<OutputFormat>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub focus_area: Option<FocusArea>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
    #[serde(default)]
    pub credential: String,
}

impl EnhancementRequest {
    pub fn new(raw_text: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            credential: credential.into(),
            ..Self::default()
        }
    }

    pub fn with_length(mut self, length: Option<LengthPreset>) -> Self {
        self.length = length;
        self
    }

    pub fn with_output_format(mut self, format: Option<OutputFormat>) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_focus_area(mut self, focus: Option<FocusArea>) -> Self {
        self.focus_area = focus;
        self
    }

    pub fn with_custom_instructions(mut self, instructions: Option<String>) -> Self {
        self.custom_instructions = instructions;
        self
    }
}

// The credential must never reach logs, so Debug is written by hand.
impl fmt::Debug for EnhancementRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancementRequest")
            .field("raw_text", &self.raw_text)
            .field("length", &self.length)
            .field("output_format", &self.output_format)
            .field("focus_area", &self.focus_area)
            .field("custom_instructions", &self.custom_instructions)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// The enhanced prompt text; empty when the provider returned no candidate.
pub type EnhancementResult = String;

/// Coarse classification so callers can branch without matching message text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Api,
    Transport,
    InvalidResponse,
    InvalidEndpoint,
}

/// Caller-side validation failures, raised before any network traffic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("Please enter a prompt to enhance")]
    EmptyPrompt,

    #[error("Please enter your Gemini API key first")]
    MissingCredential,
}

/// LLM adapter errors
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// Provider answered with a non-success status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Request never completed (DNS, TLS, connection reset, timeout)
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Invalid response from LLM: {0}")]
    InvalidResponse(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

impl LLMError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LLMError::Api { .. } => ErrorKind::Api,
            LLMError::Transport(_) => ErrorKind::Transport,
            LLMError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            LLMError::InvalidEndpoint(_) => ErrorKind::InvalidEndpoint,
        }
    }
}

/// Prompt Engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    LLM(#[from] LLMError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Precondition(_) => ErrorKind::Precondition,
            EngineError::LLM(e) => e.kind(),
        }
    }
}
