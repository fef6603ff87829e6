// prompt_engine/mod.rs - Main Prompt Engine

mod compiler;
mod llm;
mod types;

pub use compiler::{
    compile, compile_instruction, focus_phrase, format_phrase, length_phrase,
    CompiledInstruction, DEFAULT_ROLE_PREAMBLE, STRUCTURE_SECTIONS,
};
pub use llm::gemini::{GeminiInvoker, GenerateContentRequest, DEFAULT_ENDPOINT};
pub use llm::{HttpTransport, ReqwestTransport, TransportResponse};
pub use types::{
    EngineError, EnhancementRequest, EnhancementResult, ErrorKind, FocusArea, LLMError,
    LengthPreset, OptionLabel, OutputFormat, PreconditionError,
};

pub(crate) use types::lenient_label;

/// Prompt Engine - validates a request, compiles it and sends it to Gemini.
///
/// Holds no per-call state, so concurrent `enhance` calls are independent.
pub struct PromptEngine {
    invoker: GeminiInvoker,
}

impl PromptEngine {
    pub fn new(invoker: GeminiInvoker) -> Self {
        Self { invoker }
    }

    /// reqwest-backed engine pointed at `endpoint`
    pub fn with_endpoint(endpoint: &str) -> Result<Self, EngineError> {
        let invoker = GeminiInvoker::new(endpoint)?;
        tracing::info!("PromptEngine initialized: endpoint={}", invoker.endpoint());
        Ok(Self { invoker })
    }

    /// Enhance one prompt. An empty string means the provider returned no
    /// candidate; callers decide how to present that.
    pub async fn enhance(
        &self,
        request: &EnhancementRequest,
    ) -> Result<EnhancementResult, EngineError> {
        if request.raw_text.trim().is_empty() {
            return Err(PreconditionError::EmptyPrompt.into());
        }
        if request.credential.trim().is_empty() {
            return Err(PreconditionError::MissingCredential.into());
        }

        let compiled = compile(request);

        tracing::info!(
            "Enhancing prompt ({} chars): length={}, format={}, focus={}, custom_instructions={}",
            request.raw_text.len(),
            request.length.map(|l| l.label()).unwrap_or("default"),
            request.output_format.map(|f| f.label()).unwrap_or("default"),
            request.focus_area.map(|f| f.label()).unwrap_or("default"),
            request.custom_instructions.is_some(),
        );

        let text = self.invoker.invoke(&compiled.body, &request.credential).await?;

        if text.is_empty() {
            tracing::warn!("Gemini returned no candidate text");
        } else {
            tracing::info!("Gemini: request succeeded ({} chars)", text.len());
        }

        Ok(text)
    }
}
