// prompt_engine/compiler.rs — Option tables and instruction assembly
//
// Everything here is pure: the same request always compiles to byte-identical
// instruction text and request body.

use super::llm::gemini::GenerateContentRequest;
use super::types::{EnhancementRequest, FocusArea, LengthPreset, OutputFormat};

pub const DEFAULT_ROLE_PREAMBLE: &str = "You are Promgine, an advanced prompt engineering assistant. \
Your task is to transform user-provided raw prompts into enhanced prompts that will produce better \
results when used with AI models.";

/// Sections every enhanced prompt is asked to contain. Order is part of the contract.
pub const STRUCTURE_SECTIONS: [&str; 6] = [
    "A clear objective statement",
    "Detailed context and background",
    "Specific requirements and constraints",
    "Format specifications for the desired output",
    "Examples or references where appropriate",
    "Additional instructions or preferences",
];

const DETAIL_GUIDANCE: &str = "Include relevant details, context, and specific instructions in \
the enhanced prompt. Make it clear, specific, and actionable.";

const CLOSING_GUIDANCE: &str = "The enhanced prompt should be comprehensive yet focused, \
providing just the right amount of detail and direction.";

const TRANSFORM_REQUEST: &str =
    "Please transform this raw prompt into an enhanced, well-structured prompt.";

/// Instruction text plus the wire body that carries it
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledInstruction {
    pub instruction: String,
    pub body: GenerateContentRequest,
}

pub fn length_phrase(length: Option<LengthPreset>) -> &'static str {
    match length {
        Some(LengthPreset::Short) => "concise and to-the-point",
        Some(LengthPreset::Detailed) | Some(LengthPreset::Comprehensive) => {
            "highly detailed and comprehensive"
        }
        Some(LengthPreset::Medium) | None => "moderately detailed",
    }
}

pub fn format_phrase(format: Option<OutputFormat>) -> &'static str {
    match format {
        Some(OutputFormat::Plain) => {
            "Format the output as plain text with no special formatting."
        }
        Some(OutputFormat::Structured) => {
            "Format the output as a structured list with clear sections, numbered items, and hierarchical organization."
        }
        // Json has no phrase of its own yet and falls through to the default.
        Some(OutputFormat::Markdown) | Some(OutputFormat::Json) | None => {
            "Format the output using Markdown with appropriate headers, lists, and formatting."
        }
    }
}

pub fn focus_phrase(focus: Option<FocusArea>) -> &'static str {
    match focus {
        Some(FocusArea::Clarity) => "Focus on clarity and straightforward communication.",
        Some(FocusArea::Creativity) => "Emphasize creativity and innovative thinking.",
        Some(FocusArea::Technical) => "Prioritize technical accuracy and precision.",
        Some(FocusArea::Persuasive) => "Use persuasive language and compelling arguments.",
        Some(FocusArea::Balanced) | None => "Balance clarity with creativity.",
    }
}

/// Role preamble: custom instructions replace the default text entirely.
fn preamble(custom_instructions: Option<&str>) -> &str {
    match custom_instructions {
        Some(text) if !text.trim().is_empty() => text,
        _ => DEFAULT_ROLE_PREAMBLE,
    }
}

/// Build the system instruction for a request
pub fn compile_instruction(request: &EnhancementRequest) -> String {
    let sections = STRUCTURE_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, section)| format!("{}. {}", i + 1, section))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\nThe enhanced prompt should be {}.\n\n{}\n\n{}\n\n{}\n\nStructure the enhanced prompt with:\n{}\n\n{}",
        preamble(request.custom_instructions.as_deref()),
        length_phrase(request.length),
        format_phrase(request.output_format),
        focus_phrase(request.focus_area),
        DETAIL_GUIDANCE,
        sections,
        CLOSING_GUIDANCE,
    )
}

/// Compile a request into its instruction and provider request body.
///
/// Assumes `raw_text` was already validated as non-empty by the caller.
pub fn compile(request: &EnhancementRequest) -> CompiledInstruction {
    let instruction = compile_instruction(request);
    let turn = format!(
        "SYSTEM: {}\n\nRAW PROMPT: {}\n\n{}",
        instruction, request.raw_text, TRANSFORM_REQUEST
    );

    CompiledInstruction {
        body: GenerateContentRequest::single_turn(turn),
        instruction,
    }
}
