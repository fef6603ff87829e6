use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{self, ConfigError, Overrides, ResolvedSettings, SettingsUpdate};
use crate::prompt_engine::{
    compile, EngineError, EnhancementRequest, FocusArea, LengthPreset, OptionLabel, OutputFormat,
    PromptEngine,
};

#[derive(Debug, Parser)]
#[command(name = "promgine")]
#[command(version)]
#[command(
    about = "Transform raw prompts into detailed, structured instructions for AI models",
    long_about = None
)]
pub struct Cli {
    /// Settings file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Enhance a raw prompt with Gemini
    #[command(visible_alias = "e")]
    Enhance {
        #[command(flatten)]
        prompt: PromptArgs,
        /// Print {"enhancedPrompt": ...} instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Print the request body that `enhance` would send, without sending it
    #[command(visible_alias = "c")]
    Compile {
        #[command(flatten)]
        prompt: PromptArgs,
    },
    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Args)]
pub struct PromptArgs {
    /// Raw prompt text
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
    /// short, medium, detailed or comprehensive
    #[arg(short, long)]
    pub length: Option<String>,
    /// markdown, plain, structured or json
    #[arg(short, long)]
    pub format: Option<String>,
    /// clarity, creativity, technical, persuasive or balanced
    #[arg(long)]
    pub focus: Option<String>,
    /// Gemini API key (overrides GEMINI_API_KEY and the stored key)
    #[arg(long)]
    pub api_key: Option<String>,
    /// Replaces the default assistant role text
    #[arg(long)]
    pub instructions: Option<String>,
    /// Provider endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print current settings with the API key masked
    Show,
    /// Update one or more settings; an empty value clears it
    Set {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        instructions: Option<String>,
        #[arg(long)]
        length: Option<String>,
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        focus: Option<String>,
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Delete the settings file
    Reset,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown {kind} '{label}'")]
    UnknownLabel { kind: &'static str, label: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnhanceOutput<'a> {
    enhanced_prompt: &'a str,
}

pub async fn execute(cli: Cli, out: &mut dyn Write) -> Result<(), AppError> {
    let path = match cli.config {
        Some(path) => path,
        None => config::settings_path()?,
    };

    match cli.command {
        Commands::Enhance { prompt, json } => {
            let (request, resolved) = prepare(&path, prompt)?;
            let engine = PromptEngine::with_endpoint(&resolved.endpoint)?;
            let text = engine.enhance(&request).await?;

            if json {
                let rendered = serde_json::to_string_pretty(&EnhanceOutput {
                    enhanced_prompt: &text,
                })?;
                writeln!(out, "{}", rendered)?;
            } else if text.is_empty() {
                eprintln!("The provider returned no enhanced prompt. Try rephrasing and run again.");
            } else {
                writeln!(out, "{}", text)?;
            }
            Ok(())
        }
        Commands::Compile { prompt } => {
            let (request, _) = prepare(&path, prompt)?;
            let compiled = compile(&request);
            let rendered = serde_json::to_string_pretty(&compiled.body)?;
            writeln!(out, "{}", rendered)?;
            Ok(())
        }
        Commands::Settings { action } => run_settings(&path, action, out),
    }
}

fn prepare(
    path: &Path,
    args: PromptArgs,
) -> Result<(EnhancementRequest, ResolvedSettings), AppError> {
    let settings = config::load_or_create(path)?;
    let resolved = config::resolve(
        &settings,
        Overrides {
            api_key: args.api_key,
            custom_instructions: args.instructions,
            endpoint: args.endpoint,
        },
    );

    let request = EnhancementRequest::new(
        args.text.join(" "),
        resolved.credential.clone().unwrap_or_default(),
    )
    .with_length(pick(args.length.as_deref(), resolved.length, "length"))
    .with_output_format(pick(args.format.as_deref(), resolved.output_format, "format"))
    .with_focus_area(pick(args.focus.as_deref(), resolved.focus_area, "focus"))
    .with_custom_instructions(resolved.custom_instructions.clone());

    Ok((request, resolved))
}

/// Flag wins over the stored preference; an unknown flag value compiles to
/// the default phrase rather than failing.
fn pick<T: OptionLabel>(flag: Option<&str>, stored: Option<T>, kind: &str) -> Option<T> {
    match flag {
        Some(label) => {
            let parsed = T::from_label(label);
            if parsed.is_none() {
                tracing::warn!("Unknown {} '{}', using the default", kind, label);
            }
            parsed
        }
        None => stored,
    }
}

/// Stored preferences are validated strictly so typos are not persisted.
fn strict<T: OptionLabel>(label: Option<String>, kind: &'static str) -> Result<Option<T>, AppError> {
    match label {
        None => Ok(None),
        Some(label) => T::from_label(&label)
            .map(Some)
            .ok_or(AppError::UnknownLabel { kind, label }),
    }
}

fn run_settings(path: &Path, action: SettingsAction, out: &mut dyn Write) -> Result<(), AppError> {
    match action {
        SettingsAction::Show => {
            let settings = config::load_or_create(path)?;
            let api_key = config::decode_api_key(&settings)
                .map(|key| config::mask_api_key(&key))
                .unwrap_or_else(|| "not set".to_string());

            writeln!(out, "Settings file:       {}", path.display())?;
            writeln!(out, "API key:             {}", api_key)?;
            writeln!(
                out,
                "Custom instructions: {}",
                settings.custom_instructions.as_deref().unwrap_or("not set")
            )?;
            writeln!(out, "Length:              {}", label_or_default(settings.length))?;
            writeln!(out, "Format:              {}", label_or_default(settings.output_format))?;
            writeln!(out, "Focus:               {}", label_or_default(settings.focus_area))?;
            writeln!(
                out,
                "Endpoint:            {}",
                settings.endpoint.as_deref().unwrap_or("default")
            )?;
            Ok(())
        }
        SettingsAction::Set {
            api_key,
            instructions,
            length,
            format,
            focus,
            endpoint,
        } => {
            let update = SettingsUpdate {
                api_key,
                custom_instructions: instructions,
                length: strict::<LengthPreset>(length, "length")?,
                output_format: strict::<OutputFormat>(format, "format")?,
                focus_area: strict::<FocusArea>(focus, "focus")?,
                endpoint,
            };
            config::update(path, update)?;
            writeln!(out, "Settings saved.")?;
            Ok(())
        }
        SettingsAction::Reset => {
            config::reset(path)?;
            writeln!(out, "Settings reset.")?;
            Ok(())
        }
    }
}

fn label_or_default<T: OptionLabel>(value: Option<T>) -> &'static str {
    value.map(|v| v.label()).unwrap_or("default")
}
