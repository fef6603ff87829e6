use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::prompt_engine::{
    lenient_label, FocusArea, LengthPreset, OutputFormat, DEFAULT_ENDPOINT,
};

const CONFIG_DIR: &str = "promgine";
const CONFIG_FILE: &str = "settings.json";
const API_KEY_XOR_KEY: &[u8] = b"promgine-local-key-v1";

pub const CONFIG_DIR_ENV: &str = "PROMGINE_CONFIG_DIR";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const CUSTOM_INSTRUCTIONS_ENV: &str = "PROMGINE_CUSTOM_INSTRUCTIONS";
pub const ENDPOINT_ENV: &str = "PROMGINE_ENDPOINT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Could not determine a config directory; set {}", CONFIG_DIR_ENV)]
    NoConfigDir,
}

/// Persisted user settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub api_key_obfuscated: Option<String>,
    pub custom_instructions: Option<String>,
    #[serde(deserialize_with = "lenient_label")]
    pub length: Option<LengthPreset>,
    #[serde(deserialize_with = "lenient_label")]
    pub output_format: Option<OutputFormat>,
    #[serde(deserialize_with = "lenient_label")]
    pub focus_area: Option<FocusArea>,
    pub endpoint: Option<String>,
}

/// Partial update; `Some("")` clears a text field
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub api_key: Option<String>,
    pub custom_instructions: Option<String>,
    pub length: Option<LengthPreset>,
    pub output_format: Option<OutputFormat>,
    pub focus_area: Option<FocusArea>,
    pub endpoint: Option<String>,
}

/// Values given explicitly for one invocation (e.g. CLI flags)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub custom_instructions: Option<String>,
    pub endpoint: Option<String>,
}

/// Effective settings after applying overrides, environment and the file
#[derive(Clone)]
pub struct ResolvedSettings {
    pub credential: Option<String>,
    pub custom_instructions: Option<String>,
    pub endpoint: String,
    pub length: Option<LengthPreset>,
    pub output_format: Option<OutputFormat>,
    pub focus_area: Option<FocusArea>,
}

impl std::fmt::Debug for ResolvedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSettings")
            .field("credential", &self.credential.as_deref().map(mask_api_key))
            .field("custom_instructions", &self.custom_instructions)
            .field("endpoint", &self.endpoint)
            .field("length", &self.length)
            .field("output_format", &self.output_format)
            .field("focus_area", &self.focus_area)
            .finish()
    }
}

pub fn settings_path() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(CONFIG_DIR),
    };
    Ok(dir.join(CONFIG_FILE))
}

pub fn load_or_create(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        let settings = Settings::default();
        save(path, &settings)?;
        return Ok(settings);
    }

    let raw = fs::read_to_string(path).map_err(|source| io_error(path, source))?;
    match serde_json::from_str::<Settings>(&raw) {
        Ok(mut settings) => {
            normalize_settings(&mut settings);
            Ok(settings)
        }
        Err(e) => {
            tracing::warn!("Settings file {} is corrupt ({}); resetting", path.display(), e);
            let backup = path.with_extension("json.bak");
            if let Err(copy_err) = fs::copy(path, &backup) {
                tracing::warn!(
                    "Could not back up corrupt settings to {}: {}; original contents will be lost",
                    backup.display(),
                    copy_err
                );
            }
            let settings = Settings::default();
            save(path, &settings)?;
            Ok(settings)
        }
    }
}

pub fn save(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).map_err(|source| io_error(path, source))
}

pub fn update(path: &Path, payload: SettingsUpdate) -> Result<Settings, ConfigError> {
    let mut settings = load_or_create(path)?;

    if let Some(api_key) = payload.api_key {
        let trimmed = api_key.trim();
        settings.api_key_obfuscated = if trimmed.is_empty() {
            None
        } else {
            Some(obfuscate_api_key(trimmed))
        };
    }

    if let Some(instructions) = payload.custom_instructions {
        settings.custom_instructions = non_blank(instructions);
    }

    if let Some(endpoint) = payload.endpoint {
        settings.endpoint = non_blank(endpoint);
    }

    if payload.length.is_some() {
        settings.length = payload.length;
    }
    if payload.output_format.is_some() {
        settings.output_format = payload.output_format;
    }
    if payload.focus_area.is_some() {
        settings.focus_area = payload.focus_area;
    }

    save(path, &settings)?;
    tracing::info!("Settings saved to {}", path.display());
    Ok(settings)
}

pub fn reset(path: &Path) -> Result<(), ConfigError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(io_error(path, source)),
    }
}

pub fn decode_api_key(settings: &Settings) -> Option<String> {
    settings
        .api_key_obfuscated
        .as_deref()
        .and_then(deobfuscate_api_key)
}

pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 10 {
        return "******".to_string();
    }

    let prefix: String = chars[..6].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}********{}", prefix, suffix)
}

/// Precedence per field: explicit override, then environment, then the file.
pub fn resolve(settings: &Settings, overrides: Overrides) -> ResolvedSettings {
    let credential = overrides
        .api_key
        .and_then(non_blank)
        .or_else(|| env_value(API_KEY_ENV))
        .or_else(|| decode_api_key(settings));

    let custom_instructions = overrides
        .custom_instructions
        .and_then(non_blank)
        .or_else(|| env_value(CUSTOM_INSTRUCTIONS_ENV))
        .or_else(|| settings.custom_instructions.clone());

    let endpoint = overrides
        .endpoint
        .and_then(non_blank)
        .or_else(|| env_value(ENDPOINT_ENV))
        .or_else(|| settings.endpoint.clone())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    ResolvedSettings {
        credential,
        custom_instructions,
        endpoint,
        length: settings.length,
        output_format: settings.output_format,
        focus_area: settings.focus_area,
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(non_blank)
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn normalize_settings(settings: &mut Settings) {
    settings.custom_instructions = settings.custom_instructions.take().and_then(non_blank);
    settings.endpoint = settings.endpoint.take().and_then(non_blank);
    if decode_api_key(settings).is_none() {
        settings.api_key_obfuscated = None;
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn obfuscate_api_key(api_key: &str) -> String {
    let mut bytes = api_key.as_bytes().to_vec();
    for (idx, byte) in bytes.iter_mut().enumerate() {
        *byte ^= API_KEY_XOR_KEY[idx % API_KEY_XOR_KEY.len()];
    }
    BASE64_STANDARD.encode(bytes)
}

fn deobfuscate_api_key(obfuscated: &str) -> Option<String> {
    let mut bytes = BASE64_STANDARD.decode(obfuscated).ok()?;
    for (idx, byte) in bytes.iter_mut().enumerate() {
        *byte ^= API_KEY_XOR_KEY[idx % API_KEY_XOR_KEY.len()];
    }
    String::from_utf8(bytes).ok()
}
