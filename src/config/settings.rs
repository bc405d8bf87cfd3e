//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ServicesConfig
// ---------------------------------------------------------------------------

/// Connection settings shared by the three external services (image
/// generation, evaluation, transcription).
///
/// Everything speaks the OpenAI-compatible wire format, so a single base URL
/// and key cover all three endpoints. Nothing is hardcoded beyond the routes:
/// point `base_url` at any compatible provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Base URL of the API (e.g. `https://api.openai.com`).
    pub base_url: String,
    /// API key. `None` means no `Authorization` header is attached; the
    /// `DESCRIBELO_API_KEY` environment variable is consulted as a fallback.
    pub api_key: Option<String>,
    /// Model used for image generation (e.g. `"gpt-image-1"`).
    pub image_model: String,
    /// Model used for description evaluation (e.g. `"gpt-4o-mini"`).
    pub eval_model: String,
    /// Model used for speech transcription (e.g. `"whisper-1"`).
    pub stt_model: String,
    /// Target language of the exercise as an ISO-639-1 code.
    ///
    /// Sent to the transcription service as a hint and used to phrase the
    /// evaluation rubric.
    pub language: String,
    /// Maximum seconds to wait for any service response before timing out.
    pub timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            image_model: "gpt-image-1".into(),
            eval_model: "gpt-4o-mini".into(),
            stt_model: "whisper-1".into(),
            language: "es".into(),
            timeout_secs: 60,
        }
    }
}

impl ServicesConfig {
    /// The API key to attach to requests, if any.
    ///
    /// Prefers the configured value; falls back to the `DESCRIBELO_API_KEY`
    /// environment variable. Empty strings count as "no key".
    pub fn resolved_api_key(&self) -> Option<String> {
        let configured = self.api_key.as_deref().unwrap_or("");
        if !configured.is_empty() {
            return Some(configured.to_string());
        }
        match std::env::var("DESCRIBELO_API_KEY") {
            Ok(key) if !key.is_empty() => Some(key),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate of the finalized clip in Hz (the transcription service
    /// expects 16 000).
    pub sample_rate: u32,
    /// Maximum clip length in seconds; samples past this are dropped so a
    /// forgotten recording cannot grow without bound.
    pub max_clip_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            max_clip_secs: 120.0,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui window appearance and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels. `None` means
    /// let the OS / window manager pick a position on first launch.
    pub window_position: Option<(f32, f32)>,
    /// Initial window size `(width, height)`.
    pub window_size: (f32, f32),
    /// Keep the window floating above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            window_size: (480.0, 640.0),
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use describelo::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// External service connection settings.
    pub services: ServicesConfig,
    /// Audio capture settings.
    pub audio: AudioConfig,
    /// UI / window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
