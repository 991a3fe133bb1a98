//! # Moonmint Configuration
//!
//! Default parameters for every pipeline stage, organized into sections.
//!
//! Configuration sources (in priority order):
//! 1. CLI arguments
//! 2. Environment variables (`MOONMINT_<SECTION>__<KEY>`)
//! 3. User config (~/.config/moonmint/config.toml)
//! 4. Built-in defaults

use anyhow::Context;
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use moonmint_core::{
    BlockMode, BlockParams, EmojiParams, EmojiTheme, GenerationParams, PaletteName, ToneMode,
    ToneParams, VariationLevel,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Get the configuration directory
pub fn config_dir() -> PathBuf {
    ProjectDirs::from("dev", "moonmint", "Moonmint")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config/moonmint"))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mutation engine defaults
    pub generation: GenerationConfig,
    /// Tone transform defaults
    pub tone: ToneConfig,
    /// Block renderer defaults
    pub blocks: BlocksConfig,
    /// Emoji substitution defaults
    pub emoji: EmojiConfig,
    /// Where templates come from
    pub catalog: CatalogConfig,
    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub variation: VariationLevel,
    /// 1-10
    pub complexity: u8,
    /// Prefer thematically similar substitutions
    pub preserve_theme: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            variation: VariationLevel::Moderate,
            complexity: 5,
            preserve_theme: true,
        }
    }
}

impl GenerationConfig {
    pub fn params(&self, seed: impl Into<String>, template_id: impl Into<String>) -> GenerationParams {
        GenerationParams::new(seed, template_id)
            .with_variation(self.variation)
            .with_complexity(self.complexity)
            .with_preserve_theme(self.preserve_theme)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub mode: ToneMode,
    pub intensity: u8,
    pub shadow_depth: u8,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            mode: ToneMode::Brightness,
            intensity: 50,
            shadow_depth: 50,
        }
    }
}

impl ToneConfig {
    pub fn params(&self, seed: Option<String>) -> ToneParams {
        ToneParams {
            mode: self.mode,
            intensity: self.intensity,
            shadow_depth: self.shadow_depth,
            seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlocksConfig {
    pub mode: BlockMode,
    pub palette: PaletteName,
    pub intensity: u8,
    pub contrast_level: u8,
}

impl Default for BlocksConfig {
    fn default() -> Self {
        Self {
            mode: BlockMode::Shading,
            palette: PaletteName::Moon,
            intensity: 50,
            contrast_level: 50,
        }
    }
}

impl BlocksConfig {
    pub fn params(&self) -> BlockParams {
        BlockParams::new(self.mode, self.palette)
            .with_intensity(self.intensity)
            .with_contrast(self.contrast_level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmojiConfig {
    pub theme: EmojiTheme,
    pub variation: VariationLevel,
    pub complexity: u8,
}

impl Default for EmojiConfig {
    fn default() -> Self {
        Self {
            theme: EmojiTheme::Lunar,
            variation: VariationLevel::Moderate,
            complexity: 5,
        }
    }
}

impl EmojiConfig {
    pub fn params(&self, seed: impl Into<String>) -> EmojiParams {
        EmojiParams::new(self.theme, self.variation, seed).with_complexity(self.complexity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory of `<id>.toml` templates layered over the builtin catalog
    pub template_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration manager with file storage
pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager for the user config file
    pub fn new() -> anyhow::Result<Self> {
        Self::with_path(config_dir().join("config.toml"))
    }

    /// Create a config manager backed by `config_path`. A missing file means
    /// defaults plus environment overrides.
    pub fn with_path(config_path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let config_path = config_path.into();
        let config = Self::load_from_file(&config_path)?;
        tracing::debug!(path = %config_path.display(), "configuration loaded");

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Load configuration from file
    fn load_from_file(path: &Path) -> anyhow::Result<Config> {
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("MOONMINT_").split("__"));

        figment
            .extract()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get current configuration
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Update configuration
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.write();
        f(&mut config);
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let config = self.config.read();
        let content = toml::to_string_pretty(&*config)?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        std::fs::write(&self.config_path, content)
            .with_context(|| format!("writing {}", self.config_path.display()))?;
        Ok(())
    }
}
