//! # Block Density Renderer
//!
//! Redraws text art with Unicode block glyphs. The text is classified once
//! (dense clusters, organic curves, or plain structure) to choose a ramp;
//! each visible character is then placed on that ramp by its ink density, and
//! each line is given a palette color from its own density.
//!
//! ```text
//!   .:::.      ▁▃▃▃▁
//!  (::O::)  → ▂▃▃▅▃▃▂    palette: moon  ░ ▒ ▓ █
//!   '.:.'      ▁▁▃▁▁
//! ```
//!
//! Colors are computed here and only here; the [`crate::export`] helpers
//! consume them so every output format agrees.

use crate::error::{CoreError, Result};
use crate::ramp::{glyph_density, line_density, nearest_index};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static DENSE_CLUSTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#@%&]{3,}").expect("Invalid dense cluster regex"));

const ORGANIC_GLYPHS: &[char] = &['o', 'O', '0', '(', ')', '{', '}'];

/// How much the intensity setting lifts every glyph's density
const INTENSITY_LIFT: f64 = 0.3;

/// Block rendering styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockMode {
    /// Return the text unchanged
    #[default]
    None,
    /// Shade by density with the content-class ramp
    Shading,
    /// Full blocks, colored per line
    Solid,
    /// Content-class ramp, colored per line
    Gradient,
    /// Quadrant patterns
    Pattern,
    /// Box-drawing strokes
    Boxdraw,
}

impl BlockMode {
    pub fn all() -> &'static [BlockMode] {
        &[
            BlockMode::None,
            BlockMode::Shading,
            BlockMode::Solid,
            BlockMode::Gradient,
            BlockMode::Pattern,
            BlockMode::Boxdraw,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockMode::None => "none",
            BlockMode::Shading => "shading",
            BlockMode::Solid => "solid",
            BlockMode::Gradient => "gradient",
            BlockMode::Pattern => "pattern",
            BlockMode::Boxdraw => "boxdraw",
        }
    }

    /// Whether characters and lines carry palette colors in this mode
    pub fn is_colored(&self) -> bool {
        matches!(self, BlockMode::Solid | BlockMode::Gradient)
    }

    /// Ramp for this mode, sparsest first
    pub fn ramp(&self, class: ContentClass) -> &'static [char] {
        match self {
            BlockMode::None => &[],
            BlockMode::Shading | BlockMode::Gradient => class.ramp(),
            BlockMode::Solid => &['█'],
            BlockMode::Pattern => &['▘', '▚', '▙', '█'],
            BlockMode::Boxdraw => &['┄', '─', '━', '┼', '╋', '█'],
        }
    }
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlockMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        BlockMode::all()
            .iter()
            .copied()
            .find(|mode| mode.name() == normalized)
            .ok_or_else(|| CoreError::invalid("mode", format!("unknown block mode '{s}'")))
    }
}

/// Six-stop color palettes, darkest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteName {
    #[default]
    Moon,
    Fire,
    Forest,
    Grayscale,
    Sunset,
}

impl PaletteName {
    pub fn all() -> &'static [PaletteName] {
        &[
            PaletteName::Moon,
            PaletteName::Fire,
            PaletteName::Forest,
            PaletteName::Grayscale,
            PaletteName::Sunset,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaletteName::Moon => "moon",
            PaletteName::Fire => "fire",
            PaletteName::Forest => "forest",
            PaletteName::Grayscale => "grayscale",
            PaletteName::Sunset => "sunset",
        }
    }

    /// Hex color stops from sparsest to densest
    pub fn stops(&self) -> &'static [&'static str; 6] {
        match self {
            PaletteName::Moon => &[
                "#0B0D17", "#1F2440", "#3C4A75", "#7C8DB5", "#C9D3E8", "#F5F3E7",
            ],
            PaletteName::Fire => &[
                "#1A0500", "#5C1100", "#A52A00", "#E25822", "#FF9A3C", "#FFE08A",
            ],
            PaletteName::Forest => &[
                "#07140A", "#123D1C", "#1F6B30", "#3E9A4A", "#7CC576", "#C8EBB5",
            ],
            PaletteName::Grayscale => &[
                "#000000", "#333333", "#666666", "#999999", "#CCCCCC", "#FFFFFF",
            ],
            PaletteName::Sunset => &[
                "#2D1B4E", "#6B2D5C", "#B33F62", "#F9564F", "#F3C677", "#FFF1C1",
            ],
        }
    }

    /// Stop nearest to a 0-100 density
    pub fn color_for(&self, density: f64) -> &'static str {
        let stops = self.stops();
        stops[nearest_index(stops.len(), density)]
    }
}

impl fmt::Display for PaletteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaletteName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let normalized = if normalized == "greyscale" {
            "grayscale".to_string()
        } else {
            normalized
        };
        PaletteName::all()
            .iter()
            .copied()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| CoreError::invalid("palette", format!("unknown palette '{s}'")))
    }
}

/// What kind of art the text is, for ramp selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentClass {
    /// Contains a run of three or more heavy glyphs (`#@%&`)
    Dense,
    /// Contains round glyphs (`oO0(){}`)
    Organic,
    Structured,
}

impl ContentClass {
    pub fn detect(text: &str) -> Self {
        if DENSE_CLUSTER_REGEX.is_match(text) {
            ContentClass::Dense
        } else if text.chars().any(|c| ORGANIC_GLYPHS.contains(&c)) {
            ContentClass::Organic
        } else {
            ContentClass::Structured
        }
    }

    pub fn ramp(&self) -> &'static [char] {
        match self {
            ContentClass::Dense => &['░', '▒', '▓', '█'],
            ContentClass::Organic => &['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'],
            ContentClass::Structured => &['▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'],
        }
    }
}

/// Block rendering parameters. Intensities are clamped to 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParams {
    pub mode: BlockMode,
    pub palette: PaletteName,
    pub intensity: u8,
    /// 50 keeps densities as they are; lower flattens, higher stretches
    pub contrast_level: u8,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self {
            mode: BlockMode::None,
            palette: PaletteName::Moon,
            intensity: 50,
            contrast_level: 50,
        }
    }
}

impl BlockParams {
    pub fn new(mode: BlockMode, palette: PaletteName) -> Self {
        Self {
            mode,
            palette,
            ..Self::default()
        }
    }

    pub fn with_intensity(mut self, intensity: u8) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_contrast(mut self, contrast_level: u8) -> Self {
        self.contrast_level = contrast_level;
        self
    }
}

/// Rendered block art with the colors every exporter reuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRender {
    pub art: String,
    pub mode: BlockMode,
    pub palette: PaletteName,
    pub content_class: ContentClass,
    /// Density of each line, 0-100
    pub line_densities: Vec<f64>,
    /// Background color per line; set only in colored modes
    pub line_colors: Vec<Option<String>>,
    /// Foreground color per character, parallel to `art`'s lines
    pub char_colors: Vec<Vec<Option<String>>>,
}

impl BlockRender {
    /// Lines of the rendered art as characters
    pub fn rows(&self) -> Vec<Vec<char>> {
        self.art.split('\n').map(|l| l.chars().collect()).collect()
    }
}

/// Density a glyph is drawn at after intensity and contrast.
pub fn adjusted_density(ch: char, intensity: u8, contrast_level: u8) -> f64 {
    let lifted =
        (glyph_density(ch) + f64::from(intensity.min(100)) * INTENSITY_LIFT).clamp(0.0, 100.0);
    let contrast = f64::from(contrast_level.min(100)) / 50.0;
    (50.0 + (lifted - 50.0) * contrast).clamp(0.0, 100.0)
}

/// Render `text` with block glyphs.
pub fn render_blocks(text: &str, params: &BlockParams) -> BlockRender {
    let lines: Vec<Vec<char>> = text.split('\n').map(|l| l.chars().collect()).collect();
    let content_class = ContentClass::detect(text);
    let line_densities: Vec<f64> = lines.iter().map(|l| line_density(l)).collect();
    let colored = params.mode.is_colored();

    let line_colors: Vec<Option<String>> = line_densities
        .iter()
        .map(|d| colored.then(|| params.palette.color_for(*d).to_string()))
        .collect();

    let char_colors: Vec<Vec<Option<String>>> = lines
        .iter()
        .zip(&line_colors)
        .map(|(line, color)| {
            line.iter()
                .map(|ch| if *ch == ' ' { None } else { color.clone() })
                .collect()
        })
        .collect();

    let art = if params.mode == BlockMode::None {
        text.to_string()
    } else {
        let ramp = params.mode.ramp(content_class);
        lines
            .iter()
            .map(|line| {
                line.iter()
                    .map(|&ch| {
                        if ch == ' ' {
                            ch
                        } else {
                            let density =
                                adjusted_density(ch, params.intensity, params.contrast_level);
                            ramp[nearest_index(ramp.len(), density)]
                        }
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    tracing::debug!(
        mode = %params.mode,
        palette = %params.palette,
        ?content_class,
        lines = lines.len(),
        "block render"
    );

    BlockRender {
        art,
        mode: params.mode,
        palette: params.palette,
        content_class,
        line_densities,
        line_colors,
        char_colors,
    }
}
