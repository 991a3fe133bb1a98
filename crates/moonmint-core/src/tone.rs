//! # Tone Transform Layer
//!
//! Recomputes a target brightness for every visible character from local and
//! line-level density, then snaps it onto a brightness-ordered ramp chosen
//! from the whole text. Spaces always pass through, so output has the exact
//! shape of the input.

use crate::error::{CoreError, Result};
use crate::ramp::{glyph_density, line_density, Ramp};
use crate::seed::random;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Combined neighbour-density delta above which contour mode marks an edge
const CONTOUR_THRESHOLD: f64 = 20.0;

/// Maximum per-line jitter applied by tone mapping with a seed
const TONE_JITTER: f64 = 10.0;

/// Tone transform modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToneMode {
    /// Return the text unchanged
    #[default]
    None,
    /// Blend glyph brightness with line density
    Brightness,
    /// Darken characters on the edge of a space
    Shadow,
    /// Brightness follows line density around a midpoint
    ToneMap,
    /// Highlight lines whose density jumps against their neighbours
    Contour,
}

impl ToneMode {
    pub fn all() -> &'static [ToneMode] {
        &[
            ToneMode::None,
            ToneMode::Brightness,
            ToneMode::Shadow,
            ToneMode::ToneMap,
            ToneMode::Contour,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToneMode::None => "none",
            ToneMode::Brightness => "brightness",
            ToneMode::Shadow => "shadow",
            ToneMode::ToneMap => "tone-map",
            ToneMode::Contour => "contour",
        }
    }
}

impl fmt::Display for ToneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToneMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "none" => Ok(ToneMode::None),
            "brightness" => Ok(ToneMode::Brightness),
            "shadow" => Ok(ToneMode::Shadow),
            "tone-map" | "tonemap" => Ok(ToneMode::ToneMap),
            "contour" => Ok(ToneMode::Contour),
            _ => Err(CoreError::invalid("mode", format!("unknown tone mode '{s}'"))),
        }
    }
}

/// Tone transform parameters. Intensities are clamped to 0-100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneParams {
    pub mode: ToneMode,
    pub intensity: u8,
    pub shadow_depth: u8,
    /// Enables per-line jitter in tone-map and contour modes
    pub seed: Option<String>,
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            mode: ToneMode::None,
            intensity: 50,
            shadow_depth: 50,
            seed: None,
        }
    }
}

impl ToneParams {
    pub fn new(mode: ToneMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_intensity(mut self, intensity: u8) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_shadow_depth(mut self, depth: u8) -> Self {
        self.shadow_depth = depth;
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }
}

/// Apply a tone transform. `ToneMode::None` returns `text` unchanged.
pub fn tone_transform(text: &str, params: &ToneParams) -> String {
    if params.mode == ToneMode::None {
        return text.to_string();
    }

    let lines: Vec<Vec<char>> = text.split('\n').map(|l| l.chars().collect()).collect();
    let densities: Vec<f64> = lines.iter().map(|l| line_density(l)).collect();
    let ramp = Ramp::detect(text);
    let tone = Tone {
        params,
        densities: &densities,
        intensity: f64::from(params.intensity.min(100)) / 100.0,
        shadow_depth: f64::from(params.shadow_depth.min(100)) / 100.0,
    };

    tracing::debug!(mode = %params.mode, ?ramp, lines = lines.len(), "tone transform");

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            line.iter()
                .enumerate()
                .map(|(j, &ch)| {
                    if ch == ' ' {
                        return ch;
                    }
                    match tone.target(line, i, j, ch) {
                        Some(level) => snap_visible(ramp, level),
                        None => ch,
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Snap onto the ramp without ever erasing a visible character.
fn snap_visible(ramp: Ramp, level: f64) -> char {
    let chars = ramp.chars();
    chars[ramp.index_for(level).max(1).min(chars.len() - 1)]
}

struct Tone<'a> {
    params: &'a ToneParams,
    densities: &'a [f64],
    intensity: f64,
    shadow_depth: f64,
}

impl Tone<'_> {
    /// Target brightness for the character at `(i, j)`, or `None` to leave
    /// it untouched.
    fn target(&self, line: &[char], i: usize, j: usize, ch: char) -> Option<f64> {
        let base = glyph_density(ch);
        let density = self.densities[i];

        let level = match self.params.mode {
            ToneMode::None => return None,
            ToneMode::Brightness => {
                let weight = self.intensity * 0.5;
                base * (1.0 - weight) + density * weight
            }
            ToneMode::Shadow => {
                let left_open = j == 0 || line[j - 1] == ' ';
                let right_open = j + 1 >= line.len() || line[j + 1] == ' ';
                if !(left_open || right_open) {
                    return None;
                }
                base * (1.0 - self.shadow_depth * self.intensity)
            }
            ToneMode::ToneMap => self.tone_mapped(i),
            ToneMode::Contour => {
                let prev = if i > 0 { self.densities[i - 1] } else { density };
                let next = self.densities.get(i + 1).copied().unwrap_or(density);
                let delta = (density - prev).abs() + (density - next).abs();
                if delta > CONTOUR_THRESHOLD {
                    base + (100.0 - base) * self.intensity
                } else {
                    self.tone_mapped(i)
                }
            }
        };
        Some(level.clamp(0.0, 100.0))
    }

    fn tone_mapped(&self, i: usize) -> f64 {
        let jitter = self.params.seed.as_deref().map_or(0.0, |seed| {
            random(seed, i as u64) * 2.0 * TONE_JITTER - TONE_JITTER
        });
        50.0 + (self.densities[i] - 50.0) * self.intensity + jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ART: &str = "   _.._\n .'o:::'.\n(::O::0::)\n '.:::.'\n\n ~~~~~~~";

    fn same_shape(a: &str, b: &str) {
        let a: Vec<Vec<char>> = a.split('\n').map(|l| l.chars().collect()).collect();
        let b: Vec<Vec<char>> = b.split('\n').map(|l| l.chars().collect()).collect();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.len(), y.len());
            for (p, q) in x.iter().zip(y) {
                assert_eq!(*p == ' ', *q == ' ');
            }
        }
    }

    #[test]
    fn test_none_is_identity() {
        assert_eq!(tone_transform(ART, &ToneParams::new(ToneMode::None)), ART);
    }

    #[test]
    fn test_modes_keep_shape() {
        for mode in ToneMode::all() {
            let params = ToneParams::new(*mode).with_intensity(80).with_seed("s");
            same_shape(ART, &tone_transform(ART, &params));
        }
    }

    #[test]
    fn test_output_uses_detected_ramp() {
        let out = tone_transform(ART, &ToneParams::new(ToneMode::Brightness));
        let ramp = Ramp::detect(ART).chars();
        assert!(out.chars().filter(|c| *c != '\n').all(|c| ramp.contains(&c)));
    }

    #[test]
    fn test_shadow_leaves_interior() {
        let params = ToneParams::new(ToneMode::Shadow)
            .with_intensity(100)
            .with_shadow_depth(100);
        // 'O' has visible neighbours on both sides; the ends touch spaces
        let out = tone_transform(" oOo ", &params);
        let chars: Vec<char> = out.chars().collect();
        assert_eq!(chars[2], 'O');
        // full depth and intensity darken edges to the sparsest visible glyph
        assert_eq!(chars[1], '.');
        assert_eq!(chars[3], '.');
    }

    #[test]
    fn test_tone_map_without_intensity_is_flat() {
        let params = ToneParams::new(ToneMode::ToneMap).with_intensity(0);
        let out = tone_transform("o\nooooo\no   o", &params);
        let ramp = Ramp::Circular;
        let mid = ramp.char_for_level(50.0);
        assert!(out.chars().filter(|c| *c != '\n' && *c != ' ').all(|c| c == mid));
    }

    #[test]
    fn test_seeded_jitter_is_deterministic() {
        let params = ToneParams::new(ToneMode::ToneMap).with_seed("lunar-7");
        assert_eq!(tone_transform(ART, &params), tone_transform(ART, &params));
    }

    #[test]
    fn test_contour_highlights_density_jump() {
        let params = ToneParams::new(ToneMode::Contour).with_intensity(100);
        // middle line is full, neighbours are sparse: delta well over 20
        let out = tone_transform("o    \nooooo\no    ", &params);
        let middle: String = out.split('\n').nth(1).unwrap_or_default().to_string();
        assert_eq!(middle, "@@@@@");
    }

    #[test]
    fn test_intensity_is_clamped() {
        let wild = ToneParams::new(ToneMode::Brightness).with_intensity(250);
        let max = ToneParams::new(ToneMode::Brightness).with_intensity(100);
        assert_eq!(tone_transform(ART, &wild), tone_transform(ART, &max));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("tone-map".parse::<ToneMode>().unwrap(), ToneMode::ToneMap);
        assert_eq!("TONE_MAP".parse::<ToneMode>().unwrap(), ToneMode::ToneMap);
        assert_eq!("tonemap".parse::<ToneMode>().unwrap(), ToneMode::ToneMap);
        assert!("sepia".parse::<ToneMode>().is_err());
    }
}
