//! # Emoji Substitution Engine
//!
//! Replaces structural characters with moon emoji. Only a fixed set of
//! source characters is eligible; each maps to two or three variants per
//! theme. Whether a character is replaced, and by what, is decided by hashing
//! its position with the seed, so the same input always yields the same art.
//!
//! ```text
//!   ( o )   --lunar/dramatic-->   🌛 🌕 🌜
//! ```

use crate::error::{CoreError, Result};
use crate::mutation::{validate_complexity, VariationLevel};
use crate::seed::hash_magnitude;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Source characters that may be replaced
pub const ELIGIBLE_CHARS: &[char] = &[
    'o', 'O', '0', '(', ')', '{', '}', '[', ']', '|', '/', '\\', '~', '-',
];

/// Pure structural glyphs, replaced at a reduced rate
const PROTECTED_CHARS: &[char] = &['|', '/', '\\', '_', '-', '='];
const PROTECTED_MULTIPLIER: f64 = 0.5;

const MAX_PROBABILITY: f64 = 0.95;

/// Emoji counted as on-theme by the integrity score
pub const MOON_EMOJI: &[&str] = &[
    "🌑", "🌒", "🌓", "🌔", "🌕", "🌖", "🌗", "🌘", "🌙", "🌚", "🌛", "🌜", "🌝",
];

const OPENING_BRACKETS: &[char] = &['(', '{', '['];
const CLOSING_BRACKETS: &[char] = &[')', '}', ']'];

/// Emoji variant families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmojiTheme {
    /// Moon faces and phases only
    #[default]
    Lunar,
    /// The eight phases
    Phases,
    /// Crescents with stars and sparkles
    Crescent,
    /// Full moons with stars
    Full,
}

impl EmojiTheme {
    pub fn all() -> &'static [EmojiTheme] {
        &[
            EmojiTheme::Lunar,
            EmojiTheme::Phases,
            EmojiTheme::Crescent,
            EmojiTheme::Full,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmojiTheme::Lunar => "lunar",
            EmojiTheme::Phases => "phases",
            EmojiTheme::Crescent => "crescent",
            EmojiTheme::Full => "full",
        }
    }

    /// Variants for an eligible character, `None` for anything else
    pub fn variants(&self, ch: char) -> Option<&'static [&'static str]> {
        let variants: &'static [&'static str] = match (self, ch) {
            (EmojiTheme::Lunar, 'o') => &["🌕", "🌑", "🌝"],
            (EmojiTheme::Lunar, 'O') => &["🌕", "🌝"],
            (EmojiTheme::Lunar, '0') => &["🌑", "🌚"],
            (EmojiTheme::Lunar, '(') => &["🌒", "🌘"],
            (EmojiTheme::Lunar, ')') => &["🌔", "🌖"],
            (EmojiTheme::Lunar, '{') => &["🌒", "🌓"],
            (EmojiTheme::Lunar, '}') => &["🌗", "🌘"],
            (EmojiTheme::Lunar, '[') => &["🌓", "🌒"],
            (EmojiTheme::Lunar, ']') => &["🌗", "🌖"],
            (EmojiTheme::Lunar, '|') => &["🌓", "🌗"],
            (EmojiTheme::Lunar, '/') => &["🌙", "🌛"],
            (EmojiTheme::Lunar, '\\') => &["🌙", "🌜"],
            (EmojiTheme::Lunar, '~') => &["🌑", "🌚"],
            (EmojiTheme::Lunar, '-') => &["🌑", "🌘"],

            (EmojiTheme::Phases, 'o') => &["🌑", "🌓", "🌕"],
            (EmojiTheme::Phases, 'O') => &["🌕", "🌗"],
            (EmojiTheme::Phases, '0') => &["🌑", "🌕"],
            (EmojiTheme::Phases, '(') => &["🌒", "🌓"],
            (EmojiTheme::Phases, ')') => &["🌖", "🌗"],
            (EmojiTheme::Phases, '{') => &["🌒", "🌔"],
            (EmojiTheme::Phases, '}') => &["🌖", "🌘"],
            (EmojiTheme::Phases, '[') => &["🌓", "🌔"],
            (EmojiTheme::Phases, ']') => &["🌗", "🌘"],
            (EmojiTheme::Phases, '|') => &["🌓", "🌗"],
            (EmojiTheme::Phases, '/') => &["🌒", "🌔"],
            (EmojiTheme::Phases, '\\') => &["🌖", "🌘"],
            (EmojiTheme::Phases, '~') => &["🌑", "🌒"],
            (EmojiTheme::Phases, '-') => &["🌑", "🌘"],

            (EmojiTheme::Crescent, 'o') => &["🌙", "⭐"],
            (EmojiTheme::Crescent, 'O') => &["🌙", "🌛", "🌜"],
            (EmojiTheme::Crescent, '0') => &["🌙", "💫"],
            (EmojiTheme::Crescent, '(') => &["🌛", "🌙"],
            (EmojiTheme::Crescent, ')') => &["🌜", "🌙"],
            (EmojiTheme::Crescent, '{') => &["🌛", "✨"],
            (EmojiTheme::Crescent, '}') => &["🌜", "✨"],
            (EmojiTheme::Crescent, '[') => &["🌛", "🌒"],
            (EmojiTheme::Crescent, ']') => &["🌜", "🌘"],
            (EmojiTheme::Crescent, '|') => &["✨", "🌙"],
            (EmojiTheme::Crescent, '/') => &["🌠", "✨"],
            (EmojiTheme::Crescent, '\\') => &["🌠", "✨"],
            (EmojiTheme::Crescent, '~') => &["✨", "💫"],
            (EmojiTheme::Crescent, '-') => &["✨", "⭐"],

            (EmojiTheme::Full, 'o') => &["🌕", "🌝"],
            (EmojiTheme::Full, 'O') => &["🌕", "🌝", "🌟"],
            (EmojiTheme::Full, '0') => &["🌕", "⭐"],
            (EmojiTheme::Full, '(') => &["🌔", "🌕"],
            (EmojiTheme::Full, ')') => &["🌖", "🌕"],
            (EmojiTheme::Full, '{') => &["🌔", "🌝"],
            (EmojiTheme::Full, '}') => &["🌖", "🌝"],
            (EmojiTheme::Full, '[') => &["🌔", "🌕"],
            (EmojiTheme::Full, ']') => &["🌖", "🌕"],
            (EmojiTheme::Full, '|') => &["🌕", "✨"],
            (EmojiTheme::Full, '/') => &["🌟", "✨"],
            (EmojiTheme::Full, '\\') => &["🌟", "✨"],
            (EmojiTheme::Full, '~') => &["✨", "🌕"],
            (EmojiTheme::Full, '-') => &["⭐", "🌕"],

            _ => return None,
        };
        Some(variants)
    }

    /// Matched emoji for an opening and closing bracket
    fn pairing(&self) -> (&'static str, &'static str) {
        match self {
            EmojiTheme::Lunar | EmojiTheme::Crescent => ("🌛", "🌜"),
            EmojiTheme::Phases => ("🌒", "🌘"),
            EmojiTheme::Full => ("🌔", "🌖"),
        }
    }
}

impl fmt::Display for EmojiTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EmojiTheme {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        EmojiTheme::all()
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::invalid("theme", format!("unknown emoji theme '{s}'")))
    }
}

/// How a character was replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmojiStrategy {
    /// One of the character's own variants
    Substitution,
    /// Brackets become a matched opening/closing pair
    ThematicPairing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiParams {
    pub theme: EmojiTheme,
    pub variation: VariationLevel,
    pub complexity: u8,
    pub seed: String,
}

impl EmojiParams {
    pub fn new(theme: EmojiTheme, variation: VariationLevel, seed: impl Into<String>) -> Self {
        Self {
            theme,
            variation,
            complexity: 5,
            seed: seed.into(),
        }
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = complexity;
        self
    }

    /// Replacement probability for unprotected characters
    pub fn probability(&self) -> f64 {
        transform_probability(self.variation, self.complexity)
    }
}

/// `base + complexity * slope` for the variation level, capped at 95%.
pub fn transform_probability(variation: VariationLevel, complexity: u8) -> f64 {
    let (base, slope) = match variation {
        VariationLevel::Subtle => (0.05, 0.02),
        VariationLevel::Moderate => (0.15, 0.04),
        VariationLevel::Dramatic => (0.30, 0.065),
    };
    (base + f64::from(complexity) * slope).min(MAX_PROBABILITY)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiMetadata {
    pub theme: EmojiTheme,
    pub variation: VariationLevel,
    pub complexity: u8,
    pub eligible_count: usize,
    pub substituted_count: usize,
    /// Substituted share of eligible characters, in percent
    pub substitution_rate: f64,
    pub strategies_used: BTreeSet<EmojiStrategy>,
    /// Share of substituted emoji drawn from [`MOON_EMOJI`], in percent
    pub theme_integrity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiResult {
    pub art: String,
    pub metadata: EmojiMetadata,
}

/// Hash key for the character at `(line, col)`
fn position_key(seed: &str, line: usize, col: usize, complexity: u8) -> String {
    format!("{seed}-line{line}-char{col}-complex{complexity}")
}

/// Substitute emoji into `text`.
pub fn substitute_emoji(text: &str, params: &EmojiParams) -> Result<EmojiResult> {
    validate_complexity(params.complexity)?;

    let probability = params.probability();
    let pairing = params.theme.pairing();
    let mut eligible_count = 0;
    let mut substituted = Vec::new();
    let mut strategies_used = BTreeSet::new();

    let lines: Vec<String> = text
        .split('\n')
        .enumerate()
        .map(|(line_idx, line)| {
            let mut out = String::with_capacity(line.len());
            for (col, ch) in line.chars().enumerate() {
                let Some(variants) = params.theme.variants(ch) else {
                    out.push(ch);
                    continue;
                };
                eligible_count += 1;

                let h = hash_magnitude(&position_key(
                    &params.seed,
                    line_idx,
                    col,
                    params.complexity,
                ));
                let threshold = if PROTECTED_CHARS.contains(&ch) {
                    probability * PROTECTED_MULTIPLIER
                } else {
                    probability
                };
                let roll = (h % 1000) as f64 / 1000.0;
                if roll >= threshold {
                    out.push(ch);
                    continue;
                }

                let is_bracket = OPENING_BRACKETS.contains(&ch) || CLOSING_BRACKETS.contains(&ch);
                let pair = params.variation == VariationLevel::Dramatic
                    && is_bracket
                    && (h / 7) % 2 == 0;
                let emoji = if pair {
                    strategies_used.insert(EmojiStrategy::ThematicPairing);
                    if OPENING_BRACKETS.contains(&ch) {
                        pairing.0
                    } else {
                        pairing.1
                    }
                } else {
                    strategies_used.insert(EmojiStrategy::Substitution);
                    variants[((h / 1000) % variants.len() as u64) as usize]
                };
                out.push_str(emoji);
                substituted.push(emoji);
            }
            out
        })
        .collect();

    let substituted_count = substituted.len();
    let substitution_rate = if eligible_count == 0 {
        0.0
    } else {
        substituted_count as f64 * 100.0 / eligible_count as f64
    };
    let theme_integrity = if substituted_count == 0 {
        100
    } else {
        let on_theme = substituted.iter().filter(|e| MOON_EMOJI.contains(*e)).count();
        (on_theme as f64 * 100.0 / substituted_count as f64).round() as u8
    };

    tracing::debug!(
        theme = %params.theme,
        variation = %params.variation,
        eligible_count,
        substituted_count,
        theme_integrity,
        "emoji substitution"
    );

    Ok(EmojiResult {
        art: lines.join("\n"),
        metadata: EmojiMetadata {
            theme: params.theme,
            variation: params.variation,
            complexity: params.complexity,
            eligible_count,
            substituted_count,
            substitution_rate,
            strategies_used,
            theme_integrity,
        },
    })
}
