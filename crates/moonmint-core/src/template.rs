//! Base designs and the character grid they are mutated on.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Jagged 2D character array. Rows keep their own length; nothing pads them.
pub type Grid = Vec<Vec<char>>;

/// Split art text into a grid, one row per line.
pub fn grid_from_text(text: &str) -> Grid {
    text.split('\n').map(|line| line.chars().collect()).collect()
}

/// Join a grid back into newline-separated text.
pub fn grid_to_text(grid: &Grid) -> String {
    grid.iter()
        .map(|row| row.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collectible rarity of a base design
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn all() -> &'static [Rarity] {
        &[
            Rarity::Common,
            Rarity::Uncommon,
            Rarity::Rare,
            Rarity::Epic,
            Rarity::Legendary,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rarity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Rarity::all()
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::invalid("rarity", format!("unknown rarity '{s}'")))
    }
}

/// A named base design with the character rules its variants must follow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    pub description: String,
    pub base_grid: Grid,
    /// Characters a mutation may write
    pub allowed_chars: BTreeSet<char>,
    /// Characters a mutation must never touch or write
    pub forbidden_chars: BTreeSet<char>,
    /// Theme tags in priority order (`lunar`, `celestial`, `geometric`, ...)
    pub themes: Vec<String>,
}

impl Template {
    /// Build and validate a template from raw art text.
    #[allow(clippy::too_many_arguments)]
    pub fn from_art(
        id: impl Into<String>,
        name: impl Into<String>,
        rarity: Rarity,
        description: impl Into<String>,
        art: &str,
        allowed: &str,
        forbidden: &str,
        themes: &[&str],
    ) -> Result<Self> {
        let template = Self {
            id: id.into(),
            name: name.into(),
            rarity,
            description: description.into(),
            base_grid: grid_from_text(art),
            allowed_chars: allowed.chars().filter(|c| !c.is_whitespace()).collect(),
            forbidden_chars: forbidden.chars().filter(|c| !c.is_whitespace()).collect(),
            themes: themes.iter().map(|t| t.to_string()).collect(),
        };
        template.validate()?;
        Ok(template)
    }

    /// Check the catalog rules: a non-empty id and grid, disjoint character
    /// sets, and no forbidden character in the base design.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::InvalidTemplate("template id is empty".into()));
        }
        if self.base_grid.iter().all(|row| row.iter().all(|c| *c == ' ')) {
            return Err(CoreError::InvalidTemplate(format!(
                "template '{}' has no visible characters",
                self.id
            )));
        }
        if let Some(c) = self.allowed_chars.intersection(&self.forbidden_chars).next() {
            return Err(CoreError::InvalidTemplate(format!(
                "template '{}' lists '{}' as both allowed and forbidden",
                self.id, c
            )));
        }
        if let Some(c) = self
            .base_grid
            .iter()
            .flatten()
            .find(|c| self.forbidden_chars.contains(c))
        {
            return Err(CoreError::InvalidTemplate(format!(
                "template '{}' uses forbidden character '{}' in its base art",
                self.id, c
            )));
        }
        Ok(())
    }

    /// Whether a mutation may write `ch`.
    pub fn can_write(&self, ch: char) -> bool {
        self.allowed_chars.contains(&ch) && !self.forbidden_chars.contains(&ch)
    }

    pub fn has_theme(&self, theme: &str) -> bool {
        self.themes.iter().any(|t| t.eq_ignore_ascii_case(theme))
    }

    /// Base art as newline-joined text
    pub fn art(&self) -> String {
        grid_to_text(&self.base_grid)
    }

    /// Count of non-space characters in the base design
    pub fn visible_chars(&self) -> usize {
        self.base_grid.iter().flatten().filter(|c| **c != ' ').count()
    }
}
