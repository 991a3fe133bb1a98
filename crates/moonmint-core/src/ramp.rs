//! Glyph ramps and ink density
//!
//! A ramp orders glyphs from sparsest to densest so a 0-100 level can be
//! snapped to a character. Density tables here are shared by the tone layer
//! and the block renderer, so both read the same signal from the same text.

use serde::{Deserialize, Serialize};

/// Density assumed for glyphs missing from the table
pub const DEFAULT_DENSITY: f64 = 50.0;

/// Ink density of a glyph on a 0-100 scale.
pub fn glyph_density(ch: char) -> f64 {
    match ch {
        ' ' => 0.0,
        '.' => 10.0,
        ',' | '\'' | '`' => 12.0,
        ':' => 20.0,
        '-' | '_' => 22.0,
        ';' | '"' => 25.0,
        '~' | '^' => 30.0,
        '<' | '>' => 35.0,
        '/' | '\\' => 38.0,
        '=' | '|' => 40.0,
        '(' | ')' => 42.0,
        '+' | 'v' => 45.0,
        '*' | '{' | '}' => 50.0,
        '[' | ']' => 52.0,
        'o' => 55.0,
        'A' | 'O' => 70.0,
        '0' => 75.0,
        '#' | '%' | '&' => 85.0,
        '$' => 88.0,
        '@' => 95.0,
        '░' => 25.0,
        '▒' => 50.0,
        '▓' => 75.0,
        '█' => 100.0,
        _ => DEFAULT_DENSITY,
    }
}

/// Share of non-space characters in a line, 0-100. Empty lines are 0.
pub fn line_density(line: &[char]) -> f64 {
    if line.is_empty() {
        return 0.0;
    }
    let filled = line.iter().filter(|c| **c != ' ').count();
    filled as f64 * 100.0 / line.len() as f64
}

/// Brightness-ordered glyph sets for the tone layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ramp {
    /// General purpose: " .:-=+*#%@"
    Standard,
    /// Round glyphs for moon-like art
    Circular,
    /// Horizontal strokes
    Line,
    /// Slashes and points
    Angular,
}

const CIRCULAR_GLYPHS: &[char] = &['o', 'O', '0', '@', '(', ')'];
const LINE_GLYPHS: &[char] = &['-', '_', '~', '=', '|'];
const ANGULAR_GLYPHS: &[char] = &['/', '\\', '<', '>', '^', 'v'];

impl Ramp {
    /// Glyphs from sparsest (a space) to densest
    pub fn chars(&self) -> &'static [char] {
        match self {
            Ramp::Standard => &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'],
            Ramp::Circular => &[' ', '.', '\'', 'o', 'O', '0', '@'],
            Ramp::Line => &[' ', '.', '-', '~', '=', '#'],
            Ramp::Angular => &[' ', '.', ',', '/', '^', 'A', '#'],
        }
    }

    /// Pick the ramp matching the dominant glyph family of `text`.
    ///
    /// Ties resolve circular, then line, then angular; text with none of
    /// them uses the standard ramp.
    pub fn detect(text: &str) -> Self {
        let count = |family: &[char]| text.chars().filter(|c| family.contains(c)).count();
        let circular = count(CIRCULAR_GLYPHS);
        let line = count(LINE_GLYPHS);
        let angular = count(ANGULAR_GLYPHS);

        if circular == 0 && line == 0 && angular == 0 {
            Ramp::Standard
        } else if circular >= line && circular >= angular {
            Ramp::Circular
        } else if line >= angular {
            Ramp::Line
        } else {
            Ramp::Angular
        }
    }

    /// Nearest ramp index for a 0-100 level
    pub fn index_for(&self, level: f64) -> usize {
        nearest_index(self.chars().len(), level)
    }

    /// Glyph for a 0-100 level
    pub fn char_for_level(&self, level: f64) -> char {
        self.chars()[self.index_for(level)]
    }
}

/// Nearest index into a ramp of `len` glyphs for a 0-100 level.
pub fn nearest_index(len: usize, level: f64) -> usize {
    if len <= 1 {
        return 0;
    }
    let last = len - 1;
    let scaled = (level.clamp(0.0, 100.0) / 100.0 * last as f64).round() as usize;
    scaled.min(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_ramp_ends() {
        assert_eq!(Ramp::Standard.chars().len(), 10);
        assert_eq!(Ramp::Standard.char_for_level(0.0), ' ');
        assert_eq!(Ramp::Standard.char_for_level(100.0), '@');
    }

    #[test]
    fn test_nearest_index_rounds_and_clamps() {
        // 9 steps: 50 -> 4.5 rounds to 5
        assert_eq!(nearest_index(10, 50.0), 5);
        assert_eq!(nearest_index(10, -20.0), 0);
        assert_eq!(nearest_index(10, 250.0), 9);
        assert_eq!(nearest_index(1, 80.0), 0);
    }

    #[test]
    fn test_detect_ramp() {
        assert_eq!(Ramp::detect("( o O )"), Ramp::Circular);
        assert_eq!(Ramp::detect("---~~~"), Ramp::Line);
        assert_eq!(Ramp::detect("/\\/\\ ^"), Ramp::Angular);
        assert_eq!(Ramp::detect("abc"), Ramp::Standard);
        // tie goes to circular
        assert_eq!(Ramp::detect("o-"), Ramp::Circular);
    }

    #[test]
    fn test_glyph_density() {
        assert_eq!(glyph_density(' '), 0.0);
        assert_eq!(glyph_density('@'), 95.0);
        assert_eq!(glyph_density('Z'), DEFAULT_DENSITY);
    }

    #[test]
    fn test_line_density() {
        let line: Vec<char> = "ab  ".chars().collect();
        assert_eq!(line_density(&line), 50.0);
        assert_eq!(line_density(&[]), 0.0);
    }
}
