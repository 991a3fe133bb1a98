//! # Grid Mutation Engine
//!
//! Turns a template and a seed into a structurally varied copy of its grid.
//!
//! Generation plans a fixed number of edits from the variation level and
//! complexity, then repeatedly draws a strategy from a level-specific list and
//! applies it. A strategy either writes exactly one cell or reports that it
//! found nothing to change; the loop stops at the planned edit count or after
//! ten attempts per planned edit, whichever comes first.
//!
//! ```text
//!   template ──copy──► grid ──strategy × N──► grid' ──► art + score
//!                       ▲                        │
//!                       └──── seed draws ────────┘
//! ```

use crate::catalog::TemplateSource;
use crate::error::{CoreError, Result};
use crate::seed::{pick, random, scatter};
use crate::template::{grid_to_text, Grid, Template};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Draw slots available to one strategy invocation
const DRAW_SLOTS: u64 = 16;

/// Attempt budget per planned change
const ATTEMPTS_PER_CHANGE: usize = 10;

pub const MIN_COMPLEXITY: u8 = 1;
pub const MAX_COMPLEXITY: u8 = 10;

/// Characters added to empty cells by detail addition
const TEXTURE_CHARS: &[char] = &['.', '*', '~', '-', '\'', '`'];

/// Replacement pool for recoloring a line run
const LINE_CHARS: &[char] = &['-', '~', '_', '='];

const CRATER_ANCHORS: &[char] = &['o', 'O', '0'];
const CRATER_GLYPHS: &[char] = &['.', ':'];
const STAR_GLYPHS: &[char] = &['*', '+', '.'];
const ACCENT_ANCHORS: &[char] = &['|', '-'];
const ACCENT_GLYPHS: &[char] = &['+', '^', '=', '*'];

/// Character classes used to judge whether a substitution stays on theme
const CHARACTER_CLASSES: [&[char]; 5] = [
    // lunar
    &['o', 'O', '0', '@', '(', ')', '*'],
    // curve
    &['(', ')', '{', '}', '[', ']', '<', '>'],
    // line
    &['-', '_', '~', '=', '|'],
    // detail
    &['.', '\'', '`', ',', ':', ';', '*', '+', '~'],
    // angular
    &['/', '\\', '^', 'v', '<', '>', '|'],
];

static LINE_RUN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-~_]{3,}").expect("Invalid line run regex"));

/// How far a variant may drift from its template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariationLevel {
    Subtle,
    #[default]
    Moderate,
    Dramatic,
}

impl VariationLevel {
    pub fn all() -> &'static [VariationLevel] {
        &[
            VariationLevel::Subtle,
            VariationLevel::Moderate,
            VariationLevel::Dramatic,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            VariationLevel::Subtle => "subtle",
            VariationLevel::Moderate => "moderate",
            VariationLevel::Dramatic => "dramatic",
        }
    }

    /// Number of edits to aim for at this level and complexity
    pub fn planned_changes(&self, complexity: u8) -> usize {
        let c = f64::from(complexity);
        let (scale, offset) = match self {
            VariationLevel::Subtle => (0.3, 1.0),
            VariationLevel::Moderate => (0.8, 2.0),
            VariationLevel::Dramatic => (1.2, 3.0),
        };
        ((c * scale).floor() + offset) as usize
    }

    /// Strategy list drawn from at this level. Order matters: draws index
    /// into it directly.
    pub fn strategies(&self) -> &'static [Strategy] {
        match self {
            VariationLevel::Subtle => &[
                Strategy::DetailAddition,
                Strategy::TextureVariation,
                Strategy::CharacterSubstitution,
            ],
            VariationLevel::Moderate => &[
                Strategy::CharacterSubstitution,
                Strategy::DetailAddition,
                Strategy::LineModification,
                Strategy::TextureVariation,
            ],
            VariationLevel::Dramatic => &[
                Strategy::DetailAddition,
                Strategy::TextureVariation,
                Strategy::LineModification,
                Strategy::CharacterSubstitution,
            ],
        }
    }
}

impl fmt::Display for VariationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VariationLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        VariationLevel::all()
            .iter()
            .copied()
            .find(|level| level.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CoreError::invalid("variation_level", format!("unknown variation level '{s}'"))
            })
    }
}

/// Reject complexities outside 1..=10.
pub fn validate_complexity(complexity: u8) -> Result<()> {
    if (MIN_COMPLEXITY..=MAX_COMPLEXITY).contains(&complexity) {
        Ok(())
    } else {
        Err(CoreError::invalid(
            "complexity",
            format!("{complexity} is outside {MIN_COMPLEXITY}..={MAX_COMPLEXITY}"),
        ))
    }
}

/// Inputs that, with the template, fully determine a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub seed: String,
    pub template_id: String,
    pub variation_level: VariationLevel,
    pub complexity: u8,
    pub preserve_theme: bool,
}

impl GenerationParams {
    pub fn new(seed: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            template_id: template_id.into(),
            variation_level: VariationLevel::default(),
            complexity: 5,
            preserve_theme: true,
        }
    }

    pub fn with_variation(mut self, level: VariationLevel) -> Self {
        self.variation_level = level;
        self
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_preserve_theme(mut self, preserve: bool) -> Self {
        self.preserve_theme = preserve;
        self
    }

    pub fn planned_changes(&self) -> usize {
        self.variation_level.planned_changes(self.complexity)
    }
}

/// Edit kinds the engine can apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CharacterSubstitution,
    DetailAddition,
    LineModification,
    TextureVariation,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::CharacterSubstitution => "character-substitution",
            Strategy::DetailAddition => "detail-addition",
            Strategy::LineModification => "line-modification",
            Strategy::TextureVariation => "texture-variation",
        }
    }

    fn apply(&self, mutation: &mut Mutation<'_>, step: u64) -> StrategyOutcome {
        match self {
            Strategy::CharacterSubstitution => mutation.substitute_character(step),
            Strategy::DetailAddition => mutation.add_detail(step),
            Strategy::LineModification => mutation.modify_line(step),
            Strategy::TextureVariation => mutation.vary_texture(step),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One applied edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub strategy: Strategy,
    pub row: usize,
    pub col: usize,
    pub from: char,
    pub to: char,
}

/// Result of invoking a strategy once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyOutcome {
    Applied(MutationRecord),
    /// Nothing eligible to change; the caller retries with another draw
    NoCandidates,
}

/// A generated variant and how it was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub art: String,
    pub seed: String,
    pub template_id: String,
    pub variation_level: VariationLevel,
    pub complexity: u8,
    pub change_count: usize,
    /// Percentage of original visible characters kept identical or on theme
    pub theme_preservation_score: u8,
    /// Strategy invocations, successful or not
    pub attempts: usize,
    pub changes: Vec<MutationRecord>,
}

/// Resolve `params.template_id` through `source` and generate.
pub fn generate_from<S: TemplateSource + ?Sized>(
    source: &S,
    params: &GenerationParams,
) -> Result<GenerationResult> {
    let template = source.load(&params.template_id)?;
    generate(&template, params)
}

/// Generate a variant of an already-loaded template.
pub fn generate(template: &Template, params: &GenerationParams) -> Result<GenerationResult> {
    validate_complexity(params.complexity)?;
    if params.template_id != template.id {
        return Err(CoreError::invalid(
            "template_id",
            format!(
                "parameters name '{}' but template '{}' was supplied",
                params.template_id, template.id
            ),
        ));
    }

    let planned = params.planned_changes();
    let budget = planned * ATTEMPTS_PER_CHANGE;
    let strategies = params.variation_level.strategies();

    let mut mutation = Mutation {
        template,
        seed: &params.seed,
        preserve_theme: params.preserve_theme,
        grid: template.base_grid.clone(),
    };
    let mut changes = Vec::with_capacity(planned);
    let mut attempts = 0;

    while changes.len() < planned && attempts < budget {
        let step = (changes.len() * 1000 + attempts) as u64;
        let strategy = strategies[pick(random(&params.seed, step), strategies.len())];
        attempts += 1;

        match strategy.apply(&mut mutation, step) {
            StrategyOutcome::Applied(record) => {
                tracing::trace!(%strategy, row = record.row, col = record.col, "mutation applied");
                changes.push(record);
            }
            StrategyOutcome::NoCandidates => {
                tracing::trace!(%strategy, "no eligible candidates");
            }
        }
    }

    if changes.len() < planned {
        tracing::warn!(
            template = %template.id,
            planned,
            applied = changes.len(),
            "attempt budget exhausted before planned changes"
        );
    }

    let score = theme_preservation_score(template, &template.base_grid, &mutation.grid);
    tracing::debug!(
        template = %template.id,
        seed = %params.seed,
        variation = %params.variation_level,
        planned,
        applied = changes.len(),
        attempts,
        score,
        "variant generated"
    );

    Ok(GenerationResult {
        art: grid_to_text(&mutation.grid),
        seed: params.seed.clone(),
        template_id: template.id.clone(),
        variation_level: params.variation_level,
        complexity: params.complexity,
        change_count: changes.len(),
        theme_preservation_score: score,
        attempts,
        changes,
    })
}

/// Whether `a` and `b` are interchangeable within this template's theme.
pub fn thematically_similar(template: &Template, a: char, b: char) -> bool {
    template.allowed_chars.contains(&a)
        && template.allowed_chars.contains(&b)
        && CHARACTER_CLASSES
            .iter()
            .any(|class| class.contains(&a) && class.contains(&b))
}

/// Percentage of visible original characters that survived identically or
/// as a thematically similar character. Short rows compare as spaces.
pub fn theme_preservation_score(template: &Template, original: &Grid, mutated: &Grid) -> u8 {
    let cell = |grid: &Grid, r: usize, c: usize| {
        grid.get(r).and_then(|row| row.get(c)).copied().unwrap_or(' ')
    };

    let mut total = 0usize;
    let mut preserved = 0usize;
    for r in 0..original.len().max(mutated.len()) {
        let width = original.get(r).map_or(0, Vec::len).max(mutated.get(r).map_or(0, Vec::len));
        for c in 0..width {
            let before = cell(original, r, c);
            if before == ' ' {
                continue;
            }
            total += 1;
            let after = cell(mutated, r, c);
            if before == after || thematically_similar(template, before, after) {
                preserved += 1;
            }
        }
    }

    if total == 0 {
        return 100;
    }
    (preserved as f64 * 100.0 / total as f64).round() as u8
}

/// Working state of one generation
struct Mutation<'a> {
    template: &'a Template,
    seed: &'a str,
    preserve_theme: bool,
    grid: Grid,
}

impl Mutation<'_> {
    // In-strategy draws go through `scatter`; only the strategy pick in
    // `generate` uses `random`. Plain `random` barely separates neighbouring
    // indices and collapses distinct seeds onto the same art.
    fn draw(&self, step: u64, slot: u64) -> f64 {
        scatter(self.seed, step * DRAW_SLOTS + slot)
    }

    fn pick_index(&self, step: u64, slot: u64, len: usize) -> usize {
        pick(self.draw(step, slot), len)
    }

    fn writable(&self, glyphs: &[char]) -> Vec<char> {
        glyphs
            .iter()
            .copied()
            .filter(|c| self.template.can_write(*c))
            .collect()
    }

    fn cell(&self, r: usize, c: usize) -> Option<char> {
        self.grid.get(r).and_then(|row| row.get(c)).copied()
    }

    /// Orthogonal neighbours that exist in the jagged grid
    fn neighbours(&self, r: usize, c: usize) -> impl Iterator<Item = char> + '_ {
        let up = r.checked_sub(1).and_then(|up| self.cell(up, c));
        let left = c.checked_sub(1).and_then(|left| self.cell(r, left));
        [up, self.cell(r + 1, c), left, self.cell(r, c + 1)]
            .into_iter()
            .flatten()
    }

    fn space_cells(&self) -> Vec<(usize, usize)> {
        self.grid
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, ch)| **ch == ' ')
                    .map(move |(c, _)| (r, c))
            })
            .collect()
    }

    fn write(&mut self, strategy: Strategy, r: usize, c: usize, to: char) -> StrategyOutcome {
        let row = &mut self.grid[r];
        let from = if c < row.len() {
            std::mem::replace(&mut row[c], to)
        } else {
            row.push(to);
            ' '
        };
        StrategyOutcome::Applied(MutationRecord {
            strategy,
            row: r,
            col: c,
            from,
            to,
        })
    }

    /// Fill one of `cells` with one of `glyphs`, both picked by draw.
    fn place(
        &mut self,
        strategy: Strategy,
        step: u64,
        cells: &[(usize, usize)],
        glyphs: &[char],
    ) -> StrategyOutcome {
        if cells.is_empty() || glyphs.is_empty() {
            return StrategyOutcome::NoCandidates;
        }
        let (r, c) = cells[self.pick_index(step, 1, cells.len())];
        let glyph = glyphs[self.pick_index(step, 2, glyphs.len())];
        self.write(strategy, r, c, glyph)
    }

    fn substitute_character(&mut self, step: u64) -> StrategyOutcome {
        let forbidden = &self.template.forbidden_chars;
        let candidates: Vec<(usize, usize)> = self
            .grid
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, ch)| **ch != ' ' && !forbidden.contains(ch))
                    .map(move |(c, _)| (r, c))
            })
            .collect();
        if candidates.is_empty() {
            return StrategyOutcome::NoCandidates;
        }

        let (r, c) = candidates[self.pick_index(step, 0, candidates.len())];
        let current = self.grid[r][c];
        let options: Vec<char> = self
            .template
            .allowed_chars
            .iter()
            .copied()
            .filter(|ch| *ch != current && *ch != ' ' && self.template.can_write(*ch))
            .collect();

        let options = if self.preserve_theme {
            let similar: Vec<char> = options
                .iter()
                .copied()
                .filter(|ch| thematically_similar(self.template, current, *ch))
                .collect();
            if similar.is_empty() {
                options
            } else {
                similar
            }
        } else {
            options
        };
        if options.is_empty() {
            return StrategyOutcome::NoCandidates;
        }

        let replacement = options[self.pick_index(step, 1, options.len())];
        self.write(Strategy::CharacterSubstitution, r, c, replacement)
    }

    fn add_detail(&mut self, step: u64) -> StrategyOutcome {
        let textures = self.writable(TEXTURE_CHARS);
        let spaces = self.space_cells();
        if spaces.is_empty() || textures.is_empty() {
            return StrategyOutcome::NoCandidates;
        }
        let (r, c) = spaces[self.pick_index(step, 0, spaces.len())];
        let texture = textures[self.pick_index(step, 1, textures.len())];
        self.write(Strategy::DetailAddition, r, c, texture)
    }

    /// Runs of three or more line characters as `(row, start, end)` in char
    /// columns, end exclusive.
    fn line_runs(&self) -> Vec<(usize, usize, usize)> {
        let mut runs = Vec::new();
        for (r, row) in self.grid.iter().enumerate() {
            let text: String = row.iter().collect();
            for m in LINE_RUN_REGEX.find_iter(&text) {
                let start = text[..m.start()].chars().count();
                let len = m.as_str().chars().count();
                let end = start + len;
                if row[start..end]
                    .iter()
                    .all(|ch| !self.template.forbidden_chars.contains(ch))
                {
                    runs.push((r, start, end));
                }
            }
        }
        runs
    }

    fn modify_line(&mut self, step: u64) -> StrategyOutcome {
        let runs = self.line_runs();
        if runs.is_empty() {
            return StrategyOutcome::NoCandidates;
        }
        let (r, start, end) = runs[self.pick_index(step, 0, runs.len())];
        let row_len = self.grid[r].len();

        match self.pick_index(step, 1, 3) {
            // extend past either end of the run
            0 => {
                let ch = self.grid[r][end - 1];
                if !self.template.can_write(ch) {
                    return StrategyOutcome::NoCandidates;
                }
                if end == row_len || self.grid[r][end] == ' ' {
                    self.write(Strategy::LineModification, r, end, ch)
                } else if start > 0 && self.grid[r][start - 1] == ' ' {
                    let ch = self.grid[r][start];
                    if !self.template.can_write(ch) {
                        return StrategyOutcome::NoCandidates;
                    }
                    self.write(Strategy::LineModification, r, start - 1, ch)
                } else {
                    StrategyOutcome::NoCandidates
                }
            }
            // shorten, keeping at least three characters
            1 => {
                if end - start > 3 {
                    self.write(Strategy::LineModification, r, end - 1, ' ')
                } else {
                    StrategyOutcome::NoCandidates
                }
            }
            // recolor one cell with another line character
            _ => {
                let col = start + self.pick_index(step, 2, end - start);
                let current = self.grid[r][col];
                let options: Vec<char> = self
                    .writable(LINE_CHARS)
                    .into_iter()
                    .filter(|ch| *ch != current)
                    .collect();
                if options.is_empty() {
                    return StrategyOutcome::NoCandidates;
                }
                let to = options[self.pick_index(step, 3, options.len())];
                self.write(Strategy::LineModification, r, col, to)
            }
        }
    }

    fn vary_texture(&mut self, step: u64) -> StrategyOutcome {
        let themes: Vec<&str> = self
            .template
            .themes
            .iter()
            .map(String::as_str)
            .filter(|t| matches!(*t, "lunar" | "celestial" | "geometric"))
            .collect();
        if themes.is_empty() {
            return StrategyOutcome::NoCandidates;
        }

        let theme = themes[self.pick_index(step, 0, themes.len())];
        let spaces = self.space_cells();
        let (cells, glyphs): (Vec<(usize, usize)>, Vec<char>) = match theme {
            "lunar" => (
                spaces
                    .into_iter()
                    .filter(|&(r, c)| self.neighbours(r, c).any(|n| CRATER_ANCHORS.contains(&n)))
                    .collect(),
                self.writable(CRATER_GLYPHS),
            ),
            "celestial" => (
                spaces
                    .into_iter()
                    .filter(|&(r, c)| self.neighbours(r, c).all(|n| n == ' '))
                    .collect(),
                self.writable(STAR_GLYPHS),
            ),
            _ => (
                spaces
                    .into_iter()
                    .filter(|&(r, c)| self.neighbours(r, c).any(|n| ACCENT_ANCHORS.contains(&n)))
                    .collect(),
                self.writable(ACCENT_GLYPHS),
            ),
        };

        self.place(Strategy::TextureVariation, step, &cells, &glyphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuiltinCatalog;
    use crate::template::{grid_from_text, Rarity};
    use pretty_assertions::assert_eq;

    fn moon() -> Template {
        BuiltinCatalog.load("moon").unwrap()
    }

    fn params(seed: &str, level: VariationLevel, complexity: u8) -> GenerationParams {
        GenerationParams::new(seed, "moon")
            .with_variation(level)
            .with_complexity(complexity)
    }

    #[test]
    fn test_planned_changes_formula() {
        assert_eq!(VariationLevel::Subtle.planned_changes(1), 1);
        assert_eq!(VariationLevel::Subtle.planned_changes(3), 1);
        assert_eq!(VariationLevel::Subtle.planned_changes(10), 4);
        assert_eq!(VariationLevel::Moderate.planned_changes(3), 4);
        assert_eq!(VariationLevel::Moderate.planned_changes(10), 10);
        assert_eq!(VariationLevel::Dramatic.planned_changes(3), 6);
        assert_eq!(VariationLevel::Dramatic.planned_changes(10), 15);
    }

    #[test]
    fn test_variation_parse() {
        assert_eq!("Dramatic".parse::<VariationLevel>().unwrap(), VariationLevel::Dramatic);
        let err = "wild".parse::<VariationLevel>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter { name: "variation_level", .. }));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let template = moon();
        let p = params("test-seed-123", VariationLevel::Moderate, 5);
        let a = generate(&template, &p).unwrap();
        let b = generate(&template, &p).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_result_json_shape() {
        let template = moon();
        let result = generate(&template, &params("json", VariationLevel::Dramatic, 4)).unwrap();
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["template_id"], "moon");
        assert_eq!(value["variation_level"], "dramatic");
        assert_eq!(value["complexity"], 4);
        assert!(value["theme_preservation_score"].is_u64());
        let strategy = value["changes"][0]["strategy"].as_str().unwrap();
        assert!([
            "character-substitution",
            "detail-addition",
            "line-modification",
            "texture-variation"
        ]
        .contains(&strategy));
    }

    #[test]
    fn test_generate_changes_art() {
        let template = moon();
        let result = generate(&template, &params("abc", VariationLevel::Dramatic, 10)).unwrap();
        assert!(result.change_count > 0);
        assert_ne!(result.art, template.art());
        assert_eq!(result.change_count, result.changes.len());
    }

    #[test]
    fn test_changes_replay_onto_base() {
        let template = moon();
        let result = generate(&template, &params("replay", VariationLevel::Dramatic, 7)).unwrap();

        let mut grid = template.base_grid.clone();
        for change in &result.changes {
            let row = &mut grid[change.row];
            if change.col < row.len() {
                assert_eq!(row[change.col], change.from);
                row[change.col] = change.to;
            } else {
                row.push(change.to);
            }
        }
        assert_eq!(grid_to_text(&grid), result.art);
    }

    #[test]
    fn test_writes_respect_character_sets() {
        let template = moon();
        for i in 0..50 {
            let seed = format!("sets-{i}");
            let result =
                generate(&template, &params(&seed, VariationLevel::Dramatic, 10)).unwrap();
            for change in &result.changes {
                assert!(
                    change.to == ' ' || template.can_write(change.to),
                    "{seed}: wrote '{}'",
                    change.to
                );
                assert!(!template.forbidden_chars.contains(&change.from));
            }
        }
    }

    /// Replay every change of dramatic runs and check each texture edit
    /// against the grid as it stood before that edit. Returns how many
    /// texture edits were seen.
    fn check_texture_edits(
        template: &Template,
        glyphs: &[char],
        fits: fn(&[char]) -> bool,
    ) -> usize {
        let mut seen = 0;
        for i in 0..20 {
            let p = GenerationParams::new(format!("texture-{i}"), template.id.as_str())
                .with_variation(VariationLevel::Dramatic)
                .with_complexity(10);
            let result = generate(template, &p).unwrap();

            let mut grid = template.base_grid.clone();
            for change in &result.changes {
                if change.strategy == Strategy::TextureVariation {
                    let (r, c) = (change.row, change.col);
                    let at = |r: usize, c: usize| grid.get(r).and_then(|row| row.get(c)).copied();
                    let neighbours: Vec<char> = [
                        r.checked_sub(1).and_then(|up| at(up, c)),
                        at(r + 1, c),
                        c.checked_sub(1).and_then(|left| at(r, left)),
                        at(r, c + 1),
                    ]
                    .into_iter()
                    .flatten()
                    .collect();
                    assert_eq!(change.from, ' ', "{}: texture over '{}'", template.id, change.from);
                    assert!(glyphs.contains(&change.to), "{}: wrote '{}'", template.id, change.to);
                    assert!(fits(&neighbours), "{}: ({r},{c}) next to {neighbours:?}", template.id);
                    seen += 1;
                }
                let row = &mut grid[change.row];
                if change.col < row.len() {
                    row[change.col] = change.to;
                } else {
                    row.push(change.to);
                }
            }
            assert_eq!(grid_to_text(&grid), result.art);
        }
        seen
    }

    #[test]
    fn test_lunar_texture_marks_craters() {
        let template = Template::from_art(
            "crater",
            "Crater",
            Rarity::Common,
            "",
            " o   O   0\n          \n   o    O \n0         ",
            "oO0.:",
            "",
            &["lunar"],
        )
        .unwrap();
        let seen = check_texture_edits(&template, CRATER_GLYPHS, |n| {
            n.iter().any(|c| CRATER_ANCHORS.contains(c))
        });
        assert!(seen > 0);
    }

    #[test]
    fn test_celestial_texture_finds_open_sky() {
        let template = Template::from_art(
            "sky",
            "Sky",
            Rarity::Common,
            "",
            "x         \n          \n    x     \n          \n         x",
            "x*+.",
            "",
            &["celestial"],
        )
        .unwrap();
        let seen = check_texture_edits(&template, STAR_GLYPHS, |n| n.iter().all(|c| *c == ' '));
        assert!(seen > 0);
    }

    #[test]
    fn test_geometric_texture_accents_lines() {
        let template = Template::from_art(
            "grid",
            "Grid",
            Rarity::Common,
            "",
            "|    --   \n|         \n+--  |    \n     |    ",
            "|-+^=*",
            "",
            &["geometric"],
        )
        .unwrap();
        let seen = check_texture_edits(&template, ACCENT_GLYPHS, |n| {
            n.iter().any(|c| ACCENT_ANCHORS.contains(c))
        });
        assert!(seen > 0);
    }

    #[test]
    fn test_invalid_complexity() {
        let template = moon();
        for complexity in [0, 11] {
            let err =
                generate(&template, &params("s", VariationLevel::Subtle, complexity)).unwrap_err();
            assert!(matches!(err, CoreError::InvalidParameter { name: "complexity", .. }));
        }
    }

    #[test]
    fn test_template_mismatch() {
        let template = moon();
        let p = GenerationParams::new("s", "eclipse");
        assert!(matches!(
            generate(&template, &p),
            Err(CoreError::InvalidParameter { name: "template_id", .. })
        ));
    }

    #[test]
    fn test_generate_from_unknown_template() {
        let p = GenerationParams::new("s", "sun");
        assert!(matches!(
            generate_from(&BuiltinCatalog, &p),
            Err(CoreError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_degenerate_template_terminates() {
        // Only forbidden-free characters with no writable alternatives, no
        // spaces and no line runs: every strategy is a no-op.
        let template =
            Template::from_art("solid", "Solid", Rarity::Common, "", "xx\nxx", "x", "", &["none"])
                .unwrap();
        let p = GenerationParams::new("s", "solid")
            .with_variation(VariationLevel::Dramatic)
            .with_complexity(10);
        let result = generate(&template, &p).unwrap();
        assert_eq!(result.change_count, 0);
        assert_eq!(result.attempts, p.planned_changes() * 10);
        assert_eq!(result.art, "xx\nxx");
        assert_eq!(result.theme_preservation_score, 100);
    }

    #[test]
    fn test_similarity_classes() {
        let template = moon();
        assert!(thematically_similar(&template, 'o', 'O'));
        assert!(thematically_similar(&template, '-', '~'));
        assert!(thematically_similar(&template, '/', '\\'));
        assert!(!thematically_similar(&template, 'o', '-'));
        // '@' is forbidden on the moon, so it is never similar there
        assert!(!thematically_similar(&template, 'o', '@'));
    }

    #[test]
    fn test_preservation_score() {
        let template = moon();
        let original = grid_from_text("oo\n--");
        assert_eq!(theme_preservation_score(&template, &original, &original), 100);

        // similar swap keeps the score
        let similar = grid_from_text("oO\n-~");
        assert_eq!(theme_preservation_score(&template, &original, &similar), 100);

        // one erased cell out of four
        let erased = grid_from_text("o\n--");
        assert_eq!(theme_preservation_score(&template, &original, &erased), 75);

        // additions beyond the original extent do not count
        let grown = grid_from_text("oo..\n--\n***");
        assert_eq!(theme_preservation_score(&template, &original, &grown), 100);
    }

    #[test]
    fn test_line_runs_found_in_moon() {
        let template = moon();
        let mutation = Mutation {
            template: &template,
            seed: "s",
            preserve_theme: true,
            grid: template.base_grid.clone(),
        };
        let runs = mutation.line_runs();
        assert_eq!(runs, vec![(11, 3, 28)]);
    }
}
