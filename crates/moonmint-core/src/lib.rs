//! # Moonmint Core
//!
//! Deterministic generation of moon-themed ASCII art collectibles.
//!
//! This crate provides:
//! - Seeded hashing and pseudo-random draws
//! - A catalog of validated base templates
//! - The mutation engine that derives unique variants from a seed
//! - Tone, block and emoji post-processing layers
//! - Exporters for plain text, HTML, ANSI and canvas cells
//!
//! Every operation is a pure function of its inputs: the same seed and
//! parameters produce byte-identical art on every run.
//!
//! ```text
//!       _.._
//!     .' .-'`    Moonmint Core
//!    /  /        Same seed, same moon.
//!    |  |
//!    \  '.___.;
//!     '._  _.'
//!        ``
//! ```

pub mod batch;
pub mod blocks;
pub mod catalog;
pub mod emoji;
pub mod error;
pub mod export;
pub mod mutation;
pub mod ramp;
pub mod seed;
pub mod template;
pub mod tone;

pub use batch::{generate_batch, seed_range, CollisionReport};
pub use blocks::{
    render_blocks, BlockMode, BlockParams, BlockRender, ContentClass, PaletteName,
};
pub use catalog::{BuiltinCatalog, DirectoryCatalog, LayeredCatalog, TemplateCache, TemplateSource};
pub use emoji::{
    substitute_emoji, EmojiMetadata, EmojiParams, EmojiResult, EmojiStrategy, EmojiTheme,
};
pub use error::{CoreError, Result};
pub use export::{to_ansi, to_canvas_cells, to_html, to_plain, AnsiDepth, CanvasCell};
pub use mutation::{
    generate, generate_from, theme_preservation_score, GenerationParams, GenerationResult,
    MutationRecord, Strategy, VariationLevel, MAX_COMPLEXITY, MIN_COMPLEXITY,
};
pub use ramp::Ramp;
pub use template::{Grid, Rarity, Template};
pub use tone::{tone_transform, ToneMode, ToneParams};

/// Core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the core engine and check the builtin catalog.
pub fn init() -> Result<()> {
    tracing::info!("Initializing Moonmint Core v{}", VERSION);
    let catalog = BuiltinCatalog;
    for id in catalog.ids() {
        catalog.load(&id)?;
    }
    Ok(())
}
