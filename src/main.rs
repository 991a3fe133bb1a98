//! Moonmint - deterministic lunar ASCII art from a seed
//!
//! ```text
//!       _.._
//!     .' .-'`   Welcome to Moonmint!
//!    /  /       Same seed, same moon.
//!    \  '.___.;
//!     '._  _.'
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use moonmint_config::{Config, ConfigManager};
use moonmint_core::{
    export, generate, generate_batch, render_blocks, seed_range, substitute_emoji, tone_transform,
    AnsiDepth, BlockMode, BuiltinCatalog, CollisionReport, DirectoryCatalog, EmojiTheme,
    LayeredCatalog, PaletteName, TemplateCache, TemplateSource, ToneMode, VariationLevel,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Moonmint - Seeded ASCII Moon Generator
#[derive(Parser, Debug)]
#[command(name = "moonmint")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Directory of <id>.toml templates layered over the builtin ones
    #[arg(short = 't', long, global = true)]
    templates: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available templates
    Templates,

    /// Generate a variant of a template
    Generate {
        /// Template id
        template: String,

        /// Seed string; the only source of variation
        #[arg(short, long)]
        seed: String,

        #[arg(short, long)]
        variation: Option<VariationLevel>,

        /// 1-10
        #[arg(short = 'x', long)]
        complexity: Option<u8>,

        /// Allow substitutions outside the template's character classes
        #[arg(long)]
        no_preserve_theme: bool,
    },

    /// Apply a tone transform to text
    Tone {
        #[arg(short, long)]
        mode: Option<ToneMode>,

        #[arg(long)]
        intensity: Option<u8>,

        #[arg(long)]
        shadow_depth: Option<u8>,

        /// Enables per-line jitter in tone-map and contour modes
        #[arg(short, long)]
        seed: Option<String>,

        /// Read text from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Render text with block glyphs
    Blocks {
        #[arg(short, long)]
        mode: Option<BlockMode>,

        #[arg(short, long)]
        palette: Option<PaletteName>,

        #[arg(long)]
        intensity: Option<u8>,

        #[arg(long)]
        contrast: Option<u8>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,

        /// Read text from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Substitute moon emoji into text
    Emoji {
        #[arg(short, long)]
        seed: String,

        #[arg(long)]
        theme: Option<EmojiTheme>,

        #[arg(short, long)]
        variation: Option<VariationLevel>,

        /// 1-10
        #[arg(short = 'x', long)]
        complexity: Option<u8>,

        /// Read text from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Generate many seeds and report duplicate art
    Batch {
        /// Template id
        template: String,

        #[arg(short = 'n', long, default_value_t = 100)]
        count: usize,

        /// Seeds are "<prefix>-0" .. "<prefix>-<count-1>"
        #[arg(long, default_value = "seed")]
        prefix: String,

        #[arg(short, long)]
        variation: Option<VariationLevel>,

        /// 1-10
        #[arg(short = 'x', long)]
        complexity: Option<u8>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Plain,
    Html,
    /// 24-bit color escapes
    Ansi,
    /// 256-color escapes
    Ansi256,
    /// JSON cell list for canvas renderers
    Canvas,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new()?,
    };
    let config = manager.config();

    // Logs go to stderr; stdout carries only art
    let log_level = if args.debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("moonmint={}", log_level)),
        ))
        .init();

    tracing::debug!(
        config = %manager.config_path().display(),
        "Starting Moonmint v{}",
        env!("CARGO_PKG_VERSION")
    );
    moonmint_core::init()?;

    let template_dir = args.templates.clone().or(config.catalog.template_dir.clone());
    let cache = TemplateCache::new(template_source(template_dir));

    run(&args, &config, &cache)
}

fn template_source(dir: Option<PathBuf>) -> Box<dyn TemplateSource> {
    match dir {
        Some(dir) => {
            tracing::debug!(dir = %dir.display(), "layering template directory");
            Box::new(LayeredCatalog::new(DirectoryCatalog::new(dir), BuiltinCatalog))
        }
        None => Box::new(BuiltinCatalog),
    }
}

fn run(
    args: &Args,
    config: &Config,
    cache: &TemplateCache<Box<dyn TemplateSource>>,
) -> anyhow::Result<()> {
    match &args.command {
        Command::Templates => {
            let templates = cache
                .ids()
                .iter()
                .map(|id| cache.get(id))
                .collect::<Result<Vec<_>, _>>()?;
            if args.json {
                let list: Vec<_> = templates
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "id": t.id,
                            "name": t.name,
                            "rarity": t.rarity,
                            "description": t.description,
                            "themes": t.themes,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                for t in &templates {
                    println!("{:<12} {:<10} {}", t.id, t.rarity.name(), t.name);
                }
            }
        }

        Command::Generate {
            template,
            seed,
            variation,
            complexity,
            no_preserve_theme,
        } => {
            let base = cache.get(template)?;
            let mut params = config.generation.params(seed.as_str(), template.as_str());
            if let Some(level) = variation {
                params = params.with_variation(*level);
            }
            if let Some(complexity) = complexity {
                params = params.with_complexity(*complexity);
            }
            if *no_preserve_theme {
                params = params.with_preserve_theme(false);
            }

            let result = generate(&base, &params)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.art);
                eprintln!(
                    "{} changes, theme preservation {}%",
                    result.change_count, result.theme_preservation_score
                );
            }
        }

        Command::Tone {
            mode,
            intensity,
            shadow_depth,
            seed,
            input,
        } => {
            let text = read_input(input.as_deref())?;
            let mut params = config.tone.params(seed.clone());
            if let Some(mode) = mode {
                params.mode = *mode;
            }
            if let Some(intensity) = intensity {
                params.intensity = *intensity;
            }
            if let Some(depth) = shadow_depth {
                params.shadow_depth = *depth;
            }

            let art = tone_transform(&text, &params);
            if args.json {
                let out = serde_json::json!({ "art": art, "params": params });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{art}");
            }
        }

        Command::Blocks {
            mode,
            palette,
            intensity,
            contrast,
            format,
            input,
        } => {
            let text = read_input(input.as_deref())?;
            let mut params = config.blocks.params();
            if let Some(mode) = mode {
                params.mode = *mode;
            }
            if let Some(palette) = palette {
                params.palette = *palette;
            }
            if let Some(intensity) = intensity {
                params.intensity = *intensity;
            }
            if let Some(contrast) = contrast {
                params.contrast_level = *contrast;
            }

            let render = render_blocks(&text, &params);
            match format {
                OutputFormat::Canvas => {
                    let cells = export::to_canvas_cells(&render);
                    println!("{}", serde_json::to_string_pretty(&cells)?);
                }
                _ if args.json => println!("{}", serde_json::to_string_pretty(&render)?),
                OutputFormat::Plain => println!("{}", export::to_plain(&render)),
                OutputFormat::Html => println!("{}", export::to_html(&render)),
                OutputFormat::Ansi => {
                    println!("{}", export::to_ansi(&render, AnsiDepth::TrueColor))
                }
                OutputFormat::Ansi256 => {
                    println!("{}", export::to_ansi(&render, AnsiDepth::Indexed256))
                }
            }
        }

        Command::Emoji {
            seed,
            theme,
            variation,
            complexity,
            input,
        } => {
            let text = read_input(input.as_deref())?;
            let mut params = config.emoji.params(seed.as_str());
            if let Some(theme) = theme {
                params.theme = *theme;
            }
            if let Some(level) = variation {
                params.variation = *level;
            }
            if let Some(complexity) = complexity {
                params.complexity = *complexity;
            }

            let result = substitute_emoji(&text, &params)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.art);
                eprintln!(
                    "{}/{} substituted ({:.1}%), integrity {}%",
                    result.metadata.substituted_count,
                    result.metadata.eligible_count,
                    result.metadata.substitution_rate,
                    result.metadata.theme_integrity
                );
            }
        }

        Command::Batch {
            template,
            count,
            prefix,
            variation,
            complexity,
        } => {
            let base = cache.get(template)?;
            let mut params = config.generation.params("", template.as_str());
            if let Some(level) = variation {
                params = params.with_variation(*level);
            }
            if let Some(complexity) = complexity {
                params = params.with_complexity(*complexity);
            }

            let seeds = seed_range(prefix, *count);
            let results = generate_batch(&base, &seeds, &params);
            if let Some(Err(e)) = results.iter().find(|r| r.is_err()) {
                anyhow::bail!("batch generation failed: {e}");
            }

            let report = CollisionReport::from_results(&results);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} variants, {} unique, {} duplicates ({:.2}% collisions)",
                    report.total, report.unique, report.duplicates, report.collision_rate
                );
            }
        }
    }

    Ok(())
}

/// Text from `path`, or stdin when none is given. One trailing newline is
/// dropped so piped art keeps its line count.
fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    let mut text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_parsing() {
        let args = Args::try_parse_from(["moonmint", "templates"]).unwrap();
        assert!(!args.json);
        assert!(!args.debug);
        assert!(matches!(args.command, Command::Templates));
    }

    #[test]
    fn test_generate_args() {
        let args = Args::try_parse_from([
            "moonmint",
            "generate",
            "moon",
            "--seed",
            "sample-output",
            "-v",
            "subtle",
            "-x",
            "3",
            "--json",
        ])
        .unwrap();
        assert!(args.json);
        match args.command {
            Command::Generate {
                template,
                seed,
                variation,
                complexity,
                no_preserve_theme,
            } => {
                assert_eq!(template, "moon");
                assert_eq!(seed, "sample-output");
                assert_eq!(variation, Some(VariationLevel::Subtle));
                assert_eq!(complexity, Some(3));
                assert!(!no_preserve_theme);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_generate_requires_seed() {
        assert!(Args::try_parse_from(["moonmint", "generate", "moon"]).is_err());
    }

    #[test]
    fn test_unknown_enum_rejected() {
        assert!(Args::try_parse_from(["moonmint", "tone", "--mode", "sepia"]).is_err());
        assert!(Args::try_parse_from(["moonmint", "blocks", "--palette", "neon"]).is_err());
    }

    #[test]
    fn test_blocks_args() {
        let args = Args::try_parse_from([
            "moonmint",
            "blocks",
            "--mode",
            "gradient",
            "--format",
            "ansi256",
            "--templates",
            "/tmp/moons",
        ])
        .unwrap();
        assert_eq!(args.templates, Some(PathBuf::from("/tmp/moons")));
        match args.command {
            Command::Blocks { mode, format, .. } => {
                assert_eq!(mode, Some(BlockMode::Gradient));
                assert_eq!(format, OutputFormat::Ansi256);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_batch_defaults() {
        let args = Args::try_parse_from(["moonmint", "batch", "eclipse"]).unwrap();
        match args.command {
            Command::Batch { count, prefix, .. } => {
                assert_eq!(count, 100);
                assert_eq!(prefix, "seed");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_read_input_strips_one_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("art.txt");
        std::fs::write(&path, " (o)\n\n").unwrap();
        assert_eq!(read_input(Some(&path)).unwrap(), " (o)\n");
    }

    #[test]
    fn test_template_source_layers_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = template_source(Some(dir.path().to_path_buf()));
        assert!(source.ids().contains(&"moon".to_string()));
        assert_eq!(template_source(None).ids().len(), 5);
    }
}
