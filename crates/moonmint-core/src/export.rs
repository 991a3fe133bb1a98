//! Exporters for rendered block art
//!
//! Every exporter reads the same [`BlockRender`], so plain text, HTML, ANSI
//! terminal output and canvas cells always agree on glyphs and colors.

use crate::blocks::BlockRender;
use crate::error::{CoreError, Result};
use palette::Srgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

/// Terminal color depth for [`to_ansi`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnsiDepth {
    /// 24-bit `38;2;r;g;b` escapes
    #[default]
    TrueColor,
    /// 6x6x6 cube of the 256-color palette
    Indexed256,
}

impl fmt::Display for AnsiDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnsiDepth::TrueColor => f.write_str("truecolor"),
            AnsiDepth::Indexed256 => f.write_str("256"),
        }
    }
}

impl FromStr for AnsiDepth {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truecolor" | "24bit" | "true-color" => Ok(AnsiDepth::TrueColor),
            "256" | "indexed" | "indexed256" => Ok(AnsiDepth::Indexed256),
            _ => Err(CoreError::invalid("depth", format!("unknown color depth '{s}'"))),
        }
    }
}

/// One drawable cell for a canvas renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasCell {
    pub row: usize,
    pub col: usize,
    pub ch: char,
    pub color: Option<String>,
    pub background: Option<String>,
}

/// The rendered art as plain text
pub fn to_plain(render: &BlockRender) -> String {
    render.art.clone()
}

/// A `<pre>` block with one `<div>` per line. Adjacent characters sharing a
/// color are merged into one `<span>`.
pub fn to_html(render: &BlockRender) -> String {
    let mut html = String::from("<pre class=\"moonmint\">\n");

    for (i, row) in render.rows().iter().enumerate() {
        match line_color(render, i) {
            Some(bg) => {
                let _ = write!(html, "<div style=\"background:{bg}\">");
            }
            None => html.push_str("<div>"),
        }

        let mut run: Option<&str> = None;
        for (j, &ch) in row.iter().enumerate() {
            let color = char_color(render, i, j);
            if color != run {
                if run.is_some() {
                    html.push_str("</span>");
                }
                if let Some(c) = color {
                    let _ = write!(html, "<span style=\"color:{c}\">");
                }
                run = color;
            }
            push_escaped(&mut html, ch);
        }
        if run.is_some() {
            html.push_str("</span>");
        }
        html.push_str("</div>\n");
    }

    html.push_str("</pre>");
    html
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        _ => out.push(ch),
    }
}

/// The art with ANSI color escapes. Uncolored renders come back unchanged.
pub fn to_ansi(render: &BlockRender, depth: AnsiDepth) -> String {
    let rows = render.rows();
    let mut lines = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let mut line = String::new();
        let mut styled = false;

        if let Some(bg) = line_color(render, i).and_then(parse_hex) {
            line.push_str(&escape(bg, depth, Layer::Background));
            styled = true;
        }

        let mut current: Option<Srgb<u8>> = None;
        for (j, &ch) in row.iter().enumerate() {
            let fg = char_color(render, i, j).and_then(parse_hex);
            if let Some(color) = fg {
                if current != Some(color) {
                    line.push_str(&escape(color, depth, Layer::Foreground));
                    current = Some(color);
                    styled = true;
                }
            }
            line.push(ch);
        }

        if styled {
            line.push_str("\x1b[0m");
        }
        lines.push(line);
    }

    lines.join("\n")
}

#[derive(Clone, Copy)]
enum Layer {
    Foreground,
    Background,
}

fn escape(color: Srgb<u8>, depth: AnsiDepth, layer: Layer) -> String {
    let code = match layer {
        Layer::Foreground => 38,
        Layer::Background => 48,
    };
    match depth {
        AnsiDepth::TrueColor => format!(
            "\x1b[{code};2;{};{};{}m",
            color.red, color.green, color.blue
        ),
        AnsiDepth::Indexed256 => format!(
            "\x1b[{code};5;{}m",
            rgb_to_ansi(color.red, color.green, color.blue)
        ),
    }
}

/// Nearest entry of the 256-color cube (indices 16-231)
fn rgb_to_ansi(r: u8, g: u8, b: u8) -> u8 {
    let r = (r as u32 * 5 / 255) as u8;
    let g = (g as u32 * 5 / 255) as u8;
    let b = (b as u32 * 5 / 255) as u8;
    16 + 36 * r + 6 * g + b
}

fn parse_hex(hex: &str) -> Option<Srgb<u8>> {
    match hex.parse::<Srgb<u8>>() {
        Ok(color) => Some(color),
        Err(e) => {
            tracing::warn!(color = hex, error = %e, "skipping unparseable color");
            None
        }
    }
}

/// Non-space cells with their colors, row-major
pub fn to_canvas_cells(render: &BlockRender) -> Vec<CanvasCell> {
    render
        .rows()
        .iter()
        .enumerate()
        .flat_map(|(row, chars)| {
            let background = line_color(render, row).map(str::to_string);
            chars
                .iter()
                .enumerate()
                .filter(|(_, ch)| **ch != ' ')
                .map(move |(col, &ch)| CanvasCell {
                    row,
                    col,
                    ch,
                    color: char_color(render, row, col).map(str::to_string),
                    background: background.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn line_color(render: &BlockRender, row: usize) -> Option<&str> {
    render.line_colors.get(row).and_then(|c| c.as_deref())
}

fn char_color(render: &BlockRender, row: usize, col: usize) -> Option<&str> {
    render
        .char_colors
        .get(row)
        .and_then(|r| r.get(col))
        .and_then(|c| c.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{render_blocks, BlockMode, BlockParams, PaletteName};
    use pretty_assertions::assert_eq;

    const ART: &str = " (o) \n<@@@>";

    fn solid() -> BlockRender {
        render_blocks(ART, &BlockParams::new(BlockMode::Solid, PaletteName::Moon))
    }

    #[test]
    fn test_plain_is_art() {
        let render = solid();
        assert_eq!(to_plain(&render), render.art);
    }

    #[test]
    fn test_html_structure() {
        let render = solid();
        let html = to_html(&render);
        assert!(html.starts_with("<pre class=\"moonmint\">\n"));
        assert!(html.ends_with("</pre>"));
        assert_eq!(html.matches("<div").count(), 2);
        assert!(html.contains("<div style=\"background:#"));
        assert_eq!(html.matches("<span").count(), html.matches("</span>").count());
    }

    #[test]
    fn test_html_escapes_markup() {
        let render = render_blocks("<a&b>", &BlockParams::default());
        let html = to_html(&render);
        assert!(html.contains("&lt;a&amp;b&gt;"));
        assert!(!html.contains("<span"));
        assert!(html.contains("<div>&lt;"));
    }

    #[test]
    fn test_html_merges_runs() {
        let render = render_blocks("@@@@", &BlockParams::new(BlockMode::Solid, PaletteName::Fire));
        let html = to_html(&render);
        // one color for the whole line
        assert_eq!(html.matches("<span").count(), 1);
    }

    #[test]
    fn test_ansi_plain_render_unchanged() {
        let render = render_blocks(ART, &BlockParams::new(BlockMode::Shading, PaletteName::Moon));
        assert_eq!(to_ansi(&render, AnsiDepth::TrueColor), render.art);
    }

    #[test]
    fn test_ansi_escapes() {
        let render = solid();
        let true_color = to_ansi(&render, AnsiDepth::TrueColor);
        assert!(true_color.contains("\x1b[48;2;"));
        assert!(true_color.contains("\x1b[38;2;"));
        assert!(true_color.ends_with("\x1b[0m"));

        let indexed = to_ansi(&render, AnsiDepth::Indexed256);
        assert!(indexed.contains("\x1b[38;5;"));
        assert!(!indexed.contains(";2;"));
        assert_eq!(indexed.lines().count(), 2);
    }

    #[test]
    fn test_rgb_to_ansi() {
        assert_eq!(rgb_to_ansi(0, 0, 0), 16);
        assert_eq!(rgb_to_ansi(255, 255, 255), 231);
        assert_eq!(rgb_to_ansi(255, 0, 0), 196);
    }

    #[test]
    fn test_canvas_cells_skip_spaces() {
        let render = solid();
        let cells = to_canvas_cells(&render);
        let visible = render.art.chars().filter(|c| *c != ' ' && *c != '\n').count();
        assert_eq!(cells.len(), visible);
        assert_eq!(cells[0].row, 0);
        assert_eq!(cells[0].col, 1);
        assert!(cells.iter().all(|c| c.color.is_some() && c.background.is_some()));
    }

    #[test]
    fn test_canvas_cells_uncolored() {
        let render = render_blocks(ART, &BlockParams::default());
        assert!(to_canvas_cells(&render)
            .iter()
            .all(|c| c.color.is_none() && c.background.is_none()));
    }

    #[test]
    fn test_depth_parse() {
        assert_eq!("256".parse::<AnsiDepth>().unwrap(), AnsiDepth::Indexed256);
        assert_eq!("TrueColor".parse::<AnsiDepth>().unwrap(), AnsiDepth::TrueColor);
        assert!("16".parse::<AnsiDepth>().is_err());
    }
}
