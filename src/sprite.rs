//! Text sprite files
//!
//! A sprite is a TOML file mapping characters to colors and drawing each
//! frame as rows of those characters:
//!
//! ```toml
//! [legend]
//! "." = "black"
//! "r" = "#ff0000"
//!
//! [[frames]]
//! delay_ms = 100
//! rows = [
//!     "r..r",
//!     ".rr.",
//! ]
//! ```
//!
//! One frame loads as a still image, more than one as an animation.

use crate::error::{Error, Result};
use crate::pixel::{Animation, Raster, Rgb};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SpriteFile {
    legend: BTreeMap<String, String>,
    frames: Vec<FrameFile>,
}

#[derive(Debug, Deserialize)]
struct FrameFile {
    #[serde(default)]
    delay_ms: u16,
    rows: Vec<String>,
}

/// Decoded sprite contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sprite {
    Still(Raster),
    Animated(Animation),
}

/// Read and decode a sprite file
pub fn load(path: &Path) -> Result<Sprite> {
    let content = fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&content, path)
}

/// Decode sprite text; `path` is only used in error messages
pub fn parse(content: &str, path: &Path) -> Result<Sprite> {
    let invalid = |message: String| Error::Sprite {
        path: path.to_path_buf(),
        message,
    };

    let file: SpriteFile = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
    if file.frames.is_empty() {
        return Err(invalid("no frames".into()));
    }

    let mut legend = HashMap::with_capacity(file.legend.len());
    for (key, value) in &file.legend {
        let mut chars = key.chars();
        let symbol = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return Err(invalid(format!("legend key {:?} is not one character", key))),
        };
        legend.insert(symbol, value.parse::<Rgb>()?);
    }

    let mut rasters = Vec::with_capacity(file.frames.len());
    for (index, frame) in file.frames.iter().enumerate() {
        let raster = draw(frame, &legend).map_err(|m| invalid(format!("frame {}: {}", index, m)))?;
        rasters.push((raster, frame.delay_ms));
    }

    if rasters.len() == 1 {
        return Ok(Sprite::Still(rasters.remove(0).0));
    }
    let mut animation = Animation::new();
    for (raster, delay_ms) in rasters {
        animation.push(raster, delay_ms);
    }
    Ok(Sprite::Animated(animation))
}

fn draw(frame: &FrameFile, legend: &HashMap<char, Rgb>) -> std::result::Result<Raster, String> {
    let height = frame.rows.len();
    let width = frame.rows.first().map_or(0, |r| r.chars().count());
    if width == 0 {
        return Err("no pixels".into());
    }

    let mut pixels = Vec::with_capacity(width * height);
    for (y, row) in frame.rows.iter().enumerate() {
        let before = pixels.len();
        for (x, symbol) in row.chars().enumerate() {
            match legend.get(&symbol) {
                Some(&rgb) => pixels.push(rgb),
                None => return Err(format!("unknown symbol {:?} at ({}, {})", symbol, x, y)),
            }
        }
        if pixels.len() - before != width {
            return Err(format!("row {} is not {} pixels wide", y, width));
        }
    }

    Raster::from_pixels(width, height, pixels).map_err(|e| e.to_string())
}
