// src/config.rs

//! Settings for the explorer binary and the batch walks.
//!
//! Read from `lyapunov.json` when that file exists. Every field is optional
//! in the file; missing ones take the defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::color::Rgb;
use crate::error::LyapResult;

pub const CONFIG_FILE: &str = "lyapunov.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where snapshots and walk output go.
    pub output_dir: PathBuf,
    /// Directory scanned by the color-collection walk.
    pub color_dir: PathBuf,
    /// File stem used by `RUN`.
    pub scratch_stem: String,
    /// Paint for cells that fall between color intervals.
    pub gap_color: [u8; 3],
    /// Rows between progress reports while sampling.
    pub progress_rows: usize,
    pub random_color_rounds: usize,
    pub max_walk_sequence: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_dir: PathBuf::from("."),
            color_dir: PathBuf::from("COLORCOLLECTION"),
            scratch_stem: "tmpljap".to_string(),
            gap_color: [0, 0, 0],
            progress_rows: 128,
            random_color_rounds: 64,
            max_walk_sequence: 64,
        }
    }
}

impl Config {
    pub fn gap_color(&self) -> Rgb {
        let [r, g, b] = self.gap_color;
        Rgb::new(r, g, b)
    }

    pub fn from_json(text: &str) -> LyapResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Defaults when `path` does not exist; an error when it exists but
    /// does not parse.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> LyapResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }
        Config::from_json(&fs::read_to_string(path)?)
    }
}
