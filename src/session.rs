//! Interactive state: one field plus the settings the commands act on.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::command::Command;
use crate::config::Config;
use crate::error::LyapResult;
use crate::field::LyapunovField;
use crate::store::{load_coloring, load_grid, load_params, save_description, save_snapshot, stem_file};
use crate::walk::Walker;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Session {
    field: LyapunovField,
    config: Config,
    loaded_from: Option<PathBuf>,
    tile_runs: usize,
}

const SNAPSHOT_EXTENSIONS: [&str; 4] = ["bmp", "par", "ljd", "descr"];

/// `name.bmp` and `name` both mean `name`; other dots stay part of the stem.
fn stem_path(name: &str) -> PathBuf {
    let path = Path::new(name);
    let known = path
        .extension()
        .is_some_and(|e| SNAPSHOT_EXTENSIONS.iter().any(|k| e.eq_ignore_ascii_case(k)));
    if known { path.with_extension("") } else { path.to_path_buf() }
}

impl Session {
    pub fn new(config: Config) -> Self {
        let mut field = LyapunovField::default();
        field.set_progress_rows(config.progress_rows);
        Session { field, config, loaded_from: None, tile_runs: 0 }
    }

    pub fn field(&self) -> &LyapunovField {
        &self.field
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Summary printed above each prompt.
    pub fn status(&self) -> String {
        let f = &self.field;
        let w = f.window();
        let mut out = String::new();
        if let Some(path) = &self.loaded_from {
            out.push_str(&format!("file {}\n", path.display()));
        }
        out.push_str(&format!("function {}\n", f.function().value_formula()));
        out.push_str(&format!("upper left  ({:e}|{:e})\n", w.upper_left.x, w.upper_left.y));
        out.push_str(&format!("lower left  ({:e}|{:e})\n", w.lower_left.x, w.lower_left.y));
        out.push_str(&format!("lower right ({:e}|{:e})\n", w.lower_right.x, w.lower_right.y));
        out.push_str(&format!("image size  ({}|{})\n", f.width(), f.height()));
        out.push_str(&format!("sequence    {}\n", f.sequence_text()));
        out.push_str(&format!("iterations  ({}|{})\n", f.settle_iterations(), f.measure_iterations()));
        out
    }

    pub fn execute(&mut self, command: Command) -> LyapResult<Flow> {
        match command {
            Command::Exit => return Ok(Flow::Exit),
            Command::Load(name) => self.load(&stem_path(&name))?,
            Command::LoadColor(name) => {
                let mut path = PathBuf::from(&name);
                let is_par = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("par"));
                if !is_par {
                    path = PathBuf::from(format!("{name}.par"));
                }
                let coloring = load_coloring(&path)?;
                self.field.replace_coloring(coloring);
            }
            Command::SetSize { width, height } => self.field.set_size(width, height),
            Command::SetIterations { settle, measure } => self.field.set_iterations(settle, measure),
            Command::Rotate(degrees) => self.field.rotate(degrees),
            Command::Stretch(factor) => self.field.stretch(factor, factor),
            Command::SetSequence(text) => self.field.set_sequence(&text)?,
            Command::SetPosition { lower_left, lower_right, upper_left } => {
                self.field.set_position(lower_left, lower_right, upper_left)
            }
            Command::Crop { left, bottom, right, top } => self.field.crop(left, bottom, right, top),
            Command::Center { x, y } => self.field.recenter(x, y),
            Command::WalkParameter { lower, upper, count } => {
                self.walker().walk_parameter(lower, upper, count)?;
            }
            Command::WalkSequences { count, len } => {
                self.walker().walk_sequences(count, len)?;
            }
            Command::WalkSections => {
                self.walker().walk_sections()?;
            }
            Command::WalkRandomColors => {
                let rounds = self.config.random_color_rounds;
                self.walker().walk_random_colors(rounds)?;
            }
            Command::WalkColorCollection => {
                let dir = self.config.color_dir.clone();
                self.walker().walk_color_collection(&dir)?;
            }
            Command::WalkDerivatives { value_id, first, last, b_lower, b_upper, count } => {
                self.walker().walk_derivatives(value_id, first, last, b_lower, b_upper, count)?;
            }
            Command::WalkTiles { columns, rows } => {
                self.tile_runs += 1;
                let prefix = format!("{:04}", self.tile_runs);
                self.walker().walk_tiles(&prefix, columns, rows)?;
            }
            Command::Save(name) => self.save(&stem_path(&name))?,
            Command::Run(range) => self.run(range)?,
        }
        Ok(Flow::Continue)
    }

    fn walker(&mut self) -> Walker<'_> {
        Walker::new(&mut self.field, &self.config)
    }

    /// Parameters first; the grid only if a matching one sits next to them.
    fn load(&mut self, stem: &Path) -> LyapResult<()> {
        if let Err(e) = load_params(&mut self.field, stem_file(stem, "par")) {
            self.loaded_from = None;
            return Err(e);
        }
        info!("parameters loaded");
        self.loaded_from = Some(stem.to_path_buf());

        let grid = stem_file(stem, "ljd");
        if grid.exists() {
            match load_grid(&mut self.field, &grid) {
                Ok(()) => info!("exponents loaded"),
                Err(e) => warn!("{} not loaded: {e}", grid.display()),
            }
        }
        Ok(())
    }

    fn save(&self, stem: &Path) -> LyapResult<()> {
        let dir = match stem.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let name = stem.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        save_snapshot(&self.field, dir, &name, self.config.gap_color())?;
        save_description(&self.field, stem_file(stem, "descr"))
    }

    fn run(&mut self, range: Option<(i64, i64)>) -> LyapResult<()> {
        match range {
            Some((start, end)) => self.field.compute_rows(start, end),
            None => self.field.compute(),
        }
        save_snapshot(
            &self.field,
            &self.config.output_dir,
            &self.config.scratch_stem,
            self.config.gap_color(),
        )?;
        Ok(())
    }
}
