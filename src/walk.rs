//! Batch drivers that vary one aspect of a field and save a snapshot for
//! every variation.

use std::path::{Path, PathBuf};

use log::{info, warn};
use rand::Rng;

use crate::color::Rgb;
use crate::config::Config;
use crate::error::{LyapError, LyapResult};
use crate::field::{LyapunovField, Symbol, sequence_text};
use crate::function::{Band, COMPOSED_ID, MapFunction, PIECEWISE_ID, Role};
use crate::palettes::ColorFiles;
use crate::render::render_bmp;
use crate::store::{load_coloring, save_params, save_snapshot, stem_file};
use crate::sweep::ParameterSweep;

fn random_rgb(rng: &mut impl Rng) -> Rgb {
    Rgb::new(rng.gen_range(0..=255), rng.gen_range(0..=255), rng.gen_range(0..=255))
}

/// Band edges tried by [`Walker::walk_sections`]: -1.0, -0.5, 0.0, 0.5.
const SECTION_EDGES: [f64; 4] = [-1.0, -0.5, 0.0, 0.5];

pub struct Walker<'a> {
    field: &'a mut LyapunovField,
    out_dir: PathBuf,
    gap_color: Rgb,
    max_sequence: usize,
}

impl<'a> Walker<'a> {
    pub fn new(field: &'a mut LyapunovField, config: &Config) -> Self {
        Walker {
            field,
            out_dir: config.output_dir.clone(),
            gap_color: config.gap_color(),
            max_sequence: config.max_walk_sequence.max(1),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn snapshot(&self, stem: &str) -> LyapResult<PathBuf> {
        save_snapshot(&*self.field, &self.out_dir, stem, self.gap_color)
    }

    /// Picture and parameters only; for walks that leave the grid alone.
    fn recolored(&self, stem: &str) -> LyapResult<PathBuf> {
        std::fs::create_dir_all(&self.out_dir)?;
        let base = self.out_dir.join(stem);
        let bmp = stem_file(&base, "bmp");
        render_bmp(&*self.field, &bmp, self.gap_color)?;
        save_params(&*self.field, stem_file(&base, "par"))?;
        Ok(bmp)
    }

    /// Binds a sweep over b to the current function and samples every
    /// value. `stem` gets the running snapshot number and the value.
    fn sweep_b<F>(&mut self, lower: f64, upper: f64, count: u32, mut stem: F) -> LyapResult<Vec<PathBuf>>
    where
        F: FnMut(usize, f64) -> String,
    {
        self.field.function_mut().bind_sweep(ParameterSweep::new(lower, upper, count));
        let mut shots = Vec::new();
        let mut next = self.field.function_mut().sweep_start().map(Some);
        while let Some(b) = next? {
            self.field.compute();
            shots.push(self.snapshot(&stem(shots.len() + 1, b))?);
            next = self.field.function_mut().sweep_next();
        }
        self.field.function_mut().unbind_sweep();
        Ok(shots)
    }

    /// Samples the field for `count` values of b spread over `[lower, upper]`.
    pub fn walk_parameter(&mut self, lower: f64, upper: f64, count: u32) -> LyapResult<Vec<PathBuf>> {
        if !self.field.function().has_parameter() {
            return Err(LyapError::unsupported("walk over b needs a function with a parameter"));
        }
        info!("walking b over [{lower}, {upper}] in {count} steps");
        let result = self.sweep_b(lower, upper, count, |n, b| format!("walkb_{n:04}_b_{b:+.10}"));
        self.field.function_mut().unbind_sweep();
        result
    }

    /// Samples `count` random alternation sequences of length `len`. The
    /// field's own sequence is put back at the end.
    pub fn walk_sequences(&mut self, count: usize, len: usize) -> LyapResult<Vec<PathBuf>> {
        let len = len.clamp(1, self.max_sequence);
        let original = self.field.sequence_text();
        let mut rng = rand::thread_rng();
        let mut shots = Vec::with_capacity(count);
        let mut result = Ok(());

        for n in 1..=count {
            let symbols: Vec<Symbol> =
                (0..len).map(|_| if rng.gen_bool(0.5) { Symbol::A } else { Symbol::B }).collect();
            let text = sequence_text(&symbols);
            if let Err(e) = self.field.set_sequence(&text) {
                result = Err(e);
                break;
            }
            self.field.compute();
            match self.snapshot(&format!("walkseq_{n:04}_{text}")) {
                Ok(path) => shots.push(path),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        self.field.set_sequence(&original)?;
        result.map(|_| shots)
    }

    /// Pairs the map `value_id` with every derivative kind in
    /// `first..=last` in a composed function, tries all four role
    /// combinations, and sweeps b for each. The field's function is
    /// restored afterwards.
    pub fn walk_derivatives(
        &mut self,
        value_id: i32,
        first: i32,
        last: i32,
        b_lower: f64,
        b_upper: f64,
        count: u32,
    ) -> LyapResult<Vec<PathBuf>> {
        let value_fn = MapFunction::from_id(value_id)
            .ok_or_else(|| LyapError::unsupported(format!("unknown function id {value_id}")))?;
        let original = self.field.replace_function(value_fn.clone());
        let result = self.derivative_pass(&value_fn, first, last, b_lower, b_upper, count);
        self.field.replace_function(original);
        result
    }

    fn derivative_pass(
        &mut self,
        value_fn: &MapFunction,
        first: i32,
        last: i32,
        b_lower: f64,
        b_upper: f64,
        count: u32,
    ) -> LyapResult<Vec<PathBuf>> {
        let value_id = value_fn.id();
        let mut shots = Vec::new();
        let mut pass = 0usize;

        for derivative_id in first..=last {
            if derivative_id == COMPOSED_ID || derivative_id == PIECEWISE_ID {
                continue;
            }
            let Some(derivative_fn) = MapFunction::from_id(derivative_id) else {
                warn!("no function with id {derivative_id}, skipped");
                continue;
            };
            info!("derivative {derivative_id}");

            for value_role in Role::BOTH {
                for derivative_role in Role::BOTH {
                    pass += 1;
                    let composed = MapFunction::composed(
                        value_fn.clone(),
                        value_role,
                        derivative_fn.clone(),
                        derivative_role,
                    );
                    if !composed.has_parameter() {
                        warn!("{} has no parameter, skipped", composed.value_formula());
                        continue;
                    }
                    self.field.replace_function(composed);
                    let stems = |_: usize, b: f64| {
                        format!("walkdet{value_id:02}_{derivative_id:02}_{pass:04}_b_{b:+.10}")
                    };
                    shots.extend(self.sweep_b(b_lower, b_upper, count, stems)?);
                }
            }
        }
        Ok(shots)
    }

    /// Tries every pair of value and derivative bands with edges on a
    /// half-unit grid in `[-1, 1)`. Only piecewise functions qualify.
    pub fn walk_sections(&mut self) -> LyapResult<Vec<PathBuf>> {
        let Some(piecewise) = self.field.function_mut().as_piecewise_mut() else {
            return Err(LyapError::unsupported("section walk needs a piecewise function"));
        };
        let saved = (piecewise.value_band, piecewise.derivative_band);

        let mut bands = Vec::new();
        for (i, &min) in SECTION_EDGES.iter().enumerate() {
            for &max in &SECTION_EDGES[i + 1..] {
                bands.push(Band::new(min, max));
            }
        }

        let mut shots = Vec::new();
        let mut result = Ok(());
        'outer: for &value_band in &bands {
            for &derivative_band in &bands {
                if let Some(p) = self.field.function_mut().as_piecewise_mut() {
                    p.value_band = value_band;
                    p.derivative_band = derivative_band;
                }
                self.field.compute();
                match self.recolored(&format!("walksection{:04}", shots.len() + 1)) {
                    Ok(path) => shots.push(path),
                    Err(e) => {
                        result = Err(e);
                        break 'outer;
                    }
                }
            }
        }

        if let Some(p) = self.field.function_mut().as_piecewise_mut() {
            (p.value_band, p.derivative_band) = saved;
        }
        result.map(|_| shots)
    }

    /// Gives one random interval new random end colors per round and
    /// re-renders. The grid is not sampled again.
    pub fn walk_random_colors(&mut self, rounds: usize) -> LyapResult<Vec<PathBuf>> {
        let len = self.field.coloring().len();
        if len == 0 {
            return Err(LyapError::unsupported("coloring has no intervals"));
        }
        let mut rng = rand::thread_rng();
        let mut shots = Vec::with_capacity(rounds);
        for round in 1..=rounds {
            let idx = rng.gen_range(0..len);
            let (left, right) = (random_rgb(&mut rng), random_rgb(&mut rng));
            if let Some(interval) = self.field.coloring_mut().interval_mut(idx) {
                interval.left = left;
                interval.right = right;
            }
            shots.push(self.recolored(&format!("walkrgb_{round:04}"))?);
        }
        Ok(shots)
    }

    /// Renders the current grid once with every coloring found in `dir`.
    /// Files that do not parse are skipped. The field's coloring is put
    /// back afterwards.
    pub fn walk_color_collection(&mut self, dir: &Path) -> LyapResult<Vec<PathBuf>> {
        let original = self.field.coloring().clone();
        let mut shots = Vec::new();
        let mut result = Ok(());

        for path in ColorFiles::new(dir) {
            let coloring = match load_coloring(&path) {
                Ok(coloring) => coloring,
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                    continue;
                }
            };
            self.field.replace_coloring(coloring);
            match self.recolored(&format!("walkcolordir_{:04}", shots.len() + 1)) {
                Ok(bmp) => shots.push(bmp),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        self.field.replace_coloring(original);
        if shots.is_empty() {
            warn!("no usable colorings in {}", dir.display());
        }
        result.map(|_| shots)
    }

    /// Samples and saves each tile of a `columns × rows` split.
    pub fn walk_tiles(&mut self, prefix: &str, columns: usize, rows: usize) -> LyapResult<Vec<PathBuf>> {
        let (out_dir, gap) = (self.out_dir.clone(), self.gap_color);
        let mut shots = Vec::with_capacity(columns * rows);
        self.field.tile(columns, rows, |tile, field| {
            let stem = format!("walktile_{prefix}_{:06}", tile.index);
            shots.push(save_snapshot(field, &out_dir, &stem, gap)?);
            Ok(())
        })?;
        Ok(shots)
    }
}
