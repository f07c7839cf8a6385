//! Lyapunov exponent fields over a parallelogram of parameter space.

use std::time::Instant;

use log::{debug, info, trace};

use crate::color::IntervalColorMap;
use crate::error::{LyapError, LyapResult};
use crate::function::MapFunction;
use crate::geometry::{Tile, Window};
use crate::math::Point;

pub const MAX_SEQUENCE_LEN: usize = 256;

/// Products of derivatives at or below this are left out of the sum.
pub const DERIVATIVE_FLOOR: f64 = 1e-300;

const DEFAULT_PROGRESS_ROWS: usize = 128;

/// Which coordinate of the sampled point feeds the map at a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    A,
    B,
}

impl Symbol {
    fn pick(self, ab: Point) -> f64 {
        match self {
            Symbol::A => ab.x,
            Symbol::B => ab.y,
        }
    }
}

/// Parses an alternation sequence such as `"aab"`; case is ignored.
pub fn parse_sequence(text: &str) -> LyapResult<Vec<Symbol>> {
    let text = text.trim();
    if text.is_empty() {
        return Err(LyapError::InvalidSequence("sequence is empty".into()));
    }
    if text.len() > MAX_SEQUENCE_LEN {
        return Err(LyapError::InvalidSequence(format!(
            "{} symbols, at most {MAX_SEQUENCE_LEN} allowed",
            text.len()
        )));
    }
    text.chars()
        .map(|c| match c.to_ascii_uppercase() {
            'A' => Ok(Symbol::A),
            'B' => Ok(Symbol::B),
            other => Err(LyapError::InvalidSequence(format!("unexpected symbol {other:?}"))),
        })
        .collect()
}

pub fn sequence_text(sequence: &[Symbol]) -> String {
    sequence
        .iter()
        .map(|s| match s {
            Symbol::A => 'A',
            Symbol::B => 'B',
        })
        .collect()
}

/// Per-pixel iteration, borrowing the field's read-only configuration.
struct Sampler<'a> {
    function: &'a MapFunction,
    sequence: &'a [Symbol],
    settle_pairs: usize,
    measure_pairs: usize,
    x0: f64,
}

impl Sampler<'_> {
    fn exponent(&self, ab: Point) -> f64 {
        let f = self.function;
        let len = self.sequence.len();
        let mut pos = 0;
        let param = |pos: &mut usize| {
            let r = self.sequence[*pos].pick(ab);
            *pos += 1;
            if *pos >= len {
                *pos = 0;
            }
            r
        };

        let mut x = self.x0;
        for _ in 0..self.settle_pairs {
            let mid = f.value(x, param(&mut pos));
            x = f.value(mid, param(&mut pos));
        }

        if self.measure_pairs == 0 {
            return 0.0;
        }

        let mut sum = 0.0;
        for _ in 0..self.measure_pairs {
            let (mid, d1) = f.value_and_derivative(x, param(&mut pos));
            let (next, d2) = f.value_and_derivative(mid, param(&mut pos));
            x = next;
            let product = (d1 * d2).abs();
            if product > DERIVATIVE_FLOOR {
                sum += product.ln();
            }
        }
        sum / (2 * self.measure_pairs) as f64
    }
}

/// A sampled (or to-be-sampled) exponent field with everything needed to
/// compute and color it.
pub struct LyapunovField {
    function: MapFunction,
    coloring: IntervalColorMap,
    window: Window,
    width: usize,
    height: usize,
    settle_pairs: usize,
    measure_pairs: usize,
    sequence: Vec<Symbol>,
    x0: f64,
    grid: Vec<f64>,
    progress_rows: usize,
}

impl Default for LyapunovField {
    fn default() -> Self {
        LyapunovField::new(MapFunction::logistic(), IntervalColorMap::classic())
    }
}

impl LyapunovField {
    /// A 600×600 field over `[2, 4]²`, sequence `AB`, 50 settling and 100
    /// measuring iterations from `x0 = 0.5`.
    pub fn new(function: MapFunction, coloring: IntervalColorMap) -> Self {
        let mut field = LyapunovField {
            function,
            coloring,
            window: Window::default(),
            width: 0,
            height: 0,
            settle_pairs: 0,
            measure_pairs: 0,
            sequence: vec![Symbol::A, Symbol::B],
            x0: 0.5,
            grid: Vec::new(),
            progress_rows: DEFAULT_PROGRESS_ROWS,
        };
        field.set_size(600, 600);
        field.set_iterations(50, 100);
        field
    }

    pub fn function(&self) -> &MapFunction {
        &self.function
    }

    pub fn function_mut(&mut self) -> &mut MapFunction {
        &mut self.function
    }

    /// Installs `function` and hands back the one it displaces.
    pub fn replace_function(&mut self, function: MapFunction) -> MapFunction {
        std::mem::replace(&mut self.function, function)
    }

    pub fn coloring(&self) -> &IntervalColorMap {
        &self.coloring
    }

    pub fn coloring_mut(&mut self) -> &mut IntervalColorMap {
        &mut self.coloring
    }

    pub fn replace_coloring(&mut self, coloring: IntervalColorMap) -> IntervalColorMap {
        std::mem::replace(&mut self.coloring, coloring)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn set_window(&mut self, window: Window) {
        self.window = window;
    }

    pub fn set_position(&mut self, lower_left: Point, lower_right: Point, upper_left: Point) {
        self.window = Window::new(lower_left, lower_right, upper_left);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Rounds both sides down to a multiple of 4 and reallocates the grid.
    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width / 4 * 4;
        self.height = height / 4 * 4;
        self.grid = vec![0.0; self.width * self.height];
        debug!("grid resized to {}x{}", self.width, self.height);
    }

    /// Truncates both counts to even numbers; iteration runs in pairs.
    pub fn set_iterations(&mut self, settle: usize, measure: usize) {
        self.settle_pairs = settle / 2;
        self.measure_pairs = measure / 2;
    }

    pub fn settle_iterations(&self) -> usize {
        self.settle_pairs * 2
    }

    pub fn measure_iterations(&self) -> usize {
        self.measure_pairs * 2
    }

    pub fn x0(&self) -> f64 {
        self.x0
    }

    pub fn set_x0(&mut self, x0: f64) {
        self.x0 = x0;
    }

    pub fn sequence(&self) -> &[Symbol] {
        &self.sequence
    }

    pub fn sequence_text(&self) -> String {
        sequence_text(&self.sequence)
    }

    /// Replaces the alternation sequence; a bad one leaves the old in place.
    pub fn set_sequence(&mut self, text: &str) -> LyapResult<()> {
        self.sequence = parse_sequence(text)?;
        Ok(())
    }

    pub fn set_progress_rows(&mut self, rows: usize) {
        self.progress_rows = rows.max(1);
    }

    /// Row-major exponents, row 0 along the window's lower edge.
    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    pub fn exponent(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.grid.get(row * self.width + col).copied()
    }

    /// Swaps in a grid of the current size.
    pub fn replace_grid(&mut self, grid: Vec<f64>) -> LyapResult<()> {
        if grid.len() != self.width * self.height {
            return Err(LyapError::GridLength { expected: self.width * self.height, found: grid.len() });
        }
        self.grid = grid;
        Ok(())
    }

    /// Exponent for one parameter pair, outside any grid.
    pub fn exponent_at(&self, ab: Point) -> f64 {
        self.sampler().exponent(ab)
    }

    fn sampler(&self) -> Sampler<'_> {
        Sampler {
            function: &self.function,
            sequence: &self.sequence,
            settle_pairs: self.settle_pairs,
            measure_pairs: self.measure_pairs,
            x0: self.x0,
        }
    }

    pub fn compute(&mut self) {
        self.compute_rows(0, self.height as i64 - 1);
    }

    /// Samples rows `start..=end`, both clamped to the grid.
    pub fn compute_rows(&mut self, start: i64, end: i64) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let last = self.height as i64 - 1;
        let start = start.clamp(0, last) as usize;
        let end = end.clamp(0, last) as usize;
        if start > end {
            return;
        }

        let (vx, vy) = self.window.basis(self.width, self.height);
        let lower_left = self.window.lower_left;
        let width = self.width;
        let progress_rows = self.progress_rows;
        // taken out so the sampler can borrow the rest of the field
        let mut grid = std::mem::take(&mut self.grid);
        let sampler = self.sampler();

        info!("sampling rows {start}..={end} of {}x{}", self.width, self.height);
        let began = Instant::now();
        for y in start..=end {
            let done = y - start;
            if done > 0 && done % progress_rows == 0 {
                let per_row = began.elapsed().as_secs_f64() / done as f64;
                trace!("row {y}, {:.0} s to go", per_row * (end - y) as f64);
            }
            let row_origin = lower_left + vy * y as f64;
            let row = &mut grid[y * width..(y + 1) * width];
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = sampler.exponent(row_origin + vx * x as f64);
            }
        }
        self.grid = grid;
        info!("sampled {} rows in {:.2} s", end - start + 1, began.elapsed().as_secs_f64());
    }

    pub fn rotate(&mut self, degrees: f64) {
        self.window.rotate(degrees);
    }

    pub fn stretch(&mut self, fx: f64, fy: f64) {
        self.window.stretch(fx, fy);
    }

    pub fn crop(&mut self, left: i64, bottom: i64, right: i64, top: i64) {
        self.window.crop(self.width, self.height, left, bottom, right, top);
        debug!("cropped to {:?}", self.window);
    }

    pub fn recenter(&mut self, px: i64, py: i64) {
        self.window.recenter(self.width, self.height, px, py);
    }

    /// Samples every tile of a `columns × rows` split in turn, handing each
    /// to `emit` while its window is installed. The original window is put
    /// back afterwards, also when `emit` fails.
    pub fn tile<F>(&mut self, columns: usize, rows: usize, mut emit: F) -> LyapResult<()>
    where
        F: FnMut(&Tile, &LyapunovField) -> LyapResult<()>,
    {
        let saved = self.window;
        let tiles = saved.tiles(columns, rows)?;
        let total = tiles.len();
        let mut outcome = Ok(());
        for tile in &tiles {
            info!("tile {}/{total}", tile.index);
            self.window = tile.window;
            self.compute();
            outcome = emit(tile, self);
            if outcome.is_err() {
                break;
            }
        }
        self.window = saved;
        outcome
    }

    /// Plain-text summary of the current configuration.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "x0={}, {} initial and {} computing iterations\n",
            self.x0,
            self.settle_iterations(),
            self.measure_iterations()
        );
        out.push_str(&format!("Trajectory function f(x)={}\n", self.function.value_formula()));
        out.push_str(&format!("Computing function g(x)={}\n", self.function.derivative_formula()));
        let center = self.window.centroid();
        out.push_str(&format!(
            "Sequence {}. Center ({:.2}/{:.2}) size={:.10}\n",
            self.sequence_text(),
            center.x,
            center.y,
            self.window.size()
        ));
        let (min, max) = self.coloring.bounds();
        out.push_str(&format!(
            "Coloring with linear RGB interpolation in {} intervals\n",
            self.coloring.len()
        ));
        out.push_str(&format!("less than {min:.2}: {}\n", self.coloring.below));
        for interval in self.coloring.intervals() {
            out.push_str(&format!(
                "in [{:.2}..{:.2}) {}..{}\n",
                interval.lower(),
                interval.upper(),
                interval.left,
                interval.right
            ));
        }
        out.push_str(&format!("greater than {max:.2}: {}\n", self.coloring.above));
        out
    }
}
