//! Files a field is saved to and restored from.
//!
//! * `.par`: parameter record (function, coloring, size, iterations,
//!   sequence, window)
//! * `.ljd`: raw exponent grid
//! * `.bmp`: rendered picture
//! * `.descr`: human readable summary

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bincode::{Decode, Encode};
use log::{debug, info};

use crate::color::{IntervalColorMap, Rgb};
use crate::error::{LyapError, LyapResult};
use crate::field::{LyapunovField, Symbol, parse_sequence, sequence_text};
use crate::function::MapFunction;
use crate::geometry::Window;
use crate::math::Point;
use crate::record::{RecordReader, RecordWriter};
use crate::render::render_bmp;

const PARAM_KEYS: [&str; 11] = [
    "FUNCTION",
    "COLORING",
    "WIDTH",
    "HEIGHT",
    "SETTLE",
    "MEASURE",
    "X0",
    "SEQUENCE",
    "UPPERLEFT",
    "LOWERLEFT",
    "LOWERRIGHT",
];

/// Everything a `.par` file holds, parsed but not yet applied to a field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldParams {
    pub function: MapFunction,
    pub coloring: IntervalColorMap,
    pub width: usize,
    pub height: usize,
    pub settle: usize,
    pub measure: usize,
    pub x0: f64,
    pub sequence: Vec<Symbol>,
    pub window: Window,
}

impl FieldParams {
    pub fn from_field(field: &LyapunovField) -> Self {
        FieldParams {
            function: field.function().clone(),
            coloring: field.coloring().clone(),
            width: field.width(),
            height: field.height(),
            settle: field.settle_iterations(),
            measure: field.measure_iterations(),
            x0: field.x0(),
            sequence: field.sequence().to_vec(),
            window: *field.window(),
        }
    }

    pub fn to_record(&self) -> String {
        let mut w = RecordWriter::new();
        w.key("FUNCTION");
        self.function.write_record(&mut w);
        w.key("COLORING");
        self.coloring.write_record(&mut w);
        w.key("WIDTH").line(self.width);
        w.key("HEIGHT").line(self.height);
        w.key("SETTLE").line(self.settle);
        w.key("MEASURE").line(self.measure);
        w.key("X0").float(self.x0);
        w.key("SEQUENCE").line(sequence_text(&self.sequence));
        for (key, p) in [
            ("UPPERLEFT", self.window.upper_left),
            ("LOWERLEFT", self.window.lower_left),
            ("LOWERRIGHT", self.window.lower_right),
        ] {
            w.key(key).float(p.x).float(p.y);
        }
        w.finish()
    }

    pub fn from_record(text: &str) -> LyapResult<Self> {
        let mut function = None;
        let mut coloring = None;
        let (mut width, mut height, mut settle, mut measure) = (0, 0, 0, 0);
        let mut x0 = 0.0;
        let mut sequence = Vec::new();
        let mut window = Window::default();

        let mut reader = RecordReader::new(text);
        reader.fields(&PARAM_KEYS, |r, key| {
            match key {
                "FUNCTION" => function = Some(MapFunction::read_record(r)?),
                "COLORING" => coloring = Some(IntervalColorMap::read_record(r)?),
                "WIDTH" => width = r.value("width")?,
                "HEIGHT" => height = r.value("height")?,
                "SETTLE" => settle = r.value("settling iterations")?,
                "MEASURE" => measure = r.value("measuring iterations")?,
                "X0" => x0 = r.value("x0")?,
                "SEQUENCE" => {
                    let text = r.text("sequence")?;
                    sequence = parse_sequence(text)
                        .map_err(|e| LyapError::malformed(r.line(), e.to_string()))?;
                }
                "UPPERLEFT" => window.upper_left = read_point(r, "upper left corner")?,
                "LOWERLEFT" => window.lower_left = read_point(r, "lower left corner")?,
                _ => window.lower_right = read_point(r, "lower right corner")?,
            }
            Ok(())
        })?;

        let line = reader.line();
        Ok(FieldParams {
            function: function.ok_or_else(|| LyapError::malformed(line, "missing function"))?,
            coloring: coloring.ok_or_else(|| LyapError::malformed(line, "missing coloring"))?,
            width,
            height,
            settle,
            measure,
            x0,
            sequence,
            window,
        })
    }

    /// Applies every setting to `field`.
    pub fn install(self, field: &mut LyapunovField) -> LyapResult<()> {
        field.set_sequence(&sequence_text(&self.sequence))?;
        field.set_size(self.width, self.height);
        field.set_iterations(self.settle, self.measure);
        field.set_x0(self.x0);
        field.set_window(self.window);
        field.replace_function(self.function);
        field.replace_coloring(self.coloring);
        Ok(())
    }
}

fn read_point(reader: &mut RecordReader<'_>, what: &str) -> LyapResult<Point> {
    Ok(Point::new(reader.value(what)?, reader.value(what)?))
}

/// `stem` with `.ext` appended. Unlike `Path::with_extension` this keeps
/// dots already in the stem, such as those of a formatted parameter value.
pub fn stem_file(stem: &Path, ext: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

pub fn save_params<P: AsRef<Path>>(field: &LyapunovField, path: P) -> LyapResult<()> {
    fs::write(path.as_ref(), FieldParams::from_field(field).to_record())?;
    Ok(())
}

/// Reads a `.par` file into `field`. Nothing changes unless the whole file
/// parses.
pub fn load_params<P: AsRef<Path>>(field: &mut LyapunovField, path: P) -> LyapResult<()> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    FieldParams::from_record(&text)?.install(field)?;
    debug!("loaded parameters from {}", path.display());
    Ok(())
}

/// Pulls just the color map out of a parameter file.
pub fn coloring_from_record(text: &str) -> LyapResult<IntervalColorMap> {
    let mut reader = RecordReader::new(text);
    while let Some(key) = reader.try_key() {
        if key == "COLORING" {
            return IntervalColorMap::read_record(&mut reader);
        }
    }
    Err(LyapError::malformed(reader.line(), "no COLORING section"))
}

pub fn load_coloring<P: AsRef<Path>>(path: P) -> LyapResult<IntervalColorMap> {
    coloring_from_record(&fs::read_to_string(path.as_ref())?)
}

#[derive(Encode, Decode)]
struct GridHeader {
    width: i32,
    height: i32,
}

pub fn save_grid<P: AsRef<Path>>(field: &LyapunovField, path: P) -> LyapResult<()> {
    let cfg = bincode::config::legacy();
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    let header = GridHeader { width: field.width() as i32, height: field.height() as i32 };
    bincode::encode_into_std_write(header, &mut out, cfg)?;
    for &value in field.grid() {
        bincode::encode_into_std_write(value, &mut out, cfg)?;
    }
    out.flush()?;
    Ok(())
}

/// Reads a grid file of exactly the field's size.
pub fn load_grid<P: AsRef<Path>>(field: &mut LyapunovField, path: P) -> LyapResult<()> {
    let cfg = bincode::config::legacy();
    let mut input = BufReader::new(File::open(path.as_ref())?);
    let header: GridHeader = bincode::decode_from_std_read(&mut input, cfg)?;
    if header.width as i64 != field.width() as i64 || header.height as i64 != field.height() as i64 {
        return Err(LyapError::DimensionMismatch {
            width: field.width(),
            height: field.height(),
            found_width: header.width.max(0) as usize,
            found_height: header.height.max(0) as usize,
        });
    }
    let mut grid = Vec::with_capacity(field.width() * field.height());
    for _ in 0..field.width() * field.height() {
        grid.push(bincode::decode_from_std_read::<f64, _, _>(&mut input, cfg)?);
    }
    field.replace_grid(grid)
}

pub fn save_description<P: AsRef<Path>>(field: &LyapunovField, path: P) -> LyapResult<()> {
    fs::write(path.as_ref(), field.describe())?;
    Ok(())
}

/// Writes `stem.bmp`, `stem.par` and `stem.ljd` into `dir` and returns the
/// path of the picture.
pub fn save_snapshot(
    field: &LyapunovField,
    dir: &Path,
    stem: &str,
    gap_color: Rgb,
) -> LyapResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let base = dir.join(stem);
    let bmp = stem_file(&base, "bmp");
    render_bmp(field, &bmp, gap_color)?;
    save_params(field, stem_file(&base, "par"))?;
    save_grid(field, stem_file(&base, "ljd"))?;
    info!("snapshot {stem} saved");
    Ok(bmp)
}

/// Loads `stem.par` and, when there is one, `stem.ljd`. Returns whether a
/// grid was restored.
pub fn load_snapshot(field: &mut LyapunovField, stem: &Path) -> LyapResult<bool> {
    load_params(field, stem_file(stem, "par"))?;
    let grid = stem_file(stem, "ljd");
    if !grid.exists() {
        return Ok(false);
    }
    load_grid(field, grid)?;
    Ok(true)
}
