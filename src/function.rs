//! Iterated map functions.
//!
//! A [`MapFunction`] evaluates `f(x, r)` and a companion `g(x, r)`. For the
//! plain formulas `g` is the analytic derivative of `f` with respect to
//! `x`; the detached formulas pair `f` with an unrelated `g`. Composed and
//! piecewise functions own their children and route each path to one of
//! them.

use log::debug;

use crate::error::{LyapError, LyapResult};
use crate::math::{fast_cos, fast_sin};
use crate::record::{RecordReader, RecordWriter};
use crate::sweep::ParameterSweep;

pub const DEFAULT_B: f64 = 2.7;

pub const COMPOSED_ID: i32 = 16;
pub const PIECEWISE_ID: i32 = 17;

/// The closed-form formulas. Discriminants are the kind ids used in
/// records and by the derivative walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Formula {
    /// f = r·x·(1−x)
    Logistic = 1,
    /// f = b·sin²(x+r)
    SineSquared = 2,
    /// f = b·sin(x + r·cos(x+r))
    SineCosine = 3,
    /// f = b·sin(x+r)·sin(x−r)
    SineProduct = 7,
    /// f = b·sin²(x+r), g = r − 2rx
    DetachedSineSquared = 11,
    /// f = b·sin(x+r) + b·sin²(bx+r), g = sin²(x+rb) − rx
    DetachedSineMix = 13,
    /// f = r·sin²(x−r) + b·sin³(x+2r), g = rx − b·sin⁴(rx−b)
    DetachedSineCube = 14,
    /// f = r·sin(x)·(1 − b·sin(x+r))
    LogisticSine = 18,
    /// f = b·atan((x+r)·sin(x+r))
    SineAtan = 22,
}

impl Formula {
    pub const ALL: [Formula; 9] = [
        Formula::Logistic,
        Formula::SineSquared,
        Formula::SineCosine,
        Formula::SineProduct,
        Formula::DetachedSineSquared,
        Formula::DetachedSineMix,
        Formula::DetachedSineCube,
        Formula::LogisticSine,
        Formula::SineAtan,
    ];

    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<Formula> {
        Formula::ALL.into_iter().find(|f| f.id() == id)
    }

    pub fn is_detached(self) -> bool {
        matches!(
            self,
            Formula::DetachedSineSquared | Formula::DetachedSineMix | Formula::DetachedSineCube
        )
    }

    pub fn has_parameter(self) -> bool {
        self != Formula::Logistic
    }

    fn name(self) -> &'static str {
        match self {
            Formula::Logistic => "logistic",
            Formula::SineSquared => "sine squared",
            Formula::SineCosine => "sine cosine",
            Formula::SineProduct => "sine product",
            Formula::DetachedSineSquared => "detached sine squared",
            Formula::DetachedSineMix => "detached sine mix",
            Formula::DetachedSineCube => "detached sine cube",
            Formula::LogisticSine => "logistic sine",
            Formula::SineAtan => "sine atan",
        }
    }

    fn value(self, b: f64, x: f64, r: f64) -> f64 {
        match self {
            Formula::Logistic => r * x * (1.0 - x),
            Formula::SineSquared | Formula::DetachedSineSquared => {
                let si = fast_sin(x + r);
                b * si * si
            }
            Formula::SineCosine => b * fast_sin(x + r * fast_cos(x + r)),
            Formula::SineProduct => b * fast_sin(x + r) * fast_sin(x - r),
            Formula::DetachedSineMix => {
                let si = fast_sin(b * x + r);
                b * fast_sin(x + r) + b * si * si
            }
            Formula::DetachedSineCube => {
                let si = fast_sin(x - r);
                let si2 = fast_sin(x + r + r);
                r * si * si + b * si2 * si2 * si2
            }
            Formula::LogisticSine => r * fast_sin(x) * (1.0 - b * fast_sin(x + r)),
            Formula::SineAtan => {
                let xr = x + r;
                b * (xr * fast_sin(xr)).atan()
            }
        }
    }

    fn derivative(self, b: f64, x: f64, r: f64) -> f64 {
        match self {
            Formula::Logistic | Formula::DetachedSineSquared => {
                let rx = r * x;
                r - rx - rx
            }
            Formula::SineSquared => {
                let xr = x + r;
                (b + b) * fast_sin(xr) * fast_cos(xr)
            }
            Formula::SineCosine => {
                let xr = x + r;
                b * (1.0 - r * fast_sin(xr)) * fast_cos(x + r * fast_cos(xr))
            }
            Formula::SineProduct => b * fast_sin(x + x),
            Formula::DetachedSineMix => {
                let si = fast_sin(x + r * b);
                si * si - r * x
            }
            Formula::DetachedSineCube => {
                let rx = r * x;
                let si = fast_sin(rx - b);
                let si2 = si * si;
                rx - b * si2 * si2
            }
            Formula::LogisticSine => -r * (b * fast_sin(x + x + r) - fast_cos(x)),
            Formula::SineAtan => {
                let xr = x + r;
                let si = fast_sin(xr);
                let xsi = xr * si;
                b * (si + xr * fast_cos(xr)) / (1.0 + xsi * xsi)
            }
        }
    }

    // Shares the trigonometric terms; must agree with `value`/`derivative`.
    fn value_and_derivative(self, b: f64, x: f64, r: f64) -> (f64, f64) {
        match self {
            Formula::Logistic => {
                let rx = r * x;
                (r * x * (1.0 - x), r - rx - rx)
            }
            Formula::SineSquared => {
                let xr = x + r;
                let si = fast_sin(xr);
                (b * si * si, (b + b) * si * fast_cos(xr))
            }
            Formula::SineAtan => {
                let xr = x + r;
                let si = fast_sin(xr);
                let xsi = xr * si;
                (b * xsi.atan(), b * (si + xr * fast_cos(xr)) / (1.0 + xsi * xsi))
            }
            _ => (self.value(b, x, r), self.derivative(b, x, r)),
        }
    }

    fn value_text(self, b: f64) -> String {
        match self {
            Formula::Logistic => "r*x*(1-x)".to_string(),
            Formula::SineSquared | Formula::DetachedSineSquared => format!("{b:e}*sin^2(x+r)"),
            Formula::SineCosine => format!("{b:e}*sin(x+r*cos(x+r))"),
            Formula::SineProduct => format!("{b:e}*sin(x+r)*sin(x-r)"),
            Formula::DetachedSineMix => format!("{b:e}*sin(x+r)+{b:e}*sin^2({b:e}*x+r)"),
            Formula::DetachedSineCube => format!("r*sin^2(x-r)+{b:e}*sin^3(x+2*r)"),
            Formula::LogisticSine => format!("r*sin(x)*(1-{b:e}*sin(x+r))"),
            Formula::SineAtan => format!("{b:e}*atan((x+r)*sin(x+r))"),
        }
    }

    fn derivative_text(self, b: f64) -> String {
        match self {
            Formula::Logistic | Formula::DetachedSineSquared => "r-2rx".to_string(),
            Formula::SineSquared => format!("{:e}*sin(x+r)*cos(x+r)", b + b),
            Formula::SineCosine => format!("{b:e}*(1-r*sin(x+r))*cos(x+r*cos(x+r))"),
            Formula::SineProduct => format!("{b:e}*sin(2*x)"),
            Formula::DetachedSineMix => format!("sin^2(x+{b:e}*r)-r*x"),
            Formula::DetachedSineCube => format!("rx-{b:e}*sin^4(rx-{b:e})"),
            Formula::LogisticSine => format!("-r*({b:e}*sin(2x+r)-cos(x))"),
            Formula::SineAtan => format!(
                "{b:e}*(sin(x+r)+(x+r)*cos(x+r))/(1+(x+r)^2*sin^2(x+r))"
            ),
        }
    }

    fn tag(self) -> String {
        if self.is_detached() {
            format!("DET({})", self.id())
        } else {
            format!("N({})", self.id())
        }
    }
}

/// Which output of a child a composed function forwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Value = 1,
    Derivative = 2,
}

impl Role {
    pub const BOTH: [Role; 2] = [Role::Value, Role::Derivative];

    pub fn from_id(id: i32) -> Option<Role> {
        match id {
            1 => Some(Role::Value),
            2 => Some(Role::Derivative),
            _ => None,
        }
    }

    fn pick(self, f: &MapFunction, x: f64, r: f64) -> f64 {
        match self {
            Role::Value => f.value(x, r),
            Role::Derivative => f.derivative(x, r),
        }
    }

    fn text(self, f: &MapFunction) -> String {
        match self {
            Role::Value => f.value_formula(),
            Role::Derivative => f.derivative_formula(),
        }
    }
}

/// A closed interval of `x` values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub fn new(min: f64, max: f64) -> Self {
        Band { min, max }
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Composed {
    pub value_fn: MapFunction,
    pub value_role: Role,
    pub derivative_fn: MapFunction,
    pub derivative_role: Role,
}

/// Chooses between `interior` and `exterior` per call. The value path
/// and the derivative path consult their own band; keeping the two bands
/// consistent is up to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct Piecewise {
    pub value_band: Band,
    pub derivative_band: Band,
    pub interior: MapFunction,
    pub exterior: MapFunction,
}

impl Piecewise {
    fn value_side(&self, x: f64) -> &MapFunction {
        if self.value_band.contains(x) { &self.interior } else { &self.exterior }
    }

    fn derivative_side(&self, x: f64) -> &MapFunction {
        if self.derivative_band.contains(x) { &self.interior } else { &self.exterior }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Map {
    Elementary { formula: Formula, b: f64 },
    Composed(Box<Composed>),
    Piecewise(Box<Piecewise>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapFunction {
    map: Map,
    sweep: Option<ParameterSweep>,
}

impl MapFunction {
    pub fn new(formula: Formula) -> Self {
        MapFunction::with_parameter(formula, DEFAULT_B)
    }

    pub fn with_parameter(formula: Formula, b: f64) -> Self {
        MapFunction { map: Map::Elementary { formula, b }, sweep: None }
    }

    pub fn logistic() -> Self {
        MapFunction::new(Formula::Logistic)
    }

    pub fn composed(
        value_fn: MapFunction,
        value_role: Role,
        derivative_fn: MapFunction,
        derivative_role: Role,
    ) -> Self {
        let composed = Composed { value_fn, value_role, derivative_fn, derivative_role };
        MapFunction { map: Map::Composed(Box::new(composed)), sweep: None }
    }

    pub fn piecewise(
        value_band: Band,
        derivative_band: Band,
        interior: MapFunction,
        exterior: MapFunction,
    ) -> Self {
        let piecewise = Piecewise { value_band, derivative_band, interior, exterior };
        MapFunction { map: Map::Piecewise(Box::new(piecewise)), sweep: None }
    }

    /// Builds the default function for a kind id. Composed and piecewise
    /// kinds start with two default sine-squared children.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            COMPOSED_ID => Some(MapFunction::composed(
                MapFunction::new(Formula::SineSquared),
                Role::Value,
                MapFunction::new(Formula::SineSquared),
                Role::Derivative,
            )),
            PIECEWISE_ID => Some(MapFunction::piecewise(
                Band::new(0.0, 0.0),
                Band::new(0.0, 0.0),
                MapFunction::new(Formula::SineSquared),
                MapFunction::new(Formula::SineSquared),
            )),
            _ => Formula::from_id(id).map(MapFunction::new),
        }
    }

    pub fn id(&self) -> i32 {
        match &self.map {
            Map::Elementary { formula, .. } => formula.id(),
            Map::Composed(_) => COMPOSED_ID,
            Map::Piecewise(_) => PIECEWISE_ID,
        }
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn as_composed_mut(&mut self) -> Option<&mut Composed> {
        match &mut self.map {
            Map::Composed(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_piecewise_mut(&mut self) -> Option<&mut Piecewise> {
        match &mut self.map {
            Map::Piecewise(p) => Some(p),
            _ => None,
        }
    }

    pub fn value(&self, x: f64, r: f64) -> f64 {
        match &self.map {
            Map::Elementary { formula, b } => formula.value(*b, x, r),
            Map::Composed(c) => c.value_role.pick(&c.value_fn, x, r),
            Map::Piecewise(p) => p.value_side(x).value(x, r),
        }
    }

    pub fn derivative(&self, x: f64, r: f64) -> f64 {
        match &self.map {
            Map::Elementary { formula, b } => formula.derivative(*b, x, r),
            Map::Composed(c) => c.derivative_role.pick(&c.derivative_fn, x, r),
            Map::Piecewise(p) => p.derivative_side(x).derivative(x, r),
        }
    }

    pub fn value_and_derivative(&self, x: f64, r: f64) -> (f64, f64) {
        match &self.map {
            Map::Elementary { formula, b } => formula.value_and_derivative(*b, x, r),
            Map::Composed(_) => (self.value(x, r), self.derivative(x, r)),
            Map::Piecewise(p) => {
                let value_side = p.value_side(x);
                let derivative_side = p.derivative_side(x);
                if std::ptr::eq(value_side, derivative_side) {
                    value_side.value_and_derivative(x, r)
                } else {
                    (value_side.value(x, r), derivative_side.derivative(x, r))
                }
            }
        }
    }

    pub fn has_parameter(&self) -> bool {
        match &self.map {
            Map::Elementary { formula, .. } => formula.has_parameter(),
            Map::Composed(c) => c.value_fn.has_parameter() || c.derivative_fn.has_parameter(),
            Map::Piecewise(p) => p.interior.has_parameter() || p.exterior.has_parameter(),
        }
    }

    /// The shape parameter, or the first child's that has one.
    pub fn parameter(&self) -> Option<f64> {
        match &self.map {
            Map::Elementary { formula, b } => formula.has_parameter().then_some(*b),
            Map::Composed(c) => c.value_fn.parameter().or_else(|| c.derivative_fn.parameter()),
            Map::Piecewise(p) => p.interior.parameter().or_else(|| p.exterior.parameter()),
        }
    }

    /// Sets b here or in both children. Fails when nothing took it.
    pub fn set_parameter(&mut self, value: f64) -> LyapResult<()> {
        match &mut self.map {
            Map::Elementary { formula, b } => {
                if !formula.has_parameter() {
                    return Err(LyapError::unsupported(format!(
                        "{} map has no parameter",
                        formula.name()
                    )));
                }
                *b = value;
                Ok(())
            }
            Map::Composed(c) => {
                let first = c.value_fn.set_parameter(value);
                let second = c.derivative_fn.set_parameter(value);
                first.or(second)
            }
            Map::Piecewise(p) => {
                let first = p.interior.set_parameter(value);
                let second = p.exterior.set_parameter(value);
                first.or(second)
            }
        }
    }

    pub fn bind_sweep(&mut self, sweep: ParameterSweep) {
        self.sweep = Some(sweep);
    }

    pub fn unbind_sweep(&mut self) -> Option<ParameterSweep> {
        self.sweep.take()
    }

    pub fn sweep(&self) -> Option<&ParameterSweep> {
        self.sweep.as_ref()
    }

    /// Rewinds the bound sweep and applies its first value.
    pub fn sweep_start(&mut self) -> LyapResult<f64> {
        if !self.has_parameter() {
            return Err(LyapError::unsupported("function has no parameter to sweep"));
        }
        let Some(sweep) = self.sweep.as_mut() else {
            return Err(LyapError::unsupported("no sweep bound"));
        };
        let value = sweep.start();
        self.set_parameter(value)?;
        Ok(value)
    }

    /// Applies the next sweep value, `None` once the sweep is exhausted.
    pub fn sweep_next(&mut self) -> LyapResult<Option<f64>> {
        let Some(sweep) = self.sweep.as_mut() else {
            return Err(LyapError::unsupported("no sweep bound"));
        };
        match sweep.next() {
            Some(value) => {
                self.set_parameter(value)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn value_formula(&self) -> String {
        match &self.map {
            Map::Elementary { formula, b } => format!("{} {}", formula.tag(), formula.value_text(*b)),
            Map::Composed(c) => {
                format!("COMPOSED({COMPOSED_ID}) f(x)={}", c.value_role.text(&c.value_fn))
            }
            Map::Piecewise(p) => format!(
                "PIECEWISE({PIECEWISE_ID}) if {:.5} <= x <= {:.5}: f(x)={} else f(x)={}",
                p.value_band.min,
                p.value_band.max,
                p.interior.value_formula(),
                p.exterior.value_formula()
            ),
        }
    }

    pub fn derivative_formula(&self) -> String {
        match &self.map {
            Map::Elementary { formula, b } => {
                let marker = if formula.is_detached() { "" } else { "[=f'(x)] " };
                format!("{} {marker}{}", formula.tag(), formula.derivative_text(*b))
            }
            Map::Composed(c) => format!(
                "COMPOSED({COMPOSED_ID}) g(x)={}",
                c.derivative_role.text(&c.derivative_fn)
            ),
            Map::Piecewise(p) => format!(
                "PIECEWISE({PIECEWISE_ID}) if {:.5} <= x <= {:.5}: g(x)={} else g(x)={}",
                p.derivative_band.min,
                p.derivative_band.max,
                p.interior.derivative_formula(),
                p.exterior.derivative_formula()
            ),
        }
    }

    pub fn write_record(&self, w: &mut RecordWriter) {
        w.key("ID").line(self.id());
        match &self.map {
            Map::Elementary { formula, b } => {
                w.comment(&format!("FUNCTION {}", formula.name().to_uppercase()));
                if formula.has_parameter() {
                    w.key("B").float(*b);
                }
            }
            Map::Composed(c) => {
                w.comment("COMPOSED");
                w.key("VALUEROLE").line(c.value_role as i32);
                w.key("DERIVATIVEROLE").line(c.derivative_role as i32);
                w.key("VALUEFN");
                c.value_fn.write_record(w);
                w.key("DERIVATIVEFN");
                c.derivative_fn.write_record(w);
            }
            Map::Piecewise(p) => {
                w.comment("PIECEWISE");
                w.key("VALUEMIN").float(p.value_band.min);
                w.key("VALUEMAX").float(p.value_band.max);
                w.key("DERIVATIVEMIN").float(p.derivative_band.min);
                w.key("DERIVATIVEMAX").float(p.derivative_band.max);
                w.key("INTERIOR");
                p.interior.write_record(w);
                w.key("EXTERIOR");
                p.exterior.write_record(w);
            }
        }
    }

    pub fn to_record(&self) -> String {
        let mut w = RecordWriter::new();
        self.write_record(&mut w);
        w.finish()
    }

    /// Reads one function record, children included.
    pub fn read_record(reader: &mut RecordReader<'_>) -> LyapResult<Self> {
        reader.expect_key("ID")?;
        let id: i32 = reader.value("function id")?;
        let line = reader.line();

        if id == COMPOSED_ID {
            return read_composed(reader);
        }
        if id == PIECEWISE_ID {
            return read_piecewise(reader);
        }

        let formula = Formula::from_id(id)
            .ok_or_else(|| LyapError::malformed(line, format!("unknown function id {id}")))?;
        let mut function = MapFunction::new(formula);
        if formula.has_parameter() {
            reader.fields(&["B"], |r, _| {
                function.set_parameter(r.value("b")?)
            })?;
        }
        debug!("loaded {}", function.value_formula());
        Ok(function)
    }

    pub fn from_record(text: &str) -> LyapResult<Self> {
        MapFunction::read_record(&mut RecordReader::new(text))
    }
}

fn read_role(reader: &mut RecordReader<'_>, what: &str) -> LyapResult<Role> {
    let id: i32 = reader.value(what)?;
    Role::from_id(id).ok_or_else(|| LyapError::malformed(reader.line(), format!("bad {what} {id}")))
}

fn read_composed(reader: &mut RecordReader<'_>) -> LyapResult<MapFunction> {
    let mut value_role = None;
    let mut derivative_role = None;
    let mut value_fn = None;
    let mut derivative_fn = None;
    reader.fields(&["VALUEROLE", "DERIVATIVEROLE", "VALUEFN", "DERIVATIVEFN"], |r, key| {
        match key {
            "VALUEROLE" => value_role = Some(read_role(r, "value role")?),
            "DERIVATIVEROLE" => derivative_role = Some(read_role(r, "derivative role")?),
            "VALUEFN" => value_fn = Some(MapFunction::read_record(r)?),
            _ => derivative_fn = Some(MapFunction::read_record(r)?),
        }
        Ok(())
    })?;
    match (value_fn, value_role, derivative_fn, derivative_role) {
        (Some(f), Some(fr), Some(g), Some(gr)) => Ok(MapFunction::composed(f, fr, g, gr)),
        _ => Err(LyapError::malformed(reader.line(), "incomplete composed function")),
    }
}

fn read_piecewise(reader: &mut RecordReader<'_>) -> LyapResult<MapFunction> {
    let mut value_band = Band::new(0.0, 0.0);
    let mut derivative_band = Band::new(0.0, 0.0);
    let mut interior = None;
    let mut exterior = None;
    reader.fields(
        &["VALUEMIN", "VALUEMAX", "DERIVATIVEMIN", "DERIVATIVEMAX", "INTERIOR", "EXTERIOR"],
        |r, key| {
            match key {
                "VALUEMIN" => value_band.min = r.value("value band min")?,
                "VALUEMAX" => value_band.max = r.value("value band max")?,
                "DERIVATIVEMIN" => derivative_band.min = r.value("derivative band min")?,
                "DERIVATIVEMAX" => derivative_band.max = r.value("derivative band max")?,
                "INTERIOR" => interior = Some(MapFunction::read_record(r)?),
                _ => exterior = Some(MapFunction::read_record(r)?),
            }
            Ok(())
        },
    )?;
    match (interior, exterior) {
        (Some(i), Some(e)) => Ok(MapFunction::piecewise(value_band, derivative_band, i, e)),
        _ => Err(LyapError::malformed(reader.line(), "incomplete piecewise function")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    const SAMPLES: [(f64, f64); 6] =
        [(0.5, 3.2), (0.1, 2.0), (-0.7, 3.9), (1.3, -2.4), (0.0, 0.0), (2.2, 0.75)];

    fn all_kinds() -> Vec<MapFunction> {
        let mut all: Vec<MapFunction> = Formula::ALL.into_iter().map(MapFunction::new).collect();
        for role_f in Role::BOTH {
            for role_g in Role::BOTH {
                all.push(MapFunction::composed(
                    MapFunction::new(Formula::SineCosine),
                    role_f,
                    MapFunction::new(Formula::DetachedSineMix),
                    role_g,
                ));
            }
        }
        all.push(MapFunction::piecewise(
            Band::new(-0.5, 0.6),
            Band::new(0.0, 1.5),
            MapFunction::new(Formula::LogisticSine),
            MapFunction::new(Formula::SineAtan),
        ));
        all
    }

    #[test]
    fn both_paths_agree() {
        for f in all_kinds() {
            for (x, r) in SAMPLES {
                let (v, d) = f.value_and_derivative(x, r);
                assert_eq!(v.to_bits(), f.value(x, r).to_bits(), "{}", f.value_formula());
                assert_eq!(d.to_bits(), f.derivative(x, r).to_bits(), "{}", f.value_formula());
            }
        }
    }

    #[test]
    fn plain_derivatives_match_finite_differences() {
        let h = 1e-5;
        for formula in Formula::ALL.into_iter().filter(|f| !f.is_detached()) {
            let f = MapFunction::with_parameter(formula, 1.3);
            for (x, r) in [(0.3, 1.1), (-0.4, 0.7), (0.9, 2.1)] {
                let numeric = (f.value(x + h, r) - f.value(x - h, r)) / (2.0 * h);
                let analytic = f.derivative(x, r);
                // fast_sin error dominates the difference quotient
                assert!((numeric - analytic).abs() < 0.1, "{formula:?} at ({x}, {r})");
            }
        }
    }

    #[test]
    fn logistic_values() {
        let f = MapFunction::logistic();
        assert_eq!(f.value(0.5, 4.0), 1.0);
        assert_eq!(f.derivative(0.25, 2.0), 1.0);
        assert_eq!(f.parameter(), None);
    }

    #[test]
    fn composed_routes_roles() {
        let a = MapFunction::new(Formula::SineProduct);
        let b = MapFunction::new(Formula::DetachedSineSquared);
        let f = MapFunction::composed(a.clone(), Role::Derivative, b.clone(), Role::Value);
        assert_eq!(f.value(0.4, 1.2), a.derivative(0.4, 1.2));
        assert_eq!(f.derivative(0.4, 1.2), b.value(0.4, 1.2));
    }

    #[test]
    fn piecewise_bands_are_independent() {
        let inner = MapFunction::new(Formula::SineSquared);
        let outer = MapFunction::logistic();
        let f = MapFunction::piecewise(
            Band::new(0.0, 1.0),
            Band::new(2.0, 3.0),
            inner.clone(),
            outer.clone(),
        );
        assert_eq!(f.value(0.5, 3.0), inner.value(0.5, 3.0));
        assert_eq!(f.derivative(0.5, 3.0), outer.derivative(0.5, 3.0));
        assert_eq!(f.value(2.5, 3.0), outer.value(2.5, 3.0));
        assert_eq!(f.derivative(2.5, 3.0), inner.derivative(2.5, 3.0));
        // band edges are inside
        assert_eq!(f.value(1.0, 3.0), inner.value(1.0, 3.0));
    }

    #[test]
    fn parameter_propagates_to_children() {
        let mut f = MapFunction::composed(
            MapFunction::logistic(),
            Role::Value,
            MapFunction::new(Formula::SineSquared),
            Role::Derivative,
        );
        f.set_parameter(1.5).unwrap();
        assert_eq!(f.parameter(), Some(1.5));

        let mut only_logistic = MapFunction::composed(
            MapFunction::logistic(),
            Role::Value,
            MapFunction::logistic(),
            Role::Derivative,
        );
        assert!(matches!(only_logistic.set_parameter(1.5), Err(LyapError::Unsupported(_))));
        assert!(MapFunction::logistic().set_parameter(1.0).is_err());
    }

    #[test]
    fn sweep_drives_parameter() {
        let mut f = MapFunction::new(Formula::SineAtan);
        assert!(f.sweep_start().is_err());
        assert!(f.sweep_next().is_err());

        f.bind_sweep(ParameterSweep::new(1.0, 2.0, 3));
        assert_eq!(f.sweep_start().unwrap(), 1.0);
        assert_eq!(f.parameter(), Some(1.0));
        assert_eq!(f.sweep_next().unwrap(), Some(1.5));
        assert_eq!(f.parameter(), Some(1.5));
        assert_eq!(f.sweep_next().unwrap(), Some(2.0));
        assert_eq!(f.sweep_next().unwrap(), None);
        assert_eq!(f.parameter(), Some(2.0));
        assert!(f.unbind_sweep().is_some());

        let mut logistic = MapFunction::logistic();
        logistic.bind_sweep(ParameterSweep::new(1.0, 2.0, 3));
        assert!(matches!(logistic.sweep_start(), Err(LyapError::Unsupported(_))));
    }

    #[test]
    fn records_round_trip() {
        let nested = MapFunction::piecewise(
            Band::new(-0.25, 0.5),
            Band::new(0.125, 0.75),
            MapFunction::composed(
                MapFunction::with_parameter(Formula::SineCosine, 1.9),
                Role::Derivative,
                MapFunction::with_parameter(Formula::DetachedSineCube, 0.3),
                Role::Value,
            ),
            MapFunction::with_parameter(Formula::LogisticSine, 3.1),
        );
        let mut all = all_kinds();
        all.push(nested);
        for f in all {
            let text = f.to_record();
            let back = MapFunction::from_record(&text).unwrap();
            assert_eq!(back, f);
            for (x, r) in SAMPLES {
                assert_eq!(back.value_and_derivative(x, r), f.value_and_derivative(x, r));
            }
        }
    }

    #[test]
    fn fields_may_come_in_any_order() {
        let text = "id\n16\n# swapped\nDerivativeFn\nID\n1\nVALUEFN\nID\n2\nB\n1.5\nDERIVATIVEROLE\n2\nVALUEROLE\n1\n";
        let f = MapFunction::from_record(text).unwrap();
        assert_eq!(f.id(), COMPOSED_ID);
        assert_eq!(f.parameter(), Some(1.5));
        assert_eq!(f.derivative(0.5, 2.0), MapFunction::logistic().derivative(0.5, 2.0));
    }

    #[test]
    fn malformed_records_are_rejected() {
        assert!(MapFunction::from_record("ID\n99\n").is_err());
        assert!(MapFunction::from_record("KIND\n2\nB\n1.0\n").is_err());
        assert!(MapFunction::from_record("ID\n2\n").is_err());
        assert!(MapFunction::from_record("ID\n2\nC\n1.0\n").is_err());
        assert!(MapFunction::from_record("ID\n2\nB\nabc\n").is_err());
        assert!(MapFunction::from_record("ID\n16\nVALUEROLE\n1\nDERIVATIVEROLE\n3\n").is_err());
        assert!(MapFunction::from_record("ID\n17\nVALUEMIN\n0\n").is_err());
    }

    #[test]
    fn formula_text_mentions_children() {
        let f = MapFunction::composed(
            MapFunction::new(Formula::SineProduct),
            Role::Value,
            MapFunction::new(Formula::DetachedSineSquared),
            Role::Derivative,
        );
        assert!(f.value_formula().starts_with("COMPOSED(16) f(x)=N(7)"));
        assert!(f.derivative_formula().contains("DET(11) r-2rx"));
        assert!(MapFunction::new(Formula::SineSquared).derivative_formula().contains("[=f'(x)]"));
    }

    #[test]
    fn ids_resolve() {
        for formula in Formula::ALL {
            assert_eq!(MapFunction::from_id(formula.id()).unwrap().id(), formula.id());
        }
        assert_eq!(MapFunction::from_id(COMPOSED_ID).unwrap().id(), COMPOSED_ID);
        assert_eq!(MapFunction::from_id(PIECEWISE_ID).unwrap().id(), PIECEWISE_ID);
        assert!(MapFunction::from_id(4).is_none());
    }
}
