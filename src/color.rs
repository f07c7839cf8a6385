use std::fmt;

use crate::error::{LyapError, LyapResult};
use crate::record::{RecordReader, RecordWriter};

/// Upper bound on intervals in one [`IntervalColorMap`].
pub const MAX_INTERVALS: usize = 32;

/// Record id of the interval coloring.
pub const INTERVAL_COLORING_ID: i32 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    // channel + trunc(t * delta), as integer RGB gradients are usually done
    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| {
            let delta = b as i32 - a as i32;
            (a as i32 + (t * delta as f64) as i32).clamp(0, 255) as u8
        };
        Rgb::new(channel(self.r, other.r), channel(self.g, other.g), channel(self.b, other.b))
    }

    fn write(&self, w: &mut RecordWriter) {
        w.line(self.r).line(self.g).line(self.b);
    }

    fn read(reader: &mut RecordReader<'_>, what: &str) -> LyapResult<Rgb> {
        Ok(Rgb::new(reader.value(what)?, reader.value(what)?, reader.value(what)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.r, self.g, self.b)
    }
}

/// A half-open value range `[lower, upper)` painted with a linear gradient.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorInterval {
    lower: f64,
    upper: f64,
    pub left: Rgb,
    pub right: Rgb,
}

impl ColorInterval {
    pub fn new(lower: f64, upper: f64, left: Rgb, right: Rgb) -> LyapResult<Self> {
        if !(lower < upper) {
            return Err(LyapError::malformed(0, format!("empty interval [{lower}, {upper})")));
        }
        Ok(ColorInterval { lower, upper, left, right })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn contains(&self, w: f64) -> bool {
        w >= self.lower && w < self.upper
    }

    /// Gradient color at `w`, whether or not `w` is inside.
    pub fn interpolate(&self, w: f64) -> Rgb {
        let t = (w - self.lower) / (self.upper - self.lower);
        self.left.lerp(self.right, t)
    }

    pub fn color_at(&self, w: f64) -> Option<Rgb> {
        self.contains(w).then(|| self.interpolate(w))
    }

    fn write(&self, w: &mut RecordWriter) {
        w.key("LOWER").float(self.lower);
        w.key("UPPER").float(self.upper);
        w.key("LEFT");
        self.left.write(w);
        w.key("RIGHT");
        self.right.write(w);
    }

    fn read(reader: &mut RecordReader<'_>) -> LyapResult<Self> {
        let (mut lower, mut upper) = (0.0, 0.0);
        let (mut left, mut right) = (Rgb::BLACK, Rgb::BLACK);
        reader.fields(&["LOWER", "UPPER", "LEFT", "RIGHT"], |r, key| {
            match key {
                "LOWER" => lower = r.value("lower bound")?,
                "UPPER" => upper = r.value("upper bound")?,
                "LEFT" => left = Rgb::read(r, "left color")?,
                _ => right = Rgb::read(r, "right color")?,
            }
            Ok(())
        })?;
        ColorInterval::new(lower, upper, left, right).map_err(|_| {
            LyapError::malformed(reader.line(), format!("empty interval [{lower}, {upper})"))
        })
    }
}

/// Ordered, bounded set of color intervals plus fallbacks for values
/// below or above everything the intervals cover.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalColorMap {
    intervals: Vec<ColorInterval>,
    min: f64,
    max: f64,
    pub below: Rgb,
    pub above: Rgb,
}

impl Default for IntervalColorMap {
    fn default() -> Self {
        IntervalColorMap::new(Rgb::BLACK, Rgb::BLACK)
    }
}

impl IntervalColorMap {
    pub fn new(below: Rgb, above: Rgb) -> Self {
        IntervalColorMap { intervals: Vec::new(), min: 0.0, max: 0.0, below, above }
    }

    /// Yellow-to-black for stable regions, dark blue for chaos.
    pub fn classic() -> Self {
        let mut map = IntervalColorMap::new(Rgb::new(255, 255, 0), Rgb::new(0, 0, 128));
        let stable = ColorInterval::new(-2.0, 0.0, Rgb::new(255, 255, 0), Rgb::BLACK);
        let chaotic = ColorInterval::new(0.0, 1.0, Rgb::BLACK, Rgb::new(0, 0, 128));
        for interval in [stable, chaotic].into_iter().flatten() {
            // two intervals never exceed the capacity
            let _ = map.add_interval(interval);
        }
        map
    }

    pub fn add_interval(&mut self, interval: ColorInterval) -> LyapResult<()> {
        if self.intervals.len() >= MAX_INTERVALS {
            return Err(LyapError::Capacity(MAX_INTERVALS));
        }
        if self.intervals.is_empty() || interval.lower < self.min {
            self.min = interval.lower;
        }
        if self.intervals.is_empty() || interval.upper > self.max {
            self.max = interval.upper;
        }
        self.intervals.push(interval);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
        self.min = 0.0;
        self.max = 0.0;
    }

    pub fn intervals(&self) -> &[ColorInterval] {
        &self.intervals
    }

    pub fn interval_mut(&mut self, idx: usize) -> Option<&mut ColorInterval> {
        self.intervals.get_mut(idx)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Smallest lower bound and largest upper bound seen so far.
    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// `None` means `w` fell into a gap between intervals.
    pub fn color_at(&self, w: f64) -> Option<Rgb> {
        if w < self.min {
            return Some(self.below);
        }
        if w > self.max {
            return Some(self.above);
        }
        self.intervals.iter().find_map(|interval| interval.color_at(w))
    }

    pub fn write_record(&self, w: &mut RecordWriter) {
        w.key("ID").line(INTERVAL_COLORING_ID);
        w.key("BELOW");
        self.below.write(w);
        w.key("ABOVE");
        self.above.write(w);
        w.key("COUNT").line(self.intervals.len());
        for interval in &self.intervals {
            interval.write(w);
        }
    }

    pub fn to_record(&self) -> String {
        let mut w = RecordWriter::new();
        self.write_record(&mut w);
        w.finish()
    }

    pub fn read_record(reader: &mut RecordReader<'_>) -> LyapResult<Self> {
        reader.expect_key("ID")?;
        let id: i32 = reader.value("coloring id")?;
        if id != INTERVAL_COLORING_ID {
            return Err(LyapError::malformed(reader.line(), format!("unknown coloring id {id}")));
        }

        let mut map = IntervalColorMap::default();
        let mut count = 0usize;
        reader.fields(&["BELOW", "ABOVE", "COUNT"], |r, key| {
            match key {
                "BELOW" => map.below = Rgb::read(r, "below color")?,
                "ABOVE" => map.above = Rgb::read(r, "above color")?,
                _ => count = r.value("interval count")?,
            }
            Ok(())
        })?;
        if count > MAX_INTERVALS {
            return Err(LyapError::malformed(
                reader.line(),
                format!("{count} intervals, at most {MAX_INTERVALS} allowed"),
            ));
        }
        for _ in 0..count {
            map.add_interval(ColorInterval::read(reader)?)?;
        }
        Ok(map)
    }

    pub fn from_record(text: &str) -> LyapResult<Self> {
        IntervalColorMap::read_record(&mut RecordReader::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn two_band_map() -> IntervalColorMap {
        let mut map = IntervalColorMap::new(Rgb::new(1, 2, 3), Rgb::new(250, 251, 252));
        map.add_interval(
            ColorInterval::new(-1.0, 0.0, Rgb::new(0, 0, 0), Rgb::new(200, 100, 50)).unwrap(),
        )
        .unwrap();
        map.add_interval(
            ColorInterval::new(0.5, 2.0, Rgb::new(10, 20, 30), Rgb::new(40, 50, 60)).unwrap(),
        )
        .unwrap();
        map
    }

    #[test]
    fn fallbacks_outside_the_covered_range() {
        let map = two_band_map();
        assert_eq!(map.bounds(), (-1.0, 2.0));
        assert_eq!(map.color_at(-1.0000001), Some(Rgb::new(1, 2, 3)));
        assert_eq!(map.color_at(-50.0), Some(Rgb::new(1, 2, 3)));
        assert_eq!(map.color_at(2.0000001), Some(Rgb::new(250, 251, 252)));
    }

    #[test]
    fn gaps_report_no_color() {
        let map = two_band_map();
        assert_eq!(map.color_at(0.25), None);
        // upper bounds are exclusive
        assert_eq!(map.color_at(2.0), None);
    }

    #[test]
    fn gradient_hits_both_end_colors() {
        let interval =
            ColorInterval::new(0.5, 2.0, Rgb::new(10, 220, 30), Rgb::new(240, 50, 60)).unwrap();
        assert_eq!(interval.color_at(0.5), Some(Rgb::new(10, 220, 30)));
        assert_eq!(interval.interpolate(2.0), Rgb::new(240, 50, 60));
        assert_eq!(interval.color_at(2.0), None);
        assert_eq!(interval.color_at(1.25), Some(Rgb::new(125, 135, 45)));
    }

    #[test]
    fn first_matching_interval_wins() {
        let mut map = IntervalColorMap::default();
        map.add_interval(ColorInterval::new(0.0, 1.0, Rgb::new(9, 9, 9), Rgb::new(9, 9, 9)).unwrap())
            .unwrap();
        map.add_interval(ColorInterval::new(0.0, 2.0, Rgb::new(7, 7, 7), Rgb::new(7, 7, 7)).unwrap())
            .unwrap();
        assert_eq!(map.color_at(0.5), Some(Rgb::new(9, 9, 9)));
        assert_eq!(map.color_at(1.5), Some(Rgb::new(7, 7, 7)));
    }

    #[test]
    fn capacity_is_enforced() {
        let mut map = IntervalColorMap::default();
        for i in 0..MAX_INTERVALS {
            let lo = i as f64;
            map.add_interval(ColorInterval::new(lo, lo + 1.0, Rgb::BLACK, Rgb::BLACK).unwrap())
                .unwrap();
        }
        let extra = ColorInterval::new(100.0, 101.0, Rgb::BLACK, Rgb::BLACK).unwrap();
        assert!(matches!(map.add_interval(extra), Err(LyapError::Capacity(MAX_INTERVALS))));
        assert_eq!(map.len(), MAX_INTERVALS);
        assert_eq!(map.bounds(), (0.0, MAX_INTERVALS as f64));
    }

    #[test]
    fn empty_intervals_are_refused() {
        assert!(ColorInterval::new(1.0, 1.0, Rgb::BLACK, Rgb::BLACK).is_err());
        assert!(ColorInterval::new(2.0, 1.0, Rgb::BLACK, Rgb::BLACK).is_err());
    }

    #[test]
    fn record_round_trip() {
        let map = two_band_map();
        let back = IntervalColorMap::from_record(&map.to_record()).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn malformed_color_records() {
        assert!(IntervalColorMap::from_record("ID\n3\n").is_err());
        assert!(IntervalColorMap::from_record("ID\n2\nBELOW\n0\n0\n0\nABOVE\n1\n1\n1\nCOUNT\n33\n").is_err());
        assert!(IntervalColorMap::from_record("ID\n2\nBELOW\n0\n0\n300\nABOVE\n1\n1\n1\nCOUNT\n0\n").is_err());
        let truncated = "ID\n2\nBELOW\n0\n0\n0\nABOVE\n1\n1\n1\nCOUNT\n1\nLOWER\n0\nUPPER\n1\n";
        assert!(IntervalColorMap::from_record(truncated).is_err());
    }
}
