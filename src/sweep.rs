/// A finite, restartable linear walk over `[lower, upper]` in `count` steps.
///
/// `start` yields the first value, each `next` one more, until `count`
/// values have been produced. Only another `start` begins a new pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSweep {
    lower: f64,
    upper: f64,
    count: u32,
    step: f64,
    value: f64,
    position: u32,
}

impl ParameterSweep {
    pub fn new(lower: f64, upper: f64, count: u32) -> Self {
        let count = count.max(1);
        let step = if count == 1 {
            upper - lower
        } else {
            (upper - lower) / (count - 1) as f64
        };
        ParameterSweep {
            lower,
            upper,
            count,
            step,
            value: lower,
            position: 0,
        }
    }

    pub fn start(&mut self) -> f64 {
        self.position = 1;
        self.value = self.lower;
        self.value
    }

    pub fn next(&mut self) -> Option<f64> {
        if self.position > self.count {
            return None;
        }
        self.position += 1;
        if self.position > self.count {
            return None;
        }
        self.value = self.value_at(self.position);
        Some(self.value)
    }

    /// Current value; `lower` before the first `start`.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// 1-based index of the current value, 0 before the first `start`.
    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// Every value of one pass, without touching the cursor.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (1..=self.count).map(move |pos| self.value_at(pos))
    }

    fn value_at(&self, position: u32) -> f64 {
        if position == 1 {
            self.lower
        } else if position == self.count {
            self.upper
        } else {
            self.lower + self.step * (position - 1) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn drain(sweep: &mut ParameterSweep) -> Vec<f64> {
        let mut out = vec![sweep.start()];
        while let Some(v) = sweep.next() {
            out.push(v);
        }
        out
    }

    #[test]
    fn produces_count_values_from_lower_to_upper() {
        let mut sweep = ParameterSweep::new(1.0, 3.0, 5);
        let values = drain(&mut sweep);
        assert_eq!(values, vec![1.0, 1.5, 2.0, 2.5, 3.0]);
        assert!(values.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(sweep.next(), None);
    }

    #[test]
    fn restart_reproduces_the_pass() {
        let mut sweep = ParameterSweep::new(-0.3, 2.9, 7);
        let first = drain(&mut sweep);
        let second = drain(&mut sweep);
        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
        assert_eq!(first[6], 2.9);
        assert_eq!(sweep.values().collect::<Vec<_>>(), first);
    }

    #[test]
    fn steps_are_affine() {
        let sweep = ParameterSweep::new(0.1, 0.9, 9);
        let values: Vec<f64> = sweep.values().collect();
        for w in values.windows(2) {
            assert!((w[1] - w[0] - sweep.step()).abs() < 1e-12);
        }
    }

    #[test]
    fn single_step_sweep() {
        let mut sweep = ParameterSweep::new(2.0, 4.0, 1);
        assert_eq!(sweep.step(), 2.0);
        assert_eq!(sweep.start(), 2.0);
        assert_eq!(sweep.next(), None);
        assert_eq!(ParameterSweep::new(2.0, 4.0, 0).count(), 1);
    }

    #[test]
    fn decreasing_range() {
        let mut sweep = ParameterSweep::new(3.0, 1.0, 3);
        assert_eq!(drain(&mut sweep), vec![3.0, 2.0, 1.0]);
    }
}
