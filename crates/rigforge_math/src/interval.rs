/// A closed 64-bit interval `[min, max]`.
///
/// Used for gradient ranges and for per-axis bounds. All arithmetic stays
/// in `f64`; nothing here narrows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns the size of the interval (max - min).
    pub fn size(&self) -> f64 {
        self.max - self.min
    }

    /// Clamps x to be within the interval [min, max].
    pub fn clamp(&self, x: f64) -> f64 {
        if x < self.min {
            self.min
        } else if x > self.max {
            self.max
        } else {
            x
        }
    }

    /// Fraction of the way from `min` to `max`, clamped to `[0, 1]`.
    ///
    /// Evaluated as `(x - min) / (max - min)` and then clamped, in that order.
    /// Callers guarantee `max > min`.
    pub fn clamped_fraction(&self, x: f64) -> f64 {
        let t = (x - self.min) / (self.max - self.min);
        if t < 0.0 {
            0.0
        } else if t > 1.0 {
            1.0
        } else {
            t
        }
    }

    /// Grows the interval to include `x`.
    pub fn include(&self, x: f64) -> Interval {
        Interval::new(self.min.min(x), self.max.max(x))
    }

    /// Returns true if the interval contains no values.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// An empty interval (min > max, contains nothing).
    pub const EMPTY: Interval = Interval {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };
}
