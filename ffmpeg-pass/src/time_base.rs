use std::fmt;

use ffmpeg_next::Rational;
use serde::{Deserialize, Serialize};

/// Seconds per tick, kept as an exact fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBase {
    pub num: i32,
    pub den: i32,
}

impl TimeBase {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    pub fn is_valid(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    /// The reciprocal, e.g. a 1/60 time base becomes a 60/1 frame rate.
    pub fn invert(&self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }

    /// Converts `ts` ticks of `from` into ticks of `to`, rounding half away
    /// from zero. Integer-only so long encodes never drift.
    pub fn rescale(ts: i64, from: TimeBase, to: TimeBase) -> i64 {
        let n = ts as i128 * from.num as i128 * to.den as i128;
        let d = from.den as i128 * to.num as i128;
        if d == 0 {
            return ts;
        }
        let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
        let r = (n.abs() + d / 2) / d;
        let r = if n < 0 { -r } else { r };
        r.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<Rational> for TimeBase {
    fn from(value: Rational) -> Self {
        Self::new(value.numerator(), value.denominator())
    }
}

impl From<TimeBase> for Rational {
    fn from(value: TimeBase) -> Self {
        Rational::new(value.num, value.den)
    }
}
