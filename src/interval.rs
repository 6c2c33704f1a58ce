use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::format::write_score;

/// One side of a score range: `<`, `<=`, `>`, `>=`, or an infinity sentinel.
///
/// The same value can act as either bound. [`admits_above`] is the test used
/// when it is the lower end, [`admits_below`] when it is the upper end.
/// Whether two intervals form a non-empty range is decided by the caller.
///
/// [`admits_above`]: Interval::admits_above
/// [`admits_below`]: Interval::admits_below
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interval {
    NegInfinity,
    PosInfinity,
    Bound { value: f64, exclusive: bool },
}

impl Interval {
    pub const NEG_INFINITY: Interval = Interval::NegInfinity;
    pub const POS_INFINITY: Interval = Interval::PosInfinity;

    #[inline]
    pub const fn new(value: f64, exclusive: bool) -> Self {
        Interval::Bound { value, exclusive }
    }

    #[inline]
    pub const fn inclusive(value: f64) -> Self {
        Self::new(value, false)
    }

    #[inline]
    pub const fn exclusive(value: f64) -> Self {
        Self::new(value, true)
    }

    /// Lower-bound test: is `score` on the admitted side of this bound?
    #[inline]
    pub fn admits_above(&self, score: f64) -> bool {
        match *self {
            Interval::NegInfinity => true,
            Interval::PosInfinity => false,
            Interval::Bound { value, exclusive } => {
                if exclusive {
                    score > value
                } else {
                    score >= value
                }
            }
        }
    }

    /// Upper-bound test: is `score` on the admitted side of this bound?
    #[inline]
    pub fn admits_below(&self, score: f64) -> bool {
        match *self {
            Interval::NegInfinity => false,
            Interval::PosInfinity => true,
            Interval::Bound { value, exclusive } => {
                if exclusive {
                    score < value
                } else {
                    score <= value
                }
            }
        }
    }

    /// Boundary value; sentinels report the matching IEEE infinity.
    #[inline]
    pub fn value(&self) -> f64 {
        match *self {
            Interval::NegInfinity => f64::NEG_INFINITY,
            Interval::PosInfinity => f64::INFINITY,
            Interval::Bound { value, .. } => value,
        }
    }

    #[inline]
    pub fn is_exclusive(&self) -> bool {
        matches!(self, Interval::Bound { exclusive: true, .. })
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Interval::Bound { .. })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Interval::NegInfinity => f.write_str("-inf"),
            Interval::PosInfinity => f.write_str("+inf"),
            Interval::Bound { value, exclusive } => {
                if exclusive {
                    f.write_str("(")?;
                } else if value.is_infinite() {
                    // bare `inf` / `-inf` parse back as sentinels
                    f.write_str("[")?;
                }
                write_score(f, value)
            }
        }
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidBound {
            input: s.to_owned(),
        };
        match s {
            "-inf" => return Ok(Interval::NEG_INFINITY),
            "+inf" | "inf" => return Ok(Interval::POS_INFINITY),
            _ => {}
        }
        let (digits, exclusive) = match s.strip_prefix('(') {
            Some(rest) => (rest, true),
            None => (s.strip_prefix('[').unwrap_or(s), false),
        };
        let value: f64 = digits.parse().map_err(|_| invalid())?;
        if value.is_nan() {
            return Err(invalid());
        }
        Ok(Interval::new(value, exclusive))
    }
}
