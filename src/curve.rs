//! Height remap curve
//!
//! Maps normalized field values in [0,1] to a height factor before the height
//! multiplier is applied. The curve is plain immutable data and evaluates through
//! `&self`, so one instance can be shared by every concurrent mesh build.

use serde::{Deserialize, Serialize};

/// A single keyframe of the curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

/// Piecewise-linear curve through ordered keyframes.
///
/// Values outside the key range are clamped to the first/last key. An empty
/// curve is the identity. Monotonicity is not required.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CurveKeys")]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
}

/// Serialized form; keys may arrive in any order.
#[derive(Deserialize)]
struct CurveKeys {
    #[serde(default)]
    keys: Vec<CurveKey>,
}

impl From<CurveKeys> for HeightCurve {
    fn from(raw: CurveKeys) -> Self {
        Self::from_keys(raw.keys)
    }
}

impl HeightCurve {
    /// Build a curve from `(time, value)` pairs. Keys are sorted by time.
    pub fn new(points: &[(f32, f32)]) -> Self {
        Self::from_keys(points.iter().map(|&(time, value)| CurveKey { time, value }).collect())
    }

    pub fn from_keys(mut keys: Vec<CurveKey>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    pub fn identity() -> Self {
        Self::new(&[(0.0, 0.0), (1.0, 1.0)])
    }

    /// Flattens the lower 40% of the range so water areas stay level.
    pub fn flat_water() -> Self {
        Self::new(&[(0.0, 0.0), (0.4, 0.0), (0.6, 0.15), (1.0, 1.0)])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return t,
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // First key strictly after t; the window [i-1, i] brackets t.
        let i = self.keys.partition_point(|k| k.time <= t);
        let a = self.keys[i - 1];
        let b = self.keys[i];
        let span = b.time - a.time;
        if span <= f32::EPSILON {
            return b.value;
        }
        a.value + (b.value - a.value) * ((t - a.time) / span)
    }
}
