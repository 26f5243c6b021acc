use std::fmt;

/// Decoded value of a control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Scalar(f32),
    Vector2(f32, f32),
}

impl ControlValue {
    pub const ZERO: ControlValue = ControlValue::Scalar(0.0);

    /// Actuation magnitude: absolute value of a scalar or length of a vector.
    pub fn magnitude(&self) -> f32 {
        match *self {
            ControlValue::Scalar(v) => v.abs(),
            ControlValue::Vector2(x, y) => x.hypot(y),
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match *self {
            ControlValue::Scalar(v) => Some(v),
            ControlValue::Vector2(..) => None,
        }
    }

    pub fn as_vector2(&self) -> Option<(f32, f32)> {
        match *self {
            ControlValue::Vector2(x, y) => Some((x, y)),
            ControlValue::Scalar(_) => None,
        }
    }

    pub fn is_pressed(&self, threshold: f32) -> bool {
        self.magnitude() >= threshold
    }

    /// Zero value of the same shape.
    pub fn zero_like(&self) -> ControlValue {
        match self {
            ControlValue::Scalar(_) => ControlValue::Scalar(0.0),
            ControlValue::Vector2(..) => ControlValue::Vector2(0.0, 0.0),
        }
    }

    /// Component-wise difference. Values of different shapes yield `self`.
    pub fn delta(&self, previous: &ControlValue) -> ControlValue {
        match (*self, *previous) {
            (ControlValue::Scalar(a), ControlValue::Scalar(b)) => ControlValue::Scalar(a - b),
            (ControlValue::Vector2(ax, ay), ControlValue::Vector2(bx, by)) => {
                ControlValue::Vector2(ax - bx, ay - by)
            }
            _ => *self,
        }
    }

    pub fn approx_eq(&self, other: &ControlValue, epsilon: f32) -> bool {
        match (*self, *other) {
            (ControlValue::Scalar(a), ControlValue::Scalar(b)) => (a - b).abs() <= epsilon,
            (ControlValue::Vector2(ax, ay), ControlValue::Vector2(bx, by)) => {
                (ax - bx).abs() <= epsilon && (ay - by).abs() <= epsilon
            }
            _ => false,
        }
    }
}

impl Default for ControlValue {
    fn default() -> Self {
        ControlValue::ZERO
    }
}

impl From<f32> for ControlValue {
    fn from(v: f32) -> Self {
        ControlValue::Scalar(v)
    }
}

impl From<(f32, f32)> for ControlValue {
    fn from((x, y): (f32, f32)) -> Self {
        ControlValue::Vector2(x, y)
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Scalar(v) => write!(f, "{v:.3}"),
            ControlValue::Vector2(x, y) => write!(f, "({x:.3}, {y:.3})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_of_vector_is_length() {
        assert_eq!(ControlValue::Vector2(3.0, 4.0).magnitude(), 5.0);
        assert_eq!(ControlValue::Scalar(-0.75).magnitude(), 0.75);
    }

    #[test]
    fn delta_by_component() {
        let now = ControlValue::Vector2(0.5, 1.0);
        let prev = ControlValue::Vector2(0.25, 1.0);
        assert_eq!(now.delta(&prev), ControlValue::Vector2(0.25, 0.0));
        assert_eq!(now.delta(&ControlValue::Scalar(1.0)), now);
    }

    #[test]
    fn display_is_rounded() {
        assert_eq!(ControlValue::Scalar(0.5).to_string(), "0.500");
        assert_eq!(ControlValue::Vector2(1.0, -1.0).to_string(), "(1.000, -1.000)");
    }
}
