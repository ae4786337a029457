//! Quantities: a value, its uncertainty, and its unit.

use crate::unit::Unit;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Measurement uncertainty, either on the value's own scale or as a fraction
/// of it.
///
/// Both magnitudes are non-negative; use the checked constructors.
/// Deserialization goes through the same checks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncertaintyRepr", into = "UncertaintyRepr")]
pub enum Uncertainty {
    Absolute(f64),
    Relative(f64),
}

/// Wire form of [`Uncertainty`]
#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
enum UncertaintyRepr {
    Absolute(f64),
    Relative(f64),
}

impl TryFrom<UncertaintyRepr> for Uncertainty {
    type Error = Error;

    fn try_from(repr: UncertaintyRepr) -> Result<Self> {
        match repr {
            UncertaintyRepr::Absolute(e) => Uncertainty::absolute(e),
            UncertaintyRepr::Relative(e) => Uncertainty::relative(e),
        }
    }
}

impl From<Uncertainty> for UncertaintyRepr {
    fn from(error: Uncertainty) -> Self {
        match error {
            Uncertainty::Absolute(e) => UncertaintyRepr::Absolute(e),
            Uncertainty::Relative(e) => UncertaintyRepr::Relative(e),
        }
    }
}

impl Uncertainty {
    /// No uncertainty
    pub const NONE: Uncertainty = Uncertainty::Absolute(0.0);

    pub fn absolute(error: f64) -> Result<Self> {
        Self::check(error, "Absolute")?;
        Ok(Uncertainty::Absolute(error))
    }

    pub fn relative(error: f64) -> Result<Self> {
        Self::check(error, "Relative")?;
        Ok(Uncertainty::Relative(error))
    }

    fn check(error: f64, kind: &str) -> Result<()> {
        if error.is_nan() || error < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "{} error must be non-negative, got {}",
                kind, error
            )));
        }
        Ok(())
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Uncertainty::Absolute(e) | Uncertainty::Relative(e) => *e == 0.0,
        }
    }
}

impl Default for Uncertainty {
    fn default() -> Self {
        Uncertainty::NONE
    }
}

/// A physical quantity.
///
/// Quantities are immutable; every operation builds a new one. Deserialized
/// quantities are checked like constructed ones: the uncertainty must be
/// non-negative and the unit is reduced.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Quantity {
    value: f64,
    #[serde(default)]
    error: Uncertainty,
    #[serde(default)]
    unit: Unit,
}

impl Quantity {
    /// A quantity with an absolute uncertainty
    pub fn new(value: f64, error: f64, unit: Unit) -> Result<Self> {
        Ok(Self::from_parts(value, Uncertainty::absolute(error)?, unit))
    }

    /// A quantity whose uncertainty is the fraction `error` of its value
    pub fn with_relative_error(value: f64, error: f64, unit: Unit) -> Result<Self> {
        Ok(Self::from_parts(value, Uncertainty::relative(error)?, unit))
    }

    /// A quantity with an already validated uncertainty
    pub fn with_uncertainty(value: f64, error: Uncertainty, unit: Unit) -> Result<Self> {
        match error {
            Uncertainty::Absolute(e) => Self::new(value, e, unit),
            Uncertainty::Relative(e) => Self::with_relative_error(value, e, unit),
        }
    }

    /// An error-free quantity
    pub fn exact(value: f64, unit: Unit) -> Self {
        Self::from_parts(value, Uncertainty::NONE, unit)
    }

    pub(crate) fn from_parts(value: f64, error: Uncertainty, unit: Unit) -> Self {
        Self {
            value,
            error,
            unit: unit.reduce(),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn uncertainty(&self) -> Uncertainty {
        self.error
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn absolute_error(&self) -> f64 {
        match self.error {
            Uncertainty::Absolute(e) => e,
            Uncertainty::Relative(r) => (r * self.value).abs(),
        }
    }

    /// Uncertainty as a fraction of the value; infinite for an uncertain zero
    pub fn relative_error(&self) -> f64 {
        match self.error {
            Uncertainty::Relative(r) => r,
            Uncertainty::Absolute(e) if e == 0.0 => 0.0,
            Uncertainty::Absolute(e) => (e / self.value).abs(),
        }
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_zero()
    }

    pub fn has_unit(&self) -> bool {
        !self.unit.is_dimensionless()
    }

    pub fn is_unitless(&self) -> bool {
        self.unit.is_dimensionless()
    }

    /// Same value and unit without uncertainty
    pub fn drop_error(&self) -> Self {
        Self::from_parts(self.value, Uncertainty::NONE, self.unit.clone())
    }

    /// Same value and uncertainty in the dimensionless unit
    pub fn drop_unit(&self) -> Self {
        Self::from_parts(self.value, self.error, Unit::dimensionless())
    }

    /// Same uncertainty and unit with another value
    pub(crate) fn with_value(&self, value: f64) -> Self {
        Self::from_parts(value, self.error, self.unit.clone())
    }

    /// Bit-for-bit equality of value and uncertainty encoding, plus unit
    /// equality
    pub fn identical(&self, other: &Quantity) -> bool {
        let same_error = match (self.error, other.error) {
            (Uncertainty::Absolute(a), Uncertainty::Absolute(b))
            | (Uncertainty::Relative(a), Uncertainty::Relative(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        };
        self.value.to_bits() == other.value.to_bits() && same_error && self.unit == other.unit
    }

    /// Numeric equality of value and absolute error within a relative
    /// tolerance, plus unit equality
    pub fn approx_eq(&self, other: &Quantity, epsilon: f64) -> bool {
        close(self.value, other.value, epsilon)
            && close(self.absolute_error(), other.absolute_error(), epsilon)
            && self.unit == other.unit
    }
}

fn close(a: f64, b: f64, epsilon: f64) -> bool {
    if a == b {
        return true;
    }
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= epsilon * scale
}

impl From<f64> for Quantity {
    fn from(value: f64) -> Self {
        Quantity::exact(value, Unit::dimensionless())
    }
}

impl From<&Quantity> for Quantity {
    fn from(q: &Quantity) -> Self {
        q.clone()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if self.has_error() {
            write!(f, " ± {}", self.absolute_error())?;
        }
        if self.has_unit() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_negative_absolute_error_rejected() {
        let err = Quantity::new(1.0, -0.1, Unit::dimensionless()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(Uncertainty::relative(f64::NAN).is_err());
    }

    #[test]
    fn test_error_accessors() {
        let q = Quantity::new(-4.0, 0.2, Unit::named("metre")).unwrap();
        assert_relative_eq!(q.absolute_error(), 0.2);
        assert_relative_eq!(q.relative_error(), 0.05);

        let q = Quantity::with_relative_error(-4.0, 0.1, Unit::named("metre")).unwrap();
        assert_relative_eq!(q.absolute_error(), 0.4);
        assert_relative_eq!(q.relative_error(), 0.1);
        assert!(q.has_error());
        assert!(q.has_unit());
    }

    #[test]
    fn test_uncertain_zero_has_infinite_relative_error() {
        let q = Quantity::new(0.0, 0.5, Unit::dimensionless()).unwrap();
        assert!(q.relative_error().is_infinite());
        assert_eq!(Quantity::from(0.0).relative_error(), 0.0);
    }

    #[test]
    fn test_bare_number_is_dimensionless_and_exact() {
        let q = Quantity::from(2.5);
        assert!(q.is_unitless());
        assert!(!q.has_error());
        assert_eq!(q.value(), 2.5);
    }

    #[test]
    fn test_identical_distinguishes_encoding() {
        let abs = Quantity::new(2.0, 0.2, Unit::dimensionless()).unwrap();
        let rel = Quantity::with_relative_error(2.0, 0.1, Unit::dimensionless()).unwrap();
        assert!(!abs.identical(&rel));
        assert!(abs.approx_eq(&rel, 1e-12));
        assert!(abs.identical(&abs.clone()));
    }

    #[test]
    fn test_drop_helpers() {
        let q = Quantity::new(3.0, 0.1, Unit::named("second")).unwrap();
        assert!(!q.drop_error().has_error());
        assert!(q.drop_unit().is_unitless());
        assert!(q.drop_unit().has_error());
    }

    #[derive(Debug, Deserialize)]
    struct Sample {
        quantity: Quantity,
    }

    #[test]
    fn test_deserialize_rejects_negative_error() {
        let toml = r#"
[quantity]
value = 2.0
error = { kind = "absolute", value = -0.5 }
"#;
        let err = toml::from_str::<Sample>(toml).unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_deserialize_reduces_unit() {
        let toml = r#"
[quantity]
value = 2.0
error = { kind = "relative", value = 0.1 }
unit = [
    { name = "metre", power = 1 },
    { name = "metre", power = -1 },
]
"#;
        let sample: Sample = toml::from_str(toml).unwrap();
        let q = sample.quantity;
        assert!(q.is_unitless());
        assert!(!q.has_unit());
        assert_relative_eq!(q.absolute_error(), 0.2);
    }

    #[test]
    fn test_serialized_uncertainty_is_tagged() {
        let q = Quantity::new(1.5, 0.25, Unit::named("second")).unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["error"]["kind"], "absolute");
        assert_eq!(json["error"]["value"], 0.25);

        let back: Quantity = serde_json::from_value(json).unwrap();
        assert!(back.identical(&q));
    }

    #[test]
    fn test_display() {
        let q = Quantity::new(9.81, 0.02, Unit::from_factors([("metre", 1), ("second", -2)]))
            .unwrap();
        assert_eq!(q.to_string(), "9.81 ± 0.02 metre / second ^ 2");
        assert_eq!(Quantity::from(3.0).to_string(), "3");
    }
}
