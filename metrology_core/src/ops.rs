//! Arithmetic and transcendental operations on quantities.
//!
//! Every operation follows the same order:
//! 1. Coerce bare numbers into dimensionless, exact quantities
//! 2. Validate operands (applying authorized recoveries)
//! 3. Compute value, unit and propagated error
//!
//! Nothing is returned until all three succeed, and inputs are never
//! modified.

use crate::coerce::{exact_ratio, propagated, require_integer, RecoveryPolicy};
use crate::error::Recovery;
use crate::propagation::{self, propagate, quadrature, Function, Term};
use crate::quantity::{Quantity, Uncertainty};
use crate::unit::Unit;
use crate::{Error, Result, UnitCatalog};

/// Default confidence level for statistical comparisons
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Evaluation context: the unit catalog plus the caller's recovery policy
/// and comparison confidence.
#[derive(Clone, Copy, Debug)]
pub struct Evaluator<'a> {
    catalog: &'a UnitCatalog,
    policy: RecoveryPolicy,
    confidence: f64,
}

impl<'a> Evaluator<'a> {
    pub fn new(catalog: &'a UnitCatalog) -> Self {
        Self {
            catalog,
            policy: RecoveryPolicy::strict(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    /// Authorize one more recovery
    pub fn with_recovery(mut self, recovery: Recovery) -> Self {
        self.policy = self.policy.allow(recovery);
        self
    }

    /// This evaluator with the recovery `err` offers authorized, if it offers
    /// one
    pub fn retry_with(&self, err: &Error) -> Option<Self> {
        err.recovery().map(|recovery| self.with_recovery(recovery))
    }

    pub fn with_policy(mut self, policy: RecoveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Confidence level used by the comparison family; must lie in (0, 1)
    pub fn with_confidence(mut self, confidence: f64) -> Result<Self> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(Error::InvalidArgument(format!(
                "Confidence level must lie in (0, 1), got {}",
                confidence
            )));
        }
        self.confidence = confidence;
        Ok(self)
    }

    pub fn catalog(&self) -> &'a UnitCatalog {
        self.catalog
    }

    pub fn policy(&self) -> RecoveryPolicy {
        self.policy
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    // ========================================================================
    // Addition and subtraction
    // ========================================================================

    /// Sum, in the unit of the first operand
    pub fn add(&self, operands: &[Quantity]) -> Result<Quantity> {
        let (first, converted) = self.in_first_unit(operands, "add")?;
        let value = converted.iter().map(Quantity::value).sum();
        let error = quadrature(converted.iter().map(Quantity::absolute_error));
        Ok(Quantity::from_parts(
            value,
            propagated(error, "add")?,
            first.unit().clone(),
        ))
    }

    /// The first operand minus the rest; a single operand is negated
    pub fn subtract(&self, operands: &[Quantity]) -> Result<Quantity> {
        if let [single] = operands {
            return Ok(self.negate(single));
        }

        let (first, converted) = self.in_first_unit(operands, "subtract")?;
        let value = converted
            .iter()
            .skip(1)
            .fold(converted[0].value(), |acc, q| acc - q.value());
        let error = quadrature(converted.iter().map(Quantity::absolute_error));
        Ok(Quantity::from_parts(
            value,
            propagated(error, "subtract")?,
            first.unit().clone(),
        ))
    }

    pub fn negate(&self, operand: impl Into<Quantity>) -> Quantity {
        let operand = operand.into();
        operand.with_value(-operand.value())
    }

    /// Every operand converted into the first operand's unit
    fn in_first_unit<'q>(
        &self,
        operands: &'q [Quantity],
        op: &str,
    ) -> Result<(&'q Quantity, Vec<Quantity>)> {
        let Some(first) = operands.first() else {
            return Err(Error::InvalidArgument(format!("{} needs an operand", op)));
        };
        let converted = operands
            .iter()
            .map(|q| self.catalog.convert(q, first.unit()))
            .collect::<Result<Vec<_>>>()?;
        Ok((first, converted))
    }

    // ========================================================================
    // Multiplication and division
    // ========================================================================

    /// Product of values and units
    pub fn multiply(&self, operands: &[Quantity]) -> Result<Quantity> {
        if operands.is_empty() {
            return Err(Error::InvalidArgument("multiply needs an operand".into()));
        }
        let value = operands.iter().map(Quantity::value).product();
        let unit = Unit::multiply(operands.iter().map(Quantity::unit));
        Ok(Quantity::from_parts(
            value,
            relative_combination(value, operands, "multiply")?,
            unit,
        ))
    }

    /// The first operand divided by the rest; a single operand is inverted
    pub fn divide(&self, operands: &[Quantity]) -> Result<Quantity> {
        let (first, rest) = match operands {
            [] => return Err(Error::InvalidArgument("divide needs an operand".into())),
            [single] => return self.divide(&[Quantity::from(1.0), single.clone()]),
            [first, rest @ ..] => (first, rest),
        };

        if let Some(zero) = rest.iter().find(|q| q.value() == 0.0) {
            return Err(Error::undefined(format!("division by zero ({})", zero), None));
        }

        let value = rest.iter().fold(first.value(), |acc, q| acc / q.value());
        let unit = Unit::divide(operands.iter().map(Quantity::unit));
        Ok(Quantity::from_parts(
            value,
            relative_combination(value, operands, "divide")?,
            unit,
        ))
    }

    // ========================================================================
    // Powers and roots
    // ========================================================================

    /// `base ^ exponent` for an exact, dimensionless integer exponent
    pub fn power(
        &self,
        base: impl Into<Quantity>,
        exponent: impl Into<Quantity>,
    ) -> Result<Quantity> {
        let base = base.into();
        let exponent = self.require_unitless(exponent.into(), "power")?;
        let exponent = self.require_exact(exponent, "power")?;
        let n = require_integer(&exponent, "power")?;

        if n == 0 {
            return Ok(Quantity::exact(1.0, Unit::dimensionless()));
        }
        if base.value() == 0.0 && n < 0 {
            return Err(Error::undefined(
                format!("zero raised to negative power {}", n),
                None,
            ));
        }

        let unit = base.unit().pow(n)?;
        let below = n.checked_sub(1).ok_or_else(|| {
            Error::InvalidArgument(format!("power exponent {} is out of range", n))
        })?;

        let x = base.value();
        let value = x.powi(n);
        let derivative = f64::from(n) * x.powi(below);
        let error = propagate(&[Term::new(derivative, base.absolute_error())]);
        Ok(Quantity::from_parts(value, propagated(error, "power")?, unit))
    }

    /// The `degree`-th root of `radicand` for an exact, positive integer degree.
    ///
    /// Every power of the radicand's unit, in base units if necessary, must be
    /// divisible by the degree.
    pub fn root(
        &self,
        radicand: impl Into<Quantity>,
        degree: impl Into<Quantity>,
    ) -> Result<Quantity> {
        let radicand = radicand.into();
        let degree = self.require_unitless(degree.into(), "root")?;
        let degree = self.require_exact(degree, "root")?;
        let n = require_integer(&degree, "root")?;
        if n <= 0 {
            return Err(Error::undefined(
                format!("root degree must be positive, got {}", n),
                None,
            ));
        }

        let radicand = self.rootable(radicand, n)?;
        let x = radicand.value();
        if x < 0.0 && n % 2 == 0 {
            return Err(Error::undefined(
                format!("even root {} of negative value {}", n, x),
                None,
            ));
        }

        let radicand = if x == 0.0 {
            self.require_differentiable(radicand, "root")?
        } else {
            radicand
        };

        let magnitude = x.abs().powf(1.0 / f64::from(n));
        let value = if x < 0.0 { -magnitude } else { magnitude };
        let derivative = if x == 0.0 {
            0.0
        } else {
            value / (f64::from(n) * x)
        };
        let error = propagate(&[Term::new(derivative, radicand.absolute_error())]);
        let unit = radicand.unit().root(n)?;
        Ok(Quantity::from_parts(value, propagated(error, "root")?, unit))
    }

    pub fn sqrt(&self, radicand: impl Into<Quantity>) -> Result<Quantity> {
        self.root(radicand, 2.0)
    }

    /// The radicand in a unit whose powers are divisible by `n`
    fn rootable(&self, radicand: Quantity, n: i32) -> Result<Quantity> {
        if radicand.unit().root(n).is_ok() {
            return Ok(radicand);
        }

        let base = self.catalog.to_base(&radicand)?;
        if base.unit().root(n).is_ok() {
            return Ok(base);
        }

        self.recover(
            Recovery::DropUnit,
            &radicand,
            Error::invalid_unit_operation(
                format!("root {} of unit '{}' has fractional powers", n, radicand.unit()),
                Some(Recovery::DropUnit),
            ),
        )
    }

    /// `base ^ exponent` for any exponent.
    ///
    /// Exact integer and small rational exponents keep units (via
    /// [`power`](Self::power) and [`root`](Self::root)); anything else needs a
    /// dimensionless, non-negative base.
    pub fn general_power(
        &self,
        base: impl Into<Quantity>,
        exponent: impl Into<Quantity>,
    ) -> Result<Quantity> {
        let base = base.into();
        let exponent = self.require_unitless(exponent.into(), "general_power")?;

        if !exponent.has_error() {
            let e = exponent.value();
            if e.fract() == 0.0 {
                return self.power(base, exponent);
            }
            if let Some((p, q)) = exact_ratio(e) {
                return self.root(self.power(base, f64::from(p))?, f64::from(q));
            }
        }

        let base = self.require_unitless(base, "general_power")?;
        let b = base.value();
        if b < 0.0 {
            if exponent.has_error() {
                let exponent = self.require_differentiable(exponent, "general_power")?;
                return self.general_power(base, exponent);
            }
            return Err(Error::undefined(
                format!("negative base {} with non-integer exponent", b),
                None,
            ));
        }

        let exponent = if b == 0.0 {
            self.require_differentiable(exponent, "general_power")?
        } else {
            exponent
        };
        let e = exponent.value();
        let value = b.powf(e);
        let error = propagate(&[
            Term::new(e * b.powf(e - 1.0), base.absolute_error()),
            Term::new(value * b.ln(), exponent.absolute_error()),
        ]);
        Ok(Quantity::from_parts(
            value,
            propagated(error, "general_power")?,
            Unit::dimensionless(),
        ))
    }

    // ========================================================================
    // Transcendental functions
    // ========================================================================

    /// Apply an analytic function to a dimensionless argument
    pub fn apply(&self, function: &Function, x: impl Into<Quantity>) -> Result<Quantity> {
        let x = self.require_unitless(x.into(), function.name)?;
        let v = x.value();
        if !(function.domain)(v) {
            return Err(Error::undefined(
                format!("{} is undefined at {}", function.name, v),
                None,
            ));
        }

        let derivative = (function.derivative)(v);
        let x = if derivative.is_finite() {
            x
        } else {
            self.require_differentiable(x, function.name)?
        };

        let error = propagate(&[Term::new(derivative, x.absolute_error())]);
        Ok(Quantity::from_parts(
            (function.value)(v),
            propagated(error, function.name)?,
            Unit::dimensionless(),
        ))
    }

    pub fn exp(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::EXP, x)
    }

    pub fn ln(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::LN, x)
    }

    /// Logarithm of `x` in `base`; both may carry uncertainty
    pub fn log(&self, x: impl Into<Quantity>, base: impl Into<Quantity>) -> Result<Quantity> {
        let x = self.require_unitless(x.into(), "log")?;
        let base = self.require_unitless(base.into(), "log")?;
        let (v, b) = (x.value(), base.value());
        if v <= 0.0 || b <= 0.0 || b == 1.0 {
            return Err(Error::undefined(
                format!("log of {} in base {} is undefined", v, b),
                None,
            ));
        }

        let ln_b = b.ln();
        let value = v.ln() / ln_b;
        let error = propagate(&[
            Term::new(1.0 / (v * ln_b), x.absolute_error()),
            Term::new(-v.ln() / (b * ln_b * ln_b), base.absolute_error()),
        ]);
        Ok(Quantity::from_parts(
            value,
            propagated(error, "log")?,
            Unit::dimensionless(),
        ))
    }

    pub fn log10(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.log(x, 10.0)
    }

    pub fn sin(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::SIN, x)
    }

    pub fn cos(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::COS, x)
    }

    pub fn tan(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::TAN, x)
    }

    pub fn asin(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::ASIN, x)
    }

    pub fn acos(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::ACOS, x)
    }

    pub fn atan(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::ATAN, x)
    }

    pub fn sinh(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::SINH, x)
    }

    pub fn cosh(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::COSH, x)
    }

    pub fn tanh(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::TANH, x)
    }

    pub fn asinh(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::ASINH, x)
    }

    pub fn acosh(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::ACOSH, x)
    }

    pub fn atanh(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        self.apply(&propagation::ATANH, x)
    }

    /// Absolute value; undefined for an uncertain zero
    pub fn abs(&self, x: impl Into<Quantity>) -> Result<Quantity> {
        let x = x.into();
        let x = if x.value() == 0.0 {
            self.require_differentiable(x, "abs")?
        } else {
            x
        };
        Ok(x.with_value(x.value().abs()))
    }
}

/// `|value|` times the quadrature sum of the operands' relative errors
fn relative_combination(value: f64, operands: &[Quantity], op: &str) -> Result<Uncertainty> {
    if value == 0.0 || operands.iter().all(|q| !q.has_error()) {
        return Ok(Uncertainty::NONE);
    }
    let relative = quadrature(operands.iter().map(Quantity::relative_error));
    propagated(value.abs() * relative, op)
}
