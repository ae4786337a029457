//! Operand validation shared by every quantity operation.
//!
//! Each check either passes the operand through (possibly rewritten into an
//! equivalent form), applies a recovery the caller authorized, or fails with
//! an error naming the recovery that would have let it continue.

use crate::error::Recovery;
use crate::ops::Evaluator;
use crate::quantity::{Quantity, Uncertainty};
use crate::unit::Unit;
use crate::{Error, Result};

/// Recoveries the caller authorizes ahead of time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecoveryPolicy {
    drop_uncertainty: bool,
    drop_unit: bool,
}

impl RecoveryPolicy {
    /// Fail on every rejected operand
    pub fn strict() -> Self {
        Self::default()
    }

    /// Apply every recovery that is offered
    pub fn lenient() -> Self {
        Self {
            drop_uncertainty: true,
            drop_unit: true,
        }
    }

    pub fn allow(mut self, recovery: Recovery) -> Self {
        match recovery {
            Recovery::DropUncertainty => self.drop_uncertainty = true,
            Recovery::DropUnit => self.drop_unit = true,
        }
        self
    }

    pub fn allows(&self, recovery: Recovery) -> bool {
        match recovery {
            Recovery::DropUncertainty => self.drop_uncertainty,
            Recovery::DropUnit => self.drop_unit,
        }
    }
}

impl<'a> Evaluator<'a> {
    /// The operand as a pure number.
    ///
    /// Units that expand to nothing (radian, percent, metre / metre) are
    /// folded into the value.
    pub(crate) fn require_unitless(&self, operand: Quantity, op: &str) -> Result<Quantity> {
        if operand.is_unitless() {
            return Ok(operand);
        }

        let expansion = self.catalog().expand(operand.unit())?;
        if expansion.base.is_dimensionless() {
            return self.catalog().convert(&operand, &Unit::dimensionless());
        }

        self.recover(
            Recovery::DropUnit,
            &operand,
            Error::invalid_unit_operation(
                format!("{} needs a dimensionless operand, got '{}'", op, operand.unit()),
                Some(Recovery::DropUnit),
            ),
        )
    }

    /// The operand without uncertainty
    pub(crate) fn require_exact(&self, operand: Quantity, op: &str) -> Result<Quantity> {
        if !operand.has_error() {
            return Ok(operand);
        }

        self.recover(
            Recovery::DropUncertainty,
            &operand,
            Error::undefined(
                format!("{} needs an operand without uncertainty, got {}", op, operand),
                Some(Recovery::DropUncertainty),
            ),
        )
    }

    /// The operand without uncertainty, where its derivative is undefined
    pub(crate) fn require_differentiable(
        &self,
        operand: Quantity,
        op: &str,
    ) -> Result<Quantity> {
        if !operand.has_error() {
            return Ok(operand);
        }

        self.recover(
            Recovery::DropUncertainty,
            &operand,
            Error::propagation(
                format!(
                    "{} is not differentiable at {}, cannot propagate its uncertainty",
                    op,
                    operand.value()
                ),
                Some(Recovery::DropUncertainty),
            ),
        )
    }

    /// Apply `recovery` if the policy allows it, otherwise fail with `err`
    pub(crate) fn recover(
        &self,
        recovery: Recovery,
        operand: &Quantity,
        err: Error,
    ) -> Result<Quantity> {
        if !self.policy().allows(recovery) {
            return Err(err);
        }

        tracing::warn!("{}; recovering: {}", err, recovery);
        Ok(match recovery {
            Recovery::DropUncertainty => operand.drop_error(),
            Recovery::DropUnit => operand.drop_unit(),
        })
    }
}

/// The value of an exact, dimensionless operand as an integer
pub(crate) fn require_integer(operand: &Quantity, op: &str) -> Result<i32> {
    let value = operand.value();
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(Error::undefined(
            format!("{} needs an integer, got {}", op, value),
            None,
        ));
    }
    Ok(value as i32)
}

/// `p / q` in lowest terms with a small denominator, if `value` is exactly
/// that ratio in floating point
pub(crate) fn exact_ratio(value: f64) -> Option<(i32, i32)> {
    const MAX_DENOMINATOR: i32 = 64;

    if !value.is_finite() {
        return None;
    }
    (2..=MAX_DENOMINATOR).find_map(|q| {
        let p = (value * q as f64).round();
        if p.abs() > i32::MAX as f64 {
            return None;
        }
        let p = p as i32;
        (p as f64 / q as f64 == value && gcd(p.unsigned_abs(), q as u32) == 1).then_some((p, q))
    })
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Absolute error as an `Uncertainty`, treating a non-finite result as a
/// failed propagation
pub(crate) fn propagated(error: f64, op: &str) -> Result<Uncertainty> {
    if !error.is_finite() {
        return Err(Error::propagation(
            format!("{} produced an undefined uncertainty", op),
            None,
        ));
    }
    Ok(Uncertainty::Absolute(error))
}
