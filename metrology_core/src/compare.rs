//! Statistical comparison of uncertain quantities.
//!
//! When neither operand carries uncertainty the comparison is exact.
//! Otherwise the difference of the two values is tested against a confidence
//! half-width `sigma * z(p)`, where `sigma` is the quadrature sum of both
//! absolute errors and `z(p)` is a standard normal quantile at the
//! evaluator's confidence level.

use crate::ops::Evaluator;
use crate::propagation::quadrature;
use crate::quantity::Quantity;
use crate::{Error, Result};

/// Two-sided standard normal quantile: `P(|Z| <= z) = p`
pub fn z_two_sided(p: f64) -> Result<f64> {
    check_level(p)?;

    // Fast paths for common confidence levels
    let z = if (p - 0.99).abs() < 1e-6 {
        2.576
    } else if (p - 0.95).abs() < 1e-6 {
        1.960
    } else if (p - 0.90).abs() < 1e-6 {
        1.645
    } else {
        inverse_normal_cdf((1.0 + p) / 2.0)
    };
    Ok(z)
}

/// One-sided standard normal quantile: `P(Z <= z) = p`
pub fn z_one_sided(p: f64) -> Result<f64> {
    check_level(p)?;

    let z = if (p - 0.95).abs() < 1e-6 {
        1.645
    } else {
        inverse_normal_cdf(p)
    };
    Ok(z)
}

fn check_level(p: f64) -> Result<()> {
    if !(p > 0.0 && p < 1.0) {
        return Err(Error::InvalidArgument(format!(
            "Confidence level must lie in (0, 1), got {}",
            p
        )));
    }
    Ok(())
}

/// Acklam's rational approximation of the inverse standard normal CDF
/// (relative error below 1.2e-9). `p` must lie in (0, 1).
fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239e0,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838e0,
        -2.549_732_539_343_734e0,
        4.374_664_141_464_968e0,
        2.938_163_982_698_783e0,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996e0,
        3.754_408_661_907_416e0,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        let num = ((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5];
        let den = (((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0;
        num / den
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - P_LOW {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        let num = (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q;
        let den = ((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0;
        num / den
    }
}

/// Values of two operands in a shared unit, with their combined error
struct Difference {
    x: f64,
    y: f64,
    sigma: f64,
}

impl Difference {
    fn exact(&self) -> bool {
        self.sigma == 0.0
    }
}

impl<'a> Evaluator<'a> {
    fn difference(&self, x: impl Into<Quantity>, y: impl Into<Quantity>) -> Result<Difference> {
        let x = x.into();
        let y = self.catalog().convert(&y.into(), x.unit())?;
        Ok(Difference {
            x: x.value(),
            y: y.value(),
            sigma: quadrature([x.absolute_error(), y.absolute_error()]),
        })
    }

    /// `x` and `y` agree within the two-sided confidence interval
    pub fn eq(&self, x: impl Into<Quantity>, y: impl Into<Quantity>) -> Result<bool> {
        let d = self.difference(x, y)?;
        if d.exact() {
            return Ok(d.x == d.y);
        }
        let half_width = d.sigma * z_two_sided(self.confidence())?;
        tracing::trace!("eq: |{} - {}| <= {}", d.y, d.x, half_width);
        Ok((d.y - d.x).abs() <= half_width)
    }

    pub fn ne(&self, x: impl Into<Quantity>, y: impl Into<Quantity>) -> Result<bool> {
        Ok(!self.eq(x, y)?)
    }

    /// `x` is below `y` with one-sided confidence
    pub fn lt(&self, x: impl Into<Quantity>, y: impl Into<Quantity>) -> Result<bool> {
        let d = self.difference(x, y)?;
        if d.exact() {
            return Ok(d.x < d.y);
        }
        Ok(d.y - d.x > d.sigma * z_one_sided(self.confidence())?)
    }

    /// `x` is above `y` with one-sided confidence
    pub fn gt(&self, x: impl Into<Quantity>, y: impl Into<Quantity>) -> Result<bool> {
        let d = self.difference(x, y)?;
        if d.exact() {
            return Ok(d.x > d.y);
        }
        Ok(d.x - d.y > d.sigma * z_one_sided(self.confidence())?)
    }

    /// `x` is not confidently above `y`
    pub fn le(&self, x: impl Into<Quantity>, y: impl Into<Quantity>) -> Result<bool> {
        Ok(!self.gt(x, y)?)
    }

    /// `x` is not confidently below `y`
    pub fn ge(&self, x: impl Into<Quantity>, y: impl Into<Quantity>) -> Result<bool> {
        Ok(!self.lt(x, y)?)
    }
}
