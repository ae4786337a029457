//! Units as products of named factors raised to integer powers.
//!
//! This module covers the registry-free half of the unit algebra:
//! - Reduction (grouping factors by name and summing powers)
//! - Order-independent equality
//! - Multiplication, division, integer powers and roots
//! - Canonical rendering
//!
//! Expansion into base units needs a [`UnitCatalog`](crate::UnitCatalog) and
//! lives in the `conversion` module.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Unit Factor
// ============================================================================

/// A single dimension name raised to a non-zero integer power (e.g. metre^2)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitFactor {
    pub name: String,
    pub power: i32,
}

impl UnitFactor {
    pub fn new(name: impl Into<String>, power: i32) -> Self {
        Self {
            name: name.into(),
            power,
        }
    }

    fn inverted(&self) -> Self {
        Self::new(self.name.clone(), -self.power)
    }
}

impl FromStr for UnitFactor {
    type Err = Error;

    /// Reads `name` or `name^power`
    fn from_str(s: &str) -> Result<Self> {
        let (name, power) = match s.split_once('^') {
            Some((name, power)) => {
                let power = power.trim().parse::<i32>().map_err(|e| {
                    Error::InvalidArgument(format!("Invalid power in '{}': {}", s, e))
                })?;
                (name.trim(), power)
            }
            None => (s.trim(), 1),
        };

        if name.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "Unit factor '{}' has an empty name",
                s
            )));
        }
        if power == 0 {
            return Err(Error::InvalidArgument(format!(
                "Unit factor '{}' has a zero power",
                s
            )));
        }

        Ok(Self::new(name, power))
    }
}

// ============================================================================
// Unit
// ============================================================================

/// A product of unit factors. The empty product is the dimensionless unit "1".
///
/// Every algebraic operation returns a freshly reduced unit; inputs are never
/// modified.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<UnitFactor>", into = "Vec<UnitFactor>")]
pub struct Unit {
    factors: Vec<UnitFactor>,
}

impl Unit {
    /// The dimensionless unit
    pub fn dimensionless() -> Self {
        Self::default()
    }

    /// Build a reduced unit from `(name, power)` pairs
    pub fn from_factors<I, S>(factors: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        let factors = factors
            .into_iter()
            .map(|(name, power)| UnitFactor::new(name, power))
            .collect();
        Self { factors }.reduce()
    }

    /// A single factor raised to the first power
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            factors: vec![UnitFactor::new(name, 1)],
        }
    }

    /// The factors in their current order
    pub fn factors(&self) -> &[UnitFactor] {
        &self.factors
    }

    /// True when the unit has no factors after reduction
    pub fn is_dimensionless(&self) -> bool {
        self.factors.iter().all(|f| f.power == 0)
    }

    /// Group factors by name, sum their powers, and drop zero powers.
    ///
    /// Groups keep the position of their first occurrence.
    pub fn reduce(&self) -> Unit {
        let mut reduced: Vec<UnitFactor> = Vec::with_capacity(self.factors.len());
        for factor in &self.factors {
            match reduced.iter_mut().find(|f| f.name == factor.name) {
                Some(existing) => existing.power += factor.power,
                None => reduced.push(factor.clone()),
            }
        }
        reduced.retain(|f| f.power != 0);
        Unit { factors: reduced }
    }

    /// Negate every power
    pub fn invert(&self) -> Unit {
        Unit {
            factors: self.factors.iter().map(UnitFactor::inverted).collect(),
        }
        .reduce()
    }

    /// Product of all units
    pub fn multiply<'a>(units: impl IntoIterator<Item = &'a Unit>) -> Unit {
        Unit {
            factors: units
                .into_iter()
                .flat_map(|u| u.factors.iter().cloned())
                .collect(),
        }
        .reduce()
    }

    /// The first unit divided by every following one.
    ///
    /// With a single unit this is its inverse; with none it is dimensionless.
    pub fn divide<'a>(units: impl IntoIterator<Item = &'a Unit>) -> Unit {
        let mut units = units.into_iter();
        let Some(first) = units.next() else {
            return Unit::dimensionless();
        };

        let rest: Vec<&Unit> = units.collect();
        if rest.is_empty() {
            return first.invert();
        }

        let mut factors = first.factors.clone();
        for unit in rest {
            factors.extend(unit.factors.iter().map(UnitFactor::inverted));
        }
        Unit { factors }.reduce()
    }

    /// Multiply every power by `n`.
    ///
    /// Fails when a resulting power does not fit in an `i32`.
    pub fn pow(&self, n: i32) -> Result<Unit> {
        let factors = self
            .factors
            .iter()
            .map(|f| {
                f.power
                    .checked_mul(n)
                    .map(|power| UnitFactor::new(f.name.clone(), power))
                    .ok_or_else(|| {
                        Error::InvalidArgument(format!(
                            "Power {} of '{}' overflows when raised to {}",
                            f.power, f.name, n
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Unit { factors }.reduce())
    }

    /// Divide every power by `n`.
    ///
    /// Fails when any power is not evenly divisible, since the result would
    /// carry a fractional dimension.
    pub fn root(&self, n: i32) -> Result<Unit> {
        if n <= 0 {
            return Err(Error::InvalidArgument(format!(
                "Root degree must be positive, got {}",
                n
            )));
        }

        let reduced = self.reduce();
        if reduced.factors.iter().any(|f| f.power % n != 0) {
            return Err(Error::undefined(
                format!("Cannot take root {} of unit '{}'", n, reduced),
                None,
            ));
        }

        Ok(Unit {
            factors: reduced
                .factors
                .iter()
                .map(|f| UnitFactor::new(f.name.clone(), f.power / n))
                .collect(),
        })
    }

    /// Canonical textual form, e.g. `metre / second ^ 2`
    pub fn render(&self) -> String {
        if self.factors.is_empty() {
            return "1".to_string();
        }

        // sort_by_key is stable, so factors of the same sign keep their order
        let mut ordered: Vec<&UnitFactor> = self.factors.iter().collect();
        ordered.sort_by_key(|f| f.power < 0);

        ordered
            .iter()
            .map(|f| match f.power {
                1 => f.name.clone(),
                -1 => format!("/ {}", f.name),
                p if p < 0 => format!("/ {} ^ {}", f.name, -p),
                p => format!("{} ^ {}", f.name, p),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl PartialEq for Unit {
    /// Same multiset of (name, power) pairs after reduction, in any order
    fn eq(&self, other: &Self) -> bool {
        let a = self.reduce();
        let b = other.reduce();
        a.factors.len() == b.factors.len()
            && a.factors.iter().all(|f| b.factors.contains(f))
            && b.factors.iter().all(|f| a.factors.contains(f))
    }
}

impl Eq for Unit {}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for Unit {
    type Err = Error;

    /// Reads comma- or whitespace-separated factors, e.g. `metre, second^-2`.
    /// The empty string and `1` are the dimensionless unit.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "1" {
            return Ok(Unit::dimensionless());
        }

        let factors = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(UnitFactor::from_str)
            .collect::<Result<Vec<_>>>()?;
        Ok(Unit { factors }.reduce())
    }
}

impl TryFrom<Vec<UnitFactor>> for Unit {
    type Error = Error;

    /// Checks every factor and reduces the result
    fn try_from(factors: Vec<UnitFactor>) -> Result<Self> {
        if let Some(f) = factors.iter().find(|f| f.name.is_empty() || f.power == 0) {
            return Err(Error::InvalidArgument(format!(
                "Invalid unit factor '{}^{}'",
                f.name, f.power
            )));
        }
        Ok(Unit { factors }.reduce())
    }
}

impl From<Unit> for Vec<UnitFactor> {
    fn from(unit: Unit) -> Self {
        unit.factors
    }
}

impl From<UnitFactor> for Unit {
    fn from(factor: UnitFactor) -> Self {
        Unit {
            factors: vec![factor],
        }
        .reduce()
    }
}
