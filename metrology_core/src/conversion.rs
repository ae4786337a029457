//! Expansion into base units and conversion between compatible units.

use crate::catalog::{Factor, UnitCatalog, UnitDefinition};
use crate::quantity::{Quantity, Uncertainty};
use crate::unit::{Unit, UnitFactor};
use crate::{Error, Result};
use num_traits::{One, Signed, ToPrimitive};

/// A unit rewritten in base units: `1 unit = factor * base`
#[derive(Clone, Debug, PartialEq)]
pub struct Expansion {
    pub base: Unit,
    pub factor: Factor,
}

impl Expansion {
    /// The factor as a float
    pub fn factor_f64(&self) -> Result<f64> {
        to_f64(&self.factor)
    }
}

fn to_f64(factor: &Factor) -> Result<f64> {
    factor
        .to_f64()
        .ok_or_else(|| Error::InvalidArgument(format!("Conversion factor {} overflows", factor)))
}

impl UnitCatalog {
    /// Rewrite `unit` in base units, multiplying out the conversion factors
    /// of every derived unit it mentions.
    ///
    /// Fails with [`Error::CyclicDefinition`] if a definition reaches itself.
    pub fn expand(&self, unit: &Unit) -> Result<Expansion> {
        let mut base = Vec::new();
        let mut factor = Factor::one();
        let mut chain = Vec::new();
        for f in unit.factors() {
            self.expand_factor(&f.name, f.power, &mut chain, &mut base, &mut factor)?;
        }

        let base = Unit::from_factors(base.into_iter().map(|f| (f.name, f.power)));
        Ok(Expansion { base, factor })
    }

    fn expand_factor(
        &self,
        name: &str,
        power: i32,
        chain: &mut Vec<String>,
        base: &mut Vec<UnitFactor>,
        factor: &mut Factor,
    ) -> Result<()> {
        let canonical = self.resolve(name)?;
        if chain.iter().any(|c| c == canonical) {
            let mut cycle = chain.clone();
            cycle.push(canonical.to_string());
            return Err(Error::CyclicDefinition(cycle));
        }

        match self.definition(canonical)? {
            UnitDefinition::Base => base.push(UnitFactor::new(canonical, power)),
            UnitDefinition::Derived {
                factor: scale,
                expansion,
            } => {
                *factor *= scale.pow(power);
                chain.push(canonical.to_string());
                for inner in expansion.factors() {
                    let inner_power = inner.power.checked_mul(power).ok_or_else(|| {
                        Error::InvalidArgument(format!(
                            "Power {} of '{}' overflows when expanding '{}'",
                            power, canonical, inner.name
                        ))
                    })?;
                    self.expand_factor(&inner.name, inner_power, chain, base, factor)?;
                }
                chain.pop();
            }
        }
        Ok(())
    }

    /// Whether two units share the same base dimensions
    pub fn compatible(&self, a: &Unit, b: &Unit) -> Result<bool> {
        Ok(self.expand(a)?.base == self.expand(b)?.base)
    }

    /// Exact factor `k` such that `x from = (k * x) to`
    pub fn conversion_factor(&self, from: &Unit, to: &Unit) -> Result<Factor> {
        let source = self.expand(from)?;
        let target = self.expand(to)?;
        if source.base != target.base {
            return Err(Error::UnitConversion {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(source.factor / target.factor)
    }

    /// Convert a bare value between units
    pub fn convert_value(&self, value: f64, from: &Unit, to: &Unit) -> Result<f64> {
        let factor = self.conversion_factor(from, to)?;
        Ok(value * to_f64(&factor)?)
    }

    /// Convert a quantity into `to`.
    ///
    /// Absolute errors are rescaled with the value; relative errors are
    /// scale-invariant and kept as they are.
    pub fn convert(&self, quantity: &Quantity, to: &Unit) -> Result<Quantity> {
        let factor = self.conversion_factor(quantity.unit(), to)?;
        let ratio = to_f64(&factor)?;
        let error = match quantity.uncertainty() {
            Uncertainty::Absolute(e) => Uncertainty::Absolute(e * to_f64(&factor.abs())?),
            relative => relative,
        };
        tracing::trace!("Converting {} into {} (x{})", quantity.unit(), to, ratio);
        Ok(Quantity::from_parts(
            quantity.value() * ratio,
            error,
            to.clone(),
        ))
    }

    /// Rewrite a quantity in base units
    pub fn to_base(&self, quantity: &Quantity) -> Result<Quantity> {
        let expansion = self.expand(quantity.unit())?;
        self.convert(quantity, &expansion.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{build_default_catalog, factor_ratio, UnitSpec};
    use crate::prefix::PrefixFilter;
    use approx::assert_relative_eq;

    fn catalog() -> UnitCatalog {
        let mut catalog = UnitCatalog::new();
        catalog.register_unit(UnitSpec::new("metre")).unwrap();
        catalog.register_unit(UnitSpec::new("second")).unwrap();
        catalog
            .register_unit(
                UnitSpec::new("kilometre")
                    .defined_as(factor_ratio(1000, 1).unwrap(), Unit::named("metre"))
                    .abbreviations(["km"]),
            )
            .unwrap();
        catalog
            .register_unit(
                UnitSpec::new("hour").defined_as(factor_ratio(3600, 1).unwrap(), Unit::named("second")),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_kilometre_round_trip() {
        let catalog = catalog();
        let q = Quantity::exact(1.0, Unit::named("kilometre"));
        let converted = catalog.convert(&q, &Unit::named("metre")).unwrap();
        assert_eq!(converted.value(), 1000.0);
        assert_eq!(converted.unit(), &Unit::named("metre"));
    }

    #[test]
    fn test_expand_multiplies_factors() {
        let catalog = catalog();
        let speed = Unit::from_factors([("km", 1), ("hour", -1)]);
        let expansion = catalog.expand(&speed).unwrap();
        assert_eq!(
            expansion.base,
            Unit::from_factors([("metre", 1), ("second", -1)])
        );
        assert_eq!(expansion.factor, factor_ratio(1000, 3600).unwrap());
    }

    #[test]
    fn test_incompatible_units() {
        let catalog = catalog();
        let err = catalog
            .convert(&Quantity::from(2.0), &Unit::named("metre"))
            .unwrap_err();
        assert!(matches!(err, Error::UnitConversion { .. }));

        let err = catalog
            .conversion_factor(&Unit::named("km"), &Unit::named("hour"))
            .unwrap_err();
        assert!(matches!(err, Error::UnitConversion { .. }));
    }

    #[test]
    fn test_unknown_unit_in_expansion() {
        let catalog = catalog();
        let err = catalog.expand(&Unit::named("furlong")).unwrap_err();
        assert!(matches!(err, Error::UnknownUnit(_)));
    }

    #[test]
    fn test_conversion_composes() {
        let catalog = build_default_catalog().unwrap();
        let q = Quantity::new(3.5, 0.1, Unit::from_factors([("km", 1), ("hr", -1)])).unwrap();
        let mps = Unit::from_factors([("m", 1), ("s", -1)]);
        let mm_per_min = Unit::from_factors([("mm", 1), ("min", -1)]);

        let via = catalog
            .convert(&catalog.convert(&q, &mps).unwrap(), &mm_per_min)
            .unwrap();
        let direct = catalog.convert(&q, &mm_per_min).unwrap();
        assert_relative_eq!(via.value(), direct.value(), max_relative = 1e-12);
        assert_relative_eq!(
            via.absolute_error(),
            direct.absolute_error(),
            max_relative = 1e-12
        );
        assert_relative_eq!(direct.value(), 3.5e6 / 60.0, max_relative = 1e-12);
    }

    #[test]
    fn test_relative_error_survives_conversion() {
        let catalog = catalog();
        let q = Quantity::with_relative_error(2.0, 0.05, Unit::named("km")).unwrap();
        let converted = catalog.convert(&q, &Unit::named("metre")).unwrap();
        assert_eq!(converted.uncertainty(), Uncertainty::Relative(0.05));
        assert_relative_eq!(converted.absolute_error(), 100.0);

        let q = Quantity::new(2.0, 0.1, Unit::named("km")).unwrap();
        let converted = catalog.convert(&q, &Unit::named("metre")).unwrap();
        assert_relative_eq!(converted.absolute_error(), 100.0);
    }

    #[test]
    fn test_cyclic_definition_detected() {
        let mut catalog = catalog();
        catalog
            .register_unit(UnitSpec::new("foo").defined_as(factor_ratio(2, 1).unwrap(), Unit::named("metre")))
            .unwrap();
        catalog
            .register_unit(UnitSpec::new("bar").defined_as(factor_ratio(3, 1).unwrap(), Unit::named("foo")))
            .unwrap();
        // Redefine foo in terms of bar
        catalog
            .register_unit(
                UnitSpec::new("foo")
                    .defined_as(factor_ratio(1, 3).unwrap(), Unit::named("bar"))
                    .overwrite(true),
            )
            .unwrap();

        let err = catalog.expand(&Unit::named("foo")).unwrap_err();
        match err {
            Error::CyclicDefinition(chain) => assert_eq!(chain, vec!["foo", "bar", "foo"]),
            other => panic!("Expected CyclicDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_expansion_power_overflow() {
        let mut catalog = catalog();
        catalog
            .register_unit(
                UnitSpec::new("are")
                    .defined_as(factor_ratio(1, 1).unwrap(), Unit::from_factors([("metre", 2)])),
            )
            .unwrap();

        let huge = Unit::from_factors([("are", 1_500_000_000)]);
        let err = catalog.expand(&huge).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_default_catalog_derived_units() {
        let catalog = build_default_catalog().unwrap();

        let kpa = Quantity::exact(101.325, Unit::named("kPa"));
        let base = catalog.to_base(&kpa).unwrap();
        // gram is the base mass unit
        assert_eq!(
            base.unit(),
            &Unit::from_factors([("gram", 1), ("metre", -1), ("second", -2)])
        );
        assert_relative_eq!(base.value(), 101_325_000.0, max_relative = 1e-12);

        let energy = Quantity::exact(1.0, Unit::from_factors([("kW", 1), ("hr", 1)]));
        let joules = catalog.convert(&energy, &Unit::named("J")).unwrap();
        assert_relative_eq!(joules.value(), 3.6e6, max_relative = 1e-12);
    }

    #[test]
    fn test_dimensionless_units_expand_to_nothing() {
        let catalog = build_default_catalog().unwrap();
        let expansion = catalog.expand(&Unit::named("degree")).unwrap();
        assert!(expansion.base.is_dimensionless());
        assert_relative_eq!(
            expansion.factor_f64().unwrap(),
            std::f64::consts::PI / 180.0,
            max_relative = 1e-15
        );

        let mut custom = UnitCatalog::new();
        custom.register_prefix("kilo", 3, 10, Some("k")).unwrap();
        custom
            .register_unit(UnitSpec::new("byte").prefixes(PrefixFilter::any()))
            .unwrap();
        assert!(custom.compatible(&Unit::named("kilobyte"), &Unit::named("byte")).unwrap());
    }
}
