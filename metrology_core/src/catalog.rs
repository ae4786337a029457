//! Unit catalog: canonical unit definitions, aliases, abbreviations and the
//! prefix table they are expanded with.
//!
//! All three name tables are keyed case-insensitively and their key spaces are
//! kept disjoint. Registration validates every name it is about to add
//! (including prefixed variants) before committing any of them.

use crate::prefix::{PrefixEntry, PrefixFilter, PrefixTable};
use crate::unit::Unit;
use crate::{Error, Result};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use std::collections::{HashMap, HashSet};

/// Exact conversion factor between a unit and its expansion
pub type Factor = BigRational;

/// Exact factor from a finite, non-zero float
pub fn factor_from_f64(value: f64) -> Result<Factor> {
    if !value.is_finite() || value == 0.0 {
        return Err(Error::InvalidArgument(format!(
            "Conversion factor must be finite and non-zero, got {}",
            value
        )));
    }
    BigRational::from_float(value).ok_or_else(|| {
        Error::InvalidArgument(format!("Conversion factor {} is not representable", value))
    })
}

/// Exact factor `numer / denom`
pub fn factor_ratio(numer: i64, denom: i64) -> Result<Factor> {
    if numer == 0 || denom == 0 {
        return Err(Error::InvalidArgument(format!(
            "Conversion factor {}/{} must be non-zero",
            numer, denom
        )));
    }
    Ok(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
}

/// `base ^ power` for a prefix
fn prefix_factor(prefix: &PrefixEntry) -> Factor {
    BigRational::from_integer(BigInt::from(prefix.base)).pow(prefix.power)
}

// ============================================================================
// Definitions
// ============================================================================

/// How a canonical unit is defined
#[derive(Clone, Debug, PartialEq)]
pub enum UnitDefinition {
    /// A base dimension; never expanded further
    Base,
    /// `factor` times a product of previously defined units
    Derived { factor: Factor, expansion: Unit },
}

impl UnitDefinition {
    pub fn derived(factor: Factor, expansion: Unit) -> Self {
        UnitDefinition::Derived { factor, expansion }
    }
}

#[derive(Clone, Debug)]
struct UnitEntry {
    name: String,
    definition: UnitDefinition,
}

/// Everything needed to register one unit
#[derive(Clone, Debug)]
pub struct UnitSpec {
    name: String,
    definition: UnitDefinition,
    aliases: Vec<String>,
    abbreviations: Vec<String>,
    prefixes: Option<PrefixFilter>,
    overwrite: bool,
}

impl UnitSpec {
    /// A new base unit
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: UnitDefinition::Base,
            aliases: Vec::new(),
            abbreviations: Vec::new(),
            prefixes: None,
            overwrite: false,
        }
    }

    /// Define the unit as `factor` times `expansion`
    pub fn defined_as(mut self, factor: Factor, expansion: Unit) -> Self {
        self.definition = UnitDefinition::derived(factor, expansion);
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn abbreviations<I, S>(mut self, abbreviations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.abbreviations = abbreviations.into_iter().map(Into::into).collect();
        self
    }

    /// Also register one prefixed variant per admitted prefix
    pub fn prefixes(mut self, filter: PrefixFilter) -> Self {
        self.prefixes = Some(filter);
        self
    }

    /// Replace existing entries instead of failing on collisions
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// An alias or abbreviation as written, and the canonical name it points at
#[derive(Clone, Debug)]
struct NameEntry {
    name: String,
    target: String,
}

/// Which table a pending registration lands in
enum Slot {
    Canonical(UnitDefinition),
    Alias(String),
    Abbreviation(String),
}

/// Case folding shared by every name table, prefixes included
pub(crate) fn fold(name: &str) -> String {
    name.to_lowercase()
}

// ============================================================================
// Catalog
// ============================================================================

/// The unit and prefix registries
#[derive(Clone, Debug, Default)]
pub struct UnitCatalog {
    prefixes: PrefixTable,
    units: HashMap<String, UnitEntry>,
    aliases: HashMap<String, NameEntry>,
    abbreviations: HashMap<String, NameEntry>,
}

impl UnitCatalog {
    /// An empty catalog with no prefixes and no units
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prefix worth `base ^ power`.
    ///
    /// Units registered earlier do not gain variants for this prefix.
    pub fn register_prefix(
        &mut self,
        name: &str,
        power: i32,
        base: i64,
        abbreviation: Option<&str>,
    ) -> Result<()> {
        self.prefixes.register(name, power, base, abbreviation)
    }

    pub fn prefixes(&self) -> &PrefixTable {
        &self.prefixes
    }

    /// Register a unit together with its aliases, abbreviations and prefixed
    /// variants, or nothing at all if any of those names collides.
    pub fn register_unit(&mut self, spec: UnitSpec) -> Result<()> {
        if spec.name.trim().is_empty() {
            return Err(Error::InvalidArgument("Unit has an empty name".into()));
        }
        if let UnitDefinition::Derived { factor, expansion } = &spec.definition {
            if factor.is_zero() {
                return Err(Error::InvalidArgument(format!(
                    "Unit '{}' has a zero conversion factor",
                    spec.name
                )));
            }
            for factor in expansion.factors() {
                self.resolve(&factor.name)?;
            }
        }

        let pending = self.pending_entries(&spec);

        // Validate everything before touching the tables
        let mut seen = HashSet::new();
        for (key, _) in &pending {
            let folded = fold(key);
            if !seen.insert(folded.clone()) {
                return Err(Error::DuplicateDefinition(key.clone()));
            }
            if !spec.overwrite && self.contains_key(&folded) {
                return Err(Error::DuplicateDefinition(key.clone()));
            }
        }

        let count = pending.len();
        for (key, slot) in pending {
            let folded = fold(&key);
            self.units.remove(&folded);
            self.aliases.remove(&folded);
            self.abbreviations.remove(&folded);
            match slot {
                Slot::Canonical(definition) => {
                    self.units.insert(
                        folded,
                        UnitEntry {
                            name: key,
                            definition,
                        },
                    );
                }
                Slot::Alias(target) => {
                    self.aliases.insert(folded, NameEntry { name: key, target });
                }
                Slot::Abbreviation(target) => {
                    self.abbreviations
                        .insert(folded, NameEntry { name: key, target });
                }
            }
        }

        tracing::debug!("Registered unit {} ({} names)", spec.name, count);
        Ok(())
    }

    /// Every name a registration would add, prefixed variants included
    fn pending_entries(&self, spec: &UnitSpec) -> Vec<(String, Slot)> {
        let mut pending = vec![(spec.name.clone(), Slot::Canonical(spec.definition.clone()))];
        pending.extend(
            spec.aliases
                .iter()
                .map(|a| (a.clone(), Slot::Alias(spec.name.clone()))),
        );
        pending.extend(
            spec.abbreviations
                .iter()
                .map(|a| (a.clone(), Slot::Abbreviation(spec.name.clone()))),
        );

        let Some(filter) = &spec.prefixes else {
            return pending;
        };

        for prefix in self.prefixes.admitted(filter) {
            let prefixed = format!("{}{}", prefix.name, spec.name);
            pending.push((
                prefixed.clone(),
                Slot::Canonical(UnitDefinition::derived(
                    prefix_factor(prefix),
                    Unit::named(spec.name.clone()),
                )),
            ));
            for alias in &spec.aliases {
                pending.push((
                    format!("{}{}", prefix.name, alias),
                    Slot::Alias(prefixed.clone()),
                ));
            }
            if let Some(abbrev) = &prefix.abbreviation {
                for unit_abbrev in &spec.abbreviations {
                    pending.push((
                        format!("{}{}", abbrev, unit_abbrev),
                        Slot::Abbreviation(prefixed.clone()),
                    ));
                }
            }
        }
        pending
    }

    fn contains_key(&self, folded: &str) -> bool {
        self.units.contains_key(folded)
            || self.aliases.contains_key(folded)
            || self.abbreviations.contains_key(folded)
    }

    /// Canonical name for a unit, alias or abbreviation
    pub fn resolve(&self, name: &str) -> Result<&str> {
        let folded = fold(name);
        if let Some(entry) = self.units.get(&folded) {
            return Ok(&entry.name);
        }
        if let Some(alias) = self.aliases.get(&folded) {
            return self.resolve(&alias.target);
        }
        if let Some(abbrev) = self.abbreviations.get(&folded) {
            return self.resolve(&abbrev.target);
        }
        Err(Error::UnknownUnit(name.to_string()))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// Definition of any resolvable name
    pub fn definition(&self, name: &str) -> Result<&UnitDefinition> {
        let canonical = self.resolve(name)?;
        self.units
            .get(&fold(canonical))
            .map(|entry| &entry.definition)
            .ok_or_else(|| Error::UnknownUnit(name.to_string()))
    }

    /// Canonical names, sorted
    pub fn canonical_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.units.values().map(|e| e.name.as_str()).collect();
        names.sort_unstable_by_key(|n| fold(n));
        names
    }

    /// Aliases registered directly for a canonical name, sorted
    pub fn aliases_of(&self, canonical: &str) -> Vec<&str> {
        Self::keys_pointing_at(&self.aliases, canonical)
    }

    /// Abbreviations registered directly for a canonical name, sorted
    pub fn abbreviations_of(&self, canonical: &str) -> Vec<&str> {
        Self::keys_pointing_at(&self.abbreviations, canonical)
    }

    fn keys_pointing_at<'a>(
        table: &'a HashMap<String, NameEntry>,
        canonical: &str,
    ) -> Vec<&'a str> {
        let mut keys: Vec<&str> = table
            .values()
            .filter(|entry| fold(&entry.target) == fold(canonical))
            .map(|entry| entry.name.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Remove every unit and prefix
    pub fn clear(&mut self) {
        self.units.clear();
        self.aliases.clear();
        self.abbreviations.clear();
        self.prefixes.clear();
        tracing::debug!("Cleared unit catalog");
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, entry) in &self.units {
            if self.aliases.contains_key(key) || self.abbreviations.contains_key(key) {
                errors.push(format!("Name '{}' is registered in more than one table", key));
            }
            if let UnitDefinition::Derived { factor, expansion } = &entry.definition {
                if factor.is_zero() {
                    errors.push(format!("Unit '{}' has a zero conversion factor", entry.name));
                }
                for factor in expansion.factors() {
                    if !self.is_defined(&factor.name) {
                        errors.push(format!(
                            "Unit '{}' references unknown unit '{}'",
                            entry.name, factor.name
                        ));
                    }
                }
            }
        }

        for entry in self.aliases.values().chain(self.abbreviations.values()) {
            if !self.is_defined(&entry.target) {
                errors.push(format!(
                    "Name '{}' points at unknown unit '{}'",
                    entry.name, entry.target
                ));
            }
        }

        errors
    }
}

// ============================================================================
// Default catalog
// ============================================================================

const SI_PREFIXES: &[(&str, i32, Option<&str>)] = &[
    // mega, peta, zetta and yotta collide case-insensitively with milli,
    // pico, zepto and yocto, so only the small ones keep an abbreviation
    ("yotta", 24, None),
    ("zetta", 21, None),
    ("exa", 18, Some("E")),
    ("peta", 15, None),
    ("tera", 12, Some("T")),
    ("giga", 9, Some("G")),
    ("mega", 6, None),
    ("kilo", 3, Some("k")),
    ("hecto", 2, Some("h")),
    ("deca", 1, Some("da")),
    ("deci", -1, Some("d")),
    ("centi", -2, Some("c")),
    ("milli", -3, Some("m")),
    ("micro", -6, Some("u")),
    ("nano", -9, Some("n")),
    ("pico", -12, Some("p")),
    ("femto", -15, Some("f")),
    ("atto", -18, Some("a")),
    ("zepto", -21, Some("z")),
    ("yocto", -24, Some("y")),
];

fn units(spec: &str) -> Result<Unit> {
    spec.parse()
}

/// Builds the default catalog with the SI prefixes, base units and named
/// derived units
pub fn build_default_catalog() -> Result<UnitCatalog> {
    let mut catalog = UnitCatalog::new();
    let one = Factor::one;

    for &(name, power, abbrev) in SI_PREFIXES {
        catalog.register_prefix(name, power, 10, abbrev)?;
    }

    // ========================================================================
    // Base units
    // ========================================================================

    let every = PrefixFilter::decimal;
    catalog.register_unit(
        UnitSpec::new("metre")
            .aliases(["meter"])
            .abbreviations(["m"])
            .prefixes(every()),
    )?;
    catalog.register_unit(UnitSpec::new("gram").abbreviations(["g"]).prefixes(every()))?;
    catalog.register_unit(UnitSpec::new("second").abbreviations(["s"]).prefixes(every()))?;
    // pA would collide with Pa
    catalog.register_unit(
        UnitSpec::new("ampere")
            .aliases(["amp"])
            .abbreviations(["A"])
            .prefixes(every().and(PrefixFilter::range(Some(-9), None))),
    )?;
    catalog.register_unit(UnitSpec::new("kelvin").abbreviations(["K"]).prefixes(every()))?;
    catalog.register_unit(UnitSpec::new("mole").abbreviations(["mol"]).prefixes(every()))?;
    catalog.register_unit(UnitSpec::new("candela").abbreviations(["cd"]).prefixes(every()))?;

    // ========================================================================
    // Dimensionless
    // ========================================================================

    catalog.register_unit(
        UnitSpec::new("radian")
            .defined_as(one(), Unit::dimensionless())
            .abbreviations(["rad"])
            .prefixes(PrefixFilter::powers([-3, -6])),
    )?;
    catalog.register_unit(
        UnitSpec::new("steradian")
            .defined_as(one(), Unit::dimensionless())
            .abbreviations(["sr"]),
    )?;
    catalog.register_unit(
        UnitSpec::new("degree")
            .defined_as(
                factor_from_f64(std::f64::consts::PI / 180.0)?,
                Unit::named("radian"),
            )
            .abbreviations(["deg"]),
    )?;
    catalog.register_unit(
        UnitSpec::new("percent")
            .defined_as(factor_ratio(1, 100)?, Unit::dimensionless())
            .abbreviations(["%"]),
    )?;

    // ========================================================================
    // Named derived units
    // ========================================================================

    let derived: &[(&str, &str, &str)] = &[
        ("hertz", "Hz", "second^-1"),
        ("newton", "N", "kilogram metre second^-2"),
        ("pascal", "Pa", "newton metre^-2"),
        ("joule", "J", "newton metre"),
        ("watt", "W", "joule second^-1"),
        ("coulomb", "C", "ampere second"),
        ("volt", "V", "watt ampere^-1"),
        ("ohm", "Ω", "volt ampere^-1"),
        ("farad", "F", "coulomb volt^-1"),
        ("weber", "Wb", "volt second"),
        ("henry", "H", "weber ampere^-1"),
        ("becquerel", "Bq", "second^-1"),
        ("gray", "Gy", "joule kilogram^-1"),
        ("sievert", "Sv", "joule kilogram^-1"),
    ];
    for &(name, abbrev, expansion) in derived {
        catalog.register_unit(
            UnitSpec::new(name)
                .defined_as(one(), units(expansion)?)
                .abbreviations([abbrev])
                .prefixes(every()),
        )?;
    }

    // fT, pT, aT and cT would shadow ft, pt, at and ct
    catalog.register_unit(
        UnitSpec::new("tesla")
            .defined_as(one(), units("weber metre^-2")?)
            .abbreviations(["T"])
            .prefixes(every().and(PrefixFilter::powers([-9, -6, -3, 3, 6, 9, 12]))),
    )?;

    // siemens has no abbreviation: S collides with s
    catalog.register_unit(
        UnitSpec::new("siemens")
            .defined_as(one(), units("ampere volt^-1")?)
            .prefixes(every()),
    )?;
    catalog.register_unit(
        UnitSpec::new("litre")
            .defined_as(factor_ratio(1, 1000)?, units("metre^3")?)
            .aliases(["liter"])
            .abbreviations(["L"])
            .prefixes(every()),
    )?;

    // ========================================================================
    // Time
    // ========================================================================

    catalog.register_unit(
        UnitSpec::new("minute")
            .defined_as(factor_ratio(60, 1)?, Unit::named("second"))
            .abbreviations(["min"]),
    )?;
    catalog.register_unit(
        UnitSpec::new("hour")
            .defined_as(factor_ratio(60, 1)?, Unit::named("minute"))
            .abbreviations(["hr"]),
    )?;
    catalog.register_unit(
        UnitSpec::new("day")
            .defined_as(factor_ratio(24, 1)?, Unit::named("hour"))
            .abbreviations(["d"]),
    )?;

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric_catalog() -> UnitCatalog {
        let mut catalog = UnitCatalog::new();
        catalog.register_prefix("kilo", 3, 10, Some("k")).unwrap();
        catalog.register_prefix("milli", -3, 10, Some("m")).unwrap();
        catalog
            .register_unit(
                UnitSpec::new("metre")
                    .aliases(["meter"])
                    .abbreviations(["m"])
                    .prefixes(PrefixFilter::any()),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_default_catalog_builds() {
        let catalog = build_default_catalog().unwrap();
        assert_eq!(catalog.prefixes().len(), 20);
        assert!(catalog.is_defined("kilogram"));
        assert!(catalog.is_defined("kPa"));
        assert!(catalog.is_defined("megahertz"));
        // keys are case-insensitive, so MHz is millihertz
        assert_eq!(catalog.resolve("MHz").unwrap(), "millihertz");
    }

    #[test]
    fn test_default_catalog_leaves_common_abbreviations_free() {
        let catalog = build_default_catalog().unwrap();
        for name in ["ft", "pt", "at", "ct", "in", "yd", "mi", "lb", "oz", "gal"] {
            assert!(!catalog.is_defined(name), "'{}' is already taken", name);
        }
        assert_eq!(catalog.resolve("mT").unwrap(), "millitesla");
        assert_eq!(catalog.resolve("nT").unwrap(), "nanotesla");
        assert!(!catalog.is_defined("femtotesla"));

        let mut catalog = catalog;
        catalog
            .register_unit(
                UnitSpec::new("foot")
                    .defined_as(factor_from_f64(0.3048).unwrap(), Unit::named("metre"))
                    .abbreviations(["ft"]),
            )
            .unwrap();
        assert_eq!(catalog.resolve("FT").unwrap(), "foot");
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog().unwrap();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_resolve_follows_aliases_and_abbreviations() {
        let catalog = metric_catalog();
        assert_eq!(catalog.resolve("metre").unwrap(), "metre");
        assert_eq!(catalog.resolve("METER").unwrap(), "metre");
        assert_eq!(catalog.resolve("m").unwrap(), "metre");
        assert_eq!(catalog.resolve("km").unwrap(), "kilometre");
        assert_eq!(catalog.resolve("kilometer").unwrap(), "kilometre");
        assert_eq!(catalog.resolve("mm").unwrap(), "millimetre");
    }

    #[test]
    fn test_resolve_unknown() {
        let catalog = metric_catalog();
        let err = catalog.resolve("furlong").unwrap_err();
        assert!(matches!(err, Error::UnknownUnit(ref n) if n == "furlong"));
    }

    #[test]
    fn test_prefixed_variant_definition() {
        let catalog = metric_catalog();
        let def = catalog.definition("km").unwrap();
        assert_eq!(
            def,
            &UnitDefinition::derived(factor_ratio(1000, 1).unwrap(), Unit::named("metre"))
        );
        assert_eq!(catalog.definition("m").unwrap(), &UnitDefinition::Base);
    }

    #[test]
    fn test_duplicate_is_rejected_without_partial_registration() {
        let mut catalog = metric_catalog();

        let err = catalog
            .register_unit(
                UnitSpec::new("league")
                    .aliases(["Meter"])
                    .abbreviations(["lea"])
                    .prefixes(PrefixFilter::any()),
            )
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition(ref n) if n == "Meter"));
        assert!(!catalog.is_defined("league"));
        assert!(!catalog.is_defined("lea"));
        assert!(!catalog.is_defined("kiloleague"));
    }

    #[test]
    fn test_prefixed_variant_collision_names_exact_key() {
        let mut catalog = metric_catalog();
        catalog.register_unit(UnitSpec::new("kilofoo")).unwrap();

        let err = catalog
            .register_unit(UnitSpec::new("foo").prefixes(PrefixFilter::any()))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition(ref n) if n == "kilofoo"));
        assert!(!catalog.is_defined("foo"));
        assert!(!catalog.is_defined("millifoo"));
    }

    #[test]
    fn test_overwrite_replaces_entries() {
        let mut catalog = metric_catalog();
        catalog
            .register_unit(
                UnitSpec::new("meter")
                    .defined_as(factor_ratio(1, 1).unwrap(), Unit::named("metre"))
                    .overwrite(true),
            )
            .unwrap();
        assert_eq!(catalog.resolve("meter").unwrap(), "meter");
        assert!(catalog.validate().is_empty());
    }

    #[test]
    fn test_definition_must_reference_known_units() {
        let mut catalog = metric_catalog();
        let err = catalog
            .register_unit(
                UnitSpec::new("rod").defined_as(factor_from_f64(5.0292).unwrap(), Unit::named("foot")),
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnknownUnit(ref n) if n == "foot"));
    }

    #[test]
    fn test_later_prefixes_are_not_retroactive() {
        let mut catalog = metric_catalog();
        catalog.register_prefix("mega", 6, 10, None).unwrap();
        assert!(!catalog.is_defined("megametre"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut catalog = metric_catalog();
        catalog.clear();
        assert!(!catalog.is_defined("metre"));
        assert!(catalog.prefixes().is_empty());
        assert!(catalog.canonical_names().is_empty());
    }

    #[test]
    fn test_listing_names() {
        let catalog = metric_catalog();
        assert_eq!(
            catalog.canonical_names(),
            vec!["kilometre", "metre", "millimetre"]
        );
        assert_eq!(catalog.abbreviations_of("metre"), vec!["m"]);
        assert_eq!(catalog.aliases_of("kilometre"), vec!["kilometer"]);
    }

    #[test]
    fn test_invalid_factors() {
        assert!(factor_from_f64(0.0).is_err());
        assert!(factor_from_f64(f64::NAN).is_err());
        assert!(factor_ratio(1, 0).is_err());
        assert_eq!(factor_ratio(2, 4).unwrap(), factor_ratio(1, 2).unwrap());
    }
}
