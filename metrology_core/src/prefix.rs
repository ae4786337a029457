//! Multiplicative prefixes (kilo, milli, ...) and the predicates that decide
//! which prefixes a unit admits.

use crate::catalog::fold;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A named scale factor `base ^ power`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixEntry {
    pub name: String,
    pub base: u32,
    pub power: i32,
    pub abbreviation: Option<String>,
}

impl PrefixEntry {
    /// Whether this prefix would be admitted by `filter`
    pub fn admitted_by(&self, filter: &PrefixFilter) -> bool {
        filter.admits(self.base, self.power)
    }
}

/// Registered prefixes, in registration order.
///
/// Names and abbreviations are unique across the table, compared
/// case-insensitively like unit names.
#[derive(Clone, Debug, Default)]
pub struct PrefixTable {
    entries: Vec<PrefixEntry>,
}

impl PrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prefix worth `base ^ power`
    pub fn register(
        &mut self,
        name: &str,
        power: i32,
        base: i64,
        abbreviation: Option<&str>,
    ) -> Result<()> {
        if base <= 0 {
            return Err(Error::InvalidArgument(format!(
                "Prefix '{}' must have a positive base, got {}",
                name, base
            )));
        }
        let base = u32::try_from(base).map_err(|_| {
            Error::InvalidArgument(format!("Prefix '{}' base {} is too large", name, base))
        })?;
        if power == 0 {
            return Err(Error::InvalidArgument(format!(
                "Prefix '{}' must have a non-zero power",
                name
            )));
        }
        if name.is_empty() {
            return Err(Error::InvalidArgument("Prefix has an empty name".into()));
        }

        if self.is_taken(name) {
            return Err(Error::DuplicateDefinition(name.to_string()));
        }
        if let Some(abbrev) = abbreviation {
            if self.is_taken(abbrev) || fold(abbrev) == fold(name) {
                return Err(Error::DuplicateDefinition(abbrev.to_string()));
            }
        }

        tracing::debug!("Registered prefix {} = {}^{}", name, base, power);
        self.entries.push(PrefixEntry {
            name: name.to_string(),
            base,
            power,
            abbreviation: abbreviation.map(str::to_string),
        });
        Ok(())
    }

    fn is_taken(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Look up a prefix by name or abbreviation, folded like unit names
    pub fn get(&self, key: &str) -> Option<&PrefixEntry> {
        let key = fold(key);
        self.entries.iter().find(|p| {
            fold(&p.name) == key || p.abbreviation.as_deref().is_some_and(|a| fold(a) == key)
        })
    }

    /// All prefixes admitted by `filter`
    pub fn admitted<'a>(
        &'a self,
        filter: &'a PrefixFilter,
    ) -> impl Iterator<Item = &'a PrefixEntry> + 'a {
        self.entries.iter().filter(move |p| p.admitted_by(filter))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrefixEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// Admission predicates
// ============================================================================

/// Predicate over a prefix's `(base, power)` pair.
///
/// Filters compose with [`PrefixFilter::and`] and [`PrefixFilter::or`] and can
/// be written in configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrefixFilter {
    /// Every prefix
    Any,
    /// Powers listed explicitly
    Powers { powers: Vec<i32> },
    /// Powers within an inclusive range; a missing bound is open
    Range {
        #[serde(default)]
        min: Option<i32>,
        #[serde(default)]
        max: Option<i32>,
    },
    /// A fixed base, optionally only powers divisible by `modulus`
    Base {
        base: u32,
        #[serde(default)]
        modulus: Option<i32>,
    },
    All { filters: Vec<PrefixFilter> },
    OneOf { filters: Vec<PrefixFilter> },
}

impl PrefixFilter {
    pub fn any() -> Self {
        PrefixFilter::Any
    }

    pub fn powers(powers: impl IntoIterator<Item = i32>) -> Self {
        PrefixFilter::Powers {
            powers: powers.into_iter().collect(),
        }
    }

    pub fn range(min: Option<i32>, max: Option<i32>) -> Self {
        PrefixFilter::Range { min, max }
    }

    pub fn base(base: u32, modulus: Option<i32>) -> Self {
        PrefixFilter::Base { base, modulus }
    }

    /// Powers of ten only (the SI decimal prefixes)
    pub fn decimal() -> Self {
        Self::base(10, None)
    }

    pub fn and(self, other: PrefixFilter) -> Self {
        match self {
            PrefixFilter::All { mut filters } => {
                filters.push(other);
                PrefixFilter::All { filters }
            }
            first => PrefixFilter::All {
                filters: vec![first, other],
            },
        }
    }

    pub fn or(self, other: PrefixFilter) -> Self {
        match self {
            PrefixFilter::OneOf { mut filters } => {
                filters.push(other);
                PrefixFilter::OneOf { filters }
            }
            first => PrefixFilter::OneOf {
                filters: vec![first, other],
            },
        }
    }

    /// Evaluate the predicate
    pub fn admits(&self, base: u32, power: i32) -> bool {
        match self {
            PrefixFilter::Any => true,
            PrefixFilter::Powers { powers } => powers.contains(&power),
            PrefixFilter::Range { min, max } => {
                min.map_or(true, |min| power >= min) && max.map_or(true, |max| power <= max)
            }
            PrefixFilter::Base {
                base: wanted,
                modulus,
            } => *wanted == base && modulus.map_or(true, |m| m != 0 && power % m == 0),
            PrefixFilter::All { filters } => filters.iter().all(|f| f.admits(base, power)),
            PrefixFilter::OneOf { filters } => filters.iter().any(|f| f.admits(base, power)),
        }
    }
}
