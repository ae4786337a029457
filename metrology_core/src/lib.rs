#![forbid(unsafe_code)]

//! Core library for physical quantities: values tagged with a unit and a
//! measurement uncertainty.
//!
//! This crate provides:
//! - Unit algebra (reduce, multiply, divide, powers and roots of units)
//! - Prefix and unit registries held in an explicit [`UnitCatalog`]
//! - Conversion between compatible units with exact factors
//! - Quantity arithmetic and transcendental functions with first-order
//!   error propagation
//! - Statistical comparisons and PDG rounding

pub mod error;
pub mod unit;
pub mod prefix;
pub mod catalog;
pub mod conversion;
pub mod quantity;
pub mod propagation;
pub mod coerce;
pub mod ops;
pub mod compare;
pub mod rounding;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Recovery, Result};
pub use unit::{Unit, UnitFactor};
pub use prefix::{PrefixEntry, PrefixFilter, PrefixTable};
pub use catalog::{build_default_catalog, Factor, UnitCatalog, UnitDefinition, UnitSpec};
pub use conversion::Expansion;
pub use quantity::{Quantity, Uncertainty};
pub use coerce::RecoveryPolicy;
pub use ops::Evaluator;
pub use compare::{z_one_sided, z_two_sided};
pub use rounding::{round_to_pdg, Rounded};
pub use config::Config;
