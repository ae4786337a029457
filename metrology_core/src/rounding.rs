//! Particle Data Group rounding of a value and its uncertainty.
//!
//! The number of significant digits kept in the uncertainty follows from
//! its three leading digits:
//!
//! | leading digits | kept |
//! |---|---|
//! | 100 - 354 | 2 |
//! | 355 - 949 | 1 |
//! | 950 - 999 | uncertainty rounded up to the next power of ten, 2 kept |
//!
//! The value is then rounded at the same decimal place.

use crate::quantity::{Quantity, Uncertainty};
use crate::{Error, Result};
use std::fmt;

/// A rounded quantity plus the precision it was rounded at
#[derive(Clone, Debug)]
pub struct Rounded {
    pub quantity: Quantity,
    /// Significant digits kept in the uncertainty
    pub digits: u32,
    /// Decimal place rounded at: the last kept digit is worth `10^place`
    pub place: i32,
}

impl Rounded {
    /// Digits after the decimal point needed to display the result
    pub fn decimals(&self) -> usize {
        if self.place < 0 {
            self.place.unsigned_abs() as usize
        } else {
            0
        }
    }
}

impl fmt::Display for Rounded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decimals = self.decimals();
        write!(f, "{:.*}", decimals, self.quantity.value())?;
        if self.quantity.has_error() {
            write!(f, " ± {:.*}", decimals, self.quantity.absolute_error())?;
        }
        if self.quantity.has_unit() {
            write!(f, " {}", self.quantity.unit())?;
        }
        Ok(())
    }
}

/// Round `quantity` by the PDG rule.
///
/// `digits` overrides the inferred number of significant digits; `place`
/// overrides the decimal place outright. Without uncertainty the value is
/// rounded to an integer unless told otherwise.
pub fn round_to_pdg(quantity: &Quantity, digits: Option<u32>, place: Option<i32>) -> Result<Rounded> {
    if digits == Some(0) {
        return Err(Error::InvalidArgument(
            "Significant digits must be positive".into(),
        ));
    }

    let error = quantity.absolute_error();
    let value = quantity.value();
    if !error.is_finite() || !value.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "Cannot round non-finite quantity {}",
            quantity
        )));
    }

    let (error, digits, place) = match (place, digits) {
        (Some(place), _) => (error, digits.unwrap_or_else(|| kept_digits(error, place)), place),
        (None, Some(digits)) if error > 0.0 => {
            (error, digits, magnitude(error) - (digits as i32 - 1))
        }
        (None, Some(digits)) if value != 0.0 => {
            (error, digits, magnitude(value) - (digits as i32 - 1))
        }
        (None, Some(digits)) => (error, digits, 0),
        (None, None) if error > 0.0 => pdg(error),
        (None, None) => (error, 0, 0),
    };

    let rounded = Quantity::with_uncertainty(
        round_at(value, place),
        Uncertainty::absolute(round_at(error, place))?,
        quantity.unit().clone(),
    )?;
    tracing::debug!("Rounded {} to {} ({} digits)", quantity, rounded, digits);
    Ok(Rounded {
        quantity: rounded,
        digits,
        place,
    })
}

/// Inferred `(error, digits, place)` from the leading digits of `error`
fn pdg(error: f64) -> (f64, u32, i32) {
    let mut exponent = magnitude(error);
    let mut leading = (error / 10f64.powi(exponent - 2)).round();
    if leading >= 1000.0 {
        exponent += 1;
        leading = (error / 10f64.powi(exponent - 2)).round();
    }

    match leading as u32 {
        0..=354 => (error, 2, exponent - 1),
        355..=949 => (error, 1, exponent),
        _ => (10f64.powi(exponent + 1), 2, exponent),
    }
}

/// Significant digits of `error` kept when rounding at `place`
fn kept_digits(error: f64, place: i32) -> u32 {
    if error == 0.0 {
        return 0;
    }
    (magnitude(error) - place + 1).max(0) as u32
}

/// Decimal exponent of the leading digit
fn magnitude(x: f64) -> i32 {
    x.abs().log10().floor() as i32
}

/// Round to a multiple of `10^place`
fn round_at(x: f64, place: i32) -> f64 {
    if place < 0 {
        let scale = 10f64.powi(-place);
        (x * scale).round() / scale
    } else {
        let scale = 10f64.powi(place);
        (x / scale).round() * scale
    }
}
