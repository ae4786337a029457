//! First-order (Gaussian) error propagation.
//!
//! An output `f(x1, ..., xn)` gets the uncertainty
//! `sqrt(sum((df/dxi * sigma_i)^2))`, assuming independent inputs. Partial
//! derivatives are evaluated at the inputs' values.

/// One input's share of the output uncertainty
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Term {
    /// Partial derivative of the output with respect to this input
    pub derivative: f64,
    /// Absolute error of this input
    pub error: f64,
}

impl Term {
    pub fn new(derivative: f64, error: f64) -> Self {
        Self { derivative, error }
    }

    /// `|df/dx| * sigma`; exact inputs contribute nothing even where the
    /// derivative is undefined
    pub fn contribution(&self) -> f64 {
        if self.error == 0.0 {
            0.0
        } else {
            self.derivative.abs() * self.error
        }
    }
}

/// Combine contributions into the output's absolute error.
///
/// A single term is taken as is; several are added in quadrature.
pub fn propagate(terms: &[Term]) -> f64 {
    match terms {
        [] => 0.0,
        [single] => single.contribution(),
        many => quadrature(many.iter().map(Term::contribution)),
    }
}

/// Square root of the sum of squares
pub fn quadrature(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().map(|v| v * v).sum::<f64>().sqrt()
}

// ============================================================================
// Analytic functions
// ============================================================================

/// A real function of one dimensionless argument, with its derivative
#[derive(Clone, Copy)]
pub struct Function {
    pub name: &'static str,
    pub value: fn(f64) -> f64,
    pub derivative: fn(f64) -> f64,
    /// Arguments where the function is defined
    pub domain: fn(f64) -> bool,
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

fn everywhere(_: f64) -> bool {
    true
}

pub const EXP: Function = Function {
    name: "exp",
    value: f64::exp,
    derivative: f64::exp,
    domain: everywhere,
};

pub const LN: Function = Function {
    name: "ln",
    value: f64::ln,
    derivative: |x| 1.0 / x,
    domain: |x| x > 0.0,
};

pub const SIN: Function = Function {
    name: "sin",
    value: f64::sin,
    derivative: f64::cos,
    domain: everywhere,
};

pub const COS: Function = Function {
    name: "cos",
    value: f64::cos,
    derivative: |x| -x.sin(),
    domain: everywhere,
};

pub const TAN: Function = Function {
    name: "tan",
    value: f64::tan,
    derivative: |x| 1.0 / (x.cos() * x.cos()),
    domain: |x| x.cos() != 0.0,
};

pub const ASIN: Function = Function {
    name: "asin",
    value: f64::asin,
    derivative: |x| 1.0 / (1.0 - x * x).sqrt(),
    domain: |x| (-1.0..=1.0).contains(&x),
};

pub const ACOS: Function = Function {
    name: "acos",
    value: f64::acos,
    derivative: |x| -1.0 / (1.0 - x * x).sqrt(),
    domain: |x| (-1.0..=1.0).contains(&x),
};

pub const ATAN: Function = Function {
    name: "atan",
    value: f64::atan,
    derivative: |x| 1.0 / (1.0 + x * x),
    domain: everywhere,
};

pub const SINH: Function = Function {
    name: "sinh",
    value: f64::sinh,
    derivative: f64::cosh,
    domain: everywhere,
};

pub const COSH: Function = Function {
    name: "cosh",
    value: f64::cosh,
    derivative: f64::sinh,
    domain: everywhere,
};

pub const TANH: Function = Function {
    name: "tanh",
    value: f64::tanh,
    derivative: |x| 1.0 - x.tanh() * x.tanh(),
    domain: everywhere,
};

pub const ASINH: Function = Function {
    name: "asinh",
    value: f64::asinh,
    derivative: |x| 1.0 / (x * x + 1.0).sqrt(),
    domain: everywhere,
};

pub const ACOSH: Function = Function {
    name: "acosh",
    value: f64::acosh,
    derivative: |x| 1.0 / (x * x - 1.0).sqrt(),
    domain: |x| x >= 1.0,
};

pub const ATANH: Function = Function {
    name: "atanh",
    value: f64::atanh,
    derivative: |x| 1.0 / (1.0 - x * x),
    domain: |x| x > -1.0 && x < 1.0,
};
