// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
1-D and 2-D polynomial models.

These mirror the coefficient conventions of the calibration pipeline's
reference files: a 1-D polynomial is `c0 + c1 x + ... + cn x^n`, and a 2-D
polynomial of degree n carries one coefficient per term `x^i y^j` with
`i + j <= n`, ordered pure-x first, then pure-y, then cross terms (for
degree 2: `c0_0, c1_0, c2_0, c0_1, c0_2, c1_1`).

A mismatch between the declared degree and the number of coefficients is a
configuration error and is caught at construction; evaluation itself cannot
fail.
 */

mod error;

pub use error::PolynomialError;

use serde::{Deserialize, Serialize};

use crate::math::{newton_solve, SolveError};

/// A 1-D polynomial with coefficients in ascending order (`c0` first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial1d {
    coeffs: Vec<f64>,
}

impl Polynomial1d {
    /// Create a polynomial of the given degree. `coeffs` must have exactly
    /// `degree + 1` elements.
    pub fn new(degree: usize, coeffs: Vec<f64>) -> Result<Polynomial1d, PolynomialError> {
        if coeffs.len() != degree + 1 {
            return Err(PolynomialError::CoefficientCount1d {
                degree,
                expected: degree + 1,
                got: coeffs.len(),
            });
        }
        Ok(Polynomial1d { coeffs })
    }

    /// Create a polynomial from a non-empty coefficient vector, inferring
    /// the degree from its length.
    pub(crate) fn from_coeffs(coeffs: Vec<f64>) -> Polynomial1d {
        debug_assert!(!coeffs.is_empty());
        Polynomial1d { coeffs }
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Horner evaluation.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }

    /// The derivative polynomial. The derivative of a constant is the zero
    /// constant.
    pub fn derivative(&self) -> Polynomial1d {
        if self.coeffs.len() == 1 {
            return Polynomial1d { coeffs: vec![0.0] };
        }
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &c)| i as f64 * c)
            .collect();
        Polynomial1d { coeffs }
    }

    /// Solve `p(x) = target` for x.
    ///
    /// A linear polynomial is inverted in closed form. Anything higher
    /// degree goes through bounded Newton iteration from `guess`, which
    /// fails with [`SolveError::NoConvergence`] if the polynomial is not
    /// usefully monotonic around the root.
    pub fn solve(&self, target: f64, guess: f64) -> Result<f64, SolveError> {
        match self.coeffs.as_slice() {
            [_] => Err(SolveError::FlatDerivative { at: guess }),
            [c0, c1] => {
                if c1.abs() < f64::EPSILON {
                    return Err(SolveError::FlatDerivative { at: guess });
                }
                Ok((target - c0) / c1)
            }
            _ => {
                let derivative = self.derivative();
                newton_solve(
                    |x| self.evaluate(x),
                    |x| derivative.evaluate(x),
                    target,
                    guess,
                )
            }
        }
    }
}

/// A 2-D polynomial of declared degree, with astropy `Polynomial2D`
/// coefficient ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial2d {
    degree: usize,
    coeffs: Vec<f64>,
}

impl Polynomial2d {
    /// Create a polynomial of the given degree. A degree-n 2-D polynomial
    /// has `(n + 1)(n + 2) / 2` coefficients.
    pub fn new(degree: usize, coeffs: Vec<f64>) -> Result<Polynomial2d, PolynomialError> {
        let expected = (degree + 1) * (degree + 2) / 2;
        if coeffs.len() != expected {
            return Err(PolynomialError::CoefficientCount2d {
                degree,
                expected,
                got: coeffs.len(),
            });
        }
        Ok(Polynomial2d { degree, coeffs })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// The (i, j) exponents of each term, in coefficient order: pure-x
    /// terms first, then pure-y, then cross terms with ascending i.
    fn term_exponents(degree: usize) -> impl Iterator<Item = (usize, usize)> {
        let pure_x = (0..=degree).map(|i| (i, 0));
        let pure_y = (1..=degree).map(move |j| (0, j));
        let cross = (1..=degree).flat_map(move |i| (1..=degree - i).map(move |j| (i, j)));
        pure_x.chain(pure_y).chain(cross)
    }

    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        Self::term_exponents(self.degree)
            .zip(self.coeffs.iter())
            .map(|((i, j), &c)| c * x.powi(i as i32) * y.powi(j as i32))
            .sum()
    }
}
