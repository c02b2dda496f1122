// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with polynomial model construction.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolynomialError {
    #[error("A degree-{degree} 1-D polynomial needs {expected} coefficients, but {got} were supplied")]
    CoefficientCount1d {
        degree: usize,
        expected: usize,
        got: usize,
    },

    #[error("A degree-{degree} 2-D polynomial needs {expected} coefficients, but {got} were supplied")]
    CoefficientCount2d {
        degree: usize,
        expected: usize,
        got: usize,
    },
}
