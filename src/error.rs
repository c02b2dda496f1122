// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all jwst_specwcs-related errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpecWcsError {
    #[error("{0}")]
    Polynomial(#[from] crate::polynomial::PolynomialError),

    #[error("{0}")]
    Grism(#[from] crate::grism::GrismError),

    #[error("{0}")]
    Mrs(#[from] crate::mrs::MrsError),

    #[error("{0}")]
    Solve(#[from] crate::math::SolveError),
}
