// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with grism dispersion transforms.

use itertools::Itertools;
use thiserror::Error;

use super::DispersionAxis;
use crate::math::SolveError;

#[derive(Error, Debug)]
pub enum GrismError {
    #[error("Dispersion order {got} is not calibrated; available orders are {}", .available.iter().join(", "))]
    InvalidOrder { got: i32, available: Vec<i32> },

    #[error("A dispersion model needs at least one calibrated order")]
    NoOrders,

    #[error("The slit is {slit:?}-dispersed but the model disperses along {model:?}")]
    AxisMismatch {
        slit: DispersionAxis,
        model: DispersionAxis,
    },

    #[error(transparent)]
    Solve(#[from] SolveError),
}
