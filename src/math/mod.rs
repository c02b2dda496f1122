// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Root finding for polynomial inversion.


use thiserror::Error;

use crate::constants::{MAX_SOLVER_ITERATIONS, SOLVER_TOLERANCE};

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("Inversion did not converge within {iterations} iterations (last step was {last_step:e})")]
    NoConvergence { iterations: usize, last_step: f64 },

    #[error("Inversion stalled on a vanishing derivative at t = {at}")]
    FlatDerivative { at: f64 },
}

/// Solve `f(t) = target` by Newton iteration starting from `guess`.
///
/// Iteration is bounded by [`MAX_SOLVER_ITERATIONS`]; a vanishing derivative
/// or an exhausted budget fails deterministically rather than looping. The
/// dispersion relations this inverts are low-order and smooth, so in
/// practice this converges in a few steps or not at all.
pub fn newton_solve<F, D>(f: F, df: D, target: f64, guess: f64) -> Result<f64, SolveError>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let mut t = guess;
    let mut last_step = f64::INFINITY;
    for _ in 0..MAX_SOLVER_ITERATIONS {
        let slope = df(t);
        if slope.abs() < f64::EPSILON {
            return Err(SolveError::FlatDerivative { at: t });
        }
        let step = (f(t) - target) / slope;
        t -= step;
        if step.abs() < SOLVER_TOLERANCE {
            return Ok(t);
        }
        last_step = step;
    }

    Err(SolveError::NoConvergence {
        iterations: MAX_SOLVER_ITERATIONS,
        last_step,
    })
}
