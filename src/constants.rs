// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All calculations are done in double precision; calibration residuals are
typically around 1e-8, so there is no room for single precision anywhere.
 */

/// The maximum number of Newton iterations used when a polynomial has to be
/// inverted numerically. Calibrated dispersion relations are low order and
/// converge in a handful of steps; hitting this bound means the relation is
/// not usefully invertible at the requested value.
pub const MAX_SOLVER_ITERATIONS: usize = 50;

/// Newton iteration stops once the step size falls below this value. The
/// trace parameter spans [0, 1], so this is far below any calibration
/// residual.
pub const SOLVER_TOLERANCE: f64 = 1e-12;

/// MRS slice ids are `channel * 100 + slice_index`. Channels run 1..=4 and
/// per-channel slice indices stay well under 100.
pub const SLICE_ID_CHANNEL_STRIDE: u16 = 100;

/// The value used in per-pixel slice maps for pixels that belong to no
/// slice (gaps between slices, reference pixels). Such pixels evaluate to
/// NaN rather than an error.
pub const UNASSIGNED_SLICE: u16 = 0;
