// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Spectroscopic WCS transform models for JWST slitless and IFU spectroscopy.

Two families of transforms live here. The grism dispersion models map a
source's direct-image position and a spectral order to the wavelength seen
at any detector pixel along the trace (and back again). The MIRI MRS models
map detector pixels within an IFU slice to local alpha/beta coordinates and
wavelength, then on to telescope-frame V2/V3.

All models are pure functions of calibration tables that are built once and
read-only thereafter; they can be shared freely across threads. Coordinates
outside a model's bounding box evaluate to NaN rather than an error, so that
whole-array evaluation stays branch-free. See the individual modules for the
details of that contract.
 */

pub mod constants;
mod error;
pub mod grism;
pub(crate) mod math;
pub mod mrs;
pub mod polynomial;
pub mod wcs;

// Re-exports.
pub use error::SpecWcsError;
pub use math::SolveError;
pub use polynomial::{Polynomial1d, Polynomial2d};
pub use wcs::BoundingBox;
