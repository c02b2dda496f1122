// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Bounding boxes, evaluation grids and per-slit helpers.

Every transform in this crate declares the coordinate domain its
calibration is valid over as a [`BoundingBox`]. Inputs outside the box
evaluate to NaN -- deliberately not an error -- so that batch evaluation
over whole detector arrays needs no per-pixel branching and downstream
consumers can filter on NaN. Chained transforms must not re-evaluate on
NaN data; the composition helpers here and in [`crate::mrs`] check before
running later stages.
 */


use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::grism::{DispersionAxis, ForwardDispersion, GrismError};

/// The valid input domain of a transform: an inclusive (min, max) range per
/// detector axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl BoundingBox {
    pub fn new(x: (f64, f64), y: (f64, f64)) -> BoundingBox {
        BoundingBox { x, y }
    }

    /// Whether (x, y) lies inside the box. NaN coordinates are outside by
    /// definition.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x.0 && x <= self.x.1 && y >= self.y.0 && y <= self.y.1
    }

    /// The inclusive unit-step evaluation grid over the box: a pair of
    /// arrays holding the x and y coordinate of every grid point, with x
    /// varying along columns and y along rows.
    pub fn grid(&self) -> (Array2<f64>, Array2<f64>) {
        let nx = (self.x.1 - self.x.0).floor() as usize + 1;
        let ny = (self.y.1 - self.y.0).floor() as usize + 1;
        let x = Array2::from_shape_fn((ny, nx), |(_, j)| self.x.0 + j as f64);
        let y = Array2::from_shape_fn((ny, nx), |(i, _)| self.y.0 + i as f64);
        (x, y)
    }
}

/// One source's spectral trace in a dispersed exposure: where the source
/// sits on the direct image, which order this trace belongs to, and the
/// detector region the trace was cut out from. Immutable once created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlitTrace {
    pub source_x0: f64,
    pub source_y0: f64,
    pub order: i32,
    pub dispersion_axis: DispersionAxis,
    pub bounding_box: BoundingBox,
}

/// Evaluate a forward dispersion model over a slit's bounding-box grid,
/// giving the wavelength at every pixel of the cutout.
///
/// The slit's dispersion axis must match the model's; the slit's order is
/// validated before any pixel is evaluated.
pub fn compute_wavelength_array(
    slit: &SlitTrace,
    model: &ForwardDispersion,
) -> Result<Array2<f64>, GrismError> {
    if slit.dispersion_axis != model.axis() {
        return Err(GrismError::AxisMismatch {
            slit: slit.dispersion_axis,
            model: model.axis(),
        });
    }
    let (x, y) = slit.bounding_box.grid();
    model.wavelength_grid(x.view(), y.view(), slit.source_x0, slit.source_y0, slit.order)
}
