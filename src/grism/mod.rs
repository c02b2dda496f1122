// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Grism dispersion transforms for wide-field slitless spectroscopy.

A dispersed exposure smears each source into one trace per spectral order.
The calibration ties three polynomial families together per order: the
trace's x offset and y offset as functions of a trace parameter `t` in
[0, 1], and the wavelength as a function of `t`. The forward transform
recovers `t` from a pixel's offset along the dispersion axis and maps it to
wavelength; the backward transform starts from a wavelength, recovers `t`
from the inverse wavelength fit, and rebuilds the pixel position from the
offset families.

Requesting an order with no calibration fails eagerly with
[`GrismError::InvalidOrder`]. Coordinates outside a model's bounding box
evaluate to NaN, never an error, so array evaluation stays branch-free.
 */

mod error;
#[cfg(test)]
mod tests;

pub use error::GrismError;

use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use ndarray::{prelude::*, FoldWhile, Zip};
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString, IntoStaticStr};
use vec1::Vec1;

use crate::{
    math::SolveError,
    polynomial::{Polynomial1d, Polynomial2d},
    wcs::BoundingBox,
};

/// The detector axis along which a grism disperses light.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString, IntoStaticStr,
)]
pub enum DispersionAxis {
    Row,
    Column,
}

/// One of the per-order offset polynomial families.
///
/// The two JWST slitless instruments calibrate their traces differently.
/// NIRCam fits a single 1-D polynomial relating the dispersion-axis offset
/// and the trace parameter directly. NIRISS instead fits each *coefficient*
/// of the offset-vs-parameter polynomial as a 2-D polynomial of the source
/// position, so the offset relation `offset(t) = c0(x0,y0) + c1(x0,y0) t +
/// ...` has to be inverted for `t`; NIRISS fits are valid only on t in
/// [0, 1] and are clamped to that interval in the forward direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TracePolynomial {
    /// Direct 1-D fit between offset and trace parameter (NIRCam style).
    Direct(Polynomial1d),

    /// Coefficient-family fit: element i is the 2-D polynomial giving the
    /// t^i coefficient of the offset relation at a source position (NIRISS
    /// style).
    Parametric(Vec1<Polynomial2d>),
}

impl TracePolynomial {
    /// Reduce this family to a concrete offset relation for one source
    /// position. The relation is what maps per-pixel offsets to trace
    /// parameters in the forward direction.
    fn forward_relation(&self, x0: f64, y0: f64) -> Result<OffsetRelation, SolveError> {
        match self {
            TracePolynomial::Direct(p) => Ok(OffsetRelation::Direct(p)),
            TracePolynomial::Parametric(coeff_models) => {
                let coeffs: Vec<f64> = coeff_models.iter().map(|p| p.evaluate(x0, y0)).collect();
                match coeffs.as_slice() {
                    [c0, c1] => {
                        if c1.abs() < f64::EPSILON {
                            return Err(SolveError::FlatDerivative { at: 0.0 });
                        }
                        Ok(OffsetRelation::Linear { c0: *c0, c1: *c1 })
                    }
                    _ => Ok(OffsetRelation::Fitted(Polynomial1d::from_coeffs(coeffs))),
                }
            }
        }
    }

    /// The dispersion-axis offset at trace parameter `t` (the backward
    /// direction). For the parametric flavor the coefficient families are
    /// evaluated at the supplied detector position.
    fn offset(&self, t: f64, x: f64, y: f64) -> f64 {
        match self {
            TracePolynomial::Direct(p) => p.evaluate(t),
            TracePolynomial::Parametric(coeff_models) => coeff_models
                .iter()
                .enumerate()
                .map(|(i, p)| p.evaluate(x, y) * t.powi(i as i32))
                .sum(),
        }
    }
}

/// A [`TracePolynomial`] reduced to one source position.
enum OffsetRelation<'a> {
    /// `t = p(offset)`.
    Direct(&'a Polynomial1d),

    /// `offset = c0 + c1 t`, inverted in closed form. `c1` is non-zero.
    Linear { c0: f64, c1: f64 },

    /// Higher order in `t`; inverted by bounded Newton iteration per pixel.
    Fitted(Polynomial1d),
}

impl OffsetRelation<'_> {
    fn parameter(&self, offset: f64) -> Result<f64, SolveError> {
        if !offset.is_finite() {
            return Ok(f64::NAN);
        }
        match self {
            OffsetRelation::Direct(p) => Ok(p.evaluate(offset)),
            OffsetRelation::Linear { c0, c1 } => Ok(((offset - c0) / c1).clamp(0.0, 1.0)),
            OffsetRelation::Fitted(p) => Ok(p.solve(offset, 0.5)?.clamp(0.0, 1.0)),
        }
    }

    /// Whether [`OffsetRelation::parameter`] can fail for finite input.
    fn is_fallible(&self) -> bool {
        matches!(self, OffsetRelation::Fitted(_))
    }
}

/// The calibrated polynomial triple for one spectral order.
///
/// In a forward model, `wavelength` maps the trace parameter to wavelength.
/// In a backward model the same slot holds the independently fitted inverse
/// (wavelength to trace parameter), and the offset families run from
/// parameter to offset; the calibration pipeline supplies both fits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrismOrderModel {
    pub x: TracePolynomial,
    pub y: TracePolynomial,
    pub wavelength: Polynomial1d,
}

fn order_model<'a>(
    models: &'a IndexMap<i32, GrismOrderModel>,
    order: i32,
) -> Result<&'a GrismOrderModel, GrismError> {
    models.get(&order).ok_or_else(|| GrismError::InvalidOrder {
        got: order,
        available: models.keys().copied().collect(),
    })
}

/// Detector position and source position to wavelength.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardDispersion {
    axis: DispersionAxis,
    models: IndexMap<i32, GrismOrderModel>,
    bounding_box: Option<BoundingBox>,
}

impl ForwardDispersion {
    /// Create a forward dispersion model from per-order calibration. At
    /// least one order must be present.
    pub fn new(
        axis: DispersionAxis,
        models: IndexMap<i32, GrismOrderModel>,
    ) -> Result<ForwardDispersion, GrismError> {
        if models.is_empty() {
            return Err(GrismError::NoOrders);
        }
        debug!(
            "Forward {:?}-dispersion model calibrated for orders {}",
            axis,
            models.keys().join(", ")
        );
        Ok(ForwardDispersion {
            axis,
            models,
            bounding_box: None,
        })
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> ForwardDispersion {
        self.bounding_box = Some(bounding_box);
        self
    }

    pub fn axis(&self) -> DispersionAxis {
        self.axis
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    pub fn supported_orders(&self) -> impl Iterator<Item = i32> + '_ {
        self.models.keys().copied()
    }

    fn in_domain(&self, x: f64, y: f64) -> bool {
        self.bounding_box.map_or(true, |b| b.contains(x, y))
    }

    /// The wavelength seen at detector pixel (x, y) along the trace of the
    /// source at (x0, y0) in the given order.
    ///
    /// Returns NaN if (x, y) falls outside the model's bounding box.
    pub fn wavelength_at(
        &self,
        x: f64,
        y: f64,
        x0: f64,
        y0: f64,
        order: i32,
    ) -> Result<f64, GrismError> {
        let model = order_model(&self.models, order)?;
        if !self.in_domain(x, y) {
            return Ok(f64::NAN);
        }
        let (offset, trace) = match self.axis {
            DispersionAxis::Row => (x - x0, &model.x),
            DispersionAxis::Column => (y - y0, &model.y),
        };
        let t = trace.forward_relation(x0, y0)?.parameter(offset)?;
        Ok(model.wavelength.evaluate(t))
    }

    /// [`ForwardDispersion::wavelength_at`] over coordinate arrays of equal
    /// shape, with one source position and order for the whole call. The
    /// order is validated once, before any pixel is touched.
    pub fn wavelength_grid(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        x0: f64,
        y0: f64,
        order: i32,
    ) -> Result<Array2<f64>, GrismError> {
        let model = order_model(&self.models, order)?;
        let trace = match self.axis {
            DispersionAxis::Row => &model.x,
            DispersionAxis::Column => &model.y,
        };
        let relation = trace.forward_relation(x0, y0)?;

        let pixel = |xv: f64, yv: f64| -> Result<f64, SolveError> {
            if !self.in_domain(xv, yv) {
                return Ok(f64::NAN);
            }
            let offset = match self.axis {
                DispersionAxis::Row => xv - x0,
                DispersionAxis::Column => yv - y0,
            };
            Ok(model.wavelength.evaluate(relation.parameter(offset)?))
        };

        let mut out = Array2::from_elem(x.raw_dim(), f64::NAN);
        if relation.is_fallible() {
            // Per-pixel Newton solves can fail, so stay serial and bail on
            // the first failure.
            let result = Zip::from(&mut out).and(&x).and(&y).fold_while(
                Ok(()),
                |acc: Result<(), SolveError>, w, &xv, &yv| match pixel(xv, yv) {
                    Ok(v) => {
                        *w = v;
                        FoldWhile::Continue(acc)
                    }
                    Err(e) => FoldWhile::Done(Err(e)),
                },
            );
            result.into_inner()?;
        } else {
            Zip::from(&mut out)
                .and(&x)
                .and(&y)
                .par_for_each(|w, &xv, &yv| *w = pixel(xv, yv).unwrap_or(f64::NAN));
        }
        Ok(out)
    }
}

/// Detector position and wavelength back to the trace pixel.
///
/// The offset families here map the trace parameter to offsets, and the
/// wavelength polynomial is the calibration's inverse fit (wavelength to
/// trace parameter); see [`GrismOrderModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackwardDispersion {
    models: IndexMap<i32, GrismOrderModel>,
    bounding_box: Option<BoundingBox>,
}

impl BackwardDispersion {
    pub fn new(models: IndexMap<i32, GrismOrderModel>) -> Result<BackwardDispersion, GrismError> {
        if models.is_empty() {
            return Err(GrismError::NoOrders);
        }
        debug!(
            "Backward dispersion model calibrated for orders {}",
            models.keys().join(", ")
        );
        Ok(BackwardDispersion {
            models,
            bounding_box: None,
        })
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> BackwardDispersion {
        self.bounding_box = Some(bounding_box);
        self
    }

    pub fn supported_orders(&self) -> impl Iterator<Item = i32> + '_ {
        self.models.keys().copied()
    }

    fn in_domain(&self, x: f64, y: f64) -> bool {
        self.bounding_box.map_or(true, |b| b.contains(x, y))
    }

    /// The detector pixel at which the given wavelength lands, for a source
    /// whose direct image sits at (x, y) in the given order.
    ///
    /// Returns NaN coordinates if (x, y) falls outside the model's bounding
    /// box.
    pub fn detector_position(
        &self,
        x: f64,
        y: f64,
        wavelength: f64,
        order: i32,
    ) -> Result<(f64, f64), GrismError> {
        let model = order_model(&self.models, order)?;
        if !self.in_domain(x, y) {
            return Ok((f64::NAN, f64::NAN));
        }
        let t = model.wavelength.evaluate(wavelength);
        let xdx = x + model.x.offset(t, x, y);
        let ydy = y + model.y.offset(t, x, y);
        Ok((xdx, ydy))
    }

    /// [`BackwardDispersion::detector_position`] over arrays of equal
    /// shape, with a per-pixel wavelength and one order for the whole call.
    pub fn detector_position_grid(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        wavelength: ArrayView2<f64>,
        order: i32,
    ) -> Result<(Array2<f64>, Array2<f64>), GrismError> {
        let model = order_model(&self.models, order)?;
        let mut xdx = Array2::from_elem(x.raw_dim(), f64::NAN);
        let mut ydy = Array2::from_elem(x.raw_dim(), f64::NAN);
        Zip::from(&mut xdx)
            .and(&mut ydy)
            .and(&x)
            .and(&y)
            .and(&wavelength)
            .par_for_each(|wx, wy, &xv, &yv, &lam| {
                if !self.in_domain(xv, yv) {
                    return;
                }
                let t = model.wavelength.evaluate(lam);
                *wx = xv + model.x.offset(t, xv, yv);
                *wy = yv + model.y.offset(t, xv, yv);
            });
        Ok((xdx, ydy))
    }
}
