// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests against the instrument teams' reference dispersion solutions. The
//! expected grids below come from the calibration data for a source at
//! (913.7, 15.5) in order 1.

use std::str::FromStr;

use approx::assert_abs_diff_eq;
use indexmap::indexmap;
use ndarray::prelude::*;
use vec1::vec1;

use super::*;

const X0: f64 = 913.7;
const Y0: f64 = 15.5;

fn p1(coeffs: &[f64]) -> Polynomial1d {
    Polynomial1d::new(coeffs.len() - 1, coeffs.to_vec()).unwrap()
}

fn p2(coeffs: &[f64]) -> Polynomial2d {
    Polynomial2d::new(2, coeffs.to_vec()).unwrap()
}

fn p2_const(c: f64) -> Polynomial2d {
    Polynomial2d::new(0, vec![c]).unwrap()
}

fn zero_trace() -> TracePolynomial {
    TracePolynomial::Direct(p1(&[0.0, 0.0]))
}

/// The NIRCam-style forward model from the reference tests: direct 1-D
/// trace fits per order, wavelength 2.4 + 2.6 t.
fn nircam_forward_row() -> ForwardDispersion {
    let models = indexmap! {
        1 => GrismOrderModel {
            x: TracePolynomial::Direct(p1(&[0.59115385, 0.00038615])),
            y: zero_trace(),
            wavelength: p1(&[2.4, 2.6]),
        },
        2 => GrismOrderModel {
            x: TracePolynomial::Direct(p1(&[-0.16596154, 0.00019308])),
            y: zero_trace(),
            wavelength: p1(&[2.4, 2.6]),
        },
    };
    ForwardDispersion::new(DispersionAxis::Row, models).unwrap()
}

fn nircam_forward_column() -> ForwardDispersion {
    let models = indexmap! {
        1 => GrismOrderModel {
            x: zero_trace(),
            y: TracePolynomial::Direct(p1(&[0.5911538461431823, 0.000386153846153726])),
            wavelength: p1(&[2.4, 2.6]),
        },
        2 => GrismOrderModel {
            x: zero_trace(),
            y: TracePolynomial::Direct(p1(&[-0.1659615384582264, 0.0001930769230768787])),
            wavelength: p1(&[2.4, 2.6]),
        },
    };
    ForwardDispersion::new(DispersionAxis::Column, models).unwrap()
}

/// The matching backward model: offset fits run from trace parameter to
/// offset, and the wavelength slot holds the inverse fit.
fn nircam_backward() -> BackwardDispersion {
    let models = indexmap! {
        1 => GrismOrderModel {
            x: zero_trace(),
            y: TracePolynomial::Direct(p1(&[-1530.8764939967652, 2589.641434263754])),
            wavelength: p1(&[-0.923076923076923, 0.3846153846153846]),
        },
        2 => GrismOrderModel {
            x: zero_trace(),
            y: TracePolynomial::Direct(p1(&[859.5617529710912, 5179.282868527087])),
            wavelength: p1(&[-0.923076923076923, 0.3846153846153846]),
        },
    };
    BackwardDispersion::new(models).unwrap()
}

/// The NIRISS-style order-1 coefficient families: each t-coefficient of
/// the offset relation is a 2-D polynomial of position.
fn niriss_x_family() -> TracePolynomial {
    TracePolynomial::Parametric(vec1![
        p2(&[
            63.55173,
            3.846599e-06,
            -7.173816e-10,
            8.158127e-07,
            -1.274281e-09,
            4.098804e-11,
        ]),
        p2(&[
            -331.8532,
            -1.24494e-05,
            4.210112e-10,
            -1.615311e-06,
            6.665276e-09,
            1.43762e-10,
        ]),
    ])
}

fn niriss_y_family() -> TracePolynomial {
    TracePolynomial::Parametric(vec1![
        p2(&[
            -1.876215,
            -5.179793e-04,
            2.116366e-08,
            -2.259297e-04,
            -2.502127e-12,
            4.771951e-08,
        ]),
        p2(&[
            -3.089115,
            3.063270e-03,
            -9.786785e-07,
            1.237905e-03,
            -1.510774e-11,
            -5.405480e-09,
        ]),
    ])
}

fn niriss_forward(axis: DispersionAxis) -> ForwardDispersion {
    let models = indexmap! {
        1 => GrismOrderModel {
            x: niriss_x_family(),
            y: niriss_y_family(),
            wavelength: p1(&[0.75, 1.55]),
        },
    };
    ForwardDispersion::new(axis, models).unwrap()
}

fn niriss_backward() -> BackwardDispersion {
    let models = indexmap! {
        1 => GrismOrderModel {
            x: niriss_x_family(),
            y: niriss_y_family(),
            wavelength: p1(&[-0.48387097, 0.64516129]),
        },
    };
    BackwardDispersion::new(models).unwrap()
}

fn grid(x: (f64, f64), y: (f64, f64)) -> (Array2<f64>, Array2<f64>) {
    crate::wcs::BoundingBox::new(x, y).grid()
}

#[test]
fn test_nircam_forward_row() {
    let model = nircam_forward_row();
    let (x, y) = grid((20.0, 25.0), (800.0, 805.0));

    let per_column = [
        3.03973415, 3.04073814, 3.04174213, 3.04274612, 3.04375011, 3.0447541,
    ];
    let expected = Array2::from_shape_fn((6, 6), |(_, j)| per_column[j]);

    let wavelength = model
        .wavelength_grid(x.view(), y.view(), X0, Y0, 1)
        .unwrap();
    assert_abs_diff_eq!(wavelength, expected, epsilon = 1e-6);
}

#[test]
fn test_nircam_forward_column() {
    let model = nircam_forward_column();
    let (x, y) = grid((20.0, 25.0), (800.0, 805.0));

    let per_row = [4.724638, 4.725642, 4.726646, 4.72765, 4.728654, 4.729658];
    let expected = Array2::from_shape_fn((6, 6), |(i, _)| per_row[i]);

    let wavelength = model
        .wavelength_grid(x.view(), y.view(), X0, Y0, 1)
        .unwrap();
    assert_abs_diff_eq!(wavelength, expected, epsilon = 1e-6);
}

#[test]
fn test_nircam_backward() {
    let model = nircam_backward();
    let (x, y) = grid((20.0, 25.0), (800.0, 805.0));

    let per_row = [4.724638, 4.725642, 4.726646, 4.72765, 4.728654, 4.729658];
    let wavelength = Array2::from_shape_fn((6, 6), |(i, _)| per_row[i]);

    let (xdx, ydy) = model
        .detector_position_grid(x.view(), y.view(), wavelength.view(), 1)
        .unwrap();

    let expected_xdx = Array2::from_shape_fn((6, 6), |(_, j)| 20.0 + j as f64);
    let expected_ydy = Array2::from_shape_fn((6, 6), |(i, _)| 1584.50000003 + 2.0 * i as f64);
    assert_abs_diff_eq!(xdx, expected_xdx, epsilon = 1e-6);
    assert_abs_diff_eq!(ydy, expected_ydy, epsilon = 1e-6);
}

#[test]
fn test_nircam_round_trip() {
    // The forward and backward fits are mutual inverses; going back and
    // forth must agree to well within the calibration tolerance.
    let forward = nircam_forward_column();
    let backward = nircam_backward();

    for &lam in &[4.72, 4.725, 4.7296] {
        let (x, y) = backward.detector_position(X0, Y0, lam, 1).unwrap();
        let recovered = forward.wavelength_at(x, y, X0, Y0, 1).unwrap();
        assert_abs_diff_eq!(recovered, lam, epsilon = 1e-5);
    }
}

#[test]
fn test_niriss_forward_row() {
    let model = niriss_forward(DispersionAxis::Row);
    let (x, y) = grid((910.0, 916.0), (12.0, 18.0));

    let per_column = [
        1.06411857, 1.05944798, 1.0547774, 1.05010681, 1.04543623, 1.04076564, 1.03609506,
    ];
    let expected = Array2::from_shape_fn((7, 7), |(_, j)| per_column[j]);

    let wavelength = model
        .wavelength_grid(x.view(), y.view(), X0, Y0, 1)
        .unwrap();
    assert_abs_diff_eq!(wavelength, expected, epsilon = 1e-6);
}

#[test]
fn test_niriss_forward_column_clamps_trace_ends() {
    let model = niriss_forward(DispersionAxis::Column);
    let (x, y) = grid((910.0, 916.0), (12.0, 18.0));

    // Rows past the fitted trace clamp to the wavelength-model endpoints
    // (t = 1 at the first row, t = 0 from the third on).
    let per_row = [2.3, 0.98553179, 0.75, 0.75, 0.75, 0.75, 0.75];
    let expected = Array2::from_shape_fn((7, 7), |(i, _)| per_row[i]);

    let wavelength = model
        .wavelength_grid(x.view(), y.view(), X0, Y0, 1)
        .unwrap();
    assert_abs_diff_eq!(wavelength, expected, epsilon = 1e-6);
}

#[test]
fn test_niriss_backward() {
    let model = niriss_backward();
    let (x, y) = grid((910.0, 916.0), (12.0, 18.0));

    let per_row = [2.3, 0.98553179, 0.75, 0.75, 0.75, 0.75, 0.75];
    let wavelength = Array2::from_shape_fn((7, 7), |(i, _)| per_row[i]);

    let (xdx, ydy) = model
        .detector_position_grid(x.view(), y.view(), wavelength.view(), 1)
        .unwrap();

    // Spot checks against the reference solution.
    assert_abs_diff_eq!(xdx[(0, 0)], 641.69045022, epsilon = 1e-6);
    assert_abs_diff_eq!(xdx[(1, 0)], 923.12589407, epsilon = 1e-6);
    assert_abs_diff_eq!(xdx[(6, 6)], 979.55466734, epsilon = 1e-6);
    assert_abs_diff_eq!(ydy[(0, 0)], 8.57057227, epsilon = 1e-6);
    assert_abs_diff_eq!(ydy[(2, 0)], 11.6673944, epsilon = 1e-6);
    assert_abs_diff_eq!(ydy[(6, 6)], 15.66379352, epsilon = 1e-6);
}

#[test]
fn test_invalid_order() {
    let forward = nircam_forward_row();
    let result = forward.wavelength_at(20.0, 800.0, X0, Y0, 3);
    assert!(matches!(
        result,
        Err(GrismError::InvalidOrder { got: 3, .. })
    ));

    let (x, y) = grid((20.0, 25.0), (800.0, 805.0));
    let result = forward.wavelength_grid(x.view(), y.view(), X0, Y0, 3);
    assert!(matches!(
        result,
        Err(GrismError::InvalidOrder { got: 3, .. })
    ));

    let backward = nircam_backward();
    let result = backward.detector_position(X0, Y0, 4.72, -1);
    assert!(matches!(
        result,
        Err(GrismError::InvalidOrder { got: -1, .. })
    ));
}

#[test]
fn test_no_orders() {
    let result = ForwardDispersion::new(DispersionAxis::Row, indexmap! {});
    assert!(matches!(result, Err(GrismError::NoOrders)));
}

#[test]
fn test_bounding_box_yields_nan() {
    let model = nircam_forward_row()
        .with_bounding_box(crate::wcs::BoundingBox::new((20.0, 25.0), (800.0, 805.0)));

    // Inside: a real wavelength. Outside: NaN, but no error.
    let inside = model.wavelength_at(20.0, 800.0, X0, Y0, 1).unwrap();
    assert_abs_diff_eq!(inside, 3.03973415, epsilon = 1e-6);
    let outside = model.wavelength_at(30.0, 802.0, X0, Y0, 1).unwrap();
    assert!(outside.is_nan());

    // NaN input coordinates come back as NaN, even without a box.
    let nan_in = nircam_forward_row()
        .wavelength_at(f64::NAN, 800.0, X0, Y0, 1)
        .unwrap();
    assert!(nan_in.is_nan());
}

#[test]
fn test_quadratic_offset_relation() {
    // A 3-coefficient family needs the Newton path: offset(t) = t + 0.1 t^2
    // and wavelength(t) = t, so the wavelength at offset 0.55 is the
    // positive root of 0.1 t^2 + t - 0.55.
    let models = indexmap! {
        1 => GrismOrderModel {
            x: TracePolynomial::Parametric(vec1![p2_const(0.0), p2_const(1.0), p2_const(0.1)]),
            y: zero_trace(),
            wavelength: p1(&[0.0, 1.0]),
        },
    };
    let model = ForwardDispersion::new(DispersionAxis::Row, models).unwrap();

    let t = model.wavelength_at(0.55, 0.0, 0.0, 0.0, 1).unwrap();
    assert_abs_diff_eq!(t, 0.5226805085936304, epsilon = 1e-10);

    // The serial grid path takes the same route.
    let x = array![[0.55, 0.0]];
    let y = array![[0.0, 0.0]];
    let grid = model.wavelength_grid(x.view(), y.view(), 0.0, 0.0, 1).unwrap();
    assert_abs_diff_eq!(grid[(0, 0)], 0.5226805085936304, epsilon = 1e-10);
    assert_abs_diff_eq!(grid[(0, 1)], 0.0, epsilon = 1e-10);
}

#[test]
fn test_flat_coefficient_family_fails() {
    // A parametric family whose t coefficient is identically zero can't be
    // inverted for t.
    let models = indexmap! {
        1 => GrismOrderModel {
            x: TracePolynomial::Parametric(vec1![p2_const(1.0), p2_const(0.0)]),
            y: zero_trace(),
            wavelength: p1(&[0.75, 1.55]),
        },
    };
    let model = ForwardDispersion::new(DispersionAxis::Row, models).unwrap();
    let result = model.wavelength_at(910.0, 12.0, X0, Y0, 1);
    assert!(matches!(result, Err(GrismError::Solve(_))));
}

#[test]
fn test_dispersion_axis_from_str() {
    assert_eq!(DispersionAxis::from_str("Row").unwrap(), DispersionAxis::Row);
    assert_eq!(
        DispersionAxis::from_str("Column").unwrap(),
        DispersionAxis::Column
    );
    assert!(DispersionAxis::from_str("Diagonal").is_err());
}

#[test]
fn test_forward_model_serde_round_trip() {
    let model = nircam_forward_row();
    let json = serde_json::to_string(&model).unwrap();
    let restored: ForwardDispersion = serde_json::from_str(&json).unwrap();

    let a = model.wavelength_at(20.0, 800.0, X0, Y0, 1).unwrap();
    let b = restored.wavelength_at(20.0, 800.0, X0, Y0, 1).unwrap();
    assert_abs_diff_eq!(a, b);
}
