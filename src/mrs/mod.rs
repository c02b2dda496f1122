// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
MIRI Medium Resolution Spectrometer (MRS) transforms.

The MRS is an integral field unit: the sky is sliced into strips that land
interleaved on the detector. Which slice a pixel belongs to comes from an
externally supplied per-pixel slice map; here each slice is addressed by a
[`SliceId`] encoding `channel * 100 + slice_index`. A per-slice set of 2-D
distortion polynomials maps detector (x, y) to the IFU-local alpha/beta
angles and the wavelength, and a per-channel affine stage carries
alpha/beta on to telescope-frame V2/V3.

The two stages compose strictly left to right. Pixels outside a slice's
bounding box (or carrying the unassigned slice value in a slice map)
evaluate to NaN and the sky stage is skipped for them; looking up a slice
id with no registered model is an error, not NaN.
 */

mod error;

pub use error::MrsError;

use std::fmt;

use indexmap::IndexMap;
use log::debug;
use ndarray::{prelude::*, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    constants::{SLICE_ID_CHANNEL_STRIDE, UNASSIGNED_SLICE},
    polynomial::Polynomial2d,
    wcs::BoundingBox,
};

/// An MRS spectral channel. Channels 1 and 2 share the short-wavelength
/// detector, 3 and 4 the long-wavelength one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Channel {
    One,
    Two,
    Three,
    Four,
}

impl Channel {
    pub fn number(self) -> u16 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
            Channel::Three => 3,
            Channel::Four => 4,
        }
    }
}

impl TryFrom<u16> for Channel {
    type Error = MrsError;

    fn try_from(n: u16) -> Result<Channel, MrsError> {
        match n {
            1 => Ok(Channel::One),
            2 => Ok(Channel::Two),
            3 => Ok(Channel::Three),
            4 => Ok(Channel::Four),
            _ => Err(MrsError::InvalidChannel { got: n }),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// The grating setting of an MRS exposure. Each channel/band pair has its
/// own calibration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Band {
    Short,
    Medium,
    Long,
}

/// A slice address: `channel * 100 + slice_index`, e.g. slice 9 of channel
/// 2 is id 209. Decoding is the exact inverse of encoding; both are
/// validated so a [`SliceId`] always holds a well-formed id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct SliceId(u16);

impl SliceId {
    /// Encode a channel and a per-channel slice index. Indices run from 1;
    /// 0 is reserved for [`UNASSIGNED_SLICE`].
    pub fn new(channel: Channel, slice_index: u16) -> Result<SliceId, MrsError> {
        if slice_index == 0 || slice_index >= SLICE_ID_CHANNEL_STRIDE {
            return Err(MrsError::SliceIndexOutOfRange { index: slice_index });
        }
        Ok(SliceId(
            channel.number() * SLICE_ID_CHANNEL_STRIDE + slice_index,
        ))
    }

    pub fn id(self) -> u16 {
        self.0
    }

    pub fn channel(self) -> Channel {
        match Channel::try_from(self.0 / SLICE_ID_CHANNEL_STRIDE) {
            Ok(channel) => channel,
            // Both constructors validate the channel part.
            Err(_) => unreachable!("SliceId holds a validated id"),
        }
    }

    pub fn slice_index(self) -> u16 {
        self.0 % SLICE_ID_CHANNEL_STRIDE
    }
}

impl TryFrom<u16> for SliceId {
    type Error = MrsError;

    fn try_from(id: u16) -> Result<SliceId, MrsError> {
        let channel = Channel::try_from(id / SLICE_ID_CHANNEL_STRIDE)
            .map_err(|_| MrsError::InvalidSliceId { id })?;
        SliceId::new(channel, id % SLICE_ID_CHANNEL_STRIDE)
            .map_err(|_| MrsError::InvalidSliceId { id })
    }
}

impl From<SliceId> for u16 {
    fn from(id: SliceId) -> u16 {
        id.0
    }
}

impl fmt::Display for SliceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// IFU-local coordinates of one detector pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaBetaSample {
    pub alpha: f64,
    pub beta: f64,
    pub lambda: f64,
}

impl AlphaBetaSample {
    const NAN: AlphaBetaSample = AlphaBetaSample {
        alpha: f64::NAN,
        beta: f64::NAN,
        lambda: f64::NAN,
    };
}

/// Telescope-frame coordinates of one detector pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkySample {
    pub v2: f64,
    pub v3: f64,
    pub lambda: f64,
}

impl SkySample {
    const NAN: SkySample = SkySample {
        v2: f64::NAN,
        v3: f64::NAN,
        lambda: f64::NAN,
    };
}

/// The calibrated distortion polynomials for one slice: detector (x, y) to
/// alpha, beta and wavelength, valid inside the slice's detector region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistortionPolynomialSet {
    pub alpha: Polynomial2d,
    pub beta: Polynomial2d,
    pub lambda: Polynomial2d,
    pub bounding_box: Option<BoundingBox>,
}

impl DistortionPolynomialSet {
    fn evaluate(&self, x: f64, y: f64) -> AlphaBetaSample {
        if !self.bounding_box.map_or(true, |b| b.contains(x, y)) {
            return AlphaBetaSample::NAN;
        }
        AlphaBetaSample {
            alpha: self.alpha.evaluate(x, y),
            beta: self.beta.evaluate(x, y),
            lambda: self.lambda.evaluate(x, y),
        }
    }
}

/// The per-channel affine stage from IFU-local alpha/beta to telescope
/// V2/V3 (a rotation and offset; the distortion lives entirely in the
/// per-slice stage).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlphaBetaToV2V3 {
    pub matrix: [[f64; 2]; 2],
    pub offset: [f64; 2],
}

impl AlphaBetaToV2V3 {
    pub fn evaluate(&self, alpha: f64, beta: f64) -> (f64, f64) {
        (
            self.matrix[0][0] * alpha + self.matrix[0][1] * beta + self.offset[0],
            self.matrix[1][0] * alpha + self.matrix[1][1] * beta + self.offset[1],
        )
    }
}

/// The composed WCS of one MRS exposure: per-slice distortion models plus
/// per-channel sky transforms, built once from calibration tables and
/// read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrsWcs {
    band: Band,
    slices: IndexMap<SliceId, DistortionPolynomialSet>,
    sky: IndexMap<Channel, AlphaBetaToV2V3>,
}

impl MrsWcs {
    /// Create the WCS for one exposure. Every registered slice's channel
    /// must have a sky transform; that mismatch is a configuration error
    /// and is caught here, not per pixel.
    pub fn new(
        band: Band,
        slices: IndexMap<SliceId, DistortionPolynomialSet>,
        sky: IndexMap<Channel, AlphaBetaToV2V3>,
    ) -> Result<MrsWcs, MrsError> {
        if slices.is_empty() {
            return Err(MrsError::NoSlices);
        }
        for id in slices.keys() {
            if !sky.contains_key(&id.channel()) {
                return Err(MrsError::UnknownChannel {
                    channel: id.channel(),
                });
            }
        }
        debug!(
            "MRS band {}: {} slice distortion models across {} channels",
            band,
            slices.len(),
            sky.len()
        );
        Ok(MrsWcs { band, slices, sky })
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn slice_ids(&self) -> impl Iterator<Item = SliceId> + '_ {
        self.slices.keys().copied()
    }

    /// The first transform stage: detector (x, y) within a slice to
    /// IFU-local alpha/beta and wavelength. NaN outside the slice's
    /// bounding box.
    pub fn detector_to_alpha_beta(
        &self,
        slice: SliceId,
        x: f64,
        y: f64,
    ) -> Result<AlphaBetaSample, MrsError> {
        let set = self
            .slices
            .get(&slice)
            .ok_or(MrsError::UnknownSlice { id: slice.id() })?;
        Ok(set.evaluate(x, y))
    }

    /// The second transform stage, on its own.
    pub fn alpha_beta_to_v2v3(
        &self,
        channel: Channel,
        alpha: f64,
        beta: f64,
    ) -> Result<(f64, f64), MrsError> {
        let sky = self
            .sky
            .get(&channel)
            .ok_or(MrsError::UnknownChannel { channel })?;
        Ok(sky.evaluate(alpha, beta))
    }

    /// Both stages composed: detector (x, y) within a slice to V2/V3 and
    /// wavelength. The sky stage is not evaluated when the distortion
    /// stage lands out of domain; the NaN marker propagates instead.
    pub fn detector_to_sky(&self, slice: SliceId, x: f64, y: f64) -> Result<SkySample, MrsError> {
        let ab = self.detector_to_alpha_beta(slice, x, y)?;
        if !ab.alpha.is_finite() || !ab.beta.is_finite() {
            return Ok(SkySample::NAN);
        }
        let (v2, v3) = self.alpha_beta_to_v2v3(slice.channel(), ab.alpha, ab.beta)?;
        Ok(SkySample {
            v2,
            v3,
            lambda: ab.lambda,
        })
    }

    /// [`MrsWcs::detector_to_sky`] over whole detector arrays, driven by a
    /// per-pixel slice map. Map value [`UNASSIGNED_SLICE`] (0) marks pixels
    /// belonging to no slice; those come back NaN. Every other id in the
    /// map must be registered, which is checked up front so the per-pixel
    /// sweep cannot fail.
    ///
    /// Returns (v2, v3, lambda) arrays of the input shape.
    pub fn detector_to_sky_grid(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        slice_map: ArrayView2<u16>,
    ) -> Result<(Array2<f64>, Array2<f64>, Array2<f64>), MrsError> {
        let mut ids: Vec<u16> = slice_map
            .iter()
            .copied()
            .filter(|&raw| raw != UNASSIGNED_SLICE)
            .collect();
        ids.par_sort_unstable();
        ids.dedup();
        for raw in ids {
            let id = SliceId::try_from(raw)?;
            if !self.slices.contains_key(&id) {
                return Err(MrsError::UnknownSlice { id: raw });
            }
        }

        let mut v2 = Array2::from_elem(x.raw_dim(), f64::NAN);
        let mut v3 = Array2::from_elem(x.raw_dim(), f64::NAN);
        let mut lambda = Array2::from_elem(x.raw_dim(), f64::NAN);
        Zip::from(&mut v2)
            .and(&mut v3)
            .and(&mut lambda)
            .and(&x)
            .and(&y)
            .and(&slice_map)
            .par_for_each(|w2, w3, wl, &xv, &yv, &raw| {
                if raw == UNASSIGNED_SLICE {
                    return;
                }
                let id = SliceId(raw);
                if let Some(set) = self.slices.get(&id) {
                    let ab = set.evaluate(xv, yv);
                    if !ab.alpha.is_finite() || !ab.beta.is_finite() {
                        return;
                    }
                    if let Some(sky) = self.sky.get(&id.channel()) {
                        let (a, b) = sky.evaluate(ab.alpha, ab.beta);
                        *w2 = a;
                        *w3 = b;
                        *wl = ab.lambda;
                    }
                }
            });
        Ok((v2, v3, lambda))
    }
}
