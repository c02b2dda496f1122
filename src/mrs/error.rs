// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with MRS transforms.

use thiserror::Error;

use super::Channel;

#[derive(Error, Debug)]
pub enum MrsError {
    #[error("No distortion model is registered for slice id {id}")]
    UnknownSlice { id: u16 },

    #[error("No alpha/beta -> V2/V3 transform is registered for channel {channel}")]
    UnknownChannel { channel: Channel },

    #[error("MRS channels are numbered 1 to 4, but got {got}")]
    InvalidChannel { got: u16 },

    #[error("Per-channel slice indices run from 1 to 99, but got {index}")]
    SliceIndexOutOfRange { index: u16 },

    #[error("Slice id {id} does not decode to a valid channel and slice index")]
    InvalidSliceId { id: u16 },

    #[error("An MRS WCS needs at least one slice distortion model")]
    NoSlices,
}
