//! Records binding OBUs to the timing and provenance data producers
//! attach to them.

use crate::obu::{AudioElementObu, AudioFrameObu, DecodedUleb128, ParameterBlockObu};

/// Down-mixing coefficients associated with one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DownMixingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub w_idx_offset: i32,
    pub w: f64,
    /// Whether these coefficients came from a parameter block in the
    /// bitstream or were synthesized.
    pub in_bitstream: bool,
}

/// An audio frame plus the context the sequencer needs to place it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrameWithData {
    pub obu: AudioFrameObu,
    pub start_timestamp: i32,
    pub end_timestamp: i32,
    /// Frame samples in (time, channel) order, before encoding.
    pub raw_samples: Vec<Vec<i32>>,
    pub down_mixing_params: DownMixingParams,
    /// The audio element this frame belongs to. Resolved through the
    /// caller's audio element map at sequencing time.
    pub audio_element_id: DecodedUleb128,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlockWithData {
    pub obu: ParameterBlockObu,
    pub start_timestamp: i32,
    pub end_timestamp: i32,
}

/// An audio element plus its codec config linkage.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioElementWithData {
    pub obu: AudioElementObu,
    pub codec_config_id: DecodedUleb128,
}
