//! Codec Config OBU.
//!
//! Declares the codec every substream of an audio element uses, the frame
//! length in samples, and the codec-specific decoder configuration. Only
//! the LPCM decoder config is parsed into fields; other codecs round-trip
//! as raw bytes.

use anyhow::{Result, bail};

use crate::obu::header::ObuHeader;
use crate::obu::{DecodedUleb128, ObuType, write_obu_with_payload};
use crate::utils::errors::ObuError;
use crate::utils::read_bit_buffer::ReadBitBuffer;
use crate::utils::write_bit_buffer::WriteBitBuffer;

/// Four-character codec identifier for linear PCM, "ipcm".
pub const CODEC_ID_LPCM: u32 = 0x6970_636D;

/// Serialized size of the LPCM decoder config in bytes.
const LPCM_CONFIG_SIZE: u64 = 6;

#[derive(Debug, Clone, PartialEq)]
pub enum DecoderConfig {
    Lpcm {
        sample_format_flags: u8,
        sample_size: u8,
        sample_rate: u32,
    },
    /// Codec-specific bytes for codecs this crate does not interpret.
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodecConfigObu {
    pub header: ObuHeader,
    pub codec_config_id: DecodedUleb128,
    pub codec_id: u32,
    pub num_samples_per_frame: DecodedUleb128,
    pub audio_roll_distance: i16,
    pub decoder_config: DecoderConfig,
}

impl CodecConfigObu {
    /// Frame length shared by every substream using this config.
    pub fn num_samples_per_frame(&self) -> u32 {
        self.num_samples_per_frame
    }

    /// Output sample rate, known only for parsed decoder configs.
    pub fn output_sample_rate(&self) -> Option<u32> {
        match self.decoder_config {
            DecoderConfig::Lpcm { sample_rate, .. } => Some(sample_rate),
            DecoderConfig::Raw(_) => None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.num_samples_per_frame == 0 {
            bail!(ObuError::ZeroSamplesPerFrame);
        }
        Ok(())
    }

    pub fn validate_and_write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        write_obu_with_payload(ObuType::CodecConfig, &self.header, wb, |wb| {
            wb.write_uleb128(self.codec_config_id)?;
            wb.write_unsigned_literal(u64::from(self.codec_id), 32)?;
            wb.write_uleb128(self.num_samples_per_frame)?;
            wb.write_signed_16(self.audio_roll_distance)?;
            match &self.decoder_config {
                DecoderConfig::Lpcm {
                    sample_format_flags,
                    sample_size,
                    sample_rate,
                } => {
                    wb.write_unsigned_literal(u64::from(*sample_format_flags), 8)?;
                    wb.write_unsigned_literal(u64::from(*sample_size), 8)?;
                    wb.write_unsigned_literal(u64::from(*sample_rate), 32)?;
                }
                DecoderConfig::Raw(bytes) => wb.write_uint8_span(bytes)?,
            }
            Ok(())
        })
    }

    pub(crate) fn read_payload(
        header: ObuHeader,
        rb: &mut ReadBitBuffer,
        payload_size: u64,
    ) -> Result<Self> {
        let (codec_config_id, id_size) = rb.read_uleb128_with_size()?;
        let codec_id = rb.read_unsigned_literal_32(32)?;
        let (num_samples_per_frame, frames_size) = rb.read_uleb128_with_size()?;
        let audio_roll_distance = rb.read_signed_16()?;
        if num_samples_per_frame == 0 {
            bail!(ObuError::ZeroSamplesPerFrame);
        }

        let consumed = u64::from(id_size) + 4 + u64::from(frames_size) + 2;
        let config_size = payload_size
            .checked_sub(consumed)
            .ok_or(ObuError::MalformedObuSize)?;
        let decoder_config = if codec_id == CODEC_ID_LPCM {
            if config_size != LPCM_CONFIG_SIZE {
                bail!(ObuError::InvalidLpcmConfigSize {
                    expected: LPCM_CONFIG_SIZE,
                    actual: config_size,
                });
            }
            DecoderConfig::Lpcm {
                sample_format_flags: rb.read_unsigned_literal_8(8)?,
                sample_size: rb.read_unsigned_literal_8(8)?,
                sample_rate: rb.read_unsigned_literal_32(32)?,
            }
        } else {
            DecoderConfig::Raw(rb.read_uint8_vec(config_size as usize)?)
        };

        Ok(Self {
            header,
            codec_config_id,
            codec_id,
            num_samples_per_frame,
            audio_roll_distance,
            decoder_config,
        })
    }
}
