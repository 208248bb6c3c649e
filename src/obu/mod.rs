//! Open Bitstream Unit (OBU) record model.
//!
//! One module per record kind. Every kind implements the same two
//! capabilities: validate-and-serialize into a
//! [`WriteBitBuffer`](crate::utils::write_bit_buffer::WriteBitBuffer) and
//! a read constructor from a
//! [`ReadBitBuffer`](crate::utils::read_bit_buffer::ReadBitBuffer).
//! Dispatch over the closed set of kinds goes through the [`Obu`] enum.

use anyhow::Result;

use crate::utils::read_bit_buffer::ReadBitBuffer;
use crate::utils::write_bit_buffer::WriteBitBuffer;

pub mod arbitrary;
pub mod audio_element;
pub mod audio_frame;
pub mod codec_config;
pub mod header;
pub mod ia_sequence_header;
pub mod mix_presentation;
pub mod parameter_block;
pub mod temporal_delimiter;

pub use arbitrary::{ArbitraryObu, InsertionHook};
pub use audio_element::AudioElementObu;
pub use audio_frame::AudioFrameObu;
pub use codec_config::{CodecConfigObu, DecoderConfig};
pub use header::ObuHeader;
pub use ia_sequence_header::{IaSequenceHeaderObu, ProfileVersion};
pub use mix_presentation::{MixPresentationObu, MixPresentationSubMix};
pub use parameter_block::ParameterBlockObu;
pub use temporal_delimiter::TemporalDelimiterObu;

/// A `leb128()` field decodes to an unsigned 32-bit value regardless of
/// its encoded length.
pub type DecodedUleb128 = u32;

/// Number of substream IDs representable by the implicit audio frame
/// OBU types.
pub const MAX_IMPLICIT_SUBSTREAM_ID: u32 = 17;

/// 5-bit OBU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObuType {
    CodecConfig,
    AudioElement,
    MixPresentation,
    ParameterBlock,
    TemporalDelimiter,
    /// Audio frame with an explicit substream ID in the payload.
    AudioFrame,
    /// Audio frame whose substream ID (0..=17) is implied by the type tag.
    AudioFrameId(u8),
    Reserved(u8),
    IaSequenceHeader,
}

impl ObuType {
    pub fn from_u8(value: u8) -> Self {
        match value & 0x1f {
            0 => ObuType::CodecConfig,
            1 => ObuType::AudioElement,
            2 => ObuType::MixPresentation,
            3 => ObuType::ParameterBlock,
            4 => ObuType::TemporalDelimiter,
            5 => ObuType::AudioFrame,
            id @ 6..=23 => ObuType::AudioFrameId(id - 6),
            31 => ObuType::IaSequenceHeader,
            reserved => ObuType::Reserved(reserved),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            ObuType::CodecConfig => 0,
            ObuType::AudioElement => 1,
            ObuType::MixPresentation => 2,
            ObuType::ParameterBlock => 3,
            ObuType::TemporalDelimiter => 4,
            ObuType::AudioFrame => 5,
            ObuType::AudioFrameId(id) => 6 + id,
            ObuType::Reserved(value) => value,
            ObuType::IaSequenceHeader => 31,
        }
    }

    /// Trim fields in the header are only legal on these types.
    pub fn is_audio_frame(self) -> bool {
        matches!(self, ObuType::AudioFrame | ObuType::AudioFrameId(_))
    }
}

/// Serializes one OBU: the payload goes through a scratch buffer first so
/// the header can state its size and a failing payload commits nothing to
/// the caller's buffer.
pub(crate) fn write_obu_with_payload(
    obu_type: ObuType,
    header: &ObuHeader,
    wb: &mut WriteBitBuffer,
    payload: impl FnOnce(&mut WriteBitBuffer) -> Result<()>,
) -> Result<()> {
    let mut scratch = WriteBitBuffer::new(wb.leb_generator());
    payload(&mut scratch)?;
    let payload_bytes = scratch.flush()?;
    header.validate_and_write(obu_type, payload_bytes.len(), wb)?;
    wb.write_uint8_span(&payload_bytes)?;
    Ok(())
}

/// One decoded OBU of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Obu {
    IaSequenceHeader(IaSequenceHeaderObu),
    CodecConfig(CodecConfigObu),
    AudioElement(AudioElementObu),
    MixPresentation(MixPresentationObu),
    AudioFrame(AudioFrameObu),
    ParameterBlock(ParameterBlockObu),
    TemporalDelimiter(TemporalDelimiterObu),
    Arbitrary(ArbitraryObu),
}

impl Obu {
    pub fn validate_and_write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        match self {
            Obu::IaSequenceHeader(obu) => obu.validate_and_write(wb),
            Obu::CodecConfig(obu) => obu.validate_and_write(wb),
            Obu::AudioElement(obu) => obu.validate_and_write(wb),
            Obu::MixPresentation(obu) => obu.validate_and_write(wb),
            Obu::AudioFrame(obu) => obu.validate_and_write(wb),
            Obu::ParameterBlock(obu) => obu.validate_and_write(wb),
            Obu::TemporalDelimiter(obu) => obu.validate_and_write(wb),
            Obu::Arbitrary(obu) => obu.validate_and_write(wb),
        }
    }

    /// Reads the next OBU from the source.
    ///
    /// Reserved types round-trip as [`ArbitraryObu`]s so unknown records
    /// survive a rewrite of the sequence.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<Obu> {
        let (obu_type, header, payload_size) = ObuHeader::read(rb)?;
        let payload = rb.read_uint8_vec(payload_size as usize)?;
        let mut payload_rb = ReadBitBuffer::new(payload.len().max(8), &payload);

        Ok(match obu_type {
            ObuType::IaSequenceHeader => Obu::IaSequenceHeader(
                IaSequenceHeaderObu::read_payload(header, &mut payload_rb)?,
            ),
            ObuType::CodecConfig => Obu::CodecConfig(CodecConfigObu::read_payload(
                header,
                &mut payload_rb,
                payload_size,
            )?),
            ObuType::AudioElement => {
                Obu::AudioElement(AudioElementObu::read_payload(header, &mut payload_rb)?)
            }
            ObuType::MixPresentation => Obu::MixPresentation(MixPresentationObu::read_payload(
                header,
                &mut payload_rb,
            )?),
            ObuType::AudioFrame | ObuType::AudioFrameId(_) => Obu::AudioFrame(
                AudioFrameObu::read_payload(obu_type, header, &mut payload_rb)?,
            ),
            ObuType::ParameterBlock => Obu::ParameterBlock(ParameterBlockObu::read_payload(
                header,
                &mut payload_rb,
            )?),
            ObuType::TemporalDelimiter => {
                Obu::TemporalDelimiter(TemporalDelimiterObu { header })
            }
            ObuType::Reserved(_) => Obu::Arbitrary(ArbitraryObu::from_reserved(
                obu_type.to_u8(),
                header,
                payload,
            )),
        })
    }
}
