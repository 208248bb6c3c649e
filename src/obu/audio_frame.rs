//! Audio Frame OBU.
//!
//! Substream IDs 0..=17 serialize through the implicit type tags and omit
//! the explicit substream ID field; larger IDs use the generic type with
//! a leb128 ID prefix. Trim counts live in the header.

use anyhow::Result;

use crate::obu::header::ObuHeader;
use crate::obu::{DecodedUleb128, MAX_IMPLICIT_SUBSTREAM_ID, ObuType, write_obu_with_payload};
use crate::utils::read_bit_buffer::ReadBitBuffer;
use crate::utils::write_bit_buffer::WriteBitBuffer;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrameObu {
    pub header: ObuHeader,
    substream_id: DecodedUleb128,
    /// Encoded frame bytes from the codec, written verbatim.
    pub audio_frame: Vec<u8>,
}

impl AudioFrameObu {
    pub fn new(header: ObuHeader, substream_id: DecodedUleb128, audio_frame: Vec<u8>) -> Self {
        Self {
            header,
            substream_id,
            audio_frame,
        }
    }

    pub fn substream_id(&self) -> DecodedUleb128 {
        self.substream_id
    }

    fn obu_type(&self) -> ObuType {
        if self.substream_id <= MAX_IMPLICIT_SUBSTREAM_ID {
            ObuType::AudioFrameId(self.substream_id as u8)
        } else {
            ObuType::AudioFrame
        }
    }

    pub fn validate_and_write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        let obu_type = self.obu_type();
        write_obu_with_payload(obu_type, &self.header, wb, |wb| {
            if obu_type == ObuType::AudioFrame {
                wb.write_uleb128(self.substream_id)?;
            }
            wb.write_uint8_span(&self.audio_frame)?;
            Ok(())
        })
    }

    pub(crate) fn read_payload(
        obu_type: ObuType,
        header: ObuHeader,
        rb: &mut ReadBitBuffer,
    ) -> Result<Self> {
        let substream_id = match obu_type {
            ObuType::AudioFrameId(id) => DecodedUleb128::from(id),
            _ => rb.read_uleb128()?,
        };
        let mut audio_frame = Vec::new();
        while rb.is_data_available() {
            audio_frame.push(rb.read_unsigned_literal_8(8)?);
        }
        Ok(Self {
            header,
            substream_id,
            audio_frame,
        })
    }
}
