//! Audio Element OBU.
//!
//! Binds a set of substreams to a codec config. Parameter definitions are
//! not supported by this writer; the configuration that follows them on
//! the wire round-trips as raw bytes.

use anyhow::{Result, bail};

use crate::obu::header::ObuHeader;
use crate::obu::{DecodedUleb128, ObuType, write_obu_with_payload};
use crate::utils::errors::ObuError;
use crate::utils::read_bit_buffer::ReadBitBuffer;
use crate::utils::write_bit_buffer::WriteBitBuffer;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioElementObu {
    pub header: ObuHeader,
    pub audio_element_id: DecodedUleb128,
    /// 3-bit element type, stored raw.
    pub audio_element_type: u8,
    pub codec_config_id: DecodedUleb128,
    pub audio_substream_ids: Vec<DecodedUleb128>,
    /// Element-type-specific configuration, carried verbatim.
    pub config_bytes: Vec<u8>,
}

impl AudioElementObu {
    pub fn validate_and_write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        write_obu_with_payload(ObuType::AudioElement, &self.header, wb, |wb| {
            wb.write_uleb128(self.audio_element_id)?;
            wb.write_unsigned_literal(u64::from(self.audio_element_type), 3)?;
            wb.write_unsigned_literal(0, 5)?;
            wb.write_uleb128(self.codec_config_id)?;
            let num_substreams = u32::try_from(self.audio_substream_ids.len())
                .map_err(|_| ObuError::PayloadTooLarge(self.audio_substream_ids.len()))?;
            wb.write_uleb128(num_substreams)?;
            for &substream_id in &self.audio_substream_ids {
                wb.write_uleb128(substream_id)?;
            }
            // num_parameters; parameter definitions are unsupported.
            wb.write_uleb128(0)?;
            wb.write_uint8_span(&self.config_bytes)?;
            Ok(())
        })
    }

    pub(crate) fn read_payload(header: ObuHeader, rb: &mut ReadBitBuffer) -> Result<Self> {
        let audio_element_id = rb.read_uleb128()?;
        let audio_element_type = rb.read_unsigned_literal_8(3)?;
        let _reserved = rb.read_unsigned_literal_8(5)?;
        let codec_config_id = rb.read_uleb128()?;
        // The count is wire-supplied; grow per parsed entry so a hostile
        // value fails on the bounded payload instead of reserving memory.
        let num_substreams = rb.read_uleb128()?;
        let mut audio_substream_ids = Vec::new();
        for _ in 0..num_substreams {
            audio_substream_ids.push(rb.read_uleb128()?);
        }
        let num_parameters = rb.read_uleb128()?;
        if num_parameters != 0 {
            bail!(ObuError::UnsupportedNumParameters(num_parameters));
        }
        let mut config_bytes = Vec::new();
        while rb.is_data_available() {
            config_bytes.push(rb.read_unsigned_literal_8(8)?);
        }

        Ok(Self {
            header,
            audio_element_id,
            audio_element_type,
            codec_config_id,
            audio_substream_ids,
            config_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obu::Obu;
    use anyhow::Result;

    #[test]
    fn round_trips_with_substream_ids_and_config_bytes() -> Result<()> {
        let obu = AudioElementObu {
            header: ObuHeader::default(),
            audio_element_id: 100,
            audio_element_type: 0,
            codec_config_id: 11,
            audio_substream_ids: vec![2000, 4000],
            config_bytes: vec![0xaa, 0xbb],
        };
        let mut wb = WriteBitBuffer::default();
        obu.validate_and_write(&mut wb)?;
        let bytes = wb.flush()?;

        let mut rb = ReadBitBuffer::new(64, &bytes);
        assert_eq!(Obu::read(&mut rb)?, Obu::AudioElement(obu));
        Ok(())
    }

    #[test]
    fn hostile_substream_counts_fail_instead_of_allocating() {
        // An 8-byte payload claiming num_substreams = u32::MAX. Parsing
        // must run out of payload bytes, not reserve gigabytes.
        let bytes = [1 << 3, 8, 1, 0, 11, 0xff, 0xff, 0xff, 0xff, 0x0f];
        let mut rb = ReadBitBuffer::new(64, &bytes);
        assert!(Obu::read(&mut rb).is_err());
    }

    #[test]
    fn parameter_definitions_are_rejected_on_read() -> Result<()> {
        let obu = AudioElementObu {
            header: ObuHeader::default(),
            audio_element_id: 1,
            audio_element_type: 0,
            codec_config_id: 1,
            audio_substream_ids: vec![0],
            config_bytes: vec![],
        };
        let mut wb = WriteBitBuffer::default();
        obu.validate_and_write(&mut wb)?;
        let mut bytes = wb.flush()?;
        // Flip num_parameters from 0 to 1 (last payload byte).
        let last = bytes.len() - 1;
        bytes[last] = 1;

        let mut rb = ReadBitBuffer::new(64, &bytes);
        assert!(Obu::read(&mut rb).is_err());
        Ok(())
    }
}
