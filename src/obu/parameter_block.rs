//! Parameter Block OBU.
//!
//! Carries time-varying parameter data for one `parameter_id`. The data
//! itself depends on the parameter definition owned by a descriptor OBU,
//! so it round-trips here as raw bytes; the ID alone drives sequencing.

use anyhow::Result;

use crate::obu::header::ObuHeader;
use crate::obu::{DecodedUleb128, ObuType, write_obu_with_payload};
use crate::utils::read_bit_buffer::ReadBitBuffer;
use crate::utils::write_bit_buffer::WriteBitBuffer;

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlockObu {
    pub header: ObuHeader,
    pub parameter_id: DecodedUleb128,
    pub payload_bytes: Vec<u8>,
}

impl ParameterBlockObu {
    pub fn validate_and_write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        write_obu_with_payload(ObuType::ParameterBlock, &self.header, wb, |wb| {
            wb.write_uleb128(self.parameter_id)?;
            wb.write_uint8_span(&self.payload_bytes)?;
            Ok(())
        })
    }

    pub(crate) fn read_payload(header: ObuHeader, rb: &mut ReadBitBuffer) -> Result<Self> {
        let parameter_id = rb.read_uleb128()?;
        let mut payload_bytes = Vec::new();
        while rb.is_data_available() {
            payload_bytes.push(rb.read_unsigned_literal_8(8)?);
        }
        Ok(Self {
            header,
            parameter_id,
            payload_bytes,
        })
    }
}
