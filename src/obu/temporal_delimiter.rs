//! Temporal Delimiter OBU.
//!
//! Marks the start of a temporal unit. The payload is always empty.

use anyhow::Result;

use crate::obu::header::ObuHeader;
use crate::obu::{ObuType, write_obu_with_payload};
use crate::utils::write_bit_buffer::WriteBitBuffer;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalDelimiterObu {
    pub header: ObuHeader,
}

impl TemporalDelimiterObu {
    pub fn validate_and_write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        write_obu_with_payload(ObuType::TemporalDelimiter, &self.header, wb, |_| Ok(()))
    }
}
