//! OBU header serialization.
//!
//! Every OBU starts with one bit-packed byte (5-bit type, three flags)
//! followed by an `obu_size` leb128 covering everything after itself:
//! optional trim counts, optional extension bytes, then the payload.

use anyhow::{Result, bail};

use crate::obu::{DecodedUleb128, ObuType};
use crate::utils::read_bit_buffer::ReadBitBuffer;
use crate::utils::write_bit_buffer::WriteBitBuffer;
use crate::utils::errors::ObuError;

/// Header fields shared by all OBU kinds.
///
/// The type tag is not stored here; each record kind knows its own type
/// and supplies it at write time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObuHeader {
    pub obu_redundant_copy: bool,
    pub obu_trimming_status_flag: bool,
    pub obu_extension_flag: bool,
    /// Valid only when `obu_trimming_status_flag` is set. Serialized
    /// before the trim-at-start count.
    pub num_samples_to_trim_at_end: DecodedUleb128,
    pub num_samples_to_trim_at_start: DecodedUleb128,
    /// Valid only when `obu_extension_flag` is set.
    pub extension_header_bytes: Vec<u8>,
}

impl ObuHeader {
    /// Validates the flag invariants and writes the header for a payload
    /// of `payload_size` bytes.
    ///
    /// All leb128 fields are generated before anything is written, so a
    /// failure commits no bytes to `wb`.
    pub fn validate_and_write(
        &self,
        obu_type: ObuType,
        payload_size: usize,
        wb: &mut WriteBitBuffer,
    ) -> Result<()> {
        if self.obu_trimming_status_flag && !obu_type.is_audio_frame() {
            bail!(ObuError::TrimmingOnNonAudioFrame(obu_type.to_u8()));
        }
        if !self.obu_trimming_status_flag
            && (self.num_samples_to_trim_at_end != 0 || self.num_samples_to_trim_at_start != 0)
        {
            bail!(ObuError::TrimWithoutFlag);
        }
        if !self.obu_extension_flag && !self.extension_header_bytes.is_empty() {
            bail!(ObuError::ExtensionWithoutFlag);
        }

        let generator = wb.leb_generator();
        let mut field_bytes: Vec<Vec<u8>> = Vec::new();
        if self.obu_trimming_status_flag {
            field_bytes.push(generator.generate(self.num_samples_to_trim_at_end)?);
            field_bytes.push(generator.generate(self.num_samples_to_trim_at_start)?);
        }
        if self.obu_extension_flag {
            let size = u32::try_from(self.extension_header_bytes.len())
                .map_err(|_| ObuError::PayloadTooLarge(self.extension_header_bytes.len()))?;
            field_bytes.push(generator.generate(size)?);
            field_bytes.push(self.extension_header_bytes.clone());
        }

        let obu_size = field_bytes.iter().map(Vec::len).sum::<usize>() + payload_size;
        let obu_size = u32::try_from(obu_size).map_err(|_| ObuError::PayloadTooLarge(obu_size))?;
        let obu_size_bytes = generator.generate(obu_size)?;

        wb.write_unsigned_literal(u64::from(obu_type.to_u8()), 5)?;
        wb.write_boolean(self.obu_redundant_copy)?;
        wb.write_boolean(self.obu_trimming_status_flag)?;
        wb.write_boolean(self.obu_extension_flag)?;
        wb.write_uint8_span(&obu_size_bytes)?;
        for bytes in &field_bytes {
            wb.write_uint8_span(bytes)?;
        }
        Ok(())
    }

    /// Reads a header and returns the OBU type, the header fields, and
    /// the number of payload bytes that follow.
    pub fn read(rb: &mut ReadBitBuffer) -> Result<(ObuType, ObuHeader, u64)> {
        let obu_type = ObuType::from_u8(rb.read_unsigned_literal_8(5)?);
        let obu_redundant_copy = rb.read_boolean()?;
        let obu_trimming_status_flag = rb.read_boolean()?;
        let obu_extension_flag = rb.read_boolean()?;
        let obu_size = rb.read_uleb128()?;

        if obu_trimming_status_flag && !obu_type.is_audio_frame() {
            bail!(ObuError::TrimmingOnNonAudioFrame(obu_type.to_u8()));
        }

        let mut consumed: u64 = 0;
        let mut header = ObuHeader {
            obu_redundant_copy,
            obu_trimming_status_flag,
            obu_extension_flag,
            ..Default::default()
        };
        if obu_trimming_status_flag {
            let (trim_end, size) = rb.read_uleb128_with_size()?;
            header.num_samples_to_trim_at_end = trim_end;
            consumed += u64::from(size);
            let (trim_start, size) = rb.read_uleb128_with_size()?;
            header.num_samples_to_trim_at_start = trim_start;
            consumed += u64::from(size);
        }
        if obu_extension_flag {
            let (extension_size, size) = rb.read_uleb128_with_size()?;
            consumed += u64::from(size) + u64::from(extension_size);
            header.extension_header_bytes = rb.read_uint8_vec(extension_size as usize)?;
        }

        let payload_size = u64::from(obu_size)
            .checked_sub(consumed)
            .ok_or(ObuError::MalformedObuSize)?;
        Ok((obu_type, header, payload_size))
    }
}
