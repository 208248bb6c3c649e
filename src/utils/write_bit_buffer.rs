//! Bit-granular append-only sink.
//!
//! [`WriteBitBuffer`] accumulates bits MSB-first into an owned byte vector.
//! The `leb128()` encoding policy is injected at construction so callers
//! can pad varints to a fixed width; see
//! [`LebGenerator`](crate::utils::leb::LebGenerator).

use bitstream_io::{BigEndian, BitWrite, BitWriter};

use crate::utils::errors::BitBufferError;
use crate::utils::leb::LebGenerator;
use crate::utils::read_bit_buffer::MAX_STRING_SIZE;

pub struct WriteBitBuffer {
    writer: BitWriter<Vec<u8>, BigEndian>,
    bit_offset: u64,
    leb_generator: LebGenerator,
}

impl std::fmt::Debug for WriteBitBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBitBuffer")
            .field("bit_offset", &self.bit_offset)
            .field("leb_generator", &self.leb_generator)
            .finish_non_exhaustive()
    }
}

impl Default for WriteBitBuffer {
    fn default() -> Self {
        Self::new(LebGenerator::Minimal)
    }
}

impl WriteBitBuffer {
    pub fn new(leb_generator: LebGenerator) -> Self {
        Self {
            writer: BitWriter::new(Vec::new()),
            bit_offset: 0,
            leb_generator,
        }
    }

    pub fn leb_generator(&self) -> LebGenerator {
        self.leb_generator
    }

    /// Number of bits written since construction or the last [`flush`].
    ///
    /// [`flush`]: WriteBitBuffer::flush
    pub fn bit_offset(&self) -> u64 {
        self.bit_offset
    }

    pub fn byte_aligned(&self) -> bool {
        self.bit_offset % 8 == 0
    }

    /// Writes the low `num_bits` (0..=64) of `value`, MSB first.
    pub fn write_unsigned_literal(
        &mut self,
        value: u64,
        num_bits: u32,
    ) -> Result<(), BitBufferError> {
        if num_bits > 64 {
            return Err(BitBufferError::TooManyBits { num_bits, max: 64 });
        }
        if num_bits < 64 && value >> num_bits != 0 {
            return Err(BitBufferError::ValueTooLargeForBits { value, num_bits });
        }
        if num_bits == 0 {
            return Ok(());
        }
        self.writer.write_unsigned_var(num_bits, value)?;
        self.bit_offset += u64::from(num_bits);
        Ok(())
    }

    pub fn write_signed_16(&mut self, value: i16) -> Result<(), BitBufferError> {
        self.write_unsigned_literal(u64::from(value as u16), 16)
    }

    pub fn write_boolean(&mut self, value: bool) -> Result<(), BitBufferError> {
        self.write_unsigned_literal(u64::from(value), 1)
    }

    pub fn write_uint8_span(&mut self, bytes: &[u8]) -> Result<(), BitBufferError> {
        for &byte in bytes {
            self.write_unsigned_literal(u64::from(byte), 8)?;
        }
        Ok(())
    }

    /// Writes `value` followed by a null terminator. The serialized form
    /// must fit [`MAX_STRING_SIZE`] bytes and the value may not contain
    /// interior nulls.
    pub fn write_string(&mut self, value: &str) -> Result<(), BitBufferError> {
        let bytes = value.as_bytes();
        if bytes.contains(&b'\0') {
            return Err(BitBufferError::InteriorNul);
        }
        if bytes.len() + 1 > MAX_STRING_SIZE {
            return Err(BitBufferError::StringTooLong(MAX_STRING_SIZE));
        }
        self.write_uint8_span(bytes)?;
        self.write_unsigned_literal(0, 8)
    }

    /// Serializes `value` as `leb128()` under the injected policy.
    pub fn write_uleb128(&mut self, value: u32) -> Result<(), BitBufferError> {
        let bytes = self.leb_generator.generate(value)?;
        self.write_uint8_span(&bytes)
    }

    /// Serializes an ISO 14496-1 expanded size field with big-endian group
    /// accumulation and minimal length.
    pub fn write_iso14496_1_expanded(&mut self, value: u32) -> Result<(), BitBufferError> {
        let mut groups = [0u8; 5];
        let mut count = 0;
        let mut remaining = value;
        loop {
            groups[count] = (remaining & 0x7f) as u8;
            count += 1;
            remaining >>= 7;
            if remaining == 0 {
                break;
            }
        }
        // Most significant group first; continuation bit on all but the last.
        for i in (0..count).rev() {
            let byte = if i == 0 { groups[i] } else { groups[i] | 0x80 };
            self.write_unsigned_literal(u64::from(byte), 8)?;
        }
        Ok(())
    }

    /// View of the accumulated bytes. Only available at byte alignment;
    /// a partially filled byte is still held inside the bit writer.
    pub fn bit_buffer(&mut self) -> Option<&[u8]> {
        self.byte_aligned()
            .then(|| self.writer.writer().map(|w| w.as_slice()))
            .flatten()
    }

    /// Hands out the accumulated bytes and resets the buffer for reuse.
    /// Fails if the buffer is not byte aligned.
    pub fn flush(&mut self) -> Result<Vec<u8>, BitBufferError> {
        if !self.byte_aligned() {
            return Err(BitBufferError::UnalignedAccess(self.bit_offset));
        }
        let writer = std::mem::replace(&mut self.writer, BitWriter::new(Vec::new()));
        self.bit_offset = 0;
        Ok(writer.into_writer())
    }
}
