//! Bit-granular reading over an externally owned byte source.
//!
//! [`ReadBitBuffer`] keeps a bounded working buffer that is refilled from
//! the source on demand. Refilling discards any unread tail of the old
//! buffer; a failed refill rolls the source cursor back so a retry with
//! more data is well defined. All multi-bit fields are MSB-first.

use std::io;

use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::utils::errors::BitBufferError;
use crate::utils::leb::MAX_LEB128_SIZE;

/// Maximum length of a serialized string, including the null terminator.
pub const MAX_STRING_SIZE: usize = 128;

#[derive(Debug)]
pub struct ReadBitBuffer<'a> {
    source: &'a [u8],
    /// Bytes of `source` already moved into the working buffer.
    source_offset: usize,
    /// Working buffer capacity in bytes.
    capacity: usize,
    buffer: BitReader<io::Cursor<Vec<u8>>, BigEndian>,
    buffer_size_bits: u64,
}

impl<'a> ReadBitBuffer<'a> {
    /// `capacity` is a working-buffer size hint in bytes. The source is
    /// never mutated and must outlive the buffer.
    pub fn new(capacity: usize, source: &'a [u8]) -> Self {
        Self {
            source,
            source_offset: 0,
            capacity: capacity.max(8),
            buffer: BitReader::new(io::Cursor::new(Vec::new())),
            buffer_size_bits: 0,
        }
    }

    fn buffer_remaining_bits(&mut self) -> Result<u64, BitBufferError> {
        let position = self.buffer.position_in_bits()?;
        Ok(self.buffer_size_bits - position)
    }

    fn read_unsigned_literal_internal(
        &mut self,
        num_bits: u32,
        max_num_bits: u32,
    ) -> Result<u64, BitBufferError> {
        if num_bits > max_num_bits {
            return Err(BitBufferError::TooManyBits {
                num_bits,
                max: max_num_bits,
            });
        }
        if num_bits == 0 {
            return Ok(0);
        }

        let available = self.buffer_remaining_bits()?;
        if u64::from(num_bits) <= available {
            return Ok(self.buffer.read_unsigned_var(num_bits)?);
        }

        // The working buffer runs dry mid-read: consume what is buffered,
        // reload from the source and resume with the low bits.
        let upper_bits = available as u32;
        let mut upper = 0u64;
        if upper_bits > 0 {
            upper = self.buffer.read_unsigned_var(upper_bits)?;
        }
        let lower_bits = num_bits - upper_bits;
        self.load_bits(u64::from(lower_bits), false)?;
        let lower = self.buffer.read_unsigned_var::<u64>(lower_bits)?;

        Ok(if upper_bits == 0 {
            lower
        } else {
            upper << lower_bits | lower
        })
    }

    /// Reads `num_bits` (0..=64) into the low bits of a `u64`.
    pub fn read_unsigned_literal(&mut self, num_bits: u32) -> Result<u64, BitBufferError> {
        self.read_unsigned_literal_internal(num_bits, 64)
    }

    pub fn read_unsigned_literal_32(&mut self, num_bits: u32) -> Result<u32, BitBufferError> {
        Ok(self.read_unsigned_literal_internal(num_bits, 32)? as u32)
    }

    pub fn read_unsigned_literal_16(&mut self, num_bits: u32) -> Result<u16, BitBufferError> {
        Ok(self.read_unsigned_literal_internal(num_bits, 16)? as u16)
    }

    pub fn read_unsigned_literal_8(&mut self, num_bits: u32) -> Result<u8, BitBufferError> {
        Ok(self.read_unsigned_literal_internal(num_bits, 8)? as u8)
    }

    /// Reads 16 bits and reinterprets them as two's complement.
    pub fn read_signed_16(&mut self) -> Result<i16, BitBufferError> {
        Ok(self.read_unsigned_literal_internal(16, 16)? as u16 as i16)
    }

    pub fn read_boolean(&mut self) -> Result<bool, BitBufferError> {
        Ok(self.read_unsigned_literal_internal(1, 64)? != 0)
    }

    pub fn read_uint8_span(&mut self, output: &mut [u8]) -> Result<(), BitBufferError> {
        for byte in output.iter_mut() {
            *byte = self.read_unsigned_literal_8(8)?;
        }
        Ok(())
    }

    pub fn read_uint8_vec(&mut self, count: usize) -> Result<Vec<u8>, BitBufferError> {
        let mut out = vec![0u8; count];
        self.read_uint8_span(&mut out)?;
        Ok(out)
    }

    /// Reads a null-terminated string of at most [`MAX_STRING_SIZE`] bytes.
    pub fn read_string(&mut self) -> Result<String, BitBufferError> {
        let mut bytes = Vec::new();
        for _ in 0..MAX_STRING_SIZE {
            let byte = self.read_unsigned_literal_8(8)?;
            if byte == b'\0' {
                return String::from_utf8(bytes).map_err(|_| BitBufferError::InvalidUtf8);
            }
            bytes.push(byte);
        }
        Err(BitBufferError::UnterminatedString(MAX_STRING_SIZE))
    }

    pub fn read_uleb128(&mut self) -> Result<u32, BitBufferError> {
        Ok(self.read_uleb128_with_size()?.0)
    }

    /// Decodes a `leb128()` value along with its encoded byte length.
    ///
    /// Little-endian group order; the decoded value must fit 32 bits even
    /// though up to [`MAX_LEB128_SIZE`] groups may appear on the wire.
    pub fn read_uleb128_with_size(&mut self) -> Result<(u32, u8), BitBufferError> {
        let mut accumulated = 0u64;
        for i in 0..MAX_LEB128_SIZE {
            let byte = u64::from(self.read_unsigned_literal_8(8)?);
            accumulated |= (byte & 0x7f) << (7 * i as u32);
            let terminal = byte & 0x80 == 0;
            if i == MAX_LEB128_SIZE - 1 && !terminal {
                return Err(BitBufferError::Leb128TooLong(MAX_LEB128_SIZE));
            }
            if accumulated > u64::from(u32::MAX) {
                return Err(BitBufferError::ValueOverflow {
                    value: accumulated,
                    max: u64::from(u32::MAX),
                });
            }
            if terminal {
                return Ok((accumulated as u32, (i + 1) as u8));
            }
        }
        Err(BitBufferError::Leb128TooLong(MAX_LEB128_SIZE))
    }

    /// Decodes an ISO 14496-1 expanded size field.
    ///
    /// Shares the continuation-bit mechanics with `leb128()` but the groups
    /// accumulate in big-endian order and the overflow ceiling is supplied
    /// by the caller. The two wire formats must stay separate code paths.
    pub fn read_iso14496_1_expanded(
        &mut self,
        max_class_size: u32,
    ) -> Result<u32, BitBufferError> {
        let mut accumulated = 0u64;
        for i in 0..MAX_LEB128_SIZE {
            let byte = u64::from(self.read_unsigned_literal_8(8)?);
            accumulated = accumulated << 7 | (byte & 0x7f);
            let terminal = byte & 0x80 == 0;
            if i == MAX_LEB128_SIZE - 1 && !terminal {
                return Err(BitBufferError::Leb128TooLong(MAX_LEB128_SIZE));
            }
            if accumulated > u64::from(max_class_size) {
                return Err(BitBufferError::ValueOverflow {
                    value: accumulated,
                    max: u64::from(max_class_size),
                });
            }
            if terminal {
                return Ok(accumulated as u32);
            }
        }
        Err(BitBufferError::Leb128TooLong(MAX_LEB128_SIZE))
    }

    /// Refills the working buffer with at least `required_num_bits`.
    ///
    /// The unread tail of the old buffer is dropped on every reload. A
    /// plain load larger than the capacity hint grows the buffer to fit;
    /// a `fill_to_capacity` load never exceeds the capacity and fails if
    /// asked to. On a shortfall the source cursor keeps its pre-call
    /// position and the working buffer is left empty.
    pub fn load_bits(
        &mut self,
        required_num_bits: u64,
        fill_to_capacity: bool,
    ) -> Result<(), BitBufferError> {
        self.buffer = BitReader::new(io::Cursor::new(Vec::new()));
        self.buffer_size_bits = 0;

        let required_bytes = required_num_bits.div_ceil(8) as usize;
        if fill_to_capacity && required_bytes > self.capacity {
            return Err(BitBufferError::RequiredBitsExceedCapacity {
                required: required_num_bits,
                capacity: (self.capacity as u64) * 8,
            });
        }
        if required_bytes > self.capacity {
            self.capacity = required_bytes;
        }
        let want_bytes = if fill_to_capacity {
            self.capacity
        } else {
            required_bytes
        };
        let available_bytes = self.source.len() - self.source_offset;
        let take = want_bytes.min(available_bytes);
        if (take as u64) * 8 < required_num_bits {
            return Err(BitBufferError::SourceExhausted {
                required: required_num_bits,
                available: (take as u64) * 8,
            });
        }

        let chunk = self.source[self.source_offset..self.source_offset + take].to_vec();
        self.source_offset += take;
        self.buffer_size_bits = (take as u64) * 8;
        self.buffer = BitReader::new(io::Cursor::new(chunk));
        Ok(())
    }

    /// True if either the working buffer or the source has unread bits.
    pub fn is_data_available(&mut self) -> bool {
        let buffered = self.buffer_remaining_bits().map(|bits| bits > 0);
        buffered.unwrap_or(false) || self.source_offset < self.source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn literals_are_msb_first() -> Result<()> {
        let source = [0b1010_0001, 0b1111_0000];
        let mut rb = ReadBitBuffer::new(64, &source);

        assert_eq!(rb.read_unsigned_literal(3)?, 0b101);
        assert_eq!(rb.read_unsigned_literal(5)?, 0b0_0001);
        assert_eq!(rb.read_unsigned_literal(8)?, 0b1111_0000);
        Ok(())
    }

    #[test]
    fn zero_bit_read_is_a_noop() -> Result<()> {
        let mut rb = ReadBitBuffer::new(64, &[]);
        assert_eq!(rb.read_unsigned_literal(0)?, 0);
        Ok(())
    }

    #[test]
    fn reads_resume_across_working_buffer_reloads() -> Result<()> {
        let source = [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0];
        // A two-byte working buffer forces several reloads for one read.
        let mut rb = ReadBitBuffer::new(2, &source);
        // The constructor clamps tiny capacities; build one manually.
        rb.capacity = 2;

        assert_eq!(rb.read_unsigned_literal(4)?, 0x1);
        assert_eq!(rb.read_unsigned_literal(16)?, 0x2345);
        assert_eq!(rb.read_unsigned_literal(12)?, 0x678);
        Ok(())
    }

    #[test]
    fn reading_exactly_to_the_end_succeeds_one_bit_past_fails() -> Result<()> {
        let source = [0xab, 0xcd];
        let mut rb = ReadBitBuffer::new(64, &source);

        assert_eq!(rb.read_unsigned_literal(16)?, 0xabcd);
        assert!(!rb.is_data_available());
        assert!(matches!(
            rb.read_unsigned_literal(1),
            Err(BitBufferError::SourceExhausted { .. })
        ));
        Ok(())
    }

    #[test]
    fn typed_literals_reject_widths_beyond_the_output_type() {
        let source = [0u8; 8];
        let mut rb = ReadBitBuffer::new(64, &source);
        assert!(matches!(
            rb.read_unsigned_literal_8(9),
            Err(BitBufferError::TooManyBits { .. })
        ));
        assert!(matches!(
            rb.read_unsigned_literal_16(17),
            Err(BitBufferError::TooManyBits { .. })
        ));
        assert!(matches!(
            rb.read_unsigned_literal_32(33),
            Err(BitBufferError::TooManyBits { .. })
        ));
        assert!(matches!(
            rb.read_unsigned_literal(65),
            Err(BitBufferError::TooManyBits { .. })
        ));
    }

    #[test]
    fn read_signed_16_is_twos_complement() -> Result<()> {
        let source = [0xff, 0xfe, 0x7f, 0xff];
        let mut rb = ReadBitBuffer::new(64, &source);
        assert_eq!(rb.read_signed_16()?, -2);
        assert_eq!(rb.read_signed_16()?, i16::MAX);
        Ok(())
    }

    #[test]
    fn failed_load_rolls_the_source_cursor_back() -> Result<()> {
        let source = [0x01, 0x02];
        let mut rb = ReadBitBuffer::new(64, &source);

        assert!(matches!(
            rb.load_bits(24, false),
            Err(BitBufferError::SourceExhausted { .. })
        ));
        // The source was not consumed; the full 16 bits are still readable.
        assert!(rb.is_data_available());
        assert_eq!(rb.read_unsigned_literal(16)?, 0x0102);
        Ok(())
    }

    #[test]
    fn oversized_plain_loads_grow_past_the_capacity_hint() -> Result<()> {
        let source = [0x01, 0x02, 0x03];
        let mut rb = ReadBitBuffer::new(64, &source);
        rb.capacity = 2;

        // A plain load beyond the hint succeeds when the source has the
        // bytes; a fill-to-capacity load of the same size does not.
        assert!(matches!(
            rb.load_bits(24, true),
            Err(BitBufferError::RequiredBitsExceedCapacity { .. })
        ));
        rb.load_bits(24, false)?;
        assert_eq!(rb.read_unsigned_literal(24)?, 0x010203);
        Ok(())
    }

    #[test]
    fn uleb128_accumulates_little_endian_groups() -> Result<()> {
        let source = [0x81, 0x02, 0x7f];
        let mut rb = ReadBitBuffer::new(64, &source);
        assert_eq!(rb.read_uleb128_with_size()?, (0x101, 2));
        assert_eq!(rb.read_uleb128_with_size()?, (0x7f, 1));
        Ok(())
    }

    #[test]
    fn uleb128_rejects_unterminated_maximum_length_sequences() {
        let source = [0x80u8; MAX_LEB128_SIZE];
        let mut rb = ReadBitBuffer::new(64, &source);
        assert!(matches!(
            rb.read_uleb128(),
            Err(BitBufferError::Leb128TooLong(MAX_LEB128_SIZE))
        ));
    }

    #[test]
    fn uleb128_rejects_values_beyond_u32() {
        // Five full groups decode to 2^35 - 1, past the 32-bit ceiling.
        let source = [0xff, 0xff, 0xff, 0xff, 0x7f];
        let mut rb = ReadBitBuffer::new(64, &source);
        assert!(matches!(
            rb.read_uleb128(),
            Err(BitBufferError::ValueOverflow { .. })
        ));
    }

    #[test]
    fn iso14496_1_accumulates_big_endian_groups() -> Result<()> {
        // Same bytes as the uleb test, opposite group order.
        let source = [0x81, 0x02];
        let mut rb = ReadBitBuffer::new(64, &source);
        assert_eq!(rb.read_iso14496_1_expanded(u32::MAX)?, 0x82);
        Ok(())
    }

    #[test]
    fn iso14496_1_honors_the_caller_supplied_ceiling() {
        let source = [0x81, 0x02];
        let mut rb = ReadBitBuffer::new(64, &source);
        assert!(matches!(
            rb.read_iso14496_1_expanded(0x81),
            Err(BitBufferError::ValueOverflow { .. })
        ));
    }

    #[test]
    fn strings_stop_at_the_null_terminator() -> Result<()> {
        let source = b"mix\0tail";
        let mut rb = ReadBitBuffer::new(64, source);
        assert_eq!(rb.read_string()?, "mix");
        assert_eq!(rb.read_unsigned_literal_8(8)?, b't');
        Ok(())
    }

    #[test]
    fn unterminated_strings_are_rejected() {
        let source = [b'a'; MAX_STRING_SIZE + 1];
        let mut rb = ReadBitBuffer::new(256, &source);
        assert!(matches!(
            rb.read_string(),
            Err(BitBufferError::UnterminatedString(MAX_STRING_SIZE))
        ));
    }
}
