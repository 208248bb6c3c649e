//! Variable-length integer encoding policies.
//!
//! IAMF requires every `leb128()` field to decode to a value that fits in
//! 32 bits and to occupy at most [`MAX_LEB128_SIZE`] bytes on the wire.
//! Encoders may legally pad with continuation groups, which some tooling
//! uses to reserve space; the policy is injected into
//! [`WriteBitBuffer`](crate::utils::write_bit_buffer::WriteBitBuffer).

use crate::utils::errors::BitBufferError;

/// Maximum number of bytes in a serialized `leb128()` value.
pub const MAX_LEB128_SIZE: usize = 8;

/// Encoding policy for `leb128()` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LebGenerator {
    /// Shortest valid encoding.
    #[default]
    Minimal,
    /// Always emit exactly this many bytes, padding the unused groups with
    /// zeros and keeping the continuation bit set on all but the last byte.
    FixedSize(u8),
}

impl LebGenerator {
    /// Serializes `value` according to the policy.
    pub fn generate(&self, value: u32) -> Result<Vec<u8>, BitBufferError> {
        match *self {
            LebGenerator::Minimal => {
                let mut out = Vec::with_capacity(5);
                let mut remaining = value;
                loop {
                    let mut byte = (remaining & 0x7f) as u8;
                    remaining >>= 7;
                    if remaining != 0 {
                        byte |= 0x80;
                    }
                    out.push(byte);
                    if remaining == 0 {
                        break;
                    }
                }
                Ok(out)
            }
            LebGenerator::FixedSize(size) => {
                let size = size as usize;
                if size == 0 || size > MAX_LEB128_SIZE {
                    return Err(BitBufferError::InvalidLebSize {
                        got: size as u8,
                        max: MAX_LEB128_SIZE,
                    });
                }
                if size < 5 && u64::from(value) >> (7 * size as u32) != 0 {
                    return Err(BitBufferError::ValueOverflow {
                        value: u64::from(value),
                        max: (1u64 << (7 * size as u32)) - 1,
                    });
                }
                let mut out = Vec::with_capacity(size);
                for i in 0..size {
                    let mut byte = ((u64::from(value) >> (7 * i as u32)) & 0x7f) as u8;
                    if i + 1 < size {
                        byte |= 0x80;
                    }
                    out.push(byte);
                }
                Ok(out)
            }
        }
    }
}
