//! Arbitrary OBU.
//!
//! An opaque record of any type tag, placed into the output sequence at
//! the position named by its [`InsertionHook`]. Used for extension and
//! reserved OBUs the rest of the crate does not interpret.

use anyhow::{Result, bail};

use crate::obu::header::ObuHeader;
use crate::obu::{ObuType, write_obu_with_payload};
use crate::utils::errors::ObuError;
use crate::utils::write_bit_buffer::WriteBitBuffer;

/// Where in the output sequence an arbitrary OBU is emitted.
///
/// The `...AtTick` hooks anchor to a temporal unit and require an
/// insertion tick; the rest anchor to the descriptor block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionHook {
    AfterIaSequenceHeader,
    AfterCodecConfigs,
    AfterAudioElements,
    AfterMixPresentations,
    /// Dropped at write time. Nothing may follow the descriptor block,
    /// downstream container framing assumes it ends at Mix Presentations.
    AfterDescriptors,
    BeforeParameterBlocksAtTick,
    AfterParameterBlocksAtTick,
    AfterAudioFramesAtTick,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArbitraryObu {
    pub header: ObuHeader,
    /// Raw 5-bit type tag.
    pub obu_type: u8,
    pub payload: Vec<u8>,
    pub insertion_hook: InsertionHook,
    /// Required for the `...AtTick` hooks, absent otherwise.
    pub insertion_tick: Option<i32>,
    /// Marks an OBU that must not reach a finished bitstream. Writing it
    /// fails, which exercises the all-or-nothing output contract.
    pub invalidates_bitstream: bool,
}

impl ArbitraryObu {
    pub fn new(
        header: ObuHeader,
        obu_type: u8,
        payload: Vec<u8>,
        insertion_hook: InsertionHook,
        insertion_tick: Option<i32>,
    ) -> Self {
        Self {
            header,
            obu_type,
            payload,
            insertion_hook,
            insertion_tick,
            invalidates_bitstream: false,
        }
    }

    /// Wraps a reserved OBU encountered on the read path.
    pub(crate) fn from_reserved(obu_type: u8, header: ObuHeader, payload: Vec<u8>) -> Self {
        Self::new(
            header,
            obu_type,
            payload,
            InsertionHook::AfterDescriptors,
            None,
        )
    }

    pub fn validate_and_write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        if self.invalidates_bitstream {
            bail!(ObuError::InvalidatedArbitraryObu);
        }
        write_obu_with_payload(ObuType::from_u8(self.obu_type), &self.header, wb, |wb| {
            wb.write_uint8_span(&self.payload)?;
            Ok(())
        })
    }

    /// Writes every OBU in `obus` whose hook matches `hook`, preserving
    /// input order.
    pub fn write_obus_with_hook(
        hook: InsertionHook,
        obus: &[&ArbitraryObu],
        wb: &mut WriteBitBuffer,
    ) -> Result<()> {
        for obu in obus {
            if obu.insertion_hook == hook {
                obu.validate_and_write(wb)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn serializes_the_raw_type_and_payload() -> Result<()> {
        let obu = ArbitraryObu::new(
            ObuHeader::default(),
            24,
            vec![0x01, 0x02],
            InsertionHook::AfterIaSequenceHeader,
            None,
        );
        let mut wb = WriteBitBuffer::default();
        obu.validate_and_write(&mut wb)?;
        assert_eq!(wb.flush()?, vec![24 << 3, 2, 0x01, 0x02]);
        Ok(())
    }

    #[test]
    fn invalidating_obus_refuse_to_write() {
        let obu = ArbitraryObu {
            invalidates_bitstream: true,
            ..ArbitraryObu::new(
                ObuHeader::default(),
                24,
                vec![],
                InsertionHook::AfterDescriptors,
                None,
            )
        };
        let mut wb = WriteBitBuffer::default();
        assert!(obu.validate_and_write(&mut wb).is_err());
        assert_eq!(wb.bit_offset(), 0);
    }

    #[test]
    fn hook_filter_preserves_input_order() -> Result<()> {
        let first = ArbitraryObu::new(
            ObuHeader::default(),
            25,
            vec![0xaa],
            InsertionHook::AfterCodecConfigs,
            None,
        );
        let skipped = ArbitraryObu::new(
            ObuHeader::default(),
            25,
            vec![0xbb],
            InsertionHook::AfterAudioElements,
            None,
        );
        let second = ArbitraryObu::new(
            ObuHeader::default(),
            25,
            vec![0xcc],
            InsertionHook::AfterCodecConfigs,
            None,
        );

        let mut wb = WriteBitBuffer::default();
        ArbitraryObu::write_obus_with_hook(
            InsertionHook::AfterCodecConfigs,
            &[&first, &skipped, &second],
            &mut wb,
        )?;
        assert_eq!(wb.flush()?, vec![25 << 3, 1, 0xaa, 25 << 3, 1, 0xcc]);
        Ok(())
    }
}
