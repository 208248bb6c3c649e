//! IA Sequence Header OBU.
//!
//! First record of every IA sequence: a four-byte magic plus the primary
//! and additional profile the sequence conforms to. Profile compatibility
//! of mix presentations is checked against this pair before anything is
//! written.

use anyhow::{Result, bail};

use crate::obu::header::ObuHeader;
use crate::obu::{ObuType, write_obu_with_payload};
use crate::utils::errors::ObuError;
use crate::utils::read_bit_buffer::ReadBitBuffer;
use crate::utils::write_bit_buffer::WriteBitBuffer;

/// The `ia_code` magic, "iamf". Uppercase variants are rejected.
pub const IA_CODE: u32 = 0x6961_6D66;

/// Known IAMF profile versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileVersion {
    Simple,
    Base,
}

impl ProfileVersion {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ProfileVersion::Simple),
            1 => Ok(ProfileVersion::Base),
            unknown => bail!(ObuError::UnknownProfileVersion(unknown)),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            ProfileVersion::Simple => 0,
            ProfileVersion::Base => 1,
        }
    }

    /// Maximum number of audio elements a single mix presentation may
    /// reference under this profile.
    pub fn max_audio_elements_per_mix(self) -> usize {
        match self {
            ProfileVersion::Simple => 1,
            ProfileVersion::Base => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IaSequenceHeaderObu {
    pub header: ObuHeader,
    /// Stored raw so a constructed OBU with a bad magic fails at write
    /// time rather than at construction.
    pub ia_code: u32,
    pub primary_profile: ProfileVersion,
    pub additional_profile: ProfileVersion,
}

impl IaSequenceHeaderObu {
    pub fn new(
        header: ObuHeader,
        primary_profile: ProfileVersion,
        additional_profile: ProfileVersion,
    ) -> Self {
        Self {
            header,
            ia_code: IA_CODE,
            primary_profile,
            additional_profile,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ia_code != IA_CODE {
            bail!(ObuError::InvalidIaCode {
                got: self.ia_code,
                expected: IA_CODE,
            });
        }
        Ok(())
    }

    pub fn validate_and_write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        write_obu_with_payload(ObuType::IaSequenceHeader, &self.header, wb, |wb| {
            wb.write_unsigned_literal(u64::from(self.ia_code), 32)?;
            wb.write_unsigned_literal(u64::from(self.primary_profile.to_u8()), 8)?;
            wb.write_unsigned_literal(u64::from(self.additional_profile.to_u8()), 8)?;
            Ok(())
        })
    }

    pub(crate) fn read_payload(header: ObuHeader, rb: &mut ReadBitBuffer) -> Result<Self> {
        let ia_code = rb.read_unsigned_literal_32(32)?;
        if ia_code != IA_CODE {
            bail!(ObuError::InvalidIaCode {
                got: ia_code,
                expected: IA_CODE,
            });
        }
        let primary_profile = ProfileVersion::from_u8(rb.read_unsigned_literal_8(8)?)?;
        let additional_profile = ProfileVersion::from_u8(rb.read_unsigned_literal_8(8)?)?;
        Ok(Self {
            header,
            ia_code,
            primary_profile,
            additional_profile,
        })
    }
}
