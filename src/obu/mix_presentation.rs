//! Mix Presentation OBU.
//!
//! Describes one way to present the audio elements of a sequence. Only
//! the fields the sequencer needs are parsed: the presentation ID, the
//! localized annotations, and which audio elements each sub-mix pulls in.
//! Rendering and loudness metadata round-trip as raw bytes after the
//! sub-mix list.

use anyhow::{Result, bail};

use crate::obu::header::ObuHeader;
use crate::obu::ia_sequence_header::ProfileVersion;
use crate::obu::{DecodedUleb128, ObuType, write_obu_with_payload};
use crate::utils::errors::ObuError;
use crate::utils::read_bit_buffer::ReadBitBuffer;
use crate::utils::write_bit_buffer::WriteBitBuffer;

#[derive(Debug, Clone, PartialEq)]
pub struct MixPresentationSubMix {
    pub audio_element_ids: Vec<DecodedUleb128>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixPresentationObu {
    pub header: ObuHeader,
    pub mix_presentation_id: DecodedUleb128,
    pub annotations_language: Vec<String>,
    /// One entry per language, same order as `annotations_language`.
    pub localized_presentation_annotations: Vec<String>,
    pub sub_mixes: Vec<MixPresentationSubMix>,
    /// Rendering and loudness metadata, carried verbatim.
    pub trailing_bytes: Vec<u8>,
}

impl MixPresentationObu {
    /// Total number of audio elements referenced across all sub-mixes.
    pub fn num_audio_elements(&self) -> usize {
        self.sub_mixes.iter().map(|sm| sm.audio_element_ids.len()).sum()
    }

    /// Whether this presentation can be decoded under `profile`.
    pub fn supports_profile(&self, profile: ProfileVersion) -> bool {
        self.num_audio_elements() <= profile.max_audio_elements_per_mix()
    }

    fn validate(&self) -> Result<()> {
        if self.annotations_language.len() != self.localized_presentation_annotations.len() {
            bail!(ObuError::MismatchedAnnotations {
                count_label: self.annotations_language.len(),
                actual: self.localized_presentation_annotations.len(),
            });
        }
        Ok(())
    }

    pub fn validate_and_write(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        self.validate()?;
        write_obu_with_payload(ObuType::MixPresentation, &self.header, wb, |wb| {
            wb.write_uleb128(self.mix_presentation_id)?;
            let count_label = u32::try_from(self.annotations_language.len())
                .map_err(|_| ObuError::PayloadTooLarge(self.annotations_language.len()))?;
            wb.write_uleb128(count_label)?;
            for language in &self.annotations_language {
                wb.write_string(language)?;
            }
            for annotation in &self.localized_presentation_annotations {
                wb.write_string(annotation)?;
            }
            let num_sub_mixes = u32::try_from(self.sub_mixes.len())
                .map_err(|_| ObuError::PayloadTooLarge(self.sub_mixes.len()))?;
            wb.write_uleb128(num_sub_mixes)?;
            for sub_mix in &self.sub_mixes {
                let num_audio_elements = u32::try_from(sub_mix.audio_element_ids.len())
                    .map_err(|_| ObuError::PayloadTooLarge(sub_mix.audio_element_ids.len()))?;
                wb.write_uleb128(num_audio_elements)?;
                for &audio_element_id in &sub_mix.audio_element_ids {
                    wb.write_uleb128(audio_element_id)?;
                }
            }
            wb.write_uint8_span(&self.trailing_bytes)?;
            Ok(())
        })
    }

    pub(crate) fn read_payload(header: ObuHeader, rb: &mut ReadBitBuffer) -> Result<Self> {
        let mix_presentation_id = rb.read_uleb128()?;
        // Counts are wire-supplied; the vectors grow as entries actually
        // parse so a hostile count fails on the bounded payload instead
        // of reserving memory up front.
        let count_label = rb.read_uleb128()?;
        let mut annotations_language = Vec::new();
        for _ in 0..count_label {
            annotations_language.push(rb.read_string()?);
        }
        let mut localized_presentation_annotations = Vec::new();
        for _ in 0..count_label {
            localized_presentation_annotations.push(rb.read_string()?);
        }
        let num_sub_mixes = rb.read_uleb128()?;
        let mut sub_mixes = Vec::new();
        for _ in 0..num_sub_mixes {
            let num_audio_elements = rb.read_uleb128()?;
            let mut audio_element_ids = Vec::new();
            for _ in 0..num_audio_elements {
                audio_element_ids.push(rb.read_uleb128()?);
            }
            sub_mixes.push(MixPresentationSubMix { audio_element_ids });
        }
        let mut trailing_bytes = Vec::new();
        while rb.is_data_available() {
            trailing_bytes.push(rb.read_unsigned_literal_8(8)?);
        }

        Ok(Self {
            header,
            mix_presentation_id,
            annotations_language,
            localized_presentation_annotations,
            sub_mixes,
            trailing_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obu::Obu;
    use anyhow::Result;

    fn presentation(id: u32, audio_element_ids: Vec<u32>) -> MixPresentationObu {
        MixPresentationObu {
            header: ObuHeader::default(),
            mix_presentation_id: id,
            annotations_language: vec!["en-us".into()],
            localized_presentation_annotations: vec!["Mix".into()],
            sub_mixes: vec![MixPresentationSubMix { audio_element_ids }],
            trailing_bytes: vec![],
        }
    }

    #[test]
    fn round_trips() -> Result<()> {
        let obu = presentation(42, vec![100, 200]);
        let mut wb = WriteBitBuffer::default();
        obu.validate_and_write(&mut wb)?;
        let bytes = wb.flush()?;

        let mut rb = ReadBitBuffer::new(64, &bytes);
        assert_eq!(Obu::read(&mut rb)?, Obu::MixPresentation(obu));
        Ok(())
    }

    #[test]
    fn profile_support_follows_the_element_count() {
        let one = presentation(1, vec![100]);
        assert!(one.supports_profile(ProfileVersion::Simple));
        assert!(one.supports_profile(ProfileVersion::Base));

        let two = presentation(2, vec![100, 200]);
        assert!(!two.supports_profile(ProfileVersion::Simple));
        assert!(two.supports_profile(ProfileVersion::Base));

        let three = MixPresentationObu {
            sub_mixes: vec![
                MixPresentationSubMix {
                    audio_element_ids: vec![100, 200],
                },
                MixPresentationSubMix {
                    audio_element_ids: vec![300],
                },
            ],
            ..presentation(3, vec![])
        };
        assert_eq!(three.num_audio_elements(), 3);
        assert!(!three.supports_profile(ProfileVersion::Base));
    }

    #[test]
    fn hostile_sub_mix_counts_fail_instead_of_allocating() {
        // A 7-byte payload claiming num_sub_mixes = u32::MAX. Parsing
        // must run out of payload bytes, not reserve gigabytes.
        let bytes = [2 << 3, 7, 42, 0, 0xff, 0xff, 0xff, 0xff, 0x0f];
        let mut rb = ReadBitBuffer::new(64, &bytes);
        assert!(Obu::read(&mut rb).is_err());
    }

    #[test]
    fn hostile_label_counts_fail_instead_of_allocating() {
        // count_label = u32::MAX with no string bytes behind it.
        let bytes = [2 << 3, 6, 42, 0xff, 0xff, 0xff, 0xff, 0x0f];
        let mut rb = ReadBitBuffer::new(64, &bytes);
        assert!(Obu::read(&mut rb).is_err());
    }

    #[test]
    fn mismatched_annotation_counts_are_rejected() {
        let obu = MixPresentationObu {
            localized_presentation_annotations: vec![],
            ..presentation(9, vec![100])
        };
        let mut wb = WriteBitBuffer::default();
        assert!(obu.validate_and_write(&mut wb).is_err());
        assert_eq!(wb.bit_offset(), 0);
    }
}
