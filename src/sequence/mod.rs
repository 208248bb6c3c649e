//! Temporal sequencing pipeline.
//!
//! Groups unordered frames, parameter blocks, and arbitrary OBUs into
//! tick-ordered temporal units, then serializes the descriptor block and
//! each unit to a sink under the all-or-nothing file contract.

pub mod data;
pub mod sequencer;
pub mod temporal_unit;
pub mod timing;

pub use data::{AudioElementWithData, AudioFrameWithData, DownMixingParams, ParameterBlockWithData};
pub use sequencer::{ObuSequencer, write_descriptor_obus, write_temporal_unit};
pub use temporal_unit::{TemporalUnit, TemporalUnitMap, generate_temporal_unit_map};

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use crate::obu::{
        AudioElementObu, AudioFrameObu, CodecConfigObu, DecoderConfig, IaSequenceHeaderObu,
        MixPresentationObu, MixPresentationSubMix, ObuHeader, ParameterBlockObu, ProfileVersion,
    };
    use crate::obu::codec_config::CODEC_ID_LPCM;
    use crate::sequence::data::{
        AudioElementWithData, AudioFrameWithData, DownMixingParams, ParameterBlockWithData,
    };

    pub(crate) fn lpcm_codec_config(
        codec_config_id: u32,
        num_samples_per_frame: u32,
    ) -> CodecConfigObu {
        CodecConfigObu {
            header: ObuHeader::default(),
            codec_config_id,
            codec_id: CODEC_ID_LPCM,
            num_samples_per_frame,
            audio_roll_distance: 0,
            decoder_config: DecoderConfig::Lpcm {
                sample_format_flags: 0,
                sample_size: 16,
                sample_rate: 48_000,
            },
        }
    }

    /// Audio elements keyed by ID, each linked to codec config 11.
    pub(crate) fn audio_element_map(
        elements: &[(u32, Vec<u32>)],
    ) -> BTreeMap<u32, AudioElementWithData> {
        elements
            .iter()
            .map(|(audio_element_id, substream_ids)| {
                (
                    *audio_element_id,
                    AudioElementWithData {
                        obu: AudioElementObu {
                            header: ObuHeader::default(),
                            audio_element_id: *audio_element_id,
                            audio_element_type: 0,
                            codec_config_id: 11,
                            audio_substream_ids: substream_ids.clone(),
                            config_bytes: vec![],
                        },
                        codec_config_id: 11,
                    },
                )
            })
            .collect()
    }

    pub(crate) fn audio_frame(
        audio_element_id: u32,
        substream_id: u32,
        start_timestamp: i32,
    ) -> AudioFrameWithData {
        AudioFrameWithData {
            obu: AudioFrameObu::new(ObuHeader::default(), substream_id, vec![0x42]),
            start_timestamp,
            end_timestamp: start_timestamp + 8,
            raw_samples: vec![],
            down_mixing_params: DownMixingParams::default(),
            audio_element_id,
        }
    }

    pub(crate) fn trimmed_audio_frame(
        audio_element_id: u32,
        substream_id: u32,
        start_timestamp: i32,
        trim_at_end: u32,
        trim_at_start: u32,
    ) -> AudioFrameWithData {
        let mut frame = audio_frame(audio_element_id, substream_id, start_timestamp);
        frame.obu.header = ObuHeader {
            obu_trimming_status_flag: true,
            num_samples_to_trim_at_end: trim_at_end,
            num_samples_to_trim_at_start: trim_at_start,
            ..Default::default()
        };
        frame
    }

    pub(crate) fn parameter_block(
        parameter_id: u32,
        start_timestamp: i32,
    ) -> ParameterBlockWithData {
        ParameterBlockWithData {
            obu: ParameterBlockObu {
                header: ObuHeader::default(),
                parameter_id,
                payload_bytes: vec![0x99],
            },
            start_timestamp,
            end_timestamp: start_timestamp + 8,
        }
    }

    pub(crate) fn ia_sequence_header(
        primary: ProfileVersion,
        additional: ProfileVersion,
    ) -> IaSequenceHeaderObu {
        IaSequenceHeaderObu::new(ObuHeader::default(), primary, additional)
    }

    pub(crate) fn mix_presentation(
        mix_presentation_id: u32,
        audio_element_ids: Vec<u32>,
    ) -> MixPresentationObu {
        MixPresentationObu {
            header: ObuHeader::default(),
            mix_presentation_id,
            annotations_language: vec!["en-us".into()],
            localized_presentation_annotations: vec!["Mix".into()],
            sub_mixes: vec![MixPresentationSubMix { audio_element_ids }],
            trailing_bytes: vec![],
        }
    }
}
