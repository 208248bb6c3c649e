//! Descriptor and temporal-unit writers, plus the file-level sequencer.
//!
//! Ordering is deterministic regardless of input iteration order:
//! descriptors go header, codec configs, audio elements, mix
//! presentations (ascending ID within a type); each temporal unit goes
//! delimiter, parameter blocks, audio frames, with arbitrary OBUs
//! interleaved at their insertion hooks.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use log::{debug, info, warn};

use crate::obu::arbitrary::{ArbitraryObu, InsertionHook};
use crate::obu::{CodecConfigObu, IaSequenceHeaderObu, MixPresentationObu, TemporalDelimiterObu};
use crate::sequence::data::{AudioElementWithData, AudioFrameWithData, ParameterBlockWithData};
use crate::sequence::temporal_unit::{TemporalUnit, TemporalUnitMap, generate_temporal_unit_map};
use crate::utils::errors::SequenceError;
use crate::utils::leb::LebGenerator;
use crate::utils::write_bit_buffer::WriteBitBuffer;

/// Writes the descriptor block: IA Sequence Header, codec configs, audio
/// elements, then mix presentations, ascending by ID within each type
/// regardless of input order, with hook-driven arbitrary OBU
/// interleaving.
///
/// Every mix presentation must be decodable under at least one of the
/// sequence header's declared profiles; an incompatible presentation
/// fails the call before anything is written. OBUs hooked after the
/// descriptor block are dropped, nothing may follow the mix
/// presentations.
pub fn write_descriptor_obus(
    ia_sequence_header: &IaSequenceHeaderObu,
    codec_configs: &BTreeMap<u32, CodecConfigObu>,
    audio_elements: &BTreeMap<u32, AudioElementWithData>,
    mix_presentations: &[MixPresentationObu],
    arbitrary_obus: &[ArbitraryObu],
    wb: &mut WriteBitBuffer,
) -> Result<()> {
    for mix_presentation in mix_presentations {
        let supported = mix_presentation.supports_profile(ia_sequence_header.primary_profile)
            || mix_presentation.supports_profile(ia_sequence_header.additional_profile);
        if !supported {
            bail!(SequenceError::IncompatibleMixPresentation {
                mix_presentation_id: mix_presentation.mix_presentation_id,
                num_audio_elements: mix_presentation.num_audio_elements(),
            });
        }
    }

    let dropped = arbitrary_obus
        .iter()
        .filter(|obu| obu.insertion_hook == InsertionHook::AfterDescriptors)
        .count();
    if dropped > 0 {
        debug!("dropping {dropped} arbitrary OBU(s) hooked after the descriptor block");
    }
    let hooked: Vec<&ArbitraryObu> = arbitrary_obus.iter().collect();

    ia_sequence_header.validate_and_write(wb)?;
    ArbitraryObu::write_obus_with_hook(InsertionHook::AfterIaSequenceHeader, &hooked, wb)?;

    for codec_config in codec_configs.values() {
        codec_config.validate_and_write(wb)?;
    }
    ArbitraryObu::write_obus_with_hook(InsertionHook::AfterCodecConfigs, &hooked, wb)?;

    for audio_element in audio_elements.values() {
        audio_element.obu.validate_and_write(wb)?;
    }
    ArbitraryObu::write_obus_with_hook(InsertionHook::AfterAudioElements, &hooked, wb)?;

    let mut ordered_mix_presentations: Vec<&MixPresentationObu> =
        mix_presentations.iter().collect();
    ordered_mix_presentations.sort_by_key(|obu| obu.mix_presentation_id);
    for mix_presentation in ordered_mix_presentations {
        mix_presentation.validate_and_write(wb)?;
    }
    ArbitraryObu::write_obus_with_hook(InsertionHook::AfterMixPresentations, &hooked, wb)?;

    Ok(())
}

/// Writes one temporal unit and adds its untrimmed sample count to
/// `num_samples`.
///
/// Emission order: optional temporal delimiter, before-hooks, parameter
/// blocks, after-parameter-block hooks, audio frames, after-audio-frame
/// hooks. Frames and parameter blocks are expected pre-sorted by
/// [`generate_temporal_unit_map`]. Every frame must resolve to an audio
/// element and that element to a codec config.
pub fn write_temporal_unit(
    include_temporal_delimiters: bool,
    temporal_unit: &TemporalUnit,
    audio_elements: &BTreeMap<u32, AudioElementWithData>,
    codec_configs: &BTreeMap<u32, CodecConfigObu>,
    wb: &mut WriteBitBuffer,
    num_samples: &mut u64,
) -> Result<()> {
    if include_temporal_delimiters {
        TemporalDelimiterObu::default().validate_and_write(wb)?;
    }

    ArbitraryObu::write_obus_with_hook(
        InsertionHook::BeforeParameterBlocksAtTick,
        &temporal_unit.arbitrary_obus,
        wb,
    )?;
    for parameter_block in &temporal_unit.parameter_blocks {
        parameter_block.obu.validate_and_write(wb)?;
    }
    ArbitraryObu::write_obus_with_hook(
        InsertionHook::AfterParameterBlocksAtTick,
        &temporal_unit.arbitrary_obus,
        wb,
    )?;

    for (index, audio_frame) in temporal_unit.audio_frames.iter().enumerate() {
        let Some(audio_element) = audio_elements.get(&audio_frame.audio_element_id) else {
            bail!(SequenceError::AudioElementNotFound(
                audio_frame.audio_element_id
            ));
        };
        let Some(codec_config) = codec_configs.get(&audio_element.codec_config_id) else {
            bail!(SequenceError::CodecConfigNotFound {
                audio_element_id: audio_frame.audio_element_id,
                codec_config_id: audio_element.codec_config_id,
            });
        };
        audio_frame.obu.validate_and_write(wb)?;

        // All frames of a unit cover the same tick; the first one is
        // enough for duration accounting.
        if index == 0 {
            let header = &audio_frame.obu.header;
            let trimmed = u64::from(header.num_samples_to_trim_at_start)
                + u64::from(header.num_samples_to_trim_at_end);
            *num_samples +=
                u64::from(codec_config.num_samples_per_frame()).saturating_sub(trimmed);
        }
    }
    ArbitraryObu::write_obus_with_hook(
        InsertionHook::AfterAudioFramesAtTick,
        &temporal_unit.arbitrary_obus,
        wb,
    )?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequencerState {
    Idle,
    DescriptorsWritten,
    Writing,
    Closed,
}

#[derive(Debug)]
enum Sink {
    File { file: BufWriter<File>, path: PathBuf },
    Discard,
}

impl Sink {
    fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if !path.as_os_str().is_empty() => {
                let file = BufWriter::new(File::create(path)?);
                Ok(Sink::File {
                    file,
                    path: path.to_path_buf(),
                })
            }
            _ => Ok(Sink::Discard),
        }
    }

    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        if let Sink::File { file, .. } = self {
            file.write_all(bytes)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if let Sink::File { file, .. } = self {
            file.flush()?;
        }
        Ok(())
    }

    /// Removes any partially written file. Never fails; a leftover file
    /// is logged and abandoned.
    fn abort(&mut self) {
        if let Sink::File { path, .. } = self {
            if let Err(err) = fs::remove_file(&path) {
                warn!("failed to remove partial output {}: {err}", path.display());
            }
        }
    }
}

/// Serializes a whole IA sequence to a file, or validates it against a
/// discarding sink when no output path is given.
///
/// The contract is all-or-nothing: a failed call never leaves an output
/// file on disk, and the sequencer refuses further writes afterwards.
#[derive(Debug)]
pub struct ObuSequencer {
    output_path: Option<PathBuf>,
    include_temporal_delimiters: bool,
    leb_generator: LebGenerator,
    state: SequencerState,
}

impl ObuSequencer {
    pub fn new(
        output_path: Option<PathBuf>,
        include_temporal_delimiters: bool,
        leb_generator: LebGenerator,
    ) -> Self {
        Self {
            output_path,
            include_temporal_delimiters,
            leb_generator,
            state: SequencerState::Idle,
        }
    }

    /// Writes the descriptor block followed by every temporal unit in
    /// ascending tick order.
    #[allow(clippy::too_many_arguments)]
    pub fn pick_and_place(
        &mut self,
        ia_sequence_header: &IaSequenceHeaderObu,
        codec_configs: &BTreeMap<u32, CodecConfigObu>,
        audio_elements: &BTreeMap<u32, AudioElementWithData>,
        mix_presentations: &[MixPresentationObu],
        audio_frames: &[AudioFrameWithData],
        parameter_blocks: &[ParameterBlockWithData],
        arbitrary_obus: &[ArbitraryObu],
    ) -> Result<()> {
        if self.state == SequencerState::Closed {
            bail!(SequenceError::SequencerClosed);
        }
        let result = self.pick_and_place_inner(
            ia_sequence_header,
            codec_configs,
            audio_elements,
            mix_presentations,
            audio_frames,
            parameter_blocks,
            arbitrary_obus,
        );
        // Success or failure, the sequencer is spent.
        self.state = SequencerState::Closed;
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn pick_and_place_inner(
        &mut self,
        ia_sequence_header: &IaSequenceHeaderObu,
        codec_configs: &BTreeMap<u32, CodecConfigObu>,
        audio_elements: &BTreeMap<u32, AudioElementWithData>,
        mix_presentations: &[MixPresentationObu],
        audio_frames: &[AudioFrameWithData],
        parameter_blocks: &[ParameterBlockWithData],
        arbitrary_obus: &[ArbitraryObu],
    ) -> Result<()> {
        let temporal_unit_map = generate_temporal_unit_map(
            audio_frames,
            parameter_blocks,
            arbitrary_obus,
            audio_elements,
        )?;

        // Descriptors serialize before the sink opens so a failure here
        // never creates a file at all.
        let mut wb = WriteBitBuffer::new(self.leb_generator);
        write_descriptor_obus(
            ia_sequence_header,
            codec_configs,
            audio_elements,
            mix_presentations,
            arbitrary_obus,
            &mut wb,
        )?;
        let descriptor_bytes = wb.flush()?;

        let mut sink = Sink::open(self.output_path.as_deref())?;
        match self.write_units(
            descriptor_bytes,
            &temporal_unit_map,
            audio_elements,
            codec_configs,
            &mut sink,
        ) {
            Ok(num_samples) => {
                info!(
                    "wrote {} temporal unit(s), {num_samples} untrimmed samples",
                    temporal_unit_map.len()
                );
                Ok(())
            }
            Err(err) => {
                sink.abort();
                Err(err)
            }
        }
    }

    fn write_units(
        &mut self,
        descriptor_bytes: Vec<u8>,
        temporal_unit_map: &TemporalUnitMap,
        audio_elements: &BTreeMap<u32, AudioElementWithData>,
        codec_configs: &BTreeMap<u32, CodecConfigObu>,
        sink: &mut Sink,
    ) -> Result<u64> {
        sink.push(&descriptor_bytes)?;
        self.state = SequencerState::DescriptorsWritten;

        let mut wb = WriteBitBuffer::new(self.leb_generator);
        let mut num_samples = 0;
        for temporal_unit in temporal_unit_map.values() {
            self.state = SequencerState::Writing;
            write_temporal_unit(
                self.include_temporal_delimiters,
                temporal_unit,
                audio_elements,
                codec_configs,
                &mut wb,
                &mut num_samples,
            )?;
            sink.push(&wb.flush()?)?;
        }
        sink.finalize()?;
        Ok(num_samples)
    }
}
