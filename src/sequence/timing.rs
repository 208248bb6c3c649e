//! Timing and trim consistency checks used by sequencer producers.

use std::collections::BTreeMap;

use anyhow::{Result, bail};

use crate::obu::{CodecConfigObu, DecodedUleb128};
use crate::sequence::data::AudioFrameWithData;
use crate::utils::errors::SequenceError;

/// Fails unless the producer's running timestamp matches the consumer's.
pub fn compare_timestamps(expected: i32, actual: i32) -> Result<()> {
    if expected != actual {
        bail!(SequenceError::TimestampMismatch { expected, actual });
    }
    Ok(())
}

/// Returns the frame length shared by every codec config.
///
/// Mixed frame lengths in one sequence are not supported.
pub fn get_common_samples_per_frame(
    codec_configs: &BTreeMap<u32, CodecConfigObu>,
) -> Result<u32> {
    let mut common = None;
    for codec_config in codec_configs.values() {
        let samples_per_frame = codec_config.num_samples_per_frame();
        match common {
            None => common = Some(samples_per_frame),
            Some(expected) if expected != samples_per_frame => {
                bail!(SequenceError::MismatchedSamplesPerFrame(
                    expected,
                    samples_per_frame
                ));
            }
            Some(_) => {}
        }
    }
    match common {
        Some(samples_per_frame) => Ok(samples_per_frame),
        None => bail!(SequenceError::NoCodecConfigs),
    }
}

#[derive(Default)]
struct TrimState {
    done_trimming_from_start: bool,
    cumulative_trim_at_start: u64,
    cumulative_trim_at_end: u64,
}

/// Validates per-substream trim placement and returns the cumulative
/// `(trim_at_end, trim_at_start)` totals every substream agrees on.
///
/// Rules, per substream: samples trimmed from the start must come from a
/// consecutive run of frames beginning at the first; at most one frame
/// may trim from the end; a frame may not be fully trimmed from the end.
/// With no frames at all the totals are zero, descriptor-only sequences
/// are legal.
pub fn validate_and_get_common_trim(
    common_samples_per_frame: u32,
    audio_frames: &[AudioFrameWithData],
) -> Result<(u64, u64)> {
    let mut states: BTreeMap<DecodedUleb128, TrimState> = BTreeMap::new();
    for audio_frame in audio_frames {
        let substream_id = audio_frame.obu.substream_id();
        let state = states.entry(substream_id).or_default();

        if state.cumulative_trim_at_end > 0 {
            bail!(SequenceError::TrimAtEndNotFinal);
        }
        let trim_at_end = u64::from(audio_frame.obu.header.num_samples_to_trim_at_end);
        let trim_at_start = u64::from(audio_frame.obu.header.num_samples_to_trim_at_start);

        if state.done_trimming_from_start && trim_at_start > 0 {
            bail!(SequenceError::NonConsecutiveTrimAtStart);
        }
        let total_trimmed = trim_at_end + trim_at_start;
        if total_trimmed > u64::from(common_samples_per_frame) {
            bail!(SequenceError::TrimExceedsFrame {
                samples_per_frame: common_samples_per_frame,
            });
        }
        if total_trimmed == u64::from(common_samples_per_frame) && trim_at_end > 0 {
            bail!(SequenceError::FullyTrimmedAtEnd);
        }

        if trim_at_start < u64::from(common_samples_per_frame) {
            state.done_trimming_from_start = true;
        }
        state.cumulative_trim_at_start += trim_at_start;
        state.cumulative_trim_at_end += trim_at_end;
    }

    let Some(first) = states.values().next() else {
        return Ok((0, 0));
    };
    let common_trim_at_end = first.cumulative_trim_at_end;
    let common_trim_at_start = first.cumulative_trim_at_start;
    for (substream_id, state) in &states {
        if state.cumulative_trim_at_end != common_trim_at_end
            || state.cumulative_trim_at_start != common_trim_at_start
        {
            bail!(SequenceError::InconsistentTrim {
                substream_id: *substream_id,
            });
        }
    }
    Ok((common_trim_at_end, common_trim_at_start))
}
