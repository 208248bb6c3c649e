//! Temporal unit construction.
//!
//! A temporal unit borrows the frames, parameter blocks, and arbitrary
//! OBUs that share one playback tick. Units never own their records and
//! must not outlive the collections they point into; the map is built
//! once per output pass and consumed immediately.

use std::collections::BTreeMap;

use anyhow::{Result, bail};

use crate::obu::arbitrary::ArbitraryObu;
use crate::sequence::data::{AudioElementWithData, AudioFrameWithData, ParameterBlockWithData};
use crate::utils::errors::SequenceError;

#[derive(Debug, Default)]
pub struct TemporalUnit<'a> {
    pub audio_frames: Vec<&'a AudioFrameWithData>,
    pub parameter_blocks: Vec<&'a ParameterBlockWithData>,
    pub arbitrary_obus: Vec<&'a ArbitraryObu>,
}

/// Tick-keyed temporal units in ascending order.
pub type TemporalUnitMap<'a> = BTreeMap<i32, TemporalUnit<'a>>;

/// Groups the full unordered collections of one sequence by tick.
///
/// Audio frames key on their start timestamp and sort ascending by
/// `(audio_element_id, substream_id)`; parameter blocks sort ascending by
/// `parameter_id`. Arbitrary OBUs without an insertion tick belong to the
/// descriptor phase and are omitted here. A frame naming an audio element
/// absent from `audio_elements` fails the whole call.
pub fn generate_temporal_unit_map<'a>(
    audio_frames: &'a [AudioFrameWithData],
    parameter_blocks: &'a [ParameterBlockWithData],
    arbitrary_obus: &'a [ArbitraryObu],
    audio_elements: &BTreeMap<u32, AudioElementWithData>,
) -> Result<TemporalUnitMap<'a>> {
    let mut map = TemporalUnitMap::new();

    for frame in audio_frames {
        if !audio_elements.contains_key(&frame.audio_element_id) {
            bail!(SequenceError::AudioElementNotFound(frame.audio_element_id));
        }
        map.entry(frame.start_timestamp)
            .or_default()
            .audio_frames
            .push(frame);
    }
    for parameter_block in parameter_blocks {
        map.entry(parameter_block.start_timestamp)
            .or_default()
            .parameter_blocks
            .push(parameter_block);
    }
    for arbitrary_obu in arbitrary_obus {
        if let Some(tick) = arbitrary_obu.insertion_tick {
            map.entry(tick).or_default().arbitrary_obus.push(arbitrary_obu);
        }
    }

    for unit in map.values_mut() {
        unit.audio_frames
            .sort_by_key(|frame| (frame.audio_element_id, frame.obu.substream_id()));
        unit.parameter_blocks
            .sort_by_key(|block| block.obu.parameter_id);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obu::ObuHeader;
    use crate::obu::arbitrary::InsertionHook;
    use crate::sequence::tests::{audio_element_map, audio_frame, parameter_block};
    use anyhow::Result;

    #[test]
    fn frames_sort_by_audio_element_id_then_substream_id() -> Result<()> {
        let audio_elements = audio_element_map(&[(100, vec![2000, 4000]), (200, vec![3000, 5000])]);
        // Scrambled relative to the expected output order.
        let frames = vec![
            audio_frame(200, 5000, 0),
            audio_frame(100, 4000, 0),
            audio_frame(200, 3000, 0),
            audio_frame(100, 2000, 0),
        ];

        let map = generate_temporal_unit_map(&frames, &[], &[], &audio_elements)?;
        assert_eq!(map.len(), 1);
        let ordered: Vec<(u32, u32)> = map[&0]
            .audio_frames
            .iter()
            .map(|f| (f.audio_element_id, f.obu.substream_id()))
            .collect();
        assert_eq!(
            ordered,
            vec![(100, 2000), (100, 4000), (200, 3000), (200, 5000)]
        );
        Ok(())
    }

    #[test]
    fn parameter_blocks_sort_by_parameter_id() -> Result<()> {
        let blocks = vec![
            parameter_block(999, 0),
            parameter_block(998, 0),
            parameter_block(1000, 0),
        ];
        let map = generate_temporal_unit_map(&[], &blocks, &[], &BTreeMap::new())?;
        let ordered: Vec<u32> = map[&0]
            .parameter_blocks
            .iter()
            .map(|b| b.obu.parameter_id)
            .collect();
        assert_eq!(ordered, vec![998, 999, 1000]);
        Ok(())
    }

    #[test]
    fn frames_naming_an_unknown_audio_element_fail() {
        let audio_elements = audio_element_map(&[(100, vec![0])]);
        let frames = vec![audio_frame(101, 0, 0)];
        assert!(generate_temporal_unit_map(&frames, &[], &[], &audio_elements).is_err());
    }

    #[test]
    fn arbitrary_obus_without_a_tick_are_omitted() -> Result<()> {
        let no_tick = ArbitraryObu::new(
            ObuHeader::default(),
            24,
            vec![],
            InsertionHook::AfterIaSequenceHeader,
            None,
        );
        let map = generate_temporal_unit_map(
            &[],
            &[],
            std::slice::from_ref(&no_tick),
            &BTreeMap::new(),
        )?;
        assert!(map.is_empty());
        Ok(())
    }

    #[test]
    fn each_insertion_tick_gets_its_own_unit() -> Result<()> {
        let obus = vec![
            ArbitraryObu::new(
                ObuHeader::default(),
                24,
                vec![],
                InsertionHook::BeforeParameterBlocksAtTick,
                Some(50),
            ),
            ArbitraryObu::new(
                ObuHeader::default(),
                24,
                vec![],
                InsertionHook::AfterAudioFramesAtTick,
                Some(-10),
            ),
        ];
        let map = generate_temporal_unit_map(&[], &[], &obus, &BTreeMap::new())?;
        // Ascending tick order, including negative ticks.
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![-10, 50]);
        Ok(())
    }

    #[test]
    fn empty_inputs_produce_an_empty_map() -> Result<()> {
        let map = generate_temporal_unit_map(&[], &[], &[], &BTreeMap::new())?;
        assert!(map.is_empty());
        Ok(())
    }
}
