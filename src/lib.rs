#![doc = include_str!("../README.md")]
//!
//! ## Quick Start
//!
//! 1. Build the descriptor OBUs ([`obu`]) that describe the sequence.
//! 2. Wrap frames and parameter blocks with their timing data
//!    ([`sequence::data`]).
//! 3. Hand everything to [`sequence::ObuSequencer::pick_and_place`] to
//!    produce an ordered bitstream file, or omit the output path for a
//!    validate-only dry run.

/// Open Bitstream Unit record model.
///
/// - **Header** ([`obu::header`]): shared bit-packed header and size field
/// - **Descriptors**: [`obu::ia_sequence_header`], [`obu::codec_config`],
///   [`obu::audio_element`], [`obu::mix_presentation`]
/// - **Temporal data**: [`obu::audio_frame`], [`obu::parameter_block`],
///   [`obu::temporal_delimiter`]
/// - **Extensions** ([`obu::arbitrary`]): hook-placed opaque records
pub mod obu;

/// Temporal sequencing pipeline.
///
/// - **Timing records** ([`sequence::data`]): frames and parameter blocks
///   with timestamps
/// - **Grouping** ([`sequence::temporal_unit`]): tick-keyed temporal units
/// - **Writers** ([`sequence::sequencer`]): descriptor block, temporal
///   units, file orchestration
/// - **Consistency checks** ([`sequence::timing`]): frame length and trim
///   agreement
pub mod sequence;

/// Utility functions and supporting infrastructure.
///
/// - **Bit I/O** ([`utils::read_bit_buffer`], [`utils::write_bit_buffer`])
/// - **Varint policies** ([`utils::leb`])
/// - **Error types** ([`utils::errors`])
pub mod utils;
