#[derive(thiserror::Error, Debug)]
pub enum BitBufferError {
    #[error("num_bits must be <= {max}. Requested {num_bits}")]
    TooManyBits { num_bits: u32, max: u32 },

    #[error("Not enough bits in source: required {required}, available {available}")]
    SourceExhausted { required: u64, available: u64 },

    #[error("required_num_bits = {required} exceeds the working buffer capacity of {capacity} bits")]
    RequiredBitsExceedCapacity { required: u64, capacity: u64 },

    #[error("Read {0} bytes of a base-128 value but the continuation bit is still set")]
    Leb128TooLong(usize),

    #[error("Decoded value {value} exceeds the maximum of {max}")]
    ValueOverflow { value: u64, max: u64 },

    #[error("Value {value} does not fit in {num_bits} bits")]
    ValueTooLargeForBits { value: u64, num_bits: u32 },

    #[error("No null terminator found within {0} bytes")]
    UnterminatedString(usize),

    #[error("String is not valid UTF-8")]
    InvalidUtf8,

    #[error("String and null terminator must fit in {0} bytes")]
    StringTooLong(usize),

    #[error("String contains an interior null byte")]
    InteriorNul,

    #[error("Buffer is not byte aligned at bit offset {0}")]
    UnalignedAccess(u64),

    #[error("Fixed-size leb generator must use 1 to {max} bytes. Got {got}")]
    InvalidLebSize { got: u8, max: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ObuError {
    #[error("ia_code must be {expected:#010X}. Got {got:#010X}")]
    InvalidIaCode { got: u32, expected: u32 },

    #[error("Unknown profile version {0}")]
    UnknownProfileVersion(u8),

    #[error("obu_trimming_status_flag is only allowed on audio frame OBUs. Got obu_type {0}")]
    TrimmingOnNonAudioFrame(u8),

    #[error("Trim counts are nonzero but obu_trimming_status_flag is not set")]
    TrimWithoutFlag,

    #[error("extension_header_bytes are present but obu_extension_flag is not set")]
    ExtensionWithoutFlag,

    #[error("OBU payload of {0} bytes exceeds the 32-bit obu_size range")]
    PayloadTooLarge(usize),

    #[error("obu_size is smaller than the header fields it must cover")]
    MalformedObuSize,

    #[error("count_label = {count_label} does not match {actual} localized annotations")]
    MismatchedAnnotations { count_label: usize, actual: usize },

    #[error("Audio elements with parameter definitions are not supported. Read num_parameters = {0}")]
    UnsupportedNumParameters(u32),

    #[error("num_samples_per_frame must be nonzero")]
    ZeroSamplesPerFrame,

    #[error("LPCM decoder config must be exactly {expected} bytes. Got {actual}")]
    InvalidLpcmConfigSize { expected: u64, actual: u64 },

    #[error("Arbitrary OBU is marked as invalidating the bitstream")]
    InvalidatedArbitraryObu,
}

#[derive(thiserror::Error, Debug)]
pub enum SequenceError {
    #[error("Audio frame references unknown audio element {0}")]
    AudioElementNotFound(u32),

    #[error("Audio element {audio_element_id} references unknown codec config {codec_config_id}")]
    CodecConfigNotFound {
        audio_element_id: u32,
        codec_config_id: u32,
    },

    #[error(
        "Mix presentation {mix_presentation_id} with {num_audio_elements} audio element(s) is not \
         compatible with the declared profiles"
    )]
    IncompatibleMixPresentation {
        mix_presentation_id: u32,
        num_audio_elements: usize,
    },

    #[error("Sequencer is closed and cannot accept further writes")]
    SequencerClosed,

    #[error("Trim counts exceed the {samples_per_frame} samples of the frame")]
    TrimExceedsFrame { samples_per_frame: u32 },

    #[error("Codec configs disagree on samples per frame: {0} vs {1}")]
    MismatchedSamplesPerFrame(u32, u32),

    #[error("Expected at least one codec config")]
    NoCodecConfigs,

    #[error("Expected timestamp {expected}, got {actual}")]
    TimestampMismatch { expected: i32, actual: i32 },

    #[error("Only one frame per substream may trim samples at the end")]
    TrimAtEndNotFinal,

    #[error("Samples trimmed from the start must be consecutive from the first frame")]
    NonConsecutiveTrimAtStart,

    #[error("It is forbidden to fully trim the samples of a frame from the end")]
    FullyTrimmedAtEnd,

    #[error("Substream {substream_id} disagrees on the cumulative trim counts")]
    InconsistentTrim { substream_id: u32 },
}
