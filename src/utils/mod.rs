//! Utility functions and supporting infrastructure.
//!
//! Provides bit-granular buffer I/O, variable-length integer encoding
//! policies, and error handling for bitstream processing.

pub mod errors;
pub mod leb;
pub mod read_bit_buffer;
pub mod write_bit_buffer;
