// Audio module - file detection, index documents, duration probing and validation

pub mod detection;
pub mod index;
pub mod probe;
pub mod validate;

pub use detection::{is_index_document, is_lossless_audio, FileKind};
pub use index::{parse_duration, read_index_document};
pub use probe::{DurationProbe, FfmpegProbe, NativeProbe};
pub use validate::{validate, validate_pairing, DURATION_TOLERANCE_SECS};
