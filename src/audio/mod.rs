//! Recording input and preprocessing.

pub mod energy;
pub mod envelope;
pub mod preprocessor;
pub mod types;
pub mod wav;

pub use envelope::WaveformEnvelope;
pub use preprocessor::{AudioPreprocessor, PreprocessConfig};
pub use types::{AudioSegment, RawAudio, TimeSpan};
