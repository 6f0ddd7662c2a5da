pub mod transcript;
pub mod types;

pub use transcript::Transcript;
pub use types::{GraphOptions, TrimParams, DEFAULT_STRAND_EPSILON};
