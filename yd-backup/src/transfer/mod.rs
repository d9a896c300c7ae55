//! Upload body streaming and progress reporting.

pub mod progress;
pub mod progress_stream;

pub use progress_stream::{ProgressCallback, ProgressEvent, ProgressStream};
