mod output;

pub use output::{LineSource, LogBuffer, LogLine};
