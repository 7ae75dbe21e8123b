mod invocation;
mod listener;
mod platform;
mod supervisor;

pub use invocation::Invocation;
pub use listener::{ChannelListener, JobListener};
pub use platform::Platform;
pub use supervisor::{JobState, Stream, Supervisor};
