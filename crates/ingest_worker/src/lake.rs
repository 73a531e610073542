mod dead_letter_log;
mod lake_sink;
mod partition;

pub use dead_letter_log::*;
pub use lake_sink::*;
pub use partition::*;
