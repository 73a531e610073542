mod batch;
mod dead_letter;
mod result;
mod sinks;
mod telemetry_record;

pub use batch::*;
pub use dead_letter::*;
pub use result::*;
pub use sinks::*;
pub use telemetry_record::*;
