mod normalizer;
mod quality_monitor;
mod stream_processor;
mod validator;

pub use normalizer::*;
pub use quality_monitor::*;
pub use stream_processor::*;
pub use validator::*;
