mod telemetry_sink;

pub use telemetry_sink::*;
