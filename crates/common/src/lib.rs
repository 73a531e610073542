mod domain;
mod postgres;
mod telemetry;

pub use domain::*;
pub use postgres::*;
pub use telemetry::*;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockAnalyticalSink;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDeadLetterSink;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockOperationalSink;
