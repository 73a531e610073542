pub mod domain;
pub mod lake;
pub mod postgres;

pub use domain::*;
pub use lake::*;
pub use postgres::*;
