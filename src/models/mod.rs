pub mod record;
pub mod outcome;
pub mod dataset;

pub use record::*;
pub use outcome::*;
pub use dataset::*;
