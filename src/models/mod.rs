pub mod paper;
pub mod tag;

pub use paper::*;
pub use tag::*;
