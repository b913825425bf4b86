pub mod calendar;
pub mod forecast;

pub use calendar::*;
pub use forecast::*;
