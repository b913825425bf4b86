pub mod adjustment;
pub mod engine;
pub mod features;
pub mod weather;

pub use adjustment::*;
pub use engine::*;
pub use features::*;
pub use weather::*;
