pub mod paper;
pub mod related;
pub mod stage;

pub use paper::*;
pub use related::*;
pub use stage::*;
