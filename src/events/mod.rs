pub mod bell;
pub mod window;

pub use bell::{BellEvent, Readiness};
pub use window::{Extent, WindowGeometry};
