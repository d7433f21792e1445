pub mod error;
pub mod tolerance;
pub mod traits;

pub use error::{GeomError, Result};
pub use tolerance::{almost_equal, Tolerance};
