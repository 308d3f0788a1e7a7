pub mod bus;
pub mod error;

pub use bus::{EventBus, SharedEventBus};
pub use error::{Result, VigilError};
