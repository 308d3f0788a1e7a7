pub mod message;
pub mod reading;
pub mod severity;

pub use message::Message;
pub use reading::{DeviceReading, FieldValue};
pub use severity::Severity;
