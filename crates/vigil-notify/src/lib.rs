pub mod dispatcher;
pub mod manager;
pub mod message;
pub mod notifier;
pub mod providers;

pub use dispatcher::{DeliveryReport, NotifyDispatcher};
pub use manager::NotifyManager;
pub use message::{NotifyChannel, NotifyLevel, NotifyMessage};
pub use notifier::{Notifier, NotifyResult};
pub use providers::{EmailNotifier, WebhookNotifier};
