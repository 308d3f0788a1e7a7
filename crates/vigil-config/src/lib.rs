pub mod global;
pub mod loader;

pub use global::{
    DispatchSettings, EmailSettings, EscalationSettings, GlobalConfig, NotifySettings,
    RetentionSettings, SystemConfig, WebhookSettings,
};
pub use loader::ConfigLoader;
