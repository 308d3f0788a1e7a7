pub mod engine;
pub mod escalation;
pub mod model;
pub mod retention;
pub mod store;

pub use engine::WarningEngine;
pub use escalation::EscalationPolicy;
pub use model::{
    EntryStatus, Fingerprint, NotificationEntry, RuleVerdict, Warning, WarningChange,
    WarningStatus,
};
pub use retention::RetentionSweeper;
pub use store::{DeviceContext, SweepStats, WarningStore};
