pub mod condition;
pub mod error;
pub mod model;
pub mod registry;

pub use condition::{Clause, Comparator, Condition, Connective, Literal};
pub use error::RuleError;
pub use model::WarningRule;
pub use registry::RuleRegistry;
