pub mod activity_log;
pub mod dispatcher;
pub mod feature_registry;
pub mod lanes;
pub mod rule_engine;

pub use activity_log::ActivityLog;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use feature_registry::FeatureRegistry;
pub use lanes::{Lane, LaneRouter};
pub use rule_engine::{Fallback, Rule, RuleSet};
