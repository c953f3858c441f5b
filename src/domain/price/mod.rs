//! Price domain - price feeds and alert conditions

mod price_feed;
mod condition_evaluator;

pub use price_feed::PriceFeed;
pub use condition_evaluator::{ConditionEvaluator, TriggeredCondition};
