//! Alert condition evaluation

use std::fmt;

use crate::shared::types::{Coin, Subscription};
use crate::shared::utils::{format_price, percentage_change};

/// One fired alert condition
#[derive(Debug, Clone, PartialEq)]
pub enum TriggeredCondition {
    FellToMin { code: String, price: f64, min_rate: f64 },
    RoseToMax { code: String, price: f64, max_rate: f64 },
    Grew { code: String, percent: f64, threshold: f64 },
    Declined { code: String, percent: f64, threshold: f64 },
}

impl fmt::Display for TriggeredCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggeredCondition::FellToMin { code, price, min_rate } => write!(
                f,
                "Цена {} упала до {} (ниже {})",
                code,
                format_price(*price),
                format_price(*min_rate)
            ),
            TriggeredCondition::RoseToMax { code, price, max_rate } => write!(
                f,
                "Цена {} поднялась до {} (выше {})",
                code,
                format_price(*price),
                format_price(*max_rate)
            ),
            TriggeredCondition::Grew { code, percent, threshold } => write!(
                f,
                "Цена {} выросла на {:.2}% (больше {:.2}%)",
                code, percent, threshold
            ),
            TriggeredCondition::Declined { code, percent, threshold } => write!(
                f,
                "Цена {} упала на {:.2}% (больше {:.2}%)",
                code, percent, threshold
            ),
        }
    }
}

/// Pure threshold checks; no I/O, no shared state
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// All four checks are independent: zero, one or several may fire.
    /// Growth and decline are skipped when the baseline is unset or zero.
    pub fn evaluate(coin: &Coin, subscription: &Subscription, current_price: f64) -> Vec<TriggeredCondition> {
        let mut fired = Vec::new();
        if !current_price.is_finite() {
            return fired;
        }

        let thresholds = &subscription.thresholds;

        if let Some(min_rate) = thresholds.min_rate {
            if current_price <= min_rate {
                fired.push(TriggeredCondition::FellToMin {
                    code: coin.code.clone(),
                    price: current_price,
                    min_rate,
                });
            }
        }

        if let Some(max_rate) = thresholds.max_rate {
            if current_price >= max_rate {
                fired.push(TriggeredCondition::RoseToMax {
                    code: coin.code.clone(),
                    price: current_price,
                    max_rate,
                });
            }
        }

        let change = subscription
            .baseline_price
            .and_then(|baseline| percentage_change(baseline, current_price));

        if let (Some(threshold), Some(growth)) = (thresholds.growth_percent, change) {
            if growth >= threshold {
                fired.push(TriggeredCondition::Grew {
                    code: coin.code.clone(),
                    percent: growth,
                    threshold,
                });
            }
        }

        if let (Some(threshold), Some(change)) = (thresholds.decline_percent, change) {
            let decline = -change;
            if decline >= threshold {
                fired.push(TriggeredCondition::Declined {
                    code: coin.code.clone(),
                    percent: decline,
                    threshold,
                });
            }
        }

        fired
    }
}
