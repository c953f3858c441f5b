use crate::shared::errors::StorageError;
use crate::shared::types::Thresholds;

impl Thresholds {
    /// Rates must be finite and non-negative, percentages finite and positive,
    /// and `min_rate` may not exceed `max_rate`.
    pub fn validate(&self) -> Result<(), StorageError> {
        for (name, value) in [("min_rate", self.min_rate), ("max_rate", self.max_rate)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(StorageError::InvalidThresholds(format!("{} must be a non-negative number, got {}", name, v)));
                }
            }
        }

        for (name, value) in [("growth_percent", self.growth_percent), ("decline_percent", self.decline_percent)] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(StorageError::InvalidThresholds(format!("{} must be positive, got {}", name, v)));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.min_rate, self.max_rate) {
            if min > max {
                return Err(StorageError::InvalidThresholds(format!("min_rate {} is above max_rate {}", min, max)));
            }
        }

        Ok(())
    }
}
