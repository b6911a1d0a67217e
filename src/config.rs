use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{EngineError, Result};

/// engine-wide calculation parameters
///
/// defaults carry the production values; deployments override via the stored
/// configuration row and validate once at load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// GST applied to every fee and penalty base
    pub gst_rate: Rate,
    /// extension fee as percent of principal
    pub extension_fee_percent: Decimal,
    /// due-date shift for fixed-duration plans on extension
    pub extension_window_days: u32,
    /// lifetime cap on extensions per loan
    pub max_extensions: u8,
    /// fallback processing fee percent when neither the frozen breakdown nor
    /// the plan snapshot carries one
    pub default_processing_fee_percent: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gst_rate: Rate::from_percentage(dec!(18)),
            extension_fee_percent: dec!(21),
            extension_window_days: 15,
            max_extensions: 4,
            default_processing_fee_percent: dec!(5),
        }
    }
}

impl EngineConfig {
    /// validate loaded configuration
    pub fn validate(&self) -> Result<()> {
        if self.gst_rate.as_decimal() < Decimal::ZERO {
            return Err(EngineError::InvalidConfiguration {
                message: format!("gst rate must be non-negative, got {}", self.gst_rate),
            });
        }
        if self.extension_fee_percent <= Decimal::ZERO {
            return Err(EngineError::InvalidConfiguration {
                message: format!(
                    "extension fee percent must be positive, got {}",
                    self.extension_fee_percent
                ),
            });
        }
        if self.extension_window_days == 0 {
            return Err(EngineError::InvalidConfiguration {
                message: "extension window must be at least one day".to_string(),
            });
        }
        if self.max_extensions == 0 {
            return Err(EngineError::InvalidConfiguration {
                message: "max extensions must be at least one".to_string(),
            });
        }
        Ok(())
    }
}
