pub mod calendar;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod extension;
pub mod fees;
pub mod interest;
pub mod penalty;
pub mod schedule;
pub mod state;
pub mod types;

// re-export key types
pub use config::EngineConfig;
pub use decimal::{Money, Rate};
pub use engine::{CalculationRequest, CalculationResult, LoanEngine};
pub use errors::{EngineError, Result};
pub use extension::{ExtensionCalculator, ExtensionQuote};
pub use fees::{FeeBreakdown, FeeEngine, FeeLine, ResolvedFee};
pub use interest::{AccrualEngine, InterestCalculation, PeriodInterest};
pub use penalty::{PenaltyAssessment, PenaltyTable, PenaltyTier, PenaltyTierEngine};
pub use schedule::{Installment, Schedule, ScheduleGenerator};
pub use state::{ExtensionRecord, FrozenTerms, LoanId, LoanRecord, LoanStatus};
pub use types::{
    CalculationWarning, FeeAmountSource, FeeMethod, FeeRule, InstallmentFrequency,
    MethodResolution, PlanSnapshot, PlanType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
