use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;

/// repayment plan variant
///
/// tagged so schedule generation is handled exhaustively per variant rather
/// than via repeated installment-count branching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanType {
    /// one payment of the full principal at the due date
    Single,
    /// reducing-balance schedule of `count` installments
    MultiInstallment {
        count: u32,
        frequency: InstallmentFrequency,
    },
}

impl PlanType {
    /// number of installments the plan produces
    pub fn installment_count(&self) -> u32 {
        match self {
            PlanType::Single => 1,
            PlanType::MultiInstallment { count, .. } => *count,
        }
    }
}

/// interval between installment due dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

/// how a fee is applied to the loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeMethod {
    /// one-time fee withheld from the disbursed amount
    DeductFromDisbursal,
    /// recurring fee added to the total repayable, once per installment
    AddToTotal,
}

/// a single fee rule from the plan snapshot
///
/// `method` is optional because stored plan data predates the method column;
/// resolution order is name convention, then declared method, then a warned
/// default (see `fees::FeeEngine`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRule {
    pub name: String,
    /// percent of principal (e.g., 5 for 5%)
    pub percent: Decimal,
    pub method: Option<FeeMethod>,
}

impl FeeRule {
    pub fn new(name: impl Into<String>, percent: Decimal, method: Option<FeeMethod>) -> Self {
        Self {
            name: name.into(),
            percent,
            method,
        }
    }
}

/// snapshot of the repayment plan a loan was taken under
///
/// created once per loan application and treated as immutable afterwards;
/// every calculation is a pure function of this plus the loan record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub plan: PlanType,
    /// simple daily interest rate as a fraction (0.001 = 0.1%/day)
    pub daily_rate: Rate,
    /// pin due dates to the borrower's salary day-of-month
    pub follows_salary_date: bool,
    /// inclusive term length in days for fixed-duration single plans
    pub term_days: u32,
    /// minimum days between anchor and first due date
    pub min_duration_days: u32,
    pub fee_rules: Vec<FeeRule>,
}

impl PlanSnapshot {
    /// effective term for a fixed-duration single plan, floored by the
    /// minimum duration
    pub fn effective_term_days(&self) -> u32 {
        self.term_days.max(self.min_duration_days)
    }
}

/// how a fee rule's application method was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodResolution {
    /// stored method used as-is
    Declared,
    /// name convention overrode or supplied the method
    NameConvention,
    /// no method and no convention match; defaulted with a warning
    DefaultedAmbiguous,
}

/// which source supplied a fee amount during ordered resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeAmountSource {
    FrozenBreakdown,
    PlanSnapshot,
    EngineDefault,
}

/// non-fatal data-quality findings surfaced alongside results
///
/// these are returned to the caller as values and also emitted via
/// `tracing::warn!`; they are never silently dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalculationWarning {
    /// fee rule had no declared method and no name-convention match; the
    /// deduct-from-disbursal default is a guessed business rule pending
    /// product confirmation
    AmbiguousFeeMethod { rule: String },
    /// salary-date plan requested but the salary day was missing or outside
    /// 1..=31; fell back to fixed-frequency due dates
    SalaryDayFallback { day: Option<u8> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_installment_count() {
        assert_eq!(PlanType::Single.installment_count(), 1);
        let multi = PlanType::MultiInstallment {
            count: 3,
            frequency: InstallmentFrequency::Monthly,
        };
        assert_eq!(multi.installment_count(), 3);
    }

    #[test]
    fn test_effective_term_floors_at_minimum_duration() {
        let plan = PlanSnapshot {
            plan: PlanType::Single,
            daily_rate: Rate::from_decimal(dec!(0.001)),
            follows_salary_date: false,
            term_days: 5,
            min_duration_days: 7,
            fee_rules: vec![],
        };
        assert_eq!(plan.effective_term_days(), 7);
    }
}
