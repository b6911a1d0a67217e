use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};

/// unique identifier for a loan
pub type LoanId = Uuid;

/// loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// application accepted, not yet processed
    Pending,
    /// terms computed and frozen, awaiting disbursal
    Processed,
    /// disbursed and running
    Active,
    /// fully repaid
    Cleared,
}

/// a loan as handed to the engine by the persistence layer
///
/// the engine reads this and never writes it; the one-time freeze of
/// `frozen` is owned by the external persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan_id: LoanId,
    pub principal: Money,
    pub status: LoanStatus,
    /// the authoritative "day 1" timestamp, set at processing/disbursal
    pub processed_at: Option<DateTime<Utc>>,
    pub disbursed: bool,
    /// processed values written exactly once, never silently recomputed
    pub frozen: Option<FrozenTerms>,
    pub extension_count: u8,
    pub extension_pending: bool,
}

impl LoanRecord {
    /// the calendar date interest and day-counting start from
    ///
    /// the stored timestamp is collapsed to a timezone-less date here, at the
    /// boundary, so no calculation ever touches a `DateTime`
    pub fn anchor_date(&self) -> Result<NaiveDate> {
        self.processed_at
            .map(|t| t.date_naive())
            .ok_or(EngineError::MissingAnchorDate)
    }
}

/// the monetary and date values persisted once at processing time
///
/// statements, extensions and penalty assessment all read these rather than
/// recomputing, so historical obligations cannot drift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenTerms {
    pub disbursal_amount: Money,
    pub total_repayable: Money,
    pub total_interest: Money,
    pub disbursal_fee: Money,
    pub recurring_fee_total: Money,
    pub gst_total: Money,
    pub apr: Rate,
    /// due dates of every installment, in order; the last is the overall due
    /// date
    pub installment_due_dates: Vec<NaiveDate>,
}

impl FrozenTerms {
    /// the overall due date (last installment)
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.installment_due_dates.last().copied()
    }
}

/// an approved extension, as recorded after quoting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub loan_id: LoanId,
    /// 1-based, capped by `EngineConfig::max_extensions`
    pub extension_number: u8,
    pub original_due_dates: Vec<NaiveDate>,
    pub new_due_dates: Vec<NaiveDate>,
    pub extension_fee: Money,
    pub gst: Money,
    pub interest_till_date: Money,
    pub penalty: Money,
    pub total_payable_now: Money,
    pub outstanding_before: Money,
    pub outstanding_after: Money,
    pub quoted_as_of: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_loan() -> LoanRecord {
        LoanRecord {
            loan_id: Uuid::new_v4(),
            principal: Money::from_major(30_000),
            status: LoanStatus::Pending,
            processed_at: None,
            disbursed: false,
            frozen: None,
            extension_count: 0,
            extension_pending: false,
        }
    }

    #[test]
    fn test_anchor_date_requires_processed_timestamp() {
        let loan = base_loan();
        assert!(matches!(
            loan.anchor_date(),
            Err(EngineError::MissingAnchorDate)
        ));
    }

    #[test]
    fn test_anchor_date_collapses_to_calendar_date() {
        let mut loan = base_loan();
        loan.processed_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 23, 45, 0).unwrap());
        assert_eq!(
            loan.anchor_date().unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_frozen_due_date_is_last_installment() {
        let frozen = FrozenTerms {
            disbursal_amount: Money::from_major(29_000),
            total_repayable: Money::from_major(31_000),
            total_interest: Money::from_major(500),
            disbursal_fee: Money::from_major(1_000),
            recurring_fee_total: Money::ZERO,
            gst_total: Money::from_major(180),
            apr: Rate::ZERO,
            installment_due_dates: vec![
                NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            ],
        };
        assert_eq!(frozen.due_date(), NaiveDate::from_ymd_opt(2024, 3, 5));
    }
}
