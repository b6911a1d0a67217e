use chrono::{Duration, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::calendar::{days_between, days_overdue, next_salary_date};
use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::penalty::{PenaltyTable, PenaltyTierEngine};
use crate::schedule::ScheduleGenerator;
use crate::state::{ExtensionRecord, LoanRecord};
use crate::types::PlanSnapshot;

/// a quoted extension: new dates plus everything payable now
///
/// an extension defers due dates; it never rewrites owed principal, so
/// `outstanding_after` always equals `outstanding_before`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionQuote {
    /// 1-based number this extension would be
    pub extension_number: u8,
    pub original_due_dates: Vec<NaiveDate>,
    pub new_due_dates: Vec<NaiveDate>,
    /// the new overall due date (last shifted installment)
    pub new_due_date: NaiveDate,
    pub extension_fee: Money,
    pub gst: Money,
    pub interest_till_date: Money,
    pub penalty: Money,
    pub total_payable_now: Money,
    pub outstanding_before: Money,
    pub outstanding_after: Money,
    pub days_overdue: u32,
    pub as_of: NaiveDate,
}

impl ExtensionQuote {
    pub fn into_record(self, loan: &LoanRecord) -> ExtensionRecord {
        ExtensionRecord {
            loan_id: loan.loan_id,
            extension_number: self.extension_number,
            original_due_dates: self.original_due_dates,
            new_due_dates: self.new_due_dates,
            extension_fee: self.extension_fee,
            gst: self.gst,
            interest_till_date: self.interest_till_date,
            penalty: self.penalty,
            total_payable_now: self.total_payable_now,
            outstanding_before: self.outstanding_before,
            outstanding_after: self.outstanding_after,
            quoted_as_of: self.as_of,
        }
    }
}

/// computes extension quotes against a frozen or regenerated schedule
pub struct ExtensionCalculator {
    config: EngineConfig,
    penalty: PenaltyTierEngine,
    generator: ScheduleGenerator,
}

impl ExtensionCalculator {
    pub fn new(config: EngineConfig) -> Self {
        let penalty = PenaltyTierEngine::new(config.gst_rate);
        Self {
            config,
            penalty,
            generator: ScheduleGenerator::new(),
        }
    }

    /// quote an extension as of an explicit evaluation date
    ///
    /// due dates come from the frozen snapshot when present; otherwise the
    /// schedule is regenerated from the plan and anchor, which reproduces the
    /// originally generated dates exactly. `installments_settled` counts
    /// installments already paid off; only the remainder shift.
    pub fn quote(
        &self,
        loan: &LoanRecord,
        plan: &PlanSnapshot,
        salary_day: Option<u8>,
        installments_settled: u32,
        outstanding_balance: Money,
        penalty_table: &PenaltyTable,
        as_of: NaiveDate,
    ) -> Result<ExtensionQuote> {
        if loan.extension_count >= self.config.max_extensions {
            return Err(EngineError::ExtensionLimitExceeded {
                used: loan.extension_count,
                maximum: self.config.max_extensions,
            });
        }
        if loan.extension_pending {
            return Err(EngineError::ExtensionPending);
        }
        let anchor = loan.anchor_date()?;

        let original_due_dates = self.resolve_due_dates(loan, plan, anchor, salary_day)?;
        let remaining = original_due_dates
            .get(installments_settled as usize..)
            .unwrap_or_default();
        if remaining.is_empty() {
            return Err(EngineError::DueDateUnresolvable {
                message: "no unsettled installments to extend".to_string(),
            });
        }

        let new_due_dates = self.shift_due_dates(remaining, plan, salary_day)?;
        // the shift never reorders; the last shifted date is the new overall due
        let new_due_date = *new_due_dates.last().ok_or_else(|| {
            EngineError::DueDateUnresolvable {
                message: "shifted schedule is empty".to_string(),
            }
        })?;

        let extension_fee = loan.principal.percentage(self.config.extension_fee_percent);
        let gst = extension_fee * self.config.gst_rate.as_decimal();
        let interest_till_date = loan
            .principal
            .accrue(plan.daily_rate, days_between(anchor, as_of)?);

        let overdue_days = days_overdue(remaining[0], as_of);
        let penalty = self
            .penalty
            .assess(loan.principal, overdue_days, penalty_table);

        Ok(ExtensionQuote {
            extension_number: loan.extension_count + 1,
            original_due_dates,
            new_due_dates,
            new_due_date,
            extension_fee,
            gst,
            interest_till_date,
            penalty: penalty.total,
            total_payable_now: extension_fee + gst + interest_till_date + penalty.total,
            outstanding_before: outstanding_balance,
            outstanding_after: outstanding_balance,
            days_overdue: overdue_days,
            as_of,
        })
    }

    /// quote as of the provider's current date
    pub fn quote_as_of_now(
        &self,
        loan: &LoanRecord,
        plan: &PlanSnapshot,
        salary_day: Option<u8>,
        installments_settled: u32,
        outstanding_balance: Money,
        penalty_table: &PenaltyTable,
        time_provider: &SafeTimeProvider,
    ) -> Result<ExtensionQuote> {
        self.quote(
            loan,
            plan,
            salary_day,
            installments_settled,
            outstanding_balance,
            penalty_table,
            time_provider.now().date_naive(),
        )
    }

    fn resolve_due_dates(
        &self,
        loan: &LoanRecord,
        plan: &PlanSnapshot,
        anchor: NaiveDate,
        salary_day: Option<u8>,
    ) -> Result<Vec<NaiveDate>> {
        if let Some(frozen) = &loan.frozen {
            if !frozen.installment_due_dates.is_empty() {
                return Ok(frozen.installment_due_dates.clone());
            }
        }
        self.generator.due_dates(plan, anchor, salary_day)
    }

    /// shift each remaining due date by one extension step
    ///
    /// salary-date plans move each date to the next month's salary date;
    /// fixed-duration plans add the configured window, regardless of "today"
    fn shift_due_dates(
        &self,
        remaining: &[NaiveDate],
        plan: &PlanSnapshot,
        salary_day: Option<u8>,
    ) -> Result<Vec<NaiveDate>> {
        match salary_day.filter(|_| plan.follows_salary_date) {
            Some(day) => remaining
                .iter()
                .map(|&due| next_salary_date(due, day))
                .collect(),
            None => Ok(remaining
                .iter()
                .map(|&due| due + Duration::days(self.config.extension_window_days as i64))
                .collect()),
        }
    }
}
