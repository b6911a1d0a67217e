use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::calendar::{next_salary_date, resolve_first_due_date, step};
use crate::decimal::Money;
use crate::errors::Result;
use crate::fees::FeeBreakdown;
use crate::interest::AccrualEngine;
use crate::types::{PlanSnapshot, PlanType};

/// one scheduled repayment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub sequence: u32,
    pub due_date: NaiveDate,
    /// principal outstanding at the start of this period
    pub opening_principal: Money,
    pub principal: Money,
    pub interest: Money,
    pub fee: Money,
    pub gst: Money,
    pub total: Money,
}

/// the full repayment schedule for a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub installments: Vec<Installment>,
}

impl Schedule {
    /// the overall due date (last installment)
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.installments.last().map(|i| i.due_date)
    }

    pub fn due_dates(&self) -> Vec<NaiveDate> {
        self.installments.iter().map(|i| i.due_date).collect()
    }

    pub fn total_interest(&self) -> Money {
        self.installments
            .iter()
            .map(|i| i.interest)
            .fold(Money::ZERO, |acc, x| acc + x)
    }

    pub fn total_principal(&self) -> Money {
        self.installments
            .iter()
            .map(|i| i.principal)
            .fold(Money::ZERO, |acc, x| acc + x)
    }

    pub fn total_payable(&self) -> Money {
        self.installments
            .iter()
            .map(|i| i.total)
            .fold(Money::ZERO, |acc, x| acc + x)
    }
}

/// builds repayment schedules from a plan, anchor date and salary preference
///
/// generation is a pure function of its inputs: the same anchor, plan and
/// salary day always produce the same schedule, so a schedule recomputed from
/// the live plan agrees with one rebuilt from a stored due-date snapshot
pub struct ScheduleGenerator {
    accrual: AccrualEngine,
}

impl ScheduleGenerator {
    pub fn new() -> Self {
        Self {
            accrual: AccrualEngine::new(),
        }
    }

    /// generate the schedule
    ///
    /// `salary_day` must already be validated by the caller; `None` forces
    /// fixed-frequency dates even when the plan prefers salary dates
    pub fn generate(
        &self,
        principal: Money,
        plan: &PlanSnapshot,
        anchor: NaiveDate,
        salary_day: Option<u8>,
        fees: &FeeBreakdown,
    ) -> Result<Schedule> {
        let due_dates = self.due_dates(plan, anchor, salary_day)?;
        let components = split_principal(principal, due_dates.len() as u32);

        let periods = self.accrual.reducing_balance(
            principal,
            plan.daily_rate,
            anchor,
            &due_dates,
            &components,
        )?;

        let installments = periods
            .into_iter()
            .zip(components)
            .map(|(period, principal_component)| {
                let fee = fees.recurring_fee_per_installment;
                let gst = fees.recurring_gst_per_installment;
                Installment {
                    sequence: period.sequence,
                    due_date: period.due_date,
                    opening_principal: period.opening_principal,
                    principal: principal_component,
                    interest: period.interest,
                    fee,
                    gst,
                    total: principal_component + period.interest + fee + gst,
                }
            })
            .collect();

        Ok(Schedule { installments })
    }

    /// ordered due dates for the plan
    pub fn due_dates(
        &self,
        plan: &PlanSnapshot,
        anchor: NaiveDate,
        salary_day: Option<u8>,
    ) -> Result<Vec<NaiveDate>> {
        let salary_day = if plan.follows_salary_date {
            salary_day
        } else {
            None
        };

        match (plan.plan, salary_day) {
            (PlanType::Single, Some(day)) => Ok(vec![resolve_first_due_date(
                anchor,
                day,
                plan.min_duration_days,
            )?]),
            (PlanType::Single, None) => {
                let term = plan.effective_term_days().max(1);
                Ok(vec![anchor + Duration::days(term as i64 - 1)])
            }
            (PlanType::MultiInstallment { count, .. }, Some(day)) => {
                let mut dates = Vec::with_capacity(count as usize);
                let mut due = resolve_first_due_date(anchor, day, plan.min_duration_days)?;
                for _ in 0..count {
                    dates.push(due);
                    due = next_salary_date(due, day)?;
                }
                Ok(dates)
            }
            (PlanType::MultiInstallment { count, frequency }, None) => {
                let preferred_day = anchor.day();
                let mut dates = Vec::with_capacity(count as usize);
                let mut due = step(anchor, frequency, preferred_day);
                for _ in 0..count {
                    dates.push(due);
                    due = step(due, frequency, preferred_day);
                }
                Ok(dates)
            }
        }
    }
}

impl Default for ScheduleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// divide principal as evenly as possible across installments, assigning the
/// rounding remainder to the final installment so the components sum exactly
///
/// the base is rounded toward zero so the remainder is always non-negative
fn split_principal(principal: Money, count: u32) -> Vec<Money> {
    let count = count.max(1);
    if count == 1 {
        return vec![principal];
    }

    let base = Money::from_decimal(
        (principal.as_decimal() / Decimal::from(count))
            .round_dp_with_strategy(2, RoundingStrategy::ToZero),
    );
    let mut components = vec![base; count as usize - 1];
    let allocated = base * Decimal::from(count - 1);
    components.push(principal - allocated);
    components
}
