use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::calendar::days_between;
use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};

/// computes simple daily interest on an outstanding-principal basis
///
/// bullet mode charges the full principal for the whole span; reducing
/// balance walks installment periods and charges only the principal still
/// outstanding at each period's start
pub struct AccrualEngine;

/// bullet interest calculation result
#[derive(Debug, Clone, PartialEq)]
pub struct InterestCalculation {
    pub interest: Money,
    pub days: u32,
    pub principal_base: Money,
    pub daily_rate: Rate,
}

/// one period of a reducing-balance walk
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodInterest {
    pub sequence: u32,
    pub period_start: NaiveDate,
    pub due_date: NaiveDate,
    pub days: u32,
    /// principal outstanding at the start of the period
    pub opening_principal: Money,
    pub interest: Money,
}

impl AccrualEngine {
    pub fn new() -> Self {
        Self
    }

    /// single-payment interest: principal x daily rate x inclusive days
    pub fn bullet(
        &self,
        principal: Money,
        daily_rate: Rate,
        anchor: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<InterestCalculation> {
        let days = days_between(anchor, due_date)?;
        Ok(InterestCalculation {
            interest: principal.accrue(daily_rate, days),
            days,
            principal_base: principal,
            daily_rate,
        })
    }

    /// reducing-balance interest across installment periods
    ///
    /// period 1 spans anchor through the first due date inclusive; each later
    /// period starts the day after the previous due date. the outstanding
    /// balance drops by each installment's principal component after its
    /// period, so the total is less than bullet interest over the same span.
    pub fn reducing_balance(
        &self,
        principal: Money,
        daily_rate: Rate,
        anchor: NaiveDate,
        due_dates: &[NaiveDate],
        principal_components: &[Money],
    ) -> Result<Vec<PeriodInterest>> {
        debug_assert_eq!(due_dates.len(), principal_components.len());

        let mut periods = Vec::with_capacity(due_dates.len());
        let mut outstanding = principal;
        let mut period_start = anchor;

        for (i, (&due_date, &component)) in
            due_dates.iter().zip(principal_components.iter()).enumerate()
        {
            let days = days_between(period_start, due_date)?;
            periods.push(PeriodInterest {
                sequence: i as u32 + 1,
                period_start,
                due_date,
                days,
                opening_principal: outstanding,
                interest: outstanding.accrue(daily_rate, days),
            });

            outstanding -= component;
            period_start = due_date + Duration::days(1);
        }

        Ok(periods)
    }

    /// annualized percentage rate over the whole term
    ///
    /// `((fees + gst + interest) / principal) / term_days x 36500`, where the
    /// term spans the anchor through the last due date inclusive
    pub fn apr(
        &self,
        principal: Money,
        total_charges: Money,
        anchor: NaiveDate,
        last_due_date: NaiveDate,
    ) -> Result<Rate> {
        if !principal.is_positive() {
            return Err(EngineError::InvalidPrincipal { amount: principal });
        }
        let term_days = days_between(anchor, last_due_date)?;
        let percent = total_charges.as_decimal() / principal.as_decimal()
            / Decimal::from(term_days)
            * Decimal::from(36500);
        Ok(Rate::from_percentage(percent.round_dp(2)))
    }
}

impl Default for AccrualEngine {
    fn default() -> Self {
        Self::new()
    }
}
