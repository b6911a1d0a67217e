use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};
use crate::fees::{FeeEngine, FeeLine};
use crate::interest::AccrualEngine;
use crate::schedule::{Schedule, ScheduleGenerator};
use crate::state::{FrozenTerms, LoanRecord};
use crate::types::{
    CalculationWarning, FeeMethod, FeeRule, InstallmentFrequency, PlanSnapshot, PlanType,
};

/// inputs for a full loan calculation
#[derive(Debug, Clone, Copy)]
pub struct CalculationRequest<'a> {
    pub loan: &'a LoanRecord,
    pub plan: &'a PlanSnapshot,
    /// borrower's self-reported salary day-of-month, if any
    pub salary_day: Option<u8>,
}

/// everything the collaborators consume: disbursal amount, interest, fees,
/// APR and the installment schedule
///
/// pure function of the request; the persistence layer freezes
/// `frozen_terms()` exactly once and re-derivations must agree with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub disbursal_amount: Money,
    pub total_interest: Money,
    pub total_repayable: Money,
    pub apr: Rate,
    pub schedule: Schedule,
    pub disbursal_fee: Money,
    pub disbursal_fee_gst: Money,
    pub recurring_fee_total: Money,
    pub recurring_fee_gst: Money,
    /// per-rule breakdown with method-resolution audit tags, for statement
    /// rendering and data-quality review
    pub fee_lines: Vec<FeeLine>,
    pub warnings: Vec<CalculationWarning>,
}

impl CalculationResult {
    /// the values the persistence layer persists once at processing time
    pub fn frozen_terms(&self) -> FrozenTerms {
        FrozenTerms {
            disbursal_amount: self.disbursal_amount,
            total_repayable: self.total_repayable,
            total_interest: self.total_interest,
            disbursal_fee: self.disbursal_fee,
            recurring_fee_total: self.recurring_fee_total,
            gst_total: self.disbursal_fee_gst + self.recurring_fee_gst,
            apr: self.apr,
            installment_due_dates: self.schedule.due_dates(),
        }
    }
}

/// top-level calculation engine
///
/// single-threaded and purely computational: no I/O, no shared state, and
/// identical inputs always produce identical outputs
pub struct LoanEngine {
    config: EngineConfig,
    fees: FeeEngine,
    generator: ScheduleGenerator,
    accrual: AccrualEngine,
}

impl LoanEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let fees = FeeEngine::new(config.gst_rate);
        Ok(Self {
            config,
            fees,
            generator: ScheduleGenerator::new(),
            accrual: AccrualEngine::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// run the full calculation for a loan
    pub fn calculate(&self, request: CalculationRequest<'_>) -> Result<CalculationResult> {
        let loan = request.loan;
        let plan = request.plan;

        if !loan.principal.is_positive() {
            return Err(EngineError::InvalidPrincipal {
                amount: loan.principal,
            });
        }
        let anchor = loan.anchor_date()?;

        let mut warnings = Vec::new();
        let salary_day = self.effective_salary_day(plan, request.salary_day, &mut warnings);

        let fee_breakdown = self.fees.resolve(
            loan.principal,
            &plan.fee_rules,
            plan.plan.installment_count(),
        );
        warnings.extend(fee_breakdown.warnings.iter().cloned());

        let schedule =
            self.generator
                .generate(loan.principal, plan, anchor, salary_day, &fee_breakdown)?;
        let total_interest = schedule.total_interest();

        let last_due = schedule.due_date().ok_or_else(|| {
            EngineError::DueDateUnresolvable {
                message: "generated schedule has no installments".to_string(),
            }
        })?;
        let total_charges = fee_breakdown.total_fees() + fee_breakdown.total_gst() + total_interest;
        let apr = self.accrual.apr(loan.principal, total_charges, anchor, last_due)?;

        Ok(CalculationResult {
            disbursal_amount: loan.principal
                - fee_breakdown.disbursal_fee
                - fee_breakdown.disbursal_fee_gst,
            total_interest,
            total_repayable: loan.principal
                + total_interest
                + fee_breakdown.recurring_fee_total
                + fee_breakdown.recurring_fee_gst,
            apr,
            schedule,
            disbursal_fee: fee_breakdown.disbursal_fee,
            disbursal_fee_gst: fee_breakdown.disbursal_fee_gst,
            recurring_fee_total: fee_breakdown.recurring_fee_total,
            recurring_fee_gst: fee_breakdown.recurring_fee_gst,
            fee_lines: fee_breakdown.lines,
            warnings,
        })
    }

    /// downgrade a bad salary day to a fixed-frequency fallback
    ///
    /// per policy an unusable salary day is a recorded warning, not a fatal
    /// error: the borrower still gets a schedule, just not a salary-pinned one
    fn effective_salary_day(
        &self,
        plan: &PlanSnapshot,
        salary_day: Option<u8>,
        warnings: &mut Vec<CalculationWarning>,
    ) -> Option<u8> {
        if !plan.follows_salary_date {
            return None;
        }
        match salary_day {
            Some(day) if (1..=31).contains(&day) => Some(day),
            other => {
                warn!(
                    salary_day = ?other,
                    "salary-date plan requested without a usable salary day; \
                     falling back to fixed-frequency due dates"
                );
                warnings.push(CalculationWarning::SalaryDayFallback { day: other });
                None
            }
        }
    }
}

/// stored (JSON) shape of a plan snapshot, as written by the application layer
#[derive(Debug, Deserialize)]
struct RawPlanSnapshot {
    plan_type: String,
    #[serde(default)]
    emi_count: Option<u32>,
    #[serde(default)]
    frequency: Option<String>,
    daily_interest_rate: Decimal,
    #[serde(default)]
    follows_salary_date: bool,
    #[serde(default)]
    term_days: u32,
    #[serde(default)]
    min_duration_days: u32,
    #[serde(default)]
    fees: Vec<RawFeeRule>,
}

#[derive(Debug, Deserialize)]
struct RawFeeRule {
    name: String,
    percent: Decimal,
    #[serde(default)]
    method: Option<String>,
}

impl PlanSnapshot {
    /// decode a stored plan snapshot
    ///
    /// unknown plan types, frequencies, or installment counts are structured
    /// errors; an unknown fee method string is left unresolved for the name
    /// convention and warned-default path in the fee engine
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawPlanSnapshot =
            serde_json::from_str(json).map_err(|e| EngineError::MalformedPlan {
                message: e.to_string(),
            })?;

        let plan = match raw.plan_type.as_str() {
            "single" => PlanType::Single,
            "multi_installment" => {
                let count = raw.emi_count.unwrap_or(0);
                if count < 2 {
                    return Err(EngineError::MalformedPlan {
                        message: format!(
                            "multi_installment plan needs at least 2 installments, got {count}"
                        ),
                    });
                }
                PlanType::MultiInstallment {
                    count,
                    frequency: parse_frequency(raw.frequency.as_deref())?,
                }
            }
            other => {
                return Err(EngineError::MalformedPlan {
                    message: format!("unknown plan type {other:?}"),
                })
            }
        };

        let fee_rules = raw
            .fees
            .into_iter()
            .map(|f| FeeRule {
                name: f.name,
                percent: f.percent,
                method: f.method.as_deref().and_then(parse_fee_method),
            })
            .collect();

        Ok(PlanSnapshot {
            plan,
            daily_rate: Rate::from_decimal(raw.daily_interest_rate),
            follows_salary_date: raw.follows_salary_date,
            term_days: raw.term_days,
            min_duration_days: raw.min_duration_days,
            fee_rules,
        })
    }
}

fn parse_frequency(value: Option<&str>) -> Result<InstallmentFrequency> {
    match value {
        Some("daily") => Ok(InstallmentFrequency::Daily),
        Some("weekly") => Ok(InstallmentFrequency::Weekly),
        Some("biweekly") => Ok(InstallmentFrequency::Biweekly),
        Some("monthly") | None => Ok(InstallmentFrequency::Monthly),
        Some(other) => Err(EngineError::MalformedPlan {
            message: format!("unknown installment frequency {other:?}"),
        }),
    }
}

fn parse_fee_method(value: &str) -> Option<FeeMethod> {
    match value {
        "deduct_from_disbursal" => Some(FeeMethod::DeductFromDisbursal),
        "add_to_total" => Some(FeeMethod::AddToTotal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LoanStatus;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn loan(principal: i64, anchor: NaiveDate) -> LoanRecord {
        LoanRecord {
            loan_id: Uuid::new_v4(),
            principal: Money::from_major(principal),
            status: LoanStatus::Pending,
            processed_at: Some(anchor.and_hms_opt(12, 0, 0).unwrap().and_utc()),
            disbursed: false,
            frozen: None,
            extension_count: 0,
            extension_pending: false,
        }
    }

    fn engine() -> LoanEngine {
        LoanEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_single_payment_end_to_end() {
        let plan = PlanSnapshot {
            plan: PlanType::Single,
            daily_rate: Rate::from_decimal(dec!(0.001)),
            follows_salary_date: false,
            term_days: 15,
            min_duration_days: 7,
            fee_rules: vec![FeeRule::new(
                "processing_fee",
                dec!(5),
                Some(FeeMethod::DeductFromDisbursal),
            )],
        };
        let subject = loan(30_000, d(2024, 1, 1));

        let result = engine()
            .calculate(CalculationRequest {
                loan: &subject,
                plan: &plan,
                salary_day: None,
            })
            .unwrap();

        assert_eq!(result.total_interest, Money::from_str_exact("450.00").unwrap());
        assert_eq!(result.schedule.due_date(), Some(d(2024, 1, 15)));

        // 5% processing fee of 1500 + 270 gst withheld from disbursal
        assert_eq!(result.disbursal_fee, Money::from_major(1_500));
        assert_eq!(result.disbursal_amount, Money::from_str_exact("28230.00").unwrap());

        // single payment repays principal + interest only
        assert_eq!(result.total_repayable, Money::from_str_exact("30450.00").unwrap());

        // ((1500 + 270 + 450) / 30000) / 15 x 36500
        assert_eq!(result.apr.as_percentage(), dec!(180.07));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_multi_installment_salary_plan_end_to_end() {
        let plan = PlanSnapshot {
            plan: PlanType::MultiInstallment {
                count: 3,
                frequency: InstallmentFrequency::Monthly,
            },
            daily_rate: Rate::from_decimal(dec!(0.001)),
            follows_salary_date: true,
            term_days: 0,
            min_duration_days: 7,
            fee_rules: vec![],
        };
        let subject = loan(9_000, d(2024, 1, 10));

        let result = engine()
            .calculate(CalculationRequest {
                loan: &subject,
                plan: &plan,
                salary_day: Some(5),
            })
            .unwrap();

        assert_eq!(
            result.schedule.due_dates(),
            vec![d(2024, 2, 5), d(2024, 3, 5), d(2024, 4, 5)]
        );
        assert_eq!(result.schedule.total_principal(), Money::from_major(9_000));
        // reducing balance: 243 + 174 + 93
        assert_eq!(result.total_interest, Money::from_str_exact("510.00").unwrap());
        assert_eq!(result.total_repayable, Money::from_str_exact("9510.00").unwrap());
        assert_eq!(result.disbursal_amount, Money::from_major(9_000));
    }

    #[test]
    fn test_invalid_principal_is_fatal() {
        let plan = PlanSnapshot {
            plan: PlanType::Single,
            daily_rate: Rate::from_decimal(dec!(0.001)),
            follows_salary_date: false,
            term_days: 15,
            min_duration_days: 7,
            fee_rules: vec![],
        };
        let subject = loan(0, d(2024, 1, 1));

        let err = engine()
            .calculate(CalculationRequest {
                loan: &subject,
                plan: &plan,
                salary_day: None,
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidPrincipal { .. }));
    }

    #[test]
    fn test_missing_anchor_is_fatal() {
        let plan = PlanSnapshot {
            plan: PlanType::Single,
            daily_rate: Rate::from_decimal(dec!(0.001)),
            follows_salary_date: false,
            term_days: 15,
            min_duration_days: 7,
            fee_rules: vec![],
        };
        let mut subject = loan(10_000, d(2024, 1, 1));
        subject.processed_at = None;

        let err = engine()
            .calculate(CalculationRequest {
                loan: &subject,
                plan: &plan,
                salary_day: None,
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingAnchorDate));
    }

    #[test]
    fn test_invalid_salary_day_falls_back_with_warning() {
        let plan = PlanSnapshot {
            plan: PlanType::MultiInstallment {
                count: 2,
                frequency: InstallmentFrequency::Monthly,
            },
            daily_rate: Rate::from_decimal(dec!(0.001)),
            follows_salary_date: true,
            term_days: 0,
            min_duration_days: 7,
            fee_rules: vec![],
        };
        let subject = loan(10_000, d(2024, 1, 10));

        let result = engine()
            .calculate(CalculationRequest {
                loan: &subject,
                plan: &plan,
                salary_day: Some(45),
            })
            .unwrap();

        assert_eq!(
            result.warnings,
            vec![CalculationWarning::SalaryDayFallback { day: Some(45) }]
        );
        // fixed monthly frequency from the anchor instead
        assert_eq!(
            result.schedule.due_dates(),
            vec![d(2024, 2, 10), d(2024, 3, 10)]
        );
    }

    #[test]
    fn test_result_carries_fee_line_audit_trail() {
        use crate::types::MethodResolution;

        let plan = PlanSnapshot {
            plan: PlanType::Single,
            daily_rate: Rate::from_decimal(dec!(0.001)),
            follows_salary_date: false,
            term_days: 15,
            min_duration_days: 7,
            fee_rules: vec![
                FeeRule::new("processing_fee", dec!(5), Some(FeeMethod::DeductFromDisbursal)),
                FeeRule::new("mystery_fee", dec!(1), None),
            ],
        };
        let subject = loan(30_000, d(2024, 1, 1));

        let result = engine()
            .calculate(CalculationRequest {
                loan: &subject,
                plan: &plan,
                salary_day: None,
            })
            .unwrap();

        // the per-rule breakdown reaches callers, resolution tags included
        assert_eq!(result.fee_lines.len(), 2);
        assert_eq!(result.fee_lines[0].name, "processing_fee");
        assert_eq!(result.fee_lines[0].resolution, MethodResolution::Declared);
        assert_eq!(result.fee_lines[0].amount, Money::from_major(1_500));
        assert_eq!(
            result.fee_lines[1].resolution,
            MethodResolution::DefaultedAmbiguous
        );
        assert_eq!(
            result.warnings,
            vec![CalculationWarning::AmbiguousFeeMethod {
                rule: "mystery_fee".to_string()
            }]
        );
    }

    #[test]
    fn test_regeneration_is_byte_identical() {
        let plan = PlanSnapshot {
            plan: PlanType::MultiInstallment {
                count: 3,
                frequency: InstallmentFrequency::Monthly,
            },
            daily_rate: Rate::from_decimal(dec!(0.001)),
            follows_salary_date: true,
            term_days: 0,
            min_duration_days: 7,
            fee_rules: vec![FeeRule::new(
                "post_service_fee",
                dec!(2),
                Some(FeeMethod::AddToTotal),
            )],
        };
        let subject = loan(9_000, d(2024, 1, 10));
        let request = CalculationRequest {
            loan: &subject,
            plan: &plan,
            salary_day: Some(5),
        };

        let engine = engine();
        let first = engine.calculate(request).unwrap();
        let second = engine.calculate(request).unwrap();

        let first_json = serde_json::to_string(&first).unwrap();
        let second_json = serde_json::to_string(&second).unwrap();
        assert_eq!(first_json, second_json);
    }

    #[test]
    fn test_frozen_terms_capture() {
        let plan = PlanSnapshot {
            plan: PlanType::Single,
            daily_rate: Rate::from_decimal(dec!(0.001)),
            follows_salary_date: false,
            term_days: 15,
            min_duration_days: 7,
            fee_rules: vec![FeeRule::new(
                "processing_fee",
                dec!(5),
                Some(FeeMethod::DeductFromDisbursal),
            )],
        };
        let subject = loan(30_000, d(2024, 1, 1));

        let result = engine()
            .calculate(CalculationRequest {
                loan: &subject,
                plan: &plan,
                salary_day: None,
            })
            .unwrap();
        let frozen = result.frozen_terms();

        assert_eq!(frozen.disbursal_amount, result.disbursal_amount);
        assert_eq!(frozen.total_repayable, result.total_repayable);
        assert_eq!(frozen.due_date(), Some(d(2024, 1, 15)));
        assert_eq!(frozen.gst_total, Money::from_major(270));
    }

    #[test]
    fn test_plan_json_decoding() {
        let json = r#"{
            "plan_type": "multi_installment",
            "emi_count": 3,
            "frequency": "monthly",
            "daily_interest_rate": "0.001",
            "follows_salary_date": true,
            "min_duration_days": 7,
            "fees": [
                {"name": "processing_fee", "percent": "5", "method": "deduct_from_disbursal"},
                {"name": "post_service_fee", "percent": "2", "method": "bogus_method"}
            ]
        }"#;

        let plan = PlanSnapshot::from_json(json).unwrap();
        assert_eq!(
            plan.plan,
            PlanType::MultiInstallment {
                count: 3,
                frequency: InstallmentFrequency::Monthly
            }
        );
        assert_eq!(plan.daily_rate.as_decimal(), dec!(0.001));
        assert_eq!(plan.fee_rules.len(), 2);
        assert_eq!(plan.fee_rules[0].method, Some(FeeMethod::DeductFromDisbursal));
        // unknown method string stays unresolved for the convention path
        assert_eq!(plan.fee_rules[1].method, None);
    }

    #[test]
    fn test_plan_json_rejects_unknown_plan_type() {
        let err = PlanSnapshot::from_json(r#"{"plan_type": "balloon", "daily_interest_rate": "0.001"}"#)
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedPlan { .. }));
    }

    #[test]
    fn test_plan_json_rejects_single_installment_multi_plan() {
        let err = PlanSnapshot::from_json(
            r#"{"plan_type": "multi_installment", "emi_count": 1, "daily_interest_rate": "0.001"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MalformedPlan { .. }));
    }

    #[test]
    fn test_plan_json_rejects_nonarray_fees() {
        let err = PlanSnapshot::from_json(
            r#"{"plan_type": "single", "daily_interest_rate": "0.001", "fees": "none"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MalformedPlan { .. }));
    }
}
