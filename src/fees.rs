use rust_decimal::Decimal;
use tracing::warn;

use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::state::FrozenTerms;
use crate::types::{
    CalculationWarning, FeeAmountSource, FeeMethod, FeeRule, MethodResolution, PlanSnapshot,
};

/// resolves plan fee rules into monetary amounts
///
/// splits fees into disbursal-deducted vs added-to-total, applies GST, and
/// multiplies recurring fees by installment count
pub struct FeeEngine {
    pub gst_rate: Rate,
}

/// one resolved fee rule
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeeLine {
    pub name: String,
    pub method: FeeMethod,
    pub resolution: MethodResolution,
    /// amount per application (recurring fees apply once per installment)
    pub amount: Money,
    pub gst: Money,
}

/// normalized fee totals for a loan
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeeBreakdown {
    /// one-time fees withheld from the disbursed amount
    pub disbursal_fee: Money,
    pub disbursal_fee_gst: Money,
    /// recurring fees across all installments
    pub recurring_fee_total: Money,
    pub recurring_fee_gst: Money,
    /// recurring fee charged on each individual installment
    pub recurring_fee_per_installment: Money,
    pub recurring_gst_per_installment: Money,
    pub lines: Vec<FeeLine>,
    pub warnings: Vec<CalculationWarning>,
}

impl FeeBreakdown {
    /// every fee plus every GST amount, for APR and total-repayable math
    pub fn total_fees(&self) -> Money {
        self.disbursal_fee + self.recurring_fee_total
    }

    pub fn total_gst(&self) -> Money {
        self.disbursal_fee_gst + self.recurring_fee_gst
    }
}

/// a fee amount together with the source that supplied it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedFee {
    pub amount: Money,
    pub source: FeeAmountSource,
}

impl FeeEngine {
    pub fn new(gst_rate: Rate) -> Self {
        Self { gst_rate }
    }

    /// resolve all fee rules for a loan
    ///
    /// rules with non-positive percent are skipped. a rule whose name matches
    /// the post-service convention is always added to total, regardless of
    /// its stored method; a rule with neither a method nor a convention match
    /// defaults to deduct-from-disbursal and is surfaced as a data-quality
    /// warning rather than applied silently.
    pub fn resolve(
        &self,
        principal: Money,
        rules: &[FeeRule],
        installment_count: u32,
    ) -> FeeBreakdown {
        let mut breakdown = FeeBreakdown::default();
        let count = Decimal::from(installment_count.max(1));

        for rule in rules {
            if rule.percent <= Decimal::ZERO {
                continue;
            }

            let (method, resolution) = resolve_method(rule);
            if resolution == MethodResolution::DefaultedAmbiguous {
                warn!(
                    rule = %rule.name,
                    "fee rule has no application method and no convention match; \
                     defaulting to deduct-from-disbursal (unconfirmed business rule)"
                );
                breakdown
                    .warnings
                    .push(CalculationWarning::AmbiguousFeeMethod {
                        rule: rule.name.clone(),
                    });
            }

            let amount = principal.percentage(rule.percent);
            let gst = amount * self.gst_rate.as_decimal();

            match method {
                FeeMethod::DeductFromDisbursal => {
                    breakdown.disbursal_fee += amount;
                    breakdown.disbursal_fee_gst += gst;
                }
                FeeMethod::AddToTotal => {
                    breakdown.recurring_fee_per_installment += amount;
                    breakdown.recurring_gst_per_installment += gst;
                    breakdown.recurring_fee_total += amount * count;
                    breakdown.recurring_fee_gst += gst * count;
                }
            }

            breakdown.lines.push(FeeLine {
                name: rule.name.clone(),
                method,
                resolution,
                amount,
                gst,
            });
        }

        breakdown
    }
}

/// locate the processing fee for a loan through the ordered fallback chain:
/// frozen breakdown, then plan snapshot, then engine default
///
/// the returned source tag lets callers audit which origin supplied the value
pub fn resolve_processing_fee(
    frozen: Option<&FrozenTerms>,
    plan: &PlanSnapshot,
    config: &EngineConfig,
    principal: Money,
) -> ResolvedFee {
    if let Some(frozen) = frozen {
        if frozen.disbursal_fee.is_positive() {
            return ResolvedFee {
                amount: frozen.disbursal_fee,
                source: FeeAmountSource::FrozenBreakdown,
            };
        }
    }

    let from_plan = plan
        .fee_rules
        .iter()
        .filter(|r| r.percent > Decimal::ZERO)
        .find(|r| resolve_method(r).0 == FeeMethod::DeductFromDisbursal)
        .map(|r| principal.percentage(r.percent));
    if let Some(amount) = from_plan {
        return ResolvedFee {
            amount,
            source: FeeAmountSource::PlanSnapshot,
        };
    }

    ResolvedFee {
        amount: principal.percentage(config.default_processing_fee_percent),
        source: FeeAmountSource::EngineDefault,
    }
}

/// determine a rule's application method and how it was determined
///
/// the post-service name convention wins over stored data so exactly one
/// semantic holds for that fee everywhere
fn resolve_method(rule: &FeeRule) -> (FeeMethod, MethodResolution) {
    if is_post_service_fee(&rule.name) {
        return (FeeMethod::AddToTotal, MethodResolution::NameConvention);
    }
    match rule.method {
        Some(method) => (method, MethodResolution::Declared),
        None => (
            FeeMethod::DeductFromDisbursal,
            MethodResolution::DefaultedAmbiguous,
        ),
    }
}

fn is_post_service_fee(name: &str) -> bool {
    let normalized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    normalized.contains("postservice")
}
