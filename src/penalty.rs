use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};

/// one band of the tiered late-fee table
///
/// `start_day`/`end_day` are 1-based days-overdue, inclusive; an absent
/// `end_day` means the tier is open-ended. the fee value is a percent of
/// principal charged per day in the band, which degenerates to a one-time
/// charge for single-day tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyTier {
    pub tier_order: u32,
    pub start_day: u32,
    pub end_day: Option<u32>,
    /// percent of principal per overdue day in this band
    pub fee_percent_per_day: Decimal,
}

/// a penalty tier table validated at load time
///
/// rejects unordered, overlapping, or gapped tables rather than silently
/// under- or over-charging the ungoverned range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyTable {
    tiers: Vec<PenaltyTier>,
}

impl PenaltyTable {
    pub fn new(tiers: Vec<PenaltyTier>) -> Result<Self> {
        let mut previous_end: Option<u32> = None;
        let mut previous_order: Option<u32> = None;

        for (i, tier) in tiers.iter().enumerate() {
            if tier.fee_percent_per_day < Decimal::ZERO {
                return Err(EngineError::InvalidTierTable {
                    message: format!("tier {} has negative fee percent", tier.tier_order),
                });
            }
            if let Some(order) = previous_order {
                if tier.tier_order <= order {
                    return Err(EngineError::InvalidTierTable {
                        message: format!(
                            "tier order must be strictly ascending, {} follows {}",
                            tier.tier_order, order
                        ),
                    });
                }
            }
            previous_order = Some(tier.tier_order);

            let expected_start = previous_end.map(|e| e + 1).unwrap_or(1);
            match previous_end {
                None if tier.start_day != 1 => {
                    return Err(EngineError::InvalidTierTable {
                        message: format!("first tier must start at day 1, starts at {}", tier.start_day),
                    });
                }
                Some(_) if tier.start_day != expected_start => {
                    return Err(EngineError::InvalidTierTable {
                        message: format!(
                            "tier {} starts at day {}, expected day {} (gap or overlap)",
                            tier.tier_order, tier.start_day, expected_start
                        ),
                    });
                }
                _ => {}
            }

            match tier.end_day {
                Some(end) if end < tier.start_day => {
                    return Err(EngineError::InvalidTierTable {
                        message: format!(
                            "tier {} ends at day {} before its start day {}",
                            tier.tier_order, end, tier.start_day
                        ),
                    });
                }
                Some(end) => previous_end = Some(end),
                None if i != tiers.len() - 1 => {
                    return Err(EngineError::InvalidTierTable {
                        message: format!(
                            "tier {} is open-ended but not the last tier",
                            tier.tier_order
                        ),
                    });
                }
                None => previous_end = None,
            }
        }

        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[PenaltyTier] {
        &self.tiers
    }
}

/// breakdown of a single tier's contribution
#[derive(Debug, Clone, PartialEq)]
pub struct TierCharge {
    pub tier_order: u32,
    pub days_in_tier: u32,
    pub charge: Money,
}

/// result of a late-fee assessment
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyAssessment {
    pub days_overdue: u32,
    /// summed tier charges before GST
    pub base: Money,
    /// GST applied once to the summed base
    pub gst: Money,
    pub total: Money,
    pub tier_charges: Vec<TierCharge>,
}

impl PenaltyAssessment {
    fn zero(days_overdue: u32) -> Self {
        Self {
            days_overdue,
            base: Money::ZERO,
            gst: Money::ZERO,
            total: Money::ZERO,
            tier_charges: Vec::new(),
        }
    }
}

/// applies the tiered day-range table to overdue principal
pub struct PenaltyTierEngine {
    pub gst_rate: Rate,
}

impl PenaltyTierEngine {
    pub fn new(gst_rate: Rate) -> Self {
        Self { gst_rate }
    }

    /// assess the late fee for a loan `days_overdue` past its due date
    pub fn assess(
        &self,
        principal: Money,
        days_overdue: u32,
        table: &PenaltyTable,
    ) -> PenaltyAssessment {
        self.assess_raw(principal, days_overdue, table.tiers())
    }

    /// assess against an unvalidated tier slice
    ///
    /// days not governed by any tier contribute nothing; callers holding
    /// legacy tier rows that may have gaps get the lenient behavior, at the
    /// cost of possibly under-charging
    pub fn assess_raw(
        &self,
        principal: Money,
        days_overdue: u32,
        tiers: &[PenaltyTier],
    ) -> PenaltyAssessment {
        if days_overdue == 0 {
            return PenaltyAssessment::zero(0);
        }

        let mut base = Money::ZERO;
        let mut tier_charges = Vec::new();

        for tier in tiers {
            if days_overdue < tier.start_day {
                continue;
            }
            let overlap_end = match tier.end_day {
                Some(end) => days_overdue.min(end),
                None => days_overdue,
            };
            // malformed legacy rows (end before start) govern no days at all
            if overlap_end < tier.start_day {
                continue;
            }
            let days_in_tier = overlap_end - tier.start_day + 1;

            let charge = principal.percentage(tier.fee_percent_per_day) * Decimal::from(days_in_tier);
            base += charge;
            tier_charges.push(TierCharge {
                tier_order: tier.tier_order,
                days_in_tier,
                charge,
            });
        }

        let gst = base * self.gst_rate.as_decimal();
        PenaltyAssessment {
            days_overdue,
            base,
            gst,
            total: base + gst,
            tier_charges,
        }
    }
}
