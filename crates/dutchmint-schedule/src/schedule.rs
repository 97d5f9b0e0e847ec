//! Step-decay price computation.
//!
//! Dutch mode:
//!
//!   steps(t) = min(floor((t − start) / interval), max_decrements)
//!   price(t) = max(floor_price, base_price − decay_step × steps(t))
//!
//! Prices only move at interval boundaries; there is no interpolation inside
//! an interval. Before `start` the schedule has no price at all.

use dutchmint_core::error::MintError;
use dutchmint_core::params::{DutchConfig, PricingMode};
use dutchmint_core::types::{Balance, Quantity, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One point of a schedule preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Timestamp from which `price` applies.
    pub at: Timestamp,
    pub price: Balance,
}

/// Price schedule for a single sale tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSchedule {
    pub mode: PricingMode,
    pub start_timestamp: Option<Timestamp>,
}

impl PriceSchedule {
    pub fn fixed(price: Balance) -> Self {
        Self { mode: PricingMode::Fixed { price }, start_timestamp: None }
    }

    pub fn dutch(config: DutchConfig, start: Option<Timestamp>) -> Self {
        Self { mode: PricingMode::Dutch(config), start_timestamp: start }
    }

    pub fn with_start(mut self, start: Option<Timestamp>) -> Self {
        self.start_timestamp = start;
        self
    }

    /// Number of decrements applied at `now`. Zero for fixed schedules.
    pub fn decrements_at(&self, now: Timestamp) -> Result<u64, MintError> {
        match &self.mode {
            PricingMode::Fixed { .. } => Ok(0),
            PricingMode::Dutch(cfg) => {
                let start = self.start_timestamp.ok_or(MintError::SaleNotStarted)?;
                if now < start {
                    return Err(MintError::SaleNotStarted);
                }
                let elapsed = now.checked_sub(start).ok_or(MintError::ArithmeticOverflow)?;
                let steps = (elapsed / cfg.decay_interval_secs) as u64;
                Ok(match cfg.max_decrements {
                    Some(max) => steps.min(max),
                    None => steps,
                })
            }
        }
    }

    /// Unit price at `now`.
    pub fn current_price(&self, now: Timestamp) -> Result<Balance, MintError> {
        match &self.mode {
            PricingMode::Fixed { price } => Ok(*price),
            PricingMode::Dutch(cfg) => {
                let steps = self.decrements_at(now)?;
                // An overflowing discount has certainly passed the floor.
                let price = match cfg.decay_step.checked_mul(steps as Balance) {
                    Some(discount) => cfg.base_price.saturating_sub(discount),
                    None => 0,
                };
                Ok(price.max(cfg.floor_price))
            }
        }
    }

    /// Require `supplied == current_price(now) × quantity`. Over- and
    /// underpayment both fail; there is no refund path.
    pub fn require_exact_payment(
        &self,
        quantity: Quantity,
        supplied: Balance,
        now: Timestamp,
    ) -> Result<Balance, MintError> {
        let unit = self.current_price(now)?;
        let expected = unit
            .checked_mul(quantity as Balance)
            .ok_or(MintError::ArithmeticOverflow)?;
        if supplied != expected {
            debug!(expected, supplied, quantity, "payment mismatch");
            return Err(MintError::InvalidAmount { expected, supplied });
        }
        Ok(expected)
    }

    /// Upcoming price points starting at the interval containing `from`.
    /// Stops early once the price stops changing.
    pub fn preview(&self, from: Timestamp, max_points: usize) -> Result<Vec<PricePoint>, MintError> {
        let mut points = Vec::new();
        match &self.mode {
            PricingMode::Fixed { price } => {
                if max_points > 0 {
                    points.push(PricePoint { at: from, price: *price });
                }
            }
            PricingMode::Dutch(cfg) => {
                let start = self.start_timestamp.ok_or(MintError::SaleNotStarted)?;
                let first = from.max(start);
                let elapsed = first.checked_sub(start).ok_or(MintError::ArithmeticOverflow)?;
                let mut at = start
                    .checked_add((elapsed / cfg.decay_interval_secs) * cfg.decay_interval_secs)
                    .ok_or(MintError::ArithmeticOverflow)?;
                while points.len() < max_points {
                    let price = self.current_price(at)?;
                    if points.last().map(|p: &PricePoint| p.price) == Some(price) {
                        break;
                    }
                    points.push(PricePoint { at, price });
                    // End of representable time.
                    at = match at.checked_add(cfg.decay_interval_secs) {
                        Some(next) => next,
                        None => break,
                    };
                }
            }
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutchmint_core::constants::WEI_PER_ETHER;

    const START: Timestamp = 1_643_870_957;
    const HALF: Balance = WEI_PER_ETHER / 2;

    fn dutch(floor: Balance, max_decrements: Option<u64>) -> PriceSchedule {
        PriceSchedule::dutch(
            DutchConfig {
                base_price: 5 * WEI_PER_ETHER,
                floor_price: floor,
                decay_step: HALF,
                decay_interval_secs: 900,
                max_decrements,
            },
            Some(START),
        )
    }

    #[test]
    fn fixed_price_is_constant() {
        let s = PriceSchedule::fixed(7);
        assert_eq!(s.current_price(0).unwrap(), 7);
        assert_eq!(s.current_price(i64::MAX).unwrap(), 7);
    }

    #[test]
    fn dutch_steps_at_interval_boundaries() {
        let s = dutch(0, None);
        assert_eq!(s.current_price(START).unwrap(), 5 * WEI_PER_ETHER);
        assert_eq!(s.current_price(START + 899).unwrap(), 5 * WEI_PER_ETHER);
        assert_eq!(s.current_price(START + 900).unwrap(), 9 * HALF);
        assert_eq!(s.current_price(START + 3 * 900).unwrap(), 7 * HALF);
        assert_eq!(s.current_price(START + 9 * 900).unwrap(), HALF);
    }

    #[test]
    fn dutch_never_goes_below_floor() {
        let s = dutch(WEI_PER_ETHER, None);
        assert_eq!(s.current_price(START + 8 * 900).unwrap(), WEI_PER_ETHER);
        assert_eq!(s.current_price(START + 1_000 * 900).unwrap(), WEI_PER_ETHER);
        assert_eq!(s.current_price(i64::MAX).unwrap(), WEI_PER_ETHER);
    }

    #[test]
    fn max_decrements_acts_as_second_floor() {
        let s = dutch(0, Some(4));
        assert_eq!(s.current_price(START + 100 * 900).unwrap(), 3 * WEI_PER_ETHER);
    }

    #[test]
    fn dutch_before_start_has_no_price() {
        let s = dutch(0, None);
        assert_eq!(s.current_price(START - 1).unwrap_err(), MintError::SaleNotStarted);
        let unscheduled = s.clone().with_start(None);
        assert_eq!(unscheduled.current_price(START).unwrap_err(), MintError::SaleNotStarted);
    }

    #[test]
    fn exact_payment_rejects_over_and_under() {
        let s = dutch(0, None);
        assert_eq!(s.require_exact_payment(2, 10 * WEI_PER_ETHER, START).unwrap(), 10 * WEI_PER_ETHER);
        assert!(matches!(
            s.require_exact_payment(2, 5 * WEI_PER_ETHER, START),
            Err(MintError::InvalidAmount { .. })
        ));
        assert!(matches!(
            s.require_exact_payment(1, 9 * HALF, START),
            Err(MintError::InvalidAmount { expected, supplied })
                if expected == 5 * WEI_PER_ETHER && supplied == 9 * HALF
        ));
        assert!(matches!(
            s.require_exact_payment(1, 5 * WEI_PER_ETHER, START + 900),
            Err(MintError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn preview_stops_when_price_settles() {
        let s = dutch(4 * WEI_PER_ETHER, None);
        let points = s.preview(START + 10, 10).unwrap();
        let prices: Vec<Balance> = points.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![5 * WEI_PER_ETHER, 9 * HALF, 4 * WEI_PER_ETHER]);
        assert_eq!(points[0].at, START);
        assert_eq!(points[2].at, START + 1_800);
    }

    #[test]
    fn extreme_start_overflows_cleanly() {
        let s = dutch(0, None).with_start(Some(i64::MIN));
        assert_eq!(s.current_price(i64::MAX).unwrap_err(), MintError::ArithmeticOverflow);
        assert_eq!(s.preview(i64::MAX, 3).unwrap_err(), MintError::ArithmeticOverflow);
    }

    #[test]
    fn preview_ends_at_last_timestamp() {
        let s = dutch(0, None).with_start(Some(i64::MAX - 1_000));
        let points = s.preview(i64::MAX - 1_000, 10).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].at, i64::MAX - 100);
    }
}
