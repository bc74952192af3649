//! Slot allocation planning.
//!
//! Greedy, single-pass and deterministic: the roomiest eligible bin of the
//! exact size class wins, ties going to the lowest bin code. No bin-packing
//! optimisation is attempted.

use serde::{Deserialize, Serialize};

use solewms_core::{UnitId, ValueObject};

use crate::bin::{Bin, BinCode, SizeClass};

/// Outcome class of an allocation attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationReason {
    /// One bin holds the whole quantity.
    Fit,
    /// The best bin holds only part of it; the rest is overflow.
    PartialFit,
    /// No eligible bin of the size class has room.
    NoFit,
}

impl core::fmt::Display for AllocationReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            AllocationReason::Fit => "Fit",
            AllocationReason::PartialFit => "PartialFit",
            AllocationReason::NoFit => "NoFit",
        };
        f.write_str(s)
    }
}

/// A bin as seen by the planner: its code and free capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub bin_code: BinCode,
    pub remaining: u32,
}

impl From<&Bin> for Candidate {
    fn from(bin: &Bin) -> Self {
        Self {
            bin_code: bin.code().clone(),
            remaining: bin.remaining(),
        }
    }
}

/// What the planner wants reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub bin_code: Option<BinCode>,
    pub reserve_qty: u32,
    pub reason: AllocationReason,
    pub overflow_qty: u32,
}

/// Result of allocating one accepted unit. Produced once per acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDecision {
    pub unit_id: UnitId,
    pub chosen_bin_code: Option<BinCode>,
    pub reason: AllocationReason,
    /// Quantity actually reserved in `chosen_bin_code`.
    pub reserved_qty: u32,
    pub overflow_qty: u32,
}

impl AllocationDecision {
    pub fn from_plan(unit_id: UnitId, plan: AllocationPlan) -> Self {
        Self {
            unit_id,
            chosen_bin_code: plan.bin_code,
            reason: plan.reason,
            reserved_qty: plan.reserve_qty,
            overflow_qty: plan.overflow_qty,
        }
    }

    pub fn needs_attention(&self) -> bool {
        self.reason != AllocationReason::Fit
    }
}

impl ValueObject for AllocationDecision {}

/// Filter and order bins the way `findCandidates` reports them: eligible
/// bins of the exact size class, most free capacity first, then bin code.
pub fn rank_candidates<'a>(
    bins: impl IntoIterator<Item = &'a Bin>,
    size_class: SizeClass,
) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = bins
        .into_iter()
        .filter(|b| b.is_candidate_for(size_class))
        .map(Candidate::from)
        .collect();
    out.sort_by(|a, b| {
        b.remaining
            .cmp(&a.remaining)
            .then_with(|| a.bin_code.cmp(&b.bin_code))
    });
    out
}

/// Choose a bin for `qty` units among `candidates` (any order).
///
/// The roomiest candidate is both the best full fit (if any bin fits, it
/// does) and the best partial fit, so one pass suffices.
pub fn plan_allocation(candidates: &[Candidate], qty: u32) -> AllocationPlan {
    let best = candidates
        .iter()
        .filter(|c| c.remaining > 0)
        .fold(None::<&Candidate>, |best, c| match best {
            None => Some(c),
            Some(b) if c.remaining > b.remaining => Some(c),
            Some(b) if c.remaining == b.remaining && c.bin_code < b.bin_code => Some(c),
            keep => keep,
        });

    match best {
        None => AllocationPlan {
            bin_code: None,
            reserve_qty: 0,
            reason: AllocationReason::NoFit,
            overflow_qty: qty,
        },
        Some(c) if c.remaining >= qty => AllocationPlan {
            bin_code: Some(c.bin_code.clone()),
            reserve_qty: qty,
            reason: AllocationReason::Fit,
            overflow_qty: 0,
        },
        Some(c) => AllocationPlan {
            bin_code: Some(c.bin_code.clone()),
            reserve_qty: c.remaining,
            reason: AllocationReason::PartialFit,
            overflow_qty: qty - c.remaining,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(code: &str, remaining: u32) -> Candidate {
        Candidate {
            bin_code: BinCode::new(code).unwrap(),
            remaining,
        }
    }

    fn test_bin(code: &str, size: SizeClass, capacity: u32, occupied: u32) -> Bin {
        let mut bin = Bin::new(BinCode::new(code).unwrap(), size, capacity).unwrap();
        if occupied > 0 {
            bin.reserve(occupied).unwrap();
        }
        bin
    }

    #[test]
    fn qty_40_fits_only_the_50_bin() {
        let c = [candidate("A-01-01", 50), candidate("A-01-02", 30)];
        let plan = plan_allocation(&c, 40);
        assert_eq!(plan.bin_code, Some(BinCode::new("A-01-01").unwrap()));
        assert_eq!(plan.reason, AllocationReason::Fit);
        assert_eq!(plan.reserve_qty, 40);
        assert_eq!(plan.overflow_qty, 0);
    }

    #[test]
    fn fit_prefers_roomiest_bin_even_when_smaller_fits() {
        let c = [candidate("A-01-02", 30), candidate("A-01-01", 50)];
        let plan = plan_allocation(&c, 20);
        assert_eq!(plan.bin_code, Some(BinCode::new("A-01-01").unwrap()));
        assert_eq!(plan.reason, AllocationReason::Fit);
    }

    #[test]
    fn qty_55_is_partial_fit_in_50_bin() {
        let c = [candidate("A-01-01", 50), candidate("A-01-02", 30)];
        let plan = plan_allocation(&c, 55);
        assert_eq!(plan.bin_code, Some(BinCode::new("A-01-01").unwrap()));
        assert_eq!(plan.reason, AllocationReason::PartialFit);
        assert_eq!(plan.reserve_qty, 50);
        assert_eq!(plan.overflow_qty, 5);
    }

    #[test]
    fn no_candidates_is_no_fit_with_full_overflow() {
        let plan = plan_allocation(&[], 12);
        assert_eq!(plan.bin_code, None);
        assert_eq!(plan.reason, AllocationReason::NoFit);
        assert_eq!(plan.overflow_qty, 12);
    }

    #[test]
    fn ties_go_to_lowest_bin_code() {
        let c = [candidate("B-01-01", 40), candidate("A-09-09", 40)];
        let plan = plan_allocation(&c, 10);
        assert_eq!(plan.bin_code, Some(BinCode::new("A-09-09").unwrap()));
    }

    #[test]
    fn rank_candidates_filters_size_and_full_and_maintenance() {
        let mut maint = test_bin("A-01-03", SizeClass::M, 80, 0);
        maint.set_maintenance(true);
        let bins = vec![
            test_bin("A-01-01", SizeClass::M, 50, 0),
            test_bin("A-01-02", SizeClass::M, 30, 0),
            test_bin("A-01-04", SizeClass::M, 20, 20),
            test_bin("B-01-01", SizeClass::L, 99, 0),
            maint,
        ];
        let ranked = rank_candidates(&bins, SizeClass::M);
        let codes: Vec<&str> = ranked.iter().map(|c| c.bin_code.as_str()).collect();
        assert_eq!(codes, vec!["A-01-01", "A-01-02"]);
    }

    #[test]
    fn rank_candidates_breaks_ties_by_code() {
        let bins = vec![
            test_bin("C-01-01", SizeClass::S, 10, 0),
            test_bin("A-01-01", SizeClass::S, 10, 0),
            test_bin("B-01-01", SizeClass::S, 20, 10),
        ];
        let ranked = rank_candidates(&bins, SizeClass::S);
        let codes: Vec<&str> = ranked.iter().map(|c| c.bin_code.as_str()).collect();
        assert_eq!(codes, vec!["A-01-01", "B-01-01", "C-01-01"]);
    }

    fn arb_candidates() -> impl Strategy<Value = Vec<Candidate>> {
        prop::collection::vec((0u32..5, 0u32..100), 0..12).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (zone, remaining))| Candidate {
                    bin_code: BinCode::new(format!("Z{zone}-01-{i:02}")).unwrap(),
                    remaining,
                })
                .collect()
        })
    }

    proptest! {
        /// Property: a full fit is always chosen when any single bin has room.
        #[test]
        fn full_fit_preferred(candidates in arb_candidates(), qty in 1u32..150) {
            let plan = plan_allocation(&candidates, qty);
            let any_fits = candidates.iter().any(|c| c.remaining >= qty);
            if any_fits {
                prop_assert_eq!(plan.reason, AllocationReason::Fit);
                prop_assert_eq!(plan.reserve_qty, qty);
            } else {
                prop_assert_ne!(plan.reason, AllocationReason::Fit);
            }
            prop_assert_eq!(plan.reserve_qty + plan.overflow_qty, qty);
        }

        /// Property: input order never changes the decision.
        #[test]
        fn planning_is_order_independent(candidates in arb_candidates(), qty in 1u32..150) {
            let mut reversed = candidates.clone();
            reversed.reverse();
            prop_assert_eq!(plan_allocation(&candidates, qty), plan_allocation(&reversed, qty));
        }
    }
}
