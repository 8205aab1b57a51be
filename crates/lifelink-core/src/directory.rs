//! Candidate ranking for the donor directory.
//!
//! The store does the coarse filtering (opted-in, compatible group, location
//! substring); this module applies the eligibility rule and the ordering:
//! eligible donors first, then almost-eligible donors by soonest
//! next-eligible date, truncated to the caller's limit.

use chrono::{DateTime, Utc};

use crate::{
  donor::{DonorCandidate, DonorProfile},
  eligibility::{self, CooldownPolicy},
};

/// Rank an already-filtered donor set into directory order.
///
/// Eligible donors sort before ineligible ones. Within the eligible block,
/// never-donated donors come first, then longest-rested; within the
/// ineligible block, donors sort by soonest next-eligible date. Empty input
/// yields empty output — never an error.
pub fn rank_candidates(
  donors: Vec<DonorProfile>,
  now: DateTime<Utc>,
  policy: CooldownPolicy,
  limit: usize,
) -> Vec<DonorCandidate> {
  let mut candidates: Vec<DonorCandidate> = donors
    .into_iter()
    .map(|profile| {
      let eligibility =
        eligibility::evaluate(profile.last_donation_date, now, policy);
      DonorCandidate { profile, eligibility }
    })
    .collect();

  candidates.sort_by(|a, b| {
    let key = |c: &DonorCandidate| {
      (
        !c.eligibility.is_eligible,
        c.eligibility.next_eligible_date,
        c.profile.created_at,
      )
    };
    key(a).cmp(&key(b))
  });

  candidates.truncate(limit);
  candidates
}

// ─── Tests ───────────────────────────────────────────────────────────────────
