//! Candidate matching for a requisition.

use chrono::Utc;
use lifelink_core::{
  directory,
  donor::DonorCandidate,
  requisition::BloodRequisition,
  store::{DonorFilter, LifelinkStore},
};

use crate::{Engine, Error, Result, transport::NotificationTransport};

// ─── MatchOutcome ────────────────────────────────────────────────────────────

/// Result of a match pass. An empty candidate set is a reportable,
/// non-fatal condition — the requisition stays Active and a later rematch
/// (donors edit their profiles, cooldowns elapse) may succeed.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
  Candidates(Vec<DonorCandidate>),
  NoEligibleDonors,
}

// ─── Matching ────────────────────────────────────────────────────────────────

impl<S, T> Engine<S, T>
where
  S: LifelinkStore,
  T: NotificationTransport,
{
  /// Donors who may be notified for `requisition`: opted in, compatible
  /// group, location match, currently eligible to donate, capped at the
  /// fan-out limit.
  pub async fn match_donors(
    &self,
    requisition: &BloodRequisition,
  ) -> Result<MatchOutcome> {
    let filter = DonorFilter {
      groups:   requisition.blood_group.compatible_donors().to_vec(),
      location: requisition
        .location
        .city
        .clone()
        .or_else(|| requisition.location.state.clone()),
    };

    let donors = self
      .store
      .find_donors(&filter)
      .await
      .map_err(Error::from_store)?;

    let mut candidates = directory::rank_candidates(
      donors,
      Utc::now(),
      self.config.cooldown,
      self.config.fan_out_limit,
    );
    // Directory search surfaces almost-eligible donors; fan-out does not
    // contact them.
    candidates.retain(|c| c.eligibility.is_eligible);

    if candidates.is_empty() {
      Ok(MatchOutcome::NoEligibleDonors)
    } else {
      Ok(MatchOutcome::Candidates(candidates))
    }
  }
}
