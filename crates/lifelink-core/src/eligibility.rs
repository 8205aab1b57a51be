//! Donation eligibility — the cooldown window between donations.
//!
//! Pure functions of the inputs; the reference "now" is always passed in so
//! results are reproducible in tests.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Minimum days between whole-blood donations.
pub const DEFAULT_COOLDOWN_DAYS: i64 = 90;

/// The cooldown interval. Carried in configuration rather than hardcoded at
/// each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownPolicy {
  pub days: i64,
}

impl Default for CooldownPolicy {
  fn default() -> Self {
    Self { days: DEFAULT_COOLDOWN_DAYS }
  }
}

/// A donor's eligibility verdict at a reference instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
  pub is_eligible:              bool,
  /// `None` when the donor has never recorded a donation.
  pub days_since_last_donation: Option<i64>,
  /// The first date the donor may donate again; `None` when already
  /// unconstrained by history.
  pub next_eligible_date:       Option<NaiveDate>,
  /// Days until `next_eligible_date`; zero when eligible.
  pub days_remaining:           i64,
}

/// Evaluate the cooldown rule. A donor with no recorded donation is always
/// eligible; otherwise eligibility begins exactly `policy.days` days after
/// the last donation (day 90 is eligible, day 89 is not).
pub fn evaluate(
  last_donation: Option<NaiveDate>,
  now: DateTime<Utc>,
  policy: CooldownPolicy,
) -> Eligibility {
  let Some(last) = last_donation else {
    return Eligibility {
      is_eligible:              true,
      days_since_last_donation: None,
      next_eligible_date:       None,
      days_remaining:           0,
    };
  };

  let today = now.date_naive();
  let days_since = (today - last).num_days();
  let next_eligible = last + Duration::days(policy.days);
  let is_eligible = days_since >= policy.days;

  Eligibility {
    is_eligible,
    days_since_last_donation: Some(days_since),
    next_eligible_date: Some(next_eligible),
    days_remaining: (policy.days - days_since).max(0),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
  }

  #[test]
  fn no_history_is_eligible() {
    let e = evaluate(None, at(2025, 6, 1), CooldownPolicy::default());
    assert!(e.is_eligible);
    assert_eq!(e.days_since_last_donation, None);
    assert_eq!(e.next_eligible_date, None);
    assert_eq!(e.days_remaining, 0);
  }

  #[test]
  fn day_89_is_not_eligible() {
    let now = at(2025, 6, 1);
    let last = now.date_naive() - Duration::days(89);
    let e = evaluate(Some(last), now, CooldownPolicy::default());
    assert!(!e.is_eligible);
    assert_eq!(e.days_since_last_donation, Some(89));
    assert_eq!(e.days_remaining, 1);
  }

  #[test]
  fn day_90_is_eligible() {
    let now = at(2025, 6, 1);
    let last = now.date_naive() - Duration::days(90);
    let e = evaluate(Some(last), now, CooldownPolicy::default());
    assert!(e.is_eligible);
    assert_eq!(e.days_remaining, 0);
  }

  #[test]
  fn day_91_is_eligible() {
    let now = at(2025, 6, 1);
    let last = now.date_naive() - Duration::days(91);
    let e = evaluate(Some(last), now, CooldownPolicy::default());
    assert!(e.is_eligible);
    assert_eq!(e.days_since_last_donation, Some(91));
  }

  #[test]
  fn next_eligible_date_is_cooldown_after_last() {
    let now = at(2025, 6, 1);
    let last = now.date_naive() - Duration::days(10);
    let e = evaluate(Some(last), now, CooldownPolicy::default());
    assert_eq!(e.next_eligible_date, Some(last + Duration::days(90)));
    assert_eq!(e.days_remaining, 80);
  }

  #[test]
  fn custom_cooldown_is_respected() {
    let now = at(2025, 6, 1);
    let last = now.date_naive() - Duration::days(60);
    let e = evaluate(Some(last), now, CooldownPolicy { days: 56 });
    assert!(e.is_eligible);
  }
}
