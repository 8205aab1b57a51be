//! Blood group taxonomy and the donor/recipient compatibility table.
//!
//! The matrix is a `match` over a closed enum, so adding a variant (which
//! will never happen — ABO/Rh is a fixed system) would fail to compile
//! rather than silently fall through.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

// ─── BloodGroup ──────────────────────────────────────────────────────────────

/// One of the eight ABO/Rh blood groups. Serialised as the clinical string
/// form (`"O-"`, `"AB+"`, ...) everywhere: JSON bodies, database columns,
/// query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
  #[serde(rename = "O-")]
  ONeg,
  #[serde(rename = "O+")]
  OPos,
  #[serde(rename = "A-")]
  ANeg,
  #[serde(rename = "A+")]
  APos,
  #[serde(rename = "B-")]
  BNeg,
  #[serde(rename = "B+")]
  BPos,
  #[serde(rename = "AB-")]
  AbNeg,
  #[serde(rename = "AB+")]
  AbPos,
}

use BloodGroup::*;

/// All eight groups, in antigen order.
pub const ALL_GROUPS: [BloodGroup; 8] =
  [ONeg, OPos, ANeg, APos, BNeg, BPos, AbNeg, AbPos];

impl BloodGroup {
  /// The clinical string form, matching the serde renames above.
  pub fn as_str(self) -> &'static str {
    match self {
      ONeg => "O-",
      OPos => "O+",
      ANeg => "A-",
      APos => "A+",
      BNeg => "B-",
      BPos => "B+",
      AbNeg => "AB-",
      AbPos => "AB+",
    }
  }

  /// Recipient groups this donor group may give to.
  pub fn can_donate_to(self) -> &'static [BloodGroup] {
    match self {
      ONeg => &ALL_GROUPS,
      OPos => &[OPos, APos, BPos, AbPos],
      ANeg => &[ANeg, APos, AbNeg, AbPos],
      APos => &[APos, AbPos],
      BNeg => &[BNeg, BPos, AbNeg, AbPos],
      BPos => &[BPos, AbPos],
      AbNeg => &[AbNeg, AbPos],
      AbPos => &[AbPos],
    }
  }

  /// Donor groups this recipient group may receive from — the inverse of
  /// [`can_donate_to`](Self::can_donate_to). Kept as its own table because
  /// the store needs it for SQL `IN` filters.
  pub fn compatible_donors(self) -> &'static [BloodGroup] {
    match self {
      ONeg => &[ONeg],
      OPos => &[ONeg, OPos],
      ANeg => &[ONeg, ANeg],
      APos => &[ONeg, OPos, ANeg, APos],
      BNeg => &[ONeg, BNeg],
      BPos => &[ONeg, OPos, BNeg, BPos],
      AbNeg => &[ONeg, ANeg, BNeg, AbNeg],
      AbPos => &ALL_GROUPS,
    }
  }
}

/// Whether `donor` blood may be given to a `recipient` patient.
pub fn is_compatible(donor: BloodGroup, recipient: BloodGroup) -> bool {
  donor.can_donate_to().contains(&recipient)
}

impl fmt::Display for BloodGroup {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BloodGroup {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "O-" => Ok(ONeg),
      "O+" => Ok(OPos),
      "A-" => Ok(ANeg),
      "A+" => Ok(APos),
      "B-" => Ok(BNeg),
      "B+" => Ok(BPos),
      "AB-" => Ok(AbNeg),
      "AB+" => Ok(AbPos),
      other => Err(Error::Validation(format!("unknown blood group: {other:?}"))),
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
