//! Engine tuning knobs.

use std::time::Duration;

use lifelink_core::{
  eligibility::CooldownPolicy, requisition::FulfillmentPolicy,
};

/// All engine policy in one place; the server binary builds this from its
/// configuration file.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Maximum candidates per fan-out, bounding notification volume.
  pub fan_out_limit:       usize,
  /// Concurrent transport dispatches per fan-out batch.
  pub fan_out_concurrency: usize,
  /// Transport attempts per notification before it is flagged
  /// retry-eligible.
  pub dispatch_attempts:   u32,
  /// Initial backoff between transport attempts; doubles per retry.
  pub dispatch_backoff:    Duration,
  pub cooldown:            CooldownPolicy,
  pub fulfillment:         FulfillmentPolicy,
  /// Period of the background expiry sweep.
  pub sweep_interval:      Duration,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      fan_out_limit:       100,
      fan_out_concurrency: 8,
      dispatch_attempts:   3,
      dispatch_backoff:    Duration::from_millis(250),
      cooldown:            CooldownPolicy::default(),
      fulfillment:         FulfillmentPolicy::default(),
      sweep_interval:      Duration::from_secs(60),
    }
  }
}
