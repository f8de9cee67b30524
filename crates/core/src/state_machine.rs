//! Alert State Machine.
//!
//! One [`SensorAlertState`] record exists per sensor. [`process`] is the only
//! transition function: it takes the current record and the severity observed
//! this cycle (or `None` when nothing abnormal was seen) and returns a
//! [`Transition`] decision. It never fails and performs no I/O; the caller
//! persists the decision and only then acts on it.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::severity::Severity;
use crate::types::{SensorId, Timestamp};

/// Default minimum interval between notifications for one sensor.
pub const DEFAULT_COOLDOWN_SECS: i64 = 300; // 5 minutes

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What happens when a sensor stays in the same elevated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownPolicy {
    /// Only a state change alerts. A sustained condition stays silent until
    /// it changes or recovers.
    #[default]
    ChangeOnly,
    /// A sustained elevated state alerts again once the cooldown since the
    /// previous alert has expired.
    RealertAfterCooldown,
}

impl CooldownPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            CooldownPolicy::ChangeOnly => "change_only",
            CooldownPolicy::RealertAfterCooldown => "realert_after_cooldown",
        }
    }
}

impl fmt::Display for CooldownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CooldownPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "change_only" => Ok(CooldownPolicy::ChangeOnly),
            "realert_after_cooldown" => Ok(CooldownPolicy::RealertAfterCooldown),
            other => Err(CoreError::Config(format!(
                "unknown cooldown policy '{other}', expected change_only or realert_after_cooldown"
            ))),
        }
    }
}

/// Tunables for [`process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    pub cooldown: Duration,
    pub cooldown_policy: CooldownPolicy,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECS),
            cooldown_policy: CooldownPolicy::default(),
        }
    }
}

impl AlertPolicy {
    /// Load the policy from environment variables.
    ///
    /// | Variable                | Default       |
    /// |-------------------------|---------------|
    /// | `ALERT_COOLDOWN_SECS`   | `300`         |
    /// | `ALERT_COOLDOWN_POLICY` | `change_only` |
    pub fn from_env() -> Result<Self, CoreError> {
        let cooldown_secs = match std::env::var("ALERT_COOLDOWN_SECS") {
            Ok(v) => v.parse::<u32>().map_err(|_| {
                CoreError::Config(format!("ALERT_COOLDOWN_SECS must be a whole number, got '{v}'"))
            })?,
            Err(_) => DEFAULT_COOLDOWN_SECS as u32,
        };
        let cooldown_policy = match std::env::var("ALERT_COOLDOWN_POLICY") {
            Ok(v) => v.parse()?,
            Err(_) => CooldownPolicy::default(),
        };
        Ok(Self {
            cooldown: Duration::seconds(i64::from(cooldown_secs)),
            cooldown_policy,
        })
    }

    fn cooldown_elapsed(&self, since: Option<Timestamp>, now: Timestamp) -> bool {
        since.map_or(true, |t| now.signed_duration_since(t) >= self.cooldown)
    }
}

// ---------------------------------------------------------------------------
// State record
// ---------------------------------------------------------------------------

/// Durable per-sensor alert state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorAlertState {
    pub sensor_id: SensorId,
    pub current_state: Severity,
    pub last_alert_at: Option<Timestamp>,
    pub last_notification_at: Option<Timestamp>,
}

impl SensorAlertState {
    /// The implicit state of a sensor that has never alerted.
    pub fn initial(sensor_id: impl Into<SensorId>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            current_state: Severity::Normal,
            last_alert_at: None,
            last_notification_at: None,
        }
    }

    /// The record as it must be stored once `transition` has been accepted.
    pub fn apply(&self, transition: &Transition, now: Timestamp) -> Self {
        Self {
            sensor_id: self.sensor_id.clone(),
            current_state: transition.new_state,
            last_alert_at: if transition.should_alert {
                Some(now)
            } else {
                self.last_alert_at
            },
            last_notification_at: if transition.should_notify {
                Some(now)
            } else {
                self.last_notification_at
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Decision produced by [`process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub previous_state: Severity,
    pub new_state: Severity,
    /// Record a new alert.
    pub should_alert: bool,
    /// Deliver notifications for that alert.
    pub should_notify: bool,
    /// Any drop back to `normal` from an elevated state.
    pub is_recovery: bool,
    /// A direct `normal -> critical` jump.
    pub is_escalation: bool,
}

impl Transition {
    pub fn state_changed(&self) -> bool {
        self.previous_state != self.new_state
    }
}

/// Decide the transition for one sensor.
///
/// `observed` is the aggregated severity of this cycle, `None` meaning no
/// anomaly was observed (the sensor reads normal).
///
/// Any rise into `critical` bypasses the cooldown; every other alert notifies
/// only once the cooldown since the last notification has elapsed.
pub fn process(
    state: &SensorAlertState,
    observed: Option<Severity>,
    now: Timestamp,
    policy: &AlertPolicy,
) -> Transition {
    let previous_state = state.current_state;
    let new_state = observed.unwrap_or(Severity::Normal);

    let state_changed = previous_state != new_state;
    let is_escalation = previous_state == Severity::Normal && new_state == Severity::Critical;
    let is_recovery = previous_state.rank() > new_state.rank() && new_state == Severity::Normal;

    let realert = !state_changed
        && new_state.is_elevated()
        && policy.cooldown_policy == CooldownPolicy::RealertAfterCooldown
        && policy.cooldown_elapsed(state.last_alert_at, now);

    let should_alert = state_changed || realert;
    let rises_to_critical = new_state == Severity::Critical && new_state > previous_state;
    let should_notify = should_alert
        && (rises_to_critical || policy.cooldown_elapsed(state.last_notification_at, now));

    Transition {
        previous_state,
        new_state,
        should_alert,
        should_notify,
        is_recovery,
        is_escalation,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
