//! Per-model daily request quota.

use std::sync::Arc;

use chrono::{DateTime, Local, LocalResult, NaiveTime, Offset, TimeDelta, TimeZone};
use proto::ModelProfile;
use tracing::debug;

use crate::store::PreferenceStore;

/// Source of "today" for quota bucketing.
pub trait Clock: Send + Sync {
    /// Unix timestamp of the start of the current local calendar day.
    fn day_start_epoch(&self) -> i64;
}

/// Device-local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn day_start_epoch(&self) -> i64 {
        start_of_day(&Local::now())
    }
}

/// Returns the Unix timestamp of local midnight for the day containing `now`.
///
/// When a DST transition skips midnight, the day starts at the first local
/// minute that exists.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> i64 {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    for minute in 0..GAP_SEARCH_MINUTES {
        let local = midnight + TimeDelta::minutes(minute);
        if let Some(start) = tz.from_local_datetime(&local).earliest() {
            return start.timestamp();
        }
    }
    let offset = i64::from(now.offset().fix().local_minus_utc());
    midnight.and_utc().timestamp() - offset
}

/// Longest skipped span searched for the first valid local time of a day.
const GAP_SEARCH_MINUTES: i64 = 24 * 60;

/// Persisted key for one model's counter on one day.
pub fn quota_key(model_id: &str, day_start_epoch: i64) -> String {
    format!("requests_{model_id}_{day_start_epoch}")
}

/// Tracks and enforces the daily request cap, independently per model.
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
}

impl QuotaLedger {
    /// Creates a ledger reading "today" from the system clock.
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a ledger with an explicit clock.
    pub fn with_clock(store: Arc<dyn PreferenceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn today_key(&self, model_id: &str) -> String {
        quota_key(model_id, self.clock.day_start_epoch())
    }

    /// Requests registered today for `model_id`.
    pub fn count(&self, model_id: &str) -> u32 {
        self.store.get_u32(&self.today_key(model_id)).unwrap_or(0)
    }

    /// `true` iff today's count is below the profile's daily limit.
    pub fn can_send(&self, profile: &ModelProfile) -> bool {
        self.count(&profile.id) < profile.daily_limit
    }

    /// Requests left today, never below zero.
    pub fn remaining(&self, profile: &ModelProfile) -> u32 {
        profile.daily_limit.saturating_sub(self.count(&profile.id))
    }

    /// Counts one completed exchange against today's bucket for `model_id`.
    ///
    /// Callers must invoke this exactly once per successful exchange.
    pub fn register_request(&self, model_id: &str) -> u32 {
        let key = self.today_key(model_id);
        let count = self.store.get_u32(&key).unwrap_or(0).saturating_add(1);
        self.store.set_u32(&key, count);
        debug!(model = %model_id, count, "Request registered");
        count
    }
}
