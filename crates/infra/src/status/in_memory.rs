use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use modgate_core::{Clock, UserId};

use super::r#trait::{SanctionDuration, StatusKind, StoreError, TemporalStatus, TemporalStatusStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StatusKey {
    subject: UserId,
    kind: StatusKind,
}

/// In-memory status store.
///
/// Intended for tests/dev. A single lock over the map gives per-key
/// read-modify-write atomicity (and more).
pub struct InMemoryStatusStore {
    records: RwLock<HashMap<StatusKey, TemporalStatus>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStatusStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn arc(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self::new(clock))
    }

    /// Raw stored record, without refresh-on-read.
    pub fn peek(&self, subject: UserId, kind: StatusKind) -> Result<Option<TemporalStatus>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        Ok(records.get(&StatusKey { subject, kind }).cloned())
    }

    fn write<F>(&self, subject: UserId, kind: StatusKind, f: F) -> Result<TemporalStatus, StoreError>
    where
        F: FnOnce(&mut TemporalStatus),
    {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        let record = records
            .entry(StatusKey { subject, kind })
            .or_insert_with(|| TemporalStatus::inactive(subject, kind));
        f(record);
        Ok(record.clone())
    }
}

impl core::fmt::Debug for InMemoryStatusStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryStatusStore").finish_non_exhaustive()
    }
}

impl TemporalStatusStore for InMemoryStatusStore {
    fn get(&self, subject: UserId, kind: StatusKind) -> Result<TemporalStatus, StoreError> {
        let key = StatusKey { subject, kind };
        let now = self.clock.now();

        {
            let records = self
                .records
                .read()
                .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
            match records.get(&key) {
                None => return Ok(TemporalStatus::inactive(subject, kind)),
                Some(record) if !record.is_expired(now) => return Ok(record.clone()),
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, a writer may have won the race.
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        let record = records
            .entry(key)
            .or_insert_with(|| TemporalStatus::inactive(subject, kind));
        if record.is_expired(now) {
            record.clear();
            tracing::debug!(subject = %subject, kind = %kind, "expired status cleared on read");
        }
        Ok(record.clone())
    }

    fn set_permanent(
        &self,
        subject: UserId,
        kind: StatusKind,
        reason: Option<String>,
        issued_by: Option<UserId>,
    ) -> Result<TemporalStatus, StoreError> {
        self.write(subject, kind, |record| {
            if record.is_permanent() && record.reason == reason {
                return;
            }
            record.active = true;
            record.until = None;
            record.reason = reason;
            record.issued_by = issued_by;
        })
    }

    fn set_timed(
        &self,
        subject: UserId,
        kind: StatusKind,
        duration: SanctionDuration,
        reason: Option<String>,
        issued_by: Option<UserId>,
    ) -> Result<TemporalStatus, StoreError> {
        let now = self.clock.now();
        let until = now.checked_add_signed(duration.as_duration()).ok_or_else(|| {
            StoreError::OutOfRange(format!(
                "{now} + {}s",
                duration.as_duration().num_seconds()
            ))
        })?;
        self.write(subject, kind, |record| {
            record.active = true;
            record.until = Some(until);
            record.reason = reason;
            record.issued_by = issued_by;
        })
    }

    fn clear(&self, subject: UserId, kind: StatusKind) -> Result<TemporalStatus, StoreError> {
        self.write(subject, kind, TemporalStatus::clear)
    }

    fn toggle(
        &self,
        subject: UserId,
        kind: StatusKind,
        reason: Option<String>,
        issued_by: Option<UserId>,
    ) -> Result<TemporalStatus, StoreError> {
        let now = self.clock.now();
        self.write(subject, kind, |record| {
            if record.is_in_effect(now) {
                record.clear();
            } else {
                record.active = true;
                record.until = None;
                record.reason = reason;
                record.issued_by = issued_by;
            }
        })
    }

    fn sweep_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        let mut cleared = 0;
        for record in records.values_mut().filter(|r| r.is_expired(now)) {
            record.clear();
            cleared += 1;
        }

        if cleared > 0 {
            tracing::info!(cleared, "swept expired statuses");
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use modgate_core::ManualClock;

    fn setup() -> (Arc<ManualClock>, InMemoryStatusStore) {
        let clock = Arc::new(ManualClock::default());
        let store = InMemoryStatusStore::new(clock.clone());
        (clock, store)
    }

    #[test]
    fn missing_record_reads_as_inactive() {
        let (_, store) = setup();
        let user = UserId::new();
        let status = store.get(user, StatusKind::Ban).unwrap();
        assert_eq!(status, TemporalStatus::inactive(user, StatusKind::Ban));
        // Pure read of a missing record does not create one.
        assert_eq!(store.peek(user, StatusKind::Ban).unwrap(), None);
    }

    #[test]
    fn timed_status_expires_lazily_and_idempotently() {
        let (clock, store) = setup();
        let user = UserId::new();
        let moderator = UserId::new();

        store
            .set_timed(
                user,
                StatusKind::Ban,
                SanctionDuration::seconds(1).unwrap(),
                Some("spam".to_string()),
                Some(moderator),
            )
            .unwrap();
        assert!(store.get(user, StatusKind::Ban).unwrap().active);

        clock.advance(Duration::seconds(2));

        // Storage still holds the stale record until someone reads it.
        assert!(store.peek(user, StatusKind::Ban).unwrap().unwrap().active);

        let first = store.get(user, StatusKind::Ban).unwrap();
        assert!(!first.active);
        assert_eq!(first.until, None);
        assert_eq!(first.reason, None);
        assert_eq!(first.issued_by, None);
        assert_eq!(store.peek(user, StatusKind::Ban).unwrap(), Some(first.clone()));

        let second = store.get(user, StatusKind::Ban).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn permanent_then_clear_round_trips_to_default() {
        let (_, store) = setup();
        let user = UserId::new();

        store
            .set_permanent(user, StatusKind::Mute, Some("abuse".to_string()), Some(UserId::new()))
            .unwrap();
        store.clear(user, StatusKind::Mute).unwrap();

        let status = store.get(user, StatusKind::Mute).unwrap();
        assert_eq!(status, TemporalStatus::inactive(user, StatusKind::Mute));
    }

    #[test]
    fn expiry_past_the_calendar_is_rejected() {
        let (clock, store) = setup();
        let user = UserId::new();
        clock.set(DateTime::<Utc>::MAX_UTC - Duration::days(1));

        let err = store
            .set_timed(user, StatusKind::Ban, SanctionDuration::seconds(7 * 86_400).unwrap(), None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange(_)));
        assert_eq!(store.peek(user, StatusKind::Ban).unwrap(), None);
    }

    #[test]
    fn clear_drops_stale_until() {
        let (_, store) = setup();
        let user = UserId::new();
        store
            .set_timed(user, StatusKind::Mute, SanctionDuration::seconds(600).unwrap(), None, None)
            .unwrap();

        let cleared = store.clear(user, StatusKind::Mute).unwrap();
        assert!(!cleared.active);
        assert_eq!(cleared.until, None);
    }

    #[test]
    fn set_permanent_with_same_reason_is_noop() {
        let (_, store) = setup();
        let user = UserId::new();
        let first_moderator = UserId::new();

        let first = store
            .set_permanent(user, StatusKind::Ban, Some("spam".to_string()), Some(first_moderator))
            .unwrap();
        let again = store
            .set_permanent(user, StatusKind::Ban, Some("spam".to_string()), Some(UserId::new()))
            .unwrap();
        assert_eq!(again, first);
        assert_eq!(again.issued_by, Some(first_moderator));

        let changed = store
            .set_permanent(user, StatusKind::Ban, Some("harassment".to_string()), None)
            .unwrap();
        assert_eq!(changed.reason.as_deref(), Some("harassment"));
    }

    #[test]
    fn permanent_replaces_timed() {
        let (clock, store) = setup();
        let user = UserId::new();
        store
            .set_timed(user, StatusKind::Ban, SanctionDuration::seconds(5).unwrap(), None, None)
            .unwrap();
        store.set_permanent(user, StatusKind::Ban, None, None).unwrap();

        clock.advance(Duration::days(365));
        let status = store.get(user, StatusKind::Ban).unwrap();
        assert!(status.active);
        assert_eq!(status.until, None);
    }

    #[test]
    fn ban_and_mute_are_independent() {
        let (_, store) = setup();
        let user = UserId::new();
        store.set_permanent(user, StatusKind::Ban, None, None).unwrap();
        assert!(store.get(user, StatusKind::Ban).unwrap().active);
        assert!(!store.get(user, StatusKind::Mute).unwrap().active);
    }

    #[test]
    fn toggle_flips_state() {
        let (_, store) = setup();
        let user = UserId::new();
        assert!(store.toggle(user, StatusKind::Ban, None, None).unwrap().active);
        assert!(!store.toggle(user, StatusKind::Ban, None, None).unwrap().active);
    }

    #[test]
    fn toggle_treats_expired_as_inactive() {
        let (clock, store) = setup();
        let user = UserId::new();
        store
            .set_timed(user, StatusKind::Ban, SanctionDuration::seconds(1).unwrap(), None, None)
            .unwrap();
        clock.advance(Duration::seconds(5));

        let toggled = store.toggle(user, StatusKind::Ban, None, None).unwrap();
        assert!(toggled.is_permanent());
    }

    #[test]
    fn sweep_clears_only_expired_records() {
        let (clock, store) = setup();
        let short = UserId::new();
        let long = UserId::new();
        let permanent = UserId::new();

        store
            .set_timed(short, StatusKind::Mute, SanctionDuration::seconds(10).unwrap(), None, None)
            .unwrap();
        store
            .set_timed(long, StatusKind::Mute, SanctionDuration::seconds(1000).unwrap(), None, None)
            .unwrap();
        store.set_permanent(permanent, StatusKind::Ban, None, None).unwrap();

        clock.advance(Duration::seconds(60));
        assert_eq!(store.sweep_expired().unwrap(), 1);
        assert_eq!(store.sweep_expired().unwrap(), 0);

        assert!(!store.peek(short, StatusKind::Mute).unwrap().unwrap().active);
        assert!(store.peek(long, StatusKind::Mute).unwrap().unwrap().active);
        assert!(store.peek(permanent, StatusKind::Ban).unwrap().unwrap().active);
    }

    #[test]
    fn concurrent_set_and_clear_leave_one_input_exactly() {
        for _ in 0..50 {
            let clock = Arc::new(ManualClock::default());
            let store = Arc::new(InMemoryStatusStore::new(clock.clone()));
            let user = UserId::new();
            let moderator = UserId::new();
            let expected_until = clock.now() + Duration::seconds(300);

            let setter = {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .set_timed(
                            user,
                            StatusKind::Ban,
                            SanctionDuration::seconds(300).unwrap(),
                            Some("flood".to_string()),
                            Some(moderator),
                        )
                        .unwrap();
                })
            };
            let clearer = {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.clear(user, StatusKind::Ban).unwrap();
                })
            };
            setter.join().unwrap();
            clearer.join().unwrap();

            let status = store.get(user, StatusKind::Ban).unwrap();
            let timed = TemporalStatus {
                subject: user,
                kind: StatusKind::Ban,
                active: true,
                until: Some(expected_until),
                reason: Some("flood".to_string()),
                issued_by: Some(moderator),
            };
            let cleared = TemporalStatus::inactive(user, StatusKind::Ban);
            assert!(status == timed || status == cleared, "torn write: {status:?}");
        }
    }
}
