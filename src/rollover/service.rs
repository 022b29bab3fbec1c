use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use sqlx::SqlitePool;
use time::{Date, OffsetDateTime, UtcOffset};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo;
use crate::db::unix_millis;

#[derive(Debug, thiserror::Error)]
pub enum RolloverError {
    #[error("rollover transaction failed: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverOutcome {
    /// Checkpoint already points at today; nothing to do.
    Current,
    /// Another rollover for this user is in flight; this trigger coalesces.
    AlreadyRunning,
    /// Day boundary crossed; `archived` rows moved (possibly zero).
    Completed { archived: u64 },
}

/// Broadcast to log consumers after a successful rollover so they reload.
#[derive(Debug, Clone, Serialize)]
pub struct RolloverEvent {
    pub user_id: Uuid,
    pub archived: u64,
}

/// Moves yesterday's (and older) log entries into the archive exactly once
/// per calendar day. The persisted checkpoint decides whether anything needs
/// doing; an in-memory set keeps two rollovers for one user from ever
/// interleaving.
pub struct Archiver {
    db: SqlitePool,
    offset: UtcOffset,
    in_flight: Mutex<HashSet<Uuid>>,
    events: broadcast::Sender<RolloverEvent>,
}

impl Archiver {
    pub fn new(db: SqlitePool, utc_offset_hours: i32) -> Self {
        let offset = UtcOffset::from_hms(utc_offset_hours as i8, 0, 0).unwrap_or(UtcOffset::UTC);
        let (events, _) = broadcast::channel(16);
        Self {
            db,
            offset,
            in_flight: Mutex::new(HashSet::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RolloverEvent> {
        self.events.subscribe()
    }

    pub fn local_today(&self, now: OffsetDateTime) -> Date {
        now.to_offset(self.offset).date()
    }

    /// Local midnight of `now`'s day, as unix milliseconds. Everything logged
    /// before this instant belongs to a previous day.
    pub fn start_of_today_ms(&self, now: OffsetDateTime) -> i64 {
        let midnight = self.local_today(now).midnight().assume_offset(self.offset);
        unix_millis(midnight)
    }

    /// The rollover check: compare the checkpoint to today's date, and when a
    /// new day has begun, atomically migrate all pre-midnight entries. On
    /// storage failure the checkpoint stays untouched so the next trigger
    /// retries the whole operation.
    pub async fn check(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<RolloverOutcome, RolloverError> {
        let today = format_date(self.local_today(now));

        let checkpoint = repo::checkpoint(&self.db, &user_id).await?;
        if checkpoint.as_deref() == Some(today.as_str()) {
            return Ok(RolloverOutcome::Current);
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, user_id) else {
            return Ok(RolloverOutcome::AlreadyRunning);
        };

        info!(%user_id, %today, previous = checkpoint.as_deref().unwrap_or("-"), "new day detected, rolling over");

        let cutoff = self.start_of_today_ms(now);
        let archived = repo::archive_older_than(&self.db, &user_id, cutoff, unix_millis(now)).await?;

        repo::put_checkpoint(&self.db, &user_id, &today).await?;

        if archived > 0 {
            info!(%user_id, archived, "rollover complete");
            let _ = self.events.send(RolloverEvent { user_id, archived });
        }

        Ok(RolloverOutcome::Completed { archived })
    }

    /// Background tick. Runs once a minute and does real work only in the
    /// first minutes after local midnight; every other firing is a cheap
    /// window check. View-load triggers remain the primary path.
    pub async fn run_periodic(&self, tick: Duration) {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let now = OffsetDateTime::now_utc();
            if !in_maintenance_window(now.to_offset(self.offset)) {
                continue;
            }
            let today = format_date(self.local_today(now));
            let stale = match repo::stale_checkpoint_users(&self.db, &today).await {
                Ok(stale) => stale,
                Err(e) => {
                    warn!(error = %e, "could not list stale checkpoints");
                    continue;
                }
            };
            for user_id in stale {
                if let Err(e) = self.check(user_id, now).await {
                    error!(error = %e, %user_id, "midnight rollover failed");
                }
            }
        }
    }
}

/// The early-morning slot the periodic tick is allowed to work in, mirroring
/// the on-device behavior of running cleanup just past midnight.
fn in_maintenance_window(local: OffsetDateTime) -> bool {
    local.hour() == 0 && (1..=5).contains(&local.minute())
}

fn format_date(date: Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    user_id: Uuid,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<Uuid>>, user_id: Uuid) -> Option<Self> {
        if set.lock().unwrap().insert(user_id) {
            Some(Self { set, user_id })
        } else {
            None
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().unwrap().remove(&self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::repo::{insert_if_absent, Product};
    use crate::db::test_pool;
    use crate::meals::repo::{add_entry, entries_by_type, MealType};
    use time::macros::datetime;

    async fn seed_product(db: &SqlitePool, name: &str) -> i64 {
        insert_if_absent(
            db,
            &Product {
                id: None,
                name: name.to_string(),
                calories: 100.0,
                protein: 10.0,
                fat: 5.0,
                carbs: 20.0,
                brand: None,
                barcode: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn rollover_archives_old_entries_and_keeps_todays() {
        let db = test_pool().await;
        let archiver = Archiver::new(db.clone(), 0);
        let user = Uuid::new_v4();
        let product_id = seed_product(&db, "Гречка").await;

        let now = datetime!(2024-05-02 08:00:00 UTC);
        let yesterday = datetime!(2024-05-01 19:30:00 UTC);
        let two_minutes_ago = datetime!(2024-05-02 07:58:00 UTC);

        for meal_type in [MealType::Breakfast, MealType::Lunch, MealType::Dinner] {
            add_entry(&db, &user, product_id, meal_type, 100, 100.0, 10.0, 5.0, 20.0,
                unix_millis(yesterday))
                .await
                .unwrap();
        }
        add_entry(&db, &user, product_id, MealType::Snack, 50, 50.0, 5.0, 2.5, 10.0,
            unix_millis(two_minutes_ago))
            .await
            .unwrap();

        let mut events = archiver.subscribe();
        let outcome = archiver.check(user, now).await.unwrap();
        assert_eq!(outcome, RolloverOutcome::Completed { archived: 3 });

        let remaining = entries_by_type(&db, &user, MealType::Snack, 0).await.unwrap();
        assert_eq!(remaining.len(), 1, "today's entry stays in the live log");

        let archived = repo::archive_page(&db, &user, 10, 0).await.unwrap();
        assert_eq!(archived.len(), 3);
        // тип приёма пищи и исходное время сохраняются как есть
        let mut meal_types: Vec<MealType> = archived.iter().map(|a| a.meal_type).collect();
        meal_types.sort_by_key(|m| m.as_str());
        assert_eq!(meal_types, [MealType::Breakfast, MealType::Dinner, MealType::Lunch]);
        assert!(archived.iter().all(|a| a.logged_at == unix_millis(yesterday)));

        assert_eq!(
            repo::checkpoint(&db, &user).await.unwrap().as_deref(),
            Some("2024-05-02")
        );

        let event = events.try_recv().unwrap();
        assert_eq!(event.user_id, user);
        assert_eq!(event.archived, 3);
    }

    #[tokio::test]
    async fn second_check_on_the_same_day_is_a_no_op() {
        let db = test_pool().await;
        let archiver = Archiver::new(db.clone(), 0);
        let user = Uuid::new_v4();
        let product_id = seed_product(&db, "Рис").await;

        let now = datetime!(2024-05-02 08:00:00 UTC);
        add_entry(&db, &user, product_id, MealType::Lunch, 100, 130.0, 2.7, 0.3, 28.0,
            unix_millis(datetime!(2024-05-01 12:00:00 UTC)))
            .await
            .unwrap();

        assert_eq!(
            archiver.check(user, now).await.unwrap(),
            RolloverOutcome::Completed { archived: 1 }
        );
        assert_eq!(archiver.check(user, now).await.unwrap(), RolloverOutcome::Current);

        let archived = repo::archive_page(&db, &user, 10, 0).await.unwrap();
        assert_eq!(archived.len(), 1, "no duplicate archive rows");
    }

    #[tokio::test]
    async fn empty_log_rollover_still_advances_the_checkpoint() {
        let db = test_pool().await;
        let archiver = Archiver::new(db.clone(), 0);
        let user = Uuid::new_v4();

        let outcome = archiver
            .check(user, datetime!(2024-05-02 08:00:00 UTC))
            .await
            .unwrap();
        assert_eq!(outcome, RolloverOutcome::Completed { archived: 0 });
        assert_eq!(
            repo::checkpoint(&db, &user).await.unwrap().as_deref(),
            Some("2024-05-02")
        );
    }

    #[tokio::test]
    async fn concurrent_trigger_for_the_same_user_is_coalesced() {
        let db = test_pool().await;
        let archiver = Archiver::new(db.clone(), 0);
        let user = Uuid::new_v4();

        let _guard = InFlightGuard::acquire(&archiver.in_flight, user).unwrap();
        let outcome = archiver
            .check(user, datetime!(2024-05-02 00:02:00 UTC))
            .await
            .unwrap();
        assert_eq!(outcome, RolloverOutcome::AlreadyRunning);
    }

    #[tokio::test]
    async fn local_offset_decides_where_the_day_boundary_falls() {
        let db = test_pool().await;
        // UTC+3: в 22:30 UTC по местному уже следующий день
        let archiver = Archiver::new(db.clone(), 3);
        let now = datetime!(2024-05-01 22:30:00 UTC);
        assert_eq!(format_date(archiver.local_today(now)), "2024-05-02");
        assert_eq!(
            archiver.start_of_today_ms(now),
            unix_millis(datetime!(2024-05-01 21:00:00 UTC))
        );
    }

    #[test]
    fn maintenance_window_is_just_past_midnight() {
        assert!(in_maintenance_window(datetime!(2024-05-02 00:01:00 UTC)));
        assert!(in_maintenance_window(datetime!(2024-05-02 00:05:59 UTC)));
        assert!(!in_maintenance_window(datetime!(2024-05-02 00:00:30 UTC)));
        assert!(!in_maintenance_window(datetime!(2024-05-02 00:06:00 UTC)));
        assert!(!in_maintenance_window(datetime!(2024-05-02 13:03:00 UTC)));
    }
}
