//! Time Record Store
//!
//! Adding, updating and summarising the minutes logged by participants.
//! This wraps the `times` table, hiding the fact that each row holds up to
//! four (date, minutes) entries:
//!
//! - a write for an already-recorded date updates that slot in place
//! - a write for a new date fills the first free slot of any existing
//!   group, scanning each group's slots in their fixed order
//! - when no group has room, a fresh group is created and tagged with the
//!   participant's current branch
//!
//! Groups and slots are never deleted, and a date never appears in two
//! slots for the same participant. There is no locking around the
//! read-modify-write in [`TimeStore::set`]: concurrent writes for the same
//! date are last-write-wins, and a no-free-slot race can allocate one
//! group more than strictly needed.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::warn;

use crate::database::{Database, SLOTS_PER_GROUP, Slot};

pub type Result<T> = crate::database::Result<T>;

// One statement per slot position, so slot access stays static SQL instead
// of interpolated column names.
const UPDATE_SLOT_MINUTES: [&str; SLOTS_PER_GROUP] = [
    "UPDATE times SET num_minutes_1 = ? WHERE id = ?",
    "UPDATE times SET num_minutes_2 = ? WHERE id = ?",
    "UPDATE times SET num_minutes_3 = ? WHERE id = ?",
    "UPDATE times SET num_minutes_4 = ? WHERE id = ?",
];

const FILL_SLOT: [&str; SLOTS_PER_GROUP] = [
    "UPDATE times SET date_1 = ?, num_minutes_1 = ? WHERE id = ?",
    "UPDATE times SET date_2 = ?, num_minutes_2 = ? WHERE id = ?",
    "UPDATE times SET date_3 = ?, num_minutes_3 = ? WHERE id = ?",
    "UPDATE times SET date_4 = ?, num_minutes_4 = ? WHERE id = ?",
];

const SUM_ALL_SLOTS: &str = "COALESCE(num_minutes_1, 0) + COALESCE(num_minutes_2, 0) \
     + COALESCE(num_minutes_3, 0) + COALESCE(num_minutes_4, 0)";

/// Total minutes for one participant, used for the per-participant charts.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantTotal {
    pub participant: String,
    pub total: i64,
}

#[derive(Clone)]
pub struct TimeStore {
    db: Database,
}

impl TimeStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Set the number of minutes recorded by the given participant on the
    /// given date (`YYYY-MM-DD`).
    ///
    /// If the participant does not resolve to exactly one owning user and
    /// branch, the write is logged and dropped rather than failing the
    /// request.
    pub async fn set(&self, participant_id: i64, date: &str, num_minutes: i64) -> Result<()> {
        // The branch id is stored into the times row to speed up
        // branch-level aggregation. It is resolved from the participant's
        // current user/branch and fixed for the lifetime of the group.
        let branch_id = match self.db.participant_branch(participant_id).await? {
            Some(branch_id) => branch_id,
            None => {
                warn!(participant_id, "Unknown participant, dropping time entry");
                return Ok(());
            }
        };

        let groups = self.db.times_for_participant(participant_id).await?;

        // An existing entry for this date is updated in place. Writing the
        // same value again is a no-op either way.
        for group in &groups {
            for (n, slot) in group.slots().iter().enumerate() {
                if slot.date == Some(date) {
                    if slot.num_minutes != Some(num_minutes) {
                        sqlx::query(UPDATE_SLOT_MINUTES[n])
                            .bind(num_minutes)
                            .bind(group.id())
                            .execute(self.db.pool())
                            .await?;
                    }
                    return Ok(());
                }
            }
        }

        // New date: take the first free slot of any existing group. The
        // group keeps the branch id it was created with.
        for group in &groups {
            for (n, slot) in group.slots().iter().enumerate() {
                if slot.date.is_none() {
                    sqlx::query(FILL_SLOT[n])
                        .bind(date)
                        .bind(num_minutes)
                        .bind(group.id())
                        .execute(self.db.pool())
                        .await?;
                    return Ok(());
                }
            }
        }

        // No group has spare room: create a new one.
        sqlx::query(
            r#"
            INSERT INTO times (participant_id, branch_id, date_1, num_minutes_1)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(participant_id)
        .bind(branch_id)
        .bind(date)
        .bind(num_minutes)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Minutes recorded by the participant on the given date, or 0 when
    /// nothing has been logged.
    pub async fn get(&self, participant_id: i64, date: &str) -> Result<i64> {
        let groups = self.db.times_for_participant(participant_id).await?;

        for group in &groups {
            for slot in group.slots() {
                if slot.date == Some(date) {
                    return Ok(slot.num_minutes.unwrap_or(0));
                }
            }
        }

        Ok(0)
    }

    /// Minutes recorded on each date in the inclusive range
    /// `[start, end]`, keyed by `YYYY-MM-DD`. Dates with no recorded slot
    /// produce no entry.
    pub async fn get_range(
        &self,
        participant_id: i64,
        start: &str,
        end: &str,
    ) -> Result<BTreeMap<String, i64>> {
        let groups = self.db.times_for_participant(participant_id).await?;

        let mut times = BTreeMap::new();
        for group in &groups {
            for slot in group.slots() {
                if let Slot {
                    date: Some(date),
                    num_minutes: Some(num_minutes),
                } = slot
                {
                    if date >= start && date <= end {
                        times.insert(date.to_string(), num_minutes);
                    }
                }
            }
        }

        Ok(times)
    }

    /// Total minutes per participant owned by the given user, in
    /// alphabetical participant order.
    pub async fn calc_participant_totals(&self, user_id: i64) -> Result<Vec<ParticipantTotal>> {
        let participants = self.db.participants_for_user(user_id).await?;

        let mut totals = Vec::with_capacity(participants.len());
        for participant in participants {
            let total: i64 = sqlx::query_scalar(&format!(
                "SELECT COALESCE(SUM({SUM_ALL_SLOTS}), 0) FROM times WHERE participant_id = ?"
            ))
            .bind(participant.id)
            .fetch_one(self.db.pool())
            .await?;

            totals.push(ParticipantTotal {
                participant: participant.name,
                total,
            });
        }

        Ok(totals)
    }

    /// Total minutes per branch id, across every slot group tagged with
    /// that branch. Branches with no recorded time map to 0.
    pub async fn calc_branch_totals(&self) -> Result<HashMap<i64, i64>> {
        let mut totals: HashMap<i64, i64> = self
            .db
            .branches()
            .await?
            .into_iter()
            .map(|branch| (branch.id, 0))
            .collect();

        let sums: Vec<(i64, i64)> = sqlx::query_as(&format!(
            "SELECT branch_id, SUM({SUM_ALL_SLOTS}) FROM times GROUP BY branch_id"
        ))
        .fetch_all(self.db.pool())
        .await?;

        for (branch_id, total) in sums {
            totals.insert(branch_id, total);
        }

        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (Database, TimeStore, i64) {
        let db = Database::in_memory().await.unwrap();
        let branch_id = db.create_branch("Northern").await.unwrap();
        let user_id = db
            .create_user("Alice", branch_id, "alice", "secret")
            .await
            .unwrap();
        let participants = db.participants_for_user(user_id).await.unwrap();
        let participant_id = participants[0].id;
        (db.clone(), TimeStore::new(db), participant_id)
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (_db, store, participant) = setup().await;

        store.set(participant, "2024-03-07", 45).await.unwrap();
        assert_eq!(store.get(participant, "2024-03-07").await.unwrap(), 45);
    }

    #[tokio::test]
    async fn test_get_unrecorded_date_is_zero() {
        let (_db, store, participant) = setup().await;
        assert_eq!(store.get(participant, "2024-03-07").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_updates_in_place() {
        let (db, store, participant) = setup().await;

        store.set(participant, "2024-03-07", 30).await.unwrap();
        store.set(participant, "2024-03-07", 90).await.unwrap();

        assert_eq!(store.get(participant, "2024-03-07").await.unwrap(), 90);
        assert_eq!(db.times_group_count(participant).await.unwrap(), 1);

        // Writing the same value again changes nothing either.
        store.set(participant, "2024-03-07", 90).await.unwrap();
        assert_eq!(db.times_group_count(participant).await.unwrap(), 1);
        assert_eq!(store.get(participant, "2024-03-07").await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_unknown_participant_is_dropped() {
        let (db, store, _participant) = setup().await;

        store.set(9999, "2024-03-07", 45).await.unwrap();
        assert_eq!(db.times_group_count(9999).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fifth_date_spills_into_new_group() {
        let (db, store, participant) = setup().await;

        let dates = [
            "2024-03-01",
            "2024-03-02",
            "2024-03-03",
            "2024-03-04",
            "2024-03-05",
        ];
        for (i, date) in dates.iter().enumerate() {
            store.set(participant, date, 10 * (i as i64 + 1)).await.unwrap();
        }

        assert_eq!(db.times_group_count(participant).await.unwrap(), 2);

        let times = store
            .get_range(participant, "2024-03-01", "2024-03-31")
            .await
            .unwrap();
        assert_eq!(times.len(), 5);
        for (i, date) in dates.iter().enumerate() {
            assert_eq!(times.get(*date), Some(&(10 * (i as i64 + 1))));
        }
    }

    #[tokio::test]
    async fn test_range_bounds_are_inclusive() {
        let (_db, store, participant) = setup().await;

        store.set(participant, "2024-02-29", 10).await.unwrap();
        store.set(participant, "2024-03-01", 20).await.unwrap();
        store.set(participant, "2024-03-31", 30).await.unwrap();
        store.set(participant, "2024-04-01", 40).await.unwrap();

        let times = store
            .get_range(participant, "2024-03-01", "2024-03-31")
            .await
            .unwrap();
        assert_eq!(times.len(), 2);
        assert_eq!(times.get("2024-03-01"), Some(&20));
        assert_eq!(times.get("2024-03-31"), Some(&30));
    }

    #[tokio::test]
    async fn test_participant_totals_alphabetical() {
        let (db, store, own_participant) = setup().await;
        let user_id = db.participant(own_participant).await.unwrap().user_id;

        let zoe = db.create_participant(user_id, "Zoe").await.unwrap();
        let ben = db.create_participant(user_id, "Ben").await.unwrap();

        store.set(zoe, "2024-03-01", 100).await.unwrap();
        store.set(zoe, "2024-03-02", 50).await.unwrap();
        store.set(ben, "2024-03-01", 25).await.unwrap();

        let totals = store.calc_participant_totals(user_id).await.unwrap();
        let summary: Vec<(&str, i64)> = totals
            .iter()
            .map(|t| (t.participant.as_str(), t.total))
            .collect();
        assert_eq!(summary, vec![("Alice", 0), ("Ben", 25), ("Zoe", 150)]);
    }

    #[tokio::test]
    async fn test_branch_totals_match_participant_totals() {
        let (db, store, alice_participant) = setup().await;
        let alice = db.participant(alice_participant).await.unwrap().user_id;

        let southern = db.create_branch("Southern").await.unwrap();
        let bob = db
            .create_user("Bob", southern, "bob", "secret")
            .await
            .unwrap();
        let bob_participant = db.participants_for_user(bob).await.unwrap()[0].id;

        store.set(alice_participant, "2024-03-01", 60).await.unwrap();
        store.set(alice_participant, "2024-03-02", 30).await.unwrap();
        store.set(bob_participant, "2024-03-01", 45).await.unwrap();

        let branch_totals = store.calc_branch_totals().await.unwrap();
        let northern = db.user_branch(alice).await.unwrap().id;

        let alice_sum: i64 = store
            .calc_participant_totals(alice)
            .await
            .unwrap()
            .iter()
            .map(|t| t.total)
            .sum();

        assert_eq!(branch_totals.get(&northern), Some(&alice_sum));
        assert_eq!(branch_totals.get(&southern), Some(&45));
    }

    #[tokio::test]
    async fn test_branch_with_no_data_totals_zero() {
        let (db, store, _participant) = setup().await;
        let empty = db.create_branch("Empty").await.unwrap();

        let totals = store.calc_branch_totals().await.unwrap();
        assert_eq!(totals.get(&empty), Some(&0));
    }

    #[tokio::test]
    async fn test_group_branch_fixed_at_creation() {
        let (db, store, participant) = setup().await;
        let user_id = db.participant(participant).await.unwrap().user_id;
        let old_branch = db.user_branch(user_id).await.unwrap().id;

        // Fill the first group while in the original branch.
        for date in ["2024-03-01", "2024-03-02", "2024-03-03", "2024-03-04"] {
            store.set(participant, date, 10).await.unwrap();
        }

        // Move the user, then force a new group.
        let new_branch = db.create_branch("Southern").await.unwrap();
        sqlx::query("UPDATE users SET branch_id = ? WHERE id = ?")
            .bind(new_branch)
            .bind(user_id)
            .execute(db.pool())
            .await
            .unwrap();
        store.set(participant, "2024-03-05", 100).await.unwrap();

        // The old group keeps its original tag; only the new group carries
        // the new branch.
        let totals = store.calc_branch_totals().await.unwrap();
        assert_eq!(totals.get(&old_branch), Some(&40));
        assert_eq!(totals.get(&new_branch), Some(&100));
    }
}
