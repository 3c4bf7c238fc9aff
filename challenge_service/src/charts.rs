//! Chart Calculation
//!
//! Computes the underlying data for the progress gauges: one chart per
//! participant, per branch, and for the challenge as a whole. Goals are
//! apportioned from the configured national goal by headcount, using
//! truncating division.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::database::Database;
use crate::timestore::TimeStore;

pub type Result<T> = crate::database::Result<T>;

/// Data behind one gauge: current minutes against a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chart {
    pub title: String,
    pub value: i64,
    pub max: i64,
}

#[derive(Clone)]
pub struct ChartCalc {
    db: Database,
    store: TimeStore,
    national_goal: i64,
}

impl ChartCalc {
    pub fn new(db: Database, store: TimeStore, national_goal: i64) -> Self {
        Self {
            db,
            store,
            national_goal,
        }
    }

    /// Number of participants per branch, keyed by branch name. A
    /// participant counts toward the branch of its owning user.
    pub async fn calc_num_participants_per_branch(&self) -> Result<HashMap<String, i64>> {
        let branch_names: HashMap<i64, String> = self
            .db
            .branches()
            .await?
            .into_iter()
            .map(|branch| (branch.id, branch.name))
            .collect();

        let counts: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT users.branch_id, COUNT(participants.id)
            FROM participants, users
            WHERE participants.user_id = users.id
            GROUP BY users.branch_id
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        let mut totals = HashMap::new();
        for (branch_id, count) in counts {
            if let Some(name) = branch_names.get(&branch_id) {
                totals.insert(name.clone(), count);
            }
        }

        Ok(totals)
    }

    /// Charts for a signed-in user: one per owned participant, one for the
    /// user's branch, and one for the national goal.
    ///
    /// An unknown user id yields an empty list rather than an error.
    pub async fn build_charts_for_user(&self, user_id: i64) -> Result<Vec<Chart>> {
        let branch = match self.db.user_branch(user_id).await {
            Ok(branch) => branch,
            Err(crate::database::DatabaseError::NotFound(_)) => {
                warn!(user_id, "Invalid user id, no charts to build");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let participants_per_branch = self.calc_num_participants_per_branch().await?;
        let participant_totals = self.store.calc_participant_totals(user_id).await?;
        let branch_totals = self.store.calc_branch_totals().await?;

        let total_participants: i64 = participants_per_branch.values().sum();
        let grand_total: i64 = branch_totals.values().sum();

        // Each participant carries an equal share of the national goal;
        // a branch carries one share per participant. Truncating division
        // throughout, and a challenge with no participants has goals of 0.
        let participant_goal = if total_participants == 0 {
            0
        } else {
            self.national_goal / total_participants
        };

        let participants_in_branch = participants_per_branch
            .get(&branch.name)
            .copied()
            .unwrap_or(0);
        let branch_goal = if total_participants == 0 {
            0
        } else {
            self.national_goal * participants_in_branch / total_participants
        };

        let mut charts = Vec::with_capacity(participant_totals.len() + 2);

        for totals in participant_totals {
            charts.push(Chart {
                title: totals.participant,
                value: totals.total,
                max: participant_goal,
            });
        }

        charts.push(Chart {
            title: format!("{} Branch", branch.name),
            value: branch_totals.get(&branch.id).copied().unwrap_or(0),
            max: branch_goal,
        });

        charts.push(Chart {
            title: "National Goal".to_string(),
            value: grand_total,
            max: self.national_goal,
        });

        Ok(charts)
    }

    /// Charts for the signed-out summary view: one per branch plus the
    /// national gauge, no participant-level detail.
    pub async fn build_summary_charts(&self) -> Result<Vec<Chart>> {
        let branches = self.db.branches().await?;
        let participants_per_branch = self.calc_num_participants_per_branch().await?;
        let branch_totals = self.store.calc_branch_totals().await?;

        let total_participants: i64 = participants_per_branch.values().sum();
        let grand_total: i64 = branch_totals.values().sum();

        let mut charts = Vec::with_capacity(branches.len() + 1);

        for branch in branches {
            let participants_in_branch = participants_per_branch
                .get(&branch.name)
                .copied()
                .unwrap_or(0);
            let goal = if total_participants == 0 {
                0
            } else {
                self.national_goal * participants_in_branch / total_participants
            };

            charts.push(Chart {
                title: branch.name,
                value: branch_totals.get(&branch.id).copied().unwrap_or(0),
                max: goal,
            });
        }

        charts.push(Chart {
            title: "National Goal".to_string(),
            value: grand_total,
            max: self.national_goal,
        });

        Ok(charts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NATIONAL_GOAL: i64 = 1000;

    /// Two branches: Northern with 3 participants (Alice + two extras),
    /// Southern with 7 spread over two users.
    async fn setup() -> (Database, ChartCalc, i64, i64) {
        let db = Database::in_memory().await.unwrap();
        let store = TimeStore::new(db.clone());
        let calc = ChartCalc::new(db.clone(), store, NATIONAL_GOAL);

        let northern = db.create_branch("Northern").await.unwrap();
        let southern = db.create_branch("Southern").await.unwrap();

        let alice = db
            .create_user("Alice", northern, "alice", "secret")
            .await
            .unwrap();
        db.create_participant(alice, "Alice Jr").await.unwrap();
        db.create_participant(alice, "Ben").await.unwrap();

        let bob = db
            .create_user("Bob", southern, "bob", "secret")
            .await
            .unwrap();
        let carol = db
            .create_user("Carol", southern, "carol", "secret")
            .await
            .unwrap();
        for name in ["B1", "B2", "B3"] {
            db.create_participant(bob, name).await.unwrap();
        }
        for name in ["C1", "C2"] {
            db.create_participant(carol, name).await.unwrap();
        }

        (db, calc, alice, bob)
    }

    #[tokio::test]
    async fn test_participants_per_branch() {
        let (_db, calc, _alice, _bob) = setup().await;

        let counts = calc.calc_num_participants_per_branch().await.unwrap();
        assert_eq!(counts.get("Northern"), Some(&3));
        assert_eq!(counts.get("Southern"), Some(&7));
    }

    #[tokio::test]
    async fn test_goal_apportionment() {
        // nationalGoal=1000 over 10 participants: participant goal 100,
        // Northern (3 participants) goal 300.
        let (db, calc, alice, _bob) = setup().await;

        let alice_participant = db.participants_for_user(alice).await.unwrap()[0].id;
        TimeStore::new(db.clone())
            .set(alice_participant, "2024-03-01", 60)
            .await
            .unwrap();

        let charts = calc.build_charts_for_user(alice).await.unwrap();
        // Alice, Alice Jr, Ben, branch, national.
        assert_eq!(charts.len(), 5);

        for participant_chart in &charts[..3] {
            assert_eq!(participant_chart.max, 100);
        }
        assert_eq!(charts[0].title, "Alice");
        assert_eq!(charts[0].value, 60);

        let branch_chart = &charts[3];
        assert_eq!(branch_chart.title, "Northern Branch");
        assert_eq!(branch_chart.value, 60);
        assert_eq!(branch_chart.max, 300);

        let national = &charts[4];
        assert_eq!(national.title, "National Goal");
        assert_eq!(national.value, 60);
        assert_eq!(national.max, NATIONAL_GOAL);
    }

    #[tokio::test]
    async fn test_unknown_user_builds_no_charts() {
        let (_db, calc, _alice, _bob) = setup().await;
        assert!(calc.build_charts_for_user(9999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_participants_means_zero_goals() {
        let db = Database::in_memory().await.unwrap();
        let store = TimeStore::new(db.clone());
        let calc = ChartCalc::new(db.clone(), store, NATIONAL_GOAL);
        db.create_branch("Northern").await.unwrap();

        let charts = calc.build_summary_charts().await.unwrap();
        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].max, 0);
        assert_eq!(charts[1].max, NATIONAL_GOAL);
    }

    #[tokio::test]
    async fn test_summary_charts_alphabetical_branches() {
        let (db, calc, _alice, bob) = setup().await;

        let bob_participant = db.participants_for_user(bob).await.unwrap()[0].id;
        TimeStore::new(db.clone())
            .set(bob_participant, "2024-03-01", 200)
            .await
            .unwrap();

        let charts = calc.build_summary_charts().await.unwrap();
        assert_eq!(charts.len(), 3);
        assert_eq!(charts[0].title, "Northern");
        assert_eq!(charts[0].value, 0);
        assert_eq!(charts[0].max, 300);
        assert_eq!(charts[1].title, "Southern");
        assert_eq!(charts[1].value, 200);
        assert_eq!(charts[1].max, 700);
        assert_eq!(charts[2].title, "National Goal");
        assert_eq!(charts[2].value, 200);
    }
}
