//! End-to-end flow over the public service API: sign up users across
//! branches, log a month of practice times, then check the charts and the
//! calendar view line up with what was entered.

use challenge_service::{ChartCalc, Config, Database, MonthViewBuilder, TimeStore};
use timecore::DateValue;

const NATIONAL_GOAL: i64 = 1000;

async fn build_world() -> (Database, TimeStore, ChartCalc) {
    let db = Database::in_memory().await.unwrap();
    let store = TimeStore::new(db.clone());
    let charts = ChartCalc::new(db.clone(), store.clone(), NATIONAL_GOAL);
    (db, store, charts)
}

#[tokio::test]
async fn test_full_challenge_flow() {
    let (db, store, charts) = build_world().await;

    let northern = db.create_branch("Northern").await.unwrap();
    let wellington = db.create_branch("Wellington").await.unwrap();

    // Alice signs up in Northern and adds a second participant.
    let alice = db
        .create_user("Alice", northern, "alice", "secret")
        .await
        .unwrap();
    let alice_participant = db.participants_for_user(alice).await.unwrap()[0].id;
    let ben = db.create_participant(alice, "Ben").await.unwrap();

    // Bob signs up in Wellington.
    let bob = db
        .create_user("Bob", wellington, "bob", "secret")
        .await
        .unwrap();
    let bob_participant = db.participants_for_user(bob).await.unwrap()[0].id;

    // Alice logs a week of practice, spilling over one slot group, and
    // corrects one entry afterwards.
    for day in 1..=6 {
        let date = DateValue::new(2024, 3, day).to_string();
        store.set(alice_participant, &date, 30).await.unwrap();
    }
    store.set(alice_participant, "2024-03-02", 60).await.unwrap();

    store.set(ben, "2024-03-01", 45).await.unwrap();
    store.set(bob_participant, "2024-03-01", 120).await.unwrap();

    // Six distinct dates means two slot groups, and the correction did
    // not add a third.
    assert_eq!(db.times_group_count(alice_participant).await.unwrap(), 2);

    // 5 * 30 + 60 for Alice herself.
    let totals = store.calc_participant_totals(alice).await.unwrap();
    assert_eq!(totals[0].participant, "Alice");
    assert_eq!(totals[0].total, 210);
    assert_eq!(totals[1].participant, "Ben");
    assert_eq!(totals[1].total, 45);

    let branch_totals = store.calc_branch_totals().await.unwrap();
    assert_eq!(branch_totals.get(&northern), Some(&255));
    assert_eq!(branch_totals.get(&wellington), Some(&120));

    // Charts: 3 participants total, so each carries a third of the goal.
    let alice_charts = charts.build_charts_for_user(alice).await.unwrap();
    assert_eq!(alice_charts.len(), 4); // Alice, Ben, branch, national
    assert_eq!(alice_charts[0].max, NATIONAL_GOAL / 3);
    assert_eq!(alice_charts[2].title, "Northern Branch");
    assert_eq!(alice_charts[2].value, 255);
    assert_eq!(alice_charts[2].max, NATIONAL_GOAL * 2 / 3);
    assert_eq!(alice_charts[3].value, 375);
    assert_eq!(alice_charts[3].max, NATIONAL_GOAL);

    let summary = charts.build_summary_charts().await.unwrap();
    assert_eq!(summary.len(), 3);
    assert_eq!(summary[0].title, "Northern");
    assert_eq!(summary[1].title, "Wellington");
    assert_eq!(summary[2].title, "National Goal");

    // The March calendar shows the corrected entry in H:MM form.
    let config = Config {
        start_date: DateValue::parse("2024-03-01"),
        end_date: DateValue::parse("2024-12-31"),
        ..Config::default()
    };
    let months = MonthViewBuilder::new(store.clone(), &config);

    let view = months.build(2024, 3, alice_participant).await.unwrap();
    assert_eq!(view.date_label, "March 2024");
    assert!(!view.can_go_previous);
    assert!(view.can_go_next);

    let second = view
        .weeks
        .iter()
        .flatten()
        .find(|cell| cell.is_cur_month && cell.day == 2)
        .unwrap();
    assert_eq!(second.num_minutes.as_deref(), Some("1:00"));

    let unlogged = view
        .weeks
        .iter()
        .flatten()
        .find(|cell| cell.is_cur_month && cell.day == 20)
        .unwrap();
    assert_eq!(unlogged.num_minutes, None);
}

#[tokio::test]
async fn test_requesting_month_before_start_clamps_forward() {
    let (db, store, _charts) = build_world().await;

    let branch = db.create_branch("Northern").await.unwrap();
    let user = db
        .create_user("Alice", branch, "alice", "secret")
        .await
        .unwrap();
    let participant = db.participants_for_user(user).await.unwrap()[0].id;

    let config = Config {
        start_date: DateValue::parse("2024-03-01"),
        ..Config::default()
    };
    let months = MonthViewBuilder::new(store, &config);

    let view = months.build(2024, 1, participant).await.unwrap();
    assert_eq!(view.current.year, 2024);
    assert_eq!(view.current.month, 3);
}
