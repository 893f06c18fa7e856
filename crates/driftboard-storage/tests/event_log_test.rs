// DB-backed event log properties
// Run with: DATABASE_URL=postgres://... cargo test --test event_log_test -- --ignored

use driftboard_core::EventBody;
use driftboard_storage::{event_log, Database};
use uuid::Uuid;

async fn connect() -> Database {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for this test");
    let db = Database::from_url(&url).await.expect("connect");
    db.migrate().await.expect("migrate");
    db
}

/// Insert a user and a board owned by them, returning (board_id, user_id)
async fn seed_board(db: &Database) -> (Uuid, Uuid) {
    let user_id = Uuid::now_v7();
    let board_id = Uuid::now_v7();

    sqlx::query("INSERT INTO users (id, email, name) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(format!("{user_id}@test.local"))
        .bind("tester")
        .execute(db.pool())
        .await
        .expect("insert user");

    sqlx::query("INSERT INTO boards (id, name, owner_id) VALUES ($1, 'seq test', $2)")
        .bind(board_id)
        .bind(user_id)
        .execute(db.pool())
        .await
        .expect("insert board");

    sqlx::query(
        "INSERT INTO board_members (id, board_id, user_id, role) VALUES ($1, $2, $3, 'owner')",
    )
    .bind(Uuid::now_v7())
    .bind(board_id)
    .bind(user_id)
    .execute(db.pool())
    .await
    .expect("insert member");

    (board_id, user_id)
}

#[tokio::test]
#[ignore]
async fn test_concurrent_appends_produce_gapless_sequences() {
    let db = connect().await;
    let (board_id, user_id) = seed_board(&db).await;

    const N: usize = 32;
    let handles: Vec<_> = (0..N)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move {
                let mut tx = db.pool().begin().await.expect("begin");
                let appended = event_log::append(
                    &mut tx,
                    board_id,
                    &EventBody::TaskCreated {
                        task_id: Uuid::now_v7(),
                    },
                    user_id,
                )
                .await
                .expect("append");
                tx.commit().await.expect("commit");
                appended.seq
            })
        })
        .collect();

    let mut seqs = Vec::with_capacity(N);
    for handle in handles {
        seqs.push(handle.await.expect("task"));
    }
    seqs.sort_unstable();

    // No duplicates, no gaps, regardless of arrival order
    assert_eq!(seqs, (1..=N as i64).collect::<Vec<_>>());
}

#[tokio::test]
#[ignore]
async fn test_get_events_returns_only_after_seq_ascending() {
    let db = connect().await;
    let (board_id, user_id) = seed_board(&db).await;

    for _ in 0..10 {
        let mut tx = db.pool().begin().await.expect("begin");
        event_log::append(
            &mut tx,
            board_id,
            &EventBody::TaskCreated {
                task_id: Uuid::now_v7(),
            },
            user_id,
        )
        .await
        .expect("append");
        tx.commit().await.expect("commit");
    }

    let events = event_log::get_events(db.pool(), board_id, 4, 3)
        .await
        .expect("get_events");

    assert_eq!(events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![5, 6, 7]);
    assert!(events.iter().all(|e| e.author.is_some()));

    let tail = event_log::get_events(db.pool(), board_id, 10, 50)
        .await
        .expect("get_events");
    assert!(tail.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_aborted_transaction_leaves_no_event() {
    let db = connect().await;
    let (board_id, user_id) = seed_board(&db).await;

    let mut tx = db.pool().begin().await.expect("begin");
    event_log::append(
        &mut tx,
        board_id,
        &EventBody::TaskCreated {
            task_id: Uuid::now_v7(),
        },
        user_id,
    )
    .await
    .expect("append");
    tx.rollback().await.expect("rollback");

    let events = event_log::get_events(db.pool(), board_id, 0, 50)
        .await
        .expect("get_events");
    assert!(events.is_empty());
}
