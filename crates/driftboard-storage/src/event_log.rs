// Event log & sequencer.
//
// Every mutation records itself here, in the same transaction as the domain
// write it describes. Per-board ordering comes from a Postgres transaction-
// scoped advisory lock keyed by a stable hash of the board id: concurrent
// writers to one board serialize, unrelated boards proceed in parallel, and
// the lock releases with the transaction. A key collision between two boards
// costs extra serialization, never incorrect ordering.

use anyhow::Result;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use driftboard_core::{constants::MAX_EVENTS_LIMIT, types::UserSummary, BoardEvent, EventBody};

use crate::models::{AppendedEvent, BoardEventRow, BoardEventWithAuthorRow};

/// Derive the advisory lock key for a board: a stable 31-multiply hash of
/// the hyphenated uuid, folded to a non-negative value.
pub fn board_lock_key(board_id: Uuid) -> i64 {
    let mut h: i32 = 0;
    for byte in board_id.hyphenated().to_string().bytes() {
        h = h.wrapping_mul(31).wrapping_add(byte as i32);
    }
    i64::from(h).abs()
}

/// Append an event inside the caller's transaction.
///
/// Acquires the board's advisory lock, then inserts at `MAX(seq) + 1` (or 1
/// for an empty log). Both the domain write and the event commit or abort
/// together; a stuck lock surfaces as a retryable store error via
/// `lock_timeout` rather than hanging the request.
pub async fn append(
    tx: &mut Transaction<'_, Postgres>,
    board_id: Uuid,
    body: &EventBody,
    user_id: Uuid,
) -> Result<AppendedEvent> {
    sqlx::query("SET LOCAL lock_timeout = '5s'")
        .execute(&mut **tx)
        .await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(board_lock_key(board_id))
        .execute(&mut **tx)
        .await?;

    let (event_type, payload) = body.to_parts();
    let appended = sqlx::query_as::<_, AppendedEvent>(
        r#"
        INSERT INTO board_events (id, board_id, seq, type, payload, user_id)
        VALUES ($1, $2, COALESCE((SELECT MAX(seq) + 1 FROM board_events WHERE board_id = $2), 1), $3, $4, $5)
        RETURNING id, seq
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(board_id)
    .bind(event_type)
    .bind(&payload)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(appended)
}

/// Events with `seq > after_seq`, ascending, author-enriched, capped at
/// [`MAX_EVENTS_LIMIT`]. Used by clients to catch up after a reconnect.
pub async fn get_events(
    pool: &PgPool,
    board_id: Uuid,
    after_seq: i64,
    limit: i64,
) -> Result<Vec<BoardEvent>> {
    let limit = limit.clamp(1, MAX_EVENTS_LIMIT);
    let rows = sqlx::query_as::<_, BoardEventWithAuthorRow>(
        r#"
        SELECT e.id, e.board_id, e.seq, e.type AS event_type, e.payload, e.user_id, e.created_at,
               u.name AS author_name, u.avatar_url AS author_avatar_url
        FROM board_events e
        JOIN users u ON u.id = e.user_id
        WHERE e.board_id = $1 AND e.seq > $2
        ORDER BY e.seq ASC
        LIMIT $3
        "#,
    )
    .bind(board_id)
    .bind(after_seq)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_event).collect())
}

/// Point lookup by event id, used by undo/redo
pub async fn get_event_by_id(pool: &PgPool, event_id: Uuid) -> Result<Option<BoardEventRow>> {
    let row = sqlx::query_as::<_, BoardEventRow>(
        r#"
        SELECT id, board_id, seq, type AS event_type, payload, user_id, created_at
        FROM board_events
        WHERE id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

fn row_to_event(row: BoardEventWithAuthorRow) -> BoardEvent {
    BoardEvent {
        id: row.id,
        board_id: row.board_id,
        seq: row.seq,
        event_type: row.event_type,
        payload: row.payload,
        user_id: row.user_id,
        author: Some(UserSummary {
            id: row.user_id,
            name: row.author_name,
            avatar_url: row.author_avatar_url,
        }),
        created_at: row.created_at,
    }
}
