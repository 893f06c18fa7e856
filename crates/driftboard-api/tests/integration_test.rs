// Integration tests for the Driftboard API
// Run with: cargo test --test integration_test -- --ignored
//
// Requires a running server (DATABASE_URL pointing at a migrated database)
// and a seeded auth session; set DRIFTBOARD_TEST_TOKEN to that session's
// token.

use driftboard_core::types::{Board, BoardEvent, Comment, Task};
use driftboard_core::UndoOutcome;
use serde_json::json;

const API_BASE_URL: &str = "http://localhost:8080";

fn test_token() -> String {
    std::env::var("DRIFTBOARD_TEST_TOKEN").unwrap_or_else(|_| "test-token".to_string())
}

#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_full_board_workflow() {
    let client = reqwest::Client::new();
    let token = test_token();

    println!("🧪 Testing full board workflow...");

    // Step 1: Create a board
    println!("\n📝 Step 1: Creating board...");
    let create_board_response = client
        .post(format!("{}/v1/boards", API_BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Sprint 12",
            "description": "Two week sprint"
        }))
        .send()
        .await
        .expect("Failed to create board");

    assert_eq!(
        create_board_response.status(),
        201,
        "Expected 201 Created, got {}",
        create_board_response.status()
    );

    let board: Board = create_board_response
        .json()
        .await
        .expect("Failed to parse board response");
    println!("✅ Created board: {}", board.id);
    assert_eq!(board.name, "Sprint 12");

    // Step 2: Create a task on the board
    println!("\n📌 Step 2: Creating task...");
    let task_response = client
        .post(format!("{}/v1/boards/{}/tasks", API_BASE_URL, board.id))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Wire up login page",
            "status": "todo"
        }))
        .send()
        .await
        .expect("Failed to create task");

    assert_eq!(task_response.status(), 201);
    let task: Task = task_response.json().await.expect("Failed to parse task");
    println!("✅ Created task: {}", task.id);
    assert_eq!(task.title, "Wire up login page");

    // Step 3: Update the task
    println!("\n✏️  Step 3: Updating task...");
    let update_response = client
        .patch(format!("{}/v1/tasks/{}", API_BASE_URL, task.id))
        .bearer_auth(&token)
        .json(&json!({ "status": "in_progress" }))
        .send()
        .await
        .expect("Failed to update task");

    assert_eq!(update_response.status(), 200);
    let updated: Task = update_response.json().await.expect("Failed to parse task");
    assert_eq!(updated.status, "in_progress");
    println!("✅ Task moved to {}", updated.status);

    // Step 4: Comment on the task
    println!("\n💬 Step 4: Adding comment...");
    let comment_response = client
        .post(format!("{}/v1/tasks/{}/comments", API_BASE_URL, task.id))
        .bearer_auth(&token)
        .json(&json!({ "content": "Blocked on the design review" }))
        .send()
        .await
        .expect("Failed to add comment");

    assert_eq!(comment_response.status(), 201);
    let comment: Comment = comment_response
        .json()
        .await
        .expect("Failed to parse comment");
    println!("✅ Added comment: {}", comment.id);

    // Step 5: Replay the event log; every mutation above must be present
    // in order
    println!("\n📜 Step 5: Replaying event log...");
    let events_response = client
        .get(format!("{}/v1/boards/{}/events", API_BASE_URL, board.id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to list events");

    assert_eq!(events_response.status(), 200);
    let events: Vec<BoardEvent> = events_response
        .json()
        .await
        .expect("Failed to parse events");
    println!("✅ Replayed {} event(s)", events.len());

    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "board.created",
            "task.created",
            "task.updated",
            "comment.added"
        ]
    );
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.seq, i as i64 + 1, "log must be gapless from 1");
    }

    // Step 6: Undo the status change
    println!("\n↩️  Step 6: Undoing task update...");
    let update_event = &events[2];
    let undo_response = client
        .post(format!("{}/v1/events/undo", API_BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "event_id": update_event.id }))
        .send()
        .await
        .expect("Failed to undo");

    assert_eq!(undo_response.status(), 200);
    let outcome: UndoOutcome = undo_response.json().await.expect("Failed to parse outcome");
    assert_eq!(outcome, UndoOutcome::TaskReverted { task_id: task.id });

    let reverted: Task = client
        .get(format!("{}/v1/boards/{}/tasks", API_BASE_URL, board.id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to list tasks")
        .json::<Vec<Task>>()
        .await
        .expect("Failed to parse tasks")
        .into_iter()
        .find(|t| t.id == task.id)
        .expect("Task disappeared");
    assert_eq!(reverted.status, "todo");
    println!("✅ Task back to {}", reverted.status);

    // Step 7: Redo the undone update; every mutable field must round-trip
    println!("\n↪️  Step 7: Redoing task update...");
    let redo_response = client
        .post(format!("{}/v1/events/redo", API_BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "event_id": update_event.id }))
        .send()
        .await
        .expect("Failed to redo");

    assert_eq!(redo_response.status(), 200);
    let outcome: UndoOutcome = redo_response.json().await.expect("Failed to parse outcome");
    assert_eq!(outcome, UndoOutcome::TaskReverted { task_id: task.id });

    let redone: Task = client
        .get(format!("{}/v1/boards/{}/tasks", API_BASE_URL, board.id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to list tasks")
        .json::<Vec<Task>>()
        .await
        .expect("Failed to parse tasks")
        .into_iter()
        .find(|t| t.id == task.id)
        .expect("Task disappeared");
    assert_eq!(redone.title, updated.title);
    assert_eq!(redone.status, updated.status);
    assert_eq!(redone.assigned_to, updated.assigned_to);
    assert_eq!(redone.details, updated.details);
    println!("✅ Task back to {}", redone.status);

    // The redo appends a fresh task.updated event; its prior snapshot is
    // the state the redo found, not the one the original event recorded
    let events: Vec<BoardEvent> = client
        .get(format!("{}/v1/boards/{}/events", API_BASE_URL, board.id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to list events")
        .json()
        .await
        .expect("Failed to parse events");
    let redo_event = events.last().expect("Log is empty");
    assert_eq!(redo_event.event_type, "task.updated");
    assert_eq!(redo_event.payload["previous"]["status"], "todo");

    // Redoing a created event has nothing to replay; it must no-op
    let created_event = &events[1];
    assert_eq!(created_event.event_type, "task.created");
    let redo_created = client
        .post(format!("{}/v1/events/redo", API_BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "event_id": created_event.id }))
        .send()
        .await
        .expect("Failed to redo created event");
    assert_eq!(redo_created.status(), 404);

    // Same for the undo record itself
    let undo_log_event = events
        .iter()
        .find(|e| e.event_type == "undo")
        .expect("Missing undo event");
    let redo_undo = client
        .post(format!("{}/v1/events/redo", API_BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "event_id": undo_log_event.id }))
        .send()
        .await
        .expect("Failed to redo undo event");
    assert_eq!(redo_undo.status(), 404);
    println!("✅ Created-event and undo-event redo rejected");

    // Step 8: Delete the task and undo the deletion
    println!("\n🗑️  Step 8: Deleting task and undoing...");
    let delete_response = client
        .delete(format!("{}/v1/tasks/{}", API_BASE_URL, task.id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to delete task");
    assert_eq!(delete_response.status(), 204);

    let events: Vec<BoardEvent> = client
        .get(format!("{}/v1/boards/{}/events", API_BASE_URL, board.id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to list events")
        .json()
        .await
        .expect("Failed to parse events");
    let delete_event = events
        .iter()
        .rfind(|e| e.event_type == "task.deleted")
        .expect("Missing task.deleted event");

    let undo_delete = client
        .post(format!("{}/v1/events/undo", API_BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "event_id": delete_event.id }))
        .send()
        .await
        .expect("Failed to undo delete");
    assert_eq!(undo_delete.status(), 200);
    let outcome: UndoOutcome = undo_delete.json().await.expect("Failed to parse outcome");
    assert_eq!(outcome, UndoOutcome::TaskRestored { task_id: task.id });

    // A second undo of the same event must fail closed, not double-apply
    let second_undo = client
        .post(format!("{}/v1/events/undo", API_BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "event_id": delete_event.id }))
        .send()
        .await
        .expect("Failed to undo twice");
    assert_eq!(second_undo.status(), 404);
    println!("✅ Restore undone once, second undo rejected");

    // Step 9: Clean up
    println!("\n🧹 Step 9: Deleting board...");
    let delete_board = client
        .delete(format!("{}/v1/boards/{}", API_BASE_URL, board.id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to delete board");
    assert_eq!(delete_board.status(), 204);
    println!("✅ Done");
}

#[tokio::test]
#[ignore]
async fn test_requests_without_token_are_rejected() {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/v1/boards", API_BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);

    let response = client
        .get(format!("{}/v1/boards", API_BASE_URL))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_api_rate_limit_returns_retry_after() {
    let client = reqwest::Client::new();
    let token = test_token();

    // Burn through the per-user window; the first denial must carry a
    // retry hint
    let mut limited = None;
    for _ in 0..80 {
        let response = client
            .get(format!("{}/v1/boards", API_BASE_URL))
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to send request");
        if response.status() == 429 {
            limited = Some(response);
            break;
        }
    }

    let response = limited.expect("Rate limit never tripped within the window");
    let retry_after = response
        .headers()
        .get("retry-after")
        .expect("Missing Retry-After header")
        .to_str()
        .expect("Invalid Retry-After header")
        .parse::<u64>()
        .expect("Retry-After is not an integer");
    assert!(retry_after <= 60);
}
