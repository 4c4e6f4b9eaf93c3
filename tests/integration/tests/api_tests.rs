//! API Integration Tests
//!
//! Every test boots its own server on the in-memory store, so no external
//! services are needed.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use std::time::Duration;

use engage_core::Snowflake;
use engage_db::{ContributorRecord, PaperRecord, TicketRecord};
use integration_tests::{
    assert_error, assert_json, assert_status, batch_job, fixtures::*, vote, TestServer,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_and_readiness() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.get("/health").await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server.get("/api/v1/health/ready").await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/api/v1/leaderboard").await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "MISSING_AUTH");
}

// ============================================================================
// Targets & Reactions
// ============================================================================

#[tokio::test]
async fn test_reaction_toggle_round_trip_and_owner_notification() {
    let server = TestServer::start().await.unwrap();
    let (owner, fan) = (unique_id(), unique_id());
    let owner_token = server.token(owner, "Olive Owner");
    let fan_token = server.token(fan, "Frank Fan");
    let post = unique_id();

    let response = server
        .put_auth(
            &format!("/targets/post/{post}"),
            &owner_token,
            &RegisterTargetRequest::owned_by(owner, "north"),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    // on
    let response = server
        .post_auth("/reactions", &fan_token, &ToggleReactionRequest::like_post(post))
        .await
        .unwrap();
    let toggled: ReactionToggleResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(toggled.active);
    assert_eq!(toggled.new_count, 1);
    assert_eq!(toggled.like_count, 1);
    assert_eq!(toggled.reaction_counts["like"], 1);

    server.settle().await;
    let response = server.get_auth("/notifications", &owner_token).await.unwrap();
    let inbox: InboxResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(inbox.unread_count, 1);
    assert_eq!(inbox.notifications[0].kind, "like");
    assert!(inbox.notifications[0].message.contains("Frank Fan"));

    // off
    let response = server
        .post_auth("/reactions", &fan_token, &ToggleReactionRequest::like_post(post))
        .await
        .unwrap();
    let toggled: ReactionToggleResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(!toggled.active);
    assert_eq!(toggled.like_count, 0);

    let response = server
        .get_auth(&format!("/reactions/post/{post}"), &fan_token)
        .await
        .unwrap();
    let summary: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(summary["likeCount"], 0);
    assert_eq!(summary["userReactions"], json!([]));
}

#[tokio::test]
async fn test_unknown_reaction_kind_is_a_validation_error() {
    let server = TestServer::start().await.unwrap();
    let token = server.token(unique_id(), "Val");

    let body = ToggleReactionRequest {
        kind: Some("clap".to_string()),
        ..ToggleReactionRequest::like_post(unique_id())
    };
    let response = server.post_auth("/reactions", &token, &body).await.unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_deleted_target_is_gone() {
    let server = TestServer::start().await.unwrap();
    let owner = unique_id();
    let token = server.token(owner, "Del");
    let post = unique_id();
    let path = format!("/targets/post/{post}");

    server
        .put_auth(&path, &token, &RegisterTargetRequest::owned_by(owner, "north"))
        .await
        .unwrap();

    let response = server.delete_auth(&path, &token).await.unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    let response = server.get_auth(&path, &token).await.unwrap();
    let code = assert_error(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(code, "NOT_FOUND");
}

#[tokio::test]
async fn test_bookmarks_toggle_and_list() {
    let server = TestServer::start().await.unwrap();
    let owner = unique_id();
    let reader = unique_id();
    let owner_token = server.token(owner, "Writer");
    let reader_token = server.token(reader, "Reader");
    let post = unique_id();

    server
        .put_auth(
            &format!("/targets/post/{post}"),
            &owner_token,
            &RegisterTargetRequest::owned_by(owner, "north"),
        )
        .await
        .unwrap();

    let response = server
        .post_auth("/bookmarks", &reader_token, &json!({ "postId": post.to_string() }))
        .await
        .unwrap();
    let toggled: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(toggled["active"], true);
    assert_eq!(toggled["bookmarkCount"], 1);

    let response = server.get_auth("/bookmarks", &reader_token).await.unwrap();
    let page: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(page["data"][0]["postId"], post.to_string());
    assert_eq!(page["pagination"]["limit"], 50);
}

// ============================================================================
// Polls
// ============================================================================

#[tokio::test]
async fn test_poll_lifecycle() {
    let server = TestServer::start().await.unwrap();
    let (creator, voter) = (unique_id(), unique_id());
    let creator_token = server.token(creator, "Casey Creator");
    let voter_token = server.token(voter, "Vic Voter");

    let response = server
        .post_auth(
            "/polls",
            &creator_token,
            &CreatePollRequest::single("Lunch?", &["Pizza", "Tacos", "Salad"]),
        )
        .await
        .unwrap();
    let poll: PollResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(poll.votes, vec![0, 0, 0]);
    assert!(poll.is_active);

    let vote_path = format!("/polls/{}/vote", poll.id);
    let response = server.post_auth(&vote_path, &voter_token, &vote(&[0])).await.unwrap();
    let voted: PollResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(voted.votes, vec![1, 0, 0]);
    assert_eq!(voted.user_vote, Some(vec![0]));

    // changing a single-choice vote moves it
    let response = server.post_auth(&vote_path, &voter_token, &vote(&[2])).await.unwrap();
    let voted: PollResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(voted.votes, vec![0, 0, 1]);
    assert_eq!(voted.total_voters, 1);
    assert_eq!(voted.total_votes, 1);

    // two options on a single-choice poll
    let response = server.post_auth(&vote_path, &voter_token, &vote(&[0, 1])).await.unwrap();
    assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();

    // only the creator may close
    let close_path = format!("/polls/{}/close", poll.id);
    let response = server.post_empty(&close_path, &voter_token).await.unwrap();
    assert_error(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server.post_empty(&close_path, &creator_token).await.unwrap();
    let closed: PollResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(!closed.is_active);

    let response = server.post_auth(&vote_path, &voter_token, &vote(&[1])).await.unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "INVALID_STATE");

    let response = server
        .get_auth(&format!("/polls/{}", poll.id), &voter_token)
        .await
        .unwrap();
    let fetched: PollResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(fetched.votes, vec![0, 0, 1]);
    assert_eq!(fetched.user_vote, Some(vec![2]));

    // each vote by someone else notifies the creator once (deduplicated while unread)
    server.settle().await;
    let response = server.get_auth("/notifications", &creator_token).await.unwrap();
    let inbox: InboxResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(inbox.notifications.len(), 1);
    assert_eq!(inbox.notifications[0].kind, "poll_vote");
}

#[tokio::test]
async fn test_poll_needs_two_options() {
    let server = TestServer::start().await.unwrap();
    let token = server.token(unique_id(), "Solo");
    let response = server
        .post_auth("/polls", &token, &CreatePollRequest::single("Only one?", &["Yes"]))
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "VALIDATION_ERROR");
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_mention_event_fans_out_and_mark_read() {
    let server = TestServer::start().await.unwrap();
    let (author, ana, ben) = (unique_id(), unique_id(), unique_id());
    let author_token = server.token(author, "Alex Author");
    let ana_token = server.token(ana, "Ana");

    let event = json!({
        "type": "MENTIONED",
        "actor": { "id": author.to_string(), "displayName": "Alex Author" },
        "mentioned": [ana.to_string(), ben.to_string(), author.to_string()],
        "relatedId": unique_id().to_string(),
        "relatedType": "post",
        "content": "See you both at the study group"
    });
    let response = server
        .post_auth("/engagement-events", &author_token, &event)
        .await
        .unwrap();
    let dispatched: Value = assert_json(response, StatusCode::CREATED).await.unwrap();
    // the actor is never notified about their own mention
    assert_eq!(dispatched["created"].as_array().map(Vec::len), Some(2));

    let response = server.get_auth("/notifications", &ana_token).await.unwrap();
    let inbox: InboxResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(inbox.unread_count, 1);
    assert_eq!(inbox.notifications[0].title, "You Were Mentioned");

    let response = server
        .patch_auth("/notifications", &ana_token, &json!({ "markAll": true }))
        .await
        .unwrap();
    let marked: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(marked["updated"], 1);

    let response = server.get_auth("/notifications", &ana_token).await.unwrap();
    let inbox: InboxResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(inbox.unread_count, 0);
    assert!(inbox.notifications[0].read_at.is_some());

    let response = server
        .patch_auth("/notifications", &ana_token, &json!({}))
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
}

#[tokio::test]
async fn test_engagement_event_for_someone_else_is_forbidden() {
    let server = TestServer::start().await.unwrap();
    let token = server.token(unique_id(), "Imposter");
    let event = json!({
        "type": "FOLLOWED",
        "actor": { "id": unique_id().to_string() },
        "followedId": unique_id().to_string()
    });
    let response = server.post_auth("/engagement-events", &token, &event).await.unwrap();
    assert_error(response, StatusCode::FORBIDDEN).await.unwrap();
}

#[tokio::test]
async fn test_batch_job_processing() {
    let server = TestServer::start().await.unwrap();
    let (admin, first, second) = (unique_id(), unique_id(), unique_id());
    let admin_token = server.token(admin, "Registrar");
    let first_token = server.token(first, "First");

    let response = server
        .post_auth("/notifications/batch", &admin_token, &batch_job(&[first, second, admin]))
        .await
        .unwrap();
    let job: BatchJobView = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(job.status, "pending");
    assert_eq!(job.total_recipients, 3);

    let response = server
        .post_empty("/notifications/batch/process", &admin_token)
        .await
        .unwrap();
    let processed: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(processed["processed"], 1);

    let response = server
        .get_auth(&format!("/notifications/batch/{}", job.id), &admin_token)
        .await
        .unwrap();
    let done: BatchJobView = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(done.status, "completed");
    assert_eq!(done.progress, 100);
    assert_eq!(done.processed_recipients, 3);

    let response = server.get_auth("/notifications", &first_token).await.unwrap();
    let inbox: InboxResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(inbox.notifications.len(), 1);
    assert_eq!(inbox.notifications[0].kind, "event_reminder");

    // the creator is skipped
    let response = server.get_auth("/notifications", &admin_token).await.unwrap();
    let inbox: InboxResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(inbox.notifications.is_empty());

    // terminal jobs cannot be cancelled
    let response = server
        .post_empty(&format!("/notifications/batch/{}/cancel", job.id), &admin_token)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "INVALID_STATE");

    let response = server
        .get_auth("/notifications/batch?status=completed", &admin_token)
        .await
        .unwrap();
    let page: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(page["data"][0]["id"], job.id);
}

#[tokio::test]
async fn test_batch_job_transitions_are_creator_only() {
    let server = TestServer::start().await.unwrap();
    let (admin, other) = (unique_id(), unique_id());
    let admin_token = server.token(admin, "Admin");
    let other_token = server.token(other, "Other");

    let response = server
        .post_auth("/notifications/batch", &admin_token, &batch_job(&[other]))
        .await
        .unwrap();
    let job: BatchJobView = assert_json(response, StatusCode::CREATED).await.unwrap();
    let transition = format!("/notifications/batch/{}/transition", job.id);

    let response = server
        .post_auth(&transition, &other_token, &json!({ "status": "cancelled" }))
        .await
        .unwrap();
    assert_error(response, StatusCode::FORBIDDEN).await.unwrap();

    // pending cannot jump straight to completed
    let response = server
        .post_auth(&transition, &admin_token, &json!({ "status": "completed" }))
        .await
        .unwrap();
    assert_error(response, StatusCode::CONFLICT).await.unwrap();

    let response = server
        .post_empty(&format!("/notifications/batch/{}/cancel", job.id), &admin_token)
        .await
        .unwrap();
    let cancelled: BatchJobView = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(cancelled.status, "cancelled");
}

// ============================================================================
// Leaderboard
// ============================================================================

#[tokio::test]
async fn test_leaderboard_ranks_and_filters() {
    let server = TestServer::start().await.unwrap();
    let (author, helper, south) = (unique_id(), unique_id(), unique_id());

    server.store.seed_contributor(
        Snowflake::new(author),
        ContributorRecord {
            campus_id: Some("north".into()),
            papers: vec![PaperRecord {
                approved: true,
                downloads: 5,
                helpful: 0,
            }],
            ..ContributorRecord::default()
        },
    );
    server.store.seed_contributor(
        Snowflake::new(helper),
        ContributorRecord {
            campus_id: Some("north".into()),
            tickets: vec![TicketRecord { resolved: true }],
            ..ContributorRecord::default()
        },
    );
    server.store.seed_contributor(
        Snowflake::new(south),
        ContributorRecord {
            campus_id: Some("south".into()),
            tickets: vec![TicketRecord { resolved: false }],
            ..ContributorRecord::default()
        },
    );

    let token = server.token(author, "Reader");
    let response = server
        .get_auth("/leaderboard?campusId=north", &token)
        .await
        .unwrap();
    let board: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let entries = board["entries"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 2);
    // 50 + 2*5 = 60 beats 10 + 30 = 40
    assert_eq!(entries[0]["userId"], author.to_string());
    assert_eq!(entries[0]["totalPoints"], 60);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[1]["totalPoints"], 40);
    assert_eq!(
        entries[0]["badge"],
        json!({ "kind": "champion", "label": "Champion", "color": "gold" })
    );
    assert_eq!(entries[1]["badge"]["label"], "2nd Place");
    assert_eq!(entries[1]["badge"]["color"], "silver");
    assert_eq!(board["partial"], false);

    let response = server
        .get_auth("/leaderboard?category=helpdesk", &token)
        .await
        .unwrap();
    let board: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let ids: Vec<&str> = board["entries"]
        .as_array()
        .map(|e| e.iter().filter_map(|x| x["userId"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec![helper.to_string(), south.to_string()]);

    let response = server
        .get_auth("/leaderboard?category=karma", &token)
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
}

// ============================================================================
// Activity Log
// ============================================================================

#[tokio::test]
async fn test_activity_log_record_list_and_aggregate() {
    let server = TestServer::start().await.unwrap();
    let user = unique_id();
    let token = server.token(user, "Logger");

    for action in ["view_paper", "view_paper", "download_paper"] {
        let response = server
            .post_auth(
                "/activity-logs",
                &token,
                &json!({ "action": action, "resourceType": "paper", "resourceId": "77" }),
            )
            .await
            .unwrap();
        let entry: Value = assert_json(response, StatusCode::CREATED).await.unwrap();
        assert_eq!(entry["ipAddress"], "127.0.0.1");
    }

    let response = server
        .get_auth(&format!("/activity-logs?userId={user}&action=view_paper"), &token)
        .await
        .unwrap();
    let page: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(page["pagination"]["total"], 2);
    assert_eq!(page["data"].as_array().map(Vec::len), Some(2));

    let response = server.get_auth("/activity-logs/stats", &token).await.unwrap();
    let stats: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(stats["byAction"]["view_paper"], 2);
    assert_eq!(stats["byResource"]["paper"], 3);

    let response = server
        .get_auth("/activity-logs/analytics?period=day", &token)
        .await
        .unwrap();
    let analytics: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(analytics["totalActivities"], 3);
    assert_eq!(analytics["uniqueUsers"], 1);

    let response = server
        .get_auth("/activity-logs/analytics?period=decade", &token)
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
}

// ============================================================================
// Realtime
// ============================================================================

#[tokio::test]
async fn test_realtime_stream_applies_scope_filter() {
    let server = TestServer::start().await.unwrap();
    let owner = unique_id();
    let token = server.token(owner, "Streamer");

    let mut north = server.realtime(&token, "campusId=north").await.unwrap();

    let south_post = unique_id();
    let north_post = unique_id();
    server
        .put_auth(
            &format!("/targets/post/{south_post}"),
            &token,
            &RegisterTargetRequest::owned_by(owner, "south"),
        )
        .await
        .unwrap();
    server
        .put_auth(
            &format!("/targets/post/{north_post}"),
            &token,
            &RegisterTargetRequest::owned_by(owner, "north"),
        )
        .await
        .unwrap();

    let frame = north.next_event(FRAME_TIMEOUT).await.unwrap();
    assert_eq!(frame["entityType"], "target");
    assert_eq!(frame["scope"]["campusId"], "north");
    assert_eq!(frame["entity"]["targetId"], north_post.to_string());
}

#[tokio::test]
async fn test_closing_realtime_stream_releases_subscription() {
    let server = TestServer::start().await.unwrap();
    let token = server.token(unique_id(), "Lurker");

    let client = server.realtime(&token, "campusId=quiet").await.unwrap();
    assert_eq!(server.subscriber_count(), 1);

    // nothing is ever published to this scope
    client.close().await.unwrap();
    server
        .wait_for_subscribers(0, Duration::from_secs(2))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_realtime_requires_identity() {
    let server = TestServer::start().await.unwrap();
    let url = format!("ws://{}/api/v1/realtime", server.addr);
    assert!(tokio_tungstenite::connect_async(url).await.is_err());
}
