//! Integration tests for planning audit records.

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use adplan_db::models::{AuditState, NewAudit};
use adplan_db::queries::audits;
use adplan_test_utils::TestDb;

fn new_audit(hub_id: &str, minutes_ago: i64) -> NewAudit {
    NewAudit {
        request_id: Uuid::new_v4(),
        hub_id: hub_id.to_string(),
        profile_id: "little-guys".to_string(),
        state: AuditState::Exhausted,
        passes_used: 3,
        calls_made: 4,
        initial_total: Some(30_000.0),
        final_total: Some(21_000.0),
        prompt_sha256: "ab".repeat(32),
        document: json!({ "diff": { "removedPublications": [4] } }),
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    }
}

#[tokio::test]
async fn insert_and_get() {
    let db = TestDb::create().await;

    let audit = new_audit("metro", 0);
    let row = audits::insert_audit(&db.pool, &audit).await.unwrap();
    assert_eq!(row.request_id, audit.request_id);
    assert_eq!(row.state, AuditState::Exhausted);
    assert_eq!(row.final_total, Some(21_000.0));

    let fetched = audits::get_audit(&db.pool, audit.request_id).await.unwrap().unwrap();
    assert_eq!(fetched.document["diff"]["removedPublications"][0], 4);
    assert!(audits::get_audit(&db.pool, Uuid::new_v4()).await.unwrap().is_none());

    db.drop_db().await;
}

#[tokio::test]
async fn duplicate_request_id_is_rejected() {
    let db = TestDb::create().await;

    let audit = new_audit("metro", 0);
    audits::insert_audit(&db.pool, &audit).await.unwrap();
    assert!(audits::insert_audit(&db.pool, &audit).await.is_err());

    db.drop_db().await;
}

#[tokio::test]
async fn list_is_newest_first_and_filterable() {
    let db = TestDb::create().await;

    let old = new_audit("metro", 30);
    let new = new_audit("metro", 1);
    let other = new_audit("coast", 10);
    for a in [&old, &new, &other] {
        audits::insert_audit(&db.pool, a).await.unwrap();
    }

    let all: Vec<Uuid> = audits::list_audits(&db.pool, None, 10)
        .await
        .unwrap()
        .iter()
        .map(|r| r.request_id)
        .collect();
    assert_eq!(all, vec![new.request_id, other.request_id, old.request_id]);

    let metro = audits::list_audits(&db.pool, Some("metro"), 1).await.unwrap();
    assert_eq!(metro.len(), 1);
    assert_eq!(metro[0].request_id, new.request_id);

    db.drop_db().await;
}
