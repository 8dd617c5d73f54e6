use civic_storage::{ApiLogStore, InMemoryApiLogStore, InMemoryUserStore, UserRecord, UserStore};
use domain::{ApiLogRecord, ExecutionTime, RequestBody};
use std::sync::Arc;

fn sample_record(path: &str, user_id: Option<&str>) -> ApiLogRecord {
    ApiLogRecord {
        path: path.to_string(),
        user_id: user_id.map(str::to_string),
        body: RequestBody::Json(serde_json::json!({})),
        method: "GET".to_string(),
        ip_address: "127.0.0.1".to_string(),
        status_code: 200,
        execution_time: ExecutionTime::from_ticks(10),
    }
}

#[tokio::test]
async fn bulk_insert_assigns_ids_and_timestamps() {
    let store = InMemoryApiLogStore::new();
    let written = store
        .bulk_insert(&[sample_record("/a", None), sample_record("/b", None)])
        .await
        .expect("insert");
    assert_eq!(written, 2);

    let rows = store.records();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].log_id, 1);
    assert_eq!(rows[1].log_id, 2);
    assert!(rows.iter().all(|row| row.created_at_ms > 0));
    assert_eq!(store.batches(), vec![2]);
}

#[tokio::test]
async fn empty_batch_is_not_recorded() {
    let store = InMemoryApiLogStore::new();
    let written = store.bulk_insert(&[]).await.expect("insert");
    assert_eq!(written, 0);
    assert!(store.is_empty());
    assert!(store.batches().is_empty());
}

#[tokio::test]
async fn deleting_user_nulls_log_references() {
    let logs = Arc::new(InMemoryApiLogStore::new());
    let users = InMemoryUserStore::new(logs.clone());
    users
        .create_user(UserRecord {
            user_id: "user-1".to_string(),
            username: "citizen".to_string(),
        })
        .await
        .expect("create");

    let records: Vec<ApiLogRecord> = (0..10)
        .map(|i| sample_record(&format!("/api/complaints/{i}"), Some("user-1")))
        .collect();
    logs.bulk_insert(&records).await.expect("insert");
    logs.bulk_insert(&[sample_record("/other", Some("user-2"))])
        .await
        .expect("insert");

    let deleted = users.delete_user("user-1").await.expect("delete");
    assert!(deleted);

    let rows = logs.records();
    assert_eq!(rows.len(), 11);
    let detached = rows
        .iter()
        .filter(|row| row.record.path.starts_with("/api/complaints/"))
        .collect::<Vec<_>>();
    assert_eq!(detached.len(), 10);
    assert!(detached.iter().all(|row| row.record.user_id.is_none()));
    assert_eq!(rows[10].record.user_id.as_deref(), Some("user-2"));
}

#[tokio::test]
async fn deleting_unknown_user_returns_false() {
    let logs = Arc::new(InMemoryApiLogStore::new());
    let users = InMemoryUserStore::new(logs);
    assert!(!users.delete_user("missing").await.expect("delete"));
}
