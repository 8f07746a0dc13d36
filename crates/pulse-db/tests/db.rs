//! Database-backed tests for the pulse-db table operations.
//!
//! Each test gets an isolated database with migrations applied via
//! `#[sqlx::test]`.

use pulse_db::{NewBrand, NewContentSyncLog, NewPost};
use serde_json::json;
use sqlx::PgPool;

fn brand(id: i64, label: &str) -> NewBrand {
    NewBrand {
        id,
        label: label.to_string(),
        instagram: Some(format!("{label}-ig")),
        raw_snapshot: json!({ "id": id, "label": label }),
        ..NewBrand::default()
    }
}

fn post(metricool_id: &str, brand_id: i64, interactions: i32) -> NewPost {
    NewPost {
        metricool_id: metricool_id.to_string(),
        brand_id,
        platform: "instagram".to_string(),
        content: Some("hello".to_string()),
        link: None,
        picture: None,
        published_at: None,
        timezone: Some("UTC".to_string()),
        interactions,
        impressions: 100,
        engagement_rate: 1.5,
        platform_detail: None,
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_brand_inserts_then_overwrites(pool: PgPool) {
    pulse_db::upsert_brand(&pool, &brand(1, "Acme")).await.expect("insert");

    let row = pulse_db::get_brand(&pool, 1).await.expect("get");
    assert_eq!(row.label, "Acme");
    assert!(row.last_synced_at.is_some());
    assert!(row.deleted_at.is_none());

    let mut updated = brand(1, "Acme Renamed");
    updated.instagram = None;
    pulse_db::upsert_brand(&pool, &updated).await.expect("update");

    let row = pulse_db::get_brand(&pool, 1).await.expect("get");
    assert_eq!(row.label, "Acme Renamed");
    // Full overwrite: a field that went away upstream goes away here too.
    assert!(row.instagram.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_brand_clears_soft_delete(pool: PgPool) {
    pulse_db::upsert_brand(&pool, &brand(3, "Ghost")).await.expect("insert");
    let marked = pulse_db::mark_missing_brands_deleted(&pool, &[999])
        .await
        .expect("mark");
    assert_eq!(marked, 1);

    let row = pulse_db::get_brand(&pool, 3).await.expect("get");
    assert!(row.deleted_at.is_some());

    pulse_db::upsert_brand(&pool, &brand(3, "Ghost")).await.expect("reappear");
    let row = pulse_db::get_brand(&pool, 3).await.expect("get");
    assert!(row.deleted_at.is_none(), "reappearance clears deleted_at");
}

#[sqlx::test(migrations = "../../migrations")]
async fn get_active_brand_treats_soft_deleted_rows_as_absent(pool: PgPool) {
    pulse_db::upsert_brand(&pool, &brand(5, "Fading")).await.expect("insert");

    let row = pulse_db::get_active_brand(&pool, 5).await.expect("active");
    assert_eq!(row.label, "Fading");

    pulse_db::mark_missing_brands_deleted(&pool, &[999])
        .await
        .expect("mark");

    // The plain lookup still sees the row; the active one does not.
    assert!(pulse_db::get_brand(&pool, 5).await.is_ok());
    let err = pulse_db::get_active_brand(&pool, 5).await.unwrap_err();
    assert!(matches!(err, pulse_db::DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_missing_skips_already_deleted_rows(pool: PgPool) {
    pulse_db::upsert_brand(&pool, &brand(1, "One")).await.expect("insert");
    pulse_db::upsert_brand(&pool, &brand(2, "Two")).await.expect("insert");
    pulse_db::upsert_brand(&pool, &brand(3, "Three")).await.expect("insert");

    let first = pulse_db::mark_missing_brands_deleted(&pool, &[1, 2])
        .await
        .expect("mark");
    assert_eq!(first, 1);

    // Second diff with the same list: id 3 is already marked, so nothing new.
    let second = pulse_db::mark_missing_brands_deleted(&pool, &[1, 2])
        .await
        .expect("mark");
    assert_eq!(second, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn purge_removes_only_rows_past_retention(pool: PgPool) {
    pulse_db::upsert_brand(&pool, &brand(10, "Old")).await.expect("insert");
    pulse_db::upsert_brand(&pool, &brand(11, "Recent")).await.expect("insert");

    sqlx::query("UPDATE brands SET deleted_at = NOW() - INTERVAL '40 days' WHERE id = 10")
        .execute(&pool)
        .await
        .expect("age row");
    sqlx::query("UPDATE brands SET deleted_at = NOW() - INTERVAL '5 days' WHERE id = 11")
        .execute(&pool)
        .await
        .expect("age row");

    let purged = pulse_db::purge_soft_deleted(&pool, 31).await.expect("purge");
    assert_eq!(purged, 1);

    assert!(pulse_db::get_brand(&pool, 10).await.is_err());
    assert!(pulse_db::get_brand(&pool, 11).await.is_ok());
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_post_is_unique_per_metricool_id_and_brand(pool: PgPool) {
    pulse_db::upsert_brand(&pool, &brand(7, "Brand")).await.expect("brand");

    pulse_db::upsert_post(&pool, &post("42", 7, 10)).await.expect("first");
    pulse_db::upsert_post(&pool, &post("42", 7, 99)).await.expect("second");

    let rows = pulse_db::list_recent_posts(&pool, 7, 50).await.expect("list");
    assert_eq!(rows.len(), 1, "same (metricool_id, brand_id) pair is one row");
    assert_eq!(rows[0].interactions, 99, "latest value wins");
}

#[sqlx::test(migrations = "../../migrations")]
async fn same_metricool_id_under_two_brands_is_two_rows(pool: PgPool) {
    pulse_db::upsert_brand(&pool, &brand(7, "Seven")).await.expect("brand");
    pulse_db::upsert_brand(&pool, &brand(8, "Eight")).await.expect("brand");

    pulse_db::upsert_post(&pool, &post("42", 7, 1)).await.expect("post");
    pulse_db::upsert_post(&pool, &post("42", 8, 2)).await.expect("post");

    assert_eq!(pulse_db::list_recent_posts(&pool, 7, 50).await.expect("list").len(), 1);
    assert_eq!(pulse_db::list_recent_posts(&pool, 8, 50).await.expect("list").len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn credentials_singleton_overwrites_in_place(pool: PgPool) {
    assert!(pulse_db::get_credentials(&pool).await.expect("get").is_none());

    pulse_db::save_credentials(&pool, "token-a", "111").await.expect("save");
    pulse_db::save_credentials(&pool, "token-b", "222").await.expect("save");

    let creds = pulse_db::get_credentials(&pool)
        .await
        .expect("get")
        .expect("row");
    assert_eq!(creds.access_token, "token-b");
    assert_eq!(creds.account_id, "222");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_credentials")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn schedule_enable_sets_next_run_and_disable_clears_it(pool: PgPool) {
    let enabled = pulse_db::enable_schedule(&pool, 12).await.expect("enable");
    assert!(enabled.enabled);
    assert_eq!(enabled.interval_hours, 12);
    assert!(enabled.next_run_at.is_some());

    let disabled = pulse_db::disable_schedule(&pool).await.expect("disable");
    assert!(!disabled.enabled);
    assert!(disabled.next_run_at.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_schedule_ran_advances_by_interval(pool: PgPool) {
    pulse_db::enable_schedule(&pool, 24).await.expect("enable");

    let ran = pulse_db::mark_schedule_ran(&pool).await.expect("mark ran");
    let last = ran.last_run_at.expect("last_run_at set");
    let next = ran.next_run_at.expect("next_run_at set");
    let delta = next - last;
    assert_eq!(delta.num_hours(), 24);
}

#[sqlx::test(migrations = "../../migrations")]
async fn sync_run_lifecycle_success_and_failure(pool: PgPool) {
    let run = pulse_db::create_sync_run(&pool, "manual").await.expect("create");
    assert_eq!(run.status, "running");
    assert!(run.finished_at.is_none());

    pulse_db::complete_sync_run(&pool, run.id, 3, 5, 1).await.expect("complete");
    let done = pulse_db::get_sync_run(&pool, run.id).await.expect("get");
    assert_eq!(done.status, "success");
    assert_eq!((done.created, done.updated, done.marked_deleted), (3, 5, 1));
    assert!(done.finished_at.is_some());

    let failed = pulse_db::create_sync_run(&pool, "auto").await.expect("create");
    pulse_db::fail_sync_run(&pool, failed.id, "upstream returned 503")
        .await
        .expect("fail");
    let failed = pulse_db::get_sync_run(&pool, failed.id).await.expect("get");
    assert_eq!(failed.status, "failed");
    assert_eq!(failed.error_message.as_deref(), Some("upstream returned 503"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn content_sync_log_round_trips_null_brand(pool: PgPool) {
    let log = NewContentSyncLog {
        brand_id: None,
        platform: "all".to_string(),
        posts_fetched: 17,
        errors: Some(json!(["post p-9: connection reset"])),
        raw_response: json!({ "brands": 3 }),
    };

    let row = pulse_db::insert_content_sync_log(&pool, &log).await.expect("insert");
    assert!(row.brand_id.is_none());
    assert_eq!(row.posts_fetched, 17);

    let rows = pulse_db::list_content_sync_logs(&pool, 10).await.expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].raw_response["brands"].as_i64(), Some(3));
}
