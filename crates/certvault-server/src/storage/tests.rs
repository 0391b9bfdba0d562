//! Storage layer tests for the `CertVault` server.

use chrono::{Duration, TimeZone, Utc};

use super::db::ServerDatabase;
use super::models::{
    CertificateFilter, CertificateUpdate, NewVerificationEvent, ROLE_ADMIN, ROLE_STAFF,
    StatusFilter, TemplateParams,
};
use crate::test_helpers::{sample_certificate, test_db};
use certvault_core::db::DatabaseError;

fn template_params(name: &str) -> TemplateParams<'_> {
    TemplateParams {
        name,
        description: Some("Gold border"),
        layout: r#"{"orientation":"landscape"}"#,
        is_active: true,
    }
}

fn event(certificate_id: &str, successful: bool) -> NewVerificationEvent<'_> {
    NewVerificationEvent {
        certificate_id,
        verified_at: Utc::now(),
        ip_address: Some("198.51.100.4"),
        user_agent: None,
        device_info: None,
        geo_info: None,
        successful,
    }
}

fn listing(limit: u32) -> CertificateFilter<'static> {
    CertificateFilter {
        limit,
        ..CertificateFilter::default()
    }
}

// === Certificate tests ===

#[tokio::test]
async fn create_and_get_certificate() {
    let db = test_db().await;
    let mut new = sample_certificate("cert-1", "Jane Doe");
    new.certificate_number = Some("CERT-001".to_string());
    new.expires_at = Some(Utc.with_ymd_and_hms(2030, 1, 1, 23, 59, 59).unwrap());

    let cert = db.create_certificate(&new).await.unwrap();
    assert_eq!(cert.certificate_id, "cert-1");
    assert_eq!(cert.full_name, "Jane Doe");
    assert!(cert.is_active);
    assert!(cert.validation_status);
    assert_eq!(cert.expires_at, new.expires_at);

    let found = db.find_certificate("cert-1").await.unwrap();
    assert_eq!(found, Some(cert));
}

#[tokio::test]
async fn get_missing_certificate_is_not_found() {
    let db = test_db().await;
    assert!(db.find_certificate("missing").await.unwrap().is_none());
    let err = db.get_certificate("missing").await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
}

#[tokio::test]
async fn duplicate_certificate_id_is_a_constraint_violation() {
    let db = test_db().await;
    db.create_certificate(&sample_certificate("cert-1", "Jane Doe"))
        .await
        .unwrap();
    let err = db
        .create_certificate(&sample_certificate("cert-1", "John Doe"))
        .await
        .unwrap_err();
    assert!(err.is_constraint());
}

#[tokio::test]
async fn blank_name_is_rejected_by_schema() {
    let db = test_db().await;
    let err = db
        .create_certificate(&sample_certificate("cert-1", "   "))
        .await
        .unwrap_err();
    assert!(err.is_constraint());
}

#[tokio::test]
async fn list_filters_by_search_status_and_template() {
    let db = test_db().await;
    let template = db.create_template(&template_params("Classic")).await.unwrap();

    db.create_certificate(&sample_certificate("a", "Alice Smith")).await.unwrap();
    db.create_certificate(&sample_certificate("b", "Bob Jones")).await.unwrap();
    let mut carol = sample_certificate("c", "Carol Smith");
    carol.template_id = Some(template.id);
    carol.course_name = "Embedded Rust".to_string();
    db.create_certificate(&carol).await.unwrap();

    db.set_certificate_active("b", false).await.unwrap();
    db.set_validation_status("c", false).await.unwrap();

    let smiths = CertificateFilter {
        search: Some("smith"),
        ..listing(10)
    };
    assert_eq!(db.list_certificates(&smiths).await.unwrap().len(), 2);
    assert_eq!(db.count_certificates(&smiths).await.unwrap(), 2);

    let by_course = CertificateFilter {
        search: Some("Embedded"),
        ..listing(10)
    };
    let found = db.list_certificates(&by_course).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].certificate_id, "c");

    for (status, expected) in [
        (StatusFilter::All, vec!["a", "b", "c"]),
        (StatusFilter::Active, vec!["a"]),
        (StatusFilter::Revoked, vec!["b"]),
        (StatusFilter::Invalid, vec!["c"]),
    ] {
        let filter = CertificateFilter {
            status,
            ..listing(10)
        };
        let mut ids: Vec<String> = db
            .list_certificates(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.certificate_id)
            .collect();
        ids.sort();
        assert_eq!(ids, expected, "status {status:?}");
    }

    let by_template = CertificateFilter {
        template_id: Some(template.id),
        ..listing(10)
    };
    assert_eq!(db.count_certificates(&by_template).await.unwrap(), 1);
}

#[tokio::test]
async fn list_pages_with_limit_and_offset() {
    let db = test_db().await;
    for i in 0..5 {
        db.create_certificate(&sample_certificate(&format!("cert-{i}"), "Holder"))
            .await
            .unwrap();
    }

    let first = db.list_certificates(&listing(2)).await.unwrap();
    let second = db
        .list_certificates(&CertificateFilter {
            offset: 2,
            ..listing(2)
        })
        .await
        .unwrap();
    let last = db
        .list_certificates(&CertificateFilter {
            offset: 4,
            ..listing(2)
        })
        .await
        .unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(last.len(), 1);
    assert_ne!(first[0].certificate_id, second[0].certificate_id);
    assert_eq!(db.count_certificates(&listing(2)).await.unwrap(), 5);
}

#[tokio::test]
async fn partial_update_keeps_untouched_fields() {
    let db = test_db().await;
    let mut new = sample_certificate("cert-1", "Jane Doe");
    new.grade = Some("B".to_string());
    new.branch_name = Some("Nairobi".to_string());
    db.create_certificate(&new).await.unwrap();

    let update: CertificateUpdate =
        serde_json::from_str(r#"{"full_name":"Jane Q. Doe","grade":null}"#).unwrap();
    let updated = db.update_certificate("cert-1", &update).await.unwrap();

    assert_eq!(updated.full_name, "Jane Q. Doe");
    assert_eq!(updated.grade, None);
    assert_eq!(updated.branch_name.as_deref(), Some("Nairobi"));
    assert_eq!(updated.course_name, "Rust Fundamentals");
    assert!(updated.is_active);
}

#[tokio::test]
async fn update_missing_certificate_is_not_found() {
    let db = test_db().await;
    let err = db
        .update_certificate("missing", &CertificateUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
}

#[tokio::test]
async fn revoke_and_reinstate() {
    let db = test_db().await;
    db.create_certificate(&sample_certificate("cert-1", "Jane Doe"))
        .await
        .unwrap();

    assert!(db.set_certificate_active("cert-1", false).await.unwrap());
    assert!(!db.get_certificate("cert-1").await.unwrap().is_active);
    assert!(db.set_certificate_active("cert-1", true).await.unwrap());
    assert!(db.get_certificate("cert-1").await.unwrap().is_active);

    assert!(!db.set_certificate_active("missing", false).await.unwrap());
    assert!(!db.set_validation_status("missing", false).await.unwrap());
}

// === Template tests ===

#[tokio::test]
async fn template_crud() {
    let db = test_db().await;
    let created = db.create_template(&template_params("Classic")).await.unwrap();
    assert_eq!(created.name, "Classic");
    assert!(created.is_active);

    let updated = db
        .update_template(
            created.id,
            &TemplateParams {
                is_active: false,
                ..template_params("Classic v2")
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Classic v2");
    assert!(!updated.is_active);

    assert!(db.list_templates(true).await.unwrap().is_empty());
    assert_eq!(db.list_templates(false).await.unwrap().len(), 1);

    assert!(db.delete_template(created.id).await.unwrap());
    assert!(db.find_template(created.id).await.unwrap().is_none());
    assert!(!db.delete_template(created.id).await.unwrap());
}

#[tokio::test]
async fn duplicate_template_name_is_a_constraint_violation() {
    let db = test_db().await;
    db.create_template(&template_params("Classic")).await.unwrap();
    let err = db.create_template(&template_params("Classic")).await.unwrap_err();
    assert!(err.is_constraint());
}

#[tokio::test]
async fn update_missing_template_is_not_found() {
    let db = test_db().await;
    let err = db.update_template(7, &template_params("Ghost")).await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
}

#[tokio::test]
async fn template_in_use_cannot_be_deleted() {
    let db = test_db().await;
    let template = db.create_template(&template_params("Classic")).await.unwrap();
    let mut cert = sample_certificate("cert-1", "Jane Doe");
    cert.template_id = Some(template.id);
    db.create_certificate(&cert).await.unwrap();

    let err = db.delete_template(template.id).await.unwrap_err();
    assert!(err.is_constraint());
    assert!(db.find_template(template.id).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_certificate_leaves_template_intact() {
    let db = test_db().await;
    let template = db.create_template(&template_params("Classic")).await.unwrap();
    let mut cert = sample_certificate("cert-1", "Jane Doe");
    cert.template_id = Some(template.id);
    db.create_certificate(&cert).await.unwrap();

    assert!(db.delete_certificate("cert-1").await.unwrap());
    assert_eq!(db.find_template(template.id).await.unwrap(), Some(template.clone()));
    assert_eq!(db.count_certificates_for_template(template.id).await.unwrap(), 0);
    assert!(db.delete_template(template.id).await.unwrap());
}

#[tokio::test]
async fn unknown_template_reference_is_rejected() {
    let db = test_db().await;
    let mut cert = sample_certificate("cert-1", "Jane Doe");
    cert.template_id = Some(404);
    let err = db.create_certificate(&cert).await.unwrap_err();
    assert!(err.is_constraint());
}

// === Verification event tests ===

#[tokio::test]
async fn events_are_listed_newest_first() {
    let db = test_db().await;
    let first = db.append_verification_event(&event("cert-1", true)).await.unwrap();
    let second = db.append_verification_event(&event("cert-1", false)).await.unwrap();
    db.append_verification_event(&event("cert-2", true)).await.unwrap();
    assert!(second > first);

    let events = db.list_verification_events("cert-1", 10, 0).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, second);
    assert!(!events[0].successful);
    assert_eq!(events[1].ip_address.as_deref(), Some("198.51.100.4"));

    let failed = db.list_recent_verification_events(Some(false), 10, 0).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(db.list_recent_verification_events(None, 10, 0).await.unwrap().len(), 3);
    assert_eq!(db.count_verification_events("cert-1").await.unwrap(), 2);
}

#[tokio::test]
async fn events_cannot_be_updated_or_deleted() {
    let db = test_db().await;
    let id = db.append_verification_event(&event("cert-1", true)).await.unwrap();

    let update = sqlx::query("UPDATE verification_events SET successful = 0 WHERE id = ?")
        .bind(id)
        .execute(db.pool())
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM verification_events WHERE id = ?")
        .bind(id)
        .execute(db.pool())
        .await;
    assert!(delete.is_err());

    let events = db.list_verification_events("cert-1", 10, 0).await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].successful);
}

// === User tests ===

#[tokio::test]
async fn create_and_get_admin_user() {
    let db = test_db().await;
    let user = db
        .create_admin_user("u1", "alice", "alice@example.com", "hash", ROLE_ADMIN)
        .await
        .unwrap();
    assert!(user.is_admin());

    let by_name = db.get_admin_user_by_username("alice").await.unwrap();
    assert_eq!(by_name.id, "u1");

    assert!(db.update_admin_password("u1", "new-hash").await.unwrap());
    assert_eq!(db.get_admin_user("u1").await.unwrap().password_hash, "new-hash");
}

#[tokio::test]
async fn duplicate_username_and_bad_role_are_rejected() {
    let db = test_db().await;
    db.create_admin_user("u1", "alice", "a@example.com", "hash", ROLE_STAFF)
        .await
        .unwrap();

    let dup = db
        .create_admin_user("u2", "alice", "b@example.com", "hash", ROLE_STAFF)
        .await
        .unwrap_err();
    assert!(dup.is_constraint());

    let role = db
        .create_admin_user("u3", "bob", "c@example.com", "hash", "root")
        .await
        .unwrap_err();
    assert!(role.is_constraint());
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let db = test_db().await;
    let err = db.get_admin_user_by_username("nobody").await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
}

// === API key tests ===

#[tokio::test]
async fn api_key_lifecycle() {
    let db = test_db().await;
    let key = db
        .create_api_key("k1", "ci", "cvk_abcdefgh", "hash-1", Some("u1"))
        .await
        .unwrap();
    assert!(!key.revoked);
    assert!(key.last_used_at.is_none());

    let found = db.get_active_api_key_by_hash("hash-1").await.unwrap().unwrap();
    assert_eq!(found.id, "k1");

    db.touch_api_key("k1").await.unwrap();
    assert!(db.get_api_key("k1").await.unwrap().last_used_at.is_some());

    assert!(db.revoke_api_key("k1").await.unwrap());
    assert!(!db.revoke_api_key("k1").await.unwrap());
    assert!(db.get_active_api_key_by_hash("hash-1").await.unwrap().is_none());
    assert_eq!(db.list_api_keys().await.unwrap().len(), 1);
}

// === Analytics tests ===

#[tokio::test]
async fn dashboard_summary_counts() {
    let db = test_db().await;
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    db.create_template(&template_params("Classic")).await.unwrap();

    db.create_certificate(&sample_certificate("valid", "A")).await.unwrap();
    db.create_certificate(&sample_certificate("revoked", "B")).await.unwrap();
    db.set_certificate_active("revoked", false).await.unwrap();
    db.create_certificate(&sample_certificate("invalid", "C")).await.unwrap();
    db.set_validation_status("invalid", false).await.unwrap();

    let mut expired = sample_certificate("expired", "D");
    expired.expires_at = Some(now - Duration::days(2));
    db.create_certificate(&expired).await.unwrap();

    let mut expiring = sample_certificate("expiring", "E");
    expiring.expires_at = Some(now + Duration::days(10));
    db.create_certificate(&expiring).await.unwrap();

    let mut later = sample_certificate("later", "F");
    later.expires_at = Some(now + Duration::days(90));
    db.create_certificate(&later).await.unwrap();

    db.append_verification_event(&event("valid", true)).await.unwrap();
    db.append_verification_event(&event("valid", true)).await.unwrap();
    db.append_verification_event(&event("nope", false)).await.unwrap();

    let summary = db.dashboard_summary(now, Duration::days(30)).await.unwrap();
    assert_eq!(summary.total_certificates, 6);
    assert_eq!(summary.active_certificates, 4);
    assert_eq!(summary.revoked_certificates, 1);
    assert_eq!(summary.invalid_certificates, 1);
    assert_eq!(summary.expired_certificates, 1);
    assert_eq!(summary.expiring_soon, 1);
    assert_eq!(summary.total_templates, 1);
    assert_eq!(summary.total_verifications, 3);
    assert_eq!(summary.successful_verifications, 2);
    assert_eq!(summary.failed_verifications, 1);
}

#[tokio::test]
async fn daily_verifications_group_by_day() {
    let db = test_db().await;
    let day1 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
    let day2 = Utc.with_ymd_and_hms(2025, 6, 2, 18, 30, 0).unwrap();
    let old = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();

    for (at, successful) in [(day1, true), (day1, false), (day2, true), (old, true)] {
        db.append_verification_event(&NewVerificationEvent {
            verified_at: at,
            ..event("cert-1", successful)
        })
        .await
        .unwrap();
    }

    let days = db.daily_verifications(day1 - Duration::hours(1)).await.unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].day, "2025-06-01");
    assert_eq!(days[0].total, 2);
    assert_eq!(days[0].successful, 1);
    assert_eq!(days[1].day, "2025-06-02");
    assert_eq!(days[1].total, 1);
}

#[tokio::test]
async fn certificates_per_course_ranks_by_count() {
    let db = test_db().await;
    for (id, course) in [("a", "Rust"), ("b", "Rust"), ("c", "Go")] {
        let mut cert = sample_certificate(id, "Holder");
        cert.course_name = course.to_string();
        db.create_certificate(&cert).await.unwrap();
    }

    let courses = db.certificates_per_course(10).await.unwrap();
    assert_eq!(courses, vec![("Rust".to_string(), 2), ("Go".to_string(), 1)]);
}

#[tokio::test]
async fn on_disk_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("certvault.db");

    {
        let db = ServerDatabase::open(&path).await.unwrap();
        db.create_certificate(&sample_certificate("cert-1", "Jane Doe"))
            .await
            .unwrap();
        db.pool().close().await;
    }

    let db = ServerDatabase::open(&path).await.unwrap();
    assert!(db.find_certificate("cert-1").await.unwrap().is_some());
}
