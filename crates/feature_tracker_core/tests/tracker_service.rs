use chrono::{TimeZone, Utc};
use feature_tracker_core::db::open_db_in_memory;
use feature_tracker_core::{
    BackupDecodeError, MembershipTier, NewFeature, NewPage, ReconcileOptions, ServiceError,
    SqlitePageRepository, TrackerService,
};
use rusqlite::Connection;

const DUPLICATED_BACKUP: &str = r#"[
  {
    "id": "5B1F2D7A-3C44-4E8E-9A0B-1D2C3E4F5A6B",
    "name": "abstract",
    "notes": "",
    "count": 1,
    "isChallenge": false,
    "features": [
      { "id": "0F9E8D7C-6B5A-4433-8221-100F0E0D0C0B", "dateV2": "2023-11-05T18:00:00Z", "raw": false, "notes": "one" }
    ]
  },
  {
    "id": "5B1F2D7A-3C44-4E8E-9A0B-1D2C3E4F5A6B",
    "name": "abstract",
    "notes": "",
    "count": 1,
    "isChallenge": false,
    "features": [
      { "id": "A1B2C3D4-E5F6-4789-8ABC-DEF012345678", "dateV2": "2024-01-02T09:30:00Z", "raw": true, "notes": "two" }
    ]
  }
]"#;

fn service(conn: &Connection) -> TrackerService<SqlitePageRepository<'_>> {
    TrackerService::new(SqlitePageRepository::try_new(conn).unwrap())
}

fn new_feature(notes: &str, raw: bool) -> NewFeature {
    NewFeature {
        date: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        raw,
        notes: notes.to_string(),
    }
}

#[test]
fn add_page_normalizes_user_input() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut request = NewPage::named("  Street   Life ");
    request.hub = " RAW ".to_string();
    let id = service.add_page(&request).unwrap();

    let page = service.get_page(id).unwrap().unwrap();
    assert_eq!(page.name, "street life");
    assert_eq!(page.hub, "raw");
    assert_eq!(page.count, 1);
}

#[test]
fn add_and_delete_flow() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let id = service.add_page(&NewPage::named("nature")).unwrap();
    service.add_feature(id, &new_feature("sunrise", false)).unwrap();
    assert_eq!(service.list_pages().unwrap()[0].features.len(), 1);

    service.delete_page(id).unwrap();
    assert!(service.list_pages().unwrap().is_empty());
}

#[test]
fn restore_merges_duplicated_pages() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let report = service
        .restore_backup(DUPLICATED_BACKUP, ReconcileOptions::default())
        .unwrap();
    assert_eq!(report.merged_pages, 1);

    let pages = service.list_pages().unwrap();
    assert_eq!(pages.len(), 1);
    let notes: Vec<_> = pages[0].features.iter().map(|f| f.notes.as_str()).collect();
    assert_eq!(notes, vec!["one", "two"]);
}

#[test]
fn malformed_backup_leaves_store_untouched() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service.add_page(&NewPage::named("existing")).unwrap();
    let before = service.list_pages().unwrap();

    let err = service
        .restore_backup(r#"[{"name": "abstract"}]"#, ReconcileOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Decode(BackupDecodeError::MissingKey { .. })
    ));

    let err = service
        .restore_backup("not json at all", ReconcileOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Decode(BackupDecodeError::CorruptedPayload { .. })
    ));

    assert_eq!(service.list_pages().unwrap(), before);
}

#[test]
fn export_then_restore_is_stable() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = service.add_page(&NewPage::named("portrait")).unwrap();
    service.add_feature(id, &new_feature("first", false)).unwrap();
    service.add_feature(id, &new_feature("second", true)).unwrap();
    let before = service.list_pages().unwrap();

    let document = service.export_backup().unwrap();
    let report = service
        .restore_backup(&document, ReconcileOptions::default())
        .unwrap();

    assert!(report.is_noop());
    assert_eq!(service.list_pages().unwrap(), before);
}

#[test]
fn reconcile_store_is_noop_on_clean_data() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service.add_page(&NewPage::named("nature")).unwrap();
    service.add_page(&NewPage::named("nature")).unwrap();

    let report = service.reconcile_store(ReconcileOptions::default()).unwrap();
    assert!(report.is_noop());
    assert_eq!(service.list_pages().unwrap().len(), 2);

    let report = service
        .reconcile_store(ReconcileOptions {
            merge_semantic_duplicates: true,
        })
        .unwrap();
    assert_eq!(report.merged_pages, 1);
    assert_eq!(service.list_pages().unwrap().len(), 1);
}

#[test]
fn statistics_reflect_stored_pages() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = service.add_page(&NewPage::named("nature")).unwrap();
    for index in 0..5 {
        service
            .add_feature(id, &new_feature(&format!("feature {index}"), false))
            .unwrap();
    }

    let mut challenge = NewPage::named("abstract");
    challenge.is_challenge = true;
    service.add_page(&challenge).unwrap();

    let stats = service.statistics().unwrap();
    assert_eq!(stats.page_count, 1);
    assert_eq!(stats.snap_feature_count, 5);
    assert_eq!(stats.challenge_page_count, 1);
    assert_eq!(stats.membership, MembershipTier::Artist);
}

#[test]
fn restore_keeps_hub_and_name_as_written() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let document = r#"[
      {"id":"5b1f2d7a-3c44-4e8e-9a0b-1d2c3e4f5a6b","name":"Abstract Art","hub":"Snap","notes":"","count":1,"features":[]},
      {"id":"0f9e8d7c-6b5a-4433-8221-100f0e0d0c0b","name":"","hub":"Click Hub","notes":"","count":2,"features":[]}
    ]"#;

    let report = service
        .restore_backup(document, ReconcileOptions::default())
        .unwrap();
    assert!(report.is_noop());

    let pages = service.list_pages().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].name, "Abstract Art");
    assert_eq!(pages[0].hub, "Snap");
    assert_eq!(pages[1].name, "");
    assert_eq!(pages[1].hub, "Click Hub");
}
