use appgate_core::db::open_db_in_memory;
use appgate_core::{
    AppListQuery, AppRepository, AppService, AppValidationError, Metadata, NewApp, Permission,
    PermissionSource, RepoError, SqliteAppRepository,
};
use uuid::Uuid;

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAppRepository::try_new(&conn).unwrap();

    let mut request = NewApp::new("Webhook Bot");
    request.metadata = [("vendor", "acme")].into_iter().collect();
    request.private_metadata = [("signing_key_ref", "kms:42")].into_iter().collect();
    let created = repo.create_app(&request).unwrap();

    assert_eq!(created.name, "Webhook Bot");
    assert!(created.is_active);
    assert!(created.created_at > 0);
    assert!(created.cached_permissions().is_none());

    let loaded = repo.get_app(created.id).unwrap().unwrap();
    assert_eq!(loaded.id, created.id);
    assert_eq!(loaded.created_at, created.created_at);
    assert_eq!(loaded.get_value_from_metadata("vendor"), Some("acme"));
    assert_eq!(
        loaded.get_value_from_private_metadata("signing_key_ref"),
        Some("kms:42")
    );
}

#[test]
fn get_missing_app_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAppRepository::try_new(&conn).unwrap();

    assert!(repo.get_app(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn create_stores_initial_grants_once() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAppRepository::try_new(&conn).unwrap();

    let request = NewApp::new("Order Sync").with_permissions([
        Permission::ManageOrders,
        Permission::ViewOrders,
        Permission::ManageOrders,
    ]);
    let app = repo.create_app(&request).unwrap();

    let granted = repo.load_app_permissions(app.id).unwrap();
    assert_eq!(
        granted.into_iter().collect::<Vec<_>>(),
        vec![Permission::ManageOrders, Permission::ViewOrders]
    );
}

#[test]
fn validation_failure_blocks_create_and_update() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAppRepository::try_new(&conn).unwrap();

    let err = repo.create_app(&NewApp::new("  ")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(AppValidationError::EmptyAppName)
    ));

    let mut app = repo.create_app(&NewApp::new("Valid")).unwrap();
    app.name = "n".repeat(61);
    let err = repo.update_app(&app).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(AppValidationError::AppNameTooLong { .. })
    ));

    let listed = repo.list_apps(&AppListQuery::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Valid");
}

#[test]
fn update_persists_mutable_fields_but_not_created_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAppRepository::try_new(&conn).unwrap();

    let mut app = repo.create_app(&NewApp::new("Draft")).unwrap();
    let created_at = app.created_at;

    app.name = "Renamed".to_string();
    app.is_active = false;
    app.created_at = 1;
    app.store_value_in_metadata([("k", "v")]);
    app.private_metadata = Metadata::new();
    repo.update_app(&app).unwrap();

    let loaded = repo.get_app(app.id).unwrap().unwrap();
    assert_eq!(loaded.name, "Renamed");
    assert!(!loaded.is_active);
    assert_eq!(loaded.created_at, created_at);
    assert_eq!(loaded.get_value_from_metadata("k"), Some("v"));
}

#[test]
fn storage_refuses_to_rewrite_created_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAppRepository::try_new(&conn).unwrap();
    let app = repo.create_app(&NewApp::new("Pinned")).unwrap();

    let result = conn.execute(
        "UPDATE apps SET created_at = 0 WHERE uuid = ?1;",
        [app.id.to_string()],
    );
    assert!(result.is_err());
}

#[test]
fn update_and_delete_missing_app_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAppRepository::try_new(&conn).unwrap();

    let ghost = repo.create_app(&NewApp::new("Ghost")).unwrap();
    repo.delete_app(ghost.id).unwrap();

    assert!(matches!(
        repo.update_app(&ghost).unwrap_err(),
        RepoError::AppNotFound(id) if id == ghost.id
    ));
    assert!(matches!(
        repo.delete_app(ghost.id).unwrap_err(),
        RepoError::AppNotFound(_)
    ));
    assert!(matches!(
        repo.set_app_active(ghost.id, true).unwrap_err(),
        RepoError::AppNotFound(_)
    ));
    assert!(matches!(
        repo.set_app_permissions(ghost.id, &[Permission::ManageApps])
            .unwrap_err(),
        RepoError::AppNotFound(_)
    ));
}

#[test]
fn list_orders_by_name_then_id_and_filters_active_flag() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAppRepository::try_new(&conn).unwrap();

    repo.create_app(&NewApp::new("charlie")).unwrap();
    repo.create_app(&NewApp::new("alpha").inactive()).unwrap();
    let bravo_a = repo.create_app(&NewApp::new("bravo")).unwrap();
    let bravo_b = repo.create_app(&NewApp::new("bravo")).unwrap();

    let all = repo.list_apps(&AppListQuery::default()).unwrap();
    let names: Vec<&str> = all.iter().map(|app| app.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "bravo", "bravo", "charlie"]);

    let mut bravo_ids = vec![bravo_a.id.to_string(), bravo_b.id.to_string()];
    bravo_ids.sort();
    assert_eq!(all[1].id.to_string(), bravo_ids[0]);
    assert_eq!(all[2].id.to_string(), bravo_ids[1]);

    let active = repo
        .list_apps(&AppListQuery {
            is_active: Some(true),
            ..AppListQuery::default()
        })
        .unwrap();
    assert_eq!(active.len(), 3);
    assert!(active.iter().all(|app| app.is_active));

    let inactive = repo
        .list_apps(&AppListQuery {
            is_active: Some(false),
            ..AppListQuery::default()
        })
        .unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].name, "alpha");
}

#[test]
fn list_supports_limit_and_offset() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAppRepository::try_new(&conn).unwrap();
    for name in ["a", "b", "c", "d"] {
        repo.create_app(&NewApp::new(name)).unwrap();
    }

    let page = repo
        .list_apps(&AppListQuery {
            limit: Some(2),
            offset: 1,
            ..AppListQuery::default()
        })
        .unwrap();
    let names: Vec<&str> = page.iter().map(|app| app.name.as_str()).collect();
    assert_eq!(names, vec!["b", "c"]);

    let tail = repo
        .list_apps(&AppListQuery {
            offset: 3,
            ..AppListQuery::default()
        })
        .unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].name, "d");
}

#[test]
fn corrupt_metadata_is_reported_not_masked() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAppRepository::try_new(&conn).unwrap();
    let app = repo.create_app(&NewApp::new("Broken")).unwrap();

    conn.execute(
        "UPDATE apps SET metadata = 'not json' WHERE uuid = ?1;",
        [app.id.to_string()],
    )
    .unwrap();

    let err = repo.get_app(app.id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("apps.metadata")));
}

#[test]
fn service_activate_and_deactivate_update_instance_and_storage() {
    let conn = open_db_in_memory().unwrap();
    let service = AppService::new(SqliteAppRepository::try_new(&conn).unwrap());

    let mut app = service.create_app(&NewApp::new("Toggle")).unwrap();
    service.deactivate(&mut app).unwrap();
    assert!(!app.is_active);
    assert!(!service.get_app(app.id).unwrap().unwrap().is_active);

    service.activate(&mut app).unwrap();
    assert!(app.is_active);
    assert!(service.get_app(app.id).unwrap().unwrap().is_active);
}
