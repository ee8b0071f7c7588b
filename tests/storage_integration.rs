//! Integration tests for the storage stack through the public facade

use std::sync::Once;

use chrono::{DateTime, TimeZone, Utc};
use shower_tracker_core::domain::LAST_NOTIFICATION_CHECK_KEY;
use shower_tracker_core::{
    DataStore, SettingsUpdate, ShowerPatch, StorageConfig, StorageFacade, StorageVerdict, Theme,
    UserSettings,
};
use tempfile::TempDir;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

fn at(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
}

/// Config whose primary database path cannot exist, forcing the key-value
/// fallback
fn blocked_primary_config(dir: &TempDir) -> StorageConfig {
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    StorageConfig {
        db_path: blocker.join("nested").join("showers.db"),
        fallback_dir: dir.path().join("fallback"),
    }
}

#[tokio::test]
async fn healthy_environment_runs_on_the_structured_store() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::in_dir(dir.path());

    let facade = StorageFacade::connect(&config);
    assert_eq!(facade.verdict(), StorageVerdict::Structured);
    assert!(facade.is_storage_available());

    let first = facade
        .add_shower(at(10, 8), Some("Morning".to_string()))
        .await
        .unwrap();
    let second = facade.add_shower(at(12, 20), None).await.unwrap();
    facade.add_shower(at(11, 9), None).await.unwrap();

    // Newest first, regardless of insertion order
    let all = facade.get_all_showers().await.unwrap();
    let timestamps: Vec<_> = all.iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![at(12, 20), at(11, 9), at(10, 8)]);

    let last = facade.get_last_shower().await.unwrap().unwrap();
    assert_eq!(last.id, second.id);

    // Range bounds are inclusive on both ends
    let in_range = facade
        .get_showers_in_range(at(10, 8), at(11, 9))
        .await
        .unwrap();
    assert_eq!(in_range.len(), 2);

    facade
        .update_shower(&first.id, ShowerPatch::notes(Some("Evening".to_string())))
        .await
        .unwrap();
    let updated = facade
        .get_all_showers()
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.id == first.id)
        .unwrap();
    assert_eq!(updated.notes.as_deref(), Some("Evening"));

    facade.delete_shower(&second.id).await.unwrap();
    assert_eq!(facade.get_all_showers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn data_survives_a_reconnect() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::in_dir(dir.path());

    {
        let facade = StorageFacade::connect(&config);
        facade
            .add_shower(at(10, 8), Some("Persisted".to_string()))
            .await
            .unwrap();
        facade
            .save_settings(&UserSettings {
                theme: Theme::Dark,
                ..UserSettings::default()
            })
            .await
            .unwrap();
        facade.set_last_notification_check(at(11, 7)).await.unwrap();
    }

    let facade = StorageFacade::connect(&config);
    let all = facade.get_all_showers().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].notes.as_deref(), Some("Persisted"));
    assert_eq!(facade.get_settings().await.unwrap().theme, Theme::Dark);
    assert_eq!(
        facade.get_last_notification_check().await.unwrap(),
        Some(at(11, 7))
    );
}

#[tokio::test]
async fn blocked_primary_falls_back_to_key_value_files() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = blocked_primary_config(&dir);

    let facade = StorageFacade::connect(&config);
    assert_eq!(facade.verdict(), StorageVerdict::KeyValue);

    // The same operations work against the fallback store
    let event = facade
        .add_shower(at(10, 8), Some("Fallback".to_string()))
        .await
        .unwrap();
    facade
        .update_shower(&event.id, ShowerPatch::timestamp(at(12, 8)))
        .await
        .unwrap();

    let all = facade.get_all_showers().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].timestamp, at(12, 8));

    // And the data lives in the fallback slot files, surviving reconnects
    assert!(config.fallback_dir.join("showers.json").exists());
    let reopened = StorageFacade::connect(&config);
    assert_eq!(reopened.verdict(), StorageVerdict::KeyValue);
    assert_eq!(reopened.get_all_showers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn settings_are_a_singleton_with_last_write_winning() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let facade = StorageFacade::connect(&StorageConfig::in_dir(dir.path()));

    // First read materializes the defaults
    assert_eq!(facade.get_settings().await.unwrap(), UserSettings::default());

    facade
        .save_settings(&UserSettings {
            theme: Theme::Light,
            notifications_enabled: true,
            ..UserSettings::default()
        })
        .await
        .unwrap();

    // A single-field update leaves every other field alone
    let merged = facade
        .update_setting(SettingsUpdate::NotificationThresholdDays(5))
        .await
        .unwrap();
    assert_eq!(merged.theme, Theme::Light);
    assert!(merged.notifications_enabled);
    assert_eq!(merged.notification_threshold_days, 5);

    assert_eq!(facade.get_settings().await.unwrap(), merged);
}

#[tokio::test]
async fn metadata_upserts_by_key() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let facade = StorageFacade::connect(&StorageConfig::in_dir(dir.path()));

    facade.set_metadata("app_version", "1.0").await.unwrap();
    facade.set_metadata("app_version", "1.1").await.unwrap();
    facade
        .set_metadata(LAST_NOTIFICATION_CHECK_KEY, "2024-03-10T08:00:00.000Z")
        .await
        .unwrap();

    assert_eq!(
        facade.get_metadata("app_version").await.unwrap().as_deref(),
        Some("1.1")
    );
    assert_eq!(facade.all_metadata().await.unwrap().len(), 2);

    facade.delete_metadata("app_version").await.unwrap();
    assert_eq!(facade.get_metadata("app_version").await.unwrap(), None);
}

#[tokio::test]
async fn clear_all_wipes_every_table_but_keeps_the_store_usable() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let facade = StorageFacade::connect(&StorageConfig::in_dir(dir.path()));

    facade.add_shower(at(10, 8), None).await.unwrap();
    facade.set_metadata("k", "v").await.unwrap();
    facade
        .save_settings(&UserSettings {
            theme: Theme::Dark,
            ..UserSettings::default()
        })
        .await
        .unwrap();

    facade.clear_all().await.unwrap();

    assert!(facade.get_all_showers().await.unwrap().is_empty());
    assert!(facade.all_metadata().await.unwrap().is_empty());
    assert_eq!(facade.get_settings().await.unwrap(), UserSettings::default());

    facade.add_shower(at(11, 8), None).await.unwrap();
    assert_eq!(facade.get_all_showers().await.unwrap().len(), 1);
}

#[test]
fn export_bundles_showers_settings_and_metadata() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    tokio_test::block_on(async {
        let facade = StorageFacade::connect(&StorageConfig::in_dir(dir.path()));
        facade
            .add_shower(at(10, 8), Some("Morning".to_string()))
            .await
            .unwrap();
        facade.set_metadata("k", "v").await.unwrap();

        let export = facade.export_data().await.unwrap();
        assert_eq!(export.showers.len(), 1);
        assert_eq!(export.settings, UserSettings::default());
        assert_eq!(export.metadata.get("k").map(String::as_str), Some("v"));

        // Exports serialize cleanly for backup files
        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("Morning"));
    });
}
