use std::sync::Arc;

use tempfile::TempDir;
use voicenotes_lib::{
    catalog::NoteCatalog,
    db::{Database, VOICE_NOTES_KEY},
    models::{AppSettings, NewVoiceNote, PlaybackSpeed, Theme, VoiceNote},
    settings::SettingsStore,
};

fn open(dir: &TempDir) -> Database {
    Database::new(dir.path().join("voicenotes.sqlite3")).expect("open database")
}

#[tokio::test]
async fn rename_then_delete_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("recording-1700000000000.wav");
    std::fs::write(&audio, vec![0u8; 4096]).unwrap();

    let catalog = NoteCatalog::new(Arc::new(open(&dir)));
    let created = catalog
        .create(NewVoiceNote {
            uri: audio.to_string_lossy().into_owned(),
            title: "Recording 1".into(),
            duration: 12,
            date: "2024-03-01T09:15:00.000Z".into(),
            size: 4096,
        })
        .await
        .unwrap();
    assert_eq!(catalog.list().await, vec![created.clone()]);

    let renamed = catalog
        .update(VoiceNote {
            title: "Meeting notes".into(),
            date: String::new(),
            ..created.clone()
        })
        .await
        .unwrap();
    assert_eq!(renamed.title, "Meeting notes");
    assert_eq!(renamed.date, created.date);
    assert_eq!(renamed.duration, 12);
    assert_eq!(renamed.size, 4096);
    assert_eq!(catalog.list().await, vec![renamed.clone()]);

    assert!(catalog.delete(&created.id).await.unwrap());
    assert!(catalog.list().await.is_empty());
    assert!(!audio.exists());
}

#[tokio::test]
async fn notes_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let created = {
        let catalog = NoteCatalog::new(Arc::new(open(&dir)));
        catalog
            .create(NewVoiceNote {
                uri: "/nonexistent/recording-1.wav".into(),
                title: "Groceries".into(),
                duration: 4,
                date: "2024-03-01T09:15:00.000Z".into(),
                size: 10,
            })
            .await
            .unwrap()
    };

    let database = open(&dir);
    let raw = database.get_item(VOICE_NOTES_KEY).await.unwrap().unwrap();
    assert!(raw.contains("\"title\":\"Groceries\""));

    let catalog = NoteCatalog::new(Arc::new(database));
    assert_eq!(catalog.list().await, vec![created]);
}

#[tokio::test]
async fn settings_round_trip_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::new(Arc::new(open(&dir)));
    assert_eq!(store.get().await, None);

    let chosen = AppSettings {
        playback_speed: PlaybackSpeed::OneAndQuarter,
        theme: Theme::Light,
        ..AppSettings::default()
    };
    store.set(&chosen).await.unwrap();

    let reopened = SettingsStore::new(Arc::new(open(&dir)));
    assert_eq!(reopened.get().await, Some(chosen));
}
