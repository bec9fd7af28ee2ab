#![cfg(feature = "sqlite")]

use std::sync::Arc;

use cinelore::config::EngineConfig;
use cinelore::store::{DurableStore, KnowledgeRecord, KnowledgeStore, SqliteDurable};
use cinelore::types::{Chunk, FilmId, FilmMetadata, SourceId};
use tempfile::TempDir;

/// File-backed database so every pooled connection sees the same data.
async fn durable(dir: &TempDir) -> SqliteDurable {
    let path = dir.path().join("knowledge.db");
    let url = format!("sqlite://{}?mode=rwc", path.display());
    SqliteDurable::connect(&url)
        .await
        .expect("connect and migrate")
}

fn record_with_chunks(film: FilmId, count: usize) -> KnowledgeRecord {
    let source = SourceId::from("reviews");
    let mut record = KnowledgeRecord::new(
        film,
        FilmMetadata {
            title: "Playtime".to_string(),
            release_date: Some("1967-12-16".to_string()),
            ..Default::default()
        },
    );
    record.chunks = (0..count)
        .map(|i| Chunk {
            id: Chunk::id_for(film, &source, i),
            film_id: film,
            source: source.clone(),
            text: format!("passage {i} about modernist architecture"),
            metadata: (i == 0).then(|| serde_json::json!({"url": "https://example.test"})),
        })
        .collect();
    record.loaded_sources = vec![SourceId::from("metadata"), source];
    record.sentiment.audience_rating = Some("4.3/5".to_string());
    record.starter_prompts = vec!["What is Tativille?".to_string()];
    record
}

#[tokio::test]
async fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let durable = durable(&dir).await;

    let film = FilmId::new(9428);
    let record = record_with_chunks(film, 4);
    durable.save_record(&record).await.unwrap();

    let loaded = durable.load_record(film).await.unwrap().unwrap();
    assert_eq!(loaded.metadata.title, "Playtime");
    assert_eq!(loaded.chunks.len(), 4);
    assert_eq!(loaded.chunks[0].metadata, record.chunks[0].metadata);
    assert_eq!(loaded.loaded_sources, record.loaded_sources);
    assert_eq!(loaded.sentiment.audience_rating.as_deref(), Some("4.3/5"));
    assert_eq!(loaded.starter_prompts, record.starter_prompts);
    // Chunk order is the record's order.
    for (i, chunk) in loaded.chunks.iter().enumerate() {
        assert_eq!(chunk.text, format!("passage {i} about modernist architecture"));
    }
}

#[tokio::test]
async fn missing_film_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let durable = durable(&dir).await;
    assert!(durable.load_record(FilmId::new(404)).await.unwrap().is_none());
}

#[tokio::test]
async fn resave_replaces_the_chunk_set() {
    let dir = tempfile::tempdir().unwrap();
    // Tiny batch size exercises the multi-statement insert path.
    let durable = durable(&dir).await.with_chunk_batch(2);

    let film = FilmId::new(77);
    durable.save_record(&record_with_chunks(film, 5)).await.unwrap();

    let mut smaller = record_with_chunks(film, 2);
    smaller.metadata.title = "Playtime (restored)".to_string();
    durable.save_record(&smaller).await.unwrap();

    let loaded = durable.load_record(film).await.unwrap().unwrap();
    assert_eq!(loaded.metadata.title, "Playtime (restored)");
    // Stale rows from the first save are gone.
    assert_eq!(loaded.chunks.len(), 2);
}

#[tokio::test]
async fn store_round_trips_through_the_durable_tier() {
    let dir = tempfile::tempdir().unwrap();
    let durable = Arc::new(durable(&dir).await);

    let film = FilmId::new(301);
    let writer = KnowledgeStore::new(SourceId::from("metadata")).with_durable(durable.clone());
    let record = record_with_chunks(film, 3);
    writer.init_if_absent(film, record.metadata.clone());
    writer.append_chunks(film, record.chunks.clone());
    writer.mark_source_loaded(film, &SourceId::from("metadata"));
    assert!(writer.save_to_durable(film).await);

    // A fresh store (fresh process, same database) recovers the record.
    let reader = KnowledgeStore::new(SourceId::from("metadata")).with_durable(durable);
    assert!(!reader.contains(film));
    assert!(reader.load_from_durable(film).await);
    let loaded = reader.get(film).unwrap();
    assert_eq!(loaded.chunks.len(), 3);
    assert!(loaded.has_source(&SourceId::from("metadata")));
}

#[tokio::test]
async fn config_opens_the_durable_tier() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.db");
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let config = EngineConfig::default()
        .with_database_url(url)
        .with_persist_batch(2);
    let durable = config.open_durable().await.unwrap().expect("url configured");

    let film = FilmId::new(612);
    durable.save_record(&record_with_chunks(film, 5)).await.unwrap();
    let loaded = durable.load_record(film).await.unwrap().unwrap();
    assert_eq!(loaded.chunks.len(), 5);

    // No URL means no durable tier, not an error.
    let none = EngineConfig::default().without_durable();
    assert!(none.open_durable().await.unwrap().is_none());
}

#[tokio::test]
async fn durable_load_never_clobbers_live_records() {
    let dir = tempfile::tempdir().unwrap();
    let durable = Arc::new(durable(&dir).await);

    let film = FilmId::new(500);
    // Persist one version.
    let seed = KnowledgeStore::new(SourceId::from("metadata")).with_durable(durable.clone());
    seed.init_if_absent(film, FilmMetadata::default());
    seed.save_to_durable(film).await;

    // A store with a live in-memory record ignores the durable copy.
    let live = KnowledgeStore::new(SourceId::from("metadata")).with_durable(durable);
    live.init_if_absent(
        film,
        FilmMetadata {
            title: "In Flight".to_string(),
            ..Default::default()
        },
    );
    assert!(live.load_from_durable(film).await);
    assert_eq!(live.get(film).unwrap().metadata.title, "In Flight");
}
