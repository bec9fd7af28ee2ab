use std::sync::Arc;

use cinelore::store::{KnowledgeStore, DEFAULT_READINESS_THRESHOLD};
use cinelore::types::{Chunk, FilmId, FilmMetadata, RatingSlot, SourceId};

fn metadata(title: &str) -> FilmMetadata {
    FilmMetadata {
        title: title.to_string(),
        ..Default::default()
    }
}

fn chunk_batch(film: FilmId, source: &SourceId, offset: usize, count: usize) -> Vec<Chunk> {
    (0..count)
        .map(|i| Chunk {
            id: Chunk::id_for(film, source, offset + i),
            film_id: film,
            source: source.clone(),
            text: format!("passage {} from {source}", offset + i),
            metadata: None,
        })
        .collect()
}

#[test]
fn missing_records_answer_softly() {
    let store = KnowledgeStore::new(SourceId::from("metadata"));
    let film = FilmId::new(1);
    assert!(!store.contains(film));
    assert!(store.get(film).is_none());
    assert!(!store.is_ready(film));
    assert_eq!(store.chunk_count(film), 0);
    assert!(!store.append_chunks(film, vec![]));
    assert!(!store.mark_source_loaded(film, &SourceId::from("reviews")));
}

#[test]
fn init_is_idempotent_and_never_resets_progress() {
    let store = KnowledgeStore::new(SourceId::from("metadata"));
    let film = FilmId::new(2);
    assert!(store.init_if_absent(film, metadata("Stalker")));

    let reviews = SourceId::from("reviews");
    store.append_chunks(film, chunk_batch(film, &reviews, 0, 3));
    store.mark_source_loaded(film, &reviews);

    // A concurrent second ingestion initializing again must not clobber.
    assert!(!store.init_if_absent(film, metadata("Different Title")));
    let record = store.get(film).unwrap();
    assert_eq!(record.metadata.title, "Stalker");
    assert_eq!(record.chunks.len(), 3);
    assert!(record.has_source(&reviews));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_init_inserts_exactly_once() {
    let store = Arc::new(KnowledgeStore::new(SourceId::from("metadata")));
    let film = FilmId::new(3);

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.init_if_absent(film, metadata(&format!("candidate {i}")))
        }));
    }
    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
    assert!(store.contains(film));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_appends_lose_nothing() {
    let store = Arc::new(KnowledgeStore::new(SourceId::from("metadata")));
    let film = FilmId::new(4);
    store.init_if_absent(film, metadata("Heat"));

    let mut handles = Vec::new();
    for task in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let source = SourceId::from(format!("source-{task}"));
            store.append_chunks(film, chunk_batch(film, &source, 0, 10));
            store.mark_source_loaded(film, &source);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let record = store.get(film).unwrap();
    assert_eq!(record.chunks.len(), 80);
    assert_eq!(record.loaded_sources.len(), 8);
}

#[test]
fn readiness_requires_primary_and_threshold() {
    let store = KnowledgeStore::new(SourceId::from("metadata"));
    let film = FilmId::new(5);
    store.init_if_absent(film, metadata("Solaris"));
    assert!(!store.is_ready(film));

    // Threshold reached without the primary: still not ready.
    for name in ["reviews", "discussions", "criticism"] {
        store.mark_source_loaded(film, &SourceId::from(name));
    }
    assert_eq!(store.loaded_sources(film).len(), DEFAULT_READINESS_THRESHOLD);
    assert!(!store.is_ready(film));

    store.mark_source_loaded(film, &SourceId::from("metadata"));
    assert!(store.is_ready(film));
}

#[test]
fn marking_a_source_twice_counts_once() {
    let store = KnowledgeStore::new(SourceId::from("metadata"));
    let film = FilmId::new(6);
    store.init_if_absent(film, metadata("Ran"));

    let reviews = SourceId::from("reviews");
    store.mark_source_loaded(film, &reviews);
    store.mark_source_loaded(film, &reviews);
    store.mark_source_loaded(film, &SourceId::from("metadata"));
    assert_eq!(store.loaded_sources(film).len(), 2);
    assert!(!store.is_ready(film));
}

#[test]
fn films_are_isolated_from_each_other() {
    let store = KnowledgeStore::new(SourceId::from("metadata"));
    let first = FilmId::new(7);
    let second = FilmId::new(8);
    store.init_if_absent(first, metadata("Alien"));
    store.init_if_absent(second, metadata("Aliens"));

    let reviews = SourceId::from("reviews");
    store.append_chunks(first, chunk_batch(first, &reviews, 0, 2));

    assert_eq!(store.chunk_count(first), 2);
    assert_eq!(store.chunk_count(second), 0);
}

#[test]
fn derived_summary_preserves_rating_slots() {
    let store = KnowledgeStore::new(SourceId::from("metadata"));
    let film = FilmId::new(9);
    store.init_if_absent(film, metadata("Seven"));

    store.set_external_rating(film, RatingSlot::Audience, "4.1/5".to_string());
    store.set_external_rating(film, RatingSlot::Critic, "82%".to_string());

    let summary = cinelore::types::DerivedSummary {
        critics: "Praised the craft".to_string(),
        audiences: "Loved the twist".to_string(),
        tension: "Bleakness divides".to_string(),
        starter_prompts: vec!["Why that ending?".to_string()],
    };
    store.set_sentiment(film, &summary);
    store.set_starter_prompts(film, summary.starter_prompts.clone());

    let record = store.get(film).unwrap();
    assert_eq!(record.sentiment.critics, "Praised the craft");
    assert_eq!(record.sentiment.audience_rating.as_deref(), Some("4.1/5"));
    assert_eq!(record.sentiment.critic_score.as_deref(), Some("82%"));
    assert_eq!(record.starter_prompts.len(), 1);
}

#[test]
fn custom_readiness_threshold_is_honored() {
    let store =
        KnowledgeStore::new(SourceId::from("metadata")).with_readiness_threshold(1);
    let film = FilmId::new(10);
    store.init_if_absent(film, metadata("Brazil"));
    store.mark_source_loaded(film, &SourceId::from("metadata"));
    assert!(store.is_ready(film));
}
