//! # Cinelore: Film Knowledge Ingestion & Retrieval Engine
//!
//! Cinelore builds per-film knowledge records by fanning out over pluggable
//! content sources, chunking what they return into bounded fragments, and
//! serving lexical retrieval over the result. Records live in a fast
//! in-process tier backed by an optional SQLite durable tier.
//!
//! ## Core Concepts
//!
//! - **Sources**: Async collaborators behind the [`sources`] traits; one
//!   primary metadata source gates a record's existence, content sources
//!   enrich it and fail independently
//! - **Chunks**: Deterministic, bounded text fragments produced by the
//!   [`chunker`], tagged with their origin source
//! - **Store**: The shared [`store::KnowledgeStore`], an arena of per-film
//!   records with derived readiness
//! - **Pipeline**: The [`ingest::IngestPipeline`] orchestrator, which settles
//!   every source and streams progress events over an [`events::EventBus`]
//! - **Retrieval**: Stopword-aware token-overlap ranking in [`retrieval`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cinelore::ingest::IngestPipeline;
//! use cinelore::retrieval::retrieve_for_film;
//! use cinelore::store::KnowledgeStore;
//! use cinelore::types::{FilmId, SourceId};
//! # use cinelore::sources::MetadataSource;
//! # async fn run(metadata_source: Arc<dyn MetadataSource>) {
//!
//! let store = Arc::new(KnowledgeStore::new(SourceId::from("metadata")));
//! let pipeline = IngestPipeline::new(store.clone(), metadata_source);
//!
//! let film = FilmId::new(603);
//! let report = pipeline.ingest(film).await.unwrap();
//! println!("ready: {}", report.ready);
//!
//! let hits = retrieve_for_film(&store, film, "what does the ending mean", 7);
//! # }
//! ```

pub mod chunker;
pub mod config;
pub mod events;
pub mod ingest;
pub mod retrieval;
pub mod sources;
pub mod store;
pub mod telemetry;
pub mod types;
