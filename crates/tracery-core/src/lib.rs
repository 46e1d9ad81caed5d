//! Tracery Core Library
//!
//! This crate holds the background-side engine state that does not touch the
//! browser directly: the tracker knowledge base, host classification, and the
//! per-tab observation store that drives the toolbar badge.
//!
//! # Architecture
//!
//! The knowledge base is parsed once per session and is read-only afterwards.
//! A [`Classifier`] borrows it and answers category and threat questions as
//! pure reads. The [`ObservationStore`] is the only mutable state here; it is
//! owned by the control plane and updated once per intercepted request.
//!
//! # Modules
//!
//! - `types`: Shared type definitions
//! - `url`: Host extraction and domain-list matching
//! - `knowledge`: Knowledge base loader
//! - `classifier`: Category and threat assessment
//! - `observe`: Per-tab observation store and badge projection
//! - `settings`: Persisted settings document
//! - `profile`: Privacy profile presets
//! - `store`: Key-value storage port

pub mod classifier;
pub mod knowledge;
pub mod observe;
pub mod profile;
pub mod settings;
pub mod store;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use classifier::{keyword_category, Assessment, Classifier, MatchKind, RecordMatch};
pub use knowledge::{KnowledgeBase, KnowledgeError};
pub use observe::{ObservationStore, ObserveOutcome, ObservedRequest, TabObservation};
pub use profile::{PrivacyProfile, ProfileSettings};
pub use settings::StoredSettings;
pub use store::{load_settings, KeyValueStore, MemoryStore, StoreError};
pub use types::{
    Badge, BadgeColor, Category, CategoryDefault, DataCollection, FingerprintAttempt, ResourceType,
    TabId, TabStatistics, ThreatAttempt, ThreatLevel, TrackerRecord,
};
pub use url::{extract_host, is_same_or_subdomain, matches_domain_list};
