//! Firestore REST API client for the JobPort backend.
//!
//! This crate provides:
//! - Typed repositories for users, employers, jobs and applications
//! - Service account authentication via gcp_auth
//! - Structured queries, merge updates and retry logic
//! - Optimistic-concurrency counter updates (job views, application counts)

pub mod applications;
pub mod client;
pub mod employers;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod retry;
pub mod token_cache;
pub mod types;
pub mod users;

pub use applications::ApplicationRepository;
pub use client::{FirestoreClient, FirestoreConfig};
pub use employers::EmployerRepository;
pub use error::{FirestoreError, FirestoreResult};
pub use jobs::JobRepository;
pub use types::{Document, Filter, FromFirestoreValue, StructuredQuery, ToFirestoreValue, Value};
pub use users::UserRepository;
