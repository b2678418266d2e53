pub mod changelog;
pub mod cloner;
pub mod commit;
pub mod comparer;
pub mod config;
pub mod credentials;
pub mod error;
pub mod notifier;
pub mod provenance;
pub mod repository;
pub mod resolver;
pub mod sources;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixture;

// Re-exports for easy access
pub use cloner::{ClonedRepository, Cloner, Git2Transport, Transport};
pub use commit::{Change, Commit};
pub use comparer::ImageComparer;
pub use config::{CloneProtocol, Options};
pub use error::CompareError;
pub use notifier::Notifier;
pub use repository::RepositoryIdentity;
pub use sources::{ArchiveSource, DockerSource, RegistrySource, Source};
