pub mod model_metadata;
pub mod model_storage;
pub mod digest;
pub mod fetcher;
pub mod config;

pub use model_metadata::{ModelMetadata, MODEL_OBJECT_KEY};
pub use model_storage::LocalArtifact;
pub use digest::{sha256_hex, sha256_file, digest_matches};
pub use fetcher::RemoteModelFetcher;
pub use config::{AppConfig, RemoteSettings, StorageSettings, NetworkSettings};
