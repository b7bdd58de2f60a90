//! Configuration for folio: schema, file discovery, and `${ENV}` substitution.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{discover_and_load, find_config_file, load_config},
    schema::{
        ChunkingConfig, EmbeddingBackend, EmbeddingsConfig, FolioConfig, RetrievalConfig,
        ServerConfig,
    },
};
