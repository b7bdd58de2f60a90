//! Gateway: the HTTP boundary in front of the retrieval service.
//!
//! Lifecycle:
//! 1. Validate config, build the embedding provider and retrieval service
//! 2. Bind the listener
//! 3. Serve `/`, `/health`, `/upload`, `/ask` until Ctrl-C
//!
//! Retrieval logic lives in `folio-retrieval`; this crate only extracts PDF
//! text, maps requests onto service calls and errors onto status codes.

pub mod error;
pub mod extract;
pub mod server;
pub mod state;
