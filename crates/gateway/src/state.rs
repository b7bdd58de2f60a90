use std::{sync::Arc, time::Instant};

use folio_retrieval::RetrievalService;

use crate::extract::TextExtractor;

/// Shared state handed to every handler.
pub struct GatewayState {
    pub service: Arc<RetrievalService>,
    pub extractor: Arc<dyn TextExtractor>,
    pub version: String,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(service: Arc<RetrievalService>, extractor: Arc<dyn TextExtractor>) -> Arc<Self> {
        Arc::new(Self {
            service,
            extractor,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
