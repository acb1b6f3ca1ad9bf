use metrics_exporter_prometheus::PrometheusHandle;
use review_rewards::workflows::reviews::{
    CatalogService, MemoryCatalog, MemoryReviewStore, MemoryUserStore, ReviewApi, ReviewService,
    SeedError, SeedFixture, SeedSummary, TokenIdentity,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryReviewService =
    ReviewService<MemoryUserStore, MemoryReviewStore, MemoryCatalog>;
pub(crate) type MemoryReviewApi = ReviewApi<MemoryUserStore, MemoryReviewStore, MemoryCatalog>;

/// In-process stores and services backing both the HTTP server and the CLI demo.
#[derive(Clone)]
pub(crate) struct ReviewStack {
    pub(crate) users: Arc<MemoryUserStore>,
    pub(crate) reviews: Arc<MemoryReviewService>,
    pub(crate) catalog: Arc<CatalogService<MemoryCatalog>>,
    pub(crate) identity: TokenIdentity,
}

impl ReviewStack {
    pub(crate) fn in_memory() -> Self {
        let users = Arc::new(MemoryUserStore::default());
        let store = Arc::new(MemoryCatalog::default());
        let reviews = Arc::new(ReviewService::new(
            users.clone(),
            Arc::new(MemoryReviewStore::default()),
            store.clone(),
        ));
        Self {
            users,
            reviews,
            catalog: Arc::new(CatalogService::new(store)),
            identity: TokenIdentity::default(),
        }
    }

    pub(crate) fn seed(&self, fixture: &SeedFixture) -> Result<SeedSummary, SeedError> {
        fixture.apply(self.catalog.as_ref(), self.users.as_ref(), &self.identity)
    }

    pub(crate) fn api(&self) -> MemoryReviewApi {
        ReviewApi {
            reviews: self.reviews.clone(),
            catalog: self.catalog.clone(),
            identity: Arc::new(self.identity.clone()),
        }
    }
}

/// Fixture from `path`, or the built-in catalog when no file is configured.
pub(crate) fn load_fixture(path: Option<&Path>) -> Result<SeedFixture, SeedError> {
    match path {
        Some(path) => SeedFixture::from_path(path),
        None => Ok(SeedFixture::standard()),
    }
}
