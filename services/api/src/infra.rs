use metrics_exporter_prometheus::PrometheusHandle;
use rental_market::marketplace::{
    AuthService, InMemoryListingStore, InMemoryUserStore, ListingService, TokenIssuer,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type Accounts = AuthService<InMemoryUserStore>;
pub(crate) type Listings = ListingService<InMemoryListingStore, InMemoryUserStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Account and listing services sharing one in-process user store.
pub(crate) fn marketplace_services(tokens: TokenIssuer) -> (Arc<Accounts>, Arc<Listings>) {
    let users = Arc::new(InMemoryUserStore::default());
    let listings = Arc::new(InMemoryListingStore::default());
    (
        Arc::new(AuthService::new(users.clone(), tokens)),
        Arc::new(ListingService::new(listings, users)),
    )
}
