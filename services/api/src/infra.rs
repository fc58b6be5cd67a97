use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use estate_market::marketplace::announcements::AnnouncementService;
use estate_market::marketplace::catalog::CatalogService;
use estate_market::marketplace::favorites::FavoriteService;
use estate_market::marketplace::messaging::MessagingService;
use estate_market::marketplace::promotions::PromotionService;
use estate_market::marketplace::store::MemoryStore;
use estate_market::marketplace::subscriptions::SubscriptionService;
use estate_market::marketplace::users::{Role, User, UserDirectory};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every service wired over the shared in-memory store.
pub(crate) struct Services {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) announcements: Arc<AnnouncementService<MemoryStore, MemoryStore>>,
    pub(crate) catalog: Arc<CatalogService<MemoryStore, MemoryStore>>,
    pub(crate) promotions: Arc<PromotionService<MemoryStore, MemoryStore>>,
    pub(crate) favorites: Arc<FavoriteService<MemoryStore, MemoryStore, MemoryStore>>,
    pub(crate) messaging: Arc<MessagingService<MemoryStore>>,
    pub(crate) subscriptions: Arc<SubscriptionService<MemoryStore>>,
}

impl Services {
    pub(crate) fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let users: Arc<dyn UserDirectory> = store.clone();
        Self {
            announcements: Arc::new(AnnouncementService::new(
                store.clone(),
                store.clone(),
                users.clone(),
            )),
            catalog: Arc::new(CatalogService::new(
                store.clone(),
                store.clone(),
                users.clone(),
            )),
            promotions: Arc::new(PromotionService::new(store.clone(), store.clone())),
            favorites: Arc::new(FavoriteService::new(
                store.clone(),
                store.clone(),
                store.clone(),
            )),
            messaging: Arc::new(MessagingService::new(store.clone(), users)),
            subscriptions: Arc::new(SubscriptionService::new(store.clone())),
            store,
        }
    }

    pub(crate) fn directory(&self) -> Arc<dyn UserDirectory> {
        self.store.clone()
    }
}

/// Seeds the bootstrap admin so a fresh instance is reachable. The
/// minted token is logged once at startup.
pub(crate) fn seed_admin(store: &MemoryStore) -> (User, String) {
    store.add_user("Root", "Admin", "admin@estate.local", Role::Admin)
}
