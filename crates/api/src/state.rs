//! Services shared by every request handler.

use checkout::{
    CheckoutCoordinator, NotificationDispatcher, OrderAdmin, Registrar, SettingsResolver,
};
use domain::{CatalogService, PurchaseLedger};
use event_store::EventStore;
use projections::{OrderBookView, ProfitReporter, Projection, ProjectionProcessor};

pub struct AppState<S: EventStore + Clone> {
    pub checkout: CheckoutCoordinator<S>,
    pub registrar: Registrar<S>,
    pub orders: OrderAdmin<S>,
    pub settings: SettingsResolver<S>,
    pub catalog: CatalogService<S>,
    pub purchases: PurchaseLedger<S>,
    pub reports: ProfitReporter<S>,
    pub order_book: OrderBookView,
    pub processor: ProjectionProcessor<S>,
    pub notifications: NotificationDispatcher,
}

impl<S: EventStore + Clone + 'static> AppState<S> {
    /// Wires every service to one store and one notification queue.
    pub fn new(
        store: S,
        notifications: NotificationDispatcher,
        verification_ttl: chrono::Duration,
    ) -> Self {
        let order_book = OrderBookView::new();
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(order_book.clone()) as Box<dyn Projection>);

        Self {
            checkout: CheckoutCoordinator::new(store.clone(), notifications.clone()),
            registrar: Registrar::new(store.clone(), notifications.clone())
                .with_verification_ttl(verification_ttl),
            orders: OrderAdmin::new(store.clone(), notifications.clone()),
            settings: SettingsResolver::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            purchases: PurchaseLedger::new(store.clone()),
            reports: ProfitReporter::new(store),
            order_book,
            processor,
            notifications,
        }
    }
}
