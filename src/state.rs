use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{
    cache::TtlCache,
    db::{DbPool, OrmConn},
    email::{LogMailer, Mailer},
    models::Product,
    payment::{DevGateway, PaymentGateway},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub mailer: Arc<dyn Mailer>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub product_cache: Arc<TtlCache<Uuid, Product>>,
}

impl AppState {
    /// State with the default collaborators (log mailer, dev gateway).
    pub fn new(pool: DbPool, orm: OrmConn) -> Self {
        Self::with_collaborators(pool, orm, Arc::new(LogMailer), Arc::new(DevGateway))
    }

    pub fn with_collaborators(
        pool: DbPool,
        orm: OrmConn,
        mailer: Arc<dyn Mailer>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            pool,
            orm,
            mailer,
            gateway,
            product_cache: Arc::new(TtlCache::new(Duration::from_secs(60))),
        }
    }
}
