use std::sync::Arc;

use crate::{config::Config, database::MongoStore, store::WaitlistStore};

pub struct State<S = MongoStore> {
    pub config: Config,
    pub store: S,
}

impl<S: WaitlistStore> State<S> {
    pub fn with_store(config: Config, store: S) -> Arc<Self> {
        Arc::new(Self { config, store })
    }
}

impl State<MongoStore> {
    /// No connection is made here, the store dials on first use.
    pub fn new(config: Config) -> Arc<Self> {
        let store = MongoStore::from_config(&config);

        Self::with_store(config, store)
    }
}
