use std::sync::Arc;

use super::{
    config::Config,
    database::Store,
    limit::{FixedWindow, RATE_LIMIT_MAX, RATE_LIMIT_WINDOW},
};

pub struct State {
    pub config: Config,
    pub store: Store,
    pub limiter: FixedWindow,
}

impl State {
    pub fn new() -> Arc<Self> {
        Self::with_config(Config::load())
    }

    pub fn with_config(config: Config) -> Arc<Self> {
        let store = Store::new(&config.mongodb_uri);
        let limiter = FixedWindow::new(RATE_LIMIT_MAX, RATE_LIMIT_WINDOW);

        Arc::new(Self {
            config,
            store,
            limiter,
        })
    }
}
