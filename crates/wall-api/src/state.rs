use std::sync::Arc;

use wall_db::Database;

use crate::blocklist::Blocklist;
use crate::count::CountCache;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub blocklist: Blocklist,
    pub count_cache: CountCache,
}

impl AppStateInner {
    pub fn new(db: Database, blocklist: Blocklist, count_cache: CountCache) -> AppState {
        Arc::new(Self {
            db,
            blocklist,
            count_cache,
        })
    }
}
