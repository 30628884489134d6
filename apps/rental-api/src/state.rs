//! Shared handler state.

use rental_db::Database;

/// State handed to every handler. Cloning is cheap: the pool is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}
