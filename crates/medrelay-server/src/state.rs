use std::path::PathBuf;

/// Shared application state passed to all route handlers.
///
/// Only the database path is shared; each request opens its own store handle
/// inside `spawn_blocking`, so concurrent requests never contend on a
/// connection and no request-time state is mutable.
#[derive(Clone)]
pub struct AppState {
    pub db_path: PathBuf,
}

impl AppState {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_stores_db_path() {
        let state = AppState::new(PathBuf::from("/tmp/test.db"));
        assert_eq!(state.db_path, PathBuf::from("/tmp/test.db"));
    }
}
