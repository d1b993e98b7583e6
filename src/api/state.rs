use crate::detect::engine::CrisisEngine;
use crate::storage::Pool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub engine: Arc<CrisisEngine>,
}
