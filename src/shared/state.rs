use crate::security::token::TokenManager;
use crate::shared::utils::DbPool;

/// Shared application state handed to every handler.
pub struct AppState {
    pub conn: DbPool,
    pub tokens: TokenManager,
}
