/// Failure kinds surfaced by [`super::UserStore`].
///
/// Callers map these onto HTTP statuses; the store itself never retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    Duplicate,
    #[error("user not found")]
    NotFound,
    #[error("{message}")]
    Persistence { message: String },
    #[error("{message}")]
    Hash { message: String },
}
