/// Errors from cache construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache capacity must be at least 1")]
    ZeroCapacity,
}

pub type CacheResult<T> = Result<T, CacheError>;
