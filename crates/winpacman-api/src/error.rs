use winpacman_model::Manager;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Cache(#[from] winpacman_cache::CacheError),

    #[error(transparent)]
    Registry(#[from] winpacman_registry::RegistryError),

    #[error(transparent)]
    Resolver(#[from] winpacman_resolver::ResolverError),

    #[error(transparent)]
    Sync(#[from] winpacman_sync::SyncError),

    #[error(transparent)]
    Provider(#[from] winpacman_provider::ProviderError),

    #[error("no provider registered for {0}")]
    UnknownProvider(Manager),
}

pub type Result<T> = std::result::Result<T, ApiError>;
