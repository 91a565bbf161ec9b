use crate::config::ConfigError;
use crate::dom::ParseError;
use thiserror::Error;

/// Top-level error type for nav-include.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("malformed markup: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid page location: {0}")]
    InvalidLocation(#[from] url::ParseError),

    #[error("nav fragment contains no element to inject")]
    EmptyFragment,

    #[error("nav fragment already injected into this page")]
    AlreadyInjected,

    #[error("nav include requires a fetcher")]
    MissingFetcher,
}
