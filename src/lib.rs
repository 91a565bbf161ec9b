pub mod config;
pub mod dom;
pub mod fetch;
mod include;
pub mod links;
pub mod menu;
pub mod page;
pub mod role;
pub mod wire;
mod error;

pub use config::{Config, ConfigError, RootPolicy, Settings};
pub use error::Error;
pub use fetch::{Fetch, FetchError, FetchResponse, LoadedFragment, SiteDirFetcher};
pub use include::{NavInclude, NavIncludeBuilder, Outcome};
pub use page::Page;
pub use wire::Wiring;
