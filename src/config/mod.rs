//! Loading and validating loader settings.

mod builder;
mod env;
mod error;
mod settings;

pub use builder::Config;
pub use error::ConfigError;
pub use settings::{Attributes, Classes, MenuIds, RootPolicy, Settings};
