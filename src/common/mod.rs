pub mod error;
pub mod types;

pub use error::{ConfigurationError, DnsError, ResolveError, SettingsError, ValidationError};
pub use types::{LbType, Transport, DEFAULT_RANK, DEFAULT_WEIGHT};
