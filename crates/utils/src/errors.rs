use thiserror::Error;

/// Errors raised while loading a component's configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] figment::Error),
}
