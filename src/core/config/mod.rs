mod parsing;
mod settings;
mod types;

pub(crate) use types::{ConfigError, Environment, Settings, MAX_ESSAY_RETRIES};
