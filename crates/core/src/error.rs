use thiserror::Error;

#[derive(Error, Debug)]
pub enum StupidError {
    #[error("Configuration error: {0}")]
    Config(String),
}
