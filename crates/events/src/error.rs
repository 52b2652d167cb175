use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Invalid event timestamp '{0}'")]
    InvalidTimestamp(String),
}
