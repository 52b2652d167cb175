use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid location '{0}'")]
    InvalidLocation(String),
}
