use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to register metric {0} with the prometheus registry")]
    RegistrationFailed(String),
}
