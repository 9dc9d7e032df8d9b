use thiserror::Error as ThisError;

use crate::network::VALID_NETWORKS;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid network {0} (valid options: {valid:?})", valid = VALID_NETWORKS)]
    InvalidNetwork(String),
    #[error("invalid port {0} (valid options: 0 - 65535)")]
    InvalidPort(i32),
}
pub type Result<T> = std::result::Result<T, Error>;
