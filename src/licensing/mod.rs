// Licensing system module
// Seven-day trial, tamper detection and local license key storage

pub mod types;
pub mod config;
pub mod clock;
pub mod storage;
pub mod validator;
pub mod manager;

pub use types::*;
pub use config::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{FileStore, MemoryStore, SecureStore};
pub use validator::{LicenseValidator, NonEmptyKeyValidator};
pub use manager::TrialManager;
