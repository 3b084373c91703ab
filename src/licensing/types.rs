use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current license status, derived from the stored record on every query
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TrialStatus {
    /// Trial running; `days_remaining` is in `1..=TRIAL_DAYS`
    Active { days_remaining: i64 },
    /// Trial window elapsed, or the clock was rolled back
    Expired,
    /// A license key is stored; absorbing while the key stays stored
    Licensed,
}

impl TrialStatus {
    /// Days left in the trial (None unless the trial is active)
    pub fn days_remaining(&self) -> Option<i64> {
        match self {
            TrialStatus::Active { days_remaining } => Some(*days_remaining),
            _ => None,
        }
    }

    /// Check if the user can use the app (trial active or licensed)
    pub fn can_use_app(&self) -> bool {
        matches!(self, TrialStatus::Active { .. } | TrialStatus::Licensed)
    }
}

impl std::fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrialStatus::Active { days_remaining } => {
                write!(f, "Active ({} days remaining)", days_remaining)
            }
            TrialStatus::Expired => write!(f, "Expired"),
            TrialStatus::Licensed => write!(f, "Licensed"),
        }
    }
}

/// Persisted trial state. Each field is its own secure-storage entry.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TrialRecord {
    pub trial_start_date: Option<DateTime<Utc>>,
    pub last_used_date: Option<DateTime<Utc>>,
    pub license_key: Option<String>,
}

/// License state for the host UI (simplified view)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LicenseInfo {
    pub status: TrialStatus,
    pub trial_days_remaining: Option<i64>,
    pub trial_start_date: Option<DateTime<Utc>>,
    pub can_use_app: bool,
    pub has_license_key: bool,
    /// Last four characters of the stored key, e.g. `••••AB12`
    pub masked_license_key: Option<String>,
}

impl LicenseInfo {
    pub fn new(status: TrialStatus, record: &TrialRecord) -> Self {
        LicenseInfo {
            status,
            trial_days_remaining: status.days_remaining(),
            trial_start_date: record.trial_start_date,
            can_use_app: status.can_use_app(),
            has_license_key: record.license_key.is_some(),
            masked_license_key: record.license_key.as_deref().map(mask_license_key),
        }
    }
}

/// Show only the last four characters. Keys that short are hidden entirely.
fn mask_license_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "••••".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("••••{}", tail)
}

/// Error types for secure storage operations
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Stored value for {account} is not valid UTF-8")]
    InvalidUtf8 { account: String },
}

/// Error types for licensing operations
#[derive(thiserror::Error, Debug)]
pub enum LicenseError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid license key")]
    InvalidKey,
}

impl Serialize for LicenseError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
