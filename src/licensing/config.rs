/// Trial configuration
pub const TRIAL_DAYS: i64 = 7;

/// Keychain service namespace the trial entries live under
pub const KEYCHAIN_SERVICE: &str = "com.lingobar.app";

/// Keychain account names, one entry per field of the trial record
pub mod accounts {
    pub const TRIAL_START_DATE: &str = "trialStartDate";
    pub const LAST_USED_DATE: &str = "lastUsedDate";
    pub const LICENSE_KEY: &str = "licenseKey";

    pub const ALL: [&str; 3] = [TRIAL_START_DATE, LAST_USED_DATE, LICENSE_KEY];
}

/// File name of the file-backed secure store
pub const SECURE_STORE_FILE: &str = "secure-store.json";

/// Settings for a `TrialManager`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicensingConfig {
    pub service: String,
    /// At most `TRIAL_DAYS`; `CoreConfig::validate` rejects longer trials
    pub trial_days: i64,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            service: KEYCHAIN_SERVICE.to_string(),
            trial_days: TRIAL_DAYS,
        }
    }
}
