use crate::licensing::clock::{calendar_days_between, Clock};
use crate::licensing::config::{accounts, LicensingConfig};
use crate::licensing::storage::{
    clear_trial_record, load_trial_record, save_date, save_license_key, SecureStore,
};
use crate::licensing::types::{LicenseError, LicenseInfo, TrialRecord, TrialStatus};
use crate::licensing::validator::{LicenseValidator, NonEmptyKeyValidator};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Trial/license state machine.
///
/// Nothing is cached: every query re-reads the record from the store and
/// derives the status from the current wall-clock time.
pub struct TrialManager {
    store: Arc<dyn SecureStore>,
    clock: Arc<dyn Clock>,
    validator: Box<dyn LicenseValidator>,
    config: LicensingConfig,
}

impl TrialManager {
    pub fn new(store: Arc<dyn SecureStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            validator: Box::new(NonEmptyKeyValidator),
            config: LicensingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LicensingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_validator(mut self, validator: impl LicenseValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn config(&self) -> &LicensingConfig {
        &self.config
    }

    fn record(&self) -> TrialRecord {
        load_trial_record(self.store.as_ref(), &self.config.service)
    }

    /// Current status. Starts the trial on the first-ever query.
    pub fn status(&self) -> TrialStatus {
        let record = self.record();
        self.derive_status(&record)
    }

    fn derive_status(&self, record: &TrialRecord) -> TrialStatus {
        if record.license_key.is_some() {
            return TrialStatus::Licensed;
        }

        let now = self.clock.now();

        if let Some(last_used) = record.last_used_date {
            if now < last_used {
                warn!(%now, %last_used, "System clock is behind last recorded use, treating trial as expired");
                return TrialStatus::Expired;
            }
        }

        let Some(trial_start) = record.trial_start_date else {
            self.start_trial(now);
            return TrialStatus::Active {
                days_remaining: self.config.trial_days,
            };
        };

        let days_passed = calendar_days_between(self.clock.as_ref(), trial_start, now);
        // A start date ahead of `now` never grants more than a full trial
        let days_remaining = (self.config.trial_days - days_passed).clamp(0, self.config.trial_days);

        if days_remaining > 0 {
            TrialStatus::Active { days_remaining }
        } else {
            TrialStatus::Expired
        }
    }

    fn start_trial(&self, now: chrono::DateTime<chrono::Utc>) {
        info!(%now, trial_days = self.config.trial_days, "Starting trial");
        let store = self.store.as_ref();
        let service = &self.config.service;

        for account in [accounts::TRIAL_START_DATE, accounts::LAST_USED_DATE] {
            if let Err(e) = save_date(store, service, account, now) {
                warn!(account, error = %e, "Failed to persist trial date");
            }
        }
    }

    /// Overwrite the last-used date with the current time.
    ///
    /// Call once per launch, after the launch's first `status()` check, since
    /// tamper detection compares against the previous value.
    pub fn record_usage(&self) -> Result<(), LicenseError> {
        let now = self.clock.now();
        debug!(%now, "Recording usage");
        save_date(
            self.store.as_ref(),
            &self.config.service,
            accounts::LAST_USED_DATE,
            now,
        )?;
        Ok(())
    }

    /// Launch sequence: check status against the previous last-used date,
    /// then record this launch. Returns the status seen by the check.
    pub fn launch(&self) -> TrialStatus {
        let status = self.status();
        if let Err(e) = self.record_usage() {
            warn!(error = %e, "Failed to record usage at launch");
        }
        info!(%status, "License status at launch");
        status
    }

    /// Validate and store a license key. Nothing is written on rejection.
    pub fn activate_license(&self, key: &str) -> Result<(), LicenseError> {
        let key = self.validator.validate(key).map_err(|e| {
            warn!(error = %e, "License activation rejected");
            e
        })?;

        save_license_key(self.store.as_ref(), &self.config.service, &key)?;
        info!("License activated");
        Ok(())
    }

    /// Delete the stored key; status falls back to the trial dates.
    pub fn remove_license(&self) -> Result<(), LicenseError> {
        self.store
            .delete(&self.config.service, accounts::LICENSE_KEY)?;
        info!("License removed");
        Ok(())
    }

    /// Snapshot for the host UI
    pub fn license_info(&self) -> LicenseInfo {
        let record = self.record();
        let status = self.derive_status(&record);
        // Re-read so a trial started by this query shows its start date
        let record = if record.trial_start_date.is_none() {
            self.record()
        } else {
            record
        };
        LicenseInfo::new(status, &record)
    }

    /// Reset license state (for testing/debugging only)
    pub fn reset(&self) -> Result<(), LicenseError> {
        clear_trial_record(self.store.as_ref(), &self.config.service)?;
        warn!("Trial and license state reset");
        Ok(())
    }
}
