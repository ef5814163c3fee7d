//! # Settings Service
//!
//! Store profile and business rules as one typed record. Reads fall back to
//! defaults until something is saved.

use std::sync::Arc;

use tracing::info;

use pharmacy_core::{Settings, SettingsPatch};
use pharmacy_db::Database;

use crate::error::ServiceResult;

#[derive(Debug, Clone)]
pub struct SettingsService {
    db: Arc<Database>,
}

impl SettingsService {
    pub fn new(db: Arc<Database>) -> Self {
        SettingsService { db }
    }

    /// The stored settings, or defaults when none were saved.
    pub async fn get(&self) -> ServiceResult<Settings> {
        Ok(self.db.settings().latest().await?.unwrap_or_default())
    }

    /// Applies the present fields of `patch` and saves the result.
    pub async fn update(&self, patch: SettingsPatch) -> ServiceResult<Settings> {
        patch.validate()?;
        let mut settings = self.get().await?;
        settings.apply(patch);

        let saved = self.db.settings().save(&settings).await?;
        info!(
            low_stock_threshold = saved.low_stock_threshold,
            notify_methods = saved.notify_methods.len(),
            "Settings updated"
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_defaults_until_saved() {
        let settings = SettingsService::new(testing::db().await);
        let current = settings.get().await.unwrap();
        assert_eq!(current.low_stock_threshold, 10);
        assert!(current.created_at.is_none());
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let settings = SettingsService::new(testing::db().await);
        settings
            .update(SettingsPatch {
                store_name: Some("Green Cross".to_string()),
                notify_methods: Some(vec!["sms".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();

        let updated = settings
            .update(SettingsPatch {
                low_stock_threshold: Some(25),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.store_name, "Green Cross");
        assert_eq!(updated.notify_methods, vec!["sms".to_string()]);
        assert_eq!(updated.low_stock_threshold, 25);
        assert_eq!(settings.get().await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_negative_threshold_is_rejected() {
        let settings = SettingsService::new(testing::db().await);
        let err = settings
            .update(SettingsPatch {
                low_stock_threshold: Some(-1),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
