use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::catalog::Catalog;
use crate::convert::Converter;
use crate::engine::model::AppModel;
use crate::engine::models::{
    AppRecord, BatchSummary, ConversionMode, ConversionRecord, ConvertedAppRecord,
};
use crate::engine::state::{Effect, EngineEvent, Msg, UserAction};
use crate::env;
use crate::i18n::{Language, detect_system_language};
use crate::storage::StorageManager;

pub mod model;
pub mod models;
pub mod state;

const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Carries out the effects the reducer asks for and reports back with events.
pub struct ManagerEngine {
    catalog: Catalog,
    storage: StorageManager,
    converter: Converter,
    settle_delay: Duration,
}

impl ManagerEngine {
    pub fn new(catalog: Catalog, storage: StorageManager, converter: Converter) -> Self {
        Self {
            catalog,
            storage,
            converter,
            settle_delay: SETTLE_DELAY,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub async fn load_app_lists(&self) -> (Vec<AppRecord>, Vec<AppRecord>) {
        tokio::join!(
            self.catalog.load_user_apps(),
            self.catalog.load_system_apps()
        )
    }

    pub fn load_converted_apps(&self) -> Vec<ConvertedAppRecord> {
        self.storage.load_converted_apps()
    }

    pub async fn run_effect(
        &mut self,
        effect: Effect,
        updates: &mpsc::UnboundedSender<EngineEvent>,
    ) {
        match effect {
            Effect::LoadTranslations => {
                info!("effect: LoadTranslations");
                let translations = self.catalog.load_translations().await;
                let saved_language = self.storage.load_language();
                updates
                    .send(EngineEvent::TranslationsLoaded {
                        translations,
                        saved_language,
                        system_language: detect_system_language(),
                    })
                    .ok();
            }
            Effect::LoadData => {
                info!("effect: LoadData");
                let (user_apps, system_apps) = self.load_app_lists().await;
                let converted_apps = self.load_converted_apps();
                let host = env::detect_host_status();
                info!(
                    "data loaded: {} user, {} system, {} converted, host {:?}",
                    user_apps.len(),
                    system_apps.len(),
                    converted_apps.len(),
                    host
                );
                updates
                    .send(EngineEvent::DataLoaded {
                        user_apps,
                        system_apps,
                        converted_apps,
                        host,
                    })
                    .ok();
            }
            Effect::ConvertBatch { apps, mode } => {
                info!(
                    "effect: ConvertBatch of {} apps to {} ({} attempt(s) each)",
                    apps.len(),
                    mode.target_dir(),
                    self.converter.policy().attempts
                );
                self.convert_batch(apps, mode, updates).await;
            }
            Effect::PersistConverted(apps) => {
                if let Err(err) = self.storage.save_converted_apps(&apps) {
                    error!("failed to persist converted apps: {err}");
                    updates.send(EngineEvent::StorageFailed(err)).ok();
                } else {
                    debug!("persisted {} converted apps", apps.len());
                }
            }
            Effect::ClearConverted => {
                if let Err(err) = self.storage.clear_converted_apps() {
                    error!("failed to clear converted apps: {err}");
                    updates.send(EngineEvent::StorageFailed(err)).ok();
                }
            }
            Effect::PersistLanguage(language) => {
                if let Err(err) = self.storage.save_language(language) {
                    error!("failed to persist language: {err}");
                    updates.send(EngineEvent::StorageFailed(err)).ok();
                }
            }
            Effect::Reboot => {
                // The host owns the actual reboot.
                info!("effect: Reboot requested");
            }
        }
    }

    async fn convert_batch(
        &self,
        apps: Vec<AppRecord>,
        mode: ConversionMode,
        updates: &mpsc::UnboundedSender<EngineEvent>,
    ) {
        let total = apps.len();
        for (index, app) in apps.into_iter().enumerate() {
            updates
                .send(EngineEvent::ConversionStarted {
                    index,
                    total,
                    name: app.name.clone(),
                })
                .ok();
            let record = ConversionRecord::for_app(&app, mode);
            match self.converter.convert(&record).await {
                Ok(()) => {
                    info!("converted {} to {}", app.package_name, mode.as_str());
                    updates
                        .send(EngineEvent::ConversionSucceeded(ConvertedAppRecord::new(
                            app,
                            mode,
                            Utc::now(),
                        )))
                        .ok();
                }
                Err(error) => {
                    warn!("conversion of {} failed: {error}", app.package_name);
                    updates
                        .send(EngineEvent::ConversionFailed {
                            name: app.name,
                            error,
                        })
                        .ok();
                }
            }
            tokio::time::sleep(self.settle_delay).await;
        }
        updates.send(EngineEvent::BatchFinished).ok();
    }
}

/// Headless driver: runs every dispatched intent to completion on the caller's task.
pub struct AppManager {
    model: AppModel,
    engine: ManagerEngine,
    updates_tx: mpsc::UnboundedSender<EngineEvent>,
    updates_rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl AppManager {
    pub fn new(engine: ManagerEngine) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            model: AppModel::default(),
            engine,
            updates_tx,
            updates_rx,
        }
    }

    pub fn model(&self) -> &AppModel {
        &self.model
    }

    pub fn storage(&self) -> &StorageManager {
        self.engine.storage()
    }

    /// Feed one message through the reducer and keep running the resulting
    /// effects until nothing is left to do.
    pub async fn dispatch(&mut self, msg: impl Into<Msg>) {
        let mut pending: VecDeque<Effect> = self.model.update(msg).into();
        while let Some(effect) = pending.pop_front() {
            self.engine.run_effect(effect, &self.updates_tx).await;
            while let Ok(event) = self.updates_rx.try_recv() {
                pending.extend(self.model.update(event));
            }
        }
    }

    /// Load translations, both app lists, converted records and host status.
    pub async fn start(&mut self) {
        self.dispatch(UserAction::Start).await;
    }

    pub async fn toggle_selection(&mut self, package_name: &str, selected: bool) {
        self.dispatch(UserAction::ToggleSelection {
            package_name: package_name.to_owned(),
            selected,
        })
        .await;
    }

    /// Convert the current selection, confirming on the user's behalf.
    /// Returns `None` when nothing was started.
    pub async fn convert_selected(&mut self, mode: ConversionMode) -> Option<BatchSummary> {
        self.dispatch(UserAction::SetMode(mode)).await;
        self.dispatch(UserAction::RequestConvert).await;
        self.model.pending.as_ref()?;
        self.model.last_batch = None;
        self.dispatch(UserAction::Confirm).await;
        self.model.last_batch.clone()
    }

    /// Returns whether a converted record was reverted.
    pub async fn revert_single(&mut self, package_name: &str) -> bool {
        let before = self.model.converted_apps.len();
        self.dispatch(UserAction::RequestRevert {
            package_name: package_name.to_owned(),
        })
        .await;
        if self.model.pending.is_none() {
            return false;
        }
        self.dispatch(UserAction::Confirm).await;
        self.model.converted_apps.len() < before
    }

    /// Returns how many records were reverted.
    pub async fn revert_all(&mut self) -> usize {
        let before = self.model.converted_apps.len();
        self.dispatch(UserAction::RequestRevertAll).await;
        if self.model.pending.is_none() {
            return 0;
        }
        self.dispatch(UserAction::Confirm).await;
        before - self.model.converted_apps.len()
    }

    pub async fn set_language(&mut self, code: &str) -> Language {
        self.dispatch(UserAction::SetLanguage(code.to_owned())).await;
        self.model.language
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::catalog::USER_SNAPSHOT;
    use crate::convert::{ConversionBackend, RetryPolicy, SimulatedBackend};
    use crate::engine::state::AppListKind;
    use crate::networking::{NetworkClient, WebrootSource};

    fn manager(webroot: &Path, data_dir: &Path, success_rate: f64) -> AppManager {
        let backend = SimulatedBackend::new(success_rate, 0..1, Some(1));
        let engine = ManagerEngine::new(
            Catalog::new(NetworkClient::new(WebrootSource::Directory(
                webroot.to_path_buf(),
            ))),
            StorageManager::new(data_dir),
            Converter::new(
                ConversionBackend::Simulated(backend),
                RetryPolicy::single(Duration::from_secs(1)),
            ),
        )
        .with_settle_delay(Duration::ZERO);
        AppManager::new(engine)
    }

    fn write_snapshot(webroot: &Path) {
        fs::write(
            webroot.join(USER_SNAPSHOT),
            r#"[
                {"name": "Maps", "packageName": "com.example.maps"},
                {"name": "Notes", "packageName": "com.example.notes"}
            ]"#,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn missing_snapshot_loads_three_demo_apps() {
        let webroot = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let mut manager = manager(webroot.path(), data.path(), 1.0);
        manager.start().await;

        let model = manager.model();
        assert_eq!(model.user_apps.len(), 3);
        assert_eq!(model.system_apps.len(), 1);
        assert!(model.converted_apps.is_empty());
        assert!(!model.loading);
        assert!(model.host.is_some());
    }

    #[tokio::test]
    async fn successful_conversion_is_persisted() {
        let webroot = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        write_snapshot(webroot.path());
        let mut manager = manager(webroot.path(), data.path(), 1.0);
        manager.start().await;

        manager.toggle_selection("com.example.maps", true).await;
        let summary = manager
            .convert_selected(ConversionMode::System)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert!(summary.errors.is_empty());
        let model = manager.model();
        assert_eq!(model.converted_apps.len(), 1);
        assert_eq!(model.converted_apps[0].conversion_mode, ConversionMode::System);
        assert!(model.selection.is_empty());
        assert_eq!(manager.storage().load_converted_apps(), model.converted_apps);
    }

    #[tokio::test]
    async fn failures_are_collected_without_aborting() {
        let webroot = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        write_snapshot(webroot.path());
        let mut manager = manager(webroot.path(), data.path(), 0.0);
        manager.start().await;

        manager.toggle_selection("com.example.maps", true).await;
        manager.toggle_selection("com.example.notes", true).await;
        let summary = manager
            .convert_selected(ConversionMode::PrivApp)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 0);
        assert_eq!(
            summary.errors,
            ["Maps: Conversion failed", "Notes: Conversion failed"]
        );
        assert_eq!(manager.model().selection.len(), 2);
    }

    #[tokio::test]
    async fn refresh_mid_batch_keeps_memory_and_storage_in_step() {
        let webroot = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        write_snapshot(webroot.path());
        let mut manager = manager(webroot.path(), data.path(), 1.0);
        manager.start().await;
        manager.toggle_selection("com.example.maps", true).await;
        manager.dispatch(UserAction::RequestConvert).await;

        // Same ordering as the GUI worker: effects run in the order they were sent.
        let mut queue: VecDeque<Effect> = manager.model.update(UserAction::Confirm).into();
        queue.extend(manager.model.update(UserAction::Refresh));
        while let Some(effect) = queue.pop_front() {
            manager.engine.run_effect(effect, &manager.updates_tx).await;
            while let Ok(event) = manager.updates_rx.try_recv() {
                queue.extend(manager.model.update(event));
            }
        }

        let model = manager.model();
        assert_eq!(model.converted_apps.len(), 1);
        assert_eq!(manager.storage().load_converted_apps(), model.converted_apps);
    }

    #[tokio::test]
    async fn empty_selection_starts_nothing() {
        let webroot = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let mut manager = manager(webroot.path(), data.path(), 1.0);
        manager.start().await;
        assert!(manager.convert_selected(ConversionMode::System).await.is_none());
    }

    #[tokio::test]
    async fn revert_round_trip_updates_storage() {
        let webroot = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        write_snapshot(webroot.path());
        let mut manager = manager(webroot.path(), data.path(), 1.0);
        manager.start().await;
        manager.toggle_selection("com.example.maps", true).await;
        manager.toggle_selection("com.example.notes", true).await;
        manager.convert_selected(ConversionMode::System).await;

        assert!(manager.revert_single("com.example.maps").await);
        assert!(!manager.revert_single("com.unknown").await);
        assert_eq!(manager.storage().load_converted_apps().len(), 1);

        assert_eq!(manager.revert_all().await, 1);
        assert!(manager.storage().load_converted_apps().is_empty());
        assert_eq!(manager.revert_all().await, 0);
        assert_eq!(manager.model().filter(AppListKind::User, "").len(), 2);
    }

    #[tokio::test]
    async fn converted_apps_and_language_survive_restart() {
        let webroot = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        write_snapshot(webroot.path());
        {
            let mut manager = manager(webroot.path(), data.path(), 1.0);
            manager.start().await;
            manager.toggle_selection("com.example.notes", true).await;
            manager.convert_selected(ConversionMode::PrivApp).await;
            assert_eq!(manager.set_language("zh").await, Language::Chinese);
            assert_eq!(manager.set_language("xx").await, Language::Chinese);
        }

        let mut manager = manager(webroot.path(), data.path(), 1.0);
        manager.start().await;
        let model = manager.model();
        assert_eq!(model.language, Language::Chinese);
        assert_eq!(model.converted_apps.len(), 1);
        assert_eq!(model.converted_apps[0].package_name(), "com.example.notes");
    }
}
