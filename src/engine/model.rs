use log::{debug, info, warn};

use crate::engine::models::{AppRecord, BatchSummary, ConversionMode, ConvertedAppRecord};
use crate::engine::state::{
    AppListKind, BatchProgress, Confirmation, Effect, EngineEvent, Msg, SelectionSet, Tab, Toast,
    ToastLevel, UserAction, View,
};
use crate::env::HostStatus;
use crate::i18n::{I18n, Language, Message, Translations, resolve_startup_language};
use crate::util::{matches_search, progress_percent};

const MAX_TOASTS: usize = 5;

/// Everything the view renders. Only [`AppModel::update`] mutates it.
#[derive(Clone, Debug)]
pub struct AppModel {
    pub language: Language,
    pub translations: Translations,
    pub user_apps: Vec<AppRecord>,
    pub system_apps: Vec<AppRecord>,
    pub converted_apps: Vec<ConvertedAppRecord>,
    pub selection: SelectionSet,
    pub mode: ConversionMode,
    pub tab: Tab,
    pub view: View,
    pub user_search: String,
    pub system_search: String,
    pub loading: bool,
    pub host: Option<HostStatus>,
    pub batch: Option<BatchProgress>,
    pub last_batch: Option<BatchSummary>,
    pub pending: Option<Confirmation>,
    pub toasts: Vec<Toast>,
    next_toast_id: u64,
    refresh_requested: bool,
}

impl Default for AppModel {
    fn default() -> Self {
        Self {
            language: Language::English,
            translations: Translations::fallback(),
            user_apps: Vec::new(),
            system_apps: Vec::new(),
            converted_apps: Vec::new(),
            selection: SelectionSet::default(),
            mode: ConversionMode::System,
            tab: Tab::User,
            view: View::List,
            user_search: String::new(),
            system_search: String::new(),
            loading: false,
            host: None,
            batch: None,
            last_batch: None,
            pending: None,
            toasts: Vec::new(),
            next_toast_id: 1,
            refresh_requested: false,
        }
    }
}

impl AppModel {
    pub fn i18n(&self) -> I18n<'_> {
        I18n::new(&self.translations, self.language)
    }

    /// Apply one intent or engine report and return the work it implies.
    pub fn update(&mut self, msg: impl Into<Msg>) -> Vec<Effect> {
        match msg.into() {
            Msg::Action(action) => self.handle_action(action),
            Msg::Engine(event) => self.handle_event(event),
        }
    }

    fn apps(&self, list: AppListKind) -> &[AppRecord] {
        match list {
            AppListKind::User => &self.user_apps,
            AppListKind::System => &self.system_apps,
        }
    }

    /// Apps of `list` whose name or package contains `term`, ignoring case.
    pub fn filter(&self, list: AppListKind, term: &str) -> Vec<&AppRecord> {
        self.apps(list)
            .iter()
            .filter(|app| matches_search(&[app.name.as_str(), app.package_name.as_str()], term))
            .collect()
    }

    pub fn search_term(&self, list: AppListKind) -> &str {
        match list {
            AppListKind::User => &self.user_search,
            AppListKind::System => &self.system_search,
        }
    }

    pub fn visible_apps(&self, list: AppListKind) -> Vec<&AppRecord> {
        self.filter(list, self.search_term(list))
    }

    pub fn find_app(&self, package_name: &str) -> Option<&AppRecord> {
        self.user_apps
            .iter()
            .chain(self.system_apps.iter())
            .find(|app| app.package_name == package_name)
            .or_else(|| {
                self.converted_apps
                    .iter()
                    .find(|record| record.package_name() == package_name)
                    .map(|record| &record.app)
            })
    }

    pub fn converted_record(&self, package_name: &str) -> Option<&ConvertedAppRecord> {
        self.converted_apps
            .iter()
            .find(|record| record.package_name() == package_name)
    }

    pub fn toggle_selection(&mut self, package_name: &str, selected: bool) {
        self.selection.set(package_name, selected);
    }

    pub fn is_converting(&self) -> bool {
        self.batch.is_some()
    }

    fn push_toast(&mut self, level: ToastLevel, message: Message) {
        let id = self.next_toast_id;
        self.next_toast_id += 1;
        self.toasts.push(Toast { id, level, message });
        if self.toasts.len() > MAX_TOASTS {
            let excess = self.toasts.len() - MAX_TOASTS;
            self.toasts.drain(..excess);
        }
    }

    fn handle_action(&mut self, action: UserAction) -> Vec<Effect> {
        match action {
            UserAction::Start => {
                self.loading = true;
                vec![Effect::LoadTranslations, Effect::LoadData]
            }
            UserAction::Refresh => {
                if self.is_converting() {
                    // A reload mid-batch would drop records not yet persisted.
                    self.push_toast(ToastLevel::Warning, Message::new("conversion_in_progress"));
                    return Vec::new();
                }
                self.loading = true;
                self.refresh_requested = true;
                self.push_toast(ToastLevel::Info, Message::new("refreshing_data"));
                vec![Effect::LoadData]
            }
            UserAction::SetSearch { list, term } => {
                match list {
                    AppListKind::User => self.user_search = term,
                    AppListKind::System => self.system_search = term,
                }
                Vec::new()
            }
            UserAction::ToggleSelection {
                package_name,
                selected,
            } => {
                self.toggle_selection(&package_name, selected);
                Vec::new()
            }
            UserAction::SelectAllUser => {
                self.select_all_user();
                Vec::new()
            }
            UserAction::SetMode(mode) => {
                debug!("conversion mode changed to {}", mode.as_str());
                self.mode = mode;
                Vec::new()
            }
            UserAction::SwitchTab(tab) => {
                self.tab = tab;
                Vec::new()
            }
            UserAction::ShowDetails { package_name } => {
                self.view = View::Details { package_name };
                Vec::new()
            }
            UserAction::ShowList => {
                self.view = View::List;
                Vec::new()
            }
            UserAction::SetLanguage(code) => self.set_language(&code),
            UserAction::RequestConvert => {
                if self.is_converting() {
                    self.push_toast(ToastLevel::Warning, Message::new("conversion_in_progress"));
                } else if self.selection.is_empty() {
                    self.push_toast(ToastLevel::Error, Message::new("error_no_apps_selected"));
                } else {
                    self.pending = Some(Confirmation::Convert {
                        count: self.selection.len(),
                        mode: self.mode,
                    });
                }
                Vec::new()
            }
            UserAction::RequestRevert { package_name } => {
                let name = self
                    .converted_record(&package_name)
                    .map(|record| record.name().to_owned());
                if let Some(name) = name {
                    self.pending = Some(Confirmation::RevertOne { package_name, name });
                }
                Vec::new()
            }
            UserAction::RequestRevertAll => {
                if self.converted_apps.is_empty() {
                    self.push_toast(ToastLevel::Error, Message::new("error_no_converted_apps"));
                } else {
                    self.pending = Some(Confirmation::RevertAll);
                }
                Vec::new()
            }
            UserAction::RequestReboot => {
                self.pending = Some(Confirmation::Reboot);
                Vec::new()
            }
            UserAction::Confirm => match self.pending.take() {
                Some(confirmation) => self.confirm(confirmation),
                None => Vec::new(),
            },
            UserAction::Cancel => {
                self.pending = None;
                Vec::new()
            }
            UserAction::HideProgress => {
                if let Some(batch) = self.batch.as_mut() {
                    batch.visible = false;
                }
                Vec::new()
            }
            UserAction::DismissToast(id) => {
                self.toasts.retain(|toast| toast.id != id);
                Vec::new()
            }
        }
    }

    fn confirm(&mut self, confirmation: Confirmation) -> Vec<Effect> {
        match confirmation {
            Confirmation::Convert { mode, .. } => self.start_batch(mode),
            Confirmation::RevertOne { package_name, .. } => self.revert_single(&package_name),
            Confirmation::RevertAll => self.revert_all(),
            Confirmation::Reboot => {
                self.push_toast(ToastLevel::Info, Message::new("reboot_sent"));
                vec![Effect::Reboot]
            }
        }
    }

    fn select_all_user(&mut self) {
        let visible: Vec<String> = self
            .visible_apps(AppListKind::User)
            .into_iter()
            .map(|app| app.package_name.clone())
            .collect();
        let all_selected = visible.iter().all(|p| self.selection.contains(p));
        for package_name in &visible {
            self.selection.set(package_name, !all_selected);
        }
    }

    fn set_language(&mut self, code: &str) -> Vec<Effect> {
        match Language::from_code(code) {
            Some(language) if self.translations.supports(language) => {
                info!("language changed to {code}");
                self.language = language;
                vec![Effect::PersistLanguage(language)]
            }
            _ => {
                debug!("ignoring unsupported language {code:?}");
                Vec::new()
            }
        }
    }

    fn start_batch(&mut self, mode: ConversionMode) -> Vec<Effect> {
        if self.is_converting() {
            self.push_toast(ToastLevel::Warning, Message::new("conversion_in_progress"));
            return Vec::new();
        }
        let apps: Vec<AppRecord> = self
            .selection
            .iter()
            .filter_map(|package_name| {
                let app = self
                    .user_apps
                    .iter()
                    .find(|app| app.package_name == package_name);
                if app.is_none() {
                    warn!("selected package {package_name} is not in the user app list");
                }
                app.cloned()
            })
            .collect();
        if apps.is_empty() {
            self.push_toast(ToastLevel::Error, Message::new("error_no_apps_selected"));
            return Vec::new();
        }
        self.batch = Some(BatchProgress {
            total: apps.len(),
            visible: true,
            ..BatchProgress::default()
        });
        vec![Effect::ConvertBatch { apps, mode }]
    }

    /// Drop the converted record for `package_name` and put the app back in the user list.
    fn revert_single(&mut self, package_name: &str) -> Vec<Effect> {
        let Some(index) = self
            .converted_apps
            .iter()
            .position(|record| record.package_name() == package_name)
        else {
            return Vec::new();
        };
        let record = self.converted_apps.remove(index);
        self.restore_user_app(&record);
        self.push_toast(
            ToastLevel::Success,
            Message::new("app_reverted").arg("app", record.name()),
        );
        vec![Effect::PersistConverted(self.converted_apps.clone())]
    }

    fn revert_all(&mut self) -> Vec<Effect> {
        let records = std::mem::take(&mut self.converted_apps);
        for record in &records {
            self.restore_user_app(record);
        }
        self.push_toast(ToastLevel::Success, Message::new("all_apps_reverted"));
        vec![Effect::ClearConverted]
    }

    fn restore_user_app(&mut self, record: &ConvertedAppRecord) {
        self.user_apps
            .retain(|app| app.package_name != record.package_name());
        self.user_apps.push(record.reverted_app());
    }

    fn handle_event(&mut self, event: EngineEvent) -> Vec<Effect> {
        match event {
            EngineEvent::TranslationsLoaded {
                translations,
                saved_language,
                system_language,
            } => {
                self.language = resolve_startup_language(
                    saved_language.as_deref(),
                    &translations,
                    system_language,
                );
                self.translations = translations;
                Vec::new()
            }
            EngineEvent::DataLoaded {
                user_apps,
                system_apps,
                converted_apps,
                host,
            } => {
                self.user_apps = user_apps;
                self.system_apps = system_apps;
                self.converted_apps = converted_apps;
                self.host = Some(host);
                self.loading = false;
                if std::mem::take(&mut self.refresh_requested) {
                    self.push_toast(ToastLevel::Success, Message::new("data_refreshed"));
                }
                Vec::new()
            }
            EngineEvent::ConversionStarted { index, total, name } => {
                if let Some(batch) = self.batch.as_mut() {
                    batch.index = index;
                    batch.total = total;
                    batch.percent = progress_percent(index, total);
                    batch.current = name;
                }
                Vec::new()
            }
            EngineEvent::ConversionSucceeded(record) => {
                self.selection.remove(record.package_name());
                // Re-converting an app replaces its record instead of duplicating it.
                self.converted_apps
                    .retain(|existing| existing.package_name() != record.package_name());
                self.converted_apps.push(record);
                if let Some(batch) = self.batch.as_mut() {
                    batch.succeeded += 1;
                }
                Vec::new()
            }
            EngineEvent::ConversionFailed { name, error } => {
                if let Some(batch) = self.batch.as_mut() {
                    batch.errors.push(format!("{name}: {error}"));
                }
                Vec::new()
            }
            EngineEvent::BatchFinished => {
                let Some(batch) = self.batch.take() else {
                    return Vec::new();
                };
                if batch.succeeded > 0 {
                    self.push_toast(
                        ToastLevel::Success,
                        Message::new("convert_success").arg("count", batch.succeeded),
                    );
                }
                if !batch.errors.is_empty() {
                    self.push_toast(
                        ToastLevel::Error,
                        Message::new("convert_failed_some").arg("errors", batch.errors.join("\n")),
                    );
                }
                self.last_batch = Some(BatchSummary {
                    succeeded: batch.succeeded,
                    errors: batch.errors,
                });
                vec![Effect::PersistConverted(self.converted_apps.clone())]
            }
            EngineEvent::StorageFailed(error) => {
                self.push_toast(
                    ToastLevel::Error,
                    Message::new("error_save").arg("error", error),
                );
                Vec::new()
            }
        }
    }
}
