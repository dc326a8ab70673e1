use crate::engine::models::{AppRecord, ConversionMode, ConvertedAppRecord};
use crate::env::HostStatus;
use crate::i18n::{Language, Message, Translations};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppListKind {
    User,
    System,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    User,
    System,
    Converted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    List,
    Details { package_name: String },
}

/// Checked packages, kept in the order they were checked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    packages: Vec<String>,
}

impl SelectionSet {
    pub fn set(&mut self, package_name: &str, selected: bool) {
        if selected {
            if !self.contains(package_name) {
                self.packages.push(package_name.to_owned());
            }
        } else {
            self.remove(package_name);
        }
    }

    pub fn remove(&mut self, package_name: &str) {
        self.packages.retain(|p| p != package_name);
    }

    pub fn contains(&self, package_name: &str) -> bool {
        self.packages.iter().any(|p| p == package_name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(String::as_str)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub level: ToastLevel,
    pub message: Message,
}

/// An operation waiting for the user to say yes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Convert { count: usize, mode: ConversionMode },
    RevertOne { package_name: String, name: String },
    RevertAll,
    Reboot,
}

impl Confirmation {
    pub fn message(&self) -> Message {
        match self {
            Confirmation::Convert { count, mode } => Message::new("confirm_convert")
                .arg("count", count)
                .arg("target", mode.target_dir()),
            Confirmation::RevertOne { name, .. } => {
                Message::new("confirm_revert_app").arg("app", name)
            }
            Confirmation::RevertAll => Message::new("confirm_revert_all"),
            Confirmation::Reboot => Message::new("confirm_reboot"),
        }
    }
}

/// Progress of the conversion batch currently running in the engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchProgress {
    pub index: usize,
    pub total: usize,
    pub current: String,
    pub percent: f32,
    pub succeeded: usize,
    pub errors: Vec<String>,
    /// Hiding the progress view leaves the batch running.
    pub visible: bool,
}

// Actions triggered by the user from the UI layer.
#[derive(Clone, Debug, PartialEq)]
pub enum UserAction {
    Start,
    Refresh,
    SetSearch { list: AppListKind, term: String },
    ToggleSelection { package_name: String, selected: bool },
    SelectAllUser,
    SetMode(ConversionMode),
    SwitchTab(Tab),
    ShowDetails { package_name: String },
    ShowList,
    SetLanguage(String),
    RequestConvert,
    RequestRevert { package_name: String },
    RequestRevertAll,
    RequestReboot,
    Confirm,
    Cancel,
    HideProgress,
    DismissToast(u64),
}

// Reports sent back by the engine while it works through an effect.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    TranslationsLoaded {
        translations: Translations,
        saved_language: Option<String>,
        system_language: Language,
    },
    DataLoaded {
        user_apps: Vec<AppRecord>,
        system_apps: Vec<AppRecord>,
        converted_apps: Vec<ConvertedAppRecord>,
        host: HostStatus,
    },
    ConversionStarted {
        index: usize,
        total: usize,
        name: String,
    },
    ConversionSucceeded(ConvertedAppRecord),
    ConversionFailed {
        name: String,
        error: String,
    },
    BatchFinished,
    StorageFailed(String),
}

// Side effects requested by the reducer and carried out by the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    LoadTranslations,
    LoadData,
    ConvertBatch {
        apps: Vec<AppRecord>,
        mode: ConversionMode,
    },
    PersistConverted(Vec<ConvertedAppRecord>),
    ClearConverted,
    PersistLanguage(Language),
    Reboot,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Msg {
    Action(UserAction),
    Engine(EngineEvent),
}

impl From<UserAction> for Msg {
    fn from(action: UserAction) -> Self {
        Msg::Action(action)
    }
}

impl From<EngineEvent> for Msg {
    fn from(event: EngineEvent) -> Self {
        Msg::Engine(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_idempotent_and_ordered() {
        let mut selection = SelectionSet::default();
        selection.set("com.b", true);
        selection.set("com.a", true);
        selection.set("com.b", true);
        assert_eq!(selection.iter().collect::<Vec<_>>(), ["com.b", "com.a"]);

        selection.set("com.c", false);
        assert_eq!(selection.len(), 2);
        selection.set("com.b", false);
        selection.set("com.b", false);
        assert_eq!(selection.iter().collect::<Vec<_>>(), ["com.a"]);
    }

    #[test]
    fn double_toggle_restores_membership() {
        for initially_selected in [false, true] {
            let mut selection = SelectionSet::default();
            selection.set("com.p", initially_selected);
            let before = selection.contains("com.p");
            selection.set("com.p", !before);
            selection.set("com.p", before);
            assert_eq!(selection.contains("com.p"), before);
        }
    }

    #[test]
    fn confirmation_messages_carry_arguments() {
        let message = Confirmation::Convert {
            count: 2,
            mode: ConversionMode::PrivApp,
        }
        .message();
        assert_eq!(message.key, "confirm_convert");
        assert!(
            message
                .args
                .contains(&("target".to_owned(), "/system/priv-app/".to_owned()))
        );
    }
}
