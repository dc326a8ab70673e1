use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::sanitize_name;

/// One installed application as listed in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    #[serde(alias = "app_name")]
    pub name: String,
    #[serde(alias = "package_name")]
    pub package_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, alias = "apk_path", skip_serializing_if = "Option::is_none")]
    pub apk_path: Option<String>,
}

impl AppRecord {
    pub fn new(name: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_name: package_name.into(),
            version: None,
            size: None,
            icon: None,
            apk_path: None,
        }
    }

    pub fn with_details(mut self, version: &str, size: &str) -> Self {
        self.version = Some(version.to_owned());
        self.size = Some(size.to_owned());
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_owned());
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionMode {
    #[default]
    #[serde(rename = "system")]
    System,
    #[serde(rename = "priv-app")]
    PrivApp,
}

impl ConversionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionMode::System => "system",
            ConversionMode::PrivApp => "priv-app",
        }
    }

    pub fn target_dir(self) -> &'static str {
        match self {
            ConversionMode::System => "/system/app/",
            ConversionMode::PrivApp => "/system/priv-app/",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(ConversionMode::System),
            "priv-app" | "priv" => Some(ConversionMode::PrivApp),
            _ => None,
        }
    }
}

/// An application that has been handed to the privileged converter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedAppRecord {
    #[serde(flatten)]
    pub app: AppRecord,
    pub conversion_mode: ConversionMode,
    pub converted_at: DateTime<Utc>,
}

impl ConvertedAppRecord {
    pub fn new(app: AppRecord, mode: ConversionMode, converted_at: DateTime<Utc>) -> Self {
        Self {
            app,
            conversion_mode: mode,
            converted_at,
        }
    }

    pub fn package_name(&self) -> &str {
        &self.app.package_name
    }

    pub fn name(&self) -> &str {
        &self.app.name
    }

    /// The user-app entry put back when a conversion is reverted.
    pub fn reverted_app(&self) -> AppRecord {
        AppRecord::new(self.app.name.clone(), self.app.package_name.clone())
            .with_details(REVERTED_VERSION, REVERTED_SIZE)
    }
}

const REVERTED_VERSION: &str = "1.0.0";
const REVERTED_SIZE: &str = "10MB";

/// Delimited record consumed by the host conversion script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionRecord {
    pub package_name: String,
    pub mode: ConversionMode,
    pub sanitized_name: String,
    pub apk_path: String,
}

impl ConversionRecord {
    pub fn for_app(app: &AppRecord, mode: ConversionMode) -> Self {
        Self {
            package_name: app.package_name.clone(),
            mode,
            sanitized_name: sanitize_name(&app.name),
            apk_path: app.apk_path.clone().unwrap_or_default(),
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.package_name,
            self.mode.as_str(),
            self.sanitized_name,
            self.apk_path
        )
    }
}

/// Aggregate outcome of a conversion batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_snapshot_entries_in_either_spelling() {
        let raw = r#"[
            {"name": "Maps", "packageName": "com.example.maps", "version": "2.1", "size": "30MB"},
            {"app_name": "Notes", "package_name": "com.example.notes", "apk_path": "/data/app/notes/base.apk"}
        ]"#;
        let apps: Vec<AppRecord> = serde_json::from_str(raw).unwrap();
        assert_eq!(apps[0].package_name, "com.example.maps");
        assert_eq!(apps[0].version.as_deref(), Some("2.1"));
        assert_eq!(apps[1].name, "Notes");
        assert_eq!(
            apps[1].apk_path.as_deref(),
            Some("/data/app/notes/base.apk")
        );
    }

    #[test]
    fn converted_record_serializes_flat() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let record = ConvertedAppRecord::new(
            AppRecord::new("Maps", "com.example.maps"),
            ConversionMode::PrivApp,
            at,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["packageName"], "com.example.maps");
        assert_eq!(value["conversion_mode"], "priv-app");
        assert_eq!(value["converted_at"], "2026-03-01T12:00:00Z");

        let back: ConvertedAppRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn builds_hand_off_line() {
        let mut app = AppRecord::new("Cool App!", "com.example.cool");
        app.apk_path = Some("/data/app/cool/base.apk".into());
        let record = ConversionRecord::for_app(&app, ConversionMode::System);
        assert_eq!(
            record.to_line(),
            "com.example.cool|system|Cool_App_|/data/app/cool/base.apk"
        );

        let bare = ConversionRecord::for_app(&AppRecord::new("X", "x.y"), ConversionMode::PrivApp);
        assert_eq!(bare.to_line(), "x.y|priv-app|X|");
    }

    #[test]
    fn reverted_app_uses_placeholder_details() {
        let record = ConvertedAppRecord::new(
            AppRecord::new("Maps", "com.example.maps").with_details("9.9", "1GB"),
            ConversionMode::System,
            Utc::now(),
        );
        let app = record.reverted_app();
        assert_eq!(app.version.as_deref(), Some("1.0.0"));
        assert_eq!(app.size.as_deref(), Some("10MB"));
        assert_eq!(app.package_name, "com.example.maps");
    }
}
