use std::collections::HashMap;

use log::{error, info, warn};

use crate::engine::models::AppRecord;
use crate::i18n::{Language, SUPPORTED_LANGUAGES, Translations};
use crate::networking::{FetchOutcome, NetworkClient};

pub const USER_SNAPSHOT: &str = "applist.json";
pub const SYSTEM_SNAPSHOT: &str = "systemlist.json";
const DEFAULT_ICON: &str = "assets/favicon.svg";

/// Reads the pre-generated app snapshots and locale tables from the webroot.
#[derive(Clone)]
pub struct Catalog {
    client: NetworkClient,
}

impl Catalog {
    pub fn new(client: NetworkClient) -> Self {
        Self { client }
    }

    pub async fn load_user_apps(&self) -> Vec<AppRecord> {
        match self.client.fetch(USER_SNAPSHOT).await {
            Ok(FetchOutcome::Body(bytes)) => match serde_json::from_slice::<Vec<AppRecord>>(&bytes)
            {
                Ok(apps) => {
                    info!("loaded {} user apps from cache", apps.len());
                    apps
                }
                Err(err) => {
                    warn!("failed to parse cached user apps, using fallback: {err}");
                    mock_user_apps()
                }
            },
            Ok(FetchOutcome::Status(code)) => {
                warn!("{USER_SNAPSHOT} not found (status {code}), using mock data");
                demo_user_apps()
            }
            Err(err) => {
                warn!("failed to load cached user apps, using fallback: {err}");
                mock_user_apps()
            }
        }
    }

    pub async fn load_system_apps(&self) -> Vec<AppRecord> {
        match self.client.fetch_json::<Vec<AppRecord>>(SYSTEM_SNAPSHOT).await {
            Ok(apps) => {
                info!("loaded {} system apps from cache", apps.len());
                apps
            }
            Err(err) => {
                warn!("failed to load cached system apps, using fallback: {err}");
                mock_system_apps()
            }
        }
    }

    /// Load every supported locale; any failure falls back to the built-in minimal set.
    pub async fn load_translations(&self) -> Translations {
        let mut translations = Translations::new();
        for language in SUPPORTED_LANGUAGES {
            let path = locale_path(language);
            match self
                .client
                .fetch_json::<HashMap<String, String>>(&path)
                .await
            {
                Ok(table) => translations.insert(language, table),
                Err(err) => {
                    error!("failed to load translations: {err}");
                    return Translations::fallback();
                }
            }
        }
        translations
    }
}

fn locale_path(language: Language) -> String {
    format!("locales/{}.json", language.code())
}

/// Shown when the snapshot producer has not written `applist.json` yet.
pub fn demo_user_apps() -> Vec<AppRecord> {
    vec![
        AppRecord::new("My Awesome App", "com.example.awesomeapp").with_icon(DEFAULT_ICON),
        AppRecord::new("Another Cool App", "com.example.coolapp").with_icon(DEFAULT_ICON),
        AppRecord::new("Productivity Pro", "com.example.prodpro").with_icon(DEFAULT_ICON),
    ]
}

pub fn mock_user_apps() -> Vec<AppRecord> {
    vec![
        AppRecord::new("Mock App 1", "com.mock.app1")
            .with_details("1.0", "12MB")
            .with_icon(DEFAULT_ICON),
        AppRecord::new("Mock App 2", "com.mock.app2")
            .with_details("2.1", "25MB")
            .with_icon(DEFAULT_ICON),
    ]
}

pub fn mock_system_apps() -> Vec<AppRecord> {
    vec![
        AppRecord::new("Mock System App", "com.mock.system")
            .with_details("1.0", "5MB")
            .with_icon(DEFAULT_ICON),
    ]
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::networking::WebrootSource;

    fn catalog_in(dir: &std::path::Path) -> Catalog {
        Catalog::new(NetworkClient::new(WebrootSource::Directory(
            dir.to_path_buf(),
        )))
    }

    fn packages(apps: &[AppRecord]) -> Vec<&str> {
        apps.iter().map(|app| app.package_name.as_str()).collect()
    }

    #[tokio::test]
    async fn missing_user_snapshot_uses_demo_list() {
        let dir = tempfile::tempdir().unwrap();
        let apps = catalog_in(dir.path()).load_user_apps().await;
        assert_eq!(
            packages(&apps),
            [
                "com.example.awesomeapp",
                "com.example.coolapp",
                "com.example.prodpro"
            ]
        );
    }

    #[tokio::test]
    async fn http_404_uses_demo_list() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut request = [0u8; 1024];
                let _ = stream.read(&mut request).await;
                let _ = stream
                    .write_all(
                        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    )
                    .await;
                let _ = stream.shutdown().await;
            }
        });

        let catalog = Catalog::new(NetworkClient::new(WebrootSource::parse(&format!(
            "http://{addr}/"
        ))));
        let apps = catalog.load_user_apps().await;
        assert_eq!(
            packages(&apps),
            [
                "com.example.awesomeapp",
                "com.example.coolapp",
                "com.example.prodpro"
            ]
        );
    }

    #[tokio::test]
    async fn corrupt_user_snapshot_uses_mock_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(USER_SNAPSHOT), "{not json").unwrap();
        let apps = catalog_in(dir.path()).load_user_apps().await;
        assert_eq!(packages(&apps), ["com.mock.app1", "com.mock.app2"]);
    }

    #[tokio::test]
    async fn reads_snapshots_when_present() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(USER_SNAPSHOT),
            r#"[{"name": "Maps", "packageName": "com.example.maps"}]"#,
        )
        .unwrap();
        fs::write(dir.path().join(SYSTEM_SNAPSHOT), "[]").unwrap();
        let catalog = catalog_in(dir.path());
        assert_eq!(packages(&catalog.load_user_apps().await), ["com.example.maps"]);
        assert!(catalog.load_system_apps().await.is_empty());
    }

    #[tokio::test]
    async fn missing_system_snapshot_uses_mock_list() {
        let dir = tempfile::tempdir().unwrap();
        let apps = catalog_in(dir.path()).load_system_apps().await;
        assert_eq!(packages(&apps), ["com.mock.system"]);
    }

    #[tokio::test]
    async fn translations_fall_back_when_a_locale_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("locales")).unwrap();
        fs::write(
            dir.path().join("locales").join("en.json"),
            r#"{"revert": "Revert"}"#,
        )
        .unwrap();
        let translations = catalog_in(dir.path()).load_translations().await;
        assert_eq!(translations, Translations::fallback());
    }

    #[tokio::test]
    async fn loads_all_locales() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("locales")).unwrap();
        fs::write(
            dir.path().join("locales").join("en.json"),
            r#"{"revert": "Revert"}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("locales").join("zh.json"),
            r#"{"revert": "还原"}"#,
        )
        .unwrap();
        let translations = catalog_in(dir.path()).load_translations().await;
        assert_eq!(translations.lookup(Language::Chinese, "revert"), "还原");
        assert_eq!(translations.lookup(Language::English, "revert"), "Revert");
    }

    #[tokio::test]
    async fn bundled_locales_load() {
        let webroot = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("webroot");
        let translations = catalog_in(&webroot).load_translations().await;
        assert_ne!(translations, Translations::fallback());
        for key in ["confirm_convert", "status_host", "host_magisk", "theme_dark"] {
            assert_ne!(translations.lookup(Language::English, key), key);
            assert_ne!(translations.lookup(Language::Chinese, key), key);
        }
    }
}
