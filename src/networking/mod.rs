use std::path::PathBuf;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, StatusCode};
use tokio::fs;

/// Where snapshots and locale files are served from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebrootSource {
    Directory(PathBuf),
    Http(String),
}

impl WebrootSource {
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            WebrootSource::Http(value.trim_end_matches('/').to_owned())
        } else {
            WebrootSource::Directory(PathBuf::from(value))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            WebrootSource::Directory(dir) => dir.display().to_string(),
            WebrootSource::Http(base) => base.clone(),
        }
    }
}

/// Result of a fetch that reached its target.
#[derive(Debug)]
pub enum FetchOutcome {
    Body(Vec<u8>),
    /// The source answered but without the resource (HTTP status or missing file).
    Status(u16),
}

#[derive(Clone)]
pub struct NetworkClient {
    client: Client,
    source: WebrootSource,
}

impl NetworkClient {
    pub fn new(source: WebrootSource) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self { client, source }
    }

    /// Fetch `relative` from the webroot. `Err` means the transport itself failed.
    pub async fn fetch(&self, relative: &str) -> Result<FetchOutcome, String> {
        match &self.source {
            WebrootSource::Directory(dir) => {
                let path = dir.join(relative);
                debug!("fetch: reading {}", path.display());
                match fs::read(&path).await {
                    Ok(bytes) => Ok(FetchOutcome::Body(bytes)),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        Ok(FetchOutcome::Status(StatusCode::NOT_FOUND.as_u16()))
                    }
                    Err(err) => Err(format!("failed to read {}: {err}", path.display())),
                }
            }
            WebrootSource::Http(base) => {
                let url = format!("{base}/{}", relative.trim_start_matches('/'));
                debug!("fetch: GET {url}");
                let resp = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| format!("GET {url} failed: {e}"))?;
                let status = resp.status();
                if !status.is_success() {
                    return Ok(FetchOutcome::Status(status.as_u16()));
                }
                let bytes = resp
                    .bytes()
                    .await
                    .map_err(|e| format!("reading {url} failed: {e}"))?;
                Ok(FetchOutcome::Body(bytes.to_vec()))
            }
        }
    }

    /// Fetch and decode a JSON document, treating any non-success status as an error.
    pub async fn fetch_json<T>(&self, relative: &str) -> Result<T, String>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.fetch(relative).await? {
            FetchOutcome::Body(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| format!("invalid JSON in {relative}: {e}")),
            FetchOutcome::Status(code) => Err(format!("{relative} returned status {code}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_webroot_kind() {
        assert_eq!(
            WebrootSource::parse("http://10.0.2.2:8080/"),
            WebrootSource::Http("http://10.0.2.2:8080".into())
        );
        assert_eq!(
            WebrootSource::parse("module/webroot"),
            WebrootSource::Directory(PathBuf::from("module/webroot"))
        );
    }

    #[tokio::test]
    async fn missing_file_reports_not_found_status() {
        let dir = tempfile::tempdir().unwrap();
        let client = NetworkClient::new(WebrootSource::Directory(dir.path().to_path_buf()));
        match client.fetch("applist.json").await {
            Ok(FetchOutcome::Status(code)) => assert_eq!(code, 404),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn decodes_json_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), r#"{"a": 1}"#).unwrap();
        let client = NetworkClient::new(WebrootSource::Directory(dir.path().to_path_buf()));
        let value: serde_json::Value = client.fetch_json("data.json").await.unwrap();
        assert_eq!(value["a"], 1);

        let missing: Result<serde_json::Value, String> = client.fetch_json("nope.json").await;
        assert!(missing.unwrap_err().contains("404"));
    }
}
