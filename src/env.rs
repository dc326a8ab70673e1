use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR_VAR: &str = "OUKARO_DATA_DIR";
const DEFAULT_WEBROOT: &str = "webroot";

/// Returns the root directory used by the manager for its own state.
pub fn default_app_dir() -> PathBuf {
    if let Some(dir) = env::var_os(DATA_DIR_VAR).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    let base = match env::consts::OS {
        "windows" => env::var_os("LOCALAPPDATA")
            .or_else(|| env::var_os("APPDATA"))
            .map(PathBuf::from),
        "macos" => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join("Library").join("Application Support")),
        _ => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join(".local").join("share")),
    }
    .unwrap_or_else(|| PathBuf::from("."));

    base.join("oukaro-manager")
}

/// Location of the snapshot and locale files when none is given on the command line.
pub fn default_webroot() -> String {
    DEFAULT_WEBROOT.to_owned()
}

pub fn local_storage_file(data_dir: &Path) -> PathBuf {
    data_dir.join("local_storage.json")
}

pub fn conversion_queue_file(data_dir: &Path) -> PathBuf {
    data_dir.join("conversion_queue.txt")
}

/// Create the on-disk folder layout expected by the manager.
pub fn ensure_base_dirs(data_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(data_dir)
}

/// Root manager installation visible from this process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostStatus {
    KernelSu,
    Magisk,
    Unavailable,
}

impl HostStatus {
    pub fn translation_key(self) -> &'static str {
        match self {
            HostStatus::KernelSu => "host_kernelsu",
            HostStatus::Magisk => "host_magisk",
            HostStatus::Unavailable => "host_unavailable",
        }
    }
}

pub fn detect_host_status() -> HostStatus {
    detect_host_status_in(Path::new("/data/adb"))
}

fn detect_host_status_in(adb_dir: &Path) -> HostStatus {
    if adb_dir.join("ksu").exists() || adb_dir.join("ksud").exists() {
        HostStatus::KernelSu
    } else if adb_dir.join("magisk").exists() {
        HostStatus::Magisk
    } else {
        HostStatus::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kernelsu_before_magisk() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_host_status_in(dir.path()), HostStatus::Unavailable);

        fs::create_dir(dir.path().join("magisk")).unwrap();
        assert_eq!(detect_host_status_in(dir.path()), HostStatus::Magisk);

        fs::create_dir(dir.path().join("ksu")).unwrap();
        assert_eq!(detect_host_status_in(dir.path()), HostStatus::KernelSu);
    }

    #[test]
    fn storage_paths_live_under_data_dir() {
        let root = Path::new("/tmp/oukaro");
        assert_eq!(
            local_storage_file(root),
            PathBuf::from("/tmp/oukaro/local_storage.json")
        );
        assert_eq!(
            conversion_queue_file(root),
            PathBuf::from("/tmp/oukaro/conversion_queue.txt")
        );
    }
}
