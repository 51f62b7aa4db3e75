use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub service: Option<ServiceConfig>,
    pub processing: Option<ProcessingConfig>,
    pub cleanup: Option<CleanupConfig>,
    pub limits: Option<LimitsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub upload_dir: Option<String>,
    pub results_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub workers: Option<usize>,
    pub chunk_size: Option<usize>,
    pub max_file_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupConfig {
    pub delete_delay_secs: Option<u64>,
    pub retention_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_requests: Option<u32>,
    pub window_seconds: Option<u64>,
}

/// Platform config directory path: `<config_dir>/pagemill/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pagemill").join("config.toml"))
}

/// Load config by cascading CWD `.pagemill.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".pagemill.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        service: Some(ServiceConfig {
            host: overlay
                .service
                .as_ref()
                .and_then(|s| s.host.clone())
                .or_else(|| base.service.as_ref().and_then(|s| s.host.clone())),
            port: overlay
                .service
                .as_ref()
                .and_then(|s| s.port)
                .or_else(|| base.service.as_ref().and_then(|s| s.port)),
            upload_dir: overlay
                .service
                .as_ref()
                .and_then(|s| s.upload_dir.clone())
                .or_else(|| base.service.as_ref().and_then(|s| s.upload_dir.clone())),
            results_dir: overlay
                .service
                .as_ref()
                .and_then(|s| s.results_dir.clone())
                .or_else(|| base.service.as_ref().and_then(|s| s.results_dir.clone())),
        }),
        processing: Some(ProcessingConfig {
            workers: overlay
                .processing
                .as_ref()
                .and_then(|p| p.workers)
                .or_else(|| base.processing.as_ref().and_then(|p| p.workers)),
            chunk_size: overlay
                .processing
                .as_ref()
                .and_then(|p| p.chunk_size)
                .or_else(|| base.processing.as_ref().and_then(|p| p.chunk_size)),
            max_file_mb: overlay
                .processing
                .as_ref()
                .and_then(|p| p.max_file_mb)
                .or_else(|| base.processing.as_ref().and_then(|p| p.max_file_mb)),
        }),
        cleanup: Some(CleanupConfig {
            delete_delay_secs: overlay
                .cleanup
                .as_ref()
                .and_then(|c| c.delete_delay_secs)
                .or_else(|| base.cleanup.as_ref().and_then(|c| c.delete_delay_secs)),
            retention_secs: overlay
                .cleanup
                .as_ref()
                .and_then(|c| c.retention_secs)
                .or_else(|| base.cleanup.as_ref().and_then(|c| c.retention_secs)),
        }),
        limits: Some(LimitsConfig {
            max_requests: overlay
                .limits
                .as_ref()
                .and_then(|l| l.max_requests)
                .or_else(|| base.limits.as_ref().and_then(|l| l.max_requests)),
            window_seconds: overlay
                .limits
                .as_ref()
                .and_then(|l| l.window_seconds)
                .or_else(|| base.limits.as_ref().and_then(|l| l.window_seconds)),
        }),
    }
}
