use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Which storage adapter backs the entry API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Datastore,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Artificial per-operation latency for the memory adapter, in
    /// milliseconds. Zero disables it.
    #[serde(default)]
    pub sleep_ms: u64,
    #[serde(default)]
    pub datastore: DatastoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreConfig {
    #[serde(default)]
    pub project_id: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            namespace: default_namespace(),
            endpoint: default_endpoint(),
        }
    }
}

fn default_namespace() -> String {
    "jacek".to_string()
}

fn default_endpoint() -> String {
    "https://datastore.googleapis.com".to_string()
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load from `CONFIG_PATH` (default `config.toml`), filling gaps from
    /// env vars. A missing file is not an error: the demo runs with pure
    /// env/defaults (memory backend). A malformed file still is.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound) =>
            {
                AppConfig::default()
            }
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize_from_env()?;
        self.storage.normalize_from_env();
        self.storage.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize_from_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            if !host.trim().is_empty() {
                self.host = host;
            }
        }
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        // SERVER_PORT wins over the PORT convention from hosted runtimes.
        let env_port = std::env::var("SERVER_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .and_then(|p| p.parse::<u16>().ok());
        if let Some(p) = env_port {
            self.port = p;
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 {
                self.worker_threads = Some(4);
            }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(backend) = std::env::var("STORAGE_BACKEND") {
            match backend.to_lowercase().as_str() {
                "memory" => self.backend = StorageBackend::Memory,
                "datastore" => self.backend = StorageBackend::Datastore,
                _ => {}
            }
        }
        if let Some(ms) = std::env::var("SLEEP_MS").ok().and_then(|v| v.parse::<u64>().ok()) {
            self.sleep_ms = ms;
        }
        self.datastore.normalize_from_env();
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::Datastore
            && self.datastore.project_id.trim().is_empty()
        {
            return Err(anyhow!(
                "storage.datastore.project_id is empty; set it in config.toml or DATASTORE_PROJECT_ID"
            ));
        }
        Ok(())
    }
}

impl DatastoreConfig {
    pub fn normalize_from_env(&mut self) {
        if self.project_id.trim().is_empty() {
            if let Ok(project) = std::env::var("DATASTORE_PROJECT_ID") {
                self.project_id = project;
            }
        }
        if let Ok(ns) = std::env::var("DATASTORE_NAMESPACE") {
            if !ns.trim().is_empty() {
                self.namespace = ns;
            }
        }
        if let Ok(endpoint) = std::env::var("DATASTORE_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_without_config_file() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert_eq!(cfg.storage.sleep_ms, 0);
        assert_eq!(cfg.storage.datastore.namespace, "jacek");
    }

    #[test]
    fn parses_full_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9090
            worker_threads = 2

            [storage]
            backend = "datastore"
            sleep_ms = 250

            [storage.datastore]
            project_id = "demo-project"
            namespace = "notes"
            endpoint = "http://localhost:8081"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.storage.backend, StorageBackend::Datastore);
        assert_eq!(cfg.storage.sleep_ms, 250);
        assert_eq!(cfg.storage.datastore.project_id, "demo-project");
        assert_eq!(cfg.storage.datastore.namespace, "notes");
        assert_eq!(cfg.storage.datastore.endpoint, "http://localhost:8081");
    }

    #[test]
    fn partial_toml_uses_section_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.datastore.endpoint, "https://datastore.googleapis.com");
    }

    #[test]
    fn datastore_backend_requires_project_id() {
        let storage = StorageConfig {
            backend: StorageBackend::Datastore,
            ..Default::default()
        };
        assert!(storage.validate().is_err());
    }
}
