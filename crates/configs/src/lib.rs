use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub task_queue: TaskQueueConfig,
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
        Self { host: "127.0.0.1".into(), port: 8888, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_acquire_timeout() -> u64 { 30 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

/// How outer exposure objects are published by the cluster network.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NetMode {
    #[default]
    ClusterIp,
    NodePort,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct KubernetesConfig {
    /// Path to a kubeconfig file; in-cluster / default discovery when absent.
    #[serde(default)]
    pub kubeconfig: Option<String>,
    #[serde(default)]
    pub net_mode: NetMode,
    /// Suffix used to build the auto domain label of outer exposure objects.
    #[serde(default)]
    pub domain_suffix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskQueueConfig {
    pub endpoint: String,
    #[serde(default = "default_queue_timeout")]
    pub timeout_secs: u64,
}

fn default_queue_timeout() -> u64 { 10 }

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self { endpoint: "http://127.0.0.1:6300".into(), timeout_secs: default_queue_timeout() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_local_path")]
    pub local_data_path: String,
    #[serde(default = "default_share_path")]
    pub share_data_path: String,
}

fn default_local_path() -> String { "/grlocaldata".into() }
fn default_share_path() -> String { "/grdata".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { local_data_path: default_local_path(), share_data_path: default_share_path() }
    }
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
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to an all-default
    /// config populated from the environment when no file is present.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default().unwrap_or_default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.kubernetes.normalize_from_env();
        self.task_queue.normalize_from_env();
        self.task_queue.validate()?;
        self.storage.normalize_from_env();
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            if !host.trim().is_empty() { self.host = host; }
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl KubernetesConfig {
    pub fn normalize_from_env(&mut self) {
        if self.kubeconfig.is_none() {
            self.kubeconfig = std::env::var("KUBECONFIG").ok().filter(|p| !p.trim().is_empty());
        }
        // legacy switch: the midonet overlay publishes outer services on node ports
        if std::env::var("CUR_NET").map(|v| v == "midonet").unwrap_or(false) {
            self.net_mode = NetMode::NodePort;
        }
        if self.domain_suffix.trim().is_empty() {
            if let Ok(d) = std::env::var("EX_DOMAIN") {
                self.domain_suffix = d;
            }
        }
    }
}

impl TaskQueueConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(ep) = std::env::var("MQ_API") {
            if !ep.trim().is_empty() { self.endpoint = ep; }
        }
        self.endpoint = self.endpoint.trim_end_matches('/').to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(anyhow!("task_queue.endpoint must start with http(s)://"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("task_queue.timeout_secs must be positive"));
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(p) = std::env::var("LOCAL_DATA_PATH") {
            if !p.trim().is_empty() { self.local_data_path = p; }
        }
        if let Ok(p) = std::env::var("SHARE_DATA_PATH") {
            if !p.trim().is_empty() { self.share_data_path = p; }
        }
    }
}
