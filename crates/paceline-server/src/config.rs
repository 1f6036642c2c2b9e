use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;

fn harden_secret_file_permissions(path: &str) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Public URL of this server (e.g., https://coach.example.com).
    pub public_url: Option<String>,
    /// Worker id mixed into generated ids; must differ between instances
    /// sharing a postgres database.
    #[serde(default)]
    pub worker_id: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            public_url: None,
            worker_id: 0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/paceline.db?mode=rwc".into(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiry")]
    pub jwt_expiry_seconds: u64,
    #[serde(default = "default_true")]
    pub registration_enabled: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: generate_random_hex(64),
            jwt_expiry_seconds: default_jwt_expiry(),
            registration_enabled: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

/// Generate a cryptographically random hex string of the given length.
fn generate_random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..16u8);
            char::from(if idx < 10 {
                b'0' + idx
            } else {
                b'a' + idx - 10
            })
        })
        .collect()
}

fn default_max_connections() -> u32 {
    20
}
fn default_jwt_expiry() -> u64 {
    86_400
}
fn default_true() -> bool {
    true
}
fn default_storage_path() -> String {
    "./data/uploads".into()
}
fn default_max_upload_size() -> u64 {
    52_428_800 // 50MB
}

fn looks_like_placeholder_secret(secret: &str) -> bool {
    let lowered = secret.to_ascii_lowercase();
    ["changeme", "change-me", "secret", "password", "example"]
        .iter()
        .any(|p| lowered.contains(p))
}

fn generate_config_template(config: &Config) -> String {
    format!(
        r#"# Paceline server configuration.
# Generated automatically on first run. Edit as needed.

[server]
bind_address = "{bind_address}"
# Set explicitly for internet-facing deployments:
# public_url = "https://your-domain-or-ip"
worker_id = {worker_id}

[database]
# sqlite (default) or a postgres:// URL
url = "{db_url}"
max_connections = {max_connections}

[auth]
jwt_secret = "{jwt_secret}"
jwt_expiry_seconds = {jwt_expiry}
registration_enabled = {registration_enabled}

[storage]
path = "{storage_path}"
max_upload_size = {max_upload_size}
"#,
        bind_address = config.server.bind_address,
        worker_id = config.server.worker_id,
        db_url = config.database.url,
        max_connections = config.database.max_connections,
        jwt_secret = config.auth.jwt_secret,
        jwt_expiry = config.auth.jwt_expiry_seconds,
        registration_enabled = config.auth.registration_enabled,
        storage_path = config.storage.path,
        max_upload_size = config.storage.max_upload_size,
    )
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if std::path::Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::info!("Config file not found at '{}', generating defaults...", path);
            let config = Config::default();

            if let Some(parent) = std::path::Path::new(path).parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, generate_config_template(&config))?;
            let _ = harden_secret_file_permissions(path);
            tracing::info!("Generated default config at '{}'", path);
            config
        };
        let _ = harden_secret_file_permissions(path);

        // Environment variable overrides
        if let Ok(value) = std::env::var("PACELINE_BIND_ADDRESS") {
            config.server.bind_address = value;
        }
        if let Ok(value) = std::env::var("PACELINE_PUBLIC_URL") {
            config.server.public_url = Some(value);
        }
        if let Ok(value) = std::env::var("PACELINE_WORKER_ID") {
            if let Ok(parsed) = value.parse::<u16>() {
                config.server.worker_id = parsed;
            }
        }
        if let Ok(value) = std::env::var("PACELINE_DATABASE_URL") {
            config.database.url = value;
        }
        if let Ok(value) = std::env::var("PACELINE_DATABASE_MAX_CONNECTIONS") {
            if let Ok(parsed) = value.parse::<u32>() {
                config.database.max_connections = parsed;
            }
        }
        if let Ok(value) = std::env::var("PACELINE_JWT_SECRET") {
            config.auth.jwt_secret = value;
        }
        if let Ok(value) = std::env::var("PACELINE_JWT_EXPIRY_SECONDS") {
            if let Ok(parsed) = value.parse::<u64>() {
                config.auth.jwt_expiry_seconds = parsed;
            }
        }
        if let Ok(value) = std::env::var("PACELINE_REGISTRATION_ENABLED") {
            if let Ok(parsed) = value.parse::<bool>() {
                config.auth.registration_enabled = parsed;
            }
        }
        if let Ok(value) = std::env::var("PACELINE_STORAGE_PATH") {
            config.storage.path = value;
        }
        if let Ok(value) = std::env::var("PACELINE_MAX_UPLOAD_SIZE") {
            if let Ok(parsed) = value.parse::<u64>() {
                config.storage.max_upload_size = parsed;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let jwt_secret = self.auth.jwt_secret.trim();
        if jwt_secret.len() < 32 || looks_like_placeholder_secret(jwt_secret) {
            anyhow::bail!(
                "Invalid auth.jwt_secret: use a strong random secret (at least 32 characters) and never leave placeholder values"
            );
        }
        paceline_db::detect_database_engine(&self.database.url)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Ok(())
    }
}
