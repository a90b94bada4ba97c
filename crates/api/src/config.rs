//! Cluster connection resolution.
//!
//! [`ConnectionSettings`] holds what the user passed on the command line; it
//! resolves into an explicit [`ClusterConfig`] that is handed to
//! [`crate::ClusterClient`]. Resolution order:
//!
//! 1. neither a kubeconfig nor a master URL: try the in-cluster service
//!    account, then fall back to the default kubeconfig location
//! 2. a kubeconfig: use its current context
//! 3. a master URL: overrides the kubeconfig server, or stands alone

use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::kubeconfig::{ContextSelection, Kubeconfig};

/// Environment variable listing kubeconfig files.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";
/// Service host injected into every pod.
pub const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
/// Service port injected into every pod.
pub const SERVICE_PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";
/// Mount point of the pod's service account credentials.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Errors raised while resolving the cluster connection.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid kubeconfig: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("kubeconfig references unknown {kind} '{name}'")]
    MissingEntry { kind: &'static str, name: String },
    #[error("invalid API server URL '{url}': {reason}")]
    InvalidServer { url: String, reason: String },
    #[error("not running inside a cluster: {0}")]
    NotInCluster(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// No flag was given, the in-cluster service account was unusable, and
    /// neither `$KUBECONFIG` nor `~/.kube/config` named a readable file.
    #[error("invalid configuration: no configuration has been provided; pass --kubeconfig or --master, or set KUBECONFIG")]
    Missing,
}

/// Connection inputs as supplied at process start.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    /// Path to a kubeconfig. Only required out-of-cluster.
    pub kubeconfig: Option<PathBuf>,
    /// API server address. Overrides the kubeconfig server.
    pub master_url: Option<String>,
}

/// How requests authenticate against the API server.
#[derive(Clone, Default)]
pub enum Auth {
    #[default]
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// TLS material in PEM form.
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    pub ca_pem: Option<Vec<u8>>,
    /// Client certificate followed by its private key.
    pub client_identity_pem: Option<Vec<u8>>,
    pub insecure_skip_verify: bool,
}

/// Fully resolved connection to one API server.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub server: Url,
    pub auth: Auth,
    pub tls: TlsSettings,
}

impl ClusterConfig {
    /// Unauthenticated connection to `server`.
    pub fn for_server(server: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            server: parse_server(server)?,
            auth: Auth::None,
            tls: TlsSettings::default(),
        })
    }
}

impl ConnectionSettings {
    pub fn new(kubeconfig: Option<PathBuf>, master_url: Option<String>) -> Self {
        Self {
            kubeconfig: kubeconfig.filter(|path| !path.as_os_str().is_empty()),
            master_url: master_url.filter(|url| !url.trim().is_empty()),
        }
    }

    /// Resolve the settings into a concrete cluster connection.
    pub fn resolve(&self) -> Result<ClusterConfig, ConfigError> {
        if self.kubeconfig.is_none() && self.master_url.is_none() {
            warn!("neither --kubeconfig nor --master was specified; using the in-cluster configuration, this might not work");
            match in_cluster_config(Path::new(SERVICE_ACCOUNT_DIR)) {
                Ok(config) => return Ok(config),
                Err(err) => warn!(error = %err, "in-cluster configuration unavailable; falling back to the default kubeconfig"),
            }
        }

        let selection = match self.kubeconfig_to_load()? {
            Some(path) => {
                debug!(path = %path.display(), "loading kubeconfig");
                let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                Kubeconfig::load(&path)?.select_current(&base_dir)?
            }
            None => ContextSelection::default(),
        };

        let server = match (&self.master_url, &selection.server) {
            (Some(master), _) => master.as_str(),
            (None, Some(server)) => server.as_str(),
            (None, None) => return Err(ConfigError::Missing),
        };

        Ok(ClusterConfig {
            server: parse_server(server)?,
            auth: selection.auth,
            tls: selection.tls,
        })
    }

    /// The explicit kubeconfig must exist; the default location is optional.
    fn kubeconfig_to_load(&self) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = &self.kubeconfig {
            return Ok(Some(path.clone()));
        }
        if self.master_url.is_some() {
            return Ok(None);
        }
        Ok(default_kubeconfig_path().filter(|path| path.is_file()))
    }
}

/// `$KUBECONFIG` (first entry) or `~/.kube/config`.
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    if let Some(paths) = env::var_os(KUBECONFIG_ENV) {
        if let Some(first) = env::split_paths(&paths).find(|path| !path.as_os_str().is_empty()) {
            return Some(first);
        }
    }
    dirs_next::home_dir().map(|home| home.join(".kube").join("config"))
}

/// Build a configuration from the pod environment and the service account mounted under `account_dir`.
pub fn in_cluster_config(account_dir: &Path) -> Result<ClusterConfig, ConfigError> {
    let host = env::var(SERVICE_HOST_ENV).unwrap_or_default();
    let port = env::var(SERVICE_PORT_ENV).unwrap_or_default();
    if host.is_empty() || port.is_empty() {
        return Err(ConfigError::NotInCluster(format!(
            "{} and {} must be defined",
            SERVICE_HOST_ENV, SERVICE_PORT_ENV
        )));
    }
    let host = if host.contains(':') { format!("[{}]", host) } else { host };

    let token_path = account_dir.join("token");
    let token = fs::read_to_string(&token_path).map_err(|source| ConfigError::Read { path: token_path, source })?;
    let ca_path = account_dir.join("ca.crt");
    let ca_pem = match fs::read(&ca_path) {
        Ok(pem) => Some(pem),
        Err(err) => {
            warn!(path = %ca_path.display(), error = %err, "service account CA not readable; using system roots");
            None
        }
    };

    Ok(ClusterConfig {
        server: parse_server(&format!("https://{}:{}", host, port))?,
        auth: Auth::Bearer(token.trim().to_string()),
        tls: TlsSettings {
            ca_pem,
            ..TlsSettings::default()
        },
    })
}

/// Accepts `host:port` shorthand by assuming https, like kubectl does.
fn parse_server(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let url = Url::parse(&candidate).map_err(|err| ConfigError::InvalidServer {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidServer {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidServer {
            url: raw.to_string(),
            reason: "missing host".into(),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
current-context: dev
clusters:
- name: dev
  cluster:
    server: https://dev.cluster.example:6443
contexts:
- name: dev
  context: {cluster: dev, user: dev}
users:
- name: dev
  user: {token: abc123}
"#;

    fn write_kubeconfig(dir: &Path) -> PathBuf {
        let path = dir.join("config");
        fs::write(&path, CONFIG).unwrap();
        path
    }

    #[test]
    fn explicit_kubeconfig_uses_current_context() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ConnectionSettings::new(Some(write_kubeconfig(dir.path())), None);

        let config = settings.resolve().unwrap();
        assert_eq!(config.server.as_str(), "https://dev.cluster.example:6443/");
        assert!(matches!(config.auth, Auth::Bearer(ref token) if token == "abc123"));
    }

    #[test]
    fn master_url_overrides_kubeconfig_server_but_keeps_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ConnectionSettings::new(Some(write_kubeconfig(dir.path())), Some("http://127.0.0.1:8001".into()));

        let config = settings.resolve().unwrap();
        assert_eq!(config.server.as_str(), "http://127.0.0.1:8001/");
        assert!(matches!(config.auth, Auth::Bearer(_)));
    }

    #[test]
    fn master_url_alone_is_enough() {
        let settings = ConnectionSettings::new(None, Some("localhost:8080".into()));
        let config = settings.resolve().unwrap();
        assert_eq!(config.server.as_str(), "https://localhost:8080/");
        assert!(matches!(config.auth, Auth::None));
    }

    #[test]
    fn missing_explicit_kubeconfig_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ConnectionSettings::new(Some(dir.path().join("absent")), None);
        assert!(matches!(settings.resolve(), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn falls_back_to_kubeconfig_env_outside_a_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_kubeconfig(dir.path());
        temp_env::with_vars(
            [
                (KUBECONFIG_ENV, Some(path.as_os_str())),
                (SERVICE_HOST_ENV, None),
                (SERVICE_PORT_ENV, None),
            ],
            || {
                let config = ConnectionSettings::default().resolve().unwrap();
                assert_eq!(config.server.host_str(), Some("dev.cluster.example"));
            },
        );
    }

    #[test]
    fn nothing_configured_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent");
        temp_env::with_vars(
            [
                (KUBECONFIG_ENV, Some(absent.as_os_str())),
                (SERVICE_HOST_ENV, None),
                (SERVICE_PORT_ENV, None),
            ],
            || {
                let err = ConnectionSettings::default().resolve().unwrap_err();
                assert!(matches!(err, ConfigError::Missing));
                assert!(err.to_string().contains("set KUBECONFIG"));
            },
        );
    }

    #[test]
    fn in_cluster_config_reads_service_account() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("token"), "pod-token\n").unwrap();
        fs::write(dir.path().join("ca.crt"), "CA").unwrap();
        temp_env::with_vars([(SERVICE_HOST_ENV, Some("10.96.0.1")), (SERVICE_PORT_ENV, Some("443"))], || {
            let config = in_cluster_config(dir.path()).unwrap();
            assert_eq!(config.server.as_str(), "https://10.96.0.1/");
            assert!(matches!(config.auth, Auth::Bearer(ref token) if token == "pod-token"));
            assert_eq!(config.tls.ca_pem.as_deref(), Some(&b"CA"[..]));
        });
    }

    #[test]
    fn in_cluster_config_requires_service_env() {
        temp_env::with_vars([(SERVICE_HOST_ENV, None::<&str>), (SERVICE_PORT_ENV, None)], || {
            assert!(matches!(
                in_cluster_config(Path::new("/nonexistent")),
                Err(ConfigError::NotInCluster(_))
            ));
        });
    }

    #[test]
    fn rejects_non_http_servers() {
        assert!(ClusterConfig::for_server("ftp://example.com").is_err());
        assert!(ClusterConfig::for_server("http://127.0.0.1:8080").is_ok());
    }
}
