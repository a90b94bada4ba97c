//! Minimal kubeconfig model.
//!
//! Only the fields needed to reach an API server are read: the current
//! context, its cluster (server, CA, TLS verification) and its user
//! (token, client certificate or basic credentials). Unknown keys are ignored
//! so exec plugins and provider sections do not break parsing.

use std::{
    fs,
    path::{Path, PathBuf},
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;

use crate::config::{Auth, ConfigError, TlsSettings};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Kubeconfig {
    #[serde(default)]
    pub current_context: Option<String>,
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterEntry {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub certificate_authority: Option<PathBuf>,
    #[serde(default)]
    pub certificate_authority_data: Option<String>,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextEntry {
    pub cluster: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: UserEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserEntry {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    pub token_file: Option<PathBuf>,
    #[serde(default)]
    pub client_certificate: Option<PathBuf>,
    #[serde(default)]
    pub client_certificate_data: Option<String>,
    #[serde(default)]
    pub client_key: Option<PathBuf>,
    #[serde(default)]
    pub client_key_data: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Connection details extracted from the current context.
#[derive(Debug, Clone, Default)]
pub struct ContextSelection {
    pub server: Option<String>,
    pub auth: Auth,
    pub tls: TlsSettings,
}

impl Kubeconfig {
    /// Read and parse a kubeconfig file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Resolve the current context into connection details.
    ///
    /// Relative file references resolve against `base_dir`, the directory
    /// holding the kubeconfig. A missing `current-context` yields an empty
    /// selection so that an explicit master URL can still be used.
    pub fn select_current(&self, base_dir: &Path) -> Result<ContextSelection, ConfigError> {
        let Some(context_name) = self.current_context.as_deref().filter(|name| !name.is_empty()) else {
            return Ok(ContextSelection::default());
        };
        let context = self
            .contexts
            .iter()
            .find(|entry| entry.name == context_name)
            .map(|entry| &entry.context)
            .ok_or_else(|| ConfigError::MissingEntry {
                kind: "context",
                name: context_name.to_string(),
            })?;
        let cluster = self
            .clusters
            .iter()
            .find(|entry| entry.name == context.cluster)
            .map(|entry| &entry.cluster)
            .ok_or_else(|| ConfigError::MissingEntry {
                kind: "cluster",
                name: context.cluster.clone(),
            })?;
        let user = match context.user.as_deref() {
            Some(user_name) => Some(
                self.users
                    .iter()
                    .find(|entry| entry.name == user_name)
                    .map(|entry| &entry.user)
                    .ok_or_else(|| ConfigError::MissingEntry {
                        kind: "user",
                        name: user_name.to_string(),
                    })?,
            ),
            None => None,
        };

        let mut tls = TlsSettings {
            ca_pem: inline_or_file(cluster.certificate_authority_data.as_deref(), cluster.certificate_authority.as_deref(), base_dir)?,
            client_identity_pem: None,
            insecure_skip_verify: cluster.insecure_skip_tls_verify,
        };
        let auth = match user {
            Some(user) => {
                tls.client_identity_pem = client_identity(user, base_dir)?;
                user_auth(user, base_dir)?
            }
            None => Auth::None,
        };

        Ok(ContextSelection {
            server: cluster.server.clone(),
            auth,
            tls,
        })
    }
}

fn user_auth(user: &UserEntry, base_dir: &Path) -> Result<Auth, ConfigError> {
    if let Some(token) = user.token.as_deref().filter(|token| !token.is_empty()) {
        return Ok(Auth::Bearer(token.to_string()));
    }
    if let Some(token_file) = &user.token_file {
        let path = resolve_relative(token_file, base_dir);
        let token = fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })?;
        return Ok(Auth::Bearer(token.trim().to_string()));
    }
    if let (Some(username), Some(password)) = (&user.username, &user.password) {
        return Ok(Auth::Basic {
            username: username.clone(),
            password: password.clone(),
        });
    }
    Ok(Auth::None)
}

/// Certificate and key concatenated into one PEM bundle, as reqwest expects.
fn client_identity(user: &UserEntry, base_dir: &Path) -> Result<Option<Vec<u8>>, ConfigError> {
    let certificate = inline_or_file(user.client_certificate_data.as_deref(), user.client_certificate.as_deref(), base_dir)?;
    let key = inline_or_file(user.client_key_data.as_deref(), user.client_key.as_deref(), base_dir)?;
    match (certificate, key) {
        (Some(mut certificate), Some(key)) => {
            if !certificate.ends_with(b"\n") {
                certificate.push(b'\n');
            }
            certificate.extend_from_slice(&key);
            Ok(Some(certificate))
        }
        (None, None) => Ok(None),
        _ => Err(ConfigError::Invalid(
            "client certificate and client key must be configured together".into(),
        )),
    }
}

/// Inline base64 data wins over a file reference.
fn inline_or_file(data: Option<&str>, file: Option<&Path>, base_dir: &Path) -> Result<Option<Vec<u8>>, ConfigError> {
    if let Some(data) = data.filter(|data| !data.trim().is_empty()) {
        let decoded = STANDARD
            .decode(data.trim())
            .map_err(|err| ConfigError::Invalid(format!("invalid base64 data: {}", err)))?;
        return Ok(Some(decoded));
    }
    match file {
        Some(file) => {
            let path = resolve_relative(file, base_dir);
            fs::read(&path).map(Some).map_err(|source| ConfigError::Read { path, source })
        }
        None => Ok(None),
    }
}

fn resolve_relative(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIND_CONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: kind-argo
clusters:
- name: kind-argo
  cluster:
    server: https://127.0.0.1:6443
    certificate-authority-data: Q0EtUEVN
- name: other
  cluster:
    server: https://10.0.0.1
contexts:
- name: kind-argo
  context:
    cluster: kind-argo
    user: kind-argo
    namespace: argo
users:
- name: kind-argo
  user:
    client-certificate-data: Q0VSVA==
    client-key-data: S0VZ
preferences: {}
"#;

    #[test]
    fn selects_current_context_and_decodes_inline_data() {
        let kubeconfig = Kubeconfig::from_yaml(KIND_CONFIG).unwrap();
        let selection = kubeconfig.select_current(Path::new("/nowhere")).unwrap();

        assert_eq!(selection.server.as_deref(), Some("https://127.0.0.1:6443"));
        assert_eq!(selection.tls.ca_pem.as_deref(), Some(&b"CA-PEM"[..]));
        assert_eq!(selection.tls.client_identity_pem.as_deref(), Some(&b"CERT\nKEY"[..]));
        assert!(!selection.tls.insecure_skip_verify);
        assert!(matches!(selection.auth, Auth::None));
    }

    #[test]
    fn token_file_resolves_relative_to_kubeconfig_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("token"), "s3cr3t\n").unwrap();
        let kubeconfig = Kubeconfig::from_yaml(
            r#"
current-context: ctx
clusters:
- name: c
  cluster:
    server: https://cluster.example
    insecure-skip-tls-verify: true
contexts:
- name: ctx
  context: {cluster: c, user: u}
users:
- name: u
  user:
    tokenFile: token
"#,
        )
        .unwrap();

        let selection = kubeconfig.select_current(dir.path()).unwrap();
        assert!(selection.tls.insecure_skip_verify);
        match selection.auth {
            Auth::Bearer(token) => assert_eq!(token, "s3cr3t"),
            other => panic!("expected bearer auth, got {:?}", other),
        }
    }

    #[test]
    fn missing_current_context_yields_empty_selection() {
        let kubeconfig = Kubeconfig::from_yaml("clusters: []\n").unwrap();
        let selection = kubeconfig.select_current(Path::new(".")).unwrap();
        assert!(selection.server.is_none());
    }

    #[test]
    fn dangling_context_reference_is_reported() {
        let kubeconfig = Kubeconfig::from_yaml("current-context: gone\n").unwrap();
        let err = kubeconfig.select_current(Path::new(".")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEntry { kind: "context", .. }));
    }

    #[test]
    fn certificate_without_key_is_rejected() {
        let user = UserEntry {
            client_certificate_data: Some("Q0VSVA==".into()),
            ..UserEntry::default()
        };
        assert!(client_identity(&user, Path::new(".")).is_err());
    }
}
