use crate::resource::ResourceType;
use crate::transport::DEFAULT_TIMEOUT;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const ENV_BASE_URL: &str = "CLOUD_STORE_BASE_URL";
pub const ENV_ACCESS_TOKEN: &str = "CLOUD_STORE_ACCESS_TOKEN";
pub const ENV_ORGANIZATION_ID: &str = "CLOUD_STORE_ORGANIZATION_ID";
pub const ENV_TIMEOUT_SECS: &str = "CLOUD_STORE_TIMEOUT_SECS";

/// Process-wide credentials; fixed once the backend is built.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub organization_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

/// Construction parameters of one backend instance.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BackendOptions {
    pub base_url: String,
    #[serde(default)]
    pub resource_type: Option<ResourceType>,
    #[serde(default)]
    pub resource_name: Option<String>,
    #[serde(default = "default_true")]
    pub suppress_store_backend_id: bool,
    #[serde(default)]
    pub manually_initialize_store_backend_id: String,
    #[serde(default)]
    pub store_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl BackendOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            suppress_store_backend_id: true,
            ..Default::default()
        }
    }

    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    pub fn resource_name(mut self, resource_name: impl Into<String>) -> Self {
        self.resource_name = Some(resource_name.into());
        self
    }

    pub fn store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = Some(store_name.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    base_url: Option<String>,
    access_token: Option<String>,
    organization_id: Option<String>,
    timeout_secs: Option<u64>,
}

/// Everything needed to talk to the cloud API, resolved from a YAML file
/// and the environment (environment wins).
#[derive(Clone, Debug)]
pub struct StoreSettings {
    pub base_url: String,
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl StoreSettings {
    pub fn options(&self) -> BackendOptions {
        BackendOptions::new(self.base_url.clone())
    }
}

/// Load settings from an optional YAML file, then apply environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<StoreSettings> {
    let file: SettingsFile = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .context(format!("Failed to read store settings: {:?}", path))?;
            serde_yaml::from_str(&raw).context("Failed to parse store settings")?
        }
        None => SettingsFile {
            base_url: None,
            access_token: None,
            organization_id: None,
            timeout_secs: None,
        },
    };

    resolve(file, |key| std::env::var(key).ok())
}

fn resolve(file: SettingsFile, env: impl Fn(&str) -> Option<String>) -> Result<StoreSettings> {
    let base_url = env(ENV_BASE_URL).or(file.base_url);
    let access_token = env(ENV_ACCESS_TOKEN).or(file.access_token);
    let organization_id = env(ENV_ORGANIZATION_ID).or(file.organization_id);
    let timeout_secs = match env(ENV_TIMEOUT_SECS) {
        Some(raw) => Some(
            raw.parse::<u64>()
                .context(format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))?,
        ),
        None => file.timeout_secs,
    };

    let Some(base_url) = base_url.filter(|v| !v.is_empty()) else {
        bail!("Missing base url (set {} or base_url)", ENV_BASE_URL);
    };
    let Some(access_token) = access_token.filter(|v| !v.is_empty()) else {
        bail!("Missing access token (set {} or access_token)", ENV_ACCESS_TOKEN);
    };
    let Some(organization_id) = organization_id.filter(|v| !v.is_empty()) else {
        bail!(
            "Missing organization id (set {} or organization_id)",
            ENV_ORGANIZATION_ID
        );
    };

    Ok(StoreSettings {
        base_url,
        credentials: Credentials {
            access_token,
            organization_id,
        },
        timeout: timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn empty_file() -> SettingsFile {
        SettingsFile {
            base_url: None,
            access_token: None,
            organization_id: None,
            timeout_secs: None,
        }
    }

    #[test]
    fn environment_overrides_file() {
        let file = SettingsFile {
            base_url: Some("https://file.example.com/".into()),
            access_token: Some("file-token".into()),
            organization_id: Some("file-org".into()),
            timeout_secs: Some(5),
        };
        let env: HashMap<&str, &str> = HashMap::from([(ENV_ORGANIZATION_ID, "env-org")]);

        let settings = resolve(file, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.base_url, "https://file.example.com/");
        assert_eq!(settings.credentials.organization_id, "env-org");
        assert_eq!(settings.credentials.access_token, "file-token");
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_token_is_reported() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BASE_URL, "https://x/"),
            (ENV_ORGANIZATION_ID, "org"),
        ]);
        let err = resolve(empty_file(), |k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(err.to_string().contains(ENV_ACCESS_TOKEN));
    }

    #[test]
    fn default_timeout_applies() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BASE_URL, "https://x/"),
            (ENV_ACCESS_TOKEN, "t"),
            (ENV_ORGANIZATION_ID, "org"),
        ]);
        let settings = resolve(empty_file(), |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let env: HashMap<&str, &str> = HashMap::from([(ENV_TIMEOUT_SECS, "soon")]);
        assert!(resolve(empty_file(), |k| env.get(k).map(|v| v.to_string())).is_err());
    }

    #[test]
    fn reads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url: https://yaml.example.com/\naccess_token: yaml-token\norganization_id: yaml-org\ntimeout_secs: 7"
        )
        .unwrap();

        let raw = fs::read_to_string(file.path()).unwrap();
        let parsed: SettingsFile = serde_yaml::from_str(&raw).unwrap();
        let settings = resolve(parsed, |_| None).unwrap();
        assert_eq!(settings.base_url, "https://yaml.example.com/");
        assert_eq!(settings.timeout, Duration::from_secs(7));
    }

    #[test]
    fn credentials_debug_hides_token() {
        let credentials = Credentials {
            access_token: "secret".into(),
            organization_id: "org".into(),
        };
        assert!(!format!("{:?}", credentials).contains("secret"));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: BackendOptions =
            serde_yaml::from_str("base_url: https://x/\nresource_type: CHECKPOINT").unwrap();
        assert_eq!(options.resource_type, Some(ResourceType::Checkpoint));
        assert!(options.suppress_store_backend_id);
        assert!(options.resource_name.is_none());
    }
}
