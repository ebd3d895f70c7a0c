use serde::Deserialize;
use tracing::{error, info};

use crate::error::{ReindexError, Result};

pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const USER_AGENT: &str = "NONISV|Adobe|PreviewIndex/0.0.1";

/// Settings as read from the environment, before validation.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub sharepoint_client_id: Option<String>,
    pub sharepoint_tenant_id: Option<String>,
    pub sharepoint_client_secret: Option<String>,
    pub sharepoint_drive_id: Option<String>,
    pub eds_admin_key: Option<String>,
    pub consumer: Option<String>,
    pub preview_index_file: Option<String>,

    pub graph_base_url: Option<String>,
    pub preview_base_url: Option<String>,
    pub authority_host: Option<String>,
}

/// Validated settings: every required value is present and non-empty.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub tenant_id: String,
    pub client_secret: String,
    pub drive_id: String,
    pub admin_key: String,
    pub consumer: String,
    pub index_file: String,
    pub graph_base_url: String,
    pub preview_base_url: String,
    pub authority_host: String,
}

/// Load `.env` (if any) and read settings from the process environment.
pub fn load() -> anyhow::Result<RawSettings> {
    let _ = dotenvy::dotenv();
    let raw = ::config::Config::builder()
        .add_source(::config::Environment::default())
        .build()?
        .try_deserialize::<RawSettings>()?;
    Ok(raw)
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl RawSettings {
    fn required(&self) -> [(&'static str, &Option<String>); 7] {
        [
            ("SHAREPOINT_CLIENT_ID", &self.sharepoint_client_id),
            ("SHAREPOINT_TENANT_ID", &self.sharepoint_tenant_id),
            ("SHAREPOINT_CLIENT_SECRET", &self.sharepoint_client_secret),
            ("SHAREPOINT_DRIVE_ID", &self.sharepoint_drive_id),
            ("EDS_ADMIN_KEY", &self.eds_admin_key),
            ("CONSUMER", &self.consumer),
            ("PREVIEW_INDEX_FILE", &self.preview_index_file),
        ]
    }

    /// Names of required settings that are absent or empty, in declaration order.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        self.required()
            .into_iter()
            .filter(|(_, value)| present(value).is_none())
            .map(|(key, _)| key)
            .collect()
    }

    /// Logs one line per missing item. No network work may happen unless this succeeds.
    pub fn validate(&self) -> Result<Settings> {
        let missing = self.missing_keys();
        if !missing.is_empty() {
            for key in &missing {
                error!("Config item {} is empty.", key);
            }
            return Err(ReindexError::ConfigInvalid { missing });
        }

        let get = |v: &Option<String>| present(v).unwrap_or_default();
        let consumer = get(&self.consumer);
        let preview_base_url = present(&self.preview_base_url)
            .unwrap_or_else(|| format!("https://main--{}--adobecom.hlx.page", consumer));

        info!("config is valid");
        Ok(Settings {
            client_id: get(&self.sharepoint_client_id),
            tenant_id: get(&self.sharepoint_tenant_id),
            client_secret: get(&self.sharepoint_client_secret),
            drive_id: get(&self.sharepoint_drive_id),
            admin_key: get(&self.eds_admin_key),
            consumer,
            index_file: get(&self.preview_index_file),
            graph_base_url: present(&self.graph_base_url)
                .unwrap_or_else(|| GRAPH_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            preview_base_url: preview_base_url.trim_end_matches('/').to_string(),
            authority_host: present(&self.authority_host)
                .unwrap_or_else(|| AUTHORITY_HOST.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) fn complete_raw() -> RawSettings {
    RawSettings {
        sharepoint_client_id: Some("client".into()),
        sharepoint_tenant_id: Some("tenant".into()),
        sharepoint_client_secret: Some("secret".into()),
        sharepoint_drive_id: Some("drive".into()),
        eds_admin_key: Some("admin".into()),
        consumer: Some("cc".into()),
        preview_index_file: Some("index/preview.xlsx".into()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::CapturedLogs;

    #[test]
    fn complete_settings_validate() {
        let s = complete_raw().validate().unwrap();
        assert_eq!(s.preview_base_url, "https://main--cc--adobecom.hlx.page");
        assert_eq!(s.graph_base_url, GRAPH_BASE_URL);
        assert_eq!(s.authority_host, AUTHORITY_HOST);
        assert_eq!(s.index_file, "index/preview.xlsx");
    }

    #[test]
    fn one_empty_value_is_reported_once() {
        let raw = RawSettings {
            eds_admin_key: Some(String::new()),
            ..complete_raw()
        };
        assert_eq!(raw.missing_keys(), vec!["EDS_ADMIN_KEY"]);

        let (logs, _guard) = CapturedLogs::start();
        match raw.validate() {
            Err(ReindexError::ConfigInvalid { missing }) => assert_eq!(missing, vec!["EDS_ADMIN_KEY"]),
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
        let lines = logs.matching("is empty.");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("ERROR"));
        assert!(lines[0].contains("Config item EDS_ADMIN_KEY is empty."));
        assert!(logs.matching("config is valid").is_empty());
    }

    #[test]
    fn every_absent_value_is_listed() {
        let raw = RawSettings::default();
        assert_eq!(raw.missing_keys().len(), 7);

        let (logs, _guard) = CapturedLogs::start();
        assert!(raw.validate().is_err());
        assert_eq!(logs.matching("is empty.").len(), 7);
        assert_eq!(logs.matching("Config item SHAREPOINT_CLIENT_SECRET is empty.").len(), 1);
    }

    #[test]
    fn overrides_drop_trailing_slash() {
        let raw = RawSettings {
            graph_base_url: Some("http://127.0.0.1:9000/v1.0/".into()),
            preview_base_url: Some("http://127.0.0.1:9001/".into()),
            ..complete_raw()
        };
        let s = raw.validate().unwrap();
        assert_eq!(s.graph_base_url, "http://127.0.0.1:9000/v1.0");
        assert_eq!(s.preview_base_url, "http://127.0.0.1:9001");
    }
}
