use crate::client::BlobServiceClient;
use crate::error::{DatasourceError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Maps `(account, container, path)` to the URL the dataframe engine reads.
pub type FilePathTemplate = fn(&str, &str, &str) -> String;

/// Per-asset connector options, as given in config.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorOptions {
    pub abs_container: Option<String>,
    #[serde(default)]
    pub abs_name_starts_with: String,
    #[serde(default = "default_delimiter")]
    pub abs_delimiter: String,
}

fn default_delimiter() -> String {
    "/".to_string()
}

const KNOWN_OPTIONS: [&str; 3] = ["abs_container", "abs_name_starts_with", "abs_delimiter"];

impl ConnectorOptions {
    /// Parses raw options; unknown keys and a missing container are errors.
    pub fn from_map(asset_name: &str, raw: &Map<String, Value>) -> Result<(Self, String)> {
        let unexpected: Vec<String> = raw
            .keys()
            .filter(|key| !KNOWN_OPTIONS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(DatasourceError::UnexpectedArguments(unexpected));
        }

        let options: ConnectorOptions = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| DatasourceError::InvalidOptions(e.to_string()))?;

        let container = options
            .abs_container
            .clone()
            .ok_or_else(|| DatasourceError::MissingArgument {
                asset: asset_name.to_string(),
                argument: "abs_container".to_string(),
            })?;

        Ok((options, container))
    }
}

/// Everything the connector factory needs to list and address an asset's files.
#[derive(Clone)]
pub struct DataConnectorParams {
    pub datasource_name: String,
    pub data_asset_name: String,
    pub azure_client: Arc<dyn BlobServiceClient>,
    pub batching_regex: String,
    pub account_name: String,
    pub container: String,
    pub name_starts_with: String,
    pub delimiter: String,
    pub file_path_template: FilePathTemplate,
}

impl std::fmt::Debug for DataConnectorParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataConnectorParams")
            .field("datasource_name", &self.datasource_name)
            .field("data_asset_name", &self.data_asset_name)
            .field("batching_regex", &self.batching_regex)
            .field("account_name", &self.account_name)
            .field("container", &self.container)
            .field("name_starts_with", &self.name_starts_with)
            .field("delimiter", &self.delimiter)
            .finish_non_exhaustive()
    }
}

/// Lists and batches an asset's files; owned by the asset.
pub trait DataConnector: Send + Sync {
    /// `true` when at least one file matches the asset's batching regex.
    fn test_connection(&self) -> bool;
}

pub trait DataConnectorFactory: Send + Sync {
    fn build_data_connector(&self, params: &DataConnectorParams) -> anyhow::Result<Box<dyn DataConnector>>;

    fn build_test_connection_error_message(&self, params: &DataConnectorParams) -> String {
        format!(
            "No file belonging to account \"{}\" in container \"{}\" with prefix \"{}\" matched regular expressions pattern \"{}\" using delimiter \"{}\" for DataAsset \"{}\".",
            params.account_name,
            params.container,
            params.name_starts_with,
            params.batching_regex,
            params.delimiter,
            params.data_asset_name,
        )
    }
}
