use crate::client::{BlobClientFactory, BlobServiceClient};
use crate::connector::{ConnectorOptions, DataConnector, DataConnectorFactory, DataConnectorParams};
use crate::error::{DatasourceError, Result};
use crate::options::{account_name, endpoint, resolve_options, wasbs_url, Endpoint};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub const DATASOURCE_TYPE: &str = "spark_abs";

/// Serializable part of the datasource, as written in project config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AzureBlobDatasourceConfig {
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    /// Values may reference environment variables as `${VAR}`.
    #[serde(default)]
    pub azure_options: BTreeMap<String, String>,
}

fn default_type() -> String {
    DATASOURCE_TYPE.to_string()
}

/// A file-path asset living in one container.
pub struct DataAsset {
    pub name: String,
    pub batching_regex: String,
    connector: Option<Box<dyn DataConnector>>,
    test_connection_error_message: Option<String>,
}

impl DataAsset {
    pub fn new(name: impl Into<String>, batching_regex: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batching_regex: batching_regex.into(),
            connector: None,
            test_connection_error_message: None,
        }
    }

    pub fn has_connector(&self) -> bool {
        self.connector.is_some()
    }

    pub fn test_connection_error_message(&self) -> Option<&str> {
        self.test_connection_error_message.as_deref()
    }

    pub fn test_connection(&self) -> Result<()> {
        let message = || {
            self.test_connection_error_message
                .clone()
                .unwrap_or_else(|| format!("DataAsset \"{}\" has no data connector.", self.name))
        };
        match &self.connector {
            Some(connector) if connector.test_connection() => Ok(()),
            _ => Err(DatasourceError::TestConnection(message())),
        }
    }
}

#[derive(Clone)]
struct ResolvedClient {
    client: Arc<dyn BlobServiceClient>,
    account_name: String,
}

/// Binds file-path assets to Azure Blob Storage.
///
/// The blob service client is created on first use and reused afterwards.
pub struct AzureBlobDatasource {
    config: AzureBlobDatasourceConfig,
    assets: Vec<DataAsset>,
    client_factory: Arc<dyn BlobClientFactory>,
    connector_factory: Arc<dyn DataConnectorFactory>,
    env: fn(&str) -> Option<String>,
    client: Mutex<Option<ResolvedClient>>,
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl AzureBlobDatasource {
    pub fn new(
        config: AzureBlobDatasourceConfig,
        client_factory: Arc<dyn BlobClientFactory>,
        connector_factory: Arc<dyn DataConnectorFactory>,
    ) -> Self {
        Self {
            config,
            assets: Vec::new(),
            client_factory,
            connector_factory,
            env: process_env,
            client: Mutex::new(None),
        }
    }

    /// Swaps the variable source used for `${VAR}` substitution.
    pub fn with_env(mut self, env: fn(&str) -> Option<String>) -> Self {
        self.env = env;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &AzureBlobDatasourceConfig {
        &self.config
    }

    pub fn assets(&self) -> &[DataAsset] {
        &self.assets
    }

    pub fn asset(&self, name: &str) -> Option<&DataAsset> {
        self.assets.iter().find(|asset| asset.name == name)
    }

    /// Storage account name; resolves the client if needed.
    pub fn account_name(&self) -> Result<String> {
        Ok(self.resolve_client()?.account_name)
    }

    pub fn azure_client(&self) -> Result<Arc<dyn BlobServiceClient>> {
        Ok(self.resolve_client()?.client)
    }

    fn resolve_client(&self) -> Result<ResolvedClient> {
        let mut cached = self
            .client
            .lock()
            .map_err(|_| DatasourceError::ClientCreation("client cache poisoned".to_string()))?;
        if let Some(resolved) = cached.as_ref() {
            return Ok(resolved.clone());
        }

        let options = resolve_options(&self.config.azure_options, self.env)?;
        let endpoint = endpoint(&options)?;
        let account_name = account_name(&endpoint)?;

        let client = match endpoint {
            Endpoint::ConnectionString(_) => self.client_factory.from_connection_string(&options),
            Endpoint::AccountUrl(_) => self.client_factory.from_account_url(&options),
        }
        .map_err(|e| DatasourceError::ClientCreation(e.to_string()))?;

        info!(datasource = %self.config.name, account = %account_name, "Created azure blob client");
        let resolved = ResolvedClient {
            client,
            account_name,
        };
        *cached = Some(resolved.clone());
        Ok(resolved)
    }

    /// Adds an asset and attaches its connector.
    pub fn add_asset(
        &mut self,
        name: &str,
        batching_regex: &str,
        connector_options: &Map<String, Value>,
    ) -> Result<&DataAsset> {
        if self.asset(name).is_some() {
            return Err(DatasourceError::InvalidOptions(format!(
                "DataAsset '{}' already exists",
                name
            )));
        }
        let mut asset = DataAsset::new(name, batching_regex);
        self.build_data_connector(&mut asset, connector_options)?;
        self.assets.push(asset);
        Ok(&self.assets[self.assets.len() - 1])
    }

    /// Builds the asset's data connector and its test-connection message.
    pub fn build_data_connector(
        &self,
        asset: &mut DataAsset,
        connector_options: &Map<String, Value>,
    ) -> Result<()> {
        let (options, container) = ConnectorOptions::from_map(&asset.name, connector_options)?;
        let resolved = self.resolve_client()?;

        let params = DataConnectorParams {
            datasource_name: self.config.name.clone(),
            data_asset_name: asset.name.clone(),
            azure_client: resolved.client,
            batching_regex: asset.batching_regex.clone(),
            account_name: resolved.account_name,
            container,
            name_starts_with: options.abs_name_starts_with,
            delimiter: options.abs_delimiter,
            file_path_template: wasbs_url,
        };
        debug!(params = ?params, "Building data connector");

        let connector = self
            .connector_factory
            .build_data_connector(&params)
            .map_err(|e| DatasourceError::ConnectorCreation(e.to_string()))?;

        asset.connector = Some(connector);
        asset.test_connection_error_message = Some(
            self.connector_factory
                .build_test_connection_error_message(&params),
        );
        Ok(())
    }

    /// Checks the client can be created and, optionally, that every asset
    /// finds its files.
    pub fn test_connection(&self, test_assets: bool) -> Result<()> {
        self.resolve_client().map_err(|e| {
            DatasourceError::TestConnection(format!(
                "Attempt to connect to datasource failed with the following error message: {}",
                e
            ))
        })?;

        if test_assets {
            for asset in &self.assets {
                asset.test_connection()?;
            }
        }
        Ok(())
    }
}
