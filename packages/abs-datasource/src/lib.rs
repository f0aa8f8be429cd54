//! Azure Blob Storage binding for file-path dataframe datasources.
//!
//! The blob SDK client and the data connector are supplied by the caller
//! through [`BlobClientFactory`] and [`DataConnectorFactory`]; this crate
//! validates `azure_options`, resolves the storage account and forwards
//! per-asset settings.

pub mod client;
pub mod connector;
pub mod datasource;
pub mod error;
pub mod options;

pub use client::{BlobClientFactory, BlobServiceClient};
pub use connector::{ConnectorOptions, DataConnector, DataConnectorFactory, DataConnectorParams};
pub use datasource::{AzureBlobDatasource, AzureBlobDatasourceConfig, DataAsset, DATASOURCE_TYPE};
pub use error::DatasourceError;
