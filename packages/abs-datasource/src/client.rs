use std::collections::BTreeMap;
use std::sync::Arc;

/// Handle to an Azure Blob Storage account, provided by the SDK binding.
pub trait BlobServiceClient: Send + Sync {
    /// Names of the blobs under `name_starts_with`, split on `delimiter`.
    fn list_blob_names(
        &self,
        container: &str,
        name_starts_with: &str,
        delimiter: &str,
    ) -> anyhow::Result<Vec<String>>;
}

/// Builds blob service clients from the resolved `azure_options`.
///
/// Both constructors receive the full option map, endpoint key included, so
/// credentials and client settings pass through untouched.
pub trait BlobClientFactory: Send + Sync {
    fn from_connection_string(
        &self,
        options: &BTreeMap<String, String>,
    ) -> anyhow::Result<Arc<dyn BlobServiceClient>>;

    fn from_account_url(
        &self,
        options: &BTreeMap<String, String>,
    ) -> anyhow::Result<Arc<dyn BlobServiceClient>>;
}
