#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DatasourceError {
    #[error("invalid azure_options: {0}")]
    InvalidOptions(String),

    #[error("Due to exception: \"{0}\", \"azure_client\" could not be created.")]
    ClientCreation(String),

    #[error("'{asset}' is missing required argument '{argument}'")]
    MissingArgument { asset: String, argument: String },

    #[error("build_data_connector() got unexpected arguments {0:?}")]
    UnexpectedArguments(Vec<String>),

    #[error("data connector could not be created: {0}")]
    ConnectorCreation(String),

    #[error("{0}")]
    TestConnection(String),
}

pub type Result<T, E = DatasourceError> = std::result::Result<T, E>;
