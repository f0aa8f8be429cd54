pub mod backend;
pub mod config;
pub mod error;
pub mod payload;
pub mod resource;
pub mod transport;
pub mod types;

pub use backend::CloudStoreBackend;
pub use config::{load_settings, BackendOptions, Credentials, StoreSettings};
pub use error::{Operation, StoreBackendError, TerminalKind};
pub use resource::ResourceType;
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError};
pub use types::{ResourceKey, ResourceRef, SetOutcome};
