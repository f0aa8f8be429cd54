use crate::resource::ResourceType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Address of a stored object.
///
/// An empty `id` means the object has not been created yet. A key carrying a
/// `name` is a lookup request and resolves to zero or one objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceKey {
    pub resource_type: ResourceType,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ResourceKey {
    pub fn new(resource_type: ResourceType, id: Option<String>, name: Option<String>) -> Self {
        Self {
            resource_type,
            id,
            name,
        }
    }

    pub fn with_id(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self::new(resource_type, Some(id.into()), None)
    }

    pub fn with_name(resource_type: ResourceType, name: impl Into<String>) -> Self {
        Self::new(resource_type, None, Some(name.into()))
    }

    /// Id if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Name if present and non-empty.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

/// Handle to a freshly created object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceRef {
    pub resource_type: ResourceType,
    pub id: String,
    pub url: String,
    /// Full response body, for callers that need resource specific fields.
    pub response_json: Value,
}

/// What a `set` ended up doing.
#[derive(Clone, Debug, PartialEq)]
pub enum SetOutcome {
    Updated,
    Created(ResourceRef),
}

impl SetOutcome {
    pub fn created(&self) -> Option<&ResourceRef> {
        match self {
            SetOutcome::Created(resource_ref) => Some(resource_ref),
            SetOutcome::Updated => None,
        }
    }
}
