//! URL and request body construction. No I/O in here.

use serde_json::{json, Map, Value};
use url::Url;

/// Turns `expectation_suites` into the `expectation-suites` path segment.
pub fn hyphen(name: &str) -> String {
    name.replace('_', "-")
}

/// Builds `{base}/organizations/{org}/{resource}[/{id}]`.
///
/// The collection path is joined onto `base` as a relative reference, so a
/// base without a trailing slash loses its last segment.
pub fn build_url(
    base_url: &str,
    organization_id: &str,
    resource_name: &str,
    id: Option<&str>,
) -> Result<String, url::ParseError> {
    let base = Url::parse(base_url)?;
    let collection = base.join(&format!(
        "organizations/{}/{}",
        organization_id,
        hyphen(resource_name)
    ))?;
    let mut url = collection.to_string();
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        url = format!("{}/{}", url, id);
    }
    Ok(url)
}

pub fn build_create_payload(
    resource_type: &str,
    organization_id: &str,
    attributes_key: &str,
    value: Value,
    extra_attributes: &Map<String, Value>,
) -> Value {
    let mut attributes = Map::new();
    attributes.insert(
        "organization_id".to_string(),
        Value::String(organization_id.to_string()),
    );
    attributes.insert(attributes_key.to_string(), value);
    for (key, extra) in extra_attributes {
        attributes.insert(key.clone(), extra.clone());
    }

    json!({
        "data": {
            "type": resource_type,
            "attributes": attributes,
        }
    })
}

/// Same shape as the create payload, plus `data.id` when there is one.
pub fn build_update_payload(
    resource_type: &str,
    organization_id: &str,
    attributes_key: &str,
    value: Value,
    id: Option<&str>,
) -> Value {
    let mut payload = build_create_payload(
        resource_type,
        organization_id,
        attributes_key,
        value,
        &Map::new(),
    );
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        payload["data"]["id"] = Value::String(id.to_string());
    }
    payload
}

/// Soft-delete marker sent along with DELETE.
pub fn build_delete_payload(resource_type: &str, id: &str) -> Value {
    json!({
        "data": {
            "type": resource_type,
            "id": id,
            "attributes": {
                "deleted": true,
            },
        }
    })
}
