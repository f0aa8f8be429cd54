use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Kinds of objects the cloud API can store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Batch,
    Checkpoint,
    DataAsset,
    DataContext,
    DataContextVariables,
    Datasource,
    Expectation,
    ExpectationSuite,
    ExpectationValidationResult,
    Profiler,
    RenderedDataDoc,
    ValidationResult,
}

impl ResourceType {
    pub const ALL: [ResourceType; 12] = [
        ResourceType::Batch,
        ResourceType::Checkpoint,
        ResourceType::DataAsset,
        ResourceType::DataContext,
        ResourceType::DataContextVariables,
        ResourceType::Datasource,
        ResourceType::Expectation,
        ResourceType::ExpectationSuite,
        ResourceType::ExpectationValidationResult,
        ResourceType::Profiler,
        ResourceType::RenderedDataDoc,
        ResourceType::ValidationResult,
    ];

    /// Wire value, used as `data.type` in payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Batch => "batch",
            ResourceType::Checkpoint => "checkpoint",
            ResourceType::DataAsset => "data_asset",
            ResourceType::DataContext => "data_context",
            ResourceType::DataContextVariables => "data_context_variables",
            ResourceType::Datasource => "datasource",
            ResourceType::Expectation => "expectation",
            ResourceType::ExpectationSuite => "expectation_suite",
            ResourceType::ExpectationValidationResult => "expectation_validation_result",
            ResourceType::Profiler => "profiler",
            ResourceType::RenderedDataDoc => "rendered_data_doc",
            ResourceType::ValidationResult => "validation_result",
        }
    }

    /// Collection name, e.g. `expectation_suites`. Not every type has one.
    pub fn plural_name(&self) -> Option<&'static str> {
        PLURAL_BY_TYPE.get(self).copied()
    }

    /// Resolves a collection name back to its resource type.
    pub fn from_plural_name(plural: &str) -> Option<ResourceType> {
        TYPE_BY_PLURAL.get(plural).copied()
    }

    /// JSON field holding the domain payload inside `data.attributes`.
    pub fn attributes_key(&self) -> Option<&'static str> {
        match self {
            ResourceType::Checkpoint => Some("checkpoint_config"),
            ResourceType::Datasource => Some("datasource_config"),
            ResourceType::DataContext => Some("data_context_config"),
            ResourceType::DataContextVariables => Some("data_context_variables"),
            ResourceType::ExpectationSuite => Some("suite"),
            ResourceType::ExpectationValidationResult => Some("result"),
            ResourceType::Profiler => Some("profiler"),
            ResourceType::RenderedDataDoc => Some("rendered_data_doc"),
            ResourceType::ValidationResult => Some("result"),
            ResourceType::Batch | ResourceType::DataAsset | ResourceType::Expectation => None,
        }
    }

    /// Extra top-level attributes accepted on create.
    pub fn allowed_extra_attributes(&self) -> &'static HashSet<&'static str> {
        ALLOWED_EXTRAS.get(self).unwrap_or(&*NO_EXTRAS)
    }

    /// Field inside the domain payload that carries the human readable name.
    pub fn name_field(&self) -> &'static str {
        match self {
            ResourceType::ExpectationSuite => "expectation_suite_name",
            _ => "name",
        }
    }
}

const PLURALS: [(ResourceType, &str); 11] = [
    (ResourceType::Batch, "batches"),
    (ResourceType::Checkpoint, "checkpoints"),
    (ResourceType::DataAsset, "data_assets"),
    (ResourceType::DataContextVariables, "data_context_variables"),
    (ResourceType::Datasource, "datasources"),
    (ResourceType::Expectation, "expectations"),
    (ResourceType::ExpectationSuite, "expectation_suites"),
    (
        ResourceType::ExpectationValidationResult,
        "expectation_validation_results",
    ),
    (ResourceType::Profiler, "profilers"),
    (ResourceType::RenderedDataDoc, "rendered_data_docs"),
    (ResourceType::ValidationResult, "validation_results"),
];

lazy_static::lazy_static! {
    static ref PLURAL_BY_TYPE: HashMap<ResourceType, &'static str> = PLURALS.iter().copied().collect();
    static ref TYPE_BY_PLURAL: HashMap<&'static str, ResourceType> = {
        let reverse: HashMap<&'static str, ResourceType> =
            PLURALS.iter().map(|(t, p)| (*p, *t)).collect();
        assert_eq!(reverse.len(), PLURALS.len(), "plural names must be unique");
        reverse
    };
    static ref ALLOWED_EXTRAS: HashMap<ResourceType, HashSet<&'static str>> = HashMap::from([
        (ResourceType::ExpectationSuite, HashSet::from(["clause_id"])),
        (
            ResourceType::RenderedDataDoc,
            HashSet::from(["source_type", "source_id"]),
        ),
        (
            ResourceType::ValidationResult,
            HashSet::from(["checkpoint_id", "expectation_suite_id"]),
        ),
    ]);
    static ref NO_EXTRAS: HashSet<&'static str> = HashSet::new();
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type: {0}")]
pub struct UnknownResourceType(pub String);

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    /// Accepts both the wire value (`expectation_suite`) and the upper-case
    /// name configs tend to use (`EXPECTATION_SUITE`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        ResourceType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| UnknownResourceType(s.to_string()))
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plural_maps_are_mutual_inverses() {
        for (resource_type, plural) in PLURALS {
            assert_eq!(resource_type.plural_name(), Some(plural));
            assert_eq!(ResourceType::from_plural_name(plural), Some(resource_type));
        }
        assert_eq!(PLURAL_BY_TYPE.len(), TYPE_BY_PLURAL.len());
    }

    #[test]
    fn data_context_has_no_collection() {
        assert_eq!(ResourceType::DataContext.plural_name(), None);
        assert_eq!(
            ResourceType::DataContext.attributes_key(),
            Some("data_context_config")
        );
    }

    #[test]
    fn parses_wire_value_and_upper_case_name() {
        assert_eq!(
            "expectation_suite".parse::<ResourceType>(),
            Ok(ResourceType::ExpectationSuite)
        );
        assert_eq!(
            "VALIDATION_RESULT".parse::<ResourceType>(),
            Ok(ResourceType::ValidationResult)
        );
        assert!("suites".parse::<ResourceType>().is_err());
    }

    #[test]
    fn allowed_extras_per_type() {
        let extras = ResourceType::ValidationResult.allowed_extra_attributes();
        assert!(extras.contains("checkpoint_id"));
        assert!(extras.contains("expectation_suite_id"));
        assert!(ResourceType::Checkpoint.allowed_extra_attributes().is_empty());
    }

    #[test]
    fn name_field_differs_for_suites() {
        assert_eq!(
            ResourceType::ExpectationSuite.name_field(),
            "expectation_suite_name"
        );
        assert_eq!(ResourceType::Checkpoint.name_field(), "name");
    }

    #[test]
    fn serde_uses_wire_value() {
        let json = serde_json::to_string(&ResourceType::RenderedDataDoc).unwrap();
        assert_eq!(json, "\"rendered_data_doc\"");
        let back: ResourceType = serde_json::from_str("\"PROFILER\"").unwrap();
        assert_eq!(back, ResourceType::Profiler);
    }
}
