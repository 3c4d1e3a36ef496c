//! Metadata schema (ruleset): which metadata types exist and which
//! structural types are anchors.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Metadata type holding the page number of the representative image.
pub const REPRESENTATIVE_TYPE: &str = "_representative";
/// Metadata type holding a page's ordinal position.
pub const PAGE_NUMBER_TYPE: &str = "physPageNumber";

/// Handle to a metadata type known by the active schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataType {
    name: String,
}

impl MetadataType {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Lookup surface the resolver needs from a schema.
pub trait MetadataSchema: Send + Sync {
    /// Resolve a metadata type by name. Unknown names are a configuration fault.
    fn metadata_type(&self, name: &str) -> Result<MetadataType, SchemaError>;

    /// Whether nodes of this structural type are multi-volume containers.
    fn is_anchor(&self, type_name: &str) -> bool {
        let _ = type_name;
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    metadata_types: BTreeSet<String>,
    anchor_types: BTreeSet<String>,
}

impl Ruleset {
    pub fn new<M, A>(metadata_types: M, anchor_types: A) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            metadata_types: metadata_types.into_iter().map(Into::into).collect(),
            anchor_types: anchor_types.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::new(default_metadata_types(), default_anchor_types())
    }
}

impl MetadataSchema for Ruleset {
    fn metadata_type(&self, name: &str) -> Result<MetadataType, SchemaError> {
        if self.metadata_types.contains(name) {
            Ok(MetadataType {
                name: name.to_string(),
            })
        } else {
            Err(SchemaError::UnknownMetadataType {
                name: name.to_string(),
            })
        }
    }

    fn is_anchor(&self, type_name: &str) -> bool {
        self.anchor_types.contains(type_name)
    }
}

pub fn default_metadata_types() -> Vec<String> {
    vec![REPRESENTATIVE_TYPE.to_string(), PAGE_NUMBER_TYPE.to_string()]
}

pub fn default_anchor_types() -> Vec<String> {
    vec!["Periodical".to_string(), "MultiVolumeWork".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ruleset_knows_reserved_types() {
        let rs = Ruleset::default();
        assert_eq!(rs.metadata_type(REPRESENTATIVE_TYPE).unwrap().name(), REPRESENTATIVE_TYPE);
        assert_eq!(rs.metadata_type(PAGE_NUMBER_TYPE).unwrap().name(), PAGE_NUMBER_TYPE);
    }

    #[test]
    fn test_unknown_type_is_error() {
        let rs = Ruleset::new(["physPageNumber"], Vec::<String>::new());
        match rs.metadata_type(REPRESENTATIVE_TYPE) {
            Err(SchemaError::UnknownMetadataType { name }) => assert_eq!(name, REPRESENTATIVE_TYPE),
            other => panic!("expected unknown type, got {:?}", other),
        }
    }

    #[test]
    fn test_anchor_lookup_is_exact() {
        let rs = Ruleset::default();
        assert!(rs.is_anchor("Periodical"));
        assert!(!rs.is_anchor("periodical"));
        assert!(!rs.is_anchor("Monograph"));
    }
}
