//! In-memory document model: the physical page sequence and the logical
//! structure tree whose nodes reference pages.

use serde::{Deserialize, Serialize};

use crate::schema::{MetadataType, PAGE_NUMBER_TYPE, REPRESENTATIVE_TYPE};

/// A digitized document as read from its metadata file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    pub physical: PhysicalSequence,
    pub logical: StructuralNode,
}

/// The flat, ordered sequence of scanned pages plus metadata describing the
/// sequence as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSequence {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// One scanned image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
}

/// A unit of the intellectual structure (volume, chapter, title page, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralNode {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Marks a multi-volume container regardless of what the ruleset says
    /// about `type_name`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub anchor: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StructuralNode>,
    /// Ids of the pages realizing this node, in reference order.
    #[serde(default, rename = "pages", skip_serializing_if = "Vec::is_empty")]
    pub page_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
}

impl DocumentModel {
    pub fn new(physical: PhysicalSequence, logical: StructuralNode) -> Self {
        Self { physical, logical }
    }

    /// Find the page whose page-number entry equals `number`.
    pub fn page_by_number(&self, number: &str) -> Option<&Page> {
        self.physical.pages.iter().find(|p| {
            p.metadata
                .iter()
                .any(|m| m.type_name == PAGE_NUMBER_TYPE && m.value == number)
        })
    }
}

impl PhysicalSequence {
    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// The page number held by the first representative marker whose value
    /// parses as an integer. Markers with non-numeric values are ignored.
    pub fn representative(&self) -> Option<i32> {
        self.metadata
            .iter()
            .filter(|m| m.type_name == REPRESENTATIVE_TYPE)
            .find_map(|m| match m.value.parse::<i32>() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::debug!("Ignoring non-numeric representative value {:?}", m.value);
                    None
                }
            })
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    pub fn with_metadata(mut self, type_name: &str, value: &str) -> Self {
        self.metadata.push(MetadataEntry::named(type_name, value));
        self
    }
}

impl Page {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, type_name: &str, value: &str) -> Self {
        self.metadata.push(MetadataEntry::named(type_name, value));
        self
    }

    /// Entries of the given type in the order they were recorded.
    pub fn metadata_of<'a>(&'a self, md_type: &'a MetadataType) -> impl Iterator<Item = &'a MetadataEntry> + 'a {
        self.metadata.iter().filter(move |m| m.type_name == md_type.name())
    }
}

impl StructuralNode {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn anchor(type_name: impl Into<String>) -> Self {
        Self {
            anchor: true,
            ..Self::new(type_name)
        }
    }

    pub fn with_child(mut self, child: StructuralNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_pages<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.page_refs.extend(ids.into_iter().map(Into::into));
        self
    }
}

impl MetadataEntry {
    pub fn new(md_type: &MetadataType, value: impl Into<String>) -> Self {
        Self::named(md_type.name(), value)
    }

    fn named(type_name: &str, value: impl Into<String>) -> Self {
        Self {
            type_name: type_name.to_string(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_representative_first_numeric_marker_wins() {
        let seq = PhysicalSequence::default()
            .with_metadata(REPRESENTATIVE_TYPE, "abc")
            .with_metadata(REPRESENTATIVE_TYPE, "12")
            .with_metadata(REPRESENTATIVE_TYPE, "4");
        assert_eq!(seq.representative(), Some(12));
    }

    #[test]
    fn test_representative_ignores_other_types_and_bad_values() {
        let seq = PhysicalSequence::default()
            .with_metadata("physPageNumber", "3")
            .with_metadata(REPRESENTATIVE_TYPE, " 7")
            .with_metadata(REPRESENTATIVE_TYPE, "");
        assert_eq!(seq.representative(), None);
    }

    #[test]
    fn test_representative_accepts_signed_values() {
        let seq = PhysicalSequence::default().with_metadata(REPRESENTATIVE_TYPE, "-2");
        assert_eq!(seq.representative(), Some(-2));
    }

    #[test]
    fn test_page_by_number() {
        let doc = DocumentModel::new(
            PhysicalSequence::default()
                .with_page(Page::new("PHYS_0001").with_metadata(PAGE_NUMBER_TYPE, "1"))
                .with_page(Page::new("PHYS_0002").with_metadata(PAGE_NUMBER_TYPE, "2")),
            StructuralNode::new("Monograph"),
        );
        assert_eq!(doc.page_by_number("2").map(|p| p.id.as_str()), Some("PHYS_0002"));
        assert!(doc.page_by_number("9").is_none());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "physical": {
                "metadata": [{"type": "_representative", "value": "7"}],
                "pages": [{"id": "PHYS_0007", "metadata": [{"type": "physPageNumber", "value": "7"}]}]
            },
            "logical": {
                "type": "Periodical",
                "anchor": true,
                "children": [{"type": "PeriodicalVolume", "children": [{"type": "TitlePage", "pages": ["PHYS_0007"]}]}]
            }
        }"#;
        let doc: DocumentModel = serde_json::from_str(json).unwrap();
        assert!(doc.logical.anchor);
        assert_eq!(doc.logical.children[0].children[0].page_refs, vec!["PHYS_0007".to_string()]);
        assert_eq!(doc.physical.representative(), Some(7));

        let back: DocumentModel = serde_json::from_str(&serde_json::to_string(&doc).unwrap()).unwrap();
        assert_eq!(back, doc);
    }
}
