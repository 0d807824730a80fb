use serde::{Deserialize, Serialize};

pub const GEOMETRY_TYPE: &str = "geometry";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNode {
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub urn: Option<String>,
    #[serde(default)]
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    pub fn is_geometry(&self) -> bool {
        self.node_type.as_deref() == Some(GEOMETRY_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub urn: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub derivatives: Vec<DocumentNode>,
}

impl Manifest {
    pub fn into_document(self) -> DocumentNode {
        DocumentNode {
            guid: None,
            node_type: Some("manifest".to_string()),
            role: None,
            name: None,
            urn: Some(self.urn),
            children: self.derivatives,
        }
    }
}

/// First node typed `geometry`, depth-first in document order.
pub fn find_first_geometry(node: &DocumentNode) -> Option<&DocumentNode> {
    if node.is_geometry() {
        return Some(node);
    }

    node.children.iter().find_map(find_first_geometry)
}
