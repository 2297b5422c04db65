//! Feature definition tree (per-game configuration)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, FeatureError, FeatureResult};
use crate::params::Params;
use crate::registry::FeatureRegistry;

/// One node of a game's feature tree.
///
/// Loaded once and shared read-only; effects receive it by reference and
/// never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureDef {
    #[serde(default)]
    pub id: u32,
    #[serde(rename = "Type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<FeatureDef>,
}

impl FeatureDef {
    pub fn new(id: u32, type_tag: impl Into<String>) -> Self {
        Self {
            id,
            type_tag: type_tag.into(),
            params: Params::new(),
            features: Vec::new(),
        }
    }

    /// Builder: set one default parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.set(key, value);
        self
    }

    /// Builder: replace the default parameters
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Builder: append a child
    pub fn with_child(mut self, child: FeatureDef) -> Self {
        self.features.push(child);
        self
    }

    pub fn from_yaml(source: &str) -> FeatureResult<Self> {
        Ok(serde_yml::from_str(source)?)
    }

    pub fn from_json(source: &str) -> FeatureResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Depth-first, pre-order visit of this node and all descendants
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a FeatureDef)) {
        f(self);
        for child in &self.features {
            child.visit(f);
        }
    }

    /// Find a node by id anywhere in the tree
    pub fn find(&self, id: u32) -> Option<&FeatureDef> {
        if self.id == id {
            return Some(self);
        }
        self.features.iter().find_map(|c| c.find(id))
    }

    /// Check every type tag in the tree against a registry.
    ///
    /// A single unknown tag is reported as `UnknownType`; several are listed
    /// together.
    pub fn validate(&self, registry: &FeatureRegistry) -> FeatureResult<()> {
        let mut unknown: Vec<String> = Vec::new();
        self.visit(&mut |def| {
            if !registry.contains(&def.type_tag) && !unknown.contains(&def.type_tag) {
                unknown.push(def.type_tag.clone());
            }
        });

        match unknown.len() {
            0 => Ok(()),
            1 => Err(FeatureError::Config(ConfigError::UnknownType(unknown.remove(0)))),
            _ => Err(FeatureError::Config(ConfigError::Invalid(format!(
                "unknown feature types: {}",
                unknown.join(", ")
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = r#"
Id: 1
Type: Activator
Features:
  - Id: 2
    Type: TileExpansion
    Params:
      X: 1
      TileId: 7
  - Id: 3
    Type: WeightedActivator
    Params:
      Weights: [1, 3]
    Features:
      - Id: 4
        Type: Multiplier
      - Id: 5
        Type: Multiplier
"#;

    #[test]
    fn test_load_yaml() {
        let def = FeatureDef::from_yaml(TREE).unwrap();
        assert_eq!(def.type_tag, "Activator");
        assert_eq!(def.features.len(), 2);
        assert_eq!(def.features[0].params.int("TileId").unwrap(), 7);
        assert_eq!(def.find(5).map(|d| d.type_tag.as_str()), Some("Multiplier"));
        assert!(def.find(9).is_none());

        let mut ids = Vec::new();
        def.visit(&mut |d| ids.push(d.id));
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_json_matches_builder() {
        let json = r#"{"Id": 2, "Type": "ExpandingWild", "Params": {"WildId": 9}}"#;
        let built = FeatureDef::new(2, "ExpandingWild").with_param("WildId", 9);
        assert_eq!(FeatureDef::from_json(json).unwrap(), built);
    }

    #[test]
    fn test_malformed_yaml_is_serialization_error() {
        let err = FeatureDef::from_yaml("Id: [").unwrap_err();
        assert!(matches!(err, FeatureError::Serialization(_)));
    }

    #[test]
    fn test_validate_reports_unknown_tags() {
        let registry = FeatureRegistry::builtin();
        assert!(FeatureDef::from_yaml(TREE).unwrap().validate(&registry).is_ok());

        let one = FeatureDef::new(1, "Activator").with_child(FeatureDef::new(2, "Bogus"));
        assert!(matches!(
            one.validate(&registry),
            Err(FeatureError::Config(ConfigError::UnknownType(t))) if t == "Bogus"
        ));

        let two = one.with_child(FeatureDef::new(3, "AlsoBogus"));
        let msg = two.validate(&registry).unwrap_err().to_string();
        assert!(msg.contains("Bogus") && msg.contains("AlsoBogus"));
    }
}
