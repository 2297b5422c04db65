//! Realized features and the contract every effect implements

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::FeatureDef;
use crate::engine::Activation;
use crate::error::{FeatureError, FeatureResult};
use crate::params::Params;
use crate::state::FeatureState;

/// A realized feature: one definition's typed result, as recorded in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Feature {
    pub id: u32,
    #[serde(rename = "Type")]
    pub type_tag: String,
    pub data: Value,
}

impl Feature {
    /// Bind a payload to the definition that produced it
    pub fn new<T: Serialize>(def: &FeatureDef, data: &T) -> FeatureResult<Self> {
        Ok(Self {
            id: def.id,
            type_tag: def.type_tag.clone(),
            data: serde_json::to_value(data)?,
        })
    }

    /// Typed view of the payload; a shape mismatch is a serialization error
    pub fn data<T: DeserializeOwned>(&self) -> FeatureResult<T> {
        T::deserialize(&self.data).map_err(|e| {
            FeatureError::Serialization(format!("{} #{}: {}", self.type_tag, self.id, e))
        })
    }

    pub fn is(&self, tag: &str) -> bool {
        self.type_tag == tag
    }
}

/// Trigger logic of one effect type.
///
/// `params` is the merged bag for this activation (definition defaults with
/// the caller's context on top). Writes to it reach the caller only when the
/// caller collates.
pub trait FeatureLogic: Send {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()>;
}

/// A registrable effect type: its tag and its ledger payload shape
pub trait FeatureKind: FeatureLogic + Default + 'static {
    const TAG: &'static str;
    type Data: Serialize + DeserializeOwned;
}

/// Payload of effects that never record anything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoData;
