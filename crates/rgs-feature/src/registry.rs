//! Feature type registry
//!
//! Maps a type tag to a constructor and a payload decoder. The process-wide
//! registry is built once and only reachable immutably afterwards.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::effects;
use crate::error::{ConfigError, FeatureError, FeatureResult};
use crate::feature::{Feature, FeatureKind, FeatureLogic};

type Constructor = fn() -> Box<dyn FeatureLogic>;
type Decoder = fn(&[u8]) -> Result<Value, serde_json::Error>;

/// Constructor and payload decoder of one effect type
#[derive(Clone, Copy)]
pub struct Registration {
    pub create: Constructor,
    pub decode: Decoder,
}

fn construct<K: FeatureKind>() -> Box<dyn FeatureLogic> {
    Box::new(K::default())
}

fn decode_as<T: Serialize + DeserializeOwned>(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    let typed: T = serde_json::from_slice(bytes)?;
    serde_json::to_value(typed)
}

impl Registration {
    pub fn of<K: FeatureKind>() -> Self {
        Self {
            create: construct::<K>,
            decode: decode_as::<K::Data>,
        }
    }
}

/// Registry error
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("global feature registry already initialized")]
    AlreadyInitialized,
}

/// Tag → registration table
#[derive(Default)]
pub struct FeatureRegistry {
    entries: HashMap<&'static str, Registration>,
}

impl FeatureRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in effect library
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        effects::register_builtins(&mut registry);
        log::debug!("Registered {} built-in feature types", registry.len());
        registry
    }

    /// Register an effect type.
    ///
    /// # Panics
    /// If `tag` is already registered. Registration happens while the
    /// process starts, before any round can run.
    pub fn register(&mut self, tag: &'static str, registration: Registration) {
        if self.entries.insert(tag, registration).is_some() {
            panic!("duplicate feature type `{}`", tag);
        }
    }

    pub fn register_kind<K: FeatureKind>(&mut self) {
        self.register(K::TAG, Registration::of::<K>());
    }

    /// Fresh instance of the effect registered under `tag`
    pub fn create(&self, tag: &str) -> Result<Box<dyn FeatureLogic>, ConfigError> {
        self.entries
            .get(tag)
            .map(|r| (r.create)())
            .ok_or_else(|| ConfigError::UnknownType(tag.to_string()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = self.entries.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    fn registration(&self, tag: &str) -> FeatureResult<&Registration> {
        self.entries
            .get(tag)
            .ok_or_else(|| FeatureError::Serialization(format!("unknown feature type `{}`", tag)))
    }

    /// Payload bytes of a realized feature, checked against its registered shape
    pub fn encode(&self, feature: &Feature) -> FeatureResult<Vec<u8>> {
        let registration = self.registration(&feature.type_tag)?;
        let bytes = serde_json::to_vec(&feature.data)?;
        (registration.decode)(&bytes).map_err(|e| {
            FeatureError::Serialization(format!("{} #{}: {}", feature.type_tag, feature.id, e))
        })?;
        Ok(bytes)
    }

    /// Rebuild a realized feature from its tag, id and payload bytes
    pub fn decode(&self, tag: &str, id: u32, bytes: &[u8]) -> FeatureResult<Feature> {
        let registration = self.registration(tag)?;
        let data = (registration.decode)(bytes)
            .map_err(|e| FeatureError::Serialization(format!("{} #{}: {}", tag, id, e)))?;
        Ok(Feature {
            id,
            type_tag: tag.to_string(),
            data,
        })
    }

    /// Serialize a whole ledger, checking every payload
    pub fn encode_ledger(&self, ledger: &[Feature]) -> FeatureResult<Vec<u8>> {
        for feature in ledger {
            self.encode(feature)?;
        }
        Ok(serde_json::to_vec(ledger)?)
    }

    /// Deserialize a whole ledger, checking every payload
    pub fn decode_ledger(&self, bytes: &[u8]) -> FeatureResult<Vec<Feature>> {
        let raw: Vec<Feature> = serde_json::from_slice(bytes)?;
        raw.iter()
            .map(|f| {
                let payload = serde_json::to_vec(&f.data)?;
                self.decode(&f.type_tag, f.id, &payload)
            })
            .collect()
    }
}

static GLOBAL: OnceLock<FeatureRegistry> = OnceLock::new();

/// Process-wide registry, initialized with the built-in library on first use
pub fn global() -> &'static FeatureRegistry {
    GLOBAL.get_or_init(FeatureRegistry::builtin)
}

/// Install a custom process-wide registry before first use
pub fn install(registry: FeatureRegistry) -> Result<&'static FeatureRegistry, RegistryError> {
    GLOBAL
        .set(registry)
        .map_err(|_| RegistryError::AlreadyInitialized)?;
    Ok(global())
}
