//! In-memory object model backed by a JSON snapshot
//!
//! Used by the agent to host the room model outside the modelling tool and
//! by tests as a recording fake.

use super::{AttrValue, ObjectId, ObjectModel};
use crate::error::ModelError;
use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Serialized form of a single object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub name: ObjectId,
    pub class: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
}

/// Serialized form of the whole model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    #[serde(default)]
    pub objects: Vec<ObjectSnapshot>,
}

#[derive(Debug, Clone)]
struct ObjectState {
    class: String,
    attributes: BTreeMap<String, AttrValue>,
}

/// Thread-safe object model kept in memory
#[derive(Debug, Default)]
pub struct InMemoryModel {
    /// Map of object name -> state
    objects: DashMap<ObjectId, ObjectState>,
    /// Number of derived-value recomputations requested
    derive_count: AtomicU64,
}

impl InMemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from a snapshot, later objects replace earlier ones
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Self {
        let model = Self::new();
        for obj in snapshot.objects {
            model.objects.insert(
                obj.name,
                ObjectState {
                    class: obj.class,
                    attributes: obj.attributes,
                },
            );
        }
        model
    }

    /// Load a JSON snapshot from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        let snapshot: ModelSnapshot =
            serde_json::from_str(&content).context("Failed to parse model file")?;
        debug!(objects = snapshot.objects.len(), path = %path.display(), "Loaded model snapshot");
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current state as a JSON snapshot
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(&self.snapshot()).context("Failed to serialize model")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write model file {}", path.display()))?;
        Ok(())
    }

    /// Current state sorted by object name
    pub fn snapshot(&self) -> ModelSnapshot {
        let mut objects: Vec<ObjectSnapshot> = self
            .objects
            .iter()
            .map(|r| ObjectSnapshot {
                name: r.key().clone(),
                class: r.value().class.clone(),
                attributes: r.value().attributes.clone(),
            })
            .collect();
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        ModelSnapshot { objects }
    }

    /// Create an object without attributes
    pub fn insert(&self, name: impl Into<ObjectId>, class: impl Into<String>) {
        self.objects.insert(
            name.into(),
            ObjectState {
                class: class.into(),
                attributes: BTreeMap::new(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// How many times derived values were recomputed
    pub fn derive_count(&self) -> u64 {
        self.derive_count.load(Ordering::SeqCst)
    }
}

impl ObjectModel for InMemoryModel {
    fn objects_of_class(&self, class: &str) -> Vec<ObjectId> {
        let mut names: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|r| r.value().class == class)
            .map(|r| r.key().clone())
            .collect();
        names.sort();
        names
    }

    fn attribute(&self, object: &str, attribute: &str) -> Option<AttrValue> {
        self.objects
            .get(object)
            .and_then(|r| r.value().attributes.get(attribute).cloned())
    }

    fn check_attribute(
        &self,
        object: &str,
        attribute: &str,
        value: &AttrValue,
    ) -> Result<(), ModelError> {
        let entry = self
            .objects
            .get(object)
            .ok_or_else(|| ModelError::UnknownObject(object.to_string()))?;
        coerce(object, attribute, entry.attributes.get(attribute), value.clone()).map(|_| ())
    }

    fn set_attribute(
        &self,
        object: &str,
        attribute: &str,
        value: AttrValue,
    ) -> Result<(), ModelError> {
        let mut entry = self
            .objects
            .get_mut(object)
            .ok_or_else(|| ModelError::UnknownObject(object.to_string()))?;

        let value = coerce(object, attribute, entry.attributes.get(attribute), value)?;
        entry.attributes.insert(attribute.to_string(), value);
        Ok(())
    }

    fn update_derived_values(&self) {
        self.derive_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Keep the stored type of an existing attribute; integers widen into reals
fn coerce(
    object: &str,
    attribute: &str,
    current: Option<&AttrValue>,
    value: AttrValue,
) -> Result<AttrValue, ModelError> {
    match (current, value) {
        (Some(AttrValue::Real(_)), AttrValue::Integer(v)) => Ok(AttrValue::Real(v as f64)),
        (Some(current), value)
            if std::mem::discriminant(current) != std::mem::discriminant(&value) =>
        {
            Err(ModelError::WriteRejected {
                object: object.to_string(),
                attribute: attribute.to_string(),
                reason: format!(
                    "expected {}, got {}",
                    current.type_name(),
                    value.type_name()
                ),
            })
        }
        (_, value) => Ok(value),
    }
}
