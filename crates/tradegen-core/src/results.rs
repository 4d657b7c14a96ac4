//! Step results: insertion-ordered outputs with typed handles
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// Typed, named handle to one step's output.
///
/// A step that reads another step's result declares the dependency as a
/// `StepKey` constant instead of a bare string.
pub struct StepKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StepKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for StepKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StepKey<T> {}

impl<T> fmt::Debug for StepKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "StepKey({})", self.name)
    }
}

/// Outputs of successfully completed steps, in completion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResults {
    entries: Vec<(String, Value)>,
}

impl StepResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a step's output. Re-inserting keeps the original position.
    pub fn insert(&mut self, step: impl Into<String>, value: Value) {
        let step = step.into();
        match self.entries.iter_mut().find(|(name, _)| *name == step) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((step, value)),
        }
    }

    /// Raw JSON output of a step
    pub fn get_raw(&self, step: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == step)
            .map(|(_, value)| value)
    }

    /// Decode a step's output; `Ok(None)` when the step left no result
    pub fn try_get<T: DeserializeOwned>(
        &self,
        key: &StepKey<T>,
    ) -> Result<Option<T>, serde_json::Error> {
        self.get_raw(key.name())
            .map(|value| T::deserialize(value))
            .transpose()
    }

    /// Decode a step's output, treating decode failures as absent
    pub fn get<T: DeserializeOwned>(&self, key: &StepKey<T>) -> Option<T> {
        self.try_get(key).ok().flatten()
    }

    pub fn contains(&self, step: &str) -> bool {
        self.get_raw(step).is_some()
    }

    /// Step names, in insertion order
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for StepResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
