//! Declarative abstract → concrete tool binding table.
//!
//! Host tool surfaces change between server versions (tools get renamed,
//! merged, or take differently-cased arguments). Callers only ever use the
//! abstract names in [`catalog`](crate::catalog); a [`ToolMap`] built for a
//! [`HostSchema`] says which concrete tool to call and how to reshape the
//! argument bag. Names without a binding are rejected, never guessed.

use crate::catalog::*;
use prdigest_config::{BindingConfig, HostSchema, ToolHostConfig};
use prdigest_core::error::ToolHostError;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// How one abstract tool is invoked on the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolBinding {
    /// Concrete tool name on the host
    pub concrete: String,
    /// Abstract argument name → host argument name
    pub renames: BTreeMap<String, String>,
    /// Constant arguments added to every call (overriding caller values)
    pub inject: Map<String, Value>,
}

impl ToolBinding {
    pub fn new(concrete: impl Into<String>) -> Self {
        Self {
            concrete: concrete.into(),
            renames: BTreeMap::new(),
            inject: Map::new(),
        }
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    pub fn inject(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inject.insert(key.into(), value.into());
        self
    }

    /// Reshape an abstract argument bag into the host's shape.
    ///
    /// `null` is treated as an empty bag; any other non-object is rejected.
    pub fn apply(&self, arguments: Value) -> Result<Value, ToolHostError> {
        let args = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ToolHostError::InvalidArguments(format!(
                    "expected a JSON object, got {other}"
                )));
            }
        };

        let mut shaped: Map<String, Value> = args
            .into_iter()
            .map(|(key, value)| match self.renames.get(&key) {
                Some(renamed) => (renamed.clone(), value),
                None => (key, value),
            })
            .collect();

        for (key, value) in &self.inject {
            shaped.insert(key.clone(), value.clone());
        }

        Ok(Value::Object(shaped))
    }
}

impl From<&BindingConfig> for ToolBinding {
    fn from(config: &BindingConfig) -> Self {
        Self {
            concrete: config.concrete.clone(),
            renames: config.renames.clone(),
            inject: config.inject.clone(),
        }
    }
}

/// The binding table for one host schema version, plus any overrides.
#[derive(Debug, Clone)]
pub struct ToolMap {
    schema: HostSchema,
    bindings: BTreeMap<String, ToolBinding>,
}

impl ToolMap {
    /// The built-in table for a host schema version.
    pub fn for_schema(schema: HostSchema) -> Self {
        let mut bindings = BTreeMap::new();

        match schema {
            HostSchema::Legacy => {
                bindings.insert(
                    SEARCH_REPOSITORIES.to_string(),
                    ToolBinding::new("search_repositories").rename("per_page", "perPage"),
                );
                bindings.insert(
                    LIST_PULL_REQUESTS.to_string(),
                    ToolBinding::new("list_pull_requests"),
                );
                bindings.insert(
                    GET_PULL_REQUEST.to_string(),
                    ToolBinding::new("get_pull_request"),
                );
                bindings.insert(
                    GET_PULL_REQUEST_FILES.to_string(),
                    ToolBinding::new("get_pull_request_files"),
                );
                // No diff tool on this version; file listings carry per-file patches.
                bindings.insert(
                    GET_PULL_REQUEST_DIFF.to_string(),
                    ToolBinding::new("get_pull_request_files"),
                );
            }
            HostSchema::Consolidated => {
                bindings.insert(
                    SEARCH_REPOSITORIES.to_string(),
                    ToolBinding::new("search_repositories").rename("per_page", "perPage"),
                );
                bindings.insert(
                    LIST_PULL_REQUESTS.to_string(),
                    ToolBinding::new("list_pull_requests").rename("per_page", "perPage"),
                );
                for (name, method) in [
                    (GET_PULL_REQUEST, "get"),
                    (GET_PULL_REQUEST_FILES, "get_files"),
                    (GET_PULL_REQUEST_DIFF, "get_diff"),
                ] {
                    bindings.insert(
                        name.to_string(),
                        ToolBinding::new("pull_request_read")
                            .rename("pull_number", "pullNumber")
                            .rename("per_page", "perPage")
                            .inject("method", method),
                    );
                }
            }
        }

        Self { schema, bindings }
    }

    /// The built-in table for the configured schema with config overrides applied.
    pub fn from_config(config: &ToolHostConfig) -> Self {
        config
            .bindings
            .iter()
            .fold(Self::for_schema(config.schema), |map, (name, binding)| {
                map.with_binding(name.clone(), ToolBinding::from(binding))
            })
    }

    /// Add or replace the binding for an abstract tool.
    pub fn with_binding(mut self, name: impl Into<String>, binding: ToolBinding) -> Self {
        self.bindings.insert(name.into(), binding);
        self
    }

    pub fn schema(&self) -> HostSchema {
        self.schema
    }

    pub fn binding(&self, name: &str) -> Option<&ToolBinding> {
        self.bindings.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ToolBinding)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every concrete tool name this map can call.
    pub fn concrete_names(&self) -> BTreeSet<&str> {
        self.bindings.values().map(|b| b.concrete.as_str()).collect()
    }

    /// Translate an abstract call into `(concrete name, host arguments)`.
    pub fn resolve(&self, name: &str, arguments: Value) -> Result<(String, Value), ToolHostError> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| ToolHostError::UnknownTool(name.to_string()))?;
        let shaped = binding.apply(arguments)?;
        Ok((binding.concrete.clone(), shaped))
    }

    /// Fail unless every name in `abstract_names` has a binding.
    pub fn validate<'a>(
        &self,
        abstract_names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ToolHostError> {
        let missing: Vec<String> = abstract_names
            .into_iter()
            .filter(|name| !self.bindings.contains_key(*name))
            .map(String::from)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ToolHostError::UnboundTools { missing })
        }
    }
}
