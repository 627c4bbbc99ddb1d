//! Start-up collection of wrapped endpoints and the exported, name-keyed map.

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::code::ErrorCode;
use crate::config::TransportOptions;
use crate::context::CallContext;
use crate::error::{CallError, RegistryError, Result};
use crate::wrapper::{EndpointDescriptor, GuardedCallable};

/// Longest name a hosting runtime accepts for an exported function.
pub const MAX_NAME_LEN: usize = 63;

/// Ordered list of wrapped endpoints, filled during start-up.
///
/// Nothing is checked on [`register`](Self::register); names and transport
/// options are validated when the registry is exported.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    descriptors: Vec<EndpointDescriptor>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor. Registration order is export order.
    pub fn register(&mut self, descriptor: EndpointDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Everything registered, exportable or not.
    pub fn descriptors(&self) -> &[EndpointDescriptor] {
        &self.descriptors
    }

    /// Build the name-keyed map of exportable endpoints.
    ///
    /// Non-exportable descriptors are skipped. Fails on the first duplicate
    /// name, invalid name or invalid transport options; a registry that
    /// fails here must not be served. Calling it again yields the same map.
    pub fn export(&self) -> Result<ExportedEndpoints> {
        let mut entries: Vec<ExportedEndpoint> = Vec::with_capacity(self.descriptors.len());
        let mut index = HashMap::with_capacity(self.descriptors.len());

        for descriptor in &self.descriptors {
            let name = descriptor.name();
            if !descriptor.is_exportable() {
                tracing::debug!(endpoint = name, "skipping non-exportable endpoint");
                continue;
            }

            validate_name(name)?;
            if let Some(transport) = &descriptor.config().transport {
                transport
                    .validate()
                    .map_err(|reason| RegistryError::InvalidConfig {
                        name: name.to_string(),
                        reason,
                    })?;
            }
            if index.contains_key(name) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }

            index.insert(name.to_string(), entries.len());
            entries.push(ExportedEndpoint {
                name: name.to_string(),
                callable: descriptor.callable().clone(),
                transport: descriptor.config().transport.clone(),
            });
        }

        tracing::debug!(
            exported = entries.len(),
            skipped = self.descriptors.len() - entries.len(),
            "endpoint registry exported"
        );
        Ok(ExportedEndpoints { entries, index })
    }

    /// Export and consume the registry, so nothing can be registered late.
    pub fn freeze(self) -> Result<ExportedEndpoints> {
        self.export()
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| RegistryError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let Some(first) = name.chars().next() else {
        return Err(invalid("name is empty"));
    };
    if !first.is_ascii_alphabetic() {
        return Err(invalid("must start with an ASCII letter"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("longer than 63 characters"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(RegistryError::InvalidName {
            name: name.to_string(),
            reason: format!("unsupported character {bad:?}"),
        });
    }
    Ok(())
}

/// One exported endpoint.
#[derive(Debug, Clone)]
pub struct ExportedEndpoint {
    pub name: String,
    pub callable: GuardedCallable,
    /// Options for the hosting transport; `None` means host defaults.
    pub transport: Option<TransportOptions>,
}

/// Exported endpoints keyed by name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ExportedEndpoints {
    entries: Vec<ExportedEndpoint>,
    index: HashMap<String, usize>,
}

impl ExportedEndpoints {
    pub fn get(&self, name: &str) -> Option<&ExportedEndpoint> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Dispatch by name. Unknown names fail with `not-found`.
    pub fn call(
        &self,
        name: &str,
        request: Value,
        context: CallContext,
    ) -> BoxFuture<'static, std::result::Result<Value, CallError>> {
        match self.get(name) {
            Some(entry) => entry.callable.call(request, context),
            None => {
                tracing::debug!(endpoint = name, "call to unknown endpoint");
                let err =
                    CallError::new(ErrorCode::NotFound, format!("no endpoint named '{name}'"));
                Box::pin(futures_util::future::ready(Err(err)))
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExportedEndpoint> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a ExportedEndpoints {
    type Item = &'a ExportedEndpoint;
    type IntoIter = std::slice::Iter<'a, ExportedEndpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
