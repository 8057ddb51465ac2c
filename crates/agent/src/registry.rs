//! Tool registry.
//!
//! Tools are registered once at startup through [`ToolRegistryBuilder`].
//! The built registry is immutable and keeps registration order, which is the
//! order used when the loop has to substitute an unused tool.

use crate::error::AgentError;
use crate::tool::{RetrievalTool, ToolDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

/// Append-only builder. Duplicate names are rejected.
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn RetrievalTool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name.
    pub fn register(mut self, tool: Arc<dyn RetrievalTool>) -> Result<Self, AgentError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }

        tracing::debug!(tool = %name, "Registered retrieval tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(self)
    }

    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            tools: self.tools,
            index: self.index,
        }
    }
}

/// Closed set of retrieval tools, looked up by name.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn RetrievalTool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::new()
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn RetrievalTool>, AgentError> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i]))
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Names and descriptions in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// First tool, in registration order, whose name is not in `used`.
    pub fn first_unused<'a, I>(&self, used: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let used: Vec<&str> = used.into_iter().collect();
        self.tools
            .iter()
            .map(|t| t.name())
            .find(|name| !used.contains(name))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
