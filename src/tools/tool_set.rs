//! Ordered, name-unique collection of tools.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::tool::FunctionTool;

/// Tool definition in the shape providers serialize into their API payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The set of tools offered for one request.
///
/// Order is preserved; names are unique. Adding a tool under an existing
/// name replaces the previous one.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn FunctionTool>>,
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn FunctionTool>>) -> Self {
        let mut set = Self::default();
        for tool in tools {
            set.add(tool);
        }
        set
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any existing tool with the same name.
    pub fn add(&mut self, tool: Arc<dyn FunctionTool>) {
        if let Some(existing) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            tracing::debug!(tool = tool.name(), "replacing tool in set");
            *existing = tool;
        } else {
            self.tools.push(tool);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn FunctionTool>> {
        let idx = self.tools.iter().position(|t| t.name() == name)?;
        Some(self.tools.remove(idx))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FunctionTool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FunctionTool>> {
        self.tools.iter()
    }

    /// Definitions of the active tools, in the shape providers serialize.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|t| t.active())
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters().clone(),
            })
            .collect()
    }
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet").field("tools", &self.names()).finish()
    }
}
