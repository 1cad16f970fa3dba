//! Tool registry and the read-only mode gate.

use crate::error::{DbError, DbResult};
use crate::tools::{
    Capability, CreateIndexTool, CreateTableTool, DescribeTableTool, DropTableTool, InsertDataTool,
    ListTablesTool, ReadDataTool, Tool, UpdateDataTool,
};
use std::sync::Arc;

/// Ordered collection of every tool the server knows about.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in SQL Server tools in listing order.
    pub fn builtin() -> Self {
        Self {
            tools: vec![
                Arc::new(InsertDataTool::new()),
                Arc::new(ReadDataTool::new()),
                Arc::new(DescribeTableTool::new()),
                Arc::new(UpdateDataTool::new()),
                Arc::new(CreateTableTool::new()),
                Arc::new(CreateIndexTool::new()),
                Arc::new(DropTableTool::new()),
                Arc::new(ListTablesTool::new()),
            ],
        }
    }

    /// Append a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> DbResult<()> {
        let name = tool.descriptor().name;
        if self.get(name).is_some() {
            return Err(DbError::internal(format!(
                "Tool '{}' is already registered",
                name
            )));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.descriptor().name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tools visible under the given mode, in registry order.
    pub fn visible(&self, read_only: bool) -> ToolSet {
        let tools = self
            .tools
            .iter()
            .filter(|t| !read_only || t.descriptor().capability == Capability::ReadOnly)
            .cloned()
            .collect();
        ToolSet { tools }
    }
}

/// Free-function form of [`ToolRegistry::visible`].
pub fn visible_tools(registry: &ToolRegistry, read_only: bool) -> ToolSet {
    registry.visible(read_only)
}

/// The tools currently advertised and callable.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.descriptor().name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.descriptor().name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| t.descriptor().name))
            .finish()
    }
}
