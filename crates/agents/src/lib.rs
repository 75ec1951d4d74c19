//! Tool abstraction shared by the tool implementations and their hosts.

pub mod tool_registry;

pub use tool_registry::{AgentTool, ToolRegistry};
