pub mod history;
pub mod tools;

pub use history::{HistoryPanel, HistoryStore};
pub use tools::{SelectionController, Tool, ToolSettings, ToolsPanel};
