pub mod dispatcher;
pub mod error;
pub mod fs;
pub mod logging;
pub mod safety;
pub mod schemas;
pub mod tree;

pub use dispatcher::{ToolDispatcher, ToolKind};
pub use error::ToolError;
pub use fs::Workspace;
pub use safety::SafetyError;
pub use schemas::tool_schemas;
