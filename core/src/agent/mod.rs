pub mod context;
pub mod history;
pub mod loop_;
pub mod registry;
pub mod session;

pub use context::ContextBuilder;
pub use history::ConversationHistory;
pub use loop_::{AgentLoop, TurnState};
pub use registry::ToolRegistry;
pub use session::{Session, SessionEvent, SessionState};
