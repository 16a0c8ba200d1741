pub mod bridge;
pub mod context_store;
pub mod lookup;
pub mod prompt;
pub mod realtime;
pub mod telephony;
pub mod tools;

// Re-export commonly used types for convenience
pub use bridge::{BridgeServices, BridgeSession, BridgeState, MediaBridge, SessionTemplate};
pub use context_store::{CallContextStore, CallerContext};
pub use lookup::{
    ApplicationStatus, ApplicationStatusLookup, AssistantsKnowledgeBase, CrmProvider,
    KnowledgeAnswer, KnowledgeBase, StatusLookup, StatusQuery, ZohoCrm,
};
pub use prompt::PromptTemplate;
pub use realtime::{
    BaseRealtime, OpenAIRealtimeConnector, RealtimeConfig, RealtimeConnection, RealtimeConnector,
    RealtimeError, RealtimeResult,
};
pub use tools::ToolDispatcher;
