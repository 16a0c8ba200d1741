//! External lookup providers used by tool calls and the call-setup prefetch.
//!
//! - [`status`]: application status lookup over a [`CrmProvider`]
//! - [`zoho`]: Zoho CRM implementation of [`CrmProvider`]
//! - [`knowledge_base`]: OpenAI Assistants implementation of [`KnowledgeBase`]

pub mod knowledge_base;
pub mod status;
pub mod zoho;

pub use knowledge_base::{
    AssistantsConfig, AssistantsKnowledgeBase, KnowledgeAnswer, KnowledgeBase, KnowledgeBaseError,
};
pub use status::{
    ApplicationStatus, ApplicationStatusLookup, CrmError, CrmProvider, CrmResult, LeadRecord,
    NameMatch, StatusLookup, StatusQuery, status_message,
};
pub use zoho::{ZohoConfig, ZohoCredentials, ZohoCrm};
