//! Tool calls issued by the realtime session.
//!
//! [`tool_definitions`] is the schema advertised in `session.update`;
//! [`ToolDispatcher`] runs a call by name and returns the JSON object sent
//! back as the `function_call_output`.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::lookup::{ApplicationStatusLookup, CrmProvider, KnowledgeBase, StatusQuery};
use super::realtime::ToolDef;

pub const LOOKUP_APPLICATION_STATUS: &str = "lookup_application_status";
pub const SEARCH_KNOWLEDGE_BASE: &str = "search_knowledge_base";

/// Function tools offered to the model.
pub fn tool_definitions(company_name: &str) -> Vec<ToolDef> {
    vec![
        ToolDef::function(
            LOOKUP_APPLICATION_STATUS,
            "Look up a candidate's application status in the CRM system. Use this when you don't have pre-fetched data.",
            json!({
                "type": "object",
                "properties": {
                    "phone": {"type": "string", "description": "The caller's phone number"},
                    "email": {"type": "string", "description": "The caller's email address"},
                    "first_name": {"type": "string", "description": "The caller's first name"},
                    "last_name": {"type": "string", "description": "The caller's last name"}
                },
                "required": []
            }),
        ),
        ToolDef::function(
            SEARCH_KNOWLEDGE_BASE,
            format!(
                "Search the {company_name} knowledge base for information about interpreter services, requirements, training, pay, policies."
            ),
            json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string", "description": "The question to search for"}
                },
                "required": ["question"]
            }),
        ),
    ]
}

/// Maps a function name to the matching lookup.
#[derive(Clone)]
pub struct ToolDispatcher {
    status: ApplicationStatusLookup,
    knowledge_base: Arc<dyn KnowledgeBase>,
}

impl ToolDispatcher {
    pub fn new(crm: Arc<dyn CrmProvider>, knowledge_base: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            status: ApplicationStatusLookup::new(crm),
            knowledge_base,
        }
    }

    pub fn status_lookup(&self) -> &ApplicationStatusLookup {
        &self.status
    }

    /// Run one tool call. `arguments` is the raw JSON string from the model;
    /// anything that is not a JSON object is treated as no arguments.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> Value {
        let arguments = parse_arguments(name, arguments);

        match name {
            LOOKUP_APPLICATION_STATUS => {
                let query = StatusQuery::from_arguments(&arguments);
                self.status.lookup(&query).await.to_json()
            }
            SEARCH_KNOWLEDGE_BASE => {
                let question = arguments
                    .get("question")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let answer = self.knowledge_base.search(question).await;
                json!({"found": answer.found, "answer": answer.answer})
            }
            other => {
                tracing::warn!(function = %other, "Unknown function requested");
                json!({"error": format!("Unknown function: {other}")})
            }
        }
    }
}

fn parse_arguments(name: &str, arguments: &str) -> Map<String, Value> {
    if arguments.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!(function = %name, "Function arguments are not an object");
            Map::new()
        }
        Err(e) => {
            tracing::warn!(function = %name, error = %e, "Malformed function arguments");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lookup::{CrmResult, KnowledgeAnswer, LeadRecord, NameMatch};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct SingleLeadCrm;

    #[async_trait]
    impl CrmProvider for SingleLeadCrm {
        async fn find_by_phone(&self, phone: &str) -> CrmResult<Option<LeadRecord>> {
            Ok((phone == "9514409567").then(|| LeadRecord {
                first_name: Some("Maria".to_string()),
                last_name: Some("Lopez".to_string()),
                lead_status: Some("Qualified".to_string()),
                ..Default::default()
            }))
        }

        async fn find_by_email(&self, _email: &str) -> CrmResult<Option<LeadRecord>> {
            Ok(None)
        }

        async fn find_by_name(&self, _first: &str, _last: &str) -> CrmResult<NameMatch> {
            Ok(NameMatch::Multiple(2))
        }
    }

    #[derive(Default)]
    struct EchoKnowledgeBase {
        questions: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl KnowledgeBase for EchoKnowledgeBase {
        async fn search(&self, question: &str) -> KnowledgeAnswer {
            self.questions.lock().push(question.to_string());
            KnowledgeAnswer::found(format!("answer to {question}"))
        }
    }

    fn dispatcher() -> (ToolDispatcher, Arc<EchoKnowledgeBase>) {
        let kb = Arc::new(EchoKnowledgeBase::default());
        (ToolDispatcher::new(Arc::new(SingleLeadCrm), kb.clone()), kb)
    }

    #[test]
    fn test_tool_definitions() {
        let tools = tool_definitions("Alfa Systems");
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, LOOKUP_APPLICATION_STATUS);
        assert_eq!(tools[1].name, SEARCH_KNOWLEDGE_BASE);
        assert!(
            tools[1]
                .description
                .as_deref()
                .unwrap()
                .contains("Alfa Systems knowledge base")
        );
        let json = serde_json::to_value(&tools[1]).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["parameters"]["required"][0], "question");
    }

    #[tokio::test]
    async fn test_dispatch_status_lookup() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher
            .dispatch(LOOKUP_APPLICATION_STATUS, r#"{"phone":"9514409567"}"#)
            .await;
        assert_eq!(result["found"], true);
        assert_eq!(result["first_name"], "Maria");
    }

    #[tokio::test]
    async fn test_dispatch_ambiguous_name() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher
            .dispatch(
                LOOKUP_APPLICATION_STATUS,
                r#"{"first_name":"Maria","last_name":"Lopez"}"#,
            )
            .await;
        assert_eq!(result["found"], false);
        assert_eq!(result["ambiguous"], true);
        assert_eq!(result["candidates"], 2);
    }

    #[tokio::test]
    async fn test_dispatch_knowledge_base() {
        let (dispatcher, kb) = dispatcher();
        let result = dispatcher
            .dispatch(SEARCH_KNOWLEDGE_BASE, r#"{"question":"What is the pay?"}"#)
            .await;
        assert_eq!(
            result,
            json!({"found": true, "answer": "answer to What is the pay?"})
        );
        assert_eq!(kb.questions.lock().as_slice(), ["What is the pay?"]);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_function() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher.dispatch("transfer_call", "{}").await;
        assert_eq!(result, json!({"error": "Unknown function: transfer_call"}));
    }

    #[tokio::test]
    async fn test_dispatch_malformed_arguments() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher
            .dispatch(LOOKUP_APPLICATION_STATUS, "{not json")
            .await;
        assert_eq!(result["found"], false);
        assert!(result.get("ambiguous").is_none());
    }
}
