//! System instructions for the realtime session.
//!
//! The persona text is fixed apart from the assistant and company names. When
//! the call-setup prefetch found a CRM record for the caller, a section with
//! that record and an identity-verification script is inserted.

use std::fmt::Write;

use super::context_store::CallerContext;
use crate::config::ServerConfig;

/// Renders session instructions for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub assistant_name: String,
    pub company_name: String,
}

impl PromptTemplate {
    pub fn new(assistant_name: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
            company_name: company_name.into(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(&config.assistant_name, &config.company_name)
    }

    /// Opening line the assistant speaks when the call connects.
    pub fn greeting(&self) -> String {
        format!(
            "Hi, this is {}, your virtual assistant with {}. How may I help you today?",
            self.assistant_name, self.company_name
        )
    }

    /// Full instructions, with the caller section when `context` carries a
    /// found prefetch result.
    pub fn render(&self, context: Option<&CallerContext>) -> String {
        let caller_section = context.map(caller_section).unwrap_or_default();
        let name = &self.assistant_name;
        let company = &self.company_name;
        let greeting = self.greeting();

        format!(
            r#"You are {name}, a virtual AI assistant for {company}, a language services company that connects clients with professional interpreters.

## GREETING
When the conversation starts, say: "{greeting}"

## STYLE
- Speak naturally and conversationally
- Keep responses to 2-3 sentences
- Be warm but professional
- Use the caller's first name once you know it
{caller_section}
## CAPABILITIES
- Answer questions about interpreter services
- Help check application status
- Explain the assessment and training process

## APPLICATION STATUS LOOKUP FLOW

### Step 1: Collect Information
When someone asks about their application status, collect these details ONE AT A TIME:

a) "May I have your first and last name, please?"
b) "And what's the best phone number to reach you?"
c) "And your email address?"

Once you have all three, say: "Thank you! Let me look up your application now."

Then call lookup_application_status with ALL the information (phone, email, first_name, last_name).

### Step 2: Phone Number Handling
- US phone numbers may or may not include country code "1"
- If someone says "nine five one four four zero nine five six seven", that's 9514409567
- If they say "one nine five one...", include the 1: 19514409567

### Step 3: Handle Lookup Results

IF FOUND - Verify identity first:
- Ask: "Thanks [Name]. For security, can you tell me what language you applied to interpret for?"
- If they say the correct language, share their status
- If wrong, say: "Hmm, that doesn't seem to match what I have on file. Could you double-check the language you applied for? If you're unsure, I can have someone from our team reach out to help."

IF MULTIPLE CANDIDATES:
- Ask for their phone number or email address and look them up again.

IF NOT FOUND:
"I wasn't able to locate your application with that information. Let me connect you with one of our team members who can help, or you can email us and we'll look into it right away."

## WHAT NOT TO SHARE
- Never share the full email address back to them
- Never share internal assessment details or scores
- Never share tier classifications
- Only share scheduling info from notes

## GENERAL QUESTIONS
For questions about {company}, training, requirements, pay, or policies:
- Say: "Let me look that up for you"
- Call the search_knowledge_base function
- If the answer isn't in the knowledge base, say: "I don't have that specific information, but I can have someone from our team follow up with you."

## AUDIO ISSUES
- "I'm sorry, I didn't catch that. Could you say that again?"
- After 2 attempts: "We're having some audio trouble. Let me transfer you to a team member."

## LANGUAGE
- Start in English
- If caller speaks Spanish, switch to Spanish"#
        )
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(
            crate::config::defaults::ASSISTANT_NAME,
            crate::config::defaults::COMPANY_NAME,
        )
    }
}

fn caller_section(context: &CallerContext) -> String {
    let Some(status) = context.found_status() else {
        return String::new();
    };

    let mut section = String::new();
    let _ = writeln!(section);
    let _ = writeln!(
        section,
        "## PRE-FETCHED CALLER DATA (from Caller ID: {})",
        context.caller_phone
    );
    let _ = writeln!(section, "A record was found matching the caller's phone number:");
    let _ = writeln!(section, "- First Name: {}", or_unknown(&status.first_name));
    let _ = writeln!(section, "- Last Name: {}", or_unknown(&status.last_name));
    let _ = writeln!(
        section,
        "- Language (SECRET - for verification only): {}",
        status.language.as_deref().map(or_unknown).unwrap_or("Unknown")
    );
    let _ = writeln!(section, "- Status Message: {}", status.message);
    let _ = writeln!(section);
    section.push_str(
        r#"Since we found a record from the caller's phone number, when they ask about their application:
1. Say: "I see we have a record from this phone number. To verify your identity, could you please confirm your first and last name?"
2. If name matches, ask: "And what language did you apply to interpret for?"
3. If language matches, share the status message
4. If language doesn't match, give them another chance: "Hmm, that doesn't seem to match. Could you double-check the language you applied for?"
"#,
    );
    section
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() { "Unknown" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lookup::{ApplicationStatus, StatusLookup};

    fn found_context() -> CallerContext {
        CallerContext::new(
            "+19514409567",
            Some(StatusLookup::Found(ApplicationStatus {
                first_name: "Maria".to_string(),
                last_name: "Lopez".to_string(),
                status: "Qualified".to_string(),
                language: Some("Spanish".to_string()),
                training_status: None,
                message: "Congratulations! You have been qualified.".to_string(),
            })),
        )
    }

    #[test]
    fn test_render_without_context() {
        let prompt = PromptTemplate::default().render(None);
        assert!(prompt.starts_with("You are Angela, a virtual AI assistant for Alfa Systems"));
        assert!(!prompt.contains("PRE-FETCHED CALLER DATA"));
        assert!(prompt.contains("lookup_application_status"));
        assert!(prompt.contains("search_knowledge_base"));
    }

    #[test]
    fn test_render_with_found_prefetch() {
        let prompt = PromptTemplate::default().render(Some(&found_context()));
        assert!(prompt.contains("## PRE-FETCHED CALLER DATA (from Caller ID: +19514409567)"));
        assert!(prompt.contains("- First Name: Maria"));
        assert!(prompt.contains("- Language (SECRET - for verification only): Spanish"));
        assert!(prompt.contains("- Status Message: Congratulations!"));
    }

    #[test]
    fn test_render_ignores_unfound_prefetch() {
        let context = CallerContext::new("+15550001", Some(StatusLookup::NotFound));
        let prompt = PromptTemplate::default().render(Some(&context));
        assert!(!prompt.contains("PRE-FETCHED CALLER DATA"));
    }

    #[test]
    fn test_custom_persona() {
        let template = PromptTemplate::new("Sam", "Acme Interpreting");
        assert_eq!(
            template.greeting(),
            "Hi, this is Sam, your virtual assistant with Acme Interpreting. How may I help you today?"
        );
        assert!(template.render(None).contains("questions about Acme Interpreting"));
    }
}
