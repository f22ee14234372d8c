//! Prompt Building
//!
//! Constructs the classification and reply prompts for the lead
//! qualification assistant.

use lead_agent_config::PersonaConfig;
use lead_agent_core::{GenerateRequest, Language, LeadField, LeadRecord};

/// Prompt builder bound to one persona
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    persona: PersonaConfig,
}

impl PromptBuilder {
    pub fn new(persona: PersonaConfig) -> Self {
        Self { persona }
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    /// Ask the model for exactly one intent label
    pub fn classification(&self, transcript: &str, lead: &LeadRecord) -> GenerateRequest {
        let prompt = format!(
            r#"Classify the user's intent from their message.

User message: "{transcript}"

Lead status:
{status}

Classify as ONE of:
1. GREETING - if greeting or introducing themselves
2. OBJECTION - if declining or not interested
3. SERVICE_INQUIRY - if asking about services, features, pricing, timeline, or any question
4. LEAD_QUALIFICATION - if providing personal info (name, phone, company) or lead is incomplete

Return ONLY the classification (GREETING, OBJECTION, SERVICE_INQUIRY, or LEAD_QUALIFICATION)."#,
            transcript = transcript,
            status = lead.status_summary(),
        );
        GenerateRequest::from_user(prompt).with_max_tokens(10)
    }

    /// Persona rules followed by the retrieved context
    pub fn system_prompt(&self, language: Language, context: Option<&str>) -> String {
        let mut system = format!(
            r#"You are {name}, a friendly AI assistant from {company}.

IMPORTANT RULES:
- Respond ONLY in {language}
- Be conversational, warm, and natural - like talking to a friend
- Keep responses under {max_words} words
- When listing services, present them clearly with numbers
- NO pricing details - say "Our team will provide a custom quote based on your needs"
- NO technical jargon - keep it simple and business-focused

COMPANY INFO:
{blurb}"#,
            name = self.persona.name,
            company = self.persona.company,
            language = language.name(),
            max_words = self.persona.max_words,
            blurb = self.persona.company_blurb,
        );

        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            system.push_str("\n\n");
            system.push_str(context);
        }
        system
    }

    /// Instruction asking for the next missing lead field
    pub fn qualification_instruction(&self, transcript: &str, lead: &LeadRecord) -> String {
        let ask = match lead.next_missing() {
            Some(LeadField::Name) => "Respond warmly and ask for their name in a friendly way.",
            Some(LeadField::Phone) => "Thank them by name and ask for their phone number naturally.",
            Some(LeadField::Company) => "Thank them and ask which company they're from.",
            Some(LeadField::Requirement) => {
                "Ask what AI solution or service they're interested in."
            }
            None => {
                return "Thank them warmly and say our team will contact them soon at their phone number."
                    .to_string()
            }
        };
        let mut instruction = format!("User said: '{}'\n\n{}", transcript, ask);
        if let (Some(LeadField::Phone), Some(name)) =
            (lead.next_missing(), lead.get(LeadField::Name))
        {
            instruction.push_str(&format!(" Their name is {}.", name));
        }
        instruction
    }

    /// Instruction for answering a question from retrieved context
    pub fn service_instruction(&self, transcript: &str) -> String {
        format!(
            r#"User asked: '{}'

Based on the context provided, give a helpful, conversational response.
If listing services, format clearly with numbers (1, 2, 3...).
End with a friendly question to continue the conversation."#,
            transcript
        )
    }

    /// Chat request from a system prompt and a single instruction
    pub fn reply(&self, system: String, instruction: String) -> GenerateRequest {
        GenerateRequest::new(system).with_user_message(instruction)
    }
}
