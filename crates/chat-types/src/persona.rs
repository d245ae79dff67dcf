use serde::{Deserialize, Serialize};

pub const DEFAULT_PERSONA: &str =
    "You are ChatGPT, a large language model trained by OpenAI, based on the GPT-4 architecture.";

const MARKDOWN_DIRECTIVE: &str = " Always answer in markdown.";

/// Character/tone/style/format choices that make up a new chat's system prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaDirectives {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl PersonaDirectives {
    pub fn is_empty(&self) -> bool {
        [&self.character, &self.tone, &self.style, &self.format]
            .iter()
            .all(|d| non_blank(d).is_none())
    }

    /// Assemble the system prompt. Blank directives are ignored.
    pub fn system_prompt(&self) -> String {
        let mut parts = Vec::new();
        if let Some(character) = non_blank(&self.character) {
            parts.push(format!("You are {}.", character));
        }
        if let Some(tone) = non_blank(&self.tone) {
            parts.push(format!("Respond in {} tone.", tone));
        }
        if let Some(style) = non_blank(&self.style) {
            parts.push(format!("Respond in {} style.", style));
        }
        if let Some(format) = non_blank(&self.format) {
            parts.push(format.to_string());
        }
        if parts.is_empty() {
            parts.push(DEFAULT_PERSONA.to_string());
        }
        parts.join(" ") + MARKDOWN_DIRECTIVE
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
