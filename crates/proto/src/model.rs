use serde::{Deserialize, Serialize};

/// A selectable inference model and its daily request cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Wire model id, e.g. `openai/gpt-4o-mini`.
    pub id: String,
    /// Human-readable label for pickers and the status bar.
    pub title: String,
    /// Requests allowed per local calendar day. Always positive.
    pub daily_limit: u32,
}

impl ModelProfile {
    /// Creates a profile from id, title, and daily limit.
    pub fn new(id: impl Into<String>, title: impl Into<String>, daily_limit: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            daily_limit,
        }
    }
}

/// The models offered through the GitHub Models free tier.
pub fn default_catalog() -> Vec<ModelProfile> {
    vec![
        ModelProfile::new("openai/gpt-4o-mini", "OpenAI GPT-4o-mini", 150),
        ModelProfile::new("openai/gpt-4.1-mini", "OpenAI GPT-4.1-mini", 150),
        ModelProfile::new(
            "meta/Llama-4-Scout-17B-16E-Instruct",
            "Meta Llama 4 Scout 17B",
            50,
        ),
        ModelProfile::new("xai/grok-3-mini", "X Grok 3 Mini", 30),
        ModelProfile::new("deepseek/DeepSeek-V3-0324", "DeepSeek V3-0324", 50),
    ]
}

/// Looks up a profile by model id.
pub fn find_profile<'a>(catalog: &'a [ModelProfile], id: &str) -> Option<&'a ModelProfile> {
    catalog.iter().find(|profile| profile.id == id)
}
