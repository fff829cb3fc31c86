//! Client for the generative content endpoints (cake concepts, concept
//! images, chat assistant).
//!
//! The endpoints are best-effort: any transport error, non-success status
//! or malformed payload degrades to a fixed demo response so the design
//! flow keeps working without a model proxy.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::SettingsHandle;
use crate::models::AiConcept;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Appended to a concept's visual prompt before asking for an image.
pub const IMAGE_PROMPT_SUFFIX: &str =
    " high quality professional food photography, cake on a stand";

pub const DEMO_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1535254973040-607b474cb50d?auto=format&fit=crop&w=800&q=80";

pub const DEMO_CHAT_REPLY: &str =
    "I'm currently in demo mode! For real responses, please contact us on WhatsApp. 🎂";

/// Marker placed at the start of the demo concept's description.
pub const DEMO_MARKER: &str = "[DEMO MODE] ";

pub fn demo_concept() -> AiConcept {
    AiConcept {
        name: "Enchanted Forest Whispers".into(),
        description: format!(
            "{DEMO_MARKER}A whimsical three-tier masterpiece covered in moss-green velvet texture, \
             adorned with edible gold leaf, fondant woodland creatures, and sugar-spun fairy wings."
        ),
        suggested_flavors: vec![
            "Dark Chocolate & Raspberry".into(),
            "Pistachio & Rosewater".into(),
            "Wild Berry & Vanilla Bean".into(),
        ],
        visual_prompt:
            "A professional 3-tier forest themed cake with edible moss, gold leaf, and fondant fairies"
                .into(),
    }
}

impl AiConcept {
    /// Validate an untyped model response. Every field must be present
    /// with the right JSON type; anything else is rejected.
    pub fn from_model_value(value: &Value) -> Option<Self> {
        let text = |key: &str| value.get(key)?.as_str().map(str::to_string);
        let flavors = value
            .get("suggestedFlavors")?
            .as_array()?
            .iter()
            .map(|f| f.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            name: text("name")?,
            description: text("description")?,
            suggested_flavors: flavors,
            visual_prompt: text("visualPrompt")?,
        })
    }

    pub fn is_demo(&self) -> bool {
        self.description.starts_with(DEMO_MARKER)
    }
}

/// Prompt used to render a concept as a photo.
pub fn image_prompt_for(concept: &AiConcept) -> String {
    format!("{}{IMAGE_PROMPT_SUFFIX}", concept.visual_prompt)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub sender: ChatSender,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: ChatSender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: ChatSender::Bot,
            text: text.into(),
        }
    }
}

#[derive(Clone)]
pub struct GenerativeClient {
    settings: SettingsHandle,
}

impl GenerativeClient {
    pub fn new(settings: SettingsHandle) -> Self {
        Self { settings }
    }

    fn endpoint(&self, name: &str) -> String {
        let base = self.settings.snapshot().api_base_url;
        format!("{}/{name}", base.trim().trim_end_matches('/'))
    }

    /// POST `body` to `<api_base>/<name>` and return the JSON response.
    async fn post_json(&self, name: &str, body: &Value) -> Result<Value, String> {
        let url = self.endpoint(name);
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?;
        debug!(endpoint = %url, "generative request");
        let resp = http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("{url} returned HTTP {}", status.as_u16()));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| format!("invalid JSON from {url}: {e}"))
    }

    pub async fn generate_concept(&self, prompt: &str) -> AiConcept {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return demo_concept();
        }
        match self.post_json("concept", &json!({ "prompt": prompt })).await {
            Ok(value) => AiConcept::from_model_value(&value).unwrap_or_else(|| {
                warn!("concept response missing required fields, using demo concept");
                demo_concept()
            }),
            Err(e) => {
                warn!(error = %e, "concept endpoint unavailable, using demo concept");
                demo_concept()
            }
        }
    }

    /// Image URL (or data URL) for a visual prompt.
    pub async fn generate_image(&self, visual_prompt: &str) -> String {
        let visual_prompt = visual_prompt.trim();
        if visual_prompt.is_empty() {
            return DEMO_IMAGE_URL.to_string();
        }
        match self
            .post_json("image", &json!({ "prompt": visual_prompt }))
            .await
        {
            Ok(value) => match value.get("image").and_then(Value::as_str) {
                Some(image) if !image.trim().is_empty() => image.to_string(),
                _ => {
                    warn!("image response had no image, using placeholder");
                    DEMO_IMAGE_URL.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "image endpoint unavailable, using placeholder");
                DEMO_IMAGE_URL.to_string()
            }
        }
    }

    pub async fn send_chat_message(&self, history: &[ChatTurn], message: &str) -> String {
        let message = message.trim();
        if message.is_empty() {
            return DEMO_CHAT_REPLY.to_string();
        }
        let body = json!({ "history": history, "message": message });
        match self.post_json("chat", &body).await {
            Ok(value) => match value.get("text").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => {
                    warn!("chat response had no text, using demo reply");
                    DEMO_CHAT_REPLY.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "chat endpoint unavailable, using demo reply");
                DEMO_CHAT_REPLY.to_string()
            }
        }
    }
}
