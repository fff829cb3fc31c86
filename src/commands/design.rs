use serde::Deserialize;
use serde_json::{json, Value};

use crate::ai::{image_prompt_for, ChatTurn};
use crate::commands::{parse_payload, to_json};
use crate::models::AiConcept;
use crate::Storefront;

#[derive(Debug, Deserialize)]
struct ConceptPayload {
    #[serde(default)]
    prompt: String,
    /// Also render the concept as an image.
    #[serde(default, alias = "with_image", alias = "withImage")]
    image: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagePromptPayload {
    #[serde(default, alias = "visual_prompt", alias = "prompt")]
    visual_prompt: Option<String>,
    #[serde(default)]
    concept: Option<AiConcept>,
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
    #[serde(default)]
    history: Vec<ChatTurn>,
    message: String,
}

/// Cake concept for a free-text request, optionally with a rendered image.
pub async fn design_concept(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: ConceptPayload = parse_payload(arg0)?;
    let concept = sf.generative.generate_concept(&payload.prompt).await;
    let image = if payload.image {
        Some(sf.generative.generate_image(&image_prompt_for(&concept)).await)
    } else {
        None
    };
    Ok(json!({
        "concept": to_json(&concept)?,
        "demo": concept.is_demo(),
        "image": image,
    }))
}

/// Render an image from a concept (suffix added) or a raw visual prompt.
pub async fn design_image(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: ImagePromptPayload = parse_payload(arg0)?;
    let prompt = match (payload.concept, payload.visual_prompt) {
        (Some(concept), _) => image_prompt_for(&concept),
        (None, Some(prompt)) => prompt,
        (None, None) => return Err("A concept or visual prompt is required".into()),
    };
    Ok(json!({ "image": sf.generative.generate_image(&prompt).await }))
}

pub async fn design_chat(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: ChatPayload = parse_payload(arg0)?;
    let text = sf
        .generative
        .send_chat_message(&payload.history, &payload.message)
        .await;
    Ok(json!({ "text": text }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{DEMO_CHAT_REPLY, DEMO_IMAGE_URL};
    use crate::{Settings, SettingsHandle};
    use std::path::PathBuf;

    fn offline_storefront() -> Storefront {
        let mut settings = Settings::local_only(PathBuf::from("/tmp/unused"));
        settings.api_base_url = "http://127.0.0.1:9/api".into();
        Storefront::in_memory(SettingsHandle::new(settings)).unwrap()
    }

    #[tokio::test]
    async fn test_concept_falls_back_to_demo_with_image() {
        let sf = offline_storefront();
        let result = design_concept(&sf, Some(json!({ "prompt": "unicorn", "image": true })))
            .await
            .unwrap();
        assert_eq!(result["demo"], true);
        assert_eq!(result["image"], DEMO_IMAGE_URL);
        assert!(result["concept"]["suggestedFlavors"].is_array());
    }

    #[tokio::test]
    async fn test_image_requires_a_prompt() {
        let sf = offline_storefront();
        assert!(design_image(&sf, None).await.is_err());
        let result = design_image(&sf, Some(json!({ "prompt": "a cake" })))
            .await
            .unwrap();
        assert_eq!(result["image"], DEMO_IMAGE_URL);
    }

    #[tokio::test]
    async fn test_chat_demo_reply() {
        let sf = offline_storefront();
        let result = design_chat(
            &sf,
            Some(json!({ "history": [{ "sender": "user", "text": "hi" }], "message": "price?" })),
        )
        .await
        .unwrap();
        assert_eq!(result["text"], DEMO_CHAT_REPLY);
    }
}
