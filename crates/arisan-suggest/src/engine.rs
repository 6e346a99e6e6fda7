use std::time::Duration;

use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use arisan_core::AiSettings;

use crate::SuggestError;

const GENERATE_TIMEOUT: Duration = Duration::from_secs(90);

fn map_backend(provider: &str) -> Result<LLMBackend, SuggestError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(SuggestError::UnknownProvider(other.to_string())),
    }
}

/// One system + user exchange with the configured provider. Returns the reply text.
pub async fn generate(
    settings: &AiSettings,
    system: &str,
    user_msg: &str,
) -> Result<String, SuggestError> {
    let backend = map_backend(&settings.provider)?;

    let mut builder = LLMBuilder::new()
        .backend(backend)
        .model(&settings.model)
        .system(system);

    if !settings.api_key.is_empty() {
        builder = builder.api_key(&settings.api_key);
    }

    let llm = builder
        .build()
        .map_err(|e| SuggestError::Generation(format!("gagal menyiapkan AI: {e}")))?;

    let messages = vec![ChatMessage::user().content(user_msg).build()];

    let response = tokio::time::timeout(GENERATE_TIMEOUT, llm.chat(&messages))
        .await
        .map_err(|_| SuggestError::Timeout(GENERATE_TIMEOUT.as_secs()))?
        .map_err(|e| SuggestError::Generation(format!("chat: {e}")))?;

    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(SuggestError::Generation("jawaban AI kosong".into())),
        None => Err(SuggestError::Generation("AI tidak mengirim teks".into())),
    }
}
