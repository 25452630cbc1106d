use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput, JsonMap};
use serde_json::Value;

use crate::collaborators::{ChatMessage, Collaborators};
use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::settings::{openai_api_key, required_input, Settings};

/// Asks an LLM to grade the prediction; the reply text is the score.
///
/// The system turn is the `prompt_template` setting, the user turn a JSON
/// rendering of the evaluation context.
pub struct AiCritique;

#[async_trait]
impl Evaluator for AiCritique {
    fn name(&self) -> &'static str {
        "ai_critique"
    }

    async fn evaluate(&self, input: &EvaluatorInput, services: &Collaborators) -> Result<EvaluatorOutput> {
        let api_key = openai_api_key(&input.credentials)?;
        let template = Settings::new(&input.settings).required_str("prompt_template")?;
        let chat = services
            .chat
            .as_ref()
            .ok_or_else(|| EvalError::configuration("No chat client is configured."))?;

        let messages = vec![
            ChatMessage::system(template),
            ChatMessage::user(critique_context(&input.inputs)?),
        ];
        let reply = chat
            .complete(api_key, messages)
            .await
            .map_err(|e| EvalError::from_collaborator("ai critique", e))?;

        Ok(EvaluatorOutput::score(reply.trim().to_string()))
    }
}

/// Named context fields first, then every input entry (inputs win on clashes).
fn critique_context(inputs: &JsonMap) -> Result<String> {
    let mut context = JsonMap::new();
    context.insert(
        "llm_app_prompt_template".into(),
        inputs.get("prompt_user").cloned().unwrap_or_else(|| Value::String(String::new())),
    );
    context.insert("variant_output".into(), required_input(inputs, "prediction")?.clone());
    context.insert("correct_answer".into(), required_input(inputs, "ground_truth")?.clone());
    for (key, value) in inputs {
        context.insert(key.clone(), value.clone());
    }
    Ok(Value::Object(context).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::chat_fn;
    use serde_json::json;

    fn input() -> EvaluatorInput {
        EvaluatorInput::new()
            .input("prediction", "Paris")
            .input("ground_truth", "Paris")
            .input("prompt_user", "What is the capital of France?")
            .setting("prompt_template", "Rate the answer from 0 to 10.")
            .credential("OPENAI_API_KEY", "sk-test")
    }

    #[tokio::test]
    async fn test_reply_is_text_score() {
        let services = Collaborators::default().with_chat(chat_fn(|messages| {
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].role, "system");
            assert_eq!(messages[0].content, "Rate the answer from 0 to 10.");
            let ctx: Value = serde_json::from_str(&messages[1].content).unwrap();
            assert_eq!(ctx["variant_output"], json!("Paris"));
            assert_eq!(ctx["llm_app_prompt_template"], json!("What is the capital of France?"));
            Ok(" 10 \n".to_string())
        }));

        let out = AiCritique.evaluate(&input(), &services).await.unwrap();
        assert_eq!(out.score_value(), Some(&json!("10")));
    }

    #[tokio::test]
    async fn test_missing_template() {
        let services = Collaborators::default().with_chat(chat_fn(|_| Ok(String::new())));
        let mut input = input();
        input.settings.clear();
        let err = AiCritique.evaluate(&input, &services).await.unwrap_err();
        assert!(err.to_string().contains("prompt_template"));
    }

    #[test]
    fn test_context_defaults_prompt() {
        let inputs = EvaluatorInput::new().input("prediction", "a").input("ground_truth", "b").inputs;
        let ctx: Value = serde_json::from_str(&critique_context(&inputs).unwrap()).unwrap();
        assert_eq!(ctx["llm_app_prompt_template"], json!(""));
        assert_eq!(ctx["correct_answer"], json!("b"));
    }
}
