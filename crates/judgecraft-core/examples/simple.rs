use judgecraft_core::testing::embed_fn;
use judgecraft_core::{
    map_fields, summary_table, Collaborators, Engine, EvaluationRecord, EvaluatorInput, LegacyCall, MappingInput,
};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Offline embeddings so the semantic evaluator runs without a network.
    let services = Collaborators::default().with_embeddings(embed_fn(|text| {
        let len = text.len() as f32;
        let norm = (len * len + 1.0).sqrt();
        Ok(vec![len / norm, 1.0 / norm])
    }));
    let engine = Engine::new(services);

    // Example 1: legacy calls, one per evaluator
    let calls = vec![
        (
            "auto_exact_match",
            LegacyCall::new("Paris").data("answer", "Paris").setting("correct_answer_key", "answer"),
        ),
        (
            "auto_similarity_match",
            LegacyCall::new("the cat sat")
                .data("answer", "the cat ran")
                .setting("correct_answer_key", "answer")
                .setting("similarity_threshold", 0.4),
        ),
        (
            "auto_json_diff",
            LegacyCall::new(r#"{"city": "Paris", "country": "DE"}"#)
                .data("answer", json!({"city": "Paris", "country": "FR"}))
                .setting("correct_answer_key", "answer"),
        ),
        (
            "auto_semantic_similarity",
            LegacyCall::new("cat")
                .data("answer", "kitten")
                .setting("correct_answer_key", "answer")
                .credential("OPENAI_API_KEY", "sk-local"),
        ),
        ("auto_contains_json", LegacyCall::new("no braces here")),
        ("auto_unknown", LegacyCall::new("x")),
    ];

    let mut records = Vec::new();
    for (i, (key, call)) in calls.iter().enumerate() {
        records.push(EvaluationRecord {
            id: Some(i.to_string()),
            evaluator: key.to_string(),
            result: engine.evaluate(key, call).await,
        });
    }
    println!("{}", summary_table(&records));

    // Example 2: direct call with the raw output envelope
    let input = EvaluatorInput::new()
        .input("prediction", "kitten")
        .input("ground_truth", "sitting")
        .setting("threshold", 3);
    let output = engine.run("auto_levenshtein_distance", &input).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    // Example 3: adapt a nested app response to a flat schema
    let mapped = map_fields(&MappingInput {
        inputs: json!({"choices": [{"message": {"content": "Paris"}}]}),
        mapping: [("answer".to_string(), "choices[0].message.content".to_string())].into(),
    });
    println!("{}", serde_json::to_string(&mapped)?);

    Ok(())
}
