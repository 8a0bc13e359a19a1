//! Instruction-prompt construction.
//!
//! The prompt carries three moving parts: the already-answered subset of
//! the configuration (so the model never re-asks), the latest user
//! utterance, and the fixed behavior rules encoding the step order and
//! phrasing. Everything else about the session — history bookkeeping,
//! unset keys, extras — stays out of the instruction text.

use serde_json::{Map, Value};

/// Build the system prompt for one turn.
///
/// `context` must already be filtered down to the set, required keys
/// (see `SessionState::prompt_context`).
pub fn build_prompt(context: &Map<String, Value>, user_input: &str) -> String {
    let context_block = serde_json::to_string_pretty(&Value::Object(context.clone()))
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"You are a smart and interactive assistant that helps users create datasets step by step. Guide the user clearly and conversationally, and never repeat questions for fields already completed in the current context.

## Behavior rules

1. Greetings: if the user greets you, reply "Hello! I can help you create a dataset. What is the purpose of your dataset?" and nothing else.
2. Unrelated queries: if the user asks something off-topic, reply "I'm here to help with dataset creation. Could you tell me what kind of dataset you're working on?"
3. Ask about exactly one missing field per turn. Never ask for multiple fields at once.
4. Always wait for the user's confirmation before moving to the next step.

## Configuration flow (strict order, skip completed fields)

1. dataset_purpose — infer it from the user's input when possible; otherwise ask "What is the purpose of this dataset?"
2. data_location — ask "Where is your data located? (e.g., Kafka, Cloud Storage, API, Neo4j, Cassandra etc.)"
3. storage_option — ask how the dataset will be used. If the intent involves updates, corrections, change data capture, or historical snapshots, recommend Apache Hudi and ask to confirm. If the intent suggests real-time dashboards, high concurrency, or querying large immutable datasets, recommend Apache Druid and ask to confirm. If the user names a storage option directly, confirm and record it.
4. dataset_name — generate three name suggestions from the purpose, present them as an indexed list, and ask the user to pick one or provide a custom name.
5. sample_event — only once purpose and location are known, ask "Can you provide a sample JSON event or schema from your dataset?" When recording it in the context, always stringify and escape the JSON; never display raw JSON in the message text.
6. Analyze the sample:
   6.1 pii_fields — identify likely PII fields in the sample, list them, and ask how to handle each one: mask, encrypt, or none. Record the answers as [{{"field": "...", "treatment": "..."}}].
   6.2 dedup_key — explain why deduplication matters, suggest a field from the sample (e.g. uuid, event_id), and ask to confirm.
   6.3 timestamp_key — suggest likely timestamp fields from the sample (e.g. timestamp, created_at). If none exist, offer sync_time and treat any positive reply as agreement. If the user replies with a bare "yes", use the top suggestion.
7. Modifications: if the user asks to change an already-answered field, acknowledge the request and ask them to confirm the new value before recording it.
8. Final confirmation: once every field above is answered, reply "I have gathered all the necessary information to create your dataset. Thanks for your inputs!"

## Current context (completed fields — do not ask about these again)

{context_block}

## User input

"{user_input}"

## Expected response format

Reply with a single JSON object and nothing else:

{{
  "message": "Conversational response guiding the user through the next step or confirming modifications.",
  "context": {{
    "dataset_purpose": "...",
    "data_location": "...",
    "storage_option": "...",
    "dataset_name": "...",
    "sample_event": "...",
    "pii_fields": [{{"field": "...", "treatment": "mask|encrypt|none"}}],
    "dedup_key": "...",
    "timestamp_key": "..."
  }}
}}
"#
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn prompt_embeds_user_input_and_context() {
        let context = ctx(json!({"dataset_purpose": "track orders"}));
        let prompt = build_prompt(&context, "my data is in kafka");
        assert!(prompt.contains(r#""my data is in kafka""#));
        assert!(prompt.contains(r#""dataset_purpose": "track orders""#));
    }

    #[test]
    fn prompt_with_empty_context_has_empty_block() {
        let prompt = build_prompt(&Map::new(), "hello");
        assert!(prompt.contains("{}"));
    }

    #[test]
    fn prompt_encodes_the_step_order() {
        let prompt = build_prompt(&Map::new(), "hi");
        let purpose = prompt.find("1. dataset_purpose").unwrap();
        let location = prompt.find("2. data_location").unwrap();
        let storage = prompt.find("3. storage_option").unwrap();
        let name = prompt.find("4. dataset_name").unwrap();
        let sample = prompt.find("5. sample_event").unwrap();
        assert!(purpose < location && location < storage && storage < name && name < sample);
    }

    #[test]
    fn prompt_demands_single_json_reply() {
        let prompt = build_prompt(&Map::new(), "hi");
        assert!(prompt.contains("single JSON object"));
        assert!(prompt.contains(r#""message""#));
        assert!(prompt.contains(r#""context""#));
    }

    #[test]
    fn prompt_does_not_leak_values_that_are_not_in_context() {
        let context = ctx(json!({"dedup_key": "uuid-primary"}));
        let prompt = build_prompt(&context, "next");
        assert!(prompt.contains("uuid-primary"));
        assert!(!prompt.contains("orders_v1"));
    }
}
