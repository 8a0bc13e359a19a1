//! PromQL syntax helpers: range-selector detection, the validation rule
//! for generated queries, and the generation prompt.

use std::sync::OnceLock;

use regex::Regex;

use df_domain::error::{Error, Result};

use crate::catalog::MetricCatalog;

fn range_selector_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\d+[smhd]\]").expect("static regex"))
}

fn agg_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(sum|avg|max|min|count|count_values|stddev|stdvar|topk|bottomk)\([^\)]+\)\[\d+[smhd]\]",
        )
        .expect("static regex")
    })
}

/// Whether the query selects over a time range (`[5m]`, `[24h]`, ...),
/// which routes it to the range-query endpoint.
pub fn has_range_selector(query: &str) -> bool {
    range_selector_re().is_match(query)
}

/// Reject the one shape models reliably get wrong: a range selector
/// directly after an aggregation, like `sum(metric)[24h]`.
pub fn validate(query: &str) -> Result<()> {
    if agg_range_re().is_match(query) {
        return Err(Error::Metrics(format!(
            "invalid PromQL generated (range selector after aggregation): {query}"
        )));
    }
    Ok(())
}

/// Strip the code fences and labels models wrap queries in.
pub fn clean_query(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("```promql")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}

/// The query-generation prompt, constrained to the catalog vocabulary.
pub fn generation_prompt(user_query: &str, catalog: &MetricCatalog) -> String {
    format!(
        r#"You are a Prometheus PromQL expert. Your task is to translate natural language monitoring questions into valid PromQL queries.

Only use the metrics provided. Do NOT invent metric names.

## PromQL rules (must follow):
- For counters over time (e.g., *_total), use: increase(metric[duration])
- Never use [duration] after an aggregation like sum() — this is invalid
- To aggregate a counter over time, use: sum(increase(metric[duration]))
- To get current values (instant vector), use: sum(metric) or metric
- Do NOT return explanations or comments — return only the PromQL query

## Example queries:
Q: How many failed API calls in the last hour?
-> sum(increase(api_calls_failed_total[1h]))

Q: What is the current memory usage?
-> sum(node_memory_Active_bytes)

User Query: {user_query}

Available Metrics:
{names}

Metric Descriptions:
{knowledge}

Return ONLY the valid PromQL query."#,
        names = catalog.names_block(),
        knowledge = catalog.knowledge_block(),
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
