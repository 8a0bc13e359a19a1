//! Natural-language monitoring questions over Prometheus.
//!
//! Pipeline: a catalog of known metrics constrains an LLM call that
//! produces a PromQL query; the query is validated, executed against
//! the instant- or range-query endpoint depending on whether it carries
//! a time-range selector, and the result set is summarized back into
//! prose by a second LLM call.

pub mod catalog;
pub mod client;
pub mod pipeline;
pub mod promql;

pub use catalog::MetricCatalog;
pub use client::PrometheusClient;
pub use pipeline::MetricsPipeline;
