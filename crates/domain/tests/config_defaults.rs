use df_domain::config::{Config, ReplyPayload};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8000
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(!config.server.cors.allowed_origins.is_empty());
    assert!(config
        .server
        .cors
        .allowed_origins
        .contains(&"http://localhost:*".to_string()));
}

#[test]
fn api_token_env_default() {
    let config = Config::default();
    assert_eq!(config.server.api_token_env, "DF_API_TOKEN");
}

#[test]
fn dialogue_defaults_to_full_context_replies() {
    let config = Config::default();
    assert_eq!(config.dialogue.reply_payload, ReplyPayload::Full);
}

#[test]
fn full_config_round_trips_through_toml() {
    let toml_str = r#"
[server]
port = 8000

[llm]
default_provider = "openai"
request_timeout_ms = 90000

[[llm.providers]]
id = "openai"
kind = "openai_compat"
base_url = "https://api.openai.com/v1"
default_model = "gpt-4o"

[llm.providers.auth]
env = "OPENAI_API_KEY"

[dialogue]
reply_payload = "delta"

[cluster]
timeout_secs = 60

[metrics]
base_url = "http://prom:9090/api/v1"
catalog_path = "ops/metrics.csv"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.llm.default_provider.as_deref(), Some("openai"));
    assert_eq!(config.dialogue.reply_payload, ReplyPayload::Delta);
    assert_eq!(config.cluster.timeout_secs, 60);
    assert_eq!(config.metrics.catalog_path, "ops/metrics.csv");
    assert!(config.validate().is_empty());
}
