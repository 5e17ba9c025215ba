use super::*;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

const LLM_VARS: &[&str] = &[
    "LLM_PROVIDER",
    "LLM_MODEL",
    "LLM_API_KEY_ENV",
    "LLM_OPENAI_MODE",
    "LLM_OPENAI_BASE_URL",
    "LLM_GEMINI_BASE_URL",
    "LLM_REQUEST_TIMEOUT_SECS",
    "LLM_CONNECT_TIMEOUT_SECS",
    "GEMINI_API_KEY",
    "ANTHROPIC_API_KEY",
    "OPENAI_API_KEY",
    "TEST_KEY",
];

/// Serialize env-mutating tests and start each from a clean slate.
fn lock_clean_env() -> MutexGuard<'static, ()> {
    let guard = ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    clear_llm_env();
    guard
}

fn clear_llm_env() {
    for var in LLM_VARS {
        // SAFETY: env access is serialized by ENV_LOCK within this module.
        unsafe { std::env::remove_var(var) };
    }
}

fn set(key: &str, value: &str) {
    // SAFETY: env access is serialized by ENV_LOCK within this module.
    unsafe { std::env::set_var(key, value) };
}

#[test]
fn from_env_defaults_to_gemini() {
    let _guard = lock_clean_env();
    set("GEMINI_API_KEY", "g-secret");

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::Gemini);
    assert_eq!(cfg.model, "gemini-3-flash-preview");
    assert_eq!(cfg.api_key, "g-secret");
    assert_eq!(cfg.gemini_base_url, DEFAULT_GEMINI_BASE_URL);
    assert_eq!(cfg.openai_mode, OpenAiApiMode::Responses);
    assert_eq!(cfg.timeouts, LlmTimeouts::default());

    clear_llm_env();
}

#[test]
fn from_env_key_var_indirection() {
    let _guard = lock_clean_env();
    set("LLM_PROVIDER", "anthropic");
    set("LLM_API_KEY_ENV", "TEST_KEY");
    set("TEST_KEY", "secret");

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::Anthropic);
    assert_eq!(cfg.model, "claude-sonnet-4-5-20250929");
    assert_eq!(cfg.api_key, "secret");

    clear_llm_env();
}

#[test]
fn from_env_parses_openai_overrides() {
    let _guard = lock_clean_env();
    set("LLM_PROVIDER", "openai");
    set("OPENAI_API_KEY", "sk-test");
    set("LLM_MODEL", "gpt-4.1");
    set("LLM_OPENAI_MODE", "chat_completions");
    set("LLM_OPENAI_BASE_URL", "https://example.test/v1/");
    set("LLM_REQUEST_TIMEOUT_SECS", "42");
    set("LLM_CONNECT_TIMEOUT_SECS", "7");

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::OpenAi);
    assert_eq!(cfg.model, "gpt-4.1");
    assert_eq!(cfg.openai_mode, OpenAiApiMode::ChatCompletions);
    assert_eq!(cfg.openai_base_url, "https://example.test/v1");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 7 });

    clear_llm_env();
}

#[test]
fn from_env_missing_key_errors() {
    let _guard = lock_clean_env();

    let err = LlmConfig::from_env().unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "GEMINI_API_KEY"));
}

#[test]
fn from_env_blank_key_counts_as_missing() {
    let _guard = lock_clean_env();
    set("GEMINI_API_KEY", "   ");

    assert!(matches!(LlmConfig::from_env(), Err(LlmError::MissingApiKey { .. })));

    clear_llm_env();
}

#[test]
fn from_env_unknown_provider_errors() {
    let _guard = lock_clean_env();
    set("LLM_PROVIDER", "bad");
    set("GEMINI_API_KEY", "secret");

    let err = LlmConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("unknown LLM_PROVIDER"));

    clear_llm_env();
}

#[test]
fn from_env_unknown_openai_mode_errors() {
    let _guard = lock_clean_env();
    set("GEMINI_API_KEY", "secret");
    set("LLM_OPENAI_MODE", "bad_mode");

    let err = LlmConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("unsupported openai_api mode"));

    clear_llm_env();
}

#[test]
fn bad_timeout_falls_back_to_default() {
    let _guard = lock_clean_env();
    set("GEMINI_API_KEY", "secret");
    set("LLM_REQUEST_TIMEOUT_SECS", "soon");

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_LLM_REQUEST_TIMEOUT_SECS);

    clear_llm_env();
}
