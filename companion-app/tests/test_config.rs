use companion_app::config::{Config, LlmProvider, StoreBackend};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_config_gemini_with_json_store() {
    let config_yaml = r#"
user_id: alice
provider: gemini
model: gemini-2.5-flash
store: !json
  path: ./data/tasks.json
"#;

    let config: Config = serde_yaml::from_str(config_yaml).unwrap();

    assert_eq!(config.user_id, "alice");
    assert_eq!(config.provider, LlmProvider::Gemini);
    assert_eq!(config.provider.api_key_var(), "GEMINI_API_KEY");
    assert_eq!(
        config.store,
        StoreBackend::Json {
            path: PathBuf::from("./data/tasks.json")
        }
    );
    assert_eq!(config.session.history_window, 10);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_openai_compatible_and_rest() {
    let config_yaml = r#"
provider: !openai_compatible
  base_url: http://localhost:8080/v1
model: llama3
store: !rest
  base_url: https://example.supabase.co
session:
  max_suggestions: 3
  strip_markdown: true
"#;

    let config: Config = serde_yaml::from_str(config_yaml).unwrap();

    match &config.provider {
        LlmProvider::OpenaiCompatible {
            base_url,
            require_api_key,
        } => {
            assert_eq!(base_url, "http://localhost:8080/v1");
            assert!(!require_api_key);
        }
        other => panic!("Expected OpenAI-compatible provider, got {:?}", other),
    }
    match &config.store {
        StoreBackend::Rest { table, .. } => assert_eq!(table, "tasks"),
        other => panic!("Expected REST store, got {:?}", other),
    }
    assert_eq!(config.user_id, "local-user");
    assert_eq!(config.session.max_suggestions, 3);
    assert!(config.session.strip_markdown);
    assert_eq!(config.session.model_timeout_secs, 60);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(&dir.path().join("absent.yaml")).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.store, StoreBackend::Memory);
    assert_eq!(config.model, "gemini-2.5-flash");
}

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("companion.yaml");

    let config = Config {
        user_id: "bob".to_string(),
        store: StoreBackend::Sqlite {
            path: PathBuf::from("tasks.db"),
        },
        ..Default::default()
    };
    config.save(&path).unwrap();

    assert!(Config::exists(&path));
    assert_eq!(Config::load(&path).unwrap(), config);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("companion.yaml");
    std::fs::write(&path, "provider: [unclosed").unwrap();

    assert!(Config::load(&path).is_err());
}

#[test]
fn test_env_overrides() {
    let config = Config::default().with_env_overrides(|name| match name {
        "COMPANION_MODEL" => Some("gemini-2.5-pro".to_string()),
        "COMPANION_USER" => Some("   ".to_string()),
        _ => None,
    });

    assert_eq!(config.model, "gemini-2.5-pro");
    assert_eq!(config.user_id, "local-user");
}

#[test]
fn test_config_validation() {
    assert!(Config::default().validate().is_ok());

    let empty_user = Config {
        user_id: " ".to_string(),
        ..Default::default()
    };
    assert!(empty_user.validate().is_err());

    let empty_model = Config {
        model: String::new(),
        ..Default::default()
    };
    assert!(empty_model.validate().is_err());

    let empty_base_url = Config {
        provider: LlmProvider::OpenaiCompatible {
            base_url: String::new(),
            require_api_key: false,
        },
        ..Default::default()
    };
    assert!(empty_base_url.validate().is_err());

    let mut zero_timeout = Config::default();
    zero_timeout.session.store_timeout_secs = 0;
    assert!(zero_timeout.validate().is_err());
}
