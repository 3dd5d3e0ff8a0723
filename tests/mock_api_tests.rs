//! Mock API tests for translation backends
//!
//! Each adapter talks to a local wiremock server instead of the real provider.

use polyglot::backend::{
    create_backend, BackendKind, GeminiBackend, GoogleBackend, LibreTranslateBackend,
    OpenAiBackend, TranslationBackend,
};
use polyglot::config::{BackendConfig, Config};
use polyglot::dispatcher::{Dispatcher, TranslationRequest};
use polyglot::language::{resolve, SourceLanguage};
use polyglot::retry::RetryPolicy;
use polyglot::PolyglotError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn english() -> SourceLanguage {
    SourceLanguage::Known(resolve("English").unwrap())
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }],
        "usageMetadata": { "totalTokenCount": 42 }
    })
}

// ============================================================================
// Gemini API Mock Tests
// ============================================================================

mod gemini_tests {
    use super::*;

    const GENERATE: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

    #[tokio::test]
    async fn test_gemini_translates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Hola\n")))
            .expect(1)
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key".to_string()).with_base_url(server.uri());
        let out = backend
            .translate_one("Hello", english(), resolve("Spanish").unwrap())
            .await
            .unwrap();

        assert_eq!(out.text, "Hola");
        assert!(out.detected_source.is_none());
    }

    #[tokio::test]
    async fn test_gemini_auto_detect_reports_language() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gemini_reply("Language: French\nTranslation: Good morning")),
            )
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key".to_string()).with_base_url(server.uri());
        let out = backend
            .translate_one("Bonjour", SourceLanguage::Auto, resolve("English").unwrap())
            .await
            .unwrap();

        assert_eq!(out.text, "Good morning");
        assert_eq!(out.detected_source.as_deref(), Some("French"));
    }

    #[tokio::test]
    async fn test_gemini_quota_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key".to_string()).with_base_url(server.uri());
        let err = backend
            .translate_one("Hello", english(), resolve("es").unwrap())
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert!(err.to_string().contains("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn test_gemini_bad_key_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "API key not valid" }
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("bad".to_string()).with_base_url(server.uri());
        let err = backend
            .translate_one("Hello", english(), resolve("es").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ProviderRejected");
    }

    #[tokio::test]
    async fn test_gemini_empty_candidates_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key".to_string()).with_base_url(server.uri());
        let err = backend
            .translate_one("Hello", english(), resolve("es").unwrap())
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_gemini_token_cap_is_not_a_translation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Hola, esta es la primera mit" }] },
                    "finishReason": "MAX_TOKENS"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key".to_string()).with_base_url(server.uri());
        let err = backend
            .translate_one("Hello, this is the first half", english(), resolve("es").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ProviderRejected");
        assert!(!err.is_transient());
        assert!(err.to_string().contains("truncated"));
    }
}

// ============================================================================
// OpenAI API Mock Tests
// ============================================================================

mod openai_tests {
    use super::*;

    #[tokio::test]
    async fn test_openai_translates_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-3.5-turbo" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": " Hallo Welt " } }],
                "usage": { "total_tokens": 31 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("sk-test".to_string()).with_base_url(server.uri());
        let out = backend
            .translate_one("Hello world", english(), resolve("German").unwrap())
            .await
            .unwrap();

        assert_eq!(out.text, "Hallo Welt");
    }

    #[tokio::test]
    async fn test_openai_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("sk-test".to_string()).with_base_url(server.uri());
        let err = backend
            .translate_one("Hello", english(), resolve("de").unwrap())
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_openai_length_cutoff_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "Hallo, dies ist die erste" },
                    "finish_reason": "length"
                }]
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("sk-test".to_string()).with_base_url(server.uri());
        let err = backend
            .translate_one("Hello, this is the first half", english(), resolve("de").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ProviderRejected");
        assert!(err.to_string().contains("truncated"));
    }

    #[tokio::test]
    async fn test_openai_stop_finish_reason_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "Danke" },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("sk-test".to_string()).with_base_url(server.uri());
        let out = backend
            .translate_one("Thanks", english(), resolve("de").unwrap())
            .await
            .unwrap();

        assert_eq!(out.text, "Danke");
    }
}

// ============================================================================
// LibreTranslate API Mock Tests
// ============================================================================

mod libre_tests {
    use super::*;

    #[tokio::test]
    async fn test_libre_maps_codes_and_detects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_partial_json(json!({
                "q": "Hello",
                "source": "auto",
                "target": "zt",
                "api_key": "libre-key"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "translatedText": "你好",
                "detectedLanguage": { "confidence": 92.0, "language": "en" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = LibreTranslateBackend::new()
            .with_base_url(server.uri())
            .with_api_key("libre-key");
        let out = backend
            .translate_one(
                "Hello",
                SourceLanguage::Auto,
                resolve("Chinese (Traditional)").unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(out.text, "你好");
        assert_eq!(out.detected_source.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_libre_missing_key_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": "Visit https://portal.libretranslate.com to get an API key"
            })))
            .mount(&server)
            .await;

        let backend = LibreTranslateBackend::new().with_base_url(server.uri());
        let err = backend
            .translate_one("Hello", english(), resolve("es").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ProviderRejected");
    }
}

// ============================================================================
// Google Translate Mock Tests
// ============================================================================

mod google_tests {
    use super::*;

    #[tokio::test]
    async fn test_google_joins_segments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("client", "gtx"))
            .and(query_param("sl", "auto"))
            .and(query_param("tl", "zh-CN"))
            .and(query_param("q", "Good morning. See you."))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                [["早上好。", "Good morning.", null, null, 10], ["再见。", "See you.", null, null, 10]],
                null,
                "en"
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let backend = GoogleBackend::new().with_base_url(server.uri());
        let out = backend
            .translate_one(
                "Good morning. See you.",
                SourceLanguage::Auto,
                resolve("zh").unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(out.text, "早上好。再见。");
        assert_eq!(out.detected_source.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_google_garbage_body_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
            .mount(&server)
            .await;

        let backend = GoogleBackend::new().with_base_url(server.uri());
        let err = backend
            .translate_one("Hello", english(), resolve("fr").unwrap())
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }
}

// ============================================================================
// Dispatcher over HTTP Mock Tests
// ============================================================================

mod dispatcher_tests {
    use super::*;

    fn backend(id: &str, kind: BackendKind, priority: u32, uri: String) -> BackendConfig {
        let mut config = BackendConfig::new(id, kind);
        config.priority = priority;
        config.base_url = Some(uri);
        config.api_key = Some("test-key".to_string());
        config.timeout_secs = 5;
        config
    }

    fn config(backends: Vec<BackendConfig>) -> Config {
        Config {
            retry: RetryPolicy::new(1, Duration::from_millis(5)),
            backends,
            ..Config::default()
        }
    }

    async fn google_server(reply: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([[[reply, "x"]], null, "en"])),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_quota_exhaustion_falls_back_to_next_backend() {
        let gemini = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&gemini)
            .await;
        let google = google_server("Hola").await;

        let dispatcher = Dispatcher::from_config(&config(vec![
            backend("gemini", BackendKind::Gemini, 0, gemini.uri()),
            backend("google", BackendKind::Google, 1, google.uri()),
        ]))
        .unwrap();

        let request = TranslationRequest::new("Hello", "Auto", "Spanish").unwrap();
        let result = dispatcher.translate(&request).await.unwrap();

        assert_eq!(result.translated_text, "Hola");
        assert_eq!(result.backend_used, "google");
        assert_eq!(result.detected_source_language.as_deref(), Some("English"));
        assert_eq!(result.attempt_count, 1);
    }

    #[tokio::test]
    async fn test_transient_failure_then_success_counts_attempts() {
        let gemini = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&gemini)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Hola")))
            .mount(&gemini)
            .await;

        let dispatcher = Dispatcher::from_config(&config(vec![backend(
            "gemini",
            BackendKind::Gemini,
            0,
            gemini.uri(),
        )]))
        .unwrap();

        let request = TranslationRequest::new("Hello", "English", "Spanish").unwrap();
        let result = dispatcher.translate(&request).await.unwrap();

        assert_eq!(result.translated_text, "Hola");
        assert_eq!(result.attempt_count, 2);
    }

    #[tokio::test]
    async fn test_every_backend_failing_lists_each_error() {
        let gemini = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&gemini)
            .await;
        let google = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&google)
            .await;

        let dispatcher = Dispatcher::from_config(&config(vec![
            backend("gemini", BackendKind::Gemini, 0, gemini.uri()),
            backend("google", BackendKind::Google, 1, google.uri()),
        ]))
        .unwrap();

        let request = TranslationRequest::new("Hello", "Auto", "Spanish").unwrap();
        let err = dispatcher.translate(&request).await.unwrap_err();

        match err {
            PolyglotError::AllBackendsExhausted(failures) => {
                let ids: Vec<_> = failures.iter().map(|f| f.backend.as_str()).collect();
                assert_eq!(ids, vec!["gemini", "google"]);
                assert_eq!(failures[0].error.kind(), "ProviderRejected");
                assert_eq!(failures[1].error.kind(), "RetriesExhausted");
            }
            other => panic!("expected AllBackendsExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_long_text_is_chunked_across_requests() {
        let libre = MockServer::start().await;
        for (q, reply) in [
            ("The first sentence.", "La primera frase."),
            ("The second one.", "La segunda."),
        ] {
            Mock::given(method("POST"))
                .and(path("/translate"))
                .and(body_partial_json(json!({ "q": q })))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({ "translatedText": reply })),
                )
                .expect(1)
                .mount(&libre)
                .await;
        }

        let mut libre_config = backend("libre", BackendKind::LibreTranslate, 0, libre.uri());
        libre_config.max_text_length = Some(24);
        let dispatcher = Dispatcher::from_config(&config(vec![libre_config])).unwrap();

        let request =
            TranslationRequest::new("The first sentence. The second one.", "English", "Spanish")
                .unwrap();
        let result = dispatcher.translate(&request).await.unwrap();

        assert_eq!(result.translated_text, "La primera frase. La segunda.");
        assert_eq!(result.attempt_count, 2);
    }

    #[tokio::test]
    async fn test_create_backend_uses_config_overrides() {
        let mut config = BackendConfig::new("fast-google", BackendKind::Google);
        config.max_text_length = Some(120);
        let backend = create_backend(&config).unwrap();

        assert_eq!(backend.id(), "fast-google");
        assert_eq!(backend.kind(), BackendKind::Google);
        assert_eq!(backend.max_text_length(), 120);
    }
}
