use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use serde_json::Value;
use tempfile::TempDir;

fn docroute_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_docroute"))
}

/// Nothing listens here, so store calls fail fast with connection refused.
const DEAD_STORE: &str = "http://127.0.0.1:1";

fn setup_test_env(vocabulary: Option<&[&str]>, extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let vocab_path = root.join("data").join("vocabulary.json");
    if let Some(terms) = vocabulary {
        fs::create_dir_all(vocab_path.parent().unwrap()).unwrap();
        let snapshot = serde_json::json!({
            "terms": terms,
            "generated_at": "2026-10-16T09:30:00Z",
            "stage": "cleaned_json",
            "fell_back": false
        });
        fs::write(&vocab_path, serde_json::to_string_pretty(&snapshot).unwrap()).unwrap();
    }

    let config_content = format!(
        r#"[store]
url = "{}"
timeout_secs = 5

[ollama]
url = "{}"

[vocabulary]
path = "{}"
{}
"#,
        DEAD_STORE,
        DEAD_STORE,
        vocab_path.display(),
        extra
    );

    let config_path = config_dir.join("docroute.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docroute(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docroute_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("OLLAMA_BASE_URL")
        .env_remove("MODEL")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docroute binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn parse_json(stdout: &str) -> Value {
    serde_json::from_str(stdout).unwrap_or_else(|e| panic!("invalid JSON ({}): {}", e, stdout))
}

#[test]
fn test_classify_documents_with_persisted_vocabulary() {
    let (_tmp, config_path) = setup_test_env(Some(&["tenant", "vpc", "helm"]), "");

    let (stdout, stderr, success) = run_docroute(
        &config_path,
        &[
            "classify",
            "attach a VPC to my tenant",
            "--score",
            "0.9",
            "--score",
            "0.8",
            "--score",
            "0.5",
        ],
    );
    assert!(success, "classify failed: stdout={}, stderr={}", stdout, stderr);

    let json = parse_json(&stdout);
    assert_eq!(json["source_type"], "documents");
    assert!((json["confidence"].as_f64().unwrap() - 0.76).abs() < 1e-6);
    assert_eq!(json["matched_terms"], serde_json::json!(["tenant", "vpc"]));
    assert!(json["scores"]["hybrid"].is_number());
    assert_eq!(json["explanations"].as_array().unwrap().len(), 3);
}

#[test]
fn test_classify_web_with_seed_vocabulary() {
    let (_tmp, config_path) = setup_test_env(None, "");

    let (stdout, stderr, success) =
        run_docroute(&config_path, &["classify", "weather in paris", "--score", "0.1"]);
    assert!(success, "classify failed: stdout={}, stderr={}", stdout, stderr);

    let json = parse_json(&stdout);
    assert_eq!(json["source_type"], "web");
    assert!((json["scores"]["web"].as_f64().unwrap() - 0.97).abs() < 1e-6);
    assert_eq!(json["matched_terms"], serde_json::json!([]));
}

#[test]
fn test_classify_respects_threshold() {
    // one seed term without scores: documents 0.4, web 0.6
    let (_tmp, config_path) = setup_test_env(None, "[classifier]\nconfidence_threshold = 0.7\n");

    let (stdout, _, success) = run_docroute(&config_path, &["classify", "new tenant"]);
    assert!(success);
    let json = parse_json(&stdout);
    assert_eq!(json["source_type"], "hybrid");
}

#[test]
fn test_vocab_show_lists_terms() {
    let (_tmp, config_path) = setup_test_env(Some(&["tenant", "vpc"]), "");

    let (stdout, stderr, success) = run_docroute(&config_path, &["vocab", "show"]);
    assert!(success, "vocab show failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Domain vocabulary (2 terms)"));
    assert!(stdout.contains("  tenant"));
    assert!(stdout.contains("  vpc"));
}

#[test]
fn test_vocab_show_seed_when_missing() {
    let (_tmp, config_path) = setup_test_env(None, "");

    let (stdout, _, success) = run_docroute(&config_path, &["vocab", "show", "--json"]);
    assert!(success);
    let json = parse_json(&stdout);
    assert_eq!(
        json["terms"],
        serde_json::json!(["product-name", "tenant", "infrastructure"])
    );
    assert_eq!(json["fell_back"], true);
}

#[test]
fn test_ask_reports_unreachable_store() {
    let (_tmp, config_path) = setup_test_env(None, "");

    let (stdout, stderr, success) =
        run_docroute(&config_path, &["ask", "what is a tenant?", "--json"]);
    assert!(!success, "ask should fail without a store: stdout={}", stdout);

    let json = parse_json(&stdout);
    assert_eq!(json["status"], "generic_failure");
    assert_eq!(json["response"], "Error connecting to the vector database.");
    assert_eq!(json["sources"]["documents"], serde_json::json!([]));
    assert!(json.get("suggestion").is_some());
    assert!(stderr.contains("query failed"));
}

#[test]
fn test_chunks_reports_unreachable_store() {
    let (_tmp, config_path) = setup_test_env(None, "");

    let (_, stderr, success) = run_docroute(
        &config_path,
        &["chunks", "--limit", "5", "--filename", "guide"],
    );
    assert!(!success);
    assert!(stderr.contains("Failed to list stored chunks"), "stderr={}", stderr);
}

#[test]
fn test_ask_web_flags_conflict() {
    let (_tmp, config_path) = setup_test_env(None, "");

    let (_, stderr, success) = run_docroute(&config_path, &["ask", "q", "--web", "--no-web"]);
    assert!(!success);
    assert!(stderr.contains("cannot be used with"));
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env(None, "[classifier]\nconfidence_threshold = 1.5\n");

    let (_, stderr, success) = run_docroute(&config_path, &["vocab", "show"]);
    assert!(!success);
    assert!(stderr.contains("confidence_threshold"));
}

#[test]
fn test_missing_config_file() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) =
        run_docroute(&tmp.path().join("absent.toml"), &["vocab", "show"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
