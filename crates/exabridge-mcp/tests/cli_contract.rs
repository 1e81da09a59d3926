use predicates::prelude::*;

#[test]
fn exabridge_version_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("exabridge");
    let out = std::process::Command::new(bin)
        .args(["version"])
        .env_remove("EXABRIDGE_ENV_FILE")
        .output()
        .expect("run exabridge version");

    assert!(out.status.success(), "exabridge version failed");
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse version json");

    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["name"].as_str(), Some("exabridge"));
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[test]
fn exabridge_version_text_output() {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("exabridge"))
        .args(["version", "--output", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("exabridge "));
}

#[test]
fn exabridge_tools_lists_catalogue_with_enabled_flags() {
    let bin = assert_cmd::cargo::cargo_bin!("exabridge");
    let out = std::process::Command::new(bin)
        .args(["tools", "--tools", "web_search_exa,deep_research_exa,bogus_tool"])
        .env("EXABRIDGE_LOG", "warn")
        .env_remove("EXABRIDGE_ENV_FILE")
        .output()
        .expect("run exabridge tools");
    assert!(out.status.success());

    let v: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("parse tools json");
    let tools = v["tools"].as_array().expect("tools array");
    let enabled: Vec<&str> = tools
        .iter()
        .filter(|t| t["enabled"].as_bool() == Some(true))
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(
        enabled,
        vec!["web_search_exa", "deep_research_exa", "exabridge_meta"]
    );
    assert_eq!(v["unknown"], serde_json::json!(["bogus_tool"]));
    // Unknown names are warned about on stderr, never stdout.
    assert!(String::from_utf8_lossy(&out.stderr).contains("bogus_tool"));
}

#[test]
fn exabridge_tools_reads_env_when_flag_absent() {
    let bin = assert_cmd::cargo::cargo_bin!("exabridge");
    let out = std::process::Command::new(bin)
        .args(["tools"])
        .env("EXABRIDGE_TOOLS", "all")
        .env_remove("EXABRIDGE_ENV_FILE")
        .output()
        .expect("run exabridge tools");
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(v["tools"]
        .as_array()
        .unwrap()
        .iter()
        .all(|t| t["enabled"].as_bool() == Some(true)));
}

#[test]
fn exabridge_doctor_contract_json_and_bool_flags() {
    let bin = assert_cmd::cargo::cargo_bin!("exabridge");

    let out = std::process::Command::new(bin)
        .args(["doctor", "--check-stdio=false", "--timeout-ms", "1"])
        .env("EXABRIDGE_EXA_API_KEY", "doctor-secret-value")
        .env_remove("EXA_API_KEY")
        .env_remove("EXABRIDGE_ENV_FILE")
        .env_remove("EXABRIDGE_TOOLS")
        .output()
        .expect("run exabridge doctor");

    assert!(out.status.success(), "exabridge doctor failed");
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(!s.contains("doctor-secret-value"), "doctor leaked the key");
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse doctor json");

    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["kind"].as_str(), Some("doctor"));
    assert_eq!(v["name"].as_str(), Some("exabridge"));
    assert_eq!(v["configured"]["exa_api_key"].as_bool(), Some(true));
    assert_eq!(
        v["features"]["stdio"].as_bool(),
        Some(cfg!(feature = "stdio"))
    );
    assert_eq!(v["research"]["poll_interval_ms"].as_u64(), Some(3000));
    assert!(v["tools"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t == "deep_researcher_start"));

    let checks = v["checks"].as_array().expect("checks array");
    let handshake = checks
        .iter()
        .find(|c| c["name"].as_str() == Some("mcp_stdio_handshake"))
        .expect("mcp_stdio_handshake check");
    assert_eq!(handshake["skipped"].as_bool(), Some(true));
    assert_eq!(handshake["ok"].as_bool(), Some(true));
    assert_eq!(v["ok"].as_bool(), Some(true));
}

#[test]
fn exabridge_doctor_reports_invalid_settings() {
    let bin = assert_cmd::cargo::cargo_bin!("exabridge");
    let out = std::process::Command::new(bin)
        .args(["doctor", "--check-stdio=false"])
        .env("EXABRIDGE_RESEARCH_POLL_INTERVAL_MS", "often")
        .env_remove("EXABRIDGE_ENV_FILE")
        .output()
        .expect("run exabridge doctor");
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["ok"].as_bool(), Some(false));
    let settings = v["checks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "settings_valid")
        .unwrap();
    assert!(settings["message"]
        .as_str()
        .unwrap()
        .contains("EXABRIDGE_RESEARCH_POLL_INTERVAL_MS"));
}

#[test]
fn mcp_stdio_refuses_to_start_on_invalid_settings() {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("exabridge"))
        .args(["mcp-stdio"])
        .env("EXABRIDGE_RESEARCH_DEADLINE_MS", "-5")
        .env_remove("EXABRIDGE_ENV_FILE")
        .assert()
        .failure()
        .stderr(predicate::str::contains("EXABRIDGE_RESEARCH_DEADLINE_MS"));
}

#[test]
fn env_file_supplies_missing_variables() {
    let dir = std::env::temp_dir().join(format!("exabridge-envfile-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("exabridge.env");
    std::fs::write(
        &path,
        "# comment\nEXABRIDGE_EXA_API_KEY=from-file\nEXABRIDGE_TOOLS=answer_exa\n",
    )
    .unwrap();

    let out = std::process::Command::new(assert_cmd::cargo::cargo_bin!("exabridge"))
        .args(["doctor", "--check-stdio=false"])
        .env("EXABRIDGE_ENV_FILE", &path)
        .env_remove("EXABRIDGE_EXA_API_KEY")
        .env_remove("EXA_API_KEY")
        // Process env wins over the file.
        .env("EXABRIDGE_TOOLS", "crawling_exa")
        .output()
        .expect("run exabridge doctor");
    let _ = std::fs::remove_dir_all(&dir);

    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["configured"]["exa_api_key"].as_bool(), Some(true));
    assert_eq!(v["tools"], serde_json::json!(["crawling_exa"]));
}
