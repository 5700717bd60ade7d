//! Integration tests for the `adplan` binary.
//!
//! The binary runs in a scratch config directory. Planning tests use the
//! offline `--catalog` mode with a stand-in `claude` script, so no database
//! or network access is needed.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};

fn adplan(config_home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_adplan"));
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env("RUST_LOG", "warn")
        .env_remove("ADPLAN_GENERATOR")
        .env_remove("ADPLAN_DATABASE_URL")
        .env_remove("ADPLAN_API_KEY");
    cmd
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn catalog(count: i64, rate: f64) -> Value {
    let docs: Vec<Value> = (1..=count)
        .map(|id| {
            json!({
                "publicationId": id,
                "name": format!("Pub {id}"),
                "distributionChannels": {
                    "newsletters": [{
                        "name": "Daily Brief",
                        "subscribers": 5000 * id,
                        "advertisingOpportunities": [{
                            "name": "Sponsored Slot",
                            "hubPricing": [{ "hubId": "metro", "price": rate, "pricingModel": "flat" }]
                        }]
                    }]
                }
            })
        })
        .collect();
    Value::Array(docs)
}

fn plan_response(count: i64, rate: f64) -> Value {
    let publications: Vec<Value> = (1..=count)
        .map(|id| {
            json!({
                "publicationId": id,
                "publicationName": format!("Pub {id}"),
                "inventoryItems": [{
                    "itemPath": "distributionChannels.newsletters[0].advertisingOpportunities[0]",
                    "itemName": "Daily Brief - Sponsored Slot",
                    "quantity": 1,
                    "unitPrice": rate,
                    "pricingModel": "flat",
                    "itemCost": rate
                }]
            })
        })
        .collect();
    let total = count as f64 * rate;
    let plan = json!({
        "selectedPublications": publications,
        "totalCost": total,
        "monthlyCost": total
    });
    json!({ "type": "result", "is_error": false, "result": format!("```json\n{plan}\n```") })
}

/// Write a config file pointing at a fake `claude` that always answers
/// with `response`.
#[cfg(unix)]
fn fake_generator(dir: &Path, response: &Value) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let response_path = dir.join("response.json");
    std::fs::write(&response_path, response.to_string()).unwrap();

    let script = dir.join("fake-claude");
    std::fs::write(
        &script,
        format!("#!/bin/sh\ncat > /dev/null\ncat '{}'\n", response_path.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config_dir = dir.join("adplan");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!(
            "[database]\nurl = \"postgresql://localhost:1/unused\"\n\n\
             [generator]\nkind = \"claude-cli\"\nbinary = \"{}\"\n",
            script.display()
        ),
    )
    .unwrap();
    script
}

fn write_inputs(dir: &Path, budget: f64) -> (PathBuf, PathBuf) {
    let request = dir.join("request.json");
    std::fs::write(
        &request,
        json!({
            "hubId": "metro",
            "objectives": {
                "budget": { "totalBudget": budget, "currency": "USD", "billingCycle": "monthly" },
                "primaryGoal": "awareness",
                "targetAudience": "commuters"
            },
            "timeline": { "startDate": "2026-03-01", "endDate": "2026-03-31" },
            "strategyProfileId": "budget-friendly"
        })
        .to_string(),
    )
    .unwrap();

    let catalog_path = dir.join("catalog.json");
    std::fs::write(&catalog_path, catalog(6, 5000.0).to_string()).unwrap();
    (request, catalog_path)
}

#[cfg(unix)]
#[test]
fn plan_offline_writes_result_and_audit() {
    let tmp = tempfile::TempDir::new().unwrap();
    fake_generator(tmp.path(), &plan_response(4, 5000.0));
    let (request, catalog_path) = write_inputs(tmp.path(), 20_000.0);
    let output_path = tmp.path().join("result.json");
    let audit_path = tmp.path().join("audit.jsonl");

    let output = adplan(tmp.path())
        .args(["plan", "--request"])
        .arg(&request)
        .arg("--catalog")
        .arg(&catalog_path)
        .arg("--audit-log")
        .arg(&audit_path)
        .arg("--output")
        .arg(&output_path)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let result: Value = serde_json::from_str(&std::fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(result["selectedInventory"].as_array().unwrap().len(), 4);
    assert_eq!(result["pricing"]["total"], 20_000.0);
    assert_eq!(result["algorithm"]["id"], "budget-friendly");

    let audit = std::fs::read_to_string(&audit_path).unwrap();
    assert_eq!(audit.lines().count(), 1);
    let doc: Value = serde_json::from_str(audit.lines().next().unwrap()).unwrap();
    assert_eq!(doc["state"], "accepted");
    assert_eq!(doc["callsMade"], 1);
}

#[cfg(unix)]
#[test]
fn plan_with_unknown_profile_fails_with_context() {
    let tmp = tempfile::TempDir::new().unwrap();
    fake_generator(tmp.path(), &plan_response(4, 5000.0));
    let (request, catalog_path) = write_inputs(tmp.path(), 20_000.0);
    let contents = std::fs::read_to_string(&request)
        .unwrap()
        .replace("budget-friendly", "no-such-profile");
    std::fs::write(&request, contents).unwrap();

    let output = adplan(tmp.path())
        .args(["plan", "--request"])
        .arg(&request)
        .arg("--catalog")
        .arg(&catalog_path)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("unknown strategy profile"), "stderr: {err}");
    assert!(err.contains("hub \"metro\""), "stderr: {err}");
}

#[test]
fn http_generator_without_key_names_the_variable() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (request, catalog_path) = write_inputs(tmp.path(), 20_000.0);

    let output = adplan(tmp.path())
        .args(["plan", "--request"])
        .arg(&request)
        .arg("--catalog")
        .arg(&catalog_path)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("ADPLAN_API_KEY"), "stderr: {err}");
}

#[test]
fn profiles_lists_builtins() {
    let tmp = tempfile::TempDir::new().unwrap();
    let output = adplan(tmp.path()).arg("profiles").output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("budget-friendly"));
    assert!(stdout.contains("all-inclusive"));
}

#[test]
fn init_writes_config_once() {
    let tmp = tempfile::TempDir::new().unwrap();

    let first = adplan(tmp.path())
        .args(["init", "--generator", "claude-cli"])
        .output()
        .unwrap();
    assert!(first.status.success(), "stderr: {}", stderr(&first));
    let written = std::fs::read_to_string(tmp.path().join("adplan").join("config.toml")).unwrap();
    assert!(written.contains("kind = \"claude-cli\""));

    let second = adplan(tmp.path()).arg("init").output().unwrap();
    assert!(!second.status.success());
    assert!(stderr(&second).contains("already exists"));
}

#[test]
fn completions_are_generated() {
    let tmp = tempfile::TempDir::new().unwrap();
    let output = adplan(tmp.path()).args(["completions", "bash"]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("adplan"));
}
