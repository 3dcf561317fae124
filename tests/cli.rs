use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("beauty-advisor").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: beauty-advisor <COMMAND>"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("relay"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_relay_help() {
    let mut cmd = Command::cargo_bin("beauty-advisor").unwrap();
    cmd.arg("relay")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: beauty-advisor relay"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("--api-key <API_KEY>"))
        .stdout(predicate::str::contains("--model <MODEL>"))
        .stdout(predicate::str::contains("--stream"))
        .stdout(predicate::str::contains("--max-message-chars"))
        .stdout(predicate::str::contains("RELAY_MAX_MESSAGE_CHARS"));
}

#[test]
fn test_cli_relay_help_hides_api_key_value() {
    let mut cmd = Command::cargo_bin("beauty-advisor").unwrap();
    cmd.env("OPENAI_API_KEY", "sk-very-secret")
        .arg("relay")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sk-very-secret").not());
}

#[test]
fn test_cli_chat_help() {
    let mut cmd = Command::cargo_bin("beauty-advisor").unwrap();
    cmd.arg("chat")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: beauty-advisor chat"))
        .stdout(predicate::str::contains("--relay-url <RELAY_URL>"))
        .stdout(predicate::str::contains("--catalog <CATALOG>"))
        .stdout(predicate::str::contains("--transcript <TRANSCRIPT>"));
}

#[test]
fn test_cli_no_command() {
    let mut cmd = Command::cargo_bin("beauty-advisor").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage: beauty-advisor <COMMAND>"));
}

#[test]
fn test_chat_with_missing_catalog_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("beauty-advisor").unwrap();
    cmd.arg("chat")
        .arg("--catalog")
        .arg(dir.path().join("nope.json"))
        .arg("--storage")
        .arg(dir.path().join("store.json"))
        .write_stdin("/quit\n")
        .assert()
        .failure();
}

#[test]
fn test_chat_lists_categories_and_quits() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("products.json");
    std::fs::write(
        &catalog,
        r#"{"products":[
            {"name":"Revitalift Serum","brand":"L'Oréal Paris","category":"skincare","image":"a.jpg"},
            {"name":"Voluminous Mascara","brand":"L'Oréal Paris","category":"makeup","image":"b.jpg"}
        ]}"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("beauty-advisor").unwrap();
    cmd.arg("chat")
        .arg("--catalog")
        .arg(&catalog)
        .arg("--storage")
        .arg(dir.path().join("store.json"))
        .write_stdin("/categories\n/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("skincare"))
        .stdout(predicate::str::contains("makeup"));
}
