//! Integration tests for datamcp

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Binary isolated from the user's config and working directory
    fn datamcp(dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("datamcp");
        cmd.arg("--config")
            .arg(dir.path().join("config.toml"))
            .arg("--dir")
            .arg(dir.path());
        cmd
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        datamcp(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Agent-facing middleware"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        datamcp(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("datamcp"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        datamcp(&dir)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        datamcp(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[cache\n").unwrap();
        datamcp(&dir)
            .args(["cache", "status"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn cache_status_on_empty_dir() {
        let dir = TempDir::new().unwrap();
        datamcp(&dir)
            .args(["cache", "status", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"conversion\""))
            .stdout(predicate::str::contains("\"entries\": 0"));
    }

    #[test]
    fn cache_cleanup_recovers_corrupt_documents() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join(".datamcp-converted-cache.json");
        std::fs::write(&doc, b"\x00\x01garbage").unwrap();

        datamcp(&dir)
            .args(["cache", "cleanup"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Conversion cache"));

        let raw = std::fs::read_to_string(&doc).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
    }

    #[test]
    fn cache_clear_without_document() {
        let dir = TempDir::new().unwrap();
        datamcp(&dir)
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Profile cache cleared"));
    }

    #[test]
    fn convert_passes_csv_through() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.csv"), "id\n1\n").unwrap();
        datamcp(&dir)
            .args(["convert", "a.csv"])
            .assert()
            .success()
            .stdout(predicate::str::contains("a.csv"));
    }

    #[test]
    fn convert_missing_tool_fails_with_hint() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[tool]\nbinary = \"/nonexistent/datamcp-tool\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("book.xlsx"), "binary").unwrap();

        datamcp(&dir)
            .args(["convert", "book.xlsx"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Data tool not found"))
            .stderr(predicate::str::contains("Hint:"));
    }
}
