//! Integration tests for depot CLI

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn depot() -> Command {
        cargo_bin_cmd!("depot")
    }

    /// A temp workspace with a config file, content root and tracking dir
    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let ws = Self { dir };
            let config = format!(
                r#"
[storage]
root = '{root}'

[tracking]
dir = '{tracking}'
api_base_url = "http://depot.test/api"

[[stores]]
key = "maven:hosted:staging"

[[stores]]
key = "maven:hosted:releases"

[[stores]]
key = "maven:hosted:legacy"
enabled = false

[[stores]]
key = "maven:remote:central"
url = "https://repo.maven.apache.org/maven2"
path_mask_patterns = ["org/"]

[[stores]]
key = "maven:group:public"
members = ["maven:hosted:releases", "maven:hosted:legacy", "maven:remote:central"]
"#,
                root = ws.root().display(),
                tracking = ws.dir.path().join("tracking").display(),
            );
            fs::write(ws.config(), config).unwrap();
            ws
        }

        fn config(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn root(&self) -> PathBuf {
            self.dir.path().join("storage")
        }

        fn content(&self, store_type: &str, name: &str, path: &str) -> PathBuf {
            self.root().join("maven").join(store_type).join(name).join(path)
        }

        fn seed(&self, store_type: &str, name: &str, path: &str, body: &str) {
            let file = self.content(store_type, name, path);
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(file, body).unwrap();
        }

        fn write(&self, name: &str, body: &str) -> PathBuf {
            let file = self.dir.path().join(name);
            fs::write(&file, body).unwrap();
            file
        }

        fn cmd(&self) -> Command {
            let mut cmd = depot();
            cmd.arg("--config").arg(self.config());
            cmd
        }
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn help_displays() {
        depot()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("promote"))
            .stdout(predicate::str::contains("members"));
    }

    #[test]
    fn version_displays() {
        depot()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("depot"));
    }

    #[test]
    fn config_path() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[tracking]"))
            .stdout(predicate::str::contains("maven:group:public"));
    }

    #[test]
    fn config_init_respects_existing_file() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
        assert!(read(&ws.config()).contains("maven:hosted:staging"));
    }

    #[test]
    fn invalid_config_reports_error() {
        let ws = Workspace::new();
        fs::write(ws.config(), "[[stores]]\nkey = \"maven:remote:nourl\"\n").unwrap();
        ws.cmd()
            .args(["members", "maven:group:public"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("needs a url"));
    }

    #[test]
    fn members_skip_disabled_stores() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["members", "maven:group:public", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("maven:hosted:releases"))
            .stdout(predicate::str::contains("maven:remote:central"))
            .stdout(predicate::str::contains("legacy").not());
    }

    #[test]
    fn members_all_as_json() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["members", "maven:group:public", "--all", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("maven:hosted:legacy"));
    }

    #[test]
    fn members_filtered_by_path_mask() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["members", "maven:group:public", "--path", "com/acme/app.jar", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("maven:hosted:releases"))
            .stdout(predicate::str::contains("central").not());
    }

    #[test]
    fn members_of_unknown_group_fails() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["members", "maven:group:missing"])
            .assert()
            .failure();
    }

    #[test]
    fn promote_dry_run_writes_nothing() {
        let ws = Workspace::new();
        ws.seed("hosted", "staging", "org/foo/1.0/foo-1.0.jar", "jar");
        let request = ws.write(
            "request.json",
            r#"{"source":"maven:hosted:staging","target":"maven:hosted:releases","dryRun":true}"#,
        );

        ws.cmd()
            .arg("promote")
            .arg(&request)
            .assert()
            .success()
            .stdout(predicate::str::contains("org/foo/1.0/foo-1.0.jar"));

        assert!(!ws.content("hosted", "releases", "org/foo/1.0/foo-1.0.jar").exists());
    }

    #[test]
    fn promote_then_rollback() {
        let ws = Workspace::new();
        ws.seed("hosted", "staging", "org/foo/1.0/foo-1.0.jar", "jar");
        ws.seed("hosted", "staging", "org/foo/1.0/foo-1.0.pom", "pom");
        let request = ws.write(
            "request.json",
            r#"{"source":"maven:hosted:staging","target":"maven:hosted:releases","purgeSource":true}"#,
        );
        let result = ws.dir.path().join("result.json");

        ws.cmd()
            .arg("promote")
            .arg(&request)
            .arg("--output")
            .arg(&result)
            .assert()
            .success()
            .stdout(predicate::str::contains("completedPaths"));

        let target = ws.content("hosted", "releases", "org/foo/1.0/foo-1.0.pom");
        assert_eq!(read(&target), "pom");
        assert!(!ws.content("hosted", "staging", "org/foo/1.0/foo-1.0.pom").exists());

        ws.cmd().arg("rollback").arg(&result).assert().success();

        assert!(!target.exists());
        assert_eq!(read(&ws.content("hosted", "staging", "org/foo/1.0/foo-1.0.pom")), "pom");
    }

    #[test]
    fn promote_from_unknown_store_fails() {
        let ws = Workspace::new();
        let request = ws.write(
            "request.json",
            r#"{"source":"maven:hosted:nowhere","target":"maven:hosted:releases"}"#,
        );
        ws.cmd().arg("promote").arg(&request).assert().failure();
    }

    #[test]
    fn group_add_updates_config() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["group", "add", "maven:hosted:staging", "maven:group:public"])
            .assert()
            .success();

        let config = read(&ws.config());
        assert!(config.contains("maven:hosted:staging"));
        ws.cmd()
            .args(["members", "maven:group:public", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("maven:hosted:staging"));
    }

    #[test]
    fn group_add_dry_run_leaves_config() {
        let ws = Workspace::new();
        let before = read(&ws.config());
        ws.cmd()
            .args(["group", "add", "maven:hosted:staging", "maven:group:public", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("dry run"));
        assert_eq!(read(&ws.config()), before);
    }

    #[test]
    fn group_add_to_non_group_fails() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["group", "add", "maven:hosted:staging", "maven:hosted:releases"])
            .assert()
            .failure();
    }

    #[test]
    fn merge_combines_member_listings() {
        let ws = Workspace::new();
        ws.seed("hosted", "releases", "org/foo/listing.txt", "1.0\n1.1\n");
        ws.seed("remote", "central", "org/foo/listing.txt", "1.1\n2.0\n");

        ws.cmd()
            .args(["merge", "maven:group:public", "org/foo/listing.txt"])
            .assert()
            .success()
            .stdout(predicate::str::contains("maven:hosted:releases"));

        let merged = read(&ws.content("group", "public", "org/foo/listing.txt"));
        assert_eq!(merged.lines().collect::<Vec<_>>(), vec!["1.0", "1.1", "2.0"]);
        assert!(ws.content("group", "public", "org/foo/listing.txt.md5").exists());
        assert!(ws.content("group", "public", "org/foo/listing.txt.sha").exists());
    }

    #[test]
    fn merge_without_sources() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["merge", "maven:group:public", "org/none/listing.txt"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No member"));
    }

    #[test]
    fn track_record_report_clear() {
        let ws = Workspace::new();
        ws.seed("hosted", "staging", "org/foo/1.0/foo-1.0.jar", "jar");

        ws.cmd()
            .args(["track", "record", "build-42", "maven:hosted:staging", "org/foo/1.0/foo-1.0.jar", "--upload"])
            .assert()
            .success();

        ws.cmd()
            .args(["track", "report", "build-42"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"trackingKey\": \"build-42\""))
            .stdout(predicate::str::contains("http://depot.test/api"))
            .stdout(predicate::str::contains("org/foo/1.0/foo-1.0.jar"));

        ws.cmd()
            .args(["track", "clear", "build-42"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cleared"));

        ws.cmd().args(["track", "report", "build-42"]).assert().failure();
    }

    #[test]
    fn track_record_requires_effect() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["track", "record", "build-1", "maven:hosted:staging", "a.jar"])
            .assert()
            .failure();
    }

    #[test]
    fn track_rejects_bad_id() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["track", "clear", "../escape"])
            .assert()
            .failure();
    }
}
