//! Integration tests for Cachet

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const URL: &str = "https://example.com/zlib-1.3.1.tar.gz";

    fn cachet() -> Command {
        let mut cmd = cargo_bin_cmd!("cachet");
        cmd.env_remove("CACHET_CONFIG").env_remove("CACHET_BASE_DIR");
        cmd
    }

    fn hash(c: char) -> String {
        c.to_string().repeat(128)
    }

    /// Temp workspace with a local cachet.toml that disables the audit log
    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let ws = Self {
                dir: TempDir::new().unwrap(),
            };
            ws.write_config("");
            ws
        }

        fn initialized() -> Self {
            let ws = Self::new();
            fs::create_dir_all(ws.cache()).unwrap();
            fs::create_dir_all(ws.path().join("manifests")).unwrap();
            ws
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn cache(&self) -> PathBuf {
            self.path().join("asset_cache")
        }

        fn write_config(&self, extra: &str) {
            let content = format!("[general]\naudit_log = false\n\n{}", extra);
            fs::write(self.path().join("cachet.toml"), content).unwrap();
        }

        fn manifest(&self, project: &str) {
            fs::write(
                self.path().join("manifests").join(format!("{}.json", project)),
                r#"{"dependencies": ["zlib"]}"#,
            )
            .unwrap();
        }

        /// Use `sh <script>` as the installer
        fn installer(&self, body: &str) {
            let script = self.path().join("fake-vcpkg.sh");
            fs::write(&script, body).unwrap();
            self.write_config(&format!(
                "[installer]\nprogram = \"sh\"\nargs = ['{}']\n",
                script.display()
            ));
        }

        fn cmd(&self) -> Command {
            let mut cmd = cachet();
            cmd.current_dir(self.path());
            cmd
        }
    }

    #[test]
    fn help_displays() {
        cachet()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("vcpkg asset cache"));
    }

    #[test]
    fn version_displays() {
        cachet()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cachet"));
    }

    #[test]
    fn config_path_follows_flag() {
        let ws = Workspace::new();
        let path = ws.path().join("custom.toml");
        cachet()
            .args(["--config", path.to_str().unwrap(), "config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[installer]"))
            .stdout(predicate::str::contains("manifest_algorithm = \"sha1\""));
    }

    #[test]
    fn config_set_rejects_unknown_key() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "set", "container.image", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn init_creates_workspace() {
        let ws = Workspace::new();
        ws.cmd().arg("init").assert().success();

        assert!(ws.cache().is_dir());
        assert!(ws.path().join("binary_cache").is_dir());
        assert!(ws.path().join("manifests").is_dir());
    }

    #[test]
    fn state_without_cache_suggests_init() {
        let ws = Workspace::new();
        ws.cmd()
            .arg("state")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Asset cache directory not found"))
            .stderr(predicate::str::contains("cachet init"));
    }

    #[test]
    fn state_lists_new_projects_and_extra_files() {
        let ws = Workspace::initialized();
        ws.manifest("demo");
        fs::write(ws.cache().join(hash('b')), "orphan").unwrap();
        fs::write(ws.cache().join("notes.txt"), "x").unwrap();

        ws.cmd()
            .args(["state", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("To process\tNew projects\t_demo.json"))
            .stdout(predicate::str::contains(format!("To delete\tAssets\t{}", hash('b'))))
            .stdout(predicate::str::contains("To delete\tOther files\tnotes.txt"));
    }

    #[test]
    fn state_json_reports_resolution() {
        let ws = Workspace::initialized();
        ws.cmd()
            .args(["state", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"resolved\": true"));
    }

    #[test]
    fn state_honours_base_dir_flag() {
        let ws = Workspace::initialized();
        cachet()
            .args(["-C", ws.path().to_str().unwrap(), "state", "--format", "json"])
            .assert()
            .success();
    }

    #[test]
    fn cleanup_refuses_while_projects_are_new() {
        let ws = Workspace::initialized();
        ws.manifest("demo");
        fs::write(ws.cache().join("notes.txt"), "x").unwrap();

        ws.cmd()
            .arg("cleanup")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Refusing to delete"))
            .stderr(predicate::str::contains("1 new project(s)"));

        assert!(ws.cache().join("notes.txt").exists());
    }

    #[test]
    fn cleanup_with_nothing_to_delete() {
        let ws = Workspace::initialized();
        ws.cmd()
            .arg("cleanup")
            .assert()
            .success()
            .stdout(predicate::str::contains("No files to delete"));
    }

    #[test]
    fn cleanup_dry_run_keeps_files() {
        let ws = Workspace::initialized();
        fs::write(ws.cache().join("notes.txt"), "x").unwrap();

        ws.cmd()
            .args(["cleanup", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 file(s) would be deleted"));

        assert!(ws.cache().join("notes.txt").exists());
    }

    #[test]
    fn cleanup_deletes_unneeded_files() {
        let ws = Workspace::initialized();
        fs::write(ws.cache().join(hash('c')), "orphan").unwrap();
        fs::write(ws.cache().join("_gone.json"), "{}").unwrap();

        ws.cmd()
            .arg("cleanup")
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted files (2)"))
            .stdout(predicate::str::contains("_gone.json"));

        assert_eq!(fs::read_dir(ws.cache()).unwrap().count(), 0);
    }

    #[test]
    fn download_without_manifests_fails() {
        let ws = Workspace::initialized();
        ws.cmd()
            .args(["download", "--all"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No manifest files found"));
    }

    #[test]
    fn download_unknown_project_fails() {
        let ws = Workspace::initialized();
        ws.manifest("demo");
        ws.cmd()
            .args(["download", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown project(s): nope"));
    }

    #[cfg(unix)]
    #[test]
    fn download_records_served_assets() {
        let ws = Workspace::initialized();
        ws.manifest("demo");
        let blob = ws.cache().join(hash('a'));
        ws.installer(&format!(
            "echo 'Installing 1/1 zlib:x64-linux...'\n\
             printf 'zlib' > '{blob}'\n\
             echo 'Downloading {URL} using asset cache file://{blob} from authoritative source {URL}'\n",
            blob = blob.display(),
        ));

        ws.cmd().args(["download", "--all"]).assert().success();

        let metadata = fs::read_to_string(ws.cache().join("_demo.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&metadata).unwrap();
        assert_eq!(value["assets"][hash('a')], URL);
        assert!(ws.path().join("_temp/demo/install.log").is_file());
        assert!(ws.path().join("_temp/demo/vcpkg.json").is_file());

        ws.cmd()
            .args(["state", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("Good\tAssets\t{}", hash('a'))))
            .stdout(predicate::str::contains("Good\tProjects\t_demo.json"));
    }

    #[cfg(unix)]
    #[test]
    fn installer_sees_its_scratch_directories() {
        let ws = Workspace::initialized();
        ws.manifest("demo");
        ws.installer(
            "[ -d \"$VCPKG_DOWNLOADS\" ] || exit 7\n\
             [ -d \"$VCPKG_DEFAULT_BINARY_CACHE\" ] || exit 8\n\
             [ -f vcpkg.json ] || exit 9\n\
             case \"$VCPKG_DOWNLOADS\" in /*) ;; *) exit 10 ;; esac\n",
        );

        ws.cmd().args(["download", "--all"]).assert().success();
    }

    #[cfg(unix)]
    #[test]
    fn failed_rerun_keeps_assets_from_cleanup() {
        let ws = Workspace::initialized();
        ws.manifest("demo");
        let served = |c: char| {
            let blob = ws.cache().join(hash(c));
            format!(
                "printf '{c}' > '{blob}'\n\
                 echo 'Downloading {URL} using asset cache file://{blob} from authoritative source {URL}'\n",
                blob = blob.display(),
            )
        };

        ws.installer(&format!("{}{}", served('a'), served('b')));
        ws.cmd().args(["download", "--all"]).assert().success();

        ws.installer(&format!("{}echo 'error: building fmt failed'\nexit 1\n", served('a')));
        ws.cmd().args(["download", "--all"]).assert().failure();

        ws.cmd()
            .args(["cleanup", "--yes"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("1 outdated project(s)"));
        assert!(ws.cache().join(hash('b')).is_file());
    }

    #[cfg(unix)]
    #[test]
    fn download_reports_missing_asset() {
        let ws = Workspace::initialized();
        ws.manifest("demo");
        ws.installer(&format!(
            "echo \"error: Couldn't open file file:///cache/{h} from authoritative source {URL}\"\nexit 1\n",
            h = hash('d'),
        ));

        ws.cmd()
            .args(["download", "demo"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(format!("hash: {}", hash('d'))))
            .stdout(predicate::str::contains(format!("url: {}", URL)))
            .stderr(predicate::str::contains("did not finish successfully"));
    }

    #[cfg(unix)]
    #[test]
    fn env_prints_offline_sources() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["env", "--offline"])
            .assert()
            .success()
            .stdout(predicate::str::contains("export VCPKG_DISABLE_METRICS='1'"))
            .stdout(predicate::str::contains(",,read;x-block-origin'"));
    }

    #[test]
    fn tool_url_reads_release_tag() {
        let ws = Workspace::new();
        let scripts = ws.path().join("vcpkg_root/scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(
            scripts.join("vcpkg-tool-metadata.txt"),
            "VCPKG_TOOL_RELEASE_TAG=2024-11-12\n",
        )
        .unwrap();

        ws.cmd()
            .arg("tool-url")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "releases/download/2024-11-12/vcpkg-glibc",
            ));
    }

    #[test]
    fn tool_url_without_root_fails() {
        let ws = Workspace::new();
        ws.cmd()
            .arg("tool-url")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Installer root not found"));
    }

    #[test]
    fn completions_generate() {
        cachet()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cachet"));
    }
}
