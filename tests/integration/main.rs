//! Integration tests for cdktest

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn cdktest(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("cdktest");
        cmd.env("CDKTEST_CONFIG", temp.path().join("config.toml"))
            .arg("--no-local");
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        cdktest(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run CDK apps"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        cdktest(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cdktest"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        cdktest(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        cdktest(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("binary = \"cdk\""));
    }

    #[test]
    fn invalid_config_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[cache]\nenabled = 3\n").unwrap();

        cdktest(&temp)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn missing_binary_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("app")).unwrap();

        cdktest(&temp)
            .args(["synth", "app", "--binary", "cdktest-no-such-cdk"])
            .arg("--basedir")
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("CDK executable not found"));
    }

    #[test]
    fn missing_app_dir_reported() {
        let temp = TempDir::new().unwrap();

        cdktest(&temp)
            .args(["destroy", "missing"])
            .arg("--basedir")
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("App directory not found"));
    }

    #[test]
    fn env_var_requires_equals() {
        let temp = TempDir::new().unwrap();
        cdktest(&temp)
            .args(["synth", "app", "-e", "NOVALUE"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("KEY=VALUE"));
    }

    #[cfg(unix)]
    mod fake_cdk {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};

        /// App directory plus a shell script standing in for the CDK CLI
        struct Project {
            temp: TempDir,
            binary: PathBuf,
        }

        impl Project {
            fn new(script_body: &str) -> Self {
                let temp = TempDir::new().unwrap();
                let app = temp.path().join("app");
                fs::create_dir_all(&app).unwrap();
                fs::write(app.join("app.py"), "app = App()\napp.synth()\n").unwrap();

                // Outside the app directory so recording calls does not change its hash
                let binary = temp.path().join("fake-cdk");
                let script = format!(
                    "#!/bin/sh\necho \"$1 $*\" >> \"{}\"\n{}\n",
                    temp.path().join("calls.log").display(),
                    script_body
                );
                fs::write(&binary, script).unwrap();
                fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();

                Self { temp, binary }
            }

            fn run(&self, args: &[&str]) -> Command {
                let mut cmd = cdktest(&self.temp);
                cmd.args(args)
                    .arg("app")
                    .arg("--basedir")
                    .arg(self.temp.path())
                    .arg("--binary")
                    .arg(&self.binary);
                cmd
            }

            fn calls(&self) -> Vec<String> {
                fs::read_to_string(self.temp.path().join("calls.log"))
                    .unwrap_or_default()
                    .lines()
                    .map(str::to_string)
                    .collect()
            }

            fn app(&self) -> &Path {
                self.temp.path()
            }
        }

        #[test]
        fn synth_prints_cli_output() {
            let project = Project::new("echo \"fake cdk $1\"");

            project
                .run(&["synth"])
                .assert()
                .success()
                .stdout(predicate::str::contains("fake cdk synthesize"));

            let calls = project.calls();
            assert_eq!(calls.len(), 1);
            assert!(calls[0].contains("-a python3 app.py"));
        }

        #[test]
        fn cached_synth_runs_once() {
            let project = Project::new("echo \"fake cdk $1\"");

            for _ in 0..2 {
                project
                    .run(&["synth", "--cache"])
                    .assert()
                    .success()
                    .stdout(predicate::str::contains("fake cdk synthesize"));
            }

            assert_eq!(project.calls().len(), 1);
        }

        #[test]
        fn uncached_synth_runs_every_time() {
            let project = Project::new("echo \"fake cdk $1\"");

            for _ in 0..2 {
                project.run(&["synth"]).assert().success();
            }

            assert_eq!(project.calls().len(), 2);
        }

        #[test]
        fn env_flag_changes_key() {
            let project = Project::new("echo \"fake cdk $1\"");

            project.run(&["deploy", "--cache"]).assert().success();
            project
                .run(&["deploy", "--cache", "-e", "foo=bar"])
                .assert()
                .success();
            project
                .run(&["deploy", "--cache", "-e", "foo=bar"])
                .assert()
                .success();

            assert_eq!(project.calls().len(), 2);
        }

        #[test]
        fn destroy_never_cached() {
            let project = Project::new("echo \"fake cdk $1\"");

            for _ in 0..2 {
                project.run(&["destroy", "--cache"]).assert().success();
            }

            assert_eq!(project.calls().len(), 2);
        }

        #[test]
        fn failing_cli_reports_exit_code() {
            let project = Project::new("echo \"stack failed\" >&2\nexit 3");

            for _ in 0..2 {
                project
                    .run(&["deploy", "--cache"])
                    .assert()
                    .failure()
                    .stderr(predicate::str::contains("exit code 3"))
                    .stderr(predicate::str::contains("stack failed"));
            }

            // Failures are never cached
            assert_eq!(project.calls().len(), 2);
        }

        #[test]
        fn fingerprint_shows_cache_state() {
            let project = Project::new("echo \"fake cdk $1\"");

            project
                .run(&["fingerprint"])
                .assert()
                .success()
                .stdout(predicate::str::contains("synthesize"))
                .stdout(predicate::str::contains("[miss]"));

            project.run(&["synth", "--cache"]).assert().success();

            project
                .run(&["fingerprint"])
                .assert()
                .success()
                .stdout(predicate::str::contains("[hit]"));
        }

        #[test]
        fn cache_list_and_clear() {
            let project = Project::new("echo \"fake cdk $1\"");

            project
                .run(&["cache", "list", "--format", "json"])
                .assert()
                .success()
                .stdout(predicate::str::contains("[]"));

            project.run(&["synth", "--cache"]).assert().success();
            project.run(&["deploy", "--cache"]).assert().success();

            project
                .run(&["cache", "list"])
                .assert()
                .success()
                .stdout(predicate::str::contains("synthesize"))
                .stdout(predicate::str::contains("deploy"))
                .stdout(predicate::str::contains("current"));

            project
                .run(&["cache", "clear", "--yes"])
                .assert()
                .success()
                .stdout(predicate::str::contains("cleared 2"));

            project
                .run(&["cache", "list", "--format", "plain"])
                .assert()
                .success()
                .stdout(predicate::str::is_empty());

            // Cleared entries mean the CLI runs again
            project.run(&["synth", "--cache"]).assert().success();
            assert_eq!(project.calls().len(), 3);
        }

        #[test]
        fn cache_path_under_basedir() {
            let project = Project::new("true");
            let root = project.app().join(".cdktest-cache");

            project
                .run(&["cache", "path"])
                .assert()
                .success()
                .stdout(predicate::str::contains(root.display().to_string()));
        }

        #[test]
        fn local_config_enables_cache() {
            let project = Project::new("echo \"fake cdk $1\"");
            fs::write(
                project.app().join(".cdktest.toml"),
                "[cache]\nenabled = true\n",
            )
            .unwrap();

            for _ in 0..2 {
                cargo_bin_cmd!("cdktest")
                    .current_dir(project.app())
                    .env("CDKTEST_CONFIG", project.app().join("config.toml"))
                    .args(["synth", "app", "--binary"])
                    .arg(&project.binary)
                    .assert()
                    .success();
            }

            assert_eq!(project.calls().len(), 1);
        }
    }
}

mod cache_tests {
    use async_trait::async_trait;
    use cdktest::process::CdkCommand;
    use cdktest::{
        CallOptions, CdkTest, CdkTestError, CdkTestResult, CommandOutput, CommandRunner,
        FixtureOptions,
    };
    use std::collections::BTreeMap;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Stands in for the CDK CLI; echoes the app's main.cfg
    #[derive(Default)]
    struct ConfigEcho {
        calls: Mutex<Vec<String>>,
    }

    impl ConfigEcho {
        fn count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CommandRunner for ConfigEcho {
        async fn run(&self, command: &CdkCommand) -> CdkTestResult<CommandOutput> {
            self.calls.lock().unwrap().push(command.subcommand.clone());
            let cfg = fs::read_to_string(command.cwd.join("main.cfg"))
                .map_err(|e| CdkTestError::io("reading main.cfg", e))?;

            Ok(CommandOutput {
                retcode: 0,
                out: format!("built-{}", cfg.trim()),
                err: String::new(),
            })
        }

        fn runner_name(&self) -> &'static str {
            "Config echo"
        }
    }

    fn project(temp: &TempDir) -> CdkTest<ConfigEcho> {
        let app = temp.path().join("app");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join("main.cfg"), "v1").unwrap();

        let options = FixtureOptions::new("app")
            .basedir(temp.path())
            .enable_cache(true);
        CdkTest::with_runner(options, ConfigEcho::default()).unwrap()
    }

    #[tokio::test]
    async fn content_change_scenario() {
        let temp = TempDir::new().unwrap();
        let cdk = project(&temp);

        let first = cdk.synthesize(CallOptions::cached()).await.unwrap();
        assert_eq!(first.out, "built-v1");
        assert_eq!(cdk.runner().count(), 1);

        let second = cdk.synthesize(CallOptions::cached()).await.unwrap();
        assert_eq!(second.out, "built-v1");
        assert_eq!(cdk.runner().count(), 1);

        fs::write(cdk.appdir().join("main.cfg"), "v2").unwrap();
        let third = cdk.synthesize(CallOptions::cached()).await.unwrap();
        assert_eq!(third.out, "built-v2");
        assert_eq!(cdk.runner().count(), 2);

        // The v1 entry survives the invalidation
        fs::write(cdk.appdir().join("main.cfg"), "v1").unwrap();
        let fourth = cdk.synthesize(CallOptions::cached()).await.unwrap();
        assert_eq!(fourth.out, "built-v1");
        assert_eq!(cdk.runner().count(), 2);
    }

    #[tokio::test]
    async fn random_file_content_invalidates() {
        let temp = TempDir::new().unwrap();
        let cdk = project(&temp);

        for _ in 0..3 {
            cdk.deploy(CallOptions::cached()).await.unwrap();
            fs::write(cdk.appdir().join("bar.txt"), uuid::Uuid::new_v4().to_string()).unwrap();
        }

        assert_eq!(cdk.runner().count(), 3);
    }

    #[tokio::test]
    async fn missing_cache_root_is_created() {
        let temp = TempDir::new().unwrap();
        let cdk = project(&temp);
        assert!(!cdk.cache_dir().exists());

        cdk.synthesize(CallOptions::cached()).await.unwrap();

        assert!(cdk.cache_dir().is_dir());
        assert!(cdk.entry_path("synthesize").is_file());
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let cdk = project(&temp);

        cdk.synthesize(CallOptions::cached()).await.unwrap();
        fs::write(cdk.entry_path("synthesize"), "not json").unwrap();

        let out = cdk.synthesize(CallOptions::cached()).await.unwrap();
        assert_eq!(out.out, "built-v1");
        assert_eq!(cdk.runner().count(), 2);

        // Rewritten by the miss
        cdk.synthesize(CallOptions::cached()).await.unwrap();
        assert_eq!(cdk.runner().count(), 2);
    }

    #[tokio::test]
    async fn cache_dir_shared_between_fixtures() {
        let temp = TempDir::new().unwrap();
        let first = project(&temp);
        first.synthesize(CallOptions::cached()).await.unwrap();

        let options = FixtureOptions::new("app")
            .basedir(temp.path())
            .enable_cache(true);
        let second = CdkTest::with_runner(options, ConfigEcho::default()).unwrap();
        let out = second.synthesize(CallOptions::cached()).await.unwrap();

        assert_eq!(out.out, "built-v1");
        assert_eq!(second.runner().count(), 0);
    }

    #[tokio::test]
    async fn fixture_env_is_a_private_copy() {
        let temp = TempDir::new().unwrap();
        let process_env: BTreeMap<String, String> = std::env::vars().collect();
        let marker = format!("CDKTEST_MARKER_{}", uuid::Uuid::new_v4().simple());
        let mut cdk = project(&temp);

        for (key, value) in &process_env {
            assert_eq!(cdk.env().get(key), Some(value), "{key} not captured");
        }

        cdk.synthesize(CallOptions::cached()).await.unwrap();
        cdk.set_env(&marker, "1");

        // Only the fixture's copy changes, and with it the cache key
        assert!(std::env::var(&marker).is_err());
        cdk.synthesize(CallOptions::cached()).await.unwrap();
        assert_eq!(cdk.runner().count(), 2);

        cdk.remove_env(&marker);
        cdk.synthesize(CallOptions::cached()).await.unwrap();
        assert_eq!(cdk.runner().count(), 2);
    }

    #[tokio::test]
    async fn guard_cleans_up() {
        let temp = TempDir::new().unwrap();
        let cache_dir;
        {
            let cdk = project(&temp).guard();
            cdk.synthesize(CallOptions::cached()).await.unwrap();
            fs::create_dir_all(cdk.appdir().join("cdk.out")).unwrap();
            cache_dir = cdk.cache_dir().to_path_buf();
            assert_eq!(cdk.cached_entries().await.unwrap().len(), 1);
        }

        assert!(!temp.path().join("app/cdk.out").exists());
        assert_eq!(fs::read_dir(&cache_dir).unwrap().count(), 0);
        assert!(temp.path().join("app/main.cfg").is_file());
    }
}
