use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

// Test helper types shared by the integration suites. Not every suite uses
// every helper; the warnings are suppressed to keep CI clean.
#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub config_path: PathBuf,
    pub root_dir: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");
        let root_dir = temp_dir.path().join("cli");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_funcup"));

        Self {
            _temp_dir: temp_dir,
            config_path,
            root_dir,
            bin_path,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env("FUNCUP_CONFIG_PATH", &self.config_path);
        cmd.env("FUNCUP_ROOT", &self.root_dir);
        // Point HOME and the XDG dirs into the temp dir to isolate data/config
        cmd.env("HOME", self._temp_dir.path());
        cmd.env("XDG_DATA_HOME", self._temp_dir.path().join("data"));
        cmd.env("XDG_CONFIG_HOME", self._temp_dir.path().join("config"));
        cmd
    }

    /// Seed the install root with a version directory holding a fake tool
    /// that self-reports `version`.
    #[cfg(unix)]
    pub fn seed_version(&self, version: &str) -> PathBuf {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = self.root_dir.join(version);
        fs::create_dir_all(&dir).expect("create version dir");
        let exe = dir.join("func");
        fs::write(&exe, format!("#!/bin/sh\necho {}\n", version)).expect("write fake tool");
        let mut perms = fs::metadata(&exe).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&exe, perms).unwrap();
        dir
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        if self.status.success() {
            panic!(
                "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            );
        }
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }
}
