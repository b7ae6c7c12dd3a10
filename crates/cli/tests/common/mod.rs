//! CLI command execution helpers and a temporary deployment fixture

#![allow(dead_code)]

use anyhow::{Context, Result};
use filetime::{set_file_mtime, FileTime};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

/// `geowatch` invocation builder with timing
pub struct GeowatchCommand {
    binary_path: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl GeowatchCommand {
    pub fn new(config: &Path) -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_geowatch")),
            args: vec!["--config".to_string(), config.display().to_string()],
            env: HashMap::new(),
        }
    }

    /// Command without a `--config` flag
    pub fn bare() -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_geowatch")),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();
        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .envs(&self.env)
            .env_remove("GEOWATCH_CONFIG")
            .env("NO_COLOR", "1")
            .output()
            .context("Failed to execute geowatch")?;

        Ok(CommandResult {
            stdout: strip_ansi(&String::from_utf8_lossy(&output.stdout)),
            stderr: strip_ansi(&String::from_utf8_lossy(&output.stderr)),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }
        Ok(result)
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// Drop ANSI color sequences so assertions see plain text
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            // CSI: ESC [ params final-byte
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// geowatch!(site.config, "check").assert_success()?;
/// geowatch!(site.config, "complete", "--watch", "icon", "--batch", "2025010100").assert_success()?;
/// ```
#[macro_export]
macro_rules! geowatch {
    ($config:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::GeowatchCommand::new(&$config);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}

/// Temporary deployment: watched data, spool, state and sentinel under one root
pub struct Deployment {
    pub temp: TempDir,
    pub data: PathBuf,
    pub spool: PathBuf,
    pub sentinel: PathBuf,
    pub config: PathBuf,
}

impl Deployment {
    /// Deployment with one mosaic watch named `icon` on the data directory
    pub fn mosaic() -> Self {
        Self::with_watches(
            r#"
[[watch]]
name = "icon"
family = "mosaic"
dirs = ["{data}"]
"#,
        )
    }

    /// Deployment with the given `[[watch]]` tables; `{data}` expands to the data directory
    pub fn with_watches(watches: &str) -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let root = temp.path();
        let data = root.join("data");
        let spool = root.join("spool");
        let sentinel = root.join("status").join("health_check_failure");
        fs::create_dir_all(&data).expect("create data dir");

        let config = root.join("config.toml");
        let text = format!(
            r#"
sentinel_path = "{sentinel}"
state_dir = "{state}"
interval_secs = 1

[dispatcher]
kind = "spool"
dir = "{spool}"
{watches}"#,
            sentinel = sentinel.display(),
            state = root.join("state").display(),
            spool = spool.display(),
            watches = watches.replace("{data}", &data.display().to_string()),
        );
        fs::write(&config, text).expect("write config");

        Self {
            temp,
            data,
            spool,
            sentinel,
            config,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.data.join(name)
    }

    pub fn touch(&self, name: &str) -> PathBuf {
        self.write(name, "")
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, body).expect("write fixture");
        path
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Write a claim marker backdated by `age_secs`
    pub fn claim(&self, name: &str, retry: u32, age_secs: u64) -> PathBuf {
        let path = self.write(name, &format!("Checked at 2025-01-01T00:00:00+00:00\nRetry: {}\n", retry));
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        set_file_mtime(&path, FileTime::from_system_time(mtime)).expect("set mtime");
        path
    }

    /// Task requests written to the spool, oldest first
    pub fn spooled(&self) -> Vec<serde_json::Value> {
        let Ok(entries) = fs::read_dir(&self.spool) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .map(|e| e.expect("dir entry").path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        paths
            .iter()
            .map(|p| serde_json::from_str(&fs::read_to_string(p).expect("read spool file")).expect("spool json"))
            .collect()
    }
}
