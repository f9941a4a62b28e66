use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Placeholder replaced with the specification file path.
pub const SPEC_PLACEHOLDER: &str = "{spec}";
/// Placeholder replaced with the expected result file path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";
/// Placeholder replaced with the per-run work directory.
pub const WORKDIR_PLACEHOLDER: &str = "{workdir}";

/// A program and its arguments. Arguments may contain placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// How to run the external engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine invocation. Runs in the directory archcheck was started
    /// from, so relative paths in the command resolve there; the per-run
    /// work directory is passed as `{workdir}`.
    pub command: CommandSpec,
    /// Run once per process before the first invocation, e.g. compiling
    /// the engine harness.
    pub prepare: Option<CommandSpec>,
    pub timeout_secs: u64,
    /// Parent of the per-run work directories. Defaults to
    /// `$TMPDIR/archcheck`.
    pub work_dir: Option<PathBuf>,
    /// Upper bound on simultaneously running engine processes.
    pub max_concurrent: usize,
    /// File name of the specification inside the work directory.
    pub spec_file: String,
    /// File name of the result the engine writes inside the work
    /// directory.
    pub output_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            command: CommandSpec {
                program: "java".to_string(),
                args: vec![
                    "-cp".to_string(),
                    "engine:engine/alloy4.2.jar".to_string(),
                    "AlloyRunner".to_string(),
                    SPEC_PLACEHOLDER.to_string(),
                    OUTPUT_PLACEHOLDER.to_string(),
                ],
            },
            prepare: None,
            timeout_secs: 60,
            work_dir: None,
            max_concurrent: 2,
            spec_file: "spec.als".to_string(),
            output_file: "spec.xml".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn work_root(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("archcheck"))
    }

    /// Check that the spec and result files stay inside the per-run work
    /// directory, so concurrent runs never share a file.
    pub fn validate(&self) -> Result<(), String> {
        for (key, name) in [("spec_file", &self.spec_file), ("output_file", &self.output_file)] {
            if !is_plain_file_name(name) {
                return Err(format!(
                    "{} must be a plain file name inside the work directory, got '{}'",
                    key, name
                ));
            }
        }
        if self.spec_file == self.output_file {
            return Err(format!(
                "spec_file and output_file must differ, both are '{}'",
                self.spec_file
            ));
        }
        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Expand placeholders in every argument.
pub fn substitute(args: &[String], spec: &str, output: &str, workdir: &str) -> Vec<String> {
    args.iter()
        .map(|a| {
            a.replace(SPEC_PLACEHOLDER, spec)
                .replace(OUTPUT_PLACEHOLDER, output)
                .replace(WORKDIR_PLACEHOLDER, workdir)
        })
        .collect()
}
