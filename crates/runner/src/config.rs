use std::path::PathBuf;

use crate::error::EngineError;

/// Default engine working directory.
pub const DEFAULT_ENGINE_DIR: &str = "Chloe";
/// Default engine archive, relative to the working directory.
pub const DEFAULT_ENGINE_JAR: &str = "bin/chloe5-0.0.1.jar";
/// Default number of spawn attempts before a run fails.
pub const DEFAULT_MAX_START_ATTEMPTS: u32 = 5;

/// Engine launch configuration.
///
/// Passed explicitly to the command builder and supervisor; nothing in the
/// runner reads process-wide settings on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Java executable. `None` leaves the launcher token empty.
    pub java_path: Option<PathBuf>,
    /// Working directory of the engine process.
    pub engine_dir: PathBuf,
    /// Engine archive, relative to `engine_dir` unless absolute.
    pub engine_jar: PathBuf,
    /// Maximum heap size, e.g. `4g`.
    pub heap_size: Option<String>,
    /// Thread stack size, e.g. `64m`.
    pub stack_size: Option<String>,
    pub max_start_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            java_path: None,
            engine_dir: PathBuf::from(DEFAULT_ENGINE_DIR),
            engine_jar: PathBuf::from(DEFAULT_ENGINE_JAR),
            heap_size: None,
            stack_size: None,
            max_start_attempts: DEFAULT_MAX_START_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                               |
    /// |----------------------------|---------------------------------------|
    /// | `CHLOE_JAVA_PATH`          | `$JAVA_HOME/bin/java`, else unset     |
    /// | `CHLOE_HOME`               | `Chloe`                               |
    /// | `CHLOE_JAR`                | `bin/chloe5-0.0.1.jar`                |
    /// | `CHLOE_HEAP_SIZE`          | unset                                 |
    /// | `CHLOE_STACK_SIZE`         | unset                                 |
    /// | `CHLOE_MAX_START_ATTEMPTS` | `5`                                   |
    ///
    /// Empty values count as unset.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let java_path = var("CHLOE_JAVA_PATH").map(PathBuf::from).or_else(|| {
            var("JAVA_HOME").map(|home| PathBuf::from(home).join("bin").join(java_binary()))
        });

        let max_start_attempts = match var("CHLOE_MAX_START_ATTEMPTS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(EngineError::InvalidConfig {
                        key: "CHLOE_MAX_START_ATTEMPTS".into(),
                        value: raw,
                    })
                }
            },
            None => DEFAULT_MAX_START_ATTEMPTS,
        };

        Ok(Self {
            java_path,
            engine_dir: var("CHLOE_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| DEFAULT_ENGINE_DIR.into()),
            engine_jar: var("CHLOE_JAR")
                .map(PathBuf::from)
                .unwrap_or_else(|| DEFAULT_ENGINE_JAR.into()),
            heap_size: var("CHLOE_HEAP_SIZE"),
            stack_size: var("CHLOE_STACK_SIZE"),
            max_start_attempts,
        })
    }

    /// Launch flags in the order the JVM expects them: heap, stack, `-jar`,
    /// archive.
    pub fn fixed_flags(&self) -> Vec<String> {
        let mut flags = Vec::with_capacity(4);
        if let Some(heap) = &self.heap_size {
            flags.push(format!("-Xmx{heap}"));
        }
        if let Some(stack) = &self.stack_size {
            flags.push(format!("-Xss{stack}"));
        }
        flags.push("-jar".to_string());
        flags.push(self.engine_jar.to_string_lossy().into_owned());
        flags
    }
}

fn java_binary() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}
