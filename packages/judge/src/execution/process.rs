//! Local execution with the system compilers and interpreters.
//!
//! No sandbox: memory limits are not enforced and the program runs with the
//! privileges of the server. Meant for development and tests; production
//! deployments point the engine at a remote sandbox instead.

use std::num::NonZeroUsize;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::execution::{ExecutionRequest, ExecutionResult};
use lru::LruCache;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::ExecutionBackend;
use crate::config::ProcessBackendConfig;
use crate::error::ExecutionError;

enum Launch {
    /// Binary produced by the compile step, relative to the work dir.
    Binary(&'static str),
    /// Interpreter invoked with arguments, run inside the work dir.
    Interpreter(&'static str, &'static [&'static str]),
}

struct Toolchain {
    source_file: &'static str,
    compile: (&'static str, &'static [&'static str]),
    launch: Launch,
}

fn toolchain_for(language: &str) -> Option<&'static Toolchain> {
    const C: Toolchain = Toolchain {
        source_file: "main.c",
        compile: ("gcc", &["-O2", "-std=c17", "-o", "main", "main.c", "-lm"]),
        launch: Launch::Binary("main"),
    };
    const CPP: Toolchain = Toolchain {
        source_file: "main.cpp",
        compile: ("g++", &["-O2", "-std=c++17", "-o", "main", "main.cpp"]),
        launch: Launch::Binary("main"),
    };
    const RUST: Toolchain = Toolchain {
        source_file: "main.rs",
        compile: ("rustc", &["-O", "-o", "main", "main.rs"]),
        launch: Launch::Binary("main"),
    };
    const JAVA: Toolchain = Toolchain {
        source_file: "Main.java",
        compile: ("javac", &["Main.java"]),
        launch: Launch::Interpreter("java", &["-cp", ".", "Main"]),
    };
    // Interpreted languages still get a syntax check so parse errors surface
    // before any test case runs.
    const PYTHON: Toolchain = Toolchain {
        source_file: "main.py",
        compile: ("python3", &["-m", "py_compile", "main.py"]),
        launch: Launch::Interpreter("python3", &["main.py"]),
    };
    const JAVASCRIPT: Toolchain = Toolchain {
        source_file: "main.js",
        compile: ("node", &["--check", "main.js"]),
        launch: Launch::Interpreter("node", &["main.js"]),
    };

    match language {
        "c" => Some(&C),
        "cpp" | "c++" => Some(&CPP),
        "rust" => Some(&RUST),
        "java" => Some(&JAVA),
        "python" | "python3" => Some(&PYTHON),
        "javascript" | "js" => Some(&JAVASCRIPT),
        _ => None,
    }
}

enum Artifact {
    Ready {
        dir: TempDir,
        launch: &'static Launch,
    },
    CompileFailed {
        output: String,
    },
}

impl Launch {
    fn command(&self, dir: &Path) -> Command {
        match self {
            Self::Binary(name) => Command::new(dir.join(name)),
            Self::Interpreter(program, args) => {
                let mut cmd = Command::new(program);
                cmd.args(*args);
                cmd
            }
        }
    }

    fn describe(&self, dir: &Path) -> String {
        match self {
            Self::Binary(name) => dir.join(name).display().to_string(),
            Self::Interpreter(program, _) => program.to_string(),
        }
    }
}

/// Cache key of a compiled program.
fn artifact_key(language: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(language.as_bytes());
    hasher.update([0u8]);
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

type ArtifactCell = Arc<OnceCell<Arc<Artifact>>>;

/// Runs programs as local child processes.
///
/// Each distinct (language, code) pair is compiled once; concurrent requests
/// for the same pair wait on the same compilation.
pub struct ProcessBackend {
    config: ProcessBackendConfig,
    artifacts: Mutex<LruCache<String, ArtifactCell>>,
}

impl ProcessBackend {
    pub fn new(config: ProcessBackendConfig) -> Self {
        let capacity = NonZeroUsize::new(config.artifact_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            artifacts: Mutex::new(LruCache::new(capacity)),
        }
    }

    async fn artifact(&self, language: &str, code: &str) -> Result<Arc<Artifact>, ExecutionError> {
        let toolchain = toolchain_for(language)
            .ok_or_else(|| ExecutionError::UnsupportedLanguage(language.to_string()))?;
        let key = artifact_key(language, code);

        let cell = {
            let mut cache = self.artifacts.lock().await;
            match cache.get(&key) {
                Some(cell) => cell.clone(),
                None => {
                    let cell = ArtifactCell::default();
                    cache.put(key.clone(), cell.clone());
                    cell
                }
            }
        };

        cell.get_or_try_init(|| self.compile(&key, toolchain, code))
            .await
            .cloned()
    }

    async fn compile(
        &self,
        key: &str,
        toolchain: &'static Toolchain,
        code: &str,
    ) -> Result<Arc<Artifact>, ExecutionError> {
        let dir = tempfile::Builder::new().prefix("judge-").tempdir()?;
        tokio::fs::write(dir.path().join(toolchain.source_file), code).await?;

        let (program, args) = toolchain.compile;
        let started = Instant::now();
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let limit = Duration::from_millis(self.config.compile_timeout_ms);
        let output = match tokio::time::timeout(limit, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExecutionError::Spawn(format!("{program}: {e}")));
            }
            Err(_) => {
                warn!(artifact = %key, compiler = program, "Compilation timed out");
                return Ok(Arc::new(Artifact::CompileFailed {
                    output: format!("Compilation timed out after {}ms", limit.as_millis()),
                }));
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if !output.status.success() {
            debug!(artifact = %key, compiler = program, elapsed_ms, "Compilation failed");
            let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            return Ok(Arc::new(Artifact::CompileFailed { output: text }));
        }

        info!(artifact = %key, compiler = program, elapsed_ms, "Compiled program");
        Ok(Arc::new(Artifact::Ready {
            dir,
            launch: &toolchain.launch,
        }))
    }

    async fn run(
        &self,
        dir: &Path,
        launch: &Launch,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut child = launch
            .command(dir)
            .current_dir(dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionError::Spawn(format!("{}: {e}", launch.describe(dir))))?;

        let started = Instant::now();
        let limit = self.config.max_output_bytes;

        let stdin = child.stdin.take();
        let input = request.stdin.clone();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                // The program may exit without reading everything.
                let _ = stdin.write_all(input.as_bytes()).await;
            }
        });
        let stdout = child.stdout.take().map(|s| tokio::spawn(read_capped(s, limit)));
        let stderr = child.stderr.take().map(|s| tokio::spawn(read_capped(s, limit)));

        let time_limit = Duration::from_secs(u64::from(request.time_limit_seconds));
        let (status, timed_out) = match tokio::time::timeout(time_limit, child.wait()).await {
            Ok(status) => (Some(status?), false),
            Err(_) => {
                let _ = child.kill().await;
                (None, true)
            }
        };
        let time_ms = started.elapsed().as_millis() as u64;

        writer.abort();
        let stdout = collect(stdout).await;
        let stderr = collect(stderr).await;

        Ok(ExecutionResult {
            stdout,
            stderr,
            exit_code: status.and_then(|s| s.code()),
            timed_out,
            memory_exceeded: false,
            time_ms: Some(time_ms),
        })
    }
}

/// Read `reader` to the end, keeping at most `limit` bytes.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> Vec<u8> {
    let mut kept = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
    kept
}

async fn collect(task: Option<tokio::task::JoinHandle<Vec<u8>>>) -> String {
    match task {
        Some(task) => task
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default(),
        None => String::new(),
    }
}

#[async_trait]
impl ExecutionBackend for ProcessBackend {
    async fn prepare(&self, language: &str, code: &str) -> Result<(), ExecutionError> {
        self.artifact(language, code).await.map(|_| ())
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ExecutionError> {
        let artifact = self.artifact(&request.language, &request.code).await?;
        match artifact.as_ref() {
            Artifact::CompileFailed { output } => Ok(ExecutionResult {
                stderr: output.clone(),
                exit_code: Some(1),
                time_ms: Some(0),
                ..Default::default()
            }),
            Artifact::Ready { dir, launch } => self.run(dir.path(), launch, request).await,
        }
    }
}
