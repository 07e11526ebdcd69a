//! External typesetting toolchain
//!
//! After a merge the master document is typeset with the compiler, the index
//! is generated and the compiler runs again so the index and references
//! settle. Output of every program is relayed line by line to the log.
//! A [`CancelHandle`] kills whatever program is running.

use crate::error::ToolchainError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use texmerge_config::ToolchainConfig;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        CancelHandle {
            flag: Arc::new(flag),
        }
    }

    /// Ask the running program to stop. Later programs are not started.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // the sender lives in self, so the channel cannot close under us
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Toolchain {
    compiler: String,
    compiler_args: Vec<String>,
    indexer: String,
    passes: usize,
}

impl Toolchain {
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Toolchain {
            compiler: config.compiler.clone(),
            compiler_args: config.compiler_args.clone(),
            indexer: config.indexer.clone(),
            passes: config.passes,
        }
    }

    /// Compile `master`, generate its index, then compile again.
    ///
    /// Programs run in the master document's folder.
    pub async fn compile(&self, master: &Path, cancel: &CancelHandle) -> Result<(), ToolchainError> {
        let dir = master
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = master
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = master
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut compiler_args = self.compiler_args.clone();
        compiler_args.push(file_name);

        self.run(&self.compiler, &compiler_args, &dir, cancel).await?;
        self.run(&self.indexer, std::slice::from_ref(&stem), &dir, cancel)
            .await?;
        for _ in 0..self.passes {
            self.run(&self.compiler, &compiler_args, &dir, cancel).await?;
        }
        tracing::info!(master = %master.display(), "compilation finished");
        Ok(())
    }

    /// Run one program to completion, or until `cancel` fires.
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        dir: &Path,
        cancel: &CancelHandle,
    ) -> Result<(), ToolchainError> {
        if cancel.is_cancelled() {
            return Err(ToolchainError::Cancelled {
                program: program.to_string(),
            });
        }
        let resolved = which::which(program).map_err(|source| ToolchainError::NotFound {
            program: program.to_string(),
            source,
        })?;
        tracing::info!(program, ?args, dir = %dir.display(), "running");

        let mut child = Command::new(&resolved)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolchainError::Spawn {
                program: program.to_string(),
                source,
            })?;
        let stdout = tokio::spawn(relay(child.stdout.take(), program.to_string()));
        let stderr = tokio::spawn(relay(child.stderr.take(), program.to_string()));

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };
        let Some(status) = status else {
            if let Err(err) = child.kill().await {
                tracing::warn!(program, error = %err, "could not kill process");
            }
            tracing::warn!(program, "terminated on request");
            return Err(ToolchainError::Cancelled {
                program: program.to_string(),
            });
        };
        let status = status.map_err(|source| ToolchainError::Spawn {
            program: program.to_string(),
            source,
        })?;
        let _ = stdout.await;
        let _ = stderr.await;

        if status.success() {
            Ok(())
        } else {
            Err(ToolchainError::Failed {
                program: program.to_string(),
                status,
            })
        }
    }
}

async fn relay<R>(stream: Option<R>, program: String)
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::info!(program = %program, "{}", line);
    }
}
