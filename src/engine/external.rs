//! External comparison engine reached over a JSON pipe.
//!
//! ## Protocol
//!
//! The program is started once per run. It receives a single JSON document
//! on stdin:
//!
//! ```json
//! { "left": ["text", ...], "right": ["text", ...],
//!   "options": { "phraseLength": 34, "wordThreshold": 100, "ignoreCase": true,
//!                "ignorePunctuation": true, "mismatchTolerance": 6, "buildReport": true } }
//! ```
//!
//! and must print a [`ComparisonResult`] on stdout and exit with status 0:
//!
//! ```json
//! { "executionTimeMs": 1234,
//!   "matches": [[[{ "left": { "wordCount": 40 }, "right": { "wordCount": 40 } }]]],
//!   "html": "<div class=\"doc\" id=\"doc0-0L\">…</div>" }
//! ```

use crate::config::CompareOptions;
use crate::engine::{ComparisonEngine, ComparisonResult};
use crate::error::CrossfindError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Serialize)]
struct EngineRequest<'a> {
    left: &'a [String],
    right: &'a [String],
    options: &'a CompareOptions,
}

/// Runs an external matcher speaking the JSON protocol above.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ComparisonEngine for CommandEngine {
    fn name(&self) -> &str {
        "external"
    }

    async fn compare(
        &self,
        left: Vec<String>,
        right: Vec<String>,
        options: &CompareOptions,
    ) -> Result<ComparisonResult, CrossfindError> {
        let start = Instant::now();
        let payload = serde_json::to_vec(&EngineRequest {
            left: &left,
            right: &right,
            options,
        })
        .map_err(|e| CrossfindError::Internal(format!("Failed to encode engine request: {}", e)))?;

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CrossfindError::EngineFailed(format!("cannot start '{}': {}", self.program.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CrossfindError::Internal("engine stdin not captured".into()))?;

        // Feed stdin while collecting stdout so neither pipe can fill up and stall.
        let feed = async move {
            let result = stdin.write_all(&payload).await;
            drop(stdin);
            result
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|e| {
            CrossfindError::EngineFailed(format!("'{}' did not finish: {}", self.program.display(), e))
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(CrossfindError::EngineFailed(format!(
                "'{}' exited with {}: {}",
                self.program.display(),
                output.status,
                stderr
            )));
        }
        if let Err(e) = fed {
            warn!("Engine '{}' did not read all input: {}", self.program.display(), e);
        }
        if !stderr.is_empty() {
            warn!("Engine '{}' reported: {}", self.program.display(), stderr);
        }

        let mut result: ComparisonResult = serde_json::from_slice(&output.stdout).map_err(|e| {
            CrossfindError::EngineFailed(format!("invalid output from '{}': {}", self.program.display(), e))
        })?;
        if !result.matches.fits(left.len(), right.len()) {
            return Err(CrossfindError::EngineFailed(format!(
                "'{}' returned matches outside the {} × {} table",
                self.program.display(),
                left.len(),
                right.len()
            )));
        }
        if result.execution_time_ms == 0 {
            result.execution_time_ms = start.elapsed().as_millis() as u64;
        }
        info!(
            "External engine compared {} × {} texts in {}ms",
            left.len(),
            right.len(),
            result.execution_time_ms
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_engine_failure() {
        let engine = CommandEngine::new("/definitely/not/a/matcher");
        let err = engine
            .compare(vec!["a".into()], vec!["b".into()], &CompareOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CrossfindError::EngineFailed(_)));
    }

    #[cfg(unix)]
    fn script(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("matcher");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn parses_engine_output() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(
            dir.path(),
            r#"cat > /dev/null
echo '{"executionTimeMs": 7, "matches": [[[], [{"left": {"wordCount": 50}}]]], "html": "<p>detail</p>"}'"#,
        );
        let result = CommandEngine::new(exe)
            .compare(vec!["l".into()], vec!["r0".into(), "r1".into()], &CompareOptions::default())
            .await
            .unwrap();
        assert_eq!(result.execution_time_ms, 7);
        assert!(result.matches.get(0, 0).is_empty());
        assert_eq!(result.matches.get(0, 1)[0].left.word_count, 50);
        assert_eq!(result.html, "<p>detail</p>");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn receives_request_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let seen = dir.path().join("request.json");
        let exe = script(
            dir.path(),
            &format!("cat > '{}'\necho '{{\"matches\": []}}'", seen.display()),
        );
        CommandEngine::new(exe)
            .compare(vec!["left text".into()], vec!["right text".into()], &CompareOptions::default())
            .await
            .unwrap();
        let request: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&seen).unwrap()).unwrap();
        assert_eq!(request["left"][0], "left text");
        assert_eq!(request["options"]["phraseLength"], 34);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "cat > /dev/null\necho 'out of memory' >&2\nexit 3");
        let err = CommandEngine::new(exe)
            .compare(vec!["a".into()], vec!["b".into()], &CompareOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("out of memory"), "got: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn oversized_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "cat > /dev/null\necho '{\"matches\": [[[]], [[]]]}'");
        let err = CommandEngine::new(exe)
            .compare(vec!["a".into()], vec!["b".into()], &CompareOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CrossfindError::EngineFailed(_)));
    }
}
