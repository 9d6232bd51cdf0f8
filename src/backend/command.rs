use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{Backend, BackendError};
use crate::config::BackendConfig;
use crate::error::CourierError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs an external extractor and returns its stdout as the payload
///
/// The request URL is appended after the configured arguments, so the
/// invocation is `<command> <args...> <url>`.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    command: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// `None` waits for the process indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolve the backend executable in PATH
    pub fn ensure_available(&self) -> Result<PathBuf, CourierError> {
        which::which(&self.command)
            .map_err(|_| CourierError::BackendNotFound(self.command.clone()))
    }

    fn run(&self, url: &str) -> Result<Option<String>, BackendError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::Spawn(format!("{}: {}", self.command, e)))?;

        // Drain both pipes while waiting, otherwise a large payload fills the
        // pipe buffer and the child never exits.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child)?;

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        if !status.success() {
            return Err(BackendError::Failed {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        let payload = String::from_utf8_lossy(&stdout).to_string();
        if payload.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(payload))
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, BackendError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|e| BackendError::Io(e.to_string()));
        };

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    log::warn!("{} exceeded {:?}, killing it", self.command, timeout);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BackendError::TimedOut(timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(BackendError::Io(e.to_string())),
            }
        }
    }
}

impl Backend for CommandBackend {
    fn query_metadata(&self, url: &str) -> Result<Option<String>, BackendError> {
        log::debug!("Running {} {:?} {}", self.command, self.args, url);
        self.run(url)
    }

    fn name(&self) -> &str {
        &self.command
    }
}

type Drain = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(handle: Drain) -> Result<Vec<u8>, BackendError> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    match handle.join() {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(BackendError::Io(e.to_string())),
        Err(_) => Err(BackendError::Io("output reader thread panicked".to_string())),
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod command_tests;
