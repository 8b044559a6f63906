use super::{
    io_error, CancellationToken, CommandExecutor, CommandOutcome, ExecuteCommand,
    ExecutionResult, ExecutorError,
};
use crate::shared::Logger;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long output is still collected after the shell exits. Background
/// processes that keep the pipes open are not waited for past this.
const READER_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Output,
    Errors,
}

#[derive(Debug, Default)]
struct Captured {
    output: String,
    errors: String,
}

impl Captured {
    fn drain(&mut self, receiver: &Receiver<(Stream, String)>, on_progress: &mut dyn FnMut(&str)) {
        while let Ok((stream, line)) = receiver.try_recv() {
            on_progress(line.trim_end_matches(['\n', '\r']));
            match stream {
                Stream::Output => self.output.push_str(&line),
                Stream::Errors => self.errors.push_str(&line),
            }
        }
    }
}

fn spawn_reader<R>(pipe: R, stream: Stream, sender: Sender<(Stream, String)>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if sender.send((stream, line)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Runs commands through `sh -c`, one child process per command.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    timeout: Duration,
    logger: Logger,
}

impl ShellExecutor {
    pub fn new(logger: Logger) -> Self {
        Self {
            shell: "sh".to_string(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            logger,
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[cfg(unix)]
    fn isolate(command: &mut Command) {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    #[cfg(not(unix))]
    fn isolate(_command: &mut Command) {}

    /// Kills the shell and everything it started.
    fn stop(child: &mut Child, cwd: &Path) -> Result<(), ExecutorError> {
        #[cfg(unix)]
        {
            // The shell leads its own group, so a negative pid reaches the
            // whole group.
            if let Ok(pid) = libc::pid_t::try_from(child.id()) {
                unsafe {
                    libc::kill(-pid, libc::SIGKILL);
                }
            }
        }
        let _ = child.kill();
        child.wait().map_err(|err| io_error(cwd, err))?;
        Ok(())
    }

    fn finish_readers(
        readers: [JoinHandle<()>; 2],
        receiver: &Receiver<(Stream, String)>,
        captured: &mut Captured,
        on_progress: &mut dyn FnMut(&str),
    ) {
        let deadline = Instant::now() + READER_GRACE;
        loop {
            captured.drain(receiver, on_progress);
            if readers.iter().all(JoinHandle::is_finished) {
                for reader in readers {
                    let _ = reader.join();
                }
                break;
            }
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }
        captured.drain(receiver, on_progress);
    }

    fn run(
        &self,
        request: &ExecuteCommand,
        cancel: &CancellationToken,
        captured: &mut Captured,
        on_progress: &mut dyn FnMut(&str),
    ) -> Result<(), ExecutorError> {
        let cwd = match &request.workdir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let timeout = request
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.timeout);

        let mut process = Command::new(&self.shell);
        process
            .arg("-c")
            .arg(&request.command)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Self::isolate(&mut process);
        let mut child = match process.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExecutorError::MissingShell {
                    shell: self.shell.clone(),
                })
            }
            Err(err) => return Err(io_error(&cwd, err)),
        };

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io_error(&cwd, std::io::Error::other("missing stdout pipe")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io_error(&cwd, std::io::Error::other("missing stderr pipe")))?;

        let (sender, receiver) = mpsc::channel();
        let readers = [
            spawn_reader(stdout, Stream::Output, sender.clone()),
            spawn_reader(stderr, Stream::Errors, sender),
        ];

        let start = Instant::now();
        let status = loop {
            captured.drain(&receiver, on_progress);
            if cancel.is_cancelled() {
                Self::stop(&mut child, &cwd)?;
                return Err(ExecutorError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > timeout {
                        Self::stop(&mut child, &cwd)?;
                        return Err(ExecutorError::Timeout {
                            timeout_ms: timeout.as_millis() as u64,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) => return Err(io_error(&cwd, err)),
            }
        };

        Self::finish_readers(readers, &receiver, captured, on_progress);

        if status.success() {
            Ok(())
        } else {
            Err(ExecutorError::NonZeroExit {
                exit_code: status.code().unwrap_or(-1),
            })
        }
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(
        &self,
        command: &ExecuteCommand,
        cancel: &CancellationToken,
        on_progress: &mut dyn FnMut(&str),
    ) -> CommandOutcome {
        self.logger
            .info("executor.start", &format!("{}: {}", command.description, command.command));
        let start = Instant::now();
        let mut captured = Captured::default();
        let result = self.run(command, cancel, &mut captured, on_progress);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let outcome = CommandOutcome {
            result: if result.is_ok() {
                ExecutionResult::Success
            } else {
                ExecutionResult::Error
            },
            error: result.err().map(|err| err.to_string()),
            output: captured.output,
            errors: captured.errors,
            elapsed_ms,
        };
        match &outcome.error {
            None => self.logger.info(
                "executor.success",
                &format!("{} finished in {elapsed_ms}ms", command.description),
            ),
            Some(error) => self.logger.info(
                "executor.failure",
                &format!("{} failed: {error}", command.description),
            ),
        }
        self.logger.verbose("executor.output", &outcome.output);
        outcome
    }
}
