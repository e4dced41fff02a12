use std::io::{self, Read};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use eyre::{eyre, OptionExt, Result, WrapErr};

type Drain = JoinHandle<io::Result<Vec<u8>>>;

fn drain(mut stream: impl Read + Send + 'static) -> Drain {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

/// Exit status and the captured (non-relayed) output of a finished process.
#[derive(Debug)]
pub struct Finished {
    pub status: ExitStatus,
    pub output: String,
}

/// A running child process of the tagging pipeline.
///
/// Every stream the controller does not relay itself is drained on a dedicated thread, so the
/// child can never stall on a full stderr/stdout pipe. A stage that is dropped without being
/// waited for is killed.
pub struct Stage {
    name: String,
    child: Option<Child>,
    drains: Vec<Drain>,
}

impl Stage {
    /// Spawn `command` with stderr captured. When `capture_stdout` is set, stdout is captured as
    /// well, otherwise it is left piped for the caller to take.
    pub fn spawn(name: &str, command: &mut Command, capture_stdout: bool) -> Result<Self> {
        log::info!("Calling: {command:?}");
        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .wrap_err_with(|| format!("Failed to launch {name}"))?;

        let mut drains = Vec::with_capacity(2);
        if capture_stdout {
            drains.push(drain(child.stdout.take().ok_or_eyre("stdout is not piped")?));
        }
        drains.push(drain(child.stderr.take().ok_or_eyre("stderr is not piped")?));

        Ok(Self {
            name: name.to_owned(),
            child: Some(child),
            drains,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn child(&mut self) -> Result<&mut Child> {
        self.child
            .as_mut()
            .ok_or_else(|| eyre!("{} has already finished", self.name))
    }

    pub fn take_stdout(&mut self) -> Result<ChildStdout> {
        let name = self.name.clone();
        self.child()?
            .stdout
            .take()
            .ok_or_else(|| eyre!("stdout of {name} is not available"))
    }

    pub fn take_stdin(&mut self) -> Result<ChildStdin> {
        let name = self.name.clone();
        self.child()?
            .stdin
            .take()
            .ok_or_else(|| eyre!("stdin of {name} is not available"))
    }

    fn collect(&mut self) -> Result<String> {
        let mut output = Vec::new();
        for handle in self.drains.drain(..) {
            let chunk = handle
                .join()
                .map_err(|_| eyre!("Output reader of {} panicked", self.name))?
                .wrap_err_with(|| format!("Failed to read the output of {}", self.name))?;
            output.extend(chunk);
        }
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    /// Wait for the process to exit and collect its captured output.
    pub fn wait(mut self) -> Result<Finished> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| eyre!("{} has already finished", self.name))?;
        let status = child
            .wait()
            .wrap_err_with(|| format!("Failed to wait for {}", self.name))?;
        let output = self.collect()?;
        Ok(Finished { status, output })
    }

    /// Terminate the process without waiting for it to finish its work.
    pub fn kill(mut self) {
        if let Some(mut child) = self.child.take() {
            log::debug!("Terminating {}", self.name);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
