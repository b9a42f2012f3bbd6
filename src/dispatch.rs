use anyhow::{anyhow, bail, Context, Result};
use std::convert::Infallible;
use std::io::{BufRead, Write};
use std::process::{Command, Stdio};

use crate::config::{DispatchConfig, Invocation};
use crate::inventory::InstanceInfo;
use crate::output::{print_debug, print_success, print_warning};

/// Process execution capability used by the [`Dispatcher`].
#[cfg_attr(test, mockall::automock)]
pub trait Executor {
    /// Hand the terminal over to `invocation`. Returns only on failure.
    fn replace(&self, invocation: &Invocation) -> Result<Infallible>;

    /// Run `invocation` to completion with inherited stdout/stderr and no stdin.
    /// A non-zero exit is an error.
    fn run(&self, invocation: &Invocation) -> Result<()>;
}

/// How [`SystemExecutor::replace`] gives up control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStrategy {
    /// `execve` into the target; nothing after it runs.
    #[cfg(unix)]
    Exec,
    /// Spawn the target, wait, then exit with its status.
    SpawnAndExit,
}

impl Default for ReplaceStrategy {
    fn default() -> Self {
        #[cfg(unix)]
        {
            ReplaceStrategy::Exec
        }
        #[cfg(not(unix))]
        {
            ReplaceStrategy::SpawnAndExit
        }
    }
}

#[derive(Debug, Default)]
pub struct SystemExecutor {
    strategy: ReplaceStrategy,
}

impl SystemExecutor {
    pub fn new(strategy: ReplaceStrategy) -> Self {
        Self { strategy }
    }
}

impl Executor for SystemExecutor {
    fn replace(&self, invocation: &Invocation) -> Result<Infallible> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).env_clear();

        match self.strategy {
            #[cfg(unix)]
            ReplaceStrategy::Exec => {
                use std::os::unix::process::CommandExt;
                let error = cmd.exec();
                Err(anyhow!("Failed to execute {}: {}", invocation.program, error))
            }
            ReplaceStrategy::SpawnAndExit => {
                let status = cmd
                    .status()
                    .with_context(|| format!("Failed to launch {}", invocation.program))?;
                std::process::exit(status.code().unwrap_or(1))
            }
        }
    }

    fn run(&self, invocation: &Invocation) -> Result<()> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("Failed to launch {}", invocation.program))?;

        if !status.success() {
            return Err(anyhow!("{}", status));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Dispatcher<E: Executor> {
    config: DispatchConfig,
    executor: E,
    verbose: bool,
}

impl<E: Executor> Dispatcher<E> {
    pub fn new(config: DispatchConfig, executor: E, verbose: bool) -> Self {
        Self {
            config,
            executor,
            verbose,
        }
    }

    /// Open a remote shell on `instance` in place of this process.
    pub fn interactive(&self, instance: &InstanceInfo) -> Result<Infallible> {
        let invocation = self.config.invocation(instance.address()?, &[]);
        print_debug(&format!("Executing: {}", invocation), self.verbose);
        self.executor.replace(&invocation)
    }

    /// Run `command` on every instance in order, after the operator confirms.
    ///
    /// A failure on one instance is reported on `out` and the batch moves on.
    pub fn batch<R: BufRead, W: Write>(
        &self,
        instances: &[InstanceInfo],
        command: &[String],
        input: &mut R,
        out: &mut W,
    ) -> Result<BatchReport> {
        let names: Vec<&str> = instances.iter().map(InstanceInfo::name).collect();
        writeln!(out, "Matched nodes: {}", names.join(", "))?;
        confirm(input, out)?;

        let mut report = BatchReport::default();
        for instance in instances {
            writeln!(out, "\n=== {}", instance.name())?;
            out.flush()?;

            match self.run_on(instance, command) {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    writeln!(out, "error executing command: {:#}", e)?;
                    report.failed += 1;
                }
            }
        }
        out.flush()?;

        let summary = format!("{} succeeded, {} failed", report.succeeded, report.failed);
        if report.failed == 0 {
            print_success(&summary);
        } else {
            print_warning(&summary);
        }

        Ok(report)
    }

    fn run_on(&self, instance: &InstanceInfo, command: &[String]) -> Result<()> {
        let invocation = self.config.invocation(instance.address()?, command);
        print_debug(&format!("Running: {}", invocation), self.verbose);
        self.executor.run(&invocation)
    }
}

/// Block until the operator enters a line. Any content goes; end of input aborts.
fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<()> {
    write!(
        out,
        "Are you sure you want to run this on these nodes? Ctrl+C to cancel?"
    )?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("No confirmation received, aborting");
    }
    Ok(())
}
