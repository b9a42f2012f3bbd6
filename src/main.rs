mod args;
mod config;
mod dispatch;
mod filter;
mod inventory;
mod output;
mod select;

use anyhow::{anyhow, Result};
use colored::*;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use crate::args::split_args;
use crate::config::{get_aws_config, Settings};
use crate::dispatch::{Dispatcher, Executor, ReplaceStrategy, SystemExecutor};
use crate::filter::filter_instances;
use crate::inventory::{fetch_running_instances, InstanceInfo};
use crate::output::{print_debug, print_error, print_info};
use crate::select::{select, BadInput, Selection};

const USAGE: &str = "Usage: essh <filter> [<filter>...] [ -- <command>]";

const EXIT_OK: u8 = 0;
const EXIT_FAILURE: u8 = 1;

/// Print usage and return the exit code when no argument was given.
fn usage<W: Write>(raw_args: &[String], out: &mut W) -> Option<u8> {
    if !raw_args.is_empty() {
        return None;
    }
    let _ = writeln!(out, "{}", USAGE);
    Some(EXIT_FAILURE)
}

/// Pick the instances to act on and hand them to the dispatcher.
fn resolve<E: Executor, R: BufRead, W: Write>(
    matches: &[InstanceInfo],
    command: &[String],
    dispatcher: &Dispatcher<E>,
    input: &mut R,
    out: &mut W,
) -> Result<u8> {
    match select(matches, command, input, out)? {
        Selection::NoMatch => {
            writeln!(out, "No match found")?;
            Ok(EXIT_OK)
        }
        Selection::Interactive(instance) => {
            print_info(&format!(
                "Connecting to {} ({})",
                instance.name().green().bold(),
                instance.private_ip.as_deref().unwrap_or("N/A")
            ));
            match dispatcher.interactive(instance)? {}
        }
        Selection::Batch(instances) => {
            dispatcher.batch(instances, command, input, out)?;
            Ok(EXIT_OK)
        }
    }
}

/// Report a failed run. A bad selection is printed bare on `out`, anything
/// else goes through the error log.
fn exit_code<W: Write>(result: Result<u8>, out: &mut W) -> u8 {
    match result {
        Ok(code) => code,
        Err(e) if e.downcast_ref::<BadInput>().is_some() => {
            let _ = writeln!(out, "{}", e);
            EXIT_FAILURE
        }
        Err(e) => {
            print_error(&format!("{:#}", e));
            EXIT_FAILURE
        }
    }
}

async fn run(raw_args: &[String]) -> Result<u8> {
    let settings = Settings::from_env()?;
    let verbose = settings.verbose;
    let (filters, command) = split_args(raw_args);

    print_debug(
        &format!("Profile: {}", settings.profile.as_deref().unwrap_or("default")),
        verbose,
    );
    print_debug(
        &format!(
            "Region: {}",
            settings.region.as_deref().unwrap_or("default (from config)")
        ),
        verbose,
    );
    print_debug(&format!("Filters: {:?}", filters), verbose);
    if !command.is_empty() {
        print_debug(&format!("Command: {:?}", command), verbose);
    }

    let aws_config = get_aws_config(settings.profile.clone(), settings.region.clone()).await;
    let ec2_client = aws_sdk_ec2::Client::new(&aws_config);

    let instances = fetch_running_instances(&ec2_client, verbose)
        .await
        .map_err(|e| anyhow!("there was an error listing instances: {:#}", e))?;
    let fetched = instances.len();

    let matches = filter_instances(&filters, instances);
    print_debug(
        &format!("{} of {} instances matched", matches.len(), fetched),
        verbose,
    );

    let strategy = if settings.no_exec {
        ReplaceStrategy::SpawnAndExit
    } else {
        ReplaceStrategy::default()
    };
    let dispatcher = Dispatcher::new(
        settings.dispatch_config(),
        SystemExecutor::new(strategy),
        verbose,
    );

    let mut input = io::stdin().lock();
    let mut out = io::stdout().lock();
    resolve(&matches, &command, &dispatcher, &mut input, &mut out)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(code) = usage(&raw_args, &mut io::stdout()) {
        return ExitCode::from(code);
    }

    let result = run(&raw_args).await;
    ExitCode::from(exit_code(result, &mut io::stdout()))
}
