use anyhow::Result;
use aws_config::meta::region::RegionProviderChain;
use aws_config::Region;
use clap::Parser;

/// Runtime settings. Positional arguments are handled by `args::split_args`,
/// so everything here comes from the environment.
///
/// `from_env` parses only the binary name. The long flags are reachable
/// through `try_parse_from` alone, which the tests use to pin values without
/// touching the environment.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "essh")]
#[command(about = "Find running EC2 instances by tag and ssh into them")]
pub struct Settings {
    /// Privilege elevation command wrapping the remote shell
    #[arg(long, env = "ESSH_ELEVATE_CMD", default_value = "/usr/bin/sudo")]
    pub elevate_cmd: String,

    /// Account the elevation command switches to
    #[arg(long, env = "ESSH_TARGET_USER", default_value = "ec2-user")]
    pub target_user: String,

    /// Remote shell command
    #[arg(long, env = "ESSH_REMOTE_SHELL", default_value = "ssh")]
    pub remote_shell: String,

    /// AWS profile to use (defaults to the SDK's default profile)
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// AWS region to use (defaults to the SDK's region chain)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Spawn and wait instead of replacing the process for interactive sessions
    #[arg(long, env = "ESSH_NO_EXEC")]
    pub no_exec: bool,

    /// Enable verbose output for debugging
    #[arg(long, env = "ESSH_VERBOSE")]
    pub verbose: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self::try_parse_from([env!("CARGO_PKG_NAME")])?)
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            program: self.elevate_cmd.clone(),
            prefix_args: vec![
                "-u".to_string(),
                self.target_user.clone(),
                self.remote_shell.clone(),
            ],
        }
    }
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Fixed prefix every remote invocation starts with: the elevation command,
/// its arguments and the remote shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub program: String,
    pub prefix_args: Vec<String>,
}

impl DispatchConfig {
    /// `<program> <prefix..> <address> <command..>`
    pub fn invocation(&self, address: &str, command: &[String]) -> Invocation {
        let mut args = self.prefix_args.clone();
        args.push(address.to_string());
        args.extend(command.iter().cloned());
        Invocation {
            program: self.program.clone(),
            args,
        }
    }
}

pub async fn get_aws_config(
    profile: Option<String>,
    region: Option<String>,
) -> aws_config::SdkConfig {
    // Explicit region first, then the SDK chain. Credentials always come
    // from the SDK's default provider chain.
    let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

    if let Some(region_str) = region {
        let region_provider =
            RegionProviderChain::first_try(Region::new(region_str)).or_default_provider();
        config_loader = config_loader.region(region_provider);
    }

    if let Some(profile) = profile {
        config_loader = config_loader.profile_name(profile);
    }

    config_loader.load().await
}
