//! Top-level command line.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::migrate::Command;

/// Migrate compute resources from a legacy network onto a subnet-mode
/// network, rolling back on failure.
#[derive(Parser, Debug)]
#[command(name = "vpcmig", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Bearer token for the compute API.
    #[arg(long, env = "VPCMIG_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub access_token: Option<String>,

    /// Compute API root, overriding VPCMIG_COMPUTE_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// File the original resource configurations are appended to.
    #[arg(long, default_value = "vpcmig-backup.jsonl", global = true)]
    pub backup_log: PathBuf,

    /// Answer yes to every confirmation prompt.
    #[arg(short, long, global = true)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::Command;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("vpcmig").chain(args.iter().copied()))
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn instance_subcommand_parses() {
        let cli = parse(&[
            "-vv",
            "instance",
            "--project",
            "p",
            "--zone",
            "us-east1-b",
            "--instance",
            "vm-1",
            "--new-instance-name",
            "vm-1-new",
            "--network",
            "vpc",
            "--subnetwork",
            "sub",
        ])
        .unwrap();
        assert_eq!(cli.global.verbose, 2);
        match cli.command {
            Command::Instance(args) => {
                assert_eq!(args.instance, "vm-1");
                assert_eq!(args.new_instance_name.as_deref(), Some("vm-1-new"));
                assert_eq!(args.target.subnetwork.as_deref(), Some("sub"));
                assert!(!args.target.preserve_external_ip);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_are_accepted_after_the_subcommand() {
        let cli = parse(&[
            "target-pool",
            "--project",
            "p",
            "--region",
            "us-east1",
            "--target-pool",
            "tp",
            "--network",
            "vpc",
            "--yes",
            "--backup-log",
            "/tmp/backup.jsonl",
        ])
        .unwrap();
        assert!(cli.global.yes);
        assert_eq!(cli.global.backup_log, PathBuf::from("/tmp/backup.jsonl"));
    }

    #[test]
    fn instance_group_needs_exactly_one_location() {
        let base = [
            "instance-group",
            "--project",
            "p",
            "--instance-group",
            "ig",
            "--network",
            "vpc",
        ];
        assert!(parse(&base).is_err());

        let mut both = base.to_vec();
        both.extend(["--zone", "us-east1-b", "--region", "us-east1"]);
        assert!(parse(&both).is_err());

        let mut zonal = base.to_vec();
        zonal.extend(["--zone", "us-east1-b"]);
        assert!(parse(&zonal).is_ok());
    }

    #[test]
    fn target_pool_requires_a_region() {
        let err = parse(&["target-pool", "--project", "p", "--target-pool", "tp", "--network", "vpc"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn backend_service_region_is_optional() {
        let cli = parse(&[
            "backend-service",
            "--project",
            "p",
            "--backend-service",
            "web",
            "--network",
            "vpc",
            "--preserve-external-ip",
        ])
        .unwrap();
        match cli.command {
            Command::BackendService(args) => {
                assert_eq!(args.region, None);
                assert!(args.target.preserve_external_ip);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
