use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "license-compat",
    about = "Detect module and dependency licenses and report compatibility conflicts",
    version
)]
pub struct Cli {
    /// Config file [default: ./.license-compat/config.toml,
    /// fallback ~/.config/license-compat/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show every module and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a project and report license incompatibilities
    Check {
        /// Project path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Fetch dependency license metadata from the remote repository
        #[arg(long)]
        online: bool,

        /// Report format
        #[arg(long, default_value = "terminal", value_name = "FORMAT")]
        report: ReportFormat,

        /// Also write the JSON report to this file
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Re-run the check whenever modules, build files or license files change
    Watch {
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(long)]
        online: bool,
    },

    /// Detect the license of a single license file
    Detect {
        file: PathBuf,
    },

    /// Resolve a license name or SPDX id
    Identify {
        name: String,
    },

    /// Write a LICENSE file for a project
    Generate {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// SPDX id of the license to write [default: best license compatible with the root module]
        #[arg(long, value_name = "SPDX")]
        license: Option<String>,

        /// Output file [default: <PATH>/LICENSE]
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_defaults() {
        let cli = Cli::try_parse_from(["license-compat", "check"]).unwrap();
        match cli.command {
            Command::Check { path, online, report, export } => {
                assert_eq!(path, PathBuf::from("."));
                assert!(!online);
                assert_eq!(report, ReportFormat::Terminal);
                assert!(export.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "license-compat",
            "check",
            "proj",
            "--report",
            "json",
            "-v",
            "--config",
            "c.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["license-compat", "-v", "-q", "check"]).is_err());
    }

    #[test]
    fn test_generate_args() {
        let cli = Cli::try_parse_from([
            "license-compat",
            "generate",
            "--license",
            "MIT",
            "--force",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Generate { license: Some(ref l), force: true, output: None, .. } if l == "MIT"
        ));
    }
}
