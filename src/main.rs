use bindl::install::{InstallOptions, install};
use bindl::platform::{Arch, Os};
use clap::Parser;
use std::path::PathBuf;

/// bindl - pre-built binary installer
///
/// Resolves the host platform against a release catalog, downloads the
/// matching archive, verifies its SHA-256 checksum, and installs the
/// executable it contains.
///
/// Examples:
///   bindl install                  # install into the default bin directory
///   bindl install --dest ~/bin     # install somewhere else
#[derive(Parser, Debug)]
#[command(author, version = env!("BINDL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download and install the binary for this platform
    Install(InstallArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Destination directory (defaults to the user bin directory; also via BINDL_DEST)
    #[arg(long, short = 'd', env = "BINDL_DEST", value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Override the detected operating system (primarily for testing)
    #[arg(long, value_enum, value_name = "OS")]
    pub os: Option<Os>,

    /// Override the detected CPU architecture (primarily for testing)
    #[arg(long, value_enum, value_name = "ARCH")]
    pub arch: Option<Arch>,

    /// Catalog file to use instead of the embedded release catalog
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = bindl::runtime::RealRuntime;

    let result = match cli.command {
        Commands::Install(args) => {
            install(
                &runtime,
                InstallOptions {
                    dest: args.dest,
                    os: args.os,
                    arch: args.arch,
                    catalog: args.catalog,
                },
            )
            .await
        }
    };

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        std::process::exit(bindl::failure::exit_code(&error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_install_parsing() {
        let cli = Cli::try_parse_from(["bindl", "install"]).unwrap();
        let Commands::Install(args) = cli.command;
        assert_eq!(args.dest, None);
        assert_eq!(args.os, None);
        assert_eq!(args.arch, None);
        assert_eq!(args.catalog, None);
    }

    #[test]
    fn test_cli_install_dest_parsing() {
        let cli = Cli::try_parse_from(["bindl", "install", "--dest", "/tmp/bin"]).unwrap();
        let Commands::Install(args) = cli.command;
        assert_eq!(args.dest, Some(PathBuf::from("/tmp/bin")));
    }

    #[test]
    fn test_cli_platform_overrides() {
        let cli = Cli::try_parse_from([
            "bindl", "install", "--os", "macos", "--arch", "arm64",
        ])
        .unwrap();
        let Commands::Install(args) = cli.command;
        assert_eq!(args.os, Some(Os::Macos));
        assert_eq!(args.arch, Some(Arch::Arm64));
    }

    #[test]
    fn test_cli_platform_override_aliases() {
        let cli = Cli::try_parse_from([
            "bindl", "install", "--os", "darwin", "--arch", "aarch64",
        ])
        .unwrap();
        let Commands::Install(args) = cli.command;
        assert_eq!(args.os, Some(Os::Macos));
        assert_eq!(args.arch, Some(Arch::Arm64));
    }

    #[test]
    fn test_cli_rejects_unknown_arch() {
        let result = Cli::try_parse_from(["bindl", "install", "--arch", "i686"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        let result = Cli::try_parse_from(["bindl"]);
        assert!(result.is_err());
    }
}
