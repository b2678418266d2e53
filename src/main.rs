use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::debug;
use std::path::PathBuf;

use imagediff::{
    ArchiveSource, Change, CloneProtocol, DockerSource, Git2Transport, ImageComparer, Notifier,
    Options, RegistrySource, Source,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum SourceKind {
    Docker,
    Registry,
    Archive,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(help = "Older image (e.g., myorg/app:1.0)")]
    x: String,

    #[arg(help = "Newer image (e.g., myorg/app:1.1)")]
    y: String,

    #[arg(
        long,
        help = "Path to a Docker config.json file with credentials for private registries. Passed to the docker CLI with --source docker; read directly, with an interactive prompt as fallback, only with --source registry [default: ~/.docker/config.json]"
    )]
    docker_config_path: Option<PathBuf>,

    #[arg(
        long,
        help = "Path to the private SSH key used for private Git repositories [default: ~/.ssh/id_rsa]"
    )]
    ssh_private_key_path: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_enum,
        default_value = "docker",
        help = "Where to read the images from"
    )]
    source: SourceKind,

    #[arg(long, help = "Clone over SSH only, without trying HTTPS first")]
    ssh: bool,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Verbose mode (-v for info, -vv for debug, -vvv for trace). Also switches off the spinner"
    )]
    verbose: u8,
}

fn compare<S: Source>(
    source: S,
    options: &Options,
    notifier: Notifier,
    x: &str,
    y: &str,
) -> Result<Vec<Change>> {
    let comparer = ImageComparer::new(source, Git2Transport, options, notifier);
    comparer
        .compare(x, y)
        .with_context(|| format!("Failed to compare {} and {}", x, y))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let notifier = Notifier::new(cli.verbose);

    let options = Options {
        docker_config_path: cli.docker_config_path,
        ssh_private_key_path: cli.ssh_private_key_path,
        protocol: if cli.ssh {
            CloneProtocol::Ssh
        } else {
            CloneProtocol::Auto
        },
    };
    debug!("Verbosity: {:?}", notifier.verbosity_level());
    debug!("Source: {:?}", cli.source);
    debug!("Options: {:?}", options);

    let changes = match cli.source {
        SourceKind::Docker => {
            let source = DockerSource::new(options.docker_config_path().as_deref())?;
            compare(source, &options, notifier, &cli.x, &cli.y)?
        }
        SourceKind::Registry => {
            let source = RegistrySource::new(options.docker_config_path())?;
            compare(source, &options, notifier, &cli.x, &cli.y)?
        }
        SourceKind::Archive => {
            compare(ArchiveSource::new()?, &options, notifier, &cli.x, &cli.y)?
        }
    };

    for change in changes {
        println!("{} {}", change.short_revision(), change.summary());
    }

    Ok(())
}
