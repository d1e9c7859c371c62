mod article;
mod collection;
mod core;
mod error;
mod frontmatter;
mod markdown;
mod serve;
mod watch;

use crate::core::Site;
use anyhow::Result;
use argh::FromArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// A static site generator for Markdown articles.
struct Args {
    /// log more detail
    #[argh(switch, short = 'v')]
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Gen(GenArgs),
    Server(ServerArgs),
}

#[derive(FromArgs)]
/// Render the site into a destination directory.
#[argh(subcommand, name = "gen")]
struct GenArgs {
    /// source root: articles/ holds Markdown and assets, templates/ holds
    /// index.html and article.html
    #[argh(positional)]
    src: PathBuf,

    /// destination directory; everything in it is replaced
    #[argh(positional)]
    dst: PathBuf,
}

#[derive(FromArgs)]
/// Preview the site with live reloading.
#[argh(subcommand, name = "server")]
struct ServerArgs {
    /// source root, as for `gen`
    #[argh(positional)]
    src: PathBuf,

    /// port to listen on
    #[argh(option, short = 'p', default = "8080")]
    port: u16,
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_tracing(args.verbose);

    match args.command {
        Command::Gen(args) => {
            let site = Site::new(&args.src, false)?;
            site.generate(&args.dst)
        }
        Command::Server(args) => {
            let site = Site::new(&args.src, true)?;
            serve::serve(site, args.port)
        }
    }
}
