use clap::{Parser, Subcommand};
use lingosite::{config, generate, output, scan};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lingosite")]
#[command(about = "Incremental static site generator for multilingual sites")]
#[command(long_about = "\
Incremental static site generator for multilingual sites

One skeleton template wraps every page. Each skeleton data file declares a
language; every page is rendered once per language it has data for.

Project structure:

  my-site/
  ├── config.toml                  # Optional, see 'lingosite gen-config'
  ├── skeleton.html                # Skeleton template (the argument to build)
  ├── skeleton.json                # Global data, default language → output/
  ├── skeleton.pl.json             # Global data, \"pl\" → output/pl/
  ├── _global/                     # Shared partials
  │   └── _nav.html
  ├── _main/                       # Pages and assets, mirrored into output/
  │   ├── index.html               # Page
  │   ├── index.json               # Data shared by all languages (optional)
  │   ├── index.default.json       # Data for the default language
  │   ├── index.pl.json            # Data for \"pl\"
  │   ├── _footer.html             # Partial (underscore prefix), not a page
  │   └── css/site.css             # Asset, copied as-is
  ├── build.cache                  # Incremental build cache
  └── website.log                  # Run log (appended)

A page without data for a language is skipped for that language with a
warning in the run log. Unchanged pages are not rendered again; pass
--no-cache to rebuild everything.")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render every page in every language, skipping unchanged targets
    Build {
        /// Skeleton template; its directory is the project root
        skeleton: PathBuf,

        /// Ignore the build cache and render everything
        #[arg(long)]
        no_cache: bool,
    },
    /// List languages, pages and the targets a build would produce
    Check {
        /// Skeleton template; its directory is the project root
        skeleton: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build { skeleton, no_cache } => {
            let root = generate::project_root(&skeleton);
            let site_config = config::load_config(&root)?;
            let output_dir = site_config.layout(&root).output_dir;

            println!("==> Building {}", skeleton.display());
            let summary = generate::generate(
                &skeleton,
                site_config,
                no_cache,
                &mut |percent: u8, current: &str| output::print_progress(percent, current),
            )?;
            output::print_summary(&summary, &root);
            println!("==> Build complete: {}", output_dir.display());
        }
        Command::Check { skeleton } => {
            let root = generate::project_root(&skeleton);
            let site_config = config::load_config(&root)?;
            let layout = site_config.layout(&root);

            println!("==> Checking {}", skeleton.display());
            let tree = scan::scan(&skeleton, &layout, &site_config.templates)?;
            output::print_check_output(&tree, &layout, &site_config.templates);
            println!("==> Sources are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr subscriber. `RUST_LOG` is honoured; `-v` raises the floor.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
