use clap::{Parser, Subcommand};
use imagecache::{cache, config, output, service::ImageService};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Route selection shared by commands that serve requests.
#[derive(clap::Args, Clone)]
struct RouteArgs {
    /// Route from `[routes.<name>]` whose cache path and source apply
    #[arg(long)]
    route: Option<String>,
}

#[derive(Parser)]
#[command(name = "imagecache")]
#[command(about = "On-demand image transformations with a filesystem cache")]
#[command(long_about = "\
On-demand image transformations with a filesystem cache

Request paths name a source image plus the transformations to apply:

  photos/cat-image(300x200-crop-rotate(90)).png
  └─ source photos/cat.png, fit-and-crop to 300x200, rotated, encoded as PNG

Options (separated by '-'):
  300x200  300x  x200     thumbnail box (fit; add 'crop' to fill and crop)
  rotate(90)              clockwise, multiples of 90
  flip(h|v|both)          mirror
  blur(1.5)  grayscale  negative

The result is written under the cache root at the request path, so the
next identical request is served straight from disk.

Run 'imagecache gen-config' to generate a documented imagecache.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve one request path through the cache
    Render {
        path: String,
        #[command(flatten)]
        route: RouteArgs,
    },
    /// Render many request paths in parallel to pre-fill the cache
    Warm {
        #[arg(required = true)]
        paths: Vec<String>,
        #[command(flatten)]
        route: RouteArgs,
    },
    /// Detect a source image's format from its header
    Format {
        path: String,
        #[command(flatten)]
        route: RouteArgs,
    },
    /// List registered filters
    Filters,
    /// List files under the cache root
    CacheList(RouteArgs),
    /// Print a stock imagecache.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Render { path, route } => {
            let service = load_service(&cli.config)?;
            let response = service.render(&path, route.route.as_deref())?;
            output::print_render(&path, &response);
        }
        Command::Warm { paths, route } => {
            let service = load_service(&cli.config)?;
            init_thread_pool(&service.config().processing);
            let outcomes = service.warm(&paths, route.route.as_deref());
            output::print_warm(&outcomes);
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            if failed > 0 {
                return Err(format!("{failed} of {} paths failed", outcomes.len()).into());
            }
        }
        Command::Format { path, route } => {
            let service = load_service(&cli.config)?;
            let format = service.format(&path, route.route.as_deref())?;
            println!("{}", output::format_detected(&path, format));
        }
        Command::Filters => {
            let service = load_service(&cli.config)?;
            output::print_filters(&service.registry().names());
        }
        Command::CacheList(route) => {
            let service = load_service(&cli.config)?;
            let root = service.cache_root(route.route.as_deref())?;
            let entries = cache::list_entries(&root)?;
            output::print_cache_list(&root, &entries);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_service(path: &Path) -> Result<ImageService, Box<dyn std::error::Error>> {
    let config = config::load_config(path)?;
    Ok(ImageService::from_config(config)?)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
