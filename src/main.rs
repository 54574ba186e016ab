use clap::{Parser, Subcommand};
use retouch::batch::{self, BatchOptions};
use retouch::cache::{self, CacheManifest, CacheStatus};
use retouch::config::{self, EditorConfig};
use retouch::filter::{Filter, FilterList, Transformation};
use retouch::imaging::{
    ImageBackend, IntegerSize, OutputFormat, Quality, RustBackend, SaveParams, ScaleMode,
};
use retouch::notify::{ConsoleToastHost, InlineScheduler, ReviewHandler};
use retouch::output;
use retouch::save::{self, SaveResult};
use retouch::session::EditSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filters given on the command line.
#[derive(clap::Args, Clone)]
struct FilterArgs {
    /// Preset file with a `filters` array (TOML, or JSON for .json); runs first
    #[arg(long, value_name = "FILE")]
    preset: Option<PathBuf>,

    /// Filter to apply, in order: `kind` or `kind:value[,flag]`
    #[arg(short = 'f', long = "filter", value_name = "FILTER")]
    filters: Vec<Filter>,
}

impl FilterArgs {
    fn filter_list(&self) -> Result<FilterList, Box<dyn std::error::Error>> {
        let base = match &self.preset {
            Some(path) => FilterList::load_preset(path)?,
            None => FilterList::new(),
        };
        Ok(self.filters.iter().fold(base, |list, f| list.added(*f)))
    }
}

/// Shared flags for commands that render and save.
#[derive(clap::Args, Clone)]
struct RenderArgs {
    /// Fit the image inside WxH before filtering (never upscales)
    #[arg(long, value_name = "WxH")]
    size: Option<IntegerSize>,

    /// Resampling kernel used when fitting (see `scale-modes`)
    #[arg(long, value_name = "NAME")]
    scale_mode: Option<ScaleMode>,

    /// JPEG quality, 1-100
    #[arg(long)]
    quality: Option<u32>,

    /// Disable the render cache and render everything again
    #[arg(long)]
    no_cache: bool,
}

impl RenderArgs {
    fn scale_mode(&self, config: &EditorConfig) -> ScaleMode {
        self.scale_mode.unwrap_or(config.preview.scale_mode)
    }

    fn quality(&self, config: &EditorConfig) -> Quality {
        self.quality.map(Quality::new).unwrap_or_else(|| config.quality())
    }
}

fn version_string() -> &'static str {
    if env!("RETOUCH_RELEASE_TAG") == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("RETOUCH_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Apply filter stacks to photos")]
#[command(long_about = "\
Apply filter stacks to photos

A filter stack is an ordered list of filters. Each filter has a kind and a
value; order matters. Stacks come from -f flags, a preset file, or both:

  retouch apply in.jpg out.png -f contrast:1.3 -f bayer-two-dithering:180,true
  retouch apply in.jpg out.png --preset look.toml --size 1200x1200
  retouch batch photos/ out/ --preset look.toml

Preset files hold a `filters` array:

  [[filters]]
  kind = \"contrast\"
  value = 1.3

Run 'retouch filters' for every kind and its default value, and
'retouch gen-config' for a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (defaults to ./config.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one image through a filter stack and save it
    Apply {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Render every supported image under a directory
    Batch {
        source: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        render: RenderArgs,
        /// Output format for every image
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Keep full resolution instead of fitting into preview.max_size
        #[arg(long, conflicts_with = "size")]
        full: bool,
    },
    /// List filter kinds and their default values
    Filters,
    /// List scale modes with their integer codes
    ScaleModes,
    /// Print the cache key of a filter stack
    CacheKey {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Apply {
            input,
            output,
            filters,
            render,
        } => {
            let config = load_config(cli.config.as_deref())?;
            apply(&config, &input, &output, &filters.filter_list()?, &render)?;
        }
        Command::Batch {
            source,
            output,
            filters,
            render,
            format,
            full,
        } => {
            let config = load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);
            let options = BatchOptions {
                filters: filters.filter_list()?,
                bound: if full {
                    None
                } else {
                    Some(render.size.unwrap_or_else(|| config.preview_bound()))
                },
                scale_mode: render.scale_mode(&config),
                format: format.unwrap_or(config.save.format),
                quality: render.quality(&config),
                use_cache: !render.no_cache,
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = batch::render_directory(&source, &output, &options, Some(tx))?;
            printer.join().unwrap();

            let toasts = Arc::new(ConsoleToastHost);
            let review = ReviewHandler::new(config.review.every_n_saves);
            for saved in result.saves.iter().filter(|s| s.is_success()) {
                save::parse_save_result(saved.clone(), || {}, &toasts, &review, &InlineScheduler);
            }
            println!("Cache: {}", result.cache_stats);
            if result.failed() > 0 {
                return Err(format!("{} of {} images failed", result.failed(), result.saves.len()).into());
            }
        }
        Command::Filters => output::print_filter_catalog(),
        Command::ScaleModes => output::print_scale_modes(),
        Command::CacheKey { filters } => output::print_filter_list(&filters.filter_list()?),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig, config::ConfigError> {
    match path {
        Some(p) => config::load_config_file(p),
        None => config::load_config(Path::new(".")),
    }
}

/// Render `input` through `filters` into `output`, reusing the cache when
/// the same render already exists, then dispatch the save outcome.
fn apply(
    config: &EditorConfig,
    input: &Path,
    output_path: &Path,
    filters: &FilterList,
    args: &RenderArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = OutputFormat::from_path(output_path).unwrap_or(config.save.format);
    let quality = args.quality(config);
    let mode = args.scale_mode(config);
    let output_dir = match output_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let output_name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or("output path has no file name")?;

    let mut manifest = if args.no_cache {
        CacheManifest::empty()
    } else {
        CacheManifest::load(&output_dir)
    };
    let source_hash = cache::hash_file(input)?;
    let params_hash =
        cache::hash_render_params(&filters.cache_key(), args.size, mode, format, quality);

    let status = manifest.reuse(&source_hash, &params_hash, &output_dir, &output_name)?;
    let result = match status {
        Some(status) => {
            println!("{} ({})", output_path.display(), status);
            SaveResult::Success {
                message: config.save_message().map(str::to_string),
                path: Some(output_path.to_path_buf()),
            }
        }
        None => {
            let backend = RustBackend::new();
            let source = backend.load(input)?;
            let bound = args.size.unwrap_or_else(|| IntegerSize::of(&source));

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_session_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let mut session = EditSession::new(source)
                .with_filters(filters.clone())
                .with_events(tx);
            let rendered = session.render(bound, mode).map(|_| ());
            let image = session.commit();
            printer.join().unwrap();
            rendered?;

            save::save_image(
                &backend,
                &image,
                &SaveParams {
                    output: output_path.to_path_buf(),
                    format,
                    quality,
                },
                config.save_message(),
            )
        }
    };

    if !args.no_cache
        && result.is_success()
        && status.unwrap_or(CacheStatus::Rendered) != CacheStatus::Cached
    {
        manifest.insert(output_name, source_hash, params_hash);
        manifest.save(&output_dir)?;
    }

    let failure = match &result {
        SaveResult::Error(e) => Some(e.clone()),
        SaveResult::Success { .. } => None,
    };
    let written = output_path.display().to_string();
    save::parse_save_result(
        result,
        move || println!("Wrote {}", written),
        &Arc::new(ConsoleToastHost),
        &ReviewHandler::new(config.review.every_n_saves),
        &InlineScheduler,
    );
    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
