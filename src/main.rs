use clap::{Parser, Subcommand, ValueEnum};
use magick_exec::config::{self, MagickConfig};
use magick_exec::exec::ArgumentSet;
use magick_exec::imaging::{self, MagickToolkit, RotationModel};
use magick_exec::{batch, output};
use std::path::PathBuf;

#[derive(Clone, Copy, ValueEnum)]
enum PackageArg {
    Imagemagick,
    Graphicsmagick,
}

impl PackageArg {
    fn config_value(self) -> &'static str {
        match self {
            PackageArg::Imagemagick => "imagemagick",
            PackageArg::Graphicsmagick => "graphicsmagick",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelArg {
    /// Smallest enclosing box of the rotated corners
    Enclosing,
    /// Truncation rule of the reference rasterizer
    Rasterizer,
}

#[derive(Parser)]
#[command(name = "magick-exec")]
#[command(about = "Drive ImageMagick and GraphicsMagick from safely escaped command lines")]
#[command(long_about = "\
Drive ImageMagick and GraphicsMagick from safely escaped command lines

Every command line is built from an argument list with paths escaped for the
host shell, run as a child process with stdout and stderr captured, and
classified by exit status.

Configuration is read from magick.toml (see 'magick-exec gen-config');
flags below override the file. Set RUST_LOG=debug to log every command line.")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "magick.toml", global = true)]
    config: PathBuf,

    /// Directory containing the suite's executables
    #[arg(long, global = true)]
    binaries_dir: Option<PathBuf>,

    /// Graphics suite to drive
    #[arg(long, value_enum, global = true)]
    package: Option<PackageArg>,

    /// Print every command line and its captured output to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify the suite is installed and runnable
    Check {
        /// Directory to check instead of the configured one
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Print format, dimensions and frames of images
    Identify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Convert one image, optionally passing extra tool arguments after `--`
    Convert {
        source: PathBuf,
        destination: PathBuf,
        /// Output format prefix, e.g. jpeg
        #[arg(long)]
        format: Option<String>,
        /// Frame selector appended to the source, e.g. [0]
        #[arg(long)]
        frame: Option<String>,
        #[arg(last = true)]
        tool_args: Vec<String>,
    },
    /// Convert every supported image in a directory tree in parallel
    Batch {
        source_dir: PathBuf,
        dest_dir: PathBuf,
        /// Output format and extension
        #[arg(long)]
        format: String,
        #[arg(last = true)]
        tool_args: Vec<String>,
    },
    /// Predict the bounding box of a rotated image
    RotateBox {
        width: u32,
        height: u32,
        /// Degrees; may be negative or fractional
        #[arg(allow_negative_numbers = true)]
        angle: f64,
        #[arg(long, value_enum, default_value = "enclosing")]
        model: ModelArg,
    },
    /// List locales installed on this host
    Locales,
    /// Print a stock magick.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        Command::RotateBox {
            width,
            height,
            angle,
            model,
        } => {
            let model = match model {
                ModelArg::Enclosing => RotationModel::enclosing(),
                ModelArg::Rasterizer => RotationModel::rasterizer(),
            };
            let bounds = imaging::rotated_bounding_box(width, height, angle, model);
            println!("{}", output::format_rotation(width, height, angle, bounds));
            return Ok(());
        }
        _ => {}
    }

    let config = config::load_config(&cli.config, Some(flag_overrides(&cli)))?;

    match cli.command {
        Command::Check { path } => {
            let dir = path.unwrap_or_else(|| config.path_to_binaries.clone());
            let check = with_toolkit(&config, |toolkit| {
                toolkit.manager().check_path(&dir, None)
            });
            output::print_check(config.binaries.label(), &check);
            if !check.is_ok() {
                return Err(format!("{} installation check failed", config.binaries).into());
            }
        }
        Command::Identify { files, json } => {
            let results = with_toolkit(&config, |toolkit| {
                files
                    .iter()
                    .map(|f| toolkit.identify(f))
                    .collect::<Vec<_>>()
            });
            let mut infos = Vec::new();
            let mut failed = 0;
            for (file, result) in files.iter().zip(results) {
                match result {
                    Ok(info) => infos.push(info),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {}", file.display(), e);
                    }
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&infos)?);
            } else {
                for info in &infos {
                    output::print_image_info(info);
                }
            }
            if failed > 0 {
                return Err(format!("{failed} of {} files could not be identified", files.len()).into());
            }
        }
        Command::Convert {
            source,
            destination,
            format,
            frame,
            tool_args,
        } => {
            let mut args = ArgumentSet::new();
            args.set_source(&source).set_destination(&destination);
            if let Some(format) = format {
                args.set_destination_format(format);
            }
            if let Some(frame) = frame {
                args.set_source_frames(frame);
            }
            for arg in tool_args {
                args.add_quoted(arg);
            }
            with_toolkit(&config, |toolkit| toolkit.convert(&args))?;
            println!("{}", output::format_convert(&source, &destination));
        }
        Command::Batch {
            source_dir,
            dest_dir,
            format,
            tool_args,
        } => {
            init_thread_pool(&config.processing);
            let jobs = batch::plan(&source_dir, &dest_dir, &format)?;
            let outcomes = with_toolkit(&config, |toolkit| {
                batch::run(toolkit, &jobs, &format, &tool_args)
            });
            output::print_batch(&outcomes);
            if outcomes.iter().any(|o| !o.is_ok()) {
                return Err("some images could not be converted".into());
            }
        }
        Command::Locales => {
            let locales = with_toolkit(&config, |toolkit| toolkit.manager().installed_locales())?;
            print!("{}", locales);
        }
        Command::GenConfig | Command::RotateBox { .. } => {}
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// Command-line flags as a TOML overlay for the config file.
fn flag_overrides(cli: &Cli) -> toml::Value {
    let mut table = toml::Table::new();
    if let Some(dir) = &cli.binaries_dir {
        table.insert(
            "path_to_binaries".into(),
            toml::Value::String(dir.to_string_lossy().into_owned()),
        );
    }
    if let Some(package) = cli.package {
        table.insert(
            "binaries".into(),
            toml::Value::String(package.config_value().into()),
        );
    }
    if cli.debug {
        table.insert("debug".into(), toml::Value::Boolean(true));
    }
    toml::Value::Table(table)
}

/// Runs `f` with a toolkit built from `config`.
///
/// With `debug` on, execution events are printed to stderr by a separate
/// thread until the toolkit is dropped.
fn with_toolkit<T>(config: &MagickConfig, f: impl FnOnce(&MagickToolkit) -> T) -> T {
    let mut toolkit = MagickToolkit::from_config(config);
    if !config.debug {
        return f(&toolkit);
    }

    let (tx, rx) = std::sync::mpsc::channel();
    toolkit.manager_mut().set_event_sender(tx);
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_exec_event(&event) {
                eprintln!("{}", line);
            }
        }
    });
    let result = f(&toolkit);
    drop(toolkit);
    printer.join().ok();
    result
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
