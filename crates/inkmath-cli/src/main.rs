#![allow(
    clippy::needless_pass_by_value,    // clap requires owned values
    clippy::must_use_candidate,        // CLI functions don't need must_use
)]

//! inkmath CLI - handwritten equation segmentation and markup rendering

mod config;
mod report;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use inkmath::visualization::{draw_overlay_with_options, OverlayOptions, SymbolAnnotation};
use inkmath::pipeline::LENIENT_MAX_MERGED_HEIGHT;
use inkmath::{Pipeline, PipelineConfig, PipelineConfigBuilder, SegmentedEquation};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use config::{Config, CONFIG_FILE_NAME, DEFAULT_CONFIG};
use report::{parse_labels, LayoutReport};

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (default)
    Normal,
    /// Verbose output with extra details
    Verbose,
}

impl Verbosity {
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Default `env_logger` filter; `RUST_LOG` still wins
    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "debug",
        }
    }
}

/// Pipeline presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
enum Preset {
    /// No dot merging after layout resolution
    Strict,
    /// Raised merged-height cap for tall or loosely written symbols
    Lenient,
}

#[derive(Parser, Debug)]
#[command(
    name = "inkmath",
    about = "Segment handwritten equations and render them as math markup",
    long_about = "Segment a raster image of a handwritten equation into isolated, normalized\n\
                  glyphs with their layout (levels, stacks, scripts), and render classified\n\
                  glyphs as a balanced math-mode markup string.",
    version
)]
struct Args {
    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Configuration file, applied on top of ~/.inkmath.toml and ./.inkmath.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Segment an equation image into glyphs and write a JSON layout report
    #[command(long_about = "Binarize the image, detect glyph regions and run every layout stage.\n\
                      \n\
                      The report lists every symbol in reading order with its box, level,\n\
                      stack role, script level and extend count.\n\
                      \n\
                      Examples:\n\
                        inkmath segment eq.png                   # report to stdout\n\
                        inkmath segment eq.png -o eq.json --glyph-dir glyphs/\n\
                        inkmath segment eq.png --overlay eq_boxes.png")]
    Segment {
        /// Input image (PNG, JPEG, BMP, TIFF)
        #[arg(value_name = "IMAGE")]
        input: PathBuf,

        /// Output path for the JSON report (default: stdout)
        #[arg(short, long, value_name = "JSON")]
        output: Option<PathBuf>,

        /// Write every normalized glyph as a PNG into this directory
        #[arg(long, value_name = "DIR")]
        glyph_dir: Option<PathBuf>,

        /// Write the input annotated with every symbol box
        #[arg(long, value_name = "PNG")]
        overlay: Option<PathBuf>,

        /// Pipeline preset applied on top of the configuration files
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Dump every intermediate stage output as JSON into this directory
        #[arg(long, value_name = "DIR")]
        debug_dir: Option<PathBuf>,
    },

    /// Render a labelled layout report as a markup string
    #[command(long_about = "Render the symbols of a layout report as a math-mode markup string.\n\
                      \n\
                      Labels come from the report's `label` fields, or from a separate file\n\
                      with one label per line in report order.\n\
                      \n\
                      Examples:\n\
                        inkmath render eq.json\n\
                        inkmath render eq.json --labels eq_labels.txt")]
    Render {
        /// Layout report written by `segment`
        #[arg(value_name = "REPORT_JSON")]
        report: PathBuf,

        /// One label per line, in report order
        #[arg(long, value_name = "FILE")]
        labels: Option<PathBuf>,

        /// Keep glyph sequences such as "s i n" apart
        #[arg(long)]
        no_ligatures: bool,
    },

    /// Manage configuration settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Create a new .inkmath.toml with every setting documented
    Init {
        /// Create in the user home directory instead of the current directory
        #[arg(long)]
        global: bool,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Display the effective pipeline configuration
    Show {
        /// Output as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(verbosity.log_filter()))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(args, verbosity) {
        eprintln!("{} {e:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}

fn run(args: Args, verbosity: Verbosity) -> Result<()> {
    let config = Config::discover(args.config.as_deref())?;

    match args.command {
        Commands::Segment {
            input,
            output,
            glyph_dir,
            overlay,
            preset,
            debug_dir,
        } => {
            let pipeline_config = segment_pipeline_config(&config, preset, debug_dir)?;
            segment_command(
                &config,
                pipeline_config,
                &input,
                output.as_deref(),
                glyph_dir.as_deref(),
                overlay.as_deref(),
                verbosity,
            )
        }
        Commands::Render {
            report,
            labels,
            no_ligatures,
        } => {
            let mut builder = PipelineConfigBuilder::from_config(config.pipeline_config()?);
            if no_ligatures {
                builder = builder.ligatures(false);
            }
            render_command(builder.build()?, &report, labels.as_deref())
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { global, force } => config_init(global, force, verbosity),
            ConfigAction::Show { json } => config_show(&config, json),
        },
    }
}

/// File configuration with the command-line flags applied on top
fn segment_pipeline_config(
    config: &Config,
    preset: Option<Preset>,
    debug_dir: Option<PathBuf>,
) -> Result<PipelineConfig> {
    let mut builder = PipelineConfigBuilder::from_config(config.pipeline_config()?);
    builder = match preset {
        Some(Preset::Strict) => builder.dot_merging(false),
        Some(Preset::Lenient) => builder.max_merged_height(LENIENT_MAX_MERGED_HEIGHT),
        None => builder,
    };
    if let Some(dir) = debug_dir {
        builder = builder.debug_output_dir(dir);
    }
    Ok(builder.build()?)
}

fn segment_command(
    config: &Config,
    pipeline_config: PipelineConfig,
    input: &Path,
    output: Option<&Path>,
    glyph_dir: Option<&Path>,
    overlay: Option<&Path>,
    verbosity: Verbosity,
) -> Result<()> {
    let start = Instant::now();
    let image = image::open(input)
        .with_context(|| format!("Failed to open image: {}", input.display()))?
        .to_luma8();

    let pipeline = Pipeline::new(pipeline_config)?;
    let segmented = pipeline
        .segment(&image)
        .with_context(|| format!("Failed to segment {}", input.display()))?;

    let mut report = LayoutReport::from_segmented(
        &segmented,
        Some(input.display().to_string()),
        image.width(),
        image.height(),
    );

    if let Some(dir) = glyph_dir {
        write_glyphs(&segmented, dir, &mut report)?;
    }

    let settings = config.segment();
    if let Some(path) = overlay {
        let annotations: Vec<SymbolAnnotation> =
            segmented.layouts().map(SymbolAnnotation::from).collect();
        let options = OverlayOptions {
            line_thickness: settings.overlay_thickness.unwrap_or(OverlayOptions::default().line_thickness),
        };
        draw_overlay_with_options(&image, &annotations, &options)
            .save(path)
            .with_context(|| format!("Failed to write overlay: {}", path.display()))?;
    }

    let json = if settings.pretty.unwrap_or(true) {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            if verbosity.should_show_output() {
                println!(
                    "{} {} symbols from {} in {:.1}ms -> {}",
                    "Segmented:".green().bold(),
                    segmented.len(),
                    input.display(),
                    start.elapsed().as_secs_f64() * 1000.0,
                    path.display()
                );
            }
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn write_glyphs(segmented: &SegmentedEquation, dir: &Path, report: &mut LayoutReport) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create glyph directory: {}", dir.display()))?;

    for (i, (glyph, record)) in segmented
        .glyphs()
        .into_iter()
        .zip(report.symbols.iter_mut())
        .enumerate()
    {
        let name = format!("glyph_{i:03}.png");
        let path = dir.join(&name);
        glyph
            .save(&path)
            .with_context(|| format!("Failed to write glyph: {}", path.display()))?;
        record.glyph = Some(name);
    }
    log::info!("Wrote {} glyphs to {}", segmented.len(), dir.display());
    Ok(())
}

fn render_command(pipeline_config: PipelineConfig, report_path: &Path, labels: Option<&Path>) -> Result<()> {
    let report = LayoutReport::load(report_path)?;
    let labels = labels
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read labels: {}", path.display()))
                .map(|text| parse_labels(&text))
        })
        .transpose()?;

    let symbols = report.render_symbols(labels.as_deref())?;
    let pipeline = Pipeline::new(pipeline_config)?;
    println!("{}", pipeline.render(&symbols));
    Ok(())
}

fn config_init(global: bool, force: bool, verbosity: Verbosity) -> Result<()> {
    let config_path = if global {
        config::user_config_path().context("Could not determine home directory")?
    } else {
        PathBuf::from(CONFIG_FILE_NAME)
    };

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {} (use --force to overwrite)",
            config_path.display()
        );
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    if verbosity.should_show_output() {
        println!(
            "{} Created configuration file: {}",
            "Success:".green().bold(),
            config_path.display()
        );
    }
    Ok(())
}

fn config_show(config: &Config, json_output: bool) -> Result<()> {
    let effective = config.pipeline_config()?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&effective)?);
    } else {
        println!("{}", toml::to_string_pretty(&effective)?);
    }
    Ok(())
}
