use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::FileFormat;

use sdmap::{
    CatalogId, ChannelRange, CombinationSession, CombineConfig, Disk, DiskCatalog, ImagingRunner,
    MappingPipeline, PipelineConfig,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Combine per-feed single-dish spectra and hand them to the mapping tool",
    long_about = None,
    arg_required_else_help = true,
    after_help = "Examples:\n  sdmap combine 1024 W3OH_12_20_feed0.fits W3OH_12_20_feed1.fits\n  sdmap --config pipeline.yaml combine 1024 *.fits --avoid-disk 0\n  sdmap image --catalog-id 1024 --start 12 --end 20 --feeds 0,1 --channels 100:900\n"
)]
struct Cli {
    /// Pipeline config file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Combine spectra files into one sorted file next to the first input
    Combine(CombineArgs),
    /// Combine the calibrated files of one map and run the mapping tool
    Image(ImageArgs),
    /// Print the effective configuration as YAML
    ShowConfig,
}

/// Overrides for the `combine` section of the config file.
#[derive(Args, Debug)]
struct CombineOverrides {
    /// Catalog disk receiving loaded and combined data
    #[arg(long)]
    working_disk: Option<u8>,

    /// Catalog disk kept free of sort scratch data (0 = none)
    #[arg(long)]
    avoid_disk: Option<u8>,

    /// Largest accepted reference frequency offset (Hz)
    #[arg(long)]
    tolerance: Option<f64>,
}

impl CombineOverrides {
    fn apply(&self, config: &mut CombineConfig) -> Result<()> {
        if let Some(n) = self.working_disk {
            config.working_disk = Disk::new(n).context("Working disk numbers start at 1")?;
        }
        if let Some(n) = self.avoid_disk {
            config.avoid_disk = Disk::new(n);
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance_hz = tolerance;
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
struct CombineArgs {
    /// Catalog number owning all intermediate data
    catalog_id: u32,

    /// Calibrated spectra files, in combination order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    overrides: CombineOverrides,
}

#[derive(Args, Debug)]
struct ImageArgs {
    /// Catalog number owning all intermediate data
    #[arg(long)]
    catalog_id: u32,

    /// Directory holding the calibrated files
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Spectral window
    #[arg(long, default_value_t = 0)]
    window: u32,

    /// First scan of the map
    #[arg(long)]
    start: u32,

    /// Last scan of the map
    #[arg(long)]
    end: u32,

    /// Feeds to include, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    feeds: Vec<u32>,

    /// Channel range FIRST:LAST (default: inner 96% of the band)
    #[arg(long)]
    channels: Option<ChannelRange>,

    /// Mapping tool executable (overrides the config file)
    #[arg(long)]
    tool: Option<PathBuf>,

    #[command(flatten)]
    overrides: CombineOverrides,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    common::log_setup::setup_logging(&cli.log_level, "sdmap", config.log_dir.as_deref())
        .context("Failed to set up logging")?;

    match cli.command {
        Command::Combine(args) => combine(config, args),
        Command::Image(args) => image(config, args),
        Command::ShowConfig => {
            print!("{}", common::serialize(&config, FileFormat::Yaml)?);
            Ok(())
        }
    }
}

fn combine(mut config: PipelineConfig, args: CombineArgs) -> Result<()> {
    args.overrides.apply(&mut config.combine)?;
    config.validate()?;

    let id = CatalogId::new(args.catalog_id)?;
    let mut catalog = DiskCatalog::new(config.disks.clone());
    let result = CombinationSession::new(id, &args.files, config.combine)
        .run(&mut catalog)
        .with_context(|| format!("Combination in catalog {id} failed"))?;

    let p = &result.parameters;
    tracing::info!(
        accepted = result.accepted_count,
        rejected = result.rejected.len(),
        ra_deg = p.ra_deg,
        dec_deg = p.dec_deg,
        image = %format!("{}x{}", p.image_width, p.image_height),
        cell_arcsec = p.cell_size_arcsec,
        channels = p.channel_count,
        reference_channel = p.reference_channel,
        frequency_hz = p.reference_frequency,
        channel_width_hz = p.frequency_delta,
        "Combined spectra"
    );
    println!("{}", result.output_path.display());
    Ok(())
}

fn image(mut config: PipelineConfig, args: ImageArgs) -> Result<()> {
    args.overrides.apply(&mut config.combine)?;
    config.validate()?;

    let tool = args
        .tool
        .or(config.mapping_tool)
        .context("No mapping tool configured; pass --tool or set mapping_tool")?;
    let tool = std::path::absolute(&tool)
        .with_context(|| format!("Invalid mapping tool path '{}'", tool.display()))?;

    let id = CatalogId::new(args.catalog_id)?;
    let pipelines: Vec<MappingPipeline> = args
        .feeds
        .iter()
        .map(|&feed| MappingPipeline {
            window: args.window,
            start_scan: args.start,
            end_scan: args.end,
            feed,
        })
        .collect();

    let mut catalog = DiskCatalog::new(config.disks.clone());
    let outcomes = ImagingRunner::new(id, tool, config.combine)
        .with_channels(args.channels)
        .run(&mut catalog, &args.dir, &pipelines)
        .context("Imaging failed")?;

    for outcome in &outcomes {
        tracing::info!(
            key = %outcome.key,
            files = outcome.files.len(),
            channels = %outcome.channels,
            output = %outcome.combination.output_path.display(),
            "Map done"
        );
    }
    Ok(())
}
