use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use raster_render::logger;
use raster_render::render_pipeline::{
    ArchiveCompression, AssetDescriptor, CallerGeometry, GeometrySpec, RenderConfig, RenderError,
    RenderOrchestrator, TargetFormat, TiffCompression,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "raster-render", version)]
struct Cli {
    /// Output format: tif, img, tif.zip or img.zip.
    #[arg(long, short)]
    format: String,

    /// Clip to `minx,miny,maxx,maxy`.
    #[arg(long, value_parser = parse_bbox)]
    bbox: Option<[f64; 4]>,

    /// Spatial reference of `--bbox`.
    #[arg(long, default_value = "EPSG:4326")]
    srs: String,

    /// Archive container name and entry directory.
    #[arg(long, default_value = "data")]
    archive_dir: String,

    /// Store archive entries without compression.
    #[arg(long)]
    store: bool,

    /// Compression for converted GeoTIFF output.
    #[arg(long, value_enum, default_value_t = CompressionChoice::None)]
    tiff_compression: CompressionChoice,

    /// Output path; defaults to the suggested filename in the current directory.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Log at debug level, including span timings.
    #[arg(long, short)]
    verbose: bool,

    /// Assets as `path` or `path=logical_name`.
    #[arg(required = true)]
    assets: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompressionChoice {
    None,
    Lzw,
    Deflate,
}

fn parse_bbox(s: &str) -> Result<[f64; 4], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    values
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected 4 comma separated numbers, got {}", v.len()))
}

fn parse_asset(arg: &str) -> AssetDescriptor {
    match arg.split_once('=') {
        Some((path, name)) => AssetDescriptor::new(path, name),
        None => AssetDescriptor::from_path(arg),
    }
}

/// 2 for requests the caller has to fix, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RenderError>() {
        Some(render_err) if render_err.is_client_error() => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(if cli.verbose { "debug" } else { "info" });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let target: TargetFormat = cli.format.parse()?;
    let config = RenderConfig::builder()
        .archive_dir(cli.archive_dir)
        .archive_compression(if cli.store {
            ArchiveCompression::Stored
        } else {
            ArchiveCompression::Deflated
        })
        .tiff_compression(match cli.tiff_compression {
            CompressionChoice::None => TiffCompression::None,
            CompressionChoice::Lzw => TiffCompression::Lzw,
            CompressionChoice::Deflate => TiffCompression::Deflate,
        })
        .build();

    let caller_geometry = cli.bbox.map(CallerGeometry::BoundingBox);
    let geometry = GeometrySpec::from_caller_geometry(caller_geometry.as_ref(), &cli.srs)?;
    let assets: Vec<AssetDescriptor> = cli.assets.iter().map(|a| parse_asset(a)).collect();

    let orchestrator = RenderOrchestrator::new(config);
    let (output, _timings) = orchestrator.render_with_timings(&assets, &target, geometry.as_ref())?;

    let out_path = cli.output.unwrap_or_else(|| PathBuf::from(&output.filename));
    let len = output.len()?;
    let mut file = std::fs::File::create(&out_path)
        .with_context(|| format!("creating {}", out_path.display()))?;
    std::io::copy(&mut output.buffer.reader()?, &mut file)
        .with_context(|| format!("writing {}", out_path.display()))?;
    file.flush()?;

    info!(
        path = %out_path.display(),
        bytes = len,
        media_type = output.media_type,
        "Wrote {}",
        output.content_disposition()
    );
    Ok(())
}
