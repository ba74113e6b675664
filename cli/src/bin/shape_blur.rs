use clap::{Parser, Subcommand};
use cli::{BlurJob, JobError};
use color_eyre::eyre::{eyre, Result};
use image::RgbImage;
use shapeblur::{
    HostPipeline, ImageBufferMut, Rect, ShapeBlurError, ShapeBlurPipeline, StageDiagnostics,
    DEFAULT_BLUR_KERNEL,
};
use shapeblur_gpu::DevicePipeline;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Blur the largest shape inside a rectangle for every image in a directory
    Run {
        /// Directory of input images
        #[arg(short, long)]
        input: PathBuf,
        /// Directory for processed images
        #[arg(short, long)]
        output: PathBuf,
        /// Region of interest as: x y width height
        #[arg(short, long, required = true, num_args = 4, value_names = ["X", "Y", "WIDTH", "HEIGHT"])]
        rect: Vec<u32>,
        /// Gaussian blur kernel size (odd)
        #[arg(long, default_value_t = DEFAULT_BLUR_KERNEL)]
        blur_kernel: u32,
        /// Use the GPU backend, falling back to the host on failure
        #[arg(long)]
        gpu: bool,
        /// Save intermediate stage images next to each output
        #[arg(long)]
        debug: bool,
    },
    /// Process images using an existing job configuration file
    Process {
        /// Path to the TOML or JSON job file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let job = match cli.command {
        Commands::Run {
            input,
            output,
            rect,
            blur_kernel,
            gpu,
            debug,
        } => BlurJob {
            input_dir: input,
            output_dir: output,
            rect: Rect::new(rect[0], rect[1], rect[2], rect[3]),
            blur_kernel,
            gpu,
            debug,
        },
        Commands::Process { config } => BlurJob::from_file(&config)?,
    };

    run_job(&job)
}

fn run_job(job: &BlurJob) -> Result<()> {
    job.validate()?;
    let images = list_images(&job.input_dir)?;
    if images.is_empty() {
        return Err(JobError::NoImagesFound(job.input_dir.clone()).into());
    }
    std::fs::create_dir_all(&job.output_dir)?;

    let pipeline = build_pipeline(job.gpu)?;
    info!("Processing {} images from {:?}", images.len(), job.input_dir);

    let mut failures = 0usize;
    for path in &images {
        if let Err(err) = process_image(pipeline.as_ref(), job, path) {
            error!("Failed to process {:?}: {err}", path);
            failures += 1;
        }
    }

    info!(
        "Done: {} processed, {} failed",
        images.len() - failures,
        failures
    );
    Ok(())
}

/// Pick the backend. A GPU request degrades to the host pipeline with a
/// warning when no device is available.
fn build_pipeline(gpu: bool) -> Result<Box<dyn ShapeBlurPipeline>> {
    if gpu {
        match DevicePipeline::new() {
            Ok(pipeline) => return Ok(Box::new(pipeline)),
            Err(ShapeBlurError::DeviceUnavailable(reason)) => {
                warn!("GPU backend unavailable ({reason}); falling back to host pipeline");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(Box::new(HostPipeline::new()))
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    images.sort();
    Ok(images)
}

fn process_image(pipeline: &dyn ShapeBlurPipeline, job: &BlurJob, path: &Path) -> Result<()> {
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut data = rgb.into_raw();
    // processing works on BGR-ordered samples
    swap_red_blue(&mut data);

    let mut buffer = ImageBufferMut::from_raw(&mut data, width, height, 3)?;
    let diagnostics = if job.debug {
        Some(pipeline.process_with_diagnostics(&mut buffer, job.rect, job.blur_kernel)?)
    } else {
        pipeline.process(&mut buffer, job.rect, job.blur_kernel)?;
        None
    };

    swap_red_blue(&mut data);
    let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("input path has no file name: {:?}", path))?;
    let output_path = job.output_dir.join(file_name);
    let result = RgbImage::from_raw(width, height, data)
        .ok_or_else(|| eyre!("processed buffer has the wrong length"))?;
    result.save(&output_path)?;
    info!("Wrote {:?}", output_path);

    if let Some(diagnostics) = diagnostics {
        save_diagnostics(&diagnostics, &output_path)?;
    }
    Ok(())
}

/// Write the stage images next to `output_path` as `<stem>_gray.png`,
/// `<stem>_edges.png`, `<stem>_roi.png`, and `<stem>_mask.png`.
fn save_diagnostics(diagnostics: &StageDiagnostics, output_path: &Path) -> Result<()> {
    let stem = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| eyre!("output path has no file stem: {:?}", output_path))?;
    let sibling = |suffix: &str| output_path.with_file_name(format!("{stem}_{suffix}.png"));

    diagnostics.grayscale.save(sibling("gray"))?;
    diagnostics.edges.save(sibling("edges"))?;
    diagnostics.mask.save(sibling("mask"))?;

    let mut roi = diagnostics.region.clone().into_raw();
    swap_red_blue(&mut roi);
    let roi = RgbImage::from_raw(
        diagnostics.region.width(),
        diagnostics.region.height(),
        roi,
    )
    .ok_or_else(|| eyre!("region diagnostic has the wrong length"))?;
    roi.save(sibling("roi"))?;
    Ok(())
}

/// Swap channels 0 and 2 of interleaved 3-channel data in place.
fn swap_red_blue(data: &mut [u8]) {
    for pixel in data.chunks_exact_mut(3) {
        pixel.swap(0, 2);
    }
}
