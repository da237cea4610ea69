use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use stackreg_core::align::realign_frame;
use stackreg_core::channels::ChannelSelection;
use stackreg_core::io::image_io::{load_image, load_stack, save_tiff};
use stackreg_core::pipeline::{
    compute_stack_alignment_reported, AlignmentConfig, AlignmentOptions, AlignmentStage,
    EdgeExtension, ProgressReporter, ReferenceSpec, TrialRange,
};
use stackreg_core::FrameOffsets;
use tracing::info;

use crate::summary::{print_alignment_summary, print_offsets_overview};

#[derive(Clone, Copy, ValueEnum)]
pub enum EdgeArg {
    RowOnlyBefore,
    Symmetric,
}

impl From<EdgeArg> for EdgeExtension {
    fn from(arg: EdgeArg) -> Self {
        match arg {
            EdgeArg::RowOnlyBefore => EdgeExtension::RowOnlyBefore,
            EdgeArg::Symmetric => EdgeExtension::Symmetric,
        }
    }
}

#[derive(Args)]
pub struct AlignArgs {
    /// Input frames, in stack order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Alignment config file (TOML); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Comma-separated channel indices summed into the registration image
    #[arg(long, value_delimiter = ',')]
    pub channels: Option<Vec<usize>>,

    /// Register each frame against its predecessor
    #[arg(long)]
    pub progressive: bool,

    /// Upsampling factor; precision is 1/N pixel
    #[arg(short, long)]
    pub upsample: Option<usize>,

    /// Use the window around this frame (0-based) as reference
    #[arg(long, conflicts_with = "reference_image")]
    pub reference_frame: Option<usize>,

    /// Use this image as reference
    #[arg(long)]
    pub reference_image: Option<PathBuf>,

    /// Number of consecutive frames summed per registration
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Lowest spatial frequency kept (cycles/pixel)
    #[arg(long)]
    pub fmin: Option<f64>,

    /// Highest spatial frequency kept (cycles/pixel)
    #[arg(long)]
    pub fmax: Option<f64>,

    /// Independent block as START:END, inclusive and 0-based (repeatable)
    #[arg(long = "trial", value_parser = parse_trial)]
    pub trials: Vec<TrialRange>,

    /// How offsets are extended to frames at block edges
    #[arg(long, value_enum)]
    pub edges: Option<EdgeArg>,

    /// Write offsets as CSV to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Save realigned frames as 16-bit TIFF into this directory
    #[arg(long)]
    pub aligned_dir: Option<PathBuf>,
}

fn parse_trial(s: &str) -> std::result::Result<TrialRange, String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{s}'"))?;
    let start = start.trim().parse::<usize>().map_err(|e| format!("bad start '{start}': {e}"))?;
    let end = end.trim().parse::<usize>().map_err(|e| format!("bad end '{end}': {e}"))?;
    Ok(TrialRange::new(start, end))
}

fn build_config(args: &AlignArgs) -> Result<AlignmentConfig> {
    let mut config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid alignment config")?
    } else {
        AlignmentConfig::default()
    };

    if let Some(ref channels) = args.channels {
        config.channels = match channels.as_slice() {
            [] => bail!("--channels needs at least one index"),
            [single] => ChannelSelection::Single(*single),
            many => ChannelSelection::Summed(many.to_vec()),
        };
    }
    if args.progressive {
        config.progressive = true;
    }
    if let Some(upsample) = args.upsample {
        config.upsampling = upsample;
    }
    if args.reference_frame.is_some() {
        config.reference_frame = args.reference_frame;
    }
    if let Some(window) = args.window {
        config.window_length = window;
    }
    if let Some(fmin) = args.fmin {
        config.cutoff.min = fmin;
    }
    if let Some(fmax) = args.fmax {
        config.cutoff.max = fmax;
    }
    if !args.trials.is_empty() {
        config.trials = args.trials.clone();
    }
    if let Some(edges) = args.edges {
        config.edge_extension = edges.into();
    }
    Ok(config)
}

/// Drives an indicatif bar from alignment progress callbacks.
struct BarReporter {
    pb: ProgressBar,
}

impl BarReporter {
    fn new() -> Result<Self> {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:22} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        Ok(Self { pb })
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: AlignmentStage, total_items: Option<usize>) {
        self.pb.set_message(stage.to_string());
        self.pb.set_length(total_items.unwrap_or(0) as u64);
        self.pb.set_position(0);
    }

    fn advance(&self, items_done: usize) {
        self.pb.set_position(items_done as u64);
    }
}

/// A reference image and a reference frame cannot both apply; the frame may
/// come from the config file, which clap's conflict check does not see.
fn check_reference_sources(config: &AlignmentConfig, reference_image: Option<&Path>) -> Result<()> {
    if let (Some(frame), Some(path)) = (config.reference_frame, reference_image) {
        bail!(
            "--reference-image {} conflicts with reference_frame = {frame} from the config",
            path.display()
        );
    }
    Ok(())
}

pub fn run(args: &AlignArgs) -> Result<()> {
    let config = build_config(args)?;
    check_reference_sources(&config, args.reference_image.as_deref())?;
    let mut options = AlignmentOptions::from(&config);

    let reference_label = if let Some(ref path) = args.reference_image {
        let reference = load_image(path)
            .with_context(|| format!("Failed to load reference {}", path.display()))?;
        options.reference = ReferenceSpec::Image(reference.mapv(f64::from));
        path.display().to_string()
    } else if let Some(frame) = config.reference_frame {
        format!("window around frame {frame}")
    } else if config.progressive {
        "previous frame".to_string()
    } else {
        "first computed frame".to_string()
    };

    print_alignment_summary(&config, args.files.len(), &reference_label);

    let mut stack = load_stack(&args.files).context("Failed to load frames")?;
    info!(frames = args.files.len(), "Frames loaded");

    let reporter = BarReporter::new()?;
    let offsets = compute_stack_alignment_reported(&mut stack, &options, &reporter)?;
    reporter.pb.finish_with_message("Done");

    print_offsets_overview(&offsets);

    let csv = offsets.to_csv();
    if let Some(ref path) = args.output {
        std::fs::write(path, &csv)
            .with_context(|| format!("Failed to write offsets to {}", path.display()))?;
        eprintln!("Offsets saved to {}", path.display());
    } else {
        print!("{}", csv);
    }

    if let Some(ref dir) = args.aligned_dir {
        save_aligned_frames(&args.files, &offsets, dir)?;
    }

    Ok(())
}

fn save_aligned_frames(files: &[PathBuf], offsets: &FrameOffsets, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:22} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Saving aligned frames");

    for (path, offset) in files.iter().zip(offsets.iter()) {
        let frame = load_image(path)?;
        let aligned = realign_frame(&frame, offset);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        save_tiff(&aligned, &dir.join(format!("{stem}_aligned.tiff")))?;
        pb.inc(1);
    }

    pb.finish_with_message("Done");
    eprintln!("Aligned frames saved to {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_ranges_parse_inclusive() {
        assert_eq!(parse_trial("3:17"), Ok(TrialRange::new(3, 17)));
        assert_eq!(parse_trial(" 0 : 9 "), Ok(TrialRange::new(0, 9)));
        assert!(parse_trial("12").is_err());
        assert!(parse_trial("a:3").is_err());
    }

    #[test]
    fn reference_image_conflicts_with_configured_frame() {
        let image = Path::new("ref.tiff");
        let mut config = AlignmentConfig::default();
        assert!(check_reference_sources(&config, Some(image)).is_ok());

        config.reference_frame = Some(3);
        assert!(check_reference_sources(&config, None).is_ok());
        assert!(check_reference_sources(&config, Some(image)).is_err());
    }
}
