use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use label_palette::{
    AnalysisConfig, BeerColors, BeerRecords, LabelError, LabelImage, ReferencePalette,
    analyze_labels, profile_image,
};
use log::{info, warn};

/// Rate reference colors by the ratings of the beers whose labels use them.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON analysis config; defaults are used for anything it leaves out
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Number of dominant colors per label (overrides the config)
    #[arg(short = 'k', long, global = true)]
    n_colors: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract dominant colors from every cached label image
    Analyze {
        /// Beer records JSON
        #[arg(short, long)]
        records: PathBuf,

        /// Directory holding `<bid>.<ext>` label images
        #[arg(short, long)]
        images: PathBuf,

        /// Output file for the per-beer color profiles
        #[arg(short, long, default_value = "beerColors.json")]
        out: PathBuf,
    },

    /// Aggregate beer ratings onto the reference palette
    Build {
        #[arg(short, long)]
        records: PathBuf,

        /// Color profiles written by `analyze`
        #[arg(short = 'b', long, default_value = "beerColors.json")]
        colors: PathBuf,

        /// Palette file to write (and to read with --reuse)
        #[arg(short, long, default_value = "colorPalette.json")]
        palette: PathBuf,

        #[arg(long, default_value = "colorPalette.csv")]
        csv: PathBuf,

        /// Load an existing palette file instead of rebuilding it
        #[arg(long)]
        reuse: bool,
    },

    /// Export a palette file as CSV
    Export {
        #[arg(short, long, default_value = "colorPalette.json")]
        palette: PathBuf,

        #[arg(long, default_value = "colorPalette.csv")]
        csv: PathBuf,
    },

    /// Write a copy of a label re-colored with its dominant colors
    Quantize {
        input: PathBuf,

        /// Output PNG; defaults to `quantized_<name>.png` next to the input
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(n) = args.n_colors {
        config.n_colors = n;
    }
    config.validate()?;

    match args.command {
        Command::Analyze { records, images, out } => {
            let records = BeerRecords::from_json_file(&records)?;
            let beers = analyze_labels(&records, &images, &config)
                .context("label analysis failed")?;
            beers.write_to_file(&out)?;
            info!("Saved {} color profiles → {}", beers.len(), out.display());
        }
        Command::Build {
            records,
            colors,
            palette: palette_path,
            csv,
            reuse,
        } => {
            let reused = if reuse { load_palette(&palette_path) } else { None };
            let palette = match reused {
                Some(palette) => palette,
                None => {
                    let records = BeerRecords::from_json_file(&records)?;
                    let mut beers = BeerColors::read_from_file(&colors)?;
                    let mut palette = ReferencePalette::new();
                    let report = palette.build(&mut beers, &records);
                    if !report.skipped.is_empty() {
                        warn!("{} beers had no record and were skipped", report.skipped.len());
                    }
                    info!(
                        "Rated {} beers, {} colors abstained",
                        report.rated, report.abstained
                    );
                    // Profiles now carry their palette assignments.
                    beers.write_to_file(&colors)?;
                    palette.write_to_file(&palette_path)?;
                    palette
                }
            };
            palette.write_csv_file(&csv)?;
            info!("Saved palette → {}", csv.display());
        }
        Command::Export { palette, csv } => {
            ReferencePalette::read_from_file(&palette)?.write_csv_file(&csv)?;
            info!("Saved palette → {}", csv.display());
        }
        Command::Quantize { input, out } => {
            let mut image = LabelImage::open(&input)?;
            let profile = profile_image(&image, &config)?;
            image.quantize(&profile.colors);

            let out_path = out.unwrap_or_else(|| {
                let stem = input.file_stem().unwrap_or_default().to_string_lossy();
                input.with_file_name(format!("quantized_{stem}.png"))
            });
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            image
                .to_rgb8()
                .save(&out_path)
                .with_context(|| format!("writing {}", out_path.display()))?;
            println!("Saved → {}", out_path.display());
        }
    }

    Ok(())
}

/// Existing palette, or `None` when it is missing or corrupted and has to be
/// rebuilt.
fn load_palette(path: &Path) -> Option<ReferencePalette> {
    match ReferencePalette::read_from_file(path) {
        Ok(palette) => Some(palette),
        Err(err @ LabelError::CorruptPalette { .. }) => {
            warn!("{err}, rebuilding");
            None
        }
        Err(err) => {
            warn!("Cannot reuse palette: {err}, rebuilding");
            None
        }
    }
}
