// Command-line front end for the image converter.
// The library crate holds all conversion logic; this file only wires it up.

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Context as _;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use image_converter_lib::commands::{convert_files, export_results};
use image_converter_lib::core::{
    AppState, BatchSettings, CoreEvent, EventSink, HandleRegistry, HexColor, TracingSink, WatermarkPosition,
};
use image_converter_lib::processing::{ConversionEngine, NativeExporter, WatermarkFont};
use image_converter_lib::utils::{format_bytes, validate_settings};

#[derive(Parser, Debug)]
#[command(name = "image-converter", version, about = "Convert images to WebP (or PNG) in one batch")]
struct Cli {
    /// Images to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory converted files are written to.
    #[arg(short, long, default_value = "converted")]
    out_dir: PathBuf,

    /// Write a single `converted-images.zip` instead of separate files.
    #[arg(long, default_value_t = false)]
    zip: bool,

    /// Settings JSON (`quality`, `resize`, `width`, `lockAspect`, ...). Flags override it.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Encoder quality in [0, 1].
    #[arg(short, long)]
    quality: Option<f32>,

    /// Target width in pixels; enables resizing.
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels; enables resizing.
    #[arg(long)]
    height: Option<u32>,

    /// Apply width and height independently.
    #[arg(long, default_value_t = false)]
    no_lock_aspect: bool,

    /// Watermark text; enables the watermark.
    #[arg(long, value_name = "TEXT")]
    watermark: Option<String>,

    /// bottom-left, bottom-right or center.
    #[arg(long)]
    watermark_position: Option<WatermarkPosition>,

    /// Hex colour such as `#ffffff`.
    #[arg(long)]
    watermark_color: Option<HexColor>,

    /// TrueType/OpenType font used for the watermark.
    #[arg(long)]
    watermark_font: Option<PathBuf>,

    /// Print every core event to stdout as a JSON line.
    #[arg(long, default_value_t = false)]
    events_json: bool,

    /// Log debug output.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    /// Settings file (if any) with command-line overrides applied.
    fn batch_settings(&self) -> anyhow::Result<BatchSettings> {
        let mut settings = match &self.settings {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read settings '{}'", path.display()))?;
                serde_json::from_str(&text).with_context(|| format!("parse settings '{}'", path.display()))?
            }
            None => BatchSettings::default(),
        };

        if let Some(quality) = self.quality {
            settings.quality = quality;
        }
        if self.width.is_some() || self.height.is_some() {
            settings.resize = true;
            settings.width = self.width.or(settings.width);
            settings.height = self.height.or(settings.height);
        }
        if self.no_lock_aspect {
            settings.lock_aspect = false;
        }
        if let Some(text) = &self.watermark {
            settings.watermark = true;
            settings.watermark_text = text.clone();
        }
        if let Some(position) = self.watermark_position {
            settings.watermark_position = position;
        }
        if let Some(color) = self.watermark_color {
            settings.watermark_color = color;
        }

        validate_settings(&settings)?;
        Ok(settings)
    }
}

/// Writes each event as one JSON object per line.
struct JsonLinesSink;

impl EventSink for JsonLinesSink {
    fn emit(&self, event: CoreEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to serialize event: {}", e),
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr) // stdout is reserved for --events-json
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    info!("=== Image Converter Starting ===");

    let settings = cli.batch_settings()?;

    let font = if settings.wants_watermark() {
        let font = WatermarkFont::discover(cli.watermark_font.as_deref());
        if font.is_none() {
            warn!("No usable font found; images will be converted without the watermark");
        }
        font
    } else {
        None
    };

    let engine = ConversionEngine::new(Arc::new(NativeExporter), font, HandleRegistry::new());
    let events: Arc<dyn EventSink> = if cli.events_json {
        Arc::new(JsonLinesSink)
    } else {
        Arc::new(TracingSink)
    };
    let state = AppState::new(engine, events);
    state.detect_capabilities().await;

    let report = convert_files(&state, &cli.inputs, settings).await?;
    for (path, reason) in &report.unreadable {
        warn!("Could not read {}: {}", path.display(), reason);
    }
    if report.refused > 0 {
        warn!("{} image(s) were not queued (limit reached)", report.refused);
    }

    let written = export_results(&state, &cli.out_dir, cli.zip)
        .await
        .with_context(|| format!("write results to '{}'", cli.out_dir.display()))?;
    let total_bytes: u64 = written
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();

    info!(
        "Converted {}/{} image(s), wrote {} file(s) ({})",
        report.converted,
        report.admitted,
        written.len(),
        format_bytes(total_bytes)
    );

    if report.converted == 0 && !report.failed.is_empty() {
        anyhow::bail!("none of the {} image(s) could be converted", report.failed.len());
    }
    Ok(())
}
