use clap::{Args, Parser, Subcommand};
use listing_pack::analyze::{analyze, analyze_all};
use listing_pack::compose::{auto_adjust, png_from_data_url};
use listing_pack::config;
use listing_pack::loader::HttpServices;
use listing_pack::output;
use listing_pack::package::generate_package;
use listing_pack::session::{EditSession, filter_photo_urls};
use listing_pack::types::{Agent, ImageAnalysisResult, ImageEditState, Team};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "listing-pack")]
#[command(about = "Branded square image packages from listing photos")]
#[command(long_about = "\
Branded square image packages from listing photos

Photos are fetched by URL, checked for white letterbox strips and low
resolution, cropped to a square, and composited into 1080x1080 PNGs. The
first image carries the agent or team branding overlay; the last carries the
closing overlay.

Typical flow:

  listing-pack analyze --gallery \"$PHOTO_GALLERY\"
  listing-pack package URL1 URL2 URL3 --agent-overlay AGENT.png --auto-adjust --out pack/

Images on hosts that refuse direct loading, and any image with sharpening
requested in its edit state, are mirrored through the CDN configured under
[proxy]. Set RUST_LOG=debug for per-image detail.

Run 'listing-pack gen-config' to generate a documented listing-pack.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (stock defaults when absent)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct BrandingArgs {
    /// Agent overlay image URL (takes precedence over a team overlay)
    #[arg(long)]
    agent_overlay: Option<String>,
    /// Team overlay logo URL
    #[arg(long)]
    team_overlay: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Check photos for strip artifacts and low resolution
    Analyze {
        /// Photo URLs
        urls: Vec<String>,
        /// Space-separated gallery string; non-photo URLs are skipped
        #[arg(long)]
        gallery: Option<String>,
        /// Print verdicts as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Compose the selected photos into a branded package
    Package {
        /// Photo URLs, in package order
        #[arg(required = true)]
        urls: Vec<String>,
        #[command(flatten)]
        branding: BrandingArgs,
        /// JSON map of photo URL to edit state
        #[arg(long)]
        edits: Option<PathBuf>,
        /// Auto-adjust unedited photos that have strip artifacts
        #[arg(long)]
        auto_adjust: bool,
        /// Output directory for the PNG files
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the auto-adjust crop for given natural dimensions
    AutoAdjust {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Zoom factor (defaults to composition.auto_adjust_zoom)
        #[arg(long)]
        zoom: Option<f64>,
    },
    /// Print a stock listing-pack.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            mut urls,
            gallery,
            json,
        } => {
            let config = config::load_config(&cli.config)?;
            if let Some(gallery) = gallery {
                urls.extend(filter_photo_urls(&gallery));
            }
            init_thread_pool(&config.processing);
            let services = HttpServices::new(&config)?;
            let loader = services.loader(&config);
            let results = analyze_all(&loader, &config.analysis, &urls);
            if json {
                let map: BTreeMap<&str, &ImageAnalysisResult> =
                    results.iter().map(|(u, r)| (u.as_str(), r)).collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                output::print_analysis(&results);
            }
        }
        Command::Package {
            urls,
            branding,
            edits,
            auto_adjust,
            out,
        } => {
            let config = config::load_config(&cli.config)?;
            let services = HttpServices::new(&config)?;
            let loader = services.loader(&config);

            let mut session = EditSession::new(config.composition.max_selections);
            for url in &urls {
                if !session.toggle_selection(url) {
                    warn!(url = url.as_str(), "not selected (duplicate or over the limit)");
                }
            }
            if let Some(path) = edits {
                let saved: BTreeMap<String, ImageEditState> =
                    serde_json::from_str(&std::fs::read_to_string(path)?)?;
                for (url, state) in saved {
                    session.save_crop(&url, state);
                }
            }
            if auto_adjust {
                let pending: Vec<String> = session
                    .selection()
                    .iter()
                    .filter(|u| session.edit_state(u).is_none())
                    .cloned()
                    .collect();
                for url in pending {
                    session.record_analysis(&url, analyze(&loader, &config.analysis, &url));
                    if !session.warning(&url).suggests_auto_adjust() {
                        continue;
                    }
                    if let Err(err) = session.auto_adjust(&url, config.composition.auto_adjust_zoom) {
                        warn!(url = url.as_str(), error = %err, "left unedited");
                    }
                }
            }

            let request = session.build_request(
                branding.agent_overlay.map(cli_agent),
                branding.team_overlay.map(cli_team),
                config.target,
            )?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_package_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = generate_package(&loader, &config, &request, Some(tx));
            printer.join().map_err(|_| "progress printer panicked")?;

            write_package(&out, &result.successful_images)?;
            let report = serde_json::json!({
                "failedImageOriginalUrls": result.failed_image_original_urls,
                "imageAnalysis": result.image_analysis,
            });
            std::fs::write(out.join("package.json"), serde_json::to_string_pretty(&report)?)?;
            output::print_package_summary(&result, &out);
        }
        Command::AutoAdjust {
            width,
            height,
            zoom,
        } => {
            let config = config::load_config(&cli.config)?;
            let analysis = ImageAnalysisResult {
                natural_width: Some(width),
                natural_height: Some(height),
                ..Default::default()
            };
            let zoom = zoom.unwrap_or(config.composition.auto_adjust_zoom);
            let state = auto_adjust(Some(&analysis), zoom)?;
            for line in output::format_auto_adjust(&state) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn cli_agent(overlay_image: String) -> Agent {
    Agent {
        id: "cli".into(),
        name: "agent".into(),
        overlay_image,
    }
}

fn cli_team(overlay_logo: String) -> Team {
    Team {
        id: "cli".into(),
        name: "team".into(),
        overlay_logo,
    }
}

/// Write each data URL as `NNN.png` in package order.
fn write_package(out: &Path, images: &[String]) -> std::io::Result<()> {
    std::fs::create_dir_all(out)?;
    for (pos, data_url) in images.iter().enumerate() {
        let Some(png) = png_from_data_url(data_url) else {
            warn!(index = pos, "image is not a PNG data URL, skipped");
            continue;
        };
        std::fs::write(out.join(format!("{:0>3}.png", pos + 1)), png)?;
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let workers = config::effective_workers(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()
        .ok();
}
