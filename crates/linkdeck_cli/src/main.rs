//! linkdeck CLI
//!
//! Simulate a link-in-bio page session and inspect how its cards animate,
//! or check a page and configuration for errors.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use linkdeck_app::{App, Host, PageManifest};
use linkdeck_core::{Capabilities, DeckConfig};
use linkdeck_dom::Document;

#[derive(Parser)]
#[command(name = "linkdeck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Link-in-bio page enhancement simulator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a page, scroll through it and report every card
    Simulate {
        /// Page manifest (TOML)
        page: PathBuf,

        /// Deck configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Start with the system reduced-motion setting on
        #[arg(long)]
        reduced_motion: bool,

        /// Host without animation frames, idle callbacks or observers
        #[arg(long)]
        minimal: bool,

        /// Scroll distance per step in px (default: half the viewport)
        #[arg(long)]
        scroll_step: Option<f32>,

        /// Hover the card at this index (repeatable)
        #[arg(long = "hover", value_name = "INDEX")]
        hover: Vec<usize>,

        /// Click the card at this index (repeatable)
        #[arg(long = "click", value_name = "INDEX")]
        click: Vec<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a page manifest and configuration
    Check {
        /// Page manifest (TOML)
        page: PathBuf,

        /// Deck configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

struct SimulateOptions {
    reduced_motion: bool,
    minimal: bool,
    scroll_step: Option<f32>,
    hover: Vec<usize>,
    click: Vec<usize>,
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate {
            page,
            config,
            reduced_motion,
            minimal,
            scroll_step,
            hover,
            click,
            json,
        } => cmd_simulate(
            &page,
            config.as_deref(),
            SimulateOptions {
                reduced_motion,
                minimal,
                scroll_step,
                hover,
                click,
                json,
            },
        ),

        Commands::Check { page, config } => cmd_check(&page, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<DeckConfig> {
    match path {
        Some(path) => DeckConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(DeckConfig::default()),
    }
}

fn load_page(path: &Path) -> Result<PageManifest> {
    PageManifest::load(path).with_context(|| format!("Failed to load page {}", path.display()))
}

fn cmd_simulate(page: &Path, config: Option<&Path>, options: SimulateOptions) -> Result<()> {
    let config = load_config(config)?;
    let manifest = load_page(page)?;

    let capabilities = if options.minimal {
        Capabilities::minimal()
    } else {
        Capabilities::full()
    };
    let host = Host::with_reduced_motion(capabilities, options.reduced_motion);
    manifest.build(host.document())?;

    let app = App::new(&host, config.clone())?;
    app.start();
    host.simulate_load();

    let Some(controller) = app.controller() else {
        bail!("Page did not start");
    };
    let cards = controller.cards();
    info!("Simulating '{}' with {} cards", manifest.title, cards.len());

    // Scroll until the last card has been in view
    let viewport = host.document().viewport();
    let step = options
        .scroll_step
        .unwrap_or(viewport.height / 2.0)
        .max(1.0);
    let page_bottom = cards
        .iter()
        .filter_map(|card| host.document().layout(card.element))
        .map(|layout| layout.bottom())
        .fold(0.0_f32, f32::max);
    let max_scroll = (page_bottom - viewport.height).max(0.0);
    let mut scroll_y = 0.0;
    while scroll_y < max_scroll {
        scroll_y = (scroll_y + step).min(max_scroll);
        host.scroll_to(scroll_y);
    }

    for &index in &options.hover {
        let Some(card) = cards.get(index) else {
            bail!("No card at index {} (page has {})", index, cards.len());
        };
        host.pointer_enter(card.element);
        host.scheduler()
            .advance(u64::from(config.hover.throttle_ms));
        info!("Hovered card {}", index);
    }
    for &index in &options.click {
        let Some(card) = cards.get(index) else {
            bail!("No card at index {} (page has {})", index, cards.len());
        };
        host.click(card.element);
    }

    // Hovered cards stay hovered; no pointer leaves
    host.scheduler().run_until_idle();

    let report = app.report();
    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    Ok(())
}

fn cmd_check(page: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let manifest = load_page(page)?;

    let document = Document::new();
    let built = manifest.build(&document)?;

    let cards = document
        .query_selector_all(&config.selectors.card, None)
        .with_context(|| format!("Card selector '{}' is invalid", config.selectors.card))?;
    if cards.len() != built.len() {
        bail!(
            "Card selector '{}' matched {} elements, page has {} links",
            config.selectors.card,
            cards.len(),
            built.len()
        );
    }

    let mut untitled = 0;
    for card in &cards {
        let title = document
            .query_selector(&config.selectors.title, Some(*card))
            .with_context(|| format!("Title selector '{}' is invalid", config.selectors.title))?;
        if title.is_none() {
            untitled += 1;
        }
    }

    if cards.is_empty() {
        warn!("Page has no links");
    }
    if untitled > 0 {
        warn!("{} card(s) have no title and will be logged as 'Unknown'", untitled);
    }

    println!(
        "ok: '{}' with {} cards ({} untitled)",
        manifest.title,
        cards.len(),
        untitled
    );
    Ok(())
}
