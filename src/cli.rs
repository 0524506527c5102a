use crate::config::{EngineConfig, load_config};
use crate::document::LayoutDocument;
use crate::engine::{Action, Engine, TimedAction};
use crate::layout_dump::write_layout_dump;
use crate::persistence::MemoryStore;
use crate::render::{RenderOptions, render_svg, write_output_svg};
use crate::theme::Theme;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Upper bound on scheduled-task rounds when flushing after a replay.
const MAX_FLUSH_ROUNDS: usize = 8;

#[derive(Parser, Debug)]
#[command(
    name = "lcanvas",
    version,
    about = "Inspect, arrange and replay lesson canvas layouts"
)]
pub struct Args {
    /// Layout document (.json) or '-' for stdin
    #[arg(short = 'i', long = "input", conflicts_with = "template")]
    pub input: Option<PathBuf>,

    /// Start from the two-column starter lesson instead of an input document
    #[arg(long = "template")]
    pub template: bool,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Engine config file (JSON or JSON5, camelCase keys)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Arrange every item with the automatic placement planner
    #[arg(short = 'a', long = "arrange")]
    pub arrange: bool,

    /// Seed for the placement planner's random stream
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Container width for --arrange. Defaults to the canvas width.
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Container height for --arrange. Defaults to the canvas height.
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// JSON array of timed actions to replay through the engine
    #[arg(short = 's', long = "script")]
    pub script: Option<PathBuf>,

    /// Color palette for SVG/PNG output
    #[arg(short = 't', long = "theme", value_enum, default_value = "builder")]
    pub theme: ThemeChoice,

    /// Omit the background grid
    #[arg(long = "noGrid")]
    pub no_grid: bool,

    /// Also write a paint-order layout dump to this path
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ThemeChoice {
    Builder,
    Board,
}

impl ThemeChoice {
    fn theme(self) -> Theme {
        match self {
            ThemeChoice::Builder => Theme::builder(),
            ThemeChoice::Board => Theme::board(),
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let doc = if args.template {
        LayoutDocument::lesson_template(&config)
    } else {
        let input = read_input(args.input.as_deref())?;
        LayoutDocument::from_json(&input, &config).context("Invalid layout document")?
    };

    let mut engine = Engine::new(doc, config.clone(), MemoryStore::new());
    if let Some(seed) = args.seed {
        engine.reseed(seed);
    }

    let mut clock = 0;
    if args.arrange {
        let canvas = engine.document().canvas;
        let width = args.width.unwrap_or(canvas.w);
        let height = args.height.unwrap_or(canvas.h);
        engine.dispatch(Action::Arrange { width, height }, clock)?;
    }
    if let Some(script) = args.script.as_deref() {
        clock = replay_script(&mut engine, script, clock)?;
    }
    flush_scheduled(&mut engine, clock)?;

    let writes = &engine.sink().writes;
    if !writes.is_empty() {
        tracing::info!(
            writes = writes.len(),
            published = engine.sink().published.len(),
            "cli: replay persisted snapshots"
        );
    }

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, engine.document(), engine.last_placement())?;
    }

    match args.output_format {
        OutputFormat::Json => {
            let json = engine.document().to_json()?;
            write_output_text(&json, args.output.as_deref())?;
        }
        OutputFormat::Svg => {
            let svg = render(&engine, &config, &args);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&engine, &config, &args, &output)?;
        }
    }
    Ok(())
}

fn render(engine: &Engine<MemoryStore>, config: &EngineConfig, args: &Args) -> String {
    let highlight = engine
        .last_placement()
        .map(|placement| {
            placement
                .items
                .iter()
                .filter(|placed| !placed.is_random())
                .map(|placed| placed.id.clone())
                .collect()
        })
        .unwrap_or_default();
    let options = RenderOptions {
        grid_size: (!args.no_grid).then_some(config.snap.grid_size),
        guides: engine.guides().clone(),
        selected: engine.selected().map(str::to_string),
        highlight,
    };
    render_svg(engine.document(), &args.theme.theme(), &options)
}

#[cfg(feature = "png")]
fn write_png(
    engine: &Engine<MemoryStore>,
    config: &EngineConfig,
    args: &Args,
    output: &Path,
) -> Result<()> {
    let svg = render(engine, config, args);
    let canvas = engine.document().canvas;
    crate::render::write_output_png(&svg, output, canvas.w, canvas.h)
}

#[cfg(not(feature = "png"))]
fn write_png(
    _engine: &Engine<MemoryStore>,
    _config: &EngineConfig,
    _args: &Args,
    _output: &Path,
) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

/// Replays a script of timed actions. Returns the last host time seen.
fn replay_script(engine: &mut Engine<MemoryStore>, path: &Path, start: u64) -> Result<u64> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let steps: Vec<TimedAction> =
        serde_json::from_str(&contents).context("Invalid action script")?;
    let mut clock = start;
    for (idx, step) in steps.into_iter().enumerate() {
        clock = clock.max(step.at);
        let events = engine
            .dispatch(step.action, clock)
            .with_context(|| format!("Script step {} failed", idx + 1))?;
        tracing::debug!(step = idx + 1, at = clock, events = events.len(), "cli: replayed");
    }
    Ok(clock)
}

/// Runs pending autosave and measure passes so the output reflects them.
fn flush_scheduled(engine: &mut Engine<MemoryStore>, clock: u64) -> Result<()> {
    if engine.session_active() {
        tracing::warn!("cli: script left a session open, releasing it");
        engine.dispatch(Action::PointerUp, clock)?;
    }
    let mut now = clock;
    for _ in 0..MAX_FLUSH_ROUNDS {
        let Some(due) = engine.next_due() else {
            break;
        };
        now = now.max(due);
        engine.tick(now);
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output_text(contents: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, contents)?,
        None => println!("{contents}"),
    }
    Ok(())
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn parses_arrange_flags() {
        let args = Args::parse_from([
            "lcanvas", "-i", "board.json", "--arrange", "--seed", "7", "-w", "1400", "-e", "json",
        ]);
        assert!(args.arrange);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.width, Some(1400.0));
        assert!(matches!(args.output_format, OutputFormat::Json));
    }

    #[test]
    fn template_conflicts_with_input() {
        assert!(Args::try_parse_from(["lcanvas", "--template", "-i", "x.json"]).is_err());
        Args::command().debug_assert();
    }

    #[test]
    fn flush_runs_pending_autosave() {
        let config = EngineConfig::default();
        let mut doc = LayoutDocument::lesson_template(&config);
        for (key, value) in [("title", "Tides"), ("topic", "Oceans"), ("grade", "6"), ("visualTheme", "WAVES")] {
            doc.meta.insert(key.to_string(), value.into());
        }
        let mut engine = Engine::new(doc, config, MemoryStore::new());
        engine
            .dispatch(Action::SetGridSize { size: 40.0 }, 0)
            .unwrap();
        let first = engine.document().ids()[0].clone();
        engine
            .dispatch(Action::DuplicateItem { item_id: first }, 10)
            .unwrap();
        flush_scheduled(&mut engine, 10).unwrap();
        assert_eq!(engine.sink().writes.len(), 1);
        assert_eq!(engine.next_due(), None);
    }
}
