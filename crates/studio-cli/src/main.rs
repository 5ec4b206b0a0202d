use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::DynamicImage;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use studio_contracts::events::{
    EventPayload, EventWriter, RUN_FAILED, RUN_FINISHED, RUN_STARTED, STEP_FINISHED, STEP_STARTED,
};
use studio_contracts::models::{ModelRegistry, Step, StepModels};
use studio_contracts::runs::artifacts::{
    run_timestamp, write_text_artifact, ArtifactNamer, PROMPT_LABEL, RENDER_LABEL, SKETCHIFY_LABEL,
    SKETCH_LABEL,
};
use studio_contracts::runs::summary::{now_utc_iso, write_summary, RunSummary};
use studio_contracts::{CustomPrompt, RoomDescription};
use studio_engine::{codec, BlockingPool, ProviderKind, RoomPipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "studio", version, about = "Room render pipeline from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Description → enhanced prompt → sketch → render.
    Run(RunArgs),
    /// Render an existing sketch.
    Render(RenderArgs),
    /// Turn a picture into a pencil sketch.
    Sketchify(SketchifyArgs),
}

#[derive(Debug, Args)]
struct OutputArgs {
    #[arg(long, env = "OUTPUT_DIR", default_value = "outputs")]
    out: PathBuf,
    /// Use the offline provider instead of Gemini.
    #[arg(long)]
    dryrun: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Room description; read from stdin when omitted.
    #[arg(long)]
    prompt: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct RenderArgs {
    #[arg(long)]
    sketch: PathBuf,
    /// Replaces the built-in render instruction.
    #[arg(long)]
    prompt: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct SketchifyArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    prompt: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Run(_) => "run",
            Command::Render(_) => "render",
            Command::Sketchify(_) => "sketchify",
        }
    }

    fn output(&self) -> &OutputArgs {
        match self {
            Command::Run(args) => &args.output,
            Command::Render(args) => &args.output,
            Command::Sketchify(args) => &args.output,
        }
    }
}

fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studio_engine=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(err) = run() {
        eprintln!("studio error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = cli.command.output();
    let provider = resolve_provider(output.dryrun, std::env::var("STUDIO_PROVIDER").ok())?;
    let models = match provider {
        ProviderKind::Gemini => StepModels::from_env(),
        ProviderKind::Dryrun => provider.default_models(),
    };
    for warning in models.check(&ModelRegistry::default()) {
        eprintln!("warning: {warning}");
    }

    // Built before the runtime so the blocking HTTP client is never created
    // or dropped inside async context.
    let client = studio_engine::client_from_env(provider).context("failed to build client")?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let pipeline = RoomPipeline::new(Arc::clone(&client), models, BlockingPool::default());
    let mut session = Session::start(&output.out, cli.command.name(), pipeline.client_name())?;

    let result = match cli.command {
        Command::Run(args) => description_from(args.prompt).and_then(|description| {
            runtime.block_on(run_text(&pipeline, &mut session, &description))
        }),
        Command::Render(args) => load_image(&args.sketch).and_then(|sketch| {
            let custom_prompt = CustomPrompt::from_optional(args.prompt.as_deref());
            runtime.block_on(run_render(
                &pipeline,
                &mut session,
                &sketch,
                custom_prompt.as_ref(),
            ))
        }),
        Command::Sketchify(args) => load_image(&args.image).and_then(|image| {
            runtime.block_on(run_sketchify(
                &pipeline,
                &mut session,
                &image,
                args.prompt.as_deref(),
            ))
        }),
    };

    let result = session.finish(result);
    drop(pipeline);
    drop(runtime);
    drop(client);
    result
}

fn resolve_provider(dryrun: bool, configured: Option<String>) -> Result<ProviderKind> {
    if dryrun {
        return Ok(ProviderKind::Dryrun);
    }
    match configured {
        Some(raw) if !raw.trim().is_empty() => raw
            .parse::<ProviderKind>()
            .map_err(anyhow::Error::msg)
            .context("invalid STUDIO_PROVIDER"),
        _ => Ok(ProviderKind::Gemini),
    }
}

fn description_from(prompt: Option<String>) -> Result<RoomDescription> {
    let raw = match prompt {
        Some(prompt) => prompt,
        None => read_description(io::stdin().lock(), &mut io::stderr())?,
    };
    Ok(RoomDescription::parse(raw)?)
}

/// Prompts on `prompt_out` and reads one line from `input`.
fn read_description(mut input: impl BufRead, prompt_out: &mut impl Write) -> Result<String> {
    write!(prompt_out, "Describe the room: ")?;
    prompt_out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("no room description given (use --prompt or type one on stdin)");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn load_image(path: &Path) -> Result<DynamicImage> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    codec::decode(&bytes).with_context(|| format!("failed to decode {}", path.display()))
}

fn save_png(path: &Path, image: &DynamicImage) -> Result<()> {
    let bytes = codec::encode_png(image)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

/// Per-invocation bookkeeping: artifact names, `events.jsonl` and
/// `summary.json` in the output directory.
struct Session {
    namer: ArtifactNamer,
    events: EventWriter,
    command: &'static str,
    started_at: String,
    models: IndexMap<String, String>,
    artifacts: Vec<PathBuf>,
    step_clock: Option<Instant>,
}

impl Session {
    fn start(out: &Path, command: &'static str, provider: &str) -> Result<Self> {
        Self::start_at(
            out,
            command,
            provider,
            run_timestamp(&chrono::Local::now()),
        )
    }

    fn start_at(out: &Path, command: &'static str, provider: &str, timestamp: String) -> Result<Self> {
        fs::create_dir_all(out)
            .with_context(|| format!("failed to create output directory {}", out.display()))?;
        let session = Self {
            namer: ArtifactNamer::new(out, timestamp),
            events: EventWriter::new(out.join("events.jsonl"), uuid::Uuid::new_v4().to_string()),
            command,
            started_at: now_utc_iso(),
            models: IndexMap::new(),
            artifacts: Vec::new(),
            step_clock: None,
        };
        let mut payload = EventPayload::new();
        payload.insert("command".to_string(), json!(command));
        payload.insert("provider".to_string(), json!(provider));
        session.events.emit(RUN_STARTED, payload)?;
        Ok(session)
    }

    fn step_started(&mut self, step: Step, model: &str) -> Result<()> {
        self.step_clock = Some(Instant::now());
        self.events
            .emit_step(STEP_STARTED, step, model, EventPayload::new())?;
        Ok(())
    }

    fn step_finished(&mut self, step: Step, model: &str, artifact: PathBuf) -> Result<()> {
        let mut extra = EventPayload::new();
        extra.insert(
            "artifact".to_string(),
            Value::String(artifact.display().to_string()),
        );
        if let Some(started) = self.step_clock.take() {
            extra.insert(
                "elapsed_ms".to_string(),
                json!(started.elapsed().as_millis() as u64),
            );
        }
        self.events.emit_step(STEP_FINISHED, step, model, extra)?;
        self.models.insert(step.tag().to_string(), model.to_string());
        self.artifacts.push(artifact);
        Ok(())
    }

    /// Records the outcome and hands back `result` unchanged. Failing to
    /// write the run files is logged, never allowed to mask the run error.
    fn finish(self, result: Result<()>) -> Result<()> {
        if let Err(err) = self.record(&result) {
            eprintln!("warning: failed to record run outcome: {err:#}");
        }
        result
    }

    fn record(self, result: &Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.events.emit(RUN_FINISHED, EventPayload::new())?;
            }
            Err(err) => {
                let mut payload = EventPayload::new();
                payload.insert("error".to_string(), Value::String(format!("{err:#}")));
                self.events.emit(RUN_FAILED, payload)?;
            }
        }
        let summary = RunSummary {
            run_id: self.events.run_id().to_string(),
            command: self.command.to_string(),
            started_at: self.started_at,
            finished_at: now_utc_iso(),
            models: self.models,
            artifacts: self
                .artifacts
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
        };
        let mut extra = Map::new();
        extra.insert("success".to_string(), Value::Bool(result.is_ok()));
        write_summary(&self.namer.dir().join("summary.json"), &summary, Some(&extra))
    }
}

async fn run_text(
    pipeline: &RoomPipeline,
    session: &mut Session,
    description: &RoomDescription,
) -> Result<()> {
    let models = pipeline.models().clone();

    session.step_started(Step::Enhance, &models.step1)?;
    println!("[1/3] Enhancing prompt with {}...", models.step1);
    let enhanced = pipeline.enhance(description).await?;
    let prompt_path = session.namer.path(&models.step1, PROMPT_LABEL, "txt");
    write_text_artifact(&prompt_path, &enhanced)?;
    println!("      saved {}", prompt_path.display());
    session.step_finished(Step::Enhance, &models.step1, prompt_path)?;

    session.step_started(Step::Sketch, &models.step2)?;
    println!("[2/3] Drawing sketch with {}...", models.step2);
    let sketch = pipeline.sketch(&enhanced).await?;
    let sketch_path = session.namer.path(&models.step2, SKETCH_LABEL, "png");
    save_png(&sketch_path, &sketch)?;
    println!("      saved {}", sketch_path.display());
    session.step_finished(Step::Sketch, &models.step2, sketch_path)?;

    session.step_started(Step::Render, &models.step3)?;
    println!("[3/3] Rendering with {}...", models.step3);
    let render = pipeline.render(&sketch, None).await?;
    let render_path = session.namer.path(&models.step3, RENDER_LABEL, "png");
    save_png(&render_path, &render)?;
    println!("      saved {}", render_path.display());
    session.step_finished(Step::Render, &models.step3, render_path)?;
    Ok(())
}

async fn run_render(
    pipeline: &RoomPipeline,
    session: &mut Session,
    sketch: &DynamicImage,
    custom_prompt: Option<&CustomPrompt>,
) -> Result<()> {
    let model = pipeline.models().step3.clone();
    session.step_started(Step::Render, &model)?;
    println!("Rendering sketch with {model}...");
    let render = pipeline.render(sketch, custom_prompt).await?;
    let path = session.namer.path(&model, RENDER_LABEL, "png");
    save_png(&path, &render)?;
    println!("saved {}", path.display());
    session.step_finished(Step::Render, &model, path)
}

async fn run_sketchify(
    pipeline: &RoomPipeline,
    session: &mut Session,
    image: &DynamicImage,
    instruction: Option<&str>,
) -> Result<()> {
    let model = pipeline.models().step2.clone();
    session.step_started(Step::Sketch, &model)?;
    println!("Sketching image with {model}...");
    let outcome = pipeline.sketch_from_image(image, instruction).await?;
    if let Some(notes) = &outcome.notes {
        println!("{notes}");
    }
    let path = session.namer.path(&model, SKETCHIFY_LABEL, "png");
    save_png(&path, &outcome.sketch)?;
    println!("saved {}", path.display());
    session.step_finished(Step::Sketch, &model, path)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use clap::CommandFactory;
    use image::{GenericImageView, RgbImage};
    use studio_engine::dryrun::DryrunClient;

    use super::*;

    fn dryrun_pipeline() -> RoomPipeline {
        RoomPipeline::new(
            Arc::new(DryrunClient::new()),
            StepModels::dryrun(),
            BlockingPool::new(1),
        )
    }

    fn read_events(dir: &Path) -> Result<Vec<Value>> {
        fs::read_to_string(dir.join("events.jsonl"))?
            .lines()
            .map(|line| serde_json::from_str(line).map_err(anyhow::Error::from))
            .collect()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_defaults() {
        let cli = Cli::try_parse_from(["studio", "run", "--prompt", "modern living room"]).unwrap();
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.prompt.as_deref(), Some("modern living room"));
                assert!(!args.output.dryrun);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn render_requires_sketch_path() {
        assert!(Cli::try_parse_from(["studio", "render"]).is_err());
        let cli = Cli::try_parse_from([
            "studio", "render", "--sketch", "s.png", "--out", "tmp", "--dryrun",
        ])
        .unwrap();
        assert_eq!(cli.command.name(), "render");
        assert_eq!(cli.command.output().out, PathBuf::from("tmp"));
        assert!(cli.command.output().dryrun);
    }

    #[test]
    fn provider_resolution() -> Result<()> {
        assert_eq!(resolve_provider(true, Some("gemini".into()))?, ProviderKind::Dryrun);
        assert_eq!(resolve_provider(false, None)?, ProviderKind::Gemini);
        assert_eq!(resolve_provider(false, Some("dry-run".into()))?, ProviderKind::Dryrun);
        assert!(resolve_provider(false, Some("openai".into())).is_err());
        Ok(())
    }

    #[test]
    fn description_is_read_from_one_line() -> Result<()> {
        let mut prompt = Vec::new();
        let text = read_description(Cursor::new("cozy attic bedroom\r\nignored\n"), &mut prompt)?;
        assert_eq!(text, "cozy attic bedroom");
        assert_eq!(String::from_utf8(prompt)?, "Describe the room: ");

        assert!(read_description(Cursor::new(""), &mut Vec::new()).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn run_text_writes_named_artifacts_events_and_summary() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let pipeline = dryrun_pipeline();
        let mut session =
            Session::start_at(temp.path(), "run", "dryrun", "20251205_152301".to_string())?;
        let description = RoomDescription::parse("modern living room")?;

        let result = run_text(&pipeline, &mut session, &description).await;
        session.finish(result)?;

        let prompt_path = temp
            .path()
            .join("20251205_152301_dryrun-text-1_step1_prompt.txt");
        let sketch_path = temp
            .path()
            .join("20251205_152301_dryrun-image-1_step2_sketch.png");
        let render_path = temp
            .path()
            .join("20251205_152301_dryrun-image-1_step3_render.png");
        assert!(fs::read_to_string(&prompt_path)?.contains("modern living room"));
        assert_eq!(load_image(&sketch_path)?.dimensions(), (512, 512));
        assert_eq!(load_image(&render_path)?.dimensions(), (512, 512));

        let events = read_events(temp.path())?;
        let types: Vec<&str> = events
            .iter()
            .filter_map(|event| event["type"].as_str())
            .collect();
        assert_eq!(
            types,
            vec![
                RUN_STARTED,
                STEP_STARTED,
                STEP_FINISHED,
                STEP_STARTED,
                STEP_FINISHED,
                STEP_STARTED,
                STEP_FINISHED,
                RUN_FINISHED,
            ]
        );
        let run_id = events[0]["run_id"].clone();
        assert!(events.iter().all(|event| event["run_id"] == run_id));
        assert_eq!(events[2]["step"], "step1");
        assert!(events[2]["elapsed_ms"].is_u64());

        let summary: Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join("summary.json"))?)?;
        assert_eq!(summary["command"], "run");
        assert_eq!(summary["success"], true);
        assert_eq!(summary["models"]["step3"], "dryrun-image-1");
        assert_eq!(summary["artifacts"].as_array().map(Vec::len), Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn render_keeps_sketch_size() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let pipeline = dryrun_pipeline();
        let mut session =
            Session::start_at(temp.path(), "render", "dryrun", "20250101_000000".to_string())?;
        let sketch = DynamicImage::ImageRgb8(RgbImage::new(80, 40));
        let custom = CustomPrompt::from_optional(Some("Moody evening light"));

        run_render(&pipeline, &mut session, &sketch, custom.as_ref()).await?;

        let path = temp
            .path()
            .join("20250101_000000_dryrun-image-1_step3_render.png");
        assert_eq!(load_image(&path)?.dimensions(), (80, 40));
        Ok(())
    }

    #[tokio::test]
    async fn sketchify_writes_sketch_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let pipeline = dryrun_pipeline();
        let mut session =
            Session::start_at(temp.path(), "sketchify", "dryrun", "20250101_000000".to_string())?;
        let photo = DynamicImage::ImageRgb8(RgbImage::new(30, 20));

        run_sketchify(&pipeline, &mut session, &photo, None).await?;

        let path = temp
            .path()
            .join("20250101_000000_dryrun-image-1_sketch.png");
        assert_eq!(load_image(&path)?.dimensions(), (30, 20));
        Ok(())
    }

    #[test]
    fn failed_run_is_recorded() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let session = Session::start_at(temp.path(), "run", "dryrun", "20250101_000000".to_string())?;

        let err = session
            .finish(Err(anyhow::anyhow!("Sketch image not generated.")))
            .unwrap_err();
        assert_eq!(err.to_string(), "Sketch image not generated.");

        let events = read_events(temp.path())?;
        let last = events.last().expect("at least one event");
        assert_eq!(last["type"], RUN_FAILED);
        assert_eq!(last["error"], "Sketch image not generated.");

        let summary: Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join("summary.json"))?)?;
        assert_eq!(summary["success"], false);
        Ok(())
    }

    #[test]
    fn run_error_survives_unwritable_output() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let out = temp.path().join("out");
        let session = Session::start_at(&out, "render", "dryrun", "20250101_000000".to_string())?;
        // A directory where summary.json should go makes the summary write fail.
        fs::create_dir_all(out.join("summary.json"))?;

        let err = session
            .finish(Err(anyhow::anyhow!("Rendered image not generated.")))
            .unwrap_err();
        assert_eq!(err.to_string(), "Rendered image not generated.");
        Ok(())
    }
}
