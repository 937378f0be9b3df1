use std::path::{Path, PathBuf};
use std::process::ExitCode;

use card_vision::config::{AppConfig, ConfigError};
use card_vision::core::{Card, CardParseError, Frame};
use card_vision::synthetic::{render_table, TableScene};
use card_vision::table::{
    AdaptiveLearner, ExternalAmounts, LearnError, PlatformProfile, ProfileError, Promotion,
    TableReader,
};
use card_vision::templates::{TemplateStore, TemplateStoreError};
use card_vision::Session;
use clap::Parser;

#[derive(Parser)]
#[command(author, version, about = "Read cards off poker table screenshots", long_about = None)]
enum Command {
    #[command(about = "Read one still image and print its snapshot as JSON")]
    Read {
        /// Platform profile (JSON). Defaults to the built-in classic profile.
        #[arg(long)]
        profile: Option<PathBuf>,
        #[arg(long)]
        templates: PathBuf,
        #[arg(required = true)]
        image: PathBuf,
    },
    #[command(about = "Run a periodic session from an app config, one JSON line per snapshot")]
    Run {
        #[arg(long)]
        config: PathBuf,
        /// Stop after this many cycles.
        #[arg(long)]
        cycles: Option<u64>,
    },
    #[command(about = "List confirmed and provisional templates", alias = "ls")]
    Templates {
        #[arg(long)]
        templates: PathBuf,
    },
    #[command(about = "Label a provisional template with its card")]
    Label {
        #[arg(long)]
        templates: PathBuf,
        #[arg(long)]
        profile: Option<PathBuf>,
        #[arg(required = true)]
        id: u64,
        #[arg(required = true)]
        card: String,
    },
    #[command(about = "Render a synthetic table frame")]
    Render {
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Hero cards, e.g. "Ah,Kd".
        #[arg(long, default_value = "")]
        hero: String,
        /// Board cards, e.g. "Qs,Jc,Th".
        #[arg(long, default_value = "")]
        board: String,
        #[arg(long, default_value_t = card_vision::synthetic::DEFAULT_WIDTH)]
        width: u32,
        #[arg(long, default_value_t = card_vision::synthetic::DEFAULT_HEIGHT)]
        height: u32,
        #[arg(required = true)]
        out: PathBuf,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Store(#[from] TemplateStoreError),
    #[error(transparent)]
    Learn(#[from] LearnError),
    #[error(transparent)]
    Card(#[from] CardParseError),
}

fn main() -> ExitCode {
    let cmd = Command::parse();
    init_logging(&cmd);
    match run(cmd) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "tracing")]
fn init_logging(_cmd: &Command) {
    card_vision::init_tracing(false);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cmd: &Command) {
    use log::LevelFilter;

    let default = match cmd {
        Command::Run { config, .. } => AppConfig::load_json(config)
            .ok()
            .and_then(|c| c.log_level)
            .and_then(|l| card_vision::core::parse_level(&l))
            .unwrap_or(LevelFilter::Info),
        _ => LevelFilter::Warn,
    };
    let _ = card_vision::core::init_from_env(default);
}

fn run(cmd: Command) -> Result<(), CliError> {
    match cmd {
        Command::Read {
            profile,
            templates,
            image,
        } => read(profile.as_deref(), templates, &image),
        Command::Run { config, cycles } => run_session(&config, cycles),
        Command::Templates { templates } => list_templates(templates),
        Command::Label {
            templates,
            profile,
            id,
            card,
        } => label(templates, profile.as_deref(), id, &card),
        Command::Render {
            profile,
            hero,
            board,
            width,
            height,
            out,
        } => render(profile.as_deref(), &hero, &board, width, height, &out),
    }
}

fn load_profile(path: Option<&Path>) -> Result<PlatformProfile, ProfileError> {
    match path {
        Some(p) => PlatformProfile::load_json(p),
        None => Ok(PlatformProfile::classic()),
    }
}

fn read(profile: Option<&Path>, templates: PathBuf, image: &Path) -> Result<(), CliError> {
    let reader = TableReader::new(&load_profile(profile)?)?;
    let mut store = TemplateStore::open(templates)?;
    let img = image::ImageReader::open(image)?.decode()?.to_rgb8();

    let reading = reader.read_frame(&Frame::now(img), &mut store);
    for id in reading.new_provisionals() {
        log::info!("new provisional template #{id}; label it with `card-vision label {id} <CARD>`");
    }
    let record = reading.snapshot(ExternalAmounts::default()).to_record();
    println!("{}", serde_json::to_string_pretty(&record)?);

    if let Err(e) = reader.learner().flush(&mut store) {
        log::warn!("could not save templates: {e}");
    }
    Ok(())
}

fn run_session(config: &Path, cycles: Option<u64>) -> Result<(), CliError> {
    let cfg = AppConfig::load_json(config)?;
    let reader = TableReader::new(&cfg.load_profile()?)?;
    let store = cfg.open_store()?;
    let source = cfg.open_source()?;

    let mut session = Session::new(reader, store, source, cfg.session_config(cycles));
    let mut write_error = None;
    session.run(|snapshot| {
        if write_error.is_some() {
            return;
        }
        match serde_json::to_string(&snapshot.to_record()) {
            Ok(line) => println!("{line}"),
            Err(e) => write_error = Some(e),
        }
    });
    match write_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn list_templates(templates: PathBuf) -> Result<(), CliError> {
    let store = TemplateStore::open(templates)?;
    for t in store.confirmed() {
        println!(
            "{}\t{}x{}\t{} observations\tavg {:.3}\tlast seen {}",
            t.card,
            t.image.width,
            t.image.height,
            t.observations,
            t.average_confidence(),
            t.last_seen.to_rfc3339()
        );
    }
    for p in store.provisional() {
        println!(
            "#{}\t{}x{}\t{} observations\tavg {:.3}\tfirst seen {}",
            p.id,
            p.image.width,
            p.image.height,
            p.observations,
            p.history.average(),
            p.first_seen.to_rfc3339()
        );
    }
    Ok(())
}

fn label(templates: PathBuf, profile: Option<&Path>, id: u64, card: &str) -> Result<(), CliError> {
    let card: Card = card.parse()?;
    let learner = AdaptiveLearner::new(load_profile(profile)?.learner);
    let mut store = TemplateStore::open(templates)?;
    match learner.confirm(&mut store, id, card)? {
        Promotion::Promoted => println!("#{id} -> {card}"),
        Promotion::Merged => println!("#{id} merged into {card}"),
    }
    store.save()?;
    Ok(())
}

fn render(
    profile: Option<&Path>,
    hero: &str,
    board: &str,
    width: u32,
    height: u32,
    out: &Path,
) -> Result<(), CliError> {
    let profile = load_profile(profile)?;
    let scene = TableScene::parse(hero, board)?;
    render_table(&profile, &scene, width, height).save(out)?;
    Ok(())
}
