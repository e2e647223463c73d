use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use go_mcts::data::augmentation::all_symmetries;
use go_mcts::game::coords::to_gtp;
use go_mcts::logging::setup_logging;
use go_mcts::player::MctsPlayer;
use go_mcts::recording::{TrainingExample, TrainingExampleWriter};
use go_mcts::{
    Color, CompetitivePlayer, Evaluator, GoBoard, MctsConfig, MctsPlayerInterface, PlayerInterface,
    Position,
};

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Time-managed deterministic play
    Cgos,
    /// Self-play with stochastic opening and training records
    Kgs,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DeviceArg {
    Cpu,
    Gpu,
}

#[derive(Parser, Debug)]
#[command(name = "go_mcts", version, about = "Self-play driver for the Go MCTS engine")]
struct Config {
    /// Game mode
    #[arg(long, value_enum, default_value = "cgos")]
    mode: Mode,

    /// Device for the network
    #[arg(long, value_enum, default_value = "cpu")]
    device: DeviceArg,

    #[arg(long, default_value_t = 9)]
    board_size: usize,

    #[arg(long, default_value_t = go_mcts::game::DEFAULT_KOMI)]
    komi: f32,

    /// Number of self-play games
    #[arg(short = 'g', long, default_value_t = 1)]
    num_games: usize,

    /// JSON search config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    num_readouts: Option<u32>,

    #[arg(long)]
    parallel_readouts: Option<usize>,

    #[arg(long)]
    seconds_per_move: Option<f64>,

    #[arg(long)]
    resign_threshold: Option<f32>,

    /// "minimal" or "extended"
    #[arg(long)]
    feature_set: Option<String>,

    #[arg(long)]
    seed: Option<u64>,

    /// Mix Dirichlet noise into root priors
    #[arg(long, default_value_t = false)]
    inject_noise: bool,

    /// TorchScript model (needs the `torch` feature); uniform priors otherwise
    #[arg(long)]
    model: Option<PathBuf>,

    /// Write one SGF per game here instead of printing it
    #[arg(long)]
    sgf_dir: Option<PathBuf>,

    /// Append self-play training examples to this CSV (kgs mode)
    #[arg(long)]
    training_csv: Option<PathBuf>,

    /// Write all eight board symmetries of each training example
    #[arg(long, default_value_t = false)]
    augment: bool,

    /// Log to rotating files in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Config {
    fn mcts_config(&self) -> Result<MctsConfig, go_mcts::ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => MctsConfig::load(path)?,
            None => MctsConfig::default(),
        };
        if let Some(v) = self.num_readouts {
            cfg.num_readouts = v;
        }
        if let Some(v) = self.parallel_readouts {
            cfg.parallel_readouts = v;
        }
        if let Some(v) = self.seconds_per_move {
            cfg.seconds_per_move = v;
        }
        if let Some(v) = self.resign_threshold {
            cfg.resign_threshold = v;
        }
        if let Some(v) = &self.feature_set {
            cfg.feature_set = v.clone();
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        cfg.inject_noise |= self.inject_noise;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(feature = "torch")]
fn build_evaluator(config: &Config) -> Result<Box<dyn Evaluator>, Box<dyn std::error::Error>> {
    use go_mcts::neural::TchEvaluator;

    let device = match config.device {
        DeviceArg::Cpu => tch::Device::Cpu,
        DeviceArg::Gpu => tch::Device::cuda_if_available(),
    };
    match &config.model {
        Some(path) => Ok(Box::new(TchEvaluator::load(path, device)?)),
        None => {
            log::warn!("⚠️ No --model given, searching with uniform priors");
            Ok(Box::new(go_mcts::UniformEvaluator))
        }
    }
}

#[cfg(not(feature = "torch"))]
fn build_evaluator(config: &Config) -> Result<Box<dyn Evaluator>, Box<dyn std::error::Error>> {
    if config.model.is_some() || config.device == DeviceArg::Gpu {
        log::warn!("⚠️ Built without the `torch` feature: ignoring --model/--device, using uniform priors");
    }
    Ok(Box::new(go_mcts::UniformEvaluator))
}

/// Plays one game to the end; the result is set on the player.
fn play_game<PL>(player: &mut PL) -> go_mcts::Result<()>
where
    PL: MctsPlayerInterface<Board = GoBoard>,
{
    player.initialize_game(None);
    loop {
        let position = player.get_position();
        if position.is_game_over() || position.move_number() as usize >= 2 * position.squares() {
            // The player records a scored result from the score itself; a tie is a draw.
            let winner = if position.score() > 0.0 {
                Color::Black
            } else {
                Color::White
            };
            player.set_result(winner, false);
            return Ok(());
        }

        let fmove = player.suggest_move()?;
        if player.should_resign() {
            let loser = player.get_position().to_play();
            log::info!("🏳️ {} resigns", loser);
            player.set_result(loser.opponent(), true);
            return Ok(());
        }

        let position = player.get_position();
        log::info!(
            "Move {}: {} {}",
            position.move_number() + 1,
            position.to_play(),
            to_gtp(fmove, position.board_size())
        );
        player.play_move(fmove)?;
    }
}

fn emit_sgf(sgf: &str, dir: Option<&Path>, game_id: &str) -> std::io::Result<()> {
    match dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = dir.join(format!("{}.sgf", game_id));
            fs::write(&path, sgf)?;
            log::info!("💾 SGF written to {}", path.display());
        }
        None => println!("{}", sgf),
    }
    Ok(())
}

fn record_training<E: Evaluator>(
    player: &MctsPlayer<GoBoard, E>,
    writer: &mut TrainingExampleWriter,
    game_id: &str,
    augment: bool,
) -> go_mcts::Result<()> {
    let features = player.search().config().features()?;
    let mut examples: Vec<TrainingExample> = Vec::new();
    for played in player.extract_data()? {
        let move_number = played.position.move_number();
        let encoded = features.encode(&played.position);
        if augment {
            examples.extend(all_symmetries(&encoded, &played.pi).into_iter().map(|(features, pi)| {
                TrainingExample {
                    move_number,
                    features,
                    pi,
                    outcome: played.outcome,
                }
            }));
        } else {
            examples.push(TrainingExample {
                move_number,
                features: encoded,
                pi: played.pi,
                outcome: played.outcome,
            });
        }
    }
    writer.write_game(game_id, &examples)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    let _logger = setup_logging("info", config.log_dir.as_deref())?;

    log::info!("{} v{}: {}", go_mcts::NAME, go_mcts::VERSION, go_mcts::DESCRIPTION);
    let mcts_config = config.mcts_config()?;
    let evaluator = build_evaluator(&config)?;
    let board = GoBoard::new(config.board_size, config.komi);
    log::info!(
        "✅ {}x{} board, mode {:?}, features {}",
        config.board_size,
        config.board_size,
        config.mode,
        mcts_config.feature_set
    );

    let mut writer = match (&config.training_csv, config.mode) {
        (Some(path), Mode::Kgs) => Some(TrainingExampleWriter::create(path)?),
        (Some(_), Mode::Cgos) => {
            log::warn!("⚠️ --training-csv is only used in kgs mode");
            None
        }
        _ => None,
    };

    match config.mode {
        Mode::Cgos => {
            let mut player = CompetitivePlayer::new(board, evaluator, mcts_config)?;
            for game in 0..config.num_games {
                play_game(&mut player)?;
                let game_id = TrainingExampleWriter::new_game_id();
                log::info!("Game {}: {}", game + 1, player.get_result_string());
                emit_sgf(&player.to_sgf(true), config.sgf_dir.as_deref(), &game_id)?;
            }
        }
        Mode::Kgs => {
            let mut player = MctsPlayer::new(board, evaluator, mcts_config)?;
            for game in 0..config.num_games {
                play_game(&mut player)?;
                let game_id = TrainingExampleWriter::new_game_id();
                log::info!("Game {}: {}", game + 1, player.get_result_string());
                emit_sgf(&player.to_sgf(true), config.sgf_dir.as_deref(), &game_id)?;
                if let Some(writer) = writer.as_mut() {
                    record_training(&player, writer, &game_id, config.augment)?;
                }
            }
        }
    }
    Ok(())
}
