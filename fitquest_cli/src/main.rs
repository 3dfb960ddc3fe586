use chrono::Utc;
use clap::{Parser, Subcommand};
use fitquest_core::*;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fitquest")]
#[command(about = "Skill-map workout trainer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory (journal location)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Load the skill map from a TOML or JSON file
    #[arg(long, global = true)]
    map: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the skill map
    Map,

    /// Work through nodes on the map (default)
    Play {
        /// Node to play; repeat to play several in order
        #[arg(long = "node")]
        nodes: Vec<String>,

        /// Override session length in seconds
        #[arg(long)]
        duration: Option<u32>,

        /// Skip the prompts and answer feedback with this level (hard, normal, easy)
        #[arg(long, conflicts_with = "auto_cancel")]
        auto_feedback: Option<FeedbackLevel>,

        /// Skip the prompts and cancel every session
        #[arg(long, conflicts_with = "auto_feedback")]
        auto_cancel: bool,

        /// Don't write sessions to the journal
        #[arg(long)]
        dry_run: bool,
    },
}

struct PlayOptions {
    settings: SessionSettings,
    tick_interval: Duration,
    auto_feedback: Option<FeedbackLevel>,
    auto_cancel: bool,
}

impl PlayOptions {
    fn is_auto(&self) -> bool {
        self.auto_feedback.is_some() || self.auto_cancel
    }
}

/// Stdin lines, read on a background thread so the countdown can poll them
struct LineInput {
    rx: Receiver<String>,
    pending: VecDeque<String>,
}

impl LineInput {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line.trim().to_string()).is_err() {
                    break;
                }
            }
        });
        Self {
            rx,
            pending: VecDeque::new(),
        }
    }

    /// Next line; end of input reads as an empty line
    fn read_line(&mut self) -> Result<String> {
        io::stdout().flush()?;
        if let Some(line) = self.pending.pop_front() {
            return Ok(line);
        }
        Ok(self.rx.recv().unwrap_or_default())
    }

    /// Wait up to `timeout` for `q`. Other lines are kept for later prompts.
    fn quit_requested(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(line) if line == "q" => true,
            Ok(line) => {
                self.pending.push_back(line);
                false
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                false
            }
        }
    }
}

/// Renderer-side state: the graph plus everything the core doesn't own
struct Player {
    graph: ProgressionGraph,
    score: ScoreBoard,
    journal: Option<JsonlSink>,
    options: PlayOptions,
    input: LineInput,
}

fn main() -> Result<()> {
    fitquest_core::logging::init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let map_path = cli.map.or_else(|| config.map.path.clone());

    let graph = load_graph(map_path)?;

    // Default to an interactive "play"
    let command = cli.command.unwrap_or(Commands::Play {
        nodes: Vec::new(),
        duration: None,
        auto_feedback: None,
        auto_cancel: false,
        dry_run: false,
    });

    match command {
        Commands::Map => {
            display_map(&graph);
            Ok(())
        }
        Commands::Play {
            nodes,
            duration,
            auto_feedback,
            auto_cancel,
            dry_run,
        } => {
            let mut settings = config.session.settings();
            if let Some(secs) = duration {
                settings.duration = chrono::Duration::seconds(i64::from(secs));
            }

            let journal = if dry_run {
                None
            } else {
                let path = Config::journal_path(&data_dir);
                tracing::debug!("Journaling sessions to {:?}", path);
                Some(JsonlSink::new(path))
            };

            let mut player = Player {
                graph,
                score: ScoreBoard::new(config.score.starting_lives),
                journal,
                options: PlayOptions {
                    settings,
                    tick_interval: Duration::from_millis(config.session.tick_interval_ms),
                    auto_feedback,
                    auto_cancel,
                },
                input: LineInput::spawn(),
            };
            cmd_play(&mut player, nodes)
        }
    }
}

fn load_graph(map_path: Option<PathBuf>) -> Result<ProgressionGraph> {
    let owned;
    let map = match map_path {
        Some(path) => {
            owned = MapDefinition::load_from(&path)?;
            &owned
        }
        None => get_default_map(),
    };

    for warning in map.validate() {
        eprintln!("Map warning: {}", warning);
    }

    ProgressionGraph::from_definition(map)
}

fn cmd_play(player: &mut Player, nodes: Vec<String>) -> Result<()> {
    if !nodes.is_empty() {
        for node_id in &nodes {
            if player.score.is_out_of_lives() {
                println!("\nOut of lives!");
                break;
            }
            player.play_node(node_id)?;
        }
    } else {
        display_map(&player.graph);
        loop {
            if player.score.is_out_of_lives() {
                println!("\nOut of lives!");
                break;
            }

            let next = player.graph.next_available().map(|n| n.id.clone());
            let node_id = if player.options.is_auto() {
                match next {
                    Some(id) => id,
                    None => {
                        println!("\nNo available nodes left.");
                        break;
                    }
                }
            } else {
                match prompt_node(&mut player.input, next.as_deref())? {
                    Some(id) => id,
                    None => break,
                }
            };

            match player.play_node(&node_id) {
                Err(e @ Error::NotFound(_)) if !player.options.is_auto() => {
                    println!("\n{}", e);
                }
                result => result?,
            }
        }
    }

    display_summary(player);
    Ok(())
}

impl Player {
    fn play_node(&mut self, node_id: &str) -> Result<()> {
        match self.graph.select(node_id)? {
            SelectResult::Blocked => {
                println!("\n🔒 {} is locked", node_id);
            }
            SelectResult::NoExercise => {
                // Nothing to launch; tapping it simply opens it
                self.graph.mark_completed(node_id, 0)?;
                println!("\n✓ Opened {}", node_id);
            }
            SelectResult::Ready(exercise) => {
                self.run_session(node_id, exercise)?;
            }
        }
        Ok(())
    }

    fn run_session(&mut self, node_id: &str, exercise: Exercise) -> Result<()> {
        let session = SessionController::new(exercise, self.options.settings);
        display_exercise(session.exercise(), &self.options.settings);

        let start = if self.options.auto_cancel {
            false
        } else if self.options.is_auto() {
            true
        } else {
            prompt_start(&mut self.input)?
        };

        if !start {
            return self.cancel_session(node_id, &session);
        }

        session.start(Utc::now())?;
        if !self.options.is_auto() {
            println!("  ('q' + Enter to give up)");
        }

        let event = loop {
            let now = Utc::now();
            let tick = session.tick(now)?;
            if let Some(event) = tick.event {
                break event;
            }
            print!(
                "\r  ⏱  {:>3}s  [{:<20}]",
                session.remaining_time(now)?,
                "#".repeat((tick.progress * 20.0) as usize)
            );
            io::stdout().flush()?;
            if self.input.quit_requested(self.options.tick_interval) {
                println!();
                return self.cancel_session(node_id, &session);
            }
        };

        self.score.apply_completion(&event);
        println!("\n\n✓ Done! +{} XP", event.xp_delta);

        let level = match self.options.auto_feedback {
            Some(level) => level,
            None => prompt_feedback(&mut self.input)?,
        };
        session.record_feedback(level)?;

        let stars = stars_for(level);
        self.graph.mark_completed(node_id, stars)?;
        println!("  {} {}", node_id, star_string(stars));

        self.journal(node_id, &session, event.xp_delta, stars)
    }

    fn cancel_session(&mut self, node_id: &str, session: &SessionController) -> Result<()> {
        session.cancel()?;
        self.score.apply_cancel();
        println!("\n✗ Session canceled ({} lives left)", self.score.lives);
        self.journal(node_id, session, 0, 0)
    }

    fn journal(
        &mut self,
        node_id: &str,
        session: &SessionController,
        xp_awarded: u32,
        stars: u8,
    ) -> Result<()> {
        let Some(ref mut sink) = self.journal else {
            return Ok(());
        };

        let snapshot = session.snapshot();
        let outcome = if snapshot.phase == SessionPhase::Canceled {
            SessionOutcome::Canceled
        } else {
            SessionOutcome::Completed
        };

        sink.append(&SessionRecord {
            session_id: snapshot.session_id,
            node_id: node_id.to_string(),
            exercise_id: snapshot.exercise_id,
            started_at: snapshot.started_at,
            ended_at: Utc::now(),
            outcome,
            feedback: snapshot.feedback,
            xp_awarded,
            stars,
        })
    }
}

/// Stars awarded for how the workout felt
fn stars_for(level: FeedbackLevel) -> u8 {
    match level {
        FeedbackLevel::Hard => 1,
        FeedbackLevel::Normal => 2,
        FeedbackLevel::Easy => 3,
    }
}

fn star_string(stars: u8) -> String {
    let filled = stars.min(3) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(3 - filled))
}

fn display_map(graph: &ProgressionGraph) {
    for section in graph.sections() {
        let Some(first) = section.units.first() else {
            continue;
        };
        println!(
            "\n══ Section {}: {} ══",
            first.label.section_number, section.title
        );

        for unit in &section.units {
            println!("\n  Unit {}: {}", unit.label.unit_number, unit.label.title);
            for node in &unit.nodes {
                let glyph = match node.state {
                    NodeState::Locked => "🔒",
                    NodeState::Available => "▶ ",
                    NodeState::Completed => "✓ ",
                };
                let title = node
                    .exercise
                    .as_ref()
                    .map(|e| e.title.as_str())
                    .unwrap_or("");
                println!(
                    "    {} {:<22} {:<9} {}  {}",
                    glyph,
                    node.id,
                    format!("{:?}", node.kind).to_lowercase(),
                    star_string(node.stars),
                    title
                );
            }
        }
    }
    println!();
}

fn display_exercise(exercise: &Exercise, settings: &SessionSettings) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", exercise.title);
    println!("╰─────────────────────────────────────────╯");
    if !exercise.categories.is_empty() {
        println!("  {}", exercise.categories.join(" · "));
    }
    println!(
        "  Duration: {} seconds, reward {} XP",
        settings.duration.num_seconds(),
        settings.earned_xp
    );
}

fn display_summary(player: &Player) {
    println!("─────────────────────────────────────────");
    println!(
        "  XP: {}   Streak: {}   Lives: {}/{}",
        player.score.xp, player.score.streak, player.score.lives, player.score.max_lives
    );
    println!(
        "  Completed: {}/{}   Stars: {}",
        player.graph.completed_count(),
        player.graph.len(),
        player.graph.total_stars()
    );
}

/// Ask which node to play. `None` means quit.
fn prompt_node(input: &mut LineInput, next: Option<&str>) -> Result<Option<String>> {
    match next {
        Some(id) => print!("Node to play (Enter for {}, 'q' to quit): ", id),
        None => print!("Node to play ('q' to quit): "),
    }
    let line = input.read_line()?;

    Ok(match line.as_str() {
        "q" => None,
        "" => next.map(str::to_string),
        id => Some(id.to_string()),
    })
}

fn prompt_start(input: &mut LineInput) -> Result<bool> {
    print!("Press Enter to start, 'q' + Enter to cancel: ");
    Ok(input.read_line()? != "q")
}

fn prompt_feedback(input: &mut LineInput) -> Result<FeedbackLevel> {
    loop {
        print!("How did it feel? [h]ard / [n]ormal / [e]asy: ");
        let line = input.read_line()?;
        if line.is_empty() {
            return Ok(FeedbackLevel::Normal);
        }
        match line.parse() {
            Ok(level) => return Ok(level),
            Err(e) => println!("{}", e),
        }
    }
}
