mod logging;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use rand::{SeedableRng, rngs::StdRng};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};
use wumpus_world_core::{
    Position,
    agent::{DepthFirstAgent, RouteConstruction},
    config::{PuzzleConfig, WorldConfig},
    map::Bounds,
    puzzle::{Configuration, MoveOutcome, PuzzleWorld},
    world::{ActionResult, Dungeon, load_dungeon_from_string},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Link searches for gold while avoiding pits and the Wumpus
    Dungeon,
    /// Link and the Wumpus are shuffled into a target configuration
    Puzzle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Route {
    /// Follow the route rebuilt from each cell's predecessor
    Backtrace,
    /// Legacy behavior: follow cells in the order the search pushed them
    Discovery,
}

impl From<Route> for RouteConstruction {
    fn from(route: Route) -> Self {
        match route {
            Route::Backtrace => RouteConstruction::Backtrace,
            Route::Discovery => RouteConstruction::DiscoveryOrder,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Which world to run
    #[arg(long, value_enum, default_value_t = Mode::Dungeon)]
    mode: Mode,

    /// Dungeon map file to load instead of generating one
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Grid width
    #[arg(long)]
    width: Option<usize>,

    /// Grid height
    #[arg(long)]
    height: Option<usize>,

    /// Number of Wumpus
    #[arg(long)]
    wumpus: Option<usize>,

    /// Number of pits (dungeon only)
    #[arg(long)]
    pits: Option<usize>,

    /// Number of gold pieces (dungeon only)
    #[arg(long)]
    gold: Option<usize>,

    /// Seed for entity placement; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Milliseconds between turns
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// How Link turns its search into moves
    #[arg(long, value_enum, default_value_t = Route::Backtrace)]
    route: Route,
}

impl Args {
    fn world_config(&self) -> WorldConfig {
        let defaults = WorldConfig::default();
        WorldConfig {
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            wumpus_count: self.wumpus.unwrap_or(defaults.wumpus_count),
            pit_count: self.pits.unwrap_or(defaults.pit_count),
            gold_count: self.gold.unwrap_or(defaults.gold_count),
        }
    }

    fn puzzle_config(&self) -> PuzzleConfig {
        let defaults = PuzzleConfig::default();
        PuzzleConfig {
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            wumpus_count: self.wumpus.unwrap_or(defaults.wumpus_count),
        }
    }
}

enum Simulation {
    Dungeon(Dungeon),
    Puzzle {
        world: PuzzleWorld,
        goal: Configuration,
    },
}

struct App {
    /// The world being simulated.
    simulation: Simulation,
    /// Flag to control the main loop.
    should_quit: bool,
    /// Flag to control if the game is over.
    game_over: bool,
    /// Number of turns taken so far.
    turn: usize,
    /// What happened on the last turn.
    status: String,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let seed = args.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let simulation = match args.mode {
            Mode::Dungeon => {
                let mut dungeon = match &args.map {
                    Some(path) => {
                        let file_string = std::fs::read_to_string(path)
                            .with_context(|| format!("Failed to read map file {}", path.display()))?;
                        load_dungeon_from_string(&file_string)
                            .with_context(|| format!("Failed to load map {}", path.display()))?
                    }
                    None => Dungeon::random(&args.world_config(), &mut rng)
                        .context("Failed to generate dungeon")?,
                };
                dungeon.set_agent(Box::new(DepthFirstAgent::new(args.route.into())));
                Simulation::Dungeon(dungeon)
            }
            Mode::Puzzle => {
                let config = args.puzzle_config();
                let world =
                    PuzzleWorld::random(&config, &mut rng).context("Failed to generate puzzle")?;
                let goal = world
                    .random_goal(&mut rng)
                    .context("Failed to generate puzzle goal")?;
                Simulation::Puzzle { world, goal }
            }
        };
        info!("Started {:?} with seed {seed}", args.mode);

        Ok(App {
            simulation,
            should_quit: false,
            game_over: false,
            turn: 0,
            status: "Ready.".to_string(),
        })
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.game_over {
            return;
        }
        self.turn += 1;
        match &mut self.simulation {
            Simulation::Dungeon(dungeon) => {
                let (action, result) = dungeon.process_turn();
                self.status = match &result {
                    ActionResult::Success => format!("Link moved {action}."),
                    ActionResult::Failure(reason) => format!("Link tried {action}: {reason}"),
                    ActionResult::Win => "Link collected all the gold!".to_string(),
                    ActionResult::Lose => "Link met an unpleasant end.".to_string(),
                };
                if matches!(result, ActionResult::Win | ActionResult::Lose) {
                    self.game_over = true;
                }
            }
            Simulation::Puzzle { world, goal } => {
                let outcome = world.make_a_move(goal);
                self.status = match &outcome {
                    MoveOutcome::Bootstrap(Some(step)) => format!("Bootstrap: {step}"),
                    MoveOutcome::Step(Some(step)) => step.to_string(),
                    MoveOutcome::Bootstrap(None) | MoveOutcome::Step(None) => {
                        "Nothing moved.".to_string()
                    }
                    MoveOutcome::Solved => "Puzzle solved!".to_string(),
                    MoveOutcome::NoPlan => "No plan found.".to_string(),
                };
                if matches!(outcome, MoveOutcome::Solved | MoveOutcome::NoPlan) {
                    self.game_over = true;
                }
            }
        }
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    if let Some(map_file) = &args.map {
        if !map_file.exists() {
            return Err(anyhow::anyhow!(
                "Map file does not exist: {}",
                map_file.display()
            ));
        }
    }

    logging::init()?;

    // Build the world before touching the terminal so errors print normally
    let mut app = App::new(&args)?;

    let mut terminal = setup_terminal()?;
    let tick_rate = Duration::from_millis(args.tick_ms);
    let result = run_app(&mut terminal, &mut app, tick_rate);
    restore_terminal(&mut terminal)?;
    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(60), // Area for the map
            Constraint::Percentage(15), // Area for status/help
            Constraint::Percentage(25), // Area for the log
        ])
        .split(frame.area());

    match &app.simulation {
        Simulation::Dungeon(dungeon) => render_dungeon(frame, main_layout[0], dungeon),
        Simulation::Puzzle { world, goal } => {
            let halves = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(main_layout[0]);
            render_puzzle(frame, halves[0], "Puzzle", world.bounds(), &world.configuration());
            render_puzzle(frame, halves[1], "Goal", world.bounds(), goal);
        }
    }

    render_status(frame, main_layout[1], app);
    render_log(frame, main_layout[2]);
}

/// Renders the dungeon with north at the top.
fn render_dungeon(frame: &mut Frame, area: Rect, dungeon: &Dungeon) {
    let bounds = dungeon.bounds();
    let view = dungeon.view();
    let mut lines: Vec<Line> = Vec::with_capacity(bounds.height());

    for y in (0..bounds.height()).rev() {
        let mut spans: Vec<Span> = Vec::with_capacity(bounds.width());
        for x in 0..bounds.width() {
            let position = Position::new(x, y);
            let span = if dungeon.link == position {
                Span::styled("@", Style::default().fg(Color::Red).bold())
            } else if view.is_wumpus(position) {
                Span::styled("W", Style::default().fg(Color::Magenta).bold())
            } else if dungeon.gold.contains(&position) {
                Span::styled("g", Style::default().fg(Color::Yellow))
            } else if view.is_pit(position) {
                Span::styled("o", Style::default().fg(Color::DarkGray))
            } else {
                Span::styled(".", Style::default().fg(Color::DarkGray))
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Wumpus World").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Renders a puzzle configuration; Wumpus are drawn as their index.
fn render_puzzle(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    bounds: Bounds,
    configuration: &Configuration,
) {
    let mut lines: Vec<Line> = Vec::with_capacity(bounds.height());

    for y in (0..bounds.height()).rev() {
        let mut spans: Vec<Span> = Vec::with_capacity(bounds.width());
        for x in 0..bounds.width() {
            let position = Position::new(x, y);
            let wumpus = configuration.wumpus.iter().position(|w| *w == position);
            let span = if configuration.link == position {
                Span::styled("@", Style::default().fg(Color::Red).bold())
            } else if let Some(index) = wumpus {
                Span::styled(index.to_string(), Style::default().fg(Color::Magenta).bold())
            } else {
                Span::styled(".", Style::default().fg(Color::DarkGray))
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Renders the last turn's outcome and the key help.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let detail = match &app.simulation {
        Simulation::Dungeon(dungeon) => format!(
            "Turn {} | Link at {} | Gold collected: {} | Gold left: {}",
            app.turn,
            dungeon.link,
            dungeon.collected,
            dungeon.gold.len()
        ),
        Simulation::Puzzle { world, .. } => format!(
            "Turn {} | Bootstrap moves left: {} | Planned moves: {}",
            app.turn,
            world.bootstrap_len(),
            world.planned_len()
        ),
    };

    let text = vec![
        Line::from(detail),
        Line::from(app.status.clone()),
        Line::from("Press 'q' or 'Esc' to quit.").alignment(Alignment::Center),
    ];
    let status = Paragraph::new(text).block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, area);
}

/// Renders the most recent log records.
fn render_log(frame: &mut Frame, area: Rect) {
    let rows = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = logging::recent(rows)
        .into_iter()
        .map(ListItem::new)
        .collect();
    let log_widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Log"));
    frame.render_widget(log_widget, area);
}
