use log::debug;
use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Direction, Position,
    agent::Agent,
    config::WorldConfig,
    map::{Bounds, Grid, GridError},
};

/// Represents the static type of a cell in the dungeon grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Floor,
    Pit,
}

/// Whether the game is still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Play,
    Won,
    Lost,
}

/// Represents the outcome of processing Link's move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Success,
    Failure(String),
    Win,
    Lose,
}

/// Errors raised while building a dungeon.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("Dungeon must be at least 1x1, got {width}x{height}")]
    Empty { width: usize, height: usize },
    #[error("Position {0} is out of bounds")]
    OutOfBounds(Position),
    #[error("Position {0} is already occupied")]
    Occupied(Position),
    #[error("Cannot place {needed} entities on a grid of {available} cells")]
    Crowded { needed: usize, available: usize },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Errors raised while parsing a dungeon map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("Map string is empty")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map code '{code}' at position {position}")]
    UnknownCode { code: String, position: Position },
    #[error("Multiple Link positions ('LI') found")]
    DuplicateLink,
    #[error("No Link position ('LI') found in map")]
    MissingLink,
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Read-only view of the dungeon handed to Link's agent each turn.
#[derive(Debug)]
pub struct DungeonView<'a> {
    pub location: Position,
    pub terrain: &'a Grid<Cell>,
    pub wumpus: &'a [Position],
    pub gold: &'a [Position],
}

impl DungeonView<'_> {
    pub fn width(&self) -> usize {
        self.terrain.width()
    }

    pub fn height(&self) -> usize {
        self.terrain.height()
    }

    pub fn bounds(&self) -> Bounds {
        self.terrain.bounds()
    }

    pub fn is_pit(&self, position: Position) -> bool {
        matches!(self.terrain.get(position.x, position.y), Some(Cell::Pit))
    }

    pub fn is_wumpus(&self, position: Position) -> bool {
        self.wumpus.contains(&position)
    }

    /// A cell is safe when it holds neither a pit nor a Wumpus.
    pub fn is_safe(&self, position: Position) -> bool {
        !self.is_pit(position) && !self.is_wumpus(position)
    }

    pub fn gold_locations(&self) -> &[Position] {
        self.gold
    }
}

/// The Wumpus World: a grid of pits with Wumpus, gold and Link on top.
pub struct Dungeon {
    pub terrain: Grid<Cell>,
    pub wumpus: Vec<Position>,
    pub gold: Vec<Position>,
    pub link: Position,
    pub collected: usize,
    pub status: GameState,
    agent: Option<Box<dyn Agent>>,
}

impl Dungeon {
    /// Creates an empty dungeon with Link standing at `link`.
    pub fn new(width: usize, height: usize, link: Position) -> Result<Self, WorldError> {
        if width == 0 || height == 0 {
            return Err(WorldError::Empty { width, height });
        }
        let terrain = Grid::new(width, height);
        if !terrain.bounds().contains(link) {
            return Err(WorldError::OutOfBounds(link));
        }
        Ok(Dungeon {
            terrain,
            wumpus: Vec::new(),
            gold: Vec::new(),
            link,
            collected: 0,
            status: GameState::Play,
            agent: None,
        })
    }

    /// Builds a dungeon with every entity on its own randomly chosen cell.
    ///
    /// Wumpus are placed first, then pits, then gold, and Link last.
    pub fn random<R: Rng + ?Sized>(config: &WorldConfig, rng: &mut R) -> Result<Self, WorldError> {
        let bounds = config.bounds();
        if bounds.area() == 0 {
            return Err(WorldError::Empty {
                width: config.width,
                height: config.height,
            });
        }
        if config.entity_count() > bounds.area() {
            return Err(WorldError::Crowded {
                needed: config.entity_count(),
                available: bounds.area(),
            });
        }

        let mut used = Vec::with_capacity(config.entity_count());
        let mut pick = |rng: &mut R| -> Result<Position, WorldError> {
            let position = pick_unique_position(bounds, &used, rng).ok_or(WorldError::Crowded {
                needed: config.entity_count(),
                available: bounds.area(),
            })?;
            used.push(position);
            Ok(position)
        };

        let wumpus = (0..config.wumpus_count)
            .map(|_| pick(rng))
            .collect::<Result<Vec<_>, _>>()?;
        let pits = (0..config.pit_count)
            .map(|_| pick(rng))
            .collect::<Result<Vec<_>, _>>()?;
        let gold = (0..config.gold_count)
            .map(|_| pick(rng))
            .collect::<Result<Vec<_>, _>>()?;
        let link = pick(rng)?;

        let mut dungeon = Dungeon::new(config.width, config.height, link)?;
        for pit in pits {
            dungeon.add_pit(pit)?;
        }
        for position in wumpus {
            dungeon.add_wumpus(position)?;
        }
        for position in gold {
            dungeon.add_gold(position)?;
        }
        debug!(
            "Generated {}x{} dungeon, Link at {}",
            config.width, config.height, dungeon.link
        );
        Ok(dungeon)
    }

    /// Hands control of Link to `agent`.
    pub fn set_agent(&mut self, agent: Box<dyn Agent>) {
        self.agent = Some(agent);
    }

    pub fn bounds(&self) -> Bounds {
        self.terrain.bounds()
    }

    fn is_occupied(&self, position: Position) -> bool {
        self.link == position || self.gold.contains(&position) || !self.view().is_safe(position)
    }

    fn check_free(&self, position: Position) -> Result<(), WorldError> {
        if !self.bounds().contains(position) {
            return Err(WorldError::OutOfBounds(position));
        }
        if self.is_occupied(position) {
            return Err(WorldError::Occupied(position));
        }
        Ok(())
    }

    pub fn add_pit(&mut self, position: Position) -> Result<(), WorldError> {
        self.check_free(position)?;
        self.terrain.set(position.x, position.y, Cell::Pit)?;
        Ok(())
    }

    pub fn add_wumpus(&mut self, position: Position) -> Result<(), WorldError> {
        self.check_free(position)?;
        self.wumpus.push(position);
        Ok(())
    }

    pub fn add_gold(&mut self, position: Position) -> Result<(), WorldError> {
        self.check_free(position)?;
        self.gold.push(position);
        Ok(())
    }

    /// Borrows the dungeon as Link sees it.
    pub fn view(&self) -> DungeonView<'_> {
        DungeonView {
            location: self.link,
            terrain: &self.terrain,
            wumpus: &self.wumpus,
            gold: &self.gold,
        }
    }

    /// Asks the agent for Link's next move and applies it.
    pub fn process_turn(&mut self) -> (Direction, ActionResult) {
        let Some(mut agent) = self.agent.take() else {
            return (
                Direction::Stay,
                ActionResult::Failure("No agent controls Link.".to_string()),
            );
        };
        let action = agent.get_action(&self.view());
        self.agent = Some(agent);
        let result = self.process_action(action);
        debug!("Link chose {action}: {result:?}");
        (action, result)
    }

    /// Moves Link one step and resolves what it lands on.
    pub fn process_action(&mut self, action: Direction) -> ActionResult {
        if self.status != GameState::Play {
            return ActionResult::Failure("The game is over.".to_string());
        }
        if action.is_stay() {
            return ActionResult::Success;
        }

        let target = self.bounds().step_clamped(self.link, action);
        if target == self.link {
            return ActionResult::Failure("Cannot move past the edge of the dungeon.".to_string());
        }
        self.link = target;

        if !self.view().is_safe(target) {
            self.status = GameState::Lost;
            return ActionResult::Lose;
        }

        if let Some(index) = self.gold.iter().position(|gold| *gold == target) {
            self.gold.remove(index);
            self.collected += 1;
            if self.gold.is_empty() {
                self.status = GameState::Won;
                return ActionResult::Win;
            }
        }
        ActionResult::Success
    }
}

/// Picks a cell that is not in `used`, uniformly at random.
pub fn pick_unique_position<R: Rng + ?Sized>(
    bounds: Bounds,
    used: &[Position],
    rng: &mut R,
) -> Option<Position> {
    let free: Vec<Position> = (0..bounds.height())
        .flat_map(|y| (0..bounds.width()).map(move |x| Position::new(x, y)))
        .filter(|position| !used.contains(position))
        .collect();
    free.choose(rng).copied()
}

/// Loads a dungeon from a whitespace-separated map.
///
/// The first line of text is the northern row. Codes: `BL` floor, `PT` pit,
/// `WU` Wumpus, `GO` gold, `LI` Link's start.
pub fn load_dungeon_from_string(map_string: &str) -> Result<Dungeon, LoadError> {
    let lines: Vec<&str> = map_string.trim().lines().collect();
    if lines.is_empty() {
        return Err(LoadError::Empty);
    }

    let height = lines.len();
    let mut width = 0;
    let mut parsed_rows: Vec<Vec<&str>> = Vec::with_capacity(height);

    for (row, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if row == 0 {
            width = tokens.len();
            if width == 0 {
                return Err(LoadError::Empty);
            }
        } else if tokens.len() != width {
            return Err(LoadError::RaggedRow {
                row,
                expected: width,
                found: tokens.len(),
            });
        }
        parsed_rows.push(tokens);
    }

    let mut link: Option<Position> = None;
    let mut pits = Vec::new();
    let mut wumpus = Vec::new();
    let mut gold = Vec::new();

    for (row, tokens) in parsed_rows.iter().enumerate() {
        let y = height - 1 - row;
        for (x, token) in tokens.iter().enumerate() {
            let position = Position::new(x, y);
            match *token {
                "BL" => {}
                "PT" => pits.push(position),
                "WU" => wumpus.push(position),
                "GO" => gold.push(position),
                "LI" => {
                    if link.replace(position).is_some() {
                        return Err(LoadError::DuplicateLink);
                    }
                }
                unknown => {
                    return Err(LoadError::UnknownCode {
                        code: unknown.to_string(),
                        position,
                    });
                }
            }
        }
    }

    let link = link.ok_or(LoadError::MissingLink)?;
    let mut dungeon = Dungeon::new(width, height, link)?;
    for position in pits {
        dungeon.add_pit(position)?;
    }
    for position in wumpus {
        dungeon.add_wumpus(position)?;
    }
    for position in gold {
        dungeon.add_gold(position)?;
    }
    Ok(dungeon)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    const MAP: &str = "
        BL BL BL GO
        BL PT BL BL
        BL BL WU BL
        LI BL BL BL
    ";

    #[test]
    fn loader_places_entities_with_north_on_top() {
        let dungeon = load_dungeon_from_string(MAP).unwrap();
        assert_eq!(dungeon.bounds(), Bounds::new(4, 4));
        assert_eq!(dungeon.link, Position::new(0, 0));
        assert_eq!(dungeon.gold, vec![Position::new(3, 3)]);
        assert_eq!(dungeon.wumpus, vec![Position::new(2, 1)]);
        assert!(dungeon.view().is_pit(Position::new(1, 2)));
        assert!(!dungeon.view().is_pit(Position::new(1, 1)));
    }

    #[test]
    fn loader_rejects_malformed_maps() {
        assert_eq!(load_dungeon_from_string("   ").err(), Some(LoadError::Empty));
        assert_eq!(
            load_dungeon_from_string("LI BL\nBL").err(),
            Some(LoadError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            load_dungeon_from_string("LI XX").err(),
            Some(LoadError::UnknownCode {
                code: "XX".to_string(),
                position: Position::new(1, 0)
            })
        );
        assert_eq!(
            load_dungeon_from_string("BL GO").err(),
            Some(LoadError::MissingLink)
        );
        assert_eq!(
            load_dungeon_from_string("LI LI").err(),
            Some(LoadError::DuplicateLink)
        );
    }

    #[test]
    fn view_reports_safety() {
        let dungeon = load_dungeon_from_string(MAP).unwrap();
        let view = dungeon.view();
        assert_eq!(view.width(), 4);
        assert_eq!(view.height(), 4);
        assert!(!view.is_safe(Position::new(1, 2)));
        assert!(!view.is_safe(Position::new(2, 1)));
        assert!(view.is_safe(Position::new(3, 3)));
        assert_eq!(view.gold_locations(), &[Position::new(3, 3)]);
    }

    #[test]
    fn random_dungeon_is_reproducible_and_unique() {
        let config = WorldConfig {
            width: 5,
            height: 4,
            wumpus_count: 2,
            pit_count: 3,
            gold_count: 2,
        };
        let a = Dungeon::random(&config, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = Dungeon::random(&config, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.link, b.link);
        assert_eq!(a.wumpus, b.wumpus);
        assert_eq!(a.gold, b.gold);
        assert_eq!(a.terrain, b.terrain);

        let view = a.view();
        let pits: Vec<Position> = (0..config.height)
            .flat_map(|y| (0..config.width).map(move |x| Position::new(x, y)))
            .filter(|position| view.is_pit(*position))
            .collect();
        assert_eq!(pits.len(), 3);

        let mut all = vec![a.link];
        all.extend(&a.wumpus);
        all.extend(&a.gold);
        all.extend(&pits);
        assert_eq!(all.len(), config.entity_count());
        for (i, position) in all.iter().enumerate() {
            assert!(a.bounds().contains(*position));
            assert!(!all[i + 1..].contains(position));
        }
    }

    #[test]
    fn placement_rejects_taken_and_outside_cells() {
        let mut dungeon = load_dungeon_from_string(MAP).unwrap();
        assert_eq!(
            dungeon.add_pit(Position::new(2, 1)),
            Err(WorldError::Occupied(Position::new(2, 1)))
        );
        assert_eq!(
            dungeon.add_gold(Position::new(1, 2)),
            Err(WorldError::Occupied(Position::new(1, 2)))
        );
        assert_eq!(
            dungeon.add_wumpus(Position::new(4, 0)),
            Err(WorldError::OutOfBounds(Position::new(4, 0)))
        );

        dungeon.add_pit(Position::new(3, 0)).unwrap();
        assert!(!dungeon.view().is_safe(Position::new(3, 0)));
        assert_eq!(dungeon.terrain.get(3, 0), Some(&Cell::Pit));
    }

    #[test]
    fn random_dungeon_rejects_crowded_config() {
        let config = WorldConfig {
            width: 2,
            height: 2,
            wumpus_count: 2,
            pit_count: 2,
            gold_count: 1,
        };
        assert_eq!(
            Dungeon::random(&config, &mut StdRng::seed_from_u64(1)).err(),
            Some(WorldError::Crowded {
                needed: 6,
                available: 4
            })
        );
    }

    #[test]
    fn process_action_resolves_hazards_and_gold() {
        let mut dungeon = load_dungeon_from_string(MAP).unwrap();
        assert_eq!(
            dungeon.process_action(Direction::West),
            ActionResult::Failure("Cannot move past the edge of the dungeon.".to_string())
        );
        assert_eq!(dungeon.process_action(Direction::East), ActionResult::Success);
        assert_eq!(dungeon.process_action(Direction::East), ActionResult::Success);
        assert_eq!(dungeon.process_action(Direction::North), ActionResult::Lose);
        assert_eq!(dungeon.status, GameState::Lost);
        assert!(matches!(
            dungeon.process_action(Direction::North),
            ActionResult::Failure(_)
        ));
    }

    #[test]
    fn collecting_last_gold_wins() {
        let mut dungeon = load_dungeon_from_string("LI GO").unwrap();
        assert_eq!(dungeon.process_action(Direction::East), ActionResult::Win);
        assert_eq!(dungeon.collected, 1);
        assert!(dungeon.gold.is_empty());
        assert_eq!(dungeon.status, GameState::Won);
    }

    #[test]
    fn process_turn_without_agent_fails() {
        let mut dungeon = load_dungeon_from_string("LI GO").unwrap();
        let (action, result) = dungeon.process_turn();
        assert_eq!(action, Direction::Stay);
        assert!(matches!(result, ActionResult::Failure(_)));
    }
}
