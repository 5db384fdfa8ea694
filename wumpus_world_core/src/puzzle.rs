//! The puzzle variant of the Wumpus World.
//!
//! Link and the Wumpus are all movable pieces and the aim is to bring them
//! into a target [`Configuration`]. Each call to [`PuzzleWorld::make_a_move`]
//! shifts exactly one entity by one cell: first from a fixed bootstrap plan,
//! then from a plan found by depth-first search over joint configurations.

use std::{
    collections::{HashSet, VecDeque},
    fmt,
};

use log::{debug, info, trace, warn};
use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Direction, Position,
    config::PuzzleConfig,
    map::Bounds,
    world::{GameState, WorldError, pick_unique_position},
};

/// A movable piece of the puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Link,
    /// Index into the Wumpus list.
    Wumpus(usize),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Link => f.write_str("Link"),
            Entity::Wumpus(index) => write!(f, "Wumpus {index}"),
        }
    }
}

/// Positions of Link and every Wumpus, also used as the visited-set key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    pub link: Position,
    pub wumpus: Vec<Position>,
}

/// One direction per entity: slot 0 is Link, slot `i` is Wumpus `i - 1`.
/// `Direction::Stay` marks an entity that does not move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveVector(pub Vec<Direction>);

impl MoveVector {
    /// A vector that moves only `entity`.
    pub fn for_entity(entity: Entity, direction: Direction, wumpus_count: usize) -> Self {
        let mut slots = vec![Direction::Stay; wumpus_count + 1];
        let slot = match entity {
            Entity::Link => 0,
            Entity::Wumpus(index) => index + 1,
        };
        if let Some(entry) = slots.get_mut(slot) {
            *entry = direction;
        }
        MoveVector(slots)
    }

    /// The single move this vector stands for.
    ///
    /// Link's slot wins when set; otherwise the first Wumpus slot that is not
    /// `Stay`. Any further slots are ignored.
    pub fn active(&self) -> Option<(Entity, Direction)> {
        let mut slots = self.0.iter().copied().enumerate();
        let (_, link) = slots.next()?;
        if !link.is_stay() {
            return Some((Entity::Link, link));
        }
        slots
            .find(|(_, direction)| !direction.is_stay())
            .map(|(slot, direction)| (Entity::Wumpus(slot - 1), direction))
    }
}

/// The fallback plan the puzzle starts with: one northward shove per entity.
///
/// Entries are popped from the back, so the last Wumpus moves first.
pub fn default_bootstrap(wumpus_count: usize) -> Vec<MoveVector> {
    (0..=wumpus_count)
        .map(|slot| {
            let entity = match slot {
                0 => Entity::Link,
                n => Entity::Wumpus(n - 1),
            };
            MoveVector::for_entity(entity, Direction::North, wumpus_count)
        })
        .collect()
}

/// One edge of the joint search: Link and the first Wumpus both step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePair {
    pub link: Position,
    pub wumpus: Option<Position>,
}

/// What a single applied move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub entity: Entity,
    pub direction: Direction,
    pub from: Position,
    pub to: Position,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Moving {} {} from {} to {}",
            self.entity, self.direction, self.from, self.to
        )
    }
}

/// Result of one call to [`PuzzleWorld::make_a_move`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// A bootstrap vector was applied. `None` when it named no movable entity.
    Bootstrap(Option<StepReport>),
    /// A searched move was applied.
    Step(Option<StepReport>),
    /// The live configuration already matches the goal.
    Solved,
    /// The search space was exhausted without reaching the goal.
    NoPlan,
}

/// A pushed configuration and the search edge that produced it.
#[derive(Debug, Clone)]
struct JointState {
    configuration: Configuration,
    node: Option<usize>,
}

/// A search edge, linked to the edge that reached its source state.
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    parent: Option<usize>,
    pair: MovePair,
}

#[derive(Debug, Default)]
struct JointSession {
    visited: HashSet<Configuration>,
    frontier: Vec<JointState>,
    nodes: Vec<SearchNode>,
}

impl JointSession {
    fn reset(&mut self) {
        self.visited.clear();
        self.frontier.clear();
        self.nodes.clear();
    }

    fn push(&mut self, configuration: Configuration, parent: Option<usize>, pair: MovePair) {
        self.nodes.push(SearchNode { parent, pair });
        self.frontier.push(JointState {
            configuration,
            node: Some(self.nodes.len() - 1),
        });
    }

    /// Follows parent links from `node` back to the seed.
    fn path_to(&self, node: Option<usize>) -> Vec<MovePair> {
        let mut path = Vec::new();
        let mut cursor = node;
        while let Some(SearchNode { parent, pair }) = cursor.and_then(|i| self.nodes.get(i)) {
            path.push(*pair);
            cursor = *parent;
        }
        path.reverse();
        path
    }
}

/// Link plus a set of Wumpus that can all be moved around the grid.
#[derive(Debug)]
pub struct PuzzleWorld {
    bounds: Bounds,
    pub link: Position,
    pub wumpus: Vec<Position>,
    pub status: GameState,
    bootstrap: Vec<MoveVector>,
    plan: VecDeque<MoveVector>,
    session: JointSession,
}

impl PuzzleWorld {
    /// Creates a puzzle with the default bootstrap plan.
    pub fn new(bounds: Bounds, link: Position, wumpus: Vec<Position>) -> Result<Self, WorldError> {
        if bounds.area() == 0 {
            return Err(WorldError::Empty {
                width: bounds.width(),
                height: bounds.height(),
            });
        }
        for (i, position) in wumpus.iter().chain(std::iter::once(&link)).enumerate() {
            if !bounds.contains(*position) {
                return Err(WorldError::OutOfBounds(*position));
            }
            if wumpus[..i.min(wumpus.len())].contains(position) {
                return Err(WorldError::Occupied(*position));
            }
        }
        let bootstrap = default_bootstrap(wumpus.len());
        Ok(PuzzleWorld {
            bounds,
            link,
            wumpus,
            status: GameState::Play,
            bootstrap,
            plan: VecDeque::new(),
            session: JointSession::default(),
        })
    }

    /// Places every Wumpus and then Link on distinct random cells.
    pub fn random<R: Rng + ?Sized>(config: &PuzzleConfig, rng: &mut R) -> Result<Self, WorldError> {
        let bounds = config.bounds();
        let needed = config.wumpus_count + 1;
        if bounds.area() > 0 && needed > bounds.area() {
            return Err(WorldError::Crowded {
                needed,
                available: bounds.area(),
            });
        }
        let mut used = Vec::with_capacity(needed);
        for _ in 0..needed {
            let position = pick_unique_position(bounds, &used, rng).ok_or(WorldError::Empty {
                width: config.width,
                height: config.height,
            })?;
            used.push(position);
        }
        let link = used.pop().ok_or(WorldError::Empty {
            width: config.width,
            height: config.height,
        })?;
        PuzzleWorld::new(bounds, link, used)
    }

    /// Replaces the bootstrap plan. Entries are consumed from the back.
    pub fn with_bootstrap(mut self, bootstrap: Vec<MoveVector>) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn configuration(&self) -> Configuration {
        Configuration {
            link: self.link,
            wumpus: self.wumpus.clone(),
        }
    }

    pub fn bootstrap_len(&self) -> usize {
        self.bootstrap.len()
    }

    /// Searched moves not yet applied.
    pub fn planned_len(&self) -> usize {
        self.plan.len()
    }

    pub fn visited_count(&self) -> usize {
        self.session.visited.len()
    }

    /// Where every entity stands once the remaining bootstrap plan has run.
    pub fn after_bootstrap(&self) -> Configuration {
        let mut configuration = self.configuration();
        for step in self.bootstrap.iter().rev() {
            let Some((entity, direction)) = step.active() else {
                continue;
            };
            let position = match entity {
                Entity::Link => &mut configuration.link,
                Entity::Wumpus(index) => match configuration.wumpus.get_mut(index) {
                    Some(position) => position,
                    None => continue,
                },
            };
            *position = self.bounds.step_clamped(*position, direction);
        }
        configuration
    }

    /// Draws a goal that the joint search can reach.
    ///
    /// Wumpus 1 and later keep their post-bootstrap cells because the search
    /// never moves them. Every joint move shifts both Link and the first
    /// Wumpus, so their distances to the goal must share a parity. Returns
    /// `None` when the grid has no free cell meeting that.
    pub fn random_goal<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Configuration> {
        let settled = self.after_bootstrap();
        let parity = |p: Position| (p.x + p.y) % 2;
        let mut used = settled.wumpus.get(1..).unwrap_or_default().to_vec();
        let link = pick_unique_position(self.bounds, &used, rng)?;
        let mut goal = Configuration {
            link,
            wumpus: settled.wumpus.clone(),
        };
        let Some(&from) = settled.wumpus.first() else {
            return Some(goal);
        };

        used.push(link);
        let shift = (parity(settled.link) + parity(link)) % 2;
        let candidates: Vec<Position> = (0..self.bounds.height())
            .flat_map(|y| (0..self.bounds.width()).map(move |x| Position::new(x, y)))
            .filter(|p| !used.contains(p) && (parity(from) + parity(*p)) % 2 == shift)
            .collect();
        goal.wumpus[0] = *candidates.choose(rng)?;
        Some(goal)
    }

    /// Checks the live configuration against `goal`, marking the puzzle won on a match.
    pub fn is_solved(&mut self, goal: &Configuration) -> bool {
        if self.link != goal.link || self.wumpus != goal.wumpus {
            return false;
        }
        if self.status != GameState::Won {
            info!("Puzzle over!");
            self.status = GameState::Won;
        }
        true
    }

    /// Shifts one entity by one cell towards `goal`.
    pub fn make_a_move(&mut self, goal: &Configuration) -> MoveOutcome {
        if let Some(step) = self.bootstrap.pop() {
            debug!("Bootstrap move {:?}", step.0);
            let report = self.take_step(&step);
            self.is_solved(goal);
            return MoveOutcome::Bootstrap(report);
        }

        if self.is_solved(goal) {
            return MoveOutcome::Solved;
        }

        if self.plan.is_empty() && !self.search(goal) {
            warn!("No plan found!");
            return MoveOutcome::NoPlan;
        }
        let Some(step) = self.plan.pop_front() else {
            return MoveOutcome::NoPlan;
        };
        let report = self.take_step(&step);
        self.is_solved(goal);
        MoveOutcome::Step(report)
    }

    /// Applies a move vector to at most one entity.
    ///
    /// Steps that would leave the grid leave the entity where it is.
    pub fn take_step(&mut self, step: &MoveVector) -> Option<StepReport> {
        let (entity, direction) = step.active()?;
        let bounds = self.bounds;
        let position = match entity {
            Entity::Link => &mut self.link,
            Entity::Wumpus(index) => self.wumpus.get_mut(index)?,
        };
        let from = *position;
        let to = bounds.step_clamped(from, direction);
        *position = to;

        let report = StepReport {
            entity,
            direction,
            from,
            to,
        };
        info!("{report}");
        Some(report)
    }

    /// Depth-first search over joint configurations.
    ///
    /// Only the first Wumpus is moved by the search; the others keep their
    /// positions in every successor. Successors are pushed without a visited
    /// check, which happens when they are popped.
    fn search(&mut self, goal: &Configuration) -> bool {
        let bounds = self.bounds;
        let start = self.configuration();
        if self.session.frontier.is_empty() {
            self.session.frontier.push(JointState {
                configuration: start.clone(),
                node: None,
            });
        }

        while let Some(JointState {
            configuration,
            node,
        }) = self.session.frontier.pop()
        {
            if configuration == *goal {
                let path = self.session.path_to(node);
                debug!(
                    "Found a plan of {} joint moves after {} states",
                    path.len(),
                    self.session.visited.len()
                );
                self.plan = plan_from_path(&start, &path);
                self.session.reset();
                return true;
            }
            if !self.session.visited.insert(configuration.clone()) {
                continue;
            }

            let link_moves = bounds.neighbors(configuration.link);
            match configuration.wumpus.first() {
                Some(&first) => {
                    let wumpus_moves = bounds.neighbors(first);
                    for &link in &link_moves {
                        for &wumpus in &wumpus_moves {
                            if !bounds.contains(link) || !bounds.contains(wumpus) {
                                continue;
                            }
                            let mut next = configuration.clone();
                            next.link = link;
                            next.wumpus[0] = wumpus;
                            let pair = MovePair {
                                link,
                                wumpus: Some(wumpus),
                            };
                            self.session.push(next, node, pair);
                        }
                    }
                }
                None => {
                    for &link in link_moves.iter().filter(|p| bounds.contains(**p)) {
                        let next = Configuration {
                            link,
                            wumpus: Vec::new(),
                        };
                        self.session.push(next, node, MovePair { link, wumpus: None });
                    }
                }
            }
            trace!(
                "Expanded {:?}, frontier holds {}",
                configuration,
                self.session.frontier.len()
            );
        }
        false
    }
}

/// Splits each joint move into a Link vector followed by a Wumpus vector.
fn plan_from_path(start: &Configuration, path: &[MovePair]) -> VecDeque<MoveVector> {
    let wumpus_count = start.wumpus.len();
    let mut link = start.link;
    let mut wumpus = start.wumpus.first().copied();
    let mut plan = VecDeque::with_capacity(path.len() * 2);
    for pair in path {
        plan.push_back(MoveVector::for_entity(
            Entity::Link,
            Direction::between(link, pair.link),
            wumpus_count,
        ));
        link = pair.link;
        if let (Some(from), Some(to)) = (wumpus, pair.wumpus) {
            plan.push_back(MoveVector::for_entity(
                Entity::Wumpus(0),
                Direction::between(from, to),
                wumpus_count,
            ));
            wumpus = Some(to);
        }
    }
    plan
}
