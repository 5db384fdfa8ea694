use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{Direction, Position, world::DungeonView};

/// Trait defining the behavior of the agent controlling Link.
pub trait Agent {
    /// Determines the direction Link moves this turn.
    /// `&mut self` lets the agent keep its search state between turns.
    fn get_action(&mut self, view: &DungeonView) -> Direction;
}

/// How the moves handed out by [`DepthFirstAgent`] are derived from its search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteConstruction {
    /// Walk back from the goal along the predecessor recorded when each cell
    /// was pushed, and follow that route.
    #[default]
    Backtrace,
    /// The legacy pathfinder's behavior, kept as it was: every cell is
    /// appended to the route when it is pushed onto the frontier, and the
    /// route is followed in that order. This can step away from the goal and
    /// stall once the search space is spent.
    DiscoveryOrder,
}

/// Depth-first search state that survives between turns.
#[derive(Debug, Default)]
pub struct SearchSession {
    visited: HashSet<Position>,
    frontier: Vec<Position>,
    path: VecDeque<Position>,
    came_from: HashMap<Position, Position>,
    seed: Option<Position>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything searched so far.
    pub fn reset(&mut self) {
        self.visited.clear();
        self.frontier.clear();
        self.path.clear();
        self.came_from.clear();
        self.seed = None;
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Cells still queued to be handed out as moves.
    pub fn pending_path(&self) -> impl Iterator<Item = &Position> {
        self.path.iter()
    }

    fn seed(&mut self, start: Position) {
        self.frontier.push(start);
        self.path.clear();
        self.seed = Some(start);
    }
}

/// Link's agent: depth-first search towards the first gold, one step per turn.
#[derive(Debug, Default)]
pub struct DepthFirstAgent {
    session: SearchSession,
    route: RouteConstruction,
}

impl DepthFirstAgent {
    pub fn new(route: RouteConstruction) -> Self {
        Self {
            session: SearchSession::new(),
            route,
        }
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    /// Computes Link's next move from `current` towards `goal`.
    pub fn next_move(&mut self, current: Position, goal: Position, view: &DungeonView) -> Direction {
        if current == goal {
            return Direction::Stay;
        }
        match self.route {
            RouteConstruction::Backtrace => self.next_backtrace_move(current, goal, view),
            RouteConstruction::DiscoveryOrder => self.next_discovery_move(current, goal, view),
        }
    }

    fn next_backtrace_move(
        &mut self,
        current: Position,
        goal: Position,
        view: &DungeonView,
    ) -> Direction {
        if self.session.path.is_empty() {
            if self.session.frontier.is_empty() {
                self.session.seed(current);
            }
            if !self.search(goal, view) || !self.rebuild_route(goal) {
                return Direction::Stay;
            }
        }

        let Some(next) = self.session.path.pop_front() else {
            return Direction::Stay;
        };
        if self.session.path.is_empty() {
            // Route spent; the next call starts over.
            self.session.reset();
        }
        Direction::between(current, next)
    }

    fn next_discovery_move(
        &mut self,
        current: Position,
        goal: Position,
        view: &DungeonView,
    ) -> Direction {
        if self.session.frontier.is_empty() {
            self.session.seed(current);
        }
        if !self.search(goal, view) {
            return Direction::Stay;
        }
        match self.session.path.pop_front() {
            Some(next) => Direction::between(current, next),
            None => Direction::Stay,
        }
    }

    /// Pops states until the goal comes off the frontier.
    ///
    /// Returns `false` once the frontier is exhausted.
    fn search(&mut self, goal: Position, view: &DungeonView) -> bool {
        let bounds = view.bounds();
        while let Some(current) = self.session.frontier.pop() {
            if current == goal {
                debug!(
                    "Reached {goal} after visiting {} cells",
                    self.session.visited.len()
                );
                return true;
            }
            if !self.session.visited.insert(current) {
                continue;
            }

            for neighbor in bounds.neighbors(current) {
                if !view.is_safe(neighbor) || self.session.visited.contains(&neighbor) {
                    continue;
                }
                self.session.frontier.push(neighbor);
                match self.route {
                    RouteConstruction::Backtrace => {
                        self.session.came_from.insert(neighbor, current);
                    }
                    RouteConstruction::DiscoveryOrder => self.session.path.push_back(neighbor),
                }
            }
            trace!(
                "Expanded {current}, frontier holds {}",
                self.session.frontier.len()
            );
        }
        debug!(
            "Search space exhausted after {} cells, {goal} unreachable",
            self.session.visited.len()
        );
        false
    }

    /// Turns the predecessor map into the route from the seed to `goal`.
    fn rebuild_route(&mut self, goal: Position) -> bool {
        let Some(seed) = self.session.seed else {
            return false;
        };
        let mut route = vec![goal];
        let mut node = goal;
        while node != seed {
            match self.session.came_from.get(&node) {
                Some(&previous) => {
                    node = previous;
                    route.push(previous);
                }
                None => return false,
            }
        }
        route.pop();
        route.reverse();
        debug!("Route of {} steps from {seed} to {goal}", route.len());
        self.session.frontier.clear();
        self.session.path = route.into();
        true
    }
}

impl Agent for DepthFirstAgent {
    fn get_action(&mut self, view: &DungeonView) -> Direction {
        let Some(&goal) = view.gold_locations().first() else {
            return Direction::Stay;
        };
        self.next_move(view.location, goal, view)
    }
}
