use std::collections::{HashSet, VecDeque};

use rand::{SeedableRng, rngs::StdRng};
use wumpus_world_core::{
    Position,
    agent::{DepthFirstAgent, RouteConstruction},
    config::{PuzzleConfig, WorldConfig},
    map::Bounds,
    puzzle::{Configuration, MoveOutcome, PuzzleWorld},
    world::{ActionResult, Dungeon, GameState, load_dungeon_from_string},
};

/// Cells reachable from `start` without crossing a pit or a Wumpus.
fn reachable(dungeon: &Dungeon, start: Position) -> HashSet<Position> {
    let bounds = dungeon.bounds();
    let view = dungeon.view();
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for next in bounds.neighbors(current) {
            if !view.is_safe(next) {
                continue;
            }
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

fn play(dungeon: &mut Dungeon, turns: usize) -> Option<ActionResult> {
    for _ in 0..turns {
        match dungeon.process_turn().1 {
            result @ (ActionResult::Win | ActionResult::Lose) => return Some(result),
            _ => {}
        }
    }
    None
}

#[test]
fn agent_collects_gold_around_hazards() {
    let mut dungeon = load_dungeon_from_string(
        "
        BL BL BL BL BL
        BL PT PT PT BL
        BL BL GO WU BL
        BL PT PT PT BL
        LI BL BL BL BL
        ",
    )
    .unwrap();
    dungeon.set_agent(Box::new(DepthFirstAgent::default()));

    assert_eq!(play(&mut dungeon, 100), Some(ActionResult::Win));
    assert_eq!(dungeon.link, Position::new(2, 2));
    assert_eq!(dungeon.status, GameState::Won);
    assert_eq!(dungeon.collected, 1);
}

#[test]
fn random_dungeons_are_won_exactly_when_gold_is_reachable() {
    let config = WorldConfig {
        width: 6,
        height: 5,
        wumpus_count: 2,
        pit_count: 5,
        gold_count: 2,
    };
    let mut wins = 0;
    for seed in 0..40 {
        let mut dungeon = Dungeon::random(&config, &mut StdRng::seed_from_u64(seed)).unwrap();
        let cells = reachable(&dungeon, dungeon.link);
        let all_reachable = dungeon.gold.iter().all(|gold| cells.contains(gold));
        dungeon.set_agent(Box::new(DepthFirstAgent::new(RouteConstruction::Backtrace)));

        let result = play(&mut dungeon, 200);
        assert_ne!(result, Some(ActionResult::Lose), "seed {seed} walked into a hazard");
        if all_reachable {
            assert_eq!(result, Some(ActionResult::Win), "seed {seed} should be won");
            wins += 1;
        } else {
            assert_eq!(dungeon.status, GameState::Play);
        }
    }
    assert!(wins > 0);
}

#[test]
fn puzzle_runs_bootstrap_then_search_to_completion() {
    let mut world = PuzzleWorld::new(
        Bounds::new(3, 3),
        Position::new(0, 0),
        vec![Position::new(2, 0)],
    )
    .unwrap();
    let goal = Configuration {
        link: Position::new(2, 2),
        wumpus: vec![Position::new(0, 0)],
    };

    let mut outcomes = Vec::new();
    for _ in 0..200 {
        let outcome = world.make_a_move(&goal);
        let solved = outcome == MoveOutcome::Solved;
        outcomes.push(outcome);
        if solved {
            break;
        }
    }

    // Both bootstrap shoves go north: the Wumpus first, then Link.
    assert!(matches!(outcomes[0], MoveOutcome::Bootstrap(Some(_))));
    assert!(matches!(outcomes[1], MoveOutcome::Bootstrap(Some(_))));
    assert!(
        outcomes[2..outcomes.len() - 1]
            .iter()
            .all(|outcome| matches!(outcome, MoveOutcome::Step(Some(_))))
    );
    assert_eq!(outcomes.last(), Some(&MoveOutcome::Solved));
    assert_eq!(world.configuration(), goal);
    assert_eq!(world.status, GameState::Won);
}

#[test]
fn puzzle_random_goal_is_reported_without_panicking() {
    let config = PuzzleConfig::default();
    let mut rng = StdRng::seed_from_u64(5);
    let mut world = PuzzleWorld::random(&config, &mut rng).unwrap();
    let goal = PuzzleWorld::random(&config, &mut rng).unwrap().configuration();

    for _ in 0..600 {
        match world.make_a_move(&goal) {
            MoveOutcome::Solved | MoveOutcome::NoPlan => break,
            _ => {}
        }
    }
    for position in std::iter::once(&world.link).chain(&world.wumpus) {
        assert!(world.bounds().contains(*position));
    }
}

#[test]
fn puzzle_random_goals_are_solved() {
    let config = PuzzleConfig::default();
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut world = PuzzleWorld::random(&config, &mut rng).unwrap();
        let goal = world.random_goal(&mut rng).unwrap();

        let mut solved = false;
        for _ in 0..1000 {
            match world.make_a_move(&goal) {
                MoveOutcome::Solved => {
                    solved = true;
                    break;
                }
                MoveOutcome::NoPlan => break,
                _ => {}
            }
        }
        assert!(solved, "seed {seed} did not reach its goal");
        assert_eq!(world.configuration(), goal);
        assert_eq!(world.status, GameState::Won);
    }
}
