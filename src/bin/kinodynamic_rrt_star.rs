// Bidirectional kinodynamic RRT* with bang-bang steering
//
// Grows a tree forward from the start and one backward from the goal in a
// field with round obstacles, then plots both trees and the best path.

use std::fs;

use rand::rngs::StdRng;
use rand::SeedableRng;

use kinodynamic_rrt::common::{Control, State, Visualizable};
use kinodynamic_rrt::path_planning::kinodynamic_rrt_star::{
    CircleArena, EventSink, KinodynamicRRTStar, NewtonShootingSolver, PlannerConfig, PlannerEvent,
};
use kinodynamic_rrt::utils::Visualizer;

const MAX_STEPS: usize = 3000;
const SEED: u64 = 42;
const OUTPUT: &str = "img/path_planning/kinodynamic_rrt_star.svg";
/// Longest link the shooting solver may use between the trees
const LINK_HORIZON: f64 = 3.0;

/// Prints best-path improvements to the console.
struct ProgressPrinter;

impl EventSink for ProgressPrinter {
    fn record(&mut self, event: &PlannerEvent) {
        if let PlannerEvent::BestPathImproved { distance, previous } = event {
            match previous {
                Some(p) => println!("best path time: {:.3} -> {:.3}", p, distance),
                None => println!("found path, time: {:.3}", distance),
            }
        }
    }
}

fn main() {
    println!("kinodynamic_rrt_star start!!");

    let min = State::new(0.0, -2.0, 0.0, -2.0);
    let max = State::new(15.0, 2.0, 15.0, 2.0);
    let obstacle_list = vec![
        (5.0, 5.0, 1.0),
        (3.0, 6.0, 2.0),
        (3.0, 8.0, 2.0),
        (3.0, 10.0, 2.0),
        (7.0, 5.0, 2.0),
        (9.0, 5.0, 2.0),
        (8.0, 10.0, 1.0),
    ];
    let arena = CircleArena::new(min, max, obstacle_list.clone()).with_robot_radius(0.2);

    let config = PlannerConfig {
        bidirectional: true,
        radius: 4.0,
        ..Default::default()
    };
    let u_max = Control::new(config.u_max, config.u_max);
    let solver = NewtonShootingSolver::new(u_max, LINK_HORIZON, 20);
    let initial = State::new(1.0, 0.0, 1.0, 0.0);
    let goal = State::new(12.0, 0.0, 13.0, 0.0);

    let mut planner = match KinodynamicRRTStar::new(
        arena,
        solver,
        StdRng::seed_from_u64(SEED),
        initial,
        goal,
        config,
    ) {
        Ok(planner) => planner,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    planner.set_event_sink(Box::new(ProgressPrinter));

    for i in 0..MAX_STEPS {
        if i % 500 == 0 {
            println!(
                "Iter: {}, nodes: {} + {}",
                i,
                planner.nodes_a().len(),
                planner.nodes_b().len()
            );
        }
        if let Err(e) = planner.step() {
            eprintln!("step {} failed: {}", i, e);
            return;
        }
    }

    match planner.best_path() {
        Some(path) => println!("done, {} states, time {:.3}", path.len(), path.distance()),
        None => println!("Cannot find path"),
    }

    let mut vis = Visualizer::new();
    vis.set_title("Kinodynamic RRT*").set_bounds(&min, &max);
    vis.plot_circles(&obstacle_list);
    planner.visualize(&mut vis);

    if let Err(e) = fs::create_dir_all("img/path_planning") {
        eprintln!("{}", e);
        return;
    }
    match vis.save_svg(OUTPUT) {
        Ok(()) => println!("Plot saved to {}", OUTPUT),
        Err(e) => eprintln!("{}", e),
    }
}
