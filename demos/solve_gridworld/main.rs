use std::{error::Error, time::Duration};

use gridworld_mdp::{
    runner::{AutoRun, Update},
    Algorithm, Grid, Snapshot, Solver, SolverConfig,
};
use strum::IntoEnumIterator;

const STEP_INTERVAL: Duration = Duration::from_millis(100);

fn print_values(snapshot: &Snapshot) {
    for row in &snapshot.values {
        let cells = row.iter().map(|v| format!("{v:>7.2}")).collect::<Vec<_>>();
        println!("  {}", cells.join(" "));
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let grid = Grid::default();
    let config = SolverConfig::default();

    let mut policies = Vec::new();
    for algorithm in Algorithm::iter() {
        println!("== {algorithm} (γ = {})", config.discount);

        let solver = algorithm.build(grid.clone(), config)?;
        let (task, rx) = AutoRun::spawn(solver, STEP_INTERVAL);

        for update in rx {
            match update {
                Update::Step(snapshot) => {
                    let sweeps = snapshot
                        .evaluation_iterations
                        .map(|n| format!(", {n} evaluation sweeps"))
                        .unwrap_or_default();
                    println!(
                        "iteration {}: delta {:.4}{sweeps}",
                        snapshot.iteration, snapshot.delta
                    );
                }
                Update::Failed(err) => return Err(err.into()),
            }
        }

        let solver = task.join().map_err(|_| "solver thread panicked")?;
        let snapshot = solver.state();
        println!("converged after {} iterations", snapshot.iteration);
        print_values(&snapshot);
        println!("{}\n", snapshot.policy.arrows());
        policies.push(snapshot.policy);
    }

    if policies.windows(2).all(|w| w[0] == w[1]) {
        println!("both algorithms found the same policy");
    } else {
        println!("the algorithms disagree, likely on a tied cell");
    }

    Ok(())
}
