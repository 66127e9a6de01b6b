//! Basic swarm synchronization example
//!
//! This example demonstrates:
//! - Constructing a swarm for a declared goal
//! - Running the tick loop for a bounded number of ticks
//! - Observing coherence converge, then disrupting and recovering

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use swarmsync_driver::Swarm;
use swarmsync_goals::recommended_target;
use swarmsync_core::Goal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== SwarmSync Basic Example ===\n");

    let agent_count = 20;
    let goal = Goal::MinimizeApiCalls;
    let target = recommended_target(goal, agent_count as usize, Duration::from_millis(20));

    println!("Building a {agent_count}-agent swarm for goal `{}`...", goal.as_str());
    let swarm = Swarm::new(agent_count, goal, target)?;
    println!("✓ Swarm constructed, target coherence {:.2}\n", target.target_coherence);

    let cancel = CancellationToken::new();
    let run_handle = {
        let cancel = cancel.clone();
        let swarm = &swarm;
        async move { swarm.run(cancel).await }
    };

    let watch_handle = async {
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let r = swarm.measure_coherence();
            println!("coherence = {r:.4}, converged = {}", swarm.is_converged());
            if swarm.is_converged() {
                break;
            }
        }

        println!("\nDisrupting 20% of the swarm...");
        swarm.disrupt(0.2);
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if !swarm.is_disrupted() {
                println!("recovered, coherence = {:.4}", swarm.measure_coherence());
                break;
            }
        }

        cancel.cancel();
    };

    tokio::join!(run_handle, watch_handle);

    println!("\n✓ Example complete!");
    Ok(())
}
