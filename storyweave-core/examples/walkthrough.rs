//! Walk through a short coordination session.
//!
//! Plays the villain saga through a coordinator, shows the blackboard
//! traffic between agents, then checkpoints and resumes the session.
//!
//! ```bash
//! RUST_LOG=storyweave=debug cargo run -p storyweave-core --example walkthrough
//! ```

use serde_json::json;
use storyweave_core::persist::list_checkpoints;
use storyweave_core::prelude::*;
use storyweave_core::testing::fixtures;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storyweave=info")),
        )
        .init();

    println!("=== Storyweave walkthrough ===\n");

    let mut coordinator = Coordinator::default();
    for (name, attributes) in fixtures::villain_saga_cast() {
        coordinator.register_character(name, attributes);
    }

    let board = coordinator.blackboard();
    let planner = board.handle("planner");
    let writer = board.handle("writer");
    writer.subscribe("plan/*")?;

    println!("1. Playing episodes...");
    for scripted in fixtures::villain_saga() {
        let n = scripted.draft.number;
        planner.write(&format!("plan/episode_{n}"), json!({ "summary": scripted.draft.summary }));
        for notification in writer.take_notifications() {
            let plan = writer.read(&notification.key)?;
            println!("   writer picked up {} (v{}): {}", notification.key, notification.version, plan["summary"]);
        }

        let context = coordinator.related_context(n, &scripted.draft.summary, 2);
        let related: Vec<u32> = context.iter().map(|m| m.episode).collect();

        let report = coordinator.accept_episode(&scripted.draft)?;
        let status = if report.approved { "OK" } else { "FLAGGED" };
        println!("   episode {n}: {status} (related: {related:?})");
        for finding in &report.findings {
            println!("      {finding}");
        }
    }

    println!("\n2. Character arcs...");
    for name in ["Mira", "Villain"] {
        let arc = coordinator.tracker().get_character_arc(name)?;
        println!("   {name}: episodes {:?}", arc.episodes);
        for moment in &arc.key_moments {
            println!("      {moment}");
        }
    }

    println!("\n3. Agent activity...");
    for (agent, activity) in board.get_agent_status() {
        println!(
            "   {agent}: {} writes, {} reads, {} queries",
            activity.writes, activity.reads, activity.queries
        );
    }

    println!("\n4. Checkpoint and resume...");
    let dir = std::env::temp_dir().join("storyweave-walkthrough");
    let path = coordinator.checkpoint().save_in_dir(&dir).await?;

    for info in list_checkpoints(&dir).await? {
        println!(
            "   {}: {} episodes, {} characters, {} entries",
            info.path.display(),
            info.metadata.episodes.len(),
            info.metadata.characters.len(),
            info.metadata.blackboard_entries
        );
    }

    let mut resumed = Coordinator::default();
    resumed.restore(SessionCheckpoint::load_json(&path).await?)?;
    let amulet = resumed.index().check_item_status("Amulet", 5)?;
    println!(
        "   resumed: Amulet first seen in episode {:?}, last seen in episode {:?}",
        amulet.first_appearance, amulet.last_seen
    );

    println!("\n=== Done ===");
    Ok(())
}
