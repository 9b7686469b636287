use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use formation_engine::config::FormationConfig;
use formation_engine::formation::events::FormationEvent;
use formation_engine::formation::{AgentHandle, FormationRegistry, FormationType};
use formation_engine::sim::SimulatedAgent;
use formation_engine::util::vec3::Vec3;

/// Ticks to run before stopping on its own
const DEMO_TICKS: u32 = 300;
const AGENT_SPEED: f32 = 6.0;

fn spawn_squad(origin: Vec3, count: usize) -> Vec<Arc<SimulatedAgent>> {
    (0..count)
        .map(|i| {
            let offset = Vec3::from_angle_xz(i as f32 * 1.3, 2.0 + i as f32);
            SimulatedAgent::with_speed(origin + offset, AGENT_SPEED)
        })
        .collect()
}

fn as_handles(squad: &[Arc<SimulatedAgent>]) -> Vec<AgentHandle> {
    squad.iter().map(|a| a.clone() as AgentHandle).collect()
}

fn log_event(event: &FormationEvent) {
    match event {
        FormationEvent::Created { .. } | FormationEvent::Disbanded { .. } => {
            info!(formation = %event.formation_id(), ?event, "Formation event")
        }
        FormationEvent::MoveCompleted { position, .. } => {
            info!(formation = %event.formation_id(), ?position, "Formation arrived")
        }
        _ => debug!(formation = %event.formation_id(), ?event, "Formation event"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Formation Sim v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = FormationConfig::load_or_default();
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid formation configuration")?;
    info!(
        "Configuration loaded: tick_interval={}s, arrival_tolerance={}",
        config.tick_interval, config.arrival_tolerance
    );

    let tick_interval = config.tick_interval;
    let mut registry = FormationRegistry::new(config);
    let events = registry.subscribe();

    // Two squads: a wedge heading east and a line heading north
    let alpha = spawn_squad(Vec3::ZERO, 7);
    let bravo = spawn_squad(Vec3::new(-30.0, 0.0, 0.0), 5);
    let alpha_handles = as_handles(&alpha);
    let bravo_handles = as_handles(&bravo);

    let wedge = registry.create_formation(FormationType::Wedge, &alpha_handles[0], &alpha_handles[1..])?;
    let line = registry.create_formation(FormationType::Line, &bravo_handles[0], &bravo_handles[1..])?;
    registry.set_rotation(line, std::f32::consts::FRAC_PI_2)?;

    registry.move_formation(wedge, Vec3::new(40.0, 0.0, 0.0))?;
    registry.move_formation(line, Vec3::new(-30.0, 0.0, 35.0))?;

    let mut interval = tokio::time::interval(Duration::from_secs_f32(tick_interval));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };
    tokio::pin!(shutdown);

    let mut ticks = 0u32;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                for agent in alpha.iter().chain(bravo.iter()) {
                    agent.advance(tick_interval);
                }

                // A casualty partway through exercises pruning
                if ticks == 30 {
                    info!("Removing a wedge member");
                    alpha[3].kill();
                }

                let summary = registry.tick(tick_interval);
                if summary.arrivals > 0 || summary.disbanded > 0 {
                    debug!(?summary, "Tick summary");
                }
                for event in events.try_iter() {
                    log_event(&event);
                }

                ticks += 1;
                let all_settled = registry
                    .list_formations()
                    .into_iter()
                    .filter_map(|id| registry.get_formation(id))
                    .all(|f| !f.is_moving());
                if all_settled {
                    info!("All formations arrived after {} ticks", ticks);
                    break;
                }
                if ticks >= DEMO_TICKS {
                    warn!("Tick limit reached before arrival");
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down...");
                break;
            }
        }
    }

    let stats = registry.get_statistics();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    for id in registry.list_formations() {
        if let Some(info) = registry.get_formation_info(id) {
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    // Cleanup
    registry.shutdown();
    for event in events.try_iter() {
        log_event(&event);
    }
    info!("Formation sim stopped after {} ticks", ticks);

    Ok(())
}
