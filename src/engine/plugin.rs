use std::sync::{Arc, RwLock};

use bevy::prelude::*;

use crate::engine::config::SimConfig;
use crate::engine::events::SimEvent;
use crate::engine::simulation::Simulation;
use crate::persistence::MemoryStore;

/// Runs a [`Simulation`] off Bevy's frame clock and republishes its events.
#[derive(Default)]
pub struct SimulationPlugin {
    pub config: SimConfig,
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SimEvent>();

        let simulation = match Simulation::new(self.config.clone(), Box::new(MemoryStore::new())) {
            Ok(simulation) => simulation,
            Err(err) => {
                error!("simulation not started: {err}");
                return;
            }
        };

        app.insert_resource(SimulationResource(Arc::new(RwLock::new(simulation))))
            .add_systems(Update, simulation_tick_system);
    }
}

#[derive(Resource)]
pub struct SimulationResource(pub Arc<RwLock<Simulation>>);

fn simulation_tick_system(
    time: Res<Time>,
    simulation: Res<SimulationResource>,
    mut events: EventWriter<SimEvent>,
) {
    if let Ok(mut simulation) = simulation.0.write() {
        simulation.tick(time.delta_secs());
        for event in simulation.drain_events() {
            events.send(event);
        }
    }
}
