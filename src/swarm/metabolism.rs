//! Per-tick energy and health bookkeeping for living agents.

use super::store::AgentStore;
use crate::core::config::AgentConfig;
use crate::field::FieldGrid;

/// Charge movement cost, feed from the local resource, take damage from
/// active danger events, heal while fed, age by one tick.
pub fn metabolise(store: &mut AgentStore, fields: &mut FieldGrid, cfg: &AgentConfig, dt: f32) {
    for i in store.alive_indices() {
        let cell = fields.cell_of(store.x[i], store.y[i]);
        let cost = (cfg.base_metabolism + cfg.move_cost * store.speed(i)) * dt;
        let taken = fields.consume_resource(cell, cfg.consume_rate * dt);
        let energy = store.energy[i] - cost + taken * cfg.resource_energy;
        store.set_energy(i, energy);

        let mut hp = store.hp[i] - cfg.danger_damage * fields.event_danger.at(0, cell) * dt;
        if store.energy[i] > 0.0 {
            hp += cfg.heal_rate * dt;
        }
        store.set_hp(i, hp);
        store.age[i] = store.age[i].saturating_add(1);
    }
}

/// Living agents feed back into value_mass (by energy fraction) and will
/// (by valence) at their cell.
pub fn deposit(store: &AgentStore, fields: &mut FieldGrid, cfg: &AgentConfig) {
    let max_energy = store.max_energy().max(f32::EPSILON);
    for i in store.alive_indices() {
        let cell = fields.cell_of(store.x[i], store.y[i]);
        let vm = cfg.deposit_value_mass * (store.energy[i] / max_energy);
        let will = cfg.deposit_will * store.valence[i];
        fields.deposit(cell, vm, will);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GridConfig;
    use crate::swarm::store::AgentProperties;

    fn setup() -> (AgentStore, FieldGrid, AgentConfig) {
        let cfg = AgentConfig {
            capacity: 4,
            ..AgentConfig::default()
        };
        let grid = GridConfig {
            width: 8,
            height: 8,
            ..GridConfig::default()
        };
        (AgentStore::new(&cfg, 8, 8), FieldGrid::new(&grid), cfg)
    }

    #[test]
    fn feeding_offsets_base_cost() {
        let (mut store, mut fields, cfg) = setup();
        let i = store.allocate("a", &AgentProperties::at(2.0, 2.0).with_energy(50.0)).unwrap();
        metabolise(&mut store, &mut fields, &cfg, 1.0);
        let expected = 50.0 - cfg.base_metabolism + cfg.consume_rate * cfg.resource_energy;
        assert!((store.energy[i] - expected).abs() < 1e-4);
        assert_eq!(store.age[i], 1);
    }

    #[test]
    fn starving_agent_hits_zero_not_below() {
        let (mut store, mut fields, cfg) = setup();
        fields.resource.data.iter_mut().for_each(|r| *r = 0.0);
        let i = store.allocate("a", &AgentProperties::at(1.0, 1.0).with_energy(0.1)).unwrap();
        metabolise(&mut store, &mut fields, &cfg, 1.0);
        assert_eq!(store.energy[i], 0.0);
    }

    #[test]
    fn danger_events_wound() {
        let (mut store, mut fields, cfg) = setup();
        let i = store.allocate("a", &AgentProperties::at(3.0, 3.0).with_hp(50.0)).unwrap();
        let cell = fields.cell_of(3.0, 3.0);
        fields.event_danger.data[cell] = 2.0;
        metabolise(&mut store, &mut fields, &cfg, 1.0);
        assert!(store.hp[i] < 50.0);
    }

    #[test]
    fn deposits_land_in_the_agent_cell() {
        let (mut store, mut fields, cfg) = setup();
        store.allocate("a", &AgentProperties::at(5.0, 6.0).with_energy(500.0)).unwrap();
        deposit(&store, &mut fields, &cfg);
        let cell = fields.cell_of(5.0, 6.0);
        assert!(fields.value_mass.at(0, cell) > 0.0);
        assert!(fields.will.at(0, cell) > 0.0);
        assert_eq!(fields.value_mass.at(0, 0), 0.0);
    }
}
