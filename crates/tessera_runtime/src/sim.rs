//! Particle simulation driven by ordered phase signals.
//!
//! Phases run once per frame on `(&mut Registry, dt)`:
//! `spawn` tops the population up from a prefab, `physics` integrates
//! motion across rayon workers, `cull` destroys expired particles while
//! iterating over them.

use crate::settings::RuntimeSettings;
use anyhow::Result;
use glam::Vec3;
use tessera_core::ecs::{EntityId, Prefab, Registry, Signal};

pub const GRAVITY: f32 = -9.81;
pub const FLOOR: f32 = -50.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position(pub Vec3);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity(pub Vec3);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lifetime(pub f32);

/// Particles pinned in place; skipped by physics.
#[derive(Clone, Copy, Debug, Default)]
pub struct Frozen;

pub type Phases = Signal<Registry, f32>;

pub fn particle_prefab(lifetime: f32) -> Result<Prefab> {
    Ok(Prefab::new()
        .with(Position::default())?
        .with(Velocity::default())?
        .with(Lifetime(lifetime))?)
}

/// Deterministic launch velocity derived from the entity id.
fn launch_velocity(id: EntityId) -> Vec3 {
    let h = id.index().wrapping_mul(0x9E37_79B9);
    let unit = |shift: u32| ((h >> shift) & 0xFF) as f32 / 255.0 - 0.5;
    Vec3::new(unit(0) * 10.0, 5.0 + unit(8) * 10.0, unit(16) * 10.0)
}

fn spawn(registry: &mut Registry, prefab: &Prefab, population: usize) {
    let missing = population.saturating_sub(registry.len());
    for _ in 0..missing {
        let id = match prefab.instantiate(registry) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(%err, "spawn failed");
                return;
            }
        };
        if let Ok(velocity) = registry.get_mut::<Velocity>(id) {
            velocity.0 = launch_velocity(id);
        }
        if id.index() % 10 == 0 {
            if let Err(err) = registry.add(id, Frozen) {
                tracing::warn!(%err, "freeze failed");
            }
        }
    }
}

fn physics(registry: &mut Registry, dt: f32) {
    match registry.view::<(Position, Velocity)>() {
        Ok(view) => view
            .excluding::<(Frozen,)>()
            .par_each(|_, (position, velocity)| {
                velocity.0.y += GRAVITY * dt;
                position.0 += velocity.0 * dt;
            }),
        Err(err) => tracing::warn!(%err, "physics view failed"),
    }
    if let Err(err) = registry.each::<(Lifetime,), _>(|_, (lifetime,)| lifetime.0 -= dt) {
        tracing::warn!(%err, "lifetime pass failed");
    }
}

fn cull(registry: &mut Registry) {
    let mut view = match registry.view::<(Lifetime,)>() {
        Ok(view) => view,
        Err(err) => {
            tracing::warn!(%err, "cull view failed");
            return;
        }
    };
    view.each_entity(|registry, id| {
        let expired = registry.try_get::<Lifetime>(id).is_some_and(|l| l.0 <= 0.0);
        let fell = registry.try_get::<Position>(id).is_some_and(|p| p.0.y < FLOOR);
        if expired || fell {
            registry.destroy(id);
        }
    });
}

/// Build the per-frame phase list. `cull` is connected first and still runs
/// last because it names `physics` as a dependency.
pub fn build_phases(settings: &RuntimeSettings) -> Result<Phases> {
    let prefab = particle_prefab(settings.lifetime)?;
    let population = settings.population;

    let mut phases = Phases::new();
    phases.connect_after("cull", &["physics"], |registry, _| cull(registry))?;
    phases.connect_named("spawn", move |registry, _| {
        spawn(registry, &prefab, population)
    });
    phases.connect_after("physics", &["spawn"], physics)?;
    Ok(phases)
}
