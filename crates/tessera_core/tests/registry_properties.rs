//! End-to-end behaviour of the registry, views, signals and prefabs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tessera_core::ecs::{EntityId, Prefab, Registry, RegistryError, Signal};
use tessera_core::glam::Vec3;
use tessera_core::pool::SparseSet;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Transform {
    translation: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
struct Tag {
    tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(i32);

#[derive(Debug, Clone, Copy, Default)]
struct Dead;

#[test]
fn test_entity_id_bits_round_trip() {
    for raw in [0, 1, 1023, 1024, 65_537, u32::MAX - 1] {
        let id = EntityId::new(raw);
        assert_eq!(EntityId::from_bits(id.to_bits()), id);
        assert_eq!(id.index(), raw);
    }
}

#[test]
fn test_sparse_set_stays_dense_under_churn() {
    let mut set = SparseSet::with_page_size(16);
    for raw in 0..200 {
        set.insert(EntityId::new(raw * 3));
    }
    for raw in (0..200).filter(|raw| raw % 4 == 1) {
        assert!(set.remove(EntityId::new(raw * 3)).is_some());
        assert!(set.check_integrity());
    }
    assert_eq!(set.len(), 150);
    for (slot, &id) in set.ids().iter().enumerate() {
        assert_eq!(set.index_of(id), Some(slot));
    }
}

#[test]
fn test_removal_moves_last_value_into_hole() {
    let mut registry = Registry::new();
    let ids: Vec<_> = (0..4)
        .map(|n| {
            let id = registry.create();
            registry.add(id, Health(n)).unwrap();
            id
        })
        .collect();

    registry.remove::<Health>(ids[1]).unwrap();

    let pool = registry.pool::<Health>().unwrap();
    assert_eq!(pool.ids(), &[ids[0], ids[3], ids[2]]);
    assert_eq!(pool.values(), &[Health(0), Health(3), Health(2)]);
}

#[test]
fn test_signatures_track_component_membership() {
    let mut registry = Registry::new();
    let a = registry.create();
    let b = registry.create();
    registry.add(a, Health(1)).unwrap();
    registry.add(a, Dead).unwrap();
    registry.add(b, Health(2)).unwrap();
    registry.remove::<Dead>(a).unwrap();

    for &id in registry.entities() {
        let signature = registry.signature(id).unwrap();
        assert_eq!(
            signature.contains(registry.type_index::<Health>().unwrap()),
            registry.pool::<Health>().unwrap().contains(id)
        );
        assert_eq!(
            signature.contains(registry.type_index::<Dead>().unwrap()),
            registry.pool::<Dead>().unwrap().contains(id)
        );
    }
}

#[test]
fn test_recycled_ids_are_reused_lowest_first() {
    let mut registry = Registry::new();
    let ids: Vec<_> = (0..5).map(|_| registry.create()).collect();
    registry.destroy(ids[3]);
    registry.destroy(ids[1]);
    assert_eq!(registry.create(), ids[1]);
    assert_eq!(registry.create(), ids[3]);
    assert_eq!(registry.create(), EntityId::new(5));
}

#[test]
fn test_view_visits_everything_while_destroying() {
    let mut registry = Registry::new();
    for n in 0..100 {
        let id = registry.create();
        registry.add(id, Health(n)).unwrap();
    }

    let mut visits: HashMap<EntityId, usize> = HashMap::new();
    registry
        .view::<(Health,)>()
        .unwrap()
        .each_entity(|registry, id| {
            *visits.entry(id).or_default() += 1;
            if id.index() % 2 == 0 {
                registry.destroy(id);
            }
        });

    assert_eq!(visits.len(), 100);
    assert!(visits.values().all(|&count| count == 1));
    assert_eq!(registry.len(), 50);
    assert!(registry.pool::<Health>().unwrap().set().check_integrity());
}

#[test]
fn test_resetting_a_component_mid_iteration_terminates() {
    let mut registry = Registry::new();
    for n in 0..50 {
        let id = registry.create();
        registry.add(id, Health(n)).unwrap();
    }

    let mut visits = 0;
    registry
        .view::<(Health,)>()
        .unwrap()
        .each_entity(|registry, id| {
            visits += 1;
            assert!(visits <= 100);
            registry.remove::<Health>(id).unwrap();
            registry.add(id, Health(100)).unwrap();
        });

    assert_eq!(visits, 50);
    assert_eq!(registry.pool::<Health>().unwrap().len(), 50);
}

#[test]
fn test_sub_views_cover_the_view_exactly_once() {
    let mut registry = Registry::new();
    for n in 0..37 {
        let id = registry.create();
        registry.add(id, Health(n)).unwrap();
    }

    let mut seen = Vec::new();
    for piece in 0..5 {
        let mut view = registry.view::<(Health,)>().unwrap().sub_view(piece, 5);
        view.each(|id, _| seen.push(id));
    }
    let mut expected = registry.entities().to_vec();
    seen.sort();
    expected.sort();
    assert_eq!(seen, expected);
}

#[test]
fn test_excluded_components_filter_entities() {
    let mut registry = Registry::new();
    let alive = registry.create();
    let dead = registry.create();
    registry.add(alive, Health(10)).unwrap();
    registry.add(dead, Health(0)).unwrap();
    registry.add(dead, Dead).unwrap();

    let view = registry.view::<(Health,)>().unwrap().excluding::<(Dead,)>();
    assert_eq!(view.entities(), vec![alive]);
}

#[test]
fn test_prefab_capture_and_instantiate() {
    let mut registry = Registry::new();
    let source = registry.create();
    registry
        .add(source, Transform { translation: Vec3::new(1.0, 2.0, 3.0) })
        .unwrap();
    registry.add(source, Tag { tag: "x".into() }).unwrap();

    let prefab = Prefab::capture(&registry, source).unwrap();
    assert_eq!(prefab.len(), 2);

    let mut other = Registry::new();
    let copy = prefab.instantiate(&mut other).unwrap();
    assert_eq!(
        other.get::<Transform>(copy).unwrap().translation,
        Vec3::new(1.0, 2.0, 3.0)
    );
    assert_eq!(other.get::<Tag>(copy).unwrap().tag, "x");

    // Mutating the copy leaves the source untouched.
    other.get_mut::<Tag>(copy).unwrap().tag.push('y');
    assert_eq!(registry.get::<Tag>(source).unwrap().tag, "x");
}

#[test]
fn test_lifecycle_signals_fire_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = Registry::new();

    let sink = Arc::clone(&log);
    registry.on_add::<Health>().unwrap().connect(move |_, id| {
        sink.lock().unwrap().push(("add", id));
    });
    let sink = Arc::clone(&log);
    registry.on_remove::<Health>().unwrap().connect(move |registry, id| {
        // Still readable while the remove signal runs.
        assert!(registry.get::<Health>(id).is_ok());
        sink.lock().unwrap().push(("remove", id));
    });
    let sink = Arc::clone(&log);
    registry.on_destroy().connect(move |_, id| {
        sink.lock().unwrap().push(("destroy", id));
    });

    let id = registry.create();
    registry.add(id, Health(3)).unwrap();
    registry.destroy(id);

    assert_eq!(
        *log.lock().unwrap(),
        vec![("add", id), ("remove", id), ("destroy", id)]
    );
}

#[test]
fn test_named_listeners_respect_dependencies() {
    let mut signal: Signal<Vec<&'static str>, ()> = Signal::new();

    signal
        .connect_after("render", &["physics"], |log, _| log.push("render"))
        .unwrap();
    signal.connect_named("input", |log, _| log.push("input"));
    signal
        .connect_after("physics", &["input"], |log, _| log.push("physics"))
        .unwrap();

    let mut log = Vec::new();
    signal.invoke(&mut log, ());
    assert_eq!(log, vec!["input", "physics", "render"]);

    let err = signal
        .connect_after("input2", &["render", "input2"], |_, _| {})
        .unwrap_err();
    assert!(err.to_string().contains("input2"));
    assert_eq!(signal.len(), 3);
}

#[test]
fn test_missing_entity_errors() {
    let mut registry = Registry::new();
    let ghost = EntityId::new(42);
    assert!(matches!(
        registry.add(ghost, Health(1)),
        Err(RegistryError::NoSuchEntity { .. })
    ));
    assert!(!registry.destroy(ghost));
}
