//! End-to-end snapshot round trips.

use engine_snapshot::{
    BEST_COMPRESSION, BEST_SPEED, SerdeError, SerdeOptions, TypeKind, deserialize, serialize,
};
use engine_world::{Component, Entity, Resource, World};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Position {
    x: f64,
    y: f64,
}

impl Component for Position {
    fn type_name() -> &'static str {
        "main.Position"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Velocity {
    x: f64,
    y: f64,
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "main.Velocity"
    }
}

impl Resource for Velocity {
    fn type_name() -> &'static str {
        "main.Velocity"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ChildOf;

impl Component for ChildOf {
    fn type_name() -> &'static str {
        "main.ChildOf"
    }

    fn is_relation() -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Grid<T> {
    cells: Vec<T>,
}

impl<T> Component for Grid<T> where T: Serialize + serde::de::DeserializeOwned + Send + Sync + 'static {}

struct Scene {
    world: World,
    a: Entity,
    b: Entity,
}

/// Entity A with `Position{1,2}`; entity B with `Position{3,4}`,
/// `Velocity{5,6}` and `ChildOf` targeting A; resource `Velocity{1000,0}`.
fn make_scene() -> Scene {
    let mut world = World::new();
    let a = world.spawn_with(Position { x: 1.0, y: 2.0 }).unwrap();
    let b = world.spawn_with(Position { x: 3.0, y: 4.0 }).unwrap();
    world.insert(b, Velocity { x: 5.0, y: 6.0 }).unwrap();
    world.insert_relation(b, ChildOf, a).unwrap();
    world.add_resource(Velocity { x: 1000.0, y: 0.0 }).unwrap();
    Scene { world, a, b }
}

fn make_target() -> World {
    let mut world = World::new();
    world.register_component::<Position>().unwrap();
    world.register_component::<Velocity>().unwrap();
    world.register_component::<ChildOf>().unwrap();
    world.add_resource(Velocity { x: 0.0, y: 0.0 }).unwrap();
    world
}

fn roundtrip(source: &World, options: &SerdeOptions) -> World {
    let bytes = serialize(source, options).unwrap();
    let mut target = make_target();
    deserialize(&bytes, &mut target, options).unwrap();
    target
}

#[test]
fn test_concrete_scene() {
    let scene = make_scene();
    let target = roundtrip(&scene.world, &SerdeOptions::new());

    assert_eq!(target.relation_target::<ChildOf>(scene.b), Some(scene.a));
    assert_eq!(target.get::<Velocity>(scene.b), Some(&Velocity { x: 5.0, y: 6.0 }));
    assert_eq!(target.get::<Position>(scene.a), Some(&Position { x: 1.0, y: 2.0 }));
    assert_eq!(target.get::<Position>(scene.b), Some(&Position { x: 3.0, y: 4.0 }));
    assert!(!target.has::<Velocity>(scene.a));
    assert_eq!(target.resource::<Velocity>(), Some(&Velocity { x: 1000.0, y: 0.0 }));
}

#[test]
fn test_relation_target_precedes_component_in_document() {
    let scene = make_scene();
    let text = String::from_utf8(serialize(&scene.world, &SerdeOptions::new()).unwrap()).unwrap();
    let target_at = text.find("\"main.ChildOf.ark.relation.Target\":[1,0]").unwrap();
    let component_at = text.find("\"main.ChildOf\":null").unwrap();
    assert!(target_at < component_at);
}

#[test]
fn test_roundtrip_preserves_identities_and_free_list() {
    let mut source = World::new();
    let mut spawned = Vec::new();
    for i in 0..10_i32 {
        spawned.push(source.spawn_with(Position { x: f64::from(i), y: 0.0 }).unwrap());
    }
    for &e in spawned.iter().step_by(3) {
        source.despawn(e).unwrap();
    }
    let recycled = source.spawn_with(Position { x: -1.0, y: -1.0 }).unwrap();
    assert_eq!(recycled.generation(), 1);
    let parent = spawned[1];
    source.insert_relation(recycled, ChildOf, parent).unwrap();

    let mut target = roundtrip(&source, &SerdeOptions::new());

    let mut expected: Vec<Entity> = source.entities().collect();
    let mut actual: Vec<Entity> = target.entities().collect();
    expected.sort();
    actual.sort();
    assert_eq!(expected, actual);
    for &e in &expected {
        assert_eq!(target.get::<Position>(e), source.get::<Position>(e));
    }
    assert_eq!(target.relation_target::<ChildOf>(recycled), Some(parent));
    for &dead in spawned.iter().step_by(3) {
        assert!(!target.is_alive(dead));
    }

    for _ in 0..5 {
        assert_eq!(source.spawn(), target.spawn());
    }
}

#[test]
fn test_relation_to_invalid_entity() {
    let mut source = World::new();
    let e = source.spawn();
    source.insert_relation(e, ChildOf, Entity::INVALID).unwrap();
    let target = roundtrip(&source, &SerdeOptions::new());
    assert!(target.has::<ChildOf>(e));
    assert_eq!(target.relation_target::<ChildOf>(e), Some(Entity::INVALID));
}

#[test]
fn test_despawned_relation_target_roundtrips_as_invalid() {
    let mut source = World::new();
    let parent = source.spawn();
    let child = source.spawn_with(Position { x: 1.0, y: 1.0 }).unwrap();
    let grandchild = source.spawn();
    source.insert_relation(child, ChildOf, parent).unwrap();
    source.insert_relation(grandchild, ChildOf, child).unwrap();
    source.despawn(parent).unwrap();

    let text = String::from_utf8(serialize(&source, &SerdeOptions::new()).unwrap()).unwrap();
    assert!(text.contains("\"main.ChildOf.ark.relation.Target\":[0,0]"), "{text}");

    let mut target = roundtrip(&source, &SerdeOptions::new());
    assert!(!target.is_alive(parent));
    assert_eq!(target.relation_target::<ChildOf>(child), Some(Entity::INVALID));
    assert_eq!(target.relation_target::<ChildOf>(grandchild), Some(child));
    assert_eq!(target.get::<Position>(child), Some(&Position { x: 1.0, y: 1.0 }));
    assert_eq!(source.spawn(), target.spawn());
}

#[test]
fn test_generic_instantiations_roundtrip_separately() {
    let mut source = World::new();
    let e = source.spawn_with(Grid { cells: vec![1_i32, 2, 3] }).unwrap();
    source.insert(e, Grid { cells: vec![0.5_f32] }).unwrap();

    let bytes = serialize(&source, &SerdeOptions::new()).unwrap();
    let mut target = World::new();
    target.register_component::<Grid<i32>>().unwrap();
    target.register_component::<Grid<f32>>().unwrap();
    deserialize(&bytes, &mut target, &SerdeOptions::new()).unwrap();

    assert_eq!(target.get::<Grid<i32>>(e).unwrap().cells, vec![1, 2, 3]);
    assert_eq!(target.get::<Grid<f32>>(e).unwrap().cells, vec![0.5]);
}

#[test]
fn test_skip_component() {
    let scene = make_scene();
    let options = SerdeOptions::new().skip_component::<Velocity>();
    let target = roundtrip(&scene.world, &options);

    assert!(target.is_alive(scene.a) && target.is_alive(scene.b));
    assert!(!target.has::<Velocity>(scene.b));
    assert_eq!(target.get::<Position>(scene.b), Some(&Position { x: 3.0, y: 4.0 }));
    assert_eq!(target.relation_target::<ChildOf>(scene.b), Some(scene.a));
}

#[test]
fn test_skip_relation_component() {
    let scene = make_scene();
    let options = SerdeOptions::new().skip_component::<ChildOf>();
    let bytes = serialize(&scene.world, &options).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(!text.contains("ark.relation.Target"));

    let mut target = make_target();
    deserialize(&bytes, &mut target, &options).unwrap();
    assert!(!target.has::<ChildOf>(scene.b));
    assert!(target.has::<Velocity>(scene.b));
}

#[test]
fn test_skip_on_read_only() {
    let scene = make_scene();
    let bytes = serialize(&scene.world, &SerdeOptions::new()).unwrap();
    let mut target = make_target();
    let options = SerdeOptions::new().skip_component::<Position>();
    deserialize(&bytes, &mut target, &options).unwrap();
    assert!(!target.has::<Position>(scene.a));
    assert!(target.has::<Velocity>(scene.b));
}

#[test]
fn test_skip_all_components() {
    let scene = make_scene();
    let options = SerdeOptions::new().skip_all_components();
    let target = roundtrip(&scene.world, &options);
    assert_eq!(target.entity_count(), 2);
    assert!(target.components_of(scene.b).is_empty());
    assert_eq!(target.resource::<Velocity>(), Some(&Velocity { x: 1000.0, y: 0.0 }));
}

#[test]
fn test_skip_entities() {
    let scene = make_scene();
    let options = SerdeOptions::new().skip_entities();
    let target = roundtrip(&scene.world, &options);
    assert_eq!(target.entity_count(), 0);
    assert_eq!(target.ever_allocated(), 0);
    assert_eq!(target.resource::<Velocity>(), Some(&Velocity { x: 1000.0, y: 0.0 }));
}

#[test]
fn test_skip_entities_allows_populated_target() {
    let scene = make_scene();
    let options = SerdeOptions::new().skip_entities();
    let bytes = serialize(&scene.world, &options).unwrap();
    let mut target = make_target();
    let existing = target.spawn_with(Position { x: 9.0, y: 9.0 }).unwrap();
    deserialize(&bytes, &mut target, &options).unwrap();
    assert_eq!(target.get::<Position>(existing), Some(&Position { x: 9.0, y: 9.0 }));
    assert_eq!(target.resource::<Velocity>(), Some(&Velocity { x: 1000.0, y: 0.0 }));
}

#[test]
fn test_skip_resources() {
    let scene = make_scene();
    for options in [
        SerdeOptions::new().skip_all_resources(),
        SerdeOptions::new().skip_resource::<Velocity>(),
    ] {
        let target = roundtrip(&scene.world, &options);
        assert_eq!(target.resource::<Velocity>(), Some(&Velocity { x: 0.0, y: 0.0 }));
        assert!(target.has::<Velocity>(scene.b));
    }
}

#[test]
fn test_compression_is_transparent() {
    let scene = make_scene();
    let plain = serialize(&scene.world, &SerdeOptions::new()).unwrap();
    for level in [0, BEST_SPEED, BEST_COMPRESSION] {
        let options = SerdeOptions::new().compress_level(level);
        let packed = serialize(&scene.world, &options).unwrap();
        assert_ne!(packed, plain);
        assert_eq!(engine_snapshot::compress::decompress(&packed).unwrap(), plain);

        let target = roundtrip(&scene.world, &options);
        assert_eq!(target.relation_target::<ChildOf>(scene.b), Some(scene.a));
        assert_eq!(target.resource::<Velocity>(), Some(&Velocity { x: 1000.0, y: 0.0 }));
    }
}

#[test]
fn test_compression_mismatch() {
    let scene = make_scene();
    let packed = serialize(&scene.world, &SerdeOptions::new().compress()).unwrap();
    assert!(matches!(
        deserialize(&packed, &mut make_target(), &SerdeOptions::new()),
        Err(SerdeError::MalformedDocument(_))
    ));

    let plain = serialize(&scene.world, &SerdeOptions::new()).unwrap();
    assert!(matches!(
        deserialize(&plain, &mut make_target(), &SerdeOptions::new().compress()),
        Err(SerdeError::CorruptStream(_))
    ));
}

fn scene_document() -> Value {
    let scene = make_scene();
    serde_json::from_slice(&serialize(&scene.world, &SerdeOptions::new()).unwrap()).unwrap()
}

#[test]
fn test_count_mismatch() {
    for records in [json!([{}]), json!([{}, {}, {}])] {
        let mut doc = scene_document();
        doc["Components"] = records;
        let bytes = serde_json::to_vec(&doc).unwrap();

        let mut target = make_target();
        let err = deserialize(&bytes, &mut target, &SerdeOptions::new()).unwrap_err();
        assert!(matches!(err, SerdeError::EntityCountMismatch { alive: 2, .. }));
        assert_eq!(target.ever_allocated(), 0);
    }
}

#[test]
fn test_unregistered_component_leaves_target_untouched() {
    let mut doc = scene_document();
    doc["Types"].as_array_mut().unwrap().push(json!("X.Unknown"));
    doc["Components"][0]["X.Unknown"] = json!({});
    let bytes = serde_json::to_vec(&doc).unwrap();

    let mut target = make_target();
    let err = deserialize(&bytes, &mut target, &SerdeOptions::new()).unwrap_err();
    match err {
        SerdeError::UnregisteredType { kind, name } => {
            assert_eq!(kind, TypeKind::Component);
            assert_eq!(name, "X.Unknown");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(target.ever_allocated(), 0);
    assert_eq!(target.resource::<Velocity>(), Some(&Velocity { x: 0.0, y: 0.0 }));
}

#[test]
fn test_skipped_types_must_still_be_registered() {
    let scene = make_scene();
    let bytes = serialize(&scene.world, &SerdeOptions::new()).unwrap();
    let mut target = World::new();
    target.register_component::<Position>().unwrap();
    target.add_resource(Velocity { x: 0.0, y: 0.0 }).unwrap();

    let err = deserialize(&bytes, &mut target, &SerdeOptions::new()).unwrap_err();
    assert!(matches!(err, SerdeError::UnregisteredType { kind: TypeKind::Component, .. }));
}

#[test]
fn test_unregistered_resource() {
    let mut doc = scene_document();
    doc["Resources"]["X.Unknown"] = json!(1);
    let bytes = serde_json::to_vec(&doc).unwrap();
    let err = deserialize(&bytes, &mut make_target(), &SerdeOptions::new()).unwrap_err();
    assert!(matches!(err, SerdeError::UnregisteredType { kind: TypeKind::Resource, .. }));
}

#[test]
fn test_resource_without_placeholder() {
    let scene = make_scene();
    let bytes = serialize(&scene.world, &SerdeOptions::new()).unwrap();
    let mut target = World::new();
    target.register_component::<Position>().unwrap();
    target.register_component::<Velocity>().unwrap();
    target.register_component::<ChildOf>().unwrap();
    target.register_resource::<Velocity>().unwrap();

    let err = deserialize(&bytes, &mut target, &SerdeOptions::new()).unwrap_err();
    assert!(matches!(err, SerdeError::ResourceNotInitialized(ref name) if name == "main.Velocity"));
    assert_eq!(target.ever_allocated(), 0);
}

#[test]
fn test_field_decode_error_carries_context() {
    let mut doc = scene_document();
    doc["Components"][1]["main.Velocity"] = json!("fast");
    let bytes = serde_json::to_vec(&doc).unwrap();

    let mut target = make_target();
    let err = deserialize(&bytes, &mut target, &SerdeOptions::new()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("main.Velocity"), "{message}");
    assert!(message.contains("entity #1"), "{message}");
    assert_eq!(target.ever_allocated(), 0);
}

#[test]
fn test_non_empty_target() {
    let scene = make_scene();
    let bytes = serialize(&scene.world, &SerdeOptions::new()).unwrap();
    let mut target = make_target();
    target.spawn();
    assert!(matches!(
        deserialize(&bytes, &mut target, &SerdeOptions::new()),
        Err(SerdeError::InvalidTargetState(1))
    ));
}

#[test]
fn test_reset_world_accepts_snapshot() {
    let scene = make_scene();
    let bytes = serialize(&scene.world, &SerdeOptions::new()).unwrap();
    let mut target = make_target();
    target.spawn_with(Position { x: 0.0, y: 0.0 }).unwrap();
    target.reset();
    target.add_resource(Velocity { x: 0.0, y: 0.0 }).unwrap();

    deserialize(&bytes, &mut target, &SerdeOptions::new()).unwrap();
    assert_eq!(target.relation_target::<ChildOf>(scene.b), Some(scene.a));
}

#[test]
fn test_garbage_input() {
    assert!(matches!(
        deserialize(b"not json", &mut make_target(), &SerdeOptions::new()),
        Err(SerdeError::MalformedDocument(_))
    ));
}
