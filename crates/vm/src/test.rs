use std::fs;
use std::path::PathBuf;

use expect_test::expect;
use pretty_assertions::assert_eq;
use test_log::test;

use crate::map::Coord;
use crate::object::ObjectId;
use crate::{Runtime, RuntimeConfig, RuntimeError, Value};

fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig {
        map_size: (2, 1, 1),
        ..RuntimeConfig::default()
    })
    .unwrap()
}

/// A fresh savefile root under the system temp dir.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dreamrt-{}-{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn loc(rt: &mut Runtime, id: ObjectId) -> Value {
    rt.get_variable(id, "loc").unwrap()
}

#[test]
fn test_declared_vars_fall_back_to_defaults() {
    let mut rt = runtime();
    let ty = rt
        .tree
        .define("/obj/lamp", "/obj")
        .unwrap()
        .var("lit", 0)
        .global("made", 0)
        .finish();
    let a = rt.new_object(&ty).unwrap();
    let b = rt.new_object(&ty).unwrap();

    assert_eq!(rt.get_variable(a, "lit").unwrap(), Value::from(0));
    rt.set_variable(a, "lit", Value::from(1)).unwrap();
    assert_eq!(rt.get_variable(a, "lit").unwrap(), Value::from(1));
    assert_eq!(rt.get_variable(b, "lit").unwrap(), Value::from(0));

    rt.set_variable(a, "made", Value::from(2)).unwrap();
    assert_eq!(rt.get_variable(b, "made").unwrap(), Value::from(2));

    assert!(matches!(
        rt.get_variable(a, "colour"),
        Err(RuntimeError::UndefinedVariable { .. })
    ));
    assert!(matches!(
        rt.set_variable(a, "colour", Value::Null),
        Err(RuntimeError::UndefinedVariable { .. })
    ));
    assert!(rt.has_variable(a, "lit").unwrap());
    assert!(rt.has_variable(a, "type").unwrap());
    assert!(!rt.has_variable(a, "colour").unwrap());
}

#[test]
fn test_type_vars_are_read_only() {
    let mut rt = runtime();
    let obj = rt.new_object_path("/obj").unwrap();
    match rt.get_variable(obj, "type").unwrap() {
        Value::Type(ty) => assert_eq!(ty.path.as_str(), "/obj"),
        other => panic!("unexpected type var {:?}", other),
    }
    match rt.get_variable(obj, "parent_type").unwrap() {
        Value::Type(ty) => assert_eq!(ty.path.as_str(), "/atom/movable"),
        other => panic!("unexpected parent_type var {:?}", other),
    }
    assert!(matches!(
        rt.set_variable(obj, "type", Value::Null),
        Err(RuntimeError::NotSupported { .. })
    ));
}

#[test]
fn test_appearance_vars() {
    let mut rt = runtime();
    let obj = rt.new_object_path("/obj").unwrap();
    assert_eq!(rt.display_name(obj), "obj");

    rt.set_variable(obj, "name", Value::string("crate")).unwrap();
    rt.set_variable(obj, "icon_state", Value::string("open")).unwrap();
    rt.set_variable(obj, "dir", Value::from(4)).unwrap();
    assert_eq!(rt.display_name(obj), "crate");
    assert_eq!(rt.get_variable(obj, "icon_state").unwrap(), Value::string("open"));
    assert_eq!(rt.get_variable(obj, "dir").unwrap(), Value::from(4));
    assert_eq!(rt.appearances.get_appearance(obj).direction, 4);

    let transform = rt.new_list_from(vec![
        Value::from(2),
        Value::from(0),
        Value::from(0),
        Value::from(0),
        Value::from(2),
        Value::from(0),
    ]);
    rt.set_variable(obj, "transform", transform.value()).unwrap();
    let matrix = rt.get_variable(obj, "transform").unwrap();
    assert_eq!(rt.get_variable(matrix.as_object().unwrap(), "e").unwrap(), Value::from(2));
}

#[test]
fn test_loc_and_coordinates() {
    let mut rt = runtime();
    let first = rt.map.turf_at(Coord::new(1, 1, 1)).unwrap();
    let second = rt.map.turf_at(Coord::new(2, 1, 1)).unwrap();
    let mob = rt.new_object_path("/mob").unwrap();

    rt.set_variable(mob, "loc", Value::Object(first)).unwrap();
    assert_eq!(loc(&mut rt, mob), Value::Object(first));
    rt.set_variable(mob, "x", Value::from(2)).unwrap();
    assert_eq!(loc(&mut rt, mob), Value::Object(second));
    assert_eq!(rt.get_variable(mob, "y").unwrap(), Value::from(1));

    let area = rt.map.default_area().unwrap();
    assert_eq!(loc(&mut rt, second), Value::Object(area));
    assert!(rt.set_variable(second, "x", Value::from(1)).is_err());
    assert!(matches!(
        rt.set_variable(mob, "loc", Value::from(3)),
        Err(RuntimeError::TypeCast { .. })
    ));
}

#[test]
fn test_world_size_vars_resize_the_map() {
    let mut rt = runtime();
    let world = rt.world();
    assert_eq!(rt.get_variable(world, "maxx").unwrap(), Value::from(2));

    let far = rt.map.turf_at(Coord::new(2, 1, 1)).unwrap();
    let mob = rt.new_object_path("/mob").unwrap();
    rt.set_loc(mob, Some(far)).unwrap();

    rt.set_variable(world, "maxx", Value::from(1)).unwrap();
    assert_eq!(rt.map.size(), (1, 1, 1));
    assert!(!rt.is_alive(far));
    assert_eq!(loc(&mut rt, mob), Value::Null);
    assert!(rt.set_variable(world, "maxy", Value::from(-1)).is_err());
}

#[test]
fn test_replacing_a_turf_keeps_movables() {
    let mut rt = runtime();
    let coord = Coord::new(1, 1, 1);
    let old = rt.map.turf_at(coord).unwrap();
    let mob = rt.new_object_path("/mob").unwrap();
    rt.set_loc(mob, Some(old)).unwrap();

    let ty = rt.tree.define("/turf/floor", "/turf").unwrap().finish();
    let floor = rt.new_turf(&ty, coord).unwrap();
    assert_eq!(rt.map.turf_at(coord), Some(floor));
    assert!(!rt.is_alive(old));
    assert_eq!(loc(&mut rt, mob), Value::Object(floor));

    let obj = rt.tree.get("/obj").unwrap();
    assert!(rt.new_turf(&obj, coord).is_err());
}

#[test]
fn test_delete_detaches_from_the_map() {
    let mut rt = runtime();
    let turf = rt.map.turf_at(Coord::new(1, 1, 1)).unwrap();
    let bag = rt.new_object_path("/obj").unwrap();
    let coin = rt.new_object_path("/obj").unwrap();
    rt.set_loc(bag, Some(turf)).unwrap();
    rt.set_loc(coin, Some(bag)).unwrap();

    rt.delete(bag);
    assert!(!rt.is_alive(bag));
    assert!(rt.map.cell(Coord::new(1, 1, 1)).unwrap().movables.is_empty());
    assert_eq!(loc(&mut rt, coin), Value::Null);
    assert!(matches!(rt.get_variable(bag, "loc"), Err(RuntimeError::DeletedObject)));

    // references to deleted objects compare as null
    assert!(rt.equals(&Value::Object(bag), &Value::Null));
    rt.delete(bag);

    rt.set_loc(coin, Some(turf)).unwrap();
    rt.delete(turf);
    assert_eq!(rt.map.turf_at(Coord::new(1, 1, 1)), None);
    assert_eq!(loc(&mut rt, coin), Value::Null);
}

#[test]
fn test_deleting_an_area_returns_its_cells() {
    let mut rt = runtime();
    let ty = rt.tree.get("/area").unwrap();
    let area = rt.new_area(&ty).unwrap();
    let turf = rt.map.turf_at(Coord::new(2, 1, 1)).unwrap();
    rt.set_turf_area(turf, area).unwrap();

    rt.delete(area);
    assert_eq!(rt.map.area_at(Coord::new(2, 1, 1)), rt.map.default_area());
}

#[test]
fn test_the_world_cannot_be_deleted() {
    let mut rt = runtime();
    let world = rt.world();
    rt.delete(world);
    assert!(rt.is_alive(world));
}

#[test]
fn test_queued_deletions_run_on_tick() {
    let mut rt = runtime();
    let obj = rt.new_object_path("/obj").unwrap();
    let sender = rt.deletion_sender();

    std::thread::spawn(move || {
        sender.delete(obj);
    })
    .join()
    .unwrap();
    assert!(rt.is_alive(obj));

    rt.tick();
    assert!(!rt.is_alive(obj));
    assert_eq!(rt.process_deletions(), 0);
}

#[test]
fn test_disconnect_drops_the_connection() {
    let mut rt = runtime();
    let (connection, client) = rt.connect_client("someone").unwrap();
    assert_eq!(rt.get_variable(client, "ckey").unwrap(), Value::string("someone"));

    rt.disconnect_client(connection);
    assert!(!rt.is_alive(client));
    assert!(rt.clients.connection(connection).is_none());
}

#[test]
fn test_savefile_flushes_on_tick() {
    let root = scratch_dir("flush");
    let mut rt = Runtime::new(RuntimeConfig {
        savefile_root: root.clone(),
        ..RuntimeConfig::default()
    })
    .unwrap();
    let save = rt.open_savefile(Some("player.sav")).unwrap();
    rt.savefile_write(save, Some("name"), &Value::string("crate"))
        .unwrap();
    assert!(!root.join("player.sav").exists());

    rt.tick();
    let text = fs::read_to_string(root.join("player.sav")).unwrap();
    expect![[r#"{"$type":"dir","nodes":{"name":{"$type":"primitive","value":"crate"}}}"#]]
        .assert_eq(&text);

    let again = rt.open_savefile(Some("player.sav")).unwrap();
    assert_eq!(
        rt.savefile_read(again, Some("name")).unwrap(),
        Value::string("crate")
    );
    assert_eq!(rt.savefile_read(again, Some("missing")).unwrap(), Value::Null);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_savefile_dir_list() {
    let root = scratch_dir("dir");
    let mut rt = Runtime::new(RuntimeConfig {
        savefile_root: root.clone(),
        ..RuntimeConfig::default()
    })
    .unwrap();
    let save = rt.open_savefile(None).unwrap();
    rt.savefile_write(save, Some("b"), &Value::from(1)).unwrap();
    rt.savefile_write(save, Some("a"), &Value::from(2)).unwrap();

    let dir = rt.get_variable(save, "dir").unwrap();
    let dir = rt.as_list(&dir).unwrap();
    assert_eq!(
        dir.values(&mut rt).unwrap(),
        vec![Value::string("a"), Value::string("b")]
    );

    dir.add(&mut rt, Value::string("c")).unwrap();
    dir.set(&mut rt, &Value::from(1), Value::string("z")).unwrap();
    dir.remove(&mut rt, &Value::string("b")).unwrap();
    assert_eq!(
        dir.values(&mut rt).unwrap(),
        vec![Value::string("c"), Value::string("z")]
    );
    assert_eq!(rt.savefile_read(save, Some("z")).unwrap(), Value::from(2));

    rt.set_variable(save, "cd", Value::string("c")).unwrap();
    assert_eq!(rt.get_variable(save, "cd").unwrap(), Value::string("/c"));
    assert_eq!(dir.len(&mut rt).unwrap(), 0);

    rt.delete(save);
    assert!(fs::read_dir(&root).map_or(true, |mut entries| entries.next().is_none()));
    let _ = fs::remove_dir_all(&root);
}
