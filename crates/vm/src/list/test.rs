use pretty_assertions::assert_eq;
use test_log::test;

use super::*;
use crate::map::Coord;
use crate::runtime::RuntimeConfig;

fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig {
        map_size: (2, 2, 1),
        ..RuntimeConfig::default()
    })
    .unwrap()
}

fn list_var(rt: &mut Runtime, id: ObjectId, name: &str) -> ListRef {
    let value = rt.get_variable(id, name).unwrap();
    rt.as_list(&value).unwrap()
}

fn strings(values: &[&str]) -> Vec<Value> {
    values.iter().map(|s| Value::string(s)).collect()
}

#[test]
fn test_add_then_key_assignment() {
    let mut rt = runtime();
    let list = rt.new_list();
    list.add(&mut rt, Value::from(5)).unwrap();
    list.add(&mut rt, Value::string("x")).unwrap();
    list.set(&mut rt, &Value::string("key"), Value::from(1)).unwrap();

    assert_eq!(
        list.values(&mut rt).unwrap(),
        vec![Value::from(5), Value::string("x"), Value::string("key")]
    );
    assert_eq!(list.get(&mut rt, &Value::string("key")).unwrap(), Value::from(1));
    assert_eq!(list.get(&mut rt, &Value::string("x")).unwrap(), Value::Null);
    assert!(list.is_associative(&mut rt).unwrap());
    assert!(list.contains_key(&mut rt, &Value::string("key")).unwrap());
    assert!(!list.contains_key(&mut rt, &Value::string("x")).unwrap());
}

#[test]
fn test_index_reads_are_bounds_checked() {
    let mut rt = runtime();
    let list = rt.new_list_from(strings(&["a", "b"]));
    assert_eq!(list.get(&mut rt, &Value::from(2)).unwrap(), Value::string("b"));
    assert!(matches!(
        list.get(&mut rt, &Value::from(3)),
        Err(RuntimeError::IndexOutOfBounds { index: 3, len: 2 })
    ));
    assert!(matches!(
        list.get(&mut rt, &Value::from(0)),
        Err(RuntimeError::IndexOutOfBounds { index: 0, len: 2 })
    ));
    assert!(matches!(
        list.set(&mut rt, &Value::from(3), Value::Null),
        Err(RuntimeError::IndexOutOfBounds { .. })
    ));
    list.set_value(&mut rt, &Value::from(3), Value::string("c"), true)
        .unwrap();
    assert_eq!(list.len(&mut rt).unwrap(), 3);
}

#[test]
fn test_remove_takes_last_occurrence_and_keeps_hash_entry() {
    let mut rt = runtime();
    let list = rt.new_list_from(strings(&["a", "b", "a"]));
    list.set(&mut rt, &Value::string("a"), Value::from(7)).unwrap();

    list.remove(&mut rt, &Value::string("a")).unwrap();
    assert_eq!(list.values(&mut rt).unwrap(), strings(&["a", "b"]));
    assert_eq!(list.get(&mut rt, &Value::string("a")).unwrap(), Value::from(7));

    list.remove(&mut rt, &Value::string("a")).unwrap();
    assert_eq!(list.get(&mut rt, &Value::string("a")).unwrap(), Value::Null);
    assert_eq!(list.find(&mut rt, &Value::string("b"), 1, 0).unwrap(), 1);
    assert_eq!(list.find(&mut rt, &Value::string("a"), 1, 0).unwrap(), 0);
}

#[test]
fn test_find_and_cut_ranges() {
    let mut rt = runtime();
    let list = rt.new_list_from(strings(&["a", "b", "c", "b"]));
    assert_eq!(list.find(&mut rt, &Value::string("b"), 1, 0).unwrap(), 2);
    assert_eq!(list.find(&mut rt, &Value::string("b"), 3, 0).unwrap(), 4);
    assert_eq!(list.find(&mut rt, &Value::string("b"), 3, 4).unwrap(), 0);

    list.cut(&mut rt, 2, 4).unwrap();
    assert_eq!(list.values(&mut rt).unwrap(), strings(&["a", "b"]));
    list.cut(&mut rt, 2, 2).unwrap();
    assert_eq!(list.len(&mut rt).unwrap(), 2);
    list.cut(&mut rt, 1, 0).unwrap();
    assert_eq!(list.len(&mut rt).unwrap(), 0);
    assert!(list.cut(&mut rt, 3, 0).is_err());
}

#[test]
fn test_copy_keeps_hash_entries_of_surviving_keys() {
    let mut rt = runtime();
    let list = rt.new_list_from(strings(&["a", "b", "c"]));
    list.set(&mut rt, &Value::string("a"), Value::from(1)).unwrap();
    list.set(&mut rt, &Value::string("c"), Value::from(3)).unwrap();

    let tail = list.copy(&mut rt, 2, 0).unwrap();
    assert_eq!(tail.values(&mut rt).unwrap(), strings(&["b", "c"]));
    assert_eq!(tail.get(&mut rt, &Value::string("c")).unwrap(), Value::from(3));
    assert_eq!(tail.get(&mut rt, &Value::string("a")).unwrap(), Value::Null);

    // a start of 0 reads as 1
    let whole = list.copy(&mut rt, 0, 0).unwrap();
    assert_eq!(whole.values(&mut rt).unwrap(), strings(&["a", "b", "c"]));
    assert_eq!(whole.get(&mut rt, &Value::string("a")).unwrap(), Value::from(1));
    let head = list.copy(&mut rt, 0, 2).unwrap();
    assert_eq!(head.values(&mut rt).unwrap(), strings(&["a"]));

    let empty = list.copy(&mut rt, 3, 2).unwrap();
    assert_eq!(empty.len(&mut rt).unwrap(), 0);
    assert!(list.copy(&mut rt, 5, 0).is_err());

    tail.add(&mut rt, Value::string("d")).unwrap();
    assert_eq!(list.len(&mut rt).unwrap(), 3);
}

#[test]
fn test_insert_swap_and_resize() {
    let mut rt = runtime();
    let list = rt.new_list_from(strings(&["a", "c"]));
    list.insert(&mut rt, 2, Value::string("b")).unwrap();
    list.insert(&mut rt, 4, Value::string("d")).unwrap();
    assert!(list.insert(&mut rt, 6, Value::Null).is_err());
    list.swap(&mut rt, 1, 4).unwrap();
    assert_eq!(list.values(&mut rt).unwrap(), strings(&["d", "b", "c", "a"]));

    list.resize(&mut rt, 2).unwrap();
    assert_eq!(list.values(&mut rt).unwrap(), strings(&["d", "b"]));
    list.resize(&mut rt, 3).unwrap();
    assert_eq!(list.get(&mut rt, &Value::from(3)).unwrap(), Value::Null);
    assert!(list.resize(&mut rt, -1).is_err());
}

#[test]
fn test_len_var_resizes() {
    let mut rt = runtime();
    let list = rt.new_list_from(strings(&["a", "b", "c"]));
    rt.set_variable(list.id(), "len", Value::from(1)).unwrap();
    assert_eq!(list.values(&mut rt).unwrap(), strings(&["a"]));
    assert_eq!(rt.get_variable(list.id(), "len").unwrap(), Value::from(1));
}

#[test]
fn test_dimensions_nest_lists_of_nulls() {
    let mut rt = runtime();
    let grid = rt
        .new_list_dimensions(&[Value::from(2), Value::from(3)])
        .unwrap();
    let rows = grid.values(&mut rt).unwrap();
    assert_eq!(rows.len(), 2);
    let row = rt.as_list(&rows[1]).unwrap();
    assert_eq!(row.values(&mut rt).unwrap(), vec![Value::Null; 3]);
    assert_ne!(rows[0], rows[1]);

    assert!(rt.new_list_dimensions(&[Value::from(-1)]).is_err());
}

#[test]
fn test_oversized_dimensions_are_rejected() {
    let mut rt = runtime();
    let before = rt.objects().count();
    for size in [1e30f32, f32::INFINITY, f32::NAN] {
        assert!(matches!(
            rt.new_list_dimensions(&[Value::from(size)]),
            Err(RuntimeError::InvalidArguments(_))
        ));
    }
    assert!(matches!(
        rt.new_list_dimensions(&[Value::from(65536), Value::from(65536)]),
        Err(RuntimeError::InvalidArguments(_))
    ));
    assert_eq!(rt.objects().count(), before);

    let list = rt.new_list();
    assert!(rt.set_variable(list.id(), "len", Value::from(1e30f32)).is_err());
    assert_eq!(list.len(&mut rt).unwrap(), 0);
}

#[test]
fn test_assoc_list_reads_keys_by_index() {
    let mut rt = runtime();
    let list = rt.new_assoc_list(vec![
        (Value::string("x"), Value::from(1)),
        (Value::string("y"), Value::from(2)),
        (Value::string("x"), Value::from(3)),
    ]);
    assert_eq!(list.values(&mut rt).unwrap(), strings(&["x", "y"]));
    assert_eq!(list.get(&mut rt, &Value::from(2)).unwrap(), Value::string("y"));
    assert_eq!(list.get(&mut rt, &Value::string("x")).unwrap(), Value::from(3));
    assert!(matches!(
        list.set(&mut rt, &Value::from(1), Value::Null),
        Err(RuntimeError::InvalidIndex(_))
    ));

    list.remove(&mut rt, &Value::string("x")).unwrap();
    assert_eq!(
        list.assoc_entries(&mut rt).unwrap(),
        vec![(Value::string("y"), Value::from(2))]
    );
}

#[test]
fn test_vars_list_reads_and_writes_variables() {
    let mut rt = runtime();
    let ty = rt.tree.define("/obj/crate", "/obj").unwrap().var("weight", 10).finish();
    let id = rt.new_object(&ty).unwrap();
    let vars = list_var(&mut rt, id, "vars");

    assert!(vars.is_associative(&mut rt).unwrap());
    assert!(vars.contains(&mut rt, &Value::string("weight")).unwrap());
    assert_eq!(vars.get(&mut rt, &Value::string("weight")).unwrap(), Value::from(10));

    vars.set(&mut rt, &Value::string("weight"), Value::from(12)).unwrap();
    assert_eq!(rt.get_variable(id, "weight").unwrap(), Value::from(12));
    assert!(matches!(
        vars.set(&mut rt, &Value::string("colour"), Value::Null),
        Err(RuntimeError::UndefinedVariable { .. })
    ));
    assert!(vars.add(&mut rt, Value::string("colour")).is_err());

    assert_eq!(list_var(&mut rt, id, "vars").id(), vars.id());
}

#[test]
fn test_global_vars_list() {
    let mut rt = runtime();
    rt.tree.declare_global("round", Value::from(1));
    let globals = rt.global_vars().unwrap();
    let globals = rt.as_list(&globals).unwrap();

    assert_eq!(globals.get(&mut rt, &Value::string("round")).unwrap(), Value::from(1));
    globals.set(&mut rt, &Value::string("round"), Value::from(2)).unwrap();
    assert_eq!(rt.tree.global("round").unwrap(), Value::from(2));
    assert!(globals.values(&mut rt).unwrap().contains(&Value::string("round")));
}

#[test]
fn test_overlays_share_appearance_records() {
    let mut rt = runtime();
    let atom = rt.new_object_path("/obj").unwrap();
    let overlays = list_var(&mut rt, atom, "overlays");

    overlays.add(&mut rt, Value::string("lid")).unwrap();
    overlays.add(&mut rt, Value::Null).unwrap();
    assert_eq!(overlays.len(&mut rt).unwrap(), 1);
    assert!(matches!(
        overlays.get(&mut rt, &Value::from(2)),
        Err(RuntimeError::InvalidArguments(_))
    ));

    let first = overlays.get(&mut rt, &Value::from(1)).unwrap();
    let recorded = rt.appearances.get_appearance(atom).overlays.clone();
    assert_eq!(first, Value::Appearance(recorded[0].clone()));

    let other = rt.new_object_path("/obj").unwrap();
    let other_overlays = list_var(&mut rt, other, "overlays");
    other_overlays.add(&mut rt, Value::string("lid")).unwrap();
    assert_eq!(rt.appearances.get_appearance(atom), rt.appearances.get_appearance(other));

    assert!(matches!(
        overlays.set(&mut rt, &Value::from(1), Value::string("hinge")),
        Err(RuntimeError::NotSupported { .. })
    ));

    overlays.remove(&mut rt, &Value::string("lid")).unwrap();
    assert_eq!(overlays.len(&mut rt).unwrap(), 0);
    assert_eq!(other_overlays.len(&mut rt).unwrap(), 1);
}

#[test]
fn test_underlays_accept_atoms() {
    let mut rt = runtime();
    let atom = rt.new_object_path("/obj").unwrap();
    let shadow = rt.new_object_path("/mob").unwrap();
    let underlays = list_var(&mut rt, atom, "underlays");

    underlays.add(&mut rt, Value::Object(shadow)).unwrap();
    assert_eq!(
        underlays.values(&mut rt).unwrap(),
        vec![Value::Appearance(rt.appearances.get_appearance(shadow))]
    );
    let list = rt.new_list();
    assert!(matches!(
        underlays.add(&mut rt, list.value()),
        Err(RuntimeError::TypeCast { .. })
    ));
    underlays.cut(&mut rt, 1, 0).unwrap();
    assert!(rt.appearances.get_appearance(atom).underlays.is_empty());
}

#[test]
fn test_filters_list_and_filter_vars() {
    let mut rt = runtime();
    let atom = rt.new_object_path("/obj").unwrap();
    let filters = list_var(&mut rt, atom, "filters");

    let blur = rt
        .new_filter("blur", vec![("size".into(), Value::from(1))])
        .unwrap();
    filters.add(&mut rt, Value::Object(blur)).unwrap();
    filters.add(&mut rt, Value::Null).unwrap();
    assert_eq!(filters.len(&mut rt).unwrap(), 1);
    assert!(filters.contains(&mut rt, &Value::Object(blur)).unwrap());
    assert!(filters.add(&mut rt, Value::from(3)).is_err());

    let attached = filters.get(&mut rt, &Value::from(1)).unwrap();
    let attached = attached.as_object().unwrap();
    assert_ne!(attached, blur);
    rt.set_variable(attached, "size", Value::from(4)).unwrap();
    let size = rt.appearances.get_appearance(atom).filters[0]
        .param("size")
        .cloned();
    assert_eq!(size, Some(Value::from(4)));

    // the detached original did not change
    assert_eq!(rt.get_variable(blur, "size").unwrap(), Value::from(1));
    assert_eq!(filters.find(&mut rt, &Value::Object(blur), 1, 0).unwrap(), 0);

    filters.set(&mut rt, &Value::from(1), Value::Null).unwrap();
    assert_eq!(filters.len(&mut rt).unwrap(), 0);
}

#[test]
fn test_filters_by_name() {
    let mut rt = runtime();
    let atom = rt.new_object_path("/obj").unwrap();
    let filters = list_var(&mut rt, atom, "filters");
    let glow = rt
        .new_filter("outline", vec![("name".into(), Value::string("glow"))])
        .unwrap();
    filters.add(&mut rt, Value::Object(glow)).unwrap();

    let found = filters.get(&mut rt, &Value::string("glow")).unwrap();
    assert_eq!(rt.get_variable(found.as_object().unwrap(), "type").unwrap(), Value::string("outline"));
    assert_eq!(filters.get(&mut rt, &Value::string("shadow")).unwrap(), Value::Null);

    filters.remove(&mut rt, &Value::string("glow")).unwrap();
    assert_eq!(filters.len(&mut rt).unwrap(), 0);
}

#[test]
fn test_filter_reads_reuse_one_object_per_slot() {
    let mut rt = runtime();
    let atom = rt.new_object_path("/obj").unwrap();
    let filters = list_var(&mut rt, atom, "filters");
    let blur = rt
        .new_filter("blur", vec![("size".into(), Value::from(1))])
        .unwrap();
    filters.add(&mut rt, Value::Object(blur)).unwrap();

    let first = filters.get(&mut rt, &Value::from(1)).unwrap();
    let before = rt.objects().count();
    for _ in 0..100 {
        assert_eq!(filters.get(&mut rt, &Value::from(1)).unwrap(), first);
        assert_eq!(filters.values(&mut rt).unwrap(), vec![first.clone()]);
    }
    assert_eq!(rt.objects().count(), before);
    assert_eq!(rt.filters.len(), 1);

    filters.cut(&mut rt, 1, 0).unwrap();
    assert!(filters.values(&mut rt).unwrap().is_empty());
    assert!(!rt.is_alive(first.as_object().unwrap()));
    assert!(rt.filters.is_empty());

    filters.add(&mut rt, Value::Object(blur)).unwrap();
    let attached = filters.get(&mut rt, &Value::from(1)).unwrap();
    rt.delete(atom);
    assert!(!rt.is_alive(attached.as_object().unwrap()));
    assert!(rt.filters.is_empty());
}

#[test]
fn test_filter_edits_touch_their_own_slot() {
    let mut rt = runtime();
    let atom = rt.new_object_path("/obj").unwrap();
    let filters = list_var(&mut rt, atom, "filters");
    let blur = rt
        .new_filter("blur", vec![("size".into(), Value::from(1))])
        .unwrap();
    filters.add(&mut rt, Value::Object(blur)).unwrap();
    filters.add(&mut rt, Value::Object(blur)).unwrap();

    let second = filters.get(&mut rt, &Value::from(2)).unwrap();
    rt.set_variable(second.as_object().unwrap(), "size", Value::from(4))
        .unwrap();
    let sizes: Vec<_> = rt
        .appearances
        .get_appearance(atom)
        .filters
        .iter()
        .map(|f| f.param("size").cloned())
        .collect();
    assert_eq!(sizes, vec![Some(Value::from(1)), Some(Value::from(4))]);
}

#[test]
fn test_atom_verbs_edit_the_appearance() {
    let mut rt = runtime();
    let atom = rt.new_object_path("/obj").unwrap();
    let open = rt.tree.new_proc("/obj", "open", true, &[]);
    let verbs = list_var(&mut rt, atom, "verbs");

    verbs.add(&mut rt, Value::from(open.clone())).unwrap();
    verbs.add(&mut rt, Value::from(open.clone())).unwrap();
    assert_eq!(rt.appearances.get_appearance(atom).verbs, vec![open.clone()]);
    assert!(verbs.add(&mut rt, Value::string("open")).is_err());

    verbs.remove(&mut rt, &Value::from(open)).unwrap();
    assert!(rt.appearances.get_appearance(atom).verbs.is_empty());
}

#[test]
fn test_client_verbs_queue_an_update() {
    let mut rt = runtime();
    let (connection, client) = rt.connect_client("someone").unwrap();
    rt.clients.take_verb_update(connection);

    let say = rt.tree.new_proc("/client", "say", true, &["message"]);
    let verbs = list_var(&mut rt, client, "verbs");
    verbs.add(&mut rt, Value::from(say.clone())).unwrap();

    assert_eq!(rt.clients.take_verb_update(connection), Some(vec![say.clone()]));
    assert_eq!(rt.clients.take_verb_update(connection), None);

    verbs.add(&mut rt, Value::from(say.clone())).unwrap();
    assert_eq!(verbs.len(&mut rt).unwrap(), 1);
    assert_eq!(rt.clients.take_verb_update(connection), None);
    assert!(matches!(
        verbs.set(&mut rt, &Value::from(1), Value::from(say)),
        Err(RuntimeError::NotSupported { .. })
    ));
}

#[test]
fn test_client_screen_registers_movables() {
    let mut rt = runtime();
    let (connection, client) = rt.connect_client("someone").unwrap();
    let hud = rt.new_object_path("/obj").unwrap();
    let area = rt.map.default_area().unwrap();
    let screen = list_var(&mut rt, client, "screen");

    screen.add(&mut rt, Value::Object(hud)).unwrap();
    assert!(rt.clients.connection(connection).unwrap().screen().contains(&hud));
    assert!(matches!(
        screen.add(&mut rt, Value::Object(area)),
        Err(RuntimeError::TypeCast { .. })
    ));

    rt.delete(hud);
    assert_eq!(screen.len(&mut rt).unwrap(), 0);
    assert!(rt.clients.connection(connection).unwrap().screen().is_empty());
}

#[test]
fn test_client_images_accept_images_only() {
    let mut rt = runtime();
    let (connection, client) = rt.connect_client("someone").unwrap();
    let image = rt.new_object_path("/image").unwrap();
    let obj = rt.new_object_path("/obj").unwrap();
    let images = list_var(&mut rt, client, "images");

    assert!(images.add(&mut rt, Value::Object(obj)).is_err());
    images.add(&mut rt, Value::Object(image)).unwrap();
    images.cut(&mut rt, 1, 0).unwrap();
    assert!(rt.clients.connection(connection).unwrap().images().is_empty());
}

#[test]
fn test_turf_and_movable_contents_follow_loc() {
    let mut rt = runtime();
    let turf = rt.map.turf_at(Coord::new(1, 1, 1)).unwrap();
    let bag = rt.new_object_path("/obj").unwrap();
    let coin = rt.new_object_path("/obj").unwrap();
    let turf_contents = list_var(&mut rt, turf, "contents");
    let bag_contents = list_var(&mut rt, bag, "contents");

    turf_contents.add(&mut rt, Value::Object(bag)).unwrap();
    bag_contents.add(&mut rt, Value::Object(coin)).unwrap();
    assert_eq!(turf_contents.values(&mut rt).unwrap(), vec![Value::Object(bag)]);
    assert_eq!(rt.get_variable(coin, "loc").unwrap(), Value::Object(bag));
    assert_eq!(rt.get_variable(coin, "x").unwrap(), Value::from(1));

    // removing from the wrong container leaves the movable where it is
    turf_contents.remove(&mut rt, &Value::Object(coin)).unwrap();
    assert_eq!(rt.get_variable(coin, "loc").unwrap(), Value::Object(bag));

    bag_contents.cut(&mut rt, 1, 0).unwrap();
    assert_eq!(rt.get_variable(coin, "loc").unwrap(), Value::Null);
    turf_contents.remove(&mut rt, &Value::Object(bag)).unwrap();
    assert_eq!(turf_contents.len(&mut rt).unwrap(), 0);
}

#[test]
fn test_cutting_turf_contents_clears_loc() {
    let mut rt = runtime();
    let turf = rt.map.turf_at(Coord::new(1, 2, 1)).unwrap();
    let mob = rt.new_object_path("/mob").unwrap();
    let crate_ = rt.new_object_path("/obj").unwrap();
    rt.set_loc(mob, Some(turf)).unwrap();
    rt.set_loc(crate_, Some(turf)).unwrap();
    let contents = list_var(&mut rt, turf, "contents");

    contents.cut(&mut rt, 1, 0).unwrap();
    assert_eq!(contents.len(&mut rt).unwrap(), 0);
    assert_eq!(rt.get_variable(mob, "loc").unwrap(), Value::Null);
    assert_eq!(rt.get_variable(crate_, "loc").unwrap(), Value::Null);
}

#[test]
fn test_area_contents_lists_turfs_then_movables() {
    let mut rt = runtime();
    let area_type = rt.tree.get("/area").unwrap();
    let area = rt.new_area(&area_type).unwrap();
    let turf = rt.map.turf_at(Coord::new(2, 1, 1)).unwrap();
    let mob = rt.new_object_path("/mob").unwrap();
    rt.set_loc(mob, Some(turf)).unwrap();
    let contents = list_var(&mut rt, area, "contents");

    contents.add(&mut rt, Value::Object(turf)).unwrap();
    assert_eq!(
        contents.values(&mut rt).unwrap(),
        vec![Value::Object(turf), Value::Object(mob)]
    );
    assert_eq!(rt.get_variable(turf, "loc").unwrap(), Value::Object(area));
    assert!(matches!(
        contents.cut(&mut rt, 1, 0),
        Err(RuntimeError::NotSupported { .. })
    ));

    contents.remove(&mut rt, &Value::Object(turf)).unwrap();
    assert_eq!(contents.len(&mut rt).unwrap(), 0);
    assert_eq!(rt.map.area_at(Coord::new(2, 1, 1)), rt.map.default_area());
}

#[test]
fn test_world_contents_is_read_only() {
    let mut rt = runtime();
    let world = rt.world();
    let obj = rt.new_object_path("/obj").unwrap();
    let image = rt.new_object_path("/image").unwrap();
    let contents = list_var(&mut rt, world, "contents");

    let values = contents.values(&mut rt).unwrap();
    // four turfs, the default area and the obj
    assert_eq!(values.len(), 6);
    assert!(values.contains(&Value::Object(obj)));
    assert!(!values.contains(&Value::Object(image)));
    assert!(contents.add(&mut rt, Value::Object(obj)).is_err());
    assert!(contents.set(&mut rt, &Value::from(1), Value::Null).is_err());
}

#[test]
fn test_list_vars_replace_contents_on_assignment() {
    let mut rt = runtime();
    let atom = rt.new_object_path("/obj").unwrap();
    let source = rt.new_list_from(strings(&["lid", "handle"]));
    rt.set_variable(atom, "overlays", source.value()).unwrap();
    assert_eq!(rt.appearances.get_appearance(atom).overlays.len(), 2);

    rt.set_variable(atom, "overlays", Value::string("lid")).unwrap();
    assert_eq!(rt.appearances.get_appearance(atom).overlays.len(), 1);

    rt.set_variable(atom, "overlays", Value::Null).unwrap();
    assert!(rt.appearances.get_appearance(atom).overlays.is_empty());
}

#[test]
fn test_deleted_list_refuses_access() {
    let mut rt = runtime();
    let list = rt.new_list_from(strings(&["a"]));
    rt.delete(list.id());
    assert!(matches!(list.len(&mut rt), Err(RuntimeError::DeletedObject)));
    assert!(rt.as_list(&list.value()).is_err());
}
