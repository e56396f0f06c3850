use fieldops_types::{Collection, FieldMap, OpVerb, QueueOp, RecordId, RemoteId, TempId};

fn fields(pairs: &[(&str, &str)]) -> FieldMap {
    let mut map = FieldMap::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), serde_json::Value::String((*v).to_string()));
    }
    map
}

#[test]
fn insert_targets_its_temp_id() {
    let temp = TempId::new();
    let op = QueueOp::insert(0, Collection::from("leads"), temp, fields(&[("name", "Acme")]));
    assert_eq!(op.verb, OpVerb::Insert);
    assert!(op.targets_temp(temp));
    assert!(!op.targets_temp(TempId::new()));
    assert!(op.dependency.is_none());
}

#[test]
fn remove_carries_empty_payload() {
    let op = QueueOp::remove(
        3,
        Collection::from("leads"),
        RecordId::Remote(RemoteId::new("L-1")),
    );
    assert_eq!(op.verb, OpVerb::Remove);
    assert!(op.payload.is_empty());
}

#[test]
fn dependency_tag_names_field_and_parent() {
    let parent = TempId::new();
    let child = TempId::new();
    let op = QueueOp::insert(
        1,
        Collection::from("appointments"),
        child,
        fields(&[("lead_id", &parent.to_string())]),
    )
    .with_dependency("lead_id", parent);

    let dep = op.dependency.expect("tagged");
    assert_eq!(dep.field, "lead_id");
    assert_eq!(dep.parent, parent);
}

#[test]
fn op_serde_skips_absent_dependency() {
    let op = QueueOp::modify(
        2,
        Collection::from("leads"),
        RecordId::Remote(RemoteId::new("L-1")),
        fields(&[("name", "Acme Co")]),
    );
    let json = serde_json::to_value(&op).unwrap();
    assert!(json.get("dependency").is_none());
    let back: QueueOp = serde_json::from_value(json).unwrap();
    assert_eq!(back, op);
}
