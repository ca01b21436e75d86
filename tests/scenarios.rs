//! End-to-end coverage of the concrete scenarios `spec.md` §8 enumerates,
//! driven through the public `Loader`/`Dumper` facade only.

use pretty_assertions::assert_eq;

use yamele::error::ComposerError;
use yamele::node::NodeValue;
use yamele::{dump_to_string, Loader, YamlError};

#[test]
fn scenario_1_plain_int() {
    let node = Loader::from_bytes(b"42\n").unwrap().load().unwrap();
    assert_eq!(node.tag, "tag:yaml.org,2002:int");
    assert_eq!(node.as_i64(), Some(42));
}

#[test]
fn scenario_2_sexagesimal_binary_hex_int_equivalence() {
    let node = Loader::from_bytes(b"\"685_230\": [0b1010_0111_0100_1010_1110, 0x_0A_74_AE, 190:20:30]\n")
        .unwrap()
        .load()
        .unwrap();
    let pairs = node.as_mapping().expect("root is a mapping");
    assert_eq!(pairs.len(), 1);
    let (key, value) = &pairs[0];
    assert_eq!(key.as_str().as_deref(), Some("685_230"));
    let items = value.as_sequence().expect("value is a sequence");
    assert_eq!(items.len(), 3);
    for item in items {
        assert_eq!(item.tag, "tag:yaml.org,2002:int");
        assert_eq!(item.as_i64(), Some(685230));
    }
}

#[test]
fn scenario_3_duplicate_map_key_is_a_constructor_error() {
    let err = Loader::from_bytes(b"{a: 1, b: 2, a: 3}\n").unwrap().load().unwrap_err();
    match err {
        YamlError::Composer(ComposerError::Constructor(inner)) => {
            let message = inner.to_string();
            assert!(message.contains("duplicate key"), "unexpected message: {message}");
            assert!(message.contains('a'), "unexpected message: {message}");
        }
        other => panic!("expected a ConstructorError, got {other:?}"),
    }
}

#[test]
fn scenario_4_recursive_anchor_is_a_composer_error() {
    let err = Loader::from_bytes(b"a: &x [1, *x]\n").unwrap().load().unwrap_err();
    assert!(
        matches!(err, YamlError::Composer(_)),
        "recursive alias must surface as a ComposerError, got {err:?}"
    );
}

#[test]
fn scenario_5_timestamp_with_fractional_seconds() {
    let node = Loader::from_bytes(b"2001-12-15T02:59:43.1Z\n").unwrap().load().unwrap();
    assert_eq!(node.tag, "tag:yaml.org,2002:timestamp");
    let ts = node.as_timestamp().expect("value is a timestamp");
    assert_eq!(ts.format("%Y%m%dT%H%M%S%.1f").to_string(), "20011215T025943.1");
    assert_eq!(ts.offset().local_minus_utc(), 0);
}

#[test]
fn scenario_6_default_dump_has_no_version_directive_and_round_trips() {
    let node = Loader::from_bytes(b"{hello: [world]}\n").unwrap().load().unwrap();
    let dumped = dump_to_string(std::slice::from_ref(&node), &Default::default()).unwrap();
    assert_eq!(&dumped.as_bytes()[..3], b"hel", "dump started with {dumped:?}");

    let reloaded = Loader::from_bytes(dumped.as_bytes()).unwrap().load().unwrap();
    let pairs = reloaded.as_mapping().expect("root is a mapping");
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].0.as_str().as_deref(), Some("hello"));
    let items = pairs[0].1.as_sequence().expect("value is a sequence");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_str().as_deref(), Some("world"));
}

#[test]
fn round_trip_scalar_family_through_load_dump_load() {
    let source = b"---\na: null\nb: true\nc: -17\nd: 3.5\ne: hello world\nf: 2001-12-15T02:59:43.1Z\n";
    let original = Loader::from_bytes(source).unwrap().load().unwrap();
    let dumped = dump_to_string(std::slice::from_ref(&original), &Default::default()).unwrap();
    let reloaded = Loader::from_bytes(dumped.as_bytes()).unwrap().load().unwrap();

    let orig_pairs = original.as_mapping().unwrap();
    let reloaded_pairs = reloaded.as_mapping().unwrap();
    assert_eq!(orig_pairs.len(), reloaded_pairs.len());
    for ((ok, ov), (rk, rv)) in orig_pairs.iter().zip(reloaded_pairs.iter()) {
        assert_eq!(ok.as_str(), rk.as_str());
        assert_eq!(ov.tag, rv.tag);
    }
}

#[test]
fn mapping_ordering_is_preserved_across_a_load() {
    let node = Loader::from_bytes(b"z: 1\na: 2\nm: 3\n").unwrap().load().unwrap();
    let pairs = node.as_mapping().unwrap();
    let keys: Vec<String> = pairs.iter().map(|(k, _)| k.as_str().unwrap().into_owned()).collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn set_tag_rejects_duplicates_while_pairs_tag_keeps_them() {
    let err = Loader::from_bytes(b"!!set {a, b, a}\n").unwrap().load().unwrap_err();
    assert!(matches!(err, YamlError::Composer(ComposerError::Constructor(_))));

    let node = Loader::from_bytes(b"!!pairs [{a: 1}, {a: 2}]\n").unwrap().load().unwrap();
    let pairs = node.as_pairs().expect("value is !!pairs");
    assert_eq!(pairs.len(), 2);
    assert!(matches!(node.value, NodeValue::Pairs(_)));
}

#[test]
fn multiple_documents_round_trip_with_explicit_markers() {
    let documents = Loader::from_bytes(b"1\n---\n2\n---\n3\n")
        .unwrap()
        .load_all()
        .unwrap();
    assert_eq!(documents.len(), 3);

    let dumped = dump_to_string(&documents, &Default::default()).unwrap();
    assert_eq!(dumped.matches("---").count(), 3);

    let reloaded = Loader::from_bytes(dumped.as_bytes()).unwrap().load_all().unwrap();
    let values: Vec<i64> = reloaded.iter().map(|n| n.as_i64().unwrap()).collect();
    assert_eq!(values, vec![1, 2, 3]);
}
