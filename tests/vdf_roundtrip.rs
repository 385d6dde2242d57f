//! Tree Codec Integration Tests
//!
//! Round trips through both encodings, file I/O, and error positions.

use shelfsync::vdf::{binary, text, Node, ParseOptions, Position, Value, VdfError};
use tempfile::TempDir;

/// A tree exercising nesting, empty blocks, and characters that need escaping
fn sample_tree() -> Node {
    Node::new().with(
        "root",
        Node::new()
            .with("plain", Node::leaf("value"))
            .with("quoted", Node::leaf("say \"hi\""))
            .with("path", Node::leaf("C:\\Games\\emu.exe"))
            .with("multi", Node::leaf("line one\nline two\tend"))
            .with("empty", Node::new())
            .with(
                "nested",
                Node::new()
                    .with("inner", Node::new().with("deep", Node::leaf("")))
                    .with("also_empty", Node::new()),
            )
            .with("unicode", Node::leaf("Pokémon ™")),
    )
}

#[test]
fn test_text_roundtrip() {
    let tree = sample_tree();
    let encoded = text::to_string(&tree).unwrap();
    let decoded = text::parse(&encoded, ParseOptions::default()).unwrap();
    assert_eq!(decoded, tree);

    // Re-encoding a decoded tree is byte-identical
    assert_eq!(text::to_string(&decoded).unwrap(), encoded);
}

#[test]
fn test_binary_roundtrip() {
    let mut tree = sample_tree();
    if let Some(root) = tree.get_mut("root") {
        root.insert("appid", Node::Leaf(Value::Int32(-12345)));
        root.insert("LastPlayTime", Node::Leaf(Value::UInt64(1_700_000_000)));
    }

    let encoded = binary::to_bytes(&tree).unwrap();
    let decoded = binary::parse(&encoded).unwrap();
    assert_eq!(decoded, tree);
    assert_eq!(binary::to_bytes(&decoded).unwrap(), encoded);
}

#[test]
fn test_binary_non_utf8_roundtrip() {
    // shortcut record whose name is Latin-1, not UTF-8
    let mut bytes = vec![0x00];
    bytes.extend_from_slice(b"shortcuts\0");
    bytes.push(0x00);
    bytes.extend_from_slice(b"0\0");
    bytes.push(0x01);
    bytes.extend_from_slice(b"appname\0Caf\xe9\0");
    bytes.push(0x01);
    bytes.extend_from_slice(b"exe\0\"C:\\Jeux\\caf\xe9.exe\"\0");
    bytes.extend_from_slice(&[0x08, 0x08, 0x08]);

    let tree = binary::parse(&bytes).unwrap();
    assert_eq!(
        tree.get_path(&["shortcuts", "0", "appname"]).and_then(Node::value),
        Some(&Value::Bytes(b"Caf\xe9".to_vec()))
    );
    assert_eq!(binary::to_bytes(&tree).unwrap(), bytes);

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("shortcuts.vdf");
    std::fs::write(&path, &bytes).unwrap();
    binary::save(&binary::load(&path).unwrap(), &path).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), bytes);
}

#[test]
fn test_order_preserved() {
    let input = "\"apps\"\n{\n\t\"30\"\t\t\"c\"\n\t\"10\"\t\t\"a\"\n\t\"20\"\t\t\"b\"\n}\n";
    let tree = text::parse(input, ParseOptions::default()).unwrap();

    let keys: Vec<&str> = tree.get("apps").unwrap().iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["30", "10", "20"]);
    assert_eq!(text::to_string(&tree).unwrap(), input);
}

#[test]
fn test_file_roundtrip() {
    let temp = TempDir::new().unwrap();
    let tree = sample_tree();

    let text_path = temp.path().join("nested").join("localconfig.vdf");
    text::save(&tree, &text_path).unwrap();
    assert_eq!(text::load(&text_path, ParseOptions::default()).unwrap(), tree);

    let first = text::load(&text_path, ParseOptions::first_as_root()).unwrap();
    assert_eq!(Some(&first), tree.get("root"));

    let binary_path = temp.path().join("shortcuts.vdf");
    binary::save(&tree, &binary_path).unwrap();
    assert_eq!(binary::load(&binary_path).unwrap(), tree);
}

#[test]
fn test_navigation() {
    let mut tree = sample_tree();

    assert_eq!(
        tree.get_path(&["root", "nested", "inner", "deep"]).and_then(Node::as_str),
        Some("")
    );
    // a leaf where a block is expected
    assert!(tree.get_path(&["root", "plain", "x"]).is_none());
    assert!(tree.get_path_mut(&["root", "missing"], false).is_none());

    let created = tree.get_path_mut(&["root", "a", "b"], true).unwrap();
    created.insert("c", Node::leaf("d"));
    assert_eq!(tree.get_path(&["root", "a", "b", "c"]).and_then(Node::as_str), Some("d"));
}

#[test]
fn test_pruning() {
    let mut tree = Node::new().with(
        "apps",
        Node::new()
            .with("10", Node::new().with("tags", Node::new().with("0", Node::leaf("RPG"))))
            .with(
                "20",
                Node::new()
                    .with("tags", Node::new().with("0", Node::leaf("Indie")))
                    .with("LastPlayed", Node::leaf("1")),
            ),
    );

    // "10" is left empty and goes; "apps" still has "20" and stays
    assert!(tree.remove_pruned(&["apps", "10", "tags"]));
    assert!(tree.get_path(&["apps", "10"]).is_none());

    // "20" keeps its other setting
    assert!(tree.remove_pruned(&["apps", "20", "tags"]));
    assert!(tree.get_path(&["apps", "20", "LastPlayed"]).is_some());

    assert!(!tree.remove_pruned(&["apps", "99", "tags"]));
}

#[test]
fn test_text_errors_carry_position() {
    let unbalanced = "\"a\"\n{\n\t\"b\"\t\"c\"\n";
    let err = text::parse(unbalanced, ParseOptions::default()).unwrap_err();
    assert!(err.is_parse());

    let stray_close = "\"a\"\t\"b\"\n}\n";
    match text::parse(stray_close, ParseOptions::default()) {
        Err(VdfError::Parse { position, .. }) => assert_eq!(position, Position::Line(2)),
        other => panic!("Expected parse error, got {:?}", other),
    }
}

#[test]
fn test_binary_errors_carry_offset() {
    let tree = sample_tree();
    let encoded = binary::to_bytes(&tree).unwrap();

    // every strict prefix is rejected
    for len in [0, 1, encoded.len() / 2, encoded.len() - 1] {
        let err = binary::parse(&encoded[..len]).unwrap_err();
        assert!(err.is_parse(), "prefix of {} bytes should fail", len);
    }

    match binary::parse(&[0x09, b'k', 0x00]) {
        Err(VdfError::Parse { position, .. }) => assert_eq!(position, Position::Offset(0)),
        other => panic!("Expected parse error, got {:?}", other),
    }
}
