//! Parser integration tests over literal `.swen` sources.

use swen_markup::{parse_source, ParseErrorKind};
use swen_scene::{Color, Node, NodeId, Vector};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const MINIMAL: &str = r#"
root {
  desktop {
    size (1024, 768)
    background (20, 20, 28, 255)
    nodes [
      rect { id "panel" size (200, 100) position (10, 10) background (128, 64, 255, 255) }
    ]
  }
  system { }
}
"#;

#[test]
fn minimal_example_parses() {
    init_logging();
    let tree = parse_source(MINIMAL).unwrap();
    let desktop = &tree.root.desktop;
    assert_eq!(desktop.size, Vector::new(1024, 768));
    assert_eq!(desktop.background, Some(Color::new(20, 20, 28, 255)));
    assert_eq!(desktop.nodes.len(), 1);
    match tree.node(desktop.nodes[0]) {
        Some(Node::Rect(rect)) => {
            assert_eq!(rect.declared_id.as_deref(), Some("panel"));
            assert_eq!(rect.size, Vector::new(200, 100));
            assert_eq!(rect.position, Vector::new(10, 10));
            assert_eq!(rect.background, Some(Color::new(128, 64, 255, 255)));
        }
        other => panic!("expected rect, got {other:?}"),
    }
}

#[test]
fn parsing_is_deterministic() {
    let a = parse_source(MINIMAL).unwrap();
    let b = parse_source(MINIMAL).unwrap();
    assert_eq!(a.node_count(), b.node_count());
    assert_eq!(a.root.desktop.nodes, b.root.desktop.nodes);
    for i in 0..a.node_count() {
        let id = NodeId(i as u64 + 1);
        assert_eq!(a.node(id), b.node(id));
    }
}

#[test]
fn node_ids_are_unique_and_monotonic() {
    let src = r#"
root {
  desktop {
    size (64, 64)
    nodes [
      rect { size (8, 8) position (0, 0) }
      rect { size (8, 8) position (8, 8) nodes [
        text { position (1, 1) text_size 10 }
      ] }
    ]
  }
  system { }
}
"#;
    let tree = parse_source(src).unwrap();
    assert_eq!(tree.node_count(), 3);
    let mut seen = std::collections::HashSet::new();
    for i in 0..tree.node_count() {
        let id = NodeId(i as u64 + 1);
        let node = tree.node(id).unwrap();
        assert_eq!(node.node_id(), id);
        assert!(seen.insert(node.node_id()));
    }
}

#[test]
fn nested_children_are_root_filtered() {
    // Tree purity: the inner rect must only appear under its parent, never
    // in the desktop's top-level list.
    let src = r#"
root {
  desktop {
    size (64, 64)
    nodes [
      rect { size (32, 32) position (10, 10) nodes [
        rect { size (5, 5) position (3, 4) background (0, 255, 0, 255) }
      ] }
    ]
  }
  system { }
}
"#;
    let tree = parse_source(src).unwrap();
    assert_eq!(tree.root.desktop.nodes.len(), 1);
    let outer = tree.node(tree.root.desktop.nodes[0]).unwrap();
    assert_eq!(outer.children().len(), 1);
    let inner_id = outer.children()[0];
    assert_ne!(inner_id, tree.root.desktop.nodes[0]);
    // No node id may appear as a child of two parents.
    let mut child_refs = std::collections::HashSet::new();
    for i in 0..tree.node_count() {
        let node = tree.node(NodeId(i as u64 + 1)).unwrap();
        for &child in node.children() {
            assert!(child_refs.insert(child), "child {child} under two parents");
        }
    }
}

#[test]
fn coordinates_accumulate_from_ancestors() {
    let src = r#"
root {
  desktop {
    size (64, 64)
    nodes [
      rect { size (32, 32) position (10, 10) nodes [
        rect { size (5, 5) position (3, 4) nodes [
          text { position (1, 2) text_size 8 }
        ] }
      ] }
    ]
  }
  system { }
}
"#;
    let tree = parse_source(src).unwrap();
    let outer_id = tree.root.desktop.nodes[0];
    let outer = tree.node(outer_id).unwrap();
    let mid_id = outer.children()[0];
    let mid = tree.node(mid_id).unwrap();
    let leaf_id = mid.children()[0];
    let leaf = tree.node(leaf_id).unwrap();

    assert_eq!(outer.local_position(), Vector::ZERO);
    assert_eq!(mid.local_position(), Vector::new(10, 10));
    assert_eq!(leaf.local_position(), Vector::new(13, 14));

    // world(N) = local(N) + position(N) = world(parent) + position(N)
    assert_eq!(mid.world_position(), outer.world_position() + mid.position());
    assert_eq!(leaf.world_position(), mid.world_position() + leaf.position());
    assert_eq!(leaf.world_position(), Vector::new(14, 16));
}

#[test]
fn duplicate_desktop_is_rejected() {
    let src = "root { desktop { size (1, 1) } desktop { size (2, 2) } system { } }";
    let err = parse_source(src).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::DuplicateNode { node: "desktop" });
}

#[test]
fn missing_system_is_rejected() {
    let err = parse_source("root { desktop { size (1, 1) } }").unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::MissingRequiredNode { node: "system" }
    );
}

#[test]
fn missing_rect_size_is_rejected() {
    let src = "root { desktop { size (9, 9) nodes [ rect { position (0, 0) } ] } system { } }";
    let err = parse_source(src).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MissingProperty { property: "size" });
}

#[test]
fn duplicate_property_is_rejected() {
    let src =
        "root { desktop { size (9, 9) nodes [ rect { size (1, 1) size (2, 2) position (0, 0) } ] } system { } }";
    let err = parse_source(src).unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::DuplicateProperty { property: "size" }
    );
}

#[test]
fn non_positive_size_is_rejected() {
    let src = "root { desktop { size (9, 9) nodes [ rect { size (0, 5) position (0, 0) } ] } system { } }";
    let err = parse_source(src).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidSize);
}

#[test]
fn zero_text_size_is_rejected() {
    let src =
        "root { desktop { size (9, 9) nodes [ text { position (0, 0) text_size 0 } ] } system { } }";
    let err = parse_source(src).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidTextSize);
}

#[test]
fn nodes_before_position_is_rejected() {
    let src = "root { desktop { size (9, 9) nodes [ rect { size (1, 1) nodes [ ] position (0, 0) } ] } system { } }";
    let err = parse_source(src).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidPosition);
}

#[test]
fn matrix_requires_six_numbers() {
    let bad = "root { desktop { size (9, 9) nodes [ transform { position (0, 0) matrix (1, 0, 0, 1) } ] } system { } }";
    assert_eq!(
        parse_source(bad).unwrap_err().kind,
        ParseErrorKind::InvalidMatrix
    );

    let trailing_comma = "root { desktop { size (9, 9) nodes [ transform { position (0, 0) matrix (1, 0, 0, 1, 0, 0,) } ] } system { } }";
    let tree = parse_source(trailing_comma).unwrap();
    match tree.node(tree.root.desktop.nodes[0]) {
        Some(Node::Transform(transform)) => assert!(transform.matrix.is_some()),
        other => panic!("expected transform, got {other:?}"),
    }
}

#[test]
fn color_channel_out_of_range_is_rejected() {
    let src = "root { desktop { size (9, 9) background (300, 0, 0, 255) } system { } }";
    let err = parse_source(src).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ExpectedColor);
}

#[test]
fn duplicate_id_in_subtree_is_rejected() {
    let src = r#"
root {
  desktop {
    size (64, 64)
    nodes [
      rect { id "a" size (1, 1) position (0, 0) }
      rect { id "a" size (1, 1) position (2, 2) }
    ]
  }
  system { }
}
"#;
    let err = parse_source(src).unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::DuplicateId {
            id: String::from("a")
        }
    );
}

#[test]
fn same_id_in_different_apps_is_allowed() {
    let src = r#"
root {
  desktop {
    size (64, 64)
    workspaces [
      {
        app { id "left" size (32, 32) position (0, 0) nodes [
          rect { id "panel" size (4, 4) position (0, 0) }
        ] }
        app { id "right" size (32, 32) position (32, 0) nodes [
          rect { id "panel" size (4, 4) position (0, 0) }
        ] }
      }
    ]
  }
  system { }
}
"#;
    let tree = parse_source(src).unwrap();
    let workspace = &tree.root.desktop.workspaces[0];
    assert_eq!(workspace.apps.len(), 2);
    assert_eq!(workspace.apps[0].id, "left");
    assert_eq!(workspace.apps[1].children.len(), 1);
}

#[test]
fn app_children_accumulate_app_position() {
    let src = r#"
root {
  desktop {
    size (64, 64)
    workspaces [
      { app { id "a" size (32, 32) position (8, 8) nodes [
          rect { size (4, 4) position (1, 2) }
      ] } }
    ]
  }
  system { }
}
"#;
    let tree = parse_source(src).unwrap();
    let app = &tree.root.desktop.workspaces[0].apps[0];
    let child = tree.node(app.children[0]).unwrap();
    assert_eq!(child.local_position(), Vector::new(8, 8));
    assert_eq!(child.world_position(), Vector::new(9, 10));
}

#[test]
fn system_apps_are_reachable() {
    let src = r#"
root {
  desktop { size (64, 64) }
  system {
    app { id "bar" size (64, 8) position (0, 56) nodes [
      text { position (2, 2) text_size 10 body "status" }
    ] }
  }
}
"#;
    let tree = parse_source(src).unwrap();
    assert_eq!(tree.root.system.apps.len(), 1);
    let app = &tree.root.system.apps[0];
    match tree.node(app.children[0]) {
        Some(Node::Text(text)) => assert_eq!(text.body, "status"),
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn unknown_constructs_are_skipped() {
    init_logging();
    let src = r#"
root {
  desktop {
    size (64, 64)
    nodes [
      clip { surface_rect (0, 0) }
      rect { size (4, 4) position (0, 0) }
      wayland_surface { }
    ]
  }
  system { }
}
"#;
    let tree = parse_source(src).unwrap();
    assert_eq!(tree.root.desktop.nodes.len(), 1);
    assert!(matches!(
        tree.node(tree.root.desktop.nodes[0]),
        Some(Node::Rect(_))
    ));
}

#[test]
fn text_defaults_apply() {
    let src =
        "root { desktop { size (9, 9) nodes [ text { position (0, 0) text_size 12 } ] } system { } }";
    let tree = parse_source(src).unwrap();
    match tree.node(tree.root.desktop.nodes[0]) {
        Some(Node::Text(text)) => {
            assert_eq!(text.body, "");
            assert_eq!(text.color, Color::WHITE);
            assert_eq!(text.text_size, 12);
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn missing_brace_is_fatal() {
    let src = "root { desktop { size (9, 9) ";
    let err = parse_source(src).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ExpectedToken { expected: "}" });
}
