use super::*;

const NESTED: &str = r#"{
  "root": 1,
  "frames": [
    {"id": 1, "content_width": 1000, "content_height": 2000,
     "subframes": [{"frame": 2, "clip": {"x0": 0, "y0": 100, "x1": 400, "y1": 400}}]},
    {"id": 2, "content_width": 400, "content_height": 900,
     "subframes": [{"frame": 3, "clip": {"x0": 10, "y0": 10, "x1": 110, "y1": 110}}]},
    {"id": 3, "content_width": 100, "content_height": 100}
  ]
}"#;

fn leaf(id: u64) -> FrameSpec {
    FrameSpec {
        id: FrameId(id),
        content_width: 100.0,
        content_height: 100.0,
        subframes: Vec::new(),
    }
}

fn embed(parent: &mut FrameSpec, child: u64) {
    parent.subframes.push(SubFrameSpec {
        frame: FrameId(child),
        clip: Rect::new(0.0, 0.0, 10.0, 10.0),
    });
}

#[test]
fn parses_nested_tree() {
    let tree = FrameTree::from_json_str(NESTED).unwrap();
    assert_eq!(tree.root, FrameId(1));
    let root = tree.get(FrameId(1)).unwrap();
    assert_eq!(root.content_size(), Size::new(1000.0, 2000.0));
    assert_eq!(root.subframes[0].clip, Rect::new(0.0, 100.0, 400.0, 400.0));
    assert!(tree.get(FrameId(3)).unwrap().subframes.is_empty());
}

#[test]
fn rejects_unknown_root_and_child() {
    let tree = FrameTree {
        root: FrameId(9),
        frames: vec![leaf(1)],
    };
    assert!(tree.validate().is_err());

    let mut root = leaf(1);
    embed(&mut root, 2);
    let tree = FrameTree {
        root: FrameId(1),
        frames: vec![root],
    };
    let err = tree.validate().unwrap_err();
    assert!(err.to_string().contains("unknown subframe"));
}

#[test]
fn rejects_duplicates_and_cycles() {
    let tree = FrameTree {
        root: FrameId(1),
        frames: vec![leaf(1), leaf(1)],
    };
    assert!(tree.validate().unwrap_err().to_string().contains("duplicate"));

    let mut a = leaf(2);
    let mut b = leaf(3);
    embed(&mut a, 3);
    embed(&mut b, 2);
    let tree = FrameTree {
        root: FrameId(1),
        frames: vec![leaf(1), a, b],
    };
    assert!(tree.validate().unwrap_err().to_string().contains("cycle"));

    let mut root = leaf(1);
    embed(&mut root, 1);
    let tree = FrameTree {
        root: FrameId(1),
        frames: vec![root],
    };
    assert!(tree.validate().is_err());
}

#[test]
fn rejects_non_finite_geometry() {
    let mut root = leaf(1);
    root.subframes.push(SubFrameSpec {
        frame: FrameId(2),
        clip: Rect::new(0.0, 0.0, f64::INFINITY, 10.0),
    });
    let tree = FrameTree {
        root: FrameId(1),
        frames: vec![root, leaf(2)],
    };
    assert!(tree.validate().unwrap_err().to_string().contains("non-finite"));

    let mut bad = leaf(1);
    bad.content_height = f64::NAN;
    let tree = FrameTree {
        root: FrameId(1),
        frames: vec![bad],
    };
    assert!(tree.validate().is_err());
}

#[test]
fn malformed_json_is_serde_error() {
    let err = FrameTree::from_json_str("{\"root\": 1}").unwrap_err();
    assert!(matches!(err, PreviewError::Serde(_)));
}
