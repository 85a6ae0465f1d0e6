use super::*;

#[test]
fn visible_children_keep_registration_order() {
    let mut reg = SubFrameRegistry::new();
    reg.register(FrameId(7), Rect::new(0.0, 0.0, 100.0, 100.0));
    reg.register(FrameId(3), Rect::new(50.0, 50.0, 150.0, 150.0));
    let vis = reg.compute_visible(Rect::new(0.0, 0.0, 400.0, 400.0), 1.0);
    let ids: Vec<_> = vis.iter().map(|v| v.child).collect();
    assert_eq!(ids, vec![FrameId(7), FrameId(3)]);
    assert_eq!(vis[1].slot, 1);
}

#[test]
fn rects_are_scaled_and_viewport_relative() {
    let mut reg = SubFrameRegistry::new();
    reg.register(FrameId(1), Rect::new(100.0, 200.0, 300.0, 400.0));
    let vis = reg.compute_visible(Rect::new(50.0, 300.0, 550.0, 800.0), 2.0);
    assert_eq!(vis.len(), 1);
    assert_eq!(vis[0].rect, Rect::new(150.0, 100.0, 550.0, 500.0));
}

#[test]
fn children_outside_viewport_are_excluded() {
    let mut reg = SubFrameRegistry::new();
    reg.register(FrameId(1), Rect::new(0.0, 0.0, 100.0, 100.0));
    reg.register(FrameId(2), Rect::new(0.0, 1000.0, 100.0, 1100.0));
    // Touching edge without overlap does not count.
    reg.register(FrameId(3), Rect::new(0.0, 500.0, 100.0, 600.0));
    let vis = reg.compute_visible(Rect::new(0.0, 0.0, 500.0, 500.0), 1.0);
    assert_eq!(vis.len(), 1);
    assert_eq!(vis[0].child, FrameId(1));
}

#[test]
fn degenerate_inputs_yield_nothing() {
    let mut reg = SubFrameRegistry::new();
    reg.register(FrameId(1), Rect::new(0.0, 0.0, 100.0, 100.0));
    assert!(reg.compute_visible(Rect::ZERO, 1.0).is_empty());
    assert!(reg.compute_visible(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0).is_empty());
}
