//! Value interning across independently built config trees.

use std::sync::Arc;

use glaze::{
    Bounds, BoxModelConf, ColorConf, ComponentConf, CornerArc, GradientConf, LayerRenderConf,
    NamedConfs, Outline, Rgba, Size, StyleConf, StyleLayer, StyleLayerConf,
};

fn sample_box_model(size: f32) -> Arc<BoxModelConf> {
    BoxModelConf::of(
        CornerArc::of(4.0, 4.0),
        CornerArc::of(4.0, 4.0),
        CornerArc::of(4.0, 4.0),
        CornerArc::of(4.0, 4.0),
        Outline::all(2.0),
        Outline::none(),
        Outline::all(1.0),
        Outline::none(),
        Size::of(size, size),
    )
}

#[test]
fn equal_box_models_intern_to_one_instance() {
    let a = sample_box_model(37.0).simplify();
    let b = sample_box_model(37.0).simplify();
    assert!(Arc::ptr_eq(&a, &b));

    let c = sample_box_model(38.0).simplify();
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn interning_is_idempotent() {
    let once = sample_box_model(41.0).simplify();
    let twice = once.simplify();
    assert!(Arc::ptr_eq(&once, &twice));
}

#[test]
fn equal_layer_styles_collapse_through_simplify() {
    let build = || {
        StyleLayerConf::of(
            NamedConfs::none(),
            NamedConfs::of(
                "fade",
                GradientConf {
                    colors: vec![Rgba::rgb(1, 2, 3), Rgba::rgb(4, 5, 6)],
                    ..GradientConf::none()
                },
            ),
            NamedConfs::none(),
        )
    };
    let a = build().simplify();
    let b = build().simplify();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.gradients().len(), 1);
}

#[test]
fn equal_snapshots_share_one_render_state() {
    let style = || {
        StyleConf::none()
            .with_border(glaze::BorderConf::none().with_arcs(CornerArc::of(5.0, 5.0)))
            .with_background_color(Some(Rgba::rgb(9, 9, 9)))
    };
    let a = ComponentConf::of(style(), Bounds::of(0.0, 0.0, 33.0, 21.0), Outline::none());
    let b = ComponentConf::of(style(), Bounds::of(0.0, 0.0, 33.0, 21.0), Outline::none());
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a, b);

    let la = a.render_conf_for(StyleLayer::Background);
    let lb = b.render_conf_for(StyleLayer::Background);
    assert!(Arc::ptr_eq(&la, &lb));
}

#[test]
fn dropped_values_do_not_leak_stale_instances() {
    let first = sample_box_model(53.0).simplify();
    let first_eq = sample_box_model(53.0).simplify();
    assert!(Arc::ptr_eq(&first, &first_eq));
    drop(first);
    drop(first_eq);

    // The pool holds weak references only; a later equal value still interns
    // to a single live instance.
    let second = sample_box_model(53.0).simplify();
    let second_eq = sample_box_model(53.0).simplify();
    assert!(Arc::ptr_eq(&second, &second_eq));
}

#[test]
fn empty_layer_render_state_stays_canonical() {
    let state = LayerRenderConf::of(
        BoxModelConf::none(),
        ColorConf::none(),
        StyleLayerConf::empty(),
    );
    assert!(Arc::ptr_eq(&state, &LayerRenderConf::none()));
    assert!(state.is_none());
}
