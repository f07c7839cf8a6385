use std::fs;

use lyapunov_explorer::function::COMPOSED_ID;
use lyapunov_explorer::{
    Band, ColorInterval, Formula, IntervalColorMap, LyapError, LyapunovField, MapFunction, Rgb,
    Role, Window, load_coloring, load_grid, load_params, load_snapshot, save_params, save_snapshot,
};
use test_log::test;

fn nested_function() -> MapFunction {
    let composed = MapFunction::composed(
        MapFunction::with_parameter(Formula::SineAtan, 1.75),
        Role::Derivative,
        MapFunction::new(Formula::DetachedSineMix),
        Role::Value,
    );
    MapFunction::piecewise(
        Band::new(-0.5, 0.5),
        Band::new(0.0, 1.0),
        composed,
        MapFunction::with_parameter(Formula::LogisticSine, 0.8),
    )
}

fn custom_coloring() -> IntervalColorMap {
    let mut map = IntervalColorMap::new(Rgb::new(5, 6, 7), Rgb::new(8, 9, 10));
    map.add_interval(ColorInterval::new(-3.0, -0.25, Rgb::new(0, 80, 160), Rgb::new(255, 255, 255)).unwrap())
        .unwrap();
    map.add_interval(ColorInterval::new(0.25, 1.5, Rgb::new(120, 0, 0), Rgb::new(255, 128, 0)).unwrap())
        .unwrap();
    map
}

fn configured() -> LyapunovField {
    let mut field = LyapunovField::new(nested_function(), custom_coloring());
    field.set_size(12, 8);
    field.set_iterations(10, 30);
    field.set_x0(0.125);
    field.set_sequence("BBA").unwrap();
    field.set_window(Window::axis_aligned(-1.0, 0.5, 2.0, 3.5));
    field
}

#[test]
fn nested_function_survives_a_parameter_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested.par");
    let field = configured();
    save_params(&field, &path).unwrap();

    let mut loaded = LyapunovField::default();
    load_params(&mut loaded, &path).unwrap();
    assert_eq!(loaded.function(), field.function());
    assert_eq!(loaded.coloring(), field.coloring());

    for &(x, r) in &[(0.1, 2.5), (-0.4, 3.3), (0.75, 1.0), (2.0, -1.5)] {
        assert_eq!(
            loaded.function().value_and_derivative(x, r),
            field.function().value_and_derivative(x, r)
        );
    }
}

#[test]
fn restored_snapshot_samples_identically() {
    let dir = tempfile::tempdir().unwrap();
    let mut field = configured();
    field.compute();
    save_snapshot(&field, dir.path(), "shot", Rgb::BLACK).unwrap();

    let mut restored = LyapunovField::default();
    assert!(load_snapshot(&mut restored, &dir.path().join("shot")).unwrap());
    assert_eq!(restored.grid(), field.grid());

    let saved = restored.grid().to_vec();
    restored.compute();
    let bits = |g: &[f64]| g.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(restored.grid()), bits(&saved));
}

#[test]
fn grid_of_another_size_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.ljd");
    let mut field = configured();
    field.compute();
    save_snapshot(&field, dir.path(), "grid", Rgb::BLACK).unwrap();

    let mut small = LyapunovField::default();
    small.set_size(4, 4);
    match load_grid(&mut small, &path) {
        Err(LyapError::DimensionMismatch { width: 4, height: 4, found_width: 12, found_height: 8 }) => {}
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn coloring_can_be_lifted_from_a_parameter_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("palette.par");
    save_params(&configured(), &path).unwrap();
    assert_eq!(load_coloring(&path).unwrap(), custom_coloring());
}

#[test]
fn hand_written_parameter_file_loads() {
    let text = "\
# hand written
FUNCTION
ID
16
valuerole
1
DERIVATIVEROLE
2
VALUEFN
ID
2
B
2.5
DERIVATIVEFN
ID
1
COLORING
ID
2
COUNT
1
BELOW
0
0
0
ABOVE
255
255
255
UPPER
1
LOWER
-1
LEFT
0
0
255
RIGHT
255
0
0
sequence
aab
WIDTH
16
HEIGHT
9
SETTLE
20
MEASURE
40
X0
0.5
LOWERLEFT
2
2
LOWERRIGHT
4
2
UPPERLEFT
2
4
";
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hand.par");
    fs::write(&path, text).unwrap();

    let mut field = LyapunovField::default();
    load_params(&mut field, &path).unwrap();
    assert_eq!(field.function().id(), COMPOSED_ID);
    assert_eq!(field.function().parameter(), Some(2.5));
    assert_eq!((field.width(), field.height()), (16, 8));
    assert_eq!(field.sequence_text(), "AAB");
    assert_eq!(field.coloring().len(), 1);
    assert_eq!(*field.window(), Window::default());
}
