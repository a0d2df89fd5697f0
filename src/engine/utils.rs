use crate::rng::Rng;
use crate::types::{SpawnSide, Vec2, ViewBounds};

pub(super) fn spawn_point(
    view: &ViewBounds,
    side: SpawnSide,
    margin: f32,
    spawn_y: f32,
    rng: &mut Rng,
) -> (Vec2, Vec2) {
    let from_left = match side {
        SpawnSide::Left => true,
        SpawnSide::Right => false,
        SpawnSide::Random => rng.bool(0.5),
    };
    if from_left {
        (Vec2::new(view.left_edge() - margin, spawn_y), Vec2::RIGHT)
    } else {
        (Vec2::new(view.right_edge() + margin, spawn_y), Vec2::LEFT)
    }
}
