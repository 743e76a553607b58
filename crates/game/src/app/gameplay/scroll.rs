use super::body::AnimatedBody;

/// A horizontally repeating layer. `offset_x` always lies in `(-width, 0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ParallaxLayer {
    pub(crate) offset_x: f32,
    pub(crate) speed_ratio: f32,
    pub(crate) width: f32,
}

impl ParallaxLayer {
    pub(crate) fn new(width: f32, speed_ratio: f32) -> Self {
        Self {
            offset_x: 0.0,
            speed_ratio,
            width: width.max(1.0),
        }
    }

    pub(crate) fn apply_scroll(&mut self, scroll_delta: f32) {
        self.offset_x = wrap_offset(self.offset_x - scroll_delta * self.speed_ratio, self.width);
    }

    /// Left edges of the tiles needed to cover `[0, viewport_width)`.
    pub(crate) fn tile_xs(&self, viewport_width: f32) -> impl Iterator<Item = f32> {
        let offset_x = self.offset_x;
        let width = self.width;
        let tiles = ((viewport_width - offset_x) / width).ceil().max(2.0) as u32;
        (0..tiles).map(move |index| offset_x + index as f32 * width)
    }
}

fn wrap_offset(offset: f32, width: f32) -> f32 {
    // rem_euclid lands in [0, width); shift into (-width, 0].
    let wrapped = offset.rem_euclid(width);
    if wrapped == 0.0 {
        0.0
    } else {
        wrapped - width
    }
}

/// Horizontal scroll for one tick. The player is the anchor of the scroll
/// frame; everything else is shifted against the delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ScrollWorld {
    scroll_delta: f32,
    layers: Vec<ParallaxLayer>,
}

impl ScrollWorld {
    pub(crate) fn new(layers: Vec<ParallaxLayer>) -> Self {
        Self {
            scroll_delta: 0.0,
            layers,
        }
    }

    #[cfg(test)]
    pub(crate) fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    pub(crate) fn layers(&self) -> &[ParallaxLayer] {
        &self.layers
    }

    /// Records this tick's delta and moves every layer by it.
    pub(crate) fn begin_tick(&mut self, scroll_delta: f32) {
        self.scroll_delta = scroll_delta;
        for layer in &mut self.layers {
            layer.apply_scroll(scroll_delta);
        }
    }

    pub(crate) fn shift_tracked(&self, body: &mut AnimatedBody) {
        body.world_x -= self.scroll_delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_in_wrap_range(layer: &ParallaxLayer) {
        assert!(
            layer.offset_x > -layer.width && layer.offset_x <= 0.0,
            "offset {} outside (-{}, 0]",
            layer.offset_x,
            layer.width
        );
    }

    #[test]
    fn offset_stays_wrapped_for_positive_deltas() {
        let mut layer = ParallaxLayer::new(1000.0, 0.3);
        for _ in 0..10_000 {
            layer.apply_scroll(7.0);
            assert_in_wrap_range(&layer);
        }
    }

    #[test]
    fn offset_stays_wrapped_for_negative_deltas() {
        let mut layer = ParallaxLayer::new(640.0, 1.0);
        for _ in 0..10_000 {
            layer.apply_scroll(-7.0);
            assert_in_wrap_range(&layer);
        }
    }

    #[test]
    fn exact_multiple_of_width_wraps_to_zero() {
        let mut layer = ParallaxLayer::new(100.0, 1.0);
        layer.apply_scroll(100.0);
        assert_eq!(layer.offset_x, 0.0);
        layer.apply_scroll(-250.0);
        assert_eq!(layer.offset_x, -50.0);
    }

    #[test]
    fn slow_layer_moves_by_ratio() {
        let mut layer = ParallaxLayer::new(1000.0, 0.3);
        layer.apply_scroll(10.0);
        assert!((layer.offset_x + 3.0).abs() < 1e-4);
    }

    #[test]
    fn tiles_cover_the_viewport() {
        let mut layer = ParallaxLayer::new(300.0, 1.0);
        layer.apply_scroll(120.0);
        let xs: Vec<f32> = layer.tile_xs(1000.0).collect();

        assert_eq!(xs.first().copied(), Some(-120.0));
        let last = xs.last().copied().expect("tiles");
        assert!(last + 300.0 >= 1000.0);
    }

    #[test]
    fn wide_layer_still_draws_two_tiles() {
        let layer = ParallaxLayer::new(2000.0, 0.3);
        assert_eq!(layer.tile_xs(1000.0).count(), 2);
    }

    #[test]
    fn begin_tick_moves_all_layers() {
        let mut world = ScrollWorld::new(vec![
            ParallaxLayer::new(1000.0, 0.3),
            ParallaxLayer::new(1000.0, 1.0),
        ]);
        world.begin_tick(-7.0);

        assert_eq!(world.scroll_delta(), -7.0);
        assert!((world.layers()[0].offset_x + 997.9).abs() < 1e-3);
        assert!((world.layers()[1].offset_x + 993.0).abs() < 1e-3);
    }
}
