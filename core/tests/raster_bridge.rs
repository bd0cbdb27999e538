//! Raster bridge: buffer layout, in-place re-rasterization, and refresh
//! after every step.

use simcx_core::{
    command::DisplayCommand,
    config::DisplayConfig,
    display::Display,
    error::SimError,
    function_iterator::FunctionIterator2D,
    plot_visuals::LinesVisual,
    raster::{RasterBridge, BASE_DPI},
    simulator::{shared, SimHandle},
    visual::{RasterVisual, VisualHandle},
};

#[test]
fn buffer_holds_exactly_one_rgba_frame_top_down() {
    let bridge = RasterBridge::create_canvas(150, 90, BASE_DPI).unwrap();
    assert_eq!(bridge.pixels().len(), 150 * 90 * 4);
    assert_eq!(bridge.stride(), -(150 * 4));
    assert_eq!(bridge.updates(), 0, "the initial raster does not count as an update");
}

#[test]
fn update_image_reuses_the_same_buffer() {
    let mut bridge = RasterBridge::create_canvas(64, 48, BASE_DPI).unwrap();
    let before = bridge.pixels().as_ptr();
    let blank = bridge.pixels().to_vec();

    bridge.axes_mut().plot(vec![0.0, 1.0], vec![0.0, 1.0], None);
    bridge.update_image().unwrap();
    bridge.update_image().unwrap();

    assert_eq!(bridge.pixels().as_ptr(), before, "no reallocation between updates");
    assert_eq!(bridge.pixels().len(), 64 * 48 * 4);
    assert_ne!(bridge.pixels(), blank.as_slice(), "the plotted line must show up");
    assert_eq!(bridge.updates(), 2);
}

#[test]
fn zero_sized_canvas_is_rejected() {
    let result = RasterBridge::create_canvas(0, 10, BASE_DPI);
    assert!(matches!(result, Err(SimError::InvalidCanvas { width: 0, height: 10 })));
}

#[test]
fn raster_visuals_are_rerasterized_after_every_step() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut display = Display::new(DisplayConfig::default()).unwrap();
    let sim = shared(FunctionIterator2D::new(|x, y| (y, -0.5 * x), (1.0, 0.0)));
    let handle: SimHandle = sim.clone();
    display.add_simulator(handle);
    let plot = shared(LinesVisual::new(sim, 200, 120).unwrap());
    display.add_visual(VisualHandle::raster(&plot), 0, 0).unwrap();
    assert_eq!(plot.borrow().bridge().updates(), 1, "placement rasterizes once");

    for _ in 0..3 {
        display.handle_command(DisplayCommand::Step).unwrap();
    }

    assert_eq!(plot.borrow().bridge().updates(), 4);
}

#[test]
fn reset_rerasterizes_raster_visuals() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut display = Display::new(DisplayConfig::default()).unwrap();
    let sim = shared(FunctionIterator2D::new(|x, y| (x + y, y), (0.0, 1.0)));
    let handle: SimHandle = sim.clone();
    display.add_simulator(handle);
    let plot = shared(LinesVisual::new(sim.clone(), 100, 100).unwrap());
    display.add_visual(VisualHandle::raster(&plot), 0, 0).unwrap();

    display.handle_command(DisplayCommand::Step).unwrap();
    display.handle_command(DisplayCommand::Reset).unwrap();

    assert_eq!(sim.borrow().time(), 0);
    assert_eq!(plot.borrow().bridge().updates(), 3);
}
