use std::cell::Cell;
use std::rc::Rc;

use glam::DVec2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use wterrain::{
    AnimationConfig, BackgroundAnimation, BackgroundError, FrameHandle, Host, MountTarget, OrbitCamera, Renderer,
    ResizeSubscription, Result, Scene,
};

#[derive(Default)]
struct Counters {
    attaches: Cell<u32>,
    renders: Cell<u32>,
    resizes: Cell<u32>,
    releases: Cell<u32>,
    fail_render: Cell<bool>,
    last_size: Cell<(u32, u32)>,
}

#[derive(Default)]
struct MockHost {
    size: (u32, u32),
    next_id: u64,
    requested: Vec<FrameHandle>,
    cancelled: Vec<FrameHandle>,
    subscribed: Vec<u64>,
    unsubscribed: Vec<u64>,
}

impl MockHost {
    fn new(width: u32, height: u32) -> Self {
        Self { size: (width, height), ..Default::default() }
    }

    fn last_requested(&self) -> Option<FrameHandle> {
        self.requested.last().copied()
    }
}

impl Host for MockHost {
    fn viewport_size(&self) -> (u32, u32) {
        self.size
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle::new(self.next_id);
        self.requested.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.cancelled.push(handle);
    }

    fn subscribe_resize(&mut self) -> ResizeSubscription {
        self.next_id += 1;
        self.subscribed.push(self.next_id);
        ResizeSubscription::new(self.next_id)
    }

    fn unsubscribe_resize(&mut self, subscription: ResizeSubscription) {
        self.unsubscribed.push(subscription.id());
    }
}

struct MockTarget(Rc<Counters>);

struct MockRenderer(Rc<Counters>);

impl MountTarget for MockTarget {
    type Renderer = MockRenderer;

    fn attach(self, width: u32, height: u32, _scene: &Scene) -> Result<MockRenderer> {
        self.0.attaches.set(self.0.attaches.get() + 1);
        self.0.last_size.set((width, height));
        Ok(MockRenderer(self.0))
    }
}

impl Renderer for MockRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        self.0.resizes.set(self.0.resizes.get() + 1);
        self.0.last_size.set((width, height));
    }

    fn render(&mut self, _scene: &Scene) -> Result<()> {
        if self.0.fail_render.get() {
            return Err(BackgroundError::Surface(wgpu::SurfaceError::Timeout));
        }
        self.0.renders.set(self.0.renders.get() + 1);
        Ok(())
    }

    fn release(self) {
        self.0.releases.set(self.0.releases.get() + 1);
    }
}

fn small_config() -> AnimationConfig {
    AnimationConfig { plane_definition: 4, seed: Some(7), ..Default::default() }
}

fn mount_with(config: &AnimationConfig, host: &mut MockHost) -> (BackgroundAnimation<MockRenderer>, Rc<Counters>) {
    let counters = Rc::new(Counters::default());
    let mut rng = StdRng::seed_from_u64(7);
    let background = BackgroundAnimation::mount(Some(MockTarget(counters.clone())), host, config, &mut rng).unwrap();
    (background, counters)
}

fn run_frames(background: &mut BackgroundAnimation<MockRenderer>, host: &mut MockHost, frames: usize) {
    for _ in 0..frames {
        let handle = background.pending_frame().unwrap();
        background.on_frame(host, handle).unwrap();
    }
}

#[test]
fn mount_attaches_and_schedules_the_first_frame() {
    let mut host = MockHost::new(1600, 900);
    let (background, counters) = mount_with(&small_config(), &mut host);

    assert!(background.is_active());
    assert_eq!(counters.attaches.get(), 1);
    assert_eq!(counters.last_size.get(), (1600, 900));
    assert_eq!(counters.renders.get(), 0);
    assert_eq!(host.requested.len(), 1);
    assert_eq!(host.subscribed.len(), 1);
    assert_eq!(background.pending_frame(), host.last_requested());

    let aspect = background.scene().unwrap().camera().aspect();
    assert!((aspect - 16.0 / 9.0).abs() < 1e-6);
}

#[test]
fn each_frame_reschedules_then_advances_and_renders() {
    let mut host = MockHost::new(800, 600);
    let (mut background, counters) = mount_with(&small_config(), &mut host);

    run_frames(&mut background, &mut host, 3);

    assert_eq!(counters.renders.get(), 3);
    assert_eq!(background.frames_rendered(), 3);
    assert_eq!(background.scene().unwrap().frame_count(), 3);
    assert_eq!(host.requested.len(), 4);
    assert_eq!(background.pending_frame(), host.last_requested());
}

#[test]
fn stale_frame_handles_are_ignored() {
    let mut host = MockHost::new(800, 600);
    let (mut background, counters) = mount_with(&small_config(), &mut host);
    let first = background.pending_frame().unwrap();
    background.on_frame(&mut host, first).unwrap();

    background.on_frame(&mut host, first).unwrap();
    background.on_frame(&mut host, FrameHandle::new(999)).unwrap();

    assert_eq!(counters.renders.get(), 1);
    assert_eq!(background.scene().unwrap().frame_count(), 1);
    assert_eq!(host.requested.len(), 2);
}

#[test]
fn unmount_before_any_frame_releases_without_drawing() {
    let mut host = MockHost::new(800, 600);
    let (background, counters) = mount_with(&small_config(), &mut host);
    let pending = background.pending_frame();
    let scene = background.scene().unwrap();
    assert_eq!(scene.wave().counter(), 0.0);
    assert_eq!(scene.frame_count(), 0);
    assert!(scene.mesh().elevations().zip(scene.mesh().baseline()).all(|(live, base)| live == base));

    background.unmount(&mut host);

    assert_eq!(counters.renders.get(), 0);
    assert_eq!(counters.releases.get(), 1);
    assert_eq!(host.cancelled, pending.into_iter().collect::<Vec<_>>());
    assert_eq!(host.unsubscribed, host.subscribed);
}

#[test]
fn unmount_cancels_the_latest_frame_only() {
    let mut host = MockHost::new(800, 600);
    let (mut background, counters) = mount_with(&small_config(), &mut host);
    run_frames(&mut background, &mut host, 5);
    let latest = host.last_requested().unwrap();

    background.unmount(&mut host);

    assert_eq!(host.cancelled, vec![latest]);
    assert_eq!(host.unsubscribed.len(), 1);
    assert_eq!(counters.releases.get(), 1);
    assert_eq!(counters.renders.get(), 5);
}

#[test]
fn resize_updates_aspect_and_renderer() {
    let mut host = MockHost::new(800, 600);
    let (mut background, counters) = mount_with(&small_config(), &mut host);

    background.on_resize(1000, 500);
    assert_eq!(background.scene().unwrap().camera().aspect(), 2.0);
    assert_eq!(counters.resizes.get(), 1);
    assert_eq!(counters.last_size.get(), (1000, 500));

    background.on_resize(0, 500);
    assert_eq!(background.scene().unwrap().camera().aspect(), 2.0);
    assert_eq!(counters.resizes.get(), 1);
}

#[test]
fn missing_target_mounts_inert() {
    let mut host = MockHost::new(800, 600);
    let mut rng = StdRng::seed_from_u64(1);
    let mut background =
        BackgroundAnimation::<MockRenderer>::mount(None::<MockTarget>, &mut host, &small_config(), &mut rng).unwrap();

    assert!(!background.is_active());
    assert!(background.scene().is_none());
    assert!(background.pending_frame().is_none());

    background.on_frame(&mut host, FrameHandle::new(1)).unwrap();
    background.on_resize(640, 480);
    assert_eq!(background.frames_rendered(), 0);

    background.unmount(&mut host);
    assert!(host.requested.is_empty());
    assert!(host.subscribed.is_empty());
    assert!(host.cancelled.is_empty());
    assert!(host.unsubscribed.is_empty());
}

#[test]
fn invalid_config_fails_before_acquiring_anything() {
    let mut host = MockHost::new(800, 600);
    let counters = Rc::new(Counters::default());
    let mut rng = StdRng::seed_from_u64(1);
    let config = AnimationConfig { mesh_color: "303030".into(), ..small_config() };

    let result = BackgroundAnimation::<MockRenderer>::mount(Some(MockTarget(counters.clone())), &mut host, &config, &mut rng);

    assert!(matches!(result, Err(BackgroundError::InvalidColor(_))));
    assert_eq!(counters.attaches.get(), 0);
    assert!(host.requested.is_empty());
    assert!(host.subscribed.is_empty());
}

#[test]
fn render_failure_keeps_the_next_frame_scheduled() {
    let mut host = MockHost::new(800, 600);
    let (mut background, counters) = mount_with(&small_config(), &mut host);

    counters.fail_render.set(true);
    let first = background.pending_frame().unwrap();
    let result = background.on_frame(&mut host, first);
    assert!(matches!(result, Err(BackgroundError::Surface(wgpu::SurfaceError::Timeout))));

    let next = background.pending_frame().unwrap();
    assert_ne!(next, first);

    counters.fail_render.set(false);
    background.on_frame(&mut host, next).unwrap();
    assert_eq!(counters.renders.get(), 1);
    assert_eq!(background.scene().unwrap().frame_count(), 2);
}

#[test]
fn stock_grid_advances_the_wave_counter_per_vertex() {
    let mut host = MockHost::new(800, 600);
    let (mut background, _) = mount_with(&AnimationConfig::default(), &mut host);

    run_frames(&mut background, &mut host, 1);

    let scene = background.scene().unwrap();
    assert_eq!(scene.mesh().vertex_count(), 10_201);
    assert!((scene.wave().counter() - 1_020.1).abs() < 1e-6);
}

#[test]
fn camera_orbit_stays_bounded() {
    let mut host = MockHost::new(800, 600);
    let config = small_config();
    let (mut background, _) = mount_with(&config, &mut host);

    let center = OrbitCamera::orbit_center(config.rotation_speed, config.orbit_drift).unwrap();
    let start = DVec2::new(f64::from(config.camera_start[0]), f64::from(config.camera_start[2]));
    let max = center.length() + (start - center).length() + 1.0;

    for _ in 0..20 {
        run_frames(&mut background, &mut host, 500);
        let distance = background.scene().unwrap().camera().horizontal_distance();
        assert!(distance.is_finite());
        assert!(distance <= max, "camera drifted to {distance}");
    }
}
