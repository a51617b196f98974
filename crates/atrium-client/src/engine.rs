use std::path::PathBuf;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

use atrium_core::collision::CollisionWorld;
use atrium_core::components::{Camera, Player, Transform};
use atrium_core::events::EventBus;
use atrium_core::fade::FadeSystem;
use atrium_core::walk::{MoveInput, WalkController};

use crate::artwork::{self, ArtworkLibrary};
use crate::assets::{AssetLoader, LoadCompletion, ModelKind, ModelRequest};
use crate::cli::CliArgs;
use crate::config::GalleryConfig;
use crate::gallery::GalleryWorld;
use crate::input::{self, InputState};
use crate::material::MaterialRegistry;
use crate::mesh::MeshCache;
use crate::renderer::{self, CameraState, GalleryPipeline, GpuState};
use crate::texture::TextureCache;

/// Main engine struct implementing winit's ApplicationHandler.
///
/// Per-frame order is fixed: load completions, pointer-lock transitions,
/// mouse-look and movement, pick/randomize triggers, fades, event flush,
/// camera upload, render.
pub struct Engine {
    #[allow(dead_code)]
    pub args: CliArgs,
    pub project_root: PathBuf,
    config: GalleryConfig,

    pub gpu: Option<GpuState>,
    pipeline: Option<GalleryPipeline>,
    camera_state: Option<CameraState>,
    textures: Option<TextureCache>,

    pub gallery: GalleryWorld,
    pub collision: CollisionWorld,
    pub walk: WalkController,
    pub fades: FadeSystem,
    pub events: EventBus,
    pub materials: MaterialRegistry,
    pub meshes: MeshCache,
    pub library: ArtworkLibrary,
    pub input_state: InputState,
    loader: AssetLoader,
    player: hecs::Entity,

    last_frame_time: Option<instant::Instant>,
    delta_time: f32,
    disposed: bool,
}

impl Engine {
    pub fn new(args: CliArgs, config: GalleryConfig, project_root: PathBuf) -> Self {
        let input_state = InputState::new(input::load_bindings(&project_root));
        let walk = WalkController::new(
            config.movement.base_speed,
            config.movement.sprint_multiplier,
            config.movement.move_scale,
        );
        let collision = CollisionWorld::new(
            config.movement.player_radius,
            config.movement.player_height,
        );
        let library = ArtworkLibrary::new(
            config.artworks.urls.clone(),
            config.artworks.fallback.clone(),
        );
        let loader = AssetLoader::new(project_root.clone());

        let mut gallery = GalleryWorld::new();
        let player = gallery.spawn_player(&config);

        Self {
            args,
            project_root,
            config,
            gpu: None,
            pipeline: None,
            camera_state: None,
            textures: None,
            gallery,
            collision,
            walk,
            fades: FadeSystem::new(),
            events: EventBus::new(256),
            materials: MaterialRegistry::new(),
            meshes: MeshCache::new(),
            library,
            input_state,
            loader,
            player,
            last_frame_time: None,
            delta_time: 1.0 / 60.0,
            disposed: false,
        }
    }

    fn fade_duration(&self) -> f32 {
        self.config.fade_ms as f32 / 1000.0
    }

    /// Issue the asynchronous loads for every model in the gallery config.
    fn request_scene_models(&self) {
        let museum = &self.config.museum;
        self.loader.request_model(ModelRequest {
            id: museum.id.clone(),
            source: museum.model.clone(),
            kind: ModelKind::Museum,
            position: museum.position,
            rotation: museum.rotation,
            scale: museum.scale,
        });

        for def in &self.config.paintings {
            self.loader.request_model(ModelRequest {
                id: def.id.clone(),
                source: def.model.clone(),
                kind: ModelKind::Painting,
                position: def.position,
                rotation: def.rotation,
                scale: def.scale,
            });
        }
        tracing::info!(
            "Requested {} model loads",
            1 + self.config.paintings.len()
        );
    }

    /// Drain finished loads from the worker channel and apply them.
    fn process_completions(&mut self) {
        let fade_duration = self.fade_duration();
        for completion in self.loader.poll() {
            if self.disposed {
                tracing::debug!("Load completion after dispose, dropped");
                continue;
            }
            match completion {
                LoadCompletion::Model { request, result } => match result {
                    Ok(data) => {
                        let Some(gpu) = &self.gpu else {
                            continue;
                        };
                        let mesh = self.meshes.upload(&gpu.device, &request.source, &data);
                        let entity = self.gallery.spawn_model(
                            &request,
                            &data,
                            mesh,
                            &mut self.materials,
                            &mut self.collision,
                        );
                        if let (Some(gpu), Some(pipeline)) = (&self.gpu, &self.pipeline) {
                            let draw =
                                renderer::create_draw_resources(&gpu.device, &pipeline.model_layout);
                            let _ = self.gallery.world.insert_one(entity, draw);
                        }

                        if request.kind == ModelKind::Painting {
                            if let Some(url) = self.library.pick_random(&mut rand::thread_rng()) {
                                artwork::bind_artwork(
                                    &mut self.gallery.world,
                                    entity,
                                    url,
                                    &self.loader,
                                );
                            }
                        }

                        let mut data = std::collections::HashMap::new();
                        data.insert("id".to_string(), serde_json::json!(request.id));
                        self.events.emit("model.loaded", data);
                    }
                    Err(e) => {
                        // The model simply does not appear; the session
                        // continues without it.
                        tracing::error!("Model '{}' failed to load: {}", request.id, e);
                    }
                },
                LoadCompletion::Image { ticket, result } => {
                    let upload = match result {
                        Ok(rgba) => match (&mut self.textures, &self.gpu) {
                            (Some(textures), Some(gpu)) => {
                                Ok(textures.upload(&gpu.device, &gpu.queue, &rgba, &ticket.url))
                            }
                            _ => {
                                tracing::debug!("Image completion before GPU init, dropped");
                                continue;
                            }
                        },
                        Err(e) => Err(e),
                    };
                    artwork::handle_image_completion(
                        &mut self.gallery.world,
                        ticket,
                        upload,
                        &mut self.materials,
                        &mut self.fades,
                        fade_duration,
                        &self.library,
                        &self.loader,
                        &mut self.events,
                    );
                }
            }
        }
    }

    /// Escape releases the cursor; a click or movement key engages it.
    fn update_pointer_lock(&mut self) {
        if self.input_state.cursor_captured && self.input_state.just_pressed("release_cursor") {
            if let Some(gpu) = &self.gpu {
                let _ = gpu
                    .window
                    .set_cursor_grab(winit::window::CursorGrabMode::None);
                gpu.window.set_cursor_visible(true);
            }
            self.input_state.cursor_captured = false;
            if self.walk.set_locked(false) {
                self.emit_lock_changed(false);
            }
        }

        if !self.input_state.cursor_captured {
            let should_capture = self.input_state.just_pressed("change_artwork")
                || self.input_state.just_pressed("move_forward")
                || self.input_state.just_pressed("move_backward")
                || self.input_state.just_pressed("move_left")
                || self.input_state.just_pressed("move_right");
            if should_capture {
                tracing::info!("Capturing cursor for first-person walk");
                if let Some(gpu) = &self.gpu {
                    let _ = gpu
                        .window
                        .set_cursor_grab(winit::window::CursorGrabMode::Locked)
                        .or_else(|_| {
                            gpu.window
                                .set_cursor_grab(winit::window::CursorGrabMode::Confined)
                        });
                    gpu.window.set_cursor_visible(false);
                }
                self.input_state.cursor_captured = true;
                if self.walk.set_locked(true) {
                    self.emit_lock_changed(true);
                }
            }
        }
    }

    fn emit_lock_changed(&mut self, locked: bool) {
        let mut data = std::collections::HashMap::new();
        data.insert("locked".to_string(), serde_json::json!(locked));
        self.events.emit("walk.lock_changed", data);
    }

    /// Mouse-look plus movement integration for one tick. The displacement
    /// is added to the player transform without consulting the collision
    /// registry.
    fn update_walk(&mut self) {
        let dt = self.delta_time;
        let sensitivity = self.config.movement.mouse_sensitivity;
        let mouse_delta = self.input_state.mouse_delta();
        let move_input = MoveInput {
            forward: self.input_state.pressed("move_forward"),
            backward: self.input_state.pressed("move_backward"),
            left: self.input_state.pressed("move_left"),
            right: self.input_state.pressed("move_right"),
            sprint: self.input_state.pressed("sprint"),
        };
        let pitch_limit = std::f32::consts::FRAC_PI_2 - 0.01;

        if let Ok((player, transform)) = self
            .gallery
            .world
            .query_one_mut::<(&mut Player, &mut Transform)>(self.player)
        {
            player.yaw -= mouse_delta.x * sensitivity;
            player.pitch =
                (player.pitch - mouse_delta.y * sensitivity).clamp(-pitch_limit, pitch_limit);

            let displacement = self.walk.update(move_input, player.world_forward(), dt);
            transform.position += displacement;
        }
    }

    /// Click-pick: swap the nearest painting under the screen-center ray.
    /// The collision registry gates the attempt on proximity to geometry
    /// in the view direction.
    fn handle_pick(&mut self) {
        if !(self.input_state.cursor_captured && self.input_state.just_pressed("change_artwork")) {
            return;
        }

        let pose = {
            let world = &self.gallery.world;
            match (
                world.get::<&Player>(self.player),
                world.get::<&Transform>(self.player),
            ) {
                (Ok(player), Ok(transform)) => Some((transform.position, player.world_forward())),
                _ => None,
            }
        };
        let Some((origin, forward)) = pose else {
            return;
        };

        if !self.collision.query(origin, forward) {
            return;
        }

        if let Some(entity) = artwork::pick_painting(
            &self.gallery.world,
            &self.gallery.paintings,
            &self.collision,
            origin,
            forward,
        ) {
            if let Some(url) = self.library.pick_random(&mut rand::thread_rng()) {
                artwork::bind_artwork(&mut self.gallery.world, entity, url, &self.loader);
            }
        }
    }

    fn handle_randomize(&mut self) {
        let paintings = self.gallery.paintings.clone();
        let mut rng = rand::thread_rng();
        artwork::randomize_all(
            &mut self.gallery.world,
            &paintings,
            &self.library,
            &mut rng,
            &self.loader,
            &mut self.events,
        );
    }

    fn update_fades(&mut self) {
        for update in self.fades.update(self.delta_time) {
            self.materials.apply_fade(update);
        }
    }

    fn flush_events(&mut self) {
        self.events.tick(self.delta_time as f64);
        for event in self.events.flush() {
            tracing::debug!("event: {}", event.event_type);
        }
    }

    /// Tear down the gallery. Completions still in flight are drained and
    /// dropped by the next poll; nothing they target remains.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.gallery.clear();
        self.collision.clear();
        self.materials.clear();
        self.fades = FadeSystem::new();
        for _ in self.loader.poll() {}
        tracing::info!("Gallery disposed");
    }
}

impl ApplicationHandler for Engine {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        tracing::info!("Application resumed, initializing GPU");

        let window_attrs = Window::default_attributes()
            .with_title(self.config.name.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );

        let gpu = pollster::block_on(renderer::init_gpu(Arc::clone(&window)));
        let textures = TextureCache::new(&gpu.device, &gpu.queue);
        let camera_state = CameraState::new(&gpu.device);
        let pipeline = renderer::create_gallery_pipeline(
            &gpu.device,
            gpu.config.format,
            &camera_state.bind_group_layout,
            textures.layout(),
        );

        self.gpu = Some(gpu);
        self.textures = Some(textures);
        self.camera_state = Some(camera_state);
        self.pipeline = Some(pipeline);
        tracing::info!("GPU initialized successfully");

        self.request_scene_models();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.input_state.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                self.dispose();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    if new_size.width > 0 && new_size.height > 0 {
                        gpu.config.width = new_size.width;
                        gpu.config.height = new_size.height;
                        gpu.surface.configure(&gpu.device, &gpu.config);

                        let (depth_texture, depth_view) = renderer::create_depth_texture(
                            &gpu.device,
                            new_size.width,
                            new_size.height,
                        );
                        gpu.depth_texture = depth_texture;
                        gpu.depth_view = depth_view;
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let now = instant::Instant::now();
                if let Some(last) = self.last_frame_time {
                    self.delta_time = now.duration_since(last).as_secs_f32().min(0.1);
                }
                self.last_frame_time = Some(now);

                self.process_completions();
                self.update_pointer_lock();
                if self.input_state.cursor_captured {
                    self.update_walk();
                }
                self.handle_pick();
                if self.input_state.just_pressed("randomize") {
                    self.handle_randomize();
                }
                self.update_fades();
                self.flush_events();

                let pose = {
                    let world = &self.gallery.world;
                    match (
                        world.get::<&Player>(self.player),
                        world.get::<&Transform>(self.player),
                        world.get::<&Camera>(self.player),
                    ) {
                        (Ok(player), Ok(transform), Ok(camera)) => Some((
                            camera.clone(),
                            transform.position,
                            player.world_forward(),
                        )),
                        _ => None,
                    }
                };
                if let (Some(gpu), Some(camera_state), Some((camera, position, forward))) =
                    (&self.gpu, &mut self.camera_state, pose)
                {
                    camera_state.update(
                        &gpu.queue,
                        &camera,
                        position,
                        forward,
                        gpu.config.width,
                        gpu.config.height,
                    );
                }

                if let (Some(gpu), Some(pipeline), Some(camera_state), Some(textures)) = (
                    &self.gpu,
                    &self.pipeline,
                    &self.camera_state,
                    &self.textures,
                ) {
                    renderer::render_scene(
                        gpu,
                        pipeline,
                        camera_state,
                        &self.gallery.world,
                        &self.meshes,
                        &self.materials,
                        textures,
                    );
                    gpu.window.request_redraw();
                }

                self.input_state.begin_frame();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        self.input_state.handle_device_event(&event);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}
