use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Semantic action names mapped from physical inputs via bindings.yaml.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputBindings {
    #[serde(default)]
    pub actions: HashMap<String, Vec<InputTrigger>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InputTrigger {
    Key(String),
    Mouse(String),
}

impl Default for InputBindings {
    fn default() -> Self {
        let mut actions = HashMap::new();
        actions.insert("move_forward".into(), vec![InputTrigger::Key("W".into())]);
        actions.insert("move_backward".into(), vec![InputTrigger::Key("S".into())]);
        actions.insert("move_left".into(), vec![InputTrigger::Key("A".into())]);
        actions.insert("move_right".into(), vec![InputTrigger::Key("D".into())]);
        actions.insert("sprint".into(), vec![InputTrigger::Key("ShiftLeft".into())]);
        actions.insert("randomize".into(), vec![InputTrigger::Key("R".into())]);
        actions.insert(
            "change_artwork".into(),
            vec![InputTrigger::Mouse("Left".into())],
        );
        actions.insert(
            "release_cursor".into(),
            vec![InputTrigger::Key("Escape".into())],
        );

        Self { actions }
    }
}

/// Load input bindings from a YAML file, with defaults as fallback.
pub fn load_bindings(project_root: &Path) -> InputBindings {
    let path = project_root.join("input/bindings.yaml");
    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(bindings) => {
                    tracing::info!("Loaded input bindings from {:?}", path);
                    return bindings;
                }
                Err(e) => tracing::warn!("Failed to parse bindings.yaml: {}", e),
            },
            Err(e) => tracing::warn!("Failed to read bindings.yaml: {}", e),
        }
    }
    tracing::info!("Using default input bindings");
    InputBindings::default()
}

/// Maps key name strings to winit KeyCode.
fn key_name_to_code(name: &str) -> Option<KeyCode> {
    match name {
        "A" => Some(KeyCode::KeyA),
        "D" => Some(KeyCode::KeyD),
        "E" => Some(KeyCode::KeyE),
        "F" => Some(KeyCode::KeyF),
        "Q" => Some(KeyCode::KeyQ),
        "R" => Some(KeyCode::KeyR),
        "S" => Some(KeyCode::KeyS),
        "W" => Some(KeyCode::KeyW),
        "Space" => Some(KeyCode::Space),
        "ShiftLeft" => Some(KeyCode::ShiftLeft),
        "ShiftRight" => Some(KeyCode::ShiftRight),
        "ControlLeft" => Some(KeyCode::ControlLeft),
        "Escape" => Some(KeyCode::Escape),
        "Enter" => Some(KeyCode::Enter),
        "Tab" => Some(KeyCode::Tab),
        "ArrowUp" => Some(KeyCode::ArrowUp),
        "ArrowDown" => Some(KeyCode::ArrowDown),
        "ArrowLeft" => Some(KeyCode::ArrowLeft),
        "ArrowRight" => Some(KeyCode::ArrowRight),
        _ => None,
    }
}

fn mouse_name_to_button(name: &str) -> Option<MouseButton> {
    match name {
        "Left" => Some(MouseButton::Left),
        "Right" => Some(MouseButton::Right),
        "Middle" => Some(MouseButton::Middle),
        _ => None,
    }
}

/// Central input state, updated each frame. Owned by the engine and handed
/// to the systems that need it — nothing reads ambient global state.
pub struct InputState {
    bindings: InputBindings,
    // Raw key state
    keys_held: HashSet<KeyCode>,
    keys_just_pressed: HashSet<KeyCode>,
    // Raw mouse state
    mouse_buttons_held: HashSet<MouseButton>,
    mouse_buttons_just_pressed: HashSet<MouseButton>,
    // Mouse motion accumulated this frame
    mouse_delta: Vec2,
    // Whether the cursor is captured (pointer lock engaged)
    pub cursor_captured: bool,
}

impl InputState {
    pub fn new(bindings: InputBindings) -> Self {
        Self {
            bindings,
            keys_held: HashSet::new(),
            keys_just_pressed: HashSet::new(),
            mouse_buttons_held: HashSet::new(),
            mouse_buttons_just_pressed: HashSet::new(),
            mouse_delta: Vec2::ZERO,
            cursor_captured: false,
        }
    }

    /// Call at the end of each frame to clear transient state.
    pub fn begin_frame(&mut self) {
        self.keys_just_pressed.clear();
        self.mouse_buttons_just_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    /// Process a winit WindowEvent. Re-delivered key repeats are no-ops on
    /// the held set.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if !self.keys_held.contains(&key_code) {
                                self.keys_just_pressed.insert(key_code);
                            }
                            self.keys_held.insert(key_code);
                        }
                        ElementState::Released => {
                            self.keys_held.remove(&key_code);
                        }
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    if !self.mouse_buttons_held.contains(button) {
                        self.mouse_buttons_just_pressed.insert(*button);
                    }
                    self.mouse_buttons_held.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_buttons_held.remove(button);
                }
            },
            _ => {}
        }
    }

    /// Process a winit DeviceEvent (for raw mouse motion).
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.mouse_delta.x += delta.0 as f32;
            self.mouse_delta.y += delta.1 as f32;
        }
    }

    /// Check if a semantic action is currently held.
    pub fn pressed(&self, action: &str) -> bool {
        if let Some(triggers) = self.bindings.actions.get(action) {
            for trigger in triggers {
                match trigger {
                    InputTrigger::Key(name) => {
                        if let Some(code) = key_name_to_code(name) {
                            if self.keys_held.contains(&code) {
                                return true;
                            }
                        }
                    }
                    InputTrigger::Mouse(name) => {
                        if let Some(btn) = mouse_name_to_button(name) {
                            if self.mouse_buttons_held.contains(&btn) {
                                return true;
                            }
                        }
                    }
                }
            }
        }
        false
    }

    /// Check if a semantic action was just pressed this frame.
    pub fn just_pressed(&self, action: &str) -> bool {
        if let Some(triggers) = self.bindings.actions.get(action) {
            for trigger in triggers {
                match trigger {
                    InputTrigger::Key(name) => {
                        if let Some(code) = key_name_to_code(name) {
                            if self.keys_just_pressed.contains(&code) {
                                return true;
                            }
                        }
                    }
                    InputTrigger::Mouse(name) => {
                        if let Some(btn) = mouse_name_to_button(name) {
                            if self.mouse_buttons_just_pressed.contains(&btn) {
                                return true;
                            }
                        }
                    }
                }
            }
        }
        false
    }

    /// Get raw mouse delta this frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Check if a raw key is held.
    pub fn key_held(&self, code: KeyCode) -> bool {
        self.keys_held.contains(&code)
    }
}
