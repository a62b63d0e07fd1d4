//! Codequest host: window, input and the per-frame loop.
//!
//! winit drives everything through `ApplicationHandler`. Each
//! `RedrawRequested` collects finished atlas builds, then lets the movement
//! loop run however many fixed ticks are due. Drawing belongs to an external
//! render layer; this host reports the player's state through the log and
//! progress through the window title.
//!
//! Keys: arrows/WASD move, 1-3 toggle today's quests, E/Enter claims the
//! daily reward once all three are done, Escape quits.

mod config;
mod session;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use config::{load_config_from_path, GameConfig, DEFAULT_CONFIG_PATH};
use cq_atlas::{AtlasCache, ImageSource, SpriteAtlas};
use cq_core::{Action, InputTracker, MovementLoop, PlayerState};
use cq_platform::{create_window, map_key, PlatformConfig};
use cq_progress::questmaster::today_local;
use cq_progress::JsonFileStore;
use session::Session;

const DATE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

struct GameState {
    window: Arc<Window>,
    input: InputTracker,
    actions: Rc<RefCell<Vec<Action>>>,
    movement: MovementLoop,
    atlases: AtlasCache,
    player_atlas: Arc<SpriteAtlas>,
    session: Session,
    last_date_check: Instant,
    title: String,
}

impl GameState {
    fn new(window: Arc<Window>, config: &GameConfig) -> Self {
        let mut input = InputTracker::new();
        let actions = Rc::new(RefCell::new(Vec::new()));
        for action in [Action::Interact, Action::Attack, Action::Escape] {
            let queue = actions.clone();
            input.on_action(action, move |fired| queue.borrow_mut().push(fired));
        }

        let movement = MovementLoop::new(
            config.movement,
            config.bounds(),
            input.held_keys(),
            config.spawn_point(),
        );

        let mut atlases = AtlasCache::new();
        let player = &config.player;
        let player_atlas = Arc::new(SpriteAtlas::placeholder(
            config.movement.sprite_width as u32,
            config.movement.sprite_height as u32,
            config.movement.ticks_per_frame,
        ));
        match &player.image {
            Some(reference) => {
                let source = ImageSource::from_reference(reference);
                atlas_request(&mut atlases, &player.atlas_key, &source, config);
            }
            None => log::info!("No player image configured, using placeholder sprite"),
        }

        let session = Session::open(
            Box::new(JsonFileStore::open(&config.save_path)),
            &today_local(),
        );

        let mut state = Self {
            window,
            input,
            actions,
            movement,
            atlases,
            player_atlas,
            session,
            last_date_check: Instant::now(),
            title: config.title.clone(),
        };
        state.refresh_title();
        state
    }

    fn handle_key(&mut self, key_code: KeyCode, pressed: bool, repeat: bool) {
        if pressed && !repeat && !self.input.has_text_focus() {
            if let Some(index) = quest_slot(key_code) {
                if self.session.toggle_quest_at(index) {
                    self.refresh_title();
                }
                return;
            }
        }
        if let Some(key) = map_key(key_code) {
            if pressed {
                self.input.key_down(key);
            } else {
                self.input.key_up(key);
            }
        }
    }

    /// Run queued actions. Returns false when the game should exit.
    fn drain_actions(&mut self) -> bool {
        let fired: Vec<Action> = self.actions.borrow_mut().drain(..).collect();
        for action in fired {
            match action {
                Action::Interact => match self.session.claim_daily_reward() {
                    Ok(Some(outcome)) => {
                        log::info!(
                            "Reward claimed: +{} xp, streak {}{}",
                            outcome.xp_awarded,
                            outcome.save.streak,
                            if outcome.streak_continued {
                                ""
                            } else {
                                " (new streak)"
                            }
                        );
                        self.refresh_title();
                    }
                    Ok(None) => log::info!(
                        "Nothing to claim: {}/{} quests done",
                        self.session.completed_count(),
                        self.session.board().quests.len()
                    ),
                    Err(err) => {
                        log::error!("{err}");
                        self.refresh_title();
                    }
                },
                Action::Attack => {
                    log::debug!("Attack at {}", self.movement.state().position);
                }
                Action::Escape => return false,
            }
        }
        true
    }

    fn poll_atlases(&mut self, player_key: &str) {
        for (key, result) in self.atlases.poll() {
            if key != player_key {
                continue;
            }
            match result {
                Ok(atlas) => {
                    log::info!(
                        "Player sprite ready: {}x{} frames",
                        atlas.frame_width,
                        atlas.frame_height
                    );
                    self.player_atlas = atlas;
                }
                Err(err) => {
                    log::error!("Player sprite failed, keeping placeholder: {err}");
                }
            }
        }
    }

    fn on_player_changed(&self, state: &PlayerState) {
        let frame = self.player_atlas.frame(state.direction, state.frame as usize);
        log::trace!(
            "{} frame {} at ({:.1}, {:.1}) src {}x{}+{}+{}",
            state.animation,
            state.frame,
            state.position.x,
            state.position.y,
            frame.width,
            frame.height,
            frame.x,
            frame.y
        );
    }

    fn check_date(&mut self, now: Instant) {
        if now.duration_since(self.last_date_check) < DATE_CHECK_INTERVAL {
            return;
        }
        self.last_date_check = now;
        let today = today_local();
        if self.session.roll_over(&today) {
            log::info!("New day {}, quest board refreshed", today);
            self.refresh_title();
        }
    }

    fn refresh_title(&self) {
        self.window
            .set_title(&format!("{} - {}", self.title, self.session.status_line()));
    }
}

fn atlas_request(cache: &mut AtlasCache, key: &str, source: &ImageSource, config: &GameConfig) {
    if cache.request(key, source, &config.player.atlas) {
        log::info!("Loading player sprite from {}", source.describe());
    }
}

fn quest_slot(key_code: KeyCode) -> Option<usize> {
    match key_code {
        KeyCode::Digit1 | KeyCode::Numpad1 => Some(0),
        KeyCode::Digit2 | KeyCode::Numpad2 => Some(1),
        KeyCode::Digit3 | KeyCode::Numpad3 => Some(2),
        _ => None,
    }
}

struct App {
    config: GameConfig,
    state: Option<GameState>,
}

impl App {
    fn new(config: GameConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    fn platform_config(&self) -> PlatformConfig {
        PlatformConfig {
            title: self.config.title.clone(),
            width: self.config.world.width.round() as u32,
            height: self.config.world.height.round() as u32,
            ..PlatformConfig::default()
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match create_window(event_loop, &self.platform_config()) {
            Ok(window) => self.state = Some(GameState::new(window, &self.config)),
            Err(err) => {
                log::error!("{err}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                state.movement.cancel();
                event_loop.exit();
            }

            WindowEvent::Focused(false) => state.input.focus_lost(),

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    state.handle_key(
                        key_code,
                        event.state == ElementState::Pressed,
                        event.repeat,
                    );
                }
                if !state.drain_actions() {
                    log::info!("Escape pressed, exiting.");
                    state.movement.cancel();
                    event_loop.exit();
                }
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                state.poll_atlases(&self.config.player.atlas_key);
                if let Some(player) = state.movement.frame(now) {
                    state.on_player_changed(&player);
                }
                state.check_date(now);
            }

            _ => {}
        }
    }
}

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Codequest starting...");

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = load_config_from_path(&config_path)?;

    let event_loop =
        EventLoop::new().map_err(|e| format!("Failed to create event loop: {e}"))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| format!("Event loop error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_keys_select_quest_slots() {
        assert_eq!(quest_slot(KeyCode::Digit1), Some(0));
        assert_eq!(quest_slot(KeyCode::Numpad3), Some(2));
        assert_eq!(quest_slot(KeyCode::Digit4), None);
        assert_eq!(quest_slot(KeyCode::KeyW), None);
    }

    #[test]
    fn config_file_in_repo_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/game.json");
        let config = load_config_from_path(&path).expect("shipped config is valid");
        assert!(!config.title.is_empty());
    }
}
