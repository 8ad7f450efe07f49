//! Three Man entry point
//!
//! On the web this wires the DOM, motion sensor and Web Audio to the game
//! director. Natively it plays a headless match and logs it.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{
        DeviceMotionEvent, Document, Element, HtmlInputElement, KeyboardEvent, MouseEvent,
    };

    use three_man::Settings;
    use three_man::audio::DiceAudio;
    use three_man::consts::*;
    use three_man::input::{
        Command, acceleration_from_axes, is_roll_press, shake_magnitude, submits_name,
    };
    use three_man::sim::{DiceRig, GameDirector, GameEvent, GamePhase, StatusView, TableRig};

    // iOS gates devicemotion behind an explicit permission prompt
    #[wasm_bindgen(inline_js = "
        export async function request_motion_permission() {
            if (typeof DeviceMotionEvent === 'undefined') {
                return false;
            }
            if (typeof DeviceMotionEvent.requestPermission === 'function') {
                try {
                    return (await DeviceMotionEvent.requestPermission()) === 'granted';
                } catch (e) {
                    console.warn('Motion permission failed:', e);
                    return false;
                }
            }
            return true;
        }
    ")]
    extern "C" {
        fn request_motion_permission() -> js_sys::Promise;
    }

    const STYLE: &str = "
        .hidden { display: none !important; }
        body { margin: 0; font-family: sans-serif; background: #0b3d1f; color: #fff; }
        #hud { display: flex; justify-content: space-between; padding: 12px; }
        #action-text { white-space: pre-line; text-align: center; font-size: 2em; margin-top: 30vh; }
        .overlay { position: fixed; inset: 0; background: rgba(0,0,0,0.8); padding: 20vh 10vw; text-align: center; }
        .player-entry { display: flex; justify-content: space-between; }
    ";

    /// DOM elements the game writes to
    #[derive(Clone)]
    struct Ui {
        splash: Element,
        setup: Element,
        player_list: Element,
        player_input: HtmlInputElement,
        three_man: Element,
        turn: Element,
        status: Element,
        drinks: Element,
        drinks_title: Element,
        recipients: Element,
    }

    fn child(document: &Document, parent: &Element, tag: &str, id: &str) -> Result<Element, JsValue> {
        let el = document.create_element(tag)?;
        if !id.is_empty() {
            el.set_id(id);
        }
        parent.append_child(&el)?;
        Ok(el)
    }

    fn show(el: &Element, visible: bool) {
        let _ = if visible {
            el.class_list().remove_1("hidden")
        } else {
            el.class_list().add_1("hidden")
        };
    }

    /// Build the page: splash, setup, HUD, status line and drinks overlay
    fn build_ui(document: &Document) -> Result<Ui, JsValue> {
        let body: Element = document.body().ok_or("no body")?.into();

        let style = child(document, &body, "style", "")?;
        style.set_text_content(Some(STYLE));

        let hud = child(document, &body, "div", "hud")?;
        let three_man = child(document, &hud, "span", "current-3man")?;
        let turn = child(document, &hud, "span", "current-turn")?;
        let status = child(document, &body, "div", "action-text")?;

        let splash = child(document, &body, "div", "splash-screen")?;
        let _ = splash.class_list().add_1("overlay");
        child(document, &splash, "h1", "")?.set_text_content(Some("THREE MAN"));
        child(document, &splash, "button", "init-btn")?.set_text_content(Some("ENTER"));

        let setup = child(document, &body, "div", "setup-screen")?;
        let _ = setup.class_list().add_2("overlay", "hidden");
        let player_list = child(document, &setup, "div", "player-list")?;
        let player_input: HtmlInputElement =
            child(document, &setup, "input", "player-input")?.dyn_into()?;
        player_input.set_placeholder("NAME");
        child(document, &setup, "button", "add-player-btn")?.set_text_content(Some("ADD"));
        child(document, &setup, "button", "start-game-btn")?.set_text_content(Some("START"));

        let drinks = child(document, &body, "div", "drinks-overlay")?;
        let _ = drinks.class_list().add_2("overlay", "hidden");
        let drinks_title = child(document, &drinks, "h2", "doubles-title")?;
        let recipients = child(document, &drinks, "div", "recipient-buttons")?;

        Ok(Ui {
            splash,
            setup,
            player_list,
            player_input,
            three_man,
            turn,
            status,
            drinks,
            drinks_title,
            recipients,
        })
    }

    /// Game instance holding all state
    struct Game {
        director: GameDirector<TableRig>,
        audio: DiceAudio,
        settings: Settings,
        ui: Ui,
        accumulator: f32,
        last_time: f64,
    }

    impl Game {
        fn new(seed: u64, ui: Ui) -> Self {
            let settings = Settings::load();
            let mut audio = DiceAudio::new();
            audio.set_master_volume(settings.master_volume);
            audio.set_muted(!settings.sound);
            Self {
                director: GameDirector::new(TableRig::new(), settings.director_config(), seed),
                audio,
                settings,
                ui,
                accumulator: 0.0,
                last_time: 0.0,
            }
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                self.director.tick(SIM_DT);
                for speed in self.director.rig_mut().take_impacts() {
                    self.audio.play_clack(speed);
                }
                self.accumulator -= SIM_DT;
                substeps += 1;
            }
        }

        fn toggle_sound(&mut self) {
            self.settings.sound = !self.settings.sound;
            self.audio.set_muted(!self.settings.sound);
            self.settings.save();
            log::info!("Sound {}", if self.settings.sound { "on" } else { "off" });
        }
    }

    /// Apply director events to the page
    fn present(game: &Rc<RefCell<Game>>) {
        let (events, ui, hud) = {
            let mut g = game.borrow_mut();
            let events = g.director.drain_events();
            (events, g.ui.clone(), g.director.hud())
        };

        let view = StatusView::from_events(&events);
        if let Some(text) = &view.status {
            ui.status.set_text_content(Some(text));
        }
        if let Some(text) = &view.overlay {
            ui.drinks_title.set_text_content(Some(text));
        }

        for event in events {
            match event {
                GameEvent::Status { phase, .. } => {
                    show(&ui.splash, phase == GamePhase::Splash);
                    show(&ui.setup, phase == GamePhase::Setup);
                    if phase != GamePhase::Deciding {
                        show(&ui.drinks, false);
                    }
                }
                GameEvent::Rolled(outcome) => {
                    game.borrow().audio.play_thud();
                    log::info!("Rolled {} & {}", outcome.face_a, outcome.face_b);
                }
                GameEvent::ChooseRecipient { choices, .. } => {
                    render_recipients(game, &ui, &choices);
                    show(&ui.drinks, true);
                }
                GameEvent::Sloppy { player, drinks } => {
                    log::info!("Sloppy throw: {player} drinks {drinks}");
                }
            }
        }

        ui.three_man.set_text_content(Some(&hud.three_man_line()));
        ui.turn.set_text_content(Some(&hud.turn_line()));
    }

    fn render_recipients(game: &Rc<RefCell<Game>>, ui: &Ui, choices: &[String]) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        ui.recipients.set_inner_html("");

        for (i, name) in choices.iter().enumerate() {
            let Ok(btn) = child(&document, &ui.recipients, "button", "") else {
                continue;
            };
            btn.set_text_content(Some(name));

            let game = game.clone();
            let drinks = ui.drinks.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                if game.borrow_mut().director.choose_recipient(i) {
                    show(&drinks, false);
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Rebuild the roster list with a remove button per seat
    fn render_roster(game: &Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let (names, list): (Vec<String>, Element) = {
            let g = game.borrow();
            let names = g.director.session().players.iter().map(|p| p.name.clone()).collect();
            (names, g.ui.player_list.clone())
        };
        list.set_inner_html("");

        for (k, name) in names.iter().enumerate() {
            let Ok(entry) = child(&document, &list, "div", "") else {
                continue;
            };
            let _ = entry.class_list().add_1("player-entry");
            if let Ok(span) = child(&document, &entry, "span", "") {
                span.set_text_content(Some(name));
            }
            let Ok(btn) = child(&document, &entry, "button", "") else {
                continue;
            };
            btn.set_text_content(Some("X"));

            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let removed = game.borrow_mut().director.remove_player(k);
                if let Err(e) = removed {
                    log::warn!("Remove rejected: {e}");
                }
                render_roster(&game);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Add whatever is typed in the name box
    fn add_from_input(game: &Rc<RefCell<Game>>) {
        let result = {
            let mut g = game.borrow_mut();
            let name = g.ui.player_input.value();
            let result = g.director.add_player(&name);
            match &result {
                Ok(_) => g.ui.player_input.set_value(""),
                Err(e) => {
                    g.ui.status.set_text_content(Some(&e.to_string().to_uppercase()));
                }
            }
            result
        };
        if result.is_ok() {
            render_roster(game);
        }
    }

    fn on_click(id: &str, handler: impl FnMut(MouseEvent) + 'static) {
        let Some(btn) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(id))
        else {
            log::warn!("Missing element #{id}");
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(handler);
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_screens(game: Rc<RefCell<Game>>) {
        // Splash: unlock audio inside the gesture, then ask for the sensor
        {
            let game = game.clone();
            on_click("init-btn", move |_event| {
                game.borrow().audio.resume();
                let game = game.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let granted = JsFuture::from(request_motion_permission())
                        .await
                        .ok()
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    log::info!("Motion sensor permission: {granted}");
                    if let Err(e) = game.borrow_mut().director.confirm_start(granted) {
                        log::warn!("Start rejected: {e}");
                    }
                });
            });
        }

        {
            let game = game.clone();
            on_click("add-player-btn", move |_event| add_from_input(&game));
        }

        on_click("start-game-btn", move |_event| {
            let mut g = game.borrow_mut();
            if let Err(e) = g.director.start_game() {
                g.ui.status.set_text_content(Some(&e.to_string().to_uppercase()));
            }
        });
    }

    fn target_tag(event: &web_sys::Event) -> String {
        event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .map(|el| el.tag_name())
            .unwrap_or_default()
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Motion sensor
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: DeviceMotionEvent| {
                let Some(a) = event.acceleration_including_gravity() else {
                    return;
                };
                let Some(reading) = acceleration_from_axes(a.x(), a.y(), a.z()) else {
                    return;
                };
                game.borrow_mut()
                    .director
                    .on_shake_sample(shake_magnitude(reading));
            });
            let _ = window
                .add_event_listener_with_callback("devicemotion", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse / tap anywhere but a control rolls
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                if is_roll_press(&target_tag(&event)) {
                    game.borrow_mut().director.manual_trigger();
                }
            });
            let _ = window
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let key = event.key();
                let tag = target_tag(&event);
                if submits_name(&tag, &key) {
                    let in_setup = game.borrow().director.phase() == GamePhase::Setup;
                    if in_setup {
                        add_from_input(&game);
                    }
                    return;
                }
                if !is_roll_press(&tag) {
                    return;
                }
                let Some(command) = Command::from_key(&key) else {
                    return;
                };
                let mut g = game.borrow_mut();
                match command {
                    Command::Roll => {
                        g.director.manual_trigger();
                    }
                    Command::BackToSetup => {
                        g.director.return_to_setup();
                        show(&g.ui.drinks, false);
                    }
                    Command::ToggleSound => g.toggle_sound(),
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt);
        }
        present(&game);

        request_animation_frame(game);
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Three Man starting...");

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("no document")?;
        let ui = build_ui(&document)?;

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed, ui)));
        log::info!("Game initialized with seed: {}", seed);

        setup_screens(game.clone());
        setup_input_handlers(game.clone());

        request_animation_frame(game);

        log::info!("Three Man running!");
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Three Man (native) starting...");
    log::info!("Native mode plays a headless match - run with `trunk serve` for the table");

    let names: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = headless::play(&names, 20) {
        log::error!("Match aborted: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Headless match on the built-in rig, taps standing in for shakes
#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::time::{SystemTime, UNIX_EPOCH};

    use three_man::consts::SIM_DT;
    use three_man::sim::{GameDirector, GameEvent, GamePhase, TableRig};
    use three_man::{Settings, SetupError};

    const DEFAULT_PLAYERS: [&str; 3] = ["Ann", "Ben", "Cat"];
    /// Give up on a throw that has not resolved after this many ticks
    const MAX_TICKS_PER_ROLL: u32 = 60 * 30;

    pub fn play(names: &[String], rolls: usize) -> Result<(), SetupError> {
        let settings = Settings::load();
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        log::info!("Seed: {seed}");

        let mut director = GameDirector::new(TableRig::new(), settings.director_config(), seed);
        director.confirm_start(false)?;
        if names.is_empty() {
            for name in DEFAULT_PLAYERS {
                director.add_player(name)?;
            }
        } else {
            for name in names {
                director.add_player(name)?;
            }
        }
        director.start_game()?;

        let mut played = 0;
        let mut ticks = 0;
        while played < rolls {
            match director.phase() {
                GamePhase::Ready => {
                    director.manual_trigger();
                    ticks = 0;
                }
                GamePhase::Deciding => {
                    // Hand the drinks to the next seat
                    let session = director.session();
                    let pick = (session.turn + 1) % session.players.len();
                    director.choose_recipient(pick);
                }
                _ => {}
            }
            director.tick(SIM_DT);
            ticks += 1;

            for event in director.drain_events() {
                match event {
                    GameEvent::Status { phase, text } => {
                        log::debug!("[{phase:?}] {}", text.replace('\n', " / "));
                    }
                    GameEvent::Rolled(outcome) => {
                        played += 1;
                        log::info!("{}", outcome.summary().replace('\n', " -> "));
                    }
                    GameEvent::ChooseRecipient { choices, drinks } => {
                        log::info!("Give {drinks} drinks to one of: {}", choices.join(", "));
                    }
                    GameEvent::Sloppy { player, drinks } => {
                        played += 1;
                        log::info!("SLOPPY! {player} drinks {drinks} and rerolls");
                    }
                }
            }

            if ticks > MAX_TICKS_PER_ROLL {
                log::warn!("Throw never resolved, abandoning match");
                director.return_to_setup();
                break;
            }
        }

        log::info!("{}", director.hud());
        Ok(())
    }
}
