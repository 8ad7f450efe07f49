//! Game director: the match state machine
//!
//! Sequences shake detection, the throw, settlement, rule evaluation and
//! turn/title rotation. Driven by a fixed-timestep [`GameDirector::tick`]
//! plus synchronous input handlers. Every handler is phase-gated: input
//! that arrives in a phase that does not accept it is dropped.
//!
//! Delayed transitions (RESULTS/DECIDING/SLOPPY back to READY) are tick
//! countdowns identified by a [`DelayToken`]. At most one is pending;
//! scheduling another replaces it.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::face::up_face;
use super::rig::{DiceRig, DieId, random_throw};
use super::rules::{RollOutcome, doubles_drinks, evaluate};
use super::settle::{Settlement, SettlementMonitor};
use super::state::{GamePhase, GameSession, Hud, Player};
use crate::consts::*;
use crate::error::SetupError;
use crate::secs_to_ticks;

/// Director tuning (all durations in simulation ticks)
#[derive(Debug, Clone)]
pub struct DirectorConfig {
    pub settle: SettlementMonitor,
    pub shake_engage: f32,
    pub shake_release: f32,
    /// Hold time standing in for a sensor release on manual rolls
    pub manual_dwell_ticks: u32,
    /// Longest a sensor shake can last before the dice are thrown anyway
    pub max_shake_ticks: u32,
    pub results_delay_ticks: u32,
    pub decided_delay_ticks: u32,
    pub sloppy_delay_ticks: u32,
    pub sloppy_drinks: u8,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            settle: SettlementMonitor::default(),
            shake_engage: SHAKE_ENGAGE,
            shake_release: SHAKE_RELEASE,
            manual_dwell_ticks: secs_to_ticks(0.5),
            max_shake_ticks: secs_to_ticks(2.5),
            results_delay_ticks: secs_to_ticks(4.0),
            decided_delay_ticks: secs_to_ticks(2.0),
            sloppy_delay_ticks: secs_to_ticks(3.0),
            sloppy_drinks: SLOPPY_DRINKS,
        }
    }
}

/// Output for the presentation and audio adapters
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Status text for the current phase (sent after every transition)
    Status { phase: GamePhase, text: String },
    /// Both dice settled and were read
    Rolled(RollOutcome),
    /// Doubles: render the roster as recipients, answer via `choose_recipient`
    ChooseRecipient { choices: Vec<String>, drinks: u8 },
    /// A die left the table
    Sloppy { player: String, drinks: u8 },
}

/// Texts the page should show after applying a batch of events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusView {
    /// Main status line (`None` = leave as is)
    pub status: Option<String>,
    /// Doubles overlay title (`None` = leave as is)
    pub overlay: Option<String>,
}

impl StatusView {
    /// Route a batch of events. When the batch offers recipients, the
    /// DECIDING prompt goes to the overlay so the roll summary stays on the
    /// status line.
    pub fn from_events(events: &[GameEvent]) -> Self {
        let offering = events
            .iter()
            .any(|e| matches!(e, GameEvent::ChooseRecipient { .. }));
        let mut view = Self::default();
        for event in events {
            match event {
                GameEvent::Status {
                    phase: GamePhase::Deciding,
                    text,
                } if offering => view.overlay = Some(text.clone()),
                GameEvent::Status { text, .. } => view.status = Some(text.clone()),
                _ => {}
            }
        }
        view
    }
}

/// Handle for a scheduled delayed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelayToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuation {
    /// Back to READY with the next player
    NextTurn,
    /// Back to READY, same player throws again
    Reroll,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    token: DelayToken,
    ticks_left: u32,
    then: Continuation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShakeSource {
    Sensor,
    Manual,
}

#[derive(Debug, Clone, Copy)]
struct Shake {
    source: ShakeSource,
    ticks: u32,
}

/// Orchestrates a match on top of a dice rig
pub struct GameDirector<R: DiceRig> {
    session: GameSession,
    rig: R,
    config: DirectorConfig,
    rng: Pcg32,
    sensor_enabled: bool,
    shake: Option<Shake>,
    pending: Option<Pending>,
    next_token: u64,
    /// Drinks on offer while DECIDING, cleared once a recipient is picked
    offered_drinks: Option<u8>,
    last_outcome: Option<RollOutcome>,
    events: Vec<GameEvent>,
}

impl<R: DiceRig> GameDirector<R> {
    pub fn new(rig: R, config: DirectorConfig, seed: u64) -> Self {
        Self {
            session: GameSession::new(config.settle.clone()),
            rig,
            config,
            rng: Pcg32::seed_from_u64(seed),
            sensor_enabled: false,
            shake: None,
            pending: None,
            next_token: 1,
            offered_drinks: None,
            last_outcome: None,
            events: Vec::new(),
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn phase(&self) -> GamePhase {
        self.session.phase
    }

    pub fn hud(&self) -> Hud {
        self.session.hud()
    }

    pub fn rig(&self) -> &R {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut R {
        &mut self.rig
    }

    pub fn sensor_enabled(&self) -> bool {
        self.sensor_enabled
    }

    /// Outcome of the most recent settled roll
    pub fn last_outcome(&self) -> Option<&RollOutcome> {
        self.last_outcome.as_ref()
    }

    /// Token of the delayed transition currently pending, if any
    pub fn pending_delay(&self) -> Option<DelayToken> {
        self.pending.map(|p| p.token)
    }

    /// Take all events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Setup ===

    /// Leave the splash screen. Without motion permission only manual
    /// triggers are accepted.
    pub fn confirm_start(&mut self, motion_sensor: bool) -> Result<(), SetupError> {
        self.require_phase(GamePhase::Splash)?;
        self.sensor_enabled = motion_sensor;
        if !motion_sensor {
            log::warn!("Motion sensor unavailable - tap to roll");
        }
        self.set_phase(GamePhase::Setup, "ADD PLAYERS".to_string());
        Ok(())
    }

    /// Add a player to the end of the roster; returns their seat
    pub fn add_player(&mut self, name: &str) -> Result<usize, SetupError> {
        self.require_phase(GamePhase::Setup)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SetupError::EmptyName);
        }
        self.session.players.push(Player::new(name));
        log::info!("Added player {name}");
        Ok(self.session.players.len() - 1)
    }

    pub fn remove_player(&mut self, index: usize) -> Result<Player, SetupError> {
        self.require_phase(GamePhase::Setup)?;
        if index >= self.session.players.len() {
            return Err(SetupError::NoSuchPlayer { index });
        }
        let player = self.session.players.remove(index);
        log::info!("Removed player {}", player.name);
        Ok(player)
    }

    /// Start the match. The first turn goes to the first seat.
    pub fn start_game(&mut self) -> Result<(), SetupError> {
        self.require_phase(GamePhase::Setup)?;
        let count = self.session.players.len();
        if count < 2 {
            return Err(SetupError::NotEnoughPlayers { count });
        }
        self.session.reset_progress();
        // Land on seat 0 after the first advance
        self.session.turn = count - 1;
        log::info!("Game started with {count} players");
        self.next_turn();
        Ok(())
    }

    /// Abandon the match and go back to editing the roster
    pub fn return_to_setup(&mut self) {
        if !self.session.phase.in_play() {
            return;
        }
        self.cancel_pending();
        self.shake = None;
        self.offered_drinks = None;
        self.rig.park();
        self.session.reset_progress();
        self.set_phase(GamePhase::Setup, "ADD PLAYERS".to_string());
    }

    // === Input ===

    /// Feed one shake-magnitude sample from the motion sensor
    pub fn on_shake_sample(&mut self, magnitude: f32) -> bool {
        if !self.sensor_enabled {
            return false;
        }
        match (self.session.phase, self.shake) {
            (GamePhase::Ready, _) if magnitude > self.config.shake_engage => {
                self.begin_shake(ShakeSource::Sensor);
                true
            }
            (GamePhase::Shaking, Some(s))
                if s.source == ShakeSource::Sensor && magnitude < self.config.shake_release =>
            {
                self.throw();
                true
            }
            _ => false,
        }
    }

    /// Pointer press / tap standing in for a shake
    pub fn manual_trigger(&mut self) -> bool {
        if self.session.phase != GamePhase::Ready {
            return false;
        }
        self.begin_shake(ShakeSource::Manual);
        true
    }

    /// Roller picked who drinks for their doubles
    pub fn choose_recipient(&mut self, index: usize) -> bool {
        if self.session.phase != GamePhase::Deciding {
            return false;
        }
        let Some(drinks) = self.offered_drinks else {
            return false;
        };
        let Some(player) = self.session.players.get(index) else {
            return false;
        };
        let text = format!("GAVE {drinks} TO {}", player.name.to_uppercase());
        self.offered_drinks = None;
        self.status(text);
        self.schedule(Continuation::NextTurn, self.config.decided_delay_ticks);
        true
    }

    // === Tick ===

    /// Advance one fixed timestep
    pub fn tick(&mut self, dt: f32) {
        if !self.session.phase.in_play() {
            return;
        }
        self.rig.step(dt);
        self.run_pending();

        match self.session.phase {
            GamePhase::Shaking => {
                let Some(shake) = self.shake.as_mut() else {
                    return;
                };
                shake.ticks += 1;
                let limit = match shake.source {
                    ShakeSource::Manual => self.config.manual_dwell_ticks,
                    ShakeSource::Sensor => self.config.max_shake_ticks,
                };
                if shake.ticks >= limit {
                    self.throw();
                }
            }
            GamePhase::Rolling => {
                let a = self.rig.observe(DieId::A);
                let b = self.rig.observe(DieId::B);
                match self.session.settle.observe(&a, &b) {
                    Some(Settlement::OffTable) => self.sloppy(),
                    Some(Settlement::Settled) => {
                        self.resolve_roll(up_face(a.orientation), up_face(b.orientation));
                    }
                    None => {}
                }
            }
            _ => {}
        }
    }

    // === Transitions ===

    fn require_phase(&self, phase: GamePhase) -> Result<(), SetupError> {
        if self.session.phase == phase {
            Ok(())
        } else {
            Err(SetupError::WrongPhase {
                phase: self.session.phase,
            })
        }
    }

    fn status(&mut self, text: String) {
        self.events.push(GameEvent::Status {
            phase: self.session.phase,
            text,
        });
    }

    fn set_phase(&mut self, phase: GamePhase, text: String) {
        log::debug!("{:?} -> {:?}", self.session.phase, phase);
        self.session.phase = phase;
        self.status(text);
    }

    fn current_name(&self) -> String {
        self.session
            .current_player()
            .map(|p| p.name.to_uppercase())
            .unwrap_or_default()
    }

    fn next_turn(&mut self) {
        self.session.advance_turn();
        log::info!("Turn: {}", self.current_name());
        self.enter_ready();
    }

    fn enter_ready(&mut self) {
        self.shake = None;
        self.offered_drinks = None;
        self.rig.park();
        let prompt = if self.sensor_enabled {
            "SHAKE TO ROLL"
        } else {
            "TAP TO ROLL"
        };
        let text = format!("{}\n{prompt}", self.current_name());
        self.set_phase(GamePhase::Ready, text);
    }

    fn begin_shake(&mut self, source: ShakeSource) {
        self.shake = Some(Shake { source, ticks: 0 });
        self.set_phase(GamePhase::Shaking, "SHAKING...".to_string());
    }

    fn throw(&mut self) {
        self.shake = None;
        self.last_outcome = None;
        self.session.settle.reset();
        self.rig.prepare_throw();
        for id in DieId::BOTH {
            let (impulse, offset) = random_throw(&mut self.rng);
            self.rig.apply_throw_impulse(id, impulse, offset);
        }
        self.set_phase(GamePhase::Rolling, "ROLLING...".to_string());
    }

    fn resolve_roll(&mut self, face_a: u8, face_b: u8) {
        let outcome = evaluate(
            face_a,
            face_b,
            &self.session.players,
            self.session.turn,
            self.session.title_holder,
        );
        log::info!("Rolled {face_a} & {face_b}: {:?}", outcome.messages());
        self.session.title_holder = outcome.title_holder;
        self.set_phase(GamePhase::Results, outcome.summary());
        self.events.push(GameEvent::Rolled(outcome.clone()));

        if outcome.is_doubles() {
            let drinks = doubles_drinks(face_a);
            self.offered_drinks = Some(drinks);
            self.set_phase(GamePhase::Deciding, format!("GIVE {drinks} DRINKS"));
            self.events.push(GameEvent::ChooseRecipient {
                choices: self.session.players.iter().map(|p| p.name.clone()).collect(),
                drinks,
            });
        } else {
            self.schedule(Continuation::NextTurn, self.config.results_delay_ticks);
        }
        self.last_outcome = Some(outcome);
    }

    fn sloppy(&mut self) {
        let player = self.current_name();
        let drinks = self.config.sloppy_drinks;
        log::info!("Sloppy roll by {player}");
        self.set_phase(
            GamePhase::Sloppy,
            format!("SLOPPY! {player} DRINKS {drinks} & REROLLS"),
        );
        self.events.push(GameEvent::Sloppy { player, drinks });
        self.schedule(Continuation::Reroll, self.config.sloppy_delay_ticks);
    }

    // === Delayed transitions ===

    fn schedule(&mut self, then: Continuation, ticks: u32) -> DelayToken {
        self.cancel_pending();
        let token = DelayToken(self.next_token);
        self.next_token += 1;
        self.pending = Some(Pending {
            token,
            ticks_left: ticks.max(1),
            then,
        });
        token
    }

    /// Drop the pending delayed transition, if any
    pub fn cancel_pending(&mut self) -> Option<DelayToken> {
        let cancelled = self.pending.take().map(|p| p.token);
        if let Some(token) = cancelled {
            log::debug!("Cancelled delayed transition {token:?}");
        }
        cancelled
    }

    fn run_pending(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        pending.ticks_left -= 1;
        if pending.ticks_left > 0 {
            return;
        }
        let then = pending.then;
        self.pending = None;

        match (then, self.session.phase) {
            (Continuation::NextTurn, GamePhase::Results | GamePhase::Deciding) => self.next_turn(),
            (Continuation::Reroll, GamePhase::Sloppy) => self.enter_ready(),
            (then, phase) => log::debug!("Dropped stale {then:?} in {phase:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::face::FACE_NORMALS;
    use crate::sim::rig::TableRig;
    use crate::sim::settle::DieObservation;
    use glam::{Quat, Vec3};
    use proptest::prelude::*;
    use std::collections::VecDeque;

    type Frame = [DieObservation; 2];

    /// Rig that replays queued observation scripts, one per throw
    #[derive(Default)]
    struct ScriptedRig {
        rolls: VecDeque<Vec<Frame>>,
        frames: VecDeque<Frame>,
        current: Option<Frame>,
        throws: usize,
        impulses: usize,
        parks: usize,
    }

    impl ScriptedRig {
        fn queue(&mut self, frames: Vec<Frame>) {
            self.rolls.push_back(frames);
        }
    }

    impl DiceRig for ScriptedRig {
        fn step(&mut self, _dt: f32) {
            if let Some(frame) = self.frames.pop_front() {
                self.current = Some(frame);
            }
        }

        fn prepare_throw(&mut self) {
            self.throws += 1;
            self.frames = self.rolls.pop_front().unwrap_or_default().into();
        }

        fn apply_throw_impulse(&mut self, _die: DieId, _impulse: Vec3, _offset: Vec3) {
            self.impulses += 1;
        }

        fn observe(&self, die: DieId) -> DieObservation {
            self.current.map(|f| f[die.index()]).unwrap_or_else(|| {
                DieObservation {
                    position: die.rest_position(),
                    linear_speed: 1.0,
                    angular_speed: 1.0,
                    orientation: Quat::IDENTITY,
                }
            })
        }

        fn park(&mut self) {
            self.parks += 1;
            self.current = None;
            self.frames.clear();
        }
    }

    fn showing(face: u8) -> Quat {
        let (normal, _) = FACE_NORMALS
            .iter()
            .copied()
            .find(|(_, v)| *v == face)
            .unwrap();
        Quat::from_rotation_arc(normal, Vec3::Y)
    }

    fn on_table(face: u8, speed: f32) -> DieObservation {
        DieObservation {
            position: Vec3::new(0.0, DIE_HALF_EXTENT, -2.0),
            linear_speed: speed,
            angular_speed: speed,
            orientation: showing(face),
        }
    }

    /// A few bouncing ticks, then both dice at rest showing the faces
    fn roll(a: u8, b: u8) -> Vec<Frame> {
        let mut frames = vec![[on_table(6, 3.0), on_table(6, 3.0)]; 4];
        frames.push([on_table(a, 0.0), on_table(b, 0.0)]);
        frames
    }

    fn fast_config() -> DirectorConfig {
        let mut settle = SettlementMonitor::default();
        settle.dwell_ticks = 3;
        DirectorConfig {
            settle,
            manual_dwell_ticks: 2,
            max_shake_ticks: 10,
            results_delay_ticks: 5,
            decided_delay_ticks: 4,
            sloppy_delay_ticks: 6,
            ..Default::default()
        }
    }

    fn director(names: &[&str]) -> GameDirector<ScriptedRig> {
        let mut d = GameDirector::new(ScriptedRig::default(), fast_config(), 42);
        d.confirm_start(false).unwrap();
        for name in names {
            d.add_player(name).unwrap();
        }
        d.start_game().unwrap();
        d
    }

    fn run_until<R: DiceRig>(
        d: &mut GameDirector<R>,
        phase: GamePhase,
        max_ticks: usize,
    ) -> bool {
        for _ in 0..max_ticks {
            if d.phase() == phase {
                return true;
            }
            d.tick(SIM_DT);
        }
        d.phase() == phase
    }

    fn play(d: &mut GameDirector<ScriptedRig>, a: u8, b: u8) {
        d.rig_mut().queue(roll(a, b));
        assert!(d.manual_trigger());
        assert!(run_until(d, GamePhase::Rolling, 10));
        for _ in 0..50 {
            d.tick(SIM_DT);
            if d.phase() != GamePhase::Rolling {
                break;
            }
        }
    }

    fn statuses(d: &mut GameDirector<ScriptedRig>) -> Vec<(GamePhase, String)> {
        d.drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::Status { phase, text } => Some((phase, text)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_setup_flow() {
        let mut d = GameDirector::new(ScriptedRig::default(), fast_config(), 1);
        assert_eq!(d.phase(), GamePhase::Splash);
        assert_eq!(
            d.add_player("x"),
            Err(SetupError::WrongPhase {
                phase: GamePhase::Splash
            })
        );
        d.confirm_start(true).unwrap();
        assert_eq!(d.phase(), GamePhase::Setup);
        assert_eq!(d.add_player("   "), Err(SetupError::EmptyName));
        assert_eq!(d.add_player("  Ann "), Ok(0));
        assert_eq!(d.session().players[0].name, "Ann");

        assert_eq!(
            d.start_game(),
            Err(SetupError::NotEnoughPlayers { count: 1 })
        );
        assert_eq!(d.phase(), GamePhase::Setup);

        d.add_player("Bob").unwrap();
        d.add_player("Cy").unwrap();
        assert_eq!(d.remove_player(1).unwrap().name, "Bob");
        assert_eq!(
            d.remove_player(5),
            Err(SetupError::NoSuchPlayer { index: 5 })
        );

        d.start_game().unwrap();
        assert_eq!(d.phase(), GamePhase::Ready);
        assert_eq!(d.session().turn, 0);
        let last = statuses(&mut d).pop().unwrap();
        assert_eq!(last, (GamePhase::Ready, "ANN\nSHAKE TO ROLL".to_string()));
        assert!(d.remove_player(0).is_err());
    }

    #[test]
    fn test_physics_idle_before_game() {
        let mut d = GameDirector::new(ScriptedRig::default(), fast_config(), 1);
        d.rig_mut().frames.push_back([on_table(1, 0.0), on_table(1, 0.0)]);
        d.tick(SIM_DT);
        assert!(d.rig().current.is_none());
    }

    #[test]
    fn test_trigger_outside_ready_is_ignored() {
        let mut d = director(&["A", "B"]);
        assert!(d.manual_trigger());
        assert_eq!(d.phase(), GamePhase::Shaking);
        assert!(!d.manual_trigger());
        assert!(!d.choose_recipient(0));
        assert_eq!(d.phase(), GamePhase::Shaking);
    }

    #[test]
    fn test_non_doubles_round_advances_turn() {
        let mut d = director(&["A", "B", "C"]);
        d.drain_events();
        play(&mut d, 5, 6);
        assert_eq!(d.phase(), GamePhase::Results);
        assert_eq!(d.rig().throws, 1);
        assert_eq!(d.rig().impulses, 2);
        let out = d.last_outcome().unwrap();
        assert_eq!((out.face_a, out.face_b, out.total), (5, 6, 11));

        let events = d.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::Status { phase: GamePhase::Results, text } if text == "ROLLED 5 & 6\nB (RIGHT) DRINKS"
        )));
        assert!(events.iter().any(|e| matches!(e, GameEvent::Rolled(_))));

        assert!(run_until(&mut d, GamePhase::Ready, 10));
        assert_eq!(d.session().turn, 1);
    }

    #[test]
    fn test_results_wait_for_the_delay() {
        let mut d = director(&["A", "B"]);
        play(&mut d, 2, 6);
        assert_eq!(d.phase(), GamePhase::Results);
        assert!(d.pending_delay().is_some());
        for _ in 0..4 {
            d.tick(SIM_DT);
        }
        assert_eq!(d.phase(), GamePhase::Results);
        d.tick(SIM_DT);
        assert_eq!(d.phase(), GamePhase::Ready);
        assert!(d.pending_delay().is_none());
    }

    #[test]
    fn test_one_two_takes_title() {
        let mut d = director(&["A", "B", "C"]);
        play(&mut d, 1, 2);
        assert_eq!(d.session().title_holder, Some(0));
        assert_eq!(d.hud().three_man_line(), "3MAN: A");
    }

    #[test]
    fn test_doubles_enter_deciding() {
        let mut d = director(&["A", "B", "C"]);
        d.drain_events();
        play(&mut d, 2, 2);
        assert_eq!(d.phase(), GamePhase::Deciding);
        assert!(d.pending_delay().is_none());
        let events = d.drain_events();
        assert!(events.contains(&GameEvent::ChooseRecipient {
            choices: vec!["A".into(), "B".into(), "C".into()],
            drinks: 4,
        }));
        let rolled = events
            .iter()
            .find_map(|e| match e {
                GameEvent::Rolled(o) => Some(o.clone()),
                _ => None,
            })
            .unwrap();
        assert!(rolled.is_doubles());
        assert_eq!(rolled.messages(), vec!["SOCIAL!"]);

        // Waits as long as it takes
        for _ in 0..100 {
            d.tick(SIM_DT);
        }
        assert_eq!(d.phase(), GamePhase::Deciding);

        assert!(!d.choose_recipient(9));
        assert!(d.choose_recipient(2));
        assert!(!d.choose_recipient(1));
        assert_eq!(
            statuses(&mut d),
            vec![(GamePhase::Deciding, "GAVE 4 TO C".to_string())]
        );
        assert!(run_until(&mut d, GamePhase::Ready, 10));
        assert_eq!(d.session().turn, 1);
    }

    #[test]
    fn test_doubles_keep_roll_summary_on_status_line() {
        let mut d = director(&["A", "B", "C"]);
        d.session.title_holder = Some(2);
        d.drain_events();
        play(&mut d, 3, 3);
        assert_eq!(d.phase(), GamePhase::Deciding);

        let view = StatusView::from_events(&d.drain_events());
        assert_eq!(
            view.status.as_deref(),
            Some("ROLLED 3 & 3\nC DRINKS 2 | DOUBLE 3s!")
        );
        assert_eq!(view.overlay.as_deref(), Some("GIVE 6 DRINKS"));

        // After the pick the status line moves on and the overlay is untouched
        assert!(d.choose_recipient(1));
        let view = StatusView::from_events(&d.drain_events());
        assert_eq!(view.status.as_deref(), Some("GAVE 6 TO B"));
        assert_eq!(view.overlay, None);
    }

    #[test]
    fn test_status_view_of_plain_roll() {
        let mut d = director(&["A", "B"]);
        d.drain_events();
        play(&mut d, 2, 6);
        let view = StatusView::from_events(&d.drain_events());
        assert_eq!(view.status.as_deref(), Some("ROLLED 2 & 6"));
        assert_eq!(view.overlay, None);
        assert_eq!(StatusView::from_events(&[]), StatusView::default());
    }

    #[test]
    fn test_sloppy_keeps_turn() {
        let mut d = director(&["A", "B"]);
        let mut gone = on_table(3, 4.0);
        gone.position = Vec3::new(7.0, 1.0, 0.0);
        d.rig_mut().queue(vec![
            [on_table(1, 3.0), on_table(1, 3.0)],
            [on_table(1, 3.0), gone],
        ]);
        d.drain_events();
        assert!(d.manual_trigger());
        assert!(run_until(&mut d, GamePhase::Sloppy, 20));
        assert!(d.last_outcome().is_none());
        let events = d.drain_events();
        assert!(events.contains(&GameEvent::Sloppy {
            player: "A".into(),
            drinks: 2
        }));
        assert!(events.contains(&GameEvent::Status {
            phase: GamePhase::Sloppy,
            text: "SLOPPY! A DRINKS 2 & REROLLS".into()
        }));

        assert!(run_until(&mut d, GamePhase::Ready, 10));
        assert_eq!(d.session().turn, 0);
        assert!(d.rig().parks >= 2);
    }

    #[test]
    fn test_off_table_preempts_settled() {
        let mut d = director(&["A", "B"]);
        let still = on_table(4, 0.0);
        let mut fallen = on_table(4, 0.0);
        fallen.position.y = FLOOR_THRESHOLD - 0.5;
        // Three still ticks, then a tick that would settle but is below the floor
        d.rig_mut().queue(vec![
            [still, still],
            [still, still],
            [still, still],
            [still, fallen],
        ]);
        assert!(d.manual_trigger());
        assert!(run_until(&mut d, GamePhase::Rolling, 10));
        for _ in 0..4 {
            d.tick(SIM_DT);
        }
        assert_eq!(d.phase(), GamePhase::Sloppy);
    }

    #[test]
    fn test_sensor_shake_and_release() {
        let mut d = GameDirector::new(ScriptedRig::default(), fast_config(), 3);
        d.confirm_start(true).unwrap();
        d.add_player("A").unwrap();
        d.add_player("B").unwrap();
        d.start_game().unwrap();
        d.rig_mut().queue(roll(6, 5));

        assert!(!d.on_shake_sample(10.0));
        assert!(!d.on_shake_sample(22.0));
        assert!(d.on_shake_sample(30.0));
        assert_eq!(d.phase(), GamePhase::Shaking);
        // Still shaking hard, and the in-between band keeps shaking
        assert!(!d.on_shake_sample(40.0));
        assert!(!d.on_shake_sample(18.0));
        assert_eq!(d.phase(), GamePhase::Shaking);
        assert!(d.on_shake_sample(5.0));
        assert_eq!(d.phase(), GamePhase::Rolling);
        assert!(!d.on_shake_sample(50.0));
    }

    #[test]
    fn test_sensor_shake_times_out() {
        let mut d = GameDirector::new(ScriptedRig::default(), fast_config(), 3);
        d.confirm_start(true).unwrap();
        d.add_player("A").unwrap();
        d.add_player("B").unwrap();
        d.start_game().unwrap();
        assert!(d.on_shake_sample(30.0));
        for _ in 0..9 {
            d.tick(SIM_DT);
            d.on_shake_sample(30.0);
        }
        assert_eq!(d.phase(), GamePhase::Shaking);
        d.tick(SIM_DT);
        assert_eq!(d.phase(), GamePhase::Rolling);
    }

    #[test]
    fn test_sensor_disabled_ignores_samples() {
        let mut d = director(&["A", "B"]);
        assert!(!d.on_shake_sample(100.0));
        assert_eq!(d.phase(), GamePhase::Ready);
    }

    #[test]
    fn test_manual_shake_dwell() {
        let mut d = director(&["A", "B"]);
        assert!(d.manual_trigger());
        d.tick(SIM_DT);
        assert_eq!(d.phase(), GamePhase::Shaking);
        d.tick(SIM_DT);
        assert_eq!(d.phase(), GamePhase::Rolling);
        assert_eq!(d.session().settle.counter(), 0);
    }

    #[test]
    fn test_return_to_setup_cancels_pending() {
        let mut d = director(&["A", "B"]);
        play(&mut d, 5, 6);
        let token = d.pending_delay().unwrap();
        d.return_to_setup();
        assert_eq!(d.phase(), GamePhase::Setup);
        assert!(d.pending_delay().is_none());
        for _ in 0..20 {
            d.tick(SIM_DT);
        }
        assert_eq!(d.phase(), GamePhase::Setup);
        assert_eq!(d.session().players.len(), 2);

        d.start_game().unwrap();
        play(&mut d, 5, 6);
        assert_ne!(d.pending_delay().unwrap(), token);
    }

    #[test]
    fn test_scheduling_replaces_pending() {
        let mut d = director(&["A", "B"]);
        let first = d.schedule(Continuation::NextTurn, 100);
        let second = d.schedule(Continuation::Reroll, 100);
        assert_ne!(first, second);
        assert_eq!(d.pending_delay(), Some(second));
        assert_eq!(d.cancel_pending(), Some(second));
        assert_eq!(d.cancel_pending(), None);
    }

    #[test]
    fn test_stale_continuation_is_dropped() {
        let mut d = director(&["A", "B"]);
        d.schedule(Continuation::NextTurn, 1);
        // READY does not accept a turn advance
        d.tick(SIM_DT);
        assert_eq!(d.phase(), GamePhase::Ready);
        assert_eq!(d.session().turn, 0);
    }

    #[test]
    fn test_full_match_on_table_rig() {
        let mut d = GameDirector::new(TableRig::new(), DirectorConfig::default(), 2024);
        d.confirm_start(false).unwrap();
        for name in ["A", "B", "C", "D"] {
            d.add_player(name).unwrap();
        }
        d.start_game().unwrap();

        let mut rolls = 0;
        let mut sloppies = 0;
        for _ in 0..30 {
            assert_eq!(d.phase(), GamePhase::Ready);
            let turn = d.session().turn;
            assert!(d.manual_trigger());
            assert!(run_until(&mut d, GamePhase::Rolling, 100));
            let mut ticks = 0;
            while d.phase() == GamePhase::Rolling {
                d.tick(SIM_DT);
                ticks += 1;
                assert!(ticks < 60 * 30, "dice never settled");
            }
            match d.phase() {
                GamePhase::Deciding => {
                    rolls += 1;
                    assert!(d.choose_recipient(0));
                    assert!(run_until(&mut d, GamePhase::Ready, 1000));
                    assert_eq!(d.session().turn, (turn + 1) % 4);
                }
                GamePhase::Results => {
                    rolls += 1;
                    assert!(run_until(&mut d, GamePhase::Ready, 1000));
                    assert_eq!(d.session().turn, (turn + 1) % 4);
                }
                GamePhase::Sloppy => {
                    sloppies += 1;
                    assert!(run_until(&mut d, GamePhase::Ready, 1000));
                    assert_eq!(d.session().turn, turn);
                }
                other => panic!("unexpected phase {other:?}"),
            }
            let out = d.last_outcome();
            if let Some(out) = out {
                assert!((1..=6).contains(&out.face_a) && (1..=6).contains(&out.face_b));
            }
        }
        assert_eq!(rolls + sloppies, 30);
        assert!(rolls > 0);
    }

    const PLAIN_ROLLS: [(u8, u8); 6] = [(5, 6), (2, 6), (4, 5), (3, 6), (1, 4), (6, 1)];

    proptest! {
        #[test]
        fn prop_turn_rotation(
            n in 2usize..7,
            picks in proptest::collection::vec(0usize..PLAIN_ROLLS.len(), 1..12),
        ) {
            let names: Vec<String> = (0..n).map(|i| format!("P{i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let mut d = director(&refs);
            let start = d.session().turn;
            for &pick in &picks {
                let (a, b) = PLAIN_ROLLS[pick];
                play(&mut d, a, b);
                prop_assert_eq!(d.phase(), GamePhase::Results);
                prop_assert!(run_until(&mut d, GamePhase::Ready, 10));
            }
            prop_assert_eq!(d.session().turn, (start + picks.len()) % n);
            prop_assert_eq!(d.session().title_holder, None);
        }
    }
}
