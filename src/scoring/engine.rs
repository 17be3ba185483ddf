use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::mem;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::best_ball::{is_mark, BestBallRound, Candidate};
use super::bowler::{Bowler, BowlerId};
use super::frame::{Frame, Throw, LAST_FRAME};
use super::league::{total_display, MoveMode, TotalFormat, TurnPolicy};
use super::modifiers::{FrameContext, ModifierConfig, ModifierEvent, RuleModifier, ThrowContext, ThrowDraft};
use super::persistence::{CompletedGame, FinalScore, GameSnapshot, GameStore};
use super::session::{Session, SessionExtension, SessionMode, SessionPhase, SessionTick};
use super::symbols::Symbol;
use super::LOG_TARGET;
use crate::config::LaneConfig;
use crate::error::ScoringError;
use crate::lane_link::{BowlerTransfer, FramePayload, GamePayload, LaneLink, MoveConfirm, OfflineLink, TeamTransfer};
use crate::machine::PinState;

/// How long a time reminder stays in the scroll message.
const TIME_WARNING_SHOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameType {
    #[default]
    FivePin,
    League {
        #[serde(default)]
        total_format: TotalFormat,
    },
    BestBall,
}

impl GameType {
    pub fn label(&self) -> &'static str {
        match self {
            GameType::FivePin => "5-pin",
            GameType::League { .. } => "league",
            GameType::BestBall => "best-ball",
        }
    }
}

/// Everything that stays fixed for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct GameSetup {
    pub lane_id: u32,
    pub venue_name: String,
    pub game_type: GameType,
    pub session: SessionMode,
    pub turn_policy: TurnPolicy,
    pub modifiers: Vec<ModifierConfig>,
    pub between_games: Duration,
    pub game_over_pause: Duration,
}

impl GameSetup {
    pub fn new(lane_id: u32, session: SessionMode) -> Self {
        Self {
            lane_id,
            venue_name: "Centrebowl".to_string(),
            game_type: GameType::FivePin,
            session,
            turn_policy: TurnPolicy::default(),
            modifiers: Vec::new(),
            between_games: Duration::from_secs(300),
            game_over_pause: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &LaneConfig, session: SessionMode) -> Self {
        Self {
            venue_name: config.venue_name.clone(),
            game_type: config.game.game_type,
            turn_policy: config.game.turn_policy,
            modifiers: config.game.modifiers.clone(),
            between_games: Duration::from_secs(config.session.between_games_secs),
            game_over_pause: Duration::from_secs(config.session.game_over_pause_secs),
            ..Self::new(config.lane_id, session)
        }
    }

    pub fn with_game_type(mut self, game_type: GameType) -> Self {
        self.game_type = game_type;
        self
    }

    pub fn with_turn_policy(mut self, policy: TurnPolicy) -> Self {
        self.turn_policy = policy;
        self
    }

    pub fn with_modifier(mut self, modifier: ModifierConfig) -> Self {
        self.modifiers.push(modifier);
        self
    }
}

/// What the physical rack must look like after the last scoring change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RackAction {
    #[default]
    Keep,
    /// Fresh rack, every pin standing
    Reset,
    /// Set up exactly these pins down
    Restore(PinState),
}

/// Why a ball was ignored. Expected during normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoBowlers,
    SessionComplete,
    SessionExpired,
    BetweenGames,
    Held,
    AwaitingSelection,
    BowlerFinished,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rejection::NoBowlers => "no bowlers on the lane",
            Rejection::SessionComplete => "session complete",
            Rejection::SessionExpired => "session time expired",
            Rejection::BetweenGames => "between games",
            Rejection::Held => "game on hold",
            Rejection::AwaitingSelection => "waiting for best ball selection",
            Rejection::BowlerFinished => "bowler already finished",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrowRecord {
    pub bowler: String,
    /// 0-based
    pub frame: usize,
    /// 0-based
    pub ball: usize,
    pub throw: Throw,
    pub frame_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BallOutcome {
    Rejected(Rejection),
    Recorded(ThrowRecord),
    /// Best ball: the partner throws next at the same rack
    AwaitingPartner { member: String },
    AwaitingSelection,
}

/// Things the lane should announce or forward, drained by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameNotice {
    FrameCompleted { bowler: String, frame: usize, total: Option<u32> },
    BowlerFinished { bowler: String, total: u32 },
    GameCompleted { game_number: u32, scores: Vec<FinalScore> },
    NextGameStarted { game_number: u32 },
    SessionEnded(SessionPhase),
    SessionReopened,
    TimeWarning { minutes: u64 },
    BowlerLeft { bowler: String, lane: u32 },
    BowlerReturned { bowler: String },
    BowlerArrived { bowler: String },
    TeamLeft { lane: u32 },
    Modifier(ModifierEvent),
}

/// Touch targets on the scoring screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    NextGame,
    FreeStrike { bowler_index: usize },
    /// 1-based best-ball candidate
    SelectCandidate(usize),
    ToggleHold,
}

#[derive(Debug)]
struct MoveConfirmation {
    move_id: String,
    accepted: bool,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameStep {
    /// Next ball at the standing pins
    Continue,
    /// 10th frame mark: next ball at a fresh rack
    Respot,
    Complete,
}

fn frame_step(frame_index: usize, ball: usize, throw: &Throw, frame: &Frame) -> FrameStep {
    let cleared = throw.pins_after.is_all_down() || throw.symbol == Symbol::Strike;
    if frame_index < LAST_FRAME {
        return if cleared || ball >= 1 {
            FrameStep::Complete
        } else {
            FrameStep::Continue
        };
    }

    match ball {
        0 | 1 if cleared => FrameStep::Respot,
        0 => FrameStep::Continue,
        1 if frame.is_strike() => FrameStep::Continue,
        _ => FrameStep::Complete,
    }
}

fn new_game_id(game_number: u32) -> String {
    format!("{}-g{}", Local::now().format("%Y%m%d_%H%M%S"), game_number)
}

/// Multi-bowler 5-pin scoring with session lifecycle and rule modifiers.
///
/// Only the bowler at the front of the turn queue is mutated by a ball.
/// Every scoring change is saved through the [`GameStore`] when one is set.
pub struct ScoringEngine {
    setup: GameSetup,
    modifiers: Vec<Box<dyn RuleModifier>>,
    roster: Vec<Bowler>,
    queue: VecDeque<BowlerId>,
    session: Session,
    game_id: String,
    held: bool,
    best_ball: BestBallRound,
    rack: RackAction,
    game_over_until: Option<Instant>,
    warning: Option<(u64, Instant)>,
    store: Option<GameStore>,
    link: Box<dyn LaneLink>,
    moves_tx: Sender<MoveConfirmation>,
    moves_rx: Receiver<MoveConfirmation>,
    pending_moves: HashMap<String, Bowler>,
    next_id: BowlerId,
    move_seq: u32,
    notices: Vec<GameNotice>,
}

impl ScoringEngine {
    pub fn new(setup: GameSetup, roster: Vec<Bowler>, now: Instant) -> Self {
        let mut engine = Self::assemble(setup, roster, now);
        for bowler in &mut engine.roster {
            for modifier in &engine.modifiers {
                modifier.on_new_game(1, &mut bowler.extension);
            }
        }
        info!(
            target: LOG_TARGET,
            "New {} game {} with {} bowler(s)",
            engine.setup.game_type.label(),
            engine.game_id,
            engine.roster.len()
        );
        engine
    }

    pub fn with_names<S: Into<String>>(setup: GameSetup, names: impl IntoIterator<Item = S>, now: Instant) -> Self {
        let roster = names
            .into_iter()
            .zip(1..)
            .map(|(name, id)| Bowler::new(id, name))
            .collect();
        Self::new(setup, roster, now)
    }

    /// Continue a game from its last saved snapshot.
    pub fn recover(setup: GameSetup, snapshot: GameSnapshot, now: Instant) -> Self {
        let mut engine = Self::assemble(setup, snapshot.bowlers, now);
        engine.session = Session::resumed(engine.setup.session, snapshot.game_number, now);
        engine.game_id = snapshot.game_id;
        engine.held = snapshot.held;
        for candidate in snapshot.pending_selection {
            engine.best_ball.push(candidate);
        }
        if snapshot.current_turn_index < engine.queue.len() {
            engine.queue.rotate_left(snapshot.current_turn_index);
        }
        if engine.all_finished() {
            let between = engine.setup.between_games;
            engine.session.finish_game(now, between);
        }
        info!(
            target: LOG_TARGET,
            "Recovered game {} (game {} of session)",
            engine.game_id,
            engine.session.game_number()
        );
        engine
    }

    fn assemble(setup: GameSetup, roster: Vec<Bowler>, now: Instant) -> Self {
        let (moves_tx, moves_rx) = unbounded();
        let modifiers = setup.modifiers.iter().map(ModifierConfig::build).collect();
        let next_id = roster.iter().map(|b| b.id).max().unwrap_or(0) + 1;
        Self {
            session: Session::new(setup.session, now),
            game_id: new_game_id(1),
            queue: roster.iter().map(|b| b.id).collect(),
            roster,
            modifiers,
            setup,
            held: false,
            best_ball: BestBallRound::default(),
            rack: RackAction::Keep,
            game_over_until: None,
            warning: None,
            store: None,
            link: Box::new(OfflineLink),
            moves_tx,
            moves_rx,
            pending_moves: HashMap::new(),
            next_id,
            move_seq: 0,
            notices: Vec::new(),
        }
    }

    pub fn with_store(mut self, store: GameStore) -> Self {
        self.store = Some(store);
        self.save();
        self
    }

    pub fn with_link(mut self, link: Box<dyn LaneLink>) -> Self {
        self.link = link;
        self
    }

    // ---- accessors ----

    pub fn setup(&self) -> &GameSetup {
        &self.setup
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn roster(&self) -> &[Bowler] {
        &self.roster
    }

    /// Roster position of the bowler who is up.
    pub fn current_turn_index(&self) -> Option<usize> {
        let id = self.queue.front()?;
        self.roster.iter().position(|b| b.id == *id)
    }

    pub fn current_bowler(&self) -> Option<&Bowler> {
        self.current_turn_index().map(|index| &self.roster[index])
    }

    pub fn turn_order(&self) -> Vec<&Bowler> {
        self.queue
            .iter()
            .filter_map(|id| self.roster.iter().find(|b| b.id == *id))
            .collect()
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn is_awaiting_selection(&self) -> bool {
        self.best_ball.is_awaiting_selection()
    }

    pub fn candidates(&self) -> &[Candidate] {
        self.best_ball.candidates()
    }

    /// Whether a ball arriving now would be scored.
    pub fn accepts_throws(&self) -> bool {
        self.guard().is_none()
    }

    /// Why a ball arriving now would be ignored.
    pub fn throw_rejection(&self) -> Option<Rejection> {
        self.guard()
    }

    /// Total cell text for a league scoresheet, plain totals otherwise.
    pub fn total_display(&self, bowler_index: usize, frame: usize) -> Option<String> {
        let bowler = self.roster.get(bowler_index)?;
        let format = match self.setup.game_type {
            GameType::League { total_format } => total_format,
            _ => TotalFormat::Raw,
        };
        total_display(bowler, frame, format)
    }

    /// Rack change requested since the last call.
    pub fn take_rack_action(&mut self) -> RackAction {
        mem::take(&mut self.rack)
    }

    pub fn take_notices(&mut self) -> Vec<GameNotice> {
        mem::take(&mut self.notices)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game_id.clone(),
            game_type: self.setup.game_type.label().to_string(),
            lane_id: self.setup.lane_id,
            game_number: self.session.game_number(),
            current_turn_index: self.current_turn_index().unwrap_or(0),
            held: self.held,
            pending_selection: self.best_ball.candidates().to_vec(),
            bowlers: self.roster.clone(),
        }
    }

    // ---- throws ----

    fn guard(&self) -> Option<Rejection> {
        let Some(bowler) = self.current_bowler() else {
            return Some(Rejection::NoBowlers);
        };
        match self.session.phase() {
            SessionPhase::Complete => return Some(Rejection::SessionComplete),
            SessionPhase::Expired => return Some(Rejection::SessionExpired),
            SessionPhase::BetweenGames => return Some(Rejection::BetweenGames),
            SessionPhase::Playing => {}
        }
        if self.held {
            return Some(Rejection::Held);
        }
        if self.best_ball.is_awaiting_selection() {
            return Some(Rejection::AwaitingSelection);
        }
        if bowler.is_finished() {
            return Some(Rejection::BowlerFinished);
        }
        None
    }

    pub fn process_ball(&mut self, reported: PinState) -> BallOutcome {
        self.process_ball_at(reported, Instant::now())
    }

    /// Score `reported` (pins down after the ball) for the bowler who is up.
    pub fn process_ball_at(&mut self, reported: PinState, now: Instant) -> BallOutcome {
        if let Some(rejection) = self.guard() {
            debug!(target: LOG_TARGET, "Ball ignored: {rejection}");
            return BallOutcome::Rejected(rejection);
        }
        let Some(index) = self.current_turn_index() else {
            return BallOutcome::Rejected(Rejection::NoBowlers);
        };

        let game_number = self.session.game_number();
        let bowler = &mut self.roster[index];
        let name = bowler.name.clone();
        let context = ThrowContext {
            bowler: &name,
            game_number,
            frame: bowler.current_frame,
            ball: bowler.current_ball,
            pins_before: bowler.pins,
        };

        let mut draft = ThrowDraft::evaluate(&context, reported);
        let mut events = Vec::new();
        for modifier in &self.modifiers {
            if let Some(event) = modifier.before_record(&context, &mut bowler.extension, &mut draft) {
                events.push(event);
            }
        }
        self.publish(events);

        // Pins never stand back up within a throw.
        let throw = Throw {
            pins_before: context.pins_before,
            pins_after: draft.pins_after.union(context.pins_before),
            score: draft.score,
            symbol: draft.symbol,
        };

        if self.setup.game_type == GameType::BestBall
            && self.roster[index].is_pair()
            && !is_mark(&throw, context.ball)
        {
            return self.hold_candidate(index, throw);
        }

        self.best_ball.clear();
        let outcome = self.commit(index, throw, now);
        self.save();
        outcome
    }

    fn hold_candidate(&mut self, index: usize, throw: Throw) -> BallOutcome {
        let bowler = &self.roster[index];
        let member_name = |slot: usize| bowler.members.get(slot).cloned().unwrap_or_else(|| bowler.name.clone());
        let member = member_name(self.best_ball.next_member());
        let partner = member_name(self.best_ball.next_member() + 1);
        let team = bowler.name.clone();

        debug!(target: LOG_TARGET, "{team}: {member} threw {} ({})", throw.symbol, throw.score);
        self.best_ball.push(Candidate { member, throw });

        if self.best_ball.is_awaiting_selection() {
            info!(target: LOG_TARGET, "{team}: waiting for best ball selection");
            self.save();
            return BallOutcome::AwaitingSelection;
        }

        self.rack = RackAction::Restore(throw.pins_before);
        self.save();
        BallOutcome::AwaitingPartner { member: partner }
    }

    fn commit(&mut self, index: usize, throw: Throw, now: Instant) -> BallOutcome {
        match self.record(index, throw, now) {
            Ok(record) => BallOutcome::Recorded(record),
            Err(err) => {
                error!(target: LOG_TARGET, "Throw not recorded: {err}");
                BallOutcome::Rejected(Rejection::BowlerFinished)
            }
        }
    }

    fn record(&mut self, index: usize, throw: Throw, now: Instant) -> Result<ThrowRecord, ScoringError> {
        let best_ball = self.setup.game_type == GameType::BestBall;
        let bowler = self.roster.get_mut(index).ok_or(ScoringError::NoSuchBowler(index))?;
        let frame = bowler.current_frame;
        let ball = bowler.current_ball;

        bowler.record(throw)?;
        bowler.refresh_totals();
        info!(
            target: LOG_TARGET,
            "{} frame {} ball {}: {} ({} pts, down {})",
            bowler.name,
            frame + 1,
            ball + 1,
            throw.symbol,
            throw.score,
            throw.pins_after
        );

        let step = frame_step(frame, ball, &throw, &bowler.frames[frame]);
        let record = ThrowRecord {
            bowler: bowler.name.clone(),
            frame,
            ball,
            throw,
            frame_complete: step == FrameStep::Complete,
        };

        match step {
            FrameStep::Continue => {
                if best_ball && bowler.is_pair() {
                    self.rack = RackAction::Restore(throw.pins_after);
                }
            }
            FrameStep::Respot => {
                bowler.respot();
                info!(target: LOG_TARGET, "{}: 10th frame mark, fresh rack", bowler.name);
                self.rack = RackAction::Reset;
            }
            FrameStep::Complete => {
                self.complete_frame(index, frame, now);
                self.rack = self.rack_for_current();
            }
        }
        Ok(record)
    }

    fn complete_frame(&mut self, index: usize, frame: usize, now: Instant) {
        let game_number = self.session.game_number();
        let bowler = &mut self.roster[index];
        bowler.advance_frame();

        let name = bowler.name.clone();
        let result = bowler.frames[frame];
        let context = FrameContext {
            bowler: &name,
            game_number,
            frame,
            result: &result,
        };
        let mut events = Vec::new();
        for modifier in &self.modifiers {
            events.extend(modifier.after_frame(&context, &mut bowler.extension));
        }

        let total = bowler.frame_totals[frame];
        let finished = bowler.is_finished();
        let final_score = bowler.total_score;
        self.publish(events);

        let payload = FramePayload {
            frame_num: frame,
            balls: result.ball_scores(),
            symbols: result.symbols(),
            total,
        };
        if !self.link.send_frame_data(&name, frame, &payload) {
            debug!(target: LOG_TARGET, "Frame {} for {name} not delivered", frame + 1);
        }
        self.notices.push(GameNotice::FrameCompleted {
            bowler: name.clone(),
            frame,
            total,
        });

        if finished {
            info!(target: LOG_TARGET, "{name} finished with {final_score}");
            self.notices.push(GameNotice::BowlerFinished {
                bowler: name,
                total: final_score,
            });
        }

        if self.all_finished() {
            self.complete_game(now);
            return;
        }
        self.end_turn(index);
    }

    fn all_finished(&self) -> bool {
        !self.roster.is_empty() && self.roster.iter().all(Bowler::is_finished)
    }

    fn end_turn(&mut self, index: usize) {
        let policy = self.setup.turn_policy;
        let bowler = &mut self.roster[index];
        let finished = bowler.is_finished();
        if !finished && !policy.turn_complete(bowler) {
            return;
        }
        bowler.frames_this_turn = 0;

        match policy {
            TurnPolicy::PairedLane {
                paired_lane,
                move_mode: MoveMode::Bowler,
                ..
            } if !finished => self.send_bowler_away(index, paired_lane),
            TurnPolicy::PairedLane {
                paired_lane,
                move_mode: MoveMode::Team,
                ..
            } => {
                bowler.waiting_for_swap = true;
                self.rotate();
                if self.roster.iter().all(|b| b.waiting_for_swap || b.is_finished()) {
                    self.swap_team(paired_lane);
                }
            }
            _ => self.rotate(),
        }
    }

    /// Rack the bowler who is up expects: fresh, or their own mid-frame pins.
    fn rack_for_current(&self) -> RackAction {
        match self.current_bowler() {
            Some(bowler) if !bowler.pins.is_all_standing() => RackAction::Restore(bowler.pins),
            _ => RackAction::Reset,
        }
    }

    /// Send the bowler who is up to the back of the queue.
    fn rotate(&mut self) {
        let Some(outgoing) = self.queue.pop_front() else {
            return;
        };
        self.queue.push_back(outgoing);
        self.skip_finished();

        if let (Some(old), Some(new)) = (self.roster.iter().find(|b| b.id == outgoing), self.current_bowler()) {
            info!(target: LOG_TARGET, "Turn passes from {} to {}", old.name, new.name);
        }
    }

    fn skip_finished(&mut self) {
        for _ in 0..self.queue.len() {
            if self.current_bowler().map_or(false, |b| !b.is_finished()) {
                return;
            }
            self.queue.rotate_left(1);
        }
    }

    // ---- paired lanes ----

    fn send_bowler_away(&mut self, index: usize, lane: u32) {
        let bowler = self.roster.remove(index);
        self.queue.retain(|id| *id != bowler.id);
        self.skip_finished();

        self.move_seq += 1;
        let move_id = format!("{}-{}-{}", self.setup.lane_id, self.game_id, self.move_seq);
        let transfer = BowlerTransfer {
            from_lane: self.setup.lane_id,
            bowler: bowler.clone(),
        };
        let name = bowler.name.clone();
        self.pending_moves.insert(move_id.clone(), bowler);

        let tx = self.moves_tx.clone();
        let confirm_id = move_id.clone();
        let on_confirm: MoveConfirm = Box::new(move |accepted, message| {
            let _ = tx.send(MoveConfirmation {
                move_id: confirm_id,
                accepted,
                message,
            });
        });

        if self.link.send_bowler_move(&transfer, lane, &move_id, on_confirm) {
            info!(target: LOG_TARGET, "{name} moving to lane {lane}");
            self.notices.push(GameNotice::BowlerLeft { bowler: name, lane });
        } else {
            self.return_bowler(&move_id, "move could not be sent");
        }
    }

    fn return_bowler(&mut self, move_id: &str, reason: &str) {
        let Some(mut bowler) = self.pending_moves.remove(move_id) else {
            return;
        };
        warn!(target: LOG_TARGET, "{} stays on this lane: {reason}", bowler.name);
        bowler.waiting_for_swap = false;
        self.notices.push(GameNotice::BowlerReturned {
            bowler: bowler.name.clone(),
        });
        self.queue.push_back(bowler.id);
        self.roster.push(bowler);
        self.skip_finished();
    }

    fn drain_moves(&mut self) {
        while let Ok(confirmation) = self.moves_rx.try_recv() {
            if confirmation.accepted {
                if let Some(bowler) = self.pending_moves.remove(&confirmation.move_id) {
                    info!(target: LOG_TARGET, "Move of {} confirmed", bowler.name);
                }
            } else {
                self.return_bowler(&confirmation.move_id, &confirmation.message);
            }
        }
    }

    fn swap_team(&mut self, lane: u32) {
        let transfer = TeamTransfer {
            from_lane: self.setup.lane_id,
            bowlers: self.roster.clone(),
        };
        if self.link.send_team_move(&transfer, lane) {
            info!(target: LOG_TARGET, "Team moving to lane {lane}");
            self.roster.clear();
            self.queue.clear();
            self.notices.push(GameNotice::TeamLeft { lane });
        } else {
            warn!(target: LOG_TARGET, "Team move to lane {lane} failed, team keeps bowling here");
            for bowler in &mut self.roster {
                bowler.waiting_for_swap = false;
            }
        }
    }

    /// Take a bowler handed over by another lane.
    pub fn receive_bowler(&mut self, mut bowler: Bowler) {
        bowler.id = self.next_id;
        self.next_id += 1;
        bowler.waiting_for_swap = false;
        bowler.frames_this_turn = 0;

        info!(target: LOG_TARGET, "{} joined from another lane", bowler.name);
        self.notices.push(GameNotice::BowlerArrived {
            bowler: bowler.name.clone(),
        });
        self.queue.push_back(bowler.id);
        self.roster.push(bowler);
        self.skip_finished();
        self.save();
    }

    pub fn receive_team(&mut self, bowlers: Vec<Bowler>) {
        for bowler in bowlers {
            self.receive_bowler(bowler);
        }
    }

    // ---- game and session lifecycle ----

    fn complete_game(&mut self, now: Instant) {
        let game_number = self.session.game_number();
        let scores: Vec<FinalScore> = self
            .roster
            .iter()
            .map(|b| FinalScore {
                name: b.name.clone(),
                final_score: b.total_score,
            })
            .collect();
        info!(target: LOG_TARGET, "Game {} complete: {:?}", self.game_id, scores);

        if let Some(store) = &self.store {
            let archive = CompletedGame {
                game_id: self.game_id.clone(),
                game_type: self.setup.game_type.label().to_string(),
                bowlers: scores.clone(),
            };
            match store.archive(&archive) {
                Ok(path) => debug!(target: LOG_TARGET, "Archived game to {}", path.display()),
                Err(e) => error!(target: LOG_TARGET, "Failed to archive game: {e}"),
            }
        }

        let payload = GamePayload {
            game_id: self.game_id.clone(),
            game_type: self.setup.game_type.label().to_string(),
            game_number,
            lane_id: self.setup.lane_id,
            bowlers: scores.clone(),
            timestamp: Local::now().to_rfc3339(),
        };
        if !self.link.send_game_complete(&payload) {
            debug!(target: LOG_TARGET, "Game result not delivered");
        }

        let phase = self.session.finish_game(now, self.setup.between_games);
        self.game_over_until = Some(now + self.setup.game_over_pause);
        self.notices.push(GameNotice::GameCompleted { game_number, scores });
        if self.session.is_ended() {
            info!(target: LOG_TARGET, "Session ended ({phase:?})");
            self.notices.push(GameNotice::SessionEnded(phase));
        }
    }

    /// Start the next game of the session right away.
    pub fn start_next_game(&mut self) -> bool {
        if !self.session.start_next_game() {
            return false;
        }
        let game_number = self.session.game_number();
        for bowler in &mut self.roster {
            bowler.reset_for_new_game();
            for modifier in &self.modifiers {
                modifier.on_new_game(game_number, &mut bowler.extension);
            }
        }
        self.queue = self.roster.iter().map(|b| b.id).collect();
        self.best_ball.clear();
        self.game_id = new_game_id(game_number);
        self.game_over_until = None;
        self.rack = RackAction::Reset;

        info!(target: LOG_TARGET, "Starting game {game_number} ({})", self.game_id);
        self.notices.push(GameNotice::NextGameStarted { game_number });
        self.save();
        true
    }

    pub fn update_session(&mut self, extension: SessionExtension) -> bool {
        self.update_session_at(extension, Instant::now())
    }

    /// Add games or minutes, reopening an ended session.
    pub fn update_session_at(&mut self, extension: SessionExtension, now: Instant) -> bool {
        let game_finished = self.all_finished();
        let reopened = self.session.extend(extension, game_finished, now);
        info!(target: LOG_TARGET, "Session extended: {extension:?}");
        if reopened {
            self.notices.push(GameNotice::SessionReopened);
        }
        self.save();
        reopened
    }

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Per-tick housekeeping: timers, reminders and move confirmations.
    pub fn update_at(&mut self, now: Instant) {
        self.drain_moves();

        if self.game_over_until.map_or(false, |until| now >= until) {
            self.game_over_until = None;
        }
        if self.warning.map_or(false, |(_, until)| now >= until) {
            self.warning = None;
        }

        match self.session.tick(now) {
            SessionTick::Idle => {}
            SessionTick::StartNextGame => {
                self.start_next_game();
            }
            SessionTick::Expired => {
                info!(target: LOG_TARGET, "Session time expired");
                self.notices.push(GameNotice::SessionEnded(SessionPhase::Expired));
                self.save();
            }
            SessionTick::TimeWarning(minutes) => {
                info!(target: LOG_TARGET, "{minutes} minutes left in session");
                self.warning = Some((minutes, now + TIME_WARNING_SHOWN));
                self.notices.push(GameNotice::TimeWarning { minutes });
            }
        }
    }

    // ---- operator and UI ----

    /// The rack was reset by hand; the bowler who is up faces a fresh rack.
    pub fn reset_pins(&mut self) {
        if let Some(index) = self.current_turn_index() {
            self.roster[index].respot();
            self.save();
        }
    }

    /// Pass the turn on without recording a ball.
    ///
    /// A bowler skipped mid-frame keeps their frame; the rack is restored to
    /// their pins when they are up again.
    pub fn skip_bowler(&mut self) -> bool {
        if self.session.is_ended() || self.session.phase() == SessionPhase::BetweenGames || self.queue.is_empty() {
            return false;
        }
        let skipped = self.current_bowler().map(|b| b.name.clone()).unwrap_or_default();
        self.best_ball.clear();
        self.rotate();
        self.rack = self.rack_for_current();
        info!(target: LOG_TARGET, "Skipped {skipped}");
        self.save();
        true
    }

    pub fn toggle_hold(&mut self) -> bool {
        if self.session.is_ended() {
            return false;
        }
        self.held = !self.held;
        info!(target: LOG_TARGET, "Hold {}", if self.held { "on" } else { "off" });
        self.save();
        true
    }

    /// Spend a free strike on the first ball of the current frame.
    pub fn use_free_strike(&mut self, bowler_index: usize) -> bool {
        if self.guard().is_some() || self.current_turn_index() != Some(bowler_index) {
            return false;
        }

        let game_number = self.session.game_number();
        let bowler = &mut self.roster[bowler_index];
        if bowler.current_ball != 0 {
            return false;
        }
        let name = bowler.name.clone();
        let context = ThrowContext {
            bowler: &name,
            game_number,
            frame: bowler.current_frame,
            ball: 0,
            pins_before: bowler.pins,
        };
        let granted = self
            .modifiers
            .iter()
            .find_map(|modifier| modifier.grant_free_strike(&context, &mut bowler.extension));
        let Some(event) = granted else {
            return false;
        };
        self.publish(vec![event]);

        let mut draft = ThrowDraft::evaluate(&context, PinState::all_down());
        draft.make_strike(context.pins_before);
        let throw = Throw {
            pins_before: context.pins_before,
            pins_after: draft.pins_after,
            score: draft.score,
            symbol: draft.symbol,
        };
        self.best_ball.clear();
        let recorded = matches!(self.commit(bowler_index, throw, Instant::now()), BallOutcome::Recorded(_));
        self.save();
        recorded
    }

    /// Commit the 1-based best-ball candidate.
    pub fn select_candidate(&mut self, choice: usize) -> bool {
        let Some(index) = self.current_turn_index() else {
            return false;
        };
        let Some(picked) = self.best_ball.select(choice) else {
            return false;
        };
        info!(target: LOG_TARGET, "Best ball: {}'s {}", picked.member, picked.throw.symbol);
        let recorded = matches!(self.commit(index, picked.throw, Instant::now()), BallOutcome::Recorded(_));
        self.save();
        recorded
    }

    pub fn handle_click(&mut self, target: ClickTarget) -> bool {
        match target {
            ClickTarget::NextGame => self.start_next_game(),
            ClickTarget::FreeStrike { bowler_index } => self.use_free_strike(bowler_index),
            ClickTarget::SelectCandidate(choice) => self.select_candidate(choice),
            ClickTarget::ToggleHold => self.toggle_hold(),
        }
    }

    pub fn get_scroll_message(&self) -> String {
        self.get_scroll_message_at(Instant::now())
    }

    pub fn get_scroll_message_at(&self, now: Instant) -> String {
        if self.best_ball.is_awaiting_selection() {
            let options: Vec<String> = self
                .best_ball
                .candidates()
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{}) {} {}", i + 1, c.member, c.throw.symbol))
                .collect();
            return format!("Pick the best ball: {}", options.join("  "));
        }

        if let Some(until) = self.game_over_until {
            if now < until {
                let left = until.saturating_duration_since(now);
                let seconds = left.as_secs() + u64::from(left.subsec_nanos() > 0);
                return format!(
                    "Game Over! Thanks for Playing! Screen will close in {seconds} seconds, then you can start the next game when ready!"
                );
            }
        }

        match self.session.phase() {
            SessionPhase::Complete => return "Please see front desk".to_string(),
            SessionPhase::Expired => {
                return "Time has expired! Please see front desk to add more time. Game will close in 5 min.".to_string()
            }
            _ => {}
        }

        if let Some(left) = self.session.next_game_in(now) {
            let seconds = left.as_secs();
            return format!("Next game starts in {}:{:02}", seconds / 60, seconds % 60);
        }

        if self.held {
            return "Game on hold".to_string();
        }
        if self.session.is_last_game() {
            return "Reminder: This is your last game".to_string();
        }
        if let Some((minutes, _)) = self.warning {
            return format!(
                "You have {minutes} minutes left to play. Contact front desk if you want to add more time."
            );
        }

        format!("Welcome to {}! Good luck!", self.setup.venue_name)
    }

    pub fn get_game_info_display(&self) -> String {
        self.session.info_display(Instant::now())
    }

    pub fn get_game_info_display_at(&self, now: Instant) -> String {
        self.session.info_display(now)
    }

    // ---- internals ----

    fn publish(&mut self, events: Vec<ModifierEvent>) {
        for event in events {
            info!(target: LOG_TARGET, "{}", event.description());
            self.notices.push(GameNotice::Modifier(event));
        }
    }

    fn save(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save_current(&self.snapshot()) {
            error!(target: LOG_TARGET, "Failed to save game state: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn pins(pattern: &str) -> PinState {
        PinState::from_pattern(pattern).unwrap()
    }

    fn engine(names: &[&str], games: u32) -> (ScoringEngine, Instant) {
        let now = Instant::now();
        let setup = GameSetup::new(1, SessionMode::Games { total: games });
        (ScoringEngine::with_names(setup, names.iter().copied(), now), now)
    }

    fn strike(engine: &mut ScoringEngine, now: Instant) -> BallOutcome {
        engine.process_ball_at(PinState::all_down(), now)
    }

    #[test]
    fn test_head_pin_keeps_frame_open() {
        let (mut engine, now) = engine(&["Ana"], 1);
        let BallOutcome::Recorded(record) = engine.process_ball_at(pins("00100"), now) else {
            panic!("ball not recorded");
        };
        assert_eq!(record.throw.symbol.text(), "HP");
        assert_eq!(record.throw.score, 5);
        assert!(!record.frame_complete);

        let bowler = engine.current_bowler().unwrap();
        assert_eq!(bowler.current_frame, 0);
        assert_eq!(bowler.current_ball, 1);
        assert_eq!(engine.take_rack_action(), RackAction::Keep);
    }

    #[test]
    fn test_strike_advances_and_rotates() {
        let (mut engine, now) = engine(&["Ana", "Bo"], 1);
        strike(&mut engine, now);

        assert_eq!(engine.roster()[0].current_frame, 1);
        assert!(engine.roster()[0].pins.is_all_standing());
        assert_eq!(engine.current_bowler().unwrap().name, "Bo");
        assert_eq!(engine.take_rack_action(), RackAction::Reset);
    }

    #[test]
    fn test_spare_total_waits_for_next_ball() {
        let (mut engine, now) = engine(&["Ana"], 1);
        engine.process_ball_at(pins("01110"), now);
        let BallOutcome::Recorded(record) = engine.process_ball_at(PinState::all_down(), now) else {
            panic!("ball not recorded");
        };
        assert_eq!(record.throw.symbol, Symbol::Spare);
        assert!(record.frame_complete);
        assert_eq!(engine.roster()[0].frame_totals[0], None);

        engine.process_ball_at(pins("00100"), now);
        assert_eq!(engine.roster()[0].frame_totals[0], Some(20));
    }

    #[test]
    fn test_pins_never_stand_back_up() {
        let (mut engine, now) = engine(&["Ana"], 1);
        engine.process_ball_at(pins("11000"), now);
        // Sensor glitch reports the left pins standing again.
        let BallOutcome::Recorded(record) = engine.process_ball_at(pins("00011"), now) else {
            panic!("ball not recorded");
        };
        assert_eq!(record.throw.pins_after, pins("11011"));
        assert_eq!(record.throw.score, 5);
    }

    #[test]
    fn test_perfect_game() {
        let (mut engine, now) = engine(&["Ana"], 1);
        for _ in 0..12 {
            assert!(matches!(strike(&mut engine, now), BallOutcome::Recorded(_)));
        }
        let bowler = &engine.roster()[0];
        assert!(bowler.is_finished());
        assert_eq!(bowler.total_score, 450);
        assert_eq!(engine.session().phase(), SessionPhase::Complete);
        assert_eq!(strike(&mut engine, now), BallOutcome::Rejected(Rejection::SessionComplete));
    }

    #[test]
    fn test_tenth_frame_open_finishes_after_two() {
        let (mut engine, now) = engine(&["Ana"], 2);
        for _ in 0..9 {
            strike(&mut engine, now);
        }
        engine.process_ball_at(pins("00100"), now);
        assert!(!engine.roster()[0].is_finished());
        engine.process_ball_at(pins("01110"), now);
        assert!(engine.roster()[0].is_finished());
        assert_eq!(engine.session().phase(), SessionPhase::BetweenGames);
        assert_eq!(engine.process_ball_at(pins("00100"), now), BallOutcome::Rejected(Rejection::BetweenGames));
    }

    #[test]
    fn test_tenth_frame_strike_then_open_gets_third_ball() {
        let (mut engine, now) = engine(&["Ana"], 1);
        for _ in 0..10 {
            strike(&mut engine, now);
        }
        engine.process_ball_at(pins("00100"), now);
        assert!(!engine.roster()[0].is_finished());
        engine.process_ball_at(pins("00110"), now);
        let bowler = &engine.roster()[0];
        assert!(bowler.is_finished());
        assert_eq!(bowler.frames[LAST_FRAME].raw_score(), 15 + 5 + 3);
    }

    #[test]
    fn test_guards_leave_state_untouched() {
        let (mut engine, now) = engine(&["Ana", "Bo"], 1);
        engine.process_ball_at(pins("00100"), now);
        engine.toggle_hold();
        let before = serde_json::to_string(&engine.snapshot()).unwrap();

        assert_eq!(strike(&mut engine, now), BallOutcome::Rejected(Rejection::Held));
        assert_eq!(serde_json::to_string(&engine.snapshot()).unwrap(), before);
        assert!(!engine.accepts_throws());
    }

    #[test]
    fn test_skip_bowler() {
        let (mut engine, now) = engine(&["Ana", "Bo", "Cy"], 1);
        engine.process_ball_at(pins("00100"), now);
        assert!(engine.skip_bowler());
        assert_eq!(engine.current_bowler().unwrap().name, "Bo");
        assert_eq!(engine.take_rack_action(), RackAction::Reset);
        assert_eq!(engine.roster()[0].current_ball, 1);
    }

    #[test]
    fn test_skipped_bowler_gets_their_rack_back() {
        let (mut engine, now) = engine(&["Ana", "Bo"], 1);
        engine.process_ball_at(pins("00100"), now);
        assert!(engine.skip_bowler());
        assert_eq!(engine.take_rack_action(), RackAction::Reset);

        strike(&mut engine, now);
        assert_eq!(engine.current_bowler().unwrap().name, "Ana");
        assert_eq!(engine.take_rack_action(), RackAction::Restore(pins("00100")));

        let BallOutcome::Recorded(record) = engine.process_ball_at(pins("01100"), now) else {
            panic!("ball not recorded");
        };
        assert_eq!((record.frame, record.ball), (0, 1));
        assert_eq!(record.throw.score, 3);
    }

    #[test]
    fn test_between_games_timer_starts_next_game() {
        let (mut engine, now) = engine(&["Ana"], 2);
        for _ in 0..12 {
            strike(&mut engine, now);
        }
        assert!(engine.get_scroll_message_at(now).starts_with("Game Over!"));
        let after_pause = now + Duration::from_secs(61);
        engine.update_at(after_pause);
        assert_eq!(engine.get_scroll_message_at(after_pause), "Next game starts in 3:59");

        engine.update_at(now + Duration::from_secs(300));
        assert_eq!(engine.session().game_number(), 2);
        assert_eq!(engine.roster()[0].current_frame, 0);
        assert_eq!(engine.get_game_info_display_at(now), "Game 2 of 2");
        assert_eq!(engine.get_scroll_message_at(now), "Reminder: This is your last game");
        assert!(engine
            .take_notices()
            .iter()
            .any(|n| *n == GameNotice::NextGameStarted { game_number: 2 }));
    }

    #[test]
    fn test_next_game_button() {
        let (mut engine, now) = engine(&["Ana"], 2);
        assert!(!engine.handle_click(ClickTarget::NextGame));
        for _ in 0..12 {
            strike(&mut engine, now);
        }
        assert!(engine.handle_click(ClickTarget::NextGame));
        assert!(engine.accepts_throws());
    }

    #[test]
    fn test_update_session_reopens() {
        let (mut engine, now) = engine(&["Ana"], 1);
        for _ in 0..12 {
            strike(&mut engine, now);
        }
        let later = now + Duration::from_secs(120);
        assert_eq!(engine.get_scroll_message_at(later), "Please see front desk");
        assert!(engine.update_session_at(SessionExtension::AddGames(1), later));
        engine.update_at(later);
        assert_eq!(engine.session().game_number(), 2);
        assert!(engine.accepts_throws());
    }

    #[test]
    fn test_free_strike() {
        let now = Instant::now();
        let setup = GameSetup::new(1, SessionMode::Games { total: 1 })
            .with_modifier(ModifierConfig::FreeStrikes { count: 1, auto_free: false });
        let mut engine = ScoringEngine::with_names(setup, ["Ana", "Bo"], now);

        assert!(!engine.handle_click(ClickTarget::FreeStrike { bowler_index: 1 }));
        assert!(engine.handle_click(ClickTarget::FreeStrike { bowler_index: 0 }));
        let ana = &engine.roster()[0];
        assert!(ana.frames[0].is_strike());
        assert_eq!(ana.extension.free_strikes.as_ref().unwrap().remaining, 0);

        engine.process_ball_at(PinState::all_down(), now);
        strike(&mut engine, now);
        assert!(!engine.use_free_strike(0));
    }

    #[test]
    fn test_best_ball_selection() {
        let now = Instant::now();
        let setup = GameSetup::new(1, SessionMode::Games { total: 1 }).with_game_type(GameType::BestBall);
        let roster = vec![Bowler::pair(1, "Team A", "Ana", "Bo")];
        let mut engine = ScoringEngine::new(setup, roster, now);

        assert_eq!(
            engine.process_ball_at(pins("00100"), now),
            BallOutcome::AwaitingPartner { member: "Bo".to_string() }
        );
        assert_eq!(engine.take_rack_action(), RackAction::Restore(PinState::all_standing()));

        assert_eq!(engine.process_ball_at(pins("01110"), now), BallOutcome::AwaitingSelection);
        assert!(engine.get_scroll_message_at(now).starts_with("Pick the best ball"));
        let before = serde_json::to_string(&engine.snapshot()).unwrap();
        assert_eq!(strike(&mut engine, now), BallOutcome::Rejected(Rejection::AwaitingSelection));
        assert_eq!(serde_json::to_string(&engine.snapshot()).unwrap(), before);

        assert!(engine.handle_click(ClickTarget::SelectCandidate(2)));
        let team = &engine.roster()[0];
        assert_eq!(team.frames[0].slots[0].score(), Some(11));
        assert_eq!(team.current_ball, 1);
        assert_eq!(engine.take_rack_action(), RackAction::Restore(pins("01110")));
    }

    #[test]
    fn test_best_ball_mark_commits_immediately() {
        let now = Instant::now();
        let setup = GameSetup::new(1, SessionMode::Games { total: 1 }).with_game_type(GameType::BestBall);
        let mut engine = ScoringEngine::new(setup, vec![Bowler::pair(1, "Team A", "Ana", "Bo")], now);

        assert!(matches!(strike(&mut engine, now), BallOutcome::Recorded(_)));
        assert_eq!(engine.roster()[0].current_frame, 1);
        assert!(!engine.is_awaiting_selection());
    }

    #[derive(Default)]
    struct ScriptedLink {
        accept_moves: bool,
        frames: Arc<Mutex<Vec<(String, usize)>>>,
        pending: Arc<Mutex<Vec<MoveConfirm>>>,
    }

    impl LaneLink for ScriptedLink {
        fn send_frame_data(&self, bowler: &str, frame_index: usize, _frame: &FramePayload) -> bool {
            self.frames.lock().push((bowler.to_string(), frame_index));
            true
        }

        fn send_game_complete(&self, _game: &GamePayload) -> bool {
            true
        }

        fn send_team_move(&self, _team: &TeamTransfer, _target_lane: u32) -> bool {
            self.accept_moves
        }

        fn send_bowler_move(&self, _bowler: &BowlerTransfer, _target_lane: u32, _move_id: &str, on_confirm: MoveConfirm) -> bool {
            if self.accept_moves {
                self.pending.lock().push(on_confirm);
            }
            self.accept_moves
        }
    }

    fn paired_setup(move_mode: MoveMode) -> GameSetup {
        GameSetup::new(1, SessionMode::Games { total: 1 }).with_turn_policy(TurnPolicy::PairedLane {
            frames_per_turn: 1,
            paired_lane: 2,
            move_mode,
        })
    }

    #[test]
    fn test_refused_bowler_move_keeps_bowler() {
        let now = Instant::now();
        let mut engine = ScoringEngine::with_names(paired_setup(MoveMode::Bowler), ["Ana", "Bo"], now);
        strike(&mut engine, now);

        assert_eq!(engine.roster().len(), 2);
        assert_eq!(engine.current_bowler().unwrap().name, "Bo");
        assert!(engine
            .take_notices()
            .contains(&GameNotice::BowlerReturned { bowler: "Ana".to_string() }));
    }

    #[test]
    fn test_rejected_confirmation_re_adds_bowler() {
        let now = Instant::now();
        let pending = Arc::new(Mutex::new(Vec::new()));
        let frames = Arc::new(Mutex::new(Vec::new()));
        let link = ScriptedLink { accept_moves: true, frames: frames.clone(), pending: pending.clone() };
        let mut engine = ScoringEngine::with_names(paired_setup(MoveMode::Bowler), ["Ana", "Bo"], now)
            .with_link(Box::new(link));

        strike(&mut engine, now);
        assert_eq!(engine.roster().len(), 1);
        assert_eq!(frames.lock().as_slice(), &[("Ana".to_string(), 0)]);

        let confirm = pending.lock().pop().unwrap();
        confirm(false, "lane 2 full".to_string());
        engine.update_at(now);
        assert_eq!(engine.roster().len(), 2);
        assert_eq!(engine.turn_order().last().unwrap().name, "Ana");
    }

    #[test]
    fn test_team_moves_when_everyone_waits() {
        let now = Instant::now();
        let link = ScriptedLink { accept_moves: true, ..Default::default() };
        let mut engine = ScoringEngine::with_names(paired_setup(MoveMode::Team), ["Ana", "Bo"], now)
            .with_link(Box::new(link));

        strike(&mut engine, now);
        assert_eq!(engine.roster().len(), 2);
        assert!(engine.roster()[0].waiting_for_swap);
        strike(&mut engine, now);
        assert!(engine.roster().is_empty());
        assert_eq!(strike(&mut engine, now), BallOutcome::Rejected(Rejection::NoBowlers));

        let mut arriving = Bowler::new(9, "Guest");
        arriving.current_frame = 1;
        engine.receive_team(vec![arriving]);
        assert_eq!(engine.current_bowler().unwrap().name, "Guest");
        assert!(engine.accepts_throws());
    }

    #[test]
    fn test_recover_from_snapshot() {
        let (mut engine, now) = engine(&["Ana", "Bo"], 3);
        strike(&mut engine, now);
        engine.process_ball_at(pins("00100"), now);
        let snapshot = engine.snapshot();

        let setup = GameSetup::new(1, SessionMode::Games { total: 3 });
        let recovered = ScoringEngine::recover(setup, snapshot.clone(), now);
        assert_eq!(recovered.current_bowler().unwrap().name, "Bo");
        assert_eq!(recovered.current_bowler().unwrap().current_ball, 1);
        assert_eq!(recovered.snapshot(), snapshot);
    }

    #[test]
    fn test_frame_step_rules() {
        let open = Throw {
            pins_before: PinState::all_standing(),
            pins_after: pins("00100"),
            score: 5,
            symbol: Symbol::Combination(crate::scoring::symbols::Combination::HeadPin),
        };
        let frame = Frame::default();
        assert_eq!(frame_step(0, 0, &open, &frame), FrameStep::Continue);
        assert_eq!(frame_step(0, 1, &open, &frame), FrameStep::Complete);
        assert_eq!(frame_step(LAST_FRAME, 0, &open, &frame), FrameStep::Continue);
        assert_eq!(frame_step(LAST_FRAME, 1, &open, &frame), FrameStep::Complete);
        assert_eq!(frame_step(LAST_FRAME, 2, &open, &frame), FrameStep::Complete);
    }
}
