/// Rule modifiers
///
/// A modifier sees every throw through a fixed set of hooks and keeps its
/// per-bowler state in the bowler's [`ExtensionState`]:
///
/// - `before_record`: may rewrite the symbol/score of the throw about to be
///   recorded (never an already recorded one)
/// - `after_frame`: observes a completed frame
/// - `grant_free_strike`: decides whether an explicit free strike may be used
/// - `on_new_game`: resets per-game state
///
/// Modifiers are built from [`ModifierConfig`] so a game setup stays plain data.
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::frame::{Frame, FRAME_COUNT, LAST_FRAME};
use super::symbols::{classify, Combination, Symbol};
use crate::machine::{PinState, RACK_VALUE};

/// A frame of a specific game, 1-based as shown on the scoreboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRef {
    pub game: u32,
    pub frame: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeStrikeState {
    pub remaining: u32,
    pub used: Vec<FrameRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakState {
    pub consecutive: u32,
    pub turkeys: Vec<FrameRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrizeState {
    pub won: Vec<FrameRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeSixNineState {
    pub dots_remaining: u32,
    pub hits: Vec<FrameRef>,
    pub lost: bool,
}

impl Default for ThreeSixNineState {
    fn default() -> Self {
        Self {
            dots_remaining: 2,
            hits: Vec::new(),
            lost: false,
        }
    }
}

/// Per-bowler state owned by the active modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtensionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_strikes: Option<FreeStrikeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<StreakState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize: Option<PrizeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub three_six_nine: Option<ThreeSixNineState>,
}

/// The throw about to be recorded.
#[derive(Debug, Clone, Copy)]
pub struct ThrowContext<'a> {
    pub bowler: &'a str,
    pub game_number: u32,
    /// 0-based frame index
    pub frame: usize,
    /// 0-based ball index within the frame
    pub ball: usize,
    pub pins_before: PinState,
}

impl ThrowContext<'_> {
    pub fn is_tenth(&self) -> bool {
        self.frame == LAST_FRAME
    }

    fn frame_ref(&self) -> FrameRef {
        FrameRef {
            game: self.game_number,
            frame: self.frame + 1,
        }
    }
}

/// Computed result of a throw before it is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrowDraft {
    pub knocked: PinState,
    pub pins_after: PinState,
    pub score: u32,
    pub symbol: Symbol,
}

impl ThrowDraft {
    /// Base scoring for `reported` pins down after the throw.
    pub fn evaluate(ctx: &ThrowContext<'_>, reported: PinState) -> Self {
        let pins_after = reported.union(ctx.pins_before);
        let knocked = pins_after.newly_down_since(ctx.pins_before);
        Self {
            knocked,
            pins_after,
            score: knocked.value(),
            symbol: classify(ctx.ball, knocked, pins_after, ctx.is_tenth()),
        }
    }

    /// Turn the draft into a full strike on the rack it was thrown at.
    pub fn make_strike(&mut self, pins_before: PinState) {
        self.pins_after = PinState::all_down();
        self.knocked = self.pins_after.newly_down_since(pins_before);
        self.score = RACK_VALUE;
        self.symbol = Symbol::Strike;
    }
}

/// A frame that just completed.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub bowler: &'a str,
    pub game_number: u32,
    /// 0-based frame index
    pub frame: usize,
    pub result: &'a Frame,
}

impl FrameContext<'_> {
    fn frame_ref(&self) -> FrameRef {
        FrameRef {
            game: self.game_number,
            frame: self.frame + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ModifierEvent {
    FreeStrikeUsed { bowler: String, at: FrameRef, automatic: bool, remaining: u32 },
    StrikeAwarded { bowler: String, at: FrameRef, reason: String },
    TurkeyAwarded { bowler: String, at: FrameRef },
    PrizeWon { bowler: String, at: FrameRef },
    ThreeSixNineHit { bowler: String, at: FrameRef },
    ThreeSixNineDotLost { bowler: String, at: FrameRef, dots_remaining: u32 },
    ThreeSixNineLost { bowler: String, at: FrameRef },
}

impl ModifierEvent {
    pub fn description(&self) -> String {
        match self {
            ModifierEvent::FreeStrikeUsed { bowler, at, automatic, remaining } => format!(
                "{bowler} used a {}free strike in frame {} ({remaining} left)",
                if *automatic { "automatic " } else { "" },
                at.frame
            ),
            ModifierEvent::StrikeAwarded { bowler, at, reason } => {
                format!("{bowler} awarded a strike in frame {} ({reason})", at.frame)
            }
            ModifierEvent::TurkeyAwarded { bowler, at } => format!("Turkey for {bowler} in frame {}!", at.frame),
            ModifierEvent::PrizeWon { bowler, at } => format!("{bowler} won the frame {} prize!", at.frame),
            ModifierEvent::ThreeSixNineHit { bowler, at } => format!("{bowler} hit 3-6-9 frame {}", at.frame),
            ModifierEvent::ThreeSixNineDotLost { bowler, at, dots_remaining } => {
                format!("{bowler} missed 3-6-9 frame {} ({dots_remaining} dots left)", at.frame)
            }
            ModifierEvent::ThreeSixNineLost { bowler, .. } => format!("{bowler} is out of 3-6-9"),
        }
    }
}

pub trait RuleModifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn before_record(&self, _ctx: &ThrowContext<'_>, _state: &mut ExtensionState, _draft: &mut ThrowDraft) -> Option<ModifierEvent> {
        None
    }

    fn after_frame(&self, _ctx: &FrameContext<'_>, _state: &mut ExtensionState) -> Vec<ModifierEvent> {
        Vec::new()
    }

    fn grant_free_strike(&self, _ctx: &ThrowContext<'_>, _state: &mut ExtensionState) -> Option<ModifierEvent> {
        None
    }

    fn on_new_game(&self, _game_number: u32, _state: &mut ExtensionState) {}
}

/// Serializable description of a modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModifierConfig {
    /// Strike 13: a pool of free strikes plus generous strike rules
    FreeStrikes { count: u32, auto_free: bool },
    Turkey,
    /// Game number to 1-based prize frame
    PrizeFrame {
        #[serde(deserialize_with = "game_keyed")]
        frames: BTreeMap<u32, usize>,
    },
    /// Game number to 1-based target frames
    ThreeSixNine {
        #[serde(deserialize_with = "game_keyed")]
        targets: BTreeMap<u32, Vec<usize>>,
    },
}

/// Game-number keys arrive as strings once the `kind` tag has been read.
fn game_keyed<'de, D, V>(deserializer: D) -> Result<BTreeMap<u32, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    BTreeMap::<String, V>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| {
            key.trim()
                .parse::<u32>()
                .map(|game| (game, value))
                .map_err(|_| D::Error::custom(format!("game number expected, got {key:?}")))
        })
        .collect()
}

impl ModifierConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ModifierConfig::FreeStrikes { .. } => "free_strikes",
            ModifierConfig::Turkey => "turkey",
            ModifierConfig::PrizeFrame { .. } => "prize_frame",
            ModifierConfig::ThreeSixNine { .. } => "three_six_nine",
        }
    }

    /// Every 1-based frame number the configuration points at.
    pub fn frames(&self) -> Vec<usize> {
        match self {
            ModifierConfig::PrizeFrame { frames } => frames.values().copied().collect(),
            ModifierConfig::ThreeSixNine { targets } => targets.values().flatten().copied().collect(),
            _ => Vec::new(),
        }
    }

    pub fn build(&self) -> Box<dyn RuleModifier> {
        match self {
            ModifierConfig::FreeStrikes { count, auto_free } => Box::new(FreeStrikes {
                count: *count,
                auto_free: *auto_free,
            }),
            ModifierConfig::Turkey => Box::new(TurkeyTracker),
            ModifierConfig::PrizeFrame { frames } => Box::new(PrizeFrame { frames: frames.clone() }),
            ModifierConfig::ThreeSixNine { targets } => Box::new(ThreeSixNine {
                targets: targets.clone(),
            }),
        }
    }
}

/// Strike 13.
///
/// Each bowler gets `count` free strikes per game, usable on the first ball
/// of a frame. An `L` or `R` first ball is a strike, and a single pin left
/// standing after a fresh rack is marked as a strike.
pub struct FreeStrikes {
    pub count: u32,
    pub auto_free: bool,
}

impl FreeStrikes {
    fn state<'s>(&self, state: &'s mut ExtensionState) -> &'s mut FreeStrikeState {
        state.free_strikes.get_or_insert_with(|| FreeStrikeState {
            remaining: self.count,
            used: Vec::new(),
        })
    }

    fn consume(&self, ctx: &ThrowContext<'_>, state: &mut ExtensionState, automatic: bool) -> Option<ModifierEvent> {
        let pool = self.state(state);
        if pool.remaining == 0 {
            return None;
        }
        pool.remaining -= 1;
        pool.used.push(ctx.frame_ref());
        Some(ModifierEvent::FreeStrikeUsed {
            bowler: ctx.bowler.to_string(),
            at: ctx.frame_ref(),
            automatic,
            remaining: pool.remaining,
        })
    }
}

impl RuleModifier for FreeStrikes {
    fn name(&self) -> &'static str {
        "free_strikes"
    }

    fn before_record(&self, ctx: &ThrowContext<'_>, state: &mut ExtensionState, draft: &mut ThrowDraft) -> Option<ModifierEvent> {
        if ctx.ball == 0 && self.auto_free && draft.knocked.is_all_standing() {
            let first_balls_left = (FRAME_COUNT - ctx.frame) as u32;
            if self.state(state).remaining >= (first_balls_left + 1) / 2 {
                let event = self.consume(ctx, state, true);
                if event.is_some() {
                    draft.make_strike(ctx.pins_before);
                }
                return event;
            }
        }

        let fresh_rack = ctx.pins_before.is_all_standing() && (ctx.ball == 0 || ctx.is_tenth());
        if !fresh_rack || draft.symbol == Symbol::Strike {
            return None;
        }

        if matches!(
            draft.symbol,
            Symbol::Combination(Combination::LeftLeave) | Symbol::Combination(Combination::RightLeave)
        ) {
            draft.make_strike(ctx.pins_before);
            return Some(ModifierEvent::StrikeAwarded {
                bowler: ctx.bowler.to_string(),
                at: ctx.frame_ref(),
                reason: "corner pin leave".to_string(),
            });
        }

        // Exactly four down, whichever pin remains.
        if draft.pins_after.down_count() == 4 {
            draft.symbol = Symbol::Strike;
            return Some(ModifierEvent::StrikeAwarded {
                bowler: ctx.bowler.to_string(),
                at: ctx.frame_ref(),
                reason: "single pin remaining".to_string(),
            });
        }

        None
    }

    fn grant_free_strike(&self, ctx: &ThrowContext<'_>, state: &mut ExtensionState) -> Option<ModifierEvent> {
        if ctx.ball != 0 {
            return None;
        }
        self.consume(ctx, state, false)
    }

    fn on_new_game(&self, _game_number: u32, state: &mut ExtensionState) {
        state.free_strikes = Some(FreeStrikeState {
            remaining: self.count,
            used: Vec::new(),
        });
    }
}

/// Three strike frames in a row award a turkey and restart the count.
pub struct TurkeyTracker;

impl RuleModifier for TurkeyTracker {
    fn name(&self) -> &'static str {
        "turkey"
    }

    fn after_frame(&self, ctx: &FrameContext<'_>, state: &mut ExtensionState) -> Vec<ModifierEvent> {
        let streak = state.streak.get_or_insert_with(StreakState::default);
        if !ctx.result.is_strike() {
            streak.consecutive = 0;
            return Vec::new();
        }

        streak.consecutive += 1;
        if streak.consecutive < 3 {
            return Vec::new();
        }
        streak.consecutive = 0;
        streak.turkeys.push(ctx.frame_ref());
        vec![ModifierEvent::TurkeyAwarded {
            bowler: ctx.bowler.to_string(),
            at: ctx.frame_ref(),
        }]
    }

    fn on_new_game(&self, _game_number: u32, state: &mut ExtensionState) {
        if let Some(streak) = state.streak.as_mut() {
            streak.consecutive = 0;
        }
    }
}

/// A strike in the game's prize frame wins.
pub struct PrizeFrame {
    pub frames: BTreeMap<u32, usize>,
}

impl RuleModifier for PrizeFrame {
    fn name(&self) -> &'static str {
        "prize_frame"
    }

    fn after_frame(&self, ctx: &FrameContext<'_>, state: &mut ExtensionState) -> Vec<ModifierEvent> {
        let at = ctx.frame_ref();
        if self.frames.get(&ctx.game_number) != Some(&at.frame) || !ctx.result.is_strike() {
            return Vec::new();
        }
        state.prize.get_or_insert_with(PrizeState::default).won.push(at);
        vec![ModifierEvent::PrizeWon {
            bowler: ctx.bowler.to_string(),
            at,
        }]
    }
}

/// 3-6-9: every target frame must be a strike; two misses end the run.
pub struct ThreeSixNine {
    pub targets: BTreeMap<u32, Vec<usize>>,
}

impl RuleModifier for ThreeSixNine {
    fn name(&self) -> &'static str {
        "three_six_nine"
    }

    fn after_frame(&self, ctx: &FrameContext<'_>, state: &mut ExtensionState) -> Vec<ModifierEvent> {
        let at = ctx.frame_ref();
        let is_target = self
            .targets
            .get(&ctx.game_number)
            .map_or(false, |frames| frames.contains(&at.frame));
        let run = state.three_six_nine.get_or_insert_with(ThreeSixNineState::default);
        if !is_target || run.lost {
            return Vec::new();
        }

        let bowler = ctx.bowler.to_string();
        if ctx.result.is_strike() {
            run.hits.push(at);
            return vec![ModifierEvent::ThreeSixNineHit { bowler, at }];
        }

        run.dots_remaining = run.dots_remaining.saturating_sub(1);
        if run.dots_remaining == 0 {
            run.lost = true;
            vec![ModifierEvent::ThreeSixNineLost { bowler, at }]
        } else {
            vec![ModifierEvent::ThreeSixNineDotLost {
                bowler,
                at,
                dots_remaining: run.dots_remaining,
            }]
        }
    }

    fn on_new_game(&self, _game_number: u32, state: &mut ExtensionState) {
        state.three_six_nine = Some(ThreeSixNineState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::frame::{Slot, Throw};

    fn ctx(frame: usize, ball: usize, before: &str) -> ThrowContext<'static> {
        ThrowContext {
            bowler: "Snoopi",
            game_number: 1,
            frame,
            ball,
            pins_before: PinState::from_pattern(before).unwrap(),
        }
    }

    fn pins(pattern: &str) -> PinState {
        PinState::from_pattern(pattern).unwrap()
    }

    fn strike_frame(strike: bool) -> Frame {
        let after = if strike { PinState::all_down() } else { pins("00100") };
        let mut frame = Frame::default();
        frame.slots[0] = Slot::Thrown(Throw {
            pins_before: PinState::all_standing(),
            pins_after: after,
            score: after.value(),
            symbol: classify(0, after, after, false),
        });
        frame
    }

    #[test]
    fn test_left_leave_counts_as_full_strike() {
        let modifier = FreeStrikes { count: 13, auto_free: false };
        let mut state = ExtensionState::default();
        let context = ctx(0, 0, "00000");
        let mut draft = ThrowDraft::evaluate(&context, pins("01111"));

        let event = modifier.before_record(&context, &mut state, &mut draft);
        assert!(matches!(event, Some(ModifierEvent::StrikeAwarded { .. })));
        assert_eq!(draft.symbol, Symbol::Strike);
        assert_eq!(draft.score, 15);
        assert!(draft.pins_after.is_all_down());
    }

    #[test]
    fn test_single_pin_remaining_keeps_actual_score() {
        let modifier = FreeStrikes { count: 13, auto_free: false };
        let mut state = ExtensionState::default();
        let context = ctx(2, 0, "00000");
        // Center pin left standing.
        let mut draft = ThrowDraft::evaluate(&context, pins("11011"));

        modifier.before_record(&context, &mut state, &mut draft);
        assert_eq!(draft.symbol, Symbol::Strike);
        assert_eq!(draft.score, 10);
        assert_eq!(draft.pins_after.down_count(), 4);
    }

    #[test]
    fn test_second_ball_is_never_upgraded() {
        let modifier = FreeStrikes { count: 13, auto_free: false };
        let mut state = ExtensionState::default();
        let context = ctx(2, 1, "10000");
        let mut draft = ThrowDraft::evaluate(&context, pins("11011"));

        assert!(modifier.before_record(&context, &mut state, &mut draft).is_none());
        assert_eq!(draft.symbol, Symbol::Count(8));
    }

    #[test]
    fn test_auto_free_strike_replaces_a_miss() {
        let modifier = FreeStrikes { count: 13, auto_free: true };
        let mut state = ExtensionState::default();
        let context = ctx(0, 0, "00000");
        let mut draft = ThrowDraft::evaluate(&context, PinState::all_standing());

        let event = modifier.before_record(&context, &mut state, &mut draft);
        assert!(matches!(event, Some(ModifierEvent::FreeStrikeUsed { automatic: true, remaining: 12, .. })));
        assert_eq!(draft.symbol, Symbol::Strike);
        assert_eq!(state.free_strikes.as_ref().unwrap().used, vec![FrameRef { game: 1, frame: 1 }]);
    }

    #[test]
    fn test_auto_free_waits_when_pool_is_small() {
        let modifier = FreeStrikes { count: 2, auto_free: true };
        let mut state = ExtensionState::default();
        let context = ctx(0, 0, "00000");
        let mut draft = ThrowDraft::evaluate(&context, PinState::all_standing());

        assert!(modifier.before_record(&context, &mut state, &mut draft).is_none());
        assert_eq!(draft.symbol, Symbol::Miss);
    }

    #[test]
    fn test_explicit_free_strike_only_on_first_ball() {
        let modifier = FreeStrikes { count: 1, auto_free: false };
        let mut state = ExtensionState::default();

        assert!(modifier.grant_free_strike(&ctx(0, 1, "00100"), &mut state).is_none());
        assert!(modifier.grant_free_strike(&ctx(0, 0, "00000"), &mut state).is_some());
        assert!(modifier.grant_free_strike(&ctx(1, 0, "00000"), &mut state).is_none());

        modifier.on_new_game(2, &mut state);
        assert_eq!(state.free_strikes.as_ref().unwrap().remaining, 1);
    }

    #[test]
    fn test_turkey_after_three_strikes() {
        let tracker = TurkeyTracker;
        let mut state = ExtensionState::default();
        let strike = strike_frame(true);
        let open = strike_frame(false);

        let mut events = Vec::new();
        for (frame, result) in [&strike, &strike, &open, &strike, &strike, &strike].into_iter().enumerate() {
            let context = FrameContext { bowler: "Snoopi", game_number: 1, frame, result };
            events.extend(tracker.after_frame(&context, &mut state));
        }

        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            ModifierEvent::TurkeyAwarded { bowler: "Snoopi".to_string(), at: FrameRef { game: 1, frame: 6 } }
        );
        assert_eq!(state.streak.unwrap().consecutive, 0);
    }

    #[test]
    fn test_prize_frame() {
        let prize = PrizeFrame { frames: BTreeMap::from([(1, 5)]) };
        let mut state = ExtensionState::default();
        let strike = strike_frame(true);

        let miss = FrameContext { bowler: "Snoopi", game_number: 1, frame: 3, result: &strike };
        assert!(prize.after_frame(&miss, &mut state).is_empty());

        let hit = FrameContext { bowler: "Snoopi", game_number: 1, frame: 4, result: &strike };
        assert_eq!(prize.after_frame(&hit, &mut state).len(), 1);
        assert_eq!(state.prize.unwrap().won, vec![FrameRef { game: 1, frame: 5 }]);
    }

    #[test]
    fn test_three_six_nine_two_misses_lose() {
        let game = ThreeSixNine { targets: BTreeMap::from([(1, vec![3, 6, 9])]) };
        let mut state = ExtensionState::default();
        let strike = strike_frame(true);
        let open = strike_frame(false);

        let at = |frame, result| FrameContext { bowler: "Snoopi", game_number: 1, frame, result };
        assert!(matches!(game.after_frame(&at(2, &strike), &mut state)[..], [ModifierEvent::ThreeSixNineHit { .. }]));
        assert!(matches!(
            game.after_frame(&at(5, &open), &mut state)[..],
            [ModifierEvent::ThreeSixNineDotLost { dots_remaining: 1, .. }]
        ));
        assert!(game.after_frame(&at(6, &open), &mut state).is_empty());
        assert!(matches!(game.after_frame(&at(8, &open), &mut state)[..], [ModifierEvent::ThreeSixNineLost { .. }]));
        assert!(state.three_six_nine.unwrap().lost);
    }

    #[test]
    fn test_modifier_config_builds() {
        let config: ModifierConfig = serde_json::from_str(r#"{"kind":"free_strikes","count":13,"auto_free":false}"#).unwrap();
        assert_eq!(config.build().name(), "free_strikes");

        let config: ModifierConfig = serde_json::from_str(r#"{"kind":"prize_frame","frames":{"1":5}}"#).unwrap();
        assert_eq!(config, ModifierConfig::PrizeFrame { frames: BTreeMap::from([(1, 5)]) });
        assert_eq!(config.build().name(), "prize_frame");
    }

    #[test]
    fn test_three_six_nine_config_survives_a_save() {
        let config = ModifierConfig::ThreeSixNine {
            targets: BTreeMap::from([(1, vec![3, 6, 9]), (2, vec![2, 5, 8])]),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""kind":"three_six_nine""#));

        let back: ModifierConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.build().name(), "three_six_nine");
    }

    #[test]
    fn test_modifier_config_rejects_non_numeric_game() {
        let result = serde_json::from_str::<ModifierConfig>(r#"{"kind":"prize_frame","frames":{"first":5}}"#);
        assert!(result.unwrap_err().to_string().contains("game number"));
    }
}
