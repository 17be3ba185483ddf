/// Throw symbols and the classification rule
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::machine::PinState;

/// Named first-ball combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Combination {
    /// Both right pins (`C\O`)
    ChopRight,
    /// Both left pins (`C/O`)
    ChopLeft,
    /// Near-left and far-right (`A`)
    Aces,
    /// Everything but the far-left (`L`)
    LeftLeave,
    /// Everything but the far-right (`R`)
    RightLeave,
    /// Center pin alone (`HP`)
    HeadPin,
    /// Far-left and center (`SL`)
    SplitLeft,
    /// Center and far-right (`SR`)
    SplitRight,
}

impl Combination {
    pub fn marker(self) -> &'static str {
        match self {
            Combination::ChopRight => "C\\O",
            Combination::ChopLeft => "C/O",
            Combination::Aces => "A",
            Combination::LeftLeave => "L",
            Combination::RightLeave => "R",
            Combination::HeadPin => "HP",
            Combination::SplitLeft => "SL",
            Combination::SplitRight => "SR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Symbol {
    Strike,
    Spare,
    Combination(Combination),
    Count(u32),
    /// No pins
    Miss,
}

impl Symbol {
    pub fn text(&self) -> String {
        match self {
            Symbol::Strike => "X".to_string(),
            Symbol::Spare => "/".to_string(),
            Symbol::Combination(combination) => combination.marker().to_string(),
            Symbol::Count(score) => score.to_string(),
            Symbol::Miss => "-".to_string(),
        }
    }

    fn numeric(score: u32) -> Self {
        if score == 0 {
            Symbol::Miss
        } else {
            Symbol::Count(score)
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// First-ball pattern table, keyed by the knocked pattern (1 = knocked).
const FIRST_BALL_PATTERNS: [(&str, Symbol); 10] = [
    ("00011", Symbol::Combination(Combination::ChopRight)),
    ("11000", Symbol::Combination(Combination::ChopLeft)),
    ("01001", Symbol::Combination(Combination::Aces)),
    ("01111", Symbol::Combination(Combination::LeftLeave)),
    ("11110", Symbol::Combination(Combination::RightLeave)),
    ("00100", Symbol::Combination(Combination::HeadPin)),
    ("10100", Symbol::Combination(Combination::SplitLeft)),
    ("00101", Symbol::Combination(Combination::SplitRight)),
    ("11111", Symbol::Strike),
    ("00000", Symbol::Miss),
];

fn first_ball_symbol(knocked: PinState) -> Symbol {
    let pattern = knocked.pattern();
    FIRST_BALL_PATTERNS
        .iter()
        .find(|(key, _)| *key == pattern)
        .map(|(_, symbol)| *symbol)
        .unwrap_or_else(|| Symbol::numeric(knocked.value()))
}

/// Symbol for one throw.
///
/// `ball` is the 0-based ball index within the frame, `knocked` the pins
/// that fell on this ball and `after` every pin down once it settled.
pub fn classify(ball: usize, knocked: PinState, after: PinState, tenth: bool) -> Symbol {
    // Every down pin fell on this ball: the rack was fresh.
    let fresh_rack = after == knocked;

    match ball {
        0 => first_ball_symbol(knocked),
        1 if tenth && fresh_rack => first_ball_symbol(knocked),
        1 if after.is_all_down() => Symbol::Spare,
        _ if ball >= 2 && knocked.is_all_down() => Symbol::Strike,
        _ => Symbol::numeric(knocked.value()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pins(pattern: &str) -> PinState {
        PinState::from_pattern(pattern).unwrap()
    }

    #[test]
    fn test_first_ball_table() {
        let cases = [
            ("00100", "HP"),
            ("00011", "C\\O"),
            ("11000", "C/O"),
            ("01001", "A"),
            ("01111", "L"),
            ("11110", "R"),
            ("10100", "SL"),
            ("00101", "SR"),
            ("11111", "X"),
            ("00000", "-"),
            ("01000", "3"),
            ("10001", "4"),
        ];
        for (pattern, expected) in cases {
            let knocked = pins(pattern);
            assert_eq!(classify(0, knocked, knocked, false).text(), expected, "pattern {pattern}");
        }
    }

    #[test]
    fn test_second_ball() {
        // Ends left standing after ball one, both knocked now.
        let symbol = classify(1, pins("10001"), pins("11111"), false);
        assert_eq!(symbol, Symbol::Spare);

        let symbol = classify(1, pins("00001"), pins("01111"), false);
        assert_eq!(symbol, Symbol::Count(2));

        let symbol = classify(1, pins("00000"), pins("01110"), false);
        assert_eq!(symbol, Symbol::Miss);
    }

    #[test]
    fn test_tenth_frame_fresh_rack_uses_table() {
        let all = PinState::all_down();
        assert_eq!(classify(1, all, all, true), Symbol::Strike);
        assert_eq!(classify(1, pins("00100"), pins("00100"), true).text(), "HP");
        // Not a fresh rack: ordinary spare rule.
        assert_eq!(classify(1, pins("10001"), all, true), Symbol::Spare);
    }

    #[test]
    fn test_third_ball() {
        let all = PinState::all_down();
        assert_eq!(classify(2, all, all, true), Symbol::Strike);
        assert_eq!(classify(2, pins("00100"), pins("00100"), true), Symbol::Count(5));
        assert_eq!(classify(2, pins("10001"), all, true), Symbol::Count(4));
    }

    #[test]
    fn test_classification_is_pure() {
        let knocked = pins("01001");
        let first = classify(0, knocked, knocked, false);
        for _ in 0..3 {
            classify(1, pins("10110"), PinState::all_down(), false);
            assert_eq!(classify(0, knocked, knocked, false), first);
        }
    }
}
