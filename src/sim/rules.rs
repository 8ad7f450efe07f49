//! Three Man rule engine
//!
//! A pure function of the two faces, the roster, whose turn it is, and who
//! holds the Three Man title. Rules run in a fixed order because later rules
//! read earlier state: the title-holder penalty always uses the holder from
//! *before* this roll's transfer.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::Player;

/// Something the table has to act on after a roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleEvent {
    /// The current Three Man drinks once per 3 showing
    ThreeManDrinks { player: String, drinks: u8 },
    /// The roller takes the Three Man title
    NewThreeMan { player: String },
    /// Double 1s: roller makes a rule
    SnakeEyes,
    /// Double 3s
    DoubleThrees,
    /// Double 5s: thumbs on the table
    DoubleFives,
    /// Everybody drinks
    Social,
    /// A 7: the player to the roller's left drinks
    LeftDrinks { player: String },
    /// An 11: the player to the roller's right drinks
    RightDrinks { player: String },
}

impl fmt::Display for RuleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleEvent::ThreeManDrinks { player, drinks } => write!(f, "{player} DRINKS {drinks}"),
            RuleEvent::NewThreeMan { player } => write!(f, "NEW THREE MAN! {player}"),
            RuleEvent::SnakeEyes => f.write_str("SNAKE EYES! RULE!"),
            RuleEvent::DoubleThrees => f.write_str("DOUBLE 3s!"),
            RuleEvent::DoubleFives => f.write_str("DOUBLE 5s! THUMBS!"),
            RuleEvent::Social => f.write_str("SOCIAL!"),
            RuleEvent::LeftDrinks { player } => write!(f, "{player} (LEFT) DRINKS"),
            RuleEvent::RightDrinks { player } => write!(f, "{player} (RIGHT) DRINKS"),
        }
    }
}

/// Everything a single settled roll produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub face_a: u8,
    pub face_b: u8,
    pub total: u8,
    pub events: Vec<RuleEvent>,
    /// Title holder after this roll (`None` = unassigned)
    pub title_holder: Option<usize>,
}

impl RollOutcome {
    pub fn is_doubles(&self) -> bool {
        self.face_a == self.face_b
    }

    /// Event texts in rule order
    pub fn messages(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }

    /// Status line for the table: `ROLLED a & b` then the events
    pub fn summary(&self) -> String {
        let mut text = format!("ROLLED {} & {}", self.face_a, self.face_b);
        if !self.events.is_empty() {
            text.push('\n');
            text.push_str(&self.messages().join(" | "));
        }
        text
    }
}

/// Drinks the roller hands out on doubles
#[inline]
pub fn doubles_drinks(face: u8) -> u8 {
    face * 2
}

/// Evaluate a roll against the fixed rule set
pub fn evaluate(
    face_a: u8,
    face_b: u8,
    players: &[Player],
    turn: usize,
    title_holder: Option<usize>,
) -> RollOutcome {
    debug_assert!((1..=6).contains(&face_a) && (1..=6).contains(&face_b));

    let total = face_a + face_b;
    let name = |idx: usize| {
        players
            .get(idx)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    };
    let mut events = Vec::new();
    let mut new_holder = title_holder;

    // 1. Standing penalty for the current holder
    if let Some(holder) = title_holder {
        let drinks = u8::from(face_a == 3) + u8::from(face_b == 3) + u8::from(total == 3);
        if drinks > 0 {
            events.push(RuleEvent::ThreeManDrinks {
                player: name(holder),
                drinks,
            });
        }
    }

    // 2. Title transfer on {1, 2}
    if matches!((face_a, face_b), (1, 2) | (2, 1)) {
        new_holder = Some(turn);
        events.push(RuleEvent::NewThreeMan { player: name(turn) });
    }

    // 3. Doubles flavor (only 1s, 3s and 5s have one)
    if face_a == face_b {
        match face_a {
            1 => events.push(RuleEvent::SnakeEyes),
            3 => events.push(RuleEvent::DoubleThrees),
            5 => events.push(RuleEvent::DoubleFives),
            _ => {}
        }
    }

    // 4. Social, once no matter how many ways it matched
    if total == 4 || face_a == 4 || face_b == 4 {
        events.push(RuleEvent::Social);
    }

    // 5/6. Neighbours
    if !players.is_empty() {
        let n = players.len();
        if total == 7 {
            events.push(RuleEvent::LeftDrinks {
                player: name((turn + n - 1) % n),
            });
        }
        if total == 11 {
            events.push(RuleEvent::RightDrinks {
                player: name((turn + 1) % n),
            });
        }
    }

    RollOutcome {
        face_a,
        face_b,
        total,
        events,
        title_holder: new_holder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roster(names: &[&str]) -> Vec<Player> {
        names.iter().map(|n| Player::new(*n)).collect()
    }

    fn abc() -> Vec<Player> {
        roster(&["A", "B", "C"])
    }

    #[test]
    fn test_one_two_takes_title() {
        let out = evaluate(1, 2, &abc(), 0, None);
        assert_eq!(out.title_holder, Some(0));
        assert!(out.events.contains(&RuleEvent::NewThreeMan {
            player: "A".into()
        }));
        assert_eq!(out.total, 3);
    }

    #[test]
    fn test_holder_drinks_per_three() {
        let out = evaluate(3, 4, &abc(), 0, Some(1));
        assert_eq!(out.messages()[0], "B DRINKS 1");
        assert_eq!(out.title_holder, Some(1));
    }

    #[test]
    fn test_double_threes_holder_drinks_two() {
        let out = evaluate(3, 3, &abc(), 0, Some(2));
        assert_eq!(
            out.events,
            vec![
                RuleEvent::ThreeManDrinks {
                    player: "C".into(),
                    drinks: 2
                },
                RuleEvent::DoubleThrees,
            ]
        );
    }

    #[test]
    fn test_sum_of_three_penalizes_old_holder_before_transfer() {
        // Holder B drinks for the 1+2, then A takes the title
        let out = evaluate(2, 1, &abc(), 0, Some(1));
        assert_eq!(out.messages(), vec!["B DRINKS 1", "NEW THREE MAN! A"]);
        assert_eq!(out.title_holder, Some(0));
    }

    #[test]
    fn test_no_holder_no_penalty() {
        let out = evaluate(3, 5, &abc(), 0, None);
        assert!(out.events.is_empty());
        assert_eq!(out.title_holder, None);
    }

    #[test]
    fn test_doubles_flavor_only_for_odd_faces() {
        let players = abc();
        assert!(evaluate(1, 1, &players, 0, None).events.contains(&RuleEvent::SnakeEyes));
        assert!(evaluate(5, 5, &players, 0, None).events.contains(&RuleEvent::DoubleFives));
        let out = evaluate(2, 2, &players, 0, None);
        // 2+2 = 4 is social, but there is no doubles flavor for 2s
        assert_eq!(out.events, vec![RuleEvent::Social]);
        assert!(out.is_doubles());
        assert_eq!(doubles_drinks(2), 4);
        assert!(evaluate(6, 6, &players, 0, None).events.is_empty());
    }

    #[test]
    fn test_social_fires_once_for_double_fours() {
        let out = evaluate(4, 4, &abc(), 0, None);
        let socials = out.events.iter().filter(|e| **e == RuleEvent::Social).count();
        assert_eq!(socials, 1);
    }

    #[test]
    fn test_social_from_single_four_or_sum() {
        assert!(evaluate(4, 6, &abc(), 0, None).events.contains(&RuleEvent::Social));
        assert!(evaluate(1, 3, &abc(), 0, None).events.contains(&RuleEvent::Social));
    }

    #[test]
    fn test_seven_names_predecessor() {
        let out = evaluate(3, 4, &abc(), 2, None);
        assert!(out.events.contains(&RuleEvent::LeftDrinks {
            player: "B".into()
        }));
        // Wraps from the first seat to the last
        let out = evaluate(2, 5, &abc(), 0, None);
        assert_eq!(out.messages(), vec!["C (LEFT) DRINKS"]);
    }

    #[test]
    fn test_eleven_names_successor() {
        let out = evaluate(5, 6, &abc(), 2, None);
        assert_eq!(out.messages(), vec!["A (RIGHT) DRINKS"]);
    }

    #[test]
    fn test_summary() {
        let out = evaluate(5, 6, &abc(), 0, None);
        assert_eq!(out.summary(), "ROLLED 5 & 6\nB (RIGHT) DRINKS");
        let quiet = evaluate(6, 5, &abc(), 0, None);
        assert!(quiet.summary().starts_with("ROLLED 6 & 5"));
        assert_eq!(evaluate(2, 6, &abc(), 0, None).summary(), "ROLLED 2 & 6");
    }

    proptest! {
        #[test]
        fn prop_evaluate_is_pure(
            a in 1u8..=6,
            b in 1u8..=6,
            n in 2usize..8,
            turn_seed in 0usize..64,
            holder_seed in proptest::option::of(0usize..64),
        ) {
            let players: Vec<Player> = (0..n).map(|i| Player::new(format!("P{i}"))).collect();
            let before = players.clone();
            let turn = turn_seed % n;
            let holder = holder_seed.map(|h| h % n);
            let first = evaluate(a, b, &players, turn, holder);
            let second = evaluate(a, b, &players, turn, holder);
            prop_assert_eq!(first, second);
            prop_assert_eq!(players, before);
        }

        #[test]
        fn prop_title_transfers_iff_one_two(
            a in 1u8..=6,
            b in 1u8..=6,
            turn in 0usize..3,
            holder in proptest::option::of(0usize..3),
        ) {
            let out = evaluate(a, b, &abc(), turn, holder);
            let one_two = (a == 1 && b == 2) || (a == 2 && b == 1);
            let transferred = out
                .events
                .iter()
                .any(|e| matches!(e, RuleEvent::NewThreeMan { .. }));
            prop_assert_eq!(transferred, one_two);
            if one_two {
                prop_assert_eq!(out.title_holder, Some(turn));
            } else {
                prop_assert_eq!(out.title_holder, holder);
            }
        }
    }
}
