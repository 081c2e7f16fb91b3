//! G-Code Optimizer
//!
//! Removes dead repositioning moves from an emitted program. A horizontal
//! travel followed (possibly after comments) by another horizontal travel
//! never reaches anything, so only the last travel of such a run is kept
//! as a move; the earlier ones stay in the program as comments.

use crate::pattern::Pattern;
use pathkit_core::{GCode, GCodeKind};
use tracing::debug;

/// G-code optimization strategies
#[derive(Debug)]
pub struct GCodeOptimizer;

impl GCodeOptimizer {
    fn dead_travel_pattern() -> Pattern<char> {
        let travel = GCodeKind::HorizontalTravel.tag();
        let comment = GCodeKind::Comment.tag();
        Pattern::seq(vec![
            Pattern::one_or_more(Pattern::seq(vec![
                Pattern::Leaf(travel),
                Pattern::zero_or_more(Pattern::Leaf(comment)),
            ])),
            Pattern::Leaf(travel),
        ])
    }

    /// Turns every travel that is immediately superseded by another travel
    /// into a comment.
    pub fn remove_dead_travels(codes: Vec<GCode>) -> Vec<GCode> {
        let pattern = Self::dead_travel_pattern();
        let mut codes = codes;
        let mut tags: Vec<char> = codes.iter().map(GCode::tag).collect();
        let mut from = 0;
        let mut removed = 0;

        // Each rewrite removes at least one travel, which bounds the loop
        for _ in 0..=codes.len() {
            let Some((start, end)) = pattern.find(&tags, from) else {
                break;
            };
            for i in start..end - 1 {
                if tags[i] == GCodeKind::HorizontalTravel.tag() {
                    codes[i] = codes[i].clone().into_comment();
                    tags[i] = GCodeKind::Comment.tag();
                    removed += 1;
                }
            }
            from = start;
        }

        if removed > 0 {
            debug!("optimizer: {} dead travels removed", removed);
        }
        codes
    }

    /// Optimize G-code
    pub fn optimize(codes: Vec<GCode>) -> Vec<GCode> {
        Self::remove_dead_travels(codes)
    }
}
