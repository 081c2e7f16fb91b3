//! Path assembly.
//!
//! A path layer is drawn as an unordered set of elements plus one start and
//! one end mark. The assembler walks from the start, always continuing with
//! an element touching the current position, until it cannot go on.

use crate::segment::RawSegment;
use pathkit_core::{DiagContext, Diagnostics, PathName, Point2};
use tracing::debug;

/// Result of assembling one path layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    /// Route elements in travel order, each oriented to start where the
    /// previous one ended
    pub segments: Vec<RawSegment>,
    /// Probe elements, which are not part of the route
    pub probes: Vec<RawSegment>,
    /// False when a problem was reported
    pub complete: bool,
}

/// Orders the elements of one path layer into a continuous route.
///
/// Where several elements touch the current position, the one first in
/// [`RawSegment::branch_cmp`] order is taken. Problems are reported to
/// `diags`; the route placed so far is still returned.
pub fn assemble(
    path: &PathName,
    segments: Vec<RawSegment>,
    start: Point2,
    end: Point2,
    diags: &mut Diagnostics,
) -> Assembly {
    let (probes, route): (Vec<_>, Vec<_>) = segments.into_iter().partition(RawSegment::is_probe);
    let mut traversed = vec![false; route.len()];
    let mut placed: Vec<RawSegment> = Vec::with_capacity(route.len());
    let mut current = start;
    let mut complete = true;

    loop {
        let candidate = route
            .iter()
            .enumerate()
            .filter(|(i, seg)| {
                !traversed[*i] && (seg.start().coincides(&current) || seg.end().coincides(&current))
            })
            .min_by(|(_, a), (_, b)| a.branch_cmp(b))
            .map(|(i, _)| i);

        let Some(index) = candidate else {
            let left = traversed.iter().filter(|t| !**t).count();
            let context = placed
                .last()
                .map(|seg| seg.context(path))
                .unwrap_or_else(|| DiagContext::path(path));
            if current.coincides(&end) {
                if left > 0 {
                    diags.error(DiagContext::path(path), "{0} segments unreached", [left]);
                    complete = false;
                }
            } else {
                if left > 0 {
                    diags.error(context.clone(), "no further segment found at {0}", [current]);
                }
                diags.error(context, "lost end: route stops at {0}, end is at {1}", [current, end]);
                complete = false;
            }
            break;
        };

        traversed[index] = true;
        let segment = &route[index];
        let oriented = if segment.start().coincides(&current) {
            segment.clone()
        } else {
            segment.reversed()
        };
        debug!(
            "path {}: {} from {} to {}",
            path,
            oriented.kind_name(),
            oriented.start(),
            oriented.end()
        );
        current = oriented.end();
        placed.push(oriented);
    }

    Assembly {
        segments: placed,
        probes,
        complete,
    }
}
