use chrono::{DateTime, Utc};

use crate::session::DriverSession;

/// One planned contiguous copy from a source block into the final series.
///
/// Sources are addressed by index, never by pointer, so the plan stays
/// valid regardless of how session storage moves around before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOp {
    /// Index of the source session in the build's session list.
    pub source: usize,
    /// Index of the block within the session.
    pub block: usize,
    /// First bar of the run within the block.
    pub start: usize,
    /// Number of bars copied by this op.
    pub len: usize,
}

/// The ordered copy plan produced by the merge, plus the final bar count.
///
/// The sum of all op lengths equals `nb_bars`, which bounds assembly cost
/// to O(total bars) regardless of source count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// Copy operations in output order.
    pub ops: Vec<MergeOp>,
    /// Number of bars the plan emits.
    pub nb_bars: usize,
}

struct Cursor {
    source: usize,
    block: usize,
    index: usize,
    ts: DateTime<Utc>,
}

impl Cursor {
    fn advance(&mut self, session: &DriverSession) -> bool {
        self.index += 1;
        while let Some(block) = session.blocks.get(self.block) {
            if self.index < block.nb_bars() {
                self.ts = block.timestamp[self.index];
                return true;
            }
            self.block += 1;
            self.index = 0;
        }
        false
    }
}

/// Plan the N-way, timestamp-ordered merge across all session blocks.
///
/// At each step the globally smallest cursor timestamp is selected; when
/// several sessions share the exact instant, the earliest attached one
/// supplies the bar and the later ones skip past it, so no source is ever
/// permanently starved. Consecutive picks from the same block coalesce
/// into a single op. Sessions that supply at least one output bar are
/// marked contributing.
pub fn plan_merge(sessions: &mut [DriverSession]) -> MergePlan {
    let mut cursors: Vec<Cursor> = sessions
        .iter()
        .enumerate()
        .filter_map(|(i, s)| {
            let block = s.blocks.iter().position(|b| b.nb_bars() > 0)?;
            Some(Cursor {
                source: i,
                block,
                index: 0,
                ts: s.blocks[block].timestamp[0],
            })
        })
        .collect();

    let mut plan = MergePlan::default();
    while !cursors.is_empty() {
        // Cursors are in attach order, so the first minimum wins ties.
        let (winner_pos, _) = cursors
            .iter()
            .enumerate()
            .min_by_key(|(pos, c)| (c.ts, *pos))
            .expect("cursors is non-empty");
        let winner_ts = cursors[winner_pos].ts;

        {
            let cursor = &cursors[winner_pos];
            sessions[cursor.source].contributing = true;
            match plan.ops.last_mut() {
                Some(op)
                    if op.source == cursor.source
                        && op.block == cursor.block
                        && op.start + op.len == cursor.index =>
                {
                    op.len += 1;
                }
                _ => plan.ops.push(MergeOp {
                    source: cursor.source,
                    block: cursor.block,
                    start: cursor.index,
                    len: 1,
                }),
            }
            plan.nb_bars += 1;
        }

        // Advance the winner, then skip every other session sitting on the
        // same instant; their bars for this timestamp are not emitted.
        let mut dead: Vec<usize> = Vec::new();
        for (pos, cursor) in cursors.iter_mut().enumerate() {
            if pos == winner_pos || cursor.ts == winner_ts {
                let session = &sessions[cursor.source];
                if !cursor.advance(session) {
                    dead.push(pos);
                }
            }
        }
        for pos in dead.into_iter().rev() {
            cursors.remove(pos);
        }
    }
    plan
}
