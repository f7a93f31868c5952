// src/redraw.rs
// Recursion guard for nested redraw requests and interruptible draw passes
// RELEVANT FILES: src/overlay/world.rs, src/config.rs

use log::debug;

/// Tracks nested redraws so that only the outermost completed one presents.
///
/// Nested calls still do their own work; a pass that finishes while an outer
/// pass is running marks the frame presented and the outer pass skips its
/// own present.
#[derive(Debug, Default)]
pub struct RedrawGuard {
    recursion: u32,
    plot_done: bool,
    presented: u64,
}

/// How a guarded draw pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// All rows drawn and the frame presented by this call
    Presented,
    /// All rows drawn; a nested call had already presented
    AlreadyPresented,
    /// The interrupt callback stopped the pass early
    Interrupted { rows_drawn: usize },
}

impl RedrawGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting depth.
    pub fn depth(&self) -> u32 {
        self.recursion
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Run a redraw: `work` does the drawing and may re-enter the guard.
    ///
    /// `present` is invoked only when no nested call presented first.
    pub fn run<W, P>(&mut self, work: W, present: P) -> bool
    where
        W: FnOnce(&mut Self),
        P: FnOnce(),
    {
        self.plot_done = false;
        self.recursion += 1;
        work(self);
        let presented = if !self.plot_done {
            present();
            self.presented += 1;
            self.plot_done = true;
            true
        } else {
            false
        };
        self.recursion -= 1;
        presented
    }

    /// Draw `rows` rows with `draw_row`, polling `interrupted` every
    /// `check_every` rows, then present unless a nested call already did.
    pub fn draw_rows<D, I, P>(
        &mut self,
        rows: usize,
        check_every: usize,
        mut draw_row: D,
        mut interrupted: I,
        present: P,
    ) -> DrawOutcome
    where
        D: FnMut(&mut Self, usize),
        I: FnMut() -> bool,
        P: FnOnce(),
    {
        let check_every = check_every.max(1);
        let mut stopped_at = None;
        let presented = self.run(
            |guard| {
                for row in 0..rows {
                    if row > 0 && row % check_every == 0 && interrupted() {
                        debug!("Draw pass interrupted after {} of {} rows", row, rows);
                        stopped_at = Some(row);
                        // the partial frame is not presented
                        guard.plot_done = true;
                        return;
                    }
                    draw_row(guard, row);
                }
            },
            present,
        );
        match (stopped_at, presented) {
            (Some(rows_drawn), _) => DrawOutcome::Interrupted { rows_drawn },
            (None, true) => DrawOutcome::Presented,
            (None, false) => DrawOutcome::AlreadyPresented,
        }
    }
}
