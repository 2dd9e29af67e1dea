//! Wake-chain traversal
//!
//! Wake panels live in a flat arena; each panel links to its neighbours
//! through `upstream`/`downstream` indices. Every trailing panel's chain
//! is finite and must terminate: traversal is capped at the arena size,
//! and [`check_chains`] verifies the no-cycle invariant when an analysis
//! is set up (debug builds assert on it).

use crate::panel::Panel;
use crate::vector::Vector3;

/// Iterator over a wake column, from the leading panel to the terminus.
///
/// Yields at most `wake_panels.len()` panels, so a corrupt chain cannot
/// loop forever; the skipped contribution is the release-mode outcome of
/// a topology violation.
pub struct WakeChain<'a> {
    wake_panels: &'a [Panel],
    next: Option<usize>,
    steps: usize,
}

impl<'a> WakeChain<'a> {
    /// Starts a traversal at the chain head `start`.
    pub fn new(wake_panels: &'a [Panel], start: usize) -> Self {
        Self {
            wake_panels,
            next: (start < wake_panels.len()).then_some(start),
            steps: 0,
        }
    }
}

impl<'a> Iterator for WakeChain<'a> {
    type Item = &'a Panel;

    fn next(&mut self) -> Option<&'a Panel> {
        let index = self.next?;
        if self.steps >= self.wake_panels.len() {
            return None;
        }
        self.steps += 1;
        let panel = &self.wake_panels[index];
        self.next = panel.downstream.filter(|&d| d < self.wake_panels.len());
        Some(panel)
    }
}

/// Verifies that every wake chain headed by a trailing panel terminates
/// within the arena, without revisiting a panel. Returns the offending
/// trailing-panel index on failure.
pub fn check_chains(panels: &[Panel], wake_panels: &[Panel]) -> Result<(), usize> {
    let mut visited = vec![false; wake_panels.len()];
    for p in panels.iter().filter(|p| p.is_trailing) {
        let head = match p.wake {
            Some(head) if head < wake_panels.len() => head,
            Some(_) => return Err(p.index),
            // trailing panel with no wake: the wake has not been built yet
            None => continue,
        };
        for v in visited.iter_mut() {
            *v = false;
        }
        let mut index = Some(head);
        let mut steps = 0;
        while let Some(i) = index {
            if i >= wake_panels.len() || visited[i] || steps > wake_panels.len() {
                return Err(p.index);
            }
            visited[i] = true;
            steps += 1;
            index = wake_panels[i].downstream;
        }
    }
    Ok(())
}

/// The terminal panel of the wake column starting at `start`.
pub fn terminal_panel<'a>(wake_panels: &'a [Panel], start: usize) -> Option<&'a Panel> {
    WakeChain::new(wake_panels, start).last()
}

/// Left and right mid-points of the wake column: halfway between the
/// head panel's leading nodes and the terminal panel's trailing nodes.
pub fn mid_wake_points(wake_panels: &[Panel], start: usize) -> Option<(Vector3, Vector3)> {
    let head = wake_panels.get(start)?;
    // under the builder conventions the head panel's upstream edge runs
    // from vertex 0 (left) to vertex 2 (right) on both sides
    let (lead_left, lead_right) = (head.vertices[0], head.vertices[2]);

    let terminal = terminal_panel(wake_panels, start)?;
    let trail_left = terminal.left_trailing_node();
    let trail_right = terminal.right_trailing_node();

    Some((
        (lead_left + trail_left) * 0.5,
        (lead_right + trail_right) * 0.5,
    ))
}

/// Trailing nodes of the wake column terminus.
pub fn trailing_wake_points(wake_panels: &[Panel], start: usize) -> Option<(Vector3, Vector3)> {
    let terminal = terminal_panel(wake_panels, start)?;
    Some((terminal.left_trailing_node(), terminal.right_trailing_node()))
}
