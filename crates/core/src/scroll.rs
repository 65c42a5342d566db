//! Scroll mirroring between the frozen header row and the grid body.
//!
//! Both regions scroll independently; the mirror keeps their horizontal
//! offsets aligned. Two protections against feedback:
//! - a reentrancy guard, so the echo event caused by a propagated write
//!   does not propagate back, and
//! - a ≤1 unit threshold, treating near-equal offsets as already synced
//!   (fractional layout rounding would otherwise ping-pong corrections).

/// Offsets closer than this are considered synchronized.
const SYNC_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Header,
    Body,
}

/// Mirrors scroll offsets between header and body without oscillation.
#[derive(Debug, Clone)]
pub struct ScrollMirror {
    header: f64,
    body: f64,
    /// Set while a propagated write is in flight; the next event from the
    /// written region is the echo and must not propagate back.
    sync_owner: Option<Region>,
}

impl Default for ScrollMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollMirror {
    pub fn new() -> Self {
        Self {
            header: 0.0,
            body: 0.0,
            sync_owner: None,
        }
    }

    pub fn header_offset(&self) -> f64 {
        self.header
    }

    pub fn body_offset(&self) -> f64 {
        self.body
    }

    /// The header scrolled. Returns the offset to write to the body, or
    /// None when the body is already in sync (or this event is an echo).
    pub fn header_scrolled(&mut self, offset: f64) -> Option<f64> {
        self.header = offset;
        self.propagate(Region::Header, offset)
    }

    /// The body scrolled. Returns the offset to write to the header.
    pub fn body_scrolled(&mut self, offset: f64) -> Option<f64> {
        self.body = offset;
        self.propagate(Region::Body, offset)
    }

    fn propagate(&mut self, source: Region, offset: f64) -> Option<f64> {
        // Echo of our own write: swallow it and release the guard.
        if self.sync_owner == Some(source) {
            self.sync_owner = None;
            return None;
        }

        let other = match source {
            Region::Header => self.body,
            Region::Body => self.header,
        };
        if (other - offset).abs() <= SYNC_THRESHOLD {
            return None;
        }

        // Claim the guard for the region we are about to write.
        self.sync_owner = Some(match source {
            Region::Header => Region::Body,
            Region::Body => Region::Header,
        });
        Some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_scroll_propagates_to_body() {
        let mut m = ScrollMirror::new();
        assert_eq!(m.header_scrolled(120.0), Some(120.0));
    }

    #[test]
    fn test_echo_does_not_propagate_back() {
        let mut m = ScrollMirror::new();
        let write = m.header_scrolled(120.0).unwrap();

        // Applying the write fires a body scroll event: the echo.
        assert_eq!(m.body_scrolled(write), None);
        assert_eq!(m.body_offset(), 120.0);

        // Guard released: a genuine body scroll propagates again.
        assert_eq!(m.body_scrolled(240.0), Some(240.0));
    }

    #[test]
    fn test_within_threshold_is_no_op() {
        let mut m = ScrollMirror::new();
        m.header_scrolled(119.0);
        m.body_scrolled(119.0); // echo

        // Header at 120 while body sits at 119: already synchronized.
        assert_eq!(m.header_scrolled(120.0), None);
    }

    #[test]
    fn test_alternating_scrolls_settle() {
        let mut m = ScrollMirror::new();
        let w = m.body_scrolled(300.0).unwrap();
        assert_eq!(m.header_scrolled(w), None); // echo
        assert_eq!(m.header_scrolled(300.5), None); // within threshold
        assert_eq!(m.body_scrolled(300.0), None); // still in sync
    }
}
