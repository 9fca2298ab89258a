/// Receives the fraction of a region processed so far, in `0.0..=1.0`.
pub trait Progress {
    fn advance(&mut self, fraction: f64);
}

impl<F: FnMut(f64)> Progress for F {
    fn advance(&mut self, fraction: f64) {
        self(fraction)
    }
}

/// Discards progress reports
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&mut self, _fraction: f64) {}
}
