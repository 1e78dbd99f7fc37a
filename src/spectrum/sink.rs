// SPDX-License-Identifier: GPL-3.0-only

//! Output sinks for per-frame sample sequences

/// Append-only numeric sequence, cleared once per frame
pub trait SampleSink {
    fn clear(&mut self);
    fn append(&mut self, value: f64);
}

impl SampleSink for Vec<f64> {
    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn append(&mut self, value: f64) {
        self.push(value);
    }
}
