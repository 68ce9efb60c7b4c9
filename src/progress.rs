use log::info;

/// Logs a percentage about once per percent of a long per-beer loop.
#[derive(Debug, Clone)]
pub struct Progress {
    max: usize,
    message: String,
    every: usize,
    done: usize,
}

impl Progress {
    pub fn new(max: usize, message: impl Into<String>) -> Self {
        Self {
            max,
            message: message.into(),
            every: (max / 100).max(1),
            done: 0,
        }
    }

    /// Call once per processed item.
    pub fn tick(&mut self) {
        if self.done % self.every == 0 {
            info!("{} {}%", self.message, self.percent());
        }
        self.done += 1;
        if self.done == self.max {
            info!("{} Done.", self.message);
        }
    }

    pub fn percent(&self) -> usize {
        if self.max == 0 {
            100
        } else {
            100 * self.done / self.max
        }
    }

    pub fn done(&self) -> usize {
        self.done
    }
}
