#![forbid(unsafe_code)]

//! One event-loop turn: mutation delivery, then pull resolution.

use tracing::{debug, trace};
use yrf_bus::Bus;
use yrf_core::Document;

use crate::error::FrameError;
use crate::factory::Factory;

/// Drives queued work of one document and one bus.
#[derive(Debug, Clone)]
pub struct EventLoop {
    doc: Document,
    bus: Bus,
    max_turns: usize,
}

impl EventLoop {
    #[must_use]
    pub fn new(factory: &Factory) -> Self {
        Self {
            doc: factory.document().clone(),
            bus: factory.bus().clone(),
            max_turns: factory.config().max_idle_turns,
        }
    }

    /// Deliver pending mutation records, then resolve pending pull
    /// publications. Returns the number of items processed.
    ///
    /// # Errors
    ///
    /// A listener failure while resolving a pull publication.
    pub fn turn(&self) -> Result<usize, FrameError> {
        let records = self.doc.deliver_mutations();
        let resolved = self.bus.drain_pending()?;
        trace!(records, resolved, "event loop turn");
        Ok(records + resolved)
    }

    /// Run turns until one finds no work. Returns the total processed.
    ///
    /// # Errors
    ///
    /// As [`turn`](Self::turn), or [`FrameError::NotIdle`] when work keeps
    /// arriving past the configured turn limit.
    pub fn run_until_idle(&self) -> Result<usize, FrameError> {
        let mut total = 0;
        for _ in 0..self.max_turns {
            let done = self.turn()?;
            if done == 0 {
                debug!(total, "event loop idle");
                return Ok(total);
            }
            total += done;
        }
        Err(FrameError::NotIdle {
            turns: self.max_turns,
        })
    }
}
