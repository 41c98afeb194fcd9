//! TickRegistry
//!
//! Owns one `TickBuffer` per configured instrument, in configured order.
//! The ingestion path is the only writer; the cycle driver takes
//! per-instrument snapshots. Each buffer sits behind its own mutex so a
//! push on one instrument never waits for a snapshot of another.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::IngestError;
use crate::tick_buffer::TickBuffer;
use crate::types::{Instrument, Tick};

struct Slot {
    instrument: Instrument,
    buffer: Mutex<TickBuffer>,
}

/// Point-in-time copy of one instrument's history.
#[derive(Debug, Clone)]
pub struct InstrumentSnapshot {
    pub instrument: Instrument,
    pub ticks: Vec<Tick>,
}

pub struct TickRegistry {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
}

impl TickRegistry {
    /// Duplicate symbols keep their first position.
    pub fn new(instruments: impl IntoIterator<Item = Instrument>, capacity: usize) -> Self {
        let mut slots = Vec::new();
        let mut index = HashMap::new();

        for instrument in instruments {
            if index.contains_key(&instrument.symbol) {
                continue;
            }
            index.insert(instrument.symbol.clone(), slots.len());
            slots.push(Slot {
                instrument,
                buffer: Mutex::new(TickBuffer::new(capacity)),
            });
        }

        Self { slots, index }
    }

    /// Append a tick to its instrument's buffer, returning the new length.
    pub fn push(&self, tick: Tick) -> Result<usize, IngestError> {
        let Some(&idx) = self.index.get(&tick.symbol) else {
            return Err(IngestError::UnknownSymbol(tick.symbol));
        };

        let mut buf = self.slots[idx].buffer.lock();
        buf.push(tick);
        Ok(buf.len())
    }

    pub fn snapshot(&self, symbol: &str) -> Option<Vec<Tick>> {
        let idx = *self.index.get(symbol)?;
        Some(self.slots[idx].buffer.lock().snapshot())
    }

    /// Snapshots of every instrument in configured order.
    ///
    /// Buffers are locked one at a time, so instruments may be captured at
    /// slightly different moments.
    pub fn snapshot_all(&self) -> Vec<InstrumentSnapshot> {
        self.slots
            .iter()
            .map(|slot| InstrumentSnapshot {
                instrument: slot.instrument.clone(),
                ticks: slot.buffer.lock().snapshot(),
            })
            .collect()
    }

    pub fn len_of(&self, symbol: &str) -> Option<usize> {
        let idx = *self.index.get(symbol)?;
        Some(self.slots[idx].buffer.lock().len())
    }

    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.slots.iter().map(|s| &s.instrument)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.instruments().map(|i| i.symbol.clone()).collect()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }
}
