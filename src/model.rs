//! Order-1/order-0/base context model with escape fallback and exclusion.
//!
//! Three table roles in fixed precedence. A first-order table (one per
//! context symbol, created lazily) is tried first; unknown symbols escape
//! to the shared zero-order table; symbols the session has never seen
//! anywhere escape again to the base table, a uniform distribution over
//! the raw alphabet. Once the base table resolves a symbol, its entry is
//! decremented (and removed at zero), so a symbol promoted into the
//! zero-order table is never coded from the base table again.
//!
//! Encoder and decoder run the same mutation sequence at every level —
//! narrow, count update, rescale, with the novel symbol inserted into the
//! escaping table only after the fallback chain resolves it — so both
//! sides' statistics stay in lockstep, including the points at which
//! normalization fires.

use crate::bitio::{BitSink, BitSource};
use crate::error::{Error, Result};
use crate::freq::{FrequencyTable, Lookup};
use crate::tag::TagCoder;

struct ContextSlot {
    symbol: i32,
    table: FrequencyTable,
}

/// Adaptive statistics for one encode or decode session.
pub(crate) struct ContextModel {
    base: FrequencyTable,
    zero_order: FrequencyTable,
    contexts: Vec<ContextSlot>,
    alphabet_size: u32,
    max_total: u32,
}

/// Narrow to the entry's range, record the observation, rescale (encoder).
fn emit_entry(
    table: &mut FrequencyTable,
    index: usize,
    tag: &mut TagCoder,
    sink: &mut BitSink<'_>,
) -> Result<()> {
    let (lo, hi) = table.cumulative_bounds(index);
    tag.narrow(lo, hi, table.total());
    table.increment(index);
    tag.rescale_emit(sink)
}

/// Narrow to the entry's range, record the observation, rescale (decoder).
fn consume_entry(
    table: &mut FrequencyTable,
    index: usize,
    tag: &mut TagCoder,
    current: &mut u32,
    source: &mut BitSource<'_>,
) -> Result<()> {
    let (lo, hi) = table.cumulative_bounds(index);
    tag.narrow(lo, hi, table.total());
    table.increment(index);
    tag.rescale_consume(current, source)
}

impl ContextModel {
    pub(crate) fn new(alphabet_size: u32, max_total: u32) -> Self {
        Self {
            base: FrequencyTable::uniform(alphabet_size, max_total),
            zero_order: FrequencyTable::with_escape(max_total),
            contexts: Vec::new(),
            alphabet_size,
            max_total,
        }
    }

    /// Discard all learned statistics.
    pub(crate) fn reset(&mut self) {
        self.base = FrequencyTable::uniform(self.alphabet_size, self.max_total);
        self.zero_order = FrequencyTable::with_escape(self.max_total);
        self.contexts.clear();
    }

    fn context_index(&self, context: i32) -> Option<usize> {
        self.contexts.iter().position(|s| s.symbol == context)
    }

    /// Create the first-order table for a context on first encounter,
    /// seeded with only the escape entry.
    fn ensure_context(&mut self, symbol: i32) {
        if self.context_index(symbol).is_none() {
            self.contexts.push(ContextSlot {
                symbol,
                table: FrequencyTable::with_escape(self.max_total),
            });
        }
    }

    /// Cumulative bounds and total of the zero-order table's first entry,
    /// used for the statistics-free narrow at a non-final chunk flush.
    pub(crate) fn zero_order_head(&self) -> (u32, u32, u32) {
        let (lo, hi) = self.zero_order.cumulative_bounds(0);
        (lo, hi, self.zero_order.total())
    }

    /// Encode one symbol under the given context (the previous symbol, or
    /// none at the start of a chunk).
    pub(crate) fn encode_symbol(
        &mut self,
        context: Option<i32>,
        symbol: i32,
        tag: &mut TagCoder,
        sink: &mut BitSink<'_>,
    ) -> Result<()> {
        match context.and_then(|c| self.context_index(c)) {
            None => self.zero_order_encode(symbol, tag, sink)?,
            Some(ci) => match self.contexts[ci].table.lookup(symbol) {
                Lookup::Direct(index) => {
                    emit_entry(&mut self.contexts[ci].table, index, tag, sink)?;
                }
                Lookup::Escape => {
                    let escape = self.contexts[ci].table.escape_index();
                    emit_entry(&mut self.contexts[ci].table, escape, tag, sink)?;
                    self.zero_order_encode(symbol, tag, sink)?;
                    self.contexts[ci].table.insert_new(symbol);
                }
            },
        }

        self.ensure_context(symbol);
        Ok(())
    }

    fn zero_order_encode(
        &mut self,
        symbol: i32,
        tag: &mut TagCoder,
        sink: &mut BitSink<'_>,
    ) -> Result<()> {
        match self.zero_order.lookup(symbol) {
            Lookup::Direct(index) => emit_entry(&mut self.zero_order, index, tag, sink),
            Lookup::Escape => {
                let escape = self.zero_order.escape_index();
                emit_entry(&mut self.zero_order, escape, tag, sink)?;

                let base_index = self
                    .base
                    .find(symbol)
                    .ok_or(Error::InvalidSymbol(symbol))?;
                let (lo, hi) = self.base.cumulative_bounds(base_index);
                tag.narrow(lo, hi, self.base.total());
                self.base.decrement(base_index);
                tag.rescale_emit(sink)?;

                self.zero_order.insert_new(symbol);
                Ok(())
            }
        }
    }

    /// Decode one symbol under the given context; the structural inverse
    /// of `encode_symbol`.
    pub(crate) fn decode_symbol(
        &mut self,
        context: Option<i32>,
        tag: &mut TagCoder,
        current: &mut u32,
        source: &mut BitSource<'_>,
    ) -> Result<i32> {
        let symbol = match context.and_then(|c| self.context_index(c)) {
            None => self.zero_order_decode(tag, current, source)?,
            Some(ci) => {
                let scaled = tag.decode_target(*current, self.contexts[ci].table.total());
                let index = self.contexts[ci].table.resolve(scaled)?;

                if self.contexts[ci].table.is_escape(index) {
                    consume_entry(&mut self.contexts[ci].table, index, tag, current, source)?;
                    let symbol = self.zero_order_decode(tag, current, source)?;
                    self.contexts[ci].table.insert_new(symbol);
                    symbol
                } else {
                    let symbol = self.contexts[ci].table.symbol_at(index);
                    consume_entry(&mut self.contexts[ci].table, index, tag, current, source)?;
                    symbol
                }
            }
        };

        self.ensure_context(symbol);
        Ok(symbol)
    }

    fn zero_order_decode(
        &mut self,
        tag: &mut TagCoder,
        current: &mut u32,
        source: &mut BitSource<'_>,
    ) -> Result<i32> {
        let scaled = tag.decode_target(*current, self.zero_order.total());
        let index = self.zero_order.resolve(scaled)?;

        if self.zero_order.is_escape(index) {
            consume_entry(&mut self.zero_order, index, tag, current, source)?;

            if self.base.total() == 0 {
                return Err(Error::CorruptStream("escape with exhausted base table"));
            }
            let scaled = tag.decode_target(*current, self.base.total());
            let base_index = self.base.resolve(scaled)?;
            let symbol = self.base.symbol_at(base_index);
            let (lo, hi) = self.base.cumulative_bounds(base_index);
            tag.narrow(lo, hi, self.base.total());
            self.base.decrement(base_index);
            tag.rescale_consume(current, source)?;

            self.zero_order.insert_new(symbol);
            Ok(symbol)
        } else {
            let symbol = self.zero_order.symbol_at(index);
            consume_entry(&mut self.zero_order, index, tag, current, source)?;
            Ok(symbol)
        }
    }

    #[cfg(test)]
    pub(crate) fn base_total(&self) -> u32 {
        self.base.total()
    }

    #[cfg(test)]
    pub(crate) fn zero_order_count(&self, symbol: i32) -> Option<u32> {
        let index = self.zero_order.find(symbol)?;
        let (lo, hi) = self.zero_order.cumulative_bounds(index);
        Some(hi - lo)
    }
}
