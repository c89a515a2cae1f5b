//! Fixed-width tag arithmetic: range narrowing and E1/E2/E3 rescaling.
//!
//! The encoder and decoder each own a `TagCoder` holding the word-size-bit
//! `lower`/`upper` registers. Narrowing maps a symbol's cumulative count
//! range into the current tag interval with exact integer arithmetic; any
//! rounding discrepancy between the two sides desynchronizes the stream,
//! so both use the same u64-widened floor divisions.
//!
//! Rescaling shifts out settled high-order bits: E1 (interval in the lower
//! half) and E2 (upper half) emit/consume the shared top bit, E3 (interval
//! squeezed into the middle half) defers a complement bit and complements
//! the top bit of every register. The emit and consume variants must stay
//! perfectly symmetric — they differ only in bit direction.

use crate::bitio::{BitSink, BitSource};
use crate::error::Result;

/// Tag registers plus the deferred-bit count owed from E3 scaling.
#[derive(Clone, Debug)]
pub(crate) struct TagCoder {
    word_size: u32,
    mask: u32,
    msb: u32,
    second_msb: u32,
    pub(crate) lower: u32,
    pub(crate) upper: u32,
    e3_pending: u32,
}

impl TagCoder {
    /// `word_size` is validated by the session constructors.
    pub(crate) fn new(word_size: u32) -> Self {
        let mask = (1u32 << word_size) - 1;
        Self {
            word_size,
            mask,
            msb: 1 << (word_size - 1),
            second_msb: 1 << (word_size - 2),
            lower: 0,
            upper: mask,
            e3_pending: 0,
        }
    }

    /// Reinitialize to the full interval at session start.
    pub(crate) fn reset(&mut self) {
        self.lower = 0;
        self.upper = self.mask;
        self.e3_pending = 0;
    }

    /// Narrow the interval to a symbol's cumulative count range
    /// `[cum_exclusive, cum_inclusive)` out of `total`.
    pub(crate) fn narrow(&mut self, cum_exclusive: u32, cum_inclusive: u32, total: u32) {
        let span = u64::from(self.upper - self.lower) + 1;
        let base = u64::from(self.lower);
        let total = u64::from(total);

        self.upper = (base + span * u64::from(cum_inclusive) / total - 1) as u32;
        self.lower = (base + span * u64::from(cum_exclusive) / total) as u32;
    }

    fn same_msb(&self) -> bool {
        (self.lower & self.msb) == (self.upper & self.msb)
    }

    fn in_middle(&self) -> bool {
        (self.upper & self.second_msb) == 0 && (self.lower & self.second_msb) != 0
    }

    /// Encoder-side rescale: emit settled bits until neither condition
    /// holds. Termination is guaranteed by `4 * max_total <= 2^word_size`.
    pub(crate) fn rescale_emit(&mut self, sink: &mut BitSink<'_>) -> Result<()> {
        while self.same_msb() || self.in_middle() {
            if self.same_msb() {
                let bit = (self.lower & self.msb) >> (self.word_size - 1);
                sink.push(bit)?;
                self.lower = (self.lower << 1) & self.mask;
                self.upper = ((self.upper << 1) | 1) & self.mask;

                while self.e3_pending > 0 {
                    sink.push(bit ^ 1)?;
                    self.e3_pending -= 1;
                }
            } else {
                self.lower = ((self.lower << 1) & self.mask) ^ self.msb;
                self.upper = ((self.upper << 1) & self.mask) ^ self.msb;
                self.e3_pending += 1;
            }
        }
        Ok(())
    }

    /// Decoder-side rescale: the exact mirror of `rescale_emit`, shifting
    /// stream bits into `current` instead of emitting them.
    pub(crate) fn rescale_consume(
        &mut self,
        current: &mut u32,
        source: &mut BitSource<'_>,
    ) -> Result<()> {
        while self.same_msb() || self.in_middle() {
            if self.same_msb() {
                self.lower = (self.lower << 1) & self.mask;
                self.upper = ((self.upper << 1) | 1) & self.mask;
                *current = ((*current << 1) | source.next_bit()?) & self.mask;
            } else {
                self.lower = ((self.lower << 1) & self.mask) ^ self.msb;
                self.upper = ((self.upper << 1) & self.mask) ^ self.msb;
                *current = (((*current << 1) | source.next_bit()?) & self.mask) ^ self.msb;
            }
        }
        Ok(())
    }

    /// The scaled cumulative count encoded by `current` within the present
    /// interval; the algebraic inverse of `narrow`.
    pub(crate) fn decode_target(&self, current: u32, total: u32) -> u32 {
        let offset = u64::from(current - self.lower) + 1;
        let span = u64::from(self.upper - self.lower) + 1;
        ((offset * u64::from(total) - 1) / span) as u32
    }

    /// Emit a full tag value MSB-first to terminate a chunk, honoring any
    /// pending E3 complement bits exactly as rescaling would.
    pub(crate) fn flush_tag(&mut self, tag: u32, sink: &mut BitSink<'_>) -> Result<()> {
        for i in 0..self.word_size {
            let bit = (tag >> (self.word_size - 1 - i)) & 1;
            sink.push(bit)?;

            while self.e3_pending > 0 {
                sink.push(bit ^ 1)?;
                self.e3_pending -= 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitted_bits(tag: &mut TagCoder) -> Vec<u32> {
        let mut buf = [0u8; 16];
        let written = {
            let mut sink = BitSink::new(&mut buf, 16);
            tag.rescale_emit(&mut sink).unwrap();
            sink.finish().unwrap()
        };
        let mut source = BitSource::new(&buf, written);
        let mut bits = Vec::new();
        while let Ok(bit) = source.next_bit() {
            bits.push(bit);
        }
        bits
    }

    #[test]
    fn test_narrow_matches_floor_formula() {
        let mut tag = TagCoder::new(8);
        // full range [0, 255], symbol occupying [1, 3) of total 4
        tag.narrow(1, 3, 4);
        assert_eq!(tag.lower, 64);
        assert_eq!(tag.upper, 191);
    }

    #[test]
    fn test_narrow_keeps_lower_at_most_upper() {
        let mut tag = TagCoder::new(4);
        tag.narrow(0, 1, 4);
        assert!(tag.lower <= tag.upper);
        assert_eq!(tag.lower, 0);
        assert_eq!(tag.upper, 3);
    }

    #[test]
    fn test_rescale_emits_settled_bit_then_e3_defers() {
        let mut tag = TagCoder::new(4);
        tag.lower = 0b0010;
        tag.upper = 0b0101;
        // E1 emits the shared 0, then the range straddles the midpoint
        let bits = emitted_bits(&mut tag);
        // partial-byte padding means trailing zeros; the settled bit leads
        assert_eq!(bits[0], 0);
        assert_eq!(tag.lower, 0b0000);
        assert_eq!(tag.upper, 0b1110);
        assert_eq!(tag.e3_pending, 1);
    }

    #[test]
    fn test_rescale_noop_when_range_wide() {
        let mut tag = TagCoder::new(8);
        let mut buf = [0u8; 4];
        let mut sink = BitSink::new(&mut buf, 4);
        tag.rescale_emit(&mut sink).unwrap();
        assert_eq!(sink.finish().unwrap(), 0);
        assert_eq!(tag.lower, 0);
        assert_eq!(tag.upper, 255);
    }

    #[test]
    fn test_rescale_consume_mirrors_emit() {
        // Drive the encoder side, then replay its output through the
        // decoder side starting from the same registers.
        let mut enc = TagCoder::new(6);
        enc.lower = 0b000110;
        enc.upper = 0b011010;

        let mut buf = [0u8; 8];
        let written = {
            let mut sink = BitSink::new(&mut buf, 8);
            enc.rescale_emit(&mut sink).unwrap();
            sink.finish().unwrap()
        };

        let mut dec = TagCoder::new(6);
        dec.lower = 0b000110;
        dec.upper = 0b011010;
        let mut current = 0b001000u32;
        let mut source = BitSource::new(&buf, written.max(1));
        dec.rescale_consume(&mut current, &mut source).unwrap();

        assert_eq!(enc.lower, dec.lower);
        assert_eq!(enc.upper, dec.upper);
        assert!(dec.lower <= current && current <= dec.upper);
    }

    #[test]
    fn test_decode_target_inverts_narrow() {
        let tag = TagCoder::new(8);
        // a symbol with bounds [2, 5) of 8 narrows the full range to
        // [64, 159]; every current in that span must map back into [2, 5)
        for current in 64..=159 {
            let scaled = tag.decode_target(current, 8);
            assert!((2..5).contains(&scaled), "current={current} scaled={scaled}");
        }
        assert_eq!(tag.decode_target(63, 8), 1);
        assert_eq!(tag.decode_target(160, 8), 5);
    }

    #[test]
    fn test_flush_tag_drains_pending_e3_after_first_bit() {
        let mut tag = TagCoder::new(4);
        tag.e3_pending = 2;

        let mut buf = [0u8; 2];
        let written = {
            let mut sink = BitSink::new(&mut buf, 2);
            tag.flush_tag(0b1010, &mut sink).unwrap();
            sink.finish().unwrap()
        };

        let mut source = BitSource::new(&buf, written);
        let bits: Vec<u32> = (0..6).map(|_| source.next_bit().unwrap()).collect();
        // tag bit 1, two complements, then the remaining tag bits 0 1 0
        assert_eq!(bits, vec![1, 0, 0, 0, 1, 0]);
        assert_eq!(tag.e3_pending, 0);
    }
}
