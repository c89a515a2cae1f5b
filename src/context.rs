//! Encode/decode sessions over bounded chunks of symbols.
//!
//! A session owns its adaptive tables and tag registers exclusively. One
//! logical stream may be split into several chunks: statistics and tag
//! range carry over between `encode` (or `decode`) calls, and only the
//! per-chunk bit cursor and context restart. The caller appends a
//! termination symbol to every chunk and tracks chunk sizes itself; the
//! bit stream carries no header and no length field.

use crate::bitio::{BitSink, BitSource};
use crate::error::{Error, Result};
use crate::freq::max_symbol_total;
use crate::model::ContextModel;
use crate::tag::TagCoder;
use crate::{MAX_WORD_SIZE, MIN_WORD_SIZE};

fn validate_config(word_size: u32, alphabet_size: u32) -> Result<u32> {
    let max_total = max_symbol_total(word_size).ok_or_else(|| {
        Error::InvalidConfiguration(format!(
            "word size {word_size} outside {MIN_WORD_SIZE}..={MAX_WORD_SIZE}"
        ))
    })?;

    if alphabet_size == 0 || alphabet_size > max_total {
        return Err(Error::InvalidConfiguration(format!(
            "alphabet size {alphabet_size} not in 1..={max_total} for word size {word_size}"
        )));
    }

    Ok(max_total)
}

/// Adaptive arithmetic encoder with order-1 context modeling.
///
/// Symbols are integer IDs in `0..alphabet_size`. No model is transmitted:
/// the decoder reconstructs the same statistics symbol by symbol.
pub struct ContextEncoder {
    word_size: u32,
    model: ContextModel,
    tag: TagCoder,
}

impl ContextEncoder {
    /// Create an encoder.
    ///
    /// `word_size` is the tag register width in bits and must lie in
    /// [`MIN_WORD_SIZE`]..=[`MAX_WORD_SIZE`]. `alphabet_size` bounds the
    /// symbol IDs and must satisfy `4 * alphabet_size <= 2^word_size` so
    /// that narrowing against the uniform base table stays exact.
    pub fn new(word_size: u32, alphabet_size: u32) -> Result<Self> {
        let max_total = validate_config(word_size, alphabet_size)?;
        Ok(Self {
            word_size,
            model: ContextModel::new(alphabet_size, max_total),
            tag: TagCoder::new(word_size),
        })
    }

    /// Tag register width in bits.
    pub fn word_size(&self) -> u32 {
        self.word_size
    }

    /// Discard all learned statistics and reinitialize the tag range.
    /// Required between independent streams; never between chunks of one
    /// stream.
    pub fn reset(&mut self) {
        self.model.reset();
        self.tag.reset();
    }

    /// Encode `data_len` symbols from `data` into `out`, using at most
    /// `max_out` bytes. Returns the number of bytes written.
    ///
    /// Statistics are not reset: chunks of one stream thread through the
    /// same encoder in call order. For every chunk the caller appends its
    /// termination symbol to `data`; `last_chunk` selects the flush
    /// variant that keeps a follow-up chunk decodable despite byte
    /// padding.
    pub fn encode(
        &mut self,
        data: &[i32],
        data_len: usize,
        out: &mut [u8],
        max_out: usize,
        last_chunk: bool,
    ) -> Result<usize> {
        if data.len() < data_len {
            return Err(Error::BufferTooSmall(format!(
                "input holds {} symbols, {data_len} declared",
                data.len()
            )));
        }
        if out.len() < max_out {
            return Err(Error::BufferTooSmall(format!(
                "output holds {} bytes, {max_out} declared",
                out.len()
            )));
        }

        let mut sink = BitSink::new(out, max_out);
        let mut context = None;

        for &symbol in &data[..data_len] {
            self.model
                .encode_symbol(context, symbol, &mut self.tag, &mut sink)?;
            context = Some(symbol);
        }

        // For a non-final chunk, advance a throwaway copy of the range by
        // one zero-order step (no statistics change) before sending the
        // tag. The decoder fully resolves the chunk's last real symbol
        // even when byte padding appends stray zero bits; the throwaway
        // step is never decoded.
        let tag_to_send = if last_chunk {
            self.tag.lower
        } else {
            let (saved_lower, saved_upper) = (self.tag.lower, self.tag.upper);
            let (lo, hi, total) = self.model.zero_order_head();
            self.tag.narrow(lo, hi, total);
            self.tag.rescale_emit(&mut sink)?;
            let tag = self.tag.lower;
            self.tag.lower = saved_lower;
            self.tag.upper = saved_upper;
            tag
        };

        self.tag.flush_tag(tag_to_send, &mut sink)?;
        sink.finish()
    }
}

/// Adaptive arithmetic decoder mirroring [`ContextEncoder`].
///
/// Construction fixes the termination symbol: decoding a chunk stops when
/// that symbol is produced (it is never stored in the output).
pub struct ContextDecoder {
    word_size: u32,
    termination: i32,
    model: ContextModel,
    tag: TagCoder,
    current: u32,
}

impl ContextDecoder {
    /// Create a decoder. Configuration rules match [`ContextEncoder::new`];
    /// `termination` must additionally be a valid alphabet symbol.
    pub fn new(word_size: u32, alphabet_size: u32, termination: i32) -> Result<Self> {
        let max_total = validate_config(word_size, alphabet_size)?;

        if termination < 0 || termination as u32 >= alphabet_size {
            return Err(Error::InvalidConfiguration(format!(
                "termination symbol {termination} outside alphabet 0..{alphabet_size}"
            )));
        }

        Ok(Self {
            word_size,
            termination,
            model: ContextModel::new(alphabet_size, max_total),
            tag: TagCoder::new(word_size),
            current: 0,
        })
    }

    /// Tag register width in bits.
    pub fn word_size(&self) -> u32 {
        self.word_size
    }

    /// Discard all learned statistics and reinitialize the tag range.
    pub fn reset(&mut self) {
        self.model.reset();
        self.tag.reset();
        self.current = 0;
    }

    /// Decode one chunk from `encoded` (`encoded_len` bytes) into `out`,
    /// stopping at the termination symbol. Returns the number of symbols
    /// written.
    ///
    /// Chunks of one stream are fed sequentially without reset; each call
    /// reloads the current tag from the chunk's leading bits while the
    /// learned statistics and range registers carry over.
    pub fn decode(
        &mut self,
        encoded: &[u8],
        encoded_len: usize,
        out: &mut [i32],
        max_out: usize,
    ) -> Result<usize> {
        if encoded.len() < encoded_len {
            return Err(Error::BufferTooSmall(format!(
                "encoded buffer holds {} bytes, {encoded_len} declared",
                encoded.len()
            )));
        }
        if out.len() < max_out {
            return Err(Error::BufferTooSmall(format!(
                "output holds {} symbols, {max_out} declared",
                out.len()
            )));
        }

        let mut source = BitSource::new(encoded, encoded_len);

        self.current = 0;
        for _ in 0..self.word_size {
            self.current = (self.current << 1) | source.next_bit()?;
        }

        // A chunk that does not continue this session's tag range cannot
        // be decoded against it.
        if self.current < self.tag.lower || self.current > self.tag.upper {
            return Err(Error::CorruptStream("tag outside session range"));
        }

        let mut written = 0;
        let mut context = None;

        loop {
            let symbol = self.model.decode_symbol(
                context,
                &mut self.tag,
                &mut self.current,
                &mut source,
            )?;

            if symbol == self.termination {
                break;
            }
            if written >= max_out {
                return Err(Error::CapacityExceeded);
            }

            out[written] = symbol;
            written += 1;
            context = Some(symbol);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_SIZE: u32 = 16;
    const ALPHABET: u32 = 257;
    const TERM: i32 = 256;

    fn roundtrip_chunks(chunks: &[Vec<i32>]) -> Vec<i32> {
        let mut encoder = ContextEncoder::new(WORD_SIZE, ALPHABET).unwrap();
        let mut decoder = ContextDecoder::new(WORD_SIZE, ALPHABET, TERM).unwrap();
        let mut decoded = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let last = i + 1 == chunks.len();
            let mut data: Vec<i32> = chunk.clone();
            data.push(TERM);

            let mut encoded = vec![0u8; data.len() * 4 + 64];
            let capacity = encoded.len();
            let written = encoder
                .encode(&data, data.len(), &mut encoded, capacity, last)
                .unwrap();

            let mut out = vec![0i32; chunk.len() + 1];
            let max_out = out.len();
            let produced = decoder.decode(&encoded, written, &mut out, max_out).unwrap();
            decoded.extend_from_slice(&out[..produced]);
        }

        decoded
    }

    #[test]
    fn test_roundtrip_no_repeats() {
        assert_eq!(roundtrip_chunks(&[vec![65, 66, 67]]), vec![65, 66, 67]);
    }

    #[test]
    fn test_roundtrip_repeats() {
        assert_eq!(roundtrip_chunks(&[vec![65, 65, 65]]), vec![65, 65, 65]);
    }

    #[test]
    fn test_roundtrip_empty_chunk() {
        assert_eq!(roundtrip_chunks(&[Vec::new()]), Vec::<i32>::new());
    }

    #[test]
    fn test_roundtrip_across_chunks_carries_statistics() {
        assert_eq!(
            roundtrip_chunks(&[vec![1, 2, 3], vec![4, 5]]),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_roundtrip_repeating_chunks_share_model() {
        let chunk: Vec<i32> = (0..40).map(|i| 11 + (i % 4)).collect();
        let expected: Vec<i32> = chunk.iter().chain(chunk.iter()).copied().collect();
        assert_eq!(roundtrip_chunks(&[chunk.clone(), chunk]), expected);
    }

    #[test]
    fn test_roundtrip_mixed_data() {
        let data = vec![
            11, 11, 12, 13, 13, 14, 11, 12, 12, 240, 222, 8, 9, 55, 11, 11, 12, 240, 11, 12,
        ];
        assert_eq!(roundtrip_chunks(&[data.clone()]), data);
    }

    #[test]
    fn test_roundtrip_full_alphabet() {
        let data: Vec<i32> = (0..256).collect();
        assert_eq!(roundtrip_chunks(&[data.clone()]), data);
    }

    #[test]
    fn test_encoding_is_deterministic_after_reset() {
        let data = [7, 7, 8, 9, 7, TERM];
        let mut encoder = ContextEncoder::new(WORD_SIZE, ALPHABET).unwrap();

        let mut first = vec![0u8; 128];
        let n1 = encoder.encode(&data, data.len(), &mut first, 128, true).unwrap();

        encoder.reset();
        let mut second = vec![0u8; 128];
        let n2 = encoder.encode(&data, data.len(), &mut second, 128, true).unwrap();

        assert_eq!(&first[..n1], &second[..n2]);
    }

    #[test]
    fn test_invalid_word_sizes_rejected() {
        for word_size in [0, 1, 2, 17, 32] {
            assert!(matches!(
                ContextEncoder::new(word_size, 4),
                Err(Error::InvalidConfiguration(_))
            ));
            assert!(matches!(
                ContextDecoder::new(word_size, 4, 0),
                Err(Error::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_alphabet_must_fit_word_size() {
        // word size 8 caps the table total at 64
        assert!(ContextEncoder::new(8, 64).is_ok());
        assert!(matches!(
            ContextEncoder::new(8, 65),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ContextEncoder::new(WORD_SIZE, 0),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_termination_must_be_in_alphabet() {
        assert!(matches!(
            ContextDecoder::new(WORD_SIZE, ALPHABET, 257),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ContextDecoder::new(WORD_SIZE, ALPHABET, -2),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_declared_lengths_checked_against_buffers() {
        let mut encoder = ContextEncoder::new(WORD_SIZE, ALPHABET).unwrap();
        let data = [1, TERM];
        let mut out = [0u8; 8];

        assert!(matches!(
            encoder.encode(&data, 3, &mut out, 8, true),
            Err(Error::BufferTooSmall(_))
        ));
        assert!(matches!(
            encoder.encode(&data, 2, &mut out, 9, true),
            Err(Error::BufferTooSmall(_))
        ));
    }

    #[test]
    fn test_encode_capacity_exceeded_is_fatal() {
        let mut encoder = ContextEncoder::new(WORD_SIZE, ALPHABET).unwrap();
        // all-novel symbols cost escape + base coding each; two bytes
        // cannot hold them
        let data: Vec<i32> = (0..100).chain([TERM]).collect();
        let mut out = [0u8; 2];

        assert!(matches!(
            encoder.encode(&data, data.len(), &mut out, 2, true),
            Err(Error::CapacityExceeded)
        ));
    }

    #[test]
    fn test_decode_capacity_exceeded_is_fatal() {
        let mut encoder = ContextEncoder::new(WORD_SIZE, ALPHABET).unwrap();
        let data = [1, 2, 3, TERM];
        let mut encoded = [0u8; 64];
        let written = encoder.encode(&data, 4, &mut encoded, 64, true).unwrap();

        let mut decoder = ContextDecoder::new(WORD_SIZE, ALPHABET, TERM).unwrap();
        let mut out = [0i32; 2];
        assert!(matches!(
            decoder.decode(&encoded, written, &mut out, 2),
            Err(Error::CapacityExceeded)
        ));
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let mut decoder = ContextDecoder::new(WORD_SIZE, ALPHABET, TERM).unwrap();
        let mut out = [0i32; 8];

        // shorter than one tag word
        let encoded = [0xA5u8];
        assert!(matches!(
            decoder.decode(&encoded, 1, &mut out, 8),
            Err(Error::CorruptStream(_))
        ));
    }
}
