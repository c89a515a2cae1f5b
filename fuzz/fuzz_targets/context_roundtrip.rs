#![no_main]
use caac::{ContextDecoder, ContextEncoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<u8>, u32)| {
    let (input_bytes, word_size) = data;
    let word_size = (word_size % 6) + 11; // 11 to 16 bits: fits 257 symbols
    let term = 256;

    let mut input: Vec<i32> = input_bytes.iter().map(|&b| i32::from(b)).collect();
    input.push(term);

    let mut encoder = ContextEncoder::new(word_size, 257).unwrap();
    let mut encoded = vec![0u8; input.len() * 4 + 64];
    let capacity = encoded.len();
    let written = encoder
        .encode(&input, input.len(), &mut encoded, capacity, true)
        .unwrap();

    let mut decoder = ContextDecoder::new(word_size, 257, term).unwrap();
    let mut decoded = vec![0i32; input_bytes.len() + 1];
    let max_out = decoded.len();
    let produced = decoder
        .decode(&encoded, written, &mut decoded, max_out)
        .unwrap();

    assert_eq!(produced, input_bytes.len());
    for (i, &b) in input_bytes.iter().enumerate() {
        assert_eq!(decoded[i], i32::from(b));
    }
});
