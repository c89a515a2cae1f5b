use caac::{ContextDecoder, ContextEncoder};

fn main() {
    let term = 256;
    let input: Vec<i32> = (0..10000)
        .map(|i| (i * 7 % 5) as i32 + 60)
        .chain([term])
        .collect();

    for _ in 0..100 {
        let mut encoder = ContextEncoder::new(16, 257).unwrap();
        let mut encoded = vec![0u8; input.len() * 2 + 64];
        let capacity = encoded.len();
        let written = encoder
            .encode(&input, input.len(), &mut encoded, capacity, true)
            .unwrap();

        let mut decoder = ContextDecoder::new(16, 257, term).unwrap();
        let mut decoded = vec![0i32; input.len()];
        let max_out = decoded.len();
        let produced = decoder
            .decode(&encoded, written, &mut decoded, max_out)
            .unwrap();
        assert_eq!(produced, input.len() - 1);
    }
}
