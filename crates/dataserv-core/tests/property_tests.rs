//! Property-based tests for dataserv-core using proptest
//!
//! These tests verify determinism invariants that must hold for every
//! identity and length.

use dataserv_core::{
    crypto::HashingWriter, generate, generate_into, parse_byte_count, Seed, SeedChain,
};
use proptest::prelude::*;

fn arb_seed() -> impl Strategy<Value = Seed> {
    any::<[u8; 32]>().prop_map(Seed::new)
}

proptest! {
    #[test]
    fn seed_chain_is_stable(identity in ".{0,64}", n in 0u64..32) {
        let a = SeedChain::new(identity.clone());
        let b = SeedChain::new(identity);
        prop_assert_eq!(a.build_seed(n), b.build_seed(n));
    }

    #[test]
    fn seed_chain_follows_recurrence(identity in "[a-zA-Z0-9]{1,40}", n in 0u64..16) {
        let chain = SeedChain::new(identity);
        prop_assert_eq!(chain.build_seed(n + 1), chain.build_seed(n).next());
    }

    #[test]
    fn generate_is_deterministic(seed in arb_seed(), len in 0usize..10_000) {
        let a = generate(&seed, len);
        let b = generate(&seed, len);
        prop_assert_eq!(a.len(), len);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn generate_prefix_property(seed in arb_seed(), a in 0usize..5_000, b in 0usize..5_000) {
        let (short, long) = if a <= b { (a, b) } else { (b, a) };
        let long_out = generate(&seed, long);
        let short_out = generate(&seed, short);
        prop_assert_eq!(&long_out[..short], &short_out[..]);
    }

    #[test]
    fn streamed_hash_matches_buffered(seed in arb_seed(), len in 0u64..20_000, limit in 0u64..25_000) {
        let mut streamed = HashingWriter::new(limit);
        generate_into(&seed, len, &mut streamed).unwrap();

        let buffered = generate(&seed, len as usize);
        let covered = (limit.min(len)) as usize;
        prop_assert_eq!(
            streamed.finish_hex(),
            dataserv_core::crypto::sha256_hex(&buffered[..covered])
        );
    }

    #[test]
    fn byte_count_suffixes_scale(value in 0u64..1_000_000) {
        prop_assert_eq!(parse_byte_count(&value.to_string()).unwrap(), value);
        prop_assert_eq!(parse_byte_count(&format!("{}K", value)).unwrap(), value * 1024);
        prop_assert_eq!(parse_byte_count(&format!("{}M", value)).unwrap(), value * 1024 * 1024);
    }
}
