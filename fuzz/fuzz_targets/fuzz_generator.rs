#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use dataserv_core::{generate, Seed};

#[derive(Debug, Arbitrary)]
struct Input {
    seed: [u8; 32],
    short: u16,
    long: u16,
}

fuzz_target!(|input: Input| {
    let seed = Seed::new(input.seed);
    let (short, long) = if input.short <= input.long {
        (input.short as usize, input.long as usize)
    } else {
        (input.long as usize, input.short as usize)
    };

    let long_out = generate(&seed, long);
    let short_out = generate(&seed, short);

    assert_eq!(long_out.len(), long);
    assert_eq!(&long_out[..short], &short_out[..]);
});
