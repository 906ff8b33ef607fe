//! Stored records come from disk and may be anything. Decoding must never
//! panic, and whatever it yields must survive a write and a re-read.

#![no_main]

use libfuzzer_sys::fuzz_target;
use teddy_progress::progress::{decode_progress, encode_progress};

fuzz_target!(|data: &[u8]| {
    let progress = decode_progress(data);

    if let Ok(bytes) = encode_progress(&progress) {
        let reread = decode_progress(&bytes);
        assert_eq!(reread.total_xp, progress.total_xp);
        assert_eq!(reread.current_streak, progress.current_streak);
        assert_eq!(reread.longest_streak, progress.longest_streak);
        assert_eq!(reread.earned_badges, progress.earned_badges);
        assert_eq!(reread.counters.entry_count, progress.counters.entry_count);
    }
});
