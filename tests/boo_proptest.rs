use moor::{Boo, BooStr, Dst, Tracking};
use proptest::prelude::*;

proptest! {
    #[test]
    fn owned_text_never_leaks(data in "[a-z0-9 ]{0,48}") {
        let tracker = Tracking::new();
        let text = BooStr::owned_in(&data, &tracker).unwrap();
        prop_assert_eq!(text.as_str(), data.as_str());
        prop_assert_eq!(tracker.live_bytes(), data.len());

        drop(text);
        prop_assert_eq!(tracker.live_bytes(), 0);
    }

    #[test]
    fn promotion_preserves_the_value_and_the_source(value in any::<u32>()) {
        let tracker = Tracking::new();
        let source = value;
        let mut boo = Boo::borrowed(&source, &tracker);

        let slot = boo.borrow_mut().unwrap();
        prop_assert_eq!(*slot, value);
        *slot = value.wrapping_add(1);

        prop_assert!(boo.is_owned());
        prop_assert_eq!(*boo.borrow(), value.wrapping_add(1));
        prop_assert_eq!(source, value);

        drop(boo);
        prop_assert_eq!(tracker.live_bytes(), 0);
    }

    #[test]
    fn dst_byte_accounting_is_exact(
        header in any::<u64>(),
        payload in proptest::collection::vec(any::<u32>(), 0..64),
    ) {
        let tracker = Tracking::new();
        let dst: Dst<u64, u32> = Dst::new_in(header, &payload, &tracker).unwrap();

        prop_assert_eq!(*dst.header(), header);
        prop_assert_eq!(dst.slice(), payload.as_slice());
        // 16-byte frontmatter (u32 length padded to the u64 header), then
        // the elements with no gap.
        prop_assert_eq!(tracker.live_bytes(), 16 + payload.len() * 4);

        unsafe { dst.destroy(&tracker) };
        prop_assert_eq!(tracker.live_bytes(), 0);
    }
}
