//! Fuzz target for Datagram::decode
//!
//! Arbitrary bytes off the multicast socket must never panic the decoder.
//! Anything that decodes and fits a datagram again must decode to the same
//! value.

#![no_main]

use bluechat_proto::Datagram;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(datagram) = Datagram::decode(data)
        && let Ok(bytes) = datagram.encode()
    {
        assert_eq!(Datagram::decode(&bytes).expect("re-encoded datagram decodes"), datagram);
    }
});
