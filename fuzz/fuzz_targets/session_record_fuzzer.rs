//! Fuzz target for loading persisted sessions
//!
//! Whatever bytes sit in the sessions record, loading must not panic. A
//! record that fails to decode is discarded and the store starts empty.

#![no_main]

use bluechat_core::{MemoryStorage, SessionStore, Storage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let storage = MemoryStorage::new();
    storage.corrupt_sessions(data.to_vec());

    let decoded = storage.load_sessions();
    let store = SessionStore::load(storage).expect("memory storage never fails to read");

    match decoded {
        Ok(sessions) => assert_eq!(store.sessions(), sessions.as_slice()),
        Err(_) => assert!(store.sessions().is_empty()),
    }
});
