//! Scanner that replays scripted results.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use bluechat_core::{ScanError, Scanner};
use bluechat_proto::Device;

type ScanResult = Result<Option<Device>, ScanError>;

/// [`Scanner`] returning queued results in order, then `Ok(None)`.
#[derive(Clone, Default)]
pub struct ScriptedScanner {
    inner: Arc<Mutex<Script>>,
}

#[derive(Default)]
struct Script {
    results: VecDeque<ScanResult>,
    scans: usize,
}

impl ScriptedScanner {
    /// Scanner with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a device to be found.
    pub fn push_device(&self, device: Device) {
        self.push(Ok(Some(device)));
    }

    /// Queue an arbitrary result.
    pub fn push(&self, result: ScanResult) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).results.push_back(result);
    }

    /// Number of scans performed so far.
    pub fn scans(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).scans
    }
}

impl Scanner for ScriptedScanner {
    fn scan(&self) -> impl Future<Output = ScanResult> + Send {
        let next = {
            let mut script = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            script.scans += 1;
            script.results.pop_front().unwrap_or(Ok(None))
        };
        std::future::ready(next)
    }
}
