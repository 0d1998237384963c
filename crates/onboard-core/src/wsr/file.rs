//! File-backed WSR provider: reads raw bytes from a path (e.g. `/dev/random`
//! or a fixed test vector file), lazily opened on first use and held for
//! the provider's lifetime.

use std::fs::File;
use std::io::Read;
use std::sync::Mutex;

use super::WsrProvider;
use crate::error::WsrError;

/// Bounded number of short-read retries before giving up on a single
/// `fill` call.
const MAX_PARTIAL_READ_RETRIES: u32 = 16;

pub struct FileWsr {
    path: String,
    handle: Mutex<Option<File>>,
}

impl FileWsr {
    pub fn new(path: impl Into<String>) -> Self {
        FileWsr {
            path: path.into(),
            handle: Mutex::new(None),
        }
    }
}

impl WsrProvider for FileWsr {
    fn fill(&self, buf: &mut [u8]) -> Result<(), WsrError> {
        let mut guard = self.handle.lock().expect("FileWsr mutex poisoned");
        if guard.is_none() {
            let f = File::open(&self.path).map_err(|_| WsrError::FileOpenFailed {
                path: self.path.clone(),
            })?;
            *guard = Some(f);
        }
        let file = guard.as_mut().expect("just initialized above");

        let mut filled = 0;
        let mut retries = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => return Err(WsrError::FileExhausted),
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                    retries += 1;
                    if retries > MAX_PARTIAL_READ_RETRIES {
                        return Err(WsrError::FileReadFailed {
                            message: "exceeded partial-read retry budget".to_string(),
                        });
                    }
                }
                Err(e) => {
                    return Err(WsrError::FileReadFailed {
                        message: e.to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}
