//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`StoragePort`] for the controller's persisted records.
//!
//! - **`target_os = "espidf"`**: raw blobs in the default NVS partition,
//!   one namespace handle opened per access.
//! - **host**: an in-memory map, used by simulation and tests.
//!
//! Atomic writes: ESP-IDF NVS commits are atomic per key.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{StorageError, StoragePort};

#[cfg(not(target_os = "espidf"))]
use std::cell::RefCell;
#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

pub struct NvsStore {
    #[cfg(not(target_os = "espidf"))]
    store: RefCell<HashMap<String, Vec<u8>>>,
    #[cfg(target_os = "espidf")]
    partition: EspDefaultNvsPartition,
}

#[cfg(target_os = "espidf")]
impl NvsStore {
    /// Take the default NVS partition.  ESP-IDF erases and re-initialises it
    /// when its layout version changed.
    pub fn new() -> Result<Self, StorageError> {
        let partition = EspDefaultNvsPartition::take().map_err(|e| {
            warn!("NvsStore: partition init failed: {e}");
            StorageError::IoError
        })?;
        info!("NvsStore: ESP-IDF NVS initialised");
        Ok(Self { partition })
    }

    fn open(&self, namespace: &str, write: bool) -> Result<EspNvs<NvsDefault>, StorageError> {
        EspNvs::new(self.partition.clone(), namespace, write).map_err(|e| {
            warn!("NvsStore: open '{namespace}' failed: {e}");
            StorageError::IoError
        })
    }
}

#[cfg(not(target_os = "espidf"))]
impl NvsStore {
    pub fn new() -> Result<Self, StorageError> {
        info!("NvsStore: simulation backend");
        Ok(Self {
            store: RefCell::new(HashMap::new()),
        })
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }
}

impl StoragePort for NvsStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            let store = self.store.borrow();
            let data = store.get(&composite).ok_or(StorageError::NotFound)?;
            if data.len() > buf.len() {
                return Err(StorageError::TooLarge);
            }
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }

        #[cfg(target_os = "espidf")]
        {
            let nvs = self.open(namespace, false)?;
            match nvs.get_raw(key, buf) {
                Ok(Some(data)) => Ok(data.len()),
                Ok(None) => Err(StorageError::NotFound),
                Err(e) => {
                    warn!("NvsStore: read '{key}' failed: {e}");
                    Err(StorageError::IoError)
                }
            }
        }
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().insert(composite, data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let mut nvs = self.open(namespace, true)?;
            nvs.set_raw(key, data).map(|_| ()).map_err(|e| {
                warn!("NvsStore: write '{key}' failed: {e}");
                StorageError::IoError
            })
        }
    }
}
