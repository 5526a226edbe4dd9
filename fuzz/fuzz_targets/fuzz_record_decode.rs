//! Fuzz target: persisted record decoding
//!
//! Feeds arbitrary bytes to every record slot and checks that loading
//! never panics and always yields a usable record.
//!
//! cargo fuzz run fuzz_record_decode

#![no_main]

use aquaplc::adapters::nvs::NvsStore;
use aquaplc::app::ports::{RECORD_NAMESPACE, RecordKey, RecordStore, StoragePort};
use aquaplc::config::{IrrigationGroup, IrrigationManualConfig, IrrigationScheduleConfig, PoolConfig, PoolSchedule};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(store) = NvsStore::new() else {
        return;
    };
    for key in [
        RecordKey::IrrigationSchedule,
        RecordKey::IrrigationManual,
        RecordKey::IrrigationGroup(0),
        RecordKey::PoolSchedule,
        RecordKey::PoolConfig,
    ] {
        let _ = store.write(RECORD_NAMESPACE, &key.storage_key(), data);
    }

    let _: IrrigationScheduleConfig = store.load_or_default(RecordKey::IrrigationSchedule);
    let _: IrrigationManualConfig = store.load_or_default(RecordKey::IrrigationManual);
    let _: PoolSchedule = store.load_or_default(RecordKey::PoolSchedule);
    let _: PoolConfig = store.load_or_default(RecordKey::PoolConfig);
    let group: IrrigationGroup = store.load_or_default(RecordKey::IrrigationGroup(0));
    assert!(group.name.len() <= aquaplc::config::GROUP_NAME_LEN);
});
