#![no_main]

use std::sync::Mutex;

use libfuzzer_sys::fuzz_target;
use xenon_host::{xex::Xex2Module, GuestMemory, GuestMemoryConfig, ModuleLoader};

static MEMORY: Mutex<Option<GuestMemory>> = Mutex::new(None);

fuzz_target!(|data: &[u8]| {
    let _ = Xex2Module::parse(data);

    let mut memory = MEMORY.lock().unwrap();
    let memory = memory.get_or_insert_with(|| {
        GuestMemory::new(&GuestMemoryConfig::new().with_size(0x100_0000), &[]).unwrap()
    });
    let _ = ModuleLoader::new().load_bytes(data.to_vec(), memory);
});
