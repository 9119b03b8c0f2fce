#![no_main]
use libfuzzer_sys::fuzz_target;
use pyrt::{Heap, Registry, UnpickleOptions};

fuzz_target!(|data: &[u8]| {
    let mut heap = Heap::new();
    if let Ok(root) = pyrt::load_from_slice(data, &mut heap, &Registry::new(),
                                            UnpickleOptions::new()) {
        let _ = heap.repr(root);
    }
});
