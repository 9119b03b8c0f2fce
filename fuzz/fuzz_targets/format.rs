#![no_main]
use libfuzzer_sys::fuzz_target;
use pyrt::Heap;

fuzz_target!(|data: &[u8]| {
    if let Ok(markup) = std::str::from_utf8(data) {
        let mut heap = Heap::new();
        let args = vec![heap.int(-1234), heap.float(2.5), heap.str("text")];
        let _ = pyrt::render(&heap, markup, &args, &[]);
    }
});
