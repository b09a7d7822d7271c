#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(model) = serde_json::from_slice::<vigil_ir::module::Model>(data) {
        let _ = vigil_ir::build(&model);
    }
});
