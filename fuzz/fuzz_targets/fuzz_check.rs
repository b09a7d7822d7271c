#![no_main]
use libfuzzer_sys::fuzz_target;
use vigil_engine::explore::CheckOptions;

fuzz_target!(|data: &[u8]| {
    if let Ok(model) = serde_json::from_slice::<vigil_ir::module::Model>(data) {
        let options = CheckOptions {
            max_states: 10_000,
            ..CheckOptions::default()
        };
        let _ = vigil_engine::verify(&model, &options);
    }
});
