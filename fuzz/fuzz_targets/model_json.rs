#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(mut model) = typegraft::Binary::from_json_str(json) else {
        return;
    };
    let valid = model.verify();
    let summary = typegraft::passes::convert_all_functions_to_raw(&mut model);
    assert_eq!(summary.input_valid, valid);
    let _ = typegraft::passes::convert_all_functions_to_cabi(&mut model, None);
});
