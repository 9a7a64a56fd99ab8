#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(source) = typegraft::Binary::from_json_str(json) else {
        return;
    };
    // The copier requires a model whose references all resolve.
    if !source.verify() {
        return;
    }
    let roots: Vec<_> = source.type_definitions.keys().copied().collect();
    let mut destination = typegraft::Binary::new(source.architecture);
    typegraft::copy_types(&source, &mut destination, &roots).unwrap();
    assert_eq!(destination.type_definitions.len(), source.type_definitions.len());
    assert!(destination.verify());
});
