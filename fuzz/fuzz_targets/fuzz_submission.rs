//! Fuzz target: parsing and validating submitted form attributes.
//!
//! Arbitrary JSON objects must never panic the parser, and reserved keys
//! must never survive into the stored fields.

#![no_main]

use forms_core::{fields::RESERVED_KEYS, Submission};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(data) else {
        return;
    };
    let Ok(submission) = Submission::parse(map) else {
        return;
    };
    let _ = submission.validate_new("form");
    let _ = submission.validate_update();

    for key in RESERVED_KEYS {
        assert!(submission.fields.get(key).is_none(), "reserved key '{key}' leaked into fields");
    }
});
