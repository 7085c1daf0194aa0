// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use packlens::pack::metadata::{PackField, PackMetadata};
use packlens::pack::{classify, tags::parse_tags};

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    file_name: &'a str,
    tags: &'a str,
    metadata: &'a str,
    value: &'a str,
}

fuzz_target!(|input: Input| {
    let class = classify(input.file_name);
    if let Some(key) = class.group_key() {
        assert!(!key.is_empty() || input.file_name.is_empty());
    }

    for tag in parse_tags(input.tags) {
        assert!(!tag.is_empty());
        assert_eq!(tag.trim(), tag);
    }

    if let Ok(mut metadata) = PackMetadata::parse(input.metadata) {
        for field in PackField::ALL {
            metadata.set_field(field, input.value);
        }
        metadata.trim_trailing_whitespace();
        let text = metadata.to_pretty_string().unwrap();
        assert_eq!(PackMetadata::parse(&text).unwrap(), metadata);
    }
});
