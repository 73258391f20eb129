//! Property-based tests for the config text engine.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::config::{empty, parse, unparse, ConfigLine, ConfigLines, LineKind};
    use proptest::prelude::*;

    fn headers(text: &[u8]) -> Vec<Vec<u8>> {
        parse(text)
            .map(|line| line.unwrap())
            .filter_map(|line: ConfigLine| match line.kind {
                LineKind::Header { section, .. } => Some(section),
                _ => None,
            })
            .collect()
    }

    fn values(text: &[u8], wanted: &[u8]) -> Vec<Vec<u8>> {
        parse(text)
            .map(|line| line.unwrap())
            .filter_map(|line: ConfigLine| match line.kind {
                LineKind::KeyValue { key, value } if key == wanted => Some(value),
                _ => None,
            })
            .collect()
    }

    fn keys_in(text: &[u8], wanted: &[u8]) -> Vec<Vec<u8>> {
        let mut in_section = false;
        let mut keys = Vec::new();
        for line in parse(text).map(|line| line.unwrap()) {
            match line.kind {
                LineKind::Header { section, subsection } => {
                    in_section = section == wanted && subsection.is_none();
                }
                LineKind::KeyValue { key, .. } if in_section => keys.push(key),
                _ => {}
            }
        }
        keys
    }

    /// Config text with a few sections, keys, comments and blank lines. The
    /// last line may lack its terminator.
    fn config_text() -> impl Strategy<Value = String> {
        let line = prop_oneof![
            "\\[[a-z]{1,3}\\]\n",
            "\t[a-z]{1,3} = [a-z0-9]{0,3}\n",
            "[a-z]{1,3}=[a-z0-9]{1,3}\n",
            Just("# comment\n".to_string()),
            Just("\n".to_string()),
        ];
        (
            proptest::collection::vec(line, 0..12),
            proptest::option::of("[a-z]{1,3} = [a-z]{1,3}"),
        )
            .prop_map(|(lines, tail)| lines.concat() + tail.as_deref().unwrap_or(""))
    }

    // ============================================================================
    // parse / unparse property tests
    // ============================================================================

    proptest! {
        /// Property: an untouched stream reproduces arbitrary input byte for byte
        #[test]
        fn parse_unparse_is_identity(input in proptest::collection::vec(any::<u8>(), 0..256)) {
            let output = unparse(parse(&input)).unwrap();
            prop_assert_eq!(output, input);
        }

        /// Property: every line ends with a newline, except possibly the last one
        #[test]
        fn parse_yields_terminated_lines(input in "[a-z=\\[\\] \n#]{0,64}") {
            let lines: Vec<_> = parse(input.as_bytes()).map(|l| l.unwrap()).collect();
            if let Some((_, init)) = lines.split_last() {
                for line in init {
                    prop_assert_eq!(line.orig.last(), Some(&b'\n'));
                }
            }
        }
    }

    // ============================================================================
    // add_section property tests
    // ============================================================================

    proptest! {
        /// Property: adding sections in any order keeps headers sorted
        #[test]
        fn add_section_keeps_headers_sorted(names in proptest::collection::vec("[a-z]{1,6}", 1..8)) {
            let mut text = Vec::new();
            for name in &names {
                text = parse(&text).add_section(name).unparse().unwrap();
            }

            let found = headers(&text);
            let mut expected: Vec<Vec<u8>> = names.iter().map(|n| n.as_bytes().to_vec()).collect();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(found, expected);
        }

        /// Property: add_section is idempotent
        #[test]
        fn add_section_is_idempotent(name in "[a-z]{1,8}") {
            let once = empty().add_section(&name).unparse().unwrap();
            let twice = parse(&once).add_section(&name).unparse().unwrap();
            prop_assert_eq!(once, twice);
        }
    }

    // ============================================================================
    // set_key_value / append_key_value property tests
    // ============================================================================

    proptest! {
        /// Property: after set_key_value the key has exactly the given value
        #[test]
        fn set_key_value_leaves_single_value(
            initial in proptest::collection::vec("[a-z0-9]{1,6}", 0..4),
            value in "[a-z0-9]{1,6}",
        ) {
            let mut text = empty().add_section("s").unparse().unwrap();
            for v in &initial {
                text = parse(&text).append_key_value("s", "k", v).unparse().unwrap();
            }

            let text = parse(&text).set_key_value("s", "k", &value).unparse().unwrap();
            prop_assert_eq!(values(&text, b"k"), vec![value.as_bytes().to_vec()]);
        }

        /// Property: setting keys in any order keeps the keys of a section sorted
        #[test]
        fn set_key_value_keeps_keys_sorted(keys in proptest::collection::vec("[a-z]{1,6}", 1..8)) {
            let mut text = empty().add_section("s").unparse().unwrap();
            for key in &keys {
                text = parse(&text).set_key_value("s", key, "v").unparse().unwrap();
            }

            let mut expected: Vec<Vec<u8>> = keys.iter().map(|k| k.as_bytes().to_vec()).collect();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(keys_in(&text, b"s"), expected);
        }

        /// Property: setting the same key and value twice changes nothing
        #[test]
        fn set_key_value_is_idempotent(
            content in config_text(),
            key in "[a-z]{1,3}",
            value in "[a-z0-9]{1,3}",
        ) {
            let once = parse(content.as_bytes())
                .add_section("s")
                .set_key_value("s", &key, &value)
                .unparse()
                .unwrap();
            let twice = parse(&once).set_key_value("s", &key, &value).unparse().unwrap();
            prop_assert_eq!(twice, once);
        }

        /// Property: appending after arbitrary content never merges two lines
        #[test]
        fn append_key_value_keeps_existing_lines(content in config_text(), value in "[a-z0-9]{1,6}") {
            let before = parse(content.as_bytes())
                .map(|line| line.unwrap().kind)
                .filter(|kind| *kind != LineKind::Empty)
                .count();
            let text = parse(content.as_bytes())
                .add_section("zz")
                .append_key_value("zz", "path", &value)
                .unparse()
                .unwrap();
            let after = parse(&text)
                .map(|line| line.unwrap().kind)
                .filter(|kind| *kind != LineKind::Empty)
                .count();
            prop_assert!(keys_in(&text, b"zz").contains(&b"path".to_vec()));
            prop_assert!(after >= before + 1);
        }

        /// Property: appended values are kept in ascending order
        #[test]
        fn append_key_value_keeps_values_sorted(items in proptest::collection::vec("[a-z0-9/]{1,10}", 1..8)) {
            let mut text = empty().add_section("subprojects").unparse().unwrap();
            for item in &items {
                text = parse(&text)
                    .append_key_value("subprojects", "path", item)
                    .unparse()
                    .unwrap();
            }

            let found = values(&text, b"path");
            let mut expected: Vec<Vec<u8>> = items.iter().map(|i| i.as_bytes().to_vec()).collect();
            expected.sort();
            prop_assert_eq!(found, expected);
        }

        /// Property: drop_key followed by drop_section_if_empty removes a lone key's section
        #[test]
        fn drop_key_then_section_leaves_no_header(value in "[a-z0-9]{1,6}") {
            let text = empty()
                .add_section("subtree")
                .set_key_value("subtree", "appliedIndex", &value)
                .drop_key("subtree", "appliedIndex")
                .drop_section_if_empty("subtree")
                .unparse()
                .unwrap();
            prop_assert!(text.is_empty());
        }
    }
}
