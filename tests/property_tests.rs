//! Property-based round-trip tests.
//!
//! Generated trees stay inside what every format can carry losslessly:
//! only finite floats (JSON writes NaN and infinities as `null`), no empty
//! struct keys (the binary framing reserves the zero-length key as a
//! terminator) and, for the text formats, no `UInt` that also fits an `Int`,
//! since text has no tag to tell them apart.

use polyform::{
    from_slice, read, read_with_options, to_vec, write, write_with_options, Format, Matrix, Options, StructMap, Value,
};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

fn roundtrip(format: Format, value: &Value) -> bool {
    match write(format, value) {
        Ok(bytes) => match read(format, &bytes) {
            Ok(back) => back == *value,
            Err(e) => {
                eprintln!("{format} read failed: {e}");
                eprintln!("encoded was: {}", String::from_utf8_lossy(&bytes));
                false
            }
        },
        Err(e) => {
            eprintln!("{format} write failed: {e}");
            false
        }
    }
}

fn roundtrip_with(format: Format, value: &Value, options: &Options) -> bool {
    match write_with_options(format, value, options) {
        Ok(bytes) => match read_with_options(format, &bytes, options) {
            Ok(back) => back == *value,
            Err(e) => {
                eprintln!("{format} read failed: {e}");
                eprintln!("encoded was: {}", String::from_utf8_lossy(&bytes));
                false
            }
        },
        Err(e) => {
            eprintln!("{format} write failed: {e}");
            false
        }
    }
}

fn typed_roundtrip<T>(value: &T) -> bool
where
    T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug,
{
    Format::ALL.iter().all(|&format| {
        let bytes = match to_vec(format, value) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("{format} serialize failed: {e}");
                return false;
            }
        };
        match from_slice::<T>(format, &bytes) {
            Ok(back) => back == *value,
            Err(e) => {
                eprintln!("{format} deserialize failed: {e}");
                false
            }
        }
    })
}

fn finite_float() -> impl Strategy<Value = f64> {
    prop_oneof![
        any::<f64>().prop_filter("finite", |f| f.is_finite()),
        Just(0.0),
        Just(-1.5),
        Just(1e300),
    ]
}

fn matrix() -> impl Strategy<Value = Matrix> {
    prop::collection::vec(1usize..4, 1..4).prop_flat_map(|dims| {
        let total = dims.iter().product::<usize>();
        prop::collection::vec(-1e6f64..1e6, total)
            .prop_map(move |data| Matrix::from_data(&dims, data).expect("sized to dims"))
    })
}

fn key() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z_][a-z0-9_]{0,8}",
        "[ -~]{1,10}",
    ]
}

fn string() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,16}",
        "[ -~]{0,16}",
        "\\PC{0,8}",
        Just("line\nbreak".to_string()),
        Just("true".to_string()),
        Just("12".to_string()),
    ]
}

/// Arbitrary trees. `wide_uint` allows every `UInt`, otherwise only those
/// above `i64::MAX`.
fn tree(wide_uint: bool) -> impl Strategy<Value = Value> {
    let uint = if wide_uint {
        any::<u64>().boxed()
    } else {
        ((i64::MAX as u64 + 1)..=u64::MAX).boxed()
    };
    let leaf = prop_oneof![
        any::<i64>().prop_map(Value::Int),
        uint.prop_map(Value::UInt),
        finite_float().prop_map(Value::Float),
        any::<bool>().prop_map(Value::Bool),
        string().prop_map(Value::String),
        matrix().prop_map(Value::Matrix),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::vec((key(), inner), 0..6).prop_map(|entries| {
                let mut map = StructMap::new();
                for (k, v) in entries {
                    map.set(k, v);
                }
                Value::Struct(map)
            }),
        ]
    })
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Record {
    id: u32,
    name: String,
    score: f64,
    flags: Vec<bool>,
    parent: Option<u32>,
}

proptest! {
    #[test]
    fn prop_binary_roundtrip(v in tree(true)) {
        prop_assert!(roundtrip(Format::Binary, &v));
    }

    #[test]
    fn prop_bson_roundtrip(v in tree(true)) {
        prop_assert!(roundtrip(Format::Bson, &v));
    }

    #[test]
    fn prop_json_roundtrip(v in tree(false)) {
        prop_assert!(roundtrip(Format::Json, &v));
    }

    #[test]
    fn prop_yaml_roundtrip(v in tree(false)) {
        prop_assert!(roundtrip(Format::Yaml, &v));
    }

    #[test]
    fn prop_yaml_block_style_roundtrip(v in tree(false)) {
        let options = Options::default().with_yaml_flow_threshold(0);
        prop_assert!(roundtrip_with(Format::Yaml, &v, &options));
    }

    #[test]
    fn prop_yaml_wide_indent_roundtrip(v in tree(false)) {
        let options = Options::default().with_indent(4).with_yaml_flow_threshold(1);
        prop_assert!(roundtrip_with(Format::Yaml, &v, &options));
    }

    #[test]
    fn prop_wide_indent_text_formats(v in tree(false)) {
        let options = Options::default().with_indent(4).with_xml_declaration(false);
        for format in [Format::Json, Format::Xml] {
            prop_assert!(roundtrip_with(format, &v, &options));
        }
    }

    #[test]
    fn prop_toml_roundtrip(v in tree(false)) {
        prop_assert!(roundtrip(Format::Toml, &v));
    }

    #[test]
    fn prop_xml_roundtrip(v in tree(false)) {
        prop_assert!(roundtrip(Format::Xml, &v));
    }

    #[test]
    fn prop_text_roundtrip(v in tree(false)) {
        prop_assert!(roundtrip(Format::Text, &v));
    }

    #[test]
    fn prop_i64(n in any::<i64>()) {
        prop_assert!(typed_roundtrip(&n));
    }

    #[test]
    fn prop_vec_string(v in prop::collection::vec("[ -~]{0,12}", 0..10)) {
        prop_assert!(typed_roundtrip(&v));
    }

    #[test]
    fn prop_record(
        id in any::<u32>(),
        name in "[a-zA-Z ]{0,12}",
        score in -1e9f64..1e9,
        flags in prop::collection::vec(any::<bool>(), 0..12),
        parent in proptest::option::of(any::<u32>()),
    ) {
        let record = Record { id, name, score, flags, parent };
        prop_assert!(typed_roundtrip(&record));
    }

    #[test]
    fn prop_binary_garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = read(Format::Binary, &bytes);
        let _ = read(Format::Bson, &bytes);
    }

    #[test]
    fn prop_text_garbage_never_panics(s in "\\PC{0,48}") {
        for format in [Format::Json, Format::Yaml, Format::Toml, Format::Xml, Format::Text] {
            let _ = read(format, s.as_bytes());
        }
    }
}
