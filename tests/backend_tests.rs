//! Wire-level checks against the public backend types.

use polyform::backend::Backend;
use polyform::formats::{BinaryBackend, BsonBackend, JsonBackend, YamlBackend};
use polyform::{backend_for, read, value, write, Error, Format, Matrix, Options, Result, Serializer, Value, ValueType};
use std::collections::BTreeMap;

/// Delegates to another backend and counts each primitive it is asked for.
struct Counting<B> {
    inner: B,
    calls: BTreeMap<&'static str, usize>,
}

impl<B: Backend> Counting<B> {
    fn new(inner: B) -> Self {
        Counting {
            inner,
            calls: BTreeMap::new(),
        }
    }

    fn hit(&mut self, name: &'static str) {
        *self.calls.entry(name).or_default() += 1;
    }

    fn count(&self, name: &str) -> usize {
        self.calls.get(name).copied().unwrap_or(0)
    }
}

impl<B: Backend> Backend for Counting<B> {
    fn format(&self) -> Format {
        self.inner.format()
    }
    fn init_write(&mut self) -> Result<()> {
        self.calls.clear();
        self.inner.init_write()
    }
    fn finish_write(&mut self) -> Result<Vec<u8>> {
        self.inner.finish_write()
    }
    fn init_read(&mut self, input: &[u8]) -> Result<()> {
        self.calls.clear();
        self.inner.init_read(input)
    }
    fn finish_read(&mut self) -> Result<()> {
        self.inner.finish_read()
    }
    fn write_int(&mut self, value: i64) -> Result<()> {
        self.hit("write_int");
        self.inner.write_int(value)
    }
    fn write_uint(&mut self, value: u64) -> Result<()> {
        self.hit("write_uint");
        self.inner.write_uint(value)
    }
    fn write_float(&mut self, value: f64) -> Result<()> {
        self.hit("write_float");
        self.inner.write_float(value)
    }
    fn write_string(&mut self, value: &str) -> Result<()> {
        self.hit("write_string");
        self.inner.write_string(value)
    }
    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.hit("write_bool");
        self.inner.write_bool(value)
    }
    fn write_list_begin(&mut self, len: usize) -> Result<()> {
        self.hit("write_list_begin");
        self.inner.write_list_begin(len)
    }
    fn write_list_end(&mut self) -> Result<()> {
        self.hit("write_list_end");
        self.inner.write_list_end()
    }
    fn write_struct_begin(&mut self) -> Result<()> {
        self.hit("write_struct_begin");
        self.inner.write_struct_begin()
    }
    fn write_struct_key(&mut self, key: &str) -> Result<()> {
        self.hit("write_struct_key");
        self.inner.write_struct_key(key)
    }
    fn write_struct_end(&mut self) -> Result<()> {
        self.hit("write_struct_end");
        self.inner.write_struct_end()
    }
    fn write_matrix(&mut self, dims: &[usize], data: &[f64]) -> Result<()> {
        self.hit("write_matrix");
        self.inner.write_matrix(dims, data)
    }
    fn peek(&mut self) -> Result<Option<ValueType>> {
        self.hit("peek");
        self.inner.peek()
    }
    fn read_int(&mut self) -> Result<i64> {
        self.hit("read_int");
        self.inner.read_int()
    }
    fn read_uint(&mut self) -> Result<u64> {
        self.hit("read_uint");
        self.inner.read_uint()
    }
    fn read_float(&mut self) -> Result<f64> {
        self.hit("read_float");
        self.inner.read_float()
    }
    fn read_string(&mut self) -> Result<String> {
        self.hit("read_string");
        self.inner.read_string()
    }
    fn read_bool(&mut self) -> Result<bool> {
        self.hit("read_bool");
        self.inner.read_bool()
    }
    fn read_list_begin(&mut self) -> Result<usize> {
        self.hit("read_list_begin");
        self.inner.read_list_begin()
    }
    fn read_list_end(&mut self) -> Result<()> {
        self.hit("read_list_end");
        self.inner.read_list_end()
    }
    fn read_struct_begin(&mut self) -> Result<()> {
        self.hit("read_struct_begin");
        self.inner.read_struct_begin()
    }
    fn read_struct_key(&mut self) -> Result<Option<String>> {
        self.hit("read_struct_key");
        self.inner.read_struct_key()
    }
    fn read_struct_end(&mut self) -> Result<()> {
        self.hit("read_struct_end");
        self.inner.read_struct_end()
    }
    fn read_matrix(&mut self) -> Result<(Vec<usize>, Vec<f64>)> {
        self.hit("read_matrix");
        self.inner.read_matrix()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_binary_scalar_bytes() {
    assert_eq!(
        write(Format::Binary, &Value::Int(-2)).unwrap(),
        [0x01, 0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
    );
    assert_eq!(
        write(Format::Binary, &Value::UInt(258)).unwrap(),
        [0x02, 0x02, 0x01, 0, 0, 0, 0, 0, 0]
    );
    assert_eq!(write(Format::Binary, &Value::Bool(true)).unwrap(), [0x05, 0x01]);
    assert_eq!(
        write(Format::Binary, &Value::from("hi")).unwrap(),
        [0x04, 2, 0, 0, 0, b'h', b'i']
    );

    let mut float = vec![0x03];
    float.extend_from_slice(&1.5f64.to_le_bytes());
    assert_eq!(write(Format::Binary, &Value::Float(1.5)).unwrap(), float);
}

#[test]
fn test_binary_container_bytes() {
    let list = write(Format::Binary, &value!([true, false])).unwrap();
    assert_eq!(list, [0x06, 2, 0, 0, 0, 0x05, 1, 0x05, 0]);

    let record = write(Format::Binary, &value!({"k": true})).unwrap();
    assert_eq!(record, [0x07, 1, 0, 0, 0, b'k', 0x05, 1, 0, 0, 0, 0]);

    let empty = write(Format::Binary, &value!({})).unwrap();
    assert_eq!(empty, [0x07, 0, 0, 0, 0]);
}

#[test]
fn test_binary_matrix_bytes() {
    let m = Matrix::from_data(&[1, 2], vec![0.0, -0.0]).unwrap();
    let bytes = write(Format::Binary, &Value::Matrix(m)).unwrap();

    let mut expected = vec![0x08, 2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0];
    expected.extend_from_slice(&0.0f64.to_le_bytes());
    expected.extend_from_slice(&(-0.0f64).to_le_bytes());
    assert_eq!(bytes, expected);
}

#[test]
fn test_bson_uses_its_own_tags() {
    let v = value!({"n": 1, "s": "x", "l": [false]});
    let compact = write(Format::Binary, &v).unwrap();
    let bson = write(Format::Bson, &v).unwrap();

    assert_eq!(compact.len(), bson.len());
    assert_eq!(bson[0], 0x16);
    assert_eq!(bson[6], 0x10);

    // Each dialect refuses the other's tags.
    assert!(matches!(read(Format::Bson, &compact), Err(Error::InvalidFormat { .. })));
    assert!(matches!(read(Format::Binary, &bson), Err(Error::InvalidFormat { .. })));
}

#[test]
fn test_binary_rejects_empty_key_and_trailing_bytes() {
    let mut bad_key = value!({});
    bad_key.struct_add("", Value::Int(1)).unwrap();
    assert!(write(Format::Binary, &bad_key).is_err());

    let mut bytes = write(Format::Binary, &Value::Bool(false)).unwrap();
    bytes.push(0x00);
    assert!(matches!(read(Format::Binary, &bytes), Err(Error::InvalidFormat { .. })));
}

#[test]
fn test_binary_list_count_larger_than_input() {
    let bytes = [0x06, 0xff, 0xff, 0xff, 0x7f];
    assert!(matches!(read(Format::Binary, &bytes), Err(Error::Truncated { .. })));
}

#[test]
fn test_json_matrix_object() {
    let m = Matrix::from_data(&[2], vec![1.0, 2.5]).unwrap();
    let text = polyform::write_string(Format::Json, &Value::Matrix(m.clone())).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["__matrix"], serde_json::Value::Bool(true));
    assert_eq!(parsed["dims"], serde_json::json!([2]));
    assert_eq!(parsed["data"], serde_json::json!([1.0, 2.5]));
    assert_eq!(polyform::read_str(Format::Json, &text).unwrap(), Value::Matrix(m));
}

#[test]
fn test_json_indent_option() {
    let options = Options::default().with_indent(4);
    let mut json = Serializer::new(JsonBackend::new(&options), options);
    let text = json.write_string(&value!({"a": [1]})).unwrap();
    assert_eq!(text, "{\n    \"a\": [\n        1\n    ]\n}\n");
}

#[test]
fn test_yaml_flow_threshold_option() {
    let v = value!({"short": [1, 2], "long": [1, 2, 3]});

    let options = Options::default().with_yaml_flow_threshold(2);
    let mut yaml = Serializer::new(YamlBackend::new(&options), options);
    let text = yaml.write_string(&v).unwrap();
    assert_eq!(text, "short: [1, 2]\nlong:\n  - 1\n  - 2\n  - 3\n");
    assert_eq!(yaml.read_str(&text).unwrap(), v);
}

#[test]
fn test_xml_declaration_option() {
    let with = polyform::write_string(Format::Xml, &Value::Int(5)).unwrap();
    assert!(with.starts_with("<?xml"));

    let options = Options::default().with_xml_declaration(false);
    let without = polyform::write_with_options(Format::Xml, &Value::Int(5), &options).unwrap();
    assert!(without.starts_with(b"<olib>"));
    assert_eq!(read(Format::Xml, &without).unwrap(), Value::Int(5));
}

#[test]
fn test_backend_for_reports_format() {
    for format in Format::ALL {
        let backend = backend_for(format, &Options::default());
        assert_eq!(backend.format(), format);
        assert_eq!(backend.is_text_based(), format.is_text_based());
    }
}

#[test]
fn test_engine_call_sequence() {
    init_tracing();

    let v = value!({"id": 7, "tags": ["a", "b"], "ok": true});
    let mut serializer = Serializer::new(Counting::new(BinaryBackend::new()), Options::default());
    let bytes = serializer.write(&v).unwrap();

    let backend = serializer.backend_mut();
    assert_eq!(backend.count("write_struct_begin"), 1);
    assert_eq!(backend.count("write_struct_key"), 3);
    assert_eq!(backend.count("write_struct_end"), 1);
    assert_eq!(backend.count("write_list_begin"), 1);
    assert_eq!(backend.count("write_string"), 2);

    assert_eq!(serializer.read(&bytes).unwrap(), v);
    let backend = serializer.backend_mut();
    // Three keys plus the probe that finds the terminator.
    assert_eq!(backend.count("read_struct_key"), 4);
    assert_eq!(backend.count("read_list_begin"), 1);
    assert_eq!(backend.count("read_bool"), 1);
}

#[test]
fn test_custom_backend_over_bson() {
    init_tracing();

    let options = Options::default().with_max_depth(3);
    let mut serializer = Serializer::new(Counting::new(BsonBackend::new()), options);
    assert_eq!(serializer.format(), Format::Bson);
    assert_eq!(serializer.write_string(&Value::Int(1)), Err(Error::NotTextBased(Format::Bson)));

    let deep = value!([[[[1]]]]);
    assert_eq!(serializer.write(&deep), Err(Error::DepthLimitExceeded(3)));

    let shallow = value!([[1]]);
    let bytes = serializer.write(&shallow).unwrap();
    assert_eq!(serializer.read(&bytes).unwrap(), shallow);
}
