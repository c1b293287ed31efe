//! The primitive operations every wire format provides.
//!
//! The engine walks a [`Value`](crate::Value) tree and calls these methods in
//! document order. A backend never sees a whole tree; it only renders or
//! recognises one token at a time and keeps whatever nesting state its grammar
//! needs (an indentation stack, a pending key, a sentinel to un-read).
//!
//! A backend instance serves one write or one read at a time. Calling
//! `init_write` or `init_read` discards any previous state.

use crate::{Format, Result, ValueType};

pub trait Backend {
    fn format(&self) -> Format;

    /// Whether this backend produces and consumes UTF-8 text.
    fn is_text_based(&self) -> bool {
        self.format().is_text_based()
    }

    // Lifecycle

    fn init_write(&mut self) -> Result<()>;

    /// Returns the encoded document and leaves the backend empty.
    fn finish_write(&mut self) -> Result<Vec<u8>>;

    /// Copies `input` into the backend and positions it at the first token.
    fn init_read(&mut self, input: &[u8]) -> Result<()>;

    /// Checks that nothing but trailing whitespace follows the root value.
    fn finish_read(&mut self) -> Result<()>;

    // Writing

    fn write_int(&mut self, value: i64) -> Result<()>;
    fn write_uint(&mut self, value: u64) -> Result<()>;
    fn write_float(&mut self, value: f64) -> Result<()>;
    fn write_string(&mut self, value: &str) -> Result<()>;
    fn write_bool(&mut self, value: bool) -> Result<()>;

    fn write_list_begin(&mut self, len: usize) -> Result<()>;
    fn write_list_end(&mut self) -> Result<()>;

    fn write_struct_begin(&mut self) -> Result<()>;
    fn write_struct_key(&mut self, key: &str) -> Result<()>;
    fn write_struct_end(&mut self) -> Result<()>;

    fn write_matrix(&mut self, dims: &[usize], data: &[f64]) -> Result<()>;

    // Reading

    /// Tag of the next value without consuming it, or `None` at the end of
    /// the current container or of the input.
    fn peek(&mut self) -> Result<Option<ValueType>>;

    fn read_int(&mut self) -> Result<i64>;
    fn read_uint(&mut self) -> Result<u64>;
    fn read_float(&mut self) -> Result<f64>;
    fn read_string(&mut self) -> Result<String>;
    fn read_bool(&mut self) -> Result<bool>;

    /// Consumes the list opener and returns the element count.
    fn read_list_begin(&mut self) -> Result<usize>;
    fn read_list_end(&mut self) -> Result<()>;

    fn read_struct_begin(&mut self) -> Result<()>;

    /// The next key, or `None` once the struct has no more entries. Returning
    /// `None` must not consume the terminator; `read_struct_end` does.
    fn read_struct_key(&mut self) -> Result<Option<String>>;
    fn read_struct_end(&mut self) -> Result<()>;

    fn read_matrix(&mut self) -> Result<(Vec<usize>, Vec<f64>)>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn format(&self) -> Format {
        (**self).format()
    }
    fn is_text_based(&self) -> bool {
        (**self).is_text_based()
    }
    fn init_write(&mut self) -> Result<()> {
        (**self).init_write()
    }
    fn finish_write(&mut self) -> Result<Vec<u8>> {
        (**self).finish_write()
    }
    fn init_read(&mut self, input: &[u8]) -> Result<()> {
        (**self).init_read(input)
    }
    fn finish_read(&mut self) -> Result<()> {
        (**self).finish_read()
    }
    fn write_int(&mut self, value: i64) -> Result<()> {
        (**self).write_int(value)
    }
    fn write_uint(&mut self, value: u64) -> Result<()> {
        (**self).write_uint(value)
    }
    fn write_float(&mut self, value: f64) -> Result<()> {
        (**self).write_float(value)
    }
    fn write_string(&mut self, value: &str) -> Result<()> {
        (**self).write_string(value)
    }
    fn write_bool(&mut self, value: bool) -> Result<()> {
        (**self).write_bool(value)
    }
    fn write_list_begin(&mut self, len: usize) -> Result<()> {
        (**self).write_list_begin(len)
    }
    fn write_list_end(&mut self) -> Result<()> {
        (**self).write_list_end()
    }
    fn write_struct_begin(&mut self) -> Result<()> {
        (**self).write_struct_begin()
    }
    fn write_struct_key(&mut self, key: &str) -> Result<()> {
        (**self).write_struct_key(key)
    }
    fn write_struct_end(&mut self) -> Result<()> {
        (**self).write_struct_end()
    }
    fn write_matrix(&mut self, dims: &[usize], data: &[f64]) -> Result<()> {
        (**self).write_matrix(dims, data)
    }
    fn peek(&mut self) -> Result<Option<ValueType>> {
        (**self).peek()
    }
    fn read_int(&mut self) -> Result<i64> {
        (**self).read_int()
    }
    fn read_uint(&mut self) -> Result<u64> {
        (**self).read_uint()
    }
    fn read_float(&mut self) -> Result<f64> {
        (**self).read_float()
    }
    fn read_string(&mut self) -> Result<String> {
        (**self).read_string()
    }
    fn read_bool(&mut self) -> Result<bool> {
        (**self).read_bool()
    }
    fn read_list_begin(&mut self) -> Result<usize> {
        (**self).read_list_begin()
    }
    fn read_list_end(&mut self) -> Result<()> {
        (**self).read_list_end()
    }
    fn read_struct_begin(&mut self) -> Result<()> {
        (**self).read_struct_begin()
    }
    fn read_struct_key(&mut self) -> Result<Option<String>> {
        (**self).read_struct_key()
    }
    fn read_struct_end(&mut self) -> Result<()> {
        (**self).read_struct_end()
    }
    fn read_matrix(&mut self) -> Result<(Vec<usize>, Vec<f64>)> {
        (**self).read_matrix()
    }
}
