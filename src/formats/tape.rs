//! Replays an already-parsed [`Value`] as a stream of read primitives.
//!
//! Formats whose grammar cannot be read strictly front to back (a TOML
//! `[table]` header may extend a table opened much earlier) parse the whole
//! document first and then serve the engine from a tape.

use crate::{Error, Result, Value, ValueType};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    String(String),
    ListBegin(usize),
    ListEnd,
    StructBegin,
    Key(String),
    StructEnd,
    Matrix(Vec<usize>, Vec<f64>),
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::Int(_) => "int",
            Event::UInt(_) => "uint",
            Event::Float(_) => "float",
            Event::Bool(_) => "bool",
            Event::String(_) => "string",
            Event::ListBegin(_) => "list",
            Event::ListEnd => "end of list",
            Event::StructBegin => "struct",
            Event::Key(_) => "struct key",
            Event::StructEnd => "end of struct",
            Event::Matrix(..) => "matrix",
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Tape {
    events: std::vec::IntoIter<Event>,
    peeked: Option<Event>,
}

fn flatten(value: Value, events: &mut Vec<Event>) {
    match value {
        Value::Int(i) => events.push(Event::Int(i)),
        Value::UInt(u) => events.push(Event::UInt(u)),
        Value::Float(f) => events.push(Event::Float(f)),
        Value::Bool(b) => events.push(Event::Bool(b)),
        Value::String(s) => events.push(Event::String(s)),
        Value::List(items) => {
            events.push(Event::ListBegin(items.len()));
            for item in items {
                flatten(item, events);
            }
            events.push(Event::ListEnd);
        }
        Value::Struct(map) => {
            events.push(Event::StructBegin);
            for (key, item) in map {
                events.push(Event::Key(key));
                flatten(item, events);
            }
            events.push(Event::StructEnd);
        }
        Value::Matrix(m) => {
            let (dims, data) = m.into_parts();
            events.push(Event::Matrix(dims, data));
        }
    }
}

impl Tape {
    pub(crate) fn new(value: Value) -> Self {
        let mut events = Vec::new();
        flatten(value, &mut events);
        Tape {
            events: events.into_iter(),
            peeked: None,
        }
    }

    fn look(&mut self) -> Option<&Event> {
        if self.peeked.is_none() {
            self.peeked = self.events.next();
        }
        self.peeked.as_ref()
    }

    fn take(&mut self, expected: &str) -> Result<Event> {
        self.look();
        self.peeked
            .take()
            .ok_or_else(|| Error::type_mismatch(expected, "end of document"))
    }

    pub(crate) fn peek(&mut self) -> Option<ValueType> {
        match self.look()? {
            Event::Int(_) => Some(ValueType::Int),
            Event::UInt(_) => Some(ValueType::UInt),
            Event::Float(_) => Some(ValueType::Float),
            Event::Bool(_) => Some(ValueType::Bool),
            Event::String(_) => Some(ValueType::String),
            Event::ListBegin(_) => Some(ValueType::List),
            Event::StructBegin => Some(ValueType::Struct),
            Event::Matrix(..) => Some(ValueType::Matrix),
            Event::ListEnd | Event::StructEnd | Event::Key(_) => None,
        }
    }

    pub(crate) fn int(&mut self) -> Result<i64> {
        match self.take("int")? {
            Event::Int(i) => Ok(i),
            other => Err(Error::type_mismatch("int", other.name())),
        }
    }

    pub(crate) fn uint(&mut self) -> Result<u64> {
        match self.take("uint")? {
            Event::UInt(u) => Ok(u),
            other => Err(Error::type_mismatch("uint", other.name())),
        }
    }

    pub(crate) fn float(&mut self) -> Result<f64> {
        match self.take("float")? {
            Event::Float(f) => Ok(f),
            other => Err(Error::type_mismatch("float", other.name())),
        }
    }

    pub(crate) fn bool(&mut self) -> Result<bool> {
        match self.take("bool")? {
            Event::Bool(b) => Ok(b),
            other => Err(Error::type_mismatch("bool", other.name())),
        }
    }

    pub(crate) fn string(&mut self) -> Result<String> {
        match self.take("string")? {
            Event::String(s) => Ok(s),
            other => Err(Error::type_mismatch("string", other.name())),
        }
    }

    pub(crate) fn list_begin(&mut self) -> Result<usize> {
        match self.take("list")? {
            Event::ListBegin(len) => Ok(len),
            other => Err(Error::type_mismatch("list", other.name())),
        }
    }

    pub(crate) fn list_end(&mut self) -> Result<()> {
        match self.take("end of list")? {
            Event::ListEnd => Ok(()),
            other => Err(Error::type_mismatch("end of list", other.name())),
        }
    }

    pub(crate) fn struct_begin(&mut self) -> Result<()> {
        match self.take("struct")? {
            Event::StructBegin => Ok(()),
            other => Err(Error::type_mismatch("struct", other.name())),
        }
    }

    /// The next key, leaving anything else in place.
    pub(crate) fn key(&mut self) -> Option<String> {
        match self.look() {
            Some(Event::Key(_)) => match self.peeked.take() {
                Some(Event::Key(k)) => Some(k),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn struct_end(&mut self) -> Result<()> {
        match self.take("end of struct")? {
            Event::StructEnd => Ok(()),
            other => Err(Error::type_mismatch("end of struct", other.name())),
        }
    }

    pub(crate) fn matrix(&mut self) -> Result<(Vec<usize>, Vec<f64>)> {
        match self.take("matrix")? {
            Event::Matrix(dims, data) => Ok((dims, data)),
            other => Err(Error::type_mismatch("matrix", other.name())),
        }
    }

    pub(crate) fn is_done(&mut self) -> bool {
        self.look().is_none()
    }
}
