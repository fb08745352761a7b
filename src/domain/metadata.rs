use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Metadata map key. Logger metadata is keyed by symbols, but maps built by
/// callers may also carry plain string keys.
///
/// Both kinds are kept apart until the safety pass renders every key as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKey {
    Atom(String),
    Text(String),
}

impl MetadataKey {
    pub fn atom(name: impl Into<String>) -> Self {
        MetadataKey::Atom(name.into())
    }

    pub fn text(name: impl Into<String>) -> Self {
        MetadataKey::Text(name.into())
    }

    /// Key name regardless of its kind.
    pub fn name(&self) -> &str {
        match self {
            MetadataKey::Atom(name) | MetadataKey::Text(name) => name,
        }
    }

    /// A key of the same kind with a different name.
    pub fn renamed(&self, name: &str) -> Self {
        match self {
            MetadataKey::Atom(_) => MetadataKey::Atom(name.to_string()),
            MetadataKey::Text(_) => MetadataKey::Text(name.to_string()),
        }
    }
}

/// Logger metadata keys are symbols, so bare string literals become atoms.
impl From<&str> for MetadataKey {
    fn from(value: &str) -> Self {
        MetadataKey::Atom(value.to_string())
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataKey::Atom(name) => write!(f, ":{name}"),
            MetadataKey::Text(name) => write!(f, "\"{name}\""),
        }
    }
}

pub type Metadata = BTreeMap<MetadataKey, MetadataValue>;

/// Opaque process identifier. Only its display form ever leaves the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId {
    pub node: u32,
    pub id: u32,
    pub serial: u32,
}

impl ProcessId {
    pub fn new(node: u32, id: u32, serial: u32) -> Self {
        Self { node, id, serial }
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}.{}.{}>", self.node, self.id, self.serial)
    }
}

impl FromStr for ProcessId {
    type Err = String;

    /// Accepts `<0.123.0>`, `#PID<0.123.0>` and the bare `0.123.0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed.strip_prefix("#PID").unwrap_or(trimmed);
        let inner = inner
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .unwrap_or(inner);

        let parts: Vec<&str> = inner.split('.').collect();
        let [node, id, serial] = parts.as_slice() else {
            return Err(format!("invalid process identifier '{s}'"));
        };

        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|e| format!("invalid process identifier '{s}': {e}"))
        };

        Ok(Self::new(parse(*node)?, parse(*id)?, parse(*serial)?))
    }
}

/// One frame of a crash stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub application: Option<String>,
    pub module: String,
    pub function: String,
    pub arity: u32,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl StackFrame {
    pub fn new(module: impl Into<String>, function: impl Into<String>, arity: u32) -> Self {
        Self {
            application: None,
            module: module.into(),
            function: function.into(),
            arity,
            file: None,
            line: None,
        }
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }
}

/// A `(error, stacktrace)` pair describing a crash.
#[derive(Debug, Clone, PartialEq)]
pub struct CrashReason {
    pub error: Box<MetadataValue>,
    pub stacktrace: Vec<StackFrame>,
}

impl CrashReason {
    pub fn new(error: MetadataValue, stacktrace: Vec<StackFrame>) -> Self {
        Self {
            error: Box::new(error),
            stacktrace,
        }
    }
}

/// A structured value carrying a type tag, e.g. an exception struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub fields: BTreeMap<String, MetadataValue>,
}

/// Types that can be logged as metadata records.
///
/// Implementors decide explicitly which fields reach the payload; the type
/// tag never does.
pub trait StructuredRecord {
    fn type_name(&self) -> &str;

    fn to_fields(&self) -> BTreeMap<String, MetadataValue>;
}

/// Arbitrary metadata term as produced by a logging front end.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Atom(String),
    List(Vec<MetadataValue>),
    Map(Metadata),
    /// Ordered `(symbol, value)` pairs; becomes a map in the safety pass.
    Keyword(Vec<(String, MetadataValue)>),
    Tuple(Vec<MetadataValue>),
    Record(Record),
    Pid(ProcessId),
    CrashReason(CrashReason),
}

impl MetadataValue {
    pub fn text(value: impl Into<String>) -> Self {
        MetadataValue::Text(value.into())
    }

    pub fn atom(value: impl Into<String>) -> Self {
        MetadataValue::Atom(value.into())
    }

    pub fn from_record<R: StructuredRecord + ?Sized>(record: &R) -> Self {
        MetadataValue::Record(Record {
            type_name: record.type_name().to_string(),
            fields: record.to_fields(),
        })
    }

    /// Short shape name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            MetadataValue::Null => "null",
            MetadataValue::Bool(_) => "boolean",
            MetadataValue::Integer(_) => "integer",
            MetadataValue::Float(_) => "float",
            MetadataValue::Text(_) => "text",
            MetadataValue::Atom(_) => "atom",
            MetadataValue::List(_) => "list",
            MetadataValue::Map(_) => "map",
            MetadataValue::Keyword(_) => "keyword list",
            MetadataValue::Tuple(items) if items.len() == 2 => "pair",
            MetadataValue::Tuple(_) => "tuple",
            MetadataValue::Record(_) => "record",
            MetadataValue::Pid(_) => "pid",
            MetadataValue::CrashReason(_) => "crash reason",
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<ProcessId> for MetadataValue {
    fn from(value: ProcessId) -> Self {
        MetadataValue::Pid(value)
    }
}

impl From<CrashReason> for MetadataValue {
    fn from(value: CrashReason) -> Self {
        MetadataValue::CrashReason(value)
    }
}

impl<T: Into<MetadataValue>> From<Vec<T>> for MetadataValue {
    fn from(value: Vec<T>) -> Self {
        MetadataValue::List(value.into_iter().map(Into::into).collect())
    }
}
