//! Typed values
//!
//! Setiap value punya satu tipe tetap. Tidak ada coercion implisit:
//! accessor `as_*` mengembalikan `DataError::TypeMismatch` jika tipe tidak cocok.

use std::fmt;

use tracing::warn;

use crate::error::{DataError, DataResult};

/// Separator default untuk array dan daftar child container
pub const DEFAULT_SEPARATOR: char = ',';

/// Body untuk string array `[""]`; body kosong berarti array kosong.
/// Backslash tunggal tidak pernah muncul dari `escape_element`.
const LONE_EMPTY_ELEMENT: &str = "\\";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    None,
    Int,
    Float,
    String,
    IntArray,
    FloatArray,
    StringArray,
    Container,
}

impl ValueType {
    pub const ALL: [ValueType; 8] = [
        ValueType::None,
        ValueType::Int,
        ValueType::Float,
        ValueType::String,
        ValueType::IntArray,
        ValueType::FloatArray,
        ValueType::StringArray,
        ValueType::Container,
    ];

    /// Type marker yang dipakai di atribut `type="..."`
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::None => "none",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::IntArray => "intarray",
            ValueType::FloatArray => "floatarray",
            ValueType::StringArray => "stringarray",
            ValueType::Container => "container",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(marker.trim()))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Int(i32),
    Float(f32),
    String(String),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    StringArray(Vec<String>),
    /// Nama child (segment terakhir), urut sesuai kedatangan
    Container(Vec<String>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::None => ValueType::None,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::IntArray(_) => ValueType::IntArray,
            Value::FloatArray(_) => ValueType::FloatArray,
            Value::StringArray(_) => ValueType::StringArray,
            Value::Container(_) => ValueType::Container,
        }
    }

    /// Default value untuk sebuah tipe
    pub fn default_for(ty: ValueType) -> Self {
        match ty {
            ValueType::None => Value::None,
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::String => Value::String(String::new()),
            ValueType::IntArray => Value::IntArray(Vec::new()),
            ValueType::FloatArray => Value::FloatArray(Vec::new()),
            ValueType::StringArray => Value::StringArray(Vec::new()),
            ValueType::Container => Value::Container(Vec::new()),
        }
    }

    fn mismatch(&self, requested: ValueType) -> DataError {
        DataError::TypeMismatch {
            name: String::new(),
            stored: self.value_type(),
            requested,
        }
    }

    pub fn as_int(&self) -> DataResult<i32> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(other.mismatch(ValueType::Int)),
        }
    }

    pub fn as_float(&self) -> DataResult<f32> {
        match self {
            Value::Float(v) => Ok(*v),
            other => Err(other.mismatch(ValueType::Float)),
        }
    }

    pub fn as_str(&self) -> DataResult<&str> {
        match self {
            Value::String(v) => Ok(v),
            other => Err(other.mismatch(ValueType::String)),
        }
    }

    pub fn as_int_array(&self) -> DataResult<&[i32]> {
        match self {
            Value::IntArray(v) => Ok(v),
            other => Err(other.mismatch(ValueType::IntArray)),
        }
    }

    pub fn as_float_array(&self) -> DataResult<&[f32]> {
        match self {
            Value::FloatArray(v) => Ok(v),
            other => Err(other.mismatch(ValueType::FloatArray)),
        }
    }

    pub fn as_string_array(&self) -> DataResult<&[String]> {
        match self {
            Value::StringArray(v) => Ok(v),
            other => Err(other.mismatch(ValueType::StringArray)),
        }
    }

    pub fn as_container(&self) -> DataResult<&[String]> {
        match self {
            Value::Container(v) => Ok(v),
            other => Err(other.mismatch(ValueType::Container)),
        }
    }

    /// Tambah nama ke container: duplikat diabaikan, urutan lama dipertahankan
    ///
    /// Return jumlah nama yang benar-benar baru.
    pub fn extend_container<I, S>(&mut self, names: I) -> DataResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let children = match self {
            Value::Container(children) => children,
            other => return Err(other.mismatch(ValueType::Container)),
        };
        let mut added = 0;
        for name in names {
            let name = name.into();
            if !children.contains(&name) {
                children.push(name);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Canonical text form
    ///
    /// Float memakai representasi terpendek yang round-trip.
    pub fn render(&self, separator: char) -> String {
        let sep = separator.to_string();
        match self {
            Value::None => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => format!("{:?}", v),
            Value::String(v) => v.clone(),
            Value::IntArray(v) => v
                .iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(&sep),
            Value::FloatArray(v) => v
                .iter()
                .map(|x| format!("{:?}", x))
                .collect::<Vec<_>>()
                .join(&sep),
            Value::StringArray(v) if is_single_empty(v) => LONE_EMPTY_ELEMENT.to_string(),
            Value::StringArray(v) => v
                .iter()
                .map(|s| escape_element(s, separator))
                .collect::<Vec<_>>()
                .join(&sep),
            Value::Container(v) => v.join(&sep),
        }
    }

    /// Inverse dari `render` untuk tipe yang diketahui
    ///
    /// Token numerik yang rusak di-log dan menjadi nol.
    pub fn parse_body(ty: ValueType, text: &str, separator: char) -> Value {
        match ty {
            ValueType::None => Value::None,
            ValueType::Int => Value::Int(parse_number(text.trim())),
            ValueType::Float => Value::Float(parse_number(text.trim())),
            ValueType::String => Value::String(text.to_string()),
            ValueType::IntArray => Value::IntArray(
                split_plain(text, separator)
                    .map(|t| parse_number(t.trim()))
                    .collect(),
            ),
            ValueType::FloatArray => Value::FloatArray(
                split_plain(text, separator)
                    .map(|t| parse_number(t.trim()))
                    .collect(),
            ),
            ValueType::StringArray => Value::StringArray(split_escaped(text, separator)),
            ValueType::Container => Value::Container(
                split_plain(text, separator)
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(DEFAULT_SEPARATOR))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::IntArray(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::FloatArray(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringArray(v)
    }
}

/// Tebak tipe dari text tanpa marker
///
/// Urutan: int, float, container (diawali `<`), int array, float array, string.
pub fn infer_type(text: &str) -> ValueType {
    let trimmed = text.trim();
    if is_int(trimmed) {
        return ValueType::Int;
    }
    if is_float(trimmed) {
        return ValueType::Float;
    }
    if trimmed.starts_with('<') {
        return ValueType::Container;
    }
    if let Some((first, _)) = trimmed.split_once(DEFAULT_SEPARATOR) {
        let first = first.trim();
        if is_int(first) {
            return ValueType::IntArray;
        }
        if is_float(first) {
            return ValueType::FloatArray;
        }
    }
    ValueType::String
}

fn is_int(token: &str) -> bool {
    token.parse::<i32>().is_ok()
}

// "inf" / "nan" diterima oleh f32::from_str, tapi bukan angka di sini
fn is_float(token: &str) -> bool {
    token.bytes().any(|b| b.is_ascii_digit()) && token.parse::<f32>().is_ok()
}

fn parse_number<T>(token: &str) -> T
where
    T: std::str::FromStr + Default,
{
    match token.parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            warn!(token, "malformed numeric token, using zero");
            T::default()
        }
    }
}

fn split_plain(text: &str, separator: char) -> impl Iterator<Item = &str> {
    let empty = text.trim().is_empty();
    text.split(separator).filter(move |_| !empty)
}

fn escape_element(element: &str, separator: char) -> String {
    let mut out = String::with_capacity(element.len());
    for c in element.chars() {
        if c == '\\' || c == separator {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn is_single_empty(elements: &[String]) -> bool {
    matches!(elements, [only] if only.is_empty())
}

fn split_escaped(text: &str, separator: char) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if text == LONE_EMPTY_ELEMENT {
        return vec![String::new()];
    }
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => current.push(next),
                None => current.push('\\'),
            }
        } else if c == separator {
            out.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    out.push(current);
    out
}
