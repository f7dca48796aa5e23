//! Hierarchical typed name index
//!
//! Nama berbentuk path (`/a/b/c`). Nama relatif di-resolve terhadap namespace
//! yang diberikan, lalu setiap ancestor-nya sampai root; match pertama menang.
//!
//! Invariant:
//! - Setiap nama yang terdaftar di sebuah container ada di index yang sama
//! - Tipe sebuah nama tidak pernah berubah setelah dibuat
//! - Ancestor dari setiap entry adalah container

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::markup::{self, Element};
use super::value::{infer_type, Value, ValueType, DEFAULT_SEPARATOR};
use crate::error::{DataError, DataResult};

pub const ROOT_NAMESPACE: &str = "/";
pub const DEFAULT_INDEX_NAME: &str = "MVR";
pub const SEPARATOR_ATTRIBUTE: &str = "separator";
const TYPE_ATTRIBUTE: &str = "type";

/// Value plus atribut tambahan (selain `type`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entry {
    pub value: Value,
    pub attributes: Vec<(String, String)>,
}

impl Entry {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
    }

    /// Separator array untuk entry ini (atribut `separator`, default `,`)
    pub fn separator(&self) -> char {
        self.attribute(SEPARATOR_ATTRIBUTE)
            .and_then(|s| s.chars().next())
            .unwrap_or(DEFAULT_SEPARATOR)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Snapshot {
    entries: BTreeMap<String, Entry>,
    roots: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DataIndex {
    name: String,
    entries: BTreeMap<String, Entry>,
    /// Entry level root, urut sesuai kedatangan
    roots: Vec<String>,
    namespaces: Vec<String>,
    states: Vec<Snapshot>,
}

impl Default for DataIndex {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_NAME)
    }
}

impl DataIndex {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: BTreeMap::new(),
            roots: Vec::new(),
            namespaces: vec![ROOT_NAMESPACE.to_string()],
            states: Vec::new(),
        }
    }

    /// Bangun index dari text hasil `serialize_root` atau `serialize_all`
    ///
    /// Jika text adalah satu container yang namanya sama dengan index,
    /// container itu di-unwrap sehingga isinya masuk di root.
    pub fn from_serialized(name: &str, text: &str) -> DataResult<Self> {
        let mut index = Self::new(name);
        let elements = markup::parse_all(text)?;
        let wrapped = elements.len() == 1
            && elements[0].name == name
            && elements[0].attribute(TYPE_ATTRIBUTE) == Some(ValueType::Container.as_str());
        let top = if wrapped {
            &elements[0].children
        } else {
            &elements
        };
        for element in top {
            index.add_element(element, ROOT_NAMESPACE)?;
        }
        Ok(index)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── add ─────────────────────────────────────────────────

    /// Tambah atau ganti value di namespace saat ini
    pub fn add(&mut self, name: &str, value: Value) -> DataResult<String> {
        let namespace = self.current_namespace().to_string();
        self.add_in(name, &namespace, value)
    }

    /// Tambah atau ganti value; return nama absolut
    ///
    /// - Mengganti tipe nama yang sudah ada adalah error
    /// - Ancestor yang belum ada dibuat sebagai container dan di-link
    /// - Container yang ditambahkan ke container yang ada memperluasnya
    /// - Setiap child dari container harus sudah ada
    pub fn add_in(&mut self, name: &str, namespace: &str, value: Value) -> DataResult<String> {
        let abs = absolute_name(name, namespace)?;

        if let Value::Container(children) = &value {
            for child in children {
                validate_segment(child)?;
                let child_abs = join(&abs, child);
                if !self.entries.contains_key(&child_abs) {
                    return Err(DataError::DanglingChild {
                        container: abs,
                        child: child.clone(),
                    });
                }
            }
        }

        if let Some(entry) = self.entries.get_mut(&abs) {
            let stored = entry.value.value_type();
            if stored != value.value_type() {
                return Err(DataError::TypeMismatch {
                    name: abs,
                    stored,
                    requested: value.value_type(),
                });
            }
            match value {
                Value::Container(children) => {
                    entry.value.extend_container(children)?;
                }
                other => entry.value = other,
            }
            return Ok(abs);
        }

        self.ensure_ancestors(&abs)?;
        self.entries.insert(
            abs.clone(),
            Entry {
                value,
                attributes: Vec::new(),
            },
        );
        self.link(&abs)?;
        Ok(abs)
    }

    /// `"a/b=5"`: tipe diambil dari entry yang ada, atau ditebak dari text
    pub fn add_key_value(&mut self, assignment: &str) -> DataResult<String> {
        let (name, text) = assignment.split_once('=').ok_or_else(|| DataError::Parse {
            offset: 0,
            reason: format!("expected name=value, got {:?}", assignment),
        })?;
        let name = name.trim();
        let abs = absolute_name(name, self.current_namespace())?;
        let (ty, separator) = match self.entries.get(&abs) {
            Some(entry) => (entry.value.value_type(), entry.separator()),
            None => (infer_type(text), DEFAULT_SEPARATOR),
        };
        let text = if keeps_whitespace(ty) {
            text
        } else {
            text.trim()
        };
        self.add_in(&abs, ROOT_NAMESPACE, Value::parse_body(ty, text, separator))
    }

    fn ensure_ancestors(&mut self, abs: &str) -> DataResult<()> {
        let mut prefix = String::new();
        let segments: Vec<&str> = abs.trim_start_matches('/').split('/').collect();
        for segment in &segments[..segments.len() - 1] {
            prefix.push('/');
            prefix.push_str(segment);
            match self.entries.get(&prefix) {
                Some(entry) if entry.value.value_type() == ValueType::Container => {}
                Some(_) => return Err(DataError::InvalidNamespace(prefix)),
                None => {
                    self.entries.insert(
                        prefix.clone(),
                        Entry {
                            value: Value::Container(Vec::new()),
                            attributes: Vec::new(),
                        },
                    );
                    self.link(&prefix)?;
                }
            }
        }
        Ok(())
    }

    /// Daftarkan `abs` di container parent-nya (atau di root)
    fn link(&mut self, abs: &str) -> DataResult<()> {
        let (parent, leaf) = split_parent(abs);
        if parent.is_empty() {
            if !self.roots.iter().any(|r| r == leaf) {
                self.roots.push(leaf.to_string());
            }
            return Ok(());
        }
        match self.entries.get_mut(parent) {
            Some(entry) => entry.value.extend_container([leaf]).map(|_| ()),
            None => Err(DataError::NotFound(parent.to_string())),
        }
    }

    /// Parse satu tag top-level dan buat value-nya di namespace saat ini
    pub fn add_serialized(&mut self, text: &str) -> DataResult<String> {
        let namespace = self.current_namespace().to_string();
        self.add_serialized_in(text, &namespace)
    }

    pub fn add_serialized_in(&mut self, text: &str, namespace: &str) -> DataResult<String> {
        let element = markup::parse_first(text)?;
        self.add_element(&element, namespace)
    }

    /// Semua tag top-level; return nama yang dibuat, urut sesuai input
    pub fn add_serialized_all(&mut self, text: &str) -> DataResult<Vec<String>> {
        let namespace = self.current_namespace().to_string();
        markup::parse_all(text)?
            .iter()
            .map(|element| self.add_element(element, &namespace))
            .collect()
    }

    fn add_element(&mut self, element: &Element, namespace: &str) -> DataResult<String> {
        let ty = match element.attribute(TYPE_ATTRIBUTE) {
            Some(marker) => ValueType::from_marker(marker)
                .ok_or_else(|| DataError::UnknownType(marker.to_string()))?,
            None if !element.children.is_empty() => ValueType::Container,
            None => infer_type(&element.text),
        };
        let attributes: Vec<(String, String)> = element
            .attributes
            .iter()
            .filter(|(k, _)| k != TYPE_ATTRIBUTE)
            .cloned()
            .collect();

        let abs = if ty == ValueType::Container {
            let abs = self.add_in(&element.name, namespace, Value::Container(Vec::new()))?;
            let child_namespace = format!("{}/", abs);
            for child in &element.children {
                self.add_element(child, &child_namespace)?;
            }
            abs
        } else {
            let separator = attributes
                .iter()
                .find(|(k, _)| k == SEPARATOR_ATTRIBUTE)
                .and_then(|(_, v)| v.chars().next())
                .unwrap_or(DEFAULT_SEPARATOR);
            let body = if keeps_whitespace(ty) {
                element.text.as_str()
            } else {
                element.text.trim()
            };
            let value = Value::parse_body(ty, body, separator);
            self.add_in(&element.name, namespace, value)?
        };

        if let Some(entry) = self.entries.get_mut(&abs) {
            for (k, v) in &attributes {
                entry.set_attribute(k, v);
            }
        }
        Ok(abs)
    }

    // ── lookup ──────────────────────────────────────────────

    /// Nama absolut dari entry yang akan dibaca untuk `name` di `namespace`
    pub fn resolve(&self, name: &str, namespace: &str) -> DataResult<String> {
        if name.starts_with('/') {
            let abs = absolute_name(name, ROOT_NAMESPACE)?;
            return if self.entries.contains_key(&abs) {
                Ok(abs)
            } else {
                Err(DataError::NotFound(abs))
            };
        }
        let name = name.trim_end_matches('/');
        let mut scope = normalize_namespace(namespace)?;
        loop {
            let candidate = format!("{}{}", scope, name);
            if self.entries.contains_key(&candidate) {
                return Ok(candidate);
            }
            if scope == ROOT_NAMESPACE {
                return Err(DataError::NotFound(name.to_string()));
            }
            scope = parent_namespace(&scope);
        }
    }

    pub fn get(&self, name: &str) -> DataResult<&Value> {
        self.get_in(name, self.current_namespace())
    }

    pub fn get_in(&self, name: &str, namespace: &str) -> DataResult<&Value> {
        self.entry_in(name, namespace).map(|e| &e.value)
    }

    pub fn entry_in(&self, name: &str, namespace: &str) -> DataResult<&Entry> {
        let abs = self.resolve(name, namespace)?;
        self.entries.get(&abs).ok_or(DataError::NotFound(abs))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name, self.current_namespace()).is_ok()
    }

    pub fn exists_in(&self, name: &str, namespace: &str) -> bool {
        self.resolve(name, namespace).is_ok()
    }

    pub fn value_type(&self, name: &str) -> DataResult<ValueType> {
        self.get(name).map(Value::value_type)
    }

    // ── permissive accessors ────────────────────────────────

    fn typed<'s, T, F>(&'s self, name: &str, extract: F) -> Option<T>
    where
        F: FnOnce(&'s Value) -> DataResult<T>,
    {
        match self.get(name) {
            Ok(value) => match extract(value) {
                Ok(v) => Some(v),
                Err(DataError::TypeMismatch {
                    stored, requested, ..
                }) => {
                    warn!(key = name, %stored, %requested, "type mismatch, returning default");
                    None
                }
                Err(e) => {
                    warn!(key = name, error = %e, "lookup failed, returning default");
                    None
                }
            },
            Err(e) => {
                warn!(key = name, error = %e, "lookup failed, returning default");
                None
            }
        }
    }

    pub fn get_int(&self, name: &str) -> i32 {
        self.typed(name, Value::as_int).unwrap_or_default()
    }

    pub fn get_float(&self, name: &str) -> f32 {
        self.typed(name, Value::as_float).unwrap_or_default()
    }

    pub fn get_string(&self, name: &str) -> String {
        self.typed(name, Value::as_str)
            .map(str::to_string)
            .unwrap_or_default()
    }

    pub fn get_int_array(&self, name: &str) -> Vec<i32> {
        self.typed(name, Value::as_int_array)
            .map(<[i32]>::to_vec)
            .unwrap_or_default()
    }

    pub fn get_float_array(&self, name: &str) -> Vec<f32> {
        self.typed(name, Value::as_float_array)
            .map(<[f32]>::to_vec)
            .unwrap_or_default()
    }

    pub fn get_string_array(&self, name: &str) -> Vec<String> {
        self.typed(name, Value::as_string_array)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    pub fn get_container(&self, name: &str) -> Vec<String> {
        self.typed(name, Value::as_container)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    // ── attributes ──────────────────────────────────────────

    pub fn attribute(&self, name: &str, attr: &str) -> Option<&str> {
        self.entry_in(name, self.current_namespace())
            .ok()
            .and_then(|e| e.attribute(attr))
    }

    pub fn set_attribute(&mut self, name: &str, attr: &str, value: &str) -> DataResult<()> {
        if attr == TYPE_ATTRIBUTE {
            return Err(DataError::InvalidName(attr.to_string()));
        }
        let abs = self.resolve(name, self.current_namespace())?;
        match self.entries.get_mut(&abs) {
            Some(entry) => {
                entry.set_attribute(attr, value);
                Ok(())
            }
            None => Err(DataError::NotFound(abs)),
        }
    }

    // ── namespace stack ─────────────────────────────────────

    pub fn current_namespace(&self) -> &str {
        self.namespaces
            .last()
            .map(String::as_str)
            .unwrap_or(ROOT_NAMESPACE)
    }

    /// Namespace valid: root atau container yang ada. Return bentuk normal (`/a/b/`)
    pub fn validate_namespace(&self, namespace: &str) -> DataResult<String> {
        let normalized = if namespace.starts_with('/') {
            normalize_namespace(namespace)?
        } else {
            normalize_namespace(&format!("{}{}", self.current_namespace(), namespace))?
        };
        if normalized == ROOT_NAMESPACE {
            return Ok(normalized);
        }
        match self.entries.get(normalized.trim_end_matches('/')) {
            Some(entry) if entry.value.value_type() == ValueType::Container => Ok(normalized),
            _ => Err(DataError::InvalidNamespace(normalized)),
        }
    }

    pub fn push_namespace(&mut self, namespace: &str) -> DataResult<&str> {
        let normalized = self.validate_namespace(namespace)?;
        debug!(namespace = %normalized, "push namespace");
        self.namespaces.push(normalized);
        Ok(self.current_namespace())
    }

    /// Root tidak pernah di-pop
    pub fn pop_namespace(&mut self) -> &str {
        if self.namespaces.len() > 1 {
            self.namespaces.pop();
        } else {
            warn!("namespace stack is already at the root");
        }
        self.current_namespace()
    }

    // ── state stack ─────────────────────────────────────────

    /// Simpan state; `pop_state` membatalkan semua perubahan setelah ini
    pub fn push_state(&mut self) {
        self.states.push(Snapshot {
            entries: self.entries.clone(),
            roots: self.roots.clone(),
        });
    }

    pub fn pop_state(&mut self) -> DataResult<()> {
        let snapshot = self.states.pop().ok_or(DataError::EmptyStateStack)?;
        self.entries = snapshot.entries;
        self.roots = snapshot.roots;
        Ok(())
    }

    pub fn state_depth(&self) -> usize {
        self.states.len()
    }

    // ── queries ─────────────────────────────────────────────

    /// Semua nama absolut, terurut
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Nama entry level root, urut sesuai kedatangan
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn select_by_type(&self, ty: ValueType) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.value.value_type() == ty)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Entry yang segment terakhirnya sama dengan `key`
    pub fn select_by_key(&self, key: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|k| split_parent(k).1 == key)
            .cloned()
            .collect()
    }

    /// Entry yang punya atribut `attr`; dengan `value`, nilainya harus sama
    pub fn select_by_attribute(&self, attr: &str, value: Option<&str>) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| match (e.attribute(attr), value) {
                (Some(found), Some(wanted)) => found == wanted,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Nama absolut child dari sebuah container
    pub fn children(&self, name: &str) -> DataResult<Vec<String>> {
        let abs = self.resolve(name, self.current_namespace())?;
        let children = self
            .entries
            .get(&abs)
            .ok_or_else(|| DataError::NotFound(abs.clone()))?
            .value
            .as_container()
            .map_err(|e| e.with_name(&abs))?;
        Ok(children.iter().map(|c| join(&abs, c)).collect())
    }

    // ── serialize ───────────────────────────────────────────

    pub fn serialize(&self, name: &str) -> DataResult<String> {
        self.serialize_in(name, self.current_namespace())
    }

    /// `<leaf type="TYPE" attrs...>value</leaf>`, container berisi child-nya
    pub fn serialize_in(&self, name: &str, namespace: &str) -> DataResult<String> {
        let abs = self.resolve(name, namespace)?;
        let mut out = String::new();
        self.write_entry(&abs, &mut out)?;
        Ok(out)
    }

    /// Semua entry level root, dibungkus container bernama index
    pub fn serialize_all(&self) -> String {
        format!(
            "<{name} type=\"container\">{body}</{name}>",
            name = self.name,
            body = self.serialize_root()
        )
    }

    /// Entry level root digabung tanpa pembungkus (bentuk payload event)
    pub fn serialize_root(&self) -> String {
        let mut out = String::new();
        for root in &self.roots {
            let abs = format!("/{}", root);
            if let Err(e) = self.write_entry(&abs, &mut out) {
                warn!(key = %abs, error = %e, "skipping unserializable entry");
            }
        }
        out
    }

    fn write_entry(&self, abs: &str, out: &mut String) -> DataResult<()> {
        let entry = self
            .entries
            .get(abs)
            .ok_or_else(|| DataError::NotFound(abs.to_string()))?;
        let leaf = split_parent(abs).1;

        out.push('<');
        out.push_str(leaf);
        out.push_str(" type=\"");
        out.push_str(entry.value.value_type().as_str());
        out.push('"');
        for (k, v) in &entry.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&markup::escape(v));
            out.push('"');
        }
        out.push('>');

        match &entry.value {
            Value::Container(children) => {
                for child in children {
                    self.write_entry(&join(abs, child), out)?;
                }
            }
            value => out.push_str(&markup::escape(&value.render(entry.separator()))),
        }

        out.push_str("</");
        out.push_str(leaf);
        out.push('>');
        Ok(())
    }
}

impl DataError {
    pub(crate) fn with_name(self, abs: &str) -> Self {
        match self {
            DataError::TypeMismatch {
                stored, requested, ..
            } => DataError::TypeMismatch {
                name: abs.to_string(),
                stored,
                requested,
            },
            other => other,
        }
    }
}

/// Body string tidak di-trim; tipe lain di-trim
fn keeps_whitespace(ty: ValueType) -> bool {
    matches!(ty, ValueType::String | ValueType::StringArray)
}

// ── name helpers ────────────────────────────────────────────

/// Segment valid: huruf, digit, `_ - . :`; diawali huruf atau `_`
fn validate_segment(segment: &str) -> DataResult<()> {
    let mut chars = segment.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'));
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(DataError::InvalidName(segment.to_string()))
    }
}

/// `/a/b/` untuk namespace apapun (`a/b`, `/a/b`, `/a/b/`)
fn normalize_namespace(namespace: &str) -> DataResult<String> {
    let trimmed = namespace.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(ROOT_NAMESPACE.to_string());
    }
    for segment in trimmed.split('/') {
        validate_segment(segment)?;
    }
    Ok(format!("/{}/", trimmed))
}

fn parent_namespace(namespace: &str) -> String {
    let trimmed = namespace.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => ROOT_NAMESPACE.to_string(),
        Some(idx) => format!("{}/", &trimmed[..idx]),
    }
}

/// Nama absolut tanpa trailing slash
fn absolute_name(name: &str, namespace: &str) -> DataResult<String> {
    let name = name.trim();
    let full = if name.starts_with('/') {
        name.to_string()
    } else {
        format!("{}{}", normalize_namespace(namespace)?, name)
    };
    let trimmed = full.trim_matches('/');
    if trimmed.is_empty() {
        return Err(DataError::InvalidName(name.to_string()));
    }
    for segment in trimmed.split('/') {
        validate_segment(segment)?;
    }
    Ok(format!("/{}", trimmed))
}

/// (`/a/b`, `c`) dari `/a/b/c`; parent kosong untuk entry level root
fn split_parent(abs: &str) -> (&str, &str) {
    match abs.rfind('/') {
        Some(idx) => (&abs[..idx], &abs[idx + 1..]),
        None => ("", abs),
    }
}

fn join(parent: &str, leaf: &str) -> String {
    format!("{}/{}", parent, leaf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataIndex {
        let mut index = DataIndex::new("Test");
        index.add("/display/width", Value::Int(1920)).unwrap();
        index.add("/display/height", Value::Int(1080)).unwrap();
        index.add("/display/left/width", Value::Int(640)).unwrap();
        index.add("/scale", Value::Float(0.5)).unwrap();
        index
    }

    #[test]
    fn test_add_creates_ancestors() {
        let index = sample();
        assert_eq!(index.value_type("/display").unwrap(), ValueType::Container);
        assert_eq!(
            index.get_container("/display"),
            vec!["width", "height", "left"]
        );
        assert_eq!(index.get_container("/display/left"), vec!["width"]);
        assert_eq!(index.len(), 6);
    }

    #[test]
    fn test_scope_chain_resolution() {
        let index = sample();
        // Match terdekat menang
        assert_eq!(
            index.resolve("width", "/display/left/").unwrap(),
            "/display/left/width"
        );
        // Naik ke ancestor
        assert_eq!(
            index.resolve("height", "/display/left").unwrap(),
            "/display/height"
        );
        assert_eq!(index.resolve("scale", "/display/left").unwrap(), "/scale");
        assert!(matches!(
            index.get_in("depth", "/display/left"),
            Err(DataError::NotFound(_))
        ));
    }

    #[test]
    fn test_retype_is_error() {
        let mut index = sample();
        index.add("/scale", Value::Float(2.0)).unwrap();
        assert_eq!(index.get_float("/scale"), 2.0);
        assert!(matches!(
            index.add("/scale", Value::Int(2)),
            Err(DataError::TypeMismatch {
                stored: ValueType::Float,
                requested: ValueType::Int,
                ..
            })
        ));
        // Ancestor yang bukan container
        assert!(matches!(
            index.add("/scale/x", Value::Int(1)),
            Err(DataError::InvalidNamespace(_))
        ));
    }

    #[test]
    fn test_container_extend_and_dangling() {
        let mut index = DataIndex::new("Test");
        index.add("/c/a", Value::Int(1)).unwrap();
        index.add("/c/b", Value::Int(2)).unwrap();
        index.add("/d", Value::Int(3)).unwrap();
        assert!(matches!(
            index.add("/c", Value::Container(vec!["zzz".into()])),
            Err(DataError::DanglingChild { .. })
        ));
        index
            .add("/c", Value::Container(vec!["b".into(), "a".into()]))
            .unwrap();
        assert_eq!(index.get_container("/c"), vec!["a", "b"]);
    }

    #[test]
    fn test_permissive_accessors() {
        let index = sample();
        assert_eq!(index.get_int("/scale"), 0);
        assert_eq!(index.get_string("/nope"), "");
        assert!(index.get_int_array("/display").is_empty());
        assert_eq!(index.get_int("/display/width"), 1920);
    }

    #[test]
    fn test_namespace_stack() {
        let mut index = sample();
        assert_eq!(index.current_namespace(), "/");
        index.push_namespace("display").unwrap();
        assert_eq!(index.current_namespace(), "/display/");
        index.push_namespace("left").unwrap();
        assert_eq!(index.get_int("width"), 640);
        assert_eq!(index.get_int("height"), 1080);

        let abs = index.add("gamma", Value::Float(2.2)).unwrap();
        assert_eq!(abs, "/display/left/gamma");

        assert!(index.push_namespace("/scale").is_err());
        assert_eq!(index.pop_namespace(), "/display/");
        assert_eq!(index.get_int("width"), 1920);
        assert_eq!(index.pop_namespace(), "/");
        assert_eq!(index.pop_namespace(), "/");
    }

    #[test]
    fn test_invalid_names() {
        let mut index = DataIndex::new("Test");
        assert!(index.add("/", Value::Int(1)).is_err());
        assert!(index.add("/a b", Value::Int(1)).is_err());
        assert!(index.add("/9lives", Value::Int(1)).is_err());
        assert!(index.add("/ok_name-1.x", Value::Int(1)).is_ok());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut index = sample();
        index
            .add("/names", Value::StringArray(vec!["a,b".into(), "<c>".into()]))
            .unwrap();
        index.add("/title", Value::String(" spaced & quoted ".into())).unwrap();
        index.add("/empty", Value::None).unwrap();

        let text = index.serialize_all();
        let copy = DataIndex::from_serialized("Test", &text).unwrap();
        assert_eq!(copy.names(), index.names());
        for name in index.names() {
            assert_eq!(copy.get(&name).unwrap(), index.get(&name).unwrap(), "{}", name);
        }
        assert_eq!(copy.serialize_root(), index.serialize_root());
    }

    #[test]
    fn test_string_array_with_one_empty_element() {
        let mut index = DataIndex::new("Test");
        index.add("/g/s", Value::StringArray(vec![String::new()])).unwrap();
        index.add("/g/none", Value::StringArray(vec![])).unwrap();
        let text = index.serialize("/g").unwrap();

        let mut copy = DataIndex::new("Test");
        copy.add_serialized(&text).unwrap();
        assert_eq!(copy.get_string_array("/g/s"), vec![String::new()]);
        assert!(copy.get_string_array("/g/none").is_empty());
    }

    #[test]
    fn test_serialize_single() {
        let index = sample();
        assert_eq!(
            index.serialize("/display/left").unwrap(),
            r#"<left type="container"><width type="int">640</width></left>"#
        );
    }

    #[test]
    fn test_add_serialized_in_namespace() {
        let mut index = DataIndex::new("Test");
        index.add("/ns", Value::Container(vec![])).unwrap();
        let name = index
            .add_serialized_in(
                r#"<pos type="floatarray" separator="@">1.5@2@-3</pos>"#,
                "/ns",
            )
            .unwrap();
        assert_eq!(name, "/ns/pos");
        assert_eq!(index.get_float_array("/ns/pos"), vec![1.5, 2.0, -3.0]);
        assert_eq!(index.attribute("/ns/pos", "separator"), Some("@"));
        assert!(index.serialize("/ns/pos").unwrap().contains("1.5@2.0@-3.0"));
    }

    #[test]
    fn test_add_serialized_infers_types() {
        let mut index = DataIndex::new("Test");
        let names = index
            .add_serialized_all("<a>5</a><b>2.5</b><c><d>x</d></c><e>1,2</e>")
            .unwrap();
        assert_eq!(names, vec!["/a", "/b", "/c", "/e"]);
        assert_eq!(index.value_type("/a").unwrap(), ValueType::Int);
        assert_eq!(index.value_type("/b").unwrap(), ValueType::Float);
        assert_eq!(index.value_type("/c").unwrap(), ValueType::Container);
        assert_eq!(index.get_string("/c/d"), "x");
        assert_eq!(index.get_int_array("/e"), vec![1, 2]);

        assert!(matches!(
            index.add_serialized("<z type=\"matrix\">1</z>"),
            Err(DataError::UnknownType(_))
        ));
    }

    #[test]
    fn test_add_key_value() {
        let mut index = sample();
        index.add_key_value("/display/width=800").unwrap();
        assert_eq!(index.get_int("/display/width"), 800);
        // Tipe entry yang ada dipertahankan
        index.add_key_value("/scale=3").unwrap();
        assert_eq!(index.get_float("/scale"), 3.0);
        index.add_key_value("mode = stereo").unwrap();
        assert_eq!(index.get_string("/mode"), " stereo");
        assert!(index.add_key_value("no-equals").is_err());
    }

    #[test]
    fn test_state_stack() {
        let mut index = sample();
        index.push_state();
        index.add("/display/width", Value::Int(1)).unwrap();
        index.add("/extra/deep", Value::Int(1)).unwrap();
        assert!(index.exists("/extra/deep"));
        index.pop_state().unwrap();
        assert_eq!(index.get_int("/display/width"), 1920);
        assert!(!index.exists("/extra"));
        assert_eq!(index.serialize_root(), sample().serialize_root());
        assert!(matches!(index.pop_state(), Err(DataError::EmptyStateStack)));
    }

    #[test]
    fn test_queries() {
        let index = sample();
        assert_eq!(
            index.select_by_type(ValueType::Container),
            vec!["/display", "/display/left"]
        );
        assert_eq!(
            index.select_by_key("width"),
            vec!["/display/left/width", "/display/width"]
        );
        assert_eq!(
            index.children("/display").unwrap(),
            vec!["/display/width", "/display/height", "/display/left"]
        );
        assert!(matches!(
            index.children("/scale"),
            Err(DataError::TypeMismatch { ref name, .. }) if name == "/scale"
        ));
    }

    #[test]
    fn test_select_by_attribute() {
        let mut index = DataIndex::new("Test");
        index
            .add_serialized_all(concat!(
                r#"<wall type="container" displayType="opengl">"#,
                r#"<left type="int" eye="left">1</left>"#,
                r#"<right type="int" eye="right">2</right>"#,
                r#"</wall><plain type="int">3</plain>"#
            ))
            .unwrap();
        index.set_attribute("/plain", "eye", "cyclops").unwrap();

        assert_eq!(
            index.select_by_attribute("eye", None),
            vec!["/plain", "/wall/left", "/wall/right"]
        );
        assert_eq!(
            index.select_by_attribute("eye", Some("right")),
            vec!["/wall/right"]
        );
        assert_eq!(
            index.select_by_attribute("displayType", Some("opengl")),
            vec!["/wall"]
        );
        assert!(index.select_by_attribute("eye", Some("both")).is_empty());
        assert!(index.select_by_attribute("type", None).is_empty());
    }
}
