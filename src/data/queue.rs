//! Timestamp-ordered event queue
//!
//! Key: (wall-clock microseconds, disambiguator). Push pada microsecond yang
//! sama menaikkan disambiguator sampai slot kosong ditemukan, sehingga setiap
//! item punya key unik dan urutan total.
//!
//! Format text:
//! `<Queue num="N"><Item timeStamp="T-DDD">payload</Item>...</Queue>`

use std::borrow::Cow;
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::index::{DataIndex, DEFAULT_INDEX_NAME};
use super::markup;
use crate::error::{DataError, QueueError};

const QUEUE_TAG: &str = "Queue";
const ITEM_TAG: &str = "Item";
const COUNT_ATTRIBUTE: &str = "num";
const TIMESTAMP_ATTRIBUTE: &str = "timeStamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub micros: u64,
    pub seq: u32,
}

impl Timestamp {
    pub fn new(micros: u64, seq: u32) -> Self {
        Self { micros, seq }
    }

    /// Wall-clock saat ini dalam microseconds sejak epoch
    #[inline(always)]
    pub fn now_micros() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:03}", self.micros, self.seq)
    }
}

impl FromStr for Timestamp {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QueueError::InvalidTimestamp(s.to_string());
        let (micros, seq) = s.trim().rsplit_once('-').ok_or_else(invalid)?;
        Ok(Self {
            micros: micros.parse().map_err(|_| invalid())?,
            seq: seq.parse().map_err(|_| invalid())?,
        })
    }
}

/// Payload event: snapshot index atau bentuk serialized-nya
#[derive(Debug, Clone)]
pub enum Payload {
    Index(DataIndex),
    Serialized(String),
}

impl Payload {
    /// Bentuk text payload (isi root index tanpa pembungkus)
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Payload::Index(index) => Cow::Owned(index.serialize_root()),
            Payload::Serialized(text) => Cow::Borrowed(text),
        }
    }

    /// Re-intern payload ke index baru
    ///
    /// Setiap tag top-level menjadi entry level root, apapun namanya.
    pub fn to_index(&self) -> Result<DataIndex, DataError> {
        match self {
            Payload::Index(index) => Ok(index.clone()),
            Payload::Serialized(text) => {
                let mut index = DataIndex::new(DEFAULT_INDEX_NAME);
                index.add_serialized_all(text)?;
                Ok(index)
            }
        }
    }

    /// Nama tag top-level pertama (nama event)
    pub fn name(&self) -> Option<String> {
        match self {
            Payload::Index(index) => index.roots().first().cloned(),
            Payload::Serialized(text) => markup::parse_first(text).ok().map(|e| e.name),
        }
    }
}

impl From<DataIndex> for Payload {
    fn from(index: DataIndex) -> Self {
        Payload::Index(index)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Serialized(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Serialized(text.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    items: BTreeMap<Timestamp, Payload>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push dengan timestamp wall-clock saat ini
    pub fn push(&mut self, payload: impl Into<Payload>) -> Timestamp {
        self.push_at(Timestamp::now_micros(), payload)
    }

    /// Push pada waktu yang diberikan; disambiguator mulai dari 0
    pub fn push_at(&mut self, micros: u64, payload: impl Into<Payload>) -> Timestamp {
        self.insert_from(Timestamp::new(micros, 0), payload.into())
    }

    /// Insert pada slot kosong pertama mulai dari `key`
    fn insert_from(&mut self, mut key: Timestamp, payload: Payload) -> Timestamp {
        while self.items.contains_key(&key) {
            key.seq += 1;
        }
        self.items.insert(key, payload);
        key
    }

    /// Buang item paling awal
    pub fn pop(&mut self) {
        self.items.pop_first();
    }

    pub fn pop_first(&mut self) -> Option<(Timestamp, Payload)> {
        self.items.pop_first()
    }

    pub fn peek(&self) -> Option<&Payload> {
        self.items.values().next()
    }

    pub fn first(&self) -> Option<(Timestamp, &Payload)> {
        self.items.iter().next().map(|(k, v)| (*k, v))
    }

    /// Masukkan setiap item `other` pada microsecond aslinya
    pub fn merge(&mut self, other: EventQueue) {
        for (ts, payload) in other.items {
            self.push_at(ts.micros, payload);
        }
    }

    pub fn merge_serialized(&mut self, text: &str) -> Result<(), QueueError> {
        let other = Self::parse(text)?;
        self.merge(other);
        Ok(())
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterasi dalam urutan pemrosesan
    pub fn iter(&self) -> btree_map::Iter<'_, Timestamp, Payload> {
        self.items.iter()
    }

    pub fn serialize(&self) -> String {
        let mut out = format!(
            "<{} {}=\"{}\">",
            QUEUE_TAG,
            COUNT_ATTRIBUTE,
            self.items.len()
        );
        for (ts, payload) in &self.items {
            out.push_str(&format!(
                "<{} {}=\"{}\">",
                ITEM_TAG, TIMESTAMP_ATTRIBUTE, ts
            ));
            out.push_str(&payload.text());
            out.push_str("</");
            out.push_str(ITEM_TAG);
            out.push('>');
        }
        out.push_str("</");
        out.push_str(QUEUE_TAG);
        out.push('>');
        out
    }

    /// Inverse dari `serialize`
    ///
    /// Item dipindai satu per satu; jumlah item yang berhasil di-parse harus
    /// sama dengan `num` di header, jika tidak queue dianggap corrupt.
    /// Timestamp ganda digeser ke disambiguator kosong berikutnya.
    pub fn parse(text: &str) -> Result<Self, QueueError> {
        let mut queue = Self::new();
        if text.trim().is_empty() {
            return Ok(queue);
        }

        let expected = parse_header(text)?;
        let header_end = text
            .find('>')
            .map(|i| i + 1)
            .ok_or(QueueError::MalformedHeader)?;

        let open = format!("<{}", ITEM_TAG);
        let mut pos = header_end;
        let mut found = 0usize;
        while let Some(rel) = text[pos..].find(&open) {
            let start = pos + rel;
            let (element, end) = match markup::parse_at(text, start) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(offset = start, error = %e, "stopping at unparseable queue item");
                    break;
                }
            };
            pos = end;
            if element.name != ITEM_TAG {
                continue;
            }
            let ts: Timestamp = element
                .attribute(TIMESTAMP_ATTRIBUTE)
                .ok_or_else(|| QueueError::InvalidTimestamp(String::new()))?
                .parse()?;
            let payload = text[element.body.clone()].to_string();
            let key = queue.insert_from(ts, Payload::Serialized(payload));
            if key != ts {
                warn!(timestamp = %ts, moved_to = %key, "duplicate timestamp in serialized queue");
            }
            found += 1;
        }

        if found != expected {
            return Err(QueueError::Corrupted { expected, found });
        }
        debug!(items = found, "parsed event queue");
        Ok(queue)
    }
}

/// `<Queue num="N">`: nilai N
fn parse_header(text: &str) -> Result<usize, QueueError> {
    let trimmed = text.trim_start();
    let rest = trimmed
        .strip_prefix('<')
        .and_then(|r| r.strip_prefix(QUEUE_TAG))
        .ok_or(QueueError::MalformedHeader)?;
    let header = &rest[..rest.find('>').ok_or(QueueError::MalformedHeader)?];
    let key = format!("{}=\"", COUNT_ATTRIBUTE);
    let value_start = header.find(&key).ok_or(QueueError::MalformedHeader)? + key.len();
    let value_len = header[value_start..]
        .find('"')
        .ok_or(QueueError::MalformedHeader)?;
    header[value_start..value_start + value_len]
        .trim()
        .parse()
        .map_err(|_| QueueError::MalformedHeader)
}

impl<'a> IntoIterator for &'a EventQueue {
    type Item = (&'a Timestamp, &'a Payload);
    type IntoIter = btree_map::Iter<'a, Timestamp, Payload>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn event(name: &str, v: i32) -> Payload {
        let mut index = DataIndex::new("Event");
        index.add(&format!("/{}/value", name), Value::Int(v)).unwrap();
        Payload::Index(index)
    }

    #[test]
    fn test_timestamp_format() {
        let ts = Timestamp::new(1_700_000_000_123_456, 7);
        assert_eq!(ts.to_string(), "1700000000123456-007");
        assert_eq!("1700000000123456-007".parse::<Timestamp>().unwrap(), ts);
        assert_eq!("5-1234".parse::<Timestamp>().unwrap(), Timestamp::new(5, 1234));
        assert!("12345".parse::<Timestamp>().is_err());
    }

    #[test]
    fn test_same_micros_disambiguated() {
        let mut queue = EventQueue::new();
        let a = queue.push_at(100, "<a type=\"int\">1</a>");
        let b = queue.push_at(100, "<b type=\"int\">2</b>");
        assert_eq!(a, Timestamp::new(100, 0));
        assert_eq!(b, Timestamp::new(100, 1));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_order_and_pop() {
        let mut queue = EventQueue::new();
        queue.push_at(300, event("c", 3));
        queue.push_at(100, event("a", 1));
        queue.push_at(200, event("b", 2));

        let times: Vec<u64> = queue.iter().map(|(ts, _)| ts.micros).collect();
        assert_eq!(times, vec![100, 200, 300]);

        assert_eq!(queue.peek().and_then(Payload::name).as_deref(), Some("a"));
        queue.pop();
        let (ts, payload) = queue.pop_first().unwrap();
        assert_eq!(ts.micros, 200);
        assert_eq!(payload.to_index().unwrap().get_int("/b/value"), 2);
        assert_eq!(queue.first().map(|(ts, _)| ts.micros), Some(300));
        queue.clear();
        assert!(queue.is_empty());
        queue.pop();
        assert!(queue.peek().is_none());
    }

    #[test]
    fn test_push_uses_wall_clock() {
        let before = Timestamp::now_micros();
        let mut queue = EventQueue::new();
        let ts = queue.push(event("x", 0));
        assert!(ts.micros >= before);
    }

    #[test]
    fn test_serialize_parse() {
        let mut queue = EventQueue::new();
        queue.push_at(10, event("a", 1));
        queue.push_at(10, event("b", 2));
        queue.push_at(5, "<Item type=\"int\">9</Item>");

        let text = queue.serialize();
        assert!(text.starts_with("<Queue num=\"3\">"));
        assert!(text.contains("timeStamp=\"10-001\""));

        let parsed = EventQueue::parse(&text).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.serialize(), text);
        let (ts, payload) = parsed.first().unwrap();
        assert_eq!(ts, Timestamp::new(5, 0));
        assert_eq!(payload.to_index().unwrap().get_int("/Item"), 9);
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(EventQueue::parse("").unwrap().is_empty());
        assert!(EventQueue::parse("<Queue num=\"0\"></Queue>")
            .unwrap()
            .is_empty());
        assert!(matches!(
            EventQueue::parse("<Items num=\"1\">"),
            Err(QueueError::MalformedHeader)
        ));
        assert!(matches!(
            EventQueue::parse("<Queue count=\"1\"></Queue>"),
            Err(QueueError::MalformedHeader)
        ));
    }

    #[test]
    fn test_count_mismatch_is_corruption() {
        let mut queue = EventQueue::new();
        queue.push_at(1, event("a", 1));
        queue.push_at(2, event("b", 2));
        let text = queue.serialize().replace("num=\"2\"", "num=\"3\"");
        assert!(matches!(
            EventQueue::parse(&text),
            Err(QueueError::Corrupted {
                expected: 3,
                found: 2
            })
        ));

        // Truncated blob
        let full = queue.serialize();
        let cut = &full[..full.len() - 30];
        assert!(matches!(
            EventQueue::parse(cut),
            Err(QueueError::Corrupted { expected: 2, .. })
        ));
    }

    #[test]
    fn test_parse_keeps_duplicate_timestamps() {
        let text = concat!(
            "<Queue num=\"3\">",
            "<Item timeStamp=\"5-000\"><a type=\"int\">1</a></Item>",
            "<Item timeStamp=\"5-000\"><b type=\"int\">2</b></Item>",
            "<Item timeStamp=\"5-001\"><c type=\"int\">3</c></Item>",
            "</Queue>"
        );
        let parsed = EventQueue::parse(text).unwrap();
        assert_eq!(parsed.len(), 3);
        let items: Vec<(Timestamp, Option<String>)> = parsed
            .iter()
            .map(|(ts, p)| (*ts, p.name()))
            .collect();
        assert_eq!(
            items,
            vec![
                (Timestamp::new(5, 0), Some("a".to_string())),
                (Timestamp::new(5, 1), Some("b".to_string())),
                (Timestamp::new(5, 2), Some("c".to_string())),
            ]
        );
    }

    #[test]
    fn test_payload_root_named_like_index() {
        let mut index = DataIndex::new("Event");
        index.add(&format!("/{}/x", DEFAULT_INDEX_NAME), Value::Int(1)).unwrap();
        let mut queue = EventQueue::new();
        queue.push_at(1, index);

        let parsed = EventQueue::parse(&queue.serialize()).unwrap();
        let copy = parsed.peek().unwrap().to_index().unwrap();
        assert!(copy.exists("/MVR/x"));
        assert_eq!(copy.get_int("/MVR/x"), 1);
        assert_eq!(copy.roots().to_vec(), vec![DEFAULT_INDEX_NAME.to_string()]);
    }

    #[test]
    fn test_merge_matches_batch() {
        let mut left = EventQueue::new();
        left.push_at(10, event("a", 1));
        left.push_at(30, event("c", 3));

        let mut right = EventQueue::new();
        right.push_at(10, event("b", 2));
        right.push_at(20, event("d", 4));

        let mut batch = EventQueue::new();
        batch.push_at(10, event("a", 1));
        batch.push_at(30, event("c", 3));
        batch.push_at(10, event("b", 2));
        batch.push_at(20, event("d", 4));

        let right_text = right.serialize();
        left.merge(right);
        assert_eq!(left.serialize(), batch.serialize());

        let mut via_text = EventQueue::new();
        via_text.push_at(10, event("a", 1));
        via_text.push_at(30, event("c", 3));
        via_text.merge_serialized(&right_text).unwrap();
        assert_eq!(via_text.serialize(), batch.serialize());
    }
}
