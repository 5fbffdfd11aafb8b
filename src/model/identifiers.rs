use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s\-.]").unwrap());
pub(crate) static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Source of the random part of generated identifiers.
pub trait IdGenerator {
    fn next_uuid(&mut self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_uuid(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic generator: counters rendered in UUID layout, so ids sort numerically.
#[derive(Debug, Default, Clone)]
pub struct SequentialIdGenerator {
    next: u128,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u128) -> Self {
        Self { next }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_uuid(&mut self) -> String {
        self.next += 1;
        Uuid::from_u128(self.next).to_string()
    }
}

pub struct Identifier;

impl Identifier {
    pub fn namespaced(kind: &str, raw: &str) -> String {
        let prefix = format!("#{kind}/");
        if raw.starts_with(&prefix) {
            raw.to_string()
        } else {
            format!("{prefix}{raw}")
        }
    }

    pub fn ordinal(kind: &str, name: &str) -> String {
        Self::namespaced(kind, &urlify(name))
    }

    pub fn generated(kind: &str, ids: &mut dyn IdGenerator) -> String {
        Self::namespaced(kind, &ids.next_uuid())
    }

    /// Ordinal or generated id depending on whether a generator is in play.
    pub fn assign(kind: &str, name: &str, ids: Option<&mut (dyn IdGenerator + '_)>) -> String {
        match ids {
            Some(ids) => Self::generated(kind, ids),
            None => Self::ordinal(kind, name),
        }
    }
}

pub fn urlify(value: &str) -> String {
    let stripped = NON_WORD.replace_all(value, "");
    WHITESPACE.replace_all(&stripped, "_").into_owned()
}

pub fn snake_case(class_name: &str) -> String {
    let mut out = String::with_capacity(class_name.len() + 4);
    for (ix, ch) in class_name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if ix > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Width such that every number in `1..=count` renders with the same number of digits.
pub fn n_digits(count: usize) -> usize {
    let mut digits = 1;
    let mut bound = 10;
    while count >= bound {
        digits += 1;
        bound *= 10;
    }
    digits
}

pub fn zfill(value: usize, width: usize) -> String {
    format!("{value:0width$}")
}
