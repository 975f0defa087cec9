//! Lexicon record types
//!
//! Every collection in an export has its own row struct, so a row's shape
//! is fixed by its collection rather than inferred from whatever the first
//! row happened to contain. The stores speak positional [`Value`] rows in
//! [`CollectionKind::columns`] order; [`Record`] converts between the two.
//!
//! ## Import ordering
//!
//! [`CollectionKind::IMPORT_ORDER`] lists parents before children so rows can
//! be inserted with foreign keys enforced:
//!
//! ```text
//! languages ─┐
//! parts_of_speech ─┼─► words ─┬─► word_forms
//! tags ──────┘         │      ├─► word_tags (also ◄─ tags)
//!                      │      └─► etymologies (word_id, source_word_id)
//! ```

use crate::error::ValidationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Primitive column value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// A positional row, one value per column
pub type Row = Vec<Value>;

/// Rust types that map onto a single column
pub trait Column: Sized {
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Option<Self>;
}

impl Column for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_integer()
    }
}

impl Column for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl<T: Column> Column for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Foreign key from one column to another collection's `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: CollectionKind,
}

/// The fixed set of collections in a lexicon export
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CollectionKind {
    Languages,
    PartsOfSpeech,
    Tags,
    Words,
    WordForms,
    WordTags,
    Etymologies,
}

impl CollectionKind {
    /// Parents before children
    pub const IMPORT_ORDER: [CollectionKind; 7] = [
        CollectionKind::Languages,
        CollectionKind::PartsOfSpeech,
        CollectionKind::Tags,
        CollectionKind::Words,
        CollectionKind::WordForms,
        CollectionKind::WordTags,
        CollectionKind::Etymologies,
    ];

    /// Collection (and table) name
    pub fn name(self) -> &'static str {
        match self {
            CollectionKind::Languages => "languages",
            CollectionKind::PartsOfSpeech => "parts_of_speech",
            CollectionKind::Tags => "tags",
            CollectionKind::Words => "words",
            CollectionKind::WordForms => "word_forms",
            CollectionKind::WordTags => "word_tags",
            CollectionKind::Etymologies => "etymologies",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::IMPORT_ORDER.into_iter().find(|kind| kind.name() == name)
    }

    /// Column names in storage order
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            CollectionKind::Languages => Language::COLUMNS,
            CollectionKind::PartsOfSpeech => PartOfSpeech::COLUMNS,
            CollectionKind::Tags => Tag::COLUMNS,
            CollectionKind::Words => Word::COLUMNS,
            CollectionKind::WordForms => WordForm::COLUMNS,
            CollectionKind::WordTags => WordTag::COLUMNS,
            CollectionKind::Etymologies => Etymology::COLUMNS,
        }
    }

    /// Whether `id` (always the first column) is store-generated and needs
    /// its sequence advanced after a bulk import
    pub fn has_auto_id(self) -> bool {
        !matches!(self, CollectionKind::WordTags)
    }

    pub fn foreign_keys(self) -> &'static [ForeignKey] {
        const WORDS: &[ForeignKey] = &[
            ForeignKey {
                column: "language_id",
                references: CollectionKind::Languages,
            },
            ForeignKey {
                column: "part_of_speech_id",
                references: CollectionKind::PartsOfSpeech,
            },
        ];
        const WORD_FORMS: &[ForeignKey] = &[ForeignKey {
            column: "word_id",
            references: CollectionKind::Words,
        }];
        const WORD_TAGS: &[ForeignKey] = &[
            ForeignKey {
                column: "word_id",
                references: CollectionKind::Words,
            },
            ForeignKey {
                column: "tag_id",
                references: CollectionKind::Tags,
            },
        ];
        const ETYMOLOGIES: &[ForeignKey] = &[
            ForeignKey {
                column: "word_id",
                references: CollectionKind::Words,
            },
            ForeignKey {
                column: "source_word_id",
                references: CollectionKind::Words,
            },
        ];

        match self {
            CollectionKind::Words => WORDS,
            CollectionKind::WordForms => WORD_FORMS,
            CollectionKind::WordTags => WORD_TAGS,
            CollectionKind::Etymologies => ETYMOLOGIES,
            _ => &[],
        }
    }

    /// Position of a column in storage order
    pub fn column_index(self, column: &str) -> Option<usize> {
        self.columns().iter().position(|c| *c == column)
    }
}

/// A typed row belonging to one collection
pub trait Record: Clone + Serialize + DeserializeOwned {
    const KIND: CollectionKind;
    const COLUMNS: &'static [&'static str];

    fn to_row(&self) -> Row;
    fn from_row(row: Row) -> Result<Self, String>;
}

macro_rules! lexicon_record {
    (
        $(#[$meta:meta])*
        $name:ident => $kind:ident {
            $($(#[$field_meta:meta])* $field:ident : $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $name {
            $($(#[$field_meta])* pub $field: $ty),+
        }

        impl Record for $name {
            const KIND: CollectionKind = CollectionKind::$kind;
            const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),+];

            fn to_row(&self) -> Row {
                vec![$(Column::to_value(&self.$field)),+]
            }

            fn from_row(row: Row) -> Result<Self, String> {
                if row.len() != Self::COLUMNS.len() {
                    return Err(format!(
                        "{} expects {} columns, got {}",
                        Self::KIND.name(),
                        Self::COLUMNS.len(),
                        row.len()
                    ));
                }
                let mut values = row.into_iter();
                Ok($name {
                    $($field: {
                        let value = values.next().unwrap_or(Value::Null);
                        <$ty as Column>::from_value(value).ok_or_else(|| {
                            format!("{}.{} has the wrong type", Self::KIND.name(), stringify!($field))
                        })?
                    }),+
                })
            }
        }
    };
}

lexicon_record! {
    /// A constructed language
    Language => Languages {
        id: i64,
        name: String,
        native_name: Option<String>,
        description: Option<String>,
        created_at: String,
    }
}

lexicon_record! {
    /// Grammatical category (noun, verb, ...)
    PartOfSpeech => PartsOfSpeech {
        id: i64,
        name: String,
        abbreviation: Option<String>,
    }
}

lexicon_record! {
    /// Free-form label attachable to words
    Tag => Tags {
        id: i64,
        name: String,
        /// Hex colour, e.g. "#aa3366"
        color: Option<String>,
    }
}

lexicon_record! {
    /// Dictionary entry
    Word => Words {
        id: i64,
        language_id: i64,
        part_of_speech_id: Option<i64>,
        lemma: String,
        pronunciation: Option<String>,
        definition: String,
        notes: Option<String>,
        created_at: String,
        updated_at: String,
    }
}

lexicon_record! {
    /// Inflected or derived form of a word
    WordForm => WordForms {
        id: i64,
        word_id: i64,
        form: String,
        gloss: Option<String>,
    }
}

lexicon_record! {
    /// Word-to-tag link
    WordTag => WordTags {
        word_id: i64,
        tag_id: i64,
    }
}

lexicon_record! {
    /// Derivation of a word from another word or an external source
    Etymology => Etymologies {
        id: i64,
        word_id: i64,
        source_word_id: Option<i64>,
        source_text: Option<String>,
        note: Option<String>,
    }
}

/// Every collection of a lexicon, in typed form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collections {
    pub languages: Vec<Language>,
    pub parts_of_speech: Vec<PartOfSpeech>,
    pub tags: Vec<Tag>,
    pub words: Vec<Word>,
    pub word_forms: Vec<WordForm>,
    pub word_tags: Vec<WordTag>,
    pub etymologies: Vec<Etymology>,
}

fn to_rows<T: Record>(records: &[T]) -> Vec<Row> {
    records.iter().map(Record::to_row).collect()
}

fn from_rows<T: Record>(rows: Vec<Row>) -> Result<Vec<T>, String> {
    rows.into_iter().map(T::from_row).collect()
}

/// Deserialize one JSON collection, reporting the first bad row by index
fn parse_json_rows<T: Record>(items: Vec<serde_json::Value>) -> Result<Vec<T>, ValidationError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| ValidationError::MalformedRow {
                collection: T::KIND.name(),
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

impl Collections {
    /// Rows of one collection in storage order
    pub fn rows(&self, kind: CollectionKind) -> Vec<Row> {
        match kind {
            CollectionKind::Languages => to_rows(&self.languages),
            CollectionKind::PartsOfSpeech => to_rows(&self.parts_of_speech),
            CollectionKind::Tags => to_rows(&self.tags),
            CollectionKind::Words => to_rows(&self.words),
            CollectionKind::WordForms => to_rows(&self.word_forms),
            CollectionKind::WordTags => to_rows(&self.word_tags),
            CollectionKind::Etymologies => to_rows(&self.etymologies),
        }
    }

    /// Replace one collection from positional rows
    pub fn set_rows(&mut self, kind: CollectionKind, rows: Vec<Row>) -> Result<(), String> {
        match kind {
            CollectionKind::Languages => self.languages = from_rows(rows)?,
            CollectionKind::PartsOfSpeech => self.parts_of_speech = from_rows(rows)?,
            CollectionKind::Tags => self.tags = from_rows(rows)?,
            CollectionKind::Words => self.words = from_rows(rows)?,
            CollectionKind::WordForms => self.word_forms = from_rows(rows)?,
            CollectionKind::WordTags => self.word_tags = from_rows(rows)?,
            CollectionKind::Etymologies => self.etymologies = from_rows(rows)?,
        }
        Ok(())
    }

    /// Replace one collection from a JSON array
    pub(crate) fn set_json_rows(
        &mut self,
        kind: CollectionKind,
        items: Vec<serde_json::Value>,
    ) -> Result<(), ValidationError> {
        match kind {
            CollectionKind::Languages => self.languages = parse_json_rows(items)?,
            CollectionKind::PartsOfSpeech => self.parts_of_speech = parse_json_rows(items)?,
            CollectionKind::Tags => self.tags = parse_json_rows(items)?,
            CollectionKind::Words => self.words = parse_json_rows(items)?,
            CollectionKind::WordForms => self.word_forms = parse_json_rows(items)?,
            CollectionKind::WordTags => self.word_tags = parse_json_rows(items)?,
            CollectionKind::Etymologies => self.etymologies = parse_json_rows(items)?,
        }
        Ok(())
    }

    pub fn len(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::Languages => self.languages.len(),
            CollectionKind::PartsOfSpeech => self.parts_of_speech.len(),
            CollectionKind::Tags => self.tags.len(),
            CollectionKind::Words => self.words.len(),
            CollectionKind::WordForms => self.word_forms.len(),
            CollectionKind::WordTags => self.word_tags.len(),
            CollectionKind::Etymologies => self.etymologies.len(),
        }
    }

    pub fn total_rows(&self) -> usize {
        CollectionKind::IMPORT_ORDER
            .iter()
            .map(|kind| self.len(*kind))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }

    /// Largest `id` in an auto-id collection
    pub fn max_id(&self, kind: CollectionKind) -> Option<i64> {
        if !kind.has_auto_id() {
            return None;
        }
        self.rows(kind)
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_integer))
            .max()
    }
}
