//! Typed views over the batch and sample payloads QBench returns.
//!
//! QBench tenants do not agree on where a batch lists its samples. Each known
//! location is a typed field; a field whose value has an unexpected shape is
//! kept as [`Lenient::Unrecognized`] and ignored. A payload in which no known
//! location is present is a schema error rather than an empty batch.

use std::collections::HashSet;
use std::str::FromStr;

use psq_core::{SampleMetadata, normalize_sample_id};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::{Map, Number, Value};

use crate::error::QBenchError;

/// Custom-field labels that carry the batch, in priority order.
const BATCH_FIELDS: &[&str] = &["Batch", "Batch #", "Lote", "Lot"];

/// Custom-field labels that carry the sample mass, in priority order.
const WEIGHT_FIELDS: &[&str] = &["Sample Weight", "sample_weight", "Mass (mg)", "Mass", "Weight"];

/// A value that either has the expected shape or is skipped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Known(T),
    Unrecognized(IgnoredAny),
}

impl<T> Lenient<T> {
    const fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unrecognized(_) => None,
        }
    }
}

/// A JSON scalar used as an identifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(Number),
    Text(String),
}

impl Scalar {
    /// Render as an id: numbers as integers, text trimmed. Empty is `None`.
    fn render(&self) -> Option<String> {
        let rendered = match self {
            Self::Number(n) => render_integer(n),
            Self::Text(t) => t.trim().to_string(),
        };
        (!rendered.is_empty()).then_some(rendered)
    }
}

fn render_integer(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64()
            .map_or_else(|| n.to_string(), |f| format!("{:.0}", f.trunc()))
    }
}

/// A sample reference inside a batch: a bare id or a small object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SampleRef {
    Id(Scalar),
    Record {
        #[serde(default)]
        id: Option<Scalar>,
        #[serde(default)]
        sample_id: Option<Scalar>,
        #[serde(default)]
        sample: Option<Scalar>,
    },
    Other(IgnoredAny),
}

impl SampleRef {
    fn id(&self) -> Option<String> {
        match self {
            Self::Id(scalar) => scalar.render(),
            Self::Record {
                id,
                sample_id,
                sample,
            } => [id, sample_id, sample]
                .into_iter()
                .flatten()
                .find_map(Scalar::render),
            Self::Other(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Linkage {
    data: Vec<SampleRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Relationships {
    samples: Option<Lenient<Linkage>>,
    sample: Option<Lenient<Linkage>>,
}

#[derive(Debug, Deserialize)]
struct Included {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<Scalar>,
}

/// The object form of a batch, with every location samples may be listed in.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BatchBody {
    sample_ids: Option<Lenient<Vec<SampleRef>>>,
    sample_ids_ordered: Option<Lenient<Vec<SampleRef>>>,
    samples: Option<Lenient<Vec<SampleRef>>>,
    sample_records: Option<Lenient<Vec<SampleRef>>>,
    sample_list: Option<Lenient<Vec<SampleRef>>>,
    relationships: Option<Lenient<Relationships>>,
    included: Option<Lenient<Vec<Lenient<Included>>>>,
}

impl BatchBody {
    /// Push ids from every recognized location. Returns whether any was present.
    fn collect(&self, ids: &mut IdList) -> bool {
        let mut recognized = false;

        let lists = [
            &self.sample_ids,
            &self.sample_ids_ordered,
            &self.samples,
            &self.sample_records,
            &self.sample_list,
        ];
        for list in lists.into_iter().flatten().filter_map(Lenient::known) {
            recognized |= ids.extend_refs(list);
        }

        if let Some(rel) = self.relationships.as_ref().and_then(Lenient::known) {
            let linkage = rel
                .samples
                .as_ref()
                .and_then(Lenient::known)
                .or_else(|| rel.sample.as_ref().and_then(Lenient::known));
            if let Some(linkage) = linkage {
                recognized |= ids.extend_refs(&linkage.data);
            }
        }

        if let Some(included) = self.included.as_ref().and_then(Lenient::known) {
            recognized = true;
            ids.extend(
                included
                    .iter()
                    .filter_map(Lenient::known)
                    .filter(|entry| matches!(entry.kind.as_str(), "sample" | "samples"))
                    .filter_map(|entry| entry.id.as_ref().and_then(Scalar::render)),
            );
        }

        recognized
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchPayload {
    FlatList(Vec<SampleRef>),
    DataList { data: Vec<SampleRef> },
    DataObject { data: BatchBody },
    Bare(BatchBody),
    Unrecognized(IgnoredAny),
}

/// Insertion-ordered, de-duplicated id list.
#[derive(Debug, Default)]
struct IdList {
    seen: HashSet<String>,
    ids: Vec<String>,
}

impl IdList {
    /// Push the ids a list resolves to. A non-empty list where no entry
    /// resolves is junk, not an empty batch, and reports `false`.
    fn extend_refs(&mut self, refs: &[SampleRef]) -> bool {
        let mut resolved = false;
        for id in refs.iter().filter_map(SampleRef::id) {
            resolved = true;
            self.extend(std::iter::once(id));
        }
        refs.is_empty() || resolved
    }
}

impl Extend<String> for IdList {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for id in iter {
            if self.seen.insert(id.clone()) {
                self.ids.push(id);
            }
        }
    }
}

/// Sample ids referenced by a batch payload, in first-seen order.
///
/// # Errors
///
/// Returns [`QBenchError::Schema`] if the payload lists samples in none of the
/// known locations.
pub fn batch_sample_ids(batch_id: &str, payload: &Value) -> Result<Vec<String>, QBenchError> {
    let parsed = BatchPayload::deserialize(payload).map_err(|e| schema(batch_id, e.to_string()))?;

    let mut ids = IdList::default();
    let recognized = match &parsed {
        BatchPayload::FlatList(refs) | BatchPayload::DataList { data: refs } => {
            ids.extend_refs(refs)
        }
        BatchPayload::DataObject { data: body } | BatchPayload::Bare(body) => body.collect(&mut ids),
        BatchPayload::Unrecognized(_) => false,
    };

    if !recognized {
        return Err(schema(batch_id, describe_keys(payload)));
    }
    Ok(ids.ids)
}

fn schema(batch_id: &str, message: String) -> QBenchError {
    QBenchError::Schema {
        context: format!("batch {batch_id}"),
        message,
    }
}

fn describe_keys(payload: &Value) -> String {
    let keys = |map: &Map<String, Value>| map.keys().cloned().collect::<Vec<_>>().join(", ");
    match payload {
        Value::Object(map) => match map.get("data") {
            Some(Value::Object(inner)) => {
                format!("no sample list found under data (keys: {})", keys(inner))
            }
            Some(Value::Array(_)) => "no entry under data names a sample id".to_string(),
            _ => format!("no sample list found (keys: {})", keys(map)),
        },
        Value::Array(_) => "no entry in the list names a sample id".to_string(),
        other => format!("expected an object or list, got {}", kind(other)),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// One sample record as returned by the sample detail and listing endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleRecord {
    id: Scalar,
    #[serde(default)]
    custom_formatted_id: Option<Value>,
    #[serde(default)]
    sample_name: Option<Value>,
    #[serde(default)]
    matrix_type: Option<Value>,
    #[serde(default)]
    state: Option<Value>,
    #[serde(default)]
    date_created: Option<Value>,
    #[serde(default)]
    batch_number: Option<Value>,
    #[serde(default)]
    sample_weight: Option<Value>,
    #[serde(default)]
    custom_fields: Option<Value>,
    #[serde(default)]
    fields: Option<Value>,
    #[serde(default)]
    tests: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SamplePayload {
    One { data: SampleRecord },
    Many { data: Vec<Lenient<SampleRecord>> },
    List(Vec<Lenient<SampleRecord>>),
    Bare(SampleRecord),
}

/// Sample records carried by a detail or listing payload.
///
/// # Errors
///
/// Returns [`QBenchError::Schema`] if the payload is none of `{"data": {…}}`,
/// `{"data": [{…}]}`, a list of records, or a bare record with an `id`.
pub fn sample_records(context: &str, payload: &Value) -> Result<Vec<SampleRecord>, QBenchError> {
    let parsed = SamplePayload::deserialize(payload).map_err(|_| QBenchError::Schema {
        context: context.to_string(),
        message: describe_sample(payload),
    })?;
    Ok(match parsed {
        SamplePayload::One { data } | SamplePayload::Bare(data) => vec![data],
        SamplePayload::Many { data } | SamplePayload::List(data) => data
            .into_iter()
            .filter_map(|entry| match entry {
                Lenient::Known(record) => Some(record),
                Lenient::Unrecognized(_) => None,
            })
            .collect(),
    })
}

fn describe_sample(payload: &Value) -> String {
    match payload {
        Value::Object(map) if map.contains_key("data") => {
            "data is neither a sample object nor a list of samples".to_string()
        }
        Value::Object(_) => "sample object has no id".to_string(),
        other => format!("expected an object, got {}", kind(other)),
    }
}

impl SampleRecord {
    /// QBench id as rendered text.
    #[must_use]
    pub fn qbench_id(&self) -> Option<String> {
        self.id.render()
    }

    /// Custom fields, falling back to `fields` when `custom_fields` is empty.
    fn custom(&self) -> Option<&Map<String, Value>> {
        fn non_empty(v: &Option<Value>) -> Option<&Map<String, Value>> {
            v.as_ref()
                .and_then(Value::as_object)
                .filter(|m| !m.is_empty())
        }
        non_empty(&self.custom_fields).or_else(|| non_empty(&self.fields))
    }

    /// Batch label recorded on the sample itself.
    #[must_use]
    pub fn detected_batch(&self) -> Option<String> {
        text(self.batch_number.as_ref()).or_else(|| {
            let custom = self.custom()?;
            BATCH_FIELDS
                .iter()
                .find_map(|label| text(custom_field(custom, label)))
        })
    }

    /// Sample mass in milligrams.
    ///
    /// Looks at a pesticide test first, then the sample's own field, then the
    /// custom fields, then any test.
    #[must_use]
    pub fn sample_weight_mg(&self) -> Option<Decimal> {
        let tests = self.tests.as_ref().and_then(Value::as_array);
        let from_tests = |pesticide_only: bool| {
            tests
                .into_iter()
                .flatten()
                .filter(|test| !pesticide_only || is_pesticide_test(test))
                .find_map(|test| test.get("sample_weight").and_then(clean_weight))
        };

        from_tests(true)
            .or_else(|| self.sample_weight.as_ref().and_then(clean_weight))
            .or_else(|| {
                let custom = self.custom()?;
                WEIGHT_FIELDS
                    .iter()
                    .find_map(|label| custom_field(custom, label).and_then(clean_weight))
            })
            .or_else(|| from_tests(false))
    }

    /// Text the batch search matches against.
    #[must_use]
    pub fn search_text(&self) -> String {
        [
            self.detected_batch(),
            text(self.custom_formatted_id.as_ref()),
            text(self.sample_name.as_ref()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Convert into the engine's metadata record.
    ///
    /// `requested_batch` is used when the sample does not name its batch.
    /// Returns `None` for a record whose id is blank.
    #[must_use]
    pub fn into_metadata(self, requested_batch: &str) -> Option<SampleMetadata> {
        let qbench_id = self.qbench_id()?;
        Some(SampleMetadata {
            sample_id: normalize_sample_id(&qbench_id),
            qbench_id,
            external_id: text(self.custom_formatted_id.as_ref()),
            batch_id: self
                .detected_batch()
                .unwrap_or_else(|| requested_batch.trim().to_string()),
            sample_name: text(self.sample_name.as_ref()),
            matrix_type: text(self.matrix_type.as_ref()),
            state: text(self.state.as_ref()),
            date_created: text(self.date_created.as_ref()),
            sample_weight_mg: self.sample_weight_mg(),
        })
    }
}

/// Case-insensitive custom-field lookup.
fn custom_field<'a>(custom: &'a Map<String, Value>, label: &str) -> Option<&'a Value> {
    custom
        .iter()
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(label))
        .map(|(_, value)| value)
}

/// Scalar JSON value as trimmed, non-empty text.
fn text(value: Option<&Value>) -> Option<String> {
    let rendered = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!rendered.is_empty()).then_some(rendered)
}

fn is_pesticide_test(test: &Value) -> bool {
    test.get("assay")
        .and_then(|assay| assay.get("title"))
        .and_then(Value::as_str)
        .is_some_and(|title| title.to_lowercase().contains("pesticide"))
}

/// Read a mass value: `12.5`, `" 23 g"`, `"12,345 mg"`.
fn clean_weight(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let repr = n.to_string();
            Decimal::from_str(&repr)
                .or_else(|_| Decimal::from_scientific(&repr))
                .ok()
        }
        Value::String(s) => {
            let without_separators = s.replace(',', "");
            let trimmed = without_separators.trim_start();
            let end = trimmed
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(trimmed.len());
            Decimal::from_str(&trimmed[..end]).ok()
        }
        _ => None,
    }
}
