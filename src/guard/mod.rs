//! Override guard module
//!
//! Operators can hand-correct individual catalog fields; automated updates
//! must never overwrite those corrections. This module provides the field
//! vocabulary, the protected-field set with its monotonic-union semantics,
//! and the filter that splits a candidate update into applied and skipped
//! fields.

use crate::storage::ItemRecord;
use std::collections::BTreeSet;
use std::fmt;

/// The catalog fields an automated update can propose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Brand,
    LengthCm,
    WidthCm,
    WeightKg,
    PowerW,
    VoltageV,
    PriceUsd,
}

impl Field {
    /// Canonical name used in the database and in operator-facing reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Brand => "brand",
            Self::LengthCm => "length_cm",
            Self::WidthCm => "width_cm",
            Self::WeightKg => "weight_kg",
            Self::PowerW => "power_w",
            Self::VoltageV => "voltage_v",
            Self::PriceUsd => "price_usd",
        }
    }

    /// Parses a canonical field name
    ///
    /// Returns None for unknown names; callers decide whether that is an
    /// input error or ignorable noise.
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "brand" => Some(Self::Brand),
            "length_cm" => Some(Self::LengthCm),
            "width_cm" => Some(Self::WidthCm),
            "weight_kg" => Some(Self::WeightKg),
            "power_w" => Some(Self::PowerW),
            "voltage_v" => Some(Self::VoltageV),
            "price_usd" => Some(Self::PriceUsd),
            _ => None,
        }
    }

    /// Returns all fields in canonical order
    pub fn all_fields() -> Vec<Self> {
        vec![
            Self::Name,
            Self::Brand,
            Self::LengthCm,
            Self::WidthCm,
            Self::WeightKg,
            Self::PowerW,
            Self::VoltageV,
            Self::PriceUsd,
        ]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered set of field names with a stable database encoding
///
/// Used for both protected fields (operator corrections) and missing fields
/// (parse failures flagged for review). Protection only grows: the set
/// exposes union operations, never removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    fields: BTreeSet<Field>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn insert(&mut self, field: Field) {
        self.fields.insert(field);
    }

    /// Unions another set into this one (monotonic; nothing is removed)
    pub fn union_with(&mut self, other: &FieldSet) {
        for field in &other.fields {
            self.fields.insert(*field);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().copied()
    }

    /// Encodes the set as a comma-joined string for a TEXT column
    pub fn to_db_string(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Decodes a comma-joined column value, ignoring unknown names
    ///
    /// Unknown names can appear after a schema evolves; dropping them is
    /// safer than failing every row read.
    pub fn from_db_string(s: &str) -> Self {
        let fields = s
            .split(',')
            .filter(|part| !part.is_empty())
            .filter_map(|part| Field::from_str_name(part.trim()))
            .collect();
        Self { fields }
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<T: IntoIterator<Item = Field>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A proposed automated update, one optional value per field
///
/// A `None` means the source had nothing parseable for that field; the
/// guard never interprets it as "clear the stored value".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateFields {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub power_w: Option<i64>,
    pub voltage_v: Option<f64>,
    pub price_usd: Option<f64>,
}

impl CandidateFields {
    /// Returns the fields that carry a value, in canonical order
    pub fn present_fields(&self) -> Vec<Field> {
        let mut present = Vec::new();
        if self.name.is_some() {
            present.push(Field::Name);
        }
        if self.brand.is_some() {
            present.push(Field::Brand);
        }
        if self.length_cm.is_some() {
            present.push(Field::LengthCm);
        }
        if self.width_cm.is_some() {
            present.push(Field::WidthCm);
        }
        if self.weight_kg.is_some() {
            present.push(Field::WeightKg);
        }
        if self.power_w.is_some() {
            present.push(Field::PowerW);
        }
        if self.voltage_v.is_some() {
            present.push(Field::VoltageV);
        }
        if self.price_usd.is_some() {
            present.push(Field::PriceUsd);
        }
        present
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }
}

/// Result of filtering a candidate update through the protected-field set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Fields whose values were written to the item
    pub applied: Vec<Field>,

    /// Fields that carried a value but were blocked by protection
    pub skipped: Vec<Field>,
}

/// Applies a candidate update to an item, skipping protected fields
///
/// Mutates only unprotected fields that carry a candidate value. Never
/// touches `protected_fields` itself; growing that set is the job of
/// `Storage::protect_fields`, driven by an explicit editor action.
pub fn apply_update(item: &mut ItemRecord, candidates: &CandidateFields) -> UpdateOutcome {
    let mut outcome = UpdateOutcome::default();

    for field in candidates.present_fields() {
        if item.protected_fields.contains(field) {
            outcome.skipped.push(field);
            continue;
        }
        match field {
            Field::Name => item.name = candidates.name.clone().unwrap_or_default(),
            Field::Brand => item.brand = candidates.brand.clone(),
            Field::LengthCm => item.length_cm = candidates.length_cm,
            Field::WidthCm => item.width_cm = candidates.width_cm,
            Field::WeightKg => item.weight_kg = candidates.weight_kg,
            Field::PowerW => item.power_w = candidates.power_w,
            Field::VoltageV => item.voltage_v = candidates.voltage_v,
            Field::PriceUsd => item.price_usd = candidates.price_usd,
        }
        outcome.applied.push(field);
    }

    outcome
}
