//! Record text format
//!
//! A record is the unit of transmission and persistence: every
//! expression coefficient of one sampling tick followed by yaw, pitch
//! and roll, comma separated, no spaces, six decimal places each.
//!
//! The field order is fixed by a versioned layout so the wire format
//! stays stable no matter how the pipeline code is refactored:
//!
//! - V1: the 51 classic ARKit keys, then yaw, pitch, roll (54 fields)
//! - V2: all 52 keys including `tongueOut`, then yaw, pitch, roll (55 fields)

use std::fmt;

use blendcast_core::{BlendcastError, BlendcastResult};
use blendcast_visual::{BlendShape, ExpressionFrame, Orientation};
use serde::{Deserialize, Serialize};

const ZERO: &str = "0.000000";

/// Tiny negatives round to this; it is always written as `ZERO`
const NEGATIVE_ZERO: &str = "-0.000000";

/// One slot of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Expression(BlendShape),
    Yaw,
    Pitch,
    Roll,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Expression(shape) => shape.name(),
            Field::Yaw => "yaw",
            Field::Pitch => "pitch",
            Field::Roll => "roll",
        }
    }

    fn value(self, expr: &ExpressionFrame, orientation: &Orientation) -> f32 {
        match self {
            Field::Expression(shape) => expr.get(shape),
            Field::Yaw => orientation.yaw,
            Field::Pitch => orientation.pitch,
            Field::Roll => orientation.roll,
        }
    }
}

/// Versioned field list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLayout {
    #[default]
    V1,
    V2,
}

impl RecordLayout {
    pub fn version(self) -> u8 {
        match self {
            RecordLayout::V1 => 1,
            RecordLayout::V2 => 2,
        }
    }

    pub fn from_version(version: u8) -> BlendcastResult<Self> {
        match version {
            1 => Ok(RecordLayout::V1),
            2 => Ok(RecordLayout::V2),
            other => Err(BlendcastError::UnknownLayout(other)),
        }
    }

    /// Layout with exactly `count` fields, if any
    pub fn from_field_count(count: usize) -> Option<Self> {
        [RecordLayout::V1, RecordLayout::V2]
            .into_iter()
            .find(|layout| layout.field_count() == count)
    }

    /// Expression keys carried by this layout, in order
    pub fn expression_keys(self) -> &'static [BlendShape] {
        match self {
            RecordLayout::V1 => BlendShape::classic(),
            RecordLayout::V2 => &BlendShape::ALL,
        }
    }

    pub fn field_count(self) -> usize {
        self.expression_keys().len() + 3
    }

    /// Fields in record order
    pub fn fields(self) -> impl Iterator<Item = Field> {
        self.expression_keys()
            .iter()
            .map(|shape| Field::Expression(*shape))
            .chain([Field::Yaw, Field::Pitch, Field::Roll])
    }

    /// Column header line matching this layout
    pub fn header(self) -> String {
        self.fields().map(Field::name).collect::<Vec<_>>().join(",")
    }
}

impl fmt::Display for RecordLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version())
    }
}

/// Encoded snapshot of one sampling tick.
/// Two records are equal iff their text is byte-identical.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Record(String);

impl Record {
    pub fn empty() -> Self {
        Record(String::new())
    }

    /// Wrap text received from elsewhere (no validation)
    pub fn from_text(text: impl Into<String>) -> Self {
        Record(text.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Empty or whitespace-only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.split(',')
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 32;
        match self.0.get(..PREVIEW) {
            Some(head) if self.0.len() > PREVIEW => write!(f, "Record({}.. {} bytes)", head, self.0.len()),
            _ => write!(f, "Record({:?})", self.0),
        }
    }
}

/// Encoder for one layout
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordEncoder {
    layout: RecordLayout,
}

impl RecordEncoder {
    pub fn new(layout: RecordLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Render `expr` and `orientation` in layout order
    pub fn encode(&self, expr: &ExpressionFrame, orientation: Orientation) -> Record {
        let mut out = String::with_capacity(self.layout.field_count() * 10);
        for (i, field) in self.layout.fields().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&render_value(field, field.value(expr, &orientation)));
        }
        Record(out)
    }
}

fn render_value(field: Field, value: f32) -> String {
    let value = if value.is_finite() {
        value
    } else {
        tracing::debug!("non-finite {} rendered as zero", field.name());
        0.0
    };
    let rendered = format!("{:.6}", value);
    if rendered == NEGATIVE_ZERO {
        ZERO.to_string()
    } else {
        rendered
    }
}

/// A record parsed back into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub layout: RecordLayout,
    pub expression: ExpressionFrame,
    pub orientation: Orientation,
}

/// Subscriber-side parser
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordDecoder;

impl RecordDecoder {
    /// Parse a record, picking the layout from its field count.
    /// Whitespace around fields is tolerated.
    pub fn decode(record: &Record) -> BlendcastResult<DecodedRecord> {
        let count = record.fields().count();
        let layout = RecordLayout::from_field_count(count).ok_or(BlendcastError::FieldCountMismatch {
            expected: RecordLayout::V1.field_count(),
            actual: count,
        })?;
        Self::decode_as(record, layout)
    }

    /// Parse a record that must follow `layout`
    pub fn decode_as(record: &Record, layout: RecordLayout) -> BlendcastResult<DecodedRecord> {
        let raw: Vec<&str> = record.fields().collect();
        if raw.len() != layout.field_count() {
            return Err(BlendcastError::FieldCountMismatch {
                expected: layout.field_count(),
                actual: raw.len(),
            });
        }

        let mut expression = ExpressionFrame::neutral();
        let mut orientation = Orientation::ZERO;

        for (index, (field, text)) in layout.fields().zip(raw).enumerate() {
            let value: f32 = text
                .trim()
                .parse()
                .map_err(|_| BlendcastError::UnparsableField {
                    index,
                    value: text.to_string(),
                })?;
            match field {
                Field::Expression(shape) => expression.set(shape, value),
                Field::Yaw => orientation.yaw = value,
                Field::Pitch => orientation.pitch = value,
                Field::Roll => orientation.roll = value,
            }
        }

        Ok(DecodedRecord {
            layout,
            expression,
            orientation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(RecordLayout::V1.field_count(), 54);
        assert_eq!(RecordLayout::V2.field_count(), 55);
        assert_eq!(RecordLayout::V1.fields().count(), 54);
        assert_eq!(RecordLayout::from_field_count(55), Some(RecordLayout::V2));
        assert_eq!(RecordLayout::from_field_count(12), None);
    }

    #[test]
    fn test_layout_order() {
        let fields: Vec<Field> = RecordLayout::V1.fields().collect();
        assert_eq!(fields[0], Field::Expression(BlendShape::BrowDownLeft));
        assert_eq!(fields[50], Field::Expression(BlendShape::NoseSneerRight));
        assert_eq!(&fields[51..], &[Field::Yaw, Field::Pitch, Field::Roll]);

        let header = RecordLayout::V2.header();
        assert!(header.starts_with("browDownLeft,browDownRight,"));
        assert!(header.ends_with(",tongueOut,yaw,pitch,roll"));
    }

    #[test]
    fn test_layout_version_roundtrip() {
        for layout in [RecordLayout::V1, RecordLayout::V2] {
            assert_eq!(RecordLayout::from_version(layout.version()).unwrap(), layout);
        }
        assert!(matches!(
            RecordLayout::from_version(9),
            Err(BlendcastError::UnknownLayout(9))
        ));
    }

    #[test]
    fn test_all_zero_record() {
        let record = RecordEncoder::default().encode(&ExpressionFrame::neutral(), Orientation::ZERO);
        let expected = vec!["0.000000"; 54].join(",");
        assert_eq!(record.as_str(), expected);
        assert_eq!(record.as_str().matches(',').count(), 53);
    }

    #[test]
    fn test_values_in_order() {
        let expr = ExpressionFrame::neutral()
            .with(BlendShape::BrowDownLeft, 0.5)
            .with(BlendShape::NoseSneerRight, 0.125)
            .with(BlendShape::TongueOut, 1.0);
        let record = RecordEncoder::new(RecordLayout::V1).encode(&expr, Orientation::new(10.0, -20.5, 0.25));
        let fields: Vec<&str> = record.fields().collect();

        assert_eq!(fields[0], "0.500000");
        assert_eq!(fields[50], "0.125000");
        assert_eq!(&fields[51..], &["10.000000", "-20.500000", "0.250000"]);

        let v2 = RecordEncoder::new(RecordLayout::V2).encode(&expr, Orientation::ZERO);
        assert_eq!(v2.fields().nth(51), Some("1.000000"));
    }

    #[test]
    fn test_negative_zero_and_nan_render_as_zero() {
        let expr = ExpressionFrame::neutral().with(BlendShape::JawOpen, f32::NAN);
        let record = RecordEncoder::default().encode(&expr, Orientation::new(-0.0, -1e-9, f32::INFINITY));
        assert!(!record.as_str().contains('-'));
        assert!(!record.as_str().contains("NaN"));
        assert!(record.fields().all(|f| f == "0.000000"));
    }

    #[test]
    fn test_blank_record() {
        assert!(Record::empty().is_blank());
        assert!(Record::from_text(" \n\t").is_blank());
        assert!(!Record::from_text("0.1").is_blank());
    }

    #[test]
    fn test_decode_tolerates_spaces() {
        let mut text = vec!["0.100000"; 51].join(",");
        text.push_str(",1.5, 2.5, 3.5");
        let decoded = RecordDecoder::decode(&Record::from_text(text)).unwrap();
        assert_eq!(decoded.layout, RecordLayout::V1);
        assert_eq!(decoded.orientation, Orientation::new(1.5, 2.5, 3.5));
        assert_eq!(decoded.expression.get(BlendShape::MouthPucker), 0.1);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let err = RecordDecoder::decode(&Record::from_text("1,2,3")).unwrap_err();
        assert!(matches!(err, BlendcastError::FieldCountMismatch { actual: 3, .. }));

        let mut fields = vec!["0.0"; 54];
        fields[7] = "abc";
        let err = RecordDecoder::decode(&Record::from_text(fields.join(","))).unwrap_err();
        assert!(matches!(err, BlendcastError::UnparsableField { index: 7, .. }));
    }

    proptest! {
        #[test]
        fn prop_encode_is_deterministic_with_fixed_field_count(
            values in prop::collection::vec(0.0f32..=1.0, BlendShape::COUNT),
            yaw in -180.0f32..180.0,
            pitch in -90.0f32..90.0,
            roll in -180.0f32..180.0,
        ) {
            let mut expr = ExpressionFrame::neutral();
            for (shape, value) in BlendShape::ALL.iter().zip(&values) {
                expr.set(*shape, *value);
            }
            let o = Orientation::new(yaw, pitch, roll);
            let encoder = RecordEncoder::new(RecordLayout::V1);

            let a = encoder.encode(&expr, o);
            let b = encoder.encode(&expr.clone(), o);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.fields().count(), 54);
            prop_assert!(a.fields().all(|f| f.split('.').nth(1).map(str::len) == Some(6)));
        }
    }
}
