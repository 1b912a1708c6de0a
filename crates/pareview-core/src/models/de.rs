//! Lenient deserializers for fields the backend encodes inconsistently.
//!
//! Decimal columns arrive as JSON strings ("12.3400") from some endpoints and
//! as numbers from others; tags arrive either as an array or as a single
//! comma-separated string.

use serde::de;

struct DecimalVisitor;

impl<'de> de::Visitor<'de> for DecimalVisitor {
    type Value = Option<f64>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a decimal string or number")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse::<f64>()
            .map(Some)
            .map_err(|_| E::custom(format!("invalid decimal: {}", v)))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }
}

/// Decimal that must be present.
pub fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer
        .deserialize_any(DecimalVisitor)?
        .ok_or_else(|| de::Error::custom("missing decimal value"))
}

/// Decimal that may be null, empty or absent (pair with `#[serde(default)]`).
pub fn optional_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(DecimalVisitor)
}

/// Tags as `["a", "b"]` or `"a, b"`.
pub fn tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct TagsVisitor;

    impl<'de> de::Visitor<'de> for TagsVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a list of tags or a comma-separated string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            Ok(split_tags(v))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut out = Vec::new();
            while let Some(tag) = seq.next_element::<String>()? {
                let tag = tag.trim();
                if !tag.is_empty() {
                    out.push(tag.to_string());
                }
            }
            Ok(out)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(TagsVisitor)
}

/// Split a comma-separated tag string, trimming and dropping empties.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "decimal")]
        price: f64,
        #[serde(default, deserialize_with = "optional_decimal")]
        amount: Option<f64>,
        #[serde(default, deserialize_with = "tags")]
        tags: Vec<String>,
    }

    #[test]
    fn test_decimal_accepts_strings_and_numbers() {
        let a: Row = serde_json::from_str(r#"{"price": "12.3400"}"#).unwrap();
        assert_eq!(a.price, 12.34);
        let b: Row = serde_json::from_str(r#"{"price": 7}"#).unwrap();
        assert_eq!(b.price, 7.0);
        let c: Row = serde_json::from_str(r#"{"price": 1.5, "amount": null}"#).unwrap();
        assert_eq!(c.amount, None);
        let d: Row = serde_json::from_str(r#"{"price": 1, "amount": ""}"#).unwrap();
        assert_eq!(d.amount, None);
    }

    #[test]
    fn test_decimal_rejects_garbage() {
        assert!(serde_json::from_str::<Row>(r#"{"price": "abc"}"#).is_err());
        assert!(serde_json::from_str::<Row>(r#"{"price": null}"#).is_err());
    }

    #[test]
    fn test_tags_from_string_or_list() {
        let a: Row = serde_json::from_str(r#"{"price": 1, "tags": "breakout, pullback,,"}"#).unwrap();
        assert_eq!(a.tags, vec!["breakout", "pullback"]);
        let b: Row = serde_json::from_str(r#"{"price": 1, "tags": [" trend ", ""]}"#).unwrap();
        assert_eq!(b.tags, vec!["trend"]);
        let c: Row = serde_json::from_str(r#"{"price": 1}"#).unwrap();
        assert!(c.tags.is_empty());
    }
}
