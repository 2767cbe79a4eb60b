//! SQL values and literal quoting for rendered patch files.

use std::fmt::Write;

/// A column value, either bound as a parameter or rendered as a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}
impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Renders a value as an SQLite literal.
///
/// Text is single-quoted with embedded quotes doubled. Text containing NUL
/// bytes cannot be written as a string literal and is rendered as a hex blob
/// cast back to text. Non-finite reals have no literal form and become `NULL`.
///
/// ```
/// use gearbase_materialize::sql::{Value, quote};
/// assert_eq!(quote(&Value::from("Rock 'n' Roll")), "'Rock ''n'' Roll'");
/// assert_eq!(quote(&Value::Real(189.0)), "189.0");
/// assert_eq!(quote(&Value::Null), "NULL");
/// ```
pub fn quote(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Real(r) if r.is_finite() => format!("{r:?}"),
        Value::Real(_) => "NULL".to_string(),
        Value::Text(text) if text.contains('\0') => {
            let mut hex = String::with_capacity(text.len() * 2);
            for byte in text.bytes() {
                // Writing to a String cannot fail.
                let _ = write!(hex, "{byte:02X}");
            }
            format!("CAST(X'{hex}' AS TEXT)")
        },
        Value::Text(text) => format!("'{}'", text.replace('\'', "''")),
    }
}

/// Quotes an identifier (table or column name).
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Null, "NULL")]
    #[case(Value::Integer(-3), "-3")]
    #[case(Value::from(true), "1")]
    #[case(Value::Real(0.1), "0.1")]
    #[case(Value::Real(1e21), "1e21")]
    #[case(Value::Real(f64::NAN), "NULL")]
    #[case(Value::from("it's"), "'it''s'")]
    #[case(Value::from("line\nbreak"), "'line\nbreak'")]
    #[case(Value::from("a\0b"), "CAST(X'610062' AS TEXT)")]
    #[case(Value::from(None::<String>), "NULL")]
    fn test_quote(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(quote(&value), expected);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("versions"), "\"versions\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    #[tokio::test]
    async fn test_literals_round_trip_through_sqlite() {
        use sqlx::Connection;
        let mut conn = sqlx::SqliteConnection::connect("sqlite::memory:").await.unwrap();
        for text in ["plain", "it's", "ünïcødé ♫", "a\0b", "--comment", "'; DROP TABLE x; --"] {
            let literal = quote(&Value::from(text));
            let back: String = sqlx::query_scalar(&format!("SELECT {literal}")).fetch_one(&mut conn).await.unwrap();
            assert_eq!(back, text);
        }
        let back: f64 = sqlx::query_scalar(&format!("SELECT {}", quote(&Value::Real(19.99))))
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(back, 19.99);
    }
}
