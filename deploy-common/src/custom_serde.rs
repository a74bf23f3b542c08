//! Custom de/serialization logic used to keep the project files compatible with
//! the format already stored on disk

/// De/serializes an optional value as its string form, writing the `"unknown"`
/// sentinel in place of an absent value.
///
/// Both a missing field, `null`, and the sentinel itself deserialize to `None`,
/// so that an undetermined value can never be mistaken for a real one.
pub mod unknown_or {
    use std::{fmt::Display, str::FromStr};

    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::constants::UNKNOWN_SENTINEL;

    /// Serialize an optional value, writing the sentinel for `None`
    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_str(UNKNOWN_SENTINEL),
        }
    }

    /// Deserialize an optional value, mapping the sentinel to `None`
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some(UNKNOWN_SENTINEL) => Ok(None),
            Some(s) => s.parse().map(Some).map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use crate::types::BytecodeHash;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Holder {
        #[serde(default, with = "super::unknown_or")]
        hash: Option<BytecodeHash>,
    }

    const HASH: &str = "8f3a2b1c00000000000000000000000000000000000000000000000000000001";

    #[test]
    fn test_sentinel_reads_as_absent() {
        let holder: Holder = serde_json::from_str(r#"{"hash":"unknown"}"#).unwrap();
        assert_eq!(holder.hash, None);

        let holder: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(holder.hash, None);
    }

    #[test]
    fn test_absent_writes_sentinel() {
        let json = serde_json::to_string(&Holder { hash: None }).unwrap();
        assert_eq!(json, r#"{"hash":"unknown"}"#);
    }

    #[test]
    fn test_hash_survives_rewrite() {
        let raw = format!(r#"{{"hash":"{HASH}"}}"#);
        let holder: Holder = serde_json::from_str(&raw).unwrap();
        assert_eq!(holder.hash.unwrap().to_string(), HASH);
        assert_eq!(serde_json::to_string(&holder).unwrap(), raw);
    }

    #[test]
    fn test_malformed_hash_is_rejected() {
        assert!(serde_json::from_str::<Holder>(r#"{"hash":"zz"}"#).is_err());
    }
}
