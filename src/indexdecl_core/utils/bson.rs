// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::{Error, Result};
use bson::spec::ElementType as BsonElementType;
use bson::{Bson, Document};
use byteorder::{BigEndian, WriteBytesExt};
use std::cmp::Ordering;
use std::io::Write;

/// Encodes a sequence of values into one comparable byte key.
///
/// Numbers are folded before encoding so that `1`, `1i64` and `1.0`
/// produce the same key, the way the server treats them in a unique index.
pub fn stacked_key<'a, T: IntoIterator<Item = &'a Bson>>(keys: T) -> Result<Vec<u8>> {
    let mut result = Vec::<u8>::new();

    for key in keys {
        stacked_key_bytes(&mut result, key)?;
    }

    Ok(result)
}

pub fn stacked_key_bytes<W: Write>(writer: &mut W, key: &Bson) -> Result<()> {
    match key {
        Bson::Double(dbl) => {
            if dbl.fract() == 0.0 && dbl.abs() < (i64::MAX as f64) {
                writer.write_u8(BsonElementType::Int64 as u8)?;
                writer.write_i64::<BigEndian>(*dbl as i64)?;
            } else {
                writer.write_u8(BsonElementType::Double as u8)?;
                writer.write_f64::<BigEndian>(*dbl)?;
            }
        }
        Bson::String(str) => {
            writer.write_u8(BsonElementType::String as u8)?;

            // length first, strings may contain NUL
            writer.write_u32::<BigEndian>(str.len() as u32)?;
            writer.write_all(str.as_bytes())?;
        }
        Bson::Boolean(bl) => {
            writer.write_u8(BsonElementType::Boolean as u8)?;

            writer.write_u8(*bl as u8)?;
        }
        Bson::Null | Bson::Undefined => {
            writer.write_u8(BsonElementType::Null as u8)?;
        }
        Bson::Int32(i32) => {
            writer.write_u8(BsonElementType::Int64 as u8)?;

            writer.write_i64::<BigEndian>(*i32 as i64)?;
        }
        Bson::Int64(i64) => {
            writer.write_u8(BsonElementType::Int64 as u8)?;

            writer.write_i64::<BigEndian>(*i64)?;
        }
        Bson::ObjectId(oid) => {
            writer.write_u8(BsonElementType::ObjectId as u8)?;

            let bytes = oid.bytes();
            writer.write_all(&bytes)?;
        }
        Bson::DateTime(dt) => {
            writer.write_u8(BsonElementType::DateTime as u8)?;

            let t = dt.timestamp_millis();

            writer.write_i64::<BigEndian>(t)?;
        }
        Bson::Decimal128(dcl) => {
            writer.write_u8(BsonElementType::Decimal128 as u8)?;

            let bytes = dcl.bytes();

            writer.write_all(&bytes)?;
        }

        _ => {
            let val = format!("{:?}", key);
            return Err(Error::NotAValidKeyType(val));
        }
    }

    Ok(())
}

/// Compares two values, treating the numeric types as one family.
///
/// Returns `None` when the values are of unrelated types.
pub fn value_cmp(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        (Bson::DateTime(d1), Bson::DateTime(d2)) => Some(d1.cmp(d2)),
        (Bson::Boolean(b1), Bson::Boolean(b2)) => Some(b1.cmp(b2)),
        (Bson::Int64(i1), Bson::Int64(i2)) => Some(i1.cmp(i2)),
        (Bson::Int32(i1), Bson::Int32(i2)) => Some(i1.cmp(i2)),
        (Bson::Int64(i1), Bson::Int32(i2)) => Some(i1.cmp(&(*i2 as i64))),
        (Bson::Int32(i1), Bson::Int64(i2)) => Some((*i1 as i64).cmp(i2)),
        (Bson::Double(d1), Bson::Double(d2)) => Some(d1.total_cmp(d2)),
        (Bson::Double(d1), Bson::Int32(d2)) => Some(d1.total_cmp(&(*d2 as f64))),
        (Bson::Double(d1), Bson::Int64(d2)) => Some(d1.total_cmp(&(*d2 as f64))),
        (Bson::Int32(i1), Bson::Double(d2)) => Some((*i1 as f64).total_cmp(d2)),
        (Bson::Int64(i1), Bson::Double(d2)) => Some((*i1 as f64).total_cmp(d2)),
        (Bson::Binary(b1), Bson::Binary(b2)) => Some(b1.bytes.cmp(&b2.bytes)),
        (Bson::String(str1), Bson::String(str2)) => Some(str1.cmp(str2)),
        (Bson::ObjectId(oid1), Bson::ObjectId(oid2)) => Some(oid1.cmp(oid2)),
        _ => None,
    }
}

/// Structural equality where numbers of different widths compare equal.
/// Field order inside documents is significant.
pub fn values_equivalent(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Document(d1), Bson::Document(d2)) => documents_equivalent(d1, d2),
        (Bson::Array(a1), Bson::Array(a2)) => {
            a1.len() == a2.len()
                && a1.iter().zip(a2.iter()).all(|(x, y)| values_equivalent(x, y))
        }
        _ => match value_cmp(a, b) {
            Some(ordering) => ordering == Ordering::Equal,
            None => a == b,
        },
    }
}

pub fn documents_equivalent(a: &Document, b: &Document) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|((k1, v1), (k2, v2))| k1 == k2 && values_equivalent(v1, v2))
}

pub fn try_get_document_value(doc: &Document, key: &str) -> Option<Bson> {
    let keys = key.split('.').collect::<Vec<&str>>();
    try_get_document_by_slices(doc, keys.as_slice())
}

fn try_get_document_by_slices(doc: &Document, keys: &[&str]) -> Option<Bson> {
    let first = keys.first()?;
    let remains = &keys[1..];
    match doc.get(first) {
        Some(Bson::Document(doc)) if !remains.is_empty() => {
            try_get_document_by_slices(doc, remains)
        }
        Some(v) if remains.is_empty() => Some(v.clone()),
        _ => None,
    }
}

/// Sets `value` at a dotted `key`, creating intermediate documents.
pub fn set_document_value(doc: &mut Document, key: &str, value: Bson) {
    match key.split_once('.') {
        None => {
            doc.insert(key, value);
        }
        Some((head, rest)) => {
            if !matches!(doc.get(head), Some(Bson::Document(_))) {
                doc.insert(head, Document::new());
            }
            if let Some(Bson::Document(sub)) = doc.get_mut(head) {
                set_document_value(sub, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::bson::{
        set_document_value, stacked_key, value_cmp, values_equivalent,
    };
    use bson::{doc, Bson};
    use std::cmp::Ordering;

    #[test]
    fn test_value_cmp() {
        assert_eq!(
            value_cmp(&Bson::Int32(2), &Bson::Int64(3)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            value_cmp(&Bson::Int64(2), &Bson::Int32(1)).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            value_cmp(&Bson::Int32(1), &Bson::Double(1.0)).unwrap(),
            Ordering::Equal
        );
        assert!(value_cmp(&Bson::Int32(1), &Bson::String("1".into())).is_none());
    }

    #[test]
    fn test_stacked_key_folds_numbers() {
        let a = stacked_key(&[Bson::Int32(7)]).unwrap();
        let b = stacked_key(&[Bson::Int64(7)]).unwrap();
        let c = stacked_key(&[Bson::Double(7.0)]).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);

        let d = stacked_key(&[Bson::Double(7.5)]).unwrap();
        assert_ne!(c, d);
    }

    #[test]
    fn test_stacked_key_keeps_components_apart() {
        let ab = stacked_key(&[Bson::String("ab".into()), Bson::String("c".into())]).unwrap();
        let a_bc = stacked_key(&[Bson::String("a".into()), Bson::String("bc".into())]).unwrap();
        assert_ne!(ab, a_bc);
    }

    #[test]
    fn test_stacked_key_strings_with_nul() {
        let first = stacked_key(&[Bson::String("a\0\x02b".into()), Bson::String("c".into())]).unwrap();
        let second = stacked_key(&[Bson::String("a".into()), Bson::String("b\0\x02c".into())]).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_stacked_key_rejects_documents() {
        let result = stacked_key(&[Bson::Document(doc! { "a": 1 })]);
        assert!(result.is_err());
    }

    #[test]
    fn test_values_equivalent() {
        assert!(values_equivalent(
            &Bson::Document(doc! { "active": true, "n": 1 }),
            &Bson::Document(doc! { "active": true, "n": 1i64 }),
        ));
        assert!(!values_equivalent(
            &Bson::Document(doc! { "active": true }),
            &Bson::Document(doc! { "active": false }),
        ));
        assert!(!values_equivalent(
            &Bson::Document(doc! { "a": 1, "b": 1 }),
            &Bson::Document(doc! { "b": 1, "a": 1 }),
        ));
    }

    #[test]
    fn test_try_get_document_value() {
        assert_eq!(super::try_get_document_value(&doc! {}, "a"), None);
        assert_eq!(
            super::try_get_document_value(&doc! {"a": 1}, "a"),
            Some(Bson::Int32(1))
        );
        assert_eq!(super::try_get_document_value(&doc! {"a": 1}, "a.b"), None);
        assert_eq!(
            super::try_get_document_value(&doc! {"a": { "b": 1 }}, "a.b"),
            Some(Bson::Int32(1))
        );
        assert_eq!(
            super::try_get_document_value(&doc! {"a": { "b": { "c": 1 }}}, "a.b.d"),
            None
        );
    }

    #[test]
    fn test_set_document_value() {
        let mut doc = doc! { "a": 1 };
        set_document_value(&mut doc, "b.c", Bson::Boolean(true));
        set_document_value(&mut doc, "a", Bson::Int32(2));
        assert_eq!(doc, doc! { "a": 2, "b": { "c": true } });
    }
}
