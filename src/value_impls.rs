// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Serde instances for value snapshots.
//!
//! Snapshots map onto the serde data model the obvious way: tuples and lists
//! become sequences, dicts become maps.  Globals and instances are written
//! as structs; reading them back yields plain dicts, since self-describing
//! formats do not record struct names.

use std::fmt;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, SerializeStruct, Serializer};

use crate::value::Value;

struct Pairs<'a>(&'a [(Value, Value)]);

impl<'a> Serialize for Pairs<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(b),
            Value::I64(i) => serializer.serialize_i64(i),
            Value::Int(ref i) => {
                if let Some(i) = i.to_i64() {
                    serializer.serialize_i64(i)
                } else if let Some(u) = i.to_u64() {
                    serializer.serialize_u64(u)
                } else {
                    // Beyond what the data model can carry as a number.
                    serializer.serialize_str(&i.to_string())
                }
            }
            Value::F64(f) => serializer.serialize_f64(f),
            Value::Bytes(ref b) => serializer.serialize_bytes(b),
            Value::String(ref s) => serializer.serialize_str(s),
            Value::List(ref items) | Value::Tuple(ref items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Dict(ref pairs) => Pairs(pairs).serialize(serializer),
            Value::Global { ref module, ref name } => {
                let mut st = serializer.serialize_struct("Global", 2)?;
                st.serialize_field("module", module)?;
                st.serialize_field("name", name)?;
                st.end()
            }
            Value::Object { ref module, ref name, ref attrs } => {
                let mut st = serializer.serialize_struct("Object", 3)?;
                st.serialize_field("module", module)?;
                st.serialize_field("name", name)?;
                st.serialize_field("attrs", &Pairs(attrs))?;
                st.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str("any value")
    }

    #[inline]
    fn visit_bool<E>(self, value: bool) -> Result<Value, E> {
        Ok(Value::Bool(value))
    }

    #[inline]
    fn visit_i64<E>(self, value: i64) -> Result<Value, E> {
        Ok(Value::I64(value))
    }

    #[inline]
    fn visit_u64<E>(self, value: u64) -> Result<Value, E> {
        match value.to_i64() {
            Some(i) => Ok(Value::I64(i)),
            None => Ok(Value::Int(BigInt::from(value))),
        }
    }

    #[inline]
    fn visit_f64<E>(self, value: f64) -> Result<Value, E> {
        Ok(Value::F64(value))
    }

    #[inline]
    fn visit_str<E: de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::String(value.to_owned()))
    }

    #[inline]
    fn visit_string<E>(self, value: String) -> Result<Value, E> {
        Ok(Value::String(value))
    }

    #[inline]
    fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(value.to_vec()))
    }

    #[inline]
    fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Bytes(value))
    }

    #[inline]
    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::None)
    }

    #[inline]
    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    #[inline]
    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::None)
    }

    fn visit_seq<V: SeqAccess<'de>>(self, mut visitor: V) -> Result<Value, V::Error> {
        let mut values = Vec::with_capacity(visitor.size_hint().unwrap_or(0).min(4096));
        while let Some(elem) = visitor.next_element()? {
            values.push(elem);
        }
        Ok(Value::List(values))
    }

    fn visit_map<V: MapAccess<'de>>(self, mut visitor: V) -> Result<Value, V::Error> {
        let mut pairs: Vec<(Value, Value)> = Vec::new();
        while let Some((key, value)) = visitor.next_entry()? {
            match pairs.iter().position(|(k, _)| *k == key) {
                Some(i) => pairs[i].1 = value,
                None => pairs.push((key, value)),
            }
        }
        Ok(Value::Dict(pairs))
    }
}

impl<'de> Deserialize<'de> for Value {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
