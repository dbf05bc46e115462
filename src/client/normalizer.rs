//! 结果规范化
//!
//! 将遍历产出的原始值转换为 Cypher 结果行：哨兵值还原为 `null`，
//! `valueMap(true)` 与关系投影还原为带 `_type` 的元素映射。

use crate::cypher::{ELEMENT_KEY, IN_V_KEY, OUT_V_KEY};
use crate::error::{Error, Result};
use crate::types::{Row, Value};
use indexmap::IndexMap;

const ID_TOKEN: &str = "~id";
const LABEL_TOKEN: &str = "~label";

/// 规范化一行结果（原始值必须是字符串键的映射）
pub fn normalize(raw: Value) -> Result<Row> {
    let map = match raw {
        Value::Map(map) => map,
        other => {
            return Err(Error::ExecutionError(format!(
                "结果行必须是映射, 实际为 {}",
                other.type_name()
            )))
        }
    };

    let mut row = Row::with_capacity(map.len());
    for (key, value) in map {
        match key {
            Value::String(column) => {
                row.insert(column, normalize_value(value));
            }
            other => {
                return Err(Error::ExecutionError(format!(
                    "结果列名必须是字符串, 实际为 {}",
                    other.type_name()
                )))
            }
        }
    }
    Ok(row)
}

/// 递归规范化单个值
pub fn normalize_value(value: Value) -> Value {
    if value.is_cypher_null() {
        return Value::Null;
    }
    match value {
        Value::List(items) => Value::List(items.into_iter().map(normalize_value).collect()),
        Value::Map(map) => {
            if map.contains_key(&Value::from(ELEMENT_KEY)) {
                relationship(map)
            } else if map.contains_key(&Value::from(ID_TOKEN))
                && map.contains_key(&Value::from(LABEL_TOKEN))
            {
                element("node", map, Vec::new())
            } else {
                Value::Map(
                    map.into_iter()
                        .map(|(k, v)| (k, normalize_value(v)))
                        .collect(),
                )
            }
        }
        Value::Vertex(v) => Value::map_from([
            ("_type", Value::from("node")),
            ("_id", Value::Int(v.id.as_u64() as i64)),
            ("_label", Value::String(v.label)),
        ]),
        Value::Edge(e) => Value::map_from([
            ("_type", Value::from("relationship")),
            ("_id", Value::Int(e.id.as_u64() as i64)),
            ("_label", Value::String(e.label)),
            ("_inV", Value::Int(e.in_v.as_u64() as i64)),
            ("_outV", Value::Int(e.out_v.as_u64() as i64)),
        ]),
        Value::Property(p) => normalize_value(*p.value),
        other => other,
    }
}

fn relationship(mut map: IndexMap<Value, Value>) -> Value {
    let take = |map: &mut IndexMap<Value, Value>, key: &str| {
        map.shift_remove(&Value::from(key)).unwrap_or(Value::Null)
    };
    let in_v = take(&mut map, IN_V_KEY);
    let out_v = take(&mut map, OUT_V_KEY);
    match take(&mut map, ELEMENT_KEY) {
        Value::Map(edge) => element(
            "relationship",
            edge,
            vec![("_inV", in_v), ("_outV", out_v)],
        ),
        other => normalize_value(other),
    }
}

/// `{~id, ~label, k: v}` → `{_type, _id, _label, extra.., k: v}`
fn element(kind: &str, mut map: IndexMap<Value, Value>, extra: Vec<(&str, Value)>) -> Value {
    let id = map.shift_remove(&Value::from(ID_TOKEN)).unwrap_or(Value::Null);
    let label = map
        .shift_remove(&Value::from(LABEL_TOKEN))
        .unwrap_or(Value::Null);

    let mut out = IndexMap::with_capacity(map.len() + 3 + extra.len());
    out.insert(Value::from("_type"), Value::from(kind));
    out.insert(Value::from("_id"), id);
    out.insert(Value::from("_label"), label);
    for (key, value) in extra {
        out.insert(Value::from(key), value);
    }
    for (key, value) in map {
        out.insert(key, normalize_value(value));
    }
    Value::Map(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeId, VertexId};
    use crate::types::{EdgeRef, VertexRef};

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::map_from(entries)
    }

    #[test]
    fn test_sentinel_becomes_null() {
        let row = normalize(map(vec![
            ("n.name", Value::null_sentinel()),
            ("xs", Value::List(vec![Value::Int(1), Value::null_sentinel()])),
        ]))
        .unwrap();
        assert_eq!(row["n.name"], Value::Null);
        assert_eq!(row["xs"], Value::List(vec![Value::Int(1), Value::Null]));
    }

    #[test]
    fn test_node_map() {
        let row = normalize(map(vec![(
            "n",
            map(vec![
                ("~id", Value::Int(1)),
                ("~label", Value::from("person")),
                ("name", Value::from("Alice")),
            ]),
        )]))
        .unwrap();
        assert_eq!(
            row["n"],
            map(vec![
                ("_type", Value::from("node")),
                ("_id", Value::Int(1)),
                ("_label", Value::from("person")),
                ("name", Value::from("Alice")),
            ])
        );
    }

    #[test]
    fn test_relationship_projection() {
        let projected = map(vec![
            (
                ELEMENT_KEY,
                map(vec![
                    ("~id", Value::Int(7)),
                    ("~label", Value::from("knows")),
                    ("since", Value::Int(2020)),
                ]),
            ),
            (IN_V_KEY, Value::Int(2)),
            (OUT_V_KEY, Value::Int(1)),
        ]);
        let row = normalize(map(vec![("r", projected)])).unwrap();
        assert_eq!(
            row["r"],
            map(vec![
                ("_type", Value::from("relationship")),
                ("_id", Value::Int(7)),
                ("_label", Value::from("knows")),
                ("_inV", Value::Int(2)),
                ("_outV", Value::Int(1)),
                ("since", Value::Int(2020)),
            ])
        );
    }

    #[test]
    fn test_element_references() {
        let vertex = Value::Vertex(VertexRef {
            id: VertexId(3),
            label: "person".to_string(),
        });
        let edge = Value::Edge(EdgeRef {
            id: EdgeId(4),
            label: "knows".to_string(),
            out_v: VertexId(3),
            in_v: VertexId(5),
        });
        assert_eq!(
            normalize_value(vertex),
            map(vec![
                ("_type", Value::from("node")),
                ("_id", Value::Int(3)),
                ("_label", Value::from("person")),
            ])
        );
        let edge = normalize_value(edge);
        assert_eq!(edge.as_map().unwrap()[&Value::from("_outV")], Value::Int(3));
    }

    #[test]
    fn test_non_map_row_rejected() {
        assert!(matches!(
            normalize(Value::Int(1)),
            Err(Error::ExecutionError(_))
        ));
    }
}
