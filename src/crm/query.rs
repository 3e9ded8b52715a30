// The CRM accepts one POST endpoint taking a nested query/mutation document.
// Each key is either a field to select (serialized as an empty object) or an
// operation whose arguments live under the reserved "$" key. The wire shape
// must be reproduced exactly; this module models it as a small expression tree
// instead of hand-built `serde_json` maps so callers cannot get the nesting
// wrong.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryDoc {
    /// Leaf field selection: serializes to `{}`.
    Field,
    /// Nested selection of child nodes, in insertion order.
    Select(Vec<(String, QueryDoc)>),
    /// Argument-bearing operation: `{"$": {..args}, ..selection}`.
    Op {
        args: Value,
        select: Vec<(String, QueryDoc)>,
    },
}

impl QueryDoc {
    pub fn select() -> Self {
        QueryDoc::Select(Vec::new())
    }

    pub fn op(args: Value) -> Self {
        QueryDoc::Op {
            args,
            select: Vec::new(),
        }
    }

    /// Adds a leaf field to this node's selection.
    pub fn field(self, name: &str) -> Self {
        self.child(name, QueryDoc::Field)
    }

    /// Adds several leaf fields at once.
    pub fn fields(mut self, names: &[&str]) -> Self {
        for name in names {
            self = self.field(name);
        }
        self
    }

    /// Adds a nested child node. Calling this on a `Field` promotes it to a
    /// `Select`, so builder chains never panic.
    pub fn child(self, name: &str, node: QueryDoc) -> Self {
        match self {
            QueryDoc::Field => QueryDoc::Select(vec![(name.to_string(), node)]),
            QueryDoc::Select(mut entries) => {
                entries.push((name.to_string(), node));
                QueryDoc::Select(entries)
            }
            QueryDoc::Op { args, mut select } => {
                select.push((name.to_string(), node));
                QueryDoc::Op { args, select }
            }
        }
    }

    /// Serializes this document and wraps it in the envelope the CRM expects:
    /// `{"query": {"$": {"grantKey": ...}, ...document}}`.
    pub fn into_wire(self, grant_key: &str) -> Value {
        let mut query = match serde_json::to_value(&self) {
            Ok(Value::Object(map)) => map,
            // Field at the top level is degenerate but still an object.
            _ => serde_json::Map::new(),
        };
        query.insert(
            "$".to_string(),
            serde_json::json!({ "grantKey": grant_key }),
        );
        Value::Object(serde_json::Map::from_iter([(
            "query".to_string(),
            Value::Object(query),
        )]))
    }
}

impl Serialize for QueryDoc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueryDoc::Field => serializer.serialize_map(Some(0))?.end(),
            QueryDoc::Select(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, node) in entries {
                    map.serialize_entry(name, node)?;
                }
                map.end()
            }
            QueryDoc::Op { args, select } => {
                let mut map = serializer.serialize_map(Some(select.len() + 1))?;
                map.serialize_entry("$", args)?;
                for (name, node) in select {
                    map.serialize_entry(name, node)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_serializes_to_empty_object() {
        assert_eq!(serde_json::to_value(QueryDoc::Field).unwrap(), json!({}));
    }

    #[test]
    fn op_puts_arguments_under_dollar_key() {
        let doc = QueryDoc::select().child(
            "createAccount",
            QueryDoc::op(json!({ "organizationId": "org1", "type": "customer" }))
                .child("createdAccount", QueryDoc::select().fields(&["id", "name"])),
        );

        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "createAccount": {
                    "$": { "organizationId": "org1", "type": "customer" },
                    "createdAccount": { "id": {}, "name": {} }
                }
            })
        );
    }

    #[test]
    fn wire_envelope_carries_grant_key() {
        let doc = QueryDoc::select().child(
            "account",
            QueryDoc::op(json!({ "id": "acc1" })).field("name"),
        );

        assert_eq!(
            doc.into_wire("gk1"),
            json!({
                "query": {
                    "$": { "grantKey": "gk1" },
                    "account": { "$": { "id": "acc1" }, "name": {} }
                }
            })
        );
    }
}
