//! Equivalence between the entry a resource projects to and the entry read
//! back from the remote store.
//!
//! The store echoes entries back with server-assigned fields filled in, some
//! collections re-sorted and some defaults spelled out. Each kind describes
//! how to normalize those differences away with a [`Comparison`]; both
//! entries are normalized in their serialized form and then compared exactly,
//! so anything not covered by a rule counts as a difference.

use serde::Serialize;
use serde_json::Value;

/// Top-level fields assigned or resolved by the remote store.
pub const SERVER_FIELDS: &[&str] = &["Partition", "Namespace", "Meta", "CreateIndex", "ModifyIndex"];

/// Describes how a kind's entries are normalized before comparison.
///
/// Field paths are dotted field names of the serialized entry, where `name[]`
/// visits every element of an array and `*` visits every value of a map.
#[derive(Copy, Clone, Debug)]
pub struct Comparison {
    /// Top-level fields excluded from comparison.
    pub ignore: &'static [&'static str],

    /// Fields where the literal default tenancy name means the same as empty.
    pub default_is_empty: &'static [&'static str],

    /// Optional structures that the store echoes back as a zero value rather
    /// than omitting.
    pub zero_is_absent: &'static [&'static str],

    /// Collections the store reorders.
    pub unordered: &'static [Unordered],
}

/// A collection compared as a set once the listed store-derived fields are
/// removed from each element.
#[derive(Copy, Clone, Debug)]
pub struct Unordered {
    pub path: &'static str,
    pub strip: &'static [&'static str],
}

// === impl Comparison ===

impl Comparison {
    /// Ignores only the server-assigned fields.
    pub const SERVER_ASSIGNED: Self = Self {
        ignore: SERVER_FIELDS,
        default_is_empty: &[],
        zero_is_absent: &[],
        unordered: &[],
    };

    /// Compares `expected` with `actual` after normalizing both.
    ///
    /// Entries that cannot be serialized never match.
    pub fn equivalent<T: Serialize>(&self, expected: &T, actual: &T) -> bool {
        let (Ok(mut expected), Ok(mut actual)) =
            (serde_json::to_value(expected), serde_json::to_value(actual))
        else {
            return false;
        };
        self.normalize(&mut expected);
        self.normalize(&mut actual);
        expected == actual
    }

    pub fn normalize(&self, entry: &mut Value) {
        if let Value::Object(fields) = entry {
            for field in self.ignore {
                fields.remove(*field);
            }
        }

        for path in self.default_is_empty {
            visit(entry, path, &mut |v| {
                if v.as_str() == Some(crate::DEFAULT_TENANCY) {
                    *v = Value::String(String::new());
                }
            });
        }

        for path in self.zero_is_absent {
            visit(entry, path, &mut |v| {
                if is_zero(v) {
                    *v = Value::Null;
                }
            });
        }

        for Unordered { path, strip } in self.unordered {
            visit(entry, path, &mut |v| {
                if let Value::Array(items) = v {
                    for item in items.iter_mut() {
                        if let Value::Object(fields) = item {
                            for field in *strip {
                                fields.remove(*field);
                            }
                        }
                    }
                    items.sort_by_cached_key(|item| item.to_string());
                }
            });
        }
    }
}

fn visit(value: &mut Value, path: &str, f: &mut dyn FnMut(&mut Value)) {
    let segments = path.split('.').collect::<Vec<_>>();
    visit_segments(value, &segments, f);
}

fn visit_segments(value: &mut Value, segments: &[&str], f: &mut dyn FnMut(&mut Value)) {
    let Some((first, rest)) = segments.split_first() else {
        f(value);
        return;
    };

    if *first == "*" {
        if let Value::Object(fields) = value {
            for v in fields.values_mut() {
                visit_segments(v, rest, f);
            }
        }
        return;
    }

    let (field, each) = match first.strip_suffix("[]") {
        Some(field) => (field, true),
        None => (*first, false),
    };
    let Some(child) = value.as_object_mut().and_then(|fields| fields.get_mut(field)) else {
        return;
    };
    if !each {
        visit_segments(child, rest, f);
    } else if let Value::Array(items) = child {
        for item in items.iter_mut() {
            visit_segments(item, rest, f);
        }
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.values().all(is_zero),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use std::collections::BTreeMap;

    #[derive(Clone, Debug, Default, Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Entry {
        name: String,
        namespace: String,
        partition: String,
        meta: BTreeMap<String, String>,
        create_index: u64,
        modify_index: u64,
        proxy: Option<Proxy>,
        splits: Vec<Split>,
        failover: BTreeMap<String, Failover>,
    }

    #[derive(Clone, Debug, Default, Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Proxy {
        port: u16,
        direct: bool,
    }

    #[derive(Clone, Debug, Default, Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Split {
        weight: f32,
        partition: String,
        precedence: u32,
    }

    #[derive(Clone, Debug, Default, Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Failover {
        namespace: String,
    }

    const CMP: Comparison = Comparison {
        ignore: SERVER_FIELDS,
        default_is_empty: &["Splits[].Partition", "Failover.*.Namespace"],
        zero_is_absent: &["Proxy"],
        unordered: &[],
    };

    fn entry() -> Entry {
        Entry {
            name: "foo".to_string(),
            splits: vec![
                Split {
                    weight: 50.0,
                    ..Split::default()
                },
                Split {
                    weight: 50.0,
                    partition: "ap1".to_string(),
                    ..Split::default()
                },
            ],
            ..Entry::default()
        }
    }

    #[test]
    fn ignores_server_fields() {
        let expected = entry();
        let actual = Entry {
            namespace: "ns".to_string(),
            partition: "ap".to_string(),
            meta: btreemap! { "external-source".to_string() => "kubernetes".to_string() },
            create_index: 1,
            modify_index: 2,
            ..entry()
        };
        assert!(CMP.equivalent(&expected, &actual));
    }

    #[test]
    fn detects_differences() {
        let actual = Entry {
            name: "bar".to_string(),
            ..entry()
        };
        assert!(!CMP.equivalent(&entry(), &actual));
    }

    #[test]
    fn default_partition_is_empty_only_where_configured() {
        let mut actual = entry();
        actual.splits[0].partition = "default".to_string();
        assert!(CMP.equivalent(&entry(), &actual));

        actual.splits[1].partition = "default".to_string();
        assert!(!CMP.equivalent(&entry(), &actual));
    }

    #[test]
    fn default_namespace_in_map_values() {
        let expected = Entry {
            failover: btreemap! { "*".to_string() => Failover::default() },
            ..entry()
        };
        let actual = Entry {
            failover: btreemap! {
                "*".to_string() => Failover { namespace: "default".to_string() },
            },
            ..entry()
        };
        assert!(CMP.equivalent(&expected, &actual));
    }

    #[test]
    fn zero_struct_is_absent() {
        let actual = Entry {
            proxy: Some(Proxy::default()),
            ..entry()
        };
        assert!(CMP.equivalent(&entry(), &actual));

        let actual = Entry {
            proxy: Some(Proxy {
                port: 15001,
                direct: false,
            }),
            ..entry()
        };
        assert!(!CMP.equivalent(&entry(), &actual));
    }

    #[test]
    fn without_zero_rule_structs_must_be_present() {
        let actual = Entry {
            proxy: Some(Proxy::default()),
            ..entry()
        };
        assert!(!Comparison::SERVER_ASSIGNED.equivalent(&entry(), &actual));
    }

    #[test]
    fn unordered_collections_compare_as_sets() {
        const UNORDERED: Comparison = Comparison {
            unordered: &[Unordered {
                path: "Splits",
                strip: &["Precedence"],
            }],
            ..CMP
        };

        let mut actual = entry();
        actual.splits.reverse();
        actual.splits[0].precedence = 9;
        assert!(UNORDERED.equivalent(&entry(), &actual));
        assert!(!CMP.equivalent(&entry(), &actual));
    }
}
