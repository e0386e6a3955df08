//! Path queries over rendered manifest objects
//!
//! Supports the kubectl JSONPath template language as far as image lookups
//! need it: children (`.name`, `['app.kubernetes.io/name']`, `.*`), indexes
//! and slices (`[0]`, `[-1]`, `[*]`, `[1:3]`), recursive descent
//! (`..image`), filters (`[?(@.name=="app")]`) and several `{expressions}`
//! in one template.
//!
//! Missing keys yield no results rather than an error.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CollectionError, Result};

#[derive(Parser)]
#[grammar = "jsonpath.pest"]
struct JsonPathParser;

/// One step of a path query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `.name` or `['name']`
    Child(String),
    /// `.*`
    AnyChild,
    /// `[n]`, negative counts from the end
    Index(i64),
    /// `[*]`
    AnyIndex,
    /// `[start:end:step]`, Python slice semantics with a positive step
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: i64,
    },
    /// `..name`, or `..*` when `None`
    Recursive(Option<String>),
    /// `[?(...)]` over array elements
    Filter(Filter),
}

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "==" => Comparator::Eq,
            "!=" => Comparator::Ne,
            "<" => Comparator::Lt,
            "<=" => Comparator::Le,
            ">" => Comparator::Gt,
            ">=" => Comparator::Ge,
            _ => return None,
        })
    }

    /// Numbers and strings order; other values only compare for equality
    fn compare(self, value: &JsonValue, literal: &JsonValue) -> bool {
        let ordering = match (value, literal) {
            (JsonValue::Number(a), JsonValue::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
            (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
            (a, b) => {
                return match self {
                    Comparator::Eq => a == b,
                    Comparator::Ne => a != b,
                    _ => false,
                };
            }
        };

        match (self, ordering) {
            (Comparator::Ne, None) => true,
            (_, None) => false,
            (Comparator::Eq, Some(o)) => o == Ordering::Equal,
            (Comparator::Ne, Some(o)) => o != Ordering::Equal,
            (Comparator::Lt, Some(o)) => o == Ordering::Less,
            (Comparator::Le, Some(o)) => o != Ordering::Greater,
            (Comparator::Gt, Some(o)) => o == Ordering::Greater,
            (Comparator::Ge, Some(o)) => o != Ordering::Less,
        }
    }
}

/// `[?(@.a.b == literal)]`, or an existence test without a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Keys below `@`
    pub path: Vec<String>,
    pub condition: Option<(Comparator, JsonValue)>,
}

impl Filter {
    fn matches(&self, item: &JsonValue) -> bool {
        let found = self
            .path
            .iter()
            .try_fold(item, |node, key| node.get(key));

        match (&self.condition, found) {
            (None, found) => found.is_some_and(|v| !v.is_null()),
            (Some(_), None) => false,
            (Some((op, literal)), Some(value)) => op.compare(value, literal),
        }
    }
}

/// A compiled path query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    expressions: Vec<Vec<Segment>>,
}

impl JsonPath {
    pub fn parse(query: &str) -> Result<Self> {
        let invalid = |message: String| CollectionError::InvalidQuery {
            query: query.to_string(),
            message,
        };

        let mut pairs = JsonPathParser::parse(Rule::query, query.trim())
            .map_err(|e| invalid(e.variant.message().to_string()))?;

        let mut expressions = Vec::new();
        if let Some(top) = pairs.next() {
            for pair in top.into_inner() {
                if pair.as_rule() == Rule::path {
                    expressions.push(parse_path(pair).map_err(invalid)?);
                }
            }
        }

        Ok(Self {
            source: query.to_string(),
            expressions,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Segments of each `{expression}`, in template order
    pub fn expressions(&self) -> &[Vec<Segment>] {
        &self.expressions
    }

    /// Evaluate against a value, returning every matched node
    ///
    /// Matches of several expressions are concatenated.
    pub fn evaluate<'a>(&self, value: &'a JsonValue) -> Result<Vec<&'a JsonValue>> {
        let mut matched = Vec::new();

        for segments in &self.expressions {
            let mut current = vec![value];
            for segment in segments {
                let mut next = Vec::new();
                for node in current {
                    self.step(segment, node, &mut next)?;
                }
                current = next;
            }
            matched.extend(current);
        }

        Ok(matched)
    }

    /// Evaluate and print matched scalars, split on spaces
    ///
    /// Mappings, sequences and nulls print nothing.
    pub fn strings(&self, value: &JsonValue) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for node in self.evaluate(value)? {
            let text = match node {
                JsonValue::String(s) => s.clone(),
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => b.to_string(),
                _ => continue,
            };
            out.extend(text.split(' ').filter(|s| !s.is_empty()).map(String::from));
        }
        Ok(out)
    }

    fn step<'a>(
        &self,
        segment: &Segment,
        node: &'a JsonValue,
        out: &mut Vec<&'a JsonValue>,
    ) -> Result<()> {
        match (segment, node) {
            (_, JsonValue::Null) => {}
            (Segment::Recursive(key), node) => descend(node, key.as_deref(), out),
            (Segment::Child(name), JsonValue::Object(map)) => out.extend(map.get(name)),
            (Segment::AnyChild | Segment::AnyIndex, JsonValue::Object(map)) => out.extend(map.values()),
            (Segment::AnyChild | Segment::AnyIndex, JsonValue::Array(items)) => out.extend(items),
            (Segment::Index(index), JsonValue::Array(items)) => {
                let len = items.len() as i64;
                let resolved = if *index < 0 { len + index } else { *index };
                if resolved < 0 || resolved >= len {
                    return Err(self.failed(format!(
                        "array index {} out of bounds (length {})",
                        index, len
                    )));
                }
                out.push(&items[resolved as usize]);
            }
            (Segment::Slice { start, end, step }, JsonValue::Array(items)) => {
                let len = items.len() as i64;
                let clamp = |i: i64| if i < 0 { (len + i).max(0) } else { i.min(len) };
                let from = start.map_or(0, clamp);
                let to = end.map_or(len, clamp);
                if from < to {
                    out.extend(
                        items[from as usize..to as usize]
                            .iter()
                            .step_by(*step as usize),
                    );
                }
            }
            (Segment::Filter(filter), JsonValue::Array(items)) => {
                out.extend(items.iter().filter(|item| filter.matches(item)))
            }
            (Segment::Child(name), other) => {
                return Err(self.failed(format!(
                    "cannot look up '{}' in {}",
                    name,
                    kind_of(other)
                )));
            }
            (segment, other) => {
                return Err(self.failed(format!(
                    "cannot apply {:?} to {}",
                    segment,
                    kind_of(other)
                )));
            }
        }
        Ok(())
    }

    fn failed(&self, message: String) -> CollectionError {
        CollectionError::QueryFailed {
            query: self.source.clone(),
            message,
        }
    }
}

/// Every node below `node` matching `key` (or every node for `None`), depth first
fn descend<'a>(node: &'a JsonValue, key: Option<&str>, out: &mut Vec<&'a JsonValue>) {
    match node {
        JsonValue::Object(map) => {
            match key {
                Some(key) => out.extend(map.get(key)),
                None => out.extend(map.values()),
            }
            for child in map.values() {
                descend(child, key, out);
            }
        }
        JsonValue::Array(items) => {
            if key.is_none() {
                out.extend(items);
            }
            for item in items {
                descend(item, key, out);
            }
        }
        _ => {}
    }
}

fn parse_path(pair: Pair<'_, Rule>) -> std::result::Result<Vec<Segment>, String> {
    pair.into_inner().map(parse_segment).collect()
}

fn parse_segment(pair: Pair<'_, Rule>) -> std::result::Result<Segment, String> {
    Ok(match pair.as_rule() {
        Rule::child => Segment::Child(pair.as_str()[1..].to_string()),
        Rule::any_child => Segment::AnyChild,
        Rule::any_index => Segment::AnyIndex,
        Rule::index => Segment::Index(integer(first_inner(pair)?.as_str())?),
        Rule::quoted_child => Segment::Child(first_inner(pair)?.as_str().to_string()),
        Rule::recursive => {
            let key = first_inner(pair)?;
            match key.as_rule() {
                Rule::wildcard => Segment::Recursive(None),
                _ => Segment::Recursive(Some(key.as_str().to_string())),
            }
        }
        Rule::slice => {
            let (mut start, mut end, mut step) = (None, None, 1);
            for bound in pair.into_inner() {
                let value = integer(bound.as_str())?;
                match bound.as_rule() {
                    Rule::slice_start => start = Some(value),
                    Rule::slice_end => end = Some(value),
                    _ => step = value,
                }
            }
            if step < 1 {
                return Err(format!("slice step must be positive, got {}", step));
            }
            Segment::Slice { start, end, step }
        }
        Rule::filter => Segment::Filter(parse_filter(pair)?),
        other => return Err(format!("unexpected {:?}", other)),
    })
}

fn parse_filter(pair: Pair<'_, Rule>) -> std::result::Result<Filter, String> {
    let mut path = Vec::new();
    let mut comparator = None;
    let mut literal = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::operand => {
                for key in part.into_inner() {
                    match parse_segment(key)? {
                        Segment::Child(name) => path.push(name),
                        other => return Err(format!("unsupported filter operand {:?}", other)),
                    }
                }
            }
            Rule::comparator => comparator = Comparator::parse(part.as_str()),
            Rule::string_literal => {
                literal = Some(JsonValue::String(first_inner(part)?.as_str().to_string()))
            }
            Rule::number => {
                let number = part
                    .as_str()
                    .parse::<serde_json::Number>()
                    .map_err(|e| format!("bad number '{}': {}", part.as_str(), e))?;
                literal = Some(JsonValue::Number(number));
            }
            Rule::boolean => literal = Some(JsonValue::Bool(part.as_str() == "true")),
            Rule::null => literal = Some(JsonValue::Null),
            _ => {}
        }
    }

    let condition = match (comparator, literal) {
        (Some(op), Some(value)) => Some((op, value)),
        (None, None) => None,
        _ => return Err("incomplete filter comparison".to_string()),
    };
    Ok(Filter { path, condition })
}

fn first_inner(pair: Pair<'_, Rule>) -> std::result::Result<Pair<'_, Rule>, String> {
    let text = pair.as_str();
    pair.into_inner()
        .next()
        .ok_or_else(|| format!("empty segment '{}'", text))
}

fn integer(raw: &str) -> std::result::Result<i64, String> {
    raw.parse::<i64>()
        .map_err(|e| format!("bad index '{}': {}", raw, e))
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

impl FromStr for JsonPath {
    type Err = CollectionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment() -> JsonValue {
        json!({
            "kind": "Deployment",
            "metadata": {"labels": {"app.kubernetes.io/name": "web"}},
            "spec": {"template": {"spec": {
                "initContainers": [{"name": "init", "image": "busybox:1.36"}],
                "containers": [
                    {"name": "web", "image": "nginx:1.25"},
                    {"name": "sidecar", "image": "envoy:v1.29"}
                ]
            }}}
        })
    }

    #[test]
    fn test_parse_segments() {
        let path = JsonPath::parse("{.spec.containers[*].image}").unwrap();
        assert_eq!(
            path.expressions()[0],
            [
                Segment::Child("spec".into()),
                Segment::Child("containers".into()),
                Segment::AnyIndex,
                Segment::Child("image".into()),
            ]
        );
    }

    #[test]
    fn test_parse_without_braces_and_quoted() {
        let path: JsonPath = "$.metadata['app.kubernetes.io/name']".parse().unwrap();
        assert_eq!(
            path.expressions()[0],
            [
                Segment::Child("metadata".into()),
                Segment::Child("app.kubernetes.io/name".into()),
            ]
        );
        assert_eq!(JsonPath::parse("{.items[-1]}").unwrap().expressions()[0][1], Segment::Index(-1));
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "",
            "{}",
            "{.spec",
            "spec.containers",
            "{.a[x]}",
            "{.a[0:2:0]}",
            "{.a[?(@.name==)]}",
            "{.a[?(name==\"x\")]}",
        ] {
            assert!(
                matches!(JsonPath::parse(bad), Err(CollectionError::InvalidQuery { .. })),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_wildcard_strings() {
        let obj = deployment();
        let images = JsonPath::parse("{.spec.template.spec.containers[*].image}")
            .unwrap()
            .strings(&obj)
            .unwrap();
        assert_eq!(images, vec!["nginx:1.25", "envoy:v1.29"]);
    }

    #[test]
    fn test_missing_keys_yield_nothing() {
        let obj = deployment();
        let path = JsonPath::parse("{.spec.containers[*].image}").unwrap();
        assert!(path.strings(&obj).unwrap().is_empty());
    }

    #[test]
    fn test_index_and_quoted_child() {
        let obj = deployment();
        let first = JsonPath::parse("{.spec.template.spec.containers[0].name}").unwrap();
        assert_eq!(first.strings(&obj).unwrap(), vec!["web"]);

        let last = JsonPath::parse("{.spec.template.spec.containers[-1].name}").unwrap();
        assert_eq!(last.strings(&obj).unwrap(), vec!["sidecar"]);

        let label = JsonPath::parse("{.metadata.labels['app.kubernetes.io/name']}").unwrap();
        assert_eq!(label.strings(&obj).unwrap(), vec!["web"]);
    }

    #[test]
    fn test_out_of_bounds_fails() {
        let obj = deployment();
        let path = JsonPath::parse("{.spec.template.spec.containers[5].image}").unwrap();
        assert!(matches!(path.evaluate(&obj), Err(CollectionError::QueryFailed { .. })));
    }

    #[test]
    fn test_lookup_on_scalar_fails() {
        let obj = json!({"kind": "ConfigMap"});
        let path = JsonPath::parse("{.kind.name}").unwrap();
        assert!(matches!(path.evaluate(&obj), Err(CollectionError::QueryFailed { .. })));
    }

    #[test]
    fn test_values_split_on_spaces() {
        let obj = json!({"data": {"images": "a:1 b:2", "count": 3}});
        let path = JsonPath::parse("{.data.*}").unwrap();
        let mut found = path.strings(&obj).unwrap();
        found.sort();
        assert_eq!(found, vec!["3", "a:1", "b:2"]);
    }

    fn cron_job() -> JsonValue {
        json!({
            "kind": "CronJob",
            "metadata": {"name": "backup"},
            "spec": {"jobTemplate": {"spec": {"template": {"spec": {
                "initContainers": [{"name": "prepare", "image": "alpine:3.19"}],
                "containers": [
                    {"name": "app", "image": "restic/restic:0.16.4", "ports": [{"containerPort": 8080}]},
                    {"name": "metrics", "image": "prom/statsd-exporter:v0.26.0"}
                ]
            }}}}}
        })
    }

    #[test]
    fn test_parse_new_forms() {
        let path = JsonPath::parse("{..image}{.items[1:3]}{.items[?(@.name=='app')]}").unwrap();
        assert_eq!(path.expressions().len(), 3);
        assert_eq!(path.expressions()[0], [Segment::Recursive(Some("image".into()))]);
        assert_eq!(
            path.expressions()[1][1],
            Segment::Slice {
                start: Some(1),
                end: Some(3),
                step: 1
            }
        );
        assert_eq!(
            path.expressions()[2][1],
            Segment::Filter(Filter {
                path: vec!["name".into()],
                condition: Some((Comparator::Eq, json!("app"))),
            })
        );
    }

    #[test]
    fn test_recursive_descent() {
        let mut images = JsonPath::parse("{..image}").unwrap().strings(&cron_job()).unwrap();
        images.sort();
        assert_eq!(
            images,
            vec!["alpine:3.19", "prom/statsd-exporter:v0.26.0", "restic/restic:0.16.4"]
        );

        let ports = JsonPath::parse("{..containerPort}").unwrap().strings(&cron_job()).unwrap();
        assert_eq!(ports, vec!["8080"]);
    }

    #[test]
    fn test_recursive_wildcard() {
        let obj = json!({"a": {"b": "x"}, "c": ["y"]});
        let mut found = JsonPath::parse("{..*}").unwrap().strings(&obj).unwrap();
        found.sort();
        assert_eq!(found, vec!["x", "y"]);
    }

    #[test]
    fn test_filter_equality() {
        let path = JsonPath::parse(
            r#"{.spec.jobTemplate.spec.template.spec.containers[?(@.name=="app")].image}"#,
        )
        .unwrap();
        assert_eq!(path.strings(&cron_job()).unwrap(), vec!["restic/restic:0.16.4"]);

        let other = JsonPath::parse(
            "{.spec.jobTemplate.spec.template.spec.containers[?(@.name != 'app')].image}",
        )
        .unwrap();
        assert_eq!(other.strings(&cron_job()).unwrap(), vec!["prom/statsd-exporter:v0.26.0"]);
    }

    #[test]
    fn test_filter_existence_and_numbers() {
        let obj = cron_job();
        let exposed = JsonPath::parse(
            "{.spec.jobTemplate.spec.template.spec.containers[?(@.ports)].name}",
        )
        .unwrap();
        assert_eq!(exposed.strings(&obj).unwrap(), vec!["app"]);

        let items = json!({"items": [{"n": 1, "v": "a"}, {"n": 5, "v": "b"}, {"n": 10, "v": "c"}]});
        let above = JsonPath::parse("{.items[?(@.n >= 5)].v}").unwrap();
        assert_eq!(above.strings(&items).unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn test_slices() {
        let obj = json!({"items": ["a", "b", "c", "d", "e"]});
        let slice = |query: &str| JsonPath::parse(query).unwrap().strings(&obj).unwrap();

        assert_eq!(slice("{.items[0:2]}"), vec!["a", "b"]);
        assert_eq!(slice("{.items[3:]}"), vec!["d", "e"]);
        assert_eq!(slice("{.items[:1]}"), vec!["a"]);
        assert_eq!(slice("{.items[-2:]}"), vec!["d", "e"]);
        assert_eq!(slice("{.items[::2]}"), vec!["a", "c", "e"]);
        assert_eq!(slice("{.items[1:100]}"), vec!["b", "c", "d", "e"]);
        assert!(slice("{.items[4:1]}").is_empty());
    }

    #[test]
    fn test_template_with_several_expressions() {
        let obj = deployment();
        let path = JsonPath::parse(
            "{.spec.template.spec.initContainers[*].image} {.spec.template.spec.containers[0].image}",
        )
        .unwrap();
        assert_eq!(path.strings(&obj).unwrap(), vec!["busybox:1.36", "nginx:1.25"]);
    }

    #[test]
    fn test_filter_on_object_fails() {
        let obj = deployment();
        let path = JsonPath::parse("{.metadata[?(@.name)]}").unwrap();
        assert!(matches!(path.evaluate(&obj), Err(CollectionError::QueryFailed { .. })));
    }
}
