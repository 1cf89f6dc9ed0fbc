//! Filter tree types sent to the Autotask query endpoints.
//!
//! A filter is either a single [`QueryFilter`] condition or a
//! [`FilterGroup`] combining nested filters with `and`/`or`. Both
//! serialize directly into the JSON shape the API expects.

use serde::{Deserialize, Serialize};

/// Comparison operator of a single condition.
///
/// Serialized names match the Autotask REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryOperator {
    /// Exact match (`=`).
    #[serde(rename = "eq")]
    Equals,
    /// Not equal (`!=`).
    #[serde(rename = "noteq")]
    NotEquals,
    /// String prefix match.
    #[serde(rename = "beginsWith")]
    BeginsWith,
    /// String suffix match.
    #[serde(rename = "endsWith")]
    EndsWith,
    /// Substring match.
    #[serde(rename = "contains")]
    Contains,
    /// Negated substring match.
    #[serde(rename = "notContains")]
    NotContains,
    /// Strictly greater (`>`).
    #[serde(rename = "gt")]
    GreaterThan,
    /// Strictly less (`<`).
    #[serde(rename = "lt")]
    LessThan,
    /// Greater or equal (`>=`).
    #[serde(rename = "gte")]
    GreaterOrEqual,
    /// Less or equal (`<=`).
    #[serde(rename = "lte")]
    LessOrEqual,
    /// Membership in a list of values.
    #[serde(rename = "in")]
    In,
    /// Non-membership in a list of values.
    #[serde(rename = "notIn")]
    NotIn,
    /// Field has no value.
    #[serde(rename = "isNull")]
    IsNull,
    /// Field has a value.
    #[serde(rename = "isNotNull")]
    IsNotNull,
}

impl QueryOperator {
    /// Returns true for operators that compare text and take a bare string value.
    pub fn is_text_match(self) -> bool {
        matches!(
            self,
            QueryOperator::Contains
                | QueryOperator::NotContains
                | QueryOperator::BeginsWith
                | QueryOperator::EndsWith
        )
    }

    /// Returns true for operators that take no value at all.
    pub fn is_unary(self) -> bool {
        matches!(self, QueryOperator::IsNull | QueryOperator::IsNotNull)
    }
}

/// Boolean connective of a [`FilterGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    /// All items must match.
    And,
    /// At least one item must match.
    Or,
}

/// Literal value of a condition.
///
/// The variant is inferred from the literal text when parsing: `true` and
/// `false` become [`FilterValue::Bool`], numbers become `Int` or `Float`
/// depending on whether a decimal point is present, anything else stays a
/// `String` exactly as written (quotes included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Floating-point literal.
    Float(f64),
    /// Any other text.
    String(String),
    /// Value list for `in` / `notIn`.
    List(Vec<FilterValue>),
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(i64::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// A single `field op value` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Entity field name, exactly as written by the caller.
    pub field: String,

    /// Comparison operator.
    #[serde(rename = "op")]
    pub operator: QueryOperator,

    /// Compared value; absent for `isNull` / `isNotNull`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl QueryFilter {
    /// Creates a condition comparing `field` against `value`.
    pub fn new(
        field: impl Into<String>,
        operator: QueryOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// Creates a value-less condition such as `isNull`.
    pub fn unary(field: impl Into<String>, operator: QueryOperator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
        }
    }
}

/// A boolean combination of filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    /// How the items combine.
    #[serde(rename = "op")]
    pub operator: LogicalOperator,

    /// Conditions or nested groups, in the order written.
    pub items: Vec<Filter>,
}

impl FilterGroup {
    /// Creates an `and` group.
    pub fn and(items: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            operator: LogicalOperator::And,
            items: items.into_iter().collect(),
        }
    }

    /// Creates an `or` group.
    pub fn or(items: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            operator: LogicalOperator::Or,
            items: items.into_iter().collect(),
        }
    }

    /// Number of direct items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the group has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A parsed or hand-built filter: one condition or a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    /// A group; listed first so `{op, items}` objects deserialize as groups.
    Group(FilterGroup),
    /// A single condition.
    Condition(QueryFilter),
}

impl Filter {
    /// Returns the condition if this is a leaf.
    pub fn as_condition(&self) -> Option<&QueryFilter> {
        match self {
            Filter::Condition(condition) => Some(condition),
            Filter::Group(_) => None,
        }
    }

    /// Returns the group if this is a combinator.
    pub fn as_group(&self) -> Option<&FilterGroup> {
        match self {
            Filter::Group(group) => Some(group),
            Filter::Condition(_) => None,
        }
    }
}

impl From<QueryFilter> for Filter {
    fn from(condition: QueryFilter) -> Self {
        Filter::Condition(condition)
    }
}

impl From<FilterGroup> for Filter {
    fn from(group: FilterGroup) -> Self {
        Filter::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_serializes_with_op_key() {
        let filter = Filter::from(QueryFilter::new("Status", QueryOperator::NotEquals, 5));
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value, json!({"field": "Status", "op": "noteq", "value": 5}));
    }

    #[test]
    fn test_unary_condition_omits_value() {
        let filter = QueryFilter::unary("ContactID", QueryOperator::IsNull);
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value, json!({"field": "ContactID", "op": "isNull"}));
    }

    #[test]
    fn test_group_serializes_nested_items() {
        let group = FilterGroup::and([
            QueryFilter::new("Status", QueryOperator::NotEquals, 5).into(),
            FilterGroup::or([
                QueryFilter::new("Priority", QueryOperator::Equals, 1).into(),
                QueryFilter::new("Priority", QueryOperator::Equals, 2).into(),
            ])
            .into(),
        ]);
        let value = serde_json::to_value(Filter::from(group)).unwrap();
        assert_eq!(value["op"], "and");
        assert_eq!(value["items"][1]["op"], "or");
        assert_eq!(value["items"][1]["items"][0]["field"], "Priority");
    }

    #[test]
    fn test_filter_deserializes_group_and_condition() {
        let filter: Filter = serde_json::from_value(json!({
            "op": "or",
            "items": [{"field": "IsActive", "op": "eq", "value": true}]
        }))
        .unwrap();
        let group = filter.as_group().unwrap();
        assert_eq!(group.operator, LogicalOperator::Or);
        assert_eq!(
            group.items[0].as_condition().unwrap().value,
            Some(FilterValue::Bool(true))
        );
    }

    #[test]
    fn test_list_value_from_vec() {
        let value = FilterValue::from(vec![1, 2, 3]);
        assert_eq!(serde_json::to_value(&value).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_operator_classes() {
        assert!(QueryOperator::Contains.is_text_match());
        assert!(!QueryOperator::Equals.is_text_match());
        assert!(QueryOperator::IsNotNull.is_unary());
        assert!(!QueryOperator::In.is_unary());
    }
}
