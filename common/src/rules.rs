//! 字段映射规则
//!
//! 规则文件结构: `{ "field_mappings": [ MappingRule, ... ] }`
//!
//! 每条规则除 `mappings` 以外的属性（如 人员身份、编制）都会原样写入
//! 该规则产生的每一行；`mappings` 为有序的字段映射列表。

use crate::error::{Error, Result};
use crate::types::CellValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// 合计计算的关键字
pub const SUM_CALCULATION: &str = "sum";

/// 复杂映射的计算方式
#[derive(Debug, Clone, PartialEq)]
pub enum Calculation {
    /// 数值求和
    Sum,
    /// 以源字段名为变量的四则运算表达式
    Expression(String),
    /// 非字符串的计算定义，计算结果为空
    Unsupported(Value),
}

impl Calculation {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Calculation::Sum,
            Some(Value::String(s)) if s.trim() == SUM_CALCULATION => Calculation::Sum,
            Some(Value::String(s)) => Calculation::Expression(s.clone()),
            Some(other) => Calculation::Unsupported(other.clone()),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Calculation::Sum => Value::String(SUM_CALCULATION.to_string()),
            Calculation::Expression(expr) => Value::String(expr.clone()),
            Calculation::Unsupported(v) => v.clone(),
        }
    }
}

impl std::fmt::Display for Calculation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Calculation::Sum => write!(f, "{}", SUM_CALCULATION),
            Calculation::Expression(expr) => write!(f, "{}", expr),
            Calculation::Unsupported(v) => write!(f, "{}", v),
        }
    }
}

/// 字段映射
///
/// `source_field` 与 `source_fields` 必须且只能出现一个，其他形状保留为
/// `Unrecognized`，只产生警告。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldMapping {
    /// 一对一复制
    Simple {
        source_field: String,
        target_field: String,
    },
    /// 多对一计算
    Complex {
        source_fields: Vec<String>,
        target_field: String,
        calculation: Calculation,
    },
    Unrecognized(Value),
}

impl FieldMapping {
    pub fn target_field(&self) -> Option<&str> {
        match self {
            FieldMapping::Simple { target_field, .. } | FieldMapping::Complex { target_field, .. } => {
                Some(target_field)
            }
            FieldMapping::Unrecognized(v) => v.get("target_field").and_then(Value::as_str),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, FieldMapping::Complex { .. })
    }
}

impl From<Value> for FieldMapping {
    fn from(value: Value) -> Self {
        let target = value.get("target_field").and_then(Value::as_str);
        let single = value.get("source_field");
        let multiple = value.get("source_fields");

        match (target, single, multiple) {
            (Some(target), Some(Value::String(source)), None) => FieldMapping::Simple {
                source_field: source.clone(),
                target_field: target.to_string(),
            },
            (Some(target), None, Some(Value::Array(items))) => {
                let sources: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect();
                match sources {
                    Some(source_fields) => FieldMapping::Complex {
                        source_fields,
                        target_field: target.to_string(),
                        calculation: Calculation::from_value(value.get("calculation")),
                    },
                    None => FieldMapping::Unrecognized(value),
                }
            }
            _ => FieldMapping::Unrecognized(value),
        }
    }
}

impl From<FieldMapping> for Value {
    fn from(mapping: FieldMapping) -> Self {
        match mapping {
            FieldMapping::Simple {
                source_field,
                target_field,
            } => serde_json::json!({
                "source_field": source_field,
                "target_field": target_field,
            }),
            FieldMapping::Complex {
                source_fields,
                target_field,
                calculation,
            } => serde_json::json!({
                "source_fields": source_fields,
                "target_field": target_field,
                "calculation": calculation.to_value(),
            }),
            FieldMapping::Unrecognized(v) => v,
        }
    }
}

/// 一条映射规则
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    /// 规则级属性（身份值等），原样写入结果行
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
}

impl MappingRule {
    /// 规则在 `identity_key` 下的身份值（仅字符串参与匹配）
    pub fn identity(&self, identity_key: &str) -> Option<&str> {
        self.attributes.get(identity_key).and_then(Value::as_str)
    }

    /// 规则级静态字段
    pub fn static_fields(&self) -> impl Iterator<Item = (&str, CellValue)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), json_to_cell(value)))
    }

    pub fn complex_mappings(&self) -> impl Iterator<Item = &FieldMapping> {
        self.mappings.iter().filter(|m| m.is_complex())
    }
}

/// JSON 标量转单元格值
fn json_to_cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::String(s) => CellValue::Text(s.clone()),
        Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
        Value::Bool(b) => CellValue::Text(b.to_string()),
        other => CellValue::Text(other.to_string()),
    }
}

/// 规则集（映射规则文件）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub field_mappings: Vec<MappingRule>,
}

impl RuleSet {
    /// JSON 文件读取
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON 文本读取；顶层必须是含 `field_mappings` 数组的对象
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json)?;
        let Some(object) = document.as_object() else {
            return Err(Error::InvalidRuleset("顶层必须是 JSON 对象".into()));
        };
        match object.get("field_mappings") {
            Some(Value::Array(_)) => {}
            Some(_) => return Err(Error::InvalidRuleset("'field_mappings' 必须是列表".into())),
            None => return Err(Error::InvalidRuleset("缺少 'field_mappings' 列表".into())),
        }
        serde_json::from_value(document)
            .map_err(|e| Error::InvalidRuleset(format!("规则结构错误: {}", e)))
    }

    pub fn store(&self) -> RuleStore<'_> {
        RuleStore::new(&self.field_mappings)
    }

    /// 所有规则定义的目标字段
    pub fn target_fields(&self) -> HashSet<&str> {
        self.field_mappings
            .iter()
            .flat_map(|r| r.mappings.iter())
            .filter_map(FieldMapping::target_field)
            .collect()
    }

    /// 去掉源字段只存在于扣款表（源表中不存在）的简单映射
    ///
    /// 返回过滤后的规则集与被去掉的映射数。
    pub fn prune_deduction_only_sources(
        &self,
        source_fields: &HashSet<String>,
        deduction_fields: &HashSet<String>,
    ) -> (RuleSet, usize) {
        let mut removed = 0;
        let field_mappings = self
            .field_mappings
            .iter()
            .map(|rule| {
                let mappings = rule
                    .mappings
                    .iter()
                    .filter(|mapping| match mapping {
                        FieldMapping::Simple { source_field, .. }
                            if deduction_fields.contains(source_field)
                                && !source_fields.contains(source_field) =>
                        {
                            removed += 1;
                            false
                        }
                        _ => true,
                    })
                    .cloned()
                    .collect();
                MappingRule {
                    attributes: rule.attributes.clone(),
                    mappings,
                }
            })
            .collect();
        (RuleSet { field_mappings }, removed)
    }
}

/// 规则查找
pub struct RuleStore<'a> {
    rules: &'a [MappingRule],
}

impl<'a> RuleStore<'a> {
    pub fn new(rules: &'a [MappingRule]) -> Self {
        Self { rules }
    }

    /// 返回第一条 `rule[identity_key] == identity_value` 的规则
    pub fn find(&self, identity_value: &str, identity_key: &str) -> Option<&'a MappingRule> {
        self.rules
            .iter()
            .find(|rule| rule.identity(identity_key) == Some(identity_value))
    }

    /// 按身份值建立索引，匹配语义与 `find` 相同（先出现者优先）
    pub fn index(&self, identity_key: &str) -> RuleIndex<'a> {
        let mut by_identity = HashMap::new();
        for rule in self.rules {
            if let Some(value) = rule.identity(identity_key) {
                by_identity.entry(value.to_string()).or_insert(rule);
            }
        }
        RuleIndex { by_identity }
    }
}

/// 身份值 → 规则 索引
pub struct RuleIndex<'a> {
    by_identity: HashMap<String, &'a MappingRule>,
}

impl<'a> RuleIndex<'a> {
    pub fn get(&self, identity_value: &str) -> Option<&'a MappingRule> {
        self.by_identity.get(identity_value).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES_JSON: &str = r#"{
        "field_mappings": [
            {
                "人员身份": "在编",
                "编制": "行政",
                "mappings": [
                    { "source_field": "基本工资", "target_field": "岗位工资" },
                    { "source_fields": ["绩效A", "绩效B"], "target_field": "绩效合计", "calculation": "sum" },
                    { "source_fields": ["基本工资", "绩效A"], "target_field": "应发工资", "calculation": "基本工资 + 绩效A * 2" }
                ]
            },
            { "人员身份": "聘用", "mappings": [ { "source_field": "工资", "target_field": "应发工资" } ] },
            { "人员身份": "在编", "编制": "事业", "mappings": [] }
        ]
    }"#;

    #[test]
    fn test_parse_mapping_shapes() {
        let rules = RuleSet::from_json(RULES_JSON).unwrap();
        let mappings = &rules.field_mappings[0].mappings;

        assert!(matches!(&mappings[0], FieldMapping::Simple { source_field, .. } if source_field == "基本工资"));
        assert!(matches!(&mappings[1], FieldMapping::Complex { calculation: Calculation::Sum, .. }));
        assert!(matches!(&mappings[2], FieldMapping::Complex { calculation: Calculation::Expression(_), .. }));
    }

    #[test]
    fn test_calculation_defaults_to_sum() {
        let mapping: FieldMapping =
            serde_json::from_str(r#"{"source_fields": ["a", "b"], "target_field": "c"}"#).unwrap();
        assert!(matches!(mapping, FieldMapping::Complex { calculation: Calculation::Sum, .. }));
    }

    #[test]
    fn test_unknown_shape_is_unrecognized() {
        let both: FieldMapping = serde_json::from_str(
            r#"{"source_field": "a", "source_fields": ["b"], "target_field": "c"}"#,
        )
        .unwrap();
        let no_target: FieldMapping = serde_json::from_str(r#"{"source_field": "a"}"#).unwrap();

        assert!(matches!(both, FieldMapping::Unrecognized(_)));
        assert!(matches!(no_target, FieldMapping::Unrecognized(_)));
    }

    #[test]
    fn test_missing_field_mappings_rejected() {
        assert!(matches!(
            RuleSet::from_json(r#"{"rules": []}"#),
            Err(Error::InvalidRuleset(_))
        ));
        assert!(matches!(
            RuleSet::from_json(r#"{"field_mappings": {}}"#),
            Err(Error::InvalidRuleset(_))
        ));
        assert!(matches!(RuleSet::from_json("[1, 2"), Err(Error::Json(_))));
    }

    #[test]
    fn test_find_first_match_wins() {
        let rules = RuleSet::from_json(RULES_JSON).unwrap();
        let store = rules.store();

        let found = store.find("在编", "人员身份").unwrap();
        assert_eq!(found.attributes.get("编制").and_then(Value::as_str), Some("行政"));
        assert!(store.find("临时", "人员身份").is_none());
        assert!(store.find("在编", "岗位类别").is_none());
    }

    #[test]
    fn test_index_matches_find() {
        let rules = RuleSet::from_json(RULES_JSON).unwrap();
        let store = rules.store();
        let index = store.index("人员身份");

        for value in ["在编", "聘用", "临时"] {
            assert_eq!(index.get(value), store.find(value, "人员身份"));
        }
    }

    #[test]
    fn test_static_fields_exclude_mappings() {
        let rules = RuleSet::from_json(RULES_JSON).unwrap();
        let fields: Vec<(&str, CellValue)> = rules.field_mappings[0].static_fields().collect();

        assert_eq!(
            fields,
            vec![("人员身份", CellValue::from("在编")), ("编制", CellValue::from("行政"))]
        );
    }

    #[test]
    fn test_prune_deduction_only_sources() {
        let rules = RuleSet::from_json(
            r#"{"field_mappings": [{"人员身份": "在编", "mappings": [
                {"source_field": "基本工资", "target_field": "基本工资"},
                {"source_field": "公积金", "target_field": "公积金"},
                {"source_fields": ["公积金", "医保"], "target_field": "扣发合计"}
            ]}]}"#,
        )
        .unwrap();
        let sources: HashSet<String> = ["基本工资".to_string()].into_iter().collect();
        let deductions: HashSet<String> =
            ["公积金".to_string(), "医保".to_string()].into_iter().collect();

        let (pruned, removed) = rules.prune_deduction_only_sources(&sources, &deductions);
        assert_eq!(removed, 1);
        assert_eq!(pruned.field_mappings[0].mappings.len(), 2);
        assert!(pruned.field_mappings[0].mappings[1].is_complex());
    }

    #[test]
    fn test_roundtrip_preserves_shape() {
        let rules = RuleSet::from_json(RULES_JSON).unwrap();
        let json = serde_json::to_string_pretty(&rules).unwrap();
        assert_eq!(RuleSet::from_json(&json).unwrap(), rules);
    }
}
