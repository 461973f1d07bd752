// src/insight.rs
//! Rule-based commentary over a ranked trend list.
//!
//! One insight per configured category that has at least one ranked keyword
//! (citing up to three, highest score first), in rule order, then a single
//! seasonal insight if any keyword matches the seasonal pattern.

use regex::{Regex, RegexBuilder};

use crate::category::Category;
use crate::model::{AggregatedTrend, Insight};

pub const DEFAULT_SEASONAL_PATTERN: &str = "new year|新年|2026";
const MAX_EXAMPLES: usize = 3;

#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub category: Category,
    pub title: &'static str,
    /// `{examples}` is replaced with the cited keywords.
    pub context: &'static str,
    pub suggestion: &'static str,
}

pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::TechAi,
        title: "AI/Tech 垂直工具",
        context: "检测到 {examples} 等科技热点。",
        suggestion: "可以开发针对这些特定 AI 模型或硬件的中文教程、提示词库或轻量级 API 包装工具。",
    },
    CategoryRule {
        category: Category::Sports,
        title: "垂直赛事社交/数据看板",
        context: "体育赛事 {examples} 流量巨大。",
        suggestion: "考虑建立特定赛事的即时聊天室、比分预测工具或基于动态岛的实时比分提醒 APP。",
    },
    CategoryRule {
        category: Category::Finance,
        title: "金融行情预警/内容站",
        context: "市场关注 {examples}。",
        suggestion: "开发针对波动资产的极简价格预警工具，或编写深度行业解析报告以捕获 SEO 流量。",
    },
    CategoryRule {
        category: Category::Entertainment,
        title: "影视娱乐社群/追更指南",
        context: "娱乐话题 {examples} 热度上升。",
        suggestion: "可以做片单整理、上映与开播追踪或粉丝讨论社区，承接这些热点流量。",
    },
];

const SEASONAL_TITLE: &str = "季节性效率/计划应用";
const SEASONAL_SUGGESTION: &str =
    "开发带有社交对赌性质的“新年目标达成”应用，通过押金模式强制用户坚持习惯。";

#[derive(Debug, Clone)]
pub struct InsightEngine {
    rules: Vec<CategoryRule>,
    seasonal: Regex,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SEASONAL_PATTERN).expect("default seasonal pattern")
    }
}

impl InsightEngine {
    /// Engine with the built-in category rules and a case-insensitive seasonal pattern.
    pub fn new(seasonal_pattern: &str) -> Result<Self, regex::Error> {
        let seasonal = RegexBuilder::new(seasonal_pattern)
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            rules: CATEGORY_RULES.to_vec(),
            seasonal,
        })
    }

    pub fn with_rules(mut self, rules: Vec<CategoryRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn derive_insights(&self, ranked: &[AggregatedTrend]) -> Vec<Insight> {
        let mut out = Vec::new();

        for rule in &self.rules {
            let mut members: Vec<&AggregatedTrend> =
                ranked.iter().filter(|t| t.category == rule.category).collect();
            if members.is_empty() {
                continue;
            }
            // stable: equal scores keep ranked order
            members.sort_by(|a, b| b.score.total_cmp(&a.score));
            out.push(Insight {
                title: format!("{}: {}", rule.category, rule.title),
                context: rule.context.replace("{examples}", &cite(&members)),
                suggestion: rule.suggestion.to_string(),
            });
        }

        let seasonal: Vec<&AggregatedTrend> = ranked
            .iter()
            .filter(|t| self.seasonal.is_match(&t.keyword))
            .collect();
        if !seasonal.is_empty() {
            out.push(Insight {
                title: SEASONAL_TITLE.to_string(),
                context: format!("新年计划相关关键词搜索量激增：{}。", cite(&seasonal)),
                suggestion: SEASONAL_SUGGESTION.to_string(),
            });
        }

        out
    }
}

fn cite(trends: &[&AggregatedTrend]) -> String {
    trends
        .iter()
        .take(MAX_EXAMPLES)
        .map(|t| t.keyword.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
