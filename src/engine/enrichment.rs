// ==========================================
// 线索导入系统 - 线索富化引擎
// ==========================================
// 职责: RawRecord → EnrichedLead（emailValid / industry / seniority）
// 红线: 纯函数，无 I/O，无失败路径（缺失字段降级为默认值）
// ==========================================
// 分类规则以有序表存放，首个命中者胜出；
// 匹配为不区分大小写的子串匹配（不做词边界）
// ==========================================

use crate::domain::lead::{EnrichedLead, RawRecord};
use crate::domain::types::{CanonicalField, Industry, Seniority};
use regex::Regex;
use std::sync::OnceLock;

// ==========================================
// 行业关键词表（表顺序即优先级）
// ==========================================
pub const INDUSTRY_RULES: &[(Industry, &[&str])] = &[
    (
        Industry::Technology,
        &["tech", "software", "saas", "cloud", "ai", "data"],
    ),
    (
        Industry::Finance,
        &["bank", "finance", "investment", "capital", "trading"],
    ),
    (
        Industry::Healthcare,
        &["health", "medical", "pharma", "hospital", "clinic"],
    ),
    (
        Industry::Retail,
        &["retail", "ecommerce", "shop", "store", "marketplace"],
    ),
    (
        Industry::Manufacturing,
        &["manufacturing", "factory", "production", "industrial"],
    ),
    (
        Industry::Realestate,
        &["real estate", "property", "construction", "development"],
    ),
    (
        Industry::Education,
        &["education", "school", "university", "training", "learning"],
    ),
    (
        Industry::Media,
        &["media", "publishing", "news", "entertainment", "advertising"],
    ),
    (
        Industry::Consulting,
        &["consulting", "advisory", "services", "strategy"],
    ),
    (
        Industry::Energy,
        &["energy", "oil", "gas", "renewable", "utilities"],
    ),
    (
        Industry::Telecommunications,
        &["telecom", "mobile", "network", "communications"],
    ),
    (
        Industry::Transportation,
        &["transport", "logistics", "shipping", "delivery"],
    ),
];

// ==========================================
// 职级关键词表（表顺序即优先级，未命中为 Individual）
// ==========================================
pub const SENIORITY_RULES: &[(Seniority, &[&str])] = &[
    (
        Seniority::CLevel,
        &["ceo", "cto", "cfo", "coo", "chief", "president", "founder"],
    ),
    (Seniority::Vp, &["vp", "vice president"]),
    (Seniority::Director, &["director", "head of"]),
    (Seniority::Manager, &["manager", "lead"]),
];

/// 邮箱最大长度
const MAX_EMAIL_LEN: usize = 254;

/// 邮箱语法: atext 本地部分（点不可在首尾或连续）@ 至少两段域名，顶级域为 ≥2 位字母
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$";

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("邮箱正则必须可编译"))
}

/// 在有序规则表中查找首个命中项
fn first_match<T: Copy>(rules: &[(T, &[&str])], text: &str) -> Option<T> {
    rules
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(result, _)| *result)
}

// ==========================================
// EnrichmentEngine - 富化引擎
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichmentEngine;

impl EnrichmentEngine {
    pub fn new() -> Self {
        Self
    }

    /// 富化单条记录
    pub fn enrich(&self, raw: RawRecord) -> EnrichedLead {
        let email_valid = raw
            .get(CanonicalField::Email)
            .map(|email| self.is_valid_email(email))
            .unwrap_or(false);
        let industry = self.classify_industry(
            raw.get(CanonicalField::Company),
            raw.get(CanonicalField::Title),
        );
        let seniority = self.classify_seniority(raw.get(CanonicalField::Title));

        EnrichedLead {
            raw,
            email_valid,
            industry,
            seniority,
        }
    }

    /// 邮箱语法校验
    pub fn is_valid_email(&self, email: &str) -> bool {
        let email = email.trim();
        email.len() <= MAX_EMAIL_LEN && email_regex().is_match(email)
    }

    /// 行业推断: "company title" 小写后按表匹配
    pub fn classify_industry(&self, company: Option<&str>, title: Option<&str>) -> Industry {
        let text = format!("{} {}", company.unwrap_or(""), title.unwrap_or("")).to_lowercase();
        first_match(INDUSTRY_RULES, &text).unwrap_or(Industry::Other)
    }

    /// 职级推断: 缺失职位视为 Individual
    pub fn classify_seniority(&self, title: Option<&str>) -> Seniority {
        match title {
            Some(title) => {
                first_match(SENIORITY_RULES, &title.to_lowercase()).unwrap_or(Seniority::Individual)
            }
            None => Seniority::Individual,
        }
    }
}
