// ==========================================
// 线索导入系统 - 线索领域模型
// ==========================================
// 管道产物: RawRecord → EnrichedLead → ScoredLead → Lead（落库实体）
// 字段命名: 序列化后与持久化字段名逐字一致（camelCase）
// ==========================================

use crate::domain::types::{CanonicalField, Industry, LeadStatus, NextBestAction, Seniority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ==========================================
// RawRecord - 原始行记录
// ==========================================
// 用途: 文件解析产物（列名已归一化，未知列原样保留）
// 生命周期: 仅在一次导入流程内
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub fields: BTreeMap<String, String>,
    pub row_number: usize, // 原始文件行号（用于日志/故障定位）
}

impl RawRecord {
    pub fn new(row_number: usize) -> Self {
        Self {
            fields: BTreeMap::new(),
            row_number,
        }
    }

    /// 由 (列名, 值) 列表构造（测试与示例常用）
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut record = Self::new(0);
        for (key, value) in pairs {
            record.insert(*key, *value);
        }
        record
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// 读取标准字段（去除首尾空白，空值视为缺失）
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.get_raw(field.as_str())
    }

    /// 按原始列名读取（空值视为缺失）
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// 标准字段是否存在
    pub fn has(&self, field: CanonicalField) -> bool {
        self.get(field).is_some()
    }
}

// ==========================================
// EnrichedLead - 富化结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedLead {
    pub raw: RawRecord,
    pub email_valid: bool,
    pub industry: Industry,
    pub seniority: Seniority,
}

impl EnrichedLead {
    pub fn field(&self, field: CanonicalField) -> Option<&str> {
        self.raw.get(field)
    }
}

// ==========================================
// ScoreBreakdown - 评分明细
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub email: u32,
    pub title: u32,
    pub company: u32,
    pub phone: u32,
    pub linkedin: u32,
    pub completeness: u32,
}

impl ScoreBreakdown {
    /// 各项之和
    pub fn total(&self) -> u32 {
        self.email + self.title + self.company + self.phone + self.linkedin + self.completeness
    }
}

// ==========================================
// LeadScore - 评分结果
// ==========================================
// 不变量: score == score_breakdown.total()
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadScore {
    pub score: u32,
    pub score_breakdown: ScoreBreakdown,
    pub next_best_action: NextBestAction,
}

// ==========================================
// ScoredLead - 已评分线索（待落库）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredLead {
    pub enriched: EnrichedLead,
    pub score: LeadScore,
}

// ==========================================
// Lead - 线索（落库实体）
// ==========================================
// 对齐: leads 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub status: LeadStatus,

    // 富化字段
    pub industry: Industry,
    pub seniority: Seniority,
    pub email_valid: bool,

    // 评分
    pub score: u32,
    pub score_breakdown: ScoreBreakdown,
    pub next_best_action: NextBestAction,

    // 元信息
    pub import_id: String,
    pub raw_data: BTreeMap<String, String>, // 原始行（审计用）
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// 由评分结果构造新线索（生成 id，状态为 new）
    pub fn from_scored(scored: ScoredLead, import_id: &str) -> Self {
        let ScoredLead { enriched, score } = scored;
        let field = |f: CanonicalField| enriched.field(f).map(str::to_string);

        Lead {
            id: Uuid::new_v4().to_string(),
            email: field(CanonicalField::Email),
            first_name: field(CanonicalField::FirstName),
            last_name: field(CanonicalField::LastName),
            company: field(CanonicalField::Company),
            title: field(CanonicalField::Title),
            phone: field(CanonicalField::Phone),
            linkedin: field(CanonicalField::Linkedin),
            status: LeadStatus::New,
            industry: enriched.industry,
            seniority: enriched.seniority,
            email_valid: enriched.email_valid,
            score: score.score,
            score_breakdown: score.score_breakdown,
            next_best_action: score.next_best_action,
            import_id: import_id.to_string(),
            raw_data: enriched.raw.fields,
            created_at: Utc::now(),
        }
    }
}

/// 去重比较键: 去首尾空白后按 Unicode 规则转小写
pub fn match_key(value: &str) -> String {
    value.trim().to_lowercase()
}

// ==========================================
// CompanyPattern - 公司名匹配模式
// ==========================================
// 用途: 去重规则 2（姓名 + 公司模糊匹配）
// 归一化: 小写 → 按非字母数字切分 → 去掉法律实体后缀 → 单空格连接

/// 法律实体后缀（整词匹配）
pub const LEGAL_SUFFIXES: &[&str] = &["inc", "corp", "llc", "ltd", "limited"];

/// 公司名归一化
pub fn normalize_company(company: &str) -> String {
    company
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && !LEGAL_SUFFIXES.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyPattern {
    normalized: String,
}

impl CompanyPattern {
    /// 归一化后为空（如仅有 "Inc."）时返回 None
    pub fn new(company: &str) -> Option<Self> {
        let normalized = normalize_company(company);
        if normalized.is_empty() {
            None
        } else {
            Some(Self { normalized })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// 双向子串匹配
    pub fn matches(&self, stored_company: &str) -> bool {
        let stored = normalize_company(stored_company);
        if stored.is_empty() {
            return false;
        }
        stored.contains(&self.normalized) || self.normalized.contains(&stored)
    }
}

// ==========================================
// LeadFilter / LeadPage - 线索查询
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub min_score: Option<u32>,
    pub max_score: Option<u32>,
    pub industry: Option<Industry>,
    pub seniority: Option<Seniority>,
    pub search: Option<String>, // email/firstName/lastName/company 模糊搜索
    pub page: Option<u32>,      // 从 1 开始
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        Self {
            total,
            page,
            limit,
            pages: total.div_ceil(limit as u64),
        }
    }

    /// SQL OFFSET
    pub fn offset(&self) -> u64 {
        (self.page.max(1) as u64 - 1) * self.limit as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    pub pagination: Pagination,
}

// ==========================================
// LeadStats - 驾驶舱统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStats {
    pub total_leads: u64,
    pub total_imports: u64,
    pub average_score: f64,
    pub score_distribution: Vec<ScoreBucket>,
    pub top_industries: Vec<IndustryCount>,
}

/// 分数段 [min, max]（闭区间）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub min: u32,
    pub max: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryCount {
    pub industry: Industry,
    pub count: u64,
}
