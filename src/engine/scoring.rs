// ==========================================
// 线索导入系统 - 线索评分引擎
// ==========================================
// 职责: EnrichedLead → LeadScore（明细 + 总分 + 下一步动作）
// 红线: 总分 = 明细之和；下一步动作只由总分决定
// ==========================================
// 权重:
// - 邮箱有效 10
// - 职级 c-level 15 / vp 12 / director 10 / manager 8 / individual 0
// - 公司 20，电话 10，LinkedIn 10
// - 完整度 round(35 × 已填字段数 / 5)
// ==========================================

use crate::domain::lead::{EnrichedLead, LeadScore, ScoreBreakdown, ScoredLead};
use crate::domain::types::{CanonicalField, NextBestAction, Seniority};

pub const EMAIL_WEIGHT: u32 = 10;
pub const COMPANY_WEIGHT: u32 = 20;
pub const PHONE_WEIGHT: u32 = 10;
pub const LINKEDIN_WEIGHT: u32 = 10;
pub const COMPLETENESS_WEIGHT: u32 = 35;

/// 职级权重
pub const SENIORITY_WEIGHTS: &[(Seniority, u32)] = &[
    (Seniority::CLevel, 15),
    (Seniority::Vp, 12),
    (Seniority::Director, 10),
    (Seniority::Manager, 8),
    (Seniority::Individual, 0),
];

/// 完整度统计的字段
pub const COMPLETENESS_FIELDS: [CanonicalField; 5] = [
    CanonicalField::Email,
    CanonicalField::FirstName,
    CanonicalField::LastName,
    CanonicalField::Company,
    CanonicalField::Title,
];

/// 动作阈值（降序，首个满足 score ≥ 阈值者胜出）
pub const ACTION_THRESHOLDS: &[(u32, NextBestAction)] = &[
    (80, NextBestAction::ImmediateOutreach),
    (60, NextBestAction::ScheduleCall),
    (40, NextBestAction::NurtureSequence),
];

// ==========================================
// ScoringEngine - 评分引擎
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// 评分并组装 ScoredLead
    pub fn score_lead(&self, enriched: EnrichedLead) -> ScoredLead {
        let score = self.score(&enriched);
        ScoredLead { enriched, score }
    }

    /// 计算评分
    pub fn score(&self, lead: &EnrichedLead) -> LeadScore {
        let present = |field| if lead.raw.has(field) { 1 } else { 0 };

        let breakdown = ScoreBreakdown {
            email: if lead.email_valid { EMAIL_WEIGHT } else { 0 },
            title: self.seniority_weight(lead.seniority),
            company: present(CanonicalField::Company) * COMPANY_WEIGHT,
            phone: present(CanonicalField::Phone) * PHONE_WEIGHT,
            linkedin: present(CanonicalField::Linkedin) * LINKEDIN_WEIGHT,
            completeness: self.completeness(lead),
        };
        let score = breakdown.total();

        LeadScore {
            score,
            score_breakdown: breakdown,
            next_best_action: self.next_best_action(score),
        }
    }

    pub fn seniority_weight(&self, seniority: Seniority) -> u32 {
        SENIORITY_WEIGHTS
            .iter()
            .find(|(s, _)| *s == seniority)
            .map(|(_, w)| *w)
            .unwrap_or(0)
    }

    /// 完整度得分（四舍五入）
    pub fn completeness(&self, lead: &EnrichedLead) -> u32 {
        let filled = COMPLETENESS_FIELDS
            .iter()
            .filter(|f| lead.raw.has(**f))
            .count() as u32;
        let total = COMPLETENESS_FIELDS.len() as u32;
        (COMPLETENESS_WEIGHT * filled * 2 + total) / (total * 2)
    }

    pub fn next_best_action(&self, score: u32) -> NextBestAction {
        ACTION_THRESHOLDS
            .iter()
            .find(|(threshold, _)| score >= *threshold)
            .map(|(_, action)| *action)
            .unwrap_or(NextBestAction::ResearchFurther)
    }
}
