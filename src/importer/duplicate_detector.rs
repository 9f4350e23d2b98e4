// ==========================================
// 线索导入系统 - 重复线索检测
// ==========================================
// 规则（按序，首个命中即返回）:
// 1. 邮箱精确匹配（不区分大小写）
// 2. 名 + 姓全等 且 公司归一化后双向子串匹配
// 查询走同一仓储，批内先落库的线索对后续行可见（批内自去重）
// ==========================================

use crate::domain::lead::{CompanyPattern, EnrichedLead};
use crate::domain::types::CanonicalField;
use crate::repository::error::RepositoryResult;
use crate::repository::lead_import_repo::LeadImportRepository;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 命中的去重规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateRule {
    Email,
    NameAndCompany,
}

impl fmt::Display for DuplicateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateRule::Email => write!(f, "email"),
            DuplicateRule::NameAndCompany => write!(f, "name_and_company"),
        }
    }
}

/// 已存在的等价线索
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMatch {
    pub lead_id: String,
    pub rule: DuplicateRule,
}

// ==========================================
// DuplicateDetector
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateDetector;

impl DuplicateDetector {
    pub fn new() -> Self {
        Self
    }

    /// 查找与候选线索等价的已存线索
    ///
    /// # 返回
    /// - Ok(Some): 命中规则及已存线索 id
    /// - Ok(None): 非重复
    /// - Err: 存储查询失败（由调用方视为致命错误）
    pub async fn find_duplicate<R>(
        &self,
        repo: &R,
        candidate: &EnrichedLead,
    ) -> RepositoryResult<Option<DuplicateMatch>>
    where
        R: LeadImportRepository + ?Sized,
    {
        // 规则 1: 邮箱（合法与否都查）
        if let Some(email) = candidate.field(CanonicalField::Email) {
            if let Some(existing) = repo.find_by_email(email).await? {
                return Ok(Some(DuplicateMatch {
                    lead_id: existing.id,
                    rule: DuplicateRule::Email,
                }));
            }
        }

        // 规则 2: 三个字段缺一则跳过
        let (Some(first_name), Some(last_name), Some(company)) = (
            candidate.field(CanonicalField::FirstName),
            candidate.field(CanonicalField::LastName),
            candidate.field(CanonicalField::Company),
        ) else {
            return Ok(None);
        };
        let Some(pattern) = CompanyPattern::new(company) else {
            return Ok(None);
        };

        let existing = repo
            .find_by_name_and_company(first_name, last_name, &pattern)
            .await?;
        Ok(existing.map(|lead| DuplicateMatch {
            lead_id: lead.id,
            rule: DuplicateRule::NameAndCompany,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::{Import, ImportPatch};
    use crate::domain::lead::{Lead, RawRecord, ScoredLead};
    use crate::engine::{EnrichmentEngine, ScoringEngine};
    use crate::repository::error::RepositoryError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // 内存仓储（只实现线索部分）
    #[derive(Default)]
    struct MemoryRepo {
        leads: Mutex<Vec<Lead>>,
    }

    #[async_trait]
    impl LeadImportRepository for MemoryRepo {
        async fn create_import(&self, _filename: &str) -> RepositoryResult<Import> {
            Err(RepositoryError::InternalError("not used".to_string()))
        }

        async fn get_import(&self, _import_id: &str) -> RepositoryResult<Option<Import>> {
            Ok(None)
        }

        async fn update_import(
            &self,
            import_id: &str,
            _patch: ImportPatch,
        ) -> RepositoryResult<Import> {
            Err(RepositoryError::not_found("Import", import_id))
        }

        async fn create_lead(&self, lead: ScoredLead, import_id: &str) -> RepositoryResult<String> {
            let lead = Lead::from_scored(lead, import_id);
            let id = lead.id.clone();
            self.leads.lock().unwrap().push(lead);
            Ok(id)
        }

        async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Lead>> {
            let leads = self.leads.lock().unwrap();
            Ok(leads
                .iter()
                .find(|l| {
                    l.email
                        .as_deref()
                        .is_some_and(|e| e.eq_ignore_ascii_case(email))
                })
                .cloned())
        }

        async fn find_by_name_and_company(
            &self,
            first_name: &str,
            last_name: &str,
            company: &CompanyPattern,
        ) -> RepositoryResult<Option<Lead>> {
            let leads = self.leads.lock().unwrap();
            Ok(leads
                .iter()
                .find(|l| {
                    l.first_name
                        .as_deref()
                        .is_some_and(|f| f.eq_ignore_ascii_case(first_name))
                        && l.last_name
                            .as_deref()
                            .is_some_and(|n| n.eq_ignore_ascii_case(last_name))
                        && l.company.as_deref().is_some_and(|c| company.matches(c))
                })
                .cloned())
        }
    }

    fn enriched(pairs: &[(&str, &str)]) -> EnrichedLead {
        EnrichmentEngine::new().enrich(RawRecord::from_pairs(pairs))
    }

    async fn store(repo: &MemoryRepo, pairs: &[(&str, &str)]) -> String {
        let scored = ScoringEngine::new().score_lead(enriched(pairs));
        repo.create_lead(scored, "imp-1").await.unwrap()
    }

    #[tokio::test]
    async fn test_email_match_ignores_case() {
        let repo = MemoryRepo::default();
        let id = store(&repo, &[("email", "Jane@Acme.com")]).await;

        let hit = DuplicateDetector::new()
            .find_duplicate(&repo, &enriched(&[("email", "jane@acme.COM")]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.lead_id, id);
        assert_eq!(hit.rule, DuplicateRule::Email);
    }

    #[tokio::test]
    async fn test_name_and_company_match_strips_legal_suffix() {
        let repo = MemoryRepo::default();
        store(
            &repo,
            &[("firstName", "Jane"), ("lastName", "Doe"), ("company", "Acme Inc.")],
        )
        .await;

        let hit = DuplicateDetector::new()
            .find_duplicate(
                &repo,
                &enriched(&[("firstName", "jane"), ("lastName", "DOE"), ("company", "acme")]),
            )
            .await
            .unwrap();
        assert_eq!(hit.map(|m| m.rule), Some(DuplicateRule::NameAndCompany));
    }

    #[tokio::test]
    async fn test_different_company_is_not_duplicate() {
        let repo = MemoryRepo::default();
        store(
            &repo,
            &[("firstName", "Jane"), ("lastName", "Doe"), ("company", "Acme Inc.")],
        )
        .await;

        let miss = DuplicateDetector::new()
            .find_duplicate(
                &repo,
                &enriched(&[("firstName", "Jane"), ("lastName", "Doe"), ("company", "Globex")]),
            )
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_incomplete_candidate_skips_fuzzy_rule() {
        let repo = MemoryRepo::default();
        store(
            &repo,
            &[("firstName", "Jane"), ("lastName", "Doe"), ("company", "Acme")],
        )
        .await;

        let detector = DuplicateDetector::new();
        let no_company = enriched(&[("firstName", "Jane"), ("lastName", "Doe")]);
        assert!(detector.find_duplicate(&repo, &no_company).await.unwrap().is_none());

        // 仅有法律后缀的公司名归一化后为空
        let suffix_only = enriched(&[("firstName", "Jane"), ("lastName", "Doe"), ("company", "Inc.")]);
        assert!(detector.find_duplicate(&repo, &suffix_only).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_email_rule_wins_over_fuzzy_rule() {
        let repo = MemoryRepo::default();
        let by_email = store(&repo, &[("email", "x@y.io")]).await;
        store(
            &repo,
            &[("firstName", "Jane"), ("lastName", "Doe"), ("company", "Acme")],
        )
        .await;

        let hit = DuplicateDetector::new()
            .find_duplicate(
                &repo,
                &enriched(&[
                    ("email", "X@Y.io"),
                    ("firstName", "Jane"),
                    ("lastName", "Doe"),
                    ("company", "Acme"),
                ]),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.lead_id, by_email);
        assert_eq!(hit.rule, DuplicateRule::Email);
    }
}
