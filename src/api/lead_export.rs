// ==========================================
// 线索导入系统 - 线索 CSV 导出
// ==========================================
// 布局: standard / salesforce / hubspot
// 顺序: 调用方传入的顺序（通常为 score 降序）
// ==========================================

use crate::domain::lead::Lead;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// 导出布局
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Standard,
    Salesforce,
    Hubspot,
}

impl ExportFormat {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ExportFormat::Standard => "standard",
            ExportFormat::Salesforce => "salesforce",
            ExportFormat::Hubspot => "hubspot",
        }
    }

    /// 表头
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            ExportFormat::Standard => &[
                "Email",
                "First Name",
                "Last Name",
                "Company",
                "Title",
                "Phone",
                "Score",
                "Next Action",
                "Industry",
                "Seniority",
            ],
            ExportFormat::Salesforce => &[
                "First Name",
                "Last Name",
                "Email",
                "Company",
                "Title",
                "Phone",
                "Lead Source",
                "Lead Status",
                "Rating",
            ],
            ExportFormat::Hubspot => &[
                "First Name",
                "Last Name",
                "Email",
                "Company Name",
                "Job Title",
                "Phone Number",
                "Lead Status",
                "HubSpot Score",
            ],
        }
    }

    /// 单条线索的导出行（与表头一一对应）
    fn row(&self, lead: &Lead) -> Vec<String> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        match self {
            ExportFormat::Standard => vec![
                text(&lead.email),
                text(&lead.first_name),
                text(&lead.last_name),
                text(&lead.company),
                text(&lead.title),
                text(&lead.phone),
                lead.score.to_string(),
                lead.next_best_action.label().to_string(),
                lead.industry.to_string(),
                lead.seniority.to_string(),
            ],
            ExportFormat::Salesforce => vec![
                text(&lead.first_name),
                text(&lead.last_name),
                text(&lead.email),
                text(&lead.company),
                text(&lead.title),
                text(&lead.phone),
                "Import".to_string(),
                "New".to_string(),
                rating(lead.score).to_string(),
            ],
            ExportFormat::Hubspot => vec![
                text(&lead.first_name),
                text(&lead.last_name),
                text(&lead.email),
                text(&lead.company),
                text(&lead.title),
                text(&lead.phone),
                "NEW".to_string(),
                lead.score.to_string(),
            ],
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(ExportFormat::Standard),
            "salesforce" => Ok(ExportFormat::Salesforce),
            "hubspot" => Ok(ExportFormat::Hubspot),
            _ => Err(format!("未知导出格式: {}", s)),
        }
    }
}

/// Salesforce 评级
pub fn rating(score: u32) -> &'static str {
    match score {
        80.. => "Hot",
        60..=79 => "Warm",
        _ => "Cold",
    }
}

/// 按布局写出 CSV（含表头）
pub fn write_leads<W: Write>(format: ExportFormat, leads: &[Lead], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(format.headers())?;
    for lead in leads {
        wtr.write_record(format.row(lead))?;
    }
    wtr.flush()?;
    Ok(())
}

/// 导出为字符串
pub fn export_to_string(format: ExportFormat, leads: &[Lead]) -> csv::Result<String> {
    let mut buffer = Vec::new();
    write_leads(format, leads, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lead::{EnrichedLead, LeadScore, RawRecord, ScoreBreakdown, ScoredLead};
    use crate::domain::types::{Industry, NextBestAction, Seniority};

    fn lead(score: u32) -> Lead {
        Lead::from_scored(
            ScoredLead {
                enriched: EnrichedLead {
                    raw: RawRecord::from_pairs(&[
                        ("email", "jane@acme.com"),
                        ("firstName", "Jane"),
                        ("lastName", "Doe"),
                        ("company", "Acme, Inc."),
                        ("title", "VP Sales"),
                    ]),
                    email_valid: true,
                    industry: Industry::Technology,
                    seniority: Seniority::Vp,
                },
                score: LeadScore {
                    score,
                    score_breakdown: ScoreBreakdown::default(),
                    next_best_action: NextBestAction::ImmediateOutreach,
                },
            },
            "imp-1",
        )
    }

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(rating(100), "Hot");
        assert_eq!(rating(80), "Hot");
        assert_eq!(rating(79), "Warm");
        assert_eq!(rating(60), "Warm");
        assert_eq!(rating(59), "Cold");
        assert_eq!(rating(0), "Cold");
    }

    #[test]
    fn test_standard_layout_quotes_and_labels() {
        let csv = export_to_string(ExportFormat::Standard, &[lead(85)]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Email,First Name,Last Name,Company,Title,Phone,Score,Next Action,Industry,Seniority"
        );
        assert_eq!(
            lines.next().unwrap(),
            "jane@acme.com,Jane,Doe,\"Acme, Inc.\",VP Sales,,85,Immediate outreach - high priority,technology,vp"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_salesforce_and_hubspot_layouts() {
        let sf = export_to_string(ExportFormat::Salesforce, &[lead(65)]).unwrap();
        assert!(sf.lines().nth(1).unwrap().ends_with(",Import,New,Warm"));

        let hs = export_to_string(ExportFormat::Hubspot, &[lead(42)]).unwrap();
        assert!(hs.starts_with("First Name,Last Name,Email,Company Name,Job Title,Phone Number"));
        assert!(hs.lines().nth(1).unwrap().ends_with(",NEW,42"));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("HubSpot".parse::<ExportFormat>().unwrap(), ExportFormat::Hubspot);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
