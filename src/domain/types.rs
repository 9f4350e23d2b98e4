// ==========================================
// 线索导入系统 - 领域类型定义
// ==========================================
// 职责: 行业/职级/下一步动作/线索状态/导入状态/标准字段
// 序列化: 与持久化字段值逐字一致（小写 / kebab-case）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 行业 (Industry)
// ==========================================
// 由 company + title 关键词推断，未命中为 Other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Technology,
    Finance,
    Healthcare,
    Retail,
    Manufacturing,
    Realestate,
    Education,
    Media,
    Consulting,
    Energy,
    Telecommunications,
    Transportation,
    Other,
}

impl Industry {
    /// 全部取值（表顺序）
    pub const ALL: [Industry; 13] = [
        Industry::Technology,
        Industry::Finance,
        Industry::Healthcare,
        Industry::Retail,
        Industry::Manufacturing,
        Industry::Realestate,
        Industry::Education,
        Industry::Media,
        Industry::Consulting,
        Industry::Energy,
        Industry::Telecommunications,
        Industry::Transportation,
        Industry::Other,
    ];

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Industry::Technology => "technology",
            Industry::Finance => "finance",
            Industry::Healthcare => "healthcare",
            Industry::Retail => "retail",
            Industry::Manufacturing => "manufacturing",
            Industry::Realestate => "realestate",
            Industry::Education => "education",
            Industry::Media => "media",
            Industry::Consulting => "consulting",
            Industry::Energy => "energy",
            Industry::Telecommunications => "telecommunications",
            Industry::Transportation => "transportation",
            Industry::Other => "other",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl std::str::FromStr for Industry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Industry::ALL
            .iter()
            .copied()
            .find(|i| i.to_db_str() == normalized)
            .ok_or_else(|| format!("未知行业: {}", s))
    }
}

// ==========================================
// 职级 (Seniority)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Seniority {
    CLevel,     // 高管
    Vp,         // 副总裁
    Director,   // 总监
    Manager,    // 经理
    Individual, // 个人贡献者
}

impl Seniority {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Seniority::CLevel => "c-level",
            Seniority::Vp => "vp",
            Seniority::Director => "director",
            Seniority::Manager => "manager",
            Seniority::Individual => "individual",
        }
    }
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl std::str::FromStr for Seniority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c-level" | "clevel" => Ok(Seniority::CLevel),
            "vp" => Ok(Seniority::Vp),
            "director" => Ok(Seniority::Director),
            "manager" => Ok(Seniority::Manager),
            "individual" => Ok(Seniority::Individual),
            other => Err(format!("未知职级: {}", other)),
        }
    }
}

// ==========================================
// 下一步动作 (Next Best Action)
// ==========================================
// 仅由总分决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NextBestAction {
    ImmediateOutreach,
    ScheduleCall,
    NurtureSequence,
    ResearchFurther,
}

impl NextBestAction {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            NextBestAction::ImmediateOutreach => "immediate-outreach",
            NextBestAction::ScheduleCall => "schedule-call",
            NextBestAction::NurtureSequence => "nurture-sequence",
            NextBestAction::ResearchFurther => "research-further",
        }
    }

    /// 面向销售人员的说明文字（导出时使用）
    pub fn label(&self) -> &'static str {
        match self {
            NextBestAction::ImmediateOutreach => "Immediate outreach - high priority",
            NextBestAction::ScheduleCall => "Schedule intro call",
            NextBestAction::NurtureSequence => "Add to nurture sequence",
            NextBestAction::ResearchFurther => "Research and qualify further",
        }
    }
}

impl fmt::Display for NextBestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl std::str::FromStr for NextBestAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate-outreach" => Ok(NextBestAction::ImmediateOutreach),
            "schedule-call" => Ok(NextBestAction::ScheduleCall),
            "nurture-sequence" => Ok(NextBestAction::NurtureSequence),
            "research-further" => Ok(NextBestAction::ResearchFurther),
            other => Err(format!("未知下一步动作: {}", other)),
        }
    }
}

// ==========================================
// 线索状态 (Lead Status)
// ==========================================
// 导入时固定为 New，之后由外部修改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
}

impl LeadStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "converted" => Ok(LeadStatus::Converted),
            other => Err(format!("未知线索状态: {}", other)),
        }
    }
}

// ==========================================
// 导入状态 (Import Status)
// ==========================================
// 状态机: queued → processing → {completed | failed}
// 终态不可再进入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    #[default]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ImportStatus::Queued => "queued",
            ImportStatus::Processing => "processing",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }

    /// 进入目标状态所要求的前驱状态
    ///
    /// # 返回
    /// - Some(前驱): 合法目标
    /// - None: 不可进入（queued 只能是初始状态）
    pub fn required_predecessor(target: ImportStatus) -> Option<ImportStatus> {
        match target {
            ImportStatus::Queued => None,
            ImportStatus::Processing => Some(ImportStatus::Queued),
            ImportStatus::Completed | ImportStatus::Failed => Some(ImportStatus::Processing),
        }
    }

    /// 校验状态转换
    pub fn can_transition_to(&self, target: ImportStatus) -> bool {
        ImportStatus::required_predecessor(target) == Some(*self)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queued" => Ok(ImportStatus::Queued),
            "processing" => Ok(ImportStatus::Processing),
            "completed" => Ok(ImportStatus::Completed),
            "failed" => Ok(ImportStatus::Failed),
            other => Err(format!("未知导入状态: {}", other)),
        }
    }
}

// ==========================================
// 标准字段 (Canonical Field)
// ==========================================
// 列名归一化的目标字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Email,
    FirstName,
    LastName,
    Company,
    Title,
    Phone,
    Linkedin,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 7] = [
        CanonicalField::Email,
        CanonicalField::FirstName,
        CanonicalField::LastName,
        CanonicalField::Company,
        CanonicalField::Title,
        CanonicalField::Phone,
        CanonicalField::Linkedin,
    ];

    /// 字段名（与持久化字段名一致）
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Email => "email",
            CanonicalField::FirstName => "firstName",
            CanonicalField::LastName => "lastName",
            CanonicalField::Company => "company",
            CanonicalField::Title => "title",
            CanonicalField::Phone => "phone",
            CanonicalField::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
