// ==========================================
// 线索导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::file_parser::RowLengthPolicy;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入协调器读取可调参数
// 实现者: ConfigManager（从 config_kv 表读取）, ImportSettings（固定值）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 进度检查点间隔（每处理 N 条写一次）
    ///
    /// # 默认值
    /// - 10
    ///
    /// # 约束
    /// - 必须 ≥ 1，否则返回 ConfigValueError
    async fn get_checkpoint_interval(&self) -> ImportResult<u64>;

    /// 列数不一致处理策略
    ///
    /// # 默认值
    /// - PAD
    async fn get_row_length_policy(&self) -> ImportResult<RowLengthPolicy>;
}
