// ==========================================
// 导入失败场景测试
// ==========================================
// 测试目标: 存储故障 / 源文件故障 / 取消 → 批次 failed，保留已有进度
// ==========================================

mod test_helpers;

use lead_import::config::ImportSettings;
use lead_import::domain::ImportStatus;
use lead_import::importer::{ImportError, LeadImporter, LeadImporterImpl, RowLengthPolicy};
use lead_import::logging;
use lead_import::repository::{LeadImportRepository, LeadImportRepositoryImpl};
use std::path::Path;
use std::sync::Arc;
use test_helpers::{create_test_db, leads_csv, leads_of_import, shared_conn, write_csv, write_temp_file, InstrumentedRepository};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_storage_fault_on_fifth_create_fails_run() {
    logging::init_test();

    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let conn = shared_conn(&db_path);
    let repo = Arc::new(InstrumentedRepository::new(conn.clone(), Some(5)));
    let importer = LeadImporterImpl::new(repo.clone(), ImportSettings::default());

    let file = write_csv(&leads_csv(12, &[]));
    let import = importer
        .import_file(file.path())
        .await
        .expect("terminal state should be written");

    assert_eq!(import.status, ImportStatus::Failed);
    assert_eq!(import.processed_records, 4, "失败行不计入已处理");
    assert_eq!(import.total_records, 5);
    assert!(import.completed_at.is_none(), "completedAt 仅在 completed 时写入");
    let message = import.error_message.as_deref().unwrap_or_default();
    assert!(message.contains("injected failure"), "errorMessage: {}", message);

    // 失败后不再处理后续行
    assert_eq!(repo.create_calls(), 5);
    assert_eq!(leads_of_import(&conn, &import.id).len(), 4);
}

#[tokio::test]
async fn test_missing_source_fails_run() {
    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let conn = shared_conn(&db_path);
    let repo = Arc::new(LeadImportRepositoryImpl::from_connection(conn));
    let importer = LeadImporterImpl::new(repo.clone(), ImportSettings::default());

    let created = repo.create_import("gone.csv").await.unwrap();
    let import = importer
        .run_import(&created.id, Path::new("/nonexistent/dir/gone.csv"), None)
        .await
        .unwrap();

    assert_eq!(import.status, ImportStatus::Failed);
    assert_eq!(import.total_records, 0);
    assert_eq!(import.processed_records, 0);
    assert!(import.error_message.unwrap().contains("文件不存在"));
}

#[tokio::test]
async fn test_unsupported_extension_fails_run() {
    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let conn = shared_conn(&db_path);
    let repo = Arc::new(LeadImportRepositoryImpl::from_connection(conn));
    let importer = LeadImporterImpl::new(repo, ImportSettings::default());

    let file = write_temp_file(".json", "{}");
    let import = importer.import_file(file.path()).await.unwrap();
    assert_eq!(import.status, ImportStatus::Failed);
    assert!(import.error_message.unwrap().contains("文件格式不支持"));
}

#[tokio::test]
async fn test_cancelled_run_is_failed() {
    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let conn = shared_conn(&db_path);
    let repo = Arc::new(LeadImportRepositoryImpl::from_connection(conn.clone()));
    let importer = LeadImporterImpl::new(repo.clone(), ImportSettings::default());

    let file = write_csv(&leads_csv(5, &[]));
    let created = repo.create_import("leads.csv").await.unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let import = importer
        .run_import(&created.id, file.path(), Some(token))
        .await
        .unwrap();
    assert_eq!(import.status, ImportStatus::Failed);
    assert_eq!(import.error_message.as_deref(), Some("导入已取消"));
    assert_eq!(import.processed_records, 0);
    assert!(leads_of_import(&conn, &import.id).is_empty());
}

#[tokio::test]
async fn test_terminal_import_is_not_rerun() {
    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let conn = shared_conn(&db_path);
    let repo = Arc::new(LeadImportRepositoryImpl::from_connection(conn.clone()));
    let importer = LeadImporterImpl::new(repo.clone(), ImportSettings::default());

    let file = write_csv(&leads_csv(3, &[]));
    let import = importer.import_file(file.path()).await.unwrap();
    assert_eq!(import.status, ImportStatus::Completed);

    let rerun = importer.run_import(&import.id, file.path(), None).await;
    assert!(matches!(rerun, Err(ImportError::InvalidStateTransition { .. })));

    // 批次保持原终态，线索未重复创建
    let stored = repo.get_import(&import.id).await.unwrap().unwrap();
    assert_eq!(stored, import);
    assert_eq!(leads_of_import(&conn, &import.id).len(), 3);
}

#[tokio::test]
async fn test_row_length_policies() {
    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let conn = shared_conn(&db_path);
    let repo = Arc::new(LeadImportRepositoryImpl::from_connection(conn.clone()));
    let content = "email,company,title\n\
                   a@x.io,Acme,CEO\n\
                   b@x.io,Acme\n\
                   c@x.io,Acme,CTO,surplus\n";

    // PAD: 短行补空，长行截断，全部落库
    let pad = LeadImporterImpl::new(
        repo.clone(),
        ImportSettings {
            row_length_policy: RowLengthPolicy::Pad,
            ..ImportSettings::default()
        },
    );
    let file = write_csv(content);
    let padded = pad.import_file(file.path()).await.unwrap();
    assert_eq!(padded.status, ImportStatus::Completed);
    assert_eq!(leads_of_import(&conn, &padded.id).len(), 3);

    // SKIP: 列数不一致的行计入已处理，但不落库也不计重复
    let skip = LeadImporterImpl::new(
        repo.clone(),
        ImportSettings {
            row_length_policy: RowLengthPolicy::Skip,
            ..ImportSettings::default()
        },
    );
    let file = write_csv(&content.replace("@x.io", "@y.io"));
    let skipped = skip.import_file(file.path()).await.unwrap();
    assert_eq!(skipped.status, ImportStatus::Completed);
    assert_eq!(skipped.total_records, 3);
    assert_eq!(skipped.processed_records, 3);
    assert_eq!(skipped.duplicates_found, 0);
    assert_eq!(leads_of_import(&conn, &skipped.id).len(), 1);
}
