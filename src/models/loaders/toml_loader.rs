use crate::error::{AppError, AppResult, ConfigError};
use crate::models::test_item::TestItem;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 单个 TOML 文件的结构
#[derive(Debug, Deserialize)]
struct TestItemFile {
    #[serde(default)]
    test_items: Vec<TestItem>,
}

/// 解析 TOML 文本为测试项列表
pub fn parse_test_items(content: &str, origin: &str) -> AppResult<Vec<TestItem>> {
    let file: TestItemFile = toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
        path: origin.to_string(),
        source,
    })?;

    let mut items = file.test_items;
    for item in &mut items {
        item.condition.dedup_equipment();
    }
    Ok(items)
}

/// 从 TOML 文件加载测试项
pub async fn load_test_items(toml_file_path: &Path) -> AppResult<Vec<TestItem>> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file(toml_file_path.display().to_string(), e))?;

    parse_test_items(&content, &toml_file_path.display().to_string())
}

/// 从文件夹中加载所有 TOML 文件里的测试项
///
/// 文件按文件名排序后依次加载，单个文件解析失败只记录警告。
pub async fn load_all_toml_files(folder_path: &str) -> AppResult<Vec<TestItem>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(ConfigError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file(folder_path, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file(folder_path, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut test_items = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_test_items(&path).await {
            Ok(items) => {
                tracing::info!("成功加载 {} 个测试项", items.len());
                test_items.extend(items);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(test_items)
}
