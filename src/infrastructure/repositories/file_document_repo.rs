// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::models::document::Document;
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::utils::errors::RepositoryError;

/// 本地文件文档仓库
///
/// 每个文档保存为 `<base_path>/<id>.json`
pub struct FileDocumentRepository {
    base_path: PathBuf,
}

impl FileDocumentRepository {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn document_path(&self, id: &str) -> Result<PathBuf, RepositoryError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RepositoryError::Storage(format!("invalid document id: {}", id)));
        }
        Ok(self.base_path.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl DocumentRepository for FileDocumentRepository {
    async fn save(&self, document: &Document) -> Result<(), RepositoryError> {
        let path = self.document_path(&document.id)?;
        fs::create_dir_all(&self.base_path).await?;

        let data = serde_json::to_vec_pretty(document)?;
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn load(&self, id: &str) -> Result<Option<Document>, RepositoryError> {
        let path = match self.document_path(id) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };

        match fs::read(&path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
