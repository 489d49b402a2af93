// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

use crate::domain::models::document::Document;
use crate::utils::errors::RepositoryError;

/// 文档仓库特质
///
/// 定义抓取文档的持久化接口，具体实现由基础设施层提供
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// 保存单个文档，相同ID的文档会被覆盖
    async fn save(&self, document: &Document) -> Result<(), RepositoryError>;

    /// 批量保存文档
    async fn save_batch(&self, documents: &[Document]) -> Result<(), RepositoryError> {
        for document in documents {
            self.save(document).await?;
        }
        Ok(())
    }

    /// 已保存的文档数量
    async fn count(&self) -> Result<usize, RepositoryError>;

    /// 根据ID加载文档
    async fn load(&self, id: &str) -> Result<Option<Document>, RepositoryError>;
}
