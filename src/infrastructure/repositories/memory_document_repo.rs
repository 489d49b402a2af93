// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::models::document::Document;
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::utils::errors::RepositoryError;

/// 内存文档仓库
///
/// 适用于测试和单进程运行
#[derive(Debug, Default)]
pub struct InMemoryDocumentRepository {
    documents: DashMap<String, Document>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有文档的快照
    pub fn snapshot(&self) -> Vec<Document> {
        self.documents.iter().map(|e| e.value().clone()).collect()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn save(&self, document: &Document) -> Result<(), RepositoryError> {
        self.documents.insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.documents.len())
    }

    async fn load(&self, id: &str) -> Result<Option<Document>, RepositoryError> {
        Ok(self.documents.get(id).map(|e| e.value().clone()))
    }
}
