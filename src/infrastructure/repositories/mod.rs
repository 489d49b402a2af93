// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供领域层文档仓库接口的具体实现
pub mod file_document_repo;
pub mod memory_document_repo;

pub use file_document_repo::FileDocumentRepository;
pub use memory_document_repo::InMemoryDocumentRepository;
