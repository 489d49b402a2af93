// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 集群模块
///
/// 管理水平扩展的工作进程，每个工作进程运行自己的工作池
pub mod manager;
pub mod runtime;

pub use manager::{FleetConfig, FleetManager, ScaleReport};
pub use runtime::{ContainerHandle, ContainerRuntime, ContainerSpec, DockerCliRuntime, RuntimeError};
