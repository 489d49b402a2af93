// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::models::fleet_worker::WorkerStatus;

/// 容器运行时错误
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// 创建工作进程容器所需的参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<(String, String)>,
    pub network: Option<String>,
}

/// 已创建容器的句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

/// 容器运行时
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// 创建并启动容器
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerHandle, RuntimeError>;

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), RuntimeError>;

    async fn remove(&self, handle: &ContainerHandle) -> Result<(), RuntimeError>;

    /// 查询容器的实际状态，查询失败视为 `NotFound`
    async fn status(&self, handle: &ContainerHandle) -> WorkerStatus;
}

/// 通过 docker 命令行管理容器
#[derive(Debug, Clone)]
pub struct DockerCliRuntime {
    program: String,
}

impl Default for DockerCliRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCliRuntime {
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// 使用兼容 docker CLI 的其他程序，例如 podman
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run_args(spec: &ContainerSpec) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            spec.name.clone(),
        ];
        if let Some(network) = &spec.network {
            args.push("--network".to_string());
            args.push(network.clone());
        }
        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(spec.image.clone());
        args
    }

    async fn run(&self, args: &[String]) -> Result<String, RuntimeError> {
        debug!("Running {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command: format!("{} {}", self.program, args.first().map_or("", |a| a.as_str())),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ContainerRuntime for DockerCliRuntime {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerHandle, RuntimeError> {
        let id = self.run(&Self::run_args(spec)).await?;
        Ok(ContainerHandle {
            id,
            name: spec.name.clone(),
        })
    }

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), RuntimeError> {
        self.run(&["stop".to_string(), handle.id.clone()]).await?;
        Ok(())
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<(), RuntimeError> {
        self.run(&["rm".to_string(), "-f".to_string(), handle.id.clone()])
            .await?;
        Ok(())
    }

    async fn status(&self, handle: &ContainerHandle) -> WorkerStatus {
        let args = [
            "inspect".to_string(),
            "-f".to_string(),
            "{{.State.Running}}".to_string(),
            handle.id.clone(),
        ];
        match self.run(&args).await {
            Ok(running) if running == "true" => WorkerStatus::Running,
            Ok(_) => WorkerStatus::Stopped,
            Err(e) => {
                warn!("Could not inspect container {}: {}", handle.name, e);
                WorkerStatus::NotFound
            }
        }
    }
}
