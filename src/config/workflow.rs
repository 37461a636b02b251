//! Workflow 定義の読み込みと管理を行うモジュール
//!
//! # 責務
//!
//! このモジュールは、工程開発のワークフローを TOML 形式で定義し、
//! それを Rust の型として扱うための機能を提供します。
//!
//! ## 主な機能
//!
//! - **TOML パース**: `workflows/` ディレクトリ内の TOML ファイルを読み込み、
//!   [`Workflow`] 構造体に変換
//! - **ハンドラー解決**: ステップの `handler` 名を [`HandlerRegistry`] で実装に解決
//! - **構築時検証**: 空のワークフロー名、空・重複したステップ名、未登録ハンドラーを拒否
//!
//! ## 使用例
//!
//! ```toml
//! [workflow]
//! name = "spr-process-development"
//! description = "SPR 工程開発ワークフロー"
//!
//! [[steps]]
//! name = "ParameterRecommendation"
//! handler = "parameter_recommendation"
//!
//! [[steps]]
//! name = "ProcessWindow"
//! handler = "process_window"
//! when = { key_present = "recommended_ranges" }
//! ```
//!
//! ## 関連モジュール
//!
//! - [`crate::config::step`]: 各ステップの定義
//! - [`crate::engine::executor`]: ワークフローの実行エンジン

use std::collections::HashSet;
use std::path::Path;

use super::dto::{WorkflowDto, WorkflowMetadataDto, WorkflowStepDto};
use super::step::StepDefinition;
use crate::error::ConfigError;
use crate::handler::HandlerRegistry;

/// ワークフロー定義（ドメインモデル）
///
/// バリデーション済みの状態を保証します。
///
/// ## DTO との違い
///
/// - `WorkflowDto`: TOML デシリアライズ専用、バリデーション前の生データ
/// - [`Workflow`]: バリデーション済み、ハンドラー解決済み
#[derive(Debug, Clone)]
pub struct Workflow {
    name: String,
    description: Option<String>,
    version: Option<String>,
    steps: Vec<StepDefinition>,
}

impl Workflow {
    /// ステップ列からワークフローを構築する
    ///
    /// # エラー
    ///
    /// - [`ConfigError::Validation`] - ワークフロー名が空
    /// - [`ConfigError::EmptyStepName`] - 空のステップ名
    /// - [`ConfigError::DuplicateStepName`] - 重複したステップ名
    pub fn new(name: impl Into<String>, steps: Vec<StepDefinition>) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ワークフロー名が空です".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (index, step) in steps.iter().enumerate() {
            if step.name().trim().is_empty() {
                return Err(ConfigError::EmptyStepName { index });
            }
            if !seen.insert(step.name()) {
                return Err(ConfigError::DuplicateStepName(step.name().to_string()));
            }
        }

        Ok(Self {
            name,
            description: None,
            version: None,
            steps,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// TOML ファイルからワークフローを読み込む
    ///
    /// ハンドラー名は組み込みレジストリ（[`HandlerRegistry::builtin`]）で解決します。
    ///
    /// # 処理フロー
    ///
    /// 1. ファイル読み込み
    /// 2. TOML デシリアライズ → `WorkflowDto`
    /// 3. バリデーション & 変換 → [`Workflow`]
    ///
    /// # 戻り値
    ///
    /// * `Ok(Workflow)` - 読み込みに成功した場合
    /// * `Err(ConfigError)` - ファイルの読み込み、パース、検証のいずれかに失敗した場合
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with(path, &HandlerRegistry::builtin())
    }

    /// 指定したレジストリでハンドラーを解決しつつ TOML ファイルから読み込む
    pub fn from_file_with(
        path: impl AsRef<Path>,
        registry: &HandlerRegistry,
    ) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_with(&content, registry)
    }

    /// TOML 文字列からワークフローを読み込む（組み込みレジストリを使用）
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::from_toml_with(toml, &HandlerRegistry::builtin())
    }

    /// TOML 文字列からワークフローを読み込む
    ///
    /// # 引数
    ///
    /// * `toml` - TOML 形式の文字列
    /// * `registry` - ハンドラー名の解決に使うレジストリ
    pub fn from_toml_with(toml: &str, registry: &HandlerRegistry) -> Result<Self, ConfigError> {
        let dto: WorkflowDto = toml::from_str(toml)?;
        Self::from_dto(dto, registry)
    }

    /// ワークフローを TOML 文字列に変換
    pub fn to_string(&self) -> Result<String, ConfigError> {
        let dto = WorkflowDto::from(self);
        Ok(toml::to_string(&dto)?)
    }

    /// ワークフローを TOML ファイルに保存
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = self.to_string()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// 名前でステップを探す
    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.name() == name)
    }

    fn from_dto(dto: WorkflowDto, registry: &HandlerRegistry) -> Result<Self, ConfigError> {
        let steps = dto
            .steps
            .into_iter()
            .map(|step| resolve_step(step, registry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut workflow = Workflow::new(dto.workflow.name, steps)?;
        workflow.description = dto.workflow.description;
        workflow.version = dto.workflow.version;
        Ok(workflow)
    }
}

/// ステップ DTO をドメインモデルへ変換（ハンドラー名を解決）
fn resolve_step(
    dto: WorkflowStepDto,
    registry: &HandlerRegistry,
) -> Result<StepDefinition, ConfigError> {
    let mut step =
        StepDefinition::new(dto.name).set_requires_confirmation(dto.requires_confirmation);

    if let Some(handler_name) = dto.handler {
        let handler = registry
            .get(&handler_name)
            .ok_or_else(|| ConfigError::UnknownHandler {
                step: step.name().to_string(),
                handler: handler_name.clone(),
            })?;
        step = step.with_handler(handler);
    }
    if let Some(condition) = dto.when {
        step = step.when(condition);
    }
    if let Some(timeout) = dto.timeout {
        step = step.with_timeout(timeout);
    }
    Ok(step)
}

/// ドメインモデルから DTO への変換（書き込み方向）
///
/// バリデーション済みのドメインモデルから DTO を生成するため、
/// この変換は失敗しません（`From` トレイトを使用）。
impl From<&Workflow> for WorkflowDto {
    fn from(workflow: &Workflow) -> Self {
        WorkflowDto {
            workflow: WorkflowMetadataDto {
                name: workflow.name.clone(),
                description: workflow.description.clone(),
                version: workflow.version.clone(),
            },
            steps: workflow.steps.iter().map(WorkflowStepDto::from).collect(),
        }
    }
}

impl From<&StepDefinition> for WorkflowStepDto {
    fn from(step: &StepDefinition) -> Self {
        WorkflowStepDto {
            name: step.name().to_string(),
            handler: step.handler_name().map(str::to_string),
            timeout: step.timeout(),
            requires_confirmation: step.is_confirmation_required(),
            when: step.condition().cloned(),
        }
    }
}
