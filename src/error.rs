//! エラー型の定義
//!
//! このモジュールは、joinx-flow 全体で使用されるエラー型を定義します。
//!
//! - [`ConfigError`]: ワークフロー定義・タスク定義の読み込みと構築時のエラー
//! - [`HandlerError`]: ステップハンドラーが返すエラー
//!
//! エンジン実行時のエラーは [`crate::engine::ExecutionError`] を参照してください。

use thiserror::Error;

/// 設定関連のエラー
///
/// いずれもワークフロー実行前（構築時・読み込み時）に検出されます。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// ファイルの読み込みに失敗
    #[error("設定ファイルの読み込みに失敗しました: {0}")]
    FileRead(#[from] std::io::Error),

    /// TOML のデシリアライズに失敗
    #[error("TOML のデシリアライズに失敗しました: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    /// TOML のシリアライズに失敗
    #[error("TOML のシリアライズに失敗しました: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// バリデーションエラー
    #[error("設定のバリデーションに失敗しました: {0}")]
    Validation(String),

    /// ステップ名が空
    #[error("{index}番目のステップ名が空です")]
    EmptyStepName {
        /// ステップのインデックス（0始まり）
        index: usize,
    },

    /// ステップ名の重複
    #[error("ステップ名 '{0}' が重複しています")]
    DuplicateStepName(String),

    /// 未登録のハンドラー名
    #[error("ステップ '{step}' が未登録のハンドラー '{handler}' を参照しています")]
    UnknownHandler {
        /// 参照元のステップ名
        step: String,
        /// 解決できなかったハンドラー名
        handler: String,
    },
}

/// ステップハンドラーのエラー
///
/// ハンドラーが入力を解釈できない場合や計算に失敗した場合に返します。
/// エンジンはこれを FAILED の監査エントリとして記録し、実行を中断します。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    /// 必須のコンテキストキーが存在しない
    #[error("必須の入力 '{0}' がコンテキストに存在しません")]
    MissingInput(String),

    /// コンテキストの値が期待する形式ではない
    #[error("入力 '{key}' の形式が不正です: {reason}")]
    InvalidInput {
        /// 対象のキー
        key: String,
        /// 不正と判断した理由
        reason: String,
    },

    /// ハンドラー内部の計算失敗
    #[error("ハンドラーの処理に失敗しました: {0}")]
    Fault(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::EmptyStepName { index: 2 }.to_string(),
            "2番目のステップ名が空です"
        );
        assert_eq!(
            ConfigError::DuplicateStepName("plan".to_string()).to_string(),
            "ステップ名 'plan' が重複しています"
        );
        assert_eq!(
            ConfigError::UnknownHandler {
                step: "Risk".to_string(),
                handler: "magic".to_string(),
            }
            .to_string(),
            "ステップ 'Risk' が未登録のハンドラー 'magic' を参照しています"
        );
    }

    #[test]
    fn test_handler_error_messages() {
        assert_eq!(
            HandlerError::MissingInput("material".to_string()).to_string(),
            "必須の入力 'material' がコンテキストに存在しません"
        );
        assert_eq!(
            HandlerError::InvalidInput {
                key: "process_window".to_string(),
                reason: "オブジェクトではありません".to_string(),
            }
            .to_string(),
            "入力 'process_window' の形式が不正です: オブジェクトではありません"
        );
    }
}
