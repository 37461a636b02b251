//! joinx-flow - SPR（セルフピアシングリベット）工程開発ワークフローエンジン
//!
//! タスク（材料・継手構造・目標）に対して、宣言的に定義したステップ列を順に実行し、
//! ステップ出力をコンテキストへ蓄積しながら監査ログを記録します。
//! 確認が必要なステップでは実行を停止し、確認後にステップ0から再実行します。
//!
//! # モジュール構成
//!
//! - [`config`]: ワークフロー定義（TOML）とステップ・実行条件
//! - [`engine`]: 実行エンジン、コンテキスト、監査ログ、実行結果
//! - [`handler`]: ステップハンドラーのトレイトと組み込みハンドラー
//! - [`task`]: タスクとタスク定義ファイル
//! - [`store`]: タスクのインメモリストア
//! - [`workbench`]: 組み込み SPR ワークフローとデモ
//! - [`error`]: 設定・ハンドラーのエラー型

pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod store;
pub mod task;
pub mod workbench;
