//! Mock AWS services, prompter and process runner for workflow tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rds_iam_connect::prompt::Prompter;
use rds_iam_connect::workflow::{Runtime, Services, SessionFactory};
use rds_iam_connect_core::config::CacheSettings;
use rds_iam_connect_core::identity::{CallerIdentity, EvaluationResult, IdentityApi};
use rds_iam_connect_core::{
    AuthToken, CacheStore, ClusterPage, ClusterRecord, Config, InventoryApi, ProcessRunner,
    RdsConnectError, ResourceTag, Result, TokenIssuer,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub const CONFIG_YAML: &str = r#"
rds_tags:
  tag_name: Team
  tag_value: payments
env_tag_name: ReleaseState
allowed_iam_users:
  - app_ro
  - app_rw
env_tag:
  prod:
    release_state: production
    region: eu-west-1
  staging:
    release_state: staging
    region: eu-west-1
caching:
  enabled: true
  duration: 1h
check_iam_permissions: true
client:
  program: mysql
  extra_args:
    - --enable-cleartext-plugin
"#;

pub fn config() -> Config {
    Config::from_yaml_str(CONFIG_YAML).unwrap()
}

pub fn cluster(name: &str, release_state: &str) -> (ClusterRecord, Vec<ResourceTag>) {
    let record = ClusterRecord {
        identifier: Some(name.to_string()),
        endpoint: Some(format!("{name}.cluster-abc.eu-west-1.rds.amazonaws.com")),
        port: Some(3306),
        arn: Some(format!("arn:aws:rds:eu-west-1:123456789012:cluster:{name}")),
        iam_auth_enabled: Some(true),
        resource_id: Some(format!("cluster-{}", name.to_uppercase())),
    };
    let tags = vec![
        ResourceTag::new("Team", "payments"),
        ResourceTag::new("ReleaseState", release_state),
    ];
    (record, tags)
}

/// Single-page inventory.
#[derive(Default)]
pub struct MockInventory {
    pub clusters: Vec<(ClusterRecord, Vec<ResourceTag>)>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockInventory {
    pub fn with(clusters: Vec<(ClusterRecord, Vec<ResourceTag>)>) -> Self {
        Self {
            clusters,
            ..Default::default()
        }
    }
}

#[async_trait]
impl InventoryApi for MockInventory {
    async fn describe_clusters_page(&self, _marker: Option<String>) -> Result<ClusterPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RdsConnectError::discovery(
                "failed to describe RDS clusters",
                "AccessDenied: not authorized to perform rds:DescribeDBClusters",
            ));
        }
        Ok(ClusterPage {
            clusters: self.clusters.iter().map(|(record, _)| record.clone()).collect(),
            next_marker: None,
        })
    }

    async fn list_tags(&self, resource_arn: &str) -> Result<Vec<ResourceTag>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .clusters
            .iter()
            .find(|(record, _)| record.arn.as_deref() == Some(resource_arn))
            .map(|(_, tags)| tags.clone())
            .unwrap_or_default())
    }

    async fn describe_cluster(&self, identifier: &str) -> Result<Option<ClusterRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .clusters
            .iter()
            .map(|(record, _)| record)
            .find(|record| record.identifier.as_deref() == Some(identifier))
            .cloned())
    }
}

/// Identity service with a fixed caller and decision list.
pub struct MockIdentity {
    pub caller_arn: String,
    pub decisions: Vec<String>,
    pub simulated: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockIdentity {
    pub fn deciding(decisions: &[&str]) -> Self {
        Self {
            caller_arn: "arn:aws:sts::123456789012:assumed-role/DbAccess/alice".to_string(),
            decisions: decisions.iter().map(|d| d.to_string()).collect(),
            simulated: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl IdentityApi for MockIdentity {
    async fn caller_identity(&self) -> Result<CallerIdentity> {
        Ok(CallerIdentity {
            account: Some("123456789012".to_string()),
            arn: self.caller_arn.clone(),
        })
    }

    async fn simulate_principal_policy(
        &self,
        source_arn: &str,
        action: &str,
        resource_arns: &[String],
    ) -> Result<Vec<EvaluationResult>> {
        self.simulated
            .lock()
            .unwrap()
            .push((source_arn.to_string(), resource_arns.to_vec()));
        Ok(self
            .decisions
            .iter()
            .map(|decision| EvaluationResult {
                action: action.to_string(),
                resource: resource_arns.first().cloned(),
                decision: decision.clone(),
            })
            .collect())
    }
}

/// Token issuer producing a recognisable fake token.
#[derive(Default)]
pub struct MockIssuer {
    pub calls: AtomicUsize,
}

pub const TOKEN_SIGNATURE: &str = "X-Amz-Signature=deadbeef";

#[async_trait]
impl TokenIssuer for MockIssuer {
    async fn build_auth_token(&self, endpoint: &str, port: i32, user: &str) -> Result<AuthToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AuthToken::new(format!(
            "{endpoint}:{port}/?Action=connect&DBUser={user}&{TOKEN_SIGNATURE}"
        )))
    }
}

/// Hands out the same mocks for every region.
pub struct MockSessions {
    pub inventory: Arc<MockInventory>,
    pub identity: Arc<MockIdentity>,
    pub issuer: Arc<MockIssuer>,
    pub opened: Mutex<Vec<String>>,
}

impl MockSessions {
    pub fn new(inventory: MockInventory, identity: MockIdentity) -> Self {
        Self {
            inventory: Arc::new(inventory),
            identity: Arc::new(identity),
            issuer: Arc::new(MockIssuer::default()),
            opened: Mutex::new(Vec::new()),
        }
    }
}

/// Shared handle so tests can inspect the mocks after the run.
pub struct SharedSessions(pub Arc<MockSessions>);

#[async_trait]
impl SessionFactory for SharedSessions {
    async fn open(&self, region: &str) -> Services {
        let sessions = &self.0;
        sessions.opened.lock().unwrap().push(region.to_string());
        Services {
            region: region.to_string(),
            inventory: sessions.inventory.clone(),
            identity: sessions.identity.clone(),
            tokens: sessions.issuer.clone(),
        }
    }
}

/// Answers prompts from a queue of option labels.
pub struct ScriptedPrompter {
    pub answers: Mutex<VecDeque<String>>,
    pub asked: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl ScriptedPrompter {
    pub fn answering(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn select(&self, message: &str, options: &[String]) -> anyhow::Result<usize> {
        self.asked
            .lock()
            .unwrap()
            .push((message.to_string(), options.to_vec()));
        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted answer for '{}'", message))?;
        options
            .iter()
            .position(|option| option.starts_with(&answer))
            .ok_or_else(|| anyhow::anyhow!("'{}' is not offered for '{}'", answer, message))
    }
}

/// Prompter that never answers.
pub struct StalledPrompter;

#[async_trait]
impl Prompter for StalledPrompter {
    async fn select(&self, _message: &str, _options: &[String]) -> anyhow::Result<usize> {
        std::future::pending::<()>().await;
        Ok(0)
    }
}

/// Records client invocations.
pub struct RecordingRunner {
    pub exit_code: Option<i32>,
    pub invocations: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl RecordingRunner {
    pub fn exiting_with(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<Option<i32>> {
        self.invocations
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        Ok(self.exit_code)
    }
}

pub fn cache_in(dir: &tempfile::TempDir, config: &Config) -> CacheStore {
    CacheStore::with_directory(&config.caching, dir.path())
}

pub fn disabled_cache(dir: &tempfile::TempDir) -> CacheStore {
    let settings = CacheSettings {
        enabled: false,
        duration: "1h".to_string(),
    };
    CacheStore::with_directory(&settings, dir.path())
}

pub fn runtime(
    config: Config,
    cache: CacheStore,
    sessions: Arc<MockSessions>,
    prompter: impl Prompter + 'static,
    runner: RecordingRunner,
) -> Runtime {
    Runtime {
        config,
        cache,
        sessions: Box::new(SharedSessions(sessions)),
        prompter: Box::new(prompter),
        runner: Box::new(runner),
        cancel: CancellationToken::new(),
    }
}
