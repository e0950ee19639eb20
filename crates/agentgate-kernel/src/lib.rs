//! # agentgate-kernel: composition root
//!
//! [`GatewayBuilder`] wires the server registry, remote client, discovery
//! scanner, agent runtime and tool set into a cloneable [`Gateway`] handle
//! shared by the HTTP API and the CLI.

use std::sync::Arc;

use agentgate_discovery::{NetworkInfo, ScanRequest, ScanResult, SubnetScanner, discovery_tools};
use agentgate_protocol::{
    AgentEventStream, GatewayResult, Message, ServerConfig, ThreadId, ToolSet,
};
use agentgate_runtime::{
    AgentMessageCountTool, AgentRuntime, AgentService, InputSanitizer, InvokeOutcome,
    MessageCounts, OpenAiConfig, OpenAiRuntime, OutputSanitizerConfig, SanitizerConfig,
    ThreadMessageCounts,
};
use agentgate_tools::{ConnectivityReport, DeviceToolkit, RemoteToolClient, ServerRegistry};
use tracing::{info, instrument};

#[derive(Clone, Default)]
pub struct GatewayBuilder {
    servers: Vec<ServerConfig>,
    openai: OpenAiConfig,
    sanitizer: SanitizerConfig,
    output_sanitizer: OutputSanitizerConfig,
    fake_mode: bool,
    runtime: Option<Arc<dyn AgentRuntime>>,
    scan_concurrency: Option<usize>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Servers registered at startup. Entries are upserted in order.
    pub fn servers(mut self, servers: Vec<ServerConfig>) -> Self {
        self.servers = servers;
        self
    }

    pub fn openai(mut self, openai: OpenAiConfig) -> Self {
        self.openai = openai;
        self
    }

    pub fn sanitizer(mut self, sanitizer: SanitizerConfig) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Filter for the history returned by `invoke`. Off by default.
    pub fn output_sanitizer(mut self, output_sanitizer: OutputSanitizerConfig) -> Self {
        self.output_sanitizer = output_sanitizer;
        self
    }

    pub fn fake_mode(mut self, fake_mode: bool) -> Self {
        self.fake_mode = fake_mode;
        self
    }

    /// Replace the OpenAI runtime, e.g. with a scripted one in tests.
    pub fn runtime(mut self, runtime: Arc<dyn AgentRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn scan_concurrency(mut self, concurrency: usize) -> Self {
        self.scan_concurrency = Some(concurrency);
        self
    }

    pub fn build(self) -> Gateway {
        let registry = ServerRegistry::from_configs(self.servers);
        let client = RemoteToolClient::new();
        let counts = ThreadMessageCounts::new();

        let mut scanner = SubnetScanner::new(registry.clone());
        if let Some(concurrency) = self.scan_concurrency {
            scanner = scanner.with_concurrency(concurrency);
        }

        let tools = ToolSet::new()
            .extend(DeviceToolkit::new(registry.clone(), client.clone()).tools())
            .extend(discovery_tools(scanner.clone()))
            .with(Arc::new(AgentMessageCountTool::new(counts.clone())));

        let runtime = self.runtime.unwrap_or_else(|| {
            Arc::new(
                OpenAiRuntime::new(self.openai.clone())
                    .with_sanitizer(InputSanitizer::new(self.sanitizer.clone()))
                    .with_counts(counts.clone()),
            )
        });
        let agent = AgentService::new(runtime, tools)
            .with_fake_mode(self.fake_mode)
            .with_output_sanitizer(self.output_sanitizer);

        info!(
            servers = registry.len(),
            tools = agent.tools().len(),
            fake_mode = self.fake_mode,
            model = %self.openai.model,
            "gateway assembled"
        );

        Gateway {
            registry,
            client,
            scanner,
            agent,
            counts,
            openai: self.openai,
            sanitizer: self.sanitizer,
        }
    }
}

#[derive(Clone)]
pub struct Gateway {
    registry: ServerRegistry,
    client: RemoteToolClient,
    scanner: SubnetScanner,
    agent: AgentService,
    counts: ThreadMessageCounts,
    openai: OpenAiConfig,
    sanitizer: SanitizerConfig,
}

impl Gateway {
    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn agent(&self) -> &AgentService {
        &self.agent
    }

    pub fn openai(&self) -> &OpenAiConfig {
        &self.openai
    }

    pub fn sanitizer(&self) -> &SanitizerConfig {
        &self.sanitizer
    }

    pub fn fake_mode(&self) -> bool {
        self.agent.fake_mode()
    }

    pub fn message_counts(&self, thread_id: &ThreadId) -> MessageCounts {
        self.counts.get(thread_id)
    }

    #[instrument(skip(self, config), fields(server = %config.name, transport = %config.transport))]
    pub async fn test_server(&self, config: &ServerConfig) -> ConnectivityReport {
        self.client.check_connectivity(config).await
    }

    pub fn network_info(&self, subnet_cidr: Option<&str>) -> GatewayResult<NetworkInfo> {
        agentgate_discovery::network_info(subnet_cidr)
    }

    pub async fn scan(&self, request: ScanRequest) -> GatewayResult<ScanResult> {
        self.scanner.scan(request).await
    }

    pub async fn run(
        &self,
        history: Vec<Message>,
        thread_id: ThreadId,
    ) -> GatewayResult<AgentEventStream> {
        self.agent.run(history, thread_id).await
    }

    pub async fn invoke(
        &self,
        history: Vec<Message>,
        thread_id: ThreadId,
    ) -> GatewayResult<InvokeOutcome> {
        self.agent.invoke(history, thread_id).await
    }
}
